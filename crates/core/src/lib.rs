//! tribuna-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Redezeit-Steuerung,
//! Relais-Treiber und Konsole gemeinsam nutzen: Redner-Identitaet,
//! Roster-Schnittstelle, Zustands-Snapshots und die Broadcast-Senke.

pub mod error;
pub mod event;
pub mod gate;
pub mod repository;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, TribunaError};
pub use event::{
    AparteEndeGrund, AparteInfo, Anzeigestufe, BroadcastSink, Hinweis, SessionSnapshot,
    Sitzungsphase,
};
pub use gate::AudioGate;
pub use repository::SpeakerRepository;
pub use types::{RosterHandle, Speaker, SpeakerId};
