//! tribuna-floor – Redezeit-Steuerung
//!
//! Enthaelt den Countdown ([`Countdown`]), den Sitzungszustand als
//! getaggte Variante ([`SessionState`], [`Phase`]) und die
//! Zustandsmaschine [`SpeakingTimeController`], die Uhr, Relais und
//! Redner-Identitaet koordiniert und das Aparte-Protokoll umsetzt.
//!
//! Der Controller ist nicht thread-safe. Er gehoert genau einem Task
//! (siehe Laufzeit in `tribuna-console`), Abnehmer bekommen Snapshots.

pub mod clock;
pub mod controller;
pub mod display;
pub mod error;
pub mod state;

pub use clock::{Countdown, TimeBudget, Zuruecksetzen};
pub use controller::{AnzeigeKonfig, SpeakingTimeController, Startfreigabe};
pub use error::{FloorError, FloorResult};
pub use state::{InterjectionContext, Phase, SessionState};
