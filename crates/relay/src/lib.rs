//! tribuna-relay – Relais-Treiber fuer das Podiumsmikrofon
//!
//! Ein Arduino (oder kompatibles Board) schaltet ueber ein Relais die
//! Leitung des Podiumsmikrofons. Der Treiber spricht ein-Byte-Kommandos
//! ueber die serielle Schnittstelle und haelt sich an zwei Regeln:
//!
//! - Beim Verbinden wird sofort gekappt (System startet still).
//! - Beim Trennen und beim Beenden wird sofort freigegeben, damit ein
//!   abgestuerztes Pult den Saal nie dauerhaft stumm schaltet.
//!
//! Hardwarefehler werden nie nach oben geworfen, sondern in einen
//! Verbindungsstatus umgewandelt. Der [`RelaisDienst`] kapselt den
//! Treiber in einem eigenen Thread, damit serielle Schreibzugriffe den
//! Sekundentakt nicht blockieren.

pub mod backend;
pub mod driver;
pub mod error;
pub mod polarity;
pub mod worker;

// Bequeme Re-Exporte
pub use backend::{PortInfo, RelayLink, SerialBackend, SpeicherBackend, SystemSerial};
pub use driver::{RelaisKonfig, RelayDriver};
pub use error::{RelayError, RelayResult};
pub use polarity::{AudioZustand, RelaisPolaritaet};
pub use worker::{RelaisBefehl, RelaisDienst, RelaisEreignis, RelaisHandle};
