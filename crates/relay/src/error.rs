//! Fehlertypen des Relais-Treibers
//!
//! Diese Fehler bleiben im Crate: die oeffentliche Treiber-API wandelt
//! sie in `bool` bzw. Verbindungsstatus um.

use thiserror::Error;

/// Alle moeglichen Fehler beim Zugriff auf das Relais
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Keine serielle Schnittstelle verfuegbar")]
    KeinPort,

    #[error("Port {port} konnte nicht geoeffnet werden: {grund}")]
    OeffnenFehlgeschlagen { port: String, grund: String },

    #[error("Relais nicht verbunden")]
    NichtVerbunden,

    #[error("Thread-Fehler: {0}")]
    Thread(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl From<RelayError> for tribuna_core::TribunaError {
    fn from(e: RelayError) -> Self {
        tribuna_core::TribunaError::Relais(e.to_string())
    }
}
