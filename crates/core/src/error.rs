//! Fehlertypen fuer Tribuna
//!
//! Zentraler Fehler-Enum fuer alles, was ausserhalb der Redezeit-Logik
//! schiefgehen kann. Bedienfehler der Steuerung haben einen eigenen Typ
//! im Floor-Crate und werden hier nur durchgereicht.

use thiserror::Error;

/// Globaler Result-Alias fuer Tribuna
pub type Result<T> = std::result::Result<T, TribunaError>;

/// Alle systemweiten Fehler der Tribuna-Steuerung
#[derive(Debug, Error)]
pub enum TribunaError {
    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Roster ---
    #[error("Rednerliste nicht gefunden: {0}")]
    ListeNichtGefunden(String),

    #[error("Redner nicht gefunden: {0}")]
    RednerNichtGefunden(u32),

    #[error("Rednerliste fehlerhaft ({liste}): {grund}")]
    ListeFehlerhaft { liste: String, grund: String },

    // --- Hardware ---
    #[error("Relais nicht erreichbar: {0}")]
    Relais(String),

    // --- Bedienung ---
    #[error("Aktion abgelehnt: {0}")]
    AktionAbgelehnt(String),

    // --- Taktgeber ---
    #[error("Taktgeber gestoert: {0}")]
    Takt(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl TribunaError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die laufende Sitzung nicht beendet
    ///
    /// Hardware- und Datenfehler werden zu Statusmeldungen, nur ein
    /// gestoerter Taktgeber ist fuer die laufende Rede fatal.
    pub fn ist_tolerierbar(&self) -> bool {
        matches!(
            self,
            Self::Relais(_)
                | Self::ListeNichtGefunden(_)
                | Self::RednerNichtGefunden(_)
                | Self::ListeFehlerhaft { .. }
                | Self::AktionAbgelehnt(_)
        )
    }
}
