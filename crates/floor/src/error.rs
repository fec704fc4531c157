//! Abgelehnte Bedienaktionen
//!
//! Jede Ablehnung traegt einen lesbaren Grund und laesst den Zustand
//! unveraendert.

use thiserror::Error;
use tribuna_core::{Sitzungsphase, TribunaError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FloorError {
    #[error("Keine Redezeit gesetzt")]
    KeineZeit,

    #[error("Kein Redner ausgewaehlt")]
    KeinRedner,

    #[error("Die Uhr laeuft bereits")]
    LaeuftBereits,

    #[error("Keine laufende Rede (Phase: {0})")]
    KeineLaufendeRede(Sitzungsphase),

    #[error("Aparte nicht moeglich: {0}")]
    AparteNichtMoeglich(&'static str),

    #[error("Kein Aparte aktiv")]
    KeinAparte,

    #[error("Kein vorgemerkter Zeitwert")]
    NichtsVorgemerkt,

    #[error("Ungueltige Zeitangabe: {0}")]
    UngueltigeZeit(&'static str),

    /// Aufruferfehler, kein Laufzeitzustand
    #[error("Vertragsverletzung: {0}")]
    Vertragsverletzung(&'static str),
}

pub type FloorResult<T> = Result<T, FloorError>;

impl From<FloorError> for TribunaError {
    fn from(e: FloorError) -> Self {
        TribunaError::AktionAbgelehnt(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehlertexte() {
        assert_eq!(
            FloorError::KeineLaufendeRede(Sitzungsphase::Armed).to_string(),
            "Keine laufende Rede (Phase: armed)"
        );
        let t: TribunaError = FloorError::KeineZeit.into();
        assert!(t.ist_tolerierbar());
        assert_eq!(t.to_string(), "Aktion abgelehnt: Keine Redezeit gesetzt");
    }
}
