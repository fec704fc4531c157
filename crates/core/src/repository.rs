//! Schnittstelle zur Rednerliste
//!
//! Die Steuerung braucht nur Lesezugriff: die aktuelle Liste, das Handle
//! der aktiven Liste und einen Lookup nach ID. Pflege und Speicherformat
//! liegen ausserhalb.

use crate::types::{RosterHandle, Speaker, SpeakerId};

/// Quelle der Wahrheit fuer die Redner einer Sitzung
pub trait SpeakerRepository: Send + Sync {
    /// Alle Redner der aktiven Liste
    fn get_roster(&self) -> Vec<Speaker>;

    /// Handle der aktiven Liste
    fn get_active_list_handle(&self) -> RosterHandle;

    /// Wechselt auf eine andere benannte Liste
    fn switch_list(&mut self, handle: RosterHandle) -> crate::Result<()>;

    /// Sucht einen Redner in der aktiven Liste
    fn find(&self, id: SpeakerId) -> Option<Speaker> {
        self.get_roster().into_iter().find(|s| s.id == id)
    }

    /// Filtert nach Name oder Partei (Gross-/Kleinschreibung egal)
    fn suchen(&self, text: &str) -> Vec<Speaker> {
        let text = text.to_lowercase();
        self.get_roster()
            .into_iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&text) || s.party.to_lowercase().contains(&text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FesteListe(Vec<Speaker>);

    impl SpeakerRepository for FesteListe {
        fn get_roster(&self) -> Vec<Speaker> {
            self.0.clone()
        }

        fn get_active_list_handle(&self) -> RosterHandle {
            RosterHandle::default()
        }

        fn switch_list(&mut self, handle: RosterHandle) -> crate::Result<()> {
            Err(crate::TribunaError::ListeNichtGefunden(handle.0))
        }
    }

    fn liste() -> FesteListe {
        FesteListe(vec![
            Speaker::neu(1, "Joao Silva", "PT"),
            Speaker::neu(2, "Maria Lima", "PL"),
            Speaker::neu(3, "Ana Souza", "PT"),
        ])
    }

    #[test]
    fn find_nach_id() {
        let l = liste();
        assert_eq!(l.find(SpeakerId(2)).unwrap().name, "Maria Lima");
        assert!(l.find(SpeakerId(9)).is_none());
    }

    #[test]
    fn suchen_name_und_partei() {
        let l = liste();
        assert_eq!(l.suchen("pt").len(), 2);
        assert_eq!(l.suchen("MARIA").len(), 1);
        assert_eq!(l.suchen("").len(), 3);
    }
}
