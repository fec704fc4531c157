//! Redner-Identitaet und Roster-Handles
//!
//! Die Steuerung liest Redner nur; angelegt und gepflegt werden sie von
//! der externen Rednerliste.

use serde::{Deserialize, Serialize};

/// Platzhalter, wenn ein Redner kein (auffindbares) Foto hat
pub const PLATZHALTER_FOTO: &str = "placeholder";

/// Stabile Redner-ID aus der Rednerliste
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerId(pub u32);

impl SpeakerId {
    /// Gibt den inneren Zahlenwert zurueck
    pub fn inner(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "redner:{}", self.0)
    }
}

/// Ein Ratsmitglied, wie es die Rednerliste liefert
///
/// Die Feldnamen der JSON-Listen (`nome`, `partido`, `foto`) werden als
/// Alias akzeptiert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: SpeakerId,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "partido", default)]
    pub party: String,
    /// Undurchsichtiger Verweis auf ein Bild, wird nicht interpretiert
    #[serde(alias = "foto", alias = "photo", default, skip_serializing_if = "Option::is_none")]
    pub photo_reference: Option<String>,
}

impl Speaker {
    pub fn neu(id: u32, name: impl Into<String>, party: impl Into<String>) -> Self {
        Self {
            id: SpeakerId(id),
            name: name.into(),
            party: party.into(),
            photo_reference: None,
        }
    }

    /// Setzt den Foto-Verweis (Builder-Stil)
    pub fn mit_foto(mut self, foto: impl Into<String>) -> Self {
        self.photo_reference = Some(foto.into());
        self
    }

    /// Foto-Verweis oder Platzhalter
    pub fn foto_oder_platzhalter(&self) -> &str {
        match self.photo_reference.as_deref() {
            Some(f) if !f.trim().is_empty() => f,
            _ => PLATZHALTER_FOTO,
        }
    }

    /// Anzeigeform "Name (Partei)"
    pub fn anzeige(&self) -> String {
        if self.party.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.party)
        }
    }
}

/// Undurchsichtiges Handle auf eine benannte Rednerliste
///
/// Z.B. "padrao" fuer die regulaere Sitzung oder eine kleinere Liste
/// fuer Festsitzungen. Die Steuerung kennt das Speicherformat nicht.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RosterHandle(pub String);

impl RosterHandle {
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for RosterHandle {
    fn default() -> Self {
        Self("padrao".into())
    }
}

impl std::fmt::Display for RosterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "liste:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_aus_roster_json() {
        let json = r#"{"id": 3, "nome": "Ana Souza", "partido": "PV", "foto": "fotos/3.png"}"#;
        let s: Speaker = serde_json::from_str(json).unwrap();
        assert_eq!(s.id, SpeakerId(3));
        assert_eq!(s.name, "Ana Souza");
        assert_eq!(s.party, "PV");
        assert_eq!(s.foto_oder_platzhalter(), "fotos/3.png");
    }

    #[test]
    fn speaker_ohne_foto_nutzt_platzhalter() {
        let s = Speaker::neu(1, "Joao", "PT");
        assert_eq!(s.foto_oder_platzhalter(), PLATZHALTER_FOTO);

        let leer = Speaker::neu(2, "Maria", "PL").mit_foto("  ");
        assert_eq!(leer.foto_oder_platzhalter(), PLATZHALTER_FOTO);
    }

    #[test]
    fn anzeige_mit_und_ohne_partei() {
        assert_eq!(Speaker::neu(1, "Joao", "PT").anzeige(), "Joao (PT)");
        assert_eq!(Speaker::neu(1, "Joao", "").anzeige(), "Joao");
    }

    #[test]
    fn ids_display() {
        assert_eq!(SpeakerId(12).to_string(), "redner:12");
        assert_eq!(RosterHandle::default().to_string(), "liste:padrao");
    }
}
