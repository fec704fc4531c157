//! Relais-Polaritaet
//!
//! Welches Byte "Audio an" bedeutet, haengt von der Verdrahtung ab und
//! ist deshalb Konfiguration, kein festes Protokoll. Die Polaritaet wird
//! einmal beim Start aufgeloest und muss je Installation am echten
//! Pult geprueft werden.
//!
//! | Verdrahtung      | Audio frei | Audio gekappt |
//! |------------------|------------|---------------|
//! | `NormallyOpen`   | `'1'`      | `'0'`         |
//! | `NormallyClosed` | `'0'`      | `'1'`         |
//!
//! `NormallyOpen`: Die Mikrofonleitung liegt am Schliesser, ein
//! angezogenes Relais (`'1'`) gibt Audio frei.
//! `NormallyClosed`: Die Leitung liegt am Oeffner, ein angezogenes
//! Relais (`'1'`) trennt sie.

use serde::{Deserialize, Serialize};

/// Logischer Zustand der Mikrofonleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioZustand {
    Offen,
    Gekappt,
}

/// Verdrahtung des Relais am Podium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaisPolaritaet {
    #[default]
    NormallyOpen,
    NormallyClosed,
}

impl RelaisPolaritaet {
    /// Kommando-Byte fuer den gewuenschten Zustand
    pub fn befehl(self, zustand: AudioZustand) -> u8 {
        match (self, zustand) {
            (Self::NormallyOpen, AudioZustand::Offen) => b'1',
            (Self::NormallyOpen, AudioZustand::Gekappt) => b'0',
            (Self::NormallyClosed, AudioZustand::Offen) => b'0',
            (Self::NormallyClosed, AudioZustand::Gekappt) => b'1',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normally_open_bytes() {
        let p = RelaisPolaritaet::NormallyOpen;
        assert_eq!(p.befehl(AudioZustand::Offen), b'1');
        assert_eq!(p.befehl(AudioZustand::Gekappt), b'0');
    }

    #[test]
    fn normally_closed_ist_invertiert() {
        let p = RelaisPolaritaet::NormallyClosed;
        assert_eq!(p.befehl(AudioZustand::Offen), b'0');
        assert_eq!(p.befehl(AudioZustand::Gekappt), b'1');
    }

    #[test]
    fn standard_ist_normally_open() {
        assert_eq!(RelaisPolaritaet::default(), RelaisPolaritaet::NormallyOpen);
    }

    #[test]
    fn polaritaet_aus_toml_wert() {
        #[derive(Deserialize)]
        struct W {
            p: RelaisPolaritaet,
        }
        let w: W = serde_json::from_str(r#"{"p":"normally_closed"}"#).unwrap();
        assert_eq!(w.p, RelaisPolaritaet::NormallyClosed);
    }
}
