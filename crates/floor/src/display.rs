//! Darstellungsregeln fuer Plenar-Anzeige und Lower Third

use tribuna_core::Anzeigestufe;

/// Restzeit, ab der die Anzeige rot wird und blinkt
pub const GEFAHRENZONE_S: u32 = 60;

/// Blinkintervall in der Gefahrenzone: je knapper, desto schneller
pub fn blink_intervall_ms(restzeit: u32) -> u32 {
    match restzeit {
        0..=10 => 200,
        11..=30 => 500,
        _ => 1000,
    }
}

pub fn anzeigestufe(restzeit: u32, aparte_aktiv: bool) -> Anzeigestufe {
    if aparte_aktiv {
        Anzeigestufe::Aparte
    } else if restzeit > 0 && restzeit <= GEFAHRENZONE_S {
        Anzeigestufe::Gefahr {
            blink_ms: blink_intervall_ms(restzeit),
        }
    } else {
        Anzeigestufe::Normal
    }
}

/// Lower-Third-Warnung: Restzeit unter der Schwelle bei geladenem Countdown
pub fn warnung(restzeit: u32, total: u32, schwelle_s: u32) -> bool {
    total > 0 && restzeit <= schwelle_s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stufen() {
        assert_eq!(anzeigestufe(300, false), Anzeigestufe::Normal);
        assert_eq!(anzeigestufe(61, false), Anzeigestufe::Normal);
        assert_eq!(anzeigestufe(60, false), Anzeigestufe::Gefahr { blink_ms: 1000 });
        assert_eq!(anzeigestufe(30, false), Anzeigestufe::Gefahr { blink_ms: 500 });
        assert_eq!(anzeigestufe(10, false), Anzeigestufe::Gefahr { blink_ms: 200 });
        assert_eq!(anzeigestufe(0, false), Anzeigestufe::Normal);
        // Im Aparte kein Blinken
        assert_eq!(anzeigestufe(5, true), Anzeigestufe::Aparte);
    }

    #[test]
    fn warnschwelle() {
        assert!(!warnung(31, 300, 30));
        assert!(warnung(30, 300, 30));
        assert!(warnung(0, 300, 30));
        assert!(!warnung(0, 0, 30));
    }
}
