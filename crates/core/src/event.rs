//! Zustands-Snapshots und Broadcast-Senke
//!
//! Die Redezeit-Steuerung schiebt nach jedem Zustandswechsel einen
//! Snapshot an die Senke (Plenar-Anzeige, Lower Third, Health-Endpunkt).
//! Abnehmer bekommen immer eine Kopie, nie eine Referenz auf den
//! lebenden Zustand. Der Transport (HTTP, Socket, Callback) ist Sache
//! der Implementierung.

use crate::types::Speaker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Phase der Redezeit-Zustandsmaschine (ohne Nutzdaten)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sitzungsphase {
    /// Keine laufende Rede
    Idle,
    /// Redner gewaehlt, Zeit gesetzt, Uhr steht
    Armed,
    /// Uhr laeuft, Mikrofon offen
    Running,
    /// Uhr mitten in der Rede angehalten, Mikrofon gekappt
    Paused,
    /// Uhr laeuft, naechstes `set_time` vergibt ein Aparte
    PreparingInterjection,
    /// Ein Aparte laeuft, die Zeit des Hauptredners ist eingefroren
    Interjecting,
}

impl Sitzungsphase {
    pub fn als_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::PreparingInterjection => "preparing_interjection",
            Self::Interjecting => "interjecting",
        }
    }
}

impl std::fmt::Display for Sitzungsphase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.als_str())
    }
}

/// Darstellungsstufe fuer Plenar-Anzeige und Lower Third
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "stufe")]
pub enum Anzeigestufe {
    Normal,
    /// Letzte Minute: rot und blinkend
    Gefahr { blink_ms: u32 },
    /// Aparte aktiv: eigene Farbe, kein Blinken
    Aparte,
}

/// Kopie der Aparte-Daten fuer Abnehmer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AparteInfo {
    pub grantor: Speaker,
    pub recipient: Speaker,
    pub granted_seconds: u32,
    /// Restzeit des Hauptredners zum Zeitpunkt der Vergabe
    pub grantor_saved_remaining: u32,
}

/// Lesbarer Snapshot des Sitzungszustands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub live_speaker: Option<Speaker>,
    pub principal_speaker: Option<Speaker>,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub clock_running: bool,
    pub interjection_active: bool,
    pub phase: Sitzungsphase,
    /// Zeit abgelaufen, wartet auf den Bediener
    pub time_expired: bool,
    pub relay_connected: bool,
    /// Waehrend einer laufenden Rede vorgemerkter Wert
    pub staged_seconds: Option<u32>,
    pub aparte: Option<AparteInfo>,
    pub anzeigestufe: Anzeigestufe,
    /// Restzeit unter der Warnschwelle des Lower Third
    pub warnung: bool,
    pub zeitstempel: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Restzeit als `mm:ss`
    pub fn restzeit_text(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }

    /// Verbrauchter Anteil (0.0 bis 1.0) fuer Fortschrittsbalken
    pub fn fortschritt(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let rest = f64::from(self.remaining_seconds.min(self.total_seconds));
        1.0 - rest / f64::from(self.total_seconds)
    }
}

/// Grund fuer das Ende eines Aparte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AparteEndeGrund {
    /// Vom Bediener beendet
    Bediener,
    /// Zeit des Aparte-Empfaengers abgelaufen
    Abgelaufen,
    /// Durch `stop()` verworfen
    Abgebrochen,
}

/// Ereignisse, die immer sichtbar gemacht werden muessen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "hinweis")]
pub enum Hinweis {
    ZeitAbgelaufen {
        speaker: Option<Speaker>,
    },
    AparteBeendet {
        recipient: Speaker,
        verbraucht: u32,
        grund: AparteEndeGrund,
    },
    RelaisVerbunden {
        port: String,
    },
    RelaisGetrennt,
    /// Der Sekundentakt kam zu spaet, Rede wurde angehalten
    TaktGestoert {
        verspaetung_ms: u64,
    },
}

/// Senke fuer Zustands-Snapshots
///
/// Wird aus dem Steuerungskontext synchron aufgerufen und darf nicht
/// blockieren. Eine Implementierung, die ins Netz sendet, muss selbst
/// auf einen Hintergrund-Task auslagern.
pub trait BroadcastSink: Send + Sync {
    /// Veroeffentlicht einen Snapshot nach einem Zustandswechsel
    fn publish(&self, snapshot: &SessionSnapshot);

    /// Meldet ein Ereignis, das sichtbar gemacht werden muss
    fn melden(&self, _hinweis: &Hinweis) {}
}

impl<T: BroadcastSink + ?Sized> BroadcastSink for Arc<T> {
    fn publish(&self, snapshot: &SessionSnapshot) {
        (**self).publish(snapshot)
    }

    fn melden(&self, hinweis: &Hinweis) {
        (**self).melden(hinweis)
    }
}
