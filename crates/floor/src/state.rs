//! Sitzungszustand
//!
//! Die Phase ist eine getaggte Variante: Aparte-Daten existieren genau
//! dann, wenn die Phase `Interjecting` ist, und das Ziel einer
//! Aparte-Vorbereitung genau dann, wenn sie `PreparingInterjection` ist.

use crate::clock::{Countdown, TimeBudget};
use tribuna_core::{Sitzungsphase, Speaker};

/// Daten eines laufenden Aparte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterjectionContext {
    /// Hauptredner, der das Wort abgibt
    pub grantor: Speaker,
    pub recipient: Speaker,
    pub grantor_saved_remaining: u32,
    pub grantor_saved_total: u32,
    pub granted_seconds: u32,
}

impl InterjectionContext {
    /// Vom Empfaenger tatsaechlich verbrauchte Zeit
    pub fn verbraucht(&self, restzeit_empfaenger: u32) -> u32 {
        self.granted_seconds.saturating_sub(restzeit_empfaenger)
    }

    /// Restzeit des Hauptredners nach dem Aparte, nie unter 0
    pub fn wiederhergestellt(&self, restzeit_empfaenger: u32) -> u32 {
        self.grantor_saved_remaining
            .saturating_sub(self.verbraucht(restzeit_empfaenger))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Armed,
    Running,
    Paused,
    /// Naechstes `set_time` vergibt ein Aparte an `recipient`
    PreparingInterjection { recipient: Speaker },
    Interjecting(InterjectionContext),
}

impl Phase {
    pub fn art(&self) -> Sitzungsphase {
        match self {
            Self::Idle => Sitzungsphase::Idle,
            Self::Armed => Sitzungsphase::Armed,
            Self::Running => Sitzungsphase::Running,
            Self::Paused => Sitzungsphase::Paused,
            Self::PreparingInterjection { .. } => Sitzungsphase::PreparingInterjection,
            Self::Interjecting(_) => Sitzungsphase::Interjecting,
        }
    }
}

/// Zustand einer Sitzung, gehoert exklusiv dem Controller
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Hat regulaer das Wort
    pub principal_speaker: Option<Speaker>,
    /// Wird gerade getimt (im Aparte der Empfaenger)
    pub live_speaker: Option<Speaker>,
    /// Vom Bediener zuletzt gewaehlter Redner
    pub candidate: Option<Speaker>,
    pub phase: Phase,
    pub uhr: Countdown,
    /// Waehrend laufender Rede per `set_time` vorgemerkt
    pub staged_seconds: Option<u32>,
    pub time_expired: bool,
}

impl SessionState {
    pub fn budget(&self) -> TimeBudget {
        self.uhr.budget()
    }

    pub fn clock_running(&self) -> bool {
        self.uhr.laeuft()
    }

    pub fn interjection(&self) -> Option<&InterjectionContext> {
        match &self.phase {
            Phase::Interjecting(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Ruhephase bei stehender Uhr: Armed sobald Redner und Zeit da sind
    pub(crate) fn ruhephase(&self) -> Phase {
        if self.principal_speaker.is_some() && self.uhr.remaining() > 0 {
            Phase::Armed
        } else {
            Phase::Idle
        }
    }
}
