//! Countdown – Sekunden-Uhr der Redezeit
//!
//! Die Uhr zaehlt nur; den Takt liefert ein externer, gleichmaessiger
//! Sekundengeber. Was "zuruecksetzen" bedeutet, entscheidet der
//! Controller. Nicht thread-safe.

use serde::{Deserialize, Serialize};

/// Redezeit-Budget in Sekunden
///
/// `remaining_seconds` darf durch manuelles Verlaengern ueber
/// `total_seconds` liegen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeBudget {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
}

impl TimeBudget {
    /// Volles Budget
    pub fn voll(sekunden: u32) -> Self {
        Self {
            total_seconds: sekunden,
            remaining_seconds: sekunden,
        }
    }
}

/// Signal von [`Countdown::stop`]: der Aufrufer soll das Budget zuruecksetzen
#[must_use = "stop() meldet nur; zuruecksetzen muss der Aufrufer"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zuruecksetzen;

#[derive(Debug, Clone, Default)]
pub struct Countdown {
    budget: TimeBudget,
    laeuft: bool,
}

impl Countdown {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Startet das Zaehlen; gibt false zurueck wenn die Uhr schon lief
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.laeuft, true)
    }

    pub fn pause(&mut self) {
        self.laeuft = false;
    }

    pub fn stop(&mut self) -> Zuruecksetzen {
        self.laeuft = false;
        Zuruecksetzen
    }

    /// Eine Sekunde abziehen
    ///
    /// Gibt true zurueck wenn genau dieser Tick auf null gefallen ist.
    /// Bei stehender Uhr passiert nichts.
    pub fn tick(&mut self) -> bool {
        if !self.laeuft || self.budget.remaining_seconds == 0 {
            return false;
        }
        self.budget.remaining_seconds -= 1;
        self.budget.remaining_seconds == 0
    }

    /// Restzeit um ein vorzeichenbehaftetes Delta verschieben (unten bei 0 gekappt)
    ///
    /// Gibt das tatsaechlich angewendete Delta zurueck.
    pub fn add(&mut self, delta: i64) -> i64 {
        let alt = i64::from(self.budget.remaining_seconds);
        let neu = (alt + delta).clamp(0, i64::from(u32::MAX));
        self.budget.remaining_seconds = neu as u32;
        neu - alt
    }

    pub fn subtract(&mut self, sekunden: u32) -> i64 {
        self.add(-i64::from(sekunden))
    }

    /// Setzt Total und Restzeit auf denselben Wert
    pub fn set(&mut self, sekunden: u32) {
        self.budget = TimeBudget::voll(sekunden);
    }

    pub fn set_budget(&mut self, budget: TimeBudget) {
        self.budget = budget;
    }

    pub fn set_total(&mut self, sekunden: u32) {
        self.budget.total_seconds = sekunden;
    }

    /// Restzeit auf das Total zuruecksetzen
    pub fn auf_total(&mut self, _signal: Zuruecksetzen) {
        self.budget.remaining_seconds = self.budget.total_seconds;
    }

    pub fn budget(&self) -> TimeBudget {
        self.budget
    }

    pub fn remaining(&self) -> u32 {
        self.budget.remaining_seconds
    }

    pub fn total(&self) -> u32 {
        self.budget.total_seconds
    }

    pub fn laeuft(&self) -> bool {
        self.laeuft
    }
}
