//! Aufzeichnende Fakes fuer Relais und Broadcast-Senke

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use tribuna_core::{AudioGate, BroadcastSink, Hinweis, SessionSnapshot, Speaker};
use tribuna_floor::SpeakingTimeController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relais {
    Offen,
    Gekappt,
}

/// Zeichnet jedes Relais-Kommando auf
#[derive(Clone, Default)]
pub struct RelaisAufnahme(Arc<Mutex<Vec<Relais>>>);

impl RelaisAufnahme {
    pub fn kommandos(&self) -> Vec<Relais> {
        self.0.lock().clone()
    }

    pub fn letztes(&self) -> Option<Relais> {
        self.0.lock().last().copied()
    }
}

impl AudioGate for RelaisAufnahme {
    fn open(&mut self) {
        self.0.lock().push(Relais::Offen);
    }

    fn cut(&mut self) {
        self.0.lock().push(Relais::Gekappt);
    }
}

/// Zeichnet Snapshots und Hinweise auf
#[derive(Clone, Default)]
pub struct SenkeAufnahme {
    snapshots: Arc<Mutex<Vec<SessionSnapshot>>>,
    hinweise: Arc<Mutex<Vec<Hinweis>>>,
}

impl SenkeAufnahme {
    pub fn letzter(&self) -> SessionSnapshot {
        self.snapshots
            .lock()
            .last()
            .cloned()
            .expect("noch kein Snapshot veroeffentlicht")
    }

    pub fn anzahl(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn hinweise(&self) -> Vec<Hinweis> {
        self.hinweise.lock().clone()
    }

    pub fn abgelaufen_meldungen(&self) -> usize {
        self.hinweise
            .lock()
            .iter()
            .filter(|h| matches!(h, Hinweis::ZeitAbgelaufen { .. }))
            .count()
    }
}

impl BroadcastSink for SenkeAufnahme {
    fn publish(&self, snapshot: &SessionSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn melden(&self, hinweis: &Hinweis) {
        self.hinweise.lock().push(hinweis.clone());
    }
}

pub type Steuerung = SpeakingTimeController<RelaisAufnahme, SenkeAufnahme>;

pub fn aufbau() -> (Steuerung, RelaisAufnahme, SenkeAufnahme) {
    let relais = RelaisAufnahme::default();
    let senke = SenkeAufnahme::default();
    let c = SpeakingTimeController::neu(relais.clone(), senke.clone());
    (c, relais, senke)
}

pub fn joao() -> Speaker {
    Speaker::neu(1, "Joao Silva", "PT")
}

pub fn maria() -> Speaker {
    Speaker::neu(2, "Maria Lima", "PL")
}

pub fn ana() -> Speaker {
    Speaker::neu(3, "Ana Souza", "PV")
}

/// Hauptredner mit laufender Uhr
pub fn laufende_rede(sekunden: u32) -> (Steuerung, RelaisAufnahme, SenkeAufnahme) {
    let (mut c, r, s) = aufbau();
    c.select_speaker(joao());
    c.set_time(sekunden).unwrap();
    c.start().unwrap();
    (c, r, s)
}

/// Laufende Rede mit vergebenem Aparte an Maria
pub fn aparte(rest: u32, gewaehrt: u32) -> (Steuerung, RelaisAufnahme, SenkeAufnahme) {
    let (mut c, r, s) = laufende_rede(rest);
    c.select_speaker(maria());
    c.begin_interjection_preparation().unwrap();
    c.set_time(gewaehrt).unwrap();
    (c, r, s)
}

pub fn ticks(c: &mut Steuerung, n: u32) {
    for _ in 0..n {
        c.on_tick();
    }
}
