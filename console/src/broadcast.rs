//! Snapshot-Hub – verteilt Sitzungszustand und Hinweise
//!
//! Der Hub ist die [`BroadcastSink`] der Steuerung. Snapshots landen in
//! einem `watch`-Kanal (Abnehmer sehen immer nur den neuesten Stand),
//! Hinweise in einem `broadcast`-Kanal (jeder Abnehmer bekommt jeden).
//! Nebenbei werden Health-Status und Metriken nachgefuehrt.
//!
//! Clone teilt den inneren Zustand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};
use tribuna_core::{BroadcastSink, Hinweis, SessionSnapshot};
use tribuna_observability::{HealthState, TribunaMetrics};

/// Groesse des Hinweis-Puffers pro Abnehmer
const HINWEIS_PUFFER: usize = 64;

#[derive(Clone)]
pub struct SnapshotHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    snapshots: watch::Sender<Option<SessionSnapshot>>,
    hinweise: broadcast::Sender<Hinweis>,
    health: HealthState,
    metriken: TribunaMetrics,
    /// War im letzten Snapshot ein Aparte aktiv (fuer den Zaehler)
    aparte_aktiv: AtomicBool,
    lower_third_verzoegerung_s: u32,
}

impl SnapshotHub {
    pub fn neu(health: HealthState, metriken: TribunaMetrics, lower_third_verzoegerung_s: u32) -> Self {
        let (snapshots, _) = watch::channel(None);
        let (hinweise, _) = broadcast::channel(HINWEIS_PUFFER);
        Self {
            inner: Arc::new(HubInner {
                snapshots,
                hinweise,
                health,
                metriken,
                aparte_aktiv: AtomicBool::new(false),
                lower_third_verzoegerung_s,
            }),
        }
    }

    /// Empfaenger fuer den jeweils neuesten Snapshot
    pub fn abonnieren(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    pub fn hinweise_abonnieren(&self) -> broadcast::Receiver<Hinweis> {
        self.inner.hinweise.subscribe()
    }

    /// Zuletzt veroeffentlichter Snapshot
    pub fn aktuell(&self) -> Option<SessionSnapshot> {
        self.inner.snapshots.borrow().clone()
    }

    pub fn metriken(&self) -> &TribunaMetrics {
        &self.inner.metriken
    }

    /// Lower Third erst einblenden, wenn die Rede eine Weile laeuft
    pub fn lower_third_sichtbar(&self, snapshot: &SessionSnapshot) -> bool {
        lower_third_sichtbar(snapshot, self.inner.lower_third_verzoegerung_s)
    }
}

pub fn lower_third_sichtbar(snapshot: &SessionSnapshot, verzoegerung_s: u32) -> bool {
    let gelaufen = snapshot
        .total_seconds
        .saturating_sub(snapshot.remaining_seconds);
    snapshot.live_speaker.is_some() && snapshot.clock_running && gelaufen >= verzoegerung_s
}

/// Kurztext eines Hinweises fuer das Pult
pub fn hinweis_text(hinweis: &Hinweis) -> String {
    match hinweis {
        Hinweis::ZeitAbgelaufen { speaker: Some(s) } => {
            format!("*** Redezeit abgelaufen: {} ***", s.anzeige())
        }
        Hinweis::ZeitAbgelaufen { speaker: None } => "*** Redezeit abgelaufen ***".into(),
        Hinweis::AparteBeendet {
            recipient,
            verbraucht,
            grund,
        } => format!(
            "Aparte von {} beendet ({grund:?}), {verbraucht} s verbraucht",
            recipient.anzeige()
        ),
        Hinweis::RelaisVerbunden { port } => format!("Relais verbunden an {port}"),
        Hinweis::RelaisGetrennt => "!!! Relais getrennt, Mikrofon nicht steuerbar !!!".into(),
        Hinweis::TaktGestoert { verspaetung_ms } => format!(
            "!!! Taktgeber gestoert ({verspaetung_ms} ms zu spaet), Rede angehalten !!!"
        ),
    }
}

impl BroadcastSink for SnapshotHub {
    fn publish(&self, snapshot: &SessionSnapshot) {
        let inner = &self.inner;
        inner.health.aktualisieren(snapshot);
        inner
            .metriken
            .restzeit_sekunden
            .set(i64::from(snapshot.remaining_seconds));
        inner
            .metriken
            .relais_verbunden
            .set(i64::from(snapshot.relay_connected));

        let vorher = inner
            .aparte_aktiv
            .swap(snapshot.interjection_active, Ordering::Relaxed);
        if snapshot.interjection_active && !vorher {
            inner.metriken.apartes_total.inc();
        }

        inner.snapshots.send_replace(Some(snapshot.clone()));
    }

    fn melden(&self, hinweis: &Hinweis) {
        let inner = &self.inner;
        match hinweis {
            Hinweis::ZeitAbgelaufen { speaker } => {
                inner.metriken.zeit_abgelaufen_total.inc();
                warn!(redner = ?speaker.as_ref().map(|s| s.id), "Hinweis: Redezeit abgelaufen");
            }
            Hinweis::AparteBeendet {
                recipient,
                verbraucht,
                grund,
            } => {
                info!(redner = %recipient.id, verbraucht, grund = ?grund, "Hinweis: Aparte beendet");
            }
            Hinweis::RelaisVerbunden { port } => {
                info!(port = %port, "Hinweis: Relais verbunden");
            }
            Hinweis::RelaisGetrennt => {
                warn!("Hinweis: Relais getrennt");
            }
            Hinweis::TaktGestoert { verspaetung_ms } => {
                inner.metriken.takt_stoerungen_total.inc();
                inner.health.takt_gestoert_setzen(true);
                error!(verspaetung_ms, "Hinweis: Taktgeber gestoert");
            }
        }
        // Ohne Abnehmer geht der Hinweis nur ins Log
        let _ = inner.hinweise.send(hinweis.clone());
    }
}
