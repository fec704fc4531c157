//! Sitzungs-Laufzeit
//!
//! Ein einzelner Task besitzt die Redezeit-Steuerung. Bedienbefehle,
//! Relais-Ereignisse und der Sekundentakt kommen ueber Kanaele und werden
//! strikt nacheinander verarbeitet, es gibt keinen geteilten
//! veraenderlichen Zustand.
//!
//! Der Takt laeuft ueber `tokio::time::interval` und wird beim Start der
//! Uhr neu ausgerichtet, damit die erste Sekunde voll zaehlt. Kommt ein
//! Takt mehr als [`TAKT_TOLERANZ`] zu spaet, wird die Rede angehalten.

use crate::broadcast::SnapshotHub;
use crate::config::AppConfig;
use crate::kommando::{Kommando, HILFE};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tribuna_core::{BroadcastSink, SessionSnapshot, Speaker, SpeakerRepository, TribunaError};
use tribuna_floor::{FloorResult, SpeakingTimeController};
use tribuna_relay::{PortInfo, RelaisDienst, RelaisEreignis, RelaisHandle};

/// Abstand der Sekundentakte
pub const TAKT: Duration = Duration::from_secs(1);

/// Erlaubte Verspaetung eines Takts, danach gilt der Taktgeber als gestoert
pub const TAKT_TOLERANZ: Duration = Duration::from_millis(1500);

pub type Steuerung = SpeakingTimeController<RelaisHandle, SnapshotHub>;

/// Rueckmeldung auf einen Bedienbefehl
#[derive(Debug)]
pub enum Antwort {
    Text(String),
    Abgelehnt(String),
    /// Port-Liste folgt aus dem Relais-Thread
    Ports(oneshot::Receiver<Vec<PortInfo>>),
    Beendet,
}

/// Befehl mit Rueckkanal fuer die Antwort
pub struct Anfrage {
    pub kommando: Kommando,
    pub antwort: oneshot::Sender<Antwort>,
}

pub struct Sitzung<R: SpeakerRepository> {
    steuerung: Steuerung,
    roster: R,
    relais: RelaisDienst,
    hub: SnapshotHub,
    config: AppConfig,
    /// Ziel fuer den gemerkten Relais-Port (None = nicht speichern)
    config_pfad: Option<String>,
}

impl<R: SpeakerRepository> Sitzung<R> {
    pub fn neu(
        config: AppConfig,
        config_pfad: Option<String>,
        roster: R,
        relais: RelaisDienst,
        hub: SnapshotHub,
    ) -> Self {
        let steuerung =
            SpeakingTimeController::mit_konfig(relais.handle(), hub.clone(), config.anzeige_konfig());
        Self {
            steuerung,
            roster,
            relais,
            hub,
            config,
            config_pfad,
        }
    }

    pub fn steuerung(&self) -> &Steuerung {
        &self.steuerung
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Hauptschleife bis `beenden`, Ctrl-C oder geschlossenem Befehlskanal
    pub async fn laufen(
        mut self,
        mut anfragen: mpsc::Receiver<Anfrage>,
        mut relais_ereignisse: mpsc::UnboundedReceiver<RelaisEreignis>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        self.relais.handle().verbinden(self.config.relais.port.clone());
        self.hub.publish(&self.steuerung.snapshot());

        let mut takt = tokio::time::interval(TAKT);
        takt.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Erster Tick kommt sofort
        takt.tick().await;

        info!(sitzung = %self.config.sitzung.name, "Sitzung bereit");
        loop {
            tokio::select! {
                biased;

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }

                anfrage = anfragen.recv() => {
                    let Some(Anfrage { kommando, antwort }) = anfrage else {
                        debug!("Befehlskanal geschlossen");
                        break;
                    };
                    let lief = self.steuerung.zustand().clock_running();
                    let ergebnis = self.ausfuehren(kommando);
                    if !lief && self.steuerung.zustand().clock_running() {
                        takt.reset();
                    }
                    let ende = matches!(ergebnis, Antwort::Beendet);
                    let _ = antwort.send(ergebnis);
                    if ende {
                        break;
                    }
                }

                Some(ereignis) = relais_ereignisse.recv() => {
                    self.relais_ereignis(ereignis);
                }

                geplant = takt.tick() => {
                    self.takt(Instant::now().saturating_duration_since(geplant));
                }
            }
        }

        self.abschliessen();
    }

    /// Ein Sekundentakt mit gemessener Verspaetung
    pub fn takt(&mut self, verspaetung: Duration) {
        if !self.steuerung.zustand().clock_running() {
            return;
        }
        if verspaetung > TAKT_TOLERANZ {
            self.steuerung.takt_fehler(verspaetung);
            return;
        }
        self.hub.metriken().ticks_total.inc();
        self.steuerung.on_tick();
    }

    pub fn relais_ereignis(&mut self, ereignis: RelaisEreignis) {
        match ereignis {
            RelaisEreignis::Verbunden { port } => {
                self.steuerung.relay_verbunden(&port);
                if self.config.port_merken(&port) {
                    self.config_speichern();
                }
            }
            RelaisEreignis::Getrennt => self.steuerung.relay_getrennt(),
        }
    }

    fn config_speichern(&self) {
        let Some(pfad) = &self.config_pfad else {
            return;
        };
        match self.config.speichern(pfad) {
            Ok(()) => info!(pfad = %pfad, port = ?self.config.relais.port, "Relais-Port gespeichert"),
            Err(e) => warn!("Relais-Port konnte nicht gespeichert werden: {e}"),
        }
    }

    /// Fuehrt einen Bedienbefehl aus
    pub fn ausfuehren(&mut self, kommando: Kommando) -> Antwort {
        debug!(kommando = ?kommando, "Bedienbefehl");
        match kommando {
            Kommando::Liste(filter) => self.liste(filter.as_deref()),
            Kommando::Waehlen(id) => match self.roster.find(id) {
                Some(speaker) => {
                    self.steuerung.select_speaker(speaker);
                    self.status()
                }
                None => self.abgelehnt(TribunaError::RednerNichtGefunden(id.inner()).to_string()),
            },
            Kommando::Zeit(sekunden) => {
                let r = self.steuerung.set_time(sekunden);
                self.nach_aktion(r)
            }
            Kommando::Preset(n) => match self.config.preset_sekunden(n) {
                Some(sekunden) => {
                    let r = self.steuerung.set_time(sekunden);
                    self.nach_aktion(r)
                }
                None => self.abgelehnt(format!("Preset {n} ist nicht konfiguriert")),
            },
            Kommando::Start => {
                let r = self.steuerung.start();
                self.nach_aktion(r)
            }
            Kommando::StartErzwingen => {
                let r = self.steuerung.start_erzwingen();
                self.nach_aktion(r)
            }
            Kommando::Pause => {
                let r = self.steuerung.pause();
                self.nach_aktion(r)
            }
            Kommando::Stop => {
                self.steuerung.stop();
                self.status()
            }
            Kommando::Plus(Some(sekunden)) => {
                let r = self.steuerung.add_time(sekunden);
                self.nach_aktion(r)
            }
            Kommando::Plus(None) => {
                let r = self.steuerung.add_staged_time();
                self.nach_aktion(r)
            }
            Kommando::Minus(Some(sekunden)) => {
                let r = self.steuerung.sub_time(sekunden);
                self.nach_aktion(r)
            }
            Kommando::Minus(None) => {
                let r = self.steuerung.sub_staged_time();
                self.nach_aktion(r)
            }
            Kommando::Aparte => {
                let r = self.steuerung.begin_interjection_preparation();
                self.nach_aktion(r)
            }
            Kommando::Ende => {
                let r = self.steuerung.end_interjection();
                self.nach_aktion(r)
            }
            Kommando::Status => self.status(),
            Kommando::RelaisVerbinden(port) => {
                let port = port.or_else(|| self.config.relais.port.clone());
                if self.relais.handle().verbinden(port) {
                    Antwort::Text("Relais wird verbunden ...".into())
                } else {
                    self.abgelehnt("Relais-Thread nicht erreichbar".into())
                }
            }
            Kommando::RelaisTrennen => {
                if self.relais.handle().trennen() {
                    Antwort::Text("Relais wird getrennt, Audio frei".into())
                } else {
                    self.abgelehnt("Relais-Thread nicht erreichbar".into())
                }
            }
            Kommando::RelaisPorts => match self.relais.handle().ports_abfragen() {
                Some(rx) => Antwort::Ports(rx),
                None => self.abgelehnt("Relais-Thread nicht erreichbar".into()),
            },
            Kommando::Wechseln(name) => {
                match self.roster.switch_list(tribuna_core::RosterHandle::neu(name)) {
                    Ok(()) => self.liste(None),
                    Err(e) => self.abgelehnt(e.to_string()),
                }
            }
            Kommando::Hilfe => Antwort::Text(HILFE.to_string()),
            Kommando::Beenden => Antwort::Beendet,
        }
    }

    fn nach_aktion(&self, ergebnis: FloorResult<()>) -> Antwort {
        match ergebnis {
            Ok(()) => self.status(),
            Err(e) => self.abgelehnt(e.to_string()),
        }
    }

    fn abgelehnt(&self, grund: String) -> Antwort {
        warn!(grund = %grund, "Aktion abgelehnt");
        self.hub.metriken().aktionen_abgelehnt_total.inc();
        Antwort::Abgelehnt(grund)
    }

    fn status(&self) -> Antwort {
        let snapshot = self.steuerung.snapshot();
        let lower_third = self.hub.lower_third_sichtbar(&snapshot);
        Antwort::Text(status_text(&snapshot, lower_third))
    }

    fn liste(&self, filter: Option<&str>) -> Antwort {
        let redner = match filter {
            Some(f) => self.roster.suchen(f),
            None => self.roster.get_roster(),
        };
        let handle = self.roster.get_active_list_handle();
        if redner.is_empty() {
            return Antwort::Text(format!("Liste '{}': keine Redner", handle.name()));
        }
        let mut text = format!("Liste '{}' ({} Redner):", handle.name(), redner.len());
        for s in &redner {
            text.push_str(&format!("\n  {:>4}  {}", s.id.inner(), s.anzeige()));
        }
        Antwort::Text(text)
    }

    /// Sitzung anhalten, Mikrofon freigeben, Relais trennen
    fn abschliessen(mut self) {
        info!("Sitzung wird beendet");
        self.steuerung.stop();
        self.steuerung.beenden();
        self.relais.herunterfahren();
    }
}

/// Mehrzeilige Zustandsanzeige fuer das Pult
pub fn status_text(s: &SessionSnapshot, lower_third: bool) -> String {
    let name = |r: &Option<Speaker>| {
        r.as_ref()
            .map(Speaker::anzeige)
            .unwrap_or_else(|| "-".into())
    };
    let mut zeilen = vec![format!(
        "[{}] {} / {:02}:{:02}{}",
        s.phase,
        s.restzeit_text(),
        s.total_seconds / 60,
        s.total_seconds % 60,
        if s.clock_running { "  laeuft" } else { "" }
    )];
    zeilen.push(format!("Redner: {}", name(&s.live_speaker)));
    if let Some(aparte) = &s.aparte {
        zeilen.push(format!(
            "Aparte: {} an {}, {} s gewaehrt, Hauptredner behaelt {} s",
            aparte.grantor.anzeige(),
            aparte.recipient.anzeige(),
            aparte.granted_seconds,
            aparte.grantor_saved_remaining
        ));
    } else if s.principal_speaker != s.live_speaker {
        zeilen.push(format!("Hauptredner: {}", name(&s.principal_speaker)));
    }
    if let Some(vorgemerkt) = s.staged_seconds {
        zeilen.push(format!("Vorgemerkt: {vorgemerkt} s"));
    }
    if s.time_expired {
        zeilen.push("REDEZEIT ABGELAUFEN".into());
    }
    if s.warnung {
        zeilen.push("Warnung: Redezeit fast aufgebraucht".into());
    }
    zeilen.push(format!(
        "Relais: {}  Lower Third: {}",
        if s.relay_connected { "verbunden" } else { "NICHT verbunden" },
        if lower_third { "sichtbar" } else { "aus" }
    ));
    zeilen.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribuna_core::{Sitzungsphase, SpeakerId};
    use tribuna_observability::{HealthState, TribunaMetrics};
    use tribuna_relay::{RelaisKonfig, RelayDriver, SpeicherBackend};

    struct Liste(Vec<Speaker>);

    impl SpeakerRepository for Liste {
        fn get_roster(&self) -> Vec<Speaker> {
            self.0.clone()
        }

        fn get_active_list_handle(&self) -> tribuna_core::RosterHandle {
            tribuna_core::RosterHandle::default()
        }

        fn switch_list(&mut self, handle: tribuna_core::RosterHandle) -> tribuna_core::Result<()> {
            Err(TribunaError::ListeNichtGefunden(handle.0))
        }
    }

    fn relais_konfig() -> RelaisKonfig {
        RelaisKonfig {
            anlauf: Duration::ZERO,
            trennen_wartezeit: Duration::ZERO,
            keep_alive_intervall: Duration::from_secs(60),
            pruef_intervall: Duration::from_millis(20),
            reconnect_intervall: Duration::from_millis(20),
            ..RelaisKonfig::default()
        }
    }

    struct Aufbau {
        sitzung: Sitzung<Liste>,
        backend: SpeicherBackend,
        ereignisse: mpsc::UnboundedReceiver<RelaisEreignis>,
    }

    fn aufbau(config_pfad: Option<String>) -> Aufbau {
        let backend = SpeicherBackend::neu();
        backend.port_hinzufuegen("COM3", "Arduino Uno");
        let (tx, ereignisse) = mpsc::unbounded_channel();
        let dienst =
            RelaisDienst::starten(RelayDriver::neu(backend.clone(), relais_konfig()), tx).unwrap();
        let hub = SnapshotHub::neu(HealthState::neu(), TribunaMetrics::neu().unwrap(), 10);
        let liste = Liste(vec![
            Speaker::neu(1, "Joao Silva", "PT"),
            Speaker::neu(2, "Maria Lima", "PL"),
        ]);
        Aufbau {
            sitzung: Sitzung::neu(AppConfig::default(), config_pfad, liste, dienst, hub),
            backend,
            ereignisse,
        }
    }

    fn warte_auf_ereignis(rx: &mut mpsc::UnboundedReceiver<RelaisEreignis>) -> RelaisEreignis {
        let ende = std::time::Instant::now() + Duration::from_secs(2);
        while std::time::Instant::now() < ende {
            if let Ok(e) = rx.try_recv() {
                return e;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("kein Relais-Ereignis");
    }

    fn text(a: Antwort) -> String {
        match a {
            Antwort::Text(t) => t,
            andere => panic!("Text erwartet, bekommen: {andere:?}"),
        }
    }

    #[test]
    fn rede_ueber_befehle() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        text(s.ausfuehren(Kommando::Waehlen(SpeakerId(1))));
        text(s.ausfuehren(Kommando::Preset(1)));
        assert_eq!(s.steuerung().zustand().phase.art(), Sitzungsphase::Armed);

        let status = text(s.ausfuehren(Kommando::Start));
        assert!(status.contains("Joao Silva (PT)"));
        for _ in 0..3 {
            s.takt(Duration::from_millis(5));
        }
        assert_eq!(s.steuerung().budget().remaining_seconds, 57);
        assert_eq!(s.hub.metriken().ticks_total.get(), 3);

        text(s.ausfuehren(Kommando::Pause));
        s.takt(Duration::ZERO);
        assert_eq!(s.steuerung().budget().remaining_seconds, 57);
    }

    #[test]
    fn abgelehnte_befehle_werden_gezaehlt() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        assert!(matches!(s.ausfuehren(Kommando::Waehlen(SpeakerId(99))), Antwort::Abgelehnt(_)));
        assert!(matches!(s.ausfuehren(Kommando::Start), Antwort::Abgelehnt(_)));
        assert!(matches!(s.ausfuehren(Kommando::Preset(42)), Antwort::Abgelehnt(_)));
        assert!(matches!(
            s.ausfuehren(Kommando::Wechseln("extra".into())),
            Antwort::Abgelehnt(_)
        ));
        assert_eq!(s.hub.metriken().aktionen_abgelehnt_total.get(), 4);
        assert_eq!(s.steuerung().zustand().phase.art(), Sitzungsphase::Idle);
    }

    #[test]
    fn aparte_ueber_befehle() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        s.ausfuehren(Kommando::Waehlen(SpeakerId(1)));
        s.ausfuehren(Kommando::Zeit(300));
        s.ausfuehren(Kommando::Start);
        s.takt(Duration::ZERO);

        // Empfaenger zuerst waehlen, die Uhr des Hauptredners laeuft weiter
        s.ausfuehren(Kommando::Waehlen(SpeakerId(2)));
        assert_eq!(s.steuerung().zustand().phase.art(), Sitzungsphase::Running);
        text(s.ausfuehren(Kommando::Aparte));
        let status = text(s.ausfuehren(Kommando::Zeit(60)));
        assert!(status.contains("Aparte: Joao Silva (PT) an Maria Lima (PL)"));

        for _ in 0..20 {
            s.takt(Duration::ZERO);
        }
        text(s.ausfuehren(Kommando::Ende));
        // 299 gespeichert, 60 geliehen, 20 verbraucht
        assert_eq!(s.steuerung().budget().remaining_seconds, 279);
        assert_eq!(s.steuerung().zustand().phase.art(), Sitzungsphase::Running);
        assert_eq!(s.hub.metriken().apartes_total.get(), 1);
    }

    #[test]
    fn verspaeteter_takt_haelt_an() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        s.ausfuehren(Kommando::Waehlen(SpeakerId(1)));
        s.ausfuehren(Kommando::Zeit(120));
        s.ausfuehren(Kommando::Start);
        s.takt(Duration::from_millis(2500));

        assert_eq!(s.steuerung().zustand().phase.art(), Sitzungsphase::Paused);
        assert!(!s.steuerung().zustand().clock_running());
        assert_eq!(s.steuerung().budget().remaining_seconds, 120);
        assert_eq!(s.hub.metriken().takt_stoerungen_total.get(), 1);
    }

    #[test]
    fn plus_ohne_argument_nutzt_vorgemerkte_zeit() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        s.ausfuehren(Kommando::Waehlen(SpeakerId(1)));
        s.ausfuehren(Kommando::Zeit(60));
        s.ausfuehren(Kommando::Start);
        let status = text(s.ausfuehren(Kommando::Zeit(30)));
        assert!(status.contains("Vorgemerkt: 30 s"));
        text(s.ausfuehren(Kommando::Plus(None)));
        assert_eq!(s.steuerung().budget().remaining_seconds, 90);
        assert!(matches!(s.ausfuehren(Kommando::Plus(None)), Antwort::Abgelehnt(_)));
    }

    #[test]
    fn relais_verbindung_wird_gemerkt() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("tribuna.toml");
        let pfad = pfad.to_str().unwrap().to_string();
        let mut a = aufbau(Some(pfad.clone()));

        text(a.sitzung.ausfuehren(Kommando::RelaisVerbinden(None)));
        let ereignis = warte_auf_ereignis(&mut a.ereignisse);
        assert_eq!(ereignis, RelaisEreignis::Verbunden { port: "COM3".into() });
        a.sitzung.relais_ereignis(ereignis);

        assert!(a.sitzung.steuerung().relay_connected());
        assert_eq!(a.sitzung.config().relais.port.as_deref(), Some("COM3"));
        let gespeichert = AppConfig::laden(&pfad).unwrap();
        assert_eq!(gespeichert.relais.port.as_deref(), Some("COM3"));
    }

    #[test]
    fn laufende_rede_oeffnet_nach_reconnect() {
        let mut a = aufbau(None);
        a.sitzung.ausfuehren(Kommando::Waehlen(SpeakerId(1)));
        a.sitzung.ausfuehren(Kommando::Zeit(60));
        a.sitzung.ausfuehren(Kommando::Start);

        a.sitzung.ausfuehren(Kommando::RelaisVerbinden(None));
        let ereignis = warte_auf_ereignis(&mut a.ereignisse);
        a.sitzung.relais_ereignis(ereignis);

        // Verbinden kappt, danach setzt die laufende Rede die Freigabe
        let ende = std::time::Instant::now() + Duration::from_secs(2);
        while a.backend.geschriebene_bytes().last() != Some(&b'1') {
            assert!(std::time::Instant::now() < ende, "Freigabe fehlt");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn ports_kommen_asynchron() {
        let mut a = aufbau(None);
        match a.sitzung.ausfuehren(Kommando::RelaisPorts) {
            Antwort::Ports(rx) => {
                let ports = rx.blocking_recv().unwrap();
                assert_eq!(ports[0].device, "COM3");
            }
            andere => panic!("Ports erwartet, bekommen: {andere:?}"),
        }
    }

    #[test]
    fn liste_mit_filter() {
        let mut a = aufbau(None);
        let t = text(a.sitzung.ausfuehren(Kommando::Liste(Some("lima".into()))));
        assert!(t.contains("Maria Lima"));
        assert!(!t.contains("Joao"));
    }

    #[tokio::test]
    async fn laufen_endet_mit_beenden() {
        let a = aufbau(None);
        let (tx, rx) = mpsc::channel(8);
        let (_ereignis_tx, ereignis_rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let lauf = tokio::spawn(a.sitzung.laufen(rx, ereignis_rx, shutdown_rx));

        let (antwort_tx, antwort_rx) = oneshot::channel();
        tx.send(Anfrage {
            kommando: Kommando::Status,
            antwort: antwort_tx,
        })
        .await
        .unwrap();
        assert!(text(antwort_rx.await.unwrap()).contains("[idle]"));

        let (antwort_tx, antwort_rx) = oneshot::channel();
        tx.send(Anfrage {
            kommando: Kommando::Beenden,
            antwort: antwort_tx,
        })
        .await
        .unwrap();
        assert!(matches!(antwort_rx.await.unwrap(), Antwort::Beendet));
        lauf.await.unwrap();
    }

    #[test]
    fn status_zeigt_ablauf() {
        let mut a = aufbau(None);
        let s = &mut a.sitzung;
        s.ausfuehren(Kommando::Waehlen(SpeakerId(2)));
        s.ausfuehren(Kommando::Zeit(2));
        s.ausfuehren(Kommando::Start);
        s.takt(Duration::ZERO);
        s.takt(Duration::ZERO);
        let t = text(s.ausfuehren(Kommando::Status));
        assert!(t.contains("REDEZEIT ABGELAUFEN"));
        assert!(t.contains("[paused] 00:00 / 00:02"));
    }
}
