//! Relais-Thread
//!
//! Der [`RelayDriver`] laeuft in einem eigenen Thread, damit serielle
//! Schreibzugriffe (und die Anlaufzeit beim Verbinden) nie den
//! Sekundentakt der Redezeit-Steuerung blockieren. Kommandos kommen ueber
//! einen crossbeam-Kanal, Statusaenderungen gehen als [`RelaisEreignis`]
//! ueber einen tokio-Kanal an die Steuerung zurueck.
//!
//! Der Thread plant Keep-Alive, Lebendpruefung und Reconnect selbst ueber
//! `recv_timeout` bis zur naechsten Frist.

use crate::backend::{PortInfo, SerialBackend};
use crate::driver::RelayDriver;
use crate::error::{RelayError, RelayResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tribuna_core::AudioGate;

/// Kleinstes Intervall fuer periodische Aufgaben im Thread
const MIN_INTERVALL: Duration = Duration::from_millis(10);

/// Kommandos an den Relais-Thread
#[derive(Debug)]
pub enum RelaisBefehl {
    /// Verbinden, optional mit bevorzugtem Port
    Verbinden(Option<String>),
    /// Freigeben, schliessen, Reconnect abbrechen
    Trennen,
    Oeffnen,
    Kappen,
    /// Aufzaehlbare Ports abfragen
    PortsAuflisten(oneshot::Sender<Vec<PortInfo>>),
    Beenden,
}

/// Statusaenderungen, die der Thread an die Steuerung meldet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaisEreignis {
    /// Verbindung (neu) hergestellt, Audio ist gekappt
    Verbunden { port: String },
    Getrennt,
}

// ---------------------------------------------------------------------------
// RelaisHandle
// ---------------------------------------------------------------------------

/// Klonbarer Zugriff auf den Relais-Thread
///
/// Alle Aufrufe sind fire-and-forget. Ist die Warteschlange voll, wird
/// das Kommando verworfen und gewarnt; der Sekundentakt wartet nie.
#[derive(Clone)]
pub struct RelaisHandle {
    tx: Sender<RelaisBefehl>,
}

impl RelaisHandle {
    fn senden(&self, befehl: RelaisBefehl) -> bool {
        match self.tx.try_send(befehl) {
            Ok(()) => true,
            Err(TrySendError::Full(b)) => {
                warn!(befehl = ?b, "Relais-Warteschlange voll, Kommando verworfen");
                false
            }
            Err(TrySendError::Disconnected(b)) => {
                debug!(befehl = ?b, "Relais-Thread beendet, Kommando verworfen");
                false
            }
        }
    }

    pub fn verbinden(&self, port: Option<String>) -> bool {
        self.senden(RelaisBefehl::Verbinden(port))
    }

    pub fn trennen(&self) -> bool {
        self.senden(RelaisBefehl::Trennen)
    }

    /// Fragt die Port-Liste ab; die Antwort kommt ueber den Receiver
    pub fn ports_abfragen(&self) -> Option<oneshot::Receiver<Vec<PortInfo>>> {
        let (tx, rx) = oneshot::channel();
        self.senden(RelaisBefehl::PortsAuflisten(tx)).then_some(rx)
    }
}

impl AudioGate for RelaisHandle {
    fn open(&mut self) {
        self.senden(RelaisBefehl::Oeffnen);
    }

    fn cut(&mut self) {
        self.senden(RelaisBefehl::Kappen);
    }
}

// ---------------------------------------------------------------------------
// RelaisDienst
// ---------------------------------------------------------------------------

/// Besitzt den Relais-Thread
///
/// Beim Drop (oder [`RelaisDienst::herunterfahren`]) trennt der Thread
/// das Relais, das Audio ist danach freigegeben.
pub struct RelaisDienst {
    handle: RelaisHandle,
    thread: Option<JoinHandle<()>>,
}

impl RelaisDienst {
    /// Startet den Thread mit dem uebergebenen Treiber
    pub fn starten<B: SerialBackend + 'static>(
        driver: RelayDriver<B>,
        ereignisse: mpsc::UnboundedSender<RelaisEreignis>,
    ) -> RelayResult<Self> {
        let (tx, rx) = bounded::<RelaisBefehl>(64);
        let thread = std::thread::Builder::new()
            .name("tribuna-relais".to_string())
            .spawn(move || relais_thread(driver, rx, ereignisse))
            .map_err(|e| RelayError::Thread(e.to_string()))?;

        info!("Relais-Thread gestartet");
        Ok(Self {
            handle: RelaisHandle { tx },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> RelaisHandle {
        self.handle.clone()
    }

    /// Trennt das Relais und wartet auf das Thread-Ende
    pub fn herunterfahren(mut self) {
        self.beenden();
    }

    fn beenden(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        // Blockierendes send: das Beenden darf nicht verloren gehen
        let _ = self.handle.tx.send(RelaisBefehl::Beenden);
        if thread.join().is_err() {
            warn!("Relais-Thread ist mit Panic beendet worden");
        }
        info!("Relais-Thread beendet");
    }
}

impl Drop for RelaisDienst {
    fn drop(&mut self) {
        self.beenden();
    }
}

// ---------------------------------------------------------------------------
// Thread-Schleife
// ---------------------------------------------------------------------------

struct Melder {
    tx: mpsc::UnboundedSender<RelaisEreignis>,
    verbunden: bool,
    gemeldete_nr: u64,
}

impl Melder {
    /// Meldet Verbindungswechsel und jede neue Verbindung
    fn pruefen<B: SerialBackend>(&mut self, driver: &RelayDriver<B>) {
        let jetzt_verbunden = driver.is_connected();
        if jetzt_verbunden && driver.verbindungs_nr() != self.gemeldete_nr {
            self.gemeldete_nr = driver.verbindungs_nr();
            let port = driver.port_name().unwrap_or_default().to_string();
            let _ = self.tx.send(RelaisEreignis::Verbunden { port });
        } else if self.verbunden && !jetzt_verbunden {
            let _ = self.tx.send(RelaisEreignis::Getrennt);
        }
        self.verbunden = jetzt_verbunden;
    }
}

fn relais_thread<B: SerialBackend>(
    mut driver: RelayDriver<B>,
    rx: Receiver<RelaisBefehl>,
    ereignisse: mpsc::UnboundedSender<RelaisEreignis>,
) {
    let keep_alive_intervall = driver.konfig().keep_alive_intervall.max(MIN_INTERVALL);
    let pruef_intervall = driver.konfig().pruef_intervall.max(MIN_INTERVALL);

    let mut melder = Melder {
        tx: ereignisse,
        verbunden: driver.is_connected(),
        gemeldete_nr: driver.verbindungs_nr(),
    };
    let mut naechster_keep_alive = Instant::now() + keep_alive_intervall;
    let mut naechste_pruefung = Instant::now() + pruef_intervall;

    loop {
        let mut frist = naechster_keep_alive.min(naechste_pruefung);
        if let Some(r) = driver.naechster_reconnect() {
            frist = frist.min(r);
        }
        let warten = frist.saturating_duration_since(Instant::now());

        match rx.recv_timeout(warten) {
            Ok(RelaisBefehl::Beenden) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(befehl) => ausfuehren(&mut driver, befehl),
            Err(RecvTimeoutError::Timeout) => {}
        }

        let jetzt = Instant::now();
        if driver.reconnect_faellig(jetzt) {
            driver.reconnect_versuchen();
        }
        if jetzt >= naechste_pruefung {
            if driver.is_connected() {
                driver.check_connection();
            }
            naechste_pruefung = jetzt + pruef_intervall;
        }
        if jetzt >= naechster_keep_alive {
            if driver.is_connected() {
                driver.keep_alive();
            }
            naechster_keep_alive = jetzt + keep_alive_intervall;
        }
        melder.pruefen(&driver);
    }

    driver.disconnect();
    melder.pruefen(&driver);
}

fn ausfuehren<B: SerialBackend>(driver: &mut RelayDriver<B>, befehl: RelaisBefehl) {
    match befehl {
        RelaisBefehl::Verbinden(port) => {
            driver.reconnect_abbrechen();
            let port = port.or_else(|| driver.port_name().map(str::to_string));
            if !driver.connect(port.as_deref()) {
                warn!("Relais-Verbindung fehlgeschlagen");
            }
        }
        RelaisBefehl::Trennen => driver.disconnect(),
        RelaisBefehl::Oeffnen => {
            driver.open();
        }
        RelaisBefehl::Kappen => {
            driver.cut();
        }
        RelaisBefehl::PortsAuflisten(antwort) => {
            let _ = antwort.send(driver.list_ports());
        }
        RelaisBefehl::Beenden => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SpeicherBackend;
    use crate::driver::RelaisKonfig;

    fn konfig() -> RelaisKonfig {
        RelaisKonfig {
            anlauf: Duration::ZERO,
            trennen_wartezeit: Duration::ZERO,
            reconnect_intervall: Duration::from_millis(20),
            keep_alive_intervall: Duration::from_secs(60),
            pruef_intervall: Duration::from_millis(20),
            ..RelaisKonfig::default()
        }
    }

    fn warte_auf(
        rx: &mut mpsc::UnboundedReceiver<RelaisEreignis>,
        dauer: Duration,
    ) -> Option<RelaisEreignis> {
        let ende = Instant::now() + dauer;
        while Instant::now() < ende {
            if let Ok(e) = rx.try_recv() {
                return Some(e);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    fn ohne_keep_alive(bytes: Vec<u8>) -> Vec<u8> {
        bytes.into_iter().filter(|b| *b != b'?').collect()
    }

    #[test]
    fn kommandos_in_reihenfolge() {
        let b = SpeicherBackend::neu();
        b.port_hinzufuegen("COM3", "Arduino Uno");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dienst = RelaisDienst::starten(RelayDriver::neu(b.clone(), konfig()), tx).unwrap();
        let mut h = dienst.handle();

        h.verbinden(None);
        assert_eq!(
            warte_auf(&mut rx, Duration::from_secs(2)),
            Some(RelaisEreignis::Verbunden { port: "COM3".into() })
        );
        h.open();
        h.cut();
        dienst.herunterfahren();

        // connect kappt, open, cut, Trennen beim Beenden gibt frei
        assert_eq!(ohne_keep_alive(b.geschriebene_bytes()), b"0101".to_vec());
        assert_eq!(
            warte_auf(&mut rx, Duration::from_secs(1)),
            Some(RelaisEreignis::Getrennt)
        );
    }

    #[test]
    fn verlorener_port_wird_wieder_verbunden() {
        let b = SpeicherBackend::neu();
        b.port_hinzufuegen("COM3", "Arduino Uno");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dienst = RelaisDienst::starten(RelayDriver::neu(b.clone(), konfig()), tx).unwrap();
        let h = dienst.handle();

        h.verbinden(Some("COM3".into()));
        assert!(matches!(
            warte_auf(&mut rx, Duration::from_secs(2)),
            Some(RelaisEreignis::Verbunden { .. })
        ));

        b.port_entfernen("COM3");
        assert_eq!(
            warte_auf(&mut rx, Duration::from_secs(2)),
            Some(RelaisEreignis::Getrennt)
        );

        b.port_hinzufuegen("COM3", "Arduino Uno");
        assert_eq!(
            warte_auf(&mut rx, Duration::from_secs(2)),
            Some(RelaisEreignis::Verbunden { port: "COM3".into() })
        );
        // Nach dem Reconnect wurde erneut gekappt
        assert_eq!(ohne_keep_alive(b.geschrieben_auf("COM3")), b"00".to_vec());
        dienst.herunterfahren();
    }

    #[test]
    fn trennen_bricht_reconnect_ab() {
        let b = SpeicherBackend::neu();
        b.port_hinzufuegen("COM3", "Arduino Uno");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dienst = RelaisDienst::starten(RelayDriver::neu(b.clone(), konfig()), tx).unwrap();
        let h = dienst.handle();

        h.verbinden(None);
        assert!(warte_auf(&mut rx, Duration::from_secs(2)).is_some());
        b.port_entfernen("COM3");
        assert_eq!(
            warte_auf(&mut rx, Duration::from_secs(2)),
            Some(RelaisEreignis::Getrennt)
        );

        h.trennen();
        std::thread::sleep(Duration::from_millis(50));
        b.port_hinzufuegen("COM3", "Arduino Uno");
        assert_eq!(warte_auf(&mut rx, Duration::from_millis(300)), None);
        dienst.herunterfahren();
    }

    #[test]
    fn ports_abfragen_liefert_liste() {
        let b = SpeicherBackend::neu();
        b.port_hinzufuegen("COM3", "Arduino Uno");
        b.port_hinzufuegen("COM4", "CH340");
        let (tx, _rx) = mpsc::unbounded_channel();
        let dienst = RelaisDienst::starten(RelayDriver::neu(b, konfig()), tx).unwrap();

        let antwort = dienst.handle().ports_abfragen().unwrap();
        let ports = antwort.blocking_recv().unwrap();
        assert_eq!(ports.len(), 2);
        dienst.herunterfahren();
    }

    #[test]
    fn drop_des_dienstes_gibt_frei() {
        let b = SpeicherBackend::neu();
        b.port_hinzufuegen("COM3", "Arduino Uno");
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let dienst =
                RelaisDienst::starten(RelayDriver::neu(b.clone(), konfig()), tx).unwrap();
            dienst.handle().verbinden(None);
            assert!(warte_auf(&mut rx, Duration::from_secs(2)).is_some());
        }
        assert_eq!(ohne_keep_alive(b.geschriebene_bytes()).last(), Some(&b'1'));
    }
}
