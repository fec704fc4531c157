//! RelayDriver – Fail-Safe-Steuerung des Podium-Relais
//!
//! Der Treiber besitzt die serielle Verbindung exklusiv. Jeder
//! Hardwarefehler wird hier abgefangen und in einen Verbindungsstatus
//! umgewandelt; nach oben gehen nur `bool`-Werte.
//!
//! Zeitsteuerung (Reconnect-Intervall, Keep-Alive, Pruefung) liegt beim
//! Aufrufer, siehe [`crate::worker`]. Der Treiber merkt sich nur, ab wann
//! ein Reconnect faellig ist.

use crate::backend::{PortInfo, RelayLink, SerialBackend, SystemSerial};
use crate::polarity::{AudioZustand, RelaisPolaritaet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Laufzeit-Konfiguration des Relais-Treibers
#[derive(Debug, Clone)]
pub struct RelaisKonfig {
    pub baudrate: u32,
    /// Schreib-Timeout der seriellen Verbindung
    pub timeout: Duration,
    pub polaritaet: RelaisPolaritaet,
    /// No-Op-Byte fuer den Watchdog auf dem Board
    pub keep_alive_byte: u8,
    /// Teilstrings der Port-Beschreibung, die bei Auto-Erkennung bevorzugt werden
    pub hersteller_signaturen: Vec<String>,
    /// Wartezeit nach dem Oeffnen (Board-Reset durch DTR)
    pub anlauf: Duration,
    /// Wartezeit zwischen Freigabe und Schliessen beim Trennen
    pub trennen_wartezeit: Duration,
    pub reconnect_intervall: Duration,
    pub keep_alive_intervall: Duration,
    pub pruef_intervall: Duration,
    pub auto_reconnect: bool,
}

impl Default for RelaisKonfig {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            timeout: Duration::from_secs(1),
            polaritaet: RelaisPolaritaet::default(),
            keep_alive_byte: b'?',
            hersteller_signaturen: vec!["Arduino".into(), "CH340".into()],
            anlauf: Duration::from_secs(2),
            trennen_wartezeit: Duration::from_millis(200),
            reconnect_intervall: Duration::from_secs(3),
            keep_alive_intervall: Duration::from_secs(2),
            pruef_intervall: Duration::from_secs(1),
            auto_reconnect: true,
        }
    }
}

// ---------------------------------------------------------------------------
// RelayDriver
// ---------------------------------------------------------------------------

/// Treiber fuer das serielle Relais-Board
pub struct RelayDriver<B: SerialBackend = SystemSerial> {
    backend: B,
    konfig: RelaisKonfig,
    link: Option<Box<dyn RelayLink>>,
    /// Zuletzt verbundener Port (bleibt nach Verbindungsverlust fuer den Reconnect)
    port_name: Option<String>,
    auto_reconnect: bool,
    reconnect_faellig: Option<Instant>,
    letzter_zustand: Option<AudioZustand>,
    /// Zaehlt erfolgreiche Verbindungen (auch Reconnects)
    verbindungs_nr: u64,
}

impl<B: SerialBackend> RelayDriver<B> {
    pub fn neu(backend: B, konfig: RelaisKonfig) -> Self {
        let auto_reconnect = konfig.auto_reconnect;
        Self {
            backend,
            konfig,
            link: None,
            port_name: None,
            auto_reconnect,
            reconnect_faellig: None,
            letzter_zustand: None,
            verbindungs_nr: 0,
        }
    }

    pub fn konfig(&self) -> &RelaisKonfig {
        &self.konfig
    }

    /// Alle aktuell aufzaehlbaren Ports
    pub fn list_ports(&self) -> Vec<PortInfo> {
        self.backend.ports()
    }

    /// Verbindet mit dem Relais
    ///
    /// Reihenfolge: bevorzugter Port, dann Ports mit Hersteller-Signatur,
    /// dann der erste verfuegbare. Nach Erfolg wird sofort gekappt.
    pub fn connect(&mut self, bevorzugt: Option<&str>) -> bool {
        if self.link.is_some() {
            debug!(port = ?self.port_name, "Bestehende Relais-Verbindung wird ersetzt");
            self.freigeben_und_schliessen();
        }

        let kandidaten = self.kandidaten(bevorzugt);
        if kandidaten.is_empty() {
            warn!("Keine serielle Schnittstelle fuer das Relais gefunden");
            return false;
        }

        for port in kandidaten {
            match self
                .backend
                .oeffnen(&port, self.konfig.baudrate, self.konfig.timeout)
            {
                Ok(link) => {
                    if !self.konfig.anlauf.is_zero() {
                        std::thread::sleep(self.konfig.anlauf);
                    }
                    self.link = Some(link);
                    self.port_name = Some(port.clone());
                    self.auto_reconnect = self.konfig.auto_reconnect;
                    self.reconnect_faellig = None;
                    self.verbindungs_nr += 1;
                    info!(port = %port, "Relais verbunden");
                    // Fail-Safe: System startet still
                    self.cut();
                    return self.link.is_some();
                }
                Err(e) => {
                    warn!(port = %port, fehler = %e, "Relais-Port konnte nicht geoeffnet werden");
                }
            }
        }
        false
    }

    fn kandidaten(&self, bevorzugt: Option<&str>) -> Vec<String> {
        let ports = self.backend.ports();
        let mut liste: Vec<String> = Vec::new();
        if let Some(p) = bevorzugt.filter(|p| !p.trim().is_empty()) {
            liste.push(p.to_string());
        }
        for p in ports
            .iter()
            .filter(|p| p.passt_zu(&self.konfig.hersteller_signaturen))
        {
            if !liste.contains(&p.device) {
                liste.push(p.device.clone());
            }
        }
        if let Some(erster) = ports.first() {
            if !liste.contains(&erster.device) {
                liste.push(erster.device.clone());
            }
        }
        liste
    }

    /// Trennt die Verbindung: erst freigeben, dann schliessen
    ///
    /// Bricht einen laufenden Reconnect ab.
    pub fn disconnect(&mut self) {
        self.auto_reconnect = false;
        self.reconnect_faellig = None;
        if self.link.is_none() {
            return;
        }
        self.freigeben_und_schliessen();
        info!(port = ?self.port_name, "Relais getrennt");
    }

    /// Fail-Safe vor jedem Schliessen: Audio frei, kurz warten, Link weg
    fn freigeben_und_schliessen(&mut self) {
        self.open();
        if !self.konfig.trennen_wartezeit.is_zero() {
            std::thread::sleep(self.konfig.trennen_wartezeit);
        }
        self.link = None;
    }

    /// Audio freigeben
    pub fn open(&mut self) -> bool {
        self.schalten(AudioZustand::Offen)
    }

    /// Audio kappen
    pub fn cut(&mut self) -> bool {
        self.schalten(AudioZustand::Gekappt)
    }

    fn schalten(&mut self, zustand: AudioZustand) -> bool {
        self.letzter_zustand = Some(zustand);
        let byte = self.konfig.polaritaet.befehl(zustand);
        let ok = self.senden(byte);
        if ok {
            debug!(zustand = ?zustand, byte = %(byte as char), "Relais geschaltet");
        }
        ok
    }

    /// Sendet das No-Op-Byte fuer den Board-Watchdog
    pub fn keep_alive(&mut self) -> bool {
        if self.link.is_none() {
            return false;
        }
        self.senden(self.konfig.keep_alive_byte)
    }

    fn senden(&mut self, byte: u8) -> bool {
        let Some(link) = self.link.as_mut() else {
            debug!("Relais nicht verbunden, Kommando verworfen");
            return false;
        };
        match link.schreiben(&[byte]) {
            Ok(()) => true,
            Err(e) => {
                warn!(fehler = %e, "Schreiben auf das Relais fehlgeschlagen");
                self.verbindung_verloren();
                false
            }
        }
    }

    /// Billige Lebendpruefung: ist der Port noch aufzaehlbar?
    pub fn check_connection(&mut self) -> bool {
        if self.link.is_none() {
            return false;
        }
        let Some(port) = self.port_name.as_deref() else {
            return false;
        };
        if self.backend.ports().iter().any(|p| p.device == port) {
            true
        } else {
            warn!(port = %port, "Relais-Port nicht mehr vorhanden");
            self.verbindung_verloren();
            false
        }
    }

    fn verbindung_verloren(&mut self) {
        self.link = None;
        if self.auto_reconnect && self.reconnect_faellig.is_none() {
            self.reconnect_faellig = Some(Instant::now() + self.konfig.reconnect_intervall);
            info!(
                intervall_s = self.konfig.reconnect_intervall.as_secs(),
                "Relais-Reconnect geplant"
            );
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Port der aktuellen bzw. letzten Verbindung
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Zuletzt kommandierter Zustand (auch wenn das Schreiben scheiterte)
    pub fn letzter_zustand(&self) -> Option<AudioZustand> {
        self.letzter_zustand
    }

    pub fn verbindungs_nr(&self) -> u64 {
        self.verbindungs_nr
    }

    /// Zeitpunkt des naechsten Reconnect-Versuchs
    pub fn naechster_reconnect(&self) -> Option<Instant> {
        self.reconnect_faellig
    }

    pub fn reconnect_faellig(&self, jetzt: Instant) -> bool {
        matches!(self.reconnect_faellig, Some(t) if jetzt >= t)
    }

    /// Ein Reconnect-Versuch; bei Misserfolg wird der naechste geplant
    pub fn reconnect_versuchen(&mut self) -> bool {
        self.reconnect_faellig = None;
        let port = self.port_name.clone();
        if self.connect(port.as_deref()) {
            info!("Relais-Reconnect erfolgreich");
            return true;
        }
        if self.auto_reconnect {
            self.reconnect_faellig = Some(Instant::now() + self.konfig.reconnect_intervall);
        }
        false
    }

    /// Bricht einen geplanten Reconnect ab
    pub fn reconnect_abbrechen(&mut self) {
        if self.reconnect_faellig.take().is_some() {
            info!("Relais-Reconnect abgebrochen");
        }
    }
}

impl<B: SerialBackend> Drop for RelayDriver<B> {
    fn drop(&mut self) {
        // Ein beendetes Pult darf den Saal nicht stumm zuruecklassen
        if self.link.is_some() {
            self.open();
        }
    }
}
