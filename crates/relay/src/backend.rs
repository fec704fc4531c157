//! Serielle Backends
//!
//! Der Treiber kennt nur [`SerialBackend`] und [`RelayLink`]. Im Betrieb
//! steckt `serialport` dahinter ([`SystemSerial`]), in Tests ein
//! Speicher-Backend, das geschriebene Bytes mitschreibt und Fehler
//! einspielen kann ([`SpeicherBackend`]).

use crate::error::{RelayError, RelayResult};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Schnittstellen
// ---------------------------------------------------------------------------

/// Beschreibung einer gefundenen seriellen Schnittstelle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Geraetename (z.B. `COM3` oder `/dev/ttyUSB0`)
    pub device: String,
    /// Lesbare Beschreibung (Hersteller/Produkt)
    pub description: String,
    /// Hardware-ID (USB VID:PID und Seriennummer)
    pub hwid: String,
}

impl PortInfo {
    pub fn neu(device: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
            hwid: String::new(),
        }
    }

    /// Prueft ob die Beschreibung eine der Hersteller-Signaturen enthaelt
    pub fn passt_zu(&self, signaturen: &[String]) -> bool {
        signaturen
            .iter()
            .any(|s| !s.is_empty() && self.description.contains(s.as_str()))
    }
}

/// Offene Verbindung zum Relais-Board
pub trait RelayLink: Send {
    /// Schreibt Bytes und wartet bis sie raus sind
    fn schreiben(&mut self, daten: &[u8]) -> io::Result<()>;
}

/// Quelle fuer Port-Listen und Verbindungen
pub trait SerialBackend: Send {
    /// Aktuell aufzaehlbare Schnittstellen
    fn ports(&self) -> Vec<PortInfo>;

    /// Oeffnet einen Port mit fester Baudrate
    fn oeffnen(
        &self,
        port: &str,
        baudrate: u32,
        timeout: Duration,
    ) -> RelayResult<Box<dyn RelayLink>>;
}

// ---------------------------------------------------------------------------
// SystemSerial (serialport)
// ---------------------------------------------------------------------------

/// Backend auf Basis des `serialport`-Crates
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

struct SerialLink(Box<dyn serialport::SerialPort>);

impl RelayLink for SerialLink {
    fn schreiben(&mut self, daten: &[u8]) -> io::Result<()> {
        self.0.write_all(daten)?;
        self.0.flush()
    }
}

impl SerialBackend for SystemSerial {
    fn ports(&self) -> Vec<PortInfo> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(port_info_aus).collect(),
            Err(e) => {
                tracing::warn!(fehler = %e, "Serielle Ports konnten nicht aufgezaehlt werden");
                Vec::new()
            }
        }
    }

    fn oeffnen(
        &self,
        port: &str,
        baudrate: u32,
        timeout: Duration,
    ) -> RelayResult<Box<dyn RelayLink>> {
        let p = serialport::new(port, baudrate)
            .timeout(timeout)
            .open()
            .map_err(|e| RelayError::OeffnenFehlgeschlagen {
                port: port.to_string(),
                grund: e.to_string(),
            })?;
        Ok(Box::new(SerialLink(p)))
    }
}

fn port_info_aus(info: serialport::SerialPortInfo) -> PortInfo {
    match info.port_type {
        serialport::SerialPortType::UsbPort(usb) => {
            let beschreibung = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
            if let Some(sn) = usb.serial_number {
                hwid.push_str(&format!(" SER={sn}"));
            }
            PortInfo {
                device: info.port_name,
                description: beschreibung,
                hwid,
            }
        }
        serialport::SerialPortType::PciPort => PortInfo {
            device: info.port_name,
            description: "PCI".into(),
            hwid: String::new(),
        },
        serialport::SerialPortType::BluetoothPort => PortInfo {
            device: info.port_name,
            description: "Bluetooth".into(),
            hwid: String::new(),
        },
        serialport::SerialPortType::Unknown => PortInfo {
            device: info.port_name,
            description: String::new(),
            hwid: String::new(),
        },
    }
}

// ---------------------------------------------------------------------------
// SpeicherBackend (Tests, Trockenlauf)
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SpeicherZustand {
    ports: Vec<PortInfo>,
    /// (Port, Byte) in Schreibreihenfolge
    geschrieben: Vec<(String, u8)>,
    schreibfehler: bool,
    gesperrt: Vec<String>,
    geoeffnet: Vec<String>,
}

/// In-Memory-Backend: zeichnet Bytes auf und spielt Fehler ein
///
/// Clone teilt den inneren Zustand, sodass ein Test das Backend an den
/// Treiber uebergeben und danach weiter beobachten kann.
#[derive(Clone, Default)]
pub struct SpeicherBackend {
    inner: Arc<Mutex<SpeicherZustand>>,
}

impl SpeicherBackend {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Meldet einen Port an (wie ein eingestecktes Board)
    pub fn port_hinzufuegen(&self, device: &str, beschreibung: &str) {
        self.inner.lock().ports.push(PortInfo::neu(device, beschreibung));
    }

    /// Entfernt einen Port (wie ein abgezogenes Kabel)
    pub fn port_entfernen(&self, device: &str) {
        self.inner.lock().ports.retain(|p| p.device != device);
    }

    /// Laesst alle folgenden Schreibzugriffe scheitern
    pub fn schreibfehler_setzen(&self, aktiv: bool) {
        self.inner.lock().schreibfehler = aktiv;
    }

    /// Laesst das Oeffnen eines bestimmten Ports scheitern
    pub fn oeffnen_sperren(&self, device: &str) {
        self.inner.lock().gesperrt.push(device.to_string());
    }

    /// Alle geschriebenen Bytes in Reihenfolge
    pub fn geschriebene_bytes(&self) -> Vec<u8> {
        self.inner.lock().geschrieben.iter().map(|(_, b)| *b).collect()
    }

    /// Geschriebene Bytes auf einem bestimmten Port
    pub fn geschrieben_auf(&self, device: &str) -> Vec<u8> {
        self.inner
            .lock()
            .geschrieben
            .iter()
            .filter(|(p, _)| p == device)
            .map(|(_, b)| *b)
            .collect()
    }

    /// Ports in der Reihenfolge, in der sie geoeffnet wurden
    pub fn geoeffnete_ports(&self) -> Vec<String> {
        self.inner.lock().geoeffnet.clone()
    }
}

struct SpeicherLink {
    port: String,
    inner: Arc<Mutex<SpeicherZustand>>,
}

impl RelayLink for SpeicherLink {
    fn schreiben(&mut self, daten: &[u8]) -> io::Result<()> {
        let mut z = self.inner.lock();
        if z.schreibfehler || !z.ports.iter().any(|p| p.device == self.port) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Port weg"));
        }
        for b in daten {
            z.geschrieben.push((self.port.clone(), *b));
        }
        Ok(())
    }
}

impl SerialBackend for SpeicherBackend {
    fn ports(&self) -> Vec<PortInfo> {
        self.inner.lock().ports.clone()
    }

    fn oeffnen(
        &self,
        port: &str,
        _baudrate: u32,
        _timeout: Duration,
    ) -> RelayResult<Box<dyn RelayLink>> {
        let mut z = self.inner.lock();
        if z.gesperrt.iter().any(|p| p == port) || !z.ports.iter().any(|p| p.device == port) {
            return Err(RelayError::OeffnenFehlgeschlagen {
                port: port.to_string(),
                grund: "nicht vorhanden".into(),
            });
        }
        z.geoeffnet.push(port.to_string());
        Ok(Box::new(SpeicherLink {
            port: port.to_string(),
            inner: Arc::clone(&self.inner),
        }))
    }
}
