//! Pult-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Pult ohne Konfigurationsdatei
//! lauffaehig ist. Der zuletzt verbundene Relais-Port wird in die Datei
//! zurueckgeschrieben.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tribuna_core::RosterHandle;
use tribuna_floor::AnzeigeKonfig;
use tribuna_observability::LogKonfig;
use tribuna_relay::{RelaisKonfig, RelaisPolaritaet};

/// Vollstaendige Pult-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sitzung und Rednerlisten
    pub sitzung: SitzungEinstellungen,
    /// Serielles Relais am Podium
    pub relais: RelaisEinstellungen,
    /// Plenar-Anzeige und Lower Third
    pub anzeige: AnzeigeEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken, Health)
    pub observability: ObservabilityEinstellungen,
}

/// Sitzung und Rednerlisten
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungEinstellungen {
    /// Name des Gremiums (fuer Anzeigen und Logs)
    pub name: String,
    pub stadt: String,
    /// Verzeichnis mit den `<liste>.json`-Dateien
    pub roster_verzeichnis: PathBuf,
    /// Beim Start aktive Liste
    pub aktive_liste: String,
    /// Schnellwahl-Zeiten in Minuten (`preset <n>`)
    pub zeit_presets_min: Vec<u32>,
}

impl Default for SitzungEinstellungen {
    fn default() -> Self {
        Self {
            name: "Camara Municipal".into(),
            stadt: String::new(),
            roster_verzeichnis: PathBuf::from("listas"),
            aktive_liste: RosterHandle::default().0,
            zeit_presets_min: vec![1, 2, 3, 5, 10, 15],
        }
    }
}

/// Serielles Relais am Podium
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaisEinstellungen {
    /// Bevorzugter bzw. zuletzt verbundener Port
    pub port: Option<String>,
    pub baudrate: u32,
    pub timeout_ms: u64,
    pub polaritaet: RelaisPolaritaet,
    /// No-Op-Zeichen fuer den Watchdog auf dem Board
    pub keep_alive_byte: char,
    pub hersteller_signaturen: Vec<String>,
    /// Wartezeit nach dem Oeffnen des Ports (Board-Reset)
    pub anlauf_ms: u64,
    pub trennen_wartezeit_ms: u64,
    pub reconnect_s: u64,
    pub keep_alive_s: u64,
    pub pruefung_s: u64,
    pub auto_reconnect: bool,
}

impl Default for RelaisEinstellungen {
    fn default() -> Self {
        Self {
            port: None,
            baudrate: 9600,
            timeout_ms: 1000,
            polaritaet: RelaisPolaritaet::NormallyOpen,
            keep_alive_byte: '?',
            hersteller_signaturen: vec!["Arduino".into(), "CH340".into()],
            anlauf_ms: 2000,
            trennen_wartezeit_ms: 200,
            reconnect_s: 3,
            keep_alive_s: 2,
            pruefung_s: 1,
            auto_reconnect: true,
        }
    }
}

/// Plenar-Anzeige und Lower Third
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnzeigeEinstellungen {
    /// Restzeit, ab der das Lower Third warnt
    pub warnschwelle_s: u32,
    /// Laufzeit der Rede, bevor das Lower Third eingeblendet wird
    pub lower_third_verzoegerung_s: u32,
}

impl Default for AnzeigeEinstellungen {
    fn default() -> Self {
        Self {
            warnschwelle_s: 30,
            lower_third_verzoegerung_s: 10,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
    /// Verzeichnis fuer Log-Dateien (leer = nur Konsole)
    pub verzeichnis: Option<PathBuf>,
    pub max_dateien: usize,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
            verzeichnis: None,
            max_dateien: 40,
        }
    }
}

/// Observability-Einstellungen (Metriken + Health-Check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Aktiviert den Observability-Server
    pub aktiviert: bool,
    pub bind_adresse: String,
    /// Port fuer Metriken und Health (Standard: 9300)
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "127.0.0.1".into(),
            port: 9300,
        }
    }
}

impl AppConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config.pruefen(pfad)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Schreibt die Konfiguration als TOML zurueck
    pub fn speichern(&self, pfad: &str) -> anyhow::Result<()> {
        let inhalt = toml::to_string_pretty(self)?;
        std::fs::write(pfad, inhalt)
            .map_err(|e| anyhow::anyhow!("Konfigurationsdatei '{pfad}' nicht schreibbar: {e}"))?;
        Ok(())
    }

    fn pruefen(&self, pfad: &str) -> anyhow::Result<()> {
        if !self.relais.keep_alive_byte.is_ascii() {
            anyhow::bail!(
                "Konfigurationsfehler in '{pfad}': keep_alive_byte muss ein ASCII-Zeichen sein"
            );
        }
        if self.relais.baudrate == 0 {
            anyhow::bail!("Konfigurationsfehler in '{pfad}': baudrate darf nicht 0 sein");
        }
        if !tribuna_observability::logging::log_level_gueltig(&self.logging.level) {
            tracing::warn!(level = %self.logging.level, "Unbekanntes Log-Level, verwende info");
        }
        if !tribuna_observability::logging::log_format_gueltig(&self.logging.format) {
            tracing::warn!(format = %self.logging.format, "Unbekanntes Log-Format, verwende text");
        }
        Ok(())
    }

    /// Uebernimmt einen neu verbundenen Port
    ///
    /// Gibt `true` zurueck, wenn sich der gespeicherte Port geaendert hat.
    pub fn port_merken(&mut self, port: &str) -> bool {
        if self.relais.port.as_deref() == Some(port) {
            return false;
        }
        self.relais.port = Some(port.to_string());
        true
    }

    pub fn relais_konfig(&self) -> RelaisKonfig {
        let r = &self.relais;
        RelaisKonfig {
            baudrate: r.baudrate,
            timeout: Duration::from_millis(r.timeout_ms),
            polaritaet: r.polaritaet,
            keep_alive_byte: if r.keep_alive_byte.is_ascii() {
                r.keep_alive_byte as u8
            } else {
                b'?'
            },
            hersteller_signaturen: r.hersteller_signaturen.clone(),
            anlauf: Duration::from_millis(r.anlauf_ms),
            trennen_wartezeit: Duration::from_millis(r.trennen_wartezeit_ms),
            reconnect_intervall: Duration::from_secs(r.reconnect_s),
            keep_alive_intervall: Duration::from_secs(r.keep_alive_s),
            pruef_intervall: Duration::from_secs(r.pruefung_s),
            auto_reconnect: r.auto_reconnect,
        }
    }

    pub fn log_konfig(&self) -> LogKonfig {
        LogKonfig {
            level: self.logging.level.clone(),
            format: self.logging.format.clone(),
            verzeichnis: self.logging.verzeichnis.clone(),
            max_dateien: self.logging.max_dateien,
        }
    }

    pub fn anzeige_konfig(&self) -> AnzeigeKonfig {
        AnzeigeKonfig {
            warnschwelle_s: self.anzeige.warnschwelle_s,
        }
    }

    pub fn aktive_liste(&self) -> RosterHandle {
        RosterHandle::neu(self.sitzung.aktive_liste.clone())
    }

    /// Preset `n` (1-basiert) in Sekunden
    pub fn preset_sekunden(&self, n: usize) -> Option<u32> {
        n.checked_sub(1)
            .and_then(|i| self.sitzung.zeit_presets_min.get(i))
            .map(|min| min.saturating_mul(60))
    }

    /// Gibt die Bind-Adresse fuer den Observability-Server zurueck
    pub fn observability_bind_adresse(&self) -> String {
        format!(
            "{}:{}",
            self.observability.bind_adresse, self.observability.port
        )
    }
}
