//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `TRIBUNA_LOG_LEVEL`: Log-Level (trace/debug/info/warn/error), Standard: info
//! - `TRIBUNA_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Ist ein Log-Verzeichnis konfiguriert, schreibt ein zweiter Layer ohne
//! ANSI-Farben in `log_<YYYY-MM-DD_HH-MM-SS>_<prozess>.txt`. Vor dem
//! Anlegen einer neuen Datei werden die aeltesten Dateien ueber
//! `max_dateien` geloescht.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Logging-Einstellungen aus der Konfigurationsdatei
#[derive(Debug, Clone)]
pub struct LogKonfig {
    pub level: String,
    pub format: String,
    /// Verzeichnis fuer Log-Dateien (None = nur Konsole)
    pub verzeichnis: Option<PathBuf>,
    /// Maximale Anzahl Log-Dateien im Verzeichnis
    pub max_dateien: usize,
}

impl Default for LogKonfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
            verzeichnis: None,
            max_dateien: 40,
        }
    }
}

type BoxLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Initialisiert das Logging-System.
///
/// Gibt den Pfad der Log-Datei zurueck, falls eine angelegt wurde.
/// Fehler beim Anlegen des Verzeichnisses oder beim Aufraeumen landen
/// auf stderr und brechen den Start nicht ab.
pub fn logging_initialisieren(konfig: &LogKonfig, prozess: &str) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_env("TRIBUNA_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(&konfig.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var("TRIBUNA_LOG_FORMAT").unwrap_or_else(|_| konfig.format.clone());

    let mut layers: Vec<BoxLayer> = Vec::new();
    match format.as_str() {
        "json" => layers.push(
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_current_span(true)
                .boxed(),
        ),
        _ => layers.push(fmt::layer().with_target(true).boxed()),
    }

    let mut datei_pfad = None;
    if let Some(verzeichnis) = &konfig.verzeichnis {
        match log_datei_oeffnen(verzeichnis, prozess, konfig.max_dateien) {
            Ok((pfad, datei)) => {
                layers.push(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(true)
                        .with_writer(Mutex::new(datei))
                        .boxed(),
                );
                datei_pfad = Some(pfad);
            }
            Err(e) => {
                eprintln!(
                    "Log-Datei in {} konnte nicht angelegt werden: {e}",
                    verzeichnis.display()
                );
            }
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        eprintln!("Logging bereits initialisiert: {e}");
    }
    datei_pfad
}

/// Name einer Log-Datei fuer den aktuellen Zeitpunkt
pub fn log_dateiname(prozess: &str) -> String {
    format!(
        "log_{}_{}.txt",
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"),
        prozess
    )
}

fn log_datei_oeffnen(
    verzeichnis: &Path,
    prozess: &str,
    max_dateien: usize,
) -> std::io::Result<(PathBuf, fs::File)> {
    fs::create_dir_all(verzeichnis)?;
    if let Err(e) = alte_logs_aufraeumen(verzeichnis, max_dateien.saturating_sub(1)) {
        eprintln!("Alte Log-Dateien konnten nicht aufgeraeumt werden: {e}");
    }
    let pfad = verzeichnis.join(log_dateiname(prozess));
    let datei = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&pfad)?;
    Ok((pfad, datei))
}

/// Loescht die aeltesten `log_*.txt`, bis hoechstens `behalten` uebrig sind
///
/// Gibt die Anzahl geloeschter Dateien zurueck.
pub fn alte_logs_aufraeumen(verzeichnis: &Path, behalten: usize) -> std::io::Result<usize> {
    let mut dateien: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
    for eintrag in fs::read_dir(verzeichnis)? {
        let eintrag = eintrag?;
        let name = eintrag.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with("log_") && name.ends_with(".txt")) {
            continue;
        }
        let geaendert = eintrag
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::UNIX_EPOCH);
        dateien.push((geaendert, eintrag.path()));
    }
    if dateien.len() <= behalten {
        return Ok(0);
    }
    // Aelteste zuerst; bei gleicher Zeit entscheidet der Name (Zeitstempel)
    dateien.sort();
    let zu_loeschen = dateien.len() - behalten;
    let mut geloescht = 0;
    for (_, pfad) in dateien.into_iter().take(zu_loeschen) {
        match fs::remove_file(&pfad) {
            Ok(()) => geloescht += 1,
            Err(e) => eprintln!("{} konnte nicht geloescht werden: {e}", pfad.display()),
        }
    }
    Ok(geloescht)
}

/// Loggt Panics auf `error`-Level, bevor der Standard-Hook laeuft
pub fn panic_hook_installieren() {
    let standard = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let ort = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let nachricht = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unbekannt".into());
        tracing::error!(ort = %ort, nachricht = %nachricht, "Unbehandelter Fehler (Panic)");
        standard(info);
    }));
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
