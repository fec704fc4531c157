//! Tribuna Pult – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet das Pult.

use anyhow::Result;
use tribuna_console::{config::AppConfig, Pult};
use tribuna_observability::{logging_initialisieren, panic_hook_installieren};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("TRIBUNA_CONFIG").unwrap_or_else(|_| "tribuna.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = AppConfig::laden(&config_pfad)?;

    let log_datei = logging_initialisieren(&config.log_konfig(), "pult");
    panic_hook_installieren();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        log_datei = ?log_datei,
        "Tribuna wird initialisiert"
    );

    let pult = Pult::neu(config, config_pfad);
    pult.starten().await?;

    Ok(())
}
