//! tribuna-console – Bedienpult der Redezeit-Steuerung
//!
//! Deklariert alle Pult-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod broadcast;
pub mod config;
pub mod kommando;
pub mod roster;
pub mod runtime;

use anyhow::Result;
use broadcast::{hinweis_text, SnapshotHub};
use config::AppConfig;
use roster::JsonRoster;
use runtime::{Anfrage, Antwort, Sitzung};
use std::io::BufRead;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, mpsc, oneshot, watch};
use tribuna_observability::{observability_server_starten, HealthState, TribunaMetrics};
use tribuna_relay::{RelaisDienst, RelayDriver, SystemSerial};

/// Wartezeit auf die Port-Liste aus dem Relais-Thread
const PORTS_TIMEOUT: Duration = Duration::from_secs(3);

/// Haelt die Pult-Konfiguration zusammen
pub struct Pult {
    pub config: AppConfig,
    /// Pfad der Konfigurationsdatei (fuer den gemerkten Relais-Port)
    pub config_pfad: String,
}

impl Pult {
    pub fn neu(config: AppConfig, config_pfad: String) -> Self {
        Self {
            config,
            config_pfad,
        }
    }

    /// Startet alle Subsysteme und laeuft bis `beenden` oder Ctrl-C
    ///
    /// Reihenfolge:
    /// 1. Rednerliste laden
    /// 2. Relais-Thread starten (verbindet im Hintergrund)
    /// 3. Observability-Server starten
    /// 4. Eingabe von stdin lesen, Sitzung laufen lassen
    /// 5. Beim Beenden: Sitzung stoppen, Relais trennen (Audio frei)
    pub async fn starten(self) -> Result<()> {
        let config = self.config;
        tracing::info!(
            sitzung = %config.sitzung.name,
            stadt = %config.sitzung.stadt,
            liste = %config.sitzung.aktive_liste,
            relais_port = ?config.relais.port,
            "Pult startet"
        );

        let health = HealthState::neu();
        let metriken = TribunaMetrics::neu()?;
        let hub = SnapshotHub::neu(
            health.clone(),
            metriken.clone(),
            config.anzeige.lower_third_verzoegerung_s,
        );

        let roster = JsonRoster::laden(&config.sitzung.roster_verzeichnis, config.aktive_liste())?;

        let (ereignis_tx, ereignis_rx) = mpsc::unbounded_channel();
        let driver = RelayDriver::neu(SystemSerial, config.relais_konfig());
        let relais = RelaisDienst::starten(driver, ereignis_tx)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let observability = if config.observability.aktiviert {
            let adresse: SocketAddr = config.observability_bind_adresse().parse().map_err(|e| {
                anyhow::anyhow!(
                    "Ungueltige Observability-Adresse '{}': {e}",
                    config.observability_bind_adresse()
                )
            })?;
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, health, metriken, rx).await {
                    tracing::error!("Observability-Server fehlgeschlagen: {e}");
                }
            }))
        } else {
            None
        };

        tokio::spawn(hinweise_ausgeben(hub.clone(), shutdown_rx.clone()));

        let (anfrage_tx, anfrage_rx) = mpsc::channel(32);
        eingabe_starten(anfrage_tx)?;

        let ctrl_c_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown-Signal empfangen, Pult wird beendet");
                let _ = ctrl_c_tx.send(true);
            }
        });

        println!("{}", kommando::HILFE);
        let sitzung = Sitzung::neu(config, Some(self.config_pfad), roster, relais, hub);
        sitzung.laufen(anfrage_rx, ereignis_rx, shutdown_rx).await;

        let _ = shutdown_tx.send(true);
        if let Some(server) = observability {
            let _ = server.await;
        }
        tracing::info!("Pult beendet");
        Ok(())
    }
}

/// Liest Befehlszeilen von stdin in einem eigenen Thread
///
/// Blockierendes Lesen haelt so beim Beenden die Runtime nicht auf.
fn eingabe_starten(anfragen: mpsc::Sender<Anfrage>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Handle::current();
    std::thread::Builder::new()
        .name("tribuna-eingabe".to_string())
        .spawn(move || {
            for zeile in std::io::stdin().lock().lines() {
                let zeile = match zeile {
                    Ok(z) => z,
                    Err(e) => {
                        tracing::error!("stdin nicht lesbar: {e}");
                        break;
                    }
                };
                if zeile.trim().is_empty() {
                    continue;
                }
                let kommando = match kommando::parsen(&zeile) {
                    Ok(k) => k,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                if !runtime.block_on(anfrage_senden(&anfragen, kommando)) {
                    break;
                }
            }
            tracing::debug!("Eingabe beendet");
        })?;
    Ok(())
}

/// Schickt einen Befehl an die Sitzung; `false` wenn sie nicht mehr laeuft
async fn anfrage_senden(anfragen: &mpsc::Sender<Anfrage>, kommando: kommando::Kommando) -> bool {
    let (antwort_tx, antwort_rx) = oneshot::channel();
    let anfrage = Anfrage {
        kommando,
        antwort: antwort_tx,
    };
    if anfragen.send(anfrage).await.is_err() {
        return false;
    }
    match antwort_rx.await {
        Ok(antwort) => antwort_ausgeben(antwort).await,
        Err(_) => false,
    }
}

/// Gibt die Antwort aus; `false` wenn die Sitzung beendet wurde
async fn antwort_ausgeben(antwort: Antwort) -> bool {
    match antwort {
        Antwort::Text(text) => println!("{text}"),
        Antwort::Abgelehnt(grund) => println!("Abgelehnt: {grund}"),
        Antwort::Ports(rx) => match tokio::time::timeout(PORTS_TIMEOUT, rx).await {
            Ok(Ok(ports)) if ports.is_empty() => println!("Keine seriellen Ports gefunden"),
            Ok(Ok(ports)) => {
                for p in ports {
                    println!("  {:<16} {}  {}", p.device, p.description, p.hwid);
                }
            }
            Ok(Err(_)) | Err(_) => println!("Relais-Thread antwortet nicht"),
        },
        Antwort::Beendet => {
            println!("Auf Wiedersehen");
            return false;
        }
    }
    true
}

/// Zeigt Hinweise (Ablauf, Relais, Taktgeber) sofort am Pult an
async fn hinweise_ausgeben(hub: SnapshotHub, mut shutdown_rx: watch::Receiver<bool>) {
    let mut hinweise = hub.hinweise_abonnieren();
    loop {
        tokio::select! {
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            hinweis = hinweise.recv() => match hinweis {
                Ok(h) => println!("{}", hinweis_text(&h)),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(verpasst = n, "Hinweise verpasst");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
