//! Rednerlisten als JSON-Dateien
//!
//! Jede Liste liegt als `<verzeichnis>/<handle>.json` und enthaelt ein
//! Array von Rednern (`id`, `nome`/`name`, `partido`/`party`,
//! `foto`/`photo`). Fehlt die Datei, wird gewarnt und mit einer leeren
//! Liste weitergearbeitet.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tribuna_core::{RosterHandle, Speaker, SpeakerRepository, TribunaError};

/// Dateibasierte Rednerliste
pub struct JsonRoster {
    verzeichnis: PathBuf,
    handle: RosterHandle,
    redner: Vec<Speaker>,
}

impl JsonRoster {
    /// Oeffnet die Liste `handle`; eine fehlende Datei ergibt eine leere Liste
    pub fn laden(verzeichnis: impl Into<PathBuf>, handle: RosterHandle) -> tribuna_core::Result<Self> {
        let verzeichnis = verzeichnis.into();
        let redner = match liste_lesen(&verzeichnis, &handle)? {
            Some(redner) => redner,
            None => {
                warn!(
                    liste = %handle.name(),
                    verzeichnis = %verzeichnis.display(),
                    "Rednerliste nicht gefunden, starte mit leerer Liste"
                );
                Vec::new()
            }
        };
        info!(liste = %handle.name(), anzahl = redner.len(), "Rednerliste geladen");
        Ok(Self {
            verzeichnis,
            handle,
            redner,
        })
    }

    pub fn verzeichnis(&self) -> &Path {
        &self.verzeichnis
    }
}

fn listen_pfad(verzeichnis: &Path, handle: &RosterHandle) -> PathBuf {
    verzeichnis.join(format!("{}.json", handle.name()))
}

/// Liest eine Liste; `None` wenn die Datei nicht existiert
fn liste_lesen(
    verzeichnis: &Path,
    handle: &RosterHandle,
) -> tribuna_core::Result<Option<Vec<Speaker>>> {
    if handle.name().is_empty() || handle.name().contains(['/', '\\']) || handle.name() == ".." {
        return Err(TribunaError::ListeNichtGefunden(handle.name().to_string()));
    }
    let pfad = listen_pfad(verzeichnis, handle);
    let inhalt = match std::fs::read_to_string(&pfad) {
        Ok(inhalt) => inhalt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut redner: Vec<Speaker> =
        serde_json::from_str(&inhalt).map_err(|e| TribunaError::ListeFehlerhaft {
            liste: handle.name().to_string(),
            grund: e.to_string(),
        })?;

    for s in &redner {
        if s.photo_reference.is_none() {
            warn!(redner = %s.id, name = %s.name, "Kein Foto hinterlegt, verwende Platzhalter");
        }
    }
    let anzahl = redner.len();
    redner.sort_by_key(|s| s.id);
    redner.dedup_by_key(|s| s.id);
    if redner.len() != anzahl {
        warn!(liste = %handle.name(), "Doppelte Redner-IDs, nur der erste Eintrag zaehlt");
    }
    Ok(Some(redner))
}

impl SpeakerRepository for JsonRoster {
    fn get_roster(&self) -> Vec<Speaker> {
        self.redner.clone()
    }

    fn get_active_list_handle(&self) -> RosterHandle {
        self.handle.clone()
    }

    /// Wechselt nur, wenn die Zielliste existiert und lesbar ist
    fn switch_list(&mut self, handle: RosterHandle) -> tribuna_core::Result<()> {
        let redner = liste_lesen(&self.verzeichnis, &handle)?
            .ok_or_else(|| TribunaError::ListeNichtGefunden(handle.name().to_string()))?;
        info!(
            von = %self.handle.name(),
            nach = %handle.name(),
            anzahl = redner.len(),
            "Rednerliste gewechselt"
        );
        self.handle = handle;
        self.redner = redner;
        Ok(())
    }
}
