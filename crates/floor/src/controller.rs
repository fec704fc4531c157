//! SpeakingTimeController – Zustandsmaschine der Redezeit
//!
//! Koordiniert Countdown, Relais ([`AudioGate`]) und Redner-Identitaet
//! und setzt das Aparte-Protokoll um: der Hauptredner leiht einem
//! zweiten Redner Zeit, zurueckgebucht wird nur, was tatsaechlich
//! verbraucht wurde.
//!
//! Phasen:
//!
//! ```text
//! Idle --select+set_time--> Armed --start--> Running --pause--> Paused --start--> Running
//! Running --begin_interjection_preparation--> PreparingInterjection
//! PreparingInterjection --set_time(g)--> Interjecting --end_interjection--> Running
//! jede Phase --stop--> Idle
//! ```
//!
//! Nach jedem Zustandswechsel geht ein Snapshot an die [`BroadcastSink`].
//! Abgelehnte Aktionen liefern einen [`FloorError`] und aendern nichts.

use crate::clock::TimeBudget;
use crate::display;
use crate::error::{FloorError, FloorResult};
use crate::state::{InterjectionContext, Phase, SessionState};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use tribuna_core::{
    AparteEndeGrund, AparteInfo, AudioGate, BroadcastSink, Hinweis, SessionSnapshot, Sitzungsphase,
    Speaker,
};

/// Darstellungsparameter fuer Snapshots
#[derive(Debug, Clone)]
pub struct AnzeigeKonfig {
    /// Schwelle fuer die Lower-Third-Warnung
    pub warnschwelle_s: u32,
}

impl Default for AnzeigeKonfig {
    fn default() -> Self {
        Self { warnschwelle_s: 30 }
    }
}

/// Ob `start` ohne gewaehlten Redner erlaubt ist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startfreigabe {
    Normal,
    /// Bediener hat die Warnung "kein Redner" bestaetigt
    OhneRedner,
}

/// Zustandsmaschine einer Sitzung: einziger Besitzer von [`SessionState`]
pub struct SpeakingTimeController<G: AudioGate, S: BroadcastSink> {
    zustand: SessionState,
    gate: G,
    sink: S,
    konfig: AnzeigeKonfig,
    relay_connected: bool,
}

impl<G: AudioGate, S: BroadcastSink> SpeakingTimeController<G, S> {
    pub fn neu(gate: G, sink: S) -> Self {
        Self::mit_konfig(gate, sink, AnzeigeKonfig::default())
    }

    pub fn mit_konfig(gate: G, sink: S, konfig: AnzeigeKonfig) -> Self {
        Self {
            zustand: SessionState::default(),
            gate,
            sink,
            konfig,
            relay_connected: false,
        }
    }

    // -----------------------------------------------------------------------
    // Lesezugriff
    // -----------------------------------------------------------------------

    pub fn zustand(&self) -> &SessionState {
        &self.zustand
    }

    pub fn budget(&self) -> TimeBudget {
        self.zustand.budget()
    }

    pub fn relay_connected(&self) -> bool {
        self.relay_connected
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Kopie des aktuellen Zustands fuer Abnehmer
    pub fn snapshot(&self) -> SessionSnapshot {
        let z = &self.zustand;
        let budget = z.budget();
        let aparte = z.interjection().map(|ctx| AparteInfo {
            grantor: ctx.grantor.clone(),
            recipient: ctx.recipient.clone(),
            granted_seconds: ctx.granted_seconds,
            grantor_saved_remaining: ctx.grantor_saved_remaining,
        });
        let aparte_aktiv = aparte.is_some();
        SessionSnapshot {
            live_speaker: z.live_speaker.clone(),
            principal_speaker: z.principal_speaker.clone(),
            remaining_seconds: budget.remaining_seconds,
            total_seconds: budget.total_seconds,
            clock_running: z.clock_running(),
            interjection_active: aparte_aktiv,
            phase: z.phase.art(),
            time_expired: z.time_expired,
            relay_connected: self.relay_connected,
            staged_seconds: z.staged_seconds,
            aparte,
            anzeigestufe: display::anzeigestufe(budget.remaining_seconds, aparte_aktiv),
            warnung: display::warnung(
                budget.remaining_seconds,
                budget.total_seconds,
                self.konfig.warnschwelle_s,
            ),
            zeitstempel: Utc::now(),
        }
    }

    fn veroeffentlichen(&self) {
        self.sink.publish(&self.snapshot());
    }

    fn melden(&self, hinweis: Hinweis) {
        self.sink.melden(&hinweis);
    }

    // -----------------------------------------------------------------------
    // Bedienaktionen
    // -----------------------------------------------------------------------

    /// Waehlt den Kandidaten fuer die naechste Aktion
    ///
    /// Ohne laufende Rede wird er sofort Haupt- und Live-Redner (Vorschau
    /// auf den Anzeigen). Das gilt auch nach Ablauf der Redezeit. Waehrend
    /// einer Aparte-Vorbereitung wird er zum Empfaenger, sofern er nicht
    /// selbst der Hauptredner ist.
    pub fn select_speaker(&mut self, speaker: Speaker) {
        let z = &mut self.zustand;
        z.candidate = Some(speaker.clone());
        let principal_id = z.principal_speaker.as_ref().map(|p| p.id);
        let rede_beendet =
            z.phase == Phase::Paused && (z.time_expired || z.uhr.remaining() == 0);
        if matches!(z.phase, Phase::Idle | Phase::Armed) || rede_beendet {
            z.principal_speaker = Some(speaker.clone());
            z.live_speaker = Some(speaker.clone());
            z.time_expired = false;
            z.phase = z.ruhephase();
        } else if let Phase::PreparingInterjection { recipient } = &mut z.phase {
            if principal_id != Some(speaker.id) {
                *recipient = speaker.clone();
            }
        }
        info!(redner = %speaker.id, name = %speaker.name, phase = %z.phase.art(), "Redner gewaehlt");
        self.veroeffentlichen();
    }

    /// Setzt eine Redezeit; Bedeutung haengt von der Phase ab
    ///
    /// - Idle/Armed/Paused: neues Budget (Total = Restzeit)
    /// - Running/Interjecting: nur vormerken
    /// - PreparingInterjection: vergibt das Aparte
    pub fn set_time(&mut self, sekunden: u32) -> FloorResult<()> {
        if let Phase::PreparingInterjection { recipient } = &self.zustand.phase {
            if sekunden == 0 {
                return Err(FloorError::UngueltigeZeit("Aparte braucht mehr als 0 Sekunden"));
            }
            let recipient = recipient.clone();
            return self.grant_interjection(recipient, sekunden);
        }

        let z = &mut self.zustand;
        match z.phase.art() {
            Sitzungsphase::Idle | Sitzungsphase::Armed => {
                z.uhr.set(sekunden);
                z.time_expired = false;
                z.staged_seconds = None;
                z.phase = z.ruhephase();
            }
            Sitzungsphase::Paused => {
                z.uhr.set(sekunden);
                z.time_expired = false;
                z.staged_seconds = None;
            }
            _ => {
                z.staged_seconds = Some(sekunden);
                debug!(sekunden, "Zeit vorgemerkt");
            }
        }
        info!(sekunden, phase = %self.zustand.phase.art(), "Zeit gesetzt");
        self.veroeffentlichen();
        Ok(())
    }

    /// Startet (oder setzt fort) die Uhr, Mikrofon wird freigegeben
    pub fn start(&mut self) -> FloorResult<()> {
        self.starten(Startfreigabe::Normal)
    }

    /// Start trotz fehlendem Redner (vom Bediener bestaetigt)
    pub fn start_erzwingen(&mut self) -> FloorResult<()> {
        self.starten(Startfreigabe::OhneRedner)
    }

    pub fn starten(&mut self, freigabe: Startfreigabe) -> FloorResult<()> {
        let z = &mut self.zustand;
        if z.clock_running() {
            return Err(FloorError::LaeuftBereits);
        }
        if z.uhr.remaining() == 0 {
            return Err(FloorError::KeineZeit);
        }
        match z.phase {
            // Aparte fortsetzen: Live-Redner bleibt der Empfaenger
            Phase::Interjecting(_) => {}
            _ => {
                if z.principal_speaker.is_none() && freigabe == Startfreigabe::Normal {
                    return Err(FloorError::KeinRedner);
                }
                z.live_speaker = z.principal_speaker.clone();
                z.phase = Phase::Running;
            }
        }
        z.time_expired = false;
        z.uhr.start();
        self.gate.open();
        info!(
            restzeit = self.zustand.uhr.remaining(),
            redner = ?self.zustand.live_speaker.as_ref().map(|s| s.id),
            "Uhr gestartet"
        );
        self.veroeffentlichen();
        Ok(())
    }

    /// Haelt die Uhr an und kappt das Mikrofon, Restzeit bleibt
    ///
    /// Im Aparte bleibt die Phase `Interjecting`; `start` setzt fort.
    pub fn pause(&mut self) -> FloorResult<()> {
        let z = &mut self.zustand;
        match z.phase {
            Phase::Running | Phase::PreparingInterjection { .. } => {
                z.phase = Phase::Paused;
            }
            Phase::Interjecting(_) if z.clock_running() => {}
            _ => return Err(FloorError::KeineLaufendeRede(z.phase.art())),
        }
        z.uhr.pause();
        self.gate.cut();
        info!(restzeit = self.zustand.uhr.remaining(), "Uhr pausiert");
        self.veroeffentlichen();
        Ok(())
    }

    /// Stoppt aus jeder Phase und setzt die Restzeit auf das Total
    ///
    /// Ein laufendes Aparte wird verworfen; das Total des Hauptredners
    /// gilt wieder.
    pub fn stop(&mut self) {
        let signal = self.zustand.uhr.stop();
        self.gate.cut();

        if let Phase::Interjecting(ctx) = std::mem::take(&mut self.zustand.phase) {
            let verbraucht = ctx.verbraucht(self.zustand.uhr.remaining());
            self.zustand.uhr.set_total(ctx.grantor_saved_total);
            self.zustand.live_speaker = Some(ctx.grantor.clone());
            self.melden(Hinweis::AparteBeendet {
                recipient: ctx.recipient,
                verbraucht,
                grund: AparteEndeGrund::Abgebrochen,
            });
        }

        let z = &mut self.zustand;
        z.uhr.auf_total(signal);
        z.phase = Phase::Idle;
        z.staged_seconds = None;
        z.time_expired = false;
        info!(total = z.uhr.total(), "Uhr gestoppt und zurueckgesetzt");
        self.veroeffentlichen();
    }

    pub fn add_time(&mut self, sekunden: u32) -> FloorResult<()> {
        if sekunden == 0 {
            return Err(FloorError::UngueltigeZeit("0 Sekunden"));
        }
        self.zeit_anpassen(i64::from(sekunden));
        Ok(())
    }

    pub fn sub_time(&mut self, sekunden: u32) -> FloorResult<()> {
        if sekunden == 0 {
            return Err(FloorError::UngueltigeZeit("0 Sekunden"));
        }
        self.zeit_anpassen(-i64::from(sekunden));
        Ok(())
    }

    /// Vorgemerkten Wert auf die laufende Uhr addieren
    pub fn add_staged_time(&mut self) -> FloorResult<()> {
        let sekunden = self.zustand.staged_seconds.ok_or(FloorError::NichtsVorgemerkt)?;
        if sekunden == 0 {
            return Err(FloorError::UngueltigeZeit("0 Sekunden"));
        }
        self.zustand.staged_seconds = None;
        self.add_time(sekunden)
    }

    /// Vorgemerkten Wert von der laufenden Uhr abziehen
    pub fn sub_staged_time(&mut self) -> FloorResult<()> {
        let sekunden = self.zustand.staged_seconds.ok_or(FloorError::NichtsVorgemerkt)?;
        if sekunden == 0 {
            return Err(FloorError::UngueltigeZeit("0 Sekunden"));
        }
        self.zustand.staged_seconds = None;
        self.sub_time(sekunden)
    }

    fn zeit_anpassen(&mut self, delta: i64) {
        let z = &mut self.zustand;
        let angewendet = z.uhr.add(delta);
        let restzeit = z.uhr.remaining();

        if matches!(z.phase, Phase::Idle | Phase::Armed) {
            z.uhr.set_total(restzeit);
            z.phase = z.ruhephase();
        } else {
            // Fortschrittsbalken bleibt sinnvoll: Total waechst/schrumpft mit
            let total = (i64::from(z.uhr.total()) + angewendet)
                .clamp(i64::from(restzeit), i64::from(u32::MAX));
            z.uhr.set_total(total as u32);
            // Verbrauch im Aparte bleibt gleich
            if let Phase::Interjecting(ctx) = &mut z.phase {
                ctx.granted_seconds = (i64::from(ctx.granted_seconds) + angewendet)
                    .clamp(0, i64::from(u32::MAX)) as u32;
            }
        }
        if restzeit > 0 {
            z.time_expired = false;
        }
        info!(delta, angewendet, restzeit, "Zeit angepasst");

        if restzeit == 0 && self.zustand.clock_running() {
            self.ablauf();
        }
        self.veroeffentlichen();
    }

    /// Schaltet die Aparte-Vorbereitung ein oder wieder aus
    ///
    /// Voraussetzung: Uhr laeuft fuer den Hauptredner, ein anderer
    /// Redner ist gewaehlt und es ist Restzeit uebrig.
    pub fn begin_interjection_preparation(&mut self) -> FloorResult<()> {
        let z = &mut self.zustand;
        match z.phase.art() {
            Sitzungsphase::PreparingInterjection => {
                z.phase = Phase::Running;
                info!("Aparte-Vorbereitung abgebrochen");
            }
            Sitzungsphase::Running => {
                let Some(principal) = z.principal_speaker.as_ref() else {
                    return Err(FloorError::AparteNichtMoeglich("kein Hauptredner"));
                };
                let recipient = match z.candidate.as_ref() {
                    Some(c) if c.id != principal.id => c.clone(),
                    _ => {
                        return Err(FloorError::AparteNichtMoeglich(
                            "zuerst einen anderen Redner auswaehlen",
                        ))
                    }
                };
                if z.uhr.remaining() == 0 {
                    return Err(FloorError::AparteNichtMoeglich("keine Restzeit"));
                }
                info!(empfaenger = %recipient.id, "Aparte wird vorbereitet");
                z.phase = Phase::PreparingInterjection { recipient };
            }
            Sitzungsphase::Interjecting => {
                return Err(FloorError::AparteNichtMoeglich("es laeuft bereits ein Aparte"))
            }
            phase => return Err(FloorError::KeineLaufendeRede(phase)),
        }
        self.veroeffentlichen();
        Ok(())
    }

    /// Vergibt ein Aparte (nur ueber `set_time` in der Vorbereitung)
    pub(crate) fn grant_interjection(
        &mut self,
        recipient: Speaker,
        sekunden: u32,
    ) -> FloorResult<()> {
        debug_assert!(
            matches!(self.zustand.phase, Phase::PreparingInterjection { .. }),
            "grant_interjection ausserhalb der Vorbereitung"
        );
        debug_assert!(
            self.zustand.principal_speaker.is_some(),
            "grant_interjection ohne Hauptredner"
        );
        let Some(grantor) = self.zustand.principal_speaker.clone() else {
            return Err(FloorError::Vertragsverletzung("Aparte ohne Hauptredner"));
        };

        let z = &mut self.zustand;
        let restzeit = z.uhr.remaining();
        if restzeit == 0 {
            return Err(FloorError::AparteNichtMoeglich("keine Restzeit"));
        }
        let gewaehrt = sekunden.min(restzeit);
        if gewaehrt < sekunden {
            debug!(angefragt = sekunden, gewaehrt, "Aparte auf Restzeit gekappt");
        }

        let ctx = InterjectionContext {
            grantor,
            recipient: recipient.clone(),
            grantor_saved_remaining: restzeit,
            grantor_saved_total: z.uhr.total(),
            granted_seconds: gewaehrt,
        };
        z.live_speaker = Some(recipient.clone());
        z.uhr.set(gewaehrt);
        z.phase = Phase::Interjecting(ctx);
        z.staged_seconds = None;
        z.time_expired = false;
        z.uhr.start();
        self.gate.open();

        info!(
            empfaenger = %recipient.id,
            gewaehrt,
            restzeit_hauptredner = restzeit,
            "Aparte vergeben"
        );
        self.veroeffentlichen();
        Ok(())
    }

    /// Beendet das Aparte und gibt dem Hauptredner das Wort zurueck
    ///
    /// Mit Restzeit laeuft seine Uhr automatisch weiter.
    pub fn end_interjection(&mut self) -> FloorResult<()> {
        if !matches!(self.zustand.phase, Phase::Interjecting(_)) {
            return Err(FloorError::KeinAparte);
        }
        let restzeit = self.aparte_beenden(AparteEndeGrund::Bediener);
        if restzeit > 0 {
            self.zustand.phase = Phase::Running;
            self.zustand.uhr.start();
            self.gate.open();
            info!(restzeit, "Hauptredner spricht weiter");
        } else {
            self.zustand.time_expired = true;
            let speaker = self.zustand.live_speaker.clone();
            warn!("Zeit des Hauptredners nach dem Aparte abgelaufen");
            self.melden(Hinweis::ZeitAbgelaufen { speaker });
        }
        self.veroeffentlichen();
        Ok(())
    }

    /// Bucht das Aparte zurueck; hinterlaesst die Phase `Paused` bei stehender Uhr
    fn aparte_beenden(&mut self, grund: AparteEndeGrund) -> u32 {
        self.zustand.uhr.pause();
        self.gate.cut();

        let z = &mut self.zustand;
        let Phase::Interjecting(ctx) = std::mem::replace(&mut z.phase, Phase::Paused) else {
            return z.uhr.remaining();
        };
        let restzeit_empfaenger = z.uhr.remaining();
        let verbraucht = ctx.verbraucht(restzeit_empfaenger);
        let restzeit = ctx.wiederhergestellt(restzeit_empfaenger);

        z.live_speaker = Some(ctx.grantor.clone());
        z.uhr.set_budget(TimeBudget {
            total_seconds: ctx.grantor_saved_total,
            remaining_seconds: restzeit,
        });
        z.staged_seconds = None;

        info!(
            empfaenger = %ctx.recipient.id,
            verbraucht,
            restzeit,
            grund = ?grund,
            "Aparte beendet"
        );
        self.melden(Hinweis::AparteBeendet {
            recipient: ctx.recipient,
            verbraucht,
            grund,
        });
        restzeit
    }

    // -----------------------------------------------------------------------
    // Takt und Relais
    // -----------------------------------------------------------------------

    /// Ein Sekundentakt; bei stehender Uhr wird er ignoriert
    pub fn on_tick(&mut self) {
        if !self.zustand.clock_running() {
            trace!("Takt bei stehender Uhr ignoriert");
            return;
        }
        if self.zustand.uhr.tick() {
            self.ablauf();
        }
        self.veroeffentlichen();
    }

    /// Restzeit ist bei laufender Uhr auf null gefallen
    fn ablauf(&mut self) {
        if matches!(self.zustand.phase, Phase::Interjecting(_)) {
            // Hauptredner bekommt das Wort zurueck, seine Uhr bleibt stehen
            let restzeit = self.aparte_beenden(AparteEndeGrund::Abgelaufen);
            if restzeit == 0 {
                self.zustand.time_expired = true;
                let speaker = self.zustand.live_speaker.clone();
                warn!("Aparte abgelaufen, Hauptredner hat keine Restzeit");
                self.melden(Hinweis::ZeitAbgelaufen { speaker });
            }
            return;
        }

        self.zustand.uhr.pause();
        self.gate.cut();
        self.zustand.phase = Phase::Paused;
        self.zustand.time_expired = true;
        let speaker = self.zustand.live_speaker.clone();
        warn!(redner = ?speaker.as_ref().map(|s| s.id), "Redezeit abgelaufen");
        self.melden(Hinweis::ZeitAbgelaufen { speaker });
    }

    /// Relais hat (neu) verbunden und dabei gekappt
    ///
    /// Laeuft eine Uhr, wird die Freigabe erneut gesetzt.
    pub fn relay_verbunden(&mut self, port: &str) {
        self.relay_connected = true;
        if self.zustand.clock_running() {
            self.gate.open();
            debug!("Freigabe nach Relais-Verbindung erneut gesetzt");
        }
        self.melden(Hinweis::RelaisVerbunden {
            port: port.to_string(),
        });
        self.veroeffentlichen();
    }

    /// Relais nicht erreichbar; die Uhr laeuft weiter
    pub fn relay_getrennt(&mut self) {
        self.relay_connected = false;
        warn!("Relais nicht erreichbar, Redezeit laeuft ohne Audiosteuerung weiter");
        self.melden(Hinweis::RelaisGetrennt);
        self.veroeffentlichen();
    }

    /// Der Sekundentakt kam zu spaet: Rede anhalten und laut melden
    pub fn takt_fehler(&mut self, verspaetung: Duration) {
        let verspaetung_ms = verspaetung.as_millis() as u64;
        error!(verspaetung_ms, "Taktgeber gestoert, Rede wird angehalten");
        if self.zustand.clock_running() {
            let z = &mut self.zustand;
            if matches!(z.phase, Phase::Running | Phase::PreparingInterjection { .. }) {
                z.phase = Phase::Paused;
            }
            z.uhr.pause();
            self.gate.cut();
        }
        self.melden(Hinweis::TaktGestoert { verspaetung_ms });
        self.veroeffentlichen();
    }

    /// Beim Beenden des Programms: Uhr anhalten, Mikrofon freigeben
    pub fn beenden(&mut self) {
        self.zustand.uhr.pause();
        self.gate.open();
        info!("Steuerung beendet, Mikrofon freigegeben");
    }
}
