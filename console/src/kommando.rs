//! Befehlsparser fuer das Bedienpult
//!
//! Zeilenbasierte Befehle auf stdin:
//!   befehl [argument ...]
//!
//! Zeitangaben sind Sekunden (`90`) oder `mm:ss` (`1:30`).

use thiserror::Error;
use tribuna_core::SpeakerId;

/// Ein geparster Pult-Befehl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kommando {
    /// Rednerliste anzeigen, optional gefiltert
    Liste(Option<String>),
    Waehlen(SpeakerId),
    Zeit(u32),
    /// Schnellwahl aus `zeit_presets_min` (1-basiert)
    Preset(usize),
    Start,
    /// Start ohne gewaehlten Redner
    StartErzwingen,
    Pause,
    Stop,
    /// Ohne Argument: vorgemerkte Zeit addieren
    Plus(Option<u32>),
    Minus(Option<u32>),
    /// Aparte vorbereiten bzw. abbrechen
    Aparte,
    /// Aparte beenden
    Ende,
    Status,
    RelaisVerbinden(Option<String>),
    RelaisTrennen,
    RelaisPorts,
    Wechseln(String),
    Hilfe,
    Beenden,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KommandoFehler {
    #[error("Leere Befehlszeile")]
    Leer,

    #[error("Unbekannter Befehl: {0} (hilfe zeigt alle Befehle)")]
    Unbekannt(String),

    #[error("Argument fehlt: {0}")]
    ArgumentFehlt(&'static str),

    #[error("Ungueltige Zahl: {0}")]
    UngueltigeZahl(String),

    #[error("Ungueltige Zeitangabe: {0}")]
    UngueltigeZeit(String),

    #[error("Zu viele Argumente fuer '{0}'")]
    ZuVieleArgumente(String),
}

pub const HILFE: &str = "\
Befehle:
  liste [filter]           Rednerliste anzeigen
  waehlen <id>             Redner waehlen (im Aparte-Modus: Empfaenger)
  zeit <sek|mm:ss>         Redezeit setzen (im Aparte-Modus: Aparte gewaehren)
  preset <n>               Schnellwahl-Zeit n setzen
  start | start!           Uhr starten (start! auch ohne Redner)
  pause | stop             Uhr anhalten / Sitzung zuruecksetzen
  plus [sek] | minus [sek] Zeit aendern (ohne Angabe: vorgemerkte Zeit)
  aparte                   Aparte vorbereiten bzw. abbrechen
  ende                     Aparte beenden, Wort zurueck an den Hauptredner
  status                   Aktuellen Zustand anzeigen
  relais verbinden [port]  Relais verbinden (ohne Port: Auto-Erkennung)
  relais trennen           Relais trennen (Audio frei)
  relais ports             Serielle Ports auflisten
  wechseln <liste>         Andere Rednerliste laden
  hilfe | beenden";

/// Parst eine Befehlszeile
pub fn parsen(zeile: &str) -> Result<Kommando, KommandoFehler> {
    let mut tokens = zeile.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err(KommandoFehler::Leer);
    };
    let name = name.to_lowercase();
    let args: Vec<&str> = tokens.collect();

    let kommando = match name.as_str() {
        "liste" | "l" => Kommando::Liste((!args.is_empty()).then(|| args.join(" "))),
        "waehlen" | "w" => {
            keine_weiteren(&name, &args, 1)?;
            let id = args.first().ok_or(KommandoFehler::ArgumentFehlt("Redner-ID"))?;
            Kommando::Waehlen(SpeakerId(zahl(id)?))
        }
        "zeit" | "z" => {
            keine_weiteren(&name, &args, 1)?;
            let t = args.first().ok_or(KommandoFehler::ArgumentFehlt("Zeit"))?;
            Kommando::Zeit(sekunden(t)?)
        }
        "preset" | "p" => {
            keine_weiteren(&name, &args, 1)?;
            let n = args.first().ok_or(KommandoFehler::ArgumentFehlt("Preset-Nummer"))?;
            Kommando::Preset(zahl(n)? as usize)
        }
        "start" | "s" => ohne_argumente(&name, &args, Kommando::Start)?,
        "start!" | "s!" => ohne_argumente(&name, &args, Kommando::StartErzwingen)?,
        "pause" => ohne_argumente(&name, &args, Kommando::Pause)?,
        "stop" => ohne_argumente(&name, &args, Kommando::Stop)?,
        "plus" | "+" => {
            keine_weiteren(&name, &args, 1)?;
            Kommando::Plus(args.first().map(|t| sekunden(t)).transpose()?)
        }
        "minus" | "-" => {
            keine_weiteren(&name, &args, 1)?;
            Kommando::Minus(args.first().map(|t| sekunden(t)).transpose()?)
        }
        "aparte" | "a" => ohne_argumente(&name, &args, Kommando::Aparte)?,
        "ende" | "e" => ohne_argumente(&name, &args, Kommando::Ende)?,
        "status" => ohne_argumente(&name, &args, Kommando::Status)?,
        "relais" | "r" => relais(&args)?,
        "wechseln" => {
            keine_weiteren(&name, &args, 1)?;
            let liste = args.first().ok_or(KommandoFehler::ArgumentFehlt("Listenname"))?;
            Kommando::Wechseln((*liste).to_string())
        }
        "hilfe" | "?" | "help" => Kommando::Hilfe,
        "beenden" | "quit" | "exit" => ohne_argumente(&name, &args, Kommando::Beenden)?,
        _ => return Err(KommandoFehler::Unbekannt(name)),
    };
    Ok(kommando)
}

fn relais(args: &[&str]) -> Result<Kommando, KommandoFehler> {
    let unter = args
        .first()
        .ok_or(KommandoFehler::ArgumentFehlt("verbinden | trennen | ports"))?
        .to_lowercase();
    match unter.as_str() {
        "verbinden" => {
            keine_weiteren("relais verbinden", &args[1..], 1)?;
            Ok(Kommando::RelaisVerbinden(args.get(1).map(|p| p.to_string())))
        }
        "trennen" => ohne_argumente("relais trennen", &args[1..], Kommando::RelaisTrennen),
        "ports" => ohne_argumente("relais ports", &args[1..], Kommando::RelaisPorts),
        _ => Err(KommandoFehler::Unbekannt(format!("relais {unter}"))),
    }
}

fn ohne_argumente(name: &str, args: &[&str], k: Kommando) -> Result<Kommando, KommandoFehler> {
    keine_weiteren(name, args, 0)?;
    Ok(k)
}

fn keine_weiteren(name: &str, args: &[&str], max: usize) -> Result<(), KommandoFehler> {
    if args.len() > max {
        return Err(KommandoFehler::ZuVieleArgumente(name.to_string()));
    }
    Ok(())
}

fn zahl(s: &str) -> Result<u32, KommandoFehler> {
    s.parse::<u32>()
        .map_err(|_| KommandoFehler::UngueltigeZahl(s.to_string()))
}

/// Sekunden aus `90` oder `1:30`
pub fn sekunden(s: &str) -> Result<u32, KommandoFehler> {
    let ungueltig = || KommandoFehler::UngueltigeZeit(s.to_string());
    match s.split_once(':') {
        None => s.parse::<u32>().map_err(|_| ungueltig()),
        Some((min, sek)) => {
            let min: u32 = min.parse().map_err(|_| ungueltig())?;
            let sek: u32 = sek.parse().map_err(|_| ungueltig())?;
            if sek >= 60 || sek_text_ungueltig(s) {
                return Err(ungueltig());
            }
            min.checked_mul(60)
                .and_then(|m| m.checked_add(sek))
                .ok_or_else(ungueltig)
        }
    }
}

/// Sekundenanteil muss zweistellig sein (`1:05`, nicht `1:5`)
fn sek_text_ungueltig(s: &str) -> bool {
    s.rsplit(':').next().map_or(true, |sek| sek.len() != 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn einfache_befehle() {
        assert_eq!(parsen("start").unwrap(), Kommando::Start);
        assert_eq!(parsen("  START  ").unwrap(), Kommando::Start);
        assert_eq!(parsen("start!").unwrap(), Kommando::StartErzwingen);
        assert_eq!(parsen("pause").unwrap(), Kommando::Pause);
        assert_eq!(parsen("stop").unwrap(), Kommando::Stop);
        assert_eq!(parsen("aparte").unwrap(), Kommando::Aparte);
        assert_eq!(parsen("ende").unwrap(), Kommando::Ende);
        assert_eq!(parsen("beenden").unwrap(), Kommando::Beenden);
    }

    #[test]
    fn befehle_mit_argumenten() {
        assert_eq!(parsen("waehlen 12").unwrap(), Kommando::Waehlen(SpeakerId(12)));
        assert_eq!(parsen("zeit 300").unwrap(), Kommando::Zeit(300));
        assert_eq!(parsen("zeit 5:00").unwrap(), Kommando::Zeit(300));
        assert_eq!(parsen("preset 3").unwrap(), Kommando::Preset(3));
        assert_eq!(parsen("plus").unwrap(), Kommando::Plus(None));
        assert_eq!(parsen("plus 30").unwrap(), Kommando::Plus(Some(30)));
        assert_eq!(parsen("- 0:15").unwrap(), Kommando::Minus(Some(15)));
        assert_eq!(parsen("wechseln solene").unwrap(), Kommando::Wechseln("solene".into()));
        assert_eq!(
            parsen("liste partido novo").unwrap(),
            Kommando::Liste(Some("partido novo".into()))
        );
        assert_eq!(parsen("liste").unwrap(), Kommando::Liste(None));
    }

    #[test]
    fn relais_unterbefehle() {
        assert_eq!(parsen("relais verbinden").unwrap(), Kommando::RelaisVerbinden(None));
        assert_eq!(
            parsen("relais verbinden /dev/ttyACM0").unwrap(),
            Kommando::RelaisVerbinden(Some("/dev/ttyACM0".into()))
        );
        assert_eq!(parsen("relais trennen").unwrap(), Kommando::RelaisTrennen);
        assert_eq!(parsen("r ports").unwrap(), Kommando::RelaisPorts);
        assert!(matches!(parsen("relais"), Err(KommandoFehler::ArgumentFehlt(_))));
        assert!(matches!(parsen("relais blinken"), Err(KommandoFehler::Unbekannt(_))));
    }

    #[test]
    fn fehlerfaelle() {
        assert_eq!(parsen("   "), Err(KommandoFehler::Leer));
        assert!(matches!(parsen("tanzen"), Err(KommandoFehler::Unbekannt(_))));
        assert!(matches!(parsen("waehlen"), Err(KommandoFehler::ArgumentFehlt(_))));
        assert!(matches!(parsen("waehlen abc"), Err(KommandoFehler::UngueltigeZahl(_))));
        assert!(matches!(parsen("zeit -5"), Err(KommandoFehler::UngueltigeZeit(_))));
        assert!(matches!(parsen("start jetzt"), Err(KommandoFehler::ZuVieleArgumente(_))));
        assert!(matches!(parsen("zeit 1 2"), Err(KommandoFehler::ZuVieleArgumente(_))));
    }

    #[test]
    fn zeitangaben() {
        assert_eq!(sekunden("0").unwrap(), 0);
        assert_eq!(sekunden("1:30").unwrap(), 90);
        assert_eq!(sekunden("15:00").unwrap(), 900);
        assert!(sekunden("1:60").is_err());
        assert!(sekunden("1:5").is_err());
        assert!(sekunden(":30").is_err());
        assert!(sekunden("1:30:00").is_err());
        assert!(sekunden("").is_err());
    }
}
