//! Integration-Tests fuer das Aparte-Protokoll

mod common;

use common::*;
use tribuna_core::{AparteEndeGrund, Anzeigestufe, Hinweis, Sitzungsphase};
use tribuna_floor::{FloorError, Phase};

#[test]
fn aparte_bucht_nur_verbrauchte_zeit_ab() {
    let (mut c, _, senke) = aparte(120, 60);
    assert_eq!(c.zustand().live_speaker, Some(maria()));
    assert_eq!(c.budget().remaining_seconds, 60);

    ticks(&mut c, 40);
    c.end_interjection().unwrap();

    assert_eq!(c.budget().remaining_seconds, 80);
    assert_eq!(c.budget().total_seconds, 120);
    assert_eq!(c.zustand().live_speaker, Some(joao()));
    assert_eq!(c.zustand().phase, Phase::Running);
    assert!(c.zustand().clock_running());
    assert!(senke.hinweise().contains(&Hinweis::AparteBeendet {
        recipient: maria(),
        verbraucht: 40,
        grund: AparteEndeGrund::Bediener,
    }));
}

#[test]
fn rueckbuchung_fuer_jeden_verbrauch() {
    for (rest, gewaehrt, genutzt) in [(120, 60, 0), (120, 60, 60), (45, 30, 17), (10, 10, 10)] {
        let (mut c, _, _) = aparte(rest, gewaehrt);
        ticks(&mut c, genutzt);
        if c.zustand().interjection().is_some() {
            c.end_interjection().unwrap();
        }
        assert_eq!(c.budget().remaining_seconds, rest - genutzt, "rest={rest} genutzt={genutzt}");
        assert_eq!(c.budget().total_seconds, rest);
    }
}

#[test]
fn aparte_wird_auf_restzeit_gekappt() {
    let (mut c, _, senke) = laufende_rede(100);
    ticks(&mut c, 70);
    c.select_speaker(maria());
    c.begin_interjection_preparation().unwrap();
    c.set_time(120).unwrap();
    assert_eq!(c.budget().remaining_seconds, 30);
    assert_eq!(c.zustand().interjection().unwrap().granted_seconds, 30);
    assert_eq!(senke.letzter().aparte.unwrap().granted_seconds, 30);
}

#[test]
fn vorbereitung_zweimal_ist_neutral() {
    let (mut c, _, _) = laufende_rede(120);
    ticks(&mut c, 5);
    c.select_speaker(maria());
    let budget = c.budget();

    c.begin_interjection_preparation().unwrap();
    c.begin_interjection_preparation().unwrap();

    assert_eq!(c.zustand().phase, Phase::Running);
    assert_eq!(c.budget(), budget);
    assert_eq!(c.zustand().candidate, Some(maria()));
    assert_eq!(c.zustand().principal_speaker, Some(joao()));
    assert_eq!(c.zustand().live_speaker, Some(joao()));
    // set_time merkt danach wieder nur vor
    c.set_time(30).unwrap();
    assert_eq!(c.zustand().staged_seconds, Some(30));
    assert!(c.zustand().interjection().is_none());
}

#[test]
fn anderer_kandidat_waehrend_vorbereitung_wird_empfaenger() {
    let (mut c, _, _) = laufende_rede(120);
    c.select_speaker(maria());
    c.begin_interjection_preparation().unwrap();
    c.select_speaker(ana());
    c.set_time(20).unwrap();
    assert_eq!(c.zustand().interjection().unwrap().recipient, ana());
}

#[test]
fn aparte_daten_genau_im_aparte() {
    let (mut c, _, senke) = laufende_rede(200);
    let pruefen = |c: &Steuerung| {
        assert_eq!(
            c.zustand().interjection().is_some(),
            matches!(c.zustand().phase, Phase::Interjecting(_))
        );
    };
    pruefen(&c);
    c.select_speaker(maria());
    c.begin_interjection_preparation().unwrap();
    pruefen(&c);
    c.set_time(20).unwrap();
    pruefen(&c);
    assert!(senke.letzter().interjection_active);
    assert_eq!(senke.letzter().anzeigestufe, Anzeigestufe::Aparte);
    c.pause().unwrap();
    pruefen(&c);
    c.start().unwrap();
    ticks(&mut c, 20);
    pruefen(&c);
    c.start().unwrap();
    pruefen(&c);
    c.stop();
    pruefen(&c);
}

#[test]
fn kein_verschachteltes_aparte() {
    let (mut c, _, _) = aparte(120, 60);
    c.select_speaker(ana());
    assert!(matches!(
        c.begin_interjection_preparation(),
        Err(FloorError::AparteNichtMoeglich(_))
    ));
}

#[test]
fn abgelaufenes_aparte_mit_resten_wartet_auf_bediener() {
    let (mut c, relais, senke) = aparte(120, 30);
    ticks(&mut c, 30);

    assert!(c.zustand().interjection().is_none());
    assert_eq!(c.zustand().live_speaker, Some(joao()));
    assert_eq!(c.budget().remaining_seconds, 90);
    assert_eq!(c.zustand().phase, Phase::Paused);
    assert!(!c.zustand().clock_running());
    assert!(!c.zustand().time_expired);
    assert_eq!(relais.letztes(), Some(Relais::Gekappt));
    assert!(matches!(
        senke.hinweise().last(),
        Some(Hinweis::AparteBeendet {
            grund: AparteEndeGrund::Abgelaufen,
            verbraucht: 30,
            ..
        })
    ));

    // Bediener startet den Hauptredner neu
    c.start().unwrap();
    assert_eq!(relais.letztes(), Some(Relais::Offen));
    ticks(&mut c, 1);
    assert_eq!(c.budget().remaining_seconds, 89);
}

#[test]
fn abgelaufenes_aparte_ohne_reste_meldet_ablauf() {
    let (mut c, relais, senke) = aparte(30, 30);
    ticks(&mut c, 30);

    assert_eq!(c.zustand().phase, Phase::Paused);
    assert_eq!(c.budget().remaining_seconds, 0);
    assert_eq!(c.budget().total_seconds, 30);
    assert!(c.zustand().time_expired);
    assert_eq!(relais.letztes(), Some(Relais::Gekappt));
    assert_eq!(senke.abgelaufen_meldungen(), 1);
    assert_eq!(senke.letzter().phase, Sitzungsphase::Paused);

    // Weiter geht es nur ueber stop oder eine neue Zeit
    assert_eq!(c.start(), Err(FloorError::KeineZeit));
    c.stop();
    assert_eq!(c.zustand().phase, Phase::Idle);
    assert_eq!(c.budget().remaining_seconds, 30);
}

#[test]
fn ende_mit_letzter_sekunde_laeuft_weiter() {
    let (mut c, _, senke) = laufende_rede(60);
    ticks(&mut c, 50);
    c.select_speaker(maria());
    c.begin_interjection_preparation().unwrap();
    c.set_time(10).unwrap();
    ticks(&mut c, 9);
    c.end_interjection().unwrap();
    // 9 von 10 verbraucht, 1 bleibt
    assert_eq!(c.budget().remaining_seconds, 1);
    assert!(c.zustand().clock_running());
    c.on_tick();
    assert!(c.zustand().time_expired);
    assert_eq!(senke.abgelaufen_meldungen(), 1);
}

#[test]
fn relais_im_aparte() {
    let (mut c, relais, _) = aparte(120, 60);
    // start des Hauptredners, Freigabe fuer das Aparte
    assert_eq!(relais.kommandos(), vec![Relais::Offen, Relais::Offen]);
    ticks(&mut c, 10);
    c.end_interjection().unwrap();
    // kurz kappen, dann fuer den Hauptredner wieder frei
    assert_eq!(
        relais.kommandos(),
        vec![Relais::Offen, Relais::Offen, Relais::Gekappt, Relais::Offen]
    );
}
