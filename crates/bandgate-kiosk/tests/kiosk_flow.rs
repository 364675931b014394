//! The whole kiosk chain on mock devices, driven through the router.

use bandgate_core::{Classification, Event, Uid};
use bandgate_hardware::Color;
use bandgate_hardware::mock::{LightEffect, MockAudio, MockLights};
use bandgate_kiosk::{KioskDeps, KioskSettings, build_registry};
use bandgate_network::{Authorization, Authorizer, MediaColor, MediaConfig, RemoteSound, Routed, Router};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Grants the bands it knows, records every question.
struct GuestList {
    granted: Vec<(Uid, MediaConfig)>,
    asked: Mutex<Vec<(String, String)>>,
}

impl Authorizer for GuestList {
    fn authorize(&self, uid: &Uid, permission: &str) -> Authorization {
        self.asked
            .lock()
            .unwrap()
            .push((uid.to_string(), permission.to_string()));
        self.granted
            .iter()
            .find(|(known, _)| known == uid)
            .map_or(Authorization::Denied, |(_, config)| {
                Authorization::Granted(config.clone())
            })
    }
}

struct Kiosk {
    router: Router,
    audio: Arc<MockAudio>,
    lights: Arc<MockLights>,
    guests: Arc<GuestList>,
    _sounds: TempDir,
}

fn media(color: Option<u32>, sound: Option<&str>) -> MediaConfig {
    MediaConfig {
        color: color.map(|int| MediaColor {
            int,
            ..Default::default()
        }),
        sound: sound.map(|name| RemoteSound {
            name: name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn kiosk(granted: Vec<(&str, MediaConfig)>) -> Kiosk {
    let sounds = tempfile::tempdir().unwrap();
    for name in ["read.wav", "authorized.wav", "unauthorized.wav", "ada.wav"] {
        std::fs::write(sounds.path().join(name), b"RIFF").unwrap();
    }

    let audio = Arc::new(
        MockAudio::new()
            .with_sound_dir(sounds.path())
            .with_clip_length(Duration::from_millis(10)),
    );
    let lights = Arc::new(MockLights::new(8, 4).with_spin_frame(Duration::from_millis(1)));
    let guests = Arc::new(GuestList {
        granted: granted
            .into_iter()
            .map(|(uid, config)| (uid.parse().unwrap(), config))
            .collect(),
        asked: Mutex::new(Vec::new()),
    });

    let registry = build_registry(&KioskDeps {
        audio: audio.clone(),
        lights: lights.clone(),
        authorizer: guests.clone(),
        settings: KioskSettings {
            brightness: 60,
            ..Default::default()
        },
    })
    .unwrap();

    Kiosk {
        router: Router::new(registry),
        audio,
        lights,
        guests,
        _sounds: sounds,
    }
}

async fn scan(kiosk: &Kiosk, uid: &str) -> Event {
    match kiosk.router.route(Event::new(uid.parse().unwrap())).await.unwrap() {
        Routed::Chain(event) => event,
        Routed::Bridge => panic!("no bridge caller was waiting"),
    }
}

fn fade_on(lights: &MockLights) -> Vec<LightEffect> {
    lights
        .effects()
        .into_iter()
        .filter(|e| matches!(e, LightEffect::FadeOn { .. }))
        .collect()
}

#[tokio::test]
async fn test_authorized_scan_shows_media_color_and_sound() {
    let kiosk = kiosk(vec![("04AABB", media(Some(0xFF8000), Some("ada.wav")))]);

    let event = scan(&kiosk, "04aabb").await;

    assert_eq!(event.classification(), Classification::Authorized);
    assert_eq!(kiosk.audio.played(), vec!["read.wav", "ada.wav"]);
    assert_eq!(
        *kiosk.guests.asked.lock().unwrap(),
        vec![("04AABB".to_string(), "Open Door".to_string())]
    );

    let effects = kiosk.lights.effects();
    assert!(matches!(effects[0], LightEffect::Spin { color: Color::White, .. }));
    assert!(matches!(effects[1], LightEffect::SpinStopped { .. }));
    assert_eq!(
        effects[2..],
        [
            LightEffect::FadeOn {
                color: Color::rgb(0xFF, 0x80, 0x00),
                brightness: 60
            },
            LightEffect::FadeOff
        ]
    );
    assert!(kiosk.lights.is_dark());
}

#[tokio::test]
async fn test_authorized_scan_without_preferences_uses_defaults() {
    let kiosk = kiosk(vec![("0102", media(None, Some("missing.wav")))]);

    let event = scan(&kiosk, "0102").await;

    assert_eq!(event.classification(), Classification::Authorized);
    assert_eq!(kiosk.audio.played(), vec!["read.wav", "authorized.wav"]);
    assert_eq!(
        fade_on(&kiosk.lights),
        vec![LightEffect::FadeOn {
            color: Color::Green,
            brightness: 60
        }]
    );
}

#[tokio::test]
async fn test_unauthorized_scan_fades_blue() {
    let kiosk = kiosk(vec![]);

    let event = scan(&kiosk, "DEAD").await;

    assert_eq!(event.classification(), Classification::Unauthorized);
    assert_eq!(kiosk.audio.played(), vec!["read.wav", "unauthorized.wav"]);
    assert_eq!(
        fade_on(&kiosk.lights),
        vec![LightEffect::FadeOn {
            color: Color::Blue,
            brightness: 60
        }]
    );
    assert!(kiosk.lights.is_dark());
}

#[tokio::test]
async fn test_consecutive_scans_each_run_a_full_pass() {
    let kiosk = kiosk(vec![("AA", media(None, None))]);

    assert_eq!(scan(&kiosk, "AA").await.classification(), Classification::Authorized);
    assert_eq!(scan(&kiosk, "BB").await.classification(), Classification::Unauthorized);

    assert_eq!(
        kiosk.audio.played(),
        vec!["read.wav", "authorized.wav", "read.wav", "unauthorized.wav"]
    );
}

#[tokio::test]
async fn test_bridge_caller_bypasses_kiosk() {
    let kiosk = kiosk(vec![]);

    let caller = {
        let router = kiosk.router.clone();
        tokio::spawn(async move { router.wait_for_event(Duration::from_secs(5)).await })
    };
    while !kiosk.router.has_waiting_caller() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let routed = kiosk.router.route(Event::new("C0FFEE".parse().unwrap())).await.unwrap();

    assert_eq!(routed, Routed::Bridge);
    assert!(caller.await.is_ok());
    assert!(kiosk.audio.played().is_empty());
    assert!(kiosk.lights.effects().is_empty());
    assert!(kiosk.guests.asked.lock().unwrap().is_empty());
}
