//! Audio system
//!
//! The game only needs "play sound by key" and "set/fade background volume".
//! `AudioService` is that contract; `Mixer` applies the player's volume and
//! mute preferences on top of it. Playback failures never reach gameplay.

use rand::Rng;

use crate::settings::Settings;

/// Sound effect keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKey {
    /// Wall / paddle / non-lethal brick hit variants
    Hit1,
    Hit2,
    Hit3,
    /// Fruit brick breaks
    Break,
    GameOver,
    LevelUp,
    Click,
    GameStart,
    RankingOpen,
    BombExplode,
    RainbowHit,
    /// Bonus CROSS brick appears
    CrossAppear,
    /// CROSS sweep begins
    CrossStart,
    CrossLoop,
    /// Countdown at 3 and 2
    Countdown32,
    /// Countdown at 1
    Countdown1,
}

impl SoundKey {
    pub const ALL: [SoundKey; 16] = [
        SoundKey::Hit1,
        SoundKey::Hit2,
        SoundKey::Hit3,
        SoundKey::Break,
        SoundKey::GameOver,
        SoundKey::LevelUp,
        SoundKey::Click,
        SoundKey::GameStart,
        SoundKey::RankingOpen,
        SoundKey::BombExplode,
        SoundKey::RainbowHit,
        SoundKey::CrossAppear,
        SoundKey::CrossStart,
        SoundKey::CrossLoop,
        SoundKey::Countdown32,
        SoundKey::Countdown1,
    ];

    /// Asset path for this sound
    pub fn src(self) -> &'static str {
        match self {
            SoundKey::Hit1 => "./assets/sounds/hit1.wav",
            SoundKey::Hit2 => "./assets/sounds/hit2.wav",
            // TODO: hit3 and break still share hit1's sample until dedicated files exist
            SoundKey::Hit3 => "./assets/sounds/hit1.wav",
            SoundKey::Break => "./assets/sounds/hit1.wav",
            SoundKey::GameOver => "./assets/sounds/gameover.wav",
            SoundKey::LevelUp => "./assets/sounds/levelup.wav",
            SoundKey::Click => "./assets/sounds/click.wav",
            SoundKey::GameStart => "./assets/sounds/game_start.wav",
            SoundKey::RankingOpen => "./assets/sounds/ranking_open.wav",
            SoundKey::BombExplode => "./assets/sounds/bomb_explode.wav",
            SoundKey::RainbowHit => "./assets/sounds/rainbow_hit.wav",
            SoundKey::CrossAppear => "./assets/sounds/cross_appear.wav",
            SoundKey::CrossStart => "./assets/sounds/cross_start.wav",
            SoundKey::CrossLoop => "./assets/sounds/cross_loop.wav",
            SoundKey::Countdown32 => "./assets/sounds/count.wav",
            SoundKey::Countdown1 => "./assets/sounds/game_start.wav",
        }
    }

    /// One of the three hit variants, chosen at random
    pub fn random_hit<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.random_range(0..3) {
            0 => SoundKey::Hit1,
            1 => SoundKey::Hit2,
            _ => SoundKey::Hit3,
        }
    }
}

/// Number of background tracks the player can rotate through
pub const BACKGROUND_TRACKS: u32 = 5;

/// Asset path for background track `n` (1-based)
pub fn background_src(track: u32) -> String {
    format!("./assets/sounds/bgm{}.wav", track.clamp(1, BACKGROUND_TRACKS))
}

/// Playback backend. Implementations swallow their own failures.
pub trait AudioService {
    /// Make `key` ready to play from `src`
    fn preload(&mut self, key: SoundKey, src: &str);
    /// Fire-and-forget playback at `volume` (0.0 - 1.0)
    fn play(&mut self, key: SoundKey, volume: f32);
    /// Set background music volume immediately
    fn set_background_volume(&mut self, volume: f32);
    /// Ramp background music volume to `target` over `duration_ms`
    fn fade_background_volume(&mut self, target: f32, duration_ms: f64);
    /// Swap the looping background track
    fn select_background_track(&mut self, _track: u32) {}
    /// Start or pause the background track
    fn set_background_playing(&mut self, _playing: bool) {}
    /// Advance time-based work such as fades
    fn update(&mut self, _now_ms: f64) {}
}

/// Silent backend (headless runs)
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioService for NullAudio {
    fn preload(&mut self, _key: SoundKey, _src: &str) {}
    fn play(&mut self, _key: SoundKey, _volume: f32) {}
    fn set_background_volume(&mut self, _volume: f32) {}
    fn fade_background_volume(&mut self, _target: f32, _duration_ms: f64) {}
}

/// Applies player volume preferences to an `AudioService`
pub struct Mixer {
    service: Box<dyn AudioService>,
    settings: Settings,
    /// Background held silent by a running effect
    held: bool,
    /// A run wants the background track playing (mute permitting)
    background_wanted: bool,
}

impl Mixer {
    /// Wrap a backend and preload every sound effect
    pub fn new(mut service: Box<dyn AudioService>, settings: Settings) -> Self {
        for key in SoundKey::ALL {
            service.preload(key, key.src());
        }
        Self {
            service,
            settings,
            held: false,
            background_wanted: false,
        }
    }

    /// Play a sound effect (respects sfx mute/volume)
    pub fn play(&mut self, key: SoundKey) {
        if self.settings.sfx_muted || self.settings.sfx_volume <= 0.0 {
            return;
        }
        self.service.play(key, self.settings.sfx_volume);
    }

    /// Live background target volume (reads current preferences)
    pub fn background_target(&self) -> f32 {
        if self.settings.bgm_muted {
            0.0
        } else {
            self.settings.bgm_volume
        }
    }

    /// Silence the background until `release_background`
    pub fn hold_background(&mut self) {
        self.held = true;
        self.service.set_background_volume(0.0);
    }

    /// Set a fraction of the target volume while held (fade-in steps)
    pub fn set_background_fraction(&mut self, fraction: f32) {
        let volume = self.background_target() * fraction.clamp(0.0, 1.0);
        self.service.set_background_volume(volume);
    }

    /// Restore the exact target volume and stop holding
    pub fn release_background(&mut self) {
        self.held = false;
        self.service.set_background_volume(self.background_target());
    }

    pub fn is_background_held(&self) -> bool {
        self.held
    }

    /// Swap in new preferences; the background glides to the new target
    pub fn apply_settings(&mut self, settings: Settings) {
        let mute_changed = settings.bgm_muted != self.settings.bgm_muted;
        self.settings = settings;
        if mute_changed && self.background_wanted {
            self.service.set_background_playing(!self.settings.bgm_muted);
        }
        if !self.held {
            self.service
                .fade_background_volume(self.background_target(), 250.0);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn select_background_track(&mut self, track: u32) {
        self.service.select_background_track(track);
        if !self.held {
            self.service.set_background_volume(self.background_target());
        }
    }

    pub fn set_background_playing(&mut self, playing: bool) {
        self.background_wanted = playing;
        self.service
            .set_background_playing(playing && !self.settings.bgm_muted);
    }

    pub fn update(&mut self, now_ms: f64) {
        self.service.update(now_ms);
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("settings", &self.settings)
            .field("held", &self.held)
            .field("background_wanted", &self.background_wanted)
            .finish()
    }
}

/// Pooled `<audio>` element backend for the browser
#[cfg(target_arch = "wasm32")]
pub mod web {
    use std::collections::HashMap;

    use wasm_bindgen::JsValue;
    use wasm_bindgen::closure::Closure;
    use web_sys::HtmlAudioElement;

    use super::{AudioService, SoundKey, background_src};

    /// Elements per sound, so rapid repeats overlap instead of restarting
    const POOL_SIZE: usize = 4;

    struct Fade {
        from: f32,
        to: f32,
        duration_ms: f64,
        start_ms: Option<f64>,
    }

    pub struct AudioPool {
        pools: HashMap<SoundKey, (Vec<HtmlAudioElement>, usize)>,
        background: Option<HtmlAudioElement>,
        background_volume: f32,
        fade: Option<Fade>,
        /// Swallows rejected play() promises (autoplay policy)
        ignore: Closure<dyn FnMut(JsValue)>,
    }

    impl Default for AudioPool {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioPool {
        pub fn new() -> Self {
            Self {
                pools: HashMap::new(),
                background: None,
                background_volume: 0.0,
                fade: None,
                ignore: Closure::new(|_err: JsValue| {}),
            }
        }

        fn start(&self, el: &HtmlAudioElement) {
            if let Ok(promise) = el.play() {
                let _ = promise.catch(&self.ignore);
            }
        }
    }

    impl AudioService for AudioPool {
        fn preload(&mut self, key: SoundKey, src: &str) {
            if self.pools.contains_key(&key) {
                return;
            }
            let elements: Vec<HtmlAudioElement> = (0..POOL_SIZE)
                .filter_map(|_| HtmlAudioElement::new_with_src(src).ok())
                .inspect(|el| el.set_preload("auto"))
                .collect();
            if elements.is_empty() {
                log::warn!("Audio unavailable for {:?}", key);
                return;
            }
            self.pools.insert(key, (elements, 0));
        }

        fn play(&mut self, key: SoundKey, volume: f32) {
            let Some((pool, next)) = self.pools.get_mut(&key) else {
                return;
            };
            let el = pool[*next].clone();
            *next = (*next + 1) % pool.len();
            el.set_current_time(0.0);
            el.set_volume(volume.clamp(0.0, 1.0) as f64);
            self.start(&el);
        }

        fn set_background_volume(&mut self, volume: f32) {
            self.fade = None;
            self.background_volume = volume.clamp(0.0, 1.0);
            if let Some(bg) = &self.background {
                bg.set_volume(self.background_volume as f64);
            }
        }

        fn fade_background_volume(&mut self, target: f32, duration_ms: f64) {
            self.fade = Some(Fade {
                from: self.background_volume,
                to: target.clamp(0.0, 1.0),
                duration_ms: duration_ms.max(1.0),
                start_ms: None,
            });
        }

        fn select_background_track(&mut self, track: u32) {
            if let Some(old) = self.background.take() {
                let _ = old.pause();
                let _ = old.remove_attribute("src");
                old.load();
            }
            match HtmlAudioElement::new_with_src(&background_src(track)) {
                Ok(bg) => {
                    bg.set_loop(true);
                    bg.set_volume(self.background_volume as f64);
                    self.background = Some(bg);
                }
                Err(_) => log::warn!("Background track {} unavailable", track),
            }
        }

        fn set_background_playing(&mut self, playing: bool) {
            let Some(bg) = self.background.clone() else {
                return;
            };
            if playing {
                self.start(&bg);
            } else {
                let _ = bg.pause();
            }
        }

        fn update(&mut self, now_ms: f64) {
            let Some(fade) = self.fade.as_mut() else {
                return;
            };
            let start = *fade.start_ms.get_or_insert(now_ms);
            let t = ((now_ms - start) / fade.duration_ms).clamp(0.0, 1.0) as f32;
            self.background_volume = fade.from + (fade.to - fade.from) * t;
            if let Some(bg) = &self.background {
                bg.set_volume(self.background_volume as f64);
            }
            if t >= 1.0 {
                self.fade = None;
            }
        }
    }
}

/// Recording backend for tests
#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{AudioService, SoundKey};

    #[derive(Debug, Clone, PartialEq)]
    pub enum AudioCall {
        Play(SoundKey),
        BackgroundVolume(f32),
        Fade(f32),
        Track(u32),
        Playing(bool),
    }

    /// Shares its call log so tests can inspect it after boxing
    #[derive(Debug, Clone, Default)]
    pub struct RecordingAudio {
        pub calls: Rc<RefCell<Vec<AudioCall>>>,
    }

    impl RecordingAudio {
        pub fn played(&self, key: SoundKey) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| **c == AudioCall::Play(key))
                .count()
        }

        pub fn background_volumes(&self) -> Vec<f32> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    AudioCall::BackgroundVolume(v) => Some(*v),
                    _ => None,
                })
                .collect()
        }
    }

    impl AudioService for RecordingAudio {
        fn preload(&mut self, _key: SoundKey, _src: &str) {}
        fn play(&mut self, key: SoundKey, _volume: f32) {
            self.calls.borrow_mut().push(AudioCall::Play(key));
        }
        fn set_background_volume(&mut self, volume: f32) {
            self.calls.borrow_mut().push(AudioCall::BackgroundVolume(volume));
        }
        fn fade_background_volume(&mut self, target: f32, _duration_ms: f64) {
            self.calls.borrow_mut().push(AudioCall::Fade(target));
        }
        fn select_background_track(&mut self, track: u32) {
            self.calls.borrow_mut().push(AudioCall::Track(track));
        }
        fn set_background_playing(&mut self, playing: bool) {
            self.calls.borrow_mut().push(AudioCall::Playing(playing));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{AudioCall, RecordingAudio};
    use super::*;

    #[test]
    fn test_muted_sfx_is_silent() {
        let rec = RecordingAudio::default();
        let mut mixer = Mixer::new(
            Box::new(rec.clone()),
            Settings {
                sfx_muted: true,
                ..Settings::default()
            },
        );
        mixer.play(SoundKey::Break);
        assert_eq!(rec.played(SoundKey::Break), 0);
    }

    #[test]
    fn test_hold_and_release_background() {
        let rec = RecordingAudio::default();
        let mut mixer = Mixer::new(Box::new(rec.clone()), Settings::default());
        mixer.hold_background();
        mixer.set_background_fraction(0.5);
        mixer.release_background();
        let target = Settings::default().bgm_volume;
        assert_eq!(rec.background_volumes(), vec![0.0, target * 0.5, target]);
        assert!(!mixer.is_background_held());
    }

    #[test]
    fn test_toggling_mute_starts_and_pauses_background() {
        let rec = RecordingAudio::default();
        let muted = Settings {
            bgm_muted: true,
            ..Settings::default()
        };
        let mut mixer = Mixer::new(Box::new(rec.clone()), muted.clone());
        mixer.set_background_playing(true);
        assert_eq!(rec.calls.borrow().last(), Some(&AudioCall::Playing(false)));

        mixer.apply_settings(Settings::default());
        assert!(rec.calls.borrow().contains(&AudioCall::Playing(true)));

        mixer.apply_settings(muted);
        let playing: Vec<AudioCall> = rec
            .calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, AudioCall::Playing(_)))
            .cloned()
            .collect();
        assert_eq!(
            playing,
            vec![
                AudioCall::Playing(false),
                AudioCall::Playing(true),
                AudioCall::Playing(false)
            ]
        );
    }

    #[test]
    fn test_mute_outside_a_run_leaves_playback_alone() {
        let rec = RecordingAudio::default();
        let mut mixer = Mixer::new(Box::new(rec.clone()), Settings::default());
        mixer.apply_settings(Settings {
            bgm_muted: true,
            ..Settings::default()
        });
        assert!(
            !rec.calls
                .borrow()
                .iter()
                .any(|c| matches!(c, AudioCall::Playing(_)))
        );
    }

    #[test]
    fn test_background_src_clamps_track() {
        assert_eq!(background_src(0), "./assets/sounds/bgm1.wav");
        assert_eq!(background_src(9), "./assets/sounds/bgm5.wav");
    }
}
