//! Game session state machine
//!
//! `Session` owns the live `GameState` together with the injected audio and
//! score services, and moves between the screens of one play-through:
//!
//! ```text
//! InstagramGate -> ReadyToStart -> Countdown -> Playing -> LevelClear -> Countdown ...
//!                                                       -> GameOver -> Ranking <-> Admin
//! ```
//!
//! Every transition that ends a level cancels the CROSS timeline and any
//! resume countdown, so nothing scheduled for the old board can fire later.

use rand::Rng;
use serde::Serialize;

use crate::audio::{AudioService, BACKGROUND_TRACKS, Mixer, SoundKey};
use crate::error::{BreakoutError, Result};
use crate::highscores::{Action, GUEST, ScoreEntry, ScoreSink, is_rankable};
use crate::settings::Settings;
use crate::sim::effects;
use crate::sim::state::{Ball, Brick, GameEvent, GameState, Rect};
use crate::sim::tick::{FrameOutcome, TickInput, tick};
use crate::tuning::Tuning;

/// Undrained events kept before the oldest are dropped
const MAX_PENDING_EVENTS: usize = 1024;

/// A running 3-2-1 countdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    /// Number currently shown
    pub remaining: u8,
    /// Session time of the next decrement
    pub next_tick_ms: f64,
}

/// Sub-states of `GamePhase::Playing`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayState {
    Running,
    /// Physics frozen
    Paused,
    /// Counting down back into `Running`
    Resuming(Countdown),
}

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamePhase {
    InstagramGate,
    ReadyToStart,
    Countdown(Countdown),
    Playing(PlayState),
    LevelClear,
    GameOver,
    Ranking,
    Admin,
}

impl GamePhase {
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::InstagramGate => "instagram_gate",
            GamePhase::ReadyToStart => "ready_to_start",
            GamePhase::Countdown(_) => "countdown",
            GamePhase::Playing(PlayState::Running) => "playing",
            GamePhase::Playing(PlayState::Paused) => "paused",
            GamePhase::Playing(PlayState::Resuming(_)) => "resuming",
            GamePhase::LevelClear => "level_clear",
            GamePhase::GameOver => "game_over",
            GamePhase::Ranking => "ranking",
            GamePhase::Admin => "admin",
        }
    }

    /// Number shown by an active countdown
    pub fn countdown(&self) -> Option<u8> {
        match self {
            GamePhase::Countdown(c) | GamePhase::Playing(PlayState::Resuming(c)) => {
                Some(c.remaining)
            }
            _ => None,
        }
    }

    /// Phases belonging to a run in progress
    fn in_run(&self) -> bool {
        matches!(
            self,
            GamePhase::Countdown(_)
                | GamePhase::Playing(_)
                | GamePhase::LevelClear
                | GamePhase::GameOver
        )
    }
}

/// Everything the presentation layer needs to draw one frame
#[derive(Debug, Serialize)]
pub struct RenderSnapshot<'a> {
    pub phase: &'static str,
    pub countdown: Option<u8>,
    pub level: u32,
    pub score: u64,
    pub nickname: &'a str,
    pub paddle: Rect,
    pub bricks: Vec<&'a Brick>,
    /// Bricks mid destroy animation
    pub destroying: Vec<String>,
    pub balls: Vec<&'a Ball>,
    pub cross_center: Option<String>,
}

/// One player's session
pub struct Session {
    state: GameState,
    tuning: Tuning,
    mixer: Mixer,
    sink: Box<dyn ScoreSink>,
    phase: GamePhase,
    /// Phase to return to when the ranking is closed
    ranking_return: GamePhase,
    nickname: String,
    submitted: bool,
    pointer_x: Option<f32>,
    autoplay: bool,
    /// The first running frame after a (re)start moves at scale 1
    first_frame: bool,
}

impl Session {
    pub fn new(
        seed: u64,
        tuning: Tuning,
        audio: Box<dyn AudioService>,
        settings: Settings,
        sink: Box<dyn ScoreSink>,
    ) -> Self {
        let state = GameState::new(seed, &tuning);
        Self {
            state,
            tuning,
            mixer: Mixer::new(audio, settings),
            sink,
            phase: GamePhase::InstagramGate,
            ranking_return: GamePhase::ReadyToStart,
            nickname: GUEST.to_string(),
            submitted: false,
            pointer_x: None,
            autoplay: false,
            first_frame: true,
        }
    }

    fn invalid(&self, action: &'static str) -> BreakoutError {
        BreakoutError::InvalidTransition {
            action,
            phase: self.phase.name(),
        }
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase.name() != phase.name() {
            log::info!("Phase {} -> {}", self.phase.name(), phase.name());
        }
        self.phase = phase;
    }

    /// Drop the CROSS timeline and give the music back
    fn cancel_timers(&mut self) {
        self.state.cancel_effects();
        if self.mixer.is_background_held() {
            self.mixer.release_background();
        }
    }

    /// The player followed the account; the game unlocks
    pub fn follow_gate(&mut self) -> Result<()> {
        if self.phase != GamePhase::InstagramGate {
            return Err(self.invalid("follow_gate"));
        }
        self.track(Action::InstagramFollow);
        self.mixer.play(SoundKey::Click);
        self.set_phase(GamePhase::ReadyToStart);
        Ok(())
    }

    /// Start a fresh run (blank nickname plays as GUEST)
    pub fn start(&mut self, nickname: &str) -> Result<()> {
        if self.phase != GamePhase::ReadyToStart {
            return Err(self.invalid("start"));
        }
        let name = nickname.trim();
        self.nickname = if name.is_empty() { GUEST.to_string() } else { name.to_string() };
        self.submitted = false;

        self.mixer.play(SoundKey::GameStart);
        self.roll_background_track();
        self.mixer.set_background_playing(true);

        self.state.reset_for_level(1, false, &self.tuning);
        self.enter_countdown();
        log::info!("Run started for {}", self.nickname);
        Ok(())
    }

    /// Advance from a cleared level, keeping the score
    pub fn next_level(&mut self) -> Result<()> {
        if self.phase != GamePhase::LevelClear {
            return Err(self.invalid("next_level"));
        }
        self.roll_background_track();
        self.mixer.set_background_playing(true);
        let next = self.state.level + 1;
        self.state.reset_for_level(next, true, &self.tuning);
        self.enter_countdown();
        Ok(())
    }

    /// Freeze physics. Refused while an effect sequence holds the board.
    pub fn pause(&mut self) -> Result<()> {
        let running = self.phase == GamePhase::Playing(PlayState::Running);
        if !running || self.state.effects.is_suspended() {
            return Err(self.invalid("pause"));
        }
        self.pointer_x = None;
        self.set_phase(GamePhase::Playing(PlayState::Paused));
        Ok(())
    }

    /// Count 3-2-1 back into play
    pub fn resume(&mut self) -> Result<()> {
        if self.phase != GamePhase::Playing(PlayState::Paused) {
            return Err(self.invalid("resume"));
        }
        match self.begin_countdown() {
            Some(c) => self.set_phase(GamePhase::Playing(PlayState::Resuming(c))),
            None => self.enter_running(),
        }
        Ok(())
    }

    /// Hand the final score to the sink and show the ranking.
    ///
    /// Allowed once per run. GUEST runs skip the sink; sink failures are
    /// logged and never block the ranking screen.
    pub fn submit_score(&mut self, wall_clock_ms: f64) -> Result<()> {
        if self.phase != GamePhase::GameOver {
            return Err(self.invalid("submit_score"));
        }
        if self.submitted {
            return Err(BreakoutError::AlreadySubmitted);
        }
        self.submitted = true;

        if is_rankable(&self.nickname) {
            if let Err(e) = self
                .sink
                .submit_score(&self.nickname, self.state.score, wall_clock_ms)
            {
                log::warn!("Score submission failed: {}", e);
            }
        } else {
            log::info!("Skipping score submission for {}", self.nickname);
        }
        self.open_ranking()
    }

    /// Show the ranking from the menu or the game-over screen
    pub fn open_ranking(&mut self) -> Result<()> {
        if !matches!(self.phase, GamePhase::ReadyToStart | GamePhase::GameOver) {
            return Err(self.invalid("open_ranking"));
        }
        self.ranking_return = self.phase;
        self.mixer.play(SoundKey::RankingOpen);
        self.set_phase(GamePhase::Ranking);
        Ok(())
    }

    /// Leave the ranking for wherever it was opened from
    pub fn close_ranking(&mut self) -> Result<()> {
        if self.phase != GamePhase::Ranking {
            return Err(self.invalid("close_ranking"));
        }
        self.set_phase(self.ranking_return);
        Ok(())
    }

    pub fn open_admin(&mut self) -> Result<()> {
        if self.phase != GamePhase::Ranking {
            return Err(self.invalid("open_admin"));
        }
        self.set_phase(GamePhase::Admin);
        Ok(())
    }

    pub fn close_admin(&mut self) -> Result<()> {
        if self.phase != GamePhase::Admin {
            return Err(self.invalid("close_admin"));
        }
        self.set_phase(GamePhase::Ranking);
        Ok(())
    }

    /// Wipe the leaderboard (admin screen only)
    pub fn admin_reset(&mut self) -> Result<()> {
        if self.phase != GamePhase::Admin {
            return Err(self.invalid("admin_reset"));
        }
        self.sink.reset()
    }

    /// Back to the start screen from the ranking or admin branch
    pub fn back_to_menu(&mut self) -> Result<()> {
        if !matches!(
            self.phase,
            GamePhase::Ranking | GamePhase::Admin | GamePhase::GameOver | GamePhase::LevelClear
        ) {
            return Err(self.invalid("back_to_menu"));
        }
        self.cancel_timers();
        self.set_phase(GamePhase::ReadyToStart);
        Ok(())
    }

    /// Abandon the run in progress
    pub fn quit(&mut self) -> Result<()> {
        if !self.phase.in_run() {
            return Err(self.invalid("quit"));
        }
        self.cancel_timers();
        self.pointer_x = None;
        self.mixer.set_background_playing(false);
        self.set_phase(GamePhase::ReadyToStart);
        Ok(())
    }

    /// Share button (analytics only)
    pub fn share(&mut self) {
        self.track(Action::KakaoShare);
    }

    fn track(&mut self, action: Action) {
        if let Err(e) = self.sink.track_action(action) {
            log::warn!("Could not track {}: {}", action.as_str(), e);
        }
    }

    /// Latest pointer x in canvas pixels; ignored unless the ball is live
    pub fn pointer_move(&mut self, x: f32) {
        if self.phase == GamePhase::Playing(PlayState::Running)
            && !self.state.effects.is_suspended()
            && x.is_finite()
        {
            self.pointer_x = Some(x);
        }
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Replace audio preferences and persist them
    pub fn apply_settings(&mut self, settings: Settings) {
        let settings = settings.sanitized();
        settings.save();
        self.mixer.apply_settings(settings);
    }

    fn roll_background_track(&mut self) {
        let track = self.state.rng.random_range(1..=BACKGROUND_TRACKS);
        self.mixer.select_background_track(track);
    }

    fn begin_countdown(&mut self) -> Option<Countdown> {
        if self.tuning.countdown_from == 0 {
            return None;
        }
        self.mixer.play(countdown_cue(self.tuning.countdown_from));
        Some(Countdown {
            remaining: self.tuning.countdown_from,
            next_tick_ms: self.state.now_ms + self.tuning.countdown_step_ms,
        })
    }

    fn enter_countdown(&mut self) {
        match self.begin_countdown() {
            Some(c) => self.set_phase(GamePhase::Countdown(c)),
            None => self.enter_running(),
        }
    }

    fn enter_running(&mut self) {
        self.first_frame = true;
        self.pointer_x = None;
        self.set_phase(GamePhase::Playing(PlayState::Running));
    }

    fn advance_countdown(&mut self) {
        let (mut countdown, resuming) = match self.phase {
            GamePhase::Countdown(c) => (c, false),
            GamePhase::Playing(PlayState::Resuming(c)) => (c, true),
            _ => return,
        };
        let now = self.state.now_ms;
        while countdown.remaining > 0 && now >= countdown.next_tick_ms {
            countdown.remaining -= 1;
            countdown.next_tick_ms += self.tuning.countdown_step_ms;
            if countdown.remaining > 0 {
                self.mixer.play(countdown_cue(countdown.remaining));
            }
        }

        if countdown.remaining == 0 {
            self.enter_running();
        } else if resuming {
            self.phase = GamePhase::Playing(PlayState::Resuming(countdown));
        } else {
            self.phase = GamePhase::Countdown(countdown);
        }
    }

    /// Advance the session by one animation frame of `elapsed_ms`
    pub fn frame(&mut self, elapsed_ms: f64) {
        let elapsed = if elapsed_ms.is_finite() { elapsed_ms.max(0.0) } else { 0.0 };
        self.state.now_ms += elapsed;
        let now = self.state.now_ms;
        self.mixer.update(now);

        self.advance_countdown();
        if self.phase != GamePhase::Playing(PlayState::Running) {
            return;
        }

        effects::run_due_steps(&mut self.state, &self.tuning, &mut self.mixer);

        let scale = crate::frame_scale((!self.first_frame).then_some(elapsed));
        self.first_frame = false;
        let input = TickInput {
            pointer_x: self.pointer_x.take(),
            autoplay: self.autoplay,
        };

        let saved = self.state.clone();
        let outcome = tick(&mut self.state, &input, scale, &self.tuning, &mut self.mixer);
        if !self.state.balls_finite() {
            log::warn!("Non-finite ball state at {:.0} ms, frame skipped", now);
            self.state = saved;
            return;
        }

        effects::spawn_bonus_crosses(&mut self.state, &self.tuning, &mut self.mixer);
        self.state.effects.prune_animations(now);
        self.state.trim_events(MAX_PENDING_EVENTS);

        match outcome {
            FrameOutcome::Continue => {}
            FrameOutcome::LevelClear => {
                self.cancel_timers();
                log::info!("Level {} cleared, score {}", self.state.level, self.state.score);
                self.set_phase(GamePhase::LevelClear);
            }
            FrameOutcome::GameOver => {
                self.cancel_timers();
                log::info!("Game over at level {}, score {}", self.state.level, self.state.score);
                self.set_phase(GamePhase::GameOver);
            }
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn settings(&self) -> &Settings {
        self.mixer.settings()
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn score(&self) -> u64 {
        self.state.score
    }

    pub fn level(&self) -> u32 {
        self.state.level
    }

    /// This week's ranking from the sink
    pub fn ranking(&self, wall_clock_ms: f64) -> Vec<ScoreEntry> {
        self.sink
            .top_scores(wall_clock_ms, crate::highscores::MAX_RANKED)
    }

    /// Every stored score (admin screen)
    pub fn admin_entries(&self) -> Vec<ScoreEntry> {
        self.sink.all_scores()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    pub fn snapshot(&self) -> RenderSnapshot<'_> {
        let tuning = &self.tuning;
        RenderSnapshot {
            phase: self.phase.name(),
            countdown: self.phase.countdown(),
            level: self.state.level,
            score: self.state.score,
            nickname: &self.nickname,
            paddle: Rect::new(
                self.state.paddle.x,
                tuning.paddle_y(),
                self.state.paddle.width,
                tuning.paddle_height,
            ),
            bricks: self.state.bricks.iter().filter(|b| self.is_drawn(b)).collect(),
            destroying: self
                .state
                .effects
                .animating_ids()
                .map(|id| id.to_string())
                .collect(),
            balls: self.state.balls.iter().filter(|b| b.active).collect(),
            cross_center: self.state.effects.cross_center().map(|id| id.to_string()),
        }
    }

    /// Active bricks plus the ones still animating or centring a CROSS
    fn is_drawn(&self, brick: &Brick) -> bool {
        let effects = &self.state.effects;
        brick.active
            || effects.cross_center() == Some(brick.id)
            || effects.animating_ids().any(|id| id == brick.id)
    }

    /// JSON render snapshot for a JavaScript presentation layer
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }
}

fn countdown_cue(remaining: u8) -> SoundKey {
    if remaining == 1 {
        SoundKey::Countdown1
    } else {
        SoundKey::Countdown32
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::audio::testing::{AudioCall, RecordingAudio};
    use crate::sim::state::{BrickId, BrickKind, DestroyCause};

    #[derive(Clone, Default)]
    struct SpySink {
        scores: Rc<RefCell<Vec<(String, u64)>>>,
        actions: Rc<RefCell<Vec<Action>>>,
        fail: bool,
    }

    impl ScoreSink for SpySink {
        fn submit_score(&mut self, nickname: &str, score: u64, _now_ms: f64) -> Result<()> {
            if self.fail {
                return Err(BreakoutError::StorageUnavailable("offline".into()));
            }
            self.scores.borrow_mut().push((nickname.to_string(), score));
            Ok(())
        }

        fn track_action(&mut self, action: Action) -> Result<()> {
            self.actions.borrow_mut().push(action);
            Ok(())
        }
    }

    fn session_with(sink: SpySink) -> (Session, RecordingAudio) {
        let rec = RecordingAudio::default();
        let session = Session::new(
            21,
            Tuning::default(),
            Box::new(rec.clone()),
            Settings::default(),
            Box::new(sink),
        );
        (session, rec)
    }

    fn running(nickname: &str, sink: SpySink) -> (Session, RecordingAudio) {
        let (mut s, rec) = session_with(sink);
        s.follow_gate().unwrap();
        s.start(nickname).unwrap();
        for _ in 0..3 {
            s.frame(1000.0);
        }
        assert_eq!(s.phase(), GamePhase::Playing(PlayState::Running));
        (s, rec)
    }

    /// One apple right above the ball: the next frame clears the level
    fn rig_clear(s: &mut Session) {
        let t = s.tuning.clone();
        s.state.bricks = vec![Brick::at_cell(
            BrickId::Grid { row: 5, col: 5 },
            5,
            5,
            BrickKind::Apple,
            &t,
        )];
        s.state.balls = vec![Ball::new(1, Vec2::new(165.0, 262.0), Vec2::new(0.0, -4.0), 6.0)];
    }

    /// Lone ball about to fall out
    fn rig_loss(s: &mut Session) {
        s.state.balls = vec![Ball::new(1, Vec2::new(10.0, 636.0), Vec2::new(0.0, 4.0), 6.0)];
    }

    #[test]
    fn test_gate_then_countdown() {
        let sink = SpySink::default();
        let (mut s, rec) = session_with(sink.clone());
        assert_eq!(s.phase(), GamePhase::InstagramGate);
        assert!(s.start("kim").is_err());

        s.follow_gate().unwrap();
        assert_eq!(sink.actions.borrow().as_slice(), &[Action::InstagramFollow]);

        s.start("  kim ").unwrap();
        assert_eq!(s.nickname(), "kim");
        assert_eq!(s.phase().countdown(), Some(3));
        assert_eq!(s.state().bricks.len(), 45);

        s.frame(999.0);
        assert_eq!(s.phase().countdown(), Some(3));
        s.frame(1.0);
        assert_eq!(s.phase().countdown(), Some(2));
        s.frame(1000.0);
        assert_eq!(s.phase().countdown(), Some(1));
        s.frame(1000.0);
        assert_eq!(s.phase(), GamePhase::Playing(PlayState::Running));

        assert_eq!(rec.played(SoundKey::Countdown32), 2);
        assert_eq!(rec.played(SoundKey::Countdown1), 1);
    }

    #[test]
    fn test_blank_nickname_plays_as_guest() {
        let (s, _) = running("   ", SpySink::default());
        assert_eq!(s.nickname(), GUEST);
    }

    #[test]
    fn test_pause_freezes_and_resume_counts_down() {
        let (mut s, rec) = running("kim", SpySink::default());
        assert!(s.pause().is_ok());
        let frozen = s.state().balls.clone();
        s.frame(500.0);
        assert_eq!(s.state().balls, frozen);

        let cues = rec.played(SoundKey::Countdown32);
        s.resume().unwrap();
        assert_eq!(s.phase().countdown(), Some(3));
        assert_eq!(rec.played(SoundKey::Countdown32), cues + 1);
        s.frame(2000.0);
        assert_eq!(s.state().balls, frozen);
        s.frame(1000.0);
        assert_eq!(s.phase(), GamePhase::Playing(PlayState::Running));
        s.frame(16.0);
        assert_ne!(s.state().balls, frozen);
    }

    #[test]
    fn test_pause_refused_outside_play_and_during_cross() {
        let (mut s, _) = session_with(SpySink::default());
        assert!(matches!(s.pause(), Err(BreakoutError::InvalidTransition { .. })));

        let (mut s, _) = running("kim", SpySink::default());
        let t = s.tuning.clone();
        s.state.bricks.push(Brick::at_cell(BrickId::Bonus(99), 9, 0, BrickKind::Cross, &t));
        let idx = s.state.bricks.len() - 1;
        effects::break_brick(&mut s.state, idx, None, DestroyCause::Hit, &t, &mut s.mixer);
        assert!(s.pause().is_err());
    }

    #[test]
    fn test_level_clear_then_next_level_keeps_score() {
        let (mut s, _) = running("kim", SpySink::default());
        rig_clear(&mut s);
        s.frame(16.0);
        assert_eq!(s.phase(), GamePhase::LevelClear);
        let score = s.score();
        assert_eq!(score, 10);

        s.next_level().unwrap();
        assert_eq!(s.level(), 2);
        assert_eq!(s.score(), score);
        assert_eq!(s.state().bricks.len(), 50);
        assert_eq!(s.phase().countdown(), Some(3));
    }

    #[test]
    fn test_next_level_restarts_background() {
        let (mut s, rec) = running("kim", SpySink::default());
        rig_clear(&mut s);
        s.frame(16.0);
        s.next_level().unwrap();
        for _ in 0..4 {
            s.frame(1000.0);
        }

        let calls = rec.calls.borrow();
        let last_track = calls
            .iter()
            .rposition(|c| matches!(c, AudioCall::Track(_)))
            .unwrap();
        assert!(calls[last_track..].contains(&AudioCall::Playing(true)));
    }

    #[test]
    fn test_skipped_frame_rolls_back_level_clear() {
        let (mut s, rec) = running("kim", SpySink::default());
        rig_clear(&mut s);
        s.state.balls.push(Ball::new(2, Vec2::new(300.0, 400.0), Vec2::new(f32::NAN, -4.0), 6.0));
        s.drain_events();

        s.frame(16.0);
        assert_eq!(s.phase(), GamePhase::Playing(PlayState::Running));
        assert_eq!(s.score(), 0);
        assert!(s.state().bricks[0].active);
        assert!(s.drain_events().is_empty());
        assert_eq!(rec.played(SoundKey::LevelUp), 0);

        s.state.balls.truncate(1);
        s.frame(16.0);
        assert_eq!(s.phase(), GamePhase::LevelClear);
        let cleared = s
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::LevelCleared { .. }))
            .count();
        assert_eq!(cleared, 1);
        assert_eq!(rec.played(SoundKey::LevelUp), 1);
    }

    #[test]
    fn test_game_over_submits_once() {
        let sink = SpySink::default();
        let (mut s, _) = running("kim", sink.clone());
        rig_loss(&mut s);
        s.frame(16.0);
        assert_eq!(s.phase(), GamePhase::GameOver);

        s.submit_score(1_700_000_000_000.0).unwrap();
        assert_eq!(s.phase(), GamePhase::Ranking);
        assert_eq!(sink.scores.borrow().as_slice(), &[("kim".to_string(), 0)]);

        s.close_ranking().unwrap();
        assert_eq!(s.phase(), GamePhase::GameOver);
        assert!(matches!(s.submit_score(0.0), Err(BreakoutError::AlreadySubmitted)));
        assert_eq!(sink.scores.borrow().len(), 1);
    }

    #[test]
    fn test_guest_and_failing_sink_still_reach_ranking() {
        let sink = SpySink::default();
        let (mut s, _) = running("", sink.clone());
        rig_loss(&mut s);
        s.frame(16.0);
        s.submit_score(0.0).unwrap();
        assert!(sink.scores.borrow().is_empty());
        assert_eq!(s.phase(), GamePhase::Ranking);

        let failing = SpySink {
            fail: true,
            ..SpySink::default()
        };
        let (mut s, _) = running("lee", failing);
        rig_loss(&mut s);
        s.frame(16.0);
        assert!(s.submit_score(0.0).is_ok());
        assert_eq!(s.phase(), GamePhase::Ranking);
    }

    #[test]
    fn test_quit_mid_cross_cancels_sequence() {
        let (mut s, rec) = running("kim", SpySink::default());
        let t = s.tuning.clone();
        s.state.bricks.push(Brick::at_cell(BrickId::Bonus(99), 9, 0, BrickKind::Cross, &t));
        let idx = s.state.bricks.len() - 1;
        effects::break_brick(&mut s.state, idx, None, DestroyCause::Hit, &t, &mut s.mixer);
        s.frame(600.0);
        assert!(s.state().effects.is_suspended());

        s.quit().unwrap();
        assert_eq!(s.phase(), GamePhase::ReadyToStart);
        assert!(!s.state().effects.is_suspended());
        assert_eq!(
            rec.background_volumes().last(),
            Some(&Settings::default().bgm_volume)
        );

        let score = s.score();
        let bricks = s.state().bricks.clone();
        s.frame(5000.0);
        assert_eq!(s.score(), score);
        assert_eq!(s.state().bricks, bricks);
    }

    #[test]
    fn test_non_finite_ball_skips_frame() {
        let (mut s, _) = running("kim", SpySink::default());
        let pos = Vec2::new(200.0, 400.0);
        s.state.balls = vec![Ball::new(1, pos, Vec2::new(f32::NAN, -4.0), 6.0)];
        s.frame(16.0);
        assert_eq!(s.state().balls[0].pos, pos);
        assert_eq!(s.phase(), GamePhase::Playing(PlayState::Running));
    }

    #[test]
    fn test_pointer_ignored_while_paused() {
        let (mut s, _) = running("kim", SpySink::default());
        s.pause().unwrap();
        s.pointer_move(0.0);
        assert_eq!(s.pointer_x, None);
        s.resume().unwrap();
        s.frame(3000.0);
        s.pointer_move(-500.0);
        s.frame(16.0);
        assert_eq!(s.state().paddle.x, 0.0);
    }

    #[test]
    fn test_menu_branches() {
        let sink = SpySink::default();
        let (mut s, _) = session_with(sink.clone());
        s.follow_gate().unwrap();
        s.open_ranking().unwrap();
        s.open_admin().unwrap();
        assert!(s.admin_reset().is_ok());
        s.close_admin().unwrap();
        s.back_to_menu().unwrap();
        assert_eq!(s.phase(), GamePhase::ReadyToStart);
        assert!(s.quit().is_err());

        s.share();
        assert_eq!(sink.actions.borrow().last(), Some(&Action::KakaoShare));
    }

    #[test]
    fn test_snapshot_json() {
        let (s, _) = running("kim", SpySink::default());
        let json = s.snapshot_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["phase"], "playing");
        assert_eq!(value["level"], 1);
        assert_eq!(value["bricks"].as_array().unwrap().len(), 45);
        assert_eq!(value["balls"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshot_keeps_cross_center_geometry() {
        let (mut s, _) = running("kim", SpySink::default());
        let t = s.tuning.clone();
        s.state.bricks.push(Brick::at_cell(BrickId::Bonus(99), 9, 0, BrickKind::Cross, &t));
        let idx = s.state.bricks.len() - 1;
        effects::break_brick(&mut s.state, idx, None, DestroyCause::Hit, &t, &mut s.mixer);

        // Past the destroy animation, still inside the sweep
        s.frame(600.0);
        let snap = s.snapshot();
        assert_eq!(snap.cross_center.as_deref(), Some("cross-99"));
        let center = snap.bricks.iter().find(|b| b.id == BrickId::Bonus(99));
        assert!(center.is_some_and(|b| !b.active));
    }
}
