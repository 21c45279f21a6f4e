//! Game state and core simulation types
//!
//! `GameState` is the live session context: every subsystem reads and writes
//! through it, so timed steps always see the current level rather than a
//! snapshot captured when they were scheduled.

use std::fmt;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::effects::EffectState;
use super::level::{self, GenerationReport};
use super::progress::{self, BonusPacer};
use crate::tuning::Tuning;

/// Hit counter given to indestructible bricks (never decremented)
pub const GRAY_HITS: u32 = 999;

/// Brick types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrickKind {
    Banana,
    Pineapple,
    Apple,
    Blueberry,
    Avocado,
    Bomb,
    Gray, // Indestructible, doesn't count for level clear
    Rainbow,
    Cross,
}

impl BrickKind {
    /// The five fruit variants, drawn uniformly by the generator
    pub const FRUITS: [BrickKind; 5] = [
        BrickKind::Banana,
        BrickKind::Pineapple,
        BrickKind::Apple,
        BrickKind::Blueberry,
        BrickKind::Avocado,
    ];

    pub fn is_fruit(self) -> bool {
        Self::FRUITS.contains(&self)
    }

    /// BOMB, RAINBOW and CROSS trigger an effect when destroyed
    pub fn is_special(self) -> bool {
        matches!(self, BrickKind::Bomb | BrickKind::Rainbow | BrickKind::Cross)
    }

    /// Returns true if this brick must be destroyed to clear the level
    pub fn counts_for_clear(self) -> bool {
        self != BrickKind::Gray
    }

    /// Hits needed to destroy a freshly placed brick of this kind
    pub fn initial_hits(self) -> u32 {
        match self {
            BrickKind::Gray => GRAY_HITS,
            BrickKind::Bomb => 2,
            _ => 1,
        }
    }
}

/// Stable brick identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BrickId {
    /// Generated with the level layout
    Grid { row: u32, col: u32 },
    /// Spawned mid-level (bonus CROSS)
    Bonus(u32),
}

impl fmt::Display for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrickId::Grid { row, col } => write!(f, "{row}-{col}"),
            BrickId::Bonus(n) => write!(f, "cross-{n}"),
        }
    }
}

/// Axis-aligned rectangle in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Closest point on (or in) the rectangle to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.x, self.right()), p.y.clamp(self.y, self.bottom()))
    }
}

/// A brick entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub id: BrickId,
    pub row: u32,
    pub col: u32,
    pub rect: Rect,
    pub kind: BrickKind,
    pub hits: u32,
    /// Inactive bricks never collide again
    pub active: bool,
}

impl Brick {
    /// Brick at a grid cell, with geometry from the tuning
    pub fn at_cell(id: BrickId, row: u32, col: u32, kind: BrickKind, tuning: &Tuning) -> Self {
        let col_width = tuning.column_width();
        let size = tuning.brick_size();
        let grid_width = tuning.brick_cols as f32 * col_width - tuning.brick_padding;
        let x_offset = (tuning.canvas_width - grid_width) / 2.0;
        Self {
            id,
            row,
            col,
            rect: Rect::new(
                x_offset + col as f32 * col_width,
                row as f32 * (size + tuning.brick_padding) + tuning.brick_offset_top,
                size,
                size,
            ),
            kind,
            hits: kind.initial_hits(),
            active: true,
        }
    }

    /// Change the brick's kind, resetting its hit counter to match
    pub fn promote(&mut self, kind: BrickKind) {
        self.kind = kind;
        self.hits = kind.initial_hits();
    }

    /// Manhattan distance in grid cells
    pub fn grid_distance(&self, row: u32, col: u32) -> u32 {
        self.row.abs_diff(row) + self.col.abs_diff(col)
    }
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub active: bool,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            active: true,
        }
    }

    /// Copy of this ball flying the other way horizontally and always upward
    pub fn mirrored(&self, id: u32) -> Self {
        Self {
            id,
            pos: self.pos,
            vel: Vec2::new(-self.vel.x, -self.vel.y.abs()),
            radius: self.radius,
            active: true,
        }
    }
}

/// The player's paddle (vertical placement comes from the tuning)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paddle {
    /// Left edge
    pub x: f32,
    pub width: f32,
}

impl Paddle {
    /// Centred paddle of the given width
    pub fn centered(width: f32, canvas_width: f32) -> Self {
        Self {
            x: (canvas_width - width) / 2.0,
            width,
        }
    }

    #[inline]
    pub fn center(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Centre the paddle under a pointer, clamped inside the canvas
    pub fn follow_pointer(&mut self, pointer_x: f32, canvas_width: f32) {
        let max_x = (canvas_width - self.width).max(0.0);
        self.x = (pointer_x - self.width / 2.0).clamp(0.0, max_x);
    }
}

/// Why a brick was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Direct ball hit
    Hit,
    /// Caught in a BOMB blast
    Blast,
    /// Part of a CROSS sweep
    Sweep,
}

/// Things that happened during a frame, drained by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BrickDestroyed {
        id: BrickId,
        kind: BrickKind,
        cause: DestroyCause,
        /// Monotonic destruction counter (animation ordering)
        seq: u64,
        at_ms: f64,
    },
    BallSpawned { id: u32 },
    BallLost { id: u32 },
    BonusCrossSpawned { id: BrickId },
    CrossStarted { center: BrickId },
    CrossFinished { center: BrickId },
    LevelCleared { level: u32 },
    GameOver { score: u64 },
}

/// Complete live state of one play-through
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Current level (1-based)
    pub level: u32,
    /// Score
    pub score: u64,
    /// Ball speed for this level
    pub ball_speed: f32,
    /// Player paddle
    pub paddle: Paddle,
    /// All balls of this level (inactive ones stay until the next level)
    pub balls: Vec<Ball>,
    /// All bricks of this level (inactive ones stay until the next level)
    pub bricks: Vec<Brick>,
    /// Bonus CROSS pacing
    pub pacer: BonusPacer,
    /// Running effect sequences and animation bookkeeping
    pub effects: EffectState,
    /// Session clock (ms), advanced by the frame driver
    pub now_ms: f64,
    /// Bumped whenever level state is replaced; timed steps from an older
    /// epoch must not touch the board
    pub epoch: u32,
    /// Pending events for the presentation layer
    pub events: Vec<GameEvent>,
    /// Layout anomalies of the current level
    pub generation: GenerationReport,
    pub rng: Pcg32,
    destroy_seq: u64,
    next_ball_id: u32,
    next_bonus_id: u32,
}

impl GameState {
    /// Create an empty session (no level loaded yet)
    pub fn new(seed: u64, tuning: &Tuning) -> Self {
        Self {
            seed,
            level: 1,
            score: 0,
            ball_speed: tuning.initial_ball_speed,
            paddle: Paddle::centered(tuning.paddle_width, tuning.canvas_width),
            balls: Vec::new(),
            bricks: Vec::new(),
            pacer: BonusPacer::default(),
            effects: EffectState::default(),
            now_ms: 0.0,
            epoch: 0,
            events: Vec::new(),
            generation: GenerationReport::default(),
            rng: Pcg32::seed_from_u64(seed),
            destroy_seq: 0,
            next_ball_id: 1,
            next_bonus_id: 1,
        }
    }

    /// Allocate a new ball ID
    pub fn next_ball_id(&mut self) -> u32 {
        let id = self.next_ball_id;
        self.next_ball_id += 1;
        id
    }

    /// Allocate a synthetic ID for a brick spawned mid-level
    pub fn next_bonus_id(&mut self) -> BrickId {
        let id = self.next_bonus_id;
        self.next_bonus_id += 1;
        BrickId::Bonus(id)
    }

    /// Next destruction sequence number
    pub fn next_destroy_seq(&mut self) -> u64 {
        self.destroy_seq += 1;
        self.destroy_seq
    }

    /// Replace all level state for `level`.
    ///
    /// A fresh run zeroes the score; advancing keeps it and restarts the bonus
    /// pacer at the last whole interval. Any running effect sequence is
    /// cancelled first.
    pub fn reset_for_level(&mut self, level: u32, keep_score: bool, tuning: &Tuning) {
        self.cancel_effects();
        self.epoch = self.epoch.wrapping_add(1);
        self.level = level.max(1);

        if keep_score {
            self.pacer = BonusPacer::resume_at(self.score, tuning.bonus_cross_interval);
        } else {
            self.score = 0;
            self.pacer = BonusPacer::default();
        }

        self.ball_speed = progress::ball_speed(self.level, tuning);
        self.paddle = Paddle::centered(
            progress::paddle_width(self.level, tuning),
            tuning.canvas_width,
        );

        let direction = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let id = self.next_ball_id();
        self.balls = vec![Ball::new(
            id,
            Vec2::new(
                tuning.canvas_width / 2.0,
                tuning.canvas_height - (tuning.paddle_from_bottom + 20.0),
            ),
            Vec2::new(self.ball_speed * 0.5 * direction, -self.ball_speed),
            tuning.ball_radius,
        )];

        let layout = level::generate(self.level, tuning, &mut self.rng);
        self.bricks = layout.bricks;
        self.generation = layout.report;

        log::info!(
            "Level {} ready: {} bricks, speed {:.2}, paddle {:.1}",
            self.level,
            self.bricks.len(),
            self.ball_speed,
            self.paddle.width
        );
    }

    /// Drop every pending timed step and transient effect of the current level
    pub fn cancel_effects(&mut self) {
        let dropped = self.effects.cancel();
        if dropped > 0 {
            log::debug!("Cancelled {} pending effect steps", dropped);
        }
    }

    /// Destructible bricks still standing
    pub fn remaining_destructible(&self) -> usize {
        self.bricks
            .iter()
            .filter(|b| b.active && b.kind.counts_for_clear())
            .count()
    }

    /// True if at least one ball is still in play
    pub fn any_ball_active(&self) -> bool {
        self.balls.iter().any(|b| b.active)
    }

    /// Index of the brick with this ID
    pub fn brick_index(&self, id: BrickId) -> Option<usize> {
        self.bricks.iter().position(|b| b.id == id)
    }

    /// True if every ball has a finite position and velocity
    pub fn balls_finite(&self) -> bool {
        self.balls
            .iter()
            .all(|b| b.pos.is_finite() && b.vel.is_finite())
    }

    /// Drop the oldest events beyond `max`
    pub fn trim_events(&mut self, max: usize) {
        if self.events.len() > max {
            let excess = self.events.len() - max;
            self.events.drain(..excess);
            log::debug!("Dropped {} undrained events", excess);
        }
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brick_id_display() {
        assert_eq!(BrickId::Grid { row: 3, col: 7 }.to_string(), "3-7");
        assert_eq!(BrickId::Bonus(2).to_string(), "cross-2");
    }

    #[test]
    fn test_brick_geometry() {
        let tuning = Tuning::default();
        let b = Brick::at_cell(BrickId::Grid { row: 0, col: 0 }, 0, 0, BrickKind::Apple, &tuning);
        assert_eq!(b.rect, Rect::new(2.0, 80.0, 26.0, 26.0));
        let b = Brick::at_cell(BrickId::Grid { row: 2, col: 11 }, 2, 11, BrickKind::Apple, &tuning);
        assert_eq!(b.rect.x, 2.0 + 11.0 * 30.0);
        assert_eq!(b.rect.y, 80.0 + 2.0 * 30.0);
    }

    #[test]
    fn test_paddle_follow_pointer_clamps() {
        let mut paddle = Paddle::centered(80.0, 360.0);
        paddle.follow_pointer(-50.0, 360.0);
        assert_eq!(paddle.x, 0.0);
        paddle.follow_pointer(1000.0, 360.0);
        assert_eq!(paddle.x, 280.0);
        paddle.follow_pointer(180.0, 360.0);
        assert_eq!(paddle.center(), 180.0);
    }

    #[test]
    fn test_mirrored_ball_goes_up() {
        let ball = Ball::new(1, Vec2::new(10.0, 10.0), Vec2::new(3.0, 4.0), 6.0);
        let twin = ball.mirrored(2);
        assert_eq!(twin.vel, Vec2::new(-3.0, -4.0));
        assert!(twin.active);
    }

    #[test]
    fn test_trim_events_keeps_newest() {
        let mut state = GameState::new(1, &Tuning::default());
        for id in 0..5 {
            state.events.push(GameEvent::BallLost { id });
        }
        state.trim_events(2);
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::BallLost { id: 3 }, GameEvent::BallLost { id: 4 }]
        );
        state.trim_events(2);
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_reset_for_level_fresh_and_keep() {
        let tuning = Tuning::default();
        let mut state = GameState::new(7, &tuning);
        state.reset_for_level(1, false, &tuning);
        assert_eq!(state.balls.len(), 1);
        assert_eq!(state.bricks.len(), 45);
        assert_eq!(state.score, 0);

        state.score = 1234;
        state.reset_for_level(2, true, &tuning);
        assert_eq!(state.score, 1234);
        assert_eq!(state.pacer.last_spawn_score, 1000);
        assert!((state.ball_speed - 4.7).abs() < 1e-5);
        assert!((state.paddle.width - 72.0).abs() < 1e-4);
    }
}
