//! Simulation module
//!
//! All gameplay logic lives here:
//! - Seeded RNG only (layouts and spawns reproduce from a seed)
//! - Session clock advanced by the frame driver, never read from the platform
//! - No rendering or platform dependencies

pub mod collision;
pub mod effects;
pub mod level;
pub mod patterns;
pub mod progress;
pub mod state;
pub mod tick;
pub mod timeline;

pub use collision::{CollisionResult, Side, ball_rect_collision};
pub use effects::{EffectState, break_brick, run_due_steps, spawn_bonus_crosses};
pub use level::{GenerationReport, LevelLayout, generate};
pub use patterns::{PATTERNS, Pattern};
pub use progress::BonusPacer;
pub use state::{
    Ball, Brick, BrickId, BrickKind, DestroyCause, GRAY_HITS, GameEvent, GameState, Paddle, Rect,
};
pub use tick::{FrameOutcome, TickInput, tick};
pub use timeline::Timeline;
