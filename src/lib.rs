//! Fruit Breaker - a level-based fruit brick-breaker
//!
//! Core modules:
//! - `sim`: Simulation (level generation, physics, special-brick effects)
//! - `session`: Screen state machine owning the injected services
//! - `audio`: Keyed sound effects and background music
//! - `highscores`: Weekly leaderboard and analytics counters
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod error;
pub mod highscores;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{BreakoutError, Result};
pub use highscores::{Leaderboard, ScoreSink};
pub use session::{GamePhase, PlayState, Session};
pub use settings::Settings;
pub use tuning::Tuning;

/// Frame length the physics constants are expressed in (60 fps)
pub const BASELINE_FRAME_MS: f64 = 1000.0 / 60.0;

/// Cap on one frame's motion, so a long stall can't tunnel balls through bricks
pub const MAX_FRAME_SCALE: f32 = 4.0;

/// Motion scale for a frame that took `elapsed_ms` (`None` on the first frame)
#[inline]
pub fn frame_scale(elapsed_ms: Option<f64>) -> f32 {
    match elapsed_ms {
        None => 1.0,
        Some(ms) if ms.is_finite() && ms > 0.0 => {
            ((ms / BASELINE_FRAME_MS) as f32).min(MAX_FRAME_SCALE)
        }
        Some(_) => 0.0,
    }
}
