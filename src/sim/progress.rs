//! Score and level progression

use serde::{Deserialize, Serialize};

use super::state::BrickKind;
use crate::tuning::Tuning;

/// Points for destroying one brick of this kind
pub fn points_for(kind: BrickKind, tuning: &Tuning) -> u64 {
    if kind.is_special() {
        tuning.special_points
    } else {
        tuning.fruit_points
    }
}

/// Ball speed for a level (linear growth, capped)
pub fn ball_speed(level: u32, tuning: &Tuning) -> f32 {
    let raw = tuning.initial_ball_speed + level.saturating_sub(1) as f32 * tuning.speed_increment;
    raw.min(tuning.max_ball_speed)
}

/// Paddle width for a level (geometric shrink, floored)
pub fn paddle_width(level: u32, tuning: &Tuning) -> f32 {
    let shrunk = tuning.paddle_width * tuning.paddle_shrink_factor.powi(level.saturating_sub(1) as i32);
    shrunk.max(tuning.paddle_width * tuning.paddle_min_fraction)
}

/// Paces proactive CROSS spawns against cumulative score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusPacer {
    /// High-water mark, always a whole multiple of the interval
    pub last_spawn_score: u64,
}

impl BonusPacer {
    /// Pacer for a level entered with `score` already banked
    pub fn resume_at(score: u64, interval: u64) -> Self {
        let last_spawn_score = if interval == 0 { score } else { score / interval * interval };
        Self { last_spawn_score }
    }

    /// Number of bonus bricks earned since the last check (level 2+ only).
    ///
    /// Advances the mark by the whole intervals consumed.
    pub fn due(&mut self, score: u64, level: u32, interval: u64) -> u32 {
        if level <= 1 || interval == 0 {
            return 0;
        }
        let above = score.saturating_sub(self.last_spawn_score);
        let count = above / interval;
        self.last_spawn_score += count * interval;
        count as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points() {
        let t = Tuning::default();
        assert_eq!(points_for(BrickKind::Apple, &t), 10);
        assert_eq!(points_for(BrickKind::Bomb, &t), 15);
        assert_eq!(points_for(BrickKind::Cross, &t), 15);
        assert_eq!(points_for(BrickKind::Rainbow, &t), 15);
    }

    #[test]
    fn test_ball_speed_caps() {
        let t = Tuning::default();
        assert_eq!(ball_speed(1, &t), 4.0);
        assert!((ball_speed(3, &t) - 5.4).abs() < 1e-5);
        assert_eq!(ball_speed(7, &t), 8.0);
        assert_eq!(ball_speed(50, &t), 8.0);
    }

    #[test]
    fn test_paddle_width_floors() {
        let t = Tuning::default();
        assert_eq!(paddle_width(1, &t), 80.0);
        assert!((paddle_width(2, &t) - 72.0).abs() < 1e-4);
        assert!((paddle_width(40, &t) - 80.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_pacer_level_one_never_spawns() {
        let mut p = BonusPacer::default();
        assert_eq!(p.due(5000, 1, 500), 0);
        assert_eq!(p.last_spawn_score, 0);
    }

    #[test]
    fn test_pacer_consumes_whole_intervals() {
        let mut p = BonusPacer::resume_at(730, 500);
        assert_eq!(p.last_spawn_score, 500);
        assert_eq!(p.due(990, 2, 500), 0);
        assert_eq!(p.due(1000, 2, 500), 1);
        assert_eq!(p.last_spawn_score, 1000);
        assert_eq!(p.due(2120, 2, 500), 2);
        assert_eq!(p.last_spawn_score, 2000);
    }
}
