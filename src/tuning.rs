//! Data-driven game balance
//!
//! Every number the simulation depends on lives here so levels can be
//! rebalanced (or shrunk down for tests) without touching the sim code.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Game balance and layout constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Canvas (fixed logical resolution) ===
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// Balls reflect off this line instead of y = 0 (HUD lives above it)
    pub ceiling_y: f32,

    // === Paddle ===
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Distance from the canvas bottom to the paddle's top edge
    pub paddle_from_bottom: f32,
    /// Width multiplier applied once per level after the first
    pub paddle_shrink_factor: f32,
    /// Smallest paddle width as a fraction of `paddle_width`
    pub paddle_min_fraction: f32,

    // === Ball ===
    pub ball_radius: f32,
    pub initial_ball_speed: f32,
    pub speed_increment: f32,
    pub max_ball_speed: f32,
    /// Paddle rebounds map the contact offset onto [-speed * k, speed * k]
    pub paddle_steer_factor: f32,

    // === Brick grid ===
    pub brick_rows: u32,
    pub brick_cols: u32,
    pub brick_padding: f32,
    pub brick_offset_top: f32,
    pub base_brick_count: u32,
    pub brick_count_increment: u32,
    pub max_brick_count: u32,
    pub min_specials: u32,
    pub max_specials: u32,

    // === Scoring ===
    pub fruit_points: u64,
    pub special_points: u64,
    /// Points between proactive CROSS spawns (level 2+)
    pub bonus_cross_interval: u64,

    // === Timing (milliseconds) ===
    pub countdown_from: u8,
    pub countdown_step_ms: f64,
    pub destroy_anim_ms: f64,
    pub cross_lead_in_ms: f64,
    pub cross_stagger_ms: f64,
    pub cross_settle_ms: f64,
    pub cross_fade_ms: f64,
    pub cross_fade_steps: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            canvas_width: 360.0,
            canvas_height: 640.0,
            ceiling_y: 80.0,

            paddle_width: 80.0,
            paddle_height: 12.0,
            paddle_from_bottom: 70.0,
            paddle_shrink_factor: 0.9,
            paddle_min_fraction: 1.0 / 3.0,

            ball_radius: 6.0,
            initial_ball_speed: 4.0,
            speed_increment: 0.7,
            max_ball_speed: 8.0,
            paddle_steer_factor: 1.5,

            brick_rows: 10,
            brick_cols: 12,
            brick_padding: 4.0,
            brick_offset_top: 80.0,
            base_brick_count: 45,
            brick_count_increment: 5,
            max_brick_count: 120,
            min_specials: 1,
            max_specials: 4,

            fruit_points: 10,
            special_points: 15,
            bonus_cross_interval: 500,

            countdown_from: 3,
            countdown_step_ms: 1000.0,
            destroy_anim_ms: 300.0,
            cross_lead_in_ms: 500.0,
            cross_stagger_ms: 400.0,
            cross_settle_ms: 600.0,
            cross_fade_ms: 800.0,
            cross_fade_steps: 16,
        }
    }
}

impl Tuning {
    /// Overlay a JSON document on the defaults (missing fields keep defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Y coordinate of the paddle's top edge
    pub fn paddle_y(&self) -> f32 {
        self.canvas_height - self.paddle_from_bottom
    }

    /// Horizontal pitch of one grid column
    pub fn column_width(&self) -> f32 {
        self.canvas_width / self.brick_cols as f32
    }

    /// Bricks are square: width doubles as height
    pub fn brick_size(&self) -> f32 {
        self.column_width() - self.brick_padding
    }

    /// Total grid cells available to the generator
    pub fn grid_cells(&self) -> u32 {
        self.brick_rows * self.brick_cols
    }
}
