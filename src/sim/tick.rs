//! Per-frame physics tick
//!
//! Moves every ball, resolves walls, paddle and at most one brick per ball,
//! then runs the end-of-frame win/loss checks. The whole tick is skipped
//! while an effect sequence holds the board.

use super::collision::{
    ball_rect_collision, collide_ceiling, collide_paddle, collide_side_walls, resolve_rect,
};
use super::effects::break_brick;
use super::state::{Ball, BrickKind, DestroyCause, GameEvent, GameState};
use crate::audio::{Mixer, SoundKey};
use crate::tuning::Tuning;

/// Input for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Latest pointer x in canvas pixels (only the newest position matters)
    pub pointer_x: Option<f32>,
    /// Demo mode: the paddle chases the most urgent ball
    pub autoplay: bool,
}

/// What the end-of-frame checks decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    LevelClear,
    GameOver,
}

/// Advance the board by one frame scaled by `delta_scale` (1.0 = 1/60 s)
pub fn tick(
    state: &mut GameState,
    input: &TickInput,
    delta_scale: f32,
    tuning: &Tuning,
    mixer: &mut Mixer,
) -> FrameOutcome {
    if state.effects.is_suspended() {
        return FrameOutcome::Continue;
    }

    let target = input
        .pointer_x
        .or_else(|| input.autoplay.then(|| autoplay_target(state)).flatten());
    if let Some(x) = target {
        state.paddle.follow_pointer(x, tuning.canvas_width);
    }

    // Effects may append balls mid-loop; those start moving next frame
    let count = state.balls.len();
    for i in 0..count {
        if !state.balls[i].active {
            continue;
        }
        let mut ball = state.balls[i].clone();
        step_ball(state, &mut ball, delta_scale, tuning, mixer);
        state.balls[i] = ball;
    }

    // The caller rolls back a non-finite frame; don't announce its outcome
    if !state.balls_finite() {
        return FrameOutcome::Continue;
    }
    end_of_frame(state, mixer)
}

fn step_ball(
    state: &mut GameState,
    ball: &mut Ball,
    delta_scale: f32,
    tuning: &Tuning,
    mixer: &mut Mixer,
) {
    ball.pos += ball.vel * delta_scale;

    if collide_side_walls(ball, tuning.canvas_width) {
        mixer.play(SoundKey::random_hit(&mut state.rng));
    }
    if collide_ceiling(ball, tuning.ceiling_y) {
        mixer.play(SoundKey::random_hit(&mut state.rng));
    }
    if collide_paddle(
        ball,
        &state.paddle,
        tuning.paddle_y(),
        tuning.paddle_height,
        state.ball_speed,
        tuning.paddle_steer_factor,
    ) {
        mixer.play(SoundKey::random_hit(&mut state.rng));
    }

    for idx in 0..state.bricks.len() {
        let brick = &state.bricks[idx];
        if !brick.active {
            continue;
        }
        let result = ball_rect_collision(ball.pos, ball.radius, &brick.rect);
        if !result.hit {
            continue;
        }
        let Some(side) = result.side else {
            continue;
        };
        let (rect, kind) = (brick.rect, brick.kind);
        resolve_rect(ball, &rect, side);

        if kind == BrickKind::Gray {
            mixer.play(SoundKey::random_hit(&mut state.rng));
        } else {
            let brick = &mut state.bricks[idx];
            brick.hits = brick.hits.saturating_sub(1);
            if brick.hits == 0 {
                break_brick(state, idx, Some(&*ball), DestroyCause::Hit, tuning, mixer);
            } else {
                mixer.play(SoundKey::random_hit(&mut state.rng));
            }
        }
        break;
    }

    if ball.pos.y + ball.radius > tuning.canvas_height {
        ball.active = false;
        state.events.push(GameEvent::BallLost { id: ball.id });
        log::debug!("Ball {} lost", ball.id);
    }
}

/// Level clear beats game over when both happen in the same frame
fn end_of_frame(state: &mut GameState, mixer: &mut Mixer) -> FrameOutcome {
    if state.effects.is_suspended() {
        return FrameOutcome::Continue;
    }
    if state.remaining_destructible() == 0 {
        mixer.play(SoundKey::LevelUp);
        state.events.push(GameEvent::LevelCleared { level: state.level });
        FrameOutcome::LevelClear
    } else if !state.any_ball_active() {
        mixer.play(SoundKey::GameOver);
        state.events.push(GameEvent::GameOver { score: state.score });
        FrameOutcome::GameOver
    } else {
        FrameOutcome::Continue
    }
}

/// Lowest falling ball, or the lowest ball if none is falling
fn autoplay_target(state: &GameState) -> Option<f32> {
    let lowest = |falling: bool| {
        state
            .balls
            .iter()
            .filter(|b| b.active && (!falling || b.vel.y > 0.0))
            .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
            .map(|b| b.pos.x)
    };
    lowest(true).or_else(|| lowest(false))
}
