//! Special-brick effects
//!
//! Destroying a brick goes through `break_brick`, which awards points once and
//! fans out into the BOMB blast, RAINBOW multiball or CROSS sweep. The CROSS
//! sweep is a timed sequence driven by `run_due_steps` from the frame loop;
//! while it runs, win/loss checks are suspended.

use std::collections::VecDeque;

use rand::Rng;

use super::progress;
use super::state::{Ball, Brick, BrickId, BrickKind, DestroyCause, GameEvent, GameState};
use super::timeline::Timeline;
use crate::audio::{Mixer, SoundKey};
use crate::tuning::Tuning;

/// One step of a CROSS sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossStep {
    /// Collect the row/column and schedule the staggered destroys
    Sweep,
    Destroy(BrickId),
    /// Background music fade-in, step `k` of `cross_fade_steps`
    FadeStep(u32),
    Finish,
}

/// A running CROSS sequence
#[derive(Debug, Clone)]
pub struct CrossSequence {
    pub center: BrickId,
    pub row: u32,
    pub col: u32,
    /// `GameState::epoch` at trigger time
    pub epoch: u32,
    timeline: Timeline<CrossStep>,
}

/// Effect bookkeeping carried in the session context
#[derive(Debug, Clone, Default)]
pub struct EffectState {
    active: Option<CrossSequence>,
    /// CROSS triggers waiting for the active sequence (center, row, col)
    queued: VecDeque<(BrickId, u32, u32)>,
    /// Bricks mid destroy animation, with the time the animation ends
    animating: Vec<(BrickId, f64)>,
}

impl EffectState {
    /// True while a CROSS sequence holds physics and win/loss checks
    pub fn is_suspended(&self) -> bool {
        self.active.is_some()
    }

    pub fn cross_center(&self) -> Option<BrickId> {
        self.active.as_ref().map(|s| s.center)
    }

    pub fn queued_crosses(&self) -> usize {
        self.queued.len()
    }

    /// Bricks currently animating their destruction
    pub fn animating_ids(&self) -> impl Iterator<Item = BrickId> + '_ {
        self.animating.iter().map(|(id, _)| *id)
    }

    fn mark_animating(&mut self, id: BrickId, until_ms: f64) {
        self.animating.retain(|(other, _)| *other != id);
        self.animating.push((id, until_ms));
    }

    /// Forget animations that ended at or before `now_ms`
    pub fn prune_animations(&mut self, now_ms: f64) {
        self.animating.retain(|(_, until)| *until > now_ms);
    }

    /// Invalidate the active sequence, the queue and all animations.
    ///
    /// Returns the number of pending steps and queued triggers dropped.
    pub fn cancel(&mut self) -> usize {
        let pending = self.active.take().map(|mut s| s.timeline.cancel()).unwrap_or(0);
        let queued = self.queued.len();
        self.queued.clear();
        self.animating.clear();
        pending + queued
    }
}

/// Destroy the brick at `idx` and run its effect.
///
/// Inactive bricks are ignored, so a brick scores at most once. Returns true
/// if the brick was destroyed by this call.
pub fn break_brick(
    state: &mut GameState,
    idx: usize,
    source: Option<&Ball>,
    cause: DestroyCause,
    tuning: &Tuning,
    mixer: &mut Mixer,
) -> bool {
    let Some(brick) = state.bricks.get_mut(idx) else {
        return false;
    };
    if !brick.active {
        return false;
    }
    brick.active = false;
    let (id, kind, row, col) = (brick.id, brick.kind, brick.row, brick.col);

    state.score += progress::points_for(kind, tuning);
    let seq = state.next_destroy_seq();
    state.events.push(GameEvent::BrickDestroyed {
        id,
        kind,
        cause,
        seq,
        at_ms: state.now_ms,
    });

    if cause != DestroyCause::Hit || matches!(kind, BrickKind::Bomb | BrickKind::Cross) {
        let until = state.now_ms + tuning.destroy_anim_ms;
        state.effects.mark_animating(id, until);
    }

    match kind {
        BrickKind::Bomb => {
            mixer.play(SoundKey::BombExplode);
            let blast: Vec<usize> = state
                .bricks
                .iter()
                .enumerate()
                .filter(|(_, b)| {
                    b.active
                        && b.kind.counts_for_clear()
                        && b.row.abs_diff(row) <= 1
                        && b.col.abs_diff(col) <= 1
                })
                .map(|(i, _)| i)
                .collect();
            for j in blast {
                break_brick(state, j, None, DestroyCause::Blast, tuning, mixer);
            }
        }
        BrickKind::Rainbow => {
            mixer.play(SoundKey::RainbowHit);
            spawn_twin(state, source);
        }
        BrickKind::Cross => trigger_cross(state, id, row, col, tuning, mixer),
        _ => mixer.play(SoundKey::Break),
    }
    true
}

/// Add a mirrored copy of `source`, or of the first live ball
fn spawn_twin(state: &mut GameState, source: Option<&Ball>) {
    let template = source
        .cloned()
        .or_else(|| state.balls.iter().find(|b| b.active).cloned())
        .or_else(|| state.balls.first().cloned());
    let Some(template) = template else {
        return;
    };
    let id = state.next_ball_id();
    state.balls.push(template.mirrored(id));
    state.events.push(GameEvent::BallSpawned { id });
}

/// Start a CROSS sequence centred on a destroyed brick, or queue it behind
/// the one already running
pub fn trigger_cross(
    state: &mut GameState,
    center: BrickId,
    row: u32,
    col: u32,
    tuning: &Tuning,
    mixer: &mut Mixer,
) {
    if state.effects.is_suspended() {
        log::debug!("CROSS {} queued behind the running sweep", center);
        state.effects.queued.push_back((center, row, col));
        return;
    }
    start_cross(state, center, row, col, tuning, mixer);
}

fn start_cross(
    state: &mut GameState,
    center: BrickId,
    row: u32,
    col: u32,
    tuning: &Tuning,
    mixer: &mut Mixer,
) {
    mixer.hold_background();
    mixer.play(SoundKey::CrossStart);

    let mut timeline = Timeline::new();
    timeline.schedule_after(state.now_ms, tuning.cross_lead_in_ms, CrossStep::Sweep);
    state.effects.active = Some(CrossSequence {
        center,
        row,
        col,
        epoch: state.epoch,
        timeline,
    });
    state.events.push(GameEvent::CrossStarted { center });
    log::debug!("CROSS {} started at row {} col {}", center, row, col);
}

/// Run every CROSS step due at `state.now_ms`
pub fn run_due_steps(state: &mut GameState, tuning: &Tuning, mixer: &mut Mixer) {
    loop {
        let Some(seq) = state.effects.active.as_mut() else {
            return;
        };
        if seq.epoch != state.epoch {
            // Level state was replaced under a live sequence
            log::warn!("Dropping CROSS {} from a stale level", seq.center);
            state.cancel_effects();
            mixer.release_background();
            return;
        }
        let Some(step) = seq.timeline.pop_due(state.now_ms) else {
            return;
        };
        let (center, row, col) = (seq.center, seq.row, seq.col);

        match step {
            CrossStep::Sweep => sweep(state, center, row, col, tuning),
            CrossStep::Destroy(id) => {
                if let Some(idx) = state.brick_index(id) {
                    break_brick(state, idx, None, DestroyCause::Sweep, tuning, mixer);
                }
            }
            CrossStep::FadeStep(k) => {
                mixer.set_background_fraction(k as f32 / tuning.cross_fade_steps.max(1) as f32);
            }
            CrossStep::Finish => {
                state.effects.active = None;
                mixer.release_background();
                state.events.push(GameEvent::CrossFinished { center });
                log::debug!("CROSS {} finished", center);
                if let Some((next, row, col)) = state.effects.queued.pop_front() {
                    start_cross(state, next, row, col, tuning, mixer);
                }
            }
        }
    }
}

/// Schedule staggered destroys of the row and column, nearest first, then
/// the music fade-in and the finish
fn sweep(state: &mut GameState, center: BrickId, row: u32, col: u32, tuning: &Tuning) {
    let mut targets: Vec<(u32, BrickId)> = state
        .bricks
        .iter()
        .filter(|b| {
            b.active && b.kind.counts_for_clear() && b.id != center && (b.row == row || b.col == col)
        })
        .map(|b| (b.grid_distance(row, col), b.id))
        .collect();
    targets.sort_by_key(|(dist, _)| *dist);

    let now = state.now_ms;
    let gap = if targets.is_empty() {
        0.0
    } else {
        tuning.cross_stagger_ms / targets.len() as f64
    };
    let steps = tuning.cross_fade_steps.max(1);
    let fade_gap = tuning.cross_fade_ms / steps as f64;

    let Some(seq) = state.effects.active.as_mut() else {
        return;
    };
    for (i, (_, id)) in targets.iter().enumerate() {
        seq.timeline
            .schedule_after(now, i as f64 * gap, CrossStep::Destroy(*id));
    }
    for k in 1..=steps {
        seq.timeline.schedule_after(
            now,
            tuning.cross_settle_ms + k as f64 * fade_gap,
            CrossStep::FadeStep(k),
        );
    }
    seq.timeline
        .schedule_after(now, tuning.cross_settle_ms + tuning.cross_fade_ms, CrossStep::Finish);
    log::debug!("CROSS {} sweeping {} bricks", center, targets.len());
}

/// Spawn the bonus CROSS bricks the score has earned since the last check.
///
/// Each lands on a random grid cell with no active brick; a full grid skips
/// the spawn. Returns how many were placed.
pub fn spawn_bonus_crosses(state: &mut GameState, tuning: &Tuning, mixer: &mut Mixer) -> u32 {
    let due = state
        .pacer
        .due(state.score, state.level, tuning.bonus_cross_interval);
    let mut spawned = 0;
    for _ in 0..due {
        let empty: Vec<(u32, u32)> = (0..tuning.brick_rows)
            .flat_map(|row| (0..tuning.brick_cols).map(move |col| (row, col)))
            .filter(|&(row, col)| {
                !state
                    .bricks
                    .iter()
                    .any(|b| b.active && b.row == row && b.col == col)
            })
            .collect();
        if empty.is_empty() {
            log::debug!("No empty cell for a bonus CROSS");
            break;
        }
        let (row, col) = empty[state.rng.random_range(0..empty.len())];
        let id = state.next_bonus_id();
        state
            .bricks
            .push(Brick::at_cell(id, row, col, BrickKind::Cross, tuning));
        mixer.play(SoundKey::CrossAppear);
        state.events.push(GameEvent::BonusCrossSpawned { id });
        spawned += 1;
    }
    if spawned > 0 {
        log::info!("Spawned {} bonus CROSS at score {}", spawned, state.score);
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::RecordingAudio;
    use crate::settings::Settings;
    use glam::Vec2;

    fn brick(row: u32, col: u32, kind: BrickKind, t: &Tuning) -> Brick {
        Brick::at_cell(BrickId::Grid { row, col }, row, col, kind, t)
    }

    fn setup(bricks: Vec<Brick>) -> (GameState, Tuning, Mixer, RecordingAudio) {
        let tuning = Tuning::default();
        let mut state = GameState::new(3, &tuning);
        state.bricks = bricks;
        state.balls = vec![Ball::new(1, Vec2::new(180.0, 500.0), Vec2::new(2.0, -4.0), 6.0)];
        let rec = RecordingAudio::default();
        let mixer = Mixer::new(Box::new(rec.clone()), Settings::default());
        (state, tuning, mixer, rec)
    }

    fn run_until(state: &mut GameState, until_ms: f64, t: &Tuning, mixer: &mut Mixer) {
        while state.now_ms < until_ms {
            state.now_ms = (state.now_ms + 10.0).min(until_ms);
            run_due_steps(state, t, mixer);
        }
    }

    #[test]
    fn test_bomb_clears_its_neighbours() {
        let t = Tuning::default();
        let mut bricks = Vec::new();
        for row in 2..=4 {
            for col in 2..=4 {
                let kind = if (row, col) == (3, 3) { BrickKind::Bomb } else { BrickKind::Apple };
                bricks.push(brick(row, col, kind, &t));
            }
        }
        bricks.push(brick(0, 0, BrickKind::Banana, &t));
        let (mut state, t, mut mixer, rec) = setup(bricks);

        let bomb = state.brick_index(BrickId::Grid { row: 3, col: 3 }).unwrap();
        assert!(break_brick(&mut state, bomb, None, DestroyCause::Hit, &t, &mut mixer));

        assert_eq!(state.score, 15 + 8 * 10);
        assert_eq!(state.remaining_destructible(), 1);
        assert_eq!(rec.played(SoundKey::BombExplode), 1);
        assert_eq!(state.effects.animating_ids().count(), 9);
    }

    #[test]
    fn test_gray_survives_blast() {
        let t = Tuning::default();
        let (mut state, t, mut mixer, _) = setup(vec![
            brick(0, 0, BrickKind::Bomb, &t),
            brick(0, 1, BrickKind::Gray, &t),
            brick(1, 1, BrickKind::Bomb, &t),
            brick(2, 2, BrickKind::Apple, &t),
        ]);
        break_brick(&mut state, 0, None, DestroyCause::Hit, &t, &mut mixer);
        // The second bomb chains into (2,2)
        assert!(state.bricks[1].active);
        assert!(!state.bricks[2].active && !state.bricks[3].active);
        assert_eq!(state.score, 15 + 15 + 10);
    }

    #[test]
    fn test_destroying_twice_scores_once() {
        let t = Tuning::default();
        let (mut state, t, mut mixer, _) = setup(vec![brick(1, 1, BrickKind::Pineapple, &t)]);
        assert!(break_brick(&mut state, 0, None, DestroyCause::Hit, &t, &mut mixer));
        assert!(!break_brick(&mut state, 0, None, DestroyCause::Sweep, &t, &mut mixer));
        assert_eq!(state.score, 10);
        assert_eq!(state.drain_events().len(), 1);
    }

    #[test]
    fn test_rainbow_spawns_mirrored_ball() {
        let t = Tuning::default();
        let (mut state, t, mut mixer, _) = setup(vec![brick(1, 1, BrickKind::Rainbow, &t)]);
        let source = Ball::new(9, Vec2::new(50.0, 200.0), Vec2::new(3.0, 4.0), 6.0);
        break_brick(&mut state, 0, Some(&source), DestroyCause::Hit, &t, &mut mixer);

        assert_eq!(state.balls.len(), 2);
        let twin = &state.balls[1];
        assert_eq!(twin.pos, source.pos);
        assert_eq!(twin.vel, Vec2::new(-3.0, -4.0));
        assert_eq!(state.score, 15);
    }

    #[test]
    fn test_cross_sweeps_row_and_column() {
        let t = Tuning::default();
        let mut bricks: Vec<Brick> = (0..7).map(|c| brick(3, c, BrickKind::Apple, &t)).collect();
        bricks[3].promote(BrickKind::Cross);
        bricks.push(brick(6, 3, BrickKind::Avocado, &t));
        bricks.push(brick(5, 3, BrickKind::Gray, &t));
        bricks.push(brick(0, 0, BrickKind::Banana, &t));
        let (mut state, t, mut mixer, rec) = setup(bricks);

        break_brick(&mut state, 3, None, DestroyCause::Hit, &t, &mut mixer);
        assert!(state.effects.is_suspended());
        assert_eq!(state.score, 15);

        run_until(&mut state, 490.0, &t, &mut mixer);
        assert_eq!(state.remaining_destructible(), 8);

        run_until(&mut state, 500.0 + 400.0, &t, &mut mixer);
        // Six row neighbours and the column brick; (0,0) and GRAY stay
        assert_eq!(state.score, 15 + 7 * 10);
        assert_eq!(state.remaining_destructible(), 1);
        assert!(state.bricks[8].active);

        let destroyed: Vec<BrickId> = state
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::BrickDestroyed { id, cause: DestroyCause::Sweep, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(destroyed.len(), 7);
        // Nearest first: the distance-1 pair leads, the column brick at 3 follows the 2s
        let first_two = &destroyed[..2];
        assert!(first_two.contains(&BrickId::Grid { row: 3, col: 2 }));
        assert!(first_two.contains(&BrickId::Grid { row: 3, col: 4 }));

        run_until(&mut state, 500.0 + 600.0 + 800.0, &t, &mut mixer);
        assert!(!state.effects.is_suspended());
        let volumes = rec.background_volumes();
        assert_eq!(volumes.first(), Some(&0.0));
        assert_eq!(volumes.last(), Some(&Settings::default().bgm_volume));
        // Hold, sixteen fade steps, release
        assert_eq!(volumes.len(), 1 + 16 + 1);
    }

    #[test]
    fn test_cross_aborted_by_level_reset() {
        let t = Tuning::default();
        let mut bricks: Vec<Brick> = (0..5).map(|c| brick(2, c, BrickKind::Apple, &t)).collect();
        bricks[2].promote(BrickKind::Cross);
        let (mut state, t, mut mixer, _) = setup(bricks);

        break_brick(&mut state, 2, None, DestroyCause::Hit, &t, &mut mixer);
        run_until(&mut state, 550.0, &t, &mut mixer);
        assert!(state.effects.is_suspended());

        state.reset_for_level(1, false, &t);
        let bricks_before = state.bricks.clone();
        run_until(&mut state, 5000.0, &t, &mut mixer);

        assert_eq!(state.score, 0);
        assert_eq!(state.bricks, bricks_before);
        assert!(!state.effects.is_suspended());
    }

    #[test]
    fn test_stale_epoch_stops_sequence() {
        let t = Tuning::default();
        let mut bricks: Vec<Brick> = (0..5).map(|c| brick(2, c, BrickKind::Apple, &t)).collect();
        bricks[2].promote(BrickKind::Cross);
        let (mut state, t, mut mixer, _) = setup(bricks);

        break_brick(&mut state, 2, None, DestroyCause::Hit, &t, &mut mixer);
        state.epoch += 1;
        run_until(&mut state, 5000.0, &t, &mut mixer);

        assert_eq!(state.score, 15);
        assert_eq!(state.remaining_destructible(), 4);
        assert!(!state.effects.is_suspended());
        assert!(!mixer.is_background_held());
    }

    #[test]
    fn test_second_cross_is_queued() {
        let t = Tuning::default();
        let mut bricks: Vec<Brick> = (0..3).map(|c| brick(4, c, BrickKind::Apple, &t)).collect();
        bricks[1].promote(BrickKind::Cross);
        bricks.push(brick(8, 8, BrickKind::Cross, &t));
        bricks.push(brick(8, 9, BrickKind::Apple, &t));
        let (mut state, t, mut mixer, _) = setup(bricks);

        break_brick(&mut state, 1, None, DestroyCause::Hit, &t, &mut mixer);
        break_brick(&mut state, 3, None, DestroyCause::Hit, &t, &mut mixer);
        assert_eq!(state.effects.queued_crosses(), 1);
        assert_eq!(state.effects.cross_center(), Some(BrickId::Grid { row: 4, col: 1 }));

        run_until(&mut state, 1900.0, &t, &mut mixer);
        assert_eq!(state.effects.cross_center(), Some(BrickId::Grid { row: 8, col: 8 }));

        run_until(&mut state, 3800.0, &t, &mut mixer);
        assert!(!state.effects.is_suspended());
        assert_eq!(state.remaining_destructible(), 0);
    }

    #[test]
    fn test_bonus_cross_lands_on_empty_cell() {
        let t = Tuning::default();
        let (mut state, t, mut mixer, rec) = setup(vec![brick(0, 0, BrickKind::Apple, &t)]);
        state.level = 2;
        state.score = 1010;

        assert_eq!(spawn_bonus_crosses(&mut state, &t, &mut mixer), 2);
        assert_eq!(state.pacer.last_spawn_score, 1000);
        assert_eq!(rec.played(SoundKey::CrossAppear), 2);

        let bonus: Vec<&Brick> = state
            .bricks
            .iter()
            .filter(|b| matches!(b.id, BrickId::Bonus(_)))
            .collect();
        assert_eq!(bonus.len(), 2);
        assert_ne!((bonus[0].row, bonus[0].col), (0, 0));
        assert_ne!((bonus[0].row, bonus[0].col), (bonus[1].row, bonus[1].col));
        assert!(bonus.iter().all(|b| b.kind == BrickKind::Cross && b.hits == 1));
    }

    #[test]
    fn test_no_bonus_on_level_one() {
        let (mut state, t, mut mixer, _) = setup(Vec::new());
        state.score = 5000;
        assert_eq!(spawn_bonus_crosses(&mut state, &t, &mut mixer), 0);
    }
}
