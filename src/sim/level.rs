//! Level layout generation
//!
//! Picks a pattern, fills the target brick count (pattern cells first, random
//! top-up after), assigns fruit, mirrors GRAY bricks across the centre column
//! and promotes a few bricks to specials. All randomness comes from the
//! caller's RNG so layouts are reproducible from a seed.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::patterns::{Cell, PATTERNS};
use super::state::{Brick, BrickId, BrickKind};
use crate::tuning::Tuning;

/// Generation anomalies worth flagging (the layout is still usable)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Index into `PATTERNS`
    pub pattern: usize,
    pub target_count: u32,
    pub gray_requested: u32,
    pub gray_placed: u32,
    pub specials_placed: u32,
}

impl GenerationReport {
    /// True if fewer GRAY bricks were placed than the level called for
    pub fn gray_shortfall(&self) -> bool {
        self.gray_placed < self.gray_requested
    }
}

/// A generated level
#[derive(Debug, Clone)]
pub struct LevelLayout {
    pub bricks: Vec<Brick>,
    pub report: GenerationReport,
}

/// Bricks a level should contain
pub fn target_brick_count(level: u32, tuning: &Tuning) -> u32 {
    let grown = tuning.base_brick_count + level.saturating_sub(1) * tuning.brick_count_increment;
    grown.min(tuning.max_brick_count).min(tuning.grid_cells())
}

/// Indestructible bricks a level asks for
pub fn gray_count(level: u32) -> u32 {
    (level + 1) / 2
}

/// Generate the brick layout for `level`
pub fn generate<R: Rng + ?Sized>(level: u32, tuning: &Tuning, rng: &mut R) -> LevelLayout {
    let level = level.max(1);
    let target = target_brick_count(level, tuning);
    let pattern_idx = rng.random_range(0..PATTERNS.len());
    let pattern = &PATTERNS[pattern_idx];

    let mut in_pattern = Vec::new();
    let mut outside = Vec::new();
    for row in 0..tuning.brick_rows {
        for col in 0..tuning.brick_cols {
            let cell = Cell::new(row, col, tuning.brick_rows, tuning.brick_cols);
            if (pattern.contains)(cell) {
                in_pattern.push((row, col));
            } else {
                outside.push((row, col));
            }
        }
    }
    in_pattern.shuffle(rng);
    outside.shuffle(rng);

    let mut selected: Vec<(u32, u32)> = in_pattern.into_iter().take(target as usize).collect();
    let shortfall = target as usize - selected.len();
    selected.extend(outside.into_iter().take(shortfall));

    let mut bricks: Vec<Brick> = selected
        .into_iter()
        .map(|(row, col)| {
            let fruit = BrickKind::FRUITS[rng.random_range(0..BrickKind::FRUITS.len())];
            Brick::at_cell(BrickId::Grid { row, col }, row, col, fruit, tuning)
        })
        .collect();

    let gray_requested = gray_count(level);
    let gray_placed = place_gray(&mut bricks, gray_requested, tuning.brick_cols, rng);
    if gray_placed < gray_requested {
        log::warn!(
            "Level {}: placed {} of {} GRAY bricks (not enough mirrored cells)",
            level,
            gray_placed,
            gray_requested
        );
    }

    let specials_placed = place_specials(&mut bricks, level, tuning, rng);

    log::debug!(
        "Level {} layout: pattern '{}', {} bricks, {} gray, {} specials",
        level,
        pattern.name,
        bricks.len(),
        gray_placed,
        specials_placed
    );

    LevelLayout {
        bricks,
        report: GenerationReport {
            pattern: pattern_idx,
            target_count: target,
            gray_requested,
            gray_placed,
            specials_placed,
        },
    }
}

/// Turn bricks GRAY in mirrored pairs, with an odd one on the centre column.
///
/// Never converts the last destructible brick. Returns how many were placed.
fn place_gray<R: Rng + ?Sized>(bricks: &mut [Brick], count: u32, cols: u32, rng: &mut R) -> u32 {
    let center_col = cols / 2;
    let mut destructible = bricks.len() as u32;
    let mut placed = 0;

    if count % 2 == 1 && destructible > 1 {
        let centers: Vec<usize> = bricks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.col == center_col && b.kind != BrickKind::Gray)
            .map(|(i, _)| i)
            .collect();
        if !centers.is_empty() {
            let idx = centers[rng.random_range(0..centers.len())];
            bricks[idx].promote(BrickKind::Gray);
            destructible -= 1;
            placed += 1;
        }
    }

    let pairs_needed = (count - placed) / 2;
    if pairs_needed == 0 {
        return placed;
    }

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (left_idx, left) in bricks.iter().enumerate() {
        if left.col >= center_col || left.kind == BrickKind::Gray {
            continue;
        }
        let mirror_col = cols - 1 - left.col;
        if let Some(right_idx) = bricks
            .iter()
            .position(|b| b.row == left.row && b.col == mirror_col && b.kind != BrickKind::Gray)
        {
            pairs.push((left_idx, right_idx));
        }
    }
    pairs.shuffle(rng);

    let mut pairs_placed = 0;
    for (left_idx, right_idx) in pairs {
        if pairs_placed == pairs_needed || destructible <= 2 {
            break;
        }
        // An earlier pair may already have claimed one of these cells
        if bricks[left_idx].kind == BrickKind::Gray || bricks[right_idx].kind == BrickKind::Gray {
            continue;
        }
        bricks[left_idx].promote(BrickKind::Gray);
        bricks[right_idx].promote(BrickKind::Gray);
        destructible -= 2;
        placed += 2;
        pairs_placed += 1;
    }

    placed
}

/// Promote 1..=max random destructible bricks to BOMB / RAINBOW / CROSS
fn place_specials<R: Rng + ?Sized>(
    bricks: &mut [Brick],
    level: u32,
    tuning: &Tuning,
    rng: &mut R,
) -> u32 {
    let candidates: Vec<usize> = bricks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.kind != BrickKind::Gray)
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() {
        return 0;
    }

    let target = rng.random_range(tuning.min_specials..=tuning.max_specials.max(tuning.min_specials));
    let mut placed = 0;

    // The first level always shows off a CROSS
    if level == 1 {
        let idx = candidates[rng.random_range(0..candidates.len())];
        bricks[idx].promote(BrickKind::Cross);
        placed += 1;
    }

    for _ in 0..candidates.len() {
        if placed >= target {
            break;
        }
        let idx = candidates[rng.random_range(0..candidates.len())];
        if bricks[idx].kind.is_special() {
            continue;
        }
        let roll: f32 = rng.random();
        let kind = if level == 1 {
            if roll > 0.5 {
                BrickKind::Bomb
            } else {
                BrickKind::Rainbow
            }
        } else if roll > 0.6 {
            BrickKind::Bomb
        } else if roll > 0.3 {
            BrickKind::Rainbow
        } else {
            BrickKind::Cross
        };
        bricks[idx].promote(kind);
        placed += 1;
    }

    placed
}
