//! Dense tile-grid genome.
//!
//! The genome is the level itself. Generation places tiles with probability
//! bands that depend on row depth, mutation makes a handful of local edits
//! around one anchor cell, and crossover swaps every column right of a cut.

use crate::schema::{
    FitnessConfig, GenomeKind, GridOperatorConfig, Level, LevelConfig, OperatorConfig, Tile,
    WeightedMeasurement,
};

use super::genome::{GenomeRng, LevelGenome};

// Cumulative probability bands for random generation. A band whose row or
// column condition fails falls through to the next one.
const EMPTY_BAND: f64 = 0.66;
const WALL_BAND: f64 = 0.70;
const ITEM_BLOCK_BAND: f64 = 0.72;
const MUSHROOM_BLOCK_BAND: f64 = 0.73;
const BREAKABLE_BAND: f64 = 0.84;
const COIN_BAND: f64 = 0.85;
const PIPE_BAND: f64 = 0.89;

/// Rows kept clear above a generated pipe top.
const PIPE_CLEARANCE: usize = 5;

/// Tiles chosen by the random replacement edit, in weight order.
const REPLACEMENT_TILES: [Tile; 4] = [Tile::ItemBlock, Tile::Coin, Tile::Enemy, Tile::Empty];

/// A level genome stored as a dense tile grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGenome {
    level: Level,
}

impl GridGenome {
    /// Wrap an existing level.
    pub fn from_level(level: Level) -> Self {
        Self { level }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.level.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.level.height()
    }

    pub fn into_level(self) -> Level {
        self.level
    }

    /// Single-point crossover without mutation: columns `>= cut` are swapped
    /// between the two children. Parents of different sizes are copied
    /// unchanged.
    pub fn crossover_at(&self, other: &Self, cut: usize) -> (Self, Self) {
        let mut first = self.clone();
        let mut second = other.clone();
        if self.width() != other.width() || self.height() != other.height() {
            return (first, second);
        }

        for y in 0..self.height() {
            for x in cut..self.width() {
                let (a, b) = (self.level.get(x, y), other.level.get(x, y));
                if let (Some(a), Some(b)) = (a, b) {
                    first.level.set(x, y, b);
                    second.level.set(x, y, a);
                }
            }
        }
        (first, second)
    }

    /// Apply 5-10 edits around one random anchor. Anchors outside the
    /// mutable window (too-small grids) make this a no-op.
    fn mutate_in_place(&mut self, ops: &GridOperatorConfig, rng: &mut GenomeRng) {
        let (w, h) = (self.width(), self.height());

        // Column 0 (start), the goal columns and the floor row are never anchors.
        let Some(x) = rng.range(2, w.saturating_sub(7)) else {
            return;
        };
        let Some(y) = rng.range(1, h.saturating_sub(2)) else {
            return;
        };

        let edits = rng.range_or_low(ops.edit_bounds.0, ops.edit_bounds.1);
        let weights = ops.replacement_weights.as_array();

        for _ in 0..edits {
            let Some(tile) = self.level.get(x, y) else {
                return;
            };

            if rng.chance(ops.random_edit_rate) {
                if tile.is_pipe() {
                    continue;
                }
                if let Some(i) = rng.weighted_index(&weights) {
                    self.level.set(x, y, REPLACEMENT_TILES[i]);
                }
            } else if rng.chance(ops.constructive_edit_rate) {
                if y + 3 > h && tile == Tile::ItemBlock {
                    // Unreachable reward this close to the floor.
                    self.level.set(x, y, Tile::Wall);
                } else if matches!(tile, Tile::Wall | Tile::Breakable | Tile::ItemBlock)
                    && self.level.get(x - 1, y) == Some(Tile::Empty)
                    && self.level.get(x + 1, y) == Some(Tile::Empty)
                {
                    let extension = if tile == Tile::ItemBlock {
                        Tile::Wall
                    } else {
                        tile
                    };
                    self.level.set(x + 1, y, extension);
                }
            }
        }
    }

    /// Procedurally fill a level. `config` must pass `LevelConfig::validate`.
    fn generate(config: &LevelConfig, ops: &GridOperatorConfig, rng: &mut GenomeRng) -> Level {
        let (w, h) = (config.width, config.height);
        let mut g = Level::filled(w, h, Tile::Empty);

        for row in 2..h - 1 {
            for col in 2..w - 4 {
                let near_pipe_top = [row - 1, row, row + 1]
                    .iter()
                    .any(|&r| g.get(col - 1, r) == Some(Tile::PipeTop));
                if near_pipe_top {
                    continue;
                }

                let choice = rng.unit();
                if choice < EMPTY_BAND {
                    g.set(col, row, Tile::Empty);
                } else if choice < WALL_BAND && row <= h - 2 {
                    g.set(col, row, Tile::Wall);
                } else if choice < ITEM_BLOCK_BAND && row > 3 && row <= h - 4 {
                    // Keep the block hittable from below and visible from above.
                    g.set(col, row, Tile::ItemBlock);
                    g.set(col, row - 1, Tile::Empty);
                } else if choice < MUSHROOM_BLOCK_BAND && row > 3 && row <= h - 3 {
                    g.set(col, row, Tile::MushroomBlock);
                    g.set(col, row - 1, Tile::Empty);
                    g.set(col, row + 1, Tile::Empty);
                } else if choice < BREAKABLE_BAND && row > 2 && row <= h - 3 {
                    let above = g.get(col, row - 1);
                    let tile = if matches!(above, Some(Tile::ItemBlock | Tile::MushroomBlock)) {
                        Tile::Empty
                    } else {
                        Tile::Breakable
                    };
                    g.set(col, row, tile);
                    g.set(col - 1, row, Tile::Breakable);
                } else if choice < COIN_BAND && row > 3 {
                    g.set(col, row, Tile::Coin);
                } else if choice < PIPE_BAND && row * 5 > h * 3 && col > 3 && col < w - 3 {
                    g.set(col, row, Tile::PipeTop);
                    for dx in [col - 2, col - 1, col + 1, col + 2] {
                        g.set(dx, row, Tile::Empty);
                    }
                    if row > PIPE_CLEARANCE {
                        for r in row - PIPE_CLEARANCE..row {
                            g.set(col, r, Tile::Empty);
                        }
                    }
                } else {
                    g.set(col, row, Tile::Empty);
                }
            }
        }

        for row in config.open_rows() {
            g.fill_row(row, Tile::Empty);
        }

        let floor = config.floor_row();
        g.fill_row(floor, Tile::Wall);
        let pits = rng.range_or_low(ops.pit_bounds.0, ops.pit_bounds.1);
        for _ in 0..pits {
            let Some(pit) = rng.range(5, w - 5) else {
                break;
            };
            let length = rng.range_or_low(0, ops.max_pit_length);
            for k in 0..length.min(pit + 1) {
                g.set(pit - k, floor, Tile::Empty);
            }
        }

        // Enemies on top of walls and bricks, pipe bodies under pipe tops.
        for row in 0..h {
            for col in 0..w {
                match g.get(col, row) {
                    Some(Tile::Wall | Tile::Breakable) => {
                        if rng.chance(ops.enemy_chance) && row >= 2 && col > 5 && col < w - 2 {
                            g.set(col, row - 1, Tile::Enemy);
                        }
                    }
                    Some(Tile::PipeTop) => {
                        for r in row + 1..h {
                            g.set(col, r, Tile::PipeBody);
                        }
                    }
                    _ => {}
                }
            }
        }

        let (sx, sy) = config.start();
        g.set(sx, sy, Tile::Start);

        // Random grids carry the flag two columns left of the baseline one,
        // so a crossover cut between them can give a child two flags or none.
        let pole = w - 3;
        g.set(pole, config.flag_row(), Tile::Flag);
        for y in config.flag_row() + 1..h - 1 {
            g.set(pole, y, Tile::Flagpole);
        }
        g
    }
}

impl LevelGenome for GridGenome {
    const KIND: GenomeKind = GenomeKind::Grid;

    fn random(level: &LevelConfig, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self {
        Self::from_level(Self::generate(level, &ops.grid, rng))
    }

    fn empty(level: &LevelConfig) -> Self {
        Self::from_level(level.baseline_level())
    }

    fn mutate(&self, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self {
        let mut child = self.clone();
        child.mutate_in_place(&ops.grid, rng);
        child
    }

    fn generate_children(
        &self,
        other: &Self,
        ops: &OperatorConfig,
        rng: &mut GenomeRng,
    ) -> (Self, Self) {
        let cut = rng.range(1, self.width().saturating_sub(2));
        let (mut first, mut second) = match cut {
            Some(cut) => self.crossover_at(other, cut),
            None => (self.clone(), other.clone()),
        };
        first.mutate_in_place(&ops.grid, rng);
        second.mutate_in_place(&ops.grid, rng);
        (first, second)
    }

    fn to_level(&self) -> &Level {
        &self.level
    }

    fn coefficients(fitness: &FitnessConfig) -> &[WeightedMeasurement] {
        &fitness.grid
    }
}
