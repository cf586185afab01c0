//! Structural level statistics.
//!
//! [`TileCensus`] derives every measurement the default coefficient tables
//! consume from the ground profile of a level: the height of the solid
//! stack standing on the floor in each column. It never simulates play, so
//! `solvability` is only a reachability estimate based on gap widths and
//! step heights.

use crate::compute::evolution::{Measure, Measurements};
use crate::schema::{Level, Tile};

/// Widest floor gap treated as jumpable.
pub const MAX_JUMP_GAP: usize = 4;

/// Tallest step up treated as jumpable.
pub const MAX_JUMP_RISE: usize = 4;

/// Measure that reports tile statistics instead of playtest results.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileCensus;

impl TileCensus {
    /// Height of the solid stack on the floor of column `x`; 0 is a gap.
    fn ground_height(level: &Level, x: usize) -> usize {
        (0..level.height())
            .rev()
            .take_while(|&y| level.get(x, y).is_some_and(Tile::is_solid))
            .count()
    }

    pub fn ground_profile(level: &Level) -> Vec<usize> {
        (0..level.width())
            .map(|x| Self::ground_height(level, x))
            .collect()
    }

    /// Lengths of the runs of gap columns, left to right.
    fn gap_runs(profile: &[usize]) -> Vec<usize> {
        let mut runs = Vec::new();
        let mut current = 0;
        for &h in profile {
            if h == 0 {
                current += 1;
            } else if current > 0 {
                runs.push(current);
                current = 0;
            }
        }
        if current > 0 {
            runs.push(current);
        }
        runs
    }

    /// Height increases between consecutive standing columns, skipping gaps.
    fn rises(profile: &[usize]) -> Vec<usize> {
        let standing: Vec<usize> = profile.iter().copied().filter(|&h| h > 0).collect();
        standing
            .windows(2)
            .filter(|w| w[1] > w[0])
            .map(|w| w[1] - w[0])
            .collect()
    }

    /// `1 / (1 + mean absolute residual)` of a least-squares line through
    /// the profile; 1.0 for a perfectly straight ground line.
    fn linearity(profile: &[usize]) -> f64 {
        let n = profile.len() as f64;
        if profile.len() < 2 {
            return 1.0;
        }
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = profile.iter().sum::<usize>() as f64 / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, &y) in profile.iter().enumerate() {
            let dx = x as f64 - mean_x;
            sxy += dx * (y as f64 - mean_y);
            sxx += dx * dx;
        }
        let slope = sxy / sxx;
        let residual = profile
            .iter()
            .enumerate()
            .map(|(x, &y)| (y as f64 - (mean_y + slope * (x as f64 - mean_x))).abs())
            .sum::<f64>()
            / n;
        1.0 / (1.0 + residual)
    }

    fn variance(values: &[usize]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<usize>() as f64 / n;
        values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n
    }
}

impl Measure for TileCensus {
    fn measure(&self, level: &Level) -> Measurements {
        let cells = (level.width() * level.height()).max(1) as f64;
        let profile = Self::ground_profile(level);
        let gaps = Self::gap_runs(&profile);
        let rises = Self::rises(&profile);

        let empty = level.count(Tile::Empty) as f64;
        let open = level.tiles().iter().filter(|t| t.is_passable()).count() as f64;
        let standing = profile.iter().filter(|&&h| h > 0).count() as f64;

        let jumps: Vec<usize> = gaps.iter().chain(&rises).copied().collect();
        let solvable = gaps.iter().all(|&g| g <= MAX_JUMP_GAP)
            && rises.iter().all(|&r| r <= MAX_JUMP_RISE)
            && profile.first().is_some_and(|&h| h > 0)
            && profile.last().is_some_and(|&h| h > 0);

        Measurements::from([
            ("emptyPercentage".to_string(), empty / cells),
            ("negativeSpace".to_string(), open / cells),
            (
                "pathPercentage".to_string(),
                standing / profile.len().max(1) as f64,
            ),
            ("linearity".to_string(), Self::linearity(&profile)),
            ("meaningfulJumps".to_string(), jumps.len() as f64),
            (
                "meaningfulJumpVariance".to_string(),
                Self::variance(&jumps),
            ),
            (
                "solvability".to_string(),
                if solvable { 1.0 } else { 0.0 },
            ),
        ])
    }
}
