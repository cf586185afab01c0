//! Level geometry shared by every genome representation.

use serde::{Deserialize, Serialize};

use super::{Level, Tile};

/// Smallest width that leaves room for the start column, the mutation
/// window and the goal columns.
pub const MIN_LEVEL_WIDTH: usize = 16;

/// Smallest height that fits the goal pole above the floor.
pub const MIN_LEVEL_HEIGHT: usize = 12;

fn default_width() -> usize {
    200
}

fn default_height() -> usize {
    16
}

/// Grid dimensions for a run. Fixed for every individual of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    /// Number of columns.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Number of rows.
    #[serde(default = "default_height")]
    pub height: usize,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

impl LevelConfig {
    /// Row of solid floor tiles.
    #[inline]
    pub fn floor_row(&self) -> usize {
        self.height - 1
    }

    /// Player start cell `(x, y)`.
    #[inline]
    pub fn start(&self) -> (usize, usize) {
        (0, self.height - 2)
    }

    /// Row holding the flag at the top of the goal pole.
    #[inline]
    pub fn flag_row(&self) -> usize {
        self.height - 9
    }

    /// Rows kept clear by the random grid generator.
    pub fn open_rows(&self) -> [usize; 3] {
        [self.height - 11, self.height - 7, self.height - 4]
    }

    /// Canonical baseline: empty except floor, start marker and goal.
    pub fn baseline_level(&self) -> Level {
        let (w, h) = (self.width, self.height);
        let mut level = Level::filled(w, h, Tile::Empty);
        level.fill_row(self.floor_row(), Tile::Wall);

        let (sx, sy) = self.start();
        level.set(sx, sy, Tile::Start);

        level.set(w - 1, self.flag_row(), Tile::Flag);
        for y in self.flag_row() + 1..h - 2 {
            level.set(w - 1, y, Tile::Flagpole);
        }
        level.set(w - 1, h - 2, Tile::Wall);
        level.set(w - 1, h - 1, Tile::Wall);
        level
    }

    /// Validate dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_LEVEL_WIDTH || self.height < MIN_LEVEL_HEIGHT {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Level dimensions {width}x{height} are too small (minimum 16x12)")]
    InvalidDimensions { width: usize, height: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        let config = LevelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.width, config.height), (200, 16));
    }

    #[test]
    fn test_too_small_rejected() {
        let config = LevelConfig {
            width: 8,
            height: 16,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions { width: 8, .. })
        ));
    }

    #[test]
    fn test_baseline_layout() {
        let config = LevelConfig::default();
        let level = config.baseline_level();

        assert!(level.row(15).iter().all(|&t| t == Tile::Wall));
        assert_eq!(level.get(0, 14), Some(Tile::Start));
        assert_eq!(level.get(199, 7), Some(Tile::Flag));
        for y in 8..14 {
            assert_eq!(level.get(199, y), Some(Tile::Flagpole));
        }
        assert_eq!(level.get(199, 14), Some(Tile::Wall));
        assert_eq!(level.count(Tile::Wall), 201);
    }
}
