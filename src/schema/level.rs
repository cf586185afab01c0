//! Tile alphabet and dense level grids.
//!
//! A [`Level`] is the canonical rendering of any genome. Its text form (one
//! row of tile symbols per line, top row first) is the format consumed by
//! renderers and written by the archive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell of a platformer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tile {
    /// Empty space.
    #[default]
    Empty,
    /// Solid, unbreakable wall.
    Wall,
    /// Question block containing a coin.
    ItemBlock,
    /// Question block containing a mushroom.
    MushroomBlock,
    /// Breakable brick.
    Breakable,
    /// Free-floating coin.
    Coin,
    /// Pipe segment.
    PipeBody,
    /// Pipe opening.
    PipeTop,
    /// Enemy spawn.
    Enemy,
    /// Flag at the top of the goal pole.
    Flag,
    /// Goal pole segment.
    Flagpole,
    /// Player start position.
    Start,
}

impl Tile {
    /// Tiles that generators and variation operators are allowed to place.
    pub const GENERATED: [Tile; 9] = [
        Tile::Empty,
        Tile::Wall,
        Tile::ItemBlock,
        Tile::MushroomBlock,
        Tile::Breakable,
        Tile::Coin,
        Tile::PipeBody,
        Tile::PipeTop,
        Tile::Enemy,
    ];

    /// Text symbol used in the level file format.
    pub fn symbol(self) -> char {
        match self {
            Tile::Empty => '-',
            Tile::Wall => 'X',
            Tile::ItemBlock => '?',
            Tile::MushroomBlock => 'M',
            Tile::Breakable => 'B',
            Tile::Coin => 'o',
            Tile::PipeBody => '|',
            Tile::PipeTop => 'T',
            Tile::Enemy => 'E',
            Tile::Flag => 'v',
            Tile::Flagpole => 'f',
            Tile::Start => 'm',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            '-' => Tile::Empty,
            'X' => Tile::Wall,
            '?' => Tile::ItemBlock,
            'M' => Tile::MushroomBlock,
            'B' => Tile::Breakable,
            'o' => Tile::Coin,
            '|' => Tile::PipeBody,
            'T' => Tile::PipeTop,
            'E' => Tile::Enemy,
            'v' => Tile::Flag,
            'f' => Tile::Flagpole,
            'm' => Tile::Start,
            _ => return None,
        })
    }

    /// Whether a player can stand on top of this tile.
    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            Tile::Wall
                | Tile::ItemBlock
                | Tile::MushroomBlock
                | Tile::Breakable
                | Tile::PipeBody
                | Tile::PipeTop
        )
    }

    /// Whether a player can occupy this cell.
    #[inline]
    pub fn is_passable(self) -> bool {
        matches!(
            self,
            Tile::Empty | Tile::Coin | Tile::Enemy | Tile::Start | Tile::Flag | Tile::Flagpole
        )
    }

    #[inline]
    pub fn is_pipe(self) -> bool {
        matches!(self, Tile::PipeBody | Tile::PipeTop)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Dense `height x width` tile grid, stored row-major with row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Level {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl Level {
    /// Create a level with every cell set to `fill`.
    pub fn filled(width: usize, height: usize, fill: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; width * height],
        }
    }

    /// Build a level from rows of tiles. Returns `None` for ragged input.
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        Some(Self {
            width,
            height,
            tiles: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Tile at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Tile> {
        self.index(x, y).map(|i| self.tiles[i])
    }

    /// Set a tile. Out-of-range writes are ignored and return `false`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, tile: Tile) -> bool {
        match self.index(x, y) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Overwrite an entire row.
    pub fn fill_row(&mut self, y: usize, tile: Tile) {
        if y < self.height {
            let start = y * self.width;
            self.tiles[start..start + self.width].fill(tile);
        }
    }

    pub fn row(&self, y: usize) -> &[Tile] {
        let start = y * self.width;
        &self.tiles[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.width.max(1))
    }

    pub fn column(&self, x: usize) -> Vec<Tile> {
        (0..self.height)
            .filter_map(|y| self.get(x, y))
            .collect()
    }

    /// Number of cells holding `tile`.
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Text form: rows top to bottom joined by newlines.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Parse the text form. Trailing newlines and `\r` are tolerated.
    pub fn from_text(text: &str) -> Result<Self, LevelParseError> {
        let mut rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let row = line
                .chars()
                .enumerate()
                .map(|(column, c)| {
                    Tile::from_symbol(c).ok_or(LevelParseError::UnknownSymbol {
                        symbol: c,
                        row: line_no,
                        column,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = rows.first().map(Vec::len)
                && first != row.len()
            {
                return Err(LevelParseError::RaggedRow {
                    row: line_no,
                    expected: first,
                    found: row.len(),
                });
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(LevelParseError::Empty);
        }
        // Row lengths were checked above.
        Self::from_rows(rows).ok_or(LevelParseError::Empty)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for tile in row {
                write!(f, "{}", tile.symbol())?;
            }
        }
        Ok(())
    }
}

/// Errors from parsing the level text format.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LevelParseError {
    #[error("Level text contains no rows")]
    Empty,
    #[error("Unknown tile symbol {symbol:?} at row {row}, column {column}")]
    UnknownSymbol {
        symbol: char,
        row: usize,
        column: usize,
    },
    #[error("Row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_roundtrip() {
        for tile in Tile::GENERATED
            .iter()
            .chain(&[Tile::Flag, Tile::Flagpole, Tile::Start])
        {
            assert_eq!(Tile::from_symbol(tile.symbol()), Some(*tile));
        }
        assert_eq!(Tile::from_symbol('z'), None);
    }

    #[test]
    fn test_text_format() {
        let mut level = Level::filled(4, 2, Tile::Empty);
        level.set(0, 1, Tile::Wall);
        level.set(3, 1, Tile::Wall);
        assert_eq!(level.to_text(), "----\nX--X");

        let parsed = Level::from_text("----\nX--X\n").unwrap();
        assert_eq!(parsed, level);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Level::from_text(""), Err(LevelParseError::Empty));
        assert!(matches!(
            Level::from_text("--\n---"),
            Err(LevelParseError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            Level::from_text("-z"),
            Err(LevelParseError::UnknownSymbol { symbol: 'z', .. })
        ));
    }

    #[test]
    fn test_out_of_range_access() {
        let mut level = Level::filled(3, 3, Tile::Empty);
        assert!(!level.set(3, 0, Tile::Wall));
        assert_eq!(level.get(0, 3), None);
        assert_eq!(level.count(Tile::Wall), 0);
        assert_eq!(level.column(1).len(), 3);
    }
}
