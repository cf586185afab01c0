//! Design elements: the typed, parameterized features of the sparse genome.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Tile;

/// Type tag of a design element. The declaration order is the stamping
/// order used when elements are rendered onto a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Hole = 0,
    Platform = 1,
    Enemy = 2,
    Coin = 3,
    Block = 4,
    QuestionBlock = 5,
    Stairs = 6,
    Pipe = 7,
}

impl ElementKind {
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Hole,
        ElementKind::Platform,
        ElementKind::Enemy,
        ElementKind::Coin,
        ElementKind::Block,
        ElementKind::QuestionBlock,
        ElementKind::Stairs,
        ElementKind::Pipe,
    ];
}

/// Tile a platform is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlatformMaterial {
    ItemBlock,
    Breakable,
    Wall,
}

impl PlatformMaterial {
    pub const ALL: [PlatformMaterial; 3] = [
        PlatformMaterial::ItemBlock,
        PlatformMaterial::Breakable,
        PlatformMaterial::Wall,
    ];

    pub fn tile(self) -> Tile {
        match self {
            PlatformMaterial::ItemBlock => Tile::ItemBlock,
            PlatformMaterial::Breakable => Tile::Breakable,
            PlatformMaterial::Wall => Tile::Wall,
        }
    }
}

/// Horizontal direction a staircase climbs towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StairDirection {
    /// Steps get lower left to right (`dx = -1`).
    Descending,
    /// Steps get higher left to right (`dx = +1`).
    Ascending,
}

impl StairDirection {
    pub fn flipped(self) -> Self {
        match self {
            StairDirection::Ascending => StairDirection::Descending,
            StairDirection::Descending => StairDirection::Ascending,
        }
    }

    pub fn dx(self) -> i32 {
        match self {
            StairDirection::Ascending => 1,
            StairDirection::Descending => -1,
        }
    }
}

/// A placeable level feature anchored at column `x`.
///
/// Heights named `y` on single tiles are row indices from the top; heights on
/// platforms, stairs and pipes are measured up from the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DesignElement {
    /// Gap in the floor `width` tiles wide.
    Hole { x: usize, width: usize },
    /// Horizontal run of `material` tiles, `y` rows above the floor.
    Platform {
        x: usize,
        width: usize,
        y: usize,
        material: PlatformMaterial,
    },
    /// Enemy standing just above the floor.
    Enemy { x: usize },
    /// Single coin at row `y`.
    Coin { x: usize, y: usize },
    /// Single wall or breakable tile at row `y`.
    Block { x: usize, y: usize, breakable: bool },
    /// Single question block at row `y`.
    QuestionBlock { x: usize, y: usize, powerup: bool },
    /// Staircase of wall tiles, `height` steps tall.
    Stairs {
        x: usize,
        height: usize,
        direction: StairDirection,
    },
    /// Pipe rising `height` tiles above the floor row.
    Pipe { x: usize, height: usize },
}

impl DesignElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            DesignElement::Hole { .. } => ElementKind::Hole,
            DesignElement::Platform { .. } => ElementKind::Platform,
            DesignElement::Enemy { .. } => ElementKind::Enemy,
            DesignElement::Coin { .. } => ElementKind::Coin,
            DesignElement::Block { .. } => ElementKind::Block,
            DesignElement::QuestionBlock { .. } => ElementKind::QuestionBlock,
            DesignElement::Stairs { .. } => ElementKind::Stairs,
            DesignElement::Pipe { .. } => ElementKind::Pipe,
        }
    }

    /// Anchor column.
    pub fn x(&self) -> usize {
        match *self {
            DesignElement::Hole { x, .. }
            | DesignElement::Platform { x, .. }
            | DesignElement::Enemy { x }
            | DesignElement::Coin { x, .. }
            | DesignElement::Block { x, .. }
            | DesignElement::QuestionBlock { x, .. }
            | DesignElement::Stairs { x, .. }
            | DesignElement::Pipe { x, .. } => x,
        }
    }

    /// Type-specific parameters flattened for lexicographic comparison.
    fn params(&self) -> [usize; 3] {
        match *self {
            DesignElement::Hole { width, .. } => [width, 0, 0],
            DesignElement::Platform {
                width, y, material, ..
            } => [width, y, material as usize],
            DesignElement::Enemy { .. } => [0, 0, 0],
            DesignElement::Coin { y, .. } => [y, 0, 0],
            DesignElement::Block { y, breakable, .. } => [y, breakable as usize, 0],
            DesignElement::QuestionBlock { y, powerup, .. } => [y, powerup as usize, 0],
            DesignElement::Stairs {
                height, direction, ..
            } => [height, direction as usize, 0],
            DesignElement::Pipe { height, .. } => [height, 0, 0],
        }
    }

    /// Order kept inside the genome: position, then type, then parameters.
    pub fn genome_key(&self) -> (usize, ElementKind, [usize; 3]) {
        (self.x(), self.kind(), self.params())
    }

    /// Order used when stamping onto a level: type, then position, then
    /// parameters. Later elements overwrite earlier ones.
    pub fn materialization_key(&self) -> (ElementKind, usize, [usize; 3]) {
        (self.kind(), self.x(), self.params())
    }
}

impl PartialOrd for DesignElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DesignElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.genome_key().cmp(&other.genome_key())
    }
}
