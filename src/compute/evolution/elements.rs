//! Sparse design-element genome.
//!
//! A level is described by a few hundred typed elements (holes, platforms,
//! pipes, ...) kept ordered by position. The dense grid is rendered lazily
//! on top of the baseline level and cached for the lifetime of the genome.

use std::sync::OnceLock;

use crate::schema::{
    DesignElement, ElementKind, ElementOperatorConfig, FitnessConfig, GenomeKind, Level,
    LevelConfig, OperatorConfig, PlatformMaterial, StairDirection, Tile, WeightedMeasurement,
};

use super::genome::{GenomeRng, LevelGenome};

/// Widest hole or platform a random genome starts with.
const MAX_RANDOM_SPAN: usize = 8;

/// A level genome stored as an ordered list of design elements.
#[derive(Debug, Clone)]
pub struct ElementGenome {
    elements: Vec<DesignElement>,
    level: LevelConfig,
    rendered: OnceLock<Level>,
}

impl PartialEq for ElementGenome {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements && self.level == other.level
    }
}

impl ElementGenome {
    /// Build a genome from elements in any order.
    pub fn new(mut elements: Vec<DesignElement>, level: LevelConfig) -> Self {
        elements.sort();
        Self {
            elements,
            level,
            rendered: OnceLock::new(),
        }
    }

    /// Elements in genome order.
    pub fn elements(&self) -> &[DesignElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements of one kind.
    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }

    fn insert_sorted(elements: &mut Vec<DesignElement>, element: DesignElement) {
        let idx = elements.partition_point(|e| *e <= element);
        elements.insert(idx, element);
    }

    /// Two-point recombination without mutation. Split points past the end
    /// of a parent are clamped to its length.
    pub fn crossover_at(&self, other: &Self, pa: usize, pb: usize) -> (Self, Self) {
        let (a, b) = (&self.elements, &other.elements);
        let (pa, pb) = (pa.min(a.len()), pb.min(b.len()));

        let first = a[..pa].iter().chain(&b[pb..]).copied().collect();
        let second = b[..pb].iter().chain(&a[pa..]).copied().collect();
        (
            Self::new(first, self.level),
            Self::new(second, self.level),
        )
    }

    fn mutated(&self, ops: &ElementOperatorConfig, rng: &mut GenomeRng) -> Self {
        let mut elements = self.elements.clone();
        let len = elements.len();

        // The trailing elements are never picked.
        if len > ops.protected_tail && rng.chance(ops.mutation_rate) {
            let idx = rng.range_or_low(0, len - ops.protected_tail - 1);
            let changed = perturb(elements[idx], &self.level, rng);
            elements.remove(idx);
            Self::insert_sorted(&mut elements, changed);
        }

        Self {
            elements,
            level: self.level,
            rendered: OnceLock::new(),
        }
    }

    /// Render the elements onto the baseline level, bypassing the cache.
    pub fn materialize(&self) -> Level {
        let mut level = self.level.baseline_level();
        let mut order: Vec<&DesignElement> = self.elements.iter().collect();
        order.sort_by_key(|e| e.materialization_key());

        for element in order {
            stamp(&mut level, element);
        }
        level
    }
}

/// Clamp without panicking on an inverted range.
#[inline]
fn clip(lo: usize, value: usize, hi: usize) -> usize {
    value.max(lo).min(hi)
}

fn stamp(level: &mut Level, element: &DesignElement) {
    let (w, h) = (level.width(), level.height());
    let column = |x: usize| clip(1, x, w.saturating_sub(2));
    let row_above_floor = |y: usize| clip(0, h.saturating_sub(y + 1), h - 1);

    match *element {
        DesignElement::Block { x, y, breakable } => {
            let tile = if breakable { Tile::Breakable } else { Tile::Wall };
            level.set(x, y, tile);
        }
        DesignElement::QuestionBlock { x, y, powerup } => {
            let tile = if powerup {
                Tile::MushroomBlock
            } else {
                Tile::ItemBlock
            };
            level.set(x, y, tile);
        }
        DesignElement::Coin { x, y } => {
            level.set(x, y, Tile::Coin);
        }
        DesignElement::Pipe { x, height } => {
            // Pipes taller than the level have no visible top.
            if let Some(top) = h.checked_sub(height + 1) {
                level.set(x, top, Tile::PipeTop);
            }
            for y in h.saturating_sub(height)..h {
                level.set(x, y, Tile::PipeBody);
            }
        }
        DesignElement::Hole { x, width } => {
            for k in 0..width {
                level.set(column(x + k), h - 1, Tile::Empty);
            }
        }
        DesignElement::Stairs {
            x,
            height,
            direction,
        } => {
            for step in 1..=height {
                let tall = match direction {
                    StairDirection::Ascending => step,
                    StairDirection::Descending => height - step,
                };
                for y in 0..tall {
                    level.set(column(x + step), row_above_floor(y), Tile::Wall);
                }
            }
        }
        DesignElement::Platform {
            x,
            width,
            y,
            material,
        } => {
            let row = row_above_floor(y);
            for k in 0..width {
                level.set(column(x + k), row, material.tile());
            }
        }
        DesignElement::Enemy { x } => {
            level.set(x, h - 2, Tile::Enemy);
        }
    }
}

/// Vary one parameter of `element`. Enemies have nothing to vary.
fn perturb(element: DesignElement, level: &LevelConfig, rng: &mut GenomeRng) -> DesignElement {
    let (w, h) = (level.width, level.height);
    let choice = rng.unit();
    let shift_x =
        |x: usize, rng: &mut GenomeRng| rng.offset_by_upto(x, w as f64 / 8.0, 1, w - 2);

    match element {
        DesignElement::Block { x, y, breakable } => {
            if choice < 0.33 {
                DesignElement::Block {
                    x: shift_x(x, rng),
                    y,
                    breakable,
                }
            } else if choice < 0.66 {
                DesignElement::Block {
                    x,
                    y: rng.offset_by_upto(y, h as f64 / 2.0, 0, h - 1),
                    breakable,
                }
            } else {
                DesignElement::Block {
                    x,
                    y,
                    breakable: !breakable,
                }
            }
        }
        DesignElement::QuestionBlock { x, y, powerup } => {
            if choice < 0.33 {
                DesignElement::QuestionBlock {
                    x: shift_x(x, rng),
                    y,
                    powerup,
                }
            } else if choice < 0.66 {
                DesignElement::QuestionBlock {
                    x,
                    y: rng.offset_by_upto(y, h as f64 / 2.0, 0, h - 1),
                    powerup,
                }
            } else {
                DesignElement::QuestionBlock {
                    x,
                    y,
                    powerup: !powerup,
                }
            }
        }
        DesignElement::Coin { x, y } => {
            if choice < 0.5 {
                DesignElement::Coin {
                    x: shift_x(x, rng),
                    y,
                }
            } else {
                DesignElement::Coin {
                    x,
                    y: rng.offset_by_upto(y, h as f64 / 2.0, 0, h - 1),
                }
            }
        }
        DesignElement::Pipe { x, height } => {
            if choice < 0.5 {
                DesignElement::Pipe {
                    x: shift_x(x, rng),
                    height,
                }
            } else {
                DesignElement::Pipe {
                    x,
                    height: rng.offset_by_upto(height, 2.0, 2, h - 8),
                }
            }
        }
        DesignElement::Hole { x, width } => {
            if choice < 0.5 {
                DesignElement::Hole {
                    x: shift_x(x, rng),
                    width,
                }
            } else {
                DesignElement::Hole {
                    x,
                    width: rng.offset_by_upto(width, 4.0, 1, w - 2),
                }
            }
        }
        DesignElement::Stairs {
            x,
            height,
            direction,
        } => {
            if choice < 0.33 {
                DesignElement::Stairs {
                    x: shift_x(x, rng),
                    height,
                    direction,
                }
            } else if choice < 0.66 {
                DesignElement::Stairs {
                    x,
                    height: rng.offset_by_upto(height, 8.0, 1, h - 6),
                    direction,
                }
            } else {
                DesignElement::Stairs {
                    x,
                    height,
                    direction: direction.flipped(),
                }
            }
        }
        DesignElement::Platform {
            x,
            width,
            y,
            material,
        } => {
            let mut platform = (x, width, y, material);
            if choice < 0.25 {
                platform.0 = shift_x(x, rng);
            } else if choice < 0.5 {
                platform.1 = rng.offset_by_upto(width, 8.0, 1, w - 2);
            } else if choice < 0.75 {
                platform.2 = rng.offset_by_upto(y, h as f64, 0, h - 1);
            } else if let Some(&m) = rng.choose(&PlatformMaterial::ALL) {
                platform.3 = m;
            }
            let (x, width, y, material) = platform;
            DesignElement::Platform {
                x,
                width,
                y,
                material,
            }
        }
        DesignElement::Enemy { .. } => element,
    }
}

fn random_element(kind: ElementKind, level: &LevelConfig, rng: &mut GenomeRng) -> DesignElement {
    let (w, h) = (level.width, level.height);
    let x = rng.range_or_low(1, w - 2);

    match kind {
        ElementKind::Hole => DesignElement::Hole {
            x,
            width: rng.range_or_low(1, MAX_RANDOM_SPAN),
        },
        ElementKind::Platform => DesignElement::Platform {
            x,
            width: rng.range_or_low(1, MAX_RANDOM_SPAN),
            y: rng.range_or_low(0, h - 1),
            material: rng
                .choose(&PlatformMaterial::ALL)
                .copied()
                .unwrap_or(PlatformMaterial::Wall),
        },
        ElementKind::Enemy => DesignElement::Enemy { x },
        ElementKind::Coin => DesignElement::Coin {
            x,
            y: rng.range_or_low(0, h - 1),
        },
        ElementKind::Block => DesignElement::Block {
            x,
            y: rng.range_or_low(0, h - 1),
            breakable: rng.chance(0.5),
        },
        ElementKind::QuestionBlock => DesignElement::QuestionBlock {
            x,
            y: rng.range_or_low(0, h - 1),
            powerup: rng.chance(0.5),
        },
        ElementKind::Stairs => DesignElement::Stairs {
            x,
            height: rng.range_or_low(1, h - 4),
            direction: if rng.chance(0.5) {
                StairDirection::Ascending
            } else {
                StairDirection::Descending
            },
        },
        ElementKind::Pipe => DesignElement::Pipe {
            x,
            height: rng.range_or_low(2, h - 8),
        },
    }
}

impl LevelGenome for ElementGenome {
    const KIND: GenomeKind = GenomeKind::Elements;

    fn random(level: &LevelConfig, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self {
        let (lo, hi) = ops.elements.element_count;
        let count = rng.range_or_low(lo, hi);
        let elements = (0..count)
            .map(|_| {
                let kind = rng
                    .choose(&ElementKind::ALL)
                    .copied()
                    .unwrap_or(ElementKind::Enemy);
                random_element(kind, level, rng)
            })
            .collect();
        Self::new(elements, *level)
    }

    fn empty(level: &LevelConfig) -> Self {
        Self::new(Vec::new(), *level)
    }

    fn mutate(&self, ops: &OperatorConfig, rng: &mut GenomeRng) -> Self {
        self.mutated(&ops.elements, rng)
    }

    fn generate_children(
        &self,
        other: &Self,
        ops: &OperatorConfig,
        rng: &mut GenomeRng,
    ) -> (Self, Self) {
        let pa = rng.range_or_low(0, self.len().saturating_sub(1));
        let pb = rng.range_or_low(0, other.len().saturating_sub(1));
        let (first, second) = self.crossover_at(other, pa, pb);
        (
            first.mutated(&ops.elements, rng),
            second.mutated(&ops.elements, rng),
        )
    }

    fn to_level(&self) -> &Level {
        self.rendered.get_or_init(|| self.materialize())
    }

    fn coefficients(fitness: &FitnessConfig) -> &[WeightedMeasurement] {
        &fitness.elements
    }

    fn penalty(&self, fitness: &FitnessConfig) -> f64 {
        if self.count(ElementKind::Stairs) > fitness.stairs_limit {
            fitness.stairs_penalty
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn genome(elements: Vec<DesignElement>) -> ElementGenome {
        ElementGenome::new(elements, LevelConfig::default())
    }

    fn random_genome(seed: u64) -> ElementGenome {
        let mut rng = GenomeRng::new(seed);
        ElementGenome::random(&LevelConfig::default(), &OperatorConfig::default(), &mut rng)
    }

    fn is_sorted(genome: &ElementGenome) -> bool {
        genome.elements().windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_single_hole_floor() {
        let level = genome(vec![DesignElement::Hole { x: 5, width: 3 }])
            .to_level()
            .clone();

        for (x, &tile) in level.row(15).iter().enumerate() {
            if (5..=7).contains(&x) {
                assert_eq!(tile, Tile::Empty, "column {x}");
            } else {
                assert_eq!(tile, Tile::Wall, "column {x}");
            }
        }
    }

    #[test]
    fn test_empty_genome_is_baseline() {
        let config = LevelConfig::default();
        let empty = ElementGenome::empty(&config);
        assert!(empty.is_empty());
        assert_eq!(*empty.to_level(), config.baseline_level());
    }

    #[test]
    fn test_materialization_is_cached_and_idempotent() {
        let genome = random_genome(4);
        let first: *const Level = genome.to_level();
        let second: *const Level = genome.to_level();
        assert_eq!(first, second);
        assert_eq!(*genome.to_level(), genome.materialize());
        assert_eq!(genome.materialize(), genome.materialize());
    }

    #[test]
    fn test_later_kinds_overwrite_earlier() {
        let g = genome(vec![
            DesignElement::Pipe { x: 10, height: 3 },
            DesignElement::Hole { x: 10, width: 1 },
            DesignElement::Block {
                x: 4,
                y: 14,
                breakable: false,
            },
            DesignElement::Enemy { x: 4 },
        ]);
        let level = g.to_level();

        assert_eq!(level.get(10, 12), Some(Tile::PipeTop));
        for y in 13..16 {
            assert_eq!(level.get(10, y), Some(Tile::PipeBody));
        }
        // Blocks are stamped after enemies.
        assert_eq!(level.get(4, 14), Some(Tile::Wall));
    }

    #[test]
    fn test_ascending_stairs() {
        let g = genome(vec![DesignElement::Stairs {
            x: 10,
            height: 3,
            direction: StairDirection::Ascending,
        }]);
        let level = g.to_level();
        let column_walls = |x: usize| level.column(x).iter().filter(|&&t| t == Tile::Wall).count();

        assert_eq!(column_walls(10), 1);
        assert_eq!(column_walls(11), 1);
        assert_eq!(column_walls(12), 2);
        assert_eq!(column_walls(13), 3);
        assert_eq!(level.get(13, 13), Some(Tile::Wall));
    }

    #[test]
    fn test_out_of_range_elements_are_clipped_or_ignored() {
        let g = genome(vec![
            DesignElement::Coin { x: 500, y: 3 },
            DesignElement::Pipe { x: 20, height: 40 },
            DesignElement::Platform {
                x: 198,
                width: 5,
                y: 30,
                material: PlatformMaterial::Breakable,
            },
        ]);
        let level = g.to_level();
        assert_eq!(level.count(Tile::Coin), 0);
        assert_eq!(level.count(Tile::PipeTop), 0);
        assert_eq!(level.get(20, 0), Some(Tile::PipeBody));
        assert_eq!(level.get(198, 0), Some(Tile::Breakable));
        assert_eq!(level.get(199, 0), Some(Tile::Empty));
    }

    #[test]
    fn test_mutation_keeps_count_and_order() {
        let parent = random_genome(8);
        let snapshot = parent.clone();
        let ops = OperatorConfig {
            elements: ElementOperatorConfig {
                mutation_rate: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut rng = GenomeRng::new(21);

        let mut changed = false;
        for _ in 0..50 {
            let child = parent.mutate(&ops, &mut rng);
            assert_eq!(child.len(), parent.len());
            assert!(is_sorted(&child));
            changed |= child != parent;
        }
        assert!(changed);
        assert_eq!(parent, snapshot);
    }

    #[test]
    fn test_short_genome_is_not_mutated() {
        let g = genome(vec![
            DesignElement::Coin { x: 3, y: 3 },
            DesignElement::Coin { x: 6, y: 3 },
            DesignElement::Hole { x: 9, width: 2 },
            DesignElement::Pipe { x: 12, height: 4 },
        ]);
        let ops = OperatorConfig {
            elements: ElementOperatorConfig {
                mutation_rate: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut rng = GenomeRng::new(1);
        for _ in 0..20 {
            assert_eq!(g.mutate(&ops, &mut rng), g);
        }
    }

    #[test]
    fn test_crossover_on_empty_genomes() {
        let empty = ElementGenome::empty(&LevelConfig::default());
        let mut rng = GenomeRng::new(2);
        let (a, b) = empty.generate_children(&empty, &OperatorConfig::default(), &mut rng);
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn test_stairs_penalty() {
        let fitness = FitnessConfig::default();
        let stairs = |n: usize| {
            genome(
                (0..n)
                    .map(|i| DesignElement::Stairs {
                        x: 10 + i * 5,
                        height: 2,
                        direction: StairDirection::Ascending,
                    })
                    .collect(),
            )
        };
        assert_eq!(stairs(10).penalty(&fitness), 0.0);
        assert_eq!(stairs(11).penalty(&fitness), 2.0);
    }

    #[test]
    fn test_random_genome_bounds() {
        let g = random_genome(13);
        assert!((300..=500).contains(&g.len()));
        assert!(is_sorted(&g));
        for element in g.elements() {
            assert!((1..=198).contains(&element.x()));
            match *element {
                DesignElement::Pipe { height, .. } => assert!((2..=8).contains(&height)),
                DesignElement::Stairs { height, .. } => assert!((1..=12).contains(&height)),
                DesignElement::Hole { width, .. } => assert!((1..=8).contains(&width)),
                _ => {}
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_crossover_preserves_total_count(s1 in any::<u64>(), s2 in any::<u64>(), s3 in any::<u64>()) {
            let (p1, p2) = (random_genome(s1), random_genome(s2));
            let mut rng = GenomeRng::new(s3);
            let (c1, c2) = p1.generate_children(&p2, &OperatorConfig::default(), &mut rng);
            prop_assert_eq!(c1.len() + c2.len(), p1.len() + p2.len());
            prop_assert!(is_sorted(&c1) && is_sorted(&c2));
        }
    }
}
