//! Level Evolution - Evolutionary search for 2D platformer levels.
//!
//! This crate evolves tile-based platformer levels with a generational
//! genetic algorithm. Levels are encoded either as a dense tile grid or as a
//! sparse list of design elements, and scored by an external measure of the
//! rendered level.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Tiles, levels, design elements and configuration types
//! - `compute`: Genomes, fitness, selection, the search driver and archive
//!
//! # Example
//!
//! ```rust,no_run
//! use level_evolution::{
//!     compute::{TileCensus, evolution::{ElementGenome, EvolutionEngine}},
//!     schema::{EvolutionConfig, GenomeKind},
//! };
//!
//! let mut config = EvolutionConfig::default();
//! config.genome = GenomeKind::Elements;
//! config.population.stagnation_limit = Some(20);
//!
//! let mut engine = EvolutionEngine::<ElementGenome, _>::new(config, TileCensus).unwrap();
//! let result = engine.run().unwrap();
//!
//! if let Some(best) = result.best() {
//!     println!("Best fitness: {:.3}", best.fitness());
//!     println!("{}", best.snapshot().level);
//! }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::TileCensus;
pub use compute::evolution::{ElementGenome, EvolutionEngine, GridGenome, LevelGenome};
pub use schema::{EvolutionConfig, Level, LevelConfig, Tile};
