//! Evolutionary search module for generating platformer levels.
//!
//! This module provides two genome representations of a level and a
//! generational driver that evolves either of them against an external
//! level measure.
//!
//! # Overview
//!
//! The evolutionary search system consists of:
//!
//! - **Genomes** (`genome`, `grid`, `elements`): Random generation, crossover, and mutation
//! - **Fitness** (`fitness`): Weighted measurements from a pluggable [`Measure`]
//! - **Selection** (`selection`): Tournament, elitism, and successor generation
//! - **Search** (`search`): Parallel generational driver with cancellation
//! - **Level Archive** (`archive`): Level text files and run summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use level_evolution::compute::TileCensus;
//! use level_evolution::compute::evolution::{
//!     EvolutionEngine, GridGenome, LevelArchive, LevelGenome,
//! };
//! use level_evolution::schema::EvolutionConfig;
//!
//! let mut config = EvolutionConfig::default();
//! config.population.max_generations = Some(10);
//!
//! let mut engine = EvolutionEngine::<GridGenome, _>::new(config, TileCensus).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: best fitness = {:.3}",
//!             progress.generation, progress.best_fitness);
//!     })
//!     .unwrap();
//!
//! let archive = LevelArchive::new("levels").unwrap();
//! let levels = result.ranked().into_iter().map(|i| i.genome.to_level());
//! archive.save_ranked("final", levels, 10).unwrap();
//! ```
//!
//! # Genome Representations
//!
//! - `GridGenome`: The level grid itself, varied by local tile edits
//! - `ElementGenome`: Ordered design elements rendered onto the baseline level

mod archive;
mod elements;
mod fitness;
mod genome;
mod grid;
mod search;
mod selection;

pub use archive::{ArchiveError, LATEST_FILE, LevelArchive};
pub use elements::ElementGenome;
pub use fitness::{FitnessError, FitnessEvaluator, Measure, Measurements};
pub use genome::{GenomeRng, LevelGenome};
pub use grid::GridGenome;
pub use search::{EvolutionEngine, EvolutionError, EvolutionResult, Individual, StopPredicate};
pub use selection::{elitism_selection, generate_successors, tournament_selection};
