//! Evolution configuration types for level search.
//!
//! This module provides the configuration surface of the generational search
//! (population, fitness coefficients, operator probabilities, stop conditions)
//! together with the progress and result types it reports.

use serde::{Deserialize, Serialize};

use super::LevelConfig;

/// Top-level configuration for an evolutionary level search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Level geometry shared by every individual.
    #[serde(default)]
    pub level: LevelConfig,
    /// Genome representation to evolve.
    #[serde(default)]
    pub genome: GenomeKind,
    /// Population and stopping settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Fitness coefficients and penalties.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Mutation, crossover and generation constants.
    #[serde(default)]
    pub operators: OperatorConfig,
    /// Fitness worker threads. 0 uses every available core.
    #[serde(default)]
    pub workers: usize,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            level: LevelConfig::default(),
            genome: GenomeKind::default(),
            population: PopulationConfig::default(),
            fitness: FitnessConfig::default(),
            operators: OperatorConfig::default(),
            workers: 0,
            random_seed: None,
        }
    }
}

/// Genome representation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeKind {
    /// Dense tile grid.
    #[default]
    Grid,
    /// Sparse ordered list of design elements.
    Elements,
}

/// Population and generation settings.
///
/// Leaving every stop field unset runs until the engine is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Fraction of the initial population built randomly; the rest start
    /// from the empty baseline.
    #[serde(default = "default_random_fraction")]
    pub random_fraction: f64,
    /// Maximum number of generations.
    #[serde(default)]
    pub max_generations: Option<usize>,
    /// Target fitness to stop early.
    #[serde(default)]
    pub target_fitness: Option<f64>,
    /// Stagnation limit: stop if no improvement for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
    /// Wall-clock budget in seconds.
    #[serde(default)]
    pub time_budget_secs: Option<f64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            random_fraction: default_random_fraction(),
            max_generations: None,
            target_fitness: None,
            stagnation_limit: None,
            time_budget_secs: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_random_fraction() -> f64 {
    1.0
}

/// A named measurement and its coefficient in the fitness sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedMeasurement {
    /// Measurement name as reported by the measure function.
    pub name: String,
    /// Coefficient applied to the measurement.
    pub weight: f64,
}

impl WeightedMeasurement {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Fitness coefficient tables, one per genome representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Coefficients for grid genomes.
    #[serde(default = "default_grid_coefficients")]
    pub grid: Vec<WeightedMeasurement>,
    /// Coefficients for design-element genomes.
    #[serde(default = "default_element_coefficients")]
    pub elements: Vec<WeightedMeasurement>,
    /// Element genomes with more stairs than this are penalized.
    #[serde(default = "default_stairs_limit")]
    pub stairs_limit: usize,
    /// Penalty subtracted when the stairs limit is exceeded.
    #[serde(default = "default_stairs_penalty")]
    pub stairs_penalty: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            grid: default_grid_coefficients(),
            elements: default_element_coefficients(),
            stairs_limit: default_stairs_limit(),
            stairs_penalty: default_stairs_penalty(),
        }
    }
}

fn default_grid_coefficients() -> Vec<WeightedMeasurement> {
    vec![
        WeightedMeasurement::new("meaningfulJumpVariance", 0.5),
        WeightedMeasurement::new("negativeSpace", 0.6),
        WeightedMeasurement::new("pathPercentage", 0.5),
        WeightedMeasurement::new("emptyPercentage", 0.6),
        WeightedMeasurement::new("linearity", -0.5),
        WeightedMeasurement::new("solvability", 2.0),
    ]
}
fn default_element_coefficients() -> Vec<WeightedMeasurement> {
    vec![
        WeightedMeasurement::new("meaningfulJumpVariance", 0.5),
        WeightedMeasurement::new("negativeSpace", 0.4),
        WeightedMeasurement::new("pathPercentage", 0.5),
        WeightedMeasurement::new("emptyPercentage", 0.6),
        WeightedMeasurement::new("linearity", -0.5),
        WeightedMeasurement::new("solvability", 2.0),
        WeightedMeasurement::new("meaningfulJumps", 0.15),
    ]
}
fn default_stairs_limit() -> usize {
    10
}
fn default_stairs_penalty() -> f64 {
    2.0
}

/// Operator constants for both genome representations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfig {
    #[serde(default)]
    pub grid: GridOperatorConfig,
    #[serde(default)]
    pub elements: ElementOperatorConfig,
}

/// Relative weights for the random tile replacement edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplacementWeights {
    pub item_block: f64,
    pub coin: f64,
    pub enemy: f64,
    pub empty: f64,
}

impl Default for ReplacementWeights {
    fn default() -> Self {
        Self {
            item_block: 15.0,
            coin: 25.0,
            enemy: 15.0,
            empty: 45.0,
        }
    }
}

impl ReplacementWeights {
    pub fn as_array(&self) -> [f64; 4] {
        [self.item_block, self.coin, self.enemy, self.empty]
    }
}

/// Grid genome generation and mutation constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridOperatorConfig {
    /// Inclusive bounds on edits per mutation.
    #[serde(default = "default_edit_bounds")]
    pub edit_bounds: (usize, usize),
    /// Probability an edit replaces the anchor tile at random.
    #[serde(default = "default_random_edit_rate")]
    pub random_edit_rate: f64,
    /// Probability an edit is constructive, when it is not random.
    #[serde(default = "default_constructive_edit_rate")]
    pub constructive_edit_rate: f64,
    /// Tile weights for random replacement.
    #[serde(default)]
    pub replacement_weights: ReplacementWeights,
    /// Inclusive bounds on floor pits in a random grid.
    #[serde(default = "default_pit_bounds")]
    pub pit_bounds: (usize, usize),
    /// Longest floor pit in a random grid.
    #[serde(default = "default_max_pit_length")]
    pub max_pit_length: usize,
    /// Chance an enemy spawns on top of a wall or brick.
    #[serde(default = "default_enemy_chance")]
    pub enemy_chance: f64,
}

impl Default for GridOperatorConfig {
    fn default() -> Self {
        Self {
            edit_bounds: default_edit_bounds(),
            random_edit_rate: default_random_edit_rate(),
            constructive_edit_rate: default_constructive_edit_rate(),
            replacement_weights: ReplacementWeights::default(),
            pit_bounds: default_pit_bounds(),
            max_pit_length: default_max_pit_length(),
            enemy_chance: default_enemy_chance(),
        }
    }
}

fn default_edit_bounds() -> (usize, usize) {
    (5, 10)
}
fn default_random_edit_rate() -> f64 {
    0.1
}
fn default_constructive_edit_rate() -> f64 {
    0.3
}
fn default_pit_bounds() -> (usize, usize) {
    (5, 25)
}
fn default_max_pit_length() -> usize {
    3
}
fn default_enemy_chance() -> f64 {
    0.13
}

/// Design-element genome generation and mutation constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementOperatorConfig {
    /// Probability a mutation call changes anything.
    #[serde(default = "default_element_mutation_rate")]
    pub mutation_rate: f64,
    /// Trailing elements (in genome order) never picked for mutation.
    #[serde(default = "default_protected_tail")]
    pub protected_tail: usize,
    /// Inclusive bounds on elements in a random genome.
    #[serde(default = "default_element_count")]
    pub element_count: (usize, usize),
}

impl Default for ElementOperatorConfig {
    fn default() -> Self {
        Self {
            mutation_rate: default_element_mutation_rate(),
            protected_tail: default_protected_tail(),
            element_count: default_element_count(),
        }
    }
}

fn default_element_mutation_rate() -> f64 {
    0.2
}
fn default_protected_tail() -> usize {
    4
}
fn default_element_count() -> (usize, usize) {
    (300, 500)
}

// ============================================================================
// Progress and results
// ============================================================================

/// Serializable view of one individual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualSnapshot {
    /// Unique identifier.
    pub id: u64,
    /// Cached fitness.
    pub fitness: f64,
    /// Generation the individual was created in.
    pub generation: usize,
    /// Parent IDs (empty for initial and elite individuals).
    pub parents: Vec<u64>,
    /// Level in the text boundary format.
    pub level: String,
}

/// Progress report delivered after every evaluated generation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionProgress {
    /// Current generation (0 = initial population).
    pub generation: usize,
    /// Generation limit, if any.
    pub max_generations: Option<usize>,
    /// Fitness computations performed for this generation.
    pub evaluations_completed: usize,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Average fitness of the current population.
    pub avg_fitness: f64,
    /// Best fitness of the current population.
    pub generation_best: f64,
    /// Generations without improvement.
    pub stagnation_count: usize,
    /// Best individual of the current population.
    pub best: Option<IndividualSnapshot>,
    /// Time spent generating successors.
    pub successor_seconds: f64,
    /// Time spent evaluating fitness.
    pub evaluation_seconds: f64,
    /// Time since the run started.
    pub elapsed_seconds: f64,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f64>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f64>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f64>,
}

/// Statistics from evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Fitness computations performed (cached elites are not counted).
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f64,
    /// Average fitness of final population.
    pub final_avg_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Evaluations per second.
    pub evaluations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Wall-clock budget spent.
    TimeBudget,
    /// Custom stop predicate fired.
    Predicate,
    /// User cancelled.
    Cancelled,
}

/// Everything the archive records about a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: EvolutionConfig,
    pub stats: EvolutionStats,
    pub history: EvolutionHistory,
    /// Best individuals of the final population, fittest first.
    pub top: Vec<IndividualSnapshot>,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 4, got {0}")]
    PopulationTooSmall(usize),
    #[error("No fitness coefficients specified for {0} genomes")]
    NoCoefficients(&'static str),
    #[error("Invalid coefficient: {0}")]
    InvalidWeight(String),
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Invalid stop condition: {0}")]
    InvalidStopCondition(String),
    #[error("Level config validation failed: {0}")]
    LevelConfigError(#[from] super::ConfigError),
}

impl EvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        self.level.validate()?;

        if self.population.size < 4 {
            return Err(EvolutionConfigError::PopulationTooSmall(
                self.population.size,
            ));
        }

        let check_probability = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidProbability { name, value })
            }
        };
        check_probability(self.population.random_fraction, "random_fraction")?;

        if let Some(target) = self.population.target_fitness
            && !target.is_finite()
        {
            return Err(EvolutionConfigError::InvalidStopCondition(format!(
                "target fitness {target} must be finite"
            )));
        }
        if let Some(budget) = self.population.time_budget_secs
            && !(budget > 0.0)
        {
            return Err(EvolutionConfigError::InvalidStopCondition(format!(
                "time budget {budget} must be positive"
            )));
        }

        // Check coefficient tables
        for (table, label) in [
            (&self.fitness.grid, "grid"),
            (&self.fitness.elements, "element"),
        ] {
            if table.is_empty() {
                return Err(EvolutionConfigError::NoCoefficients(label));
            }
            for m in table {
                if !m.weight.is_finite() {
                    return Err(EvolutionConfigError::InvalidWeight(format!(
                        "{} has non-finite weight {}",
                        m.name, m.weight
                    )));
                }
            }
        }
        if !self.fitness.stairs_penalty.is_finite() {
            return Err(EvolutionConfigError::InvalidWeight(format!(
                "stairs penalty {} must be finite",
                self.fitness.stairs_penalty
            )));
        }

        // Validate bounds
        let check_bounds = |bounds: (usize, usize), name: &str| {
            if bounds.0 > bounds.1 {
                Err(EvolutionConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )))
            } else {
                Ok(())
            }
        };

        let grid = &self.operators.grid;
        check_bounds(grid.edit_bounds, "edit_bounds")?;
        check_bounds(grid.pit_bounds, "pit_bounds")?;
        check_probability(grid.random_edit_rate, "random_edit_rate")?;
        check_probability(grid.constructive_edit_rate, "constructive_edit_rate")?;
        check_probability(grid.enemy_chance, "enemy_chance")?;

        let weights = grid.replacement_weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(EvolutionConfigError::InvalidWeight(format!(
                "replacement weights {weights:?} must be non-negative with a positive sum"
            )));
        }

        let elements = &self.operators.elements;
        check_bounds(elements.element_count, "element_count")?;
        check_probability(elements.mutation_rate, "mutation_rate")?;

        Ok(())
    }
}
