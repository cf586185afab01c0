//! Generational driver for evolutionary level search.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::schema::{
    EvolutionConfig, EvolutionConfigError, EvolutionHistory, EvolutionProgress, EvolutionStats,
    IndividualSnapshot, StopReason,
};

use super::fitness::{FitnessError, FitnessEvaluator, Measure};
use super::genome::{GenomeRng, LevelGenome};
use super::selection::generate_successors;

/// An individual in the population.
#[derive(Debug, Clone)]
pub struct Individual<G> {
    /// Unique identifier.
    pub id: u64,
    /// The genome.
    pub genome: G,
    /// Fitness, computed at most once.
    fitness: Option<f64>,
    /// Generation created.
    pub generation: usize,
    /// Parent IDs.
    pub parents: Vec<u64>,
}

impl<G> Individual<G> {
    pub fn new(id: u64, genome: G, generation: usize, parents: Vec<u64>) -> Self {
        Self {
            id,
            genome,
            fitness: None,
            generation,
            parents,
        }
    }

    /// Cached fitness, or negative infinity before evaluation.
    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    #[cfg(test)]
    pub(crate) fn scored(id: u64, genome: G, fitness: f64) -> Self {
        Self {
            fitness: Some(fitness),
            ..Self::new(id, genome, 0, Vec::new())
        }
    }
}

impl<G: LevelGenome> Individual<G> {
    /// Compute fitness on first call; later calls return the cached value.
    pub fn evaluate<M: Measure>(
        &mut self,
        evaluator: &FitnessEvaluator<M>,
    ) -> Result<f64, FitnessError> {
        if let Some(fitness) = self.fitness {
            return Ok(fitness);
        }
        let fitness = evaluator.score(&self.genome)?;
        self.fitness = Some(fitness);
        Ok(fitness)
    }

    /// Convert to snapshot for serialization.
    pub fn snapshot(&self) -> IndividualSnapshot {
        IndividualSnapshot {
            id: self.id,
            fitness: self.fitness(),
            generation: self.generation,
            parents: self.parents.clone(),
            level: self.genome.to_level().to_text(),
        }
    }
}

/// Custom stop condition checked at every generation boundary.
pub type StopPredicate = Box<dyn Fn(&EvolutionProgress) -> bool + Send + Sync>;

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] EvolutionConfigError),
    #[error("Measure rejected the baseline level: {0}")]
    Probe(#[source] FitnessError),
    #[error("Fitness evaluation failed for individual {id}: {source}")]
    Fitness {
        id: u64,
        #[source]
        source: FitnessError,
    },
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of a run: the last fully evaluated population.
#[derive(Debug, Clone)]
pub struct EvolutionResult<G> {
    pub population: Vec<Individual<G>>,
    pub stats: EvolutionStats,
    pub history: EvolutionHistory,
}

impl<G: LevelGenome> EvolutionResult<G> {
    /// Population sorted by descending fitness.
    pub fn ranked(&self) -> Vec<&Individual<G>> {
        let mut ranked: Vec<_> = self.population.iter().collect();
        ranked.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        ranked
    }

    pub fn best(&self) -> Option<&Individual<G>> {
        self.population
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Snapshots of the `k` fittest individuals.
    pub fn top(&self, k: usize) -> Vec<IndividualSnapshot> {
        self.ranked()
            .into_iter()
            .take(k)
            .map(Individual::snapshot)
            .collect()
    }
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine<G, M> {
    config: EvolutionConfig,
    rng: GenomeRng,
    evaluator: FitnessEvaluator<M>,
    pool: rayon::ThreadPool,
    population: Vec<Individual<G>>,
    history: EvolutionHistory,
    generation: usize,
    best_fitness: f64,
    stagnation_count: usize,
    evaluations: u64,
    last_evaluations: usize,
    successor_seconds: f64,
    evaluation_seconds: f64,
    started: Instant,
    next_id: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
    stop_predicate: Option<StopPredicate>,
}

impl<G: LevelGenome, M: Measure> EvolutionEngine<G, M> {
    /// Create a new evolution engine.
    ///
    /// Fails if the configuration is invalid, the worker pool cannot be
    /// built, or `measure` does not report every measurement the coefficient
    /// table for `G` needs.
    pub fn new(config: EvolutionConfig, measure: M) -> Result<Self, EvolutionError> {
        config.validate()?;
        if config.genome != G::KIND {
            warn!(
                "Config selects {:?} genomes but the engine evolves {:?}",
                config.genome,
                G::KIND
            );
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;

        let evaluator = FitnessEvaluator::new(measure, config.fitness.clone());
        evaluator
            .probe::<G>(&config.level.baseline_level())
            .map_err(EvolutionError::Probe)?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        info!(
            "Evolution engine ready: {:?} genomes, population {}, {} workers, seed {}",
            G::KIND,
            config.population.size,
            pool.current_num_threads(),
            seed
        );

        Ok(Self {
            config,
            rng: GenomeRng::new(seed),
            evaluator,
            pool,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            best_fitness: f64::NEG_INFINITY,
            stagnation_count: 0,
            evaluations: 0,
            last_evaluations: 0,
            successor_seconds: 0.0,
            evaluation_seconds: 0.0,
            started: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            stop_predicate: None,
        })
    }

    /// Add a custom stop condition.
    pub fn with_stop_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&EvolutionProgress) -> bool + Send + Sync + 'static,
    {
        self.stop_predicate = Some(Box::new(predicate));
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Initialize the population.
    fn initialize(&mut self) {
        self.population.clear();
        self.history = EvolutionHistory::default();
        self.generation = 0;
        self.best_fitness = f64::NEG_INFINITY;
        self.stagnation_count = 0;
        self.evaluations = 0;

        let size = self.config.population.size;
        let random = ((size as f64) * self.config.population.random_fraction).round() as usize;

        for i in 0..size {
            let genome = if i < random {
                G::random(&self.config.level, &self.config.operators, &mut self.rng)
            } else {
                G::empty(&self.config.level)
            };
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            self.population.push(Individual::new(id, genome, 0, Vec::new()));
        }
        debug!("Initialized {size} individuals ({random} random)");
    }

    /// Evaluate every individual without a cached fitness. Pending
    /// individuals are split into one batch per worker so each individual
    /// has one owner.
    fn evaluate_population(&mut self) -> Result<(), EvolutionError> {
        let start = Instant::now();
        let workers = self.pool.current_num_threads();
        let evaluator = &self.evaluator;
        let (mut pending, batch) = pending_batches(&mut self.population, workers);

        let computed: usize = self.pool.install(|| {
            pending
                .par_chunks_mut(batch)
                .map(|chunk| {
                    let mut computed = 0;
                    for individual in chunk.iter_mut() {
                        individual
                            .evaluate(evaluator)
                            .map_err(|source| EvolutionError::Fitness {
                                id: individual.id,
                                source,
                            })?;
                        computed += 1;
                    }
                    Ok(computed)
                })
                .sum::<Result<usize, EvolutionError>>()
        })?;

        self.last_evaluations = computed;
        self.evaluations += computed as u64;
        self.evaluation_seconds = start.elapsed().as_secs_f64();
        Ok(())
    }

    /// Update best fitness, stagnation and history from the evaluated
    /// population.
    fn record_generation(&mut self) {
        let n = self.population.len().max(1) as f64;
        let gen_best = self
            .population
            .iter()
            .map(Individual::fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        let avg = self.population.iter().map(Individual::fitness).sum::<f64>() / n;
        let variance = self
            .population
            .iter()
            .map(|i| (i.fitness() - avg).powi(2))
            .sum::<f64>()
            / n;

        if gen_best > self.best_fitness {
            self.best_fitness = gen_best;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        self.history.best_fitness.push(gen_best);
        self.history.avg_fitness.push(avg);
        self.history.fitness_std.push(variance.sqrt());

        info!(
            "Generation {}: best {:.4} (overall {:.4}), avg {:.4}, {} evaluated in {:.2}s",
            self.generation,
            gen_best,
            self.best_fitness,
            avg,
            self.last_evaluations,
            self.evaluation_seconds
        );
    }

    /// Replace the population with its successors.
    fn step_generation(&mut self) {
        let start = Instant::now();
        let next = generate_successors(
            &self.population,
            self.config.population.size,
            &self.config.operators,
            &self.next_id,
            self.generation + 1,
            &mut self.rng,
        );
        self.population = next;
        self.generation += 1;
        self.successor_seconds = start.elapsed().as_secs_f64();
        debug!(
            "Generated {} successors in {:.3}s",
            self.population.len(),
            self.successor_seconds
        );
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        let n = self.population.len().max(1) as f64;
        let best = self
            .population
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()));

        EvolutionProgress {
            generation: self.generation,
            max_generations: self.config.population.max_generations,
            evaluations_completed: self.last_evaluations,
            best_fitness: self.best_fitness,
            avg_fitness: self.population.iter().map(Individual::fitness).sum::<f64>() / n,
            generation_best: best.map_or(f64::NEG_INFINITY, Individual::fitness),
            stagnation_count: self.stagnation_count,
            best: best.map(Individual::snapshot),
            successor_seconds: self.successor_seconds,
            evaluation_seconds: self.evaluation_seconds,
            elapsed_seconds: self.started.elapsed().as_secs_f64(),
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self, progress: &EvolutionProgress) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        let population = &self.config.population;
        if let Some(max) = population.max_generations
            && self.generation >= max
        {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = population.target_fitness
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = population.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        if let Some(budget) = population.time_budget_secs
            && progress.elapsed_seconds >= budget
        {
            return Some(StopReason::TimeBudget);
        }

        if let Some(predicate) = &self.stop_predicate
            && predicate(progress)
        {
            return Some(StopReason::Predicate);
        }

        None
    }

    /// Run evolution, reporting progress after every evaluated generation.
    ///
    /// Returns the last fully evaluated population. Cancellation is checked
    /// between generations; a generation in flight always completes.
    pub fn run_with_callback<F>(
        &mut self,
        mut callback: F,
    ) -> Result<EvolutionResult<G>, EvolutionError>
    where
        F: FnMut(&EvolutionProgress),
    {
        self.started = Instant::now();

        self.initialize();
        self.evaluate_population()?;
        self.record_generation();

        let stop_reason = loop {
            let progress = self.progress();
            callback(&progress);

            if let Some(reason) = self.should_stop(&progress) {
                break reason;
            }

            self.step_generation();
            self.evaluate_population()?;
            self.record_generation();
        };

        let elapsed = self.started.elapsed().as_secs_f64();
        let n = self.population.len().max(1) as f64;
        let final_avg_fitness = self.population.iter().map(Individual::fitness).sum::<f64>() / n;

        info!(
            "Evolution stopped after {} generations ({:?}): best {:.4}",
            self.generation, stop_reason, self.best_fitness
        );

        Ok(EvolutionResult {
            population: std::mem::take(&mut self.population),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness,
                final_avg_fitness,
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> Result<EvolutionResult<G>, EvolutionError> {
        self.run_with_callback(|_| {})
    }
}

/// Individuals without a cached fitness, and the batch length that spreads
/// them evenly over `workers`.
fn pending_batches<G>(
    population: &mut [Individual<G>],
    workers: usize,
) -> (Vec<&mut Individual<G>>, usize) {
    let pending: Vec<&mut Individual<G>> = population
        .iter_mut()
        .filter(|i| !i.is_evaluated())
        .collect();
    let batch = pending.len().div_ceil(workers.max(1)).max(1);
    (pending, batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{ElementGenome, GridGenome, Measurements};
    use crate::schema::{ElementOperatorConfig, Level, PopulationConfig};
    use std::sync::atomic::AtomicUsize;

    const NAMES: [&str; 7] = [
        "meaningfulJumpVariance",
        "negativeSpace",
        "pathPercentage",
        "emptyPercentage",
        "linearity",
        "solvability",
        "meaningfulJumps",
    ];

    fn constant(value: f64) -> impl Fn(&Level) -> Measurements + Send + Sync + 'static {
        move |_: &Level| NAMES.iter().map(|n| (n.to_string(), value)).collect()
    }

    fn small_config(generations: Option<usize>) -> EvolutionConfig {
        EvolutionConfig {
            population: PopulationConfig {
                size: 4,
                max_generations: generations,
                ..Default::default()
            },
            workers: 2,
            random_seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_generation_with_constant_measure() {
        let mut engine =
            EvolutionEngine::<GridGenome, _>::new(small_config(Some(1)), constant(1.0)).unwrap();
        let result = engine.run().unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 1);
        assert_eq!(result.population.len(), 4);
        let best = result.best().unwrap().fitness();
        assert!((best - 3.7).abs() < 1e-9);
        assert_eq!(result.history.best_fitness.len(), 2);
    }

    #[test]
    fn test_fitness_computed_once_per_individual() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let measure = move |level: &Level| {
            counter.fetch_add(1, Ordering::Relaxed);
            constant(1.0)(level)
        };

        let mut engine =
            EvolutionEngine::<GridGenome, _>::new(small_config(Some(1)), measure).unwrap();
        let result = engine.run().unwrap();

        // One startup probe, four initial individuals, then three new
        // individuals next to one cached elite.
        assert_eq!(result.stats.total_evaluations, 7);
        assert_eq!(calls.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_pending_batches_skip_cached_elites() {
        let genome = GridGenome::empty(&Default::default());
        // Fresh children first, then a block of cached elites, then padding.
        let mut population: Vec<Individual<GridGenome>> = (0..50)
            .map(|id| {
                if (13..37).contains(&id) {
                    Individual::scored(id, genome.clone(), 1.0)
                } else {
                    Individual::new(id, genome.clone(), 1, Vec::new())
                }
            })
            .collect();

        let (mut pending, batch) = pending_batches(&mut population, 8);
        assert_eq!(pending.len(), 26);
        assert_eq!(batch, 4);
        assert!(pending.iter().all(|i| !i.is_evaluated()));

        let sizes: Vec<usize> = pending.chunks_mut(batch).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 4, 4, 4, 4, 4, 2]);
    }

    #[test]
    fn test_pending_batches_when_all_cached() {
        let genome = GridGenome::empty(&Default::default());
        let mut population = vec![Individual::scored(0, genome, 2.0)];
        let (pending, batch) = pending_batches(&mut population, 0);
        assert!(pending.is_empty());
        assert_eq!(batch, 1);
    }

    #[test]
    fn test_unbounded_run_stops_on_external_cancel() {
        let mut engine =
            EvolutionEngine::<GridGenome, _>::new(small_config(None), constant(1.0)).unwrap();
        let cancel = engine.cancel_handle();
        let interrupter = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            cancel.store(true, Ordering::Relaxed);
        });

        let result = engine.run().unwrap();
        interrupter.join().unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.population.len(), 4);
        assert_eq!(result.top(10).len(), 4);
    }

    #[test]
    fn test_evaluate_counts_single_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let measure = move |level: &Level| {
            counter.fetch_add(1, Ordering::Relaxed);
            constant(0.5)(level)
        };
        let evaluator = FitnessEvaluator::new(measure, Default::default());
        let genome = GridGenome::empty(&Default::default());
        let mut individual = Individual::new(0, genome, 0, Vec::new());

        let first = individual.evaluate(&evaluator).unwrap();
        let second = individual.evaluate(&evaluator).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cancellation() {
        let mut engine =
            EvolutionEngine::<GridGenome, _>::new(small_config(None), constant(1.0)).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
        assert!(result.population.iter().all(Individual::is_evaluated));
    }

    #[test]
    fn test_cancel_from_callback() {
        let mut engine =
            EvolutionEngine::<ElementGenome, _>::new(small_config(None), constant(1.0)).unwrap();
        let cancel = engine.cancel_handle();

        let result = engine
            .run_with_callback(|progress| {
                if progress.generation == 3 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 3);
    }

    #[test]
    fn test_stop_conditions() {
        let mut config = small_config(None);
        config.population.stagnation_limit = Some(2);
        let mut engine = EvolutionEngine::<GridGenome, _>::new(config, constant(1.0)).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
        assert_eq!(result.stats.generations, 2);

        let mut config = small_config(None);
        config.population.target_fitness = Some(3.0);
        let mut engine = EvolutionEngine::<GridGenome, _>::new(config, constant(1.0)).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);

        let mut engine = EvolutionEngine::<GridGenome, _>::new(small_config(None), constant(1.0))
            .unwrap()
            .with_stop_predicate(|progress| progress.generation >= 2);
        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Predicate);
        assert_eq!(result.stats.generations, 2);
    }

    #[test]
    fn test_missing_measurement_fails_at_startup() {
        let partial = |_: &Level| Measurements::from([("solvability".to_string(), 1.0)]);
        let result = EvolutionEngine::<GridGenome, _>::new(small_config(Some(1)), partial);
        assert!(matches!(
            result,
            Err(EvolutionError::Probe(FitnessError::MissingMeasurement(_)))
        ));
    }

    #[test]
    fn test_measure_failure_surfaces_individual() {
        let config = small_config(Some(1));
        let baseline = config.level.baseline_level();
        // Only the baseline level is measured successfully.
        let picky = move |level: &Level| {
            if *level == baseline {
                constant(1.0)(level)
            } else {
                Measurements::new()
            }
        };
        let mut engine = EvolutionEngine::<GridGenome, _>::new(config, picky).unwrap();
        assert!(matches!(
            engine.run(),
            Err(EvolutionError::Fitness {
                source: FitnessError::MissingMeasurement(_),
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(Some(1));
        config.population.size = 2;
        assert!(matches!(
            EvolutionEngine::<GridGenome, _>::new(config, constant(1.0)),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let mut config = small_config(Some(2));
            config.genome = crate::schema::GenomeKind::Elements;
            config.operators.elements = ElementOperatorConfig {
                element_count: (20, 40),
                ..Default::default()
            };
            let mut engine =
                EvolutionEngine::<ElementGenome, _>::new(config, constant(1.0)).unwrap();
            let result = engine.run().unwrap();
            result
                .population
                .iter()
                .map(|i| i.genome.elements().to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_ranked_and_top() {
        let mut engine =
            EvolutionEngine::<GridGenome, _>::new(small_config(Some(2)), constant(1.0)).unwrap();
        let result = engine.run().unwrap();
        let ranked = result.ranked();
        assert!(ranked.windows(2).all(|w| w[0].fitness() >= w[1].fitness()));

        let top = result.top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(Level::from_text(&top[0].level).unwrap().width(), 200);
    }
}
