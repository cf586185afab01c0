//! Fitness evaluation for level genomes.
//!
//! A genome is rendered to a dense level, handed to an external [`Measure`]
//! and scored as a weighted sum of the named measurements it reports, minus
//! any structural penalty the representation defines.

use std::collections::HashMap;

use crate::schema::{FitnessConfig, Level, WeightedMeasurement};

use super::genome::LevelGenome;

/// Named measurements reported for one level.
pub type Measurements = HashMap<String, f64>;

/// External level analysis. Must be deterministic and free of side effects.
pub trait Measure: Send + Sync {
    fn measure(&self, level: &Level) -> Measurements;
}

impl<F> Measure for F
where
    F: Fn(&Level) -> Measurements + Send + Sync,
{
    fn measure(&self, level: &Level) -> Measurements {
        self(level)
    }
}

/// Contract violations between the evaluator and its measure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitnessError {
    #[error("Measurement '{0}' is missing from the measure output")]
    MissingMeasurement(String),
    #[error("Measurement '{name}' is not finite ({value})")]
    NonFiniteMeasurement { name: String, value: f64 },
}

/// Scores genomes against a coefficient table.
pub struct FitnessEvaluator<M> {
    measure: M,
    config: FitnessConfig,
}

impl<M: Measure> FitnessEvaluator<M> {
    /// Create a new fitness evaluator.
    pub fn new(measure: M, config: FitnessConfig) -> Self {
        Self { measure, config }
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Measurement names the table for `G` consumes.
    pub fn required_measurements<G: LevelGenome>(&self) -> Vec<&str> {
        G::coefficients(&self.config)
            .iter()
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Run the measure once on `level` and check it reports every required
    /// measurement.
    pub fn probe<G: LevelGenome>(&self, level: &Level) -> Result<(), FitnessError> {
        let measurements = self.measure.measure(level);
        weighted_sum(G::coefficients(&self.config), &measurements).map(|_| ())
    }

    /// Render, measure and score `genome`.
    pub fn score<G: LevelGenome>(&self, genome: &G) -> Result<f64, FitnessError> {
        let measurements = self.measure.measure(genome.to_level());
        let sum = weighted_sum(G::coefficients(&self.config), &measurements)?;
        Ok(sum - genome.penalty(&self.config))
    }
}

fn weighted_sum(
    coefficients: &[WeightedMeasurement],
    measurements: &Measurements,
) -> Result<f64, FitnessError> {
    let mut total = 0.0;
    for coefficient in coefficients {
        let value = *measurements
            .get(&coefficient.name)
            .ok_or_else(|| FitnessError::MissingMeasurement(coefficient.name.clone()))?;
        if !value.is_finite() {
            return Err(FitnessError::NonFiniteMeasurement {
                name: coefficient.name.clone(),
                value,
            });
        }
        total += coefficient.weight * value;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{ElementGenome, GridGenome};
    use crate::schema::{DesignElement, LevelConfig, StairDirection};

    fn constant(value: f64) -> impl Fn(&Level) -> Measurements + Send + Sync {
        move |_: &Level| {
            [
                "meaningfulJumpVariance",
                "negativeSpace",
                "pathPercentage",
                "emptyPercentage",
                "linearity",
                "solvability",
                "meaningfulJumps",
            ]
            .iter()
            .map(|name| (name.to_string(), value))
            .collect()
        }
    }

    #[test]
    fn test_weighted_sum_of_constants() {
        let evaluator = FitnessEvaluator::new(constant(1.0), FitnessConfig::default());
        let genome = GridGenome::empty(&LevelConfig::default());
        let score = evaluator.score(&genome).unwrap();
        // 0.5 + 0.6 + 0.5 + 0.6 - 0.5 + 2.0
        assert!((score - 3.7).abs() < 1e-9);
    }

    #[test]
    fn test_stairs_penalty_subtracted() {
        let evaluator = FitnessEvaluator::new(constant(0.0), FitnessConfig::default());
        let stairs = (0..12)
            .map(|i| DesignElement::Stairs {
                x: 5 + i * 10,
                height: 3,
                direction: StairDirection::Descending,
            })
            .collect();
        let genome = ElementGenome::new(stairs, LevelConfig::default());
        assert_eq!(evaluator.score(&genome).unwrap(), -2.0);
    }

    #[test]
    fn test_missing_measurement_fails() {
        let partial = |_: &Level| Measurements::from([("solvability".to_string(), 1.0)]);
        let evaluator = FitnessEvaluator::new(partial, FitnessConfig::default());
        let genome = GridGenome::empty(&LevelConfig::default());

        assert_eq!(
            evaluator.score(&genome),
            Err(FitnessError::MissingMeasurement(
                "meaningfulJumpVariance".to_string()
            ))
        );
        assert!(
            evaluator
                .probe::<GridGenome>(genome.to_level())
                .is_err()
        );
    }

    #[test]
    fn test_non_finite_measurement_fails() {
        let evaluator = FitnessEvaluator::new(constant(f64::NAN), FitnessConfig::default());
        let genome = GridGenome::empty(&LevelConfig::default());
        assert!(matches!(
            evaluator.score(&genome),
            Err(FitnessError::NonFiniteMeasurement { .. })
        ));
    }

    #[test]
    fn test_required_measurements_per_representation() {
        let evaluator = FitnessEvaluator::new(constant(0.0), FitnessConfig::default());
        assert_eq!(evaluator.required_measurements::<GridGenome>().len(), 6);
        assert!(
            evaluator
                .required_measurements::<ElementGenome>()
                .contains(&"meaningfulJumps")
        );
    }
}
