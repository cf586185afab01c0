//! Parent selection and successor generation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::schema::OperatorConfig;

use super::genome::{GenomeRng, LevelGenome};
use super::search::Individual;

/// Shuffle the population into consecutive pairs and keep the fitter member
/// of each pair. An odd trailing individual is dropped, so the result has
/// `population.len() / 2` entries.
pub fn tournament_selection<'a, G>(
    population: &'a [Individual<G>],
    rng: &mut GenomeRng,
) -> Vec<&'a Individual<G>> {
    let mut order: Vec<&Individual<G>> = population.iter().collect();
    rng.shuffle(&mut order);

    order
        .chunks_exact(2)
        .map(|pair| {
            if pair[1].fitness() > pair[0].fitness() {
                pair[1]
            } else {
                pair[0]
            }
        })
        .collect()
}

/// The fittest `population.len() / 2` individuals, best first.
pub fn elitism_selection<G>(population: &[Individual<G>]) -> Vec<&Individual<G>> {
    let mut ranked: Vec<&Individual<G>> = population.iter().collect();
    ranked.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
    ranked.truncate(population.len() / 2);
    ranked
}

/// Build the next generation.
///
/// Adjacent tournament winners are recombined in both orders, keeping the
/// first child of each call. Every elite except the weakest survives
/// unchanged with its cached fitness. The result is then truncated or padded
/// to `target_size`; padding recombines random pairs of winners.
pub fn generate_successors<G: LevelGenome>(
    population: &[Individual<G>],
    target_size: usize,
    ops: &OperatorConfig,
    ids: &AtomicU64,
    generation: usize,
    rng: &mut GenomeRng,
) -> Vec<Individual<G>> {
    let mut next = Vec::with_capacity(target_size.max(population.len()));

    let winners = tournament_selection(population, rng);
    let offspring = |a: &Individual<G>, b: &Individual<G>, rng: &mut GenomeRng| {
        let (child, _) = a.genome.generate_children(&b.genome, ops, rng);
        let id = ids.fetch_add(1, Ordering::Relaxed);
        Individual::new(id, child, generation, vec![a.id, b.id])
    };

    for pair in winners.chunks_exact(2) {
        let (a, b) = (pair[0], pair[1]);
        next.push(offspring(a, b, rng));
        next.push(offspring(b, a, rng));
    }

    let elites = elitism_selection(population);
    let survivors = elites.len().saturating_sub(1);
    next.extend(elites.into_iter().take(survivors).cloned());

    while next.len() < target_size {
        let (Some(&a), Some(&b)) = (rng.choose(&winners), rng.choose(&winners)) else {
            break;
        };
        next.push(offspring(a, b, rng));
    }
    next.truncate(target_size);
    next
}
