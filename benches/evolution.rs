//! Benchmarks for level genomes and the search driver.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use level_evolution::{
    compute::{
        TileCensus,
        evolution::{ElementGenome, EvolutionEngine, GenomeRng, GridGenome, LevelGenome},
    },
    schema::{EvolutionConfig, LevelConfig, OperatorConfig, PopulationConfig},
};

fn bench_operators<G: LevelGenome>(c: &mut Criterion, name: &str) {
    let mut group = c.benchmark_group(name);
    let level = LevelConfig::default();
    let ops = OperatorConfig::default();
    let mut rng = GenomeRng::new(42);
    let a = G::random(&level, &ops, &mut rng);
    let b = G::random(&level, &ops, &mut rng);

    group.bench_function("random", |bench| {
        bench.iter(|| G::random(black_box(&level), &ops, &mut rng));
    });
    group.bench_function("mutate", |bench| {
        bench.iter(|| black_box(&a).mutate(&ops, &mut rng));
    });
    group.bench_function("generate_children", |bench| {
        bench.iter(|| black_box(&a).generate_children(&b, &ops, &mut rng));
    });
    group.bench_function("to_level", |bench| {
        bench.iter(|| black_box(a.clone()).to_level().width());
    });

    group.finish();
}

fn bench_grid_operators(c: &mut Criterion) {
    bench_operators::<GridGenome>(c, "grid_genome");
}

fn bench_element_operators(c: &mut Criterion) {
    bench_operators::<ElementGenome>(c, "element_genome");
}

fn bench_generations(c: &mut Criterion) {
    let mut group = c.benchmark_group("generations");
    group.sample_size(10);

    for size in [16, 64] {
        let config = EvolutionConfig {
            population: PopulationConfig {
                size,
                max_generations: Some(5),
                ..Default::default()
            },
            random_seed: Some(7),
            ..Default::default()
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("population_{}", size)),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut engine =
                        EvolutionEngine::<GridGenome, _>::new(config.clone(), TileCensus)
                            .unwrap();
                    black_box(engine.run().unwrap().stats.best_fitness)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_grid_operators,
    bench_element_operators,
    bench_generations
);
criterion_main!(benches);
