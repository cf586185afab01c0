//! Level Evolution CLI - Evolve platformer levels from JSON configuration.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use level_evolution::{
    compute::{
        TileCensus,
        evolution::{ElementGenome, EvolutionEngine, GridGenome, LevelArchive, LevelGenome},
    },
    schema::{EvolutionConfig, GenomeKind, RunSummary},
};

/// Levels written at the end of a run.
const FINAL_LEVELS: usize = 10;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations] [output_dir]", args[0]);
        eprintln!();
        eprintln!("Evolve platformer levels from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to evolution configuration file");
        eprintln!("  generations  Generation limit (overrides the configuration)");
        eprintln!("  output_dir   Directory for level files (default: levels)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let generations: Option<usize> = args.get(2).and_then(|s| s.parse().ok());
    let output_dir = args.get(3).map_or_else(|| PathBuf::from("levels"), PathBuf::from);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: EvolutionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if generations.is_some() {
        config.population.max_generations = generations;
    }

    let archive = LevelArchive::new(&output_dir).unwrap_or_else(|e| {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    });

    println!("Level Evolution");
    println!("===============");
    println!("Level: {}x{}", config.level.width, config.level.height);
    println!("Genome: {:?}", config.genome);
    println!("Population: {}", config.population.size);
    println!("Output: {}", output_dir.display());
    println!("Press Ctrl-C to stop and save the best levels.");
    println!();

    let outcome = match config.genome {
        GenomeKind::Grid => evolve::<GridGenome>(config, &archive),
        GenomeKind::Elements => evolve::<ElementGenome>(config, &archive),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn evolve<G: LevelGenome>(
    config: EvolutionConfig,
    archive: &LevelArchive,
) -> Result<(), Box<dyn Error>> {
    let mut engine = EvolutionEngine::<G, _>::new(config.clone(), TileCensus)?;

    // Ctrl-C finishes the current generation, then the final levels are saved.
    let cancel = engine.cancel_handle();
    ctrlc::set_handler(move || {
        if !cancel.swap(true, Ordering::Relaxed) {
            eprintln!("Interrupted, finishing the current generation...");
        }
    })?;

    let result = engine.run_with_callback(|progress| {
        println!(
            "  Generation {}: best={:.4}, avg={:.4}, {} evaluated in {:.2}s",
            progress.generation,
            progress.best_fitness,
            progress.avg_fitness,
            progress.evaluations_completed,
            progress.evaluation_seconds
        );
        if let Some(best) = &progress.best
            && let Err(e) = archive.save_latest(best.level.as_str())
        {
            log::warn!("Failed to save latest level: {e}");
        }
    })?;

    let label = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string();
    let levels = result.ranked().into_iter().map(|i| i.genome.to_level());
    let paths = archive.save_ranked(&label, levels, FINAL_LEVELS)?;

    let summary = RunSummary {
        config,
        stats: result.stats.clone(),
        history: result.history.clone(),
        top: result.top(FINAL_LEVELS),
    };
    let summary_path = archive.save_summary(&label, &summary)?;

    let stats = &result.stats;
    println!();
    println!("Stopped: {:?}", stats.stop_reason);
    println!("Generations: {}", stats.generations);
    println!("Best fitness: {:.4}", stats.best_fitness);
    println!("Final average: {:.4}", stats.final_avg_fitness);
    println!(
        "Time: {:.2}s ({:.1} evaluations/s)",
        stats.elapsed_seconds, stats.evaluations_per_second
    );
    println!("Saved {} levels and {}", paths.len(), summary_path.display());
    Ok(())
}

fn print_example_config() {
    let config = EvolutionConfig {
        population: level_evolution::schema::PopulationConfig {
            size: 40,
            max_generations: Some(50),
            stagnation_limit: Some(15),
            ..Default::default()
        },
        random_seed: Some(42),
        ..Default::default()
    };

    let json = serde_json::to_string_pretty(&config).unwrap_or_else(|e| {
        eprintln!("Error serializing example config: {}", e);
        std::process::exit(1);
    });
    println!("{}", json);
}
