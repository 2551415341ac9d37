// Copyright 2025 The snowball-sim Authors

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use snowball_sim::prelude::*;
use snowball_sim::metrics::analyzer;
use snowball_sim::simulation::run_batch;

use clap::{Args, Parser, Subcommand};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(author, version, about = "Snowball consensus simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

/// Overrides on top of the defaults or a `--config` file.
#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// JSON file with a full or partial config
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short = 'n', long)]
    nodes: Option<usize>,
    #[arg(long)]
    prob_color: Option<f64>,
    #[arg(long)]
    prob_red: Option<f64>,
    #[arg(short, long)]
    majority: Option<f64>,
    #[arg(short = 'k', long)]
    confidence: Option<u32>,
    #[arg(short, long)]
    samples: Option<usize>,
    #[arg(long)]
    failure: Option<f64>,
    #[arg(long)]
    recovery: Option<f64>,
}

impl ParamArgs {
    fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(v) = self.nodes { config.node_count = v; }
        if let Some(v) = self.prob_color { config.prob_start_with_color = v; }
        if let Some(v) = self.prob_red { config.prob_starts_with_red = v; }
        if let Some(v) = self.majority { config.majority_threshold = v; }
        if let Some(v) = self.confidence { config.confidence_threshold = v; }
        if let Some(v) = self.samples { config.sample_count = v; }
        if let Some(v) = self.failure { config.failure_probability = v; }
        if let Some(v) = self.recovery { config.recovery_probability = v; }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[command(flatten)]
        params: ParamArgs,
        /// Random if omitted, logged for replay
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 500)]
        tick_ms: u64,
        #[arg(long, default_value_t = 1000)]
        max_rounds: u64,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
        #[arg(long)]
        no_save: bool,
    },

    Batch {
        #[command(flatten)]
        params: ParamArgs,
        #[arg(short, long, default_value_t = 32)]
        runs: u64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 1000)]
        max_rounds: u64,
        /// Comma separated sample counts to sweep, e.g. 3,5,8
        #[arg(long)]
        sweep_samples: Option<String>,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    Inspect {
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 0)]
        rounds: u64,
        /// Print a single node instead of the whole population
        #[arg(long)]
        node: Option<usize>,
    },

    Defaults,
}

#[tokio::main]
async fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { params, seed, tick_ms, max_rounds, output, no_save } => {
            let config = params.resolve()?;
            let seed = seed.unwrap_or_else(rand::random);
            run_single_simulation(config, seed, tick_ms, max_rounds, (!no_save).then_some(output)).await?;
        }

        Commands::Batch { params, runs, seed, max_rounds, sweep_samples, output } => {
            let config = params.resolve()?;
            batch(config, runs, seed, max_rounds, sweep_samples.as_deref(), &output)?;
        }

        Commands::Inspect { params, seed, rounds, node } => {
            inspect(params.resolve()?, seed, rounds, node)?;
        }

        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&SimConfig::default())?);
        }
    }

    let total_time = program_start.elapsed();
    info!("Total runtime: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

async fn run_single_simulation(
    config: SimConfig,
    seed: u64,
    tick_ms: u64,
    max_rounds: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    info!("Snowball: Single Run (seed {})", seed);

    let options = RunOptions {
        seed,
        tick: Duration::from_millis(tick_ms),
        max_rounds,
        progress: true,
    };
    let mut sim = Simulation::new(config, options)?;

    // ctrl-c stops the loop between rounds
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current round");
            on_signal.cancel();
        }
    });

    let report = sim.run(cancel).await?;

    if let Some(dir) = output {
        sim.save_results(&report, &dir)?;
    }

    info!("Rounds: {}", report.rounds);
    info!("Outcome: {}", report.outcome);
    info!(
        "Final: RED {} | BLUE {} | uncolored {}",
        report.final_red, report.final_blue, report.final_uncolored
    );

    Ok(())
}

fn batch(
    config: SimConfig,
    runs: u64,
    seed: u64,
    max_rounds: u64,
    sweep_samples: Option<&str>,
    output: &Path,
) -> Result<()> {
    let configs = match sweep_samples {
        Some(list) => parse_sweep(list)?
            .into_iter()
            .map(|k| (format!("k={}", k), config.clone().with_sample_count(k)))
            .collect::<Vec<_>>(),
        None => vec![(format!("k={}", config.sample_count), config)],
    };

    info!("Snowball: Batch");
    info!("Runs per config: {}, first seed: {}", runs, seed);

    let mut summaries = Vec::new();
    for (label, config) in configs {
        let started = Instant::now();
        let (summary, _) = run_batch(label.clone(), &config, seed, runs, max_rounds)?;
        info!("  {} done in {:.2}s", label, started.elapsed().as_secs_f64());
        summaries.push(summary);
    }

    analyzer::comparison_table(&summaries);

    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = output.join(format!("batch_{}.json", timestamp));
    std::fs::write(&path, serde_json::to_string_pretty(&summaries)?)?;
    info!("Batch summary saved to: {}", path.display());

    Ok(())
}

fn parse_sweep(list: &str) -> Result<Vec<usize>> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| anyhow::anyhow!("bad sample count '{}': {}", s, e)))
        .collect()
}

fn inspect(config: SimConfig, seed: u64, rounds: u64, node: Option<usize>) -> Result<()> {
    let mut engine = SimulationEngine::new(config, seed)?;
    while !engine.is_halted() && engine.round() < rounds {
        engine.step()?;
    }

    println!("Round {} ({:?})", engine.round(), engine.state());
    match node {
        Some(id) => {
            let state = engine
                .population()
                .node(id)
                .ok_or_else(|| anyhow::anyhow!("No node with id {}", id))?;
            println!("{}", state);
        }
        None => {
            for state in engine.population().nodes() {
                println!("{}", state);
            }
        }
    }

    Ok(())
}
