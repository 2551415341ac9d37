pub mod config;
pub mod engine;

pub use config::SimConfig;
pub use engine::{
    advance_round, advance_round_with, create_population, EngineState, HaltReason, Population,
    RoundOutcome, RoundReport, RoundStats, SimulationEngine,
};

use crate::metrics::analyzer::{self, BatchSummary, RunReport};
use crate::metrics::logger::MetricsLogger;
use crate::metrics::{MetricsCollector, RoundMetrics};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub seed: u64,
    /// Delay between rounds. The driving loop is the only source of progress.
    pub tick: Duration,
    pub max_rounds: u64,
    pub progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            tick: Duration::from_millis(500),
            max_rounds: 1_000,
            progress: true,
        }
    }
}

pub struct Simulation {
    engine: SimulationEngine,
    options: RunOptions,
    pub metrics: MetricsCollector,
}

impl Simulation {
    pub fn new(config: SimConfig, options: RunOptions) -> Result<Self> {
        let engine = SimulationEngine::new(config, options.seed)?;
        let metrics = MetricsCollector::new();
        metrics.record(RoundMetrics::initial(engine.population()));
        Ok(Self {
            engine,
            options,
            metrics,
        })
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Advances one round per tick until consensus, cancellation or the round limit.
    /// Cancellation is only observed between rounds.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunReport> {
        let config = self.engine.config().clone();
        info!("Starting simulation with seed {}", self.options.seed);
        info!(
            "Nodes: {}, Samples: {}, Majority: {}, Confidence: {}",
            config.node_count, config.sample_count, config.majority_threshold, config.confidence_threshold
        );
        info!(
            "Failure: {}, Recovery: {}",
            config.failure_probability, config.recovery_probability
        );

        let pb = if self.options.progress {
            let pb = ProgressBar::new(self.options.max_rounds);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.red/blue} {pos}/{len} rounds {msg}")?
                    .progress_chars("█▓░"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut tick = interval(self.options.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.engine.is_halted() {
            if self.engine.round() >= self.options.max_rounds {
                warn!("No consensus after {} rounds, stopping", self.engine.round());
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.engine.cancel();
                    break;
                }
                _ = tick.tick() => {}
            }

            let report = match self.engine.step() {
                Ok(report) => report,
                Err(e) => {
                    pb.abandon_with_message("Simulation halted on error");
                    return Err(e.into());
                }
            };

            let metrics = RoundMetrics::from_population(report.round, self.engine.population(), &report.stats);
            self.metrics.record(metrics);
            pb.inc(1);
            pb.set_message(format!(
                "R {} | B {} | none {} | decided {} | failed {}",
                metrics.red,
                metrics.blue,
                metrics.uncolored,
                metrics.decided(),
                metrics.failed
            ));
        }

        pb.finish_with_message("Simulation complete");

        let report = analyzer::analyze(&self.metrics.get_snapshots(), self.options.seed);
        info!(
            "Finished after {} rounds: consensus {}, outcome {}",
            report.rounds, report.consensus, report.outcome
        );
        Ok(report)
    }

    /// Writes the round history as CSV and the report as JSON into `dir`.
    pub fn save_results(&self, report: &RunReport, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let history = self.metrics.get_snapshots();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let name = format!("snowball_seed{}_{}", self.options.seed, timestamp);

        std::fs::create_dir_all(dir)?;

        let csv_path = dir.join(format!("{}.csv", name));
        let mut logger = MetricsLogger::new(&csv_path)?;
        logger.log_batch(&history)?;
        info!("Rounds saved to: {}", csv_path.display());

        let json_path = dir.join(format!("{}_report.json", name));
        std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
        info!("Report saved to: {}", json_path.display());

        Ok(())
    }
}

/// Runs one seed to completion without a timer. Round history is kept only for the report.
pub fn run_headless(config: &SimConfig, seed: u64, max_rounds: u64) -> Result<RunReport> {
    let mut engine = SimulationEngine::new(config.clone(), seed)?;
    let mut history = vec![RoundMetrics::initial(engine.population())];

    while !engine.is_halted() && engine.round() < max_rounds {
        let report = engine.step()?;
        history.push(RoundMetrics::from_population(report.round, engine.population(), &report.stats));
    }

    Ok(analyzer::analyze(&history, seed))
}

/// Runs `runs` consecutive seeds starting at `first_seed` in parallel, wrapping past
/// `u64::MAX`. Each engine is single-threaded and owns its own rng, so runs share nothing.
pub fn run_batch(
    label: impl Into<String>,
    config: &SimConfig,
    first_seed: u64,
    runs: u64,
    max_rounds: u64,
) -> Result<(BatchSummary, Vec<RunReport>)> {
    config.validate()?;

    let reports = (0..runs)
        .into_par_iter()
        .map(|i| run_headless(config, first_seed.wrapping_add(i), max_rounds))
        .collect::<Result<Vec<_>>>()?;

    Ok((analyzer::summarize(label, &reports), reports))
}
