use super::RoundMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Red,
    Blue,
    /// Every node decided, but not on the same color.
    Split,
    Undecided,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Red => write!(f, "RED"),
            Outcome::Blue => write!(f, "BLUE"),
            Outcome::Split => write!(f, "split"),
            Outcome::Undecided => write!(f, "undecided"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub rounds: u64,
    pub consensus: bool,
    pub outcome: Outcome,
    pub final_red: u32,
    pub final_blue: u32,
    pub final_uncolored: u32,
    pub peak_failed: u32,
    pub total_switches: u64,
}

pub fn analyze(history: &[RoundMetrics], seed: u64) -> RunReport {
    let last = history.last().copied().unwrap_or_default();
    let consensus = last.total() > 0 && last.decided() == last.total();

    let outcome = if !consensus {
        Outcome::Undecided
    } else if last.decided_red == last.total() {
        Outcome::Red
    } else if last.decided_blue == last.total() {
        Outcome::Blue
    } else {
        Outcome::Split
    };

    RunReport {
        seed,
        rounds: last.round,
        consensus,
        outcome,
        final_red: last.red,
        final_blue: last.blue,
        final_uncolored: last.uncolored,
        peak_failed: history.iter().map(|m| m.failed).max().unwrap_or(0),
        total_switches: history.iter().map(|m| m.switched as u64).sum(),
    }
}

/// Aggregate over many seeds of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub label: String,
    pub runs: usize,
    pub consensus_runs: usize,
    pub consensus_rate: f64,
    /// Mean over runs that reached consensus.
    pub mean_rounds: Option<f64>,
    pub max_rounds: u64,
    pub red_wins: usize,
    pub blue_wins: usize,
    pub splits: usize,
}

pub fn summarize(label: impl Into<String>, reports: &[RunReport]) -> BatchSummary {
    let runs = reports.len();
    let finished: Vec<&RunReport> = reports.iter().filter(|r| r.consensus).collect();
    let count = |outcome: Outcome| reports.iter().filter(|r| r.outcome == outcome).count();

    let mean_rounds = if finished.is_empty() {
        None
    } else {
        Some(finished.iter().map(|r| r.rounds as f64).sum::<f64>() / finished.len() as f64)
    };

    BatchSummary {
        label: label.into(),
        runs,
        consensus_runs: finished.len(),
        consensus_rate: if runs > 0 { finished.len() as f64 / runs as f64 } else { 0.0 },
        mean_rounds,
        max_rounds: reports.iter().map(|r| r.rounds).max().unwrap_or(0),
        red_wins: count(Outcome::Red),
        blue_wins: count(Outcome::Blue),
        splits: count(Outcome::Split),
    }
}

// TODO: width of the label column is fixed, long sweep labels get cut
pub fn comparison_table(summaries: &[BatchSummary]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                            BATCH COMPARISON                               ║");
    println!("╠═══════════════╦═══════╦═══════════╦════════════╦═══════╦═══════╦═════════╣");
    println!("║ Config        ║ Runs  ║ Consensus ║ Avg rounds ║ RED   ║ BLUE  ║ Split   ║");
    println!("╠═══════════════╬═══════╬═══════════╬════════════╬═══════╬═══════╬═════════╣");

    for s in summaries {
        let label: String = s.label.chars().take(13).collect();
        let mean = s
            .mean_rounds
            .map(|m| format!("{:>10.1}", m))
            .unwrap_or_else(|| format!("{:>10}", "-"));
        println!(
            "║ {:<13} ║ {:>5} ║ {:>8.1}% ║ {} ║ {:>5} ║ {:>5} ║ {:>7} ║",
            label,
            s.runs,
            s.consensus_rate * 100.0,
            mean,
            s.red_wins,
            s.blue_wins,
            s.splits,
        );
    }

    println!("╚═══════════════╩═══════╩═══════════╩════════════╩═══════╩═══════╩═════════╝\n");

    if let Some(fastest) = summaries
        .iter()
        .filter(|s| s.mean_rounds.is_some())
        .min_by(|a, b| a.mean_rounds.partial_cmp(&b.mean_rounds).unwrap_or(std::cmp::Ordering::Equal))
    {
        println!(
            "Fastest convergence: {} ({:.1} rounds)",
            fastest.label,
            fastest.mean_rounds.unwrap_or_default()
        );
    }

    if let Some(most_reliable) = summaries
        .iter()
        .max_by(|a, b| a.consensus_rate.partial_cmp(&b.consensus_rate).unwrap_or(std::cmp::Ordering::Equal))
    {
        println!(
            "Most reliable: {} ({:.1}% consensus)",
            most_reliable.label,
            most_reliable.consensus_rate * 100.0
        );
    }

    println!();
}
