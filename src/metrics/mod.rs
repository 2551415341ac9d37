pub mod logger;
pub mod analyzer;

use crate::node::Opinion;
use crate::simulation::{Population, RoundStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use parking_lot::RwLock;

/// Population counts after a round's barrier. Round 0 is the freshly created population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMetrics {
    pub round: u64,
    pub red: u32,
    pub blue: u32,
    pub uncolored: u32,
    pub failed: u32,
    pub decided_red: u32,
    pub decided_blue: u32,
    pub queried: u32,
    pub colored: u32,
    pub switched: u32,
}

impl RoundMetrics {
    pub fn from_population(round: u64, population: &Population, stats: &RoundStats) -> Self {
        let mut metrics = Self {
            round,
            queried: stats.queried,
            colored: stats.colored,
            switched: stats.switched,
            ..Self::default()
        };

        for node in population.nodes() {
            match node.opinion {
                Opinion::Red => metrics.red += 1,
                Opinion::Blue => metrics.blue += 1,
                Opinion::None => metrics.uncolored += 1,
            }
            if node.failed {
                metrics.failed += 1;
            }
            if node.decided {
                match node.opinion {
                    Opinion::Red => metrics.decided_red += 1,
                    Opinion::Blue => metrics.decided_blue += 1,
                    Opinion::None => {}
                }
            }
        }

        metrics
    }

    pub fn initial(population: &Population) -> Self {
        Self::from_population(0, population, &RoundStats::default())
    }

    pub fn total(&self) -> u32 {
        self.red + self.blue + self.uncolored
    }

    pub fn decided(&self) -> u32 {
        self.decided_red + self.decided_blue
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<RwLock<Vec<RoundMetrics>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, metrics: RoundMetrics) {
        self.inner.write().push(metrics);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn get_snapshots(&self) -> Vec<RoundMetrics> {
        self.inner.read().clone()
    }
}
