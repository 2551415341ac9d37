use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

pub const NODE_COUNT_RANGE: RangeInclusive<usize> = 10..=250;
pub const PROB_START_WITH_COLOR_RANGE: RangeInclusive<f64> = 0.1..=1.0;
pub const PROB_STARTS_WITH_RED_RANGE: RangeInclusive<f64> = 0.1..=1.0;
pub const MAJORITY_THRESHOLD_RANGE: RangeInclusive<f64> = 0.1..=1.0;
pub const CONFIDENCE_THRESHOLD_RANGE: RangeInclusive<u32> = 2..=20;
pub const FAILURE_PROBABILITY_RANGE: RangeInclusive<f64> = 0.0..=0.5;
pub const RECOVERY_PROBABILITY_RANGE: RangeInclusive<f64> = 0.2..=1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub node_count: usize,
    /// Probability that a node starts with a color at all.
    pub prob_start_with_color: f64,
    /// Given a color, probability it is RED over BLUE.
    pub prob_starts_with_red: f64,
    pub majority_threshold: f64,
    /// Consecutive majority rounds before a node accepts its color.
    pub confidence_threshold: u32,
    /// Peers each node samples per round. Integer, 1..node_count.
    pub sample_count: usize,
    pub failure_probability: f64,
    pub recovery_probability: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 100,
            prob_start_with_color: 0.2,
            prob_starts_with_red: 0.5,
            majority_threshold: 0.5,
            confidence_threshold: 5,
            sample_count: 5,
            failure_probability: 0.0,
            recovery_probability: 0.6,
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<()> {
        check("node_count", self.node_count, NODE_COUNT_RANGE)?;
        check("prob_start_with_color", self.prob_start_with_color, PROB_START_WITH_COLOR_RANGE)?;
        check("prob_starts_with_red", self.prob_starts_with_red, PROB_STARTS_WITH_RED_RANGE)?;
        check("majority_threshold", self.majority_threshold, MAJORITY_THRESHOLD_RANGE)?;
        check("confidence_threshold", self.confidence_threshold, CONFIDENCE_THRESHOLD_RANGE)?;

        // upper bound depends on the population
        if self.sample_count < 1 || self.sample_count >= self.node_count {
            return Err(SimError::invalid(
                "sample_count",
                format!(
                    "{} outside [1, {}]",
                    self.sample_count,
                    self.node_count.saturating_sub(1)
                ),
            ));
        }

        check("failure_probability", self.failure_probability, FAILURE_PROBABILITY_RANGE)?;
        check("recovery_probability", self.recovery_probability, RECOVERY_PROBABILITY_RANGE)?;
        Ok(())
    }

    /// Samples a color must strictly exceed to count as a round's majority.
    pub fn majority_quota(&self) -> u32 {
        (self.sample_count as f64 * self.majority_threshold).ceil() as u32
    }

    pub fn with_node_count(mut self, node_count: usize) -> Self {
        self.node_count = node_count;
        self
    }

    pub fn with_initial_colors(mut self, prob_start_with_color: f64, prob_starts_with_red: f64) -> Self {
        self.prob_start_with_color = prob_start_with_color;
        self.prob_starts_with_red = prob_starts_with_red;
        self
    }

    pub fn with_thresholds(mut self, majority: f64, confidence: u32) -> Self {
        self.majority_threshold = majority;
        self.confidence_threshold = confidence;
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_churn(mut self, failure: f64, recovery: f64) -> Self {
        self.failure_probability = failure;
        self.recovery_probability = recovery;
        self
    }
}

// NaN fails `contains`, so it is rejected too
fn check<T>(field: &'static str, value: T, range: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SimError::invalid(
            field,
            format!("{} outside [{}, {}]", value, range.start(), range.end()),
        ))
    }
}
