use crate::node::NodeState;
use crate::simulation::SimConfig;
use rand::{Rng, RngCore};
use std::fmt;

pub trait FailureModel: Send + Sync + fmt::Debug {
    /// Rolls churn for one undecided node before voting. Returns true when the node
    /// takes part in this round.
    fn roll(&self, node: &mut NodeState, config: &SimConfig, rng: &mut dyn RngCore) -> bool;
    fn name(&self) -> &str;
}

/// Per-round Bernoulli failure and recovery using the config's probabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChurnModel;

impl FailureModel for ChurnModel {
    fn roll(&self, node: &mut NodeState, config: &SimConfig, rng: &mut dyn RngCore) -> bool {
        if node.failed {
            // a recovered node votes in the same round
            if rng.gen_bool(config.recovery_probability) {
                node.failed = false;
                true
            } else {
                false
            }
        } else if rng.gen_bool(config.failure_probability) {
            node.failed = true;
            false
        } else {
            true
        }
    }

    fn name(&self) -> &str {
        "churn"
    }
}
