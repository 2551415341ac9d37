use crate::node::{ColorCounts, NodeState, Opinion};
use crate::simulation::SimConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateEffect {
    pub majority: bool,
    pub switch_to: Option<Opinion>,
    pub decided_now: bool,
}

/// Confidence, streak and acceptance bookkeeping for one node after its tally.
#[derive(Debug, Clone, Copy)]
pub struct NodeUpdatePolicy {
    quota: u32,
    confidence_threshold: u32,
}

impl NodeUpdatePolicy {
    pub fn new(quota: u32, confidence_threshold: u32) -> Self {
        Self {
            quota,
            confidence_threshold,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.majority_quota(), config.confidence_threshold)
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    /// `node` must be live, undecided and colored. A color is a majority only when its
    /// count is strictly above the quota.
    pub fn apply(&self, node: &mut NodeState, counts: &ColorCounts) -> UpdateEffect {
        let mut effect = UpdateEffect::default();
        let was_decided = node.decided;

        // RED then BLUE. When both pass, BLUE's bookkeeping lands last.
        for color in Opinion::COLORS {
            if counts.get(color) <= self.quota {
                continue;
            }
            effect.majority = true;

            node.confidence.increment(color);
            if node.confidence.get(color) > node.confidence.get(node.opinion) {
                node.pending_opinion = Some(color);
                effect.switch_to = Some(color);
            }

            if color == node.opinion {
                node.accepted_streak += 1;
            } else {
                node.accepted_streak = 1;
            }

            if node.accepted_streak >= self.confidence_threshold {
                node.decided = true;
            }
        }

        if !effect.majority {
            node.accepted_streak = 0;
        }

        effect.decided_now = node.decided && !was_decided;
        effect
    }
}
