use crate::error::{Result, SimError};
use crate::node::NodeState;
use rand::{Rng, RngCore};
use std::fmt;

pub trait SamplingPolicy: Send + Sync + fmt::Debug {
    /// Returns the index of one peer of `querier`. Repeated calls sample with replacement.
    fn sample(&self, nodes: &[NodeState], querier: usize, rng: &mut dyn RngCore) -> Result<usize>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPeerSampler;

impl SamplingPolicy for UniformPeerSampler {
    fn sample(&self, nodes: &[NodeState], querier: usize, rng: &mut dyn RngCore) -> Result<usize> {
        let size = nodes.len();
        if size < 2 {
            return Err(SimError::InsufficientPopulation { size });
        }

        // draw from the n-1 other slots and skip over the querier, one draw per sample
        let pick = rng.gen_range(0..size - 1);
        Ok(if pick >= querier { pick + 1 } else { pick })
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// Walks a fixed list of peers, ignoring the rng.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ScriptedSampler {
    picks: Vec<usize>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedSampler {
    pub(crate) fn new(picks: &[usize]) -> Self {
        Self {
            picks: picks.to_vec(),
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl SamplingPolicy for ScriptedSampler {
    fn sample(&self, _nodes: &[NodeState], _querier: usize, _rng: &mut dyn RngCore) -> Result<usize> {
        let i = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(self.picks[i % self.picks.len()])
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
