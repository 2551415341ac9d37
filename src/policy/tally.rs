use super::SamplingPolicy;
use crate::error::Result;
use crate::node::{ColorCounts, NodeState, Opinion};
use rand::RngCore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub counts: ColorCounts,
    /// Samples that hit a failed peer. They do not count and are not retried.
    pub discarded: u32,
    /// Samples that hit an uncolored peer and scheduled it to take the querier's color.
    pub seeded: u32,
}

/// Counts one querier's sampled votes for a single round.
#[derive(Debug, Clone, Copy)]
pub struct VoteTally {
    sample_count: usize,
}

impl VoteTally {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count }
    }

    /// Samples peers from the round's working snapshot. Only `pending_opinion` of
    /// uncolored peers is written; committed opinions are left for the barrier.
    pub fn run(
        &self,
        nodes: &mut [NodeState],
        querier: usize,
        sampler: &dyn SamplingPolicy,
        rng: &mut dyn RngCore,
    ) -> Result<Tally> {
        let own = nodes[querier].opinion;
        let mut tally = Tally::default();

        for _ in 0..self.sample_count {
            let picked = sampler.sample(nodes, querier, rng)?;
            let peer = &mut nodes[picked];

            if peer.failed {
                tally.discarded += 1;
            } else if peer.opinion == Opinion::None {
                tally.counts.increment(own);
                peer.pending_opinion = Some(own);
                tally.seeded += 1;
            } else {
                tally.counts.increment(peer.opinion);
            }
        }

        Ok(tally)
    }
}
