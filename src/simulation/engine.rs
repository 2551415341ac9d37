use super::SimConfig;
use crate::error::{Result, SimError};
use crate::node::{NodeState, Opinion};
use crate::policy::{
    ChurnModel, FailureModel, NodeUpdatePolicy, RandomColorAssigner, SamplingPolicy,
    UniformPeerSampler, VoteTally,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A committed round. Node order is id order; readers get it immutably between rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    nodes: Vec<NodeState>,
}

impl Population {
    /// Builds a population from prepared nodes. Ids are rewritten to match position.
    pub fn from_nodes(mut nodes: Vec<NodeState>) -> Self {
        for (id, node) in nodes.iter_mut().enumerate() {
            node.id = id;
        }
        Self { nodes }
    }

    pub fn from_opinions(opinions: impl IntoIterator<Item = Opinion>) -> Self {
        Self {
            nodes: opinions
                .into_iter()
                .enumerate()
                .map(|(id, opinion)| NodeState::new(id, opinion))
                .collect(),
        }
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&NodeState> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count(&self, opinion: Opinion) -> usize {
        self.nodes.iter().filter(|n| n.opinion == opinion).count()
    }

    pub fn all_decided(&self) -> bool {
        !self.nodes.is_empty() && self.nodes.iter().all(|n| n.decided)
    }
}

/// What happened inside one round, before and at the barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub queried: u32,
    pub discarded_samples: u32,
    /// Uncolored nodes that took a color at the barrier.
    pub colored: u32,
    /// Colored nodes that changed color at the barrier.
    pub switched: u32,
    pub newly_decided: u32,
}

#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub population: Population,
    pub consensus: bool,
    pub stats: RoundStats,
}

pub fn create_population<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Result<Population> {
    config.validate()?;
    let assigner = RandomColorAssigner::from_config(config);
    Ok(Population::from_opinions(
        (0..config.node_count).map(|_| assigner.assign(rng)),
    ))
}

pub fn advance_round<R: Rng>(prev: &Population, config: &SimConfig, rng: &mut R) -> Result<RoundOutcome> {
    advance_round_with(prev, config, &UniformPeerSampler, &ChurnModel, rng)
}

/// One synchronous round. `prev` is never touched: the round works on a clone and
/// commits every deferred opinion at the end, so no query sees an opinion changed
/// earlier in the same round.
pub fn advance_round_with<R: Rng>(
    prev: &Population,
    config: &SimConfig,
    sampler: &dyn SamplingPolicy,
    failure: &dyn FailureModel,
    rng: &mut R,
) -> Result<RoundOutcome> {
    if prev.len() < 2 {
        return Err(SimError::InsufficientPopulation { size: prev.len() });
    }
    config.validate()?;

    let tally = VoteTally::new(config.sample_count);
    let update = NodeUpdatePolicy::from_config(config);
    let mut nodes = prev.nodes.clone();
    let mut stats = RoundStats::default();

    for id in 0..nodes.len() {
        if nodes[id].decided {
            continue;
        }
        if !failure.roll(&mut nodes[id], config, rng) {
            continue;
        }
        // uncolored nodes wait to be seeded
        if !nodes[id].can_query() {
            continue;
        }

        let result = tally.run(&mut nodes, id, sampler, rng)?;
        stats.queried += 1;
        stats.discarded_samples += result.discarded;

        if update.apply(&mut nodes[id], &result.counts).decided_now {
            stats.newly_decided += 1;
        }
    }

    // barrier
    for node in nodes.iter_mut() {
        let before = node.opinion;
        if node.commit_pending() {
            if before == Opinion::None {
                stats.colored += 1;
            } else {
                stats.switched += 1;
            }
        }
    }

    let population = Population { nodes };
    let consensus = population.all_decided();
    Ok(RoundOutcome {
        population,
        consensus,
        stats,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum HaltReason {
    Consensus,
    Cancelled,
    Fault(SimError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Running,
    Halted(HaltReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u64,
    pub consensus: bool,
    pub stats: RoundStats,
}

/// Owns the live population and the seeded rng. Single writer: rounds only advance
/// through `step`, and a round either commits fully or leaves the snapshot as it was.
#[derive(Debug)]
pub struct SimulationEngine {
    config: SimConfig,
    seed: u64,
    rng: ChaCha8Rng,
    population: Population,
    round: u64,
    state: EngineState,
    sampler: Box<dyn SamplingPolicy>,
    failure: Box<dyn FailureModel>,
}

impl SimulationEngine {
    pub fn new(config: SimConfig, seed: u64) -> Result<Self> {
        Self::with_policies(config, seed, Box::new(UniformPeerSampler), Box::new(ChurnModel))
    }

    pub fn with_policies(
        config: SimConfig,
        seed: u64,
        sampler: Box<dyn SamplingPolicy>,
        failure: Box<dyn FailureModel>,
    ) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let population = create_population(&config, &mut rng)?;
        debug!(
            "Created population of {} (red {}, blue {}, uncolored {}) with seed {}",
            population.len(),
            population.count(Opinion::Red),
            population.count(Opinion::Blue),
            population.count(Opinion::None),
            seed
        );

        Ok(Self {
            config,
            seed,
            rng,
            population,
            round: 0,
            state: EngineState::Running,
            sampler,
            failure,
        })
    }

    pub fn step(&mut self) -> Result<RoundReport> {
        if self.is_halted() {
            return Err(SimError::Halted);
        }

        let outcome = match advance_round_with(
            &self.population,
            &self.config,
            self.sampler.as_ref(),
            self.failure.as_ref(),
            &mut self.rng,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Round {} failed, halting: {}", self.round + 1, e);
                self.state = EngineState::Halted(HaltReason::Fault(e.clone()));
                return Err(e);
            }
        };

        self.population = outcome.population;
        self.round += 1;

        debug!(
            "Round {}: queried {}, colored {}, switched {}, decided +{}",
            self.round,
            outcome.stats.queried,
            outcome.stats.colored,
            outcome.stats.switched,
            outcome.stats.newly_decided
        );

        if outcome.consensus {
            info!("Consensus reached after {} rounds", self.round);
            self.state = EngineState::Halted(HaltReason::Consensus);
        }

        Ok(RoundReport {
            round: self.round,
            consensus: outcome.consensus,
            stats: outcome.stats,
        })
    }

    /// Steps until halted or `max_rounds` more rounds have run. Returns whether consensus was reached.
    pub fn run_to_completion(&mut self, max_rounds: u64) -> Result<bool> {
        for _ in 0..max_rounds {
            if self.step()?.consensus {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Stops the engine between rounds. The last committed population stays readable.
    pub fn cancel(&mut self) {
        if !self.is_halted() {
            info!("Simulation cancelled at round {}", self.round);
            self.state = EngineState::Halted(HaltReason::Cancelled);
        }
    }

    /// Replaces the population wholesale for a new config and starts over at round 0.
    /// The rng stream continues, so a reset gives a fresh population.
    pub fn reset(&mut self, config: SimConfig) -> Result<&Population> {
        let population = create_population(&config, &mut self.rng)?;
        self.config = config;
        self.population = population;
        self.round = 0;
        self.state = EngineState::Running;
        Ok(&self.population)
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, EngineState::Halted(_))
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        match &self.state {
            EngineState::Halted(reason) => Some(reason),
            EngineState::Running => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::sampling::ScriptedSampler;
    use rand::RngCore;

    #[derive(Debug)]
    struct NeverFail;

    impl FailureModel for NeverFail {
        fn roll(&self, node: &mut NodeState, _config: &SimConfig, _rng: &mut dyn RngCore) -> bool {
            !node.failed
        }

        fn name(&self) -> &str {
            "never"
        }
    }

    fn small_config() -> SimConfig {
        SimConfig::default()
            .with_node_count(10)
            .with_sample_count(2)
            .with_thresholds(0.5, 2)
    }

    #[test]
    fn create_population_validates_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = SimConfig::default().with_node_count(10).with_sample_count(10);
        assert!(matches!(
            create_population(&config, &mut rng),
            Err(SimError::InvalidConfiguration { field: "sample_count", .. })
        ));
    }

    #[test]
    fn population_ids_follow_position() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = create_population(&SimConfig::default(), &mut rng).unwrap();
        assert_eq!(population.len(), 100);
        for (i, node) in population.nodes().iter().enumerate() {
            assert_eq!(node.id, i);
            assert!(!node.decided && !node.failed);
        }

        let rebuilt = Population::from_nodes(vec![
            NodeState::new(9, Opinion::Red),
            NodeState::new(4, Opinion::Blue),
        ]);
        assert_eq!(rebuilt.node(1).map(|n| n.id), Some(1));
    }

    #[test]
    fn tiny_population_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = Population::from_opinions([Opinion::Red]);
        let err = advance_round(&population, &small_config(), &mut rng).unwrap_err();
        assert_eq!(err, SimError::InsufficientPopulation { size: 1 });
    }

    #[test]
    fn out_of_range_config_is_an_error_not_a_panic() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = create_population(&SimConfig::default(), &mut rng).unwrap();

        let config = SimConfig::default().with_churn(1.5, 0.6);
        assert!(matches!(
            advance_round(&population, &config, &mut rng),
            Err(SimError::InvalidConfiguration { field: "failure_probability", .. })
        ));

        let config = SimConfig::default().with_thresholds(f64::NAN, 5);
        assert!(matches!(
            advance_round(&population, &config, &mut rng),
            Err(SimError::InvalidConfiguration { field: "majority_threshold", .. })
        ));
    }

    #[test]
    fn barrier_hides_same_round_switches() {
        // Node 0 (RED) samples BLUE twice and schedules a switch. Node 1 then samples
        // node 0 twice and must still see RED. Nodes 2 and 3 sample each other.
        let population = Population::from_opinions([
            Opinion::Red,
            Opinion::Red,
            Opinion::Blue,
            Opinion::Blue,
        ]);
        let config = small_config().with_thresholds(0.1, 5);
        let sampler = ScriptedSampler::new(&[2, 3, 0, 0, 3, 3, 2, 2]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let outcome = advance_round_with(&population, &config, &sampler, &NeverFail, &mut rng).unwrap();
        let nodes = outcome.population.nodes();

        assert_eq!(nodes[0].opinion, Opinion::Blue);
        assert_eq!(nodes[0].confidence.blue, 1);
        // node 1 counted two RED votes from node 0
        assert_eq!(nodes[1].opinion, Opinion::Red);
        assert_eq!(nodes[1].confidence.red, 1);
        assert_eq!(nodes[1].accepted_streak, 1);
        assert_eq!(outcome.stats.switched, 1);
        // prev snapshot untouched
        assert_eq!(population.node(0).unwrap().opinion, Opinion::Red);
    }

    #[test]
    fn seeding_is_visible_only_as_pending() {
        // Node 0 seeds node 2 BLUE. Node 1 samples node 2 later in the round and still
        // finds it uncolored, so it counts node 1's own color.
        let population = Population::from_opinions([Opinion::Blue, Opinion::Red, Opinion::None]);
        let config = small_config().with_thresholds(0.1, 5);
        let sampler = ScriptedSampler::new(&[2, 2, 2, 2]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let outcome = advance_round_with(&population, &config, &sampler, &NeverFail, &mut rng).unwrap();
        let nodes = outcome.population.nodes();

        assert_eq!(nodes[1].confidence.red, 1);
        // last querier's seed wins at the barrier
        assert_eq!(nodes[2].opinion, Opinion::Red);
        assert_eq!(nodes[2].pending_opinion, None);
        assert_eq!(outcome.stats.colored, 1);
        assert_eq!(outcome.population.count(Opinion::None), 0);
    }

    #[test]
    fn failed_node_that_stays_failed_does_not_query() {
        #[derive(Debug)]
        struct StayFailed;
        impl FailureModel for StayFailed {
            fn roll(&self, node: &mut NodeState, _: &SimConfig, _: &mut dyn RngCore) -> bool {
                node.failed = true;
                false
            }
            fn name(&self) -> &str {
                "stay-failed"
            }
        }

        let population = Population::from_opinions([Opinion::Red, Opinion::None, Opinion::Blue]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let outcome =
            advance_round_with(&population, &small_config(), &UniformPeerSampler, &StayFailed, &mut rng)
                .unwrap();

        assert_eq!(outcome.stats.queried, 0);
        assert!(outcome.population.nodes().iter().all(|n| n.failed));
        assert_eq!(outcome.population.count(Opinion::None), 1);
    }

    #[test]
    fn decided_nodes_are_frozen() {
        let mut nodes: Vec<_> = (0..4).map(|id| NodeState::new(id, Opinion::Red)).collect();
        nodes[0].decided = true;
        nodes[0].failed = true;
        let population = Population::from_nodes(nodes);
        let config = small_config().with_churn(0.5, 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let outcome = advance_round(&population, &config, &mut rng).unwrap();
        // no recovery roll for a decided node
        assert_eq!(outcome.population.node(0), population.node(0));
    }

    #[test]
    fn consensus_halts_engine() {
        let config = SimConfig::default()
            .with_node_count(20)
            .with_initial_colors(1.0, 1.0)
            .with_sample_count(5)
            .with_thresholds(0.5, 4);
        let mut engine = SimulationEngine::new(config, 42).unwrap();

        assert!(engine.run_to_completion(100).unwrap());
        assert_eq!(engine.round(), 4);
        assert_eq!(engine.halt_reason(), Some(&HaltReason::Consensus));
        assert_eq!(engine.step().unwrap_err(), SimError::Halted);
        assert_eq!(engine.round(), 4);
    }

    #[test]
    fn cancel_keeps_last_snapshot() {
        let mut engine = SimulationEngine::new(SimConfig::default(), 7).unwrap();
        engine.step().unwrap();
        engine.step().unwrap();
        let before = engine.population().clone();

        engine.cancel();
        assert_eq!(engine.halt_reason(), Some(&HaltReason::Cancelled));
        assert_eq!(engine.step().unwrap_err(), SimError::Halted);
        assert_eq!(engine.population(), &before);
        assert_eq!(engine.round(), 2);
    }

    #[test]
    fn reset_replaces_population() {
        let mut engine = SimulationEngine::new(SimConfig::default(), 7).unwrap();
        engine.step().unwrap();
        engine.cancel();

        let config = SimConfig::default().with_node_count(30);
        assert_eq!(engine.reset(config).unwrap().len(), 30);
        assert_eq!(engine.round(), 0);
        assert_eq!(engine.state(), &EngineState::Running);
        assert_eq!(engine.config().node_count, 30);
    }

    #[test]
    fn reset_with_bad_config_leaves_engine_alone() {
        let mut engine = SimulationEngine::new(SimConfig::default(), 7).unwrap();
        engine.step().unwrap();
        let before = engine.population().clone();

        assert!(engine.reset(SimConfig::default().with_node_count(3)).is_err());
        assert_eq!(engine.population(), &before);
        assert_eq!(engine.round(), 1);
    }

    #[test]
    fn fault_halts_with_reason() {
        #[derive(Debug)]
        struct Broken;
        impl SamplingPolicy for Broken {
            fn sample(&self, nodes: &[NodeState], _: usize, _: &mut dyn RngCore) -> Result<usize> {
                Err(SimError::InsufficientPopulation { size: nodes.len() })
            }
            fn name(&self) -> &str {
                "broken"
            }
        }

        let config = SimConfig::default().with_initial_colors(1.0, 0.5);
        let mut engine =
            SimulationEngine::with_policies(config, 1, Box::new(Broken), Box::new(ChurnModel)).unwrap();
        let before = engine.population().clone();

        let err = engine.step().unwrap_err();
        assert!(matches!(err, SimError::InsufficientPopulation { .. }));
        assert_eq!(engine.halt_reason(), Some(&HaltReason::Fault(err)));
        assert_eq!(engine.population(), &before);
        assert_eq!(engine.round(), 0);
    }
}
