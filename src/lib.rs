pub mod error;
pub mod node;
pub mod policy;
pub mod metrics;
pub mod simulation;

pub use error::SimError;
pub use node::{NodeState, Opinion};
pub use simulation::{Simulation, SimConfig, SimulationEngine};
pub use metrics::MetricsCollector;

pub mod prelude {
    pub use crate::error::SimError;
    pub use crate::node::{ColorCounts, Confidence, NodeState, Opinion};
    pub use crate::policy::{FailureModel, SamplingPolicy};
    pub use crate::simulation::{
        advance_round, create_population, Population, RunOptions, SimConfig, Simulation, SimulationEngine,
    };
    pub use crate::metrics::RoundMetrics;
}
