pub mod color;
pub mod sampling;
pub mod tally;
pub mod update;
pub mod failure;

pub use color::RandomColorAssigner;
pub use failure::{ChurnModel, FailureModel};
pub use sampling::{SamplingPolicy, UniformPeerSampler};
pub use tally::{Tally, VoteTally};
pub use update::{NodeUpdatePolicy, UpdateEffect};
