//! Instruction scheduling and register assignment by genetic search.
//!
//! A [`SchedulingGenome`] places every instruction of an instruction graph
//! at a step on its execution unit and picks a register for every register
//! value. Infeasible genomes are kept in the population and penalized by
//! their number of violated constraints.

pub mod dependencies;
pub mod context;
pub mod genome;
pub mod crossover;
pub mod mutation;
pub mod evaluator;
pub mod outcome;
pub mod scheduler;

pub use dependencies::Dependencies;
pub use context::ScheduleContext;
pub use genome::{SchedulingGenome, ValueInfo};
pub use crossover::ScheduleCrossover;
pub use mutation::ScheduleMutation;
pub use evaluator::ScheduleEvaluator;
pub use outcome::ScheduleOutcome;
pub use scheduler::GaScheduler;

#[cfg(test)]
pub(crate) mod fixtures;
