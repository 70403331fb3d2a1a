//! Steady-state genetic algorithm substrate shared by the selection and
//! scheduling searches.
//!
//! Problem-specific behaviour plugs in through [`Genome`], [`Evaluator`],
//! [`CrossoverOperator`] and [`MutationOperator`]. Scaling and parent
//! selection are interchangeable strategies. Randomness is always passed in
//! explicitly so that a run is reproducible from its seed.

pub mod genome;
pub mod random;
pub mod scaling;
pub mod selection;
pub mod population;
pub mod simple_ga;
pub mod monitor;
pub mod observer;

pub use genome::{CrossoverOperator, Direction, Evaluator, Genome, Individual, MutationOperator};
pub use random::{crossover_sample_size, gaussian, mutation_sample_size, sample_depth};
pub use scaling::{LinearScaling, NoScaling, ScalingOperator};
pub use selection::{
    RandomTournamentSelection, RouletteWheelSelection, SelectionOperator, TournamentSelection,
    UniformSelection,
};
pub use population::Population;
pub use simple_ga::{GaSettings, SimpleGa};
pub use monitor::ConvergenceMonitor;
pub use observer::{
    CollectingObserver, GenerationObserver, GenerationReport, NoopObserver, SearchKind,
    TracingObserver,
};
