//! Configuration types for the selection and scheduling searches.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Which population statistics are computed each generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Objective mean/min/max/variance
    pub objective: bool,
    /// Same statistics over scaled fitness
    pub fitness: bool,
    /// Mean pairwise genome difference (quadratic in population size)
    pub diversity: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            objective: true,
            fitness: false,
            diversity: false,
        }
    }
}

/// Instruction scheduling and register assignment search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of scheduling genomes per generation
    pub population_size: usize,
    /// Linear scaling factor applied to objectives
    pub scaling_factor: f64,
    /// Hard ceiling on generations
    pub max_generations: u64,
    /// Window of the convergence monitor
    pub monitored_generations: usize,
    /// Start from random packed schedules instead of list schedules
    pub random_initialization: bool,
    /// Probability that an offspring pair is crossed
    pub p_crossover: f64,
    /// Probability of the position exchange crossover
    pub p_position_exchange: f64,
    /// Probability of the relative order crossover
    pub p_relative_order: f64,
    /// Probability of the register crossover
    pub p_register_crossover: f64,
    /// Probability of the execution unit exchange crossover
    pub p_unit_exchange: f64,
    /// Probability of relocating instructions to random slots
    pub p_schedule_mutation: f64,
    /// Probability of reassigning registers
    pub p_register_mutation: f64,
    /// Probability of swapping dependent instruction pairs into order
    pub p_schedule_cross_swap: f64,
    /// Probability of moving instructions into an earlier free slot
    pub p_schedule_compaction: f64,
    /// Per-generation statistics
    pub statistics: StatisticsConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            scaling_factor: 2.0,
            max_generations: 1000,
            monitored_generations: 100,
            random_initialization: false,
            p_crossover: 0.5,
            p_position_exchange: 1.0,
            p_relative_order: 0.0,
            p_register_crossover: 0.0,
            p_unit_exchange: 0.0,
            p_schedule_mutation: 0.2,
            p_register_mutation: 0.2,
            p_schedule_cross_swap: 0.5,
            p_schedule_compaction: 0.2,
            statistics: StatisticsConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        check_population("scheduler", self.population_size, self.monitored_generations)?;
        check_positive("scheduler.scaling_factor", self.scaling_factor)?;
        for (name, p) in [
            ("scheduler.p_crossover", self.p_crossover),
            ("scheduler.p_position_exchange", self.p_position_exchange),
            ("scheduler.p_relative_order", self.p_relative_order),
            ("scheduler.p_register_crossover", self.p_register_crossover),
            ("scheduler.p_unit_exchange", self.p_unit_exchange),
            ("scheduler.p_schedule_mutation", self.p_schedule_mutation),
            ("scheduler.p_register_mutation", self.p_register_mutation),
            ("scheduler.p_schedule_cross_swap", self.p_schedule_cross_swap),
            ("scheduler.p_schedule_compaction", self.p_schedule_compaction),
        ] {
            check_probability(name, p)?;
        }
        Ok(())
    }
}

/// Instruction selection search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Number of selection genomes per generation
    pub population_size: usize,
    /// Linear scaling factor applied to objectives
    pub scaling_factor: f64,
    /// Hard ceiling on generations
    pub max_generations: u64,
    /// Window of the convergence monitor
    pub monitored_generations: usize,
    /// Probability that an offspring pair is crossed
    pub p_crossover: f64,
    /// Probability that an offspring is mutated
    pub p_mutation: f64,
    /// Per-generation statistics
    pub statistics: StatisticsConfig,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            scaling_factor: 2.0,
            max_generations: 100,
            monitored_generations: 10,
            p_crossover: 0.6,
            p_mutation: 0.1,
            statistics: StatisticsConfig::default(),
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<()> {
        check_population("selector", self.population_size, self.monitored_generations)?;
        check_positive("selector.scaling_factor", self.scaling_factor)?;
        check_probability("selector.p_crossover", self.p_crossover)?;
        check_probability("selector.p_mutation", self.p_mutation)
    }
}

/// Complete code generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeGenConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Outer selection search
    pub selector: SelectorConfig,
    /// Inner scheduling search, run once per evaluated selection
    pub scheduler: SchedulerConfig,
}

impl Default for CodeGenConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            selector: SelectorConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl CodeGenConfig {
    pub fn validate(&self) -> Result<()> {
        self.selector.validate()?;
        self.scheduler.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

fn check_population(section: &str, population_size: usize, window: usize) -> Result<()> {
    if population_size < 2 {
        return Err(Error::Config(format!(
            "{section}.population_size must be at least 2, got {population_size}"
        )));
    }
    if window == 0 {
        return Err(Error::Config(format!(
            "{section}.monitored_generations must be positive"
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must be positive, got {value}")))
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::Config(format!("{name} must lie in [0, 1], got {p}")))
    }
}
