//! Run file describing what to compile and how.

use std::path::Path;

use anyhow::{Context, Result};
use evocg_core::CodeGenConfig;
use evocg_samples::{SampleMachine, SampleProgram};
use serde::{Deserialize, Serialize};

/// Sample inputs and search parameters of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub machine: SampleMachine,
    pub program: SampleProgram,
    /// Loop unrolling factor for the looping sample programs
    pub unroll: usize,
    pub codegen: CodeGenConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            machine: SampleMachine::SampleDsp,
            program: SampleProgram::DotProduct,
            unroll: 1,
            codegen: CodeGenConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("malformed run file")?;
        config.codegen.validate()?;
        anyhow::ensure!(config.unroll > 0, "unroll must be positive");
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read run file {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_run_file_uses_defaults() {
        assert_eq!(RunConfig::from_json("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_run_file_selects_samples() {
        let config = RunConfig::from_json(
            r#"{
                "machine": "two_unit",
                "program": "sum_of_products",
                "codegen": { "seed": 3, "selector": { "population_size": 8 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.machine, SampleMachine::TwoUnit);
        assert_eq!(config.program, SampleProgram::SumOfProducts);
        assert_eq!(config.codegen.seed, 3);
        assert_eq!(config.codegen.selector.population_size, 8);
    }

    #[test]
    fn test_run_file_selects_filter_samples() {
        let config =
            RunConfig::from_json(r#"{ "machine": "m56000", "program": "iir_filter", "unroll": 2 }"#).unwrap();
        assert_eq!(config.machine, SampleMachine::M56000);
        assert_eq!(config.program, SampleProgram::IirFilter);
        assert_eq!(config.program.build(config.unroll).cyclic.len(), 8);

        let config = RunConfig::from_json(r#"{ "machine": "c3x_vliw", "program": "lattice_filter_direct" }"#).unwrap();
        assert_eq!(config.machine, SampleMachine::C3xVliw);
        assert_eq!(config.program, SampleProgram::LatticeFilterDirect);
    }

    #[test]
    fn test_invalid_run_file_rejected() {
        assert!(RunConfig::from_json(r#"{ "unroll": 0 }"#).is_err());
        assert!(RunConfig::from_json(r#"{ "machine": "vax" }"#).is_err());
        assert!(
            RunConfig::from_json(r#"{ "codegen": { "scheduler": { "p_crossover": 2.0 } } }"#)
                .is_err()
        );
    }
}
