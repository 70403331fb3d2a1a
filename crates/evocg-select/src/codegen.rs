//! Code generator facade tying selection and scheduling together.

use std::sync::Arc;

use evocg_core::{CodeGenConfig, Error, Result, RunId};
use evocg_ga::GenerationObserver;
use evocg_ir::{MachineDescription, ProgramGraph};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::context::SelectionContext;
use crate::selector::GaInstructionSelector;
use crate::solution::CodeGenOutcome;

/// Generates code for one program on one machine.
///
/// ```ignore
/// let mut generator = CodeGenerator::new(CodeGenConfig::default());
/// generator.initialize(sample_dsp(), dot_product(1))?;
/// let outcome = generator.optimize(&mut TracingObserver)?;
/// ```
#[derive(Debug)]
pub struct CodeGenerator {
    config: CodeGenConfig,
    context: Option<Arc<SelectionContext>>,
    run_id: RunId,
}

impl CodeGenerator {
    pub fn new(config: CodeGenConfig) -> Self {
        Self {
            config,
            context: None,
            run_id: RunId::new(),
        }
    }

    pub fn config(&self) -> &CodeGenConfig {
        &self.config
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The prepared selection context, once initialized.
    pub fn context(&self) -> Option<&SelectionContext> {
        self.context.as_deref()
    }

    /// Validate the configuration and inputs, and compute the coverings of
    /// every program value.
    pub fn initialize(&mut self, machine: MachineDescription, program: ProgramGraph) -> Result<()> {
        self.config.validate()?;
        let context = SelectionContext::new(machine, program)?;
        info!(
            event = "codegen_initialized",
            run_id = %self.run_id,
            operations = context.num_operations(),
            coverings = context.coverings().len(),
        );
        self.context = Some(Arc::new(context));
        Ok(())
    }

    /// Run the selection search from a generator seeded with the configured
    /// seed. Repeated calls on the same generator reproduce the same outcome.
    pub fn optimize(&self, observer: &mut dyn GenerationObserver) -> Result<CodeGenOutcome> {
        let context = self
            .context
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| Error::Config("code generator is not initialized".into()))?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let selector =
            GaInstructionSelector::new(self.config.selector.clone(), self.config.scheduler.clone());
        let outcome = selector.optimize(context, observer, &mut rng)?;
        info!(
            event = "codegen_finished",
            run_id = %self.run_id,
            valid = outcome.is_valid,
            objective = outcome.objective,
            generations = outcome.generations,
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::Solution;
    use evocg_core::{SchedulerConfig, SelectorConfig};
    use evocg_ga::NoopObserver;
    use evocg_samples::{
        add_program, c3x_like_vliw, cyclic_machine, cyclic_program, dot_product, iir_filter,
        lattice_filter, lattice_filter_direct, m56000_like_dsp, sample_dsp, sample_dsp_direct,
        single_add_machine, sum_of_products, two_unit_machine,
    };

    fn quick_config(seed: u64) -> CodeGenConfig {
        CodeGenConfig {
            seed,
            selector: SelectorConfig {
                population_size: 4,
                max_generations: 4,
                monitored_generations: 2,
                ..SelectorConfig::default()
            },
            scheduler: SchedulerConfig {
                population_size: 12,
                max_generations: 100,
                monitored_generations: 20,
                ..SchedulerConfig::default()
            },
        }
    }

    fn thorough_config(seed: u64) -> CodeGenConfig {
        CodeGenConfig {
            scheduler: SchedulerConfig {
                population_size: 30,
                max_generations: 400,
                monitored_generations: 80,
                ..SchedulerConfig::default()
            },
            ..quick_config(seed)
        }
    }

    fn generate(machine: MachineDescription, program: ProgramGraph) -> (CodeGenerator, CodeGenOutcome) {
        let mut generator = CodeGenerator::new(thorough_config(42));
        generator.initialize(machine, program).unwrap();
        let outcome = generator.optimize(&mut NoopObserver).unwrap();
        (generator, outcome)
    }

    /// Every instruction issues once and after the producers of its
    /// operands, and every register value sits in an assignable register.
    fn assert_solution_holds(solution: &Solution) {
        let graph = &solution.instruction_graph;
        let schedule = &solution.schedule;
        assert_eq!(schedule.num_instructions(), graph.num_instructions());
        for node in graph.instruction_nodes() {
            let step = schedule.step_of(node).unwrap();
            for &operand in graph.operand_values(node) {
                if let Some(producer) = graph.producing_instruction(operand) {
                    assert!(schedule.step_of(producer).unwrap() < step);
                }
            }
        }
        for v in graph.register_values() {
            let register = solution.register_assignment.get(v).unwrap();
            assert!(graph.assignable_registers(v).unwrap().contains(register));
        }
    }

    #[test]
    fn test_optimize_requires_initialize() {
        let generator = CodeGenerator::new(quick_config(42));
        let err = generator.optimize(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_initialize_rejects_bad_config() {
        let mut config = quick_config(42);
        config.selector.p_mutation = 1.5;
        let mut generator = CodeGenerator::new(config);
        let err = generator
            .initialize(single_add_machine(), add_program())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(generator.context().is_none());
    }

    #[test]
    fn test_single_add_end_to_end() {
        let mut generator = CodeGenerator::new(quick_config(42));
        generator.initialize(single_add_machine(), add_program()).unwrap();
        let solution = generator
            .optimize(&mut NoopObserver)
            .unwrap()
            .into_valid()
            .unwrap();
        assert_eq!(solution.schedule.len(), 1);
        assert_eq!(solution.register_assignment.len(), 3);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = |seed| {
            let mut generator = CodeGenerator::new(quick_config(seed));
            generator
                .initialize(two_unit_machine(), sum_of_products())
                .unwrap();
            generator.optimize(&mut NoopObserver).unwrap()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_cyclic_program_end_to_end() {
        let mut generator = CodeGenerator::new(quick_config(42));
        generator.initialize(cyclic_machine(), cyclic_program()).unwrap();
        let outcome = generator.optimize(&mut NoopObserver).unwrap();

        let ctx = generator.context().unwrap();
        let graph = &outcome.solution.instruction_graph;
        let transfers = ctx.machine().transfer_instructions();
        let moves = graph
            .instruction_nodes()
            .filter(|&n| transfers.contains(&graph.instruction(n)))
            .count();
        assert_eq!(moves, 1);
        assert!(outcome.is_valid);
    }

    #[test]
    fn test_dsp_dot_product_runs() {
        let mut generator = CodeGenerator::new(quick_config(42));
        generator.initialize(sample_dsp(), dot_product(1)).unwrap();
        let outcome = generator.optimize(&mut NoopObserver).unwrap();

        assert!(outcome.objective.is_finite());
        assert!(outcome.generations > 0);
        assert!(outcome.scheduler_runs >= 4);
        assert!(!outcome.solution.schedule.is_empty());
    }

    #[test]
    fn test_m56000_iir_filter_is_valid() {
        let (generator, outcome) = generate(m56000_like_dsp(), iir_filter(1));
        let solution = outcome.into_valid().unwrap();
        assert_solution_holds(&solution);

        // The filter output comes out of the arithmetic unit, so it lands in an accumulator.
        let ctx = generator.context().unwrap();
        let program = ctx.program();
        let y1 = program
            .graph
            .value_nodes()
            .find(|&v| program.value(v).name() == Some("y[1]"))
            .unwrap();
        let node = solution.instruction_graph.lookup(y1).unwrap();
        let register = solution.register_assignment.get(node).unwrap();
        assert!(ctx.machine().register(register).mnemonic.starts_with('A'));
    }

    #[test]
    fn test_c3x_iir_filter_is_valid() {
        let (_, outcome) = generate(c3x_like_vliw(), iir_filter(1));
        assert_solution_holds(&outcome.into_valid().unwrap());
    }

    #[test]
    fn test_c3x_lattice_filter_is_valid() {
        let (_, outcome) = generate(c3x_like_vliw(), lattice_filter(1));
        let solution = outcome.into_valid().unwrap();
        assert_solution_holds(&solution);
        // The chain from the sample load through the filter body to the store
        // is longer than six operations.
        assert!(solution.schedule.len() >= 6);
    }

    #[test]
    fn test_direct_dsp_lattice_filter_is_valid() {
        let (generator, outcome) = generate(sample_dsp_direct(), lattice_filter_direct(1));
        let solution = outcome.into_valid().unwrap();
        assert_solution_holds(&solution);

        // The output sample and both state values are written back.
        let machine = generator.context().unwrap().machine();
        let graph = &solution.instruction_graph;
        let stores = graph
            .instruction_nodes()
            .filter(|&n| machine.instruction(graph.instruction(n)).mnemonic.starts_with("STOREF"))
            .count();
        assert_eq!(stores, 3);
    }

    #[test]
    fn test_m56000_lattice_filter_runs() {
        // Every arithmetic result competes for four accumulators, so only a
        // complete schedule is required here.
        let (_, outcome) = generate(m56000_like_dsp(), lattice_filter(1));
        assert!(outcome.objective.is_finite());
        assert_eq!(
            outcome.solution.schedule.num_instructions(),
            outcome.solution.instruction_graph.num_instructions()
        );
    }
}
