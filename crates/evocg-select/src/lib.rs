//! Instruction selection by genetic search, and the code generator facade.
//!
//! A [`SelectionGenome`] picks one covering per program operation. Each
//! genome is lowered to an instruction graph, its register classes are
//! reconciled with transfer instructions, and a complete scheduling search
//! on that graph yields the genome's objective.

pub mod context;
pub mod solution;
pub mod genome;
pub mod crossover;
pub mod mutation;
pub mod lowering;
pub mod registers;
pub mod evaluator;
pub mod selector;
pub mod codegen;

pub use context::SelectionContext;
pub use solution::{CodeGenOutcome, Solution};
pub use genome::SelectionGenome;
pub use crossover::SelectionCrossover;
pub use mutation::SelectionMutation;
pub use lowering::build_instruction_graph;
pub use registers::{insert_cyclic_transfers, resolve_assignable_registers};
pub use evaluator::SelectionEvaluator;
pub use selector::GaInstructionSelector;
pub use codegen::CodeGenerator;
