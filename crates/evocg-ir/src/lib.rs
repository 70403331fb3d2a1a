//! Intermediate representation for genetic code generation.
//!
//! Program graphs describe what to compute, machine descriptions describe
//! the target, and instruction graphs are the result of choosing target
//! instructions for a program graph. All graphs are arenas addressed by
//! [`NodeId`](evocg_core::NodeId) with ordered edges:
//! - incoming edges of an operation are its operands, in order
//! - the first outgoing edge of an operation is its result

pub mod graph;
pub mod value;
pub mod operation;
pub mod machine;
pub mod program;
pub mod covering;
pub mod instruction_graph;
pub mod schedule;
pub mod asm;
pub mod validation;

pub use graph::{Graph, Node};
pub use value::{Datatype, Literal, StorageClass, Value, ValueKind};
pub use operation::{OpNode, OperationKind};
pub use machine::{Instruction, InstructionPattern, MachineDescription, Memory, Register, RegisterSet};
pub use program::ProgramGraph;
pub use covering::{Covering, CoveringId, CoveringTable};
pub use instruction_graph::{InstrNode, InstructionGraph};
pub use schedule::{InstructionSchedule, RegisterAssignment};
pub use asm::AssemblyRenderer;
pub use validation::{validate_machine, validate_program};
