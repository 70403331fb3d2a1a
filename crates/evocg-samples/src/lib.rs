//! Sample target machines and program graphs.
//!
//! Used as test fixtures across the workspace and as named inputs of the
//! command line harness.

pub mod machines;
pub mod programs;

pub use machines::{
    c3x_like_vliw, cyclic_machine, m56000_like_dsp, sample_dsp, sample_dsp_direct,
    single_add_machine, two_unit_machine, SampleMachine,
};
pub use programs::{
    add_program, cyclic_program, dot_product, iir_filter, lattice_filter, lattice_filter_direct,
    sum_of_products, weighted_vector_sum, SampleProgram,
};
