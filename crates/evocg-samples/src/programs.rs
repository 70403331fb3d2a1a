//! Sample program graphs.

use evocg_core::NodeId;
use evocg_ir::{Datatype, Literal, OperationKind, ProgramGraph, Value};
use serde::{Deserialize, Serialize};

/// Named sample program, selectable from run files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleProgram {
    Add,
    SumOfProducts,
    Cyclic,
    WeightedVectorSum,
    DotProduct,
    IirFilter,
    LatticeFilter,
    LatticeFilterDirect,
}

impl SampleProgram {
    /// Build the program; `unroll` only applies to the loop samples.
    pub fn build(self, unroll: usize) -> ProgramGraph {
        match self {
            SampleProgram::Add => add_program(),
            SampleProgram::SumOfProducts => sum_of_products(),
            SampleProgram::Cyclic => cyclic_program(),
            SampleProgram::WeightedVectorSum => weighted_vector_sum(unroll),
            SampleProgram::DotProduct => dot_product(unroll),
            SampleProgram::IirFilter => iir_filter(unroll),
            SampleProgram::LatticeFilter => lattice_filter(unroll),
            SampleProgram::LatticeFilterDirect => lattice_filter_direct(unroll),
        }
    }
}

/// `c = a + b`
pub fn add_program() -> ProgramGraph {
    let mut g = ProgramGraph::new();
    let a = g.add_value(Value::named_register("a", Datatype::Int));
    let b = g.add_value(Value::named_register("b", Datatype::Int));
    g.compute(OperationKind::Add, &[a, b], Value::named_register("c", Datatype::Int));
    g.init_input_values();
    g.init_output_values();
    g
}

/// `e = (a + b) * (c + d)`
pub fn sum_of_products() -> ProgramGraph {
    let mut g = ProgramGraph::new();
    let [a, b, c, d] = ["a", "b", "c", "d"].map(|name| g.add_value(Value::named_register(name, Datatype::Int)));
    let s = g.compute(OperationKind::Add, &[a, b], Value::register(Datatype::Int));
    let t = g.compute(OperationKind::Add, &[c, d], Value::register(Datatype::Int));
    g.compute(OperationKind::Mul, &[s, t], Value::named_register("e", Datatype::Int));
    g.init_input_values();
    g.init_output_values();
    g
}

/// `x' = x + y` where `x'` feeds `x` of the next iteration.
pub fn cyclic_program() -> ProgramGraph {
    let mut g = ProgramGraph::new();
    let x0 = g.add_value(Value::named_register("x[0]", Datatype::Int));
    let y = g.add_value(Value::named_register("y", Datatype::Int));
    let x1 = g.compute(OperationKind::Add, &[x0, y], Value::named_register("x[1]", Datatype::Int));
    g.init_input_values();
    g.init_output_values();
    g.add_cyclic_dependency(x0, x1);
    g
}

/// `name[0..=k]` as named register values.
fn series(g: &mut ProgramGraph, name: &str, k: usize, datatype: Datatype) -> Vec<NodeId> {
    (0..=k)
        .map(|i| g.add_value(Value::named_register(format!("{name}[{i}]"), datatype)))
        .collect()
}

fn pointers(g: &mut ProgramGraph, name: &str, k: usize) -> Vec<NodeId> {
    series(g, name, k, Datatype::Address)
}

fn float() -> Value {
    Value::register(Datatype::Float)
}

/// `next = pointer + 4`
fn advance(g: &mut ProgramGraph, pointer: NodeId, next: NodeId) {
    let four = g.add_value(Value::constant(Datatype::Int, Literal::Int(4)));
    let step = g.compute(OperationKind::Const, &[four], Value::register(Datatype::Int));
    g.apply(OperationKind::Add, &[pointer, step], next);
}

fn load(g: &mut ProgramGraph, pointer: NodeId) -> NodeId {
    g.compute(OperationKind::Load, &[pointer], float())
}

/// Load the float stored at the memory location `label`.
fn load_named(g: &mut ProgramGraph, label: &str) -> NodeId {
    let location = g.add_value(Value::named_memory(label, Datatype::Float));
    g.compute(OperationKind::Load, &[location], float())
}

/// Store `value` to the memory location `label`.
fn store_named(g: &mut ProgramGraph, value: NodeId, label: &str) -> NodeId {
    let location = g.add_value(Value::named_memory(label, Datatype::Float));
    g.compute(OperationKind::Store, &[value, location], Value::memory(Datatype::Float))
}

/// `c[i] = k0 * a[i] + k1 * b[i]`, unrolled `k` times.
///
/// The scalars `k0` and `k1` stay live across iterations and every pointer
/// is carried from the last iteration back into the first.
pub fn weighted_vector_sum(k: usize) -> ProgramGraph {
    let k = k.max(1);
    let mut g = ProgramGraph::new();
    let a = pointers(&mut g, "a", k);
    let b = pointers(&mut g, "b", k);
    let c = pointers(&mut g, "c", k);
    let k0 = g.add_value(Value::named_register("k0", Datatype::Float));
    let k1 = g.add_value(Value::named_register("k1", Datatype::Float));

    for i in 0..k {
        let x = load(&mut g, a[i]);
        advance(&mut g, a[i], a[i + 1]);
        let y = load(&mut g, b[i]);
        advance(&mut g, b[i], b[i + 1]);

        let kx = g.compute(OperationKind::Mul, &[x, k0], Value::register(Datatype::Float));
        let ky = g.compute(OperationKind::Mul, &[y, k1], Value::register(Datatype::Float));
        let sum = g.compute(OperationKind::Add, &[kx, ky], Value::register(Datatype::Float));
        g.compute(OperationKind::Store, &[sum, c[i]], Value::memory(Datatype::Float));
        advance(&mut g, c[i], c[i + 1]);
    }

    g.init_input_values();
    g.init_output_values();
    g.mark_output(k0);
    g.mark_output(k1);
    for p in [&a, &b, &c] {
        g.add_cyclic_dependency(p[0], p[k]);
    }
    g
}

/// Two interleaved dot products `s += a[i] * b[i]` and `t += c[i] * d[i]`,
/// unrolled `k` times with accumulators and pointers carried across
/// iterations.
pub fn dot_product(k: usize) -> ProgramGraph {
    let k = k.max(1);
    let mut g = ProgramGraph::new();
    let mut carried = Vec::new();
    let mut chains = Vec::new();
    for [p, q, acc] in [["a", "b", "s"], ["c", "d", "t"]] {
        let p = pointers(&mut g, p, k);
        let q = pointers(&mut g, q, k);
        let acc: Vec<NodeId> = (0..=k)
            .map(|i| g.add_value(Value::named_register(format!("{acc}[{i}]"), Datatype::Float)))
            .collect();
        chains.push((p, q, acc));
    }

    for i in 0..k {
        for (p, q, acc) in &chains {
            let x = load(&mut g, p[i]);
            advance(&mut g, p[i], p[i + 1]);
            let y = load(&mut g, q[i]);
            advance(&mut g, q[i], q[i + 1]);
            let product = g.compute(OperationKind::Mul, &[x, y], Value::register(Datatype::Float));
            g.apply(OperationKind::Add, &[product, acc[i]], acc[i + 1]);
        }
    }

    g.init_input_values();
    g.init_output_values();
    for (p, q, acc) in &chains {
        carried.extend([(acc[0], acc[k]), (p[0], p[k]), (q[0], q[k])]);
    }
    for (start, end) in carried {
        g.add_cyclic_dependency(start, end);
    }
    g
}

/// Second-order recursive filter `y' = c1 * x + c0 * x' + c2 * y`,
/// unrolled `k` times.
///
/// Each iteration loads `x'` through `xp`, stores `y'` through `yp` and
/// advances both pointers. The newest sample and output are carried into
/// the next iteration together with the pointers.
pub fn iir_filter(k: usize) -> ProgramGraph {
    let k = k.max(1);
    let mut g = ProgramGraph::new();
    let xp = pointers(&mut g, "xp", k);
    let yp = pointers(&mut g, "yp", k);
    let x = series(&mut g, "x", k, Datatype::Float);
    let y = series(&mut g, "y", k, Datatype::Float);
    let [c0, c1, c2] = ["c0", "c1", "c2"].map(|label| load_named(&mut g, label));

    for i in 0..k {
        g.compute(OperationKind::Store, &[y[i + 1], yp[i]], Value::memory(Datatype::Float));
        advance(&mut g, yp[i], yp[i + 1]);
        g.apply(OperationKind::Load, &[xp[i]], x[i + 1]);
        advance(&mut g, xp[i], xp[i + 1]);

        let feedback = g.compute(OperationKind::Mul, &[c2, y[i]], float());
        let previous = g.compute(OperationKind::Mul, &[c1, x[i]], float());
        let current = g.compute(OperationKind::Mul, &[c0, x[i + 1]], float());
        let feedforward = g.compute(OperationKind::Add, &[previous, current], float());
        g.apply(OperationKind::Add, &[feedforward, feedback], y[i + 1]);
    }

    g.init_input_values();
    g.init_output_values();
    g.mark_output(x[k]);
    g.mark_output(y[k]);
    for carried in [&xp, &yp, &y, &x] {
        g.add_cyclic_dependency(carried[0], carried[k]);
    }
    g
}

/// One two-stage lattice section over input `x` and state `(s0, s1)`.
///
/// Writes the next state into `next` and the section output into `y`.
fn lattice_section(
    g: &mut ProgramGraph,
    x: NodeId,
    [s0, s1]: [NodeId; 2],
    [c0, c1, c2, c3, c4]: [NodeId; 5],
    next: [NodeId; 2],
    y: NodeId,
) {
    let [z0, z1] = next;
    let v0 = g.compute(OperationKind::Add, &[x, s0], float());
    let v1 = g.compute(OperationKind::Mul, &[c0, v0], float());
    let v2 = g.compute(OperationKind::Add, &[x, v1], float());
    let v3 = g.compute(OperationKind::Add, &[v2, s1], float());
    let v4 = g.compute(OperationKind::Mul, &[c1, v3], float());
    g.apply(OperationKind::Add, &[v2, v4], z1);
    let v5 = g.compute(OperationKind::Add, &[v1, s0], float());
    g.apply(OperationKind::Add, &[v4, s1], z0);
    let v6 = g.compute(OperationKind::Mul, &[v5, c2], float());
    let v7 = g.compute(OperationKind::Mul, &[z0, c3], float());
    let v9 = g.compute(OperationKind::Mul, &[z1, c4], float());
    let v8 = g.compute(OperationKind::Add, &[v6, v7], float());
    g.apply(OperationKind::Add, &[v8, v9], y);
}

fn lattice_coefficients(g: &mut ProgramGraph) -> [NodeId; 5] {
    ["c0", "c1", "c2", "c3", "c4"].map(|label| load_named(g, label))
}

/// Lattice filter streaming `x` in through `xp` and `y` out through `yp`,
/// unrolled `k` times.
///
/// The filter state `(x0, x1)` and both pointers are carried across
/// iterations; the final state is live-out since the next iteration reads it.
pub fn lattice_filter(k: usize) -> ProgramGraph {
    let k = k.max(1);
    let mut g = ProgramGraph::new();
    let xp = pointers(&mut g, "xp", k);
    let yp = pointers(&mut g, "yp", k);
    let x0 = series(&mut g, "x0", k, Datatype::Float);
    let x1 = series(&mut g, "x1", k, Datatype::Float);
    let c = lattice_coefficients(&mut g);

    for i in 0..k {
        let x = load(&mut g, xp[i]);
        advance(&mut g, xp[i], xp[i + 1]);
        let y = g.add_value(float());
        lattice_section(&mut g, x, [x0[i], x1[i]], c, [x0[i + 1], x1[i + 1]], y);
        g.compute(OperationKind::Store, &[y, yp[i]], Value::memory(Datatype::Float));
        advance(&mut g, yp[i], yp[i + 1]);
    }

    g.init_input_values();
    g.init_output_values();
    g.mark_output(x0[k]);
    g.mark_output(x1[k]);
    for carried in [&x0, &x1, &xp, &yp] {
        g.add_cyclic_dependency(carried[0], carried[k]);
    }
    g
}

/// Lattice filter over `k` named memory samples, fully unrolled.
///
/// Samples, outputs and the filter state all live at named memory
/// locations, so no address registers are needed.
pub fn lattice_filter_direct(k: usize) -> ProgramGraph {
    let k = k.max(1);
    let mut g = ProgramGraph::new();
    let mut state = [load_named(&mut g, "x0[0]"), load_named(&mut g, "x1[0]")];
    let c = lattice_coefficients(&mut g);

    for i in 0..k {
        let x = load_named(&mut g, &format!("x[{i}]"));
        let y = g.add_value(float());
        let next = [g.add_value(float()), g.add_value(float())];
        lattice_section(&mut g, x, state, c, next, y);
        store_named(&mut g, y, &format!("y[{i}]"));
        state = next;
    }
    store_named(&mut g, state[0], &format!("x0[{k}]"));
    store_named(&mut g, state[1], &format!("x1[{k}]"));

    g.init_input_values();
    g.init_output_values();
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machines::{
        c3x_like_vliw, cyclic_machine, m56000_like_dsp, sample_dsp, sample_dsp_direct,
        single_add_machine, two_unit_machine,
    };
    use evocg_ir::{validate_program, CoveringTable};
    use proptest::prelude::*;

    fn named(g: &ProgramGraph, name: &str) -> NodeId {
        g.graph
            .value_nodes()
            .find(|&v| g.value(v).name() == Some(name))
            .unwrap()
    }

    #[test]
    fn test_small_programs_are_valid() {
        assert!(validate_program(&add_program(), &single_add_machine()).is_ok());
        assert!(validate_program(&sum_of_products(), &two_unit_machine()).is_ok());
        assert!(validate_program(&cyclic_program(), &cyclic_machine()).is_ok());
    }

    #[test]
    fn test_sum_of_products_shape() {
        let g = sum_of_products();
        assert_eq!(g.inputs.len(), 4);
        assert_eq!(g.outputs.len(), 1);
        assert_eq!(g.num_operations(), 3);
    }

    #[test]
    fn test_cyclic_program_links_accumulator() {
        let g = cyclic_program();
        let x0 = g.inputs[0];
        let x1 = g.outputs[0];
        assert_eq!(g.cyclic.get(&x0), Some(&x1));
        assert_eq!(g.cyclic.get(&x1), Some(&x0));
    }

    #[test]
    fn test_weighted_vector_sum_outputs() {
        let g = weighted_vector_sum(1);
        // 12 operations per iteration
        assert_eq!(g.num_operations(), 12);
        // k0 and k1 stay live even though the multiplies read them
        let flagged: Vec<_> = g.outputs.iter().filter(|&&v| g.value(v).output).collect();
        assert_eq!(flagged.len(), 2);
        assert_eq!(g.cyclic.len(), 6);
    }

    #[test]
    fn test_weighted_vector_sum_covers_on_dsp() {
        let m = sample_dsp();
        let g = weighted_vector_sum(2);
        assert!(validate_program(&g, &m).is_ok());
        let table = CoveringTable::build(&g, &m).unwrap();

        // Every pointer increment is realized by one `$0++` per address register and unit.
        let a1 = g
            .graph
            .value_nodes()
            .find(|&v| g.value(v).name() == Some("a[1]"))
            .unwrap();
        assert_eq!(table.for_value(a1).len(), 16);
    }

    #[test]
    fn test_dot_product_offers_mac() {
        let m = sample_dsp();
        let g = dot_product(1);
        let table = CoveringTable::build(&g, &m).unwrap();
        let s1 = g
            .graph
            .value_nodes()
            .find(|&v| g.value(v).name() == Some("s[1]"))
            .unwrap();
        let coverings: Vec<_> = table.for_value(s1).iter().map(|&id| table.covering(id)).collect();
        // ADDF on two units plus the left-operand MACF
        assert_eq!(coverings.len(), 3);
        assert!(coverings.iter().any(|c| c.covered_operations.len() == 2));
        assert_eq!(g.cyclic.len(), 12);
    }

    #[test]
    fn test_iir_filter_shape() {
        let g = iir_filter(1);
        // Three coefficient loads, then eleven operations per iteration.
        assert_eq!(g.num_operations(), 14);
        assert_eq!(iir_filter(3).num_operations(), 3 + 3 * 11);
        assert_eq!(g.cyclic.len(), 8);

        // The newest sample is read by a multiply yet stays live-out.
        let x1 = named(&g, "x[1]");
        assert!(g.value(x1).output);
        assert_eq!(g.graph.outputs(x1).len(), 1);
        assert!(g.is_output_value(named(&g, "y[1]")));

        let coefficients: Vec<_> = g
            .inputs
            .iter()
            .filter_map(|&v| g.value(v).name())
            .filter(|name| name.starts_with('c'))
            .collect();
        assert_eq!(coefficients, ["c0", "c1", "c2"]);
    }

    #[test]
    fn test_lattice_filter_shape() {
        let g = lattice_filter(1);
        // Coefficients, streamed load and store with their increments, filter body.
        assert_eq!(g.num_operations(), 5 + 6 + 13);
        assert_eq!(g.cyclic.len(), 8);
        for name in ["x0[1]", "x1[1]"] {
            let v = named(&g, name);
            assert!(g.value(v).output);
            assert_eq!(g.graph.outputs(v).len(), 1);
        }
    }

    #[test]
    fn test_lattice_filter_direct_needs_no_pointers() {
        let g = lattice_filter_direct(2);
        assert!(g.cyclic.is_empty());
        assert!(g
            .graph
            .value_nodes()
            .all(|v| g.value(v).datatype != Datatype::Address));
        // Coefficients, state in and out, then a load, a store and the body per sample.
        assert_eq!(g.num_operations(), 5 + 2 + 2 + 2 * 15);
        assert_eq!(g.outputs.len(), 4);
        assert!(g.outputs.iter().all(|&v| !g.value(v).is_register()));
    }

    #[test]
    fn test_c3x_fuses_loads_into_multiply() {
        let m = c3x_like_vliw();
        let g = dot_product(1);
        let table = CoveringTable::build(&g, &m).unwrap();
        let add = g.graph.producing_operation(named(&g, "s[1]")).unwrap();
        let product = g.graph.operand_values(add)[0];

        let coverings: Vec<_> = table.for_value(product).iter().map(|&id| table.covering(id)).collect();
        // Four operand forms on each of the two multipliers.
        assert_eq!(coverings.len(), 8);
        let fused: Vec<_> = coverings.iter().filter(|c| c.covered_operations.len() == 3).collect();
        assert_eq!(fused.len(), 2);
        for c in fused {
            assert!(c
                .operand_values
                .iter()
                .all(|&v| g.value(v).datatype == Datatype::Address));
        }
    }

    #[test]
    fn test_m56000_iir_covers_with_accumulators() {
        let m = m56000_like_dsp();
        let g = iir_filter(1);
        let table = CoveringTable::build(&g, &m).unwrap();
        let y1 = named(&g, "y[1]");
        let coverings: Vec<_> = table.for_value(y1).iter().map(|&id| table.covering(id)).collect();
        // ADDF, plus the right-operand MACF absorbing the feedback multiply.
        assert_eq!(coverings.len(), 2);
        for c in coverings {
            let accumulators = &m.instruction(c.instruction).result_registers;
            assert_eq!(m.format_registers(accumulators), "{A0, A1, A2, A3}");
        }
    }

    proptest! {
        #[test]
        fn prop_filters_are_coverable(k in 1usize..4) {
            for m in [sample_dsp(), m56000_like_dsp(), c3x_like_vliw()] {
                for g in [iir_filter(k), lattice_filter(k)] {
                    prop_assert!(validate_program(&g, &m).is_ok());
                    prop_assert!(CoveringTable::build(&g, &m).is_ok());
                }
            }
            let direct = lattice_filter_direct(k);
            prop_assert!(validate_program(&direct, &sample_dsp_direct()).is_ok());
            prop_assert!(CoveringTable::build(&direct, &sample_dsp_direct()).is_ok());
        }

        #[test]
        fn prop_unrolled_loops_are_coverable(k in 1usize..5) {
            let m = sample_dsp();
            for g in [weighted_vector_sum(k), dot_product(k)] {
                prop_assert!(validate_program(&g, &m).is_ok());
                prop_assert!(CoveringTable::build(&g, &m).is_ok());
            }
        }
    }
}
