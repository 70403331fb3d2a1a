//! Sample machine descriptions.

use evocg_ir::{
    Datatype, Instruction, InstructionPattern, MachineDescription, OperationKind, RegisterSet,
    Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named sample machine, selectable from run files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMachine {
    SingleAdd,
    TwoUnit,
    Cyclic,
    SampleDsp,
    SampleDspDirect,
    M56000,
    C3xVliw,
}

impl SampleMachine {
    pub fn build(self) -> MachineDescription {
        match self {
            SampleMachine::SingleAdd => single_add_machine(),
            SampleMachine::TwoUnit => two_unit_machine(),
            SampleMachine::Cyclic => cyclic_machine(),
            SampleMachine::SampleDsp => sample_dsp(),
            SampleMachine::SampleDspDirect => sample_dsp_direct(),
            SampleMachine::M56000 => m56000_like_dsp(),
            SampleMachine::C3xVliw => c3x_like_vliw(),
        }
    }
}

impl fmt::Display for SampleMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleMachine::SingleAdd => "single_add",
            SampleMachine::TwoUnit => "two_unit",
            SampleMachine::Cyclic => "cyclic",
            SampleMachine::SampleDsp => "sample_dsp",
            SampleMachine::SampleDspDirect => "sample_dsp_direct",
            SampleMachine::M56000 => "m56000",
            SampleMachine::C3xVliw => "c3x_vliw",
        };
        f.write_str(name)
    }
}

fn reg(datatype: Datatype) -> Value {
    Value::register(datatype)
}

/// `$r = op($0, $1)` with every value in a register.
fn binary(
    mnemonic: &str,
    op: OperationKind,
    unit: usize,
    datatype: Datatype,
    result: &RegisterSet,
    operands: [&RegisterSet; 2],
) -> Instruction {
    Instruction::new(
        mnemonic,
        InstructionPattern::binary(op, reg(datatype), reg(datatype), reg(datatype)),
        unit,
    )
    .with_result_registers(result.clone())
    .with_operand_registers(operands.iter().map(|&s| s.clone()).collect())
}

/// Register to register move.
fn transfer(mnemonic: &str, unit: usize, datatype: Datatype, from: &RegisterSet, to: &RegisterSet) -> Instruction {
    Instruction::new(
        mnemonic,
        InstructionPattern::unary(OperationKind::Move, reg(datatype), reg(datatype)),
        unit,
    )
    .with_result_registers(to.clone())
    .with_operand_registers(vec![from.clone()])
}

/// One unit, registers `R0` and `R1`, and a single integer add.
pub fn single_add_machine() -> MachineDescription {
    let mut m = MachineDescription::new(1);
    let r = m.add_register_class("R", 2, Datatype::Int);
    m.add_instruction(binary("ADD $0, $1, $r", OperationKind::Add, 0, Datatype::Int, &r, [&r, &r]));
    m
}

/// Two units, each able to add and multiply integers in `R0..R7`.
pub fn two_unit_machine() -> MachineDescription {
    let mut m = MachineDescription::new(2);
    let r = m.add_register_class("R", 8, Datatype::Int);
    for unit in 0..2 {
        m.add_instruction(binary("ADD $0, $1, $r", OperationKind::Add, unit, Datatype::Int, &r, [&r, &r]));
        m.add_instruction(binary("MUL $0, $1, $r", OperationKind::Mul, unit, Datatype::Int, &r, [&r, &r]));
    }
    m
}

/// Adds read from class `A` but write to class `B`; moves bridge the classes.
pub fn cyclic_machine() -> MachineDescription {
    let mut m = MachineDescription::new(2);
    let a = m.add_register_class("A", 2, Datatype::Int);
    let b = m.add_register_class("B", 2, Datatype::Int);
    m.add_instruction(binary("ADD $0, $1, $r", OperationKind::Add, 0, Datatype::Int, &b, [&a, &a]));
    m.add_instruction(transfer("MOVA $0, $r", 1, Datatype::Int, &b, &a));
    m.add_instruction(transfer("MOVB $0, $r", 1, Datatype::Int, &a, &b));
    m
}

/// Register and memory loads and stores of float data on `unit`.
///
/// Indirect forms address memory through `address`, direct forms name a
/// memory location.
fn memory_access(
    m: &mut MachineDescription,
    unit: usize,
    [load, store]: [&str; 2],
    data: &RegisterSet,
    address: &RegisterSet,
) {
    let f = Datatype::Float;
    let none = RegisterSet::new();
    if !address.is_empty() {
        m.add_instruction(
            Instruction::new(
                format!("{load} *$0, $r"),
                InstructionPattern::unary(OperationKind::Load, reg(f), reg(Datatype::Address)),
                unit,
            )
            .with_result_registers(data.clone())
            .with_operand_registers(vec![address.clone()]),
        );
    }
    m.add_instruction(
        Instruction::new(
            format!("{load} $0, $r"),
            InstructionPattern::unary(OperationKind::Load, reg(f), Value::memory(f)),
            unit,
        )
        .with_result_registers(data.clone())
        .with_operand_registers(vec![none.clone()]),
    );
    if !address.is_empty() {
        m.add_instruction(
            Instruction::new(
                format!("{store} $0, *$1"),
                InstructionPattern::binary(OperationKind::Store, Value::memory(f), reg(f), reg(Datatype::Address)),
                unit,
            )
            .with_operand_registers(vec![data.clone(), address.clone()]),
        );
    }
    m.add_instruction(
        Instruction::new(
            format!("{store} $0, $1"),
            InstructionPattern::binary(OperationKind::Store, Value::memory(f), reg(f), Value::memory(f)),
            unit,
        )
        .with_operand_registers(vec![data.clone(), none]),
    );
}

/// One `$0++` per address register, each bound to that register.
fn address_increments(m: &mut MachineDescription, unit: usize, address: &RegisterSet) {
    for r in address.iter() {
        let only = RegisterSet::singleton(r);
        m.add_instruction(
            Instruction::new(
                "$0++",
                InstructionPattern::binary_right_constant(
                    OperationKind::Const,
                    OperationKind::Add,
                    reg(Datatype::Address),
                    reg(Datatype::Address),
                    Value::constant_slot(Datatype::Int),
                ),
                unit,
            )
            .with_result_registers(only.clone())
            .with_operand_registers(vec![only, RegisterSet::new()]),
        );
    }
}

/// Float add, multiply and both multiply-accumulate forms on `unit`.
fn multiply_accumulate(
    m: &mut MachineDescription,
    unit: usize,
    [add, mul]: [&str; 2],
    result: &RegisterSet,
    data: &RegisterSet,
    acc: &RegisterSet,
) {
    let f = Datatype::Float;
    m.add_instruction(binary(&format!("{add} $0, $1, $r"), OperationKind::Add, unit, f, result, [data, data]));
    m.add_instruction(binary(&format!("{mul} $0, $1, $r"), OperationKind::Mul, unit, f, result, [data, data]));
    m.add_instruction(
        Instruction::new(
            "MACF $0, $1, $2, $r",
            InstructionPattern::left_ternary(OperationKind::Mul, OperationKind::Add, reg(f), reg(f), reg(f), reg(f)),
            unit,
        )
        .with_result_registers(result.clone())
        .with_operand_registers(vec![data.clone(), data.clone(), acc.clone()]),
    );
    m.add_instruction(
        Instruction::new(
            "MACF $1, $2, $0, $r",
            InstructionPattern::right_ternary(OperationKind::Mul, OperationKind::Add, reg(f), reg(f), reg(f), reg(f)),
            unit,
        )
        .with_result_registers(result.clone())
        .with_operand_registers(vec![acc.clone(), data.clone(), data.clone()]),
    );
}

/// Six-unit floating point DSP.
///
/// Unit 0 adds, multiplies and multiply-accumulates, unit 1 adds, units 2
/// and 4 load, store and move, units 3 and 5 post-increment address
/// registers. Float data lives in `GR0..GR7`, addresses in `AR0..AR7`.
pub fn sample_dsp() -> MachineDescription {
    let mut m = MachineDescription::new(6);
    let gr = m.add_register_class("GR", 8, Datatype::Float);
    let ar = m.add_register_class("AR", 8, Datatype::Address);
    let f = Datatype::Float;

    multiply_accumulate(&mut m, 0, ["ADDF", "MULF"], &gr, &gr, &gr);
    m.add_instruction(binary("ADDF $0, $1, $r", OperationKind::Add, 1, f, &gr, [&gr, &gr]));

    for unit in [2, 4] {
        memory_access(&mut m, unit, ["LOADF", "STOREF"], &gr, &ar);
        m.add_instruction(transfer("MOVF $0, $r", unit, f, &gr, &gr));
    }
    for unit in [3, 5] {
        address_increments(&mut m, unit, &ar);
        m.add_instruction(transfer("MOVA $0, $r", unit, Datatype::Address, &ar, &ar));
    }
    m
}

/// Four-unit DSP addressing memory by name only.
///
/// Same arithmetic as [`sample_dsp`] over `GR0..GR15`; units 2 and 3 load
/// and store. There are no transfers, so every value stays in one class.
pub fn sample_dsp_direct() -> MachineDescription {
    let mut m = MachineDescription::new(4);
    let gr = m.add_register_class("GR", 16, Datatype::Float);
    let f = Datatype::Float;

    multiply_accumulate(&mut m, 0, ["ADDF", "MULF"], &gr, &gr, &gr);
    m.add_instruction(binary("ADDF $0, $1, $r", OperationKind::Add, 1, f, &gr, [&gr, &gr]));
    for unit in [2, 3] {
        memory_access(&mut m, unit, ["LOADF", "STOREF"], &gr, &RegisterSet::new());
    }
    m
}

/// Five-unit DSP with split X/Y memory banks.
///
/// Arithmetic on unit 0 writes the accumulators `A0..A3` and reads any of
/// `X`, `Y` and `A`. Unit 1 moves data between `X`/`A` and memory through
/// `R0..R3`, unit 2 between `Y`/`A` and memory through `R4..R7`. Both also
/// move registers. Units 3 and 4 post-increment address registers.
pub fn m56000_like_dsp() -> MachineDescription {
    let mut m = MachineDescription::new(5);
    let x = m.add_register_class("X", 4, Datatype::Float);
    let y = m.add_register_class("Y", 4, Datatype::Float);
    let a = m.add_register_class("A", 4, Datatype::Float);
    let r = m.add_register_class("R", 8, Datatype::Address);
    let rx: RegisterSet = r.iter().take(4).collect();
    let ry: RegisterSet = r.iter().skip(4).collect();
    let xa = x.union(&a);
    let ya = y.union(&a);
    let xya = xa.union(&y);

    multiply_accumulate(&mut m, 0, ["ADDF", "MPYF"], &a, &xya, &a);
    memory_access(&mut m, 1, ["LOADF", "STOREF"], &xa, &rx);
    memory_access(&mut m, 2, ["LOADF", "STOREF"], &ya, &ry);
    for unit in [1, 2] {
        m.add_instruction(transfer("MOVEF $0, $r", unit, Datatype::Float, &xya, &xya));
    }
    for unit in [1, 2] {
        m.add_instruction(transfer("MOVE $0, $r", unit, Datatype::Address, &r, &r));
    }
    for unit in [3, 4] {
        address_increments(&mut m, unit, &r);
    }
    m
}

/// Float add or multiply with every combination of register and
/// address-register-indirect operands.
fn indirect_arithmetic(
    m: &mut MachineDescription,
    mnemonic: &str,
    op: OperationKind,
    unit: usize,
    gr: &RegisterSet,
    ar: &RegisterSet,
) {
    let f = Datatype::Float;
    let addr = || reg(Datatype::Address);
    m.add_instruction(binary(&format!("{mnemonic} $0, $1, $r"), op, unit, f, gr, [gr, gr]));
    m.add_instruction(
        Instruction::new(
            format!("{mnemonic} *$0, $1, $r"),
            InstructionPattern::left_nested(OperationKind::Load, op, reg(f), addr(), reg(f), f),
            unit,
        )
        .with_result_registers(gr.clone())
        .with_operand_registers(vec![ar.clone(), gr.clone()]),
    );
    m.add_instruction(
        Instruction::new(
            format!("{mnemonic} $0, *$1, $r"),
            InstructionPattern::right_nested(OperationKind::Load, op, reg(f), reg(f), addr(), f),
            unit,
        )
        .with_result_registers(gr.clone())
        .with_operand_registers(vec![gr.clone(), ar.clone()]),
    );
    m.add_instruction(
        Instruction::new(
            format!("{mnemonic} *$0, *$1, $r"),
            InstructionPattern::both_nested(OperationKind::Load, OperationKind::Load, op, reg(f), addr(), addr(), f, f),
            unit,
        )
        .with_result_registers(gr.clone())
        .with_operand_registers(vec![ar.clone(), ar.clone()]),
    );
}

/// Eight-unit VLIW with two identical clusters.
///
/// Each cluster has an adder and a multiplier that may read operands
/// straight from memory, both of which also load, store and move, plus two
/// address increment units. All units share `GR0..GR15` and `AR0..AR15`.
pub fn c3x_like_vliw() -> MachineDescription {
    let mut m = MachineDescription::new(8);
    let gr = m.add_register_class("GR", 16, Datatype::Float);
    let ar = m.add_register_class("AR", 16, Datatype::Address);

    for base in [0, 4] {
        let (adder, multiplier) = (base, base + 1);
        indirect_arithmetic(&mut m, "ADDF", OperationKind::Add, adder, &gr, &ar);
        indirect_arithmetic(&mut m, "MPYF", OperationKind::Mul, multiplier, &gr, &ar);
        for unit in [adder, multiplier] {
            memory_access(&mut m, unit, ["LDF", "STF"], &gr, &ar);
            m.add_instruction(transfer("LDF $0, $r", unit, Datatype::Float, &gr, &gr));
            m.add_instruction(transfer("LDI $0, $r", unit, Datatype::Address, &ar, &ar));
        }
        for unit in [base + 2, base + 3] {
            address_increments(&mut m, unit, &ar);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use evocg_ir::validate_machine;

    #[test]
    fn test_samples_are_valid() {
        for sample in [
            SampleMachine::SingleAdd,
            SampleMachine::TwoUnit,
            SampleMachine::Cyclic,
            SampleMachine::SampleDsp,
            SampleMachine::SampleDspDirect,
            SampleMachine::M56000,
            SampleMachine::C3xVliw,
        ] {
            let machine = sample.build();
            assert!(validate_machine(&machine).is_ok(), "{sample} is invalid");
        }
    }

    #[test]
    fn test_sample_dsp_layout() {
        let m = sample_dsp();
        assert_eq!(m.execution_units, 6);
        assert_eq!(m.registers.len(), 16);
        assert_eq!(m.register(evocg_core::RegisterId(8)).mnemonic, "AR0");

        // MOVF on both load/store units, MOVA on both address units.
        assert_eq!(m.transfer_instructions().len(), 4);

        let increments = m.instructions.iter().filter(|i| i.mnemonic == "$0++").count();
        assert_eq!(increments, 16);
        assert!(m
            .instructions
            .iter()
            .filter(|i| i.mnemonic == "$0++")
            .all(|i| i.result_registers.len() == 1 && i.result_registers == i.operand_registers[0]));
    }

    #[test]
    fn test_cyclic_machine_classes_are_disjoint() {
        let m = cyclic_machine();
        let add = &m.instructions[0];
        assert!(!add.result_registers.intersects(add.operand_registers(0)));
        assert_eq!(m.transfer_instructions().len(), 2);
        assert!(single_add_machine().transfer_instructions().is_empty());
    }

    #[test]
    fn test_m56000_banks() {
        let m = m56000_like_dsp();
        assert_eq!(m.execution_units, 5);
        assert_eq!(m.registers.len(), 20);

        // Arithmetic only writes accumulators.
        for i in m.instructions.iter().filter(|i| i.execution_unit == 0) {
            assert_eq!(m.format_registers(&i.result_registers), "{A0, A1, A2, A3}");
        }

        // Each bank is reached through its own half of the address registers.
        let indirect_loads: Vec<_> = m.instructions.iter().filter(|i| i.mnemonic == "LOADF *$0, $r").collect();
        assert_eq!(indirect_loads.len(), 2);
        assert_eq!(m.format_registers(indirect_loads[0].operand_registers(0)), "{R0, R1, R2, R3}");
        assert_eq!(m.format_registers(&indirect_loads[0].result_registers), "{X0, X1, X2, X3, A0, A1, A2, A3}");
        assert_eq!(m.format_registers(indirect_loads[1].operand_registers(0)), "{R4, R5, R6, R7}");
        assert_eq!(m.transfer_instructions().len(), 4);
    }

    #[test]
    fn test_c3x_clusters_mirror_each_other() {
        let m = c3x_like_vliw();
        assert_eq!(m.execution_units, 8);
        let on = |unit| -> Vec<&str> {
            m.instructions
                .iter()
                .filter(|i| i.execution_unit == unit)
                .map(|i| i.mnemonic.as_str())
                .collect()
        };
        for unit in 0..4 {
            assert_eq!(on(unit), on(unit + 4));
        }
        assert!(on(0).contains(&"ADDF *$0, *$1, $r"));
        assert!(on(1).contains(&"MPYF $0, *$1, $r"));
        assert_eq!(on(2).len(), 16);
        assert_eq!(m.transfer_instructions().len(), 8);
    }

    #[test]
    fn test_direct_dsp_has_no_address_forms() {
        let m = sample_dsp_direct();
        assert!(m.transfer_instructions().is_empty());
        assert!(m.instructions.iter().all(|i| !i.mnemonic.contains('*')));
        assert_eq!(m.instructions.iter().filter(|i| i.execution_unit >= 2).count(), 4);
    }

    #[test]
    fn test_sample_machine_names() {
        let parsed: SampleMachine = serde_json::from_str("\"sample_dsp\"").unwrap();
        assert_eq!(parsed, SampleMachine::SampleDsp);
        assert_eq!(SampleMachine::TwoUnit.to_string(), "two_unit");
        for sample in [SampleMachine::M56000, SampleMachine::C3xVliw, SampleMachine::SampleDspDirect] {
            let json = serde_json::to_string(&sample).unwrap();
            assert_eq!(json, format!("\"{sample}\""));
        }
    }
}
