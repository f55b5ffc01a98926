//! Serde round-trip tests for `vmasm` IR and result types.
//!
//! Validates that all public serializable types serialize to JSON and
//! deserialize back to identical values.

#![cfg(feature = "serde")]

use vmasm::{
    AsmError, Assembler, DuplicateLabelPolicy, Instruction, InstructionSet, Operand, OperandKind,
    Program, ResourceLimits, Span,
};

/// Helper: serialize to JSON, deserialize back, assert equality.
fn round_trip<T>(val: &T)
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + core::fmt::Debug,
{
    let json = serde_json::to_string(val).expect("serialize");
    let back: T = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(val, &back, "round-trip mismatch for JSON: {json}");
}

// ─── Span ───────────────────────────────────────────────────────────────────

#[test]
fn serde_span() {
    round_trip(&Span::new(1, 5, 10, 3));
    round_trip(&Span::default());
}

// ─── Operands ───────────────────────────────────────────────────────────────

#[test]
fn serde_operand_kind() {
    for kind in [
        OperandKind::Register,
        OperandKind::Immediate8,
        OperandKind::Immediate16,
        OperandKind::Memory,
        OperandKind::Label,
    ] {
        round_trip(&kind);
    }
}

#[test]
fn serde_operand() {
    round_trip(&Operand::Register(16));
    round_trip(&Operand::Immediate8(255));
    round_trip(&Operand::Immediate16(-300));
    round_trip(&Operand::Label("loop".into()));
    round_trip(&Operand::Memory(Box::new(Operand::Memory(Box::new(
        Operand::Label("table".into()),
    )))));
}

// ─── Instructions ───────────────────────────────────────────────────────────

#[test]
fn serde_instruction_parsed() {
    let mut program = Program::parse("start: mov r1, [@start]\nmov [r2], r1").unwrap();
    program.pass1();
    for instr in program.instructions() {
        round_trip(instr);
    }
}

#[test]
fn serde_instruction_built() {
    let instr = Instruction::new(
        "int",
        vec![Operand::Immediate8(3), Operand::Label("isr".into())],
        &InstructionSet::EXTENDED,
    )
    .unwrap();
    round_trip(&instr);
}

// ─── Labels ─────────────────────────────────────────────────────────────────

#[test]
fn serde_duplicate_label_policy() {
    round_trip(&DuplicateLabelPolicy::Overwrite);
    round_trip(&DuplicateLabelPolicy::Reject);
}

#[test]
fn serde_instr_id() {
    let mut program = Program::new();
    let instr = Instruction::new(
        "mov",
        vec![Operand::Register(1), Operand::Register(2)],
        &InstructionSet::REFERENCE,
    )
    .unwrap();
    program.push(instr.clone());
    let id = program.push(instr);
    assert_eq!(id.index(), 1);
    round_trip(&id);
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[test]
fn serde_asm_error() {
    let span = Span::new(3, 1, 20, 9);
    let errors = [
        AsmError::InvalidOperand {
            token: "%x".into(),
            span,
        },
        AsmError::UnknownMnemonic {
            mnemonic: "jump".into(),
            span,
        },
        AsmError::UnknownOpcode {
            mnemonic: "mov".into(),
            kinds: vec![OperandKind::Immediate8, OperandKind::Register],
            span,
        },
        AsmError::ArityOutOfRange {
            mnemonic: "mov".into(),
            count: 3,
            min: 2,
            max: 2,
            span,
        },
        AsmError::UndefinedLabel {
            label: "end".into(),
            span,
        },
        AsmError::DuplicateLabel {
            label: "end".into(),
            span,
            first_span: Span::new(1, 1, 0, 4),
        },
        AsmError::UnplacedLabel {
            label: "end".into(),
            span,
        },
        AsmError::ResourceLimitExceeded {
            resource: "instructions".into(),
            limit: 10,
        },
    ];
    for err in &errors {
        round_trip(err);
    }
}

// ─── Assembler ──────────────────────────────────────────────────────────────

#[test]
fn serde_resource_limits() {
    round_trip(&ResourceLimits::default());
    round_trip(&ResourceLimits {
        max_source_bytes: 1,
        max_instructions: 2,
        max_labels: 3,
        max_output_bytes: 4,
    });
}

#[test]
fn serde_assembly_result() {
    let mut asm = Assembler::new();
    asm.enable_listing()
        .base_address(0x100)
        .emit("top: mov r1, 300\nmov r2, [@top]")
        .unwrap();
    let result = asm.finish().unwrap();
    round_trip(&result);

    let json = serde_json::to_string(&result).unwrap();
    let back: vmasm::AssemblyResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.listing(), result.listing());
}
