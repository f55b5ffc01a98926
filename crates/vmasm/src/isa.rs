//! Static opcode tables and mnemonic resolution.
//!
//! An [`InstructionSet`] is a list of [`Family`] entries, one per mnemonic.
//! Each family declares its accepted operand count and maps exact
//! operand-kind sequences ([`Form`]s) to opcode bytes. Tables are plain
//! constant data; the resolver never coerces one operand kind into another.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{AsmError, Span};
use crate::ir::{Operand, OperandKind};

use crate::ir::OperandKind::{
    Immediate16 as Imm16, Immediate8 as Imm8, Label, Memory as Mem, Register as Reg,
};

/// One opcode table entry: an exact operand-kind sequence and its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Form {
    /// Operand kinds, in source order.
    pub kinds: &'static [OperandKind],
    /// Opcode byte emitted for this form.
    pub opcode: u8,
}

impl Form {
    /// Create a table entry.
    #[must_use]
    pub const fn new(kinds: &'static [OperandKind], opcode: u8) -> Self {
        Self { kinds, opcode }
    }
}

/// All encodings of one mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Family {
    /// The mnemonic, matched exactly.
    pub mnemonic: &'static str,
    /// Fewest operands accepted.
    pub min_operands: usize,
    /// Most operands accepted.
    pub max_operands: usize,
    /// Opcode table.
    pub forms: &'static [Form],
}

impl Family {
    /// Create a family accepting between `min_operands` and `max_operands`.
    #[must_use]
    pub const fn new(
        mnemonic: &'static str,
        min_operands: usize,
        max_operands: usize,
        forms: &'static [Form],
    ) -> Self {
        Self {
            mnemonic,
            min_operands,
            max_operands,
            forms,
        }
    }

    /// Look up the opcode for an exact operand-kind sequence.
    #[must_use]
    pub fn opcode_for(&self, kinds: &[OperandKind]) -> Option<u8> {
        self.forms
            .iter()
            .find(|form| form.kinds == kinds)
            .map(|form| form.opcode)
    }
}

/// A set of instruction families the parser may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSet {
    families: &'static [Family],
}

impl Default for InstructionSet {
    fn default() -> Self {
        Self::REFERENCE
    }
}

impl InstructionSet {
    /// The `mov` family only.
    pub const REFERENCE: InstructionSet = InstructionSet {
        families: REFERENCE_FAMILIES,
    };

    /// The complete VM instruction set: control, stack, arithmetic, jumps
    /// and `mov`.
    pub const EXTENDED: InstructionSet = InstructionSet {
        families: EXTENDED_FAMILIES,
    };

    /// Build a set from a caller-provided table.
    #[must_use]
    pub const fn new(families: &'static [Family]) -> Self {
        Self { families }
    }

    /// The families in this set.
    #[must_use]
    pub fn families(&self) -> &'static [Family] {
        self.families
    }

    /// Find the family registered for `mnemonic`.
    #[must_use]
    pub fn family(&self, mnemonic: &str) -> Option<&'static Family> {
        self.families.iter().find(|f| f.mnemonic == mnemonic)
    }

    /// Select the opcode byte for `mnemonic` applied to `operands`.
    ///
    /// # Errors
    ///
    /// - [`AsmError::UnknownMnemonic`] if no family is registered,
    /// - [`AsmError::ArityOutOfRange`] if the operand count is outside the
    ///   family's range,
    /// - [`AsmError::UnknownOpcode`] if no form matches the exact kinds.
    pub fn resolve_opcode(
        &self,
        mnemonic: &str,
        operands: &[Operand],
        span: Span,
    ) -> Result<u8, AsmError> {
        let kinds: Vec<OperandKind> = operands.iter().map(Operand::kind).collect();
        self.resolve_kinds(mnemonic, &kinds, span)
    }

    /// Like [`InstructionSet::resolve_opcode`], keyed on kinds directly.
    ///
    /// # Errors
    ///
    /// See [`InstructionSet::resolve_opcode`].
    pub fn resolve_kinds(
        &self,
        mnemonic: &str,
        kinds: &[OperandKind],
        span: Span,
    ) -> Result<u8, AsmError> {
        let family = self
            .family(mnemonic)
            .ok_or_else(|| AsmError::UnknownMnemonic {
                mnemonic: String::from(mnemonic),
                span,
            })?;

        if kinds.len() < family.min_operands || kinds.len() > family.max_operands {
            return Err(AsmError::ArityOutOfRange {
                mnemonic: String::from(mnemonic),
                count: kinds.len(),
                min: family.min_operands,
                max: family.max_operands,
                span,
            });
        }

        family
            .opcode_for(kinds)
            .ok_or_else(|| AsmError::UnknownOpcode {
                mnemonic: String::from(mnemonic),
                kinds: kinds.to_vec(),
                span,
            })
    }
}

// ─── Tables ────────────────────────────────────────────────

/// `forms![[Reg, Reg] => 0x20, ...]` expands to a `&'static [Form]`.
macro_rules! forms {
    ($([$($kind:ident),*] => $opcode:expr),* $(,)?) => {
        &[$(Form { kinds: &[$($kind),*], opcode: $opcode }),*]
    };
}

const MOV: Family = Family::new(
    "mov",
    2,
    2,
    forms![
        [Reg, Reg] => 0x20,
        [Reg, Mem] => 0x21,
        [Mem, Reg] => 0x22,
        [Reg, Imm8] => 0x23,
        [Reg, Imm16] => 0x48,
    ],
);

const REFERENCE_FAMILIES: &[Family] = &[MOV];

const fn bare(mnemonic: &'static str, forms: &'static [Form]) -> Family {
    Family::new(mnemonic, 0, 0, forms)
}

const fn unary(mnemonic: &'static str, forms: &'static [Form]) -> Family {
    Family::new(mnemonic, 1, 1, forms)
}

const fn binary(mnemonic: &'static str, forms: &'static [Form]) -> Family {
    Family::new(mnemonic, 2, 2, forms)
}

// The VM decodes operand bytes from the opcode range:
// 0x00-0x0F none, 0x10-0x1F one, 0x20-0x3F two, 0x40-0x4F three.
const EXTENDED_FAMILIES: &[Family] = &[
    bare("nop", forms![[] => 0x01]),
    bare("ret", forms![[] => 0x02]),
    bare("reti", forms![[] => 0x03]),
    bare("cli", forms![[] => 0x04]),
    bare("sti", forms![[] => 0x05]),
    bare("hlt", forms![[] => 0x06]),
    unary("inc", forms![[Reg] => 0x10]),
    unary("dec", forms![[Reg] => 0x11]),
    unary("push", forms![[Reg] => 0x12]),
    unary("pop", forms![[Reg] => 0x13]),
    MOV,
    binary("and", forms![[Reg, Reg] => 0x24, [Reg, Imm16] => 0x41]),
    binary("or", forms![[Reg, Reg] => 0x25, [Reg, Imm16] => 0x42]),
    binary("xor", forms![[Reg, Reg] => 0x26, [Reg, Imm16] => 0x43]),
    binary("mul", forms![[Reg, Reg] => 0x27]),
    binary("div", forms![[Reg, Reg] => 0x28]),
    binary("add", forms![[Reg, Reg] => 0x29, [Reg, Imm16] => 0x44]),
    binary("sub", forms![[Reg, Reg] => 0x2A, [Reg, Imm16] => 0x45]),
    unary("jmp", forms![[Label] => 0x2B]),
    unary("call", forms![[Label] => 0x2C]),
    unary("je", forms![[Label] => 0x2D]),
    unary("jne", forms![[Label] => 0x2E]),
    unary("jo", forms![[Label] => 0x2F]),
    unary("jno", forms![[Label] => 0x30]),
    binary(
        "cmp",
        forms![[Reg, Reg] => 0x31, [Reg, Imm8] => 0x32, [Reg, Imm16] => 0x46],
    ),
    binary("lpm", forms![[Reg, Label] => 0x40]),
    binary("int", forms![[Imm8, Label] => 0x47]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec;

    fn span() -> Span {
        Span::new(1, 1, 0, 0)
    }

    fn kinds_of(ops: &[Operand]) -> Vec<OperandKind> {
        ops.iter().map(Operand::kind).collect()
    }

    #[test]
    fn reference_mov_table() {
        let isa = InstructionSet::REFERENCE;
        let cases: [(&[OperandKind], u8); 5] = [
            (&[Reg, Reg], 0x20),
            (&[Reg, Mem], 0x21),
            (&[Mem, Reg], 0x22),
            (&[Reg, Imm8], 0x23),
            (&[Reg, Imm16], 0x48),
        ];
        for (kinds, opcode) in cases {
            assert_eq!(isa.resolve_kinds("mov", kinds, span()), Ok(opcode));
        }
    }

    #[test]
    fn reference_set_has_only_mov() {
        assert_eq!(InstructionSet::REFERENCE.families().len(), 1);
        assert_eq!(InstructionSet::default(), InstructionSet::REFERENCE);
        let err = InstructionSet::REFERENCE
            .resolve_kinds("jmp", &[Label], span())
            .unwrap_err();
        assert!(matches!(err, AsmError::UnknownMnemonic { ref mnemonic, .. } if mnemonic == "jmp"));
    }

    #[test]
    fn immediate16_never_matches_immediate8_slot() {
        let err = InstructionSet::EXTENDED
            .resolve_kinds("int", &[Imm16, Label], span())
            .unwrap_err();
        assert!(matches!(err, AsmError::UnknownOpcode { .. }));
    }

    #[test]
    fn reversed_operands_are_unknown_opcode() {
        let ops = [Operand::Immediate8(5), Operand::Register(1)];
        let err = InstructionSet::REFERENCE
            .resolve_opcode("mov", &ops, span())
            .unwrap_err();
        match err {
            AsmError::UnknownOpcode { mnemonic, kinds, .. } => {
                assert_eq!(mnemonic, "mov");
                assert_eq!(kinds, vec![Imm8, Reg]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn arity_is_checked_before_forms() {
        let isa = InstructionSet::REFERENCE;
        for ops in [
            vec![Operand::Register(1)],
            vec![Operand::Register(1), Operand::Register(2), Operand::Register(3)],
            vec![],
        ] {
            let err = isa.resolve_opcode("mov", &ops, span()).unwrap_err();
            assert!(
                matches!(err, AsmError::ArityOutOfRange { count, min: 2, max: 2, .. } if count == ops.len()),
                "{:?}",
                kinds_of(&ops)
            );
        }
    }

    #[test]
    fn memory_wrapping_any_kind_is_memory() {
        let ops = [
            Operand::Register(1),
            Operand::Memory(Box::new(Operand::Label("x".into()))),
        ];
        assert_eq!(
            InstructionSet::REFERENCE.resolve_opcode("mov", &ops, span()),
            Ok(0x21)
        );
    }

    #[test]
    fn mnemonics_are_case_sensitive() {
        let err = InstructionSet::REFERENCE
            .resolve_kinds("MOV", &[Reg, Reg], span())
            .unwrap_err();
        assert!(matches!(err, AsmError::UnknownMnemonic { .. }));
    }

    #[test]
    fn extended_opcodes_follow_vm_operand_ranges() {
        for family in InstructionSet::EXTENDED.families() {
            for form in family.forms {
                let operand_bytes: usize = form
                    .kinds
                    .iter()
                    .map(|k| match k {
                        Reg | Imm8 => 1,
                        Imm16 | Label => 2,
                        Mem => 1,
                    })
                    .sum();
                let expected = match form.opcode {
                    0x00..=0x0F => 0,
                    0x10..=0x1F => 1,
                    0x20..=0x3F => 2,
                    _ => 3,
                };
                assert_eq!(
                    operand_bytes, expected,
                    "{} {:02X}",
                    family.mnemonic, form.opcode
                );
            }
        }
    }

    #[test]
    fn declared_arity_covers_every_form() {
        for isa in [InstructionSet::REFERENCE, InstructionSet::EXTENDED] {
            for family in isa.families() {
                for form in family.forms {
                    assert!(form.kinds.len() >= family.min_operands);
                    assert!(form.kinds.len() <= family.max_operands);
                }
            }
        }
    }

    #[test]
    fn extended_mnemonics_are_unique() {
        let families = InstructionSet::EXTENDED.families();
        for (i, a) in families.iter().enumerate() {
            for b in &families[i + 1..] {
                assert_ne!(a.mnemonic, b.mnemonic);
            }
        }
    }

    #[test]
    fn extended_control_and_jumps() {
        let isa = InstructionSet::EXTENDED;
        assert_eq!(isa.resolve_kinds("hlt", &[], span()), Ok(0x06));
        assert_eq!(isa.resolve_kinds("jne", &[Label], span()), Ok(0x2E));
        assert_eq!(isa.resolve_kinds("cmp", &[Reg, Imm8], span()), Ok(0x32));
        assert_eq!(isa.resolve_kinds("cmp", &[Reg, Imm16], span()), Ok(0x46));
        assert_eq!(isa.resolve_kinds("mov", &[Reg, Imm16], span()), Ok(0x48));
        let err = isa.resolve_kinds("nop", &[Reg], span()).unwrap_err();
        assert!(matches!(err, AsmError::ArityOutOfRange { min: 0, max: 0, .. }));
    }

    #[test]
    fn custom_instruction_set() {
        const LD: Form = Form::new(&[Reg], 0x90);
        const LD_MEM: Form = Form::new(&[Reg, Mem], 0x91);
        static CUSTOM: &[Family] = &[Family::new("ld", 1, 2, &[LD, LD_MEM])];
        let isa = InstructionSet::new(CUSTOM);
        assert_eq!(isa.resolve_kinds("ld", &[Reg], span()), Ok(0x90));
        assert_eq!(isa.resolve_kinds("ld", &[Reg, Mem], span()), Ok(0x91));
        let err = isa.resolve_kinds("ld", &[], span()).unwrap_err();
        assert!(matches!(err, AsmError::ArityOutOfRange { min: 1, max: 2, .. }));
    }
}
