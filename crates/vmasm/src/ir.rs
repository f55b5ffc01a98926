//! Intermediate representation types for the assembly pipeline.
//!
//! These types represent the structured output of the parser and serve
//! as input to the two assembly passes.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{AsmError, Span};
use crate::isa::InstructionSet;

/// The variant tag of an operand.
///
/// Opcode selection matches on the exact sequence of kinds: an
/// [`OperandKind::Immediate16`] never satisfies a slot declared for
/// [`OperandKind::Immediate8`], even though the value could be narrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperandKind {
    /// `r<n>`
    Register,
    /// A numeric literal that fits an unsigned byte.
    Immediate8,
    /// Any other numeric literal.
    Immediate16,
    /// `[<operand>]`
    Memory,
    /// `@<name>`
    Label,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Register => write!(f, "register"),
            OperandKind::Immediate8 => write!(f, "imm8"),
            OperandKind::Immediate16 => write!(f, "imm16"),
            OperandKind::Memory => write!(f, "memory"),
            OperandKind::Label => write!(f, "label"),
        }
    }
}

/// A parsed instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// A register, by its 1-based source index.
    Register(i64),
    /// A literal in `0..=255`.
    Immediate8(u8),
    /// A literal that did not fit a byte. Encoded as its low 16 bits.
    Immediate16(i64),
    /// A memory indirection around another operand.
    Memory(Box<Operand>),
    /// A label reference, resolved during encoding.
    Label(String),
}

impl Operand {
    /// The operand's kind, used as the opcode-table key.
    #[must_use]
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Register(_) => OperandKind::Register,
            Operand::Immediate8(_) => OperandKind::Immediate8,
            Operand::Immediate16(_) => OperandKind::Immediate16,
            Operand::Memory(_) => OperandKind::Memory,
            Operand::Label(_) => OperandKind::Label,
        }
    }

    /// Encoded size in bytes.
    ///
    /// Known without resolving labels: a label reference is always two
    /// bytes, and an indirection is as long as the operand it wraps.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Operand::Register(_) | Operand::Immediate8(_) => 1,
            Operand::Immediate16(_) | Operand::Label(_) => 2,
            Operand::Memory(inner) => inner.byte_len(),
        }
    }

    /// Append the encoded bytes to `out`.
    ///
    /// `resolve` maps a label name to its address; it is only called for
    /// label references (including ones nested in indirections).
    ///
    /// # Errors
    ///
    /// Propagates whatever `resolve` returns for an unresolvable label.
    pub fn encode_into<F>(&self, out: &mut Vec<u8>, resolve: &F) -> Result<(), AsmError>
    where
        F: Fn(&str) -> Result<u64, AsmError>,
    {
        match self {
            // Source registers are 1-based, the VM's are 0-based.
            Operand::Register(n) => out.push(n.wrapping_sub(1) as u8),
            Operand::Immediate8(v) => out.push(*v),
            Operand::Immediate16(v) => out.extend_from_slice(&[(v >> 8) as u8, *v as u8]),
            Operand::Memory(inner) => inner.encode_into(out, resolve)?,
            Operand::Label(name) => {
                let addr = resolve(name)?;
                out.extend_from_slice(&[(addr >> 8) as u8, addr as u8]);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(n) => write!(f, "r{}", n),
            Operand::Immediate8(v) => write!(f, "{}", v),
            Operand::Immediate16(v) => write!(f, "{}", v),
            Operand::Memory(inner) => write!(f, "[{}]", inner),
            Operand::Label(name) => write!(f, "@{}", name),
        }
    }
}

/// A parsed instruction with its opcode already selected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// Instruction mnemonic, e.g. `"mov"`.
    pub mnemonic: String,
    /// Opcode byte chosen from the operand-kind sequence.
    pub opcode: u8,
    /// Parsed operands, in source order.
    pub operands: Vec<Operand>,
    /// Byte address of the opcode, assigned by pass 1.
    pub location: Option<u64>,
    /// Source location of the instruction.
    pub span: Span,
}

impl Instruction {
    /// Build an instruction, selecting its opcode from `isa`.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::UnknownMnemonic`], [`AsmError::ArityOutOfRange`]
    /// or [`AsmError::UnknownOpcode`] when `isa` has no form for the
    /// mnemonic and operand kinds.
    pub fn new(
        mnemonic: &str,
        operands: Vec<Operand>,
        isa: &InstructionSet,
    ) -> Result<Self, AsmError> {
        Self::with_span(mnemonic, operands, isa, Span::dummy())
    }

    /// Like [`Instruction::new`], recording the source location.
    ///
    /// # Errors
    ///
    /// See [`Instruction::new`].
    pub fn with_span(
        mnemonic: &str,
        operands: Vec<Operand>,
        isa: &InstructionSet,
        span: Span,
    ) -> Result<Self, AsmError> {
        let opcode = isa.resolve_opcode(mnemonic, &operands, span)?;
        Ok(Self {
            mnemonic: String::from(mnemonic),
            opcode,
            operands,
            location: None,
            span,
        })
    }

    /// Operand kinds in source order.
    #[must_use]
    pub fn kinds(&self) -> Vec<OperandKind> {
        self.operands.iter().map(Operand::kind).collect()
    }

    /// Encoded size: one opcode byte plus every operand's bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        1 + self.operands.iter().map(Operand::byte_len).sum::<usize>()
    }

    /// Append `[opcode] ++ operands` to `out`.
    ///
    /// # Errors
    ///
    /// Propagates label resolution failures from `resolve`.
    pub fn encode_into<F>(&self, out: &mut Vec<u8>, resolve: &F) -> Result<(), AsmError>
    where
        F: Fn(&str) -> Result<u64, AsmError>,
    {
        out.push(self.opcode);
        for operand in &self.operands {
            operand.encode_into(out, resolve)?;
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " {}", operand)?;
            } else {
                write!(f, ", {}", operand)?;
            }
        }
        Ok(())
    }
}
