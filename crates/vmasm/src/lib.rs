//! # vmasm: Two-Pass Assembler for a Small Register VM
//!
//! `vmasm` turns line-oriented assembly text into the byte stream executed
//! by a compact 16-bit register virtual machine. Opcodes are selected from
//! the exact sequence of operand kinds, and label references are resolved
//! in a second pass so forward references work.
//!
//! ## Quick Start
//!
//! ```rust
//! use vmasm::assemble;
//!
//! let code = assemble("mov r1, r2\nmov r1, 255\nmov r1, 256").unwrap();
//! assert_eq!(code, vec![0x20, 0, 1, 0x23, 0, 0xFF, 0x48, 0, 0x01, 0x00]);
//! ```
//!
//! ## Source Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `name:` | declare a label for the next instruction |
//! | `name: mov r1, r2` | label and instruction on one line |
//! | `r<n>` | register, 1-based (`r1` is encoded as `0`) |
//! | `<number>` | immediate; one byte if it fits `0..=255`, else two |
//! | `[<operand>]` | memory indirection, nestable |
//! | `@<name>` | label reference, two bytes big-endian |
//! | `; ...` | comment |
//!
//! ## Features
//!
//! - **`no_std` + `alloc`**: the core has no OS dependencies.
//! - **Static instruction sets**: [`InstructionSet::REFERENCE`] (`mov`) and
//!   [`InstructionSet::EXTENDED`] (the full VM opcode map), or your own.
//! - **`serde`**: optional serialization of the IR and results.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// Operand encoding narrows register indices and immediates to bytes on
// purpose; opcode tables use dense hex literals.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::unreadable_literal,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::return_self_not_must_use
)]

extern crate alloc;

/// Public assembler API: builder pattern, one-shot assembly, and `AssemblyResult`.
pub mod assembler;
/// Error types and source-span diagnostics.
pub mod error;
/// Intermediate representation: operands and instructions.
pub mod ir;
/// Instruction sets: per-mnemonic opcode tables.
pub mod isa;
/// Label table keyed by name, pointing into the instruction arena.
pub mod labels;
/// Line parser and operand recognizers.
pub mod parser;
/// Program arena and the two assembly passes.
pub mod program;

// Re-exports
pub use assembler::{Assembler, AssemblyResult, ResourceLimits};
pub use error::{AsmError, Span};
pub use ir::{Instruction, Operand, OperandKind};
pub use isa::{Family, Form, InstructionSet};
pub use labels::{DuplicateLabelPolicy, InstrId, LabelTable};
pub use program::{Program, ProgramBuilder};

use alloc::vec::Vec;

/// Assemble source text against [`InstructionSet::REFERENCE`].
///
/// # Errors
///
/// Returns [`AsmError`] if an operand is malformed, a mnemonic or operand
/// combination has no opcode, or a label reference cannot be resolved.
///
/// # Examples
///
/// ```rust
/// use vmasm::assemble;
///
/// let code = assemble("mov r1, [r2]\nmov [r2], r1").unwrap();
/// assert_eq!(code, vec![0x21, 0, 1, 0x22, 1, 0]);
/// ```
pub fn assemble(source: &str) -> Result<Vec<u8>, AsmError> {
    assemble_at(source, &InstructionSet::REFERENCE, 0)
}

/// Assemble source text against `isa`.
///
/// # Errors
///
/// Returns [`AsmError`] on assembly failure (see [`assemble`] for details).
///
/// # Examples
///
/// ```rust
/// use vmasm::{assemble_with, InstructionSet};
///
/// let code = assemble_with("top: inc r1\njmp @top", &InstructionSet::EXTENDED).unwrap();
/// assert_eq!(code, vec![0x10, 0, 0x2B, 0, 0]);
/// ```
pub fn assemble_with(source: &str, isa: &'static InstructionSet) -> Result<Vec<u8>, AsmError> {
    assemble_at(source, isa, 0)
}

/// Assemble with the first instruction placed at `base_addr`.
///
/// # Errors
///
/// Returns [`AsmError`] on assembly failure (see [`assemble`] for details).
///
/// # Examples
///
/// ```rust
/// use vmasm::{assemble_at, InstructionSet};
///
/// let code = assemble_at("jmp @here\nhere: ret", &InstructionSet::EXTENDED, 0x200).unwrap();
/// assert_eq!(code, vec![0x2B, 0x02, 0x03, 0x02]);
/// ```
pub fn assemble_at(
    source: &str,
    isa: &'static InstructionSet,
    base_addr: u64,
) -> Result<Vec<u8>, AsmError> {
    let mut asm = Assembler::new();
    asm.instruction_set(isa);
    asm.base_address(base_addr);
    asm.emit(source)?;
    let result = asm.finish()?;
    Ok(result.into_bytes())
}
