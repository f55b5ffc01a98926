//! Public assembler API: builder pattern and one-shot assembly.
//!
//! This module ties the line parser and the two-pass [`Program`] together
//! into a fluent API with resource limits and an optional listing.

use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::error::AsmError;
use crate::isa::InstructionSet;
use crate::labels::DuplicateLabelPolicy;
use crate::parser;
use crate::program::{Program, ProgramBuilder};

/// The result of a successful assembly operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[must_use]
pub struct AssemblyResult {
    /// The assembled byte stream.
    bytes: Vec<u8>,
    /// Label addresses (name → absolute address), in name order.
    labels: Vec<(String, u64)>,
    /// Address of the first byte.
    base_address: u64,
    /// `(address, instruction text)` per instruction, when listing is enabled.
    source_annotations: Vec<(u64, String)>,
}

impl AssemblyResult {
    /// Get the assembled bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use vmasm::Assembler;
    ///
    /// let mut asm = Assembler::new();
    /// asm.emit("mov r1, r2")?;
    /// let result = asm.finish()?;
    /// assert_eq!(result.bytes(), &[0x20, 0x00, 0x01]);
    /// # Ok::<(), vmasm::AsmError>(())
    /// ```
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume and return the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of assembled bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was assembled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// All labels with their absolute addresses, in name order.
    #[must_use]
    pub fn labels(&self) -> &[(String, u64)] {
        &self.labels
    }

    /// Look up one label's address.
    ///
    /// # Examples
    ///
    /// ```
    /// use vmasm::Assembler;
    ///
    /// let mut asm = Assembler::new();
    /// asm.base_address(0x100);
    /// asm.emit("mov r1, 1000\nnext: mov r1, r1")?;
    /// let result = asm.finish()?;
    /// assert_eq!(result.label_address("next"), Some(0x104));
    /// assert_eq!(result.label_address("other"), None);
    /// # Ok::<(), vmasm::AsmError>(())
    /// ```
    #[must_use]
    pub fn label_address(&self, name: &str) -> Option<u64> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|(_, addr)| *addr)
    }

    /// Address of the first byte.
    #[must_use]
    pub fn base_address(&self) -> u64 {
        self.base_address
    }

    /// Produce a human-readable listing of address, hex bytes and source.
    ///
    /// Labels are shown on their own line with their resolved address. With
    /// [`Assembler::enable_listing`] each instruction gets its own row;
    /// otherwise bytes are shown in rows of up to 8.
    ///
    /// # Example output
    ///
    /// ```text
    /// 0000          loop:
    /// 0000  1100    dec r1
    /// 0002  320000  cmp r1, 0
    /// 0005  2E0000  jne @loop
    /// ```
    #[must_use]
    pub fn listing(&self) -> String {
        use alloc::collections::{BTreeMap, BTreeSet};
        use core::fmt::Write;

        let mut out = String::new();
        let base = self.base_address;

        let mut label_at: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
        for (name, addr) in &self.labels {
            label_at.entry(*addr).or_default().push(name);
        }
        let source_at: BTreeMap<u64, &str> = self
            .source_annotations
            .iter()
            .map(|(addr, text)| (*addr, text.as_str()))
            .collect();

        // A row never spans a label or the start of another instruction.
        let splits: BTreeSet<u64> = label_at.keys().chain(source_at.keys()).copied().collect();

        let mut addr = base;
        let mut i = 0;
        while i < self.bytes.len() {
            if let Some(names) = label_at.get(&addr) {
                for name in names {
                    let _ = writeln!(out, "{:04X}          {}:", addr, name);
                }
            }

            let mut end = core::cmp::min(i + 8, self.bytes.len());
            let next = addr.wrapping_add(1);
            let row_end = addr.wrapping_add((end - i) as u64);
            // Rows that wrap the address space are never split.
            if next > addr && row_end > next {
                if let Some(&split) = splits.range(next..row_end).next() {
                    end = i + (split - addr) as usize;
                }
            }

            let hex = self.bytes[i..end]
                .iter()
                .fold(String::new(), |mut acc, b| {
                    let _ = write!(acc, "{:02X}", b);
                    acc
                });
            match source_at.get(&addr) {
                Some(text) => {
                    let _ = writeln!(out, "{:04X}  {:<6}  {}", addr, hex, text);
                }
                None => {
                    let _ = writeln!(out, "{:04X}  {}", addr, hex);
                }
            }

            addr = addr.wrapping_add((end - i) as u64);
            i = end;
        }
        out
    }
}

/// Configurable resource limits for untrusted input.
///
/// All limits default to values far beyond anything the 16-bit target
/// address space can hold.
///
/// # Examples
///
/// ```rust
/// use vmasm::{Assembler, AsmError, ResourceLimits};
///
/// let mut asm = Assembler::new();
/// asm.limits(ResourceLimits {
///     max_instructions: 1,
///     ..ResourceLimits::default()
/// });
/// let err = asm.emit("mov r1, r2\nmov r2, r1").unwrap_err();
/// assert!(matches!(err, AsmError::ResourceLimitExceeded { .. }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceLimits {
    /// Maximum input source bytes per `emit()` call. Default: 64 MiB.
    pub max_source_bytes: usize,
    /// Maximum number of instructions across all `emit()` calls.
    /// Default: 1,000,000.
    pub max_instructions: usize,
    /// Maximum number of distinct labels. Default: 100,000.
    pub max_labels: usize,
    /// Maximum output size in bytes. Default: 16 MiB.
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_source_bytes: 64 * 1024 * 1024,
            max_instructions: 1_000_000,
            max_labels: 100_000,
            max_output_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Builder-pattern assembler.
///
/// # Examples
///
/// ```rust
/// use vmasm::{Assembler, InstructionSet};
///
/// let mut asm = Assembler::new();
/// asm.instruction_set(&InstructionSet::EXTENDED);
/// asm.emit("start:").unwrap();
/// asm.emit("inc r1").unwrap();
/// asm.emit("jmp @start").unwrap();
/// let result = asm.finish().unwrap();
/// assert_eq!(result.bytes(), &[0x10, 0x00, 0x2B, 0x00, 0x00]);
/// ```
#[derive(Debug)]
pub struct Assembler {
    builder: ProgramBuilder<'static>,
    base_address: u64,
    /// Whether to keep per-instruction text for [`AssemblyResult::listing`].
    listing_enabled: bool,
    resource_limits: ResourceLimits,
    /// First `emit()` failure; poisons [`Assembler::finish`].
    first_error: Option<AsmError>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    /// Create an assembler for [`InstructionSet::REFERENCE`].
    pub fn new() -> Self {
        Self {
            builder: ProgramBuilder::new(&InstructionSet::REFERENCE),
            base_address: 0,
            listing_enabled: false,
            resource_limits: ResourceLimits::default(),
            first_error: None,
        }
    }

    /// Select the instruction set for subsequent `emit()` calls.
    pub fn instruction_set(&mut self, isa: &'static InstructionSet) -> &mut Self {
        self.builder.set_instruction_set(isa);
        self
    }

    /// Set the address of the first assembled byte.
    pub fn base_address(&mut self, addr: u64) -> &mut Self {
        self.base_address = addr;
        self
    }

    /// Choose how repeated label declarations are handled.
    pub fn duplicate_labels(&mut self, policy: DuplicateLabelPolicy) -> &mut Self {
        self.builder.set_policy(policy);
        self
    }

    /// Set resource limits for defense against pathological inputs.
    pub fn limits(&mut self, limits: ResourceLimits) -> &mut Self {
        self.resource_limits = limits;
        self
    }

    /// Record instruction text so [`AssemblyResult::listing`] can show it.
    pub fn enable_listing(&mut self) -> &mut Self {
        self.listing_enabled = true;
        self
    }

    /// Emit assembly source text. Can be called multiple times.
    ///
    /// A failing chunk adds nothing to the program, and the failure is
    /// remembered: [`Assembler::finish`] returns it until [`Assembler::reset`].
    ///
    /// # Errors
    ///
    /// Returns [`AsmError`] on operand, opcode-selection or label errors,
    /// or if resource limits are exceeded.
    pub fn emit(&mut self, source: &str) -> Result<&mut Self, AsmError> {
        let limits = self.resource_limits;
        let fed = if source.len() > limits.max_source_bytes {
            Err(AsmError::ResourceLimitExceeded {
                resource: String::from("source bytes"),
                limit: limits.max_source_bytes,
            })
        } else {
            self.builder
                .feed_checked(source, |program| check_limits(program, &limits))
        };
        if let Err(e) = fed {
            self.first_error.get_or_insert_with(|| e.clone());
            return Err(e);
        }
        Ok(self)
    }

    /// Number of instructions emitted so far.
    pub fn instruction_count(&self) -> usize {
        self.builder.program().len()
    }

    /// Encode a single instruction without touching the assembler state.
    ///
    /// Label references may only use absolute `@<number>` addresses.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError`] if the line is not a single valid instruction.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vmasm::Assembler;
    ///
    /// let asm = Assembler::new();
    /// assert_eq!(asm.encode_one("mov r2, 300")?, vec![0x48, 0x01, 0x01, 0x2C]);
    /// # Ok::<(), vmasm::AsmError>(())
    /// ```
    pub fn encode_one(&self, source: &str) -> Result<Vec<u8>, AsmError> {
        let line = parser::parse_line(source, 1, 0, self.builder.instruction_set())?;
        let mut program = Program::new();
        if let Some(instruction) = line.instruction {
            program.push(instruction);
        }
        program.set_origin(self.base_address);
        program.assemble()
    }

    /// Discard everything emitted so far, including a recorded failure,
    /// keeping the configuration.
    pub fn reset(&mut self) -> &mut Self {
        self.builder = ProgramBuilder::new(self.builder.instruction_set())
            .with_policy(self.builder.policy());
        self.first_error = None;
        self
    }

    /// Finalize assembly: run both passes and return the result.
    ///
    /// # Errors
    ///
    /// Returns the first error any `emit()` call reported, an error if a
    /// label reference cannot be resolved, or
    /// [`AsmError::ResourceLimitExceeded`] if the output is too large.
    pub fn finish(self) -> Result<AssemblyResult, AsmError> {
        if let Some(e) = self.first_error {
            return Err(e);
        }
        let mut program = self.builder.finish();
        program.set_origin(self.base_address);
        let bytes = program.assemble()?;

        // Enforce output size limit
        if bytes.len() > self.resource_limits.max_output_bytes {
            return Err(AsmError::ResourceLimitExceeded {
                resource: String::from("output bytes"),
                limit: self.resource_limits.max_output_bytes,
            });
        }

        let source_annotations = if self.listing_enabled {
            program
                .instructions()
                .iter()
                .filter_map(|instr| Some((instr.location?, instr.to_string())))
                .collect()
        } else {
            Vec::new()
        };
        let labels = program.label_locations();

        tracing::debug!(
            bytes = bytes.len(),
            labels = labels.len(),
            base = self.base_address,
            "assembly finished"
        );

        Ok(AssemblyResult {
            bytes,
            labels,
            base_address: self.base_address,
            source_annotations,
        })
    }
}

/// Limits that depend on the program as a whole, checked per chunk.
fn check_limits(program: &Program, limits: &ResourceLimits) -> Result<(), AsmError> {
    let exceeded = |resource: &str, limit: usize| {
        Err(AsmError::ResourceLimitExceeded {
            resource: String::from(resource),
            limit,
        })
    };
    if program.len() > limits.max_instructions {
        return exceeded("instructions", limits.max_instructions);
    }
    if program.labels().len() > limits.max_labels {
        return exceeded("labels", limits.max_labels);
    }
    // Sizes are fixed at parse time, so the output limit is checked eagerly.
    if program.byte_len() > limits.max_output_bytes {
        return exceeded("output bytes", limits.max_output_bytes);
    }
    Ok(())
}
