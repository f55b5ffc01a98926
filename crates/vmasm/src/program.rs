//! The program: an instruction arena, its label table, and the two passes.
//!
//! Pass 1 assigns every instruction its byte location. Pass 2 encodes the
//! instructions in order, resolving label references against the
//! locations pass 1 wrote. Labels are stored as [`InstrId`] indices into
//! the arena, so both passes see a single copy of each instruction.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{AsmError, Span};
use crate::ir::Instruction;
use crate::isa::InstructionSet;
use crate::labels::{DuplicateLabelPolicy, InstrId, LabelTable};
use crate::parser;

/// A parsed program ready for assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: LabelTable,
    origin: u64,
}

impl Program {
    /// Create an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse source text against [`InstructionSet::REFERENCE`].
    ///
    /// # Errors
    ///
    /// Returns the first operand, opcode-selection or label error.
    pub fn parse(source: &str) -> Result<Self, AsmError> {
        Self::parse_with(source, &InstructionSet::REFERENCE)
    }

    /// Parse source text against `isa`.
    ///
    /// # Errors
    ///
    /// Returns the first operand, opcode-selection or label error.
    pub fn parse_with(source: &str, isa: &InstructionSet) -> Result<Self, AsmError> {
        let mut builder = ProgramBuilder::new(isa);
        builder.feed(source)?;
        Ok(builder.finish())
    }

    /// Parse a sequence of lines against `isa`.
    ///
    /// # Errors
    ///
    /// Returns the first operand, opcode-selection or label error.
    pub fn from_lines<I, S>(lines: I, isa: &InstructionSet) -> Result<Self, AsmError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = ProgramBuilder::new(isa);
        for line in lines {
            builder.feed_line(line.as_ref())?;
        }
        Ok(builder.finish())
    }

    /// Seed a program from already-built instructions. No labels are bound.
    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    /// Instructions in program order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction behind `id`.
    #[must_use]
    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id.index())
    }

    /// The label table.
    #[must_use]
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Location of the instruction `name` is bound to, once pass 1 has run.
    #[must_use]
    pub fn label_location(&self, name: &str) -> Option<u64> {
        self.labels
            .get(name)
            .and_then(|id| self.instruction(id))
            .and_then(|instr| instr.location)
    }

    /// Every bound label with its location, in name order.
    ///
    /// Labels whose target has not been placed yet are skipped.
    #[must_use]
    pub fn label_locations(&self) -> Vec<(String, u64)> {
        self.labels
            .iter()
            .filter_map(|(name, id)| {
                let location = self.instruction(id)?.location?;
                Some((String::from(name), location))
            })
            .collect()
    }

    /// Address pass 1 starts counting from.
    #[must_use]
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Change the address pass 1 starts counting from.
    pub fn set_origin(&mut self, origin: u64) {
        self.origin = origin;
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Total encoded size. Known before either pass runs.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.instructions.iter().map(Instruction::byte_len).sum()
    }

    /// Append an instruction and return its index.
    pub fn push(&mut self, instruction: Instruction) -> InstrId {
        let id = InstrId(self.instructions.len());
        self.instructions.push(instruction);
        id
    }

    /// Bind `name` to the instruction behind `target`.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::DuplicateLabel`] under
    /// [`DuplicateLabelPolicy::Reject`] if `name` is already bound.
    pub fn define_label(
        &mut self,
        name: &str,
        target: InstrId,
        span: Span,
        policy: DuplicateLabelPolicy,
    ) -> Result<Option<InstrId>, AsmError> {
        self.labels.define(name, target, span, policy)
    }

    // ─── Passes ────────────────────────────────────────────

    /// Assign every instruction its location. Returns the end address.
    ///
    /// Re-running recomputes the same locations.
    pub fn pass1(&mut self) -> u64 {
        let mut location = self.origin;
        for instr in &mut self.instructions {
            instr.location = Some(location);
            tracing::trace!(location, len = instr.byte_len(), instr = %instr, "placed");
            location = location.wrapping_add(instr.byte_len() as u64);
        }
        tracing::debug!(
            instructions = self.instructions.len(),
            origin = self.origin,
            end = location,
            "pass 1 complete"
        );
        location
    }

    /// Encode every instruction in order.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::UndefinedLabel`] for a reference to a name that is
    /// neither bound nor numeric, and [`AsmError::UnplacedLabel`] if a
    /// referenced instruction has no location because pass 1 has not run.
    pub fn pass2(&self) -> Result<Vec<u8>, AsmError> {
        let mut out = Vec::with_capacity(self.byte_len());
        for instr in &self.instructions {
            instr.encode_into(&mut out, &|name| self.resolve(name, instr.span))?;
        }
        tracing::debug!(bytes = out.len(), "pass 2 complete");
        Ok(out)
    }

    /// Run pass 1 then pass 2.
    ///
    /// # Errors
    ///
    /// See [`Program::pass2`].
    pub fn assemble(&mut self) -> Result<Vec<u8>, AsmError> {
        self.pass1();
        self.pass2()
    }

    /// Bound labels win; an unbound numeric name is an absolute address.
    fn resolve(&self, name: &str, span: Span) -> Result<u64, AsmError> {
        if let Some(id) = self.labels.get(name) {
            return self
                .instruction(id)
                .and_then(|instr| instr.location)
                .ok_or_else(|| AsmError::UnplacedLabel {
                    label: String::from(name),
                    span,
                });
        }
        parser::parse_number(name)
            .map(|addr| addr as u64)
            .ok_or_else(|| AsmError::UndefinedLabel {
                label: String::from(name),
                span,
            })
    }
}

// ─── Incremental construction ──────────────────────────────

/// Builder state before a chunk, restored when the chunk fails.
#[derive(Debug)]
struct Checkpoint {
    instructions: usize,
    labels: LabelTable,
    pending: Vec<(String, Span)>,
    line_no: u32,
    offset: usize,
}

/// Builds a [`Program`] from source fed in one or more chunks.
///
/// Labels declared with no instruction yet stay pending and bind to the
/// next instruction, even across [`ProgramBuilder::feed`] calls.
#[derive(Debug)]
pub struct ProgramBuilder<'a> {
    isa: &'a InstructionSet,
    policy: DuplicateLabelPolicy,
    program: Program,
    pending: Vec<(String, Span)>,
    line_no: u32,
    offset: usize,
}

impl<'a> ProgramBuilder<'a> {
    /// Start an empty program parsed against `isa`.
    #[must_use]
    pub fn new(isa: &'a InstructionSet) -> Self {
        Self {
            isa,
            policy: DuplicateLabelPolicy::default(),
            program: Program::new(),
            pending: Vec::new(),
            line_no: 0,
            offset: 0,
        }
    }

    /// Set how repeated label names are handled.
    #[must_use]
    pub fn with_policy(mut self, policy: DuplicateLabelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Change the duplicate-label policy for lines fed from now on.
    pub fn set_policy(&mut self, policy: DuplicateLabelPolicy) {
        self.policy = policy;
    }

    /// Change the instruction set for lines fed from now on.
    pub fn set_instruction_set(&mut self, isa: &'a InstructionSet) {
        self.isa = isa;
    }

    /// The current duplicate-label policy.
    #[must_use]
    pub fn policy(&self) -> DuplicateLabelPolicy {
        self.policy
    }

    /// The current instruction set.
    #[must_use]
    pub fn instruction_set(&self) -> &'a InstructionSet {
        self.isa
    }

    /// The program built so far.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Number of labels waiting for an instruction.
    #[must_use]
    pub fn pending_labels(&self) -> usize {
        self.pending.len()
    }

    /// Parse a chunk of source, one line at a time.
    ///
    /// The chunk is all-or-nothing: on error the builder is left exactly as
    /// it was before the call.
    ///
    /// # Errors
    ///
    /// Returns the first operand, opcode-selection or label error.
    pub fn feed(&mut self, source: &str) -> Result<(), AsmError> {
        self.feed_checked(source, |_| Ok(()))
    }

    /// Like [`ProgramBuilder::feed`], additionally rejecting the chunk when
    /// `check` fails on the program it would produce.
    ///
    /// # Errors
    ///
    /// Returns the first parse error, or the error from `check`.
    pub fn feed_checked<F>(&mut self, source: &str, check: F) -> Result<(), AsmError>
    where
        F: FnOnce(&Program) -> Result<(), AsmError>,
    {
        let saved = self.checkpoint();
        let parsed = source
            .split_inclusive('\n')
            .try_for_each(|line| {
                self.parse_line(line.trim_end_matches(['\n', '\r']), line.len())
            })
            .and_then(|()| check(&self.program));
        if let Err(e) = parsed {
            self.rollback(saved);
            return Err(e);
        }
        tracing::debug!(
            instructions = self.program.len() - saved.instructions,
            labels = self.program.labels.len(),
            pending = self.pending.len(),
            "parsed source chunk"
        );
        Ok(())
    }

    /// Parse a single line.
    ///
    /// # Errors
    ///
    /// Returns the operand, opcode-selection or label error on the line. The
    /// builder is unchanged on error.
    pub fn feed_line(&mut self, text: &str) -> Result<(), AsmError> {
        let text = text.trim_end_matches(['\n', '\r']);
        let saved = self.checkpoint();
        self.parse_line(text, text.len() + 1).map_err(|e| {
            self.rollback(saved);
            e
        })
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            instructions: self.program.instructions.len(),
            labels: self.program.labels.clone(),
            pending: self.pending.clone(),
            line_no: self.line_no,
            offset: self.offset,
        }
    }

    fn rollback(&mut self, saved: Checkpoint) {
        tracing::debug!(
            discarded = self.program.instructions.len() - saved.instructions,
            line = self.line_no,
            "rolled back source chunk"
        );
        self.program.instructions.truncate(saved.instructions);
        self.program.labels = saved.labels;
        self.pending = saved.pending;
        self.line_no = saved.line_no;
        self.offset = saved.offset;
    }

    fn parse_line(&mut self, text: &str, consumed: usize) -> Result<(), AsmError> {
        self.line_no += 1;
        let offset = self.offset;
        self.offset += consumed;

        let line = parser::parse_line(text, self.line_no, offset, self.isa)?;
        if let Some(label) = line.label {
            self.pending.push(label);
        }
        if let Some(instruction) = line.instruction {
            let id = self.program.push(instruction);
            for (name, span) in self.pending.drain(..) {
                self.program.labels.define(&name, id, span, self.policy)?;
            }
        }
        Ok(())
    }

    /// Finish building. Labels still pending are dropped.
    #[must_use]
    pub fn finish(self) -> Program {
        for (name, span) in &self.pending {
            tracing::debug!(label = %name, line = span.line, "dropping label with no instruction");
        }
        self.program
    }
}
