#![no_main]
use libfuzzer_sys::fuzz_target;

use vmasm::{Assembler, InstructionSet};

fuzz_target!(|data: &str| {
    // Fuzz the one-shot assembler. It must never panic and may only return Ok/Err.
    let _ = vmasm::assemble(data);

    // Extended set, with a base address near the top of the address space.
    let _ = vmasm::assemble_at(data, &InstructionSet::EXTENDED, u64::MAX - 4);

    // Fuzz the builder API with multiple emit calls (split on newlines).
    let mut asm = Assembler::new();
    asm.instruction_set(&InstructionSet::EXTENDED).enable_listing();
    for line in data.lines() {
        if asm.emit(line).is_err() {
            return;
        }
    }
    if let Ok(result) = asm.finish() {
        let _ = result.listing();
    }
});
