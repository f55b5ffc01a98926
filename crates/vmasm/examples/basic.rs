//! Basic assembly example covering the one-shot and builder APIs.
//!
//! Run with: `cargo run --example basic`

use vmasm::{assemble, Assembler, DuplicateLabelPolicy, InstructionSet, Program};

fn main() {
    println!("=== vmasm basic example ===\n");

    // --- One-shot assembly ---
    println!("1. One-shot assembly (reference set):");
    let bytes = assemble("mov r1, r2\nmov r1, 255\nmov r1, 256").unwrap();
    print_hex("   ", &bytes);

    // --- Builder API ---
    println!("\n2. Builder API (countdown at 0x0100):");
    let mut asm = Assembler::new();
    asm.instruction_set(&InstructionSet::EXTENDED)
        .base_address(0x0100)
        .enable_listing();
    asm.emit(
        r"
start:
    mov r1, 10      ; counter
loop:
    dec r1
    cmp r1, 0
    jne @loop
    call @done
    jmp @start
done:
    ret
",
    )
    .unwrap();

    let result = asm.finish().unwrap();
    print_hex("   ", result.bytes());

    // Label addresses
    println!("\n   Labels:");
    for (name, addr) in result.labels() {
        println!("   {}: 0x{:04X}", name, addr);
    }

    // Listing output
    println!("\n   Listing:");
    for line in result.listing().lines() {
        println!("   {}", line);
    }

    // --- Two passes by hand ---
    println!("\n3. Program API (forward reference):");
    let mut program = Program::parse("mov r1, [@end]\nmov r2, r3\nend: mov r4, r5").unwrap();
    let end = program.pass1();
    println!("   pass 1 placed {} instructions, end at {}", program.len(), end);
    for instr in program.instructions() {
        println!("   {:04X}  {}", instr.location.unwrap_or(0), instr);
    }
    let bytes = program.pass2().unwrap();
    print_hex("   ", &bytes);

    // --- Errors ---
    println!("\n4. Diagnostics:");
    for src in ["mov r1", "mov 5, r1", "mov r1, [@nowhere]", "hlt"] {
        match assemble(src) {
            Ok(bytes) => print_hex("   ", &bytes),
            Err(e) => println!("   {:<20} -> {}", src, e),
        }
    }

    let mut strict = Assembler::new();
    strict.duplicate_labels(DuplicateLabelPolicy::Reject);
    if let Err(e) = strict.emit("a: mov r1, r1\na: mov r2, r2") {
        println!("   {:<20} -> {}", "duplicate label", e);
    }

    println!("\n=== Done! ===");
}

fn print_hex(prefix: &str, bytes: &[u8]) {
    print!("{}", prefix);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && i % 16 == 0 {
            println!();
            print!("{}", prefix);
        }
        print!("{:02X} ", b);
    }
    println!();
}
