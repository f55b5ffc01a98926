//! Compile-time assembly with `vm_bytes!` and `vm_array!` macros.
//!
//! These macros assemble VM code at compile time, producing
//! `&'static [u8]` or `[u8; N]` constants.
//!
//! Run with: `cargo run --example compile_time_asm -p vmasm-macros`

use vmasm_macros::{vm_array, vm_bytes};

// ── Compile-time constants ──────────────────────────────────────────────

/// Clear the first four registers.
const CLEAR: &[u8] = vm_bytes!(
    "
    mov r1, 0
    mov r2, 0
    mov r3, 0
    mov r4, 0
"
);

/// Count r1 down to zero, then halt.
const COUNTDOWN: &[u8] = vm_bytes!(
    extended,
    "
    mov r1, 10
top:
    dec r1
    cmp r1, 0
    jne @top
    hlt
"
);

/// Interrupt service routine placed at 0x0200.
const ISR: &[u8] = vm_bytes!(
    extended,
    0x0200,
    "
isr:
    push r1
    pop r1
    reti
"
);

/// A single halt as a fixed-size array.
const HALT: [u8; 1] = vm_array!(extended, "hlt");

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() {
    println!("=== vmasm compile-time assembly ===\n");
    println!("clear ({} bytes):     {}", CLEAR.len(), hex(CLEAR));
    println!("countdown ({} bytes): {}", COUNTDOWN.len(), hex(COUNTDOWN));
    println!("isr ({} bytes):        {}", ISR.len(), hex(ISR));
    println!("halt ({} byte):        {}", HALT.len(), hex(&HALT));
}
