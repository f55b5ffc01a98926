#![no_main]
use libfuzzer_sys::fuzz_target;

use vmasm::parser::{parse_number, parse_operand};
use vmasm::Span;

fuzz_target!(|data: &str| {
    // Operand recognizers and the numeric literal parser must never panic.
    let _ = parse_number(data);
    if let Ok(operand) = parse_operand(data, Span::dummy()) {
        let _ = operand.byte_len();
        let _ = operand.to_string();
    }
});
