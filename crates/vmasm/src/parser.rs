//! Line-oriented source parser.
//!
//! Each source line is either empty, a label declaration (`name:`), an
//! instruction (`mnemonic op, op, ...`), or a label followed by an
//! instruction on the same line. Everything after `;` is a comment.
//!
//! Operand tokens are classified by a fixed, ordered list of recognizers;
//! the first recognizer that accepts a token decides its kind.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{AsmError, Span};
use crate::ir::{Instruction, Operand};
use crate::isa::InstructionSet;

/// Deepest `[...]` nesting accepted in a single operand.
pub const MAX_INDIRECTION_DEPTH: usize = 64;

/// The result of parsing one source line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    /// A label declared on this line, with its location.
    pub label: Option<(String, Span)>,
    /// The instruction on this line, opcode already selected.
    pub instruction: Option<Instruction>,
}

impl Line {
    /// Whether the line declared nothing (blank or comment-only).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.instruction.is_none()
    }
}

/// Parse a single source line.
///
/// `line_no` is 1-based and `offset` is the byte offset of the line within
/// the whole source; both only feed diagnostics.
///
/// # Errors
///
/// Returns the first operand or opcode-selection error on the line.
pub fn parse_line(
    text: &str,
    line_no: u32,
    offset: usize,
    isa: &InstructionSet,
) -> Result<Line, AsmError> {
    let code = match text.find(';') {
        Some(pos) => &text[..pos],
        None => text,
    };
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Ok(Line::default());
    }

    let lead = code.len() - code.trim_start().len();
    let span = Span::new(line_no, lead as u32 + 1, offset + lead, trimmed.len());

    if let Some(name) = trimmed.strip_suffix(':') {
        return Ok(Line {
            label: Some((String::from(name.trim()), span)),
            instruction: None,
        });
    }

    let mut line = Line::default();
    let mut body = trimmed;

    // `name: mnemonic ...` on one line.
    let first = first_word(body);
    if let Some(name) = first.strip_suffix(':') {
        let label_span = Span::new(span.line, span.col, span.offset, first.len());
        line.label = Some((String::from(name), label_span));
        body = body[first.len()..].trim_start();
    }

    let mnemonic = first_word(body);
    let operand_text: String = body[mnemonic.len()..].split_whitespace().collect();
    let operands = parse_operands(&operand_text, span)?;
    line.instruction = Some(Instruction::with_span(mnemonic, operands, isa, span)?);
    Ok(line)
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Split a comma-separated operand list and parse each token.
///
/// Whitespace is insignificant everywhere in the list. An empty list yields
/// no operands; an empty token between commas is an invalid operand.
///
/// # Errors
///
/// Returns [`AsmError::InvalidOperand`] for the first rejected token.
pub fn parse_operands(text: &str, span: Span) -> Result<Vec<Operand>, AsmError> {
    let compact: String = text.split_whitespace().collect();
    if compact.is_empty() {
        return Ok(Vec::new());
    }
    compact
        .split(',')
        .map(|token| parse_operand(token, span))
        .collect()
}

// ─── Operand recognizers ───────────────────────────────────

/// A recognizer either declines a token (`None`) or claims it, possibly
/// failing while parsing a nested operand.
type Recognizer = fn(&str, Span, usize) -> Option<Result<Operand, AsmError>>;

/// Tried in order. Immediate8 must precede Immediate16 so that a literal is
/// never widened when it fits a byte.
const RECOGNIZERS: [Recognizer; 5] = [
    recognize_register,
    recognize_memory,
    recognize_immediate8,
    recognize_immediate16,
    recognize_label,
];

/// Parse one operand token.
///
/// # Errors
///
/// Returns [`AsmError::InvalidOperand`] if no recognizer accepts the token.
pub fn parse_operand(token: &str, span: Span) -> Result<Operand, AsmError> {
    parse_operand_at(token.trim(), span, 0)
}

fn parse_operand_at(token: &str, span: Span, depth: usize) -> Result<Operand, AsmError> {
    RECOGNIZERS
        .iter()
        .find_map(|recognize| recognize(token, span, depth))
        .unwrap_or_else(|| Err(invalid(token, span)))
}

fn invalid(token: &str, span: Span) -> AsmError {
    AsmError::InvalidOperand {
        token: String::from(token),
        span,
    }
}

fn recognize_register(token: &str, _: Span, _: usize) -> Option<Result<Operand, AsmError>> {
    let index = token.strip_prefix('r')?.parse::<i64>().ok()?;
    Some(Ok(Operand::Register(index)))
}

fn recognize_memory(token: &str, span: Span, depth: usize) -> Option<Result<Operand, AsmError>> {
    let inner = token.strip_prefix('[')?.strip_suffix(']')?;
    if depth >= MAX_INDIRECTION_DEPTH {
        return Some(Err(invalid(token, span)));
    }
    Some(
        parse_operand_at(inner.trim(), span, depth + 1)
            .map(|operand| Operand::Memory(Box::new(operand))),
    )
}

fn recognize_immediate8(token: &str, _: Span, _: usize) -> Option<Result<Operand, AsmError>> {
    let value = parse_number(token)?;
    if value & 0xFF != value {
        return None;
    }
    Some(Ok(Operand::Immediate8(value as u8)))
}

fn recognize_immediate16(token: &str, _: Span, _: usize) -> Option<Result<Operand, AsmError>> {
    parse_number(token).map(|value| Ok(Operand::Immediate16(value)))
}

fn recognize_label(token: &str, _: Span, _: usize) -> Option<Result<Operand, AsmError>> {
    let name = token.strip_prefix('@')?;
    Some(Ok(Operand::Label(String::from(name))))
}

/// Parse a numeric literal, truncating toward zero.
///
/// Accepts decimal integers, `0x` hex integers and decimal floats
/// (`2.9`, `1e3`), each with an optional sign. Values beyond `i64`
/// saturate.
#[must_use]
pub fn parse_number(text: &str) -> Option<i64> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }

    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).unwrap_or(u64::MAX)
    } else if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<u64>().unwrap_or(u64::MAX)
    } else {
        let float_like = matches!(digits.as_bytes()[0], b'0'..=b'9' | b'.')
            && digits.bytes().any(|b| b.is_ascii_digit())
            && digits
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
        if !float_like {
            return None;
        }
        let value: f64 = digits.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        // Saturating, truncates toward zero.
        value as u64
    };

    let value = i64::try_from(magnitude).unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
