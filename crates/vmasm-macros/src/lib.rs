//! Compile-time assembly proc-macros for [`vmasm`](https://crates.io/crates/vmasm).
//!
//! Provides the [`vm_bytes!`] macro that assembles VM source text at compile
//! time, producing a `&'static [u8]` constant with no runtime work.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vmasm_macros::{vm_array, vm_bytes};
//!
//! // Reference instruction set (`mov` only)
//! const INIT: &[u8] = vm_bytes!("mov r1, 0\nmov r2, [r1]");
//!
//! // Full VM opcode map, placed at 0x100
//! const LOOP: &[u8] = vm_bytes!(extended, 0x100, "top: dec r1\njne @top\nhlt");
//!
//! // Fixed-size array
//! const HALT: [u8; 1] = vm_array!(extended, "hlt");
//! ```

use proc_macro::{Delimiter, Group, Ident, Literal, Punct, Spacing, Span, TokenStream, TokenTree};

use vmasm::InstructionSet;

/// Assemble source text at compile time, producing a `&'static [u8]` byte slice.
///
/// # Syntax
///
/// ```rust,ignore
/// vm_bytes!([ISA,] [BASE,] "assembly source")
/// ```
///
/// where `ISA` is `reference` (the default) or `extended`, and `BASE` is an
/// integer literal giving the address of the first instruction.
///
/// # Examples
///
/// ```rust,ignore
/// use vmasm_macros::vm_bytes;
///
/// const MOV: &[u8] = vm_bytes!("mov r1, r2");
/// assert_eq!(MOV, &[0x20, 0x00, 0x01]);
///
/// // Multi-line with labels
/// const CODE: &[u8] = vm_bytes!(extended, "
///     start:
///         inc r1
///         jmp @start
/// ");
/// ```
///
/// # Compile-time errors
///
/// If the source contains errors, the macro emits a compile-time error
/// carrying the full `AsmError` message.
#[proc_macro]
pub fn vm_bytes(input: TokenStream) -> TokenStream {
    match vm_bytes_impl(input) {
        Ok(ts) => ts,
        Err(err) => err.into_compile_error(),
    }
}

/// Assemble source text at compile time, producing a fixed-size array `[u8; N]`.
///
/// Accepts the same input as [`vm_bytes!`].
///
/// # Examples
///
/// ```rust,ignore
/// use vmasm_macros::vm_array;
///
/// const HLT: [u8; 1] = vm_array!(extended, "hlt");
/// const MOV: [u8; 3] = vm_array!("mov r1, r1");
/// ```
#[proc_macro]
pub fn vm_array(input: TokenStream) -> TokenStream {
    match vm_array_impl(input) {
        Ok(ts) => ts,
        Err(err) => err.into_compile_error(),
    }
}

// ─── Implementation ─────────────────────────────────────────────────────────

struct MacroInput {
    isa: &'static InstructionSet,
    base_addr: u64,
    source: String,
    /// Span of the source literal for error reporting.
    source_span: Span,
}

type Tokens = std::iter::Peekable<proc_macro::token_stream::IntoIter>;

fn parse_input(input: TokenStream) -> Result<MacroInput, syn_free::Error> {
    let mut tokens = input.into_iter().peekable();

    // 1. Optional instruction set identifier
    let isa = match tokens.peek() {
        Some(TokenTree::Ident(_)) => {
            let tt = next_token(&mut tokens, "expected instruction set")?;
            let isa = parse_isa(&tt)?;
            expect_comma(&mut tokens)?;
            isa
        }
        _ => &InstructionSet::REFERENCE,
    };

    // 2. Optional base address (integer literal followed by comma)
    let base_addr = match tokens.peek() {
        Some(tt) if is_integer_literal(tt) => {
            let tt = next_token(&mut tokens, "expected base address")?;
            let addr = parse_integer_literal(&tt)?;
            expect_comma(&mut tokens)?;
            addr
        }
        Some(_) => 0,
        None => return Err(syn_free::Error::new("expected assembly source string")),
    };

    // 3. Source string
    let (source, source_span) = parse_string_literal(&mut tokens)?;

    if let Some(extra) = tokens.next() {
        return Err(syn_free::Error::with_span(
            extra.span(),
            "unexpected extra tokens after source string",
        ));
    }

    Ok(MacroInput {
        isa,
        base_addr,
        source,
        source_span,
    })
}

fn vm_bytes_impl(input: TokenStream) -> Result<TokenStream, syn_free::Error> {
    let mi = parse_input(input)?;
    let bytes = do_assemble(&mi)?;
    bytes_to_slice_expr(&bytes)
}

fn vm_array_impl(input: TokenStream) -> Result<TokenStream, syn_free::Error> {
    let mi = parse_input(input)?;
    let bytes = do_assemble(&mi)?;
    bytes_to_array_expr(&bytes)
}

fn do_assemble(mi: &MacroInput) -> Result<Vec<u8>, syn_free::Error> {
    vmasm::assemble_at(&mi.source, mi.isa, mi.base_addr)
        .map_err(|e| syn_free::Error::with_span(mi.source_span, &format!("assembly error: {e}")))
}

fn next_token(tokens: &mut Tokens, expected: &str) -> Result<TokenTree, syn_free::Error> {
    tokens
        .next()
        .ok_or_else(|| syn_free::Error::new(expected))
}

fn parse_isa(tt: &TokenTree) -> Result<&'static InstructionSet, syn_free::Error> {
    let ident = tt.to_string();
    match ident.as_str() {
        "reference" => Ok(&InstructionSet::REFERENCE),
        "extended" => Ok(&InstructionSet::EXTENDED),
        _ => Err(syn_free::Error::with_span(
            tt.span(),
            &format!("unknown instruction set `{ident}`, expected: reference, extended"),
        )),
    }
}

fn expect_comma(tokens: &mut Tokens) -> Result<(), syn_free::Error> {
    match tokens.next() {
        Some(TokenTree::Punct(p)) if p.as_char() == ',' => Ok(()),
        Some(other) => Err(syn_free::Error::with_span(other.span(), "expected `,`")),
        None => Err(syn_free::Error::new("expected `,`")),
    }
}

fn is_integer_literal(tt: &TokenTree) -> bool {
    matches!(tt, TokenTree::Literal(lit) if lit.to_string().starts_with(|c: char| c.is_ascii_digit()))
}

fn parse_integer_literal(tt: &TokenTree) -> Result<u64, syn_free::Error> {
    let TokenTree::Literal(lit) = tt else {
        return Err(syn_free::Error::with_span(tt.span(), "expected integer literal"));
    };
    let s = lit.to_string().replace('_', "");
    let val = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(strip_int_suffix(hex), 16)
    } else {
        strip_int_suffix(&s).parse::<u64>()
    };
    val.map_err(|_| syn_free::Error::with_span(tt.span(), "invalid integer literal"))
}

/// Drop a `u16`/`u64`/`usize` style suffix.
fn strip_int_suffix(hex: &str) -> &str {
    match hex.find(['u', 'i']) {
        Some(pos) => &hex[..pos],
        None => hex,
    }
}

fn parse_string_literal(tokens: &mut Tokens) -> Result<(String, Span), syn_free::Error> {
    let tt = next_token(tokens, "expected string literal")?;
    let TokenTree::Literal(lit) = &tt else {
        return Err(syn_free::Error::with_span(tt.span(), "expected string literal"));
    };
    let raw = lit.to_string();
    // Strip quotes from `"..."`, `r"..."` and `r#"..."#`
    let content = if let Some(rest) = raw.strip_prefix("r#\"") {
        rest.strip_suffix("\"#")
            .ok_or_else(|| syn_free::Error::with_span(tt.span(), "malformed raw string"))?
    } else if let Some(rest) = raw.strip_prefix("r\"") {
        rest.strip_suffix('"')
            .ok_or_else(|| syn_free::Error::with_span(tt.span(), "malformed raw string"))?
    } else if let Some(rest) = raw.strip_prefix('"') {
        let inner = rest
            .strip_suffix('"')
            .ok_or_else(|| syn_free::Error::with_span(tt.span(), "malformed string literal"))?;
        return Ok((unescape_string(inner), tt.span()));
    } else {
        return Err(syn_free::Error::with_span(tt.span(), "expected string literal"));
    };
    Ok((content.to_string(), tt.span()))
}

fn unescape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('0') => out.push('\0'),
            // Line continuation: skip the newline and leading whitespace.
            Some('\n') => {
                while chars.clone().next().is_some_and(char::is_whitespace) {
                    chars.next();
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn bytes_to_slice_expr(bytes: &[u8]) -> Result<TokenStream, syn_free::Error> {
    let inner = byte_list(bytes);
    parse_generated(&format!("{{ const BYTES: &[u8] = &[{inner}]; BYTES }}"))
}

fn bytes_to_array_expr(bytes: &[u8]) -> Result<TokenStream, syn_free::Error> {
    let len = bytes.len();
    let inner = byte_list(bytes);
    parse_generated(&format!("{{ const BYTES: [u8; {len}] = [{inner}]; BYTES }}"))
}

fn byte_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:#04X}u8"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_generated(code: &str) -> Result<TokenStream, syn_free::Error> {
    code.parse()
        .map_err(|e| syn_free::Error::new(&format!("internal error in generated code: {e}")))
}

// ─── Minimal syn-free error type ─────────────────────────────────────────────
// The macro input is simple enough to parse from `proc_macro::TokenStream`
// directly, so `syn` is not a dependency.

mod syn_free {
    use super::{Delimiter, Group, Ident, Literal, Punct, Spacing, Span, TokenStream, TokenTree};

    pub struct Error {
        message: String,
        span: Span,
    }

    impl Error {
        pub fn new(msg: &str) -> Self {
            Self::with_span(Span::call_site(), msg)
        }

        pub fn with_span(span: Span, msg: &str) -> Self {
            Self {
                message: msg.to_string(),
                span,
            }
        }

        /// `compile_error!("message")`, every token carrying the error span.
        pub fn into_compile_error(self) -> TokenStream {
            let mut message = Literal::string(&self.message);
            message.set_span(self.span);
            let mut args = Group::new(
                Delimiter::Parenthesis,
                TokenStream::from(TokenTree::Literal(message)),
            );
            args.set_span(self.span);
            let mut bang = Punct::new('!', Spacing::Alone);
            bang.set_span(self.span);

            [
                TokenTree::Ident(Ident::new("compile_error", self.span)),
                TokenTree::Punct(bang),
                TokenTree::Group(args),
            ]
            .into_iter()
            .collect()
        }
    }
}
