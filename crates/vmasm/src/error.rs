//! Error types and source span tracking for diagnostics.

#[allow(unused_imports)]
use alloc::format;
use alloc::string::String;
#[allow(unused_imports)]
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::ir::OperandKind;

/// Source location for diagnostics.
///
/// Tracks the line, column, byte offset, and length of a source line (or
/// part of one) in the original assembly text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (byte offset within line).
    pub col: u32,
    /// 0-based byte offset from start of source.
    pub offset: usize,
    /// Byte length of the spanned region.
    pub len: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(line: u32, col: u32, offset: usize, len: usize) -> Self {
        Self {
            line,
            col,
            offset,
            len,
        }
    }

    /// A dummy span for instructions built programmatically.
    #[must_use]
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Whether this span points into real source text.
    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Assembly error with source location and descriptive message.
///
/// Every variant is a hard failure: parsing or assembly stops at the first
/// error and no partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsmError {
    /// No operand recognizer accepted the token.
    InvalidOperand {
        /// The rejected operand text.
        token: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// The mnemonic has no registered instruction family.
    UnknownMnemonic {
        /// The mnemonic that was not recognized.
        mnemonic: String,
        /// Source location of the instruction.
        span: Span,
    },

    /// The operand-kind sequence has no exact entry in the mnemonic's table.
    UnknownOpcode {
        /// The instruction mnemonic.
        mnemonic: String,
        /// The operand kinds that failed to match.
        kinds: Vec<OperandKind>,
        /// Source location of the instruction.
        span: Span,
    },

    /// Operand count outside the mnemonic's declared range.
    ArityOutOfRange {
        /// The instruction mnemonic.
        mnemonic: String,
        /// Number of operands supplied.
        count: usize,
        /// Minimum accepted operand count.
        min: usize,
        /// Maximum accepted operand count.
        max: usize,
        /// Source location of the instruction.
        span: Span,
    },

    /// Referenced label was never defined.
    UndefinedLabel {
        /// The undefined label name.
        label: String,
        /// Source location of the reference.
        span: Span,
    },

    /// Label was defined more than once (only under
    /// [`DuplicateLabelPolicy::Reject`](crate::labels::DuplicateLabelPolicy)).
    DuplicateLabel {
        /// The duplicated label name.
        label: String,
        /// Source location of the duplicate definition.
        span: Span,
        /// Source location of the first definition.
        first_span: Span,
    },

    /// A label target has not been assigned a location yet.
    ///
    /// Raised when encoding runs before location assignment.
    UnplacedLabel {
        /// The label whose target has no location.
        label: String,
        /// Source location of the reference.
        span: Span,
    },

    /// A configurable resource limit was exceeded.
    ResourceLimitExceeded {
        /// Human-readable name of the resource (e.g. "instructions", "labels").
        resource: String,
        /// The configured limit that was exceeded.
        limit: usize,
    },
}

impl AsmError {
    /// The source location the error refers to, if any.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            AsmError::InvalidOperand { span, .. }
            | AsmError::UnknownMnemonic { span, .. }
            | AsmError::UnknownOpcode { span, .. }
            | AsmError::ArityOutOfRange { span, .. }
            | AsmError::UndefinedLabel { span, .. }
            | AsmError::DuplicateLabel { span, .. }
            | AsmError::UnplacedLabel { span, .. } => Some(*span),
            AsmError::ResourceLimitExceeded { .. } => None,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::InvalidOperand { token, span } => {
                write!(f, "{}: invalid operand '{}'", span, token)
            }
            AsmError::UnknownMnemonic { mnemonic, span } => {
                write!(f, "{}: unknown mnemonic '{}'", span, mnemonic)
            }
            AsmError::UnknownOpcode {
                mnemonic,
                kinds,
                span,
            } => {
                write!(f, "{}: no '{}' form takes (", span, mnemonic)?;
                for (i, kind) in kinds.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", kind)?;
                }
                write!(f, ")")
            }
            AsmError::ArityOutOfRange {
                mnemonic,
                count,
                min,
                max,
                span,
            } => {
                if min == max {
                    write!(
                        f,
                        "{}: '{}' takes {} operand(s), got {}",
                        span, mnemonic, min, count
                    )
                } else {
                    write!(
                        f,
                        "{}: '{}' takes {} to {} operands, got {}",
                        span, mnemonic, min, max, count
                    )
                }
            }
            AsmError::UndefinedLabel { label, span } => {
                write!(f, "{}: undefined label '{}'", span, label)
            }
            AsmError::DuplicateLabel {
                label,
                span,
                first_span,
            } => {
                write!(
                    f,
                    "{}: duplicate label '{}' (first defined at {})",
                    span, label, first_span
                )
            }
            AsmError::UnplacedLabel { label, span } => {
                write!(
                    f,
                    "{}: label '{}' has no location (run pass 1 first)",
                    span, label
                )
            }
            AsmError::ResourceLimitExceeded { resource, limit } => {
                write!(
                    f,
                    "resource limit exceeded: {} (limit: {})",
                    resource, limit
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AsmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        let span = Span::new(3, 12, 45, 5);
        assert_eq!(format!("{}", span), "3:12");
    }

    #[test]
    fn span_dummy() {
        let span = Span::dummy();
        assert_eq!(span.line, 0);
        assert_eq!(span.col, 0);
        assert!(span.is_dummy());
        assert!(!Span::new(1, 1, 0, 3).is_dummy());
    }

    #[test]
    fn error_invalid_operand_display() {
        let err = AsmError::InvalidOperand {
            token: "%x".into(),
            span: Span::new(2, 5, 0, 2),
        };
        assert_eq!(format!("{}", err), "2:5: invalid operand '%x'");
    }

    #[test]
    fn error_unknown_mnemonic_display() {
        let err = AsmError::UnknownMnemonic {
            mnemonic: "foobar".into(),
            span: Span::new(3, 12, 0, 6),
        };
        assert_eq!(format!("{}", err), "3:12: unknown mnemonic 'foobar'");
    }

    #[test]
    fn error_unknown_opcode_display() {
        let err = AsmError::UnknownOpcode {
            mnemonic: "mov".into(),
            kinds: vec![OperandKind::Immediate8, OperandKind::Register],
            span: Span::new(1, 1, 0, 9),
        };
        assert_eq!(
            format!("{}", err),
            "1:1: no 'mov' form takes (imm8, register)"
        );
    }

    #[test]
    fn error_arity_display() {
        let err = AsmError::ArityOutOfRange {
            mnemonic: "mov".into(),
            count: 3,
            min: 2,
            max: 2,
            span: Span::new(4, 1, 0, 14),
        };
        assert_eq!(format!("{}", err), "4:1: 'mov' takes 2 operand(s), got 3");

        let err = AsmError::ArityOutOfRange {
            mnemonic: "cmp".into(),
            count: 0,
            min: 1,
            max: 2,
            span: Span::new(4, 1, 0, 3),
        };
        assert_eq!(format!("{}", err), "4:1: 'cmp' takes 1 to 2 operands, got 0");
    }

    #[test]
    fn error_undefined_label_display() {
        let err = AsmError::UndefinedLabel {
            label: "my_label".into(),
            span: Span::new(10, 1, 100, 8),
        };
        assert_eq!(format!("{}", err), "10:1: undefined label 'my_label'");
    }

    #[test]
    fn error_duplicate_label_display() {
        let err = AsmError::DuplicateLabel {
            label: "loop".into(),
            span: Span::new(20, 1, 200, 4),
            first_span: Span::new(5, 1, 50, 4),
        };
        assert_eq!(
            format!("{}", err),
            "20:1: duplicate label 'loop' (first defined at 5:1)"
        );
    }

    #[test]
    fn error_resource_limit_exceeded_display() {
        let err = AsmError::ResourceLimitExceeded {
            resource: "instructions".into(),
            limit: 1_000_000,
        };
        assert_eq!(
            format!("{}", err),
            "resource limit exceeded: instructions (limit: 1000000)"
        );
        assert_eq!(err.span(), None);
    }

    #[test]
    fn error_span_accessor() {
        let span = Span::new(7, 3, 70, 2);
        let err = AsmError::UnplacedLabel {
            label: "x".into(),
            span,
        };
        assert_eq!(err.span(), Some(span));
    }
}
