//! Label table: label name → index of the instruction it precedes.
//!
//! The table never owns instructions. It stores [`InstrId`]s into the
//! owning [`Program`](crate::program::Program)'s instruction arena, so a
//! lookup always observes the location written by pass 1.

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::error::{AsmError, Span};

/// Stable index of an instruction inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    /// Position of the instruction in program order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What to do when a label name is declared twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplicateLabelPolicy {
    /// The later declaration replaces the earlier one.
    #[default]
    Overwrite,
    /// A second declaration fails with [`AsmError::DuplicateLabel`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelDef {
    target: InstrId,
    span: Span,
}

/// Mapping from label name to the instruction that follows its declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    defs: BTreeMap<String, LabelDef>,
}

impl LabelTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `target`.
    ///
    /// Returns the previous target when an existing binding was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`AsmError::DuplicateLabel`] under
    /// [`DuplicateLabelPolicy::Reject`] if `name` is already bound.
    pub fn define(
        &mut self,
        name: &str,
        target: InstrId,
        span: Span,
        policy: DuplicateLabelPolicy,
    ) -> Result<Option<InstrId>, AsmError> {
        if let Some(existing) = self.defs.get(name) {
            if policy == DuplicateLabelPolicy::Reject {
                return Err(AsmError::DuplicateLabel {
                    label: String::from(name),
                    span,
                    first_span: existing.span,
                });
            }
            tracing::warn!(
                label = name,
                line = span.line,
                first_line = existing.span.line,
                "label redefined; later declaration wins"
            );
        }
        let previous = self
            .defs
            .insert(String::from(name), LabelDef { target, span });
        Ok(previous.map(|def| def.target))
    }

    /// Target of `name`, if bound.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<InstrId> {
        self.defs.get(name).map(|def| def.target)
    }

    /// Where `name` was declared, if bound.
    #[must_use]
    pub fn span_of(&self, name: &str) -> Option<Span> {
        self.defs.get(name).map(|def| def.span)
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Number of bound labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether no labels are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, InstrId)> + '_ {
        self.defs
            .iter()
            .map(|(name, def)| (name.as_str(), def.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: u32) -> Span {
        Span::new(line, 1, 0, 0)
    }

    #[test]
    fn define_and_lookup() {
        let mut table = LabelTable::new();
        assert!(table.is_empty());
        let prev = table
            .define("start", InstrId(0), span(1), DuplicateLabelPolicy::Overwrite)
            .unwrap();
        assert_eq!(prev, None);
        assert_eq!(table.get("start"), Some(InstrId(0)));
        assert_eq!(table.span_of("start"), Some(span(1)));
        assert!(table.contains("start"));
        assert_eq!(table.get("missing"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn overwrite_policy_replaces_silently() {
        let mut table = LabelTable::new();
        table
            .define("x", InstrId(0), span(1), DuplicateLabelPolicy::Overwrite)
            .unwrap();
        let prev = table
            .define("x", InstrId(3), span(5), DuplicateLabelPolicy::Overwrite)
            .unwrap();
        assert_eq!(prev, Some(InstrId(0)));
        assert_eq!(table.get("x"), Some(InstrId(3)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn reject_policy_errors_and_keeps_first() {
        let mut table = LabelTable::new();
        table
            .define("x", InstrId(0), span(1), DuplicateLabelPolicy::Reject)
            .unwrap();
        let err = table
            .define("x", InstrId(3), span(5), DuplicateLabelPolicy::Reject)
            .unwrap_err();
        assert_eq!(
            err,
            AsmError::DuplicateLabel {
                label: "x".into(),
                span: span(5),
                first_span: span(1),
            }
        );
        assert_eq!(table.get("x"), Some(InstrId(0)));
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut table = LabelTable::new();
        for (i, name) in ["zeta", "alpha", "mid"].iter().enumerate() {
            table
                .define(name, InstrId(i), span(1), DuplicateLabelPolicy::Overwrite)
                .unwrap();
        }
        let names: alloc::vec::Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn default_policy_is_overwrite() {
        assert_eq!(DuplicateLabelPolicy::default(), DuplicateLabelPolicy::Overwrite);
    }
}
