//! Oriented rewrite rules.

use crate::context::RewriteContext;
use crate::protocol::ProtocolGraph;
use crate::term::{write_word, Term};
use std::fmt;

/// Stable identifier of a rule: its index in the system's append-only rule
/// vector. Identifiers survive deletion so recorded rewrite paths stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        RuleId(raw)
    }
}

/// An oriented pair of uniqued terms, `LHS => RHS`, with `LHS` greater under
/// the reduction order. Deletion is logical and permanent.
#[derive(Debug, Clone)]
pub struct Rule {
    lhs: Term,
    rhs: Term,
    deleted: bool,
}

impl Rule {
    pub(crate) fn new(lhs: Term, rhs: Term) -> Self {
        Self {
            lhs,
            rhs,
            deleted: false,
        }
    }

    pub fn lhs(&self) -> Term {
        self.lhs
    }

    pub fn rhs(&self) -> Term {
        self.rhs
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn mark_deleted(&mut self) {
        debug_assert!(!self.deleted, "rule deleted twice");
        self.deleted = true;
    }

    /// Render the rule as `LHS => RHS`, with a deletion marker if needed.
    pub fn dump(
        &self,
        out: &mut impl fmt::Write,
        ctx: &RewriteContext,
        protos: &ProtocolGraph,
    ) -> fmt::Result {
        write_word(out, &self.lhs.symbols(ctx), ctx, protos)?;
        out.write_str(" => ")?;
        write_word(out, &self.rhs.symbols(ctx), ctx, protos)?;
        if self.deleted {
            out.write_str(" [deleted]")?;
        }
        Ok(())
    }
}
