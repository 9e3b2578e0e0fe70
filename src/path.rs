//! Rewrite steps, derivation paths, and homotopy generators.
//!
//! A step applies one rule at an offset, forward (`LHS → RHS`) or inverted.
//! A path is a sequence of steps; the empty path is the identity. Paths
//! witness how a term was derived, and a loop that starts and ends at the
//! same basepoint records that a derived equation is already implied by the
//! rules that built it.

use crate::rule::RuleId;
use crate::system::RewriteSystem;
use crate::term::MutableTerm;
use std::fmt;

/// One rule application at an offset within a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStep {
    /// Start of the rewritten subword.
    pub offset: usize,
    /// The applied rule.
    pub rule: RuleId,
    /// When set, the step rewrites `RHS → LHS`.
    pub inverse: bool,
}

impl RewriteStep {
    pub fn new(offset: usize, rule: RuleId, inverse: bool) -> Self {
        Self {
            offset,
            rule,
            inverse,
        }
    }

    pub fn invert(&mut self) {
        self.inverse = !self.inverse;
    }

    /// Apply this step to `term` in place.
    ///
    /// The matched side of the rule must occur at `offset`; a mismatch means
    /// the path does not belong to this term and is a fatal internal error.
    pub fn apply(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) {
        let ctx = system.context();
        let rule = system.rule(self.rule);
        let (from, to) = if self.inverse {
            (rule.rhs(), rule.lhs())
        } else {
            (rule.lhs(), rule.rhs())
        };

        let from_syms = from.symbols(ctx);
        let end = self.offset + from_syms.len();
        assert!(
            end <= term.len() && term.symbols()[self.offset..end] == from_syms[..],
            "rewrite step does not match the term at its offset"
        );

        term.rewrite_sub_term(self.offset, end, &to.symbols(ctx));
    }

    /// Render the step applied to `term` as `prefix.(LHS => RHS).suffix`,
    /// mutating `term` so consecutive steps of a path render correctly.
    pub fn dump(
        &self,
        out: &mut impl fmt::Write,
        term: &mut MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> fmt::Result {
        let ctx = system.context();
        let protos = system.protocols();
        let rule = system.rule(self.rule);

        let matched_len = if self.inverse {
            rule.rhs().len(ctx)
        } else {
            rule.lhs().len(ctx)
        };
        let prefix = &term.symbols()[..self.offset];
        let suffix = &term.symbols()[self.offset + matched_len..];

        if !prefix.is_empty() {
            crate::term::write_word(out, prefix, ctx, protos)?;
            out.write_char('.')?;
        }
        out.write_char('(')?;
        crate::term::write_word(out, &rule.lhs().symbols(ctx), ctx, protos)?;
        out.write_str(if self.inverse { " <= " } else { " => " })?;
        crate::term::write_word(out, &rule.rhs().symbols(ctx), ctx, protos)?;
        out.write_char(')')?;
        if !suffix.is_empty() {
            out.write_char('.')?;
            crate::term::write_word(out, suffix, ctx, protos)?;
        }

        self.apply(term, system);
        Ok(())
    }
}

/// An ordered sequence of rewrite steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewritePath {
    steps: Vec<RewriteStep>,
}

impl RewritePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn add(&mut self, step: RewriteStep) {
        self.steps.push(step);
    }

    pub fn append(&mut self, other: &RewritePath) {
        self.steps.extend_from_slice(&other.steps);
    }

    /// Reverse the step sequence and toggle every step's direction, turning a
    /// derivation of `u → v` into one of `v → u`.
    pub fn invert(&mut self) {
        self.steps.reverse();
        for step in &mut self.steps {
            step.invert();
        }
    }

    /// Apply every step to `term` in order.
    pub fn apply(&self, term: &mut MutableTerm, system: &RewriteSystem<'_>) {
        for step in &self.steps {
            step.apply(term, system);
        }
    }

    /// Render the path applied to `term`, steps joined with ` ⊗ `.
    pub fn dump(
        &self,
        out: &mut impl fmt::Write,
        mut term: MutableTerm,
        system: &RewriteSystem<'_>,
    ) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                out.write_str(" ⊗ ")?;
            }
            step.dump(out, &mut term, system)?;
        }
        Ok(())
    }
}

/// A loop: applying `path` to `basepoint` is defined at every step and
/// returns to `basepoint`. The log of loops is the input to the later
/// minimal-presentation computation.
#[derive(Debug, Clone)]
pub struct HomotopyGenerator {
    pub basepoint: MutableTerm,
    pub path: RewritePath,
}

#[cfg(test)]
#[path = "tests/path.rs"]
mod tests;
