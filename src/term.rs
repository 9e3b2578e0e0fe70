//! Words over symbols: uniqued [`Term`]s, in-place [`MutableTerm`]s, and the
//! reduction order.
//!
//! A term is a non-empty ordered sequence of symbols. Uniqued terms are what
//! rules store; mutable terms are what simplification rewrites in place. The
//! reduction order over words is shortlex: longer words are greater, and
//! equal-length words compare symbol by symbol using the protocol graph.

use crate::context::RewriteContext;
use crate::protocol::{ProtocolGraph, ProtocolId};
use crate::symbol::{write_symbol, SymbolId};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// Unique identifier for a word in the context's term store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        TermId(raw)
    }
}

/// An immutable, uniqued, non-empty word.
///
/// Two terms are equal iff their symbol sequences are identical, so equality
/// is an id comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Term(TermId);

impl Term {
    /// Unique a mutable term's content. The term must be non-empty.
    pub fn get(term: &MutableTerm, ctx: &RewriteContext) -> Term {
        assert!(!term.is_empty(), "cannot unique the empty term");
        Term(ctx.intern_term(term.symbols()))
    }

    pub fn id(self) -> TermId {
        self.0
    }

    /// The symbol sequence of this term.
    pub fn symbols(self, ctx: &RewriteContext) -> SmallVec<[SymbolId; 8]> {
        SmallVec::from_slice(&ctx.term_symbols(self.0))
    }

    pub fn len(self, ctx: &RewriteContext) -> usize {
        ctx.term_len(self.0)
    }

    /// The protocols at this word's root.
    pub fn root_protocols(self, ctx: &RewriteContext) -> SmallVec<[ProtocolId; 2]> {
        root_protocols(&ctx.term_symbols(self.0), ctx)
    }
}

/// A non-empty mutable word supporting subterm splice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MutableTerm {
    symbols: SmallVec<[SymbolId; 8]>,
}

impl MutableTerm {
    /// An empty word. Only useful as a prefix/suffix scratch buffer; the
    /// rewrite system rejects empty terms at its boundaries.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_symbols(symbols: impl IntoIterator<Item = SymbolId>) -> Self {
        Self {
            symbols: symbols.into_iter().collect(),
        }
    }

    pub fn from_term(term: Term, ctx: &RewriteContext) -> Self {
        Self {
            symbols: SmallVec::from_slice(&ctx.term_symbols(term.id())),
        }
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn push(&mut self, symbol: SymbolId) {
        self.symbols.push(symbol);
    }

    pub fn append(&mut self, symbols: &[SymbolId]) {
        self.symbols.extend_from_slice(symbols);
    }

    /// Replace the subword `[from, to)` with `replacement`.
    pub fn rewrite_sub_term(&mut self, from: usize, to: usize, replacement: &[SymbolId]) {
        debug_assert!(from <= to && to <= self.symbols.len());
        if to - from == replacement.len() {
            self.symbols[from..to].copy_from_slice(replacement);
            return;
        }
        let mut out: SmallVec<[SymbolId; 8]> =
            SmallVec::with_capacity(self.symbols.len() - (to - from) + replacement.len());
        out.extend_from_slice(&self.symbols[..from]);
        out.extend_from_slice(replacement);
        out.extend_from_slice(&self.symbols[to..]);
        self.symbols = out;
    }

    /// Order this word against another under the reduction order.
    pub fn compare(
        &self,
        other: &MutableTerm,
        protos: &ProtocolGraph,
        ctx: &RewriteContext,
    ) -> Ordering {
        compare_words(&self.symbols, &other.symbols, protos, ctx)
    }

    /// The protocols at this word's root.
    pub fn root_protocols(&self, ctx: &RewriteContext) -> SmallVec<[ProtocolId; 2]> {
        root_protocols(&self.symbols, ctx)
    }
}

/// Shortlex comparison of two words.
///
/// Longer words are greater; equal-length words compare pointwise via
/// [`Symbol::compare`](crate::symbol::Symbol::compare). Hashconsing makes the
/// equal-id fast path an equality test.
pub fn compare_words(
    lhs: &[SymbolId],
    rhs: &[SymbolId],
    protos: &ProtocolGraph,
    ctx: &RewriteContext,
) -> Ordering {
    let len = lhs.len().cmp(&rhs.len());
    if len != Ordering::Equal {
        return len;
    }
    for (&a, &b) in lhs.iter().zip(rhs.iter()) {
        if a == b {
            continue;
        }
        let ord = ctx.symbol(a).compare(&ctx.symbol(b), protos, ctx);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn root_protocols(word: &[SymbolId], ctx: &RewriteContext) -> SmallVec<[ProtocolId; 2]> {
    match word.first() {
        Some(&root) => ctx.symbol(root).root_protocols(),
        None => SmallVec::new(),
    }
}

/// Render a word into `out`. Symbols are concatenated without separators;
/// bracketed symbol kinds self-delimit.
pub fn write_word(
    out: &mut impl fmt::Write,
    word: &[SymbolId],
    ctx: &RewriteContext,
    protos: &ProtocolGraph,
) -> fmt::Result {
    for &sym in word {
        write_symbol(out, &ctx.symbol(sym), ctx, protos)?;
    }
    Ok(())
}

/// Render a word to a fresh string.
pub fn format_word(word: &[SymbolId], ctx: &RewriteContext, protos: &ProtocolGraph) -> String {
    let mut out = String::new();
    let _ = write_word(&mut out, word, ctx, protos);
    out
}

#[cfg(test)]
#[path = "tests/term.rs"]
mod tests;
