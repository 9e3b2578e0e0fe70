//! Symbols, the atoms of rewrite terms.
//!
//! A symbol is a tagged payload describing one component of a generic
//! parameter path. Symbols are hashconsed in the [`RewriteContext`], so a
//! [`SymbolId`] comparison is an equality test and terms can store plain
//! 32-bit ids.

use crate::context::RewriteContext;
use crate::protocol::{ProtocolGraph, ProtocolId};
use crate::term::{compare_words, Term};
use lasso::Spur;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// A unique identifier for an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        SymbolId(raw)
    }
}

/// The kind of a symbol. Declaration order is the rank used by the
/// reduction order's symbol comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Protocol,
    AssocType,
    GenericParam,
    Name,
    Layout,
    Superclass,
    Concrete,
}

/// A symbol with its kind-specific payload.
///
/// Interned externally; identity of interest is the [`SymbolId`] handed out
/// by [`RewriteContext::intern_symbol`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// An associated type identifier not yet resolved to a protocol.
    Name(Spur),
    /// A protocol requirement, written `[P]`.
    Protocol(ProtocolId),
    /// A generic parameter, written `τ_d_i`.
    GenericParam { depth: u32, index: u32 },
    /// An associated type known to a non-empty set of protocols, written
    /// `[P&Q:A]`. The protocol set is sorted and deduplicated.
    AssocType {
        protos: SmallVec<[ProtocolId; 2]>,
        name: Spur,
    },
    /// A layout constraint, written `[layout: L]`.
    Layout(Spur),
    /// A superclass bound with interned substitution terms, written
    /// `[superclass: C<...>]`.
    Superclass {
        class: Spur,
        substitutions: SmallVec<[Term; 2]>,
    },
    /// A concrete type bound, written `[concrete: C<...>]`.
    Concrete {
        ty: Spur,
        substitutions: SmallVec<[Term; 2]>,
    },
}

impl Symbol {
    /// Build an associated type symbol, canonicalizing the protocol set.
    pub fn assoc_type(protos: impl IntoIterator<Item = ProtocolId>, name: Spur) -> Self {
        let mut protos: SmallVec<[ProtocolId; 2]> = protos.into_iter().collect();
        protos.sort_unstable();
        protos.dedup();
        assert!(!protos.is_empty(), "associated type requires a protocol");
        Symbol::AssocType { protos, name }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Name(_) => SymbolKind::Name,
            Symbol::Protocol(_) => SymbolKind::Protocol,
            Symbol::GenericParam { .. } => SymbolKind::GenericParam,
            Symbol::AssocType { .. } => SymbolKind::AssocType,
            Symbol::Layout(_) => SymbolKind::Layout,
            Symbol::Superclass { .. } => SymbolKind::Superclass,
            Symbol::Concrete { .. } => SymbolKind::Concrete,
        }
    }

    pub fn is_superclass_or_concrete(&self) -> bool {
        matches!(
            self,
            Symbol::Superclass { .. } | Symbol::Concrete { .. }
        )
    }

    /// The protocols a word rooted at this symbol ranges over.
    pub fn root_protocols(&self) -> SmallVec<[ProtocolId; 2]> {
        match self {
            Symbol::Protocol(proto) => SmallVec::from_slice(&[*proto]),
            Symbol::AssocType { protos, .. } => protos.clone(),
            _ => SmallVec::new(),
        }
    }

    /// Order two symbols under the reduction order.
    ///
    /// Kind rank decides first; within a kind, payloads compare by protocol
    /// precedence, identifier spelling, parameter position, or pointwise
    /// substitution comparison.
    pub fn compare(
        &self,
        other: &Symbol,
        protos: &ProtocolGraph,
        ctx: &RewriteContext,
    ) -> Ordering {
        let rank = self.kind().cmp(&other.kind());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Symbol::Name(a), Symbol::Name(b)) | (Symbol::Layout(a), Symbol::Layout(b)) => {
                ctx.resolve_name(*a).cmp(ctx.resolve_name(*b))
            }
            (Symbol::Protocol(a), Symbol::Protocol(b)) => protos.compare(*a, *b),
            (
                Symbol::GenericParam { depth: d1, index: i1 },
                Symbol::GenericParam { depth: d2, index: i2 },
            ) => (d1, i1).cmp(&(d2, i2)),
            (
                Symbol::AssocType { protos: p1, name: n1 },
                Symbol::AssocType { protos: p2, name: n2 },
            ) => compare_protocol_sets(p1, p2, protos)
                .then_with(|| ctx.resolve_name(*n1).cmp(ctx.resolve_name(*n2))),
            (
                Symbol::Superclass { class: c1, substitutions: s1 },
                Symbol::Superclass { class: c2, substitutions: s2 },
            )
            | (
                Symbol::Concrete { ty: c1, substitutions: s1 },
                Symbol::Concrete { ty: c2, substitutions: s2 },
            ) => ctx
                .resolve_name(*c1)
                .cmp(ctx.resolve_name(*c2))
                .then_with(|| compare_substitutions(s1, s2, protos, ctx)),
            _ => unreachable!("kinds were equal"),
        }
    }
}

fn compare_protocol_sets(
    lhs: &[ProtocolId],
    rhs: &[ProtocolId],
    protos: &ProtocolGraph,
) -> Ordering {
    for (&a, &b) in lhs.iter().zip(rhs.iter()) {
        let ord = protos.compare(a, b);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    lhs.len().cmp(&rhs.len())
}

fn compare_substitutions(
    lhs: &[Term],
    rhs: &[Term],
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
        let a_syms = a.symbols(ctx);
        let b_syms = b.symbols(ctx);
        let ord = compare_words(&a_syms, &b_syms, protos, ctx);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Render a symbol into `out`, resolving names against the context and
/// protocol names against the graph.
pub fn write_symbol(
    out: &mut impl fmt::Write,
    symbol: &Symbol,
    ctx: &RewriteContext,
    protos: &ProtocolGraph,
) -> fmt::Result {
    match symbol {
        Symbol::Name(name) => write!(out, "{}", ctx.resolve_name(*name)),
        Symbol::Protocol(proto) => write!(out, "[{}]", protos.name(*proto)),
        Symbol::GenericParam { depth, index } => write!(out, "τ_{}_{}", depth, index),
        Symbol::AssocType { protos: set, name } => {
            out.write_char('[')?;
            for (i, &proto) in set.iter().enumerate() {
                if i > 0 {
                    out.write_char('&')?;
                }
                write!(out, "{}", protos.name(proto))?;
            }
            write!(out, ":{}]", ctx.resolve_name(*name))
        }
        Symbol::Layout(name) => write!(out, "[layout: {}]", ctx.resolve_name(*name)),
        Symbol::Superclass { class, substitutions } => {
            write!(out, "[superclass: {}", ctx.resolve_name(*class))?;
            write_substitutions(out, substitutions, ctx, protos)?;
            out.write_char(']')
        }
        Symbol::Concrete { ty, substitutions } => {
            write!(out, "[concrete: {}", ctx.resolve_name(*ty))?;
            write_substitutions(out, substitutions, ctx, protos)?;
            out.write_char(']')
        }
    }
}

fn write_substitutions(
    out: &mut impl fmt::Write,
    substitutions: &[Term],
    ctx: &RewriteContext,
    protos: &ProtocolGraph,
) -> fmt::Result {
    if substitutions.is_empty() {
        return Ok(());
    }
    out.write_char('<')?;
    for (i, &term) in substitutions.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        crate::term::write_word(out, &term.symbols(ctx), ctx, protos)?;
    }
    out.write_char('>')
}

#[cfg(test)]
#[path = "tests/symbol.rs"]
mod tests;
