//! The shared rewrite context: interners, debug flags, observability sinks.
//!
//! The context owns three stores with interior mutability, so interning works
//! through a shared reference and frozen rewrite systems can be read from
//! several threads:
//!
//! - a string interner for identifiers,
//! - a symbol hashcons mapping [`Symbol`] payloads to dense [`SymbolId`]s,
//! - a term hashcons mapping symbol sequences to dense term ids.
//!
//! Guarantees:
//! - structurally equal symbols and words always intern to the same id
//! - ids are dense and resolvable for the context's lifetime

use crate::metrics::Histogram;
use crate::symbol::{Symbol, SymbolId};
use crate::term::TermId;
use hashbrown::HashMap;
use lasso::{Spur, ThreadedRodeo};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

/// Debug flag bit set controlling diagnostic tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugFlags(u32);

impl DebugFlags {
    pub const NONE: Self = Self(0);
    /// Trace rule additions, orientation, and recorded loops.
    pub const ADD: Self = Self(1 << 0);
    /// Trace term simplification.
    pub const SIMPLIFY: Self = Self(1 << 1);
    /// Trace post-completion minimization.
    pub const COMPLETION: Self = Self(1 << 2);
    /// Trace merged associated type observations.
    pub const MERGE: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for DebugFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Number of shards for the term hashcons map (power of 2 for fast modulo).
const NUM_SHARDS: usize = 16;

/// Shared state for one type-checking session's rewrite systems.
pub struct RewriteContext {
    /// Interned identifier strings.
    names: ThreadedRodeo,
    /// Central storage of all symbols, indexed by SymbolId.
    symbols: RwLock<Vec<Symbol>>,
    symbol_ids: RwLock<HashMap<Symbol, SymbolId>>,
    /// Central storage of all uniqued words, indexed by TermId.
    term_nodes: RwLock<Vec<Box<[SymbolId]>>>,
    /// Sharded hashcons maps for reducing contention.
    term_shards: [RwLock<HashMap<Box<[SymbolId]>, TermId>>; NUM_SHARDS],
    next_term_id: AtomicU32,
    debug: DebugFlags,
    /// Fanout of interior rule trie nodes, reported at system teardown.
    pub(crate) rule_trie_histogram: Mutex<Histogram>,
    /// Fanout of the rule trie root partition, reported at system teardown.
    pub(crate) rule_trie_root_histogram: Mutex<Histogram>,
}

impl RewriteContext {
    pub fn new() -> Self {
        Self::with_debug(DebugFlags::NONE)
    }

    pub fn with_debug(debug: DebugFlags) -> Self {
        let term_shards = std::array::from_fn(|_| RwLock::new(HashMap::new()));
        Self {
            names: ThreadedRodeo::new(),
            symbols: RwLock::new(Vec::new()),
            symbol_ids: RwLock::new(HashMap::new()),
            term_nodes: RwLock::new(Vec::new()),
            term_shards,
            next_term_id: AtomicU32::new(0),
            debug,
            rule_trie_histogram: Mutex::new(Histogram::new()),
            rule_trie_root_histogram: Mutex::new(Histogram::new()),
        }
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }

    /// Intern an identifier string.
    pub fn intern_name(&self, name: &str) -> Spur {
        self.names.get_or_intern(name)
    }

    /// Resolve an interned identifier back to its spelling.
    pub fn resolve_name(&self, name: Spur) -> &str {
        self.names.resolve(&name)
    }

    /// Intern a symbol, returning its id. Structurally equal symbols get the
    /// same id.
    pub fn intern_symbol(&self, symbol: Symbol) -> SymbolId {
        {
            if let Some(&id) = self.symbol_ids.read().get(&symbol) {
                return id;
            }
        }

        let mut map = self.symbol_ids.write();
        if let Some(&id) = map.get(&symbol) {
            return id;
        }

        let mut nodes = self.symbols.write();
        let id = SymbolId::from_raw(nodes.len() as u32);
        nodes.push(symbol.clone());
        map.insert(symbol, id);
        id
    }

    /// Resolve a symbol id to its payload.
    pub fn symbol(&self, id: SymbolId) -> Symbol {
        self.symbols.read()[id.raw() as usize].clone()
    }

    /// Unique a word, returning its term id.
    pub(crate) fn intern_term(&self, word: &[SymbolId]) -> TermId {
        let shard = &self.term_shards[Self::shard_index(word)];

        // Fast path: the word is already uniqued (read lock).
        {
            if let Some(&id) = shard.read().get(word) {
                return id;
            }
        }

        let mut map = shard.write();

        // Double-check after acquiring the write lock.
        if let Some(&id) = map.get(word) {
            return id;
        }

        let id = TermId::from_raw(self.next_term_id.fetch_add(1, Ordering::Relaxed));
        let key: Box<[SymbolId]> = word.into();
        {
            let mut nodes = self.term_nodes.write();
            let idx = id.raw() as usize;
            if nodes.len() <= idx {
                nodes.resize(idx + 1, Box::from([]));
            }
            nodes[idx] = key.clone();
        }
        map.insert(key, id);
        id
    }

    pub(crate) fn term_symbols(&self, id: TermId) -> Box<[SymbolId]> {
        self.term_nodes.read()[id.raw() as usize].clone()
    }

    pub(crate) fn term_len(&self, id: TermId) -> usize {
        self.term_nodes.read()[id.raw() as usize].len()
    }

    /// Render the trie fanout histograms accumulated from dropped systems.
    pub fn dump_histograms(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        writeln!(out, "Rule trie node fanout: {{")?;
        write!(out, "{}", self.rule_trie_histogram.lock())?;
        writeln!(out, "}}")?;
        writeln!(out, "Rule trie root fanout: {{")?;
        write!(out, "{}", self.rule_trie_root_histogram.lock())?;
        writeln!(out, "}}")
    }

    fn shard_index(word: &[SymbolId]) -> usize {
        let mut hasher = FxHasher::default();
        word.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/context.rs"]
mod tests;
