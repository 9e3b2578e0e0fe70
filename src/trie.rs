//! Prefix index from rule left-hand sides to rule identifiers.
//!
//! Simplification asks, for every position of a term, whether some rule's
//! LHS starts there. The trie answers one probe in O(max LHS length) where a
//! scan over rules would cost O(rules × length). Roots are partitioned by
//! the first symbol for cache locality.
//!
//! Lookup is shortest-match: the first terminal reached along the probed
//! word wins. Deleted rules are not filtered here; callers check the rule.

use crate::metrics::Histogram;
use crate::rule::RuleId;
use crate::symbol::SymbolId;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct TrieNode {
    rule: Option<RuleId>,
    children: FxHashMap<SymbolId, TrieNode>,
}

impl TrieNode {
    fn record_fanout(&self, hist: &mut Histogram) {
        hist.record(self.children.len());
        for child in self.children.values() {
            child.record_fanout(hist);
        }
    }
}

/// The rule index keyed by LHS symbol sequences.
#[derive(Debug, Default)]
pub struct RuleTrie {
    roots: FxHashMap<SymbolId, TrieNode>,
}

impl RuleTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `rule` under the key `lhs`, returning the identifier that was
    /// previously stored for this exact key, if any.
    pub fn insert(&mut self, lhs: &[SymbolId], rule: RuleId) -> Option<RuleId> {
        debug_assert!(!lhs.is_empty());
        let mut node = self.roots.entry(lhs[0]).or_default();
        for &sym in &lhs[1..] {
            node = node.children.entry(sym).or_default();
        }
        node.rule.replace(rule)
    }

    /// Find a rule whose LHS is a prefix of `word`.
    ///
    /// When several stored keys form a prefix chain, the shortest one is
    /// returned. A key that would extend past the end of `word` never
    /// matches.
    pub fn find(&self, word: &[SymbolId]) -> Option<RuleId> {
        let mut symbols = word.iter();
        let mut node = self.roots.get(symbols.next()?)?;
        loop {
            if let Some(rule) = node.rule {
                return Some(rule);
            }
            node = node.children.get(symbols.next()?)?;
        }
    }

    /// Report fanout distributions into the context's observability sinks.
    pub(crate) fn update_histograms(&self, nodes: &mut Histogram, roots: &mut Histogram) {
        roots.record(self.roots.len());
        for root in self.roots.values() {
            root.record_fanout(nodes);
        }
    }
}

#[cfg(test)]
#[path = "tests/trie.rs"]
mod tests;
