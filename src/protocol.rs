//! The protocol refinement graph consumed by the reduction order.
//!
//! The graph is built by the requirement front end before any rules exist and
//! is borrowed, read-only, for the lifetime of a rewrite system. Precedence is
//! the insertion index, so hosts insert protocols in the order the reduction
//! order should rank them.

use smallvec::SmallVec;
use std::cmp::Ordering;

/// A unique identifier for a protocol in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(u32);

impl ProtocolId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub(crate) fn from_raw(raw: u32) -> Self {
        ProtocolId(raw)
    }
}

#[derive(Debug, Clone)]
struct ProtocolInfo {
    name: Box<str>,
    /// Reflexive transitive closure of the protocols this one refines.
    ancestors: SmallVec<[ProtocolId; 4]>,
}

/// The DAG of protocol refinement.
///
/// Guarantees:
/// - `precedence` is total and stable for the graph's lifetime
/// - `refines` is reflexive and transitive
/// - protocols a symbol refers to always outlive the symbol
#[derive(Debug, Clone, Default)]
pub struct ProtocolGraph {
    protos: Vec<ProtocolInfo>,
}

impl ProtocolGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self { protos: Vec::new() }
    }

    /// Add a protocol refining the given, previously added protocols.
    ///
    /// The ancestry closure is computed eagerly so `refines` is a flat
    /// membership test.
    pub fn add_protocol(&mut self, name: &str, refines: &[ProtocolId]) -> ProtocolId {
        let id = ProtocolId(self.protos.len() as u32);
        let mut ancestors: SmallVec<[ProtocolId; 4]> = SmallVec::new();
        ancestors.push(id);
        for &base in refines {
            assert!(
                (base.0 as usize) < self.protos.len(),
                "refined protocol added after its refinement"
            );
            for &anc in &self.protos[base.0 as usize].ancestors {
                if !ancestors.contains(&anc) {
                    ancestors.push(anc);
                }
            }
        }
        self.protos.push(ProtocolInfo {
            name: name.into(),
            ancestors,
        });
        id
    }

    /// The precedence of a protocol in the reduction order. Lower is smaller.
    pub fn precedence(&self, proto: ProtocolId) -> u32 {
        debug_assert!((proto.0 as usize) < self.protos.len());
        proto.0
    }

    /// Does `sub` refine `base`? Reflexive and transitive.
    pub fn refines(&self, sub: ProtocolId, base: ProtocolId) -> bool {
        self.protos[sub.0 as usize].ancestors.contains(&base)
    }

    /// Order two protocols by precedence.
    pub fn compare(&self, lhs: ProtocolId, rhs: ProtocolId) -> Ordering {
        self.precedence(lhs).cmp(&self.precedence(rhs))
    }

    /// Resolve a protocol to its name.
    pub fn name(&self, proto: ProtocolId) -> &str {
        &self.protos[proto.0 as usize].name
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/protocol.rs"]
mod tests;
