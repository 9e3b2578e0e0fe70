use crate::context::RewriteContext;
use crate::protocol::ProtocolGraph;
use crate::symbol::{Symbol, SymbolId};
use crate::term::MutableTerm;

pub(crate) fn setup() -> (RewriteContext, ProtocolGraph) {
    (RewriteContext::new(), ProtocolGraph::new())
}

/// Intern a name symbol for a single letter. The symbol comparator orders
/// letters by spelling, so `a < b < c < …` under the reduction order.
pub(crate) fn letter(ctx: &RewriteContext, letter: char) -> SymbolId {
    ctx.intern_symbol(Symbol::Name(ctx.intern_name(letter.encode_utf8(&mut [0; 4]))))
}

/// Build a word from one name symbol per character.
pub(crate) fn word(ctx: &RewriteContext, letters: &str) -> MutableTerm {
    MutableTerm::from_symbols(letters.chars().map(|c| letter(ctx, c)))
}
