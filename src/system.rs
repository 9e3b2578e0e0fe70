//! The rewrite system: rule store, simplification, insertion, minimization.
//!
//! Requirements on generic parameter paths arrive as pairs of words; the
//! system orients each pair under the reduction order, keeps the oriented
//! rules indexed in a trie, reduces terms to normal form by leftmost rule
//! application, and records a homotopy generator whenever a derived equation
//! turns out to be implied by the rules that built it. After the completion
//! driver reports confluence, [`RewriteSystem::simplify_system`] minimizes
//! the rule set; deletion is logical so historical paths stay valid.

use crate::context::{DebugFlags, RewriteContext};
use crate::path::{HomotopyGenerator, RewritePath, RewriteStep};
use crate::protocol::ProtocolGraph;
use crate::rule::{Rule, RuleId};
use crate::symbol::{Symbol, SymbolId, SymbolKind};
use crate::term::{format_word, MutableTerm, Term};
use crate::trie::RuleTrie;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use tracing::debug;

/// Observer invoked on every added rule; registered by the type checker to
/// merge equivalent associated-type records upstream.
type MergeObserver<'r> = Box<dyn FnMut(Term, Term) + 'r>;

/// A rewrite system over words of interned symbols.
///
/// Single-threaded and synchronous: all mutation goes through one owning
/// handle. Rules and homotopy generators are append-only; deleted rules keep
/// their slot and identifier.
pub struct RewriteSystem<'r> {
    ctx: &'r RewriteContext,
    protos: Option<&'r ProtocolGraph>,
    rules: Vec<Rule>,
    trie: RuleTrie,
    homotopy: Vec<HomotopyGenerator>,
    debug: DebugFlags,
    driver_reported_errors: bool,
    merge_observer: Option<MergeObserver<'r>>,
}

impl<'r> RewriteSystem<'r> {
    pub fn new(ctx: &'r RewriteContext) -> Self {
        Self {
            ctx,
            protos: None,
            rules: Vec::new(),
            trie: RuleTrie::new(),
            homotopy: Vec::new(),
            debug: ctx.debug_flags(),
            driver_reported_errors: false,
            merge_observer: None,
        }
    }

    /// Consume the initial requirement pairs. Pairs need not be oriented;
    /// each is forwarded to [`RewriteSystem::add_rule`] without a derivation.
    pub fn initialize(
        &mut self,
        rules: Vec<(MutableTerm, MutableTerm)>,
        protos: &'r ProtocolGraph,
    ) {
        assert!(self.protos.is_none(), "rewrite system initialized twice");
        self.protos = Some(protos);

        for (lhs, rhs) in rules {
            self.add_rule(lhs, rhs, None);
        }
    }

    pub fn context(&self) -> &'r RewriteContext {
        self.ctx
    }

    pub fn protocols(&self) -> &'r ProtocolGraph {
        self.protos.expect("rewrite system not initialized")
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rules_len(&self) -> usize {
        self.rules.len()
    }

    pub fn homotopy_generators(&self) -> &[HomotopyGenerator] {
        &self.homotopy
    }

    /// Register the `check_merged_associated_type` hook.
    pub fn set_merge_observer(&mut self, observer: impl FnMut(Term, Term) + 'r) {
        self.merge_observer = Some(Box::new(observer));
    }

    /// Tell the system the driver diagnosed malformed input, relaxing the
    /// structural checks that only hold for well-formed requirements.
    pub fn set_driver_reported_errors(&mut self, reported: bool) {
        self.driver_reported_errors = reported;
    }

    /// Reduce `term` to normal form under the current rules, returning
    /// whether anything changed.
    ///
    /// Each pass scans positions left to right, probing the trie with the
    /// suffix starting at each position; the first applicable non-deleted
    /// rule is spliced in and the scan restarts, so the leftmost match always
    /// rewrites first. If `path` is given, one step per splice is appended.
    pub fn simplify(&self, term: &mut MutableTerm, mut path: Option<&mut RewritePath>) -> bool {
        assert!(!term.is_empty(), "cannot simplify the empty term");

        let trace_enabled = self.debug.contains(DebugFlags::SIMPLIFY);
        let original = trace_enabled.then(|| term.clone());
        // Scratch recorder so the trace can be rendered when the caller did
        // not ask for a path.
        let mut scratch = (trace_enabled && path.is_none()).then(RewritePath::new);
        let recorded_from = path.as_deref().map_or(0, RewritePath::len);

        let mut changed = false;
        loop {
            let mut try_again = false;

            let mut from = 0;
            while from < term.len() {
                if let Some(rule_id) = self.trie.find(&term.symbols()[from..]) {
                    let rule = &self.rules[rule_id.index()];
                    if !rule.is_deleted() {
                        let lhs = rule.lhs().symbols(self.ctx);
                        let to = from + lhs.len();
                        debug_assert_eq!(&term.symbols()[from..to], &lhs[..]);

                        term.rewrite_sub_term(from, to, &rule.rhs().symbols(self.ctx));

                        let step = RewriteStep::new(from, rule_id, false);
                        if let Some(path) = path.as_deref_mut() {
                            path.add(step);
                        } else if let Some(scratch) = scratch.as_mut() {
                            scratch.add(step);
                        }

                        changed = true;
                        try_again = true;
                        break;
                    }
                }

                from += 1;
            }

            if !try_again {
                break;
            }
        }

        if let Some(original) = original {
            self.trace_simplify(term, original, changed, &path, &scratch, recorded_from);
        }

        debug_assert!(
            path.as_deref()
                .map_or(true, |p| changed == (p.len() > recorded_from)),
            "simplify must record steps exactly when it changes the term"
        );
        changed
    }

    fn trace_simplify(
        &self,
        term: &MutableTerm,
        original: MutableTerm,
        changed: bool,
        path: &Option<&mut RewritePath>,
        scratch: &Option<RewritePath>,
        recorded_from: usize,
    ) {
        let Some(protos) = self.protos else {
            return;
        };
        if !changed {
            debug!(
                target: "reqrw::simplify",
                "irreducible term: {}",
                format_word(term.symbols(), self.ctx, protos)
            );
            return;
        }

        let steps: &[RewriteStep] = match (path.as_deref(), scratch) {
            (Some(path), _) => &path.steps()[recorded_from..],
            (None, Some(scratch)) => scratch.steps(),
            (None, None) => &[],
        };
        let mut rendered = String::new();
        let mut replay = original;
        for (i, step) in steps.iter().enumerate() {
            if i > 0 {
                rendered.push_str(" ⊗ ");
            }
            let _ = step.dump(&mut rendered, &mut replay, self);
        }
        debug!(
            target: "reqrw::simplify",
            "simplified {}: {}",
            format_word(term.symbols(), self.ctx, protos),
            rendered
        );
    }

    /// Add a rewrite rule, returning whether the rule was non-trivial.
    ///
    /// Both sides are simplified first; if they collapse to the same word the
    /// rule is redundant, and when a derivation `path` witnesses it, the
    /// collapse is recorded as a homotopy generator instead of a rule.
    /// Otherwise the pair is oriented so the greater side rewrites to the
    /// smaller, interned, indexed, and reported to the merge observer.
    pub fn add_rule(
        &mut self,
        mut lhs: MutableTerm,
        mut rhs: MutableTerm,
        path: Option<&RewritePath>,
    ) -> bool {
        assert!(!lhs.is_empty(), "cannot add a rule with an empty left-hand side");
        assert!(!rhs.is_empty(), "cannot add a rule with an empty right-hand side");
        let protos = self.protocols();

        if self.debug.contains(DebugFlags::ADD) {
            debug!(
                target: "reqrw::add",
                "adding rule {} == {}",
                format_word(lhs.symbols(), self.ctx, protos),
                format_word(rhs.symbols(), self.ctx, protos)
            );
        }

        // Simplifying both sides up front keeps the rule base small and
        // speeds up later matching.
        let mut lhs_path = RewritePath::new();
        let mut rhs_path = RewritePath::new();
        self.simplify(&mut lhs, Some(&mut lhs_path));
        self.simplify(&mut rhs, Some(&mut rhs_path));

        let mut loop_path = RewritePath::new();
        if let Some(path) = path {
            // From the simplified lhs back up to the original lhs, across
            // the caller's derivation, then down to the simplified rhs.
            lhs_path.invert();
            loop_path.append(&lhs_path);
            loop_path.append(path);
            loop_path.append(&rhs_path);
        }

        match lhs.compare(&rhs, protos, self.ctx) {
            Ordering::Equal => {
                // Both sides collapse to one word: the rule is a consequence
                // of existing rules, and the loop already closes.
                if path.is_some() {
                    if self.debug.contains(DebugFlags::ADD) {
                        let mut rendered = String::new();
                        let _ = loop_path.dump(&mut rendered, lhs.clone(), self);
                        debug!(
                            target: "reqrw::add",
                            "recorded trivial loop at {}: {}",
                            format_word(lhs.symbols(), self.ctx, protos),
                            rendered
                        );
                    }
                    self.homotopy.push(HomotopyGenerator {
                        basepoint: lhs,
                        path: loop_path,
                    });
                }
                return false;
            }
            Ordering::Less => {
                mem::swap(&mut lhs, &mut rhs);
                loop_path.invert();
            }
            Ordering::Greater => {}
        }
        debug_assert_eq!(lhs.compare(&rhs, protos, self.ctx), Ordering::Greater);

        if self.debug.contains(DebugFlags::ADD) {
            debug!(
                target: "reqrw::add",
                "simplified and oriented rule {} => {}",
                format_word(lhs.symbols(), self.ctx, protos),
                format_word(rhs.symbols(), self.ctx, protos)
            );
        }

        let new_rule_id = RuleId::from_raw(self.rules.len() as u32);
        let uniqued_lhs = Term::get(&lhs, self.ctx);
        let uniqued_rhs = Term::get(&rhs, self.ctx);
        self.rules.push(Rule::new(uniqued_lhs, uniqued_rhs));

        if path.is_some() {
            // Applying the new rule in reverse closes the loop at the
            // simplified lhs.
            loop_path.add(RewriteStep::new(0, new_rule_id, true));
            if self.debug.contains(DebugFlags::ADD) {
                let mut rendered = String::new();
                let _ = loop_path.dump(&mut rendered, lhs.clone(), self);
                debug!(
                    target: "reqrw::add",
                    "recorded loop at {}: {}",
                    format_word(lhs.symbols(), self.ctx, protos),
                    rendered
                );
            }
            self.homotopy.push(HomotopyGenerator {
                basepoint: lhs.clone(),
                path: loop_path,
            });
        }

        if let Some(old_rule) = self.trie.insert(lhs.symbols(), new_rule_id) {
            self.duplicate_rule(old_rule, &lhs);
        }

        if let Some(observer) = self.merge_observer.as_mut() {
            observer(uniqued_lhs, uniqued_rhs);
        }

        true
    }

    /// Two non-deleted rules sharing an LHS would make rewriting ambiguous;
    /// simplification is supposed to make that unrepresentable, so hitting
    /// this is an internal bug worth a full replay before aborting.
    #[cold]
    fn duplicate_rule(&mut self, old_rule: RuleId, lhs: &MutableTerm) -> ! {
        eprintln!("Duplicate rewrite rule!");
        let mut rendered = String::new();
        let _ = self.rule(old_rule).dump(&mut rendered, self.ctx, self.protocols());
        eprintln!("Old rule #{}: {}", old_rule.raw(), rendered);

        eprintln!("Replaying the simplification of the new left-hand side:");
        self.debug.insert(DebugFlags::SIMPLIFY);
        let mut term = lhs.clone();
        self.simplify(&mut term, None);

        let mut dumped = String::new();
        let _ = self.dump(&mut dumped);
        eprintln!("{dumped}");
        panic!("Duplicate rewrite rule!");
    }

    /// Minimize the rule set: delete rules whose LHS is reducible by another
    /// rule, and replace rules whose RHS is no longer in normal form.
    ///
    /// Sound only once the completion driver reports the system confluent;
    /// run exactly once. Replaced rules log a homotopy generator connecting
    /// the old and new rule through the shared LHS.
    pub fn simplify_system(&mut self) {
        let num_rules = self.rules.len();
        for index in 0..num_rules {
            let rule_id = RuleId::from_raw(index as u32);
            if self.rules[index].is_deleted() {
                continue;
            }

            // First, see if some other rule's LHS occurs inside this one's.
            let lhs = self.rules[index].lhs();
            let lhs_syms = lhs.symbols(self.ctx);
            let mut begin = 0;
            while begin < lhs_syms.len() {
                let found = self.trie.find(&lhs_syms[begin..]);
                begin += 1;
                if let Some(other) = found {
                    // A rule does not obsolete itself.
                    if other == rule_id {
                        continue;
                    }
                    if self.rules[other.index()].is_deleted() {
                        continue;
                    }

                    if self.debug.contains(DebugFlags::COMPLETION) {
                        debug!(
                            target: "reqrw::completion",
                            "deleting rule #{}: its left-hand side contains the left-hand side of #{}",
                            rule_id.raw(),
                            other.raw()
                        );
                    }
                    self.rules[index].mark_deleted();
                    break;
                }
            }

            if self.rules[index].is_deleted() {
                continue;
            }

            // Now, try to reduce the right-hand side.
            let mut rhs_path = RewritePath::new();
            let mut rhs = MutableTerm::from_term(self.rules[index].rhs(), self.ctx);
            if !self.simplify(&mut rhs, Some(&mut rhs_path)) {
                continue;
            }

            // The old rule won't apply anymore.
            self.rules[index].mark_deleted();

            let new_rule_id = RuleId::from_raw(self.rules.len() as u32);
            let new_rhs = Term::get(&rhs, self.ctx);
            self.rules.push(Rule::new(lhs, new_rhs));

            let replaced = self.trie.insert(&lhs_syms, new_rule_id);
            debug_assert_eq!(replaced, Some(rule_id));

            // A loop at the simplified rhs: back up to the original rhs,
            // across the old rule in reverse to the shared LHS, then down
            // through the new rule.
            let mut loop_path = RewritePath::new();
            rhs_path.invert();
            loop_path.append(&rhs_path);
            loop_path.add(RewriteStep::new(0, rule_id, true));
            loop_path.add(RewriteStep::new(0, new_rule_id, false));

            if self.debug.contains(DebugFlags::COMPLETION) {
                let mut rendered = String::new();
                let _ = loop_path.dump(&mut rendered, rhs.clone(), self);
                debug!(
                    target: "reqrw::completion",
                    "right-hand side simplification recorded a loop: {}",
                    rendered
                );
            }

            self.homotopy.push(HomotopyGenerator {
                basepoint: rhs,
                path: loop_path,
            });
        }
    }

    /// Map a superclass or concrete type symbol to the same symbol with every
    /// embedded substitution term simplified. Other symbols pass through.
    pub fn simplify_substitutions_in_superclass_or_concrete_symbol(
        &self,
        symbol: SymbolId,
    ) -> SymbolId {
        match self.ctx.symbol(symbol) {
            Symbol::Superclass { class, substitutions } => {
                let substitutions = substitutions
                    .into_iter()
                    .map(|term| self.simplified_term(term))
                    .collect();
                self.ctx.intern_symbol(Symbol::Superclass { class, substitutions })
            }
            Symbol::Concrete { ty, substitutions } => {
                let substitutions = substitutions
                    .into_iter()
                    .map(|term| self.simplified_term(term))
                    .collect();
                self.ctx.intern_symbol(Symbol::Concrete { ty, substitutions })
            }
            _ => symbol,
        }
    }

    fn simplified_term(&self, term: Term) -> Term {
        let mut word = MutableTerm::from_term(term, self.ctx);
        if !self.simplify(&mut word, None) {
            return term;
        }
        Term::get(&word, self.ctx)
    }

    /// Structural audit of every non-deleted rule. Compiled to a no-op in
    /// release builds; any failure here is a bug in the rewrite machinery or
    /// its driver, not in user input, so the whole system is dumped before
    /// aborting.
    pub fn verify(&self) {
        if !cfg!(debug_assertions) {
            return;
        }

        for rule in &self.rules {
            if rule.is_deleted() {
                continue;
            }

            let lhs = rule.lhs().symbols(self.ctx);
            let rhs = rule.rhs().symbols(self.ctx);

            for (index, &sym) in lhs.iter().enumerate() {
                let symbol = self.ctx.symbol(sym);
                let kind = symbol.kind();

                if index != lhs.len() - 1 {
                    self.check_rule(
                        kind != SymbolKind::Layout,
                        rule,
                        "layout symbol before the end of the left-hand side",
                    );
                    self.check_rule(
                        !symbol.is_superclass_or_concrete(),
                        rule,
                        "superclass or concrete type symbol before the end of the left-hand side",
                    );
                }

                if index != 0 {
                    self.check_rule(
                        kind != SymbolKind::GenericParam,
                        rule,
                        "generic parameter symbol after the root of the left-hand side",
                    );
                }

                if index != 0 && index != lhs.len() - 1 {
                    self.check_rule(
                        kind != SymbolKind::Protocol,
                        rule,
                        "protocol symbol in the interior of the left-hand side",
                    );
                }
            }

            for (index, &sym) in rhs.iter().enumerate() {
                let symbol = self.ctx.symbol(sym);
                let kind = symbol.kind();

                // Name symbols only survive into right-hand sides when the
                // requirements were malformed, which the driver diagnoses.
                if !self.driver_reported_errors {
                    self.check_rule(
                        kind != SymbolKind::Name,
                        rule,
                        "name symbol in the right-hand side",
                    );
                }

                self.check_rule(
                    kind != SymbolKind::Layout,
                    rule,
                    "layout symbol in the right-hand side",
                );
                self.check_rule(
                    !symbol.is_superclass_or_concrete(),
                    rule,
                    "superclass or concrete type symbol in the right-hand side",
                );

                if index != 0 {
                    self.check_rule(
                        kind != SymbolKind::GenericParam,
                        rule,
                        "generic parameter symbol after the root of the right-hand side",
                    );
                    self.check_rule(
                        kind != SymbolKind::Protocol,
                        rule,
                        "protocol symbol after the root of the right-hand side",
                    );
                }
            }

            self.check_rule(
                rule.lhs().root_protocols(self.ctx) == rule.rhs().root_protocols(self.ctx),
                rule,
                "rule does not preserve the root protocol set",
            );
        }
    }

    fn check_rule(&self, condition: bool, rule: &Rule, what: &str) {
        if condition {
            return;
        }

        let mut rendered = String::new();
        let _ = rule.dump(&mut rendered, self.ctx, self.protocols());
        eprintln!("Malformed rewrite rule: {rendered}");
        eprintln!("{what}");

        let mut dumped = String::new();
        let _ = self.dump(&mut dumped);
        eprintln!("{dumped}");
        panic!("malformed rewrite rule: {what}");
    }

    /// Render every rule and homotopy generator. Purely diagnostic.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "Rewrite system: {{")?;
        for rule in &self.rules {
            out.write_str("- ")?;
            rule.dump(out, self.ctx, self.protocols())?;
            out.write_char('\n')?;
        }
        writeln!(out, "}}")?;
        writeln!(out, "Homotopy generators: {{")?;
        for generator in &self.homotopy {
            out.write_str("- ")?;
            crate::term::write_word(out, generator.basepoint.symbols(), self.ctx, self.protocols())?;
            out.write_str(": ")?;
            generator.path.dump(out, generator.basepoint.clone(), self)?;
            out.write_char('\n')?;
        }
        writeln!(out, "}}")
    }

    #[cfg(test)]
    pub(crate) fn trie_mut(&mut self) -> &mut RuleTrie {
        &mut self.trie
    }

    #[cfg(test)]
    pub(crate) fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }
}

impl Drop for RewriteSystem<'_> {
    fn drop(&mut self) {
        self.trie.update_histograms(
            &mut self.ctx.rule_trie_histogram.lock(),
            &mut self.ctx.rule_trie_root_histogram.lock(),
        );
    }
}

#[cfg(test)]
#[path = "tests/system.rs"]
mod tests;
