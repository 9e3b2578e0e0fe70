use super::RewriteSystem;
use crate::path::{RewritePath, RewriteStep};
use crate::rule::RuleId;
use crate::symbol::Symbol;
use crate::term::{MutableTerm, Term};
use crate::test_utils::{letter, setup, word};
use smallvec::smallvec;
use std::cell::RefCell;

#[test]
fn trivial_pair_collapses_without_a_rule() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "ab"))], &protos);

    assert_eq!(system.rules_len(), 0);
    assert!(system.homotopy_generators().is_empty());
    assert!(!system.add_rule(word(&ctx, "ab"), word(&ctx, "ab"), None));
    assert_eq!(system.rules_len(), 0);
}

#[test]
fn initialize_orients_pairs() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    // Backwards pair: c < ab, so the rule comes out as ab => c.
    system.initialize(vec![(word(&ctx, "c"), word(&ctx, "ab"))], &protos);

    assert_eq!(system.rules_len(), 1);
    let rule = system.rule(RuleId::from_raw(0));
    assert_eq!(rule.lhs(), Term::get(&word(&ctx, "ab"), &ctx));
    assert_eq!(rule.rhs(), Term::get(&word(&ctx, "c"), &ctx));
}

#[test]
fn simplify_rewrites_leftmost_first_and_records_steps() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let mut term = word(&ctx, "abab");
    let mut path = RewritePath::new();
    assert!(system.simplify(&mut term, Some(&mut path)));

    assert_eq!(term, word(&ctx, "cc"));
    assert_eq!(
        path.steps(),
        &[
            RewriteStep::new(0, RuleId::from_raw(0), false),
            RewriteStep::new(1, RuleId::from_raw(0), false),
        ]
    );
}

#[test]
fn simplify_leaves_an_irreducible_term_and_its_path_untouched() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let mut term = word(&ctx, "zz");
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, RuleId::from_raw(0), false));
    assert!(!system.simplify(&mut term, Some(&mut path)));
    assert_eq!(term, word(&ctx, "zz"));
    assert_eq!(path.len(), 1);
}

#[test]
fn simplify_skips_matches_that_extend_past_the_term() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "abc"), word(&ctx, "d"))], &protos);

    let mut term = word(&ctx, "ab");
    assert!(!system.simplify(&mut term, None));
    assert_eq!(term, word(&ctx, "ab"));
}

#[test]
fn internal_occurrences_rewrite_leftmost_first() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "bb"), word(&ctx, "b"))], &protos);

    let mut term = word(&ctx, "abbb");
    let mut path = RewritePath::new();
    assert!(system.simplify(&mut term, Some(&mut path)));
    assert_eq!(term, word(&ctx, "ab"));
    assert_eq!(
        path.steps(),
        &[
            RewriteStep::new(1, RuleId::from_raw(0), false),
            RewriteStep::new(1, RuleId::from_raw(0), false),
        ]
    );
}

#[test]
fn adding_an_existing_rule_again_is_redundant() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    assert!(!system.add_rule(word(&ctx, "ab"), word(&ctx, "c"), None));
    assert_eq!(system.rules_len(), 1);
    assert!(system.homotopy_generators().is_empty());
}

#[test]
fn reduced_rule_then_simplified_lhs_reaches_rhs() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);
    assert!(system.add_rule(word(&ctx, "abd"), word(&ctx, "c"), None));

    let mut term = word(&ctx, "abd");
    assert!(system.simplify(&mut term, None));
    assert_eq!(term, word(&ctx, "c"));
}

#[test]
fn derived_rule_that_collapses_records_a_loop() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "ab"), word(&ctx, "c")),
            (word(&ctx, "cd"), word(&ctx, "e")),
        ],
        &protos,
    );
    assert_eq!(system.rules_len(), 2);

    // A critical-pair style derivation: abd rewrites to e two ways.
    let mut derivation = RewritePath::new();
    derivation.add(RewriteStep::new(0, RuleId::from_raw(0), false));
    derivation.add(RewriteStep::new(0, RuleId::from_raw(1), false));

    assert!(!system.add_rule(word(&ctx, "abd"), word(&ctx, "e"), Some(&derivation)));
    assert_eq!(system.rules_len(), 2);

    let generators = system.homotopy_generators();
    assert_eq!(generators.len(), 1);
    let generator = &generators[0];
    assert_eq!(generator.basepoint, word(&ctx, "e"));
    assert_eq!(generator.path.len(), 4);

    // Replaying the loop returns to the basepoint.
    let mut replay = generator.basepoint.clone();
    generator.path.apply(&mut replay, &system);
    assert_eq!(replay, generator.basepoint);
}

#[test]
fn derived_rule_that_survives_closes_its_loop_through_itself() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "ab"), word(&ctx, "c")),
            (word(&ctx, "bd"), word(&ctx, "e")),
        ],
        &protos,
    );

    // The two rules overlap on abd, rewriting it to cd and to ae. The
    // derivation for the critical pair runs from cd back up to abd and
    // down the other side.
    let mut derivation = RewritePath::new();
    derivation.add(RewriteStep::new(0, RuleId::from_raw(0), true));
    derivation.add(RewriteStep::new(1, RuleId::from_raw(1), false));

    assert!(system.add_rule(word(&ctx, "cd"), word(&ctx, "ae"), Some(&derivation)));
    assert_eq!(system.rules_len(), 3);
    let rule = system.rule(RuleId::from_raw(2));
    assert_eq!(rule.lhs(), Term::get(&word(&ctx, "cd"), &ctx));
    assert_eq!(rule.rhs(), Term::get(&word(&ctx, "ae"), &ctx));

    // Both sides were already reduced, so the loop is the derivation plus
    // the closing inverse application of the new rule.
    let generators = system.homotopy_generators();
    assert_eq!(generators.len(), 1);
    let generator = &generators[0];
    assert_eq!(generator.basepoint, word(&ctx, "cd"));
    assert_eq!(
        generator.path.steps(),
        &[
            RewriteStep::new(0, RuleId::from_raw(0), true),
            RewriteStep::new(1, RuleId::from_raw(1), false),
            RewriteStep::new(0, RuleId::from_raw(2), true),
        ]
    );
    let mut replay = generator.basepoint.clone();
    generator.path.apply(&mut replay, &system);
    assert_eq!(replay, generator.basepoint);
}

#[test]
fn trie_maps_every_live_rule_to_itself() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "ab"), word(&ctx, "c")),
            (word(&ctx, "cd"), word(&ctx, "e")),
            (word(&ctx, "bd"), word(&ctx, "a")),
        ],
        &protos,
    );

    for index in 0..system.rules_len() {
        let id = RuleId::from_raw(index as u32);
        let rule = system.rule(id);
        if rule.is_deleted() {
            continue;
        }
        let lhs = rule.lhs().symbols(&ctx);
        let mut probe = MutableTerm::from_symbols(lhs.iter().copied());
        assert!(system.simplify(&mut probe, None));
        assert_eq!(probe.symbols(), rule.rhs().symbols(&ctx).as_slice());
    }
}

#[test]
fn simplify_system_deletes_subsumed_and_reduces_right_hand_sides() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "e"), word(&ctx, "d")),  // rule 0: e => d
            (word(&ctx, "da"), word(&ctx, "b")), // rule 1: da => b
            (word(&ctx, "d"), word(&ctx, "c")),  // rule 2: d => c
        ],
        &protos,
    );
    assert_eq!(system.rules_len(), 3);

    system.simplify_system();

    // Rule 0's right-hand side reduced through rule 2, so it was replaced by
    // rule 3 (e => c); rule 1's left-hand side contains rule 2's.
    assert_eq!(system.rules_len(), 4);
    assert!(system.rule(RuleId::from_raw(0)).is_deleted());
    assert!(system.rule(RuleId::from_raw(1)).is_deleted());
    assert!(!system.rule(RuleId::from_raw(2)).is_deleted());
    assert!(!system.rule(RuleId::from_raw(3)).is_deleted());

    let replacement = system.rule(RuleId::from_raw(3));
    assert_eq!(replacement.lhs(), Term::get(&word(&ctx, "e"), &ctx));
    assert_eq!(replacement.rhs(), Term::get(&word(&ctx, "c"), &ctx));

    // The replacement logged a loop at the simplified right-hand side.
    let generators = system.homotopy_generators();
    assert_eq!(generators.len(), 1);
    let generator = &generators[0];
    assert_eq!(generator.basepoint, word(&ctx, "c"));
    assert_eq!(generator.path.len(), 3);
    let mut replay = generator.basepoint.clone();
    generator.path.apply(&mut replay, &system);
    assert_eq!(replay, generator.basepoint);

    // The index serves the replacement now.
    let mut term = word(&ctx, "e");
    assert!(system.simplify(&mut term, None));
    assert_eq!(term, word(&ctx, "c"));
}

#[test]
fn deleted_left_hand_side_content_can_return_as_a_fresh_rule() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "ab"), word(&ctx, "c")), // rule 0, deleted below
            (word(&ctx, "b"), word(&ctx, "a")),  // rule 1
        ],
        &protos,
    );
    system.simplify_system();
    assert!(system.rule(RuleId::from_raw(0)).is_deleted());

    // The deleted rule no longer matches at offset 0, so the word reduces
    // through rule 1 instead and a fresh rule appears.
    assert!(system.add_rule(word(&ctx, "ab"), word(&ctx, "d"), None));
    assert_eq!(system.rules_len(), 3);
    let fresh = system.rule(RuleId::from_raw(2));
    assert_eq!(fresh.lhs(), Term::get(&word(&ctx, "aa"), &ctx));
    assert_eq!(fresh.rhs(), Term::get(&word(&ctx, "d"), &ctx));
}

#[test]
#[should_panic(expected = "Duplicate rewrite rule!")]
fn duplicate_left_hand_side_aborts() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);
    assert!(system.add_rule(word(&ctx, "ab"), word(&ctx, "a"), None));
    assert!(system.add_rule(word(&ctx, "c"), word(&ctx, "a"), None));

    // Sabotage the index the way a buggy completion pass would: hide the
    // mapping for ab behind a deleted rule so simplification cannot see it.
    system.rules_mut()[1].mark_deleted();
    let key = word(&ctx, "ab");
    system.trie_mut().insert(key.symbols(), RuleId::from_raw(1));

    system.add_rule(word(&ctx, "ab"), word(&ctx, "a"), None);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "malformed rewrite rule")]
fn verify_rejects_a_generic_param_inside_the_left_hand_side() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);

    let mut lhs = word(&ctx, "a");
    lhs.push(ctx.intern_symbol(Symbol::GenericParam { depth: 0, index: 0 }));
    assert!(system.add_rule(lhs, word(&ctx, "b"), None));

    system.set_driver_reported_errors(true);
    system.verify();
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "root protocol set")]
fn verify_rejects_a_rule_that_changes_the_root_protocol_set() {
    let (ctx, mut protos) = setup();
    let p = protos.add_protocol("P", &[]);
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);

    let mut lhs = MutableTerm::from_symbols([ctx.intern_symbol(Symbol::Protocol(p))]);
    lhs.push(letter(&ctx, 'a'));
    let rhs = MutableTerm::from_symbols([
        ctx.intern_symbol(Symbol::GenericParam { depth: 0, index: 0 }),
    ]);
    assert!(system.add_rule(lhs, rhs, None));

    system.verify();
}

#[test]
fn verify_accepts_a_protocol_rooted_rule() {
    let (ctx, mut protos) = setup();
    let p = protos.add_protocol("P", &[]);
    let q = protos.add_protocol("Q", &[p]);
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);

    // [P].[Q] => [P]: conformance to Q implies conformance to P.
    let proto_p = ctx.intern_symbol(Symbol::Protocol(p));
    let proto_q = ctx.intern_symbol(Symbol::Protocol(q));
    let lhs = MutableTerm::from_symbols([proto_p, proto_q]);
    let rhs = MutableTerm::from_symbols([proto_p]);
    assert!(system.add_rule(lhs, rhs, None));

    system.verify();
}

#[test]
fn merge_observer_sees_every_added_rule() {
    let observed = RefCell::new(Vec::new());
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);
    system.set_merge_observer(|lhs, rhs| observed.borrow_mut().push((lhs, rhs)));

    assert!(system.add_rule(word(&ctx, "ab"), word(&ctx, "c"), None));
    assert!(!system.add_rule(word(&ctx, "ab"), word(&ctx, "c"), None));
    assert!(system.add_rule(word(&ctx, "bd"), word(&ctx, "a"), None));

    let observed = observed.borrow();
    assert_eq!(observed.len(), 2);
    assert_eq!(observed[0].0, Term::get(&word(&ctx, "ab"), &ctx));
    assert_eq!(observed[0].1, Term::get(&word(&ctx, "c"), &ctx));
    assert_eq!(observed[1].0, Term::get(&word(&ctx, "bd"), &ctx));
}

#[test]
fn dropping_a_system_reports_trie_fanout() {
    let (ctx, protos) = setup();
    {
        let mut system = RewriteSystem::new(&ctx);
        system.initialize(
            vec![
                (word(&ctx, "ab"), word(&ctx, "c")),
                (word(&ctx, "ad"), word(&ctx, "c")),
            ],
            &protos,
        );
    }

    assert!(!ctx.rule_trie_histogram.lock().is_empty());
    assert!(!ctx.rule_trie_root_histogram.lock().is_empty());

    let mut rendered = String::new();
    ctx.dump_histograms(&mut rendered).unwrap();
    assert!(rendered.contains("Rule trie node fanout"));
    assert!(rendered.contains("Rule trie root fanout"));
}

#[test]
fn superclass_substitutions_are_simplified() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let reducible = Term::get(&word(&ctx, "abd"), &ctx);
    let irreducible = Term::get(&word(&ctx, "d"), &ctx);
    let symbol = ctx.intern_symbol(Symbol::Superclass {
        class: ctx.intern_name("Base"),
        substitutions: smallvec![reducible, irreducible],
    });

    let simplified = system.simplify_substitutions_in_superclass_or_concrete_symbol(symbol);
    match ctx.symbol(simplified) {
        Symbol::Superclass { substitutions, .. } => {
            assert_eq!(substitutions[0], Term::get(&word(&ctx, "cd"), &ctx));
            assert_eq!(substitutions[1], irreducible);
        }
        other => panic!("expected a superclass symbol, got {other:?}"),
    }

    // Symbols without substitutions pass through untouched.
    let name = letter(&ctx, 'a');
    assert_eq!(
        system.simplify_substitutions_in_superclass_or_concrete_symbol(name),
        name
    );
}

#[test]
fn dump_renders_rules_and_generators() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(
        vec![
            (word(&ctx, "ab"), word(&ctx, "c")),
            (word(&ctx, "cd"), word(&ctx, "e")),
        ],
        &protos,
    );
    let mut derivation = RewritePath::new();
    derivation.add(RewriteStep::new(0, RuleId::from_raw(0), false));
    derivation.add(RewriteStep::new(0, RuleId::from_raw(1), false));
    system.add_rule(word(&ctx, "abd"), word(&ctx, "e"), Some(&derivation));

    let mut rendered = String::new();
    system.dump(&mut rendered).unwrap();
    assert!(rendered.contains("Rewrite system: {"));
    assert!(rendered.contains("- ab => c"));
    assert!(rendered.contains("- cd => e"));
    assert!(rendered.contains("Homotopy generators: {"));
    assert!(rendered.contains("- e: "));
    assert!(rendered.contains(" ⊗ "));
}

#[test]
#[should_panic(expected = "empty left-hand side")]
fn adding_an_empty_left_hand_side_panics() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);
    system.add_rule(MutableTerm::new(), word(&ctx, "a"), None);
}

#[test]
#[should_panic(expected = "not initialized")]
fn adding_a_rule_before_initialize_panics() {
    let (ctx, _) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.add_rule(word(&ctx, "ab"), word(&ctx, "a"), None);
}

#[test]
#[should_panic(expected = "initialized twice")]
fn initializing_twice_panics() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(Vec::new(), &protos);
    system.initialize(Vec::new(), &protos);
}
