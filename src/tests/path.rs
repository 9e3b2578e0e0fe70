use super::{RewritePath, RewriteStep};
use crate::rule::RuleId;
use crate::system::RewriteSystem;
use crate::test_utils::{setup, word};

fn sample_path() -> RewritePath {
    let mut path = RewritePath::new();
    path.add(RewriteStep::new(0, RuleId::from_raw(0), false));
    path.add(RewriteStep::new(2, RuleId::from_raw(1), true));
    path.add(RewriteStep::new(1, RuleId::from_raw(0), false));
    path
}

#[test]
fn empty_path_is_identity() {
    let path = RewritePath::new();
    assert!(path.is_empty());
    assert_eq!(path.len(), 0);

    let mut inverted = path.clone();
    inverted.invert();
    assert!(inverted.is_empty());
}

#[test]
fn invert_reverses_and_toggles() {
    let mut path = sample_path();
    path.invert();
    assert_eq!(
        path.steps(),
        &[
            RewriteStep::new(1, RuleId::from_raw(0), true),
            RewriteStep::new(2, RuleId::from_raw(1), false),
            RewriteStep::new(0, RuleId::from_raw(0), true),
        ]
    );
}

#[test]
fn double_inversion_is_identity() {
    let original = sample_path();
    let mut path = original.clone();
    path.invert();
    path.invert();
    assert_eq!(path, original);
}

#[test]
fn append_concatenates() {
    let mut path = sample_path();
    let tail = sample_path();
    path.append(&tail);
    assert_eq!(path.len(), 6);
    assert_eq!(path.steps()[3..], tail.steps()[..]);
}

#[test]
fn step_invert_is_an_involution() {
    let mut step = RewriteStep::new(3, RuleId::from_raw(2), false);
    step.invert();
    assert!(step.inverse);
    step.invert();
    assert!(!step.inverse);
}

#[test]
fn applying_a_recorded_path_replays_the_simplification() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let mut term = word(&ctx, "abab");
    let mut path = RewritePath::new();
    assert!(system.simplify(&mut term, Some(&mut path)));
    assert_eq!(term, word(&ctx, "cc"));

    let mut replay = word(&ctx, "abab");
    path.apply(&mut replay, &system);
    assert_eq!(replay, term);
}

#[test]
fn inverted_path_undoes_the_rewrite() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let original = word(&ctx, "abab");
    let mut term = original.clone();
    let mut path = RewritePath::new();
    assert!(system.simplify(&mut term, Some(&mut path)));

    path.invert();
    path.apply(&mut term, &system);
    assert_eq!(term, original);
}

#[test]
#[should_panic(expected = "rewrite step does not match")]
fn applying_a_step_at_the_wrong_offset_panics() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let mut term = word(&ctx, "ba");
    RewriteStep::new(0, RuleId::from_raw(0), false).apply(&mut term, &system);
}

#[test]
fn dump_renders_prefix_rule_and_suffix() {
    let (ctx, protos) = setup();
    let mut system = RewriteSystem::new(&ctx);
    system.initialize(vec![(word(&ctx, "ab"), word(&ctx, "c"))], &protos);

    let mut term = word(&ctx, "abab");
    let mut path = RewritePath::new();
    system.simplify(&mut term, Some(&mut path));

    let mut rendered = String::new();
    path.dump(&mut rendered, word(&ctx, "abab"), &system).unwrap();
    assert_eq!(rendered, "(ab => c).ab ⊗ c.(ab => c)");
}
