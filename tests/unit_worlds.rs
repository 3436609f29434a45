use judged::worlds::{conjunct, disjunct, equivalent, is_contradiction};
use judged::{Sentence, Term, World};

fn sym(name: &str) -> Term {
    Term::Symbol(name.to_string())
}

fn lit(partition: &str, value: i64) -> Sentence {
    Sentence::lit(sym(partition), Term::Int(value))
}

fn not(s: Sentence) -> Sentence {
    Sentence::Not(Box::new(s))
}

#[test]
fn simplify_applies_unit_laws() {
    assert_eq!(conjunct(vec![Sentence::True, lit("x", 1)]), lit("x", 1));
    assert_eq!(conjunct(vec![Sentence::False, lit("x", 1)]), Sentence::False);
    assert_eq!(disjunct(vec![Sentence::False, lit("x", 1)]), lit("x", 1));
    assert_eq!(disjunct(vec![Sentence::True, lit("x", 1)]), Sentence::True);
    assert_eq!(conjunct(Vec::new()), Sentence::True);
    assert_eq!(disjunct(Vec::new()), Sentence::False);
}

#[test]
fn simplify_recognizes_partition_exclusivity() {
    assert_eq!(conjunct(vec![lit("x", 1), lit("x", 2)]), Sentence::False);
    assert_ne!(conjunct(vec![lit("x", 1), lit("y", 2)]), Sentence::False);
}

#[test]
fn simplify_collapses_double_negation() {
    assert_eq!(not(not(lit("x", 1))).simplify(), lit("x", 1));
    assert_eq!(not(Sentence::True).simplify(), Sentence::False);
    assert_eq!(not(Sentence::False).simplify(), Sentence::True);
}

#[test]
fn simplify_collapses_complementary_operands() {
    assert_eq!(
        conjunct(vec![lit("x", 1), not(lit("x", 1))]),
        Sentence::False
    );
    assert_eq!(disjunct(vec![lit("x", 1), not(lit("x", 1))]), Sentence::True);
}

#[test]
fn simplify_flattens_and_deduplicates() {
    let nested = Sentence::Or(vec![
        lit("x", 1),
        Sentence::Or(vec![lit("x", 1), lit("y", 1)]),
    ]);
    assert_eq!(nested.simplify(), disjunct(vec![lit("x", 1), lit("y", 1)]));
}

#[test]
fn simplify_is_idempotent() {
    let s = Sentence::And(vec![
        Sentence::Or(vec![lit("x", 1), lit("y", 2)]),
        not(lit("z", 3)),
        Sentence::True,
    ]);
    let once = s.simplify();
    assert_eq!(once.simplify(), once);
}

#[test]
fn evaluate_follows_world_assignment() {
    let mut world = World::new();
    world.insert(sym("x"), Term::Int(1));
    assert!(lit("x", 1).evaluate(&world));
    assert!(!lit("x", 2).evaluate(&world));
    assert!(conjunct(vec![lit("x", 1), not(lit("x", 2))]).evaluate(&world));
    assert!(disjunct(vec![lit("x", 2), lit("x", 1)]).evaluate(&world));
}

#[test]
fn assume_decides_only_selected_partitions() {
    let mut world = World::new();
    world.insert(sym("x"), Term::Int(1));
    let s = conjunct(vec![lit("x", 1), lit("y", 2)]);
    assert_eq!(s.assume(&world), lit("y", 2));
    world.insert(sym("y"), Term::Int(2));
    assert_eq!(s.assume(&world), Sentence::True);
}

#[test]
fn equivalence_is_semantic() {
    // Commutativity and associativity hold under world evaluation even when
    // the trees differ structurally.
    let a = Sentence::And(vec![lit("x", 1), Sentence::And(vec![lit("y", 2), lit("z", 3)])]);
    let b = Sentence::And(vec![Sentence::And(vec![lit("z", 3), lit("x", 1)]), lit("y", 2)]);
    assert!(equivalent(&a, &b));
    assert!(!equivalent(&lit("x", 1), &lit("x", 2)));
}

#[test]
fn equivalence_sees_partition_exclusivity() {
    // x=1 or x=2 is not equivalent to true: a world may pick a third value.
    let either = disjunct(vec![lit("x", 1), lit("x", 2)]);
    assert!(!equivalent(&either, &Sentence::True));
    // But a contradiction through exclusivity is equivalent to false even
    // when hidden under a disjunction.
    let hidden = Sentence::And(vec![
        lit("x", 1),
        Sentence::Or(vec![lit("x", 2), Sentence::False]),
    ]);
    assert!(is_contradiction(&hidden));
}

#[test]
fn subst_instantiates_label_functions() {
    let mut env = judged::Bindings::new();
    env.bind("C", sym("c1"));
    let s = Sentence::lit(
        Term::Ctor {
            name: "c".to_string(),
            args: vec![Term::Var("C".to_string())],
        },
        sym("h"),
    );
    let expected = Sentence::lit(
        Term::Ctor {
            name: "c".to_string(),
            args: vec![sym("c1")],
        },
        sym("h"),
    );
    assert_eq!(s.subst(&env), expected);
}
