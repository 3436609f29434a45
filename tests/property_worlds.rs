use judged::worlds::{conjunct, disjunct, equivalent};
use judged::{Sentence, Term, World};
use proptest::prelude::*;

fn sym(name: &str) -> Term {
    Term::Symbol(name.to_string())
}

fn arb_sentence() -> impl Strategy<Value = Sentence> {
    let leaf = prop_oneof![
        Just(Sentence::True),
        Just(Sentence::False),
        ("[xyz]", 1i64..=3).prop_map(|(p, v)| Sentence::lit(sym(&p), Term::Int(v))),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Sentence::And),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Sentence::Or),
            inner.prop_map(|s| Sentence::Not(Box::new(s))),
        ]
    })
}

fn arb_world() -> impl Strategy<Value = World> {
    // One value per partition; 4 means "some value no label mentions".
    (1i64..=4, 1i64..=4, 1i64..=4).prop_map(|(x, y, z)| {
        let mut world = World::new();
        world.insert(sym("x"), Term::Int(x));
        world.insert(sym("y"), Term::Int(y));
        world.insert(sym("z"), Term::Int(z));
        world
    })
}

proptest! {
    #[test]
    fn simplify_preserves_meaning(s in arb_sentence(), w in arb_world()) {
        prop_assert_eq!(s.simplify().evaluate(&w), s.evaluate(&w));
    }

    #[test]
    fn simplify_is_idempotent(s in arb_sentence()) {
        let once = s.simplify();
        prop_assert_eq!(once.simplify(), once);
    }

    #[test]
    fn simplify_is_equivalent_to_the_original(s in arb_sentence()) {
        prop_assert!(equivalent(&s.simplify(), &s));
    }

    #[test]
    fn conjunction_is_commutative_under_evaluation(
        a in arb_sentence(),
        b in arb_sentence(),
        w in arb_world(),
    ) {
        let ab = conjunct(vec![a.clone(), b.clone()]);
        let ba = conjunct(vec![b, a]);
        prop_assert_eq!(ab.evaluate(&w), ba.evaluate(&w));
    }

    #[test]
    fn disjunction_matches_boolean_semantics(
        a in arb_sentence(),
        b in arb_sentence(),
        w in arb_world(),
    ) {
        let or = disjunct(vec![a.clone(), b.clone()]);
        prop_assert_eq!(or.evaluate(&w), a.evaluate(&w) || b.evaluate(&w));
    }

    #[test]
    fn negation_flips_evaluation(s in arb_sentence(), w in arb_world()) {
        let not = Sentence::Not(Box::new(s.clone())).simplify();
        prop_assert_eq!(not.evaluate(&w), !s.evaluate(&w));
    }
}
