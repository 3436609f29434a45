mod support;

use std::collections::BTreeSet;

use judged::{Backend, MontecarloConfig};
use support::{run, sentences, tuples};

fn montecarlo(samples: usize, seed: u64) -> Backend {
    Backend::Montecarlo(MontecarloConfig {
        samples,
        seed: Some(seed),
        approximate: None,
    })
}

#[test]
fn coin_flip_exact() {
    let report = run(
        r#"
        heads(c1) [x=1].
        tails(c1) [x=2].
        @P(x=1) = 0.5. @P(x=2) = 0.5.
        "#,
        "heads(C)?",
        Backend::Exact,
    );
    assert_eq!(tuples(&report), vec![vec!["c1".to_string()]]);
    assert_eq!(sentences(&report), vec!["x=1".to_string()]);
}

#[test]
fn coin_flip_montecarlo() {
    let report = run(
        r#"
        heads(c1) [x=1].
        tails(c1) [x=2].
        @P(x=1) = 0.5. @P(x=2) = 0.5.
        "#,
        "heads(C)?",
        montecarlo(10_000, 0),
    );
    let p = report.answers[0].probability.expect("estimate");
    assert!((p - 0.5).abs() < 0.02, "estimate {p} too far from 0.5");
}

#[test]
fn power_grid_reachability_with_negation() {
    let report = run(
        r#"
        city(b). city(c). city(d). city(f).
        plant(a).
        edge(a, b). edge(b, c). edge(c, d). edge(e, f).
        link(X, Y) :- edge(X, Y).
        link(X, Y) :- edge(Y, X).
        powered(X) :- plant(X).
        powered(X) :- link(X, Y), powered(Y).
        unpowered(X) :- city(X), ~powered(X).
        "#,
        "unpowered(C)?",
        Backend::Deterministic,
    );
    assert_eq!(tuples(&report), vec![vec!["f".to_string()]]);
}

#[test]
fn stratified_negation_filters_answers() {
    let report = run(
        r#"
        p(1). p(2).
        q(X) :- p(X), ~r(X).
        r(1).
        "#,
        "q(X)?",
        Backend::Deterministic,
    );
    assert_eq!(tuples(&report), vec![vec!["2".to_string()]]);
}

#[test]
fn ancestor_recursion() {
    let report = run(
        r#"
        parent(a, b). parent(b, c).
        anc(X, Y) :- parent(X, Y).
        anc(X, Y) :- parent(X, Z), anc(Z, Y).
        "#,
        "anc(a, Y)?",
        Backend::Deterministic,
    );
    assert_eq!(
        tuples(&report),
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["a".to_string(), "c".to_string()],
        ]
    );
}

#[test]
fn mutually_exclusive_labels_yield_no_answer() {
    let report = run(
        r#"
        p [x=1].
        q :- p, p [x=2].
        "#,
        "q?",
        Backend::Exact,
    );
    assert!(report.answers.is_empty());
}

#[test]
fn generator_expands_per_guard_answer() {
    let report = run(
        r#"
        coin(c1). coin(c2).
        {
            result(C, h) :- coin(C) [c(C)=h].
            result(C, t) :- coin(C) [c(C)=t].
            @uniform c(C).
            | coin(C) }
        "#,
        "result(C, R)?",
        montecarlo(10_000, 0),
    );
    let expected: BTreeSet<Vec<String>> = [
        vec!["c1".to_string(), "h".to_string()],
        vec!["c1".to_string(), "t".to_string()],
        vec!["c2".to_string(), "h".to_string()],
        vec!["c2".to_string(), "t".to_string()],
    ]
    .into_iter()
    .collect();
    let found: BTreeSet<Vec<String>> = tuples(&report).into_iter().collect();
    assert_eq!(found, expected);
    for answer in &report.answers {
        let p = answer.probability.expect("estimate");
        assert!((p - 0.5).abs() < 0.03, "estimate {p} too far from 0.5");
    }
}
