mod support;

use judged::probability::SplitMix64;
use judged::{Backend, MontecarloConfig, Sentence, Term};
use support::{ask, load, run, sentences, tuples};

fn montecarlo(samples: usize, seed: u64) -> Backend {
    Backend::Montecarlo(MontecarloConfig {
        samples,
        seed: Some(seed),
        approximate: None,
    })
}

#[test]
fn splitmix_is_reproducible_per_seed() {
    let mut a = SplitMix64::new(42);
    let mut b = SplitMix64::new(42);
    let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
    let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
    assert_eq!(xs, ys);
    let mut c = SplitMix64::new(43);
    assert_ne!(xs[0], c.next_u64());
}

#[test]
fn splitmix_unit_draws_stay_in_range() {
    let mut rng = SplitMix64::new(7);
    for _ in 0..1000 {
        let x = rng.next_f64();
        assert!((0.0..1.0).contains(&x));
    }
}

#[test]
fn exact_reports_the_simplified_sentence() {
    let report = run(
        r#"
        heads(c1) [x=1].
        tails(c1) [x=2].
        "#,
        "heads(C)?",
        Backend::Exact,
    );
    assert_eq!(tuples(&report), vec![vec!["c1".to_string()]]);
    assert_eq!(sentences(&report), vec!["x=1".to_string()]);
    assert_eq!(report.answers[0].probability, None);
}

#[test]
fn exact_rejects_programs_with_negation() {
    let mut session = load(
        r#"
        p(a).
        q(X) :- p(X), ~r(X).
        r(b).
        "#,
        Backend::Exact,
    );
    let statements = judged::parse_statements("q(X)?").expect("parse");
    let judged::Statement::Query(decl) = &statements[0] else {
        panic!("expected a query");
    };
    let errors = session.query(&decl.literal).expect_err("unsupported");
    assert!(errors.iter().any(|d| d.code == "E-UNSUPPORTED"));
}

#[test]
fn montecarlo_estimates_match_declared_probabilities() {
    let report = run(
        r#"
        heads(c1) [x=1].
        @P(x=1) = 0.3. @P(x=2) = 0.7.
        "#,
        "heads(C)?",
        montecarlo(20_000, 1),
    );
    let p = report.answers[0].probability.expect("estimate");
    assert!((p - 0.3).abs() < 0.02, "estimate {p} too far from 0.3");
    assert_eq!(report.iterations, Some(20_000));
}

#[test]
fn montecarlo_missing_probability_is_an_error() {
    let mut session = load("heads(c1) [x=1].", montecarlo(100, 0));
    let statements = judged::parse_statements("heads(C)?").expect("parse");
    let judged::Statement::Query(decl) = &statements[0] else {
        panic!("expected a query");
    };
    let errors = session.query(&decl.literal).expect_err("missing probability");
    assert!(errors.iter().any(|d| d.code == "E-PROB"));
}

#[test]
fn montecarlo_rejects_distributions_not_summing_to_one() {
    let mut session = load(
        r#"
        heads(c1) [x=1].
        @P(x=1) = 0.3. @P(x=2) = 0.3.
        "#,
        montecarlo(100, 0),
    );
    let statements = judged::parse_statements("heads(C)?").expect("parse");
    let judged::Statement::Query(decl) = &statements[0] else {
        panic!("expected a query");
    };
    let errors = session.query(&decl.literal).expect_err("bad distribution");
    assert!(errors.iter().any(|d| d.code == "E-PROB"));
}

#[test]
fn montecarlo_convergence_stops_early() {
    let report = run(
        r#"
        sure(c1) [x=1].
        @P(x=1) = 1.0.
        "#,
        "sure(C)?",
        Backend::Montecarlo(MontecarloConfig {
            samples: 1_000_000,
            seed: Some(0),
            approximate: Some(0.05),
        }),
    );
    let iterations = report.iterations.expect("iteration count");
    assert!(iterations < 1_000_000, "should stop early, ran {iterations}");
    assert!(iterations >= 100, "minimum sample floor");
    assert_eq!(report.answers[0].probability, Some(1.0));
}

#[test]
fn montecarlo_unbounded_without_threshold_is_rejected() {
    let mut session = load(
        "heads(c1) [x=1]. @P(x=1) = 0.5. @P(x=2) = 0.5.",
        Backend::Montecarlo(MontecarloConfig {
            samples: 0,
            seed: Some(0),
            approximate: None,
        }),
    );
    let statements = judged::parse_statements("heads(C)?").expect("parse");
    let judged::Statement::Query(decl) = &statements[0] else {
        panic!("expected a query");
    };
    let errors = session.query(&decl.literal).expect_err("unbounded");
    assert!(errors.iter().any(|d| d.code == "E-RESOURCE"));
}

#[test]
fn deterministic_requires_a_world_selection() {
    let mut session = load("heads(c1) [x=1].", Backend::Deterministic);
    let statements = judged::parse_statements("heads(C)?").expect("parse");
    let judged::Statement::Query(decl) = &statements[0] else {
        panic!("expected a query");
    };
    let errors = session.query(&decl.literal).expect_err("undecided world");
    assert!(errors.iter().any(|d| d.code == "E-PROB"));
}

#[test]
fn deterministic_follows_the_selected_world() {
    let mut session = load(
        r#"
        heads(c1) [x=1].
        tails(c1) [x=2].
        "#,
        Backend::Deterministic,
    );
    session.select_world(Term::Symbol("x".to_string()), Term::Int(1));
    let report = ask(&mut session, "heads(C)?");
    assert_eq!(tuples(&report), vec![vec!["c1".to_string()]]);
    assert_eq!(report.answers[0].sentence, Sentence::True);
    let report = ask(&mut session, "tails(C)?");
    assert!(report.answers.is_empty());

    session.reset_world();
    session.select_world(Term::Symbol("x".to_string()), Term::Int(2));
    let report = ask(&mut session, "tails(C)?");
    assert_eq!(tuples(&report), vec![vec!["c1".to_string()]]);
}
