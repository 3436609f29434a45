use judged::{parse_statements, Sentence, Statement, Term};

fn sym(name: &str) -> Term {
    Term::Symbol(name.to_string())
}

fn single(src: &str) -> Statement {
    let mut statements = parse_statements(src).expect("parse should succeed");
    assert_eq!(statements.len(), 1, "expected one statement in {src:?}");
    statements.remove(0)
}

#[test]
fn parse_fact_with_default_sentence() {
    let Statement::Assert(decl) = single("parent(a, b).") else {
        panic!("expected an assert");
    };
    assert_eq!(decl.clause.head.pred.name, "parent");
    assert_eq!(decl.clause.head.terms, vec![sym("a"), sym("b")]);
    assert!(decl.clause.body.is_empty());
    assert_eq!(decl.clause.sentence, Sentence::True);
}

#[test]
fn parse_terminator_selects_action() {
    assert!(matches!(single("p(a)."), Statement::Assert(_)));
    assert!(matches!(single("p(a)~"), Statement::Retract(_)));
    assert!(matches!(single("p(a)?"), Statement::Query(_)));
}

#[test]
fn parse_rule_with_negated_body_literal() {
    let Statement::Assert(decl) = single("q(X) :- p(X), ~r(X).") else {
        panic!("expected an assert");
    };
    assert_eq!(decl.clause.body.len(), 2);
    assert!(decl.clause.body[0].positive);
    assert!(!decl.clause.body[1].positive);
    assert_eq!(
        decl.clause.head.terms,
        vec![Term::Var("X".to_string())]
    );
}

#[test]
fn parse_not_keyword_negates_body_literal() {
    let Statement::Assert(decl) = single("q(X) :- p(X), not r(X).") else {
        panic!("expected an assert");
    };
    assert!(!decl.clause.body[1].positive);
    assert_eq!(decl.clause.body[1].pred.name, "r");
}

#[test]
fn parse_clause_sentence() {
    let Statement::Assert(decl) = single("heads(c1) [x=1].") else {
        panic!("expected an assert");
    };
    assert_eq!(decl.clause.sentence, Sentence::lit(sym("x"), Term::Int(1)));
}

#[test]
fn parse_sentence_precedence_not_over_and_over_or() {
    let Statement::Assert(decl) = single("p [not x=1 and y=2 or z=3].") else {
        panic!("expected an assert");
    };
    let not_x = Sentence::Not(Box::new(Sentence::lit(sym("x"), Term::Int(1))));
    let and = Sentence::And(vec![not_x, Sentence::lit(sym("y"), Term::Int(2))]);
    let expected = Sentence::Or(vec![and, Sentence::lit(sym("z"), Term::Int(3))]);
    assert_eq!(decl.clause.sentence, expected);
}

#[test]
fn parse_sentence_parentheses_and_constants() {
    let Statement::Assert(decl) = single("p [(x=1 or true) and not false].") else {
        panic!("expected an assert");
    };
    assert_eq!(decl.clause.sentence.simplify(), Sentence::True);
}

#[test]
fn parse_label_function() {
    let Statement::Assert(decl) = single("result(C, h) :- coin(C) [c(C)=h].") else {
        panic!("expected an assert");
    };
    let Sentence::Lit(label) = &decl.clause.sentence else {
        panic!("expected a label sentence");
    };
    assert_eq!(
        label.partition,
        Term::Ctor {
            name: "c".to_string(),
            args: vec![Term::Var("C".to_string())],
        }
    );
    assert_eq!(label.value, sym("h"));
}

#[test]
fn parse_infix_equality_sugar() {
    let Statement::Assert(decl) = single("p(X) :- q(X), X = a.") else {
        panic!("expected an assert");
    };
    let eq = &decl.clause.body[1];
    assert_eq!(eq.pred.name, "=");
    assert_eq!(eq.pred.arity, 2);
    assert!(eq.positive);

    let Statement::Assert(decl) = single("p(X) :- q(X), X != a.") else {
        panic!("expected an assert");
    };
    let neq = &decl.clause.body[1];
    assert_eq!(neq.pred.name, "=");
    assert!(!neq.positive);
}

#[test]
fn parse_probability_annotation() {
    let Statement::Probability(decl) = single("@P(x=1) = 0.5.") else {
        panic!("expected a probability annotation");
    };
    assert_eq!(decl.label.partition, sym("x"));
    assert_eq!(decl.label.value, Term::Int(1));
    assert!((decl.probability - 0.5).abs() < f64::EPSILON);
}

#[test]
fn parse_uniform_annotation() {
    let Statement::Uniform(decl) = single("@uniform x.") else {
        panic!("expected a uniform annotation");
    };
    assert_eq!(decl.partition, sym("x"));
}

#[test]
fn parse_use_annotation() {
    let Statement::Use(decl) = single("@use \"hello\".") else {
        panic!("expected a use annotation");
    };
    assert_eq!(decl.name, "hello");
}

#[test]
fn parse_generator_block() {
    let src = r#"{
        result(C, h) :- coin(C) [c(C)=h].
        result(C, t) :- coin(C) [c(C)=t].
        @uniform c(C).
        | coin(C) }"#;
    let Statement::Generator(decl) = single(src) else {
        panic!("expected a generator");
    };
    assert_eq!(decl.statements.len(), 3);
    assert_eq!(decl.guard.pred.name, "coin");
}

#[test]
fn parse_wildcards_are_distinct_variables() {
    let Statement::Query(decl) = single("p(_, _)?") else {
        panic!("expected a query");
    };
    assert_ne!(decl.literal.terms[0], decl.literal.terms[1]);
    assert!(matches!(decl.literal.terms[0], Term::Var(_)));
}

#[test]
fn parse_comments_and_strings() {
    let statements = parse_statements("p(\"a b\"). % comment\nq(c).").expect("parse");
    assert_eq!(statements.len(), 2);
    let Statement::Assert(decl) = &statements[0] else {
        panic!("expected an assert");
    };
    assert_eq!(decl.clause.head.terms, vec![Term::Str("a b".to_string())]);
}

#[test]
fn parse_rejects_query_with_body() {
    let errors = parse_statements("p(X) :- q(X)?").expect_err("should fail");
    assert!(errors.iter().any(|d| d.code == "E-PARSE"));
}

#[test]
fn parse_rejects_fractional_term() {
    let errors = parse_statements("p(0.5).").expect_err("should fail");
    assert!(errors.iter().any(|d| d.code == "E-PARSE"));
}

#[test]
fn parse_recovers_after_bad_statement() {
    let errors = parse_statements("p(.\nq(a).").expect_err("should fail");
    assert_eq!(errors.len(), 1);
    let spans: Vec<_> = errors.iter().filter_map(|d| d.span.as_ref()).collect();
    assert!(!spans.is_empty());
}

#[test]
fn parse_reports_spans() {
    let errors = parse_statements("\n\np(.").expect_err("should fail");
    let span = errors[0].span.as_ref().expect("span");
    assert_eq!(span.line, 3);
}
