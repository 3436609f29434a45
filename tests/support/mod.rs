#![allow(dead_code)]

use judged::{parse_statements, Backend, QueryReport, Session, Statement};

/// Parses a program and ingests every statement into a fresh session.
pub fn load(src: &str, backend: Backend) -> Session {
    let statements = parse_statements(src).expect("program should parse");
    let mut session = Session::new(backend);
    for statement in &statements {
        session.ingest(statement).expect("statement should ingest");
    }
    session
}

/// Runs a query (written as `goal(...)?`) against an existing session.
pub fn ask(session: &mut Session, query: &str) -> QueryReport {
    let statements = parse_statements(query).expect("query should parse");
    let Statement::Query(decl) = &statements[0] else {
        panic!("expected a query statement in {query:?}");
    };
    session.query(&decl.literal).expect("query should succeed")
}

/// Loads a program and runs a single query against it.
pub fn run(src: &str, query: &str, backend: Backend) -> QueryReport {
    let mut session = load(src, backend);
    ask(&mut session, query)
}

/// The answer tuples of a report, rendered per term, in answer order.
pub fn tuples(report: &QueryReport) -> Vec<Vec<String>> {
    report
        .answers
        .iter()
        .map(|answer| answer.terms.iter().map(|t| t.to_string()).collect())
        .collect()
}

/// The sentences of a report, rendered, in answer order.
pub fn sentences(report: &QueryReport) -> Vec<String> {
    report
        .answers
        .iter()
        .map(|answer| answer.sentence.to_string())
        .collect()
}
