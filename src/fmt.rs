use crate::ast::Statement;
use crate::probability::ReportedAnswer;
use crate::terms::{Clause, Literal, Predicate, Term};
use crate::worlds::Sentence;

/// Output styling for the shell: plain text or ANSI colors, one style per
/// syntactic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Color,
}

const CONSTANT: &str = "01;34";
const VARIABLE: &str = "01;33";
const PREDICATE: &str = "01;32";
const COMMENT: &str = "37";
const SENTENCE: &str = "01;35";

fn paint(style: Style, code: &str, text: &str) -> String {
    match style {
        Style::Plain => text.to_string(),
        Style::Color => format!("\x1b[{code}m{text}\x1b[0m"),
    }
}

pub fn term(t: &Term, style: Style) -> String {
    match t {
        Term::Var(name) => paint(style, VARIABLE, name),
        Term::Ctor { name, args } => {
            let rendered: Vec<String> = args.iter().map(|a| term(a, style)).collect();
            format!(
                "{}({})",
                paint(style, CONSTANT, name),
                rendered.join(", ")
            )
        }
        other => paint(style, CONSTANT, &other.to_string()),
    }
}

pub fn literal(lit: &Literal, style: Style) -> String {
    let mut out = String::new();
    if !lit.positive {
        out.push('~');
    }
    if lit.pred.name == "=" && lit.terms.len() == 2 {
        out.push_str(&term(&lit.terms[0], style));
        out.push_str(" = ");
        out.push_str(&term(&lit.terms[1], style));
        return out;
    }
    out.push_str(&paint(style, PREDICATE, &lit.pred.name));
    if !lit.terms.is_empty() {
        let rendered: Vec<String> = lit.terms.iter().map(|t| term(t, style)).collect();
        out.push('(');
        out.push_str(&rendered.join(", "));
        out.push(')');
    }
    out
}

pub fn sentence(s: &Sentence, style: Style) -> String {
    paint(style, SENTENCE, &s.to_string())
}

pub fn clause(c: &Clause, style: Style) -> String {
    let mut out = literal(&c.head, style);
    for (i, lit) in c.body.iter().enumerate() {
        out.push_str(if i == 0 { " :- " } else { ", " });
        out.push_str(&literal(lit, style));
    }
    if c.sentence != Sentence::True {
        out.push_str(" [");
        out.push_str(&sentence(&c.sentence, style));
        out.push(']');
    }
    out
}

pub fn comment(text: &str, style: Style) -> String {
    paint(style, COMMENT, text)
}

/// Renders one answer line: the instantiated query literal, its sentence when
/// it is informative, and the estimated probability as a trailing comment.
pub fn answer(query: &Predicate, ans: &ReportedAnswer, style: Style) -> String {
    let instantiated = Literal::new(query.clone(), ans.terms.clone());
    let mut out = literal(&instantiated, style);
    if ans.sentence != Sentence::True {
        out.push_str(" [");
        out.push_str(&sentence(&ans.sentence, style));
        out.push(']');
    }
    out.push('.');
    if let Some(p) = ans.probability {
        out.push(' ');
        out.push_str(&comment(&format!("% p = {p}"), style));
    }
    out
}

/// One-line description of a statement for the `-v` action report.
pub fn describe(statement: &Statement, style: Style) -> String {
    match statement {
        Statement::Assert(decl) => format!("assert {}", clause(&decl.clause, style)),
        Statement::Retract(decl) => format!("retract {}", clause(&decl.clause, style)),
        Statement::Query(decl) => format!("query {}", literal(&decl.literal, style)),
        Statement::Probability(decl) => format!(
            "annotate p({}) = {}",
            paint(style, SENTENCE, &decl.label.to_string()),
            decl.probability
        ),
        Statement::Uniform(decl) => format!(
            "annotate p({}) with uniform distribution",
            term(&decl.partition, style)
        ),
        Statement::Use(decl) => format!("use extension '{}'", decl.name),
        Statement::Generator(decl) => format!(
            "generate {} statements per answer of {}",
            decl.statements.len(),
            literal(&decl.guard, style)
        ),
    }
}
