use crate::diagnostics::Span;
use crate::terms::{Bindings, Clause, Literal, Term};
use crate::worlds::Label;

/// One parsed statement. The terminator of a clause selects its action:
/// `.` asserts, `~` retracts, `?` queries. Annotations start with `@` and
/// generators expand to further statements at ingestion time.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assert(ClauseDecl),
    Retract(ClauseDecl),
    Query(QueryDecl),
    Probability(ProbabilityDecl),
    Uniform(UniformDecl),
    Use(UseDecl),
    Generator(GeneratorDecl),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Assert(d) | Statement::Retract(d) => &d.span,
            Statement::Query(d) => &d.span,
            Statement::Probability(d) => &d.span,
            Statement::Uniform(d) => &d.span,
            Statement::Use(d) => &d.span,
            Statement::Generator(d) => &d.span,
        }
    }

    /// Instantiates the statement with a guard answer during generator
    /// expansion. Labels inside clause sentences and annotation partitions
    /// substitute along with the ordinary terms.
    pub fn subst(&self, env: &Bindings) -> Statement {
        match self {
            Statement::Assert(d) => Statement::Assert(ClauseDecl {
                clause: d.clause.subst(env),
                span: d.span.clone(),
            }),
            Statement::Retract(d) => Statement::Retract(ClauseDecl {
                clause: d.clause.subst(env),
                span: d.span.clone(),
            }),
            Statement::Query(d) => Statement::Query(QueryDecl {
                literal: d.literal.subst(env),
                span: d.span.clone(),
            }),
            Statement::Probability(d) => Statement::Probability(ProbabilityDecl {
                label: Label::new(env.apply(&d.label.partition), env.apply(&d.label.value)),
                probability: d.probability,
                span: d.span.clone(),
            }),
            Statement::Uniform(d) => Statement::Uniform(UniformDecl {
                partition: env.apply(&d.partition),
                span: d.span.clone(),
            }),
            Statement::Use(d) => Statement::Use(d.clone()),
            Statement::Generator(d) => Statement::Generator(GeneratorDecl {
                statements: d.statements.iter().map(|s| s.subst(env)).collect(),
                guard: d.guard.subst(env),
                span: d.span.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClauseDecl {
    pub clause: Clause,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryDecl {
    pub literal: Literal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDecl {
    pub label: Label,
    pub probability: f64,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformDecl {
    pub partition: Term,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorDecl {
    pub statements: Vec<Statement>,
    pub guard: Literal,
    pub span: Span,
}
