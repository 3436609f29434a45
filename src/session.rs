use crate::ast::Statement;
use crate::diagnostics::Diagnostic;
use crate::extensions;
use crate::knowledge::KnowledgeBase;
use crate::probability::{self, MontecarloConfig, QueryReport};
use crate::resolver::{AnswerSet, Resolver, ResolverConfig, Tracer};
use crate::stratify::compute_strata;
use crate::terms::{Bindings, Literal, Term};
use crate::worlds::World;

/// Which probability backend answers queries in this session.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Deterministic,
    Exact,
    Montecarlo(MontecarloConfig),
}

/// A program session: the knowledge base under construction, the chosen
/// backend, and the interactively selected world parts. Statements are
/// ingested one at a time; queries run against the knowledge base as it
/// stands, treating it as read-only for their duration.
pub struct Session {
    kb: KnowledgeBase,
    backend: Backend,
    selections: World,
    resolver_config: ResolverConfig,
    tracer: Option<Box<dyn Tracer>>,
}

impl Session {
    pub fn new(backend: Backend) -> Self {
        Self {
            kb: KnowledgeBase::new(),
            backend,
            selections: World::new(),
            resolver_config: ResolverConfig::default(),
            tracer: None,
        }
    }

    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Selects a world part for the deterministic backend.
    pub fn select_world(&mut self, partition: Term, value: Term) {
        self.selections.insert(partition, value);
    }

    pub fn reset_world(&mut self) {
        self.selections.clear();
    }

    pub fn use_extension(&mut self, name: &str) -> Result<(), Diagnostic> {
        let Some(ext) = extensions::create(name) else {
            return Err(Diagnostic::new(
                "E-EXTENSION",
                format!("unknown extension '{name}'"),
                None,
            ));
        };
        self.kb.register_extension(ext)
    }

    /// Performs one statement. Queries (directly or inside generators) yield
    /// reports; everything else mutates the knowledge base.
    pub fn ingest(&mut self, statement: &Statement) -> Result<Vec<QueryReport>, Vec<Diagnostic>> {
        match statement {
            Statement::Assert(decl) => {
                self.kb
                    .assert_clause(decl.clause.clone())
                    .map_err(|d| vec![with_span(d, statement)])?;
                Ok(Vec::new())
            }
            Statement::Retract(decl) => {
                self.kb.retract_clause(&decl.clause);
                Ok(Vec::new())
            }
            Statement::Query(decl) => Ok(vec![self.query(&decl.literal)?]),
            Statement::Probability(decl) => {
                self.kb
                    .set_probability(&decl.label, decl.probability)
                    .map_err(|d| vec![with_span(d, statement)])?;
                Ok(Vec::new())
            }
            Statement::Uniform(decl) => {
                self.kb.set_uniform(&decl.partition);
                Ok(Vec::new())
            }
            Statement::Use(decl) => {
                self.use_extension(&decl.name)
                    .map_err(|d| vec![with_span(d, statement)])?;
                Ok(Vec::new())
            }
            Statement::Generator(decl) => {
                let guard_answers = self.resolve(&decl.guard)?;
                let mut reports = Vec::new();
                for answer in &guard_answers.answers {
                    let mut env = Bindings::new();
                    let bound = decl
                        .guard
                        .terms
                        .iter()
                        .zip(answer.terms.iter())
                        .all(|(a, b)| env.unify_terms(a, b));
                    if !bound {
                        continue;
                    }
                    for inner in &decl.statements {
                        reports.extend(self.ingest(&inner.subst(&env))?);
                    }
                }
                Ok(reports)
            }
        }
    }

    /// Runs a query through the resolver and the session's backend.
    pub fn query(&mut self, literal: &Literal) -> Result<QueryReport, Vec<Diagnostic>> {
        let set = self.resolve(literal)?;
        let report = match &self.backend {
            Backend::Deterministic => probability::deterministic(&set, &self.selections),
            Backend::Exact => probability::exact(&self.kb, &set),
            Backend::Montecarlo(config) => probability::montecarlo(&self.kb, &set, config),
        }
        .map_err(|d| vec![d])?;
        Ok(report)
    }

    /// Resolves a literal to its sentence-annotated answer set. Also used for
    /// generator guards, which bypass the probability backend.
    fn resolve(&mut self, literal: &Literal) -> Result<AnswerSet, Vec<Diagnostic>> {
        let strata = compute_strata(&self.kb)?;
        let mut resolver = Resolver::new(&self.kb, &strata)
            .with_config(self.resolver_config.clone());
        if let Some(tracer) = self.tracer.as_deref_mut() {
            resolver = resolver.with_tracer(tracer);
        }
        resolver.ask(literal).map_err(|d| vec![d])
    }
}

fn with_span(diagnostic: Diagnostic, statement: &Statement) -> Diagnostic {
    if diagnostic.span.is_some() {
        diagnostic
    } else {
        Diagnostic {
            span: Some(statement.span().clone()),
            ..diagnostic
        }
    }
}
