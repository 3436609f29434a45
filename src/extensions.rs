use std::rc::Rc;

use crate::diagnostics::Diagnostic;
use crate::knowledge::KnowledgeBase;
use crate::terms::{Bindings, Literal, Predicate, Term};
use crate::worlds::Sentence;

/// A provider of computed predicates. An extension declares its predicates up
/// front; the resolver consults the extension registry before the clause
/// store. Extensions must be pure for a given knowledge-base snapshot and may
/// not mutate it.
pub trait Extension {
    fn name(&self) -> &str;

    fn predicates(&self) -> Vec<Predicate>;

    /// Produces answers for a partially bound literal. Each answer is a full
    /// argument tuple paired with the sentence under which it holds.
    fn resolve(
        &self,
        literal: &Literal,
        kb: &KnowledgeBase,
    ) -> Result<Vec<(Vec<Term>, Sentence)>, Diagnostic>;
}

/// Looks up a loadable extension by name, as referenced by `@use "name".` and
/// the CLI `-e` flag.
pub fn create(name: &str) -> Option<Rc<dyn Extension>> {
    match name {
        "hello" => Some(Rc::new(HelloExtension)),
        "range" => Some(Rc::new(RangeExtension)),
        _ => None,
    }
}

/// The built-in equality predicate `=/2`, registered on every knowledge base.
pub fn builtin_equality() -> Rc<dyn Extension> {
    Rc::new(EqualityExtension)
}

struct EqualityExtension;

impl Extension for EqualityExtension {
    fn name(&self) -> &str {
        "builtin"
    }

    fn predicates(&self) -> Vec<Predicate> {
        vec![Predicate::new("=", 2)]
    }

    fn resolve(
        &self,
        literal: &Literal,
        _kb: &KnowledgeBase,
    ) -> Result<Vec<(Vec<Term>, Sentence)>, Diagnostic> {
        let mut env = Bindings::new();
        if !env.unify_terms(&literal.terms[0], &literal.terms[1]) {
            return Ok(Vec::new());
        }
        let left = env.apply(&literal.terms[0]);
        let right = env.apply(&literal.terms[1]);
        Ok(vec![(vec![left, right], Sentence::True)])
    }
}

/// Demonstration extension: `say(Greeting, Audience)` yields a single
/// greeting fact regardless of bindings; unification against the caller's
/// terms happens in the resolver.
struct HelloExtension;

impl Extension for HelloExtension {
    fn name(&self) -> &str {
        "hello"
    }

    fn predicates(&self) -> Vec<Predicate> {
        vec![Predicate::new("say", 2)]
    }

    fn resolve(
        &self,
        _literal: &Literal,
        _kb: &KnowledgeBase,
    ) -> Result<Vec<(Vec<Term>, Sentence)>, Diagnostic> {
        Ok(vec![(
            vec![
                Term::Str("hello".to_string()),
                Term::Str("world".to_string()),
            ],
            Sentence::True,
        )])
    }
}

/// Demonstration extension: `between(Low, High, X)` enumerates the integers
/// of a closed interval. Low and high must be bound.
struct RangeExtension;

impl Extension for RangeExtension {
    fn name(&self) -> &str {
        "range"
    }

    fn predicates(&self) -> Vec<Predicate> {
        vec![Predicate::new("between", 3)]
    }

    fn resolve(
        &self,
        literal: &Literal,
        _kb: &KnowledgeBase,
    ) -> Result<Vec<(Vec<Term>, Sentence)>, Diagnostic> {
        let (Term::Int(low), Term::Int(high)) = (&literal.terms[0], &literal.terms[1]) else {
            return Err(Diagnostic::new(
                "E-EXTENSION",
                "between/3 requires bound integer bounds",
                None,
            ));
        };
        let mut answers = Vec::new();
        for value in *low..=*high {
            answers.push((
                vec![Term::Int(*low), Term::Int(*high), Term::Int(value)],
                Sentence::True,
            ));
        }
        Ok(answers)
    }
}
