use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;

use crate::worlds::Sentence;

/// A first-order term. Constants come in three kinds so that `1`, `"1"` and
/// `one` stay distinct; compound terms carry a functor and arguments and are
/// what label functions such as `c(C)` instantiate through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Var(String),
    Symbol(String),
    Int(i64),
    Str(String),
    Ctor { name: String, args: Vec<Term> },
}

impl Term {
    pub fn is_const(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Symbol(_) | Term::Int(_) | Term::Str(_) => true,
            Term::Ctor { args, .. } => args.iter().all(Term::is_const),
        }
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Symbol(_) | Term::Int(_) | Term::Str(_) => {}
            Term::Ctor { args, .. } => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
        }
    }

    fn write_tag(&self, out: &mut String, next: &mut usize, seen: &mut HashMap<String, usize>) {
        match self {
            Term::Var(v) => {
                let n = *seen.entry(v.clone()).or_insert_with(|| {
                    let n = *next;
                    *next += 1;
                    n
                });
                let _ = write!(out, "v{n};");
            }
            Term::Symbol(s) => {
                let _ = write!(out, "s{}:{s};", s.len());
            }
            Term::Int(i) => {
                let _ = write!(out, "i{i};");
            }
            Term::Str(s) => {
                let _ = write!(out, "q{}:{s};", s.len());
            }
            Term::Ctor { name, args } => {
                let _ = write!(out, "f{}:{}({};", args.len(), name.len(), name);
                for arg in args {
                    arg.write_tag(out, next, seen);
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::Symbol(s) => write!(f, "{s}"),
            Term::Int(i) => write!(f, "{i}"),
            Term::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Term::Ctor { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    pub name: String,
    pub arity: usize,
}

impl Predicate {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub pred: Predicate,
    pub terms: Vec<Term>,
    pub positive: bool,
}

impl Literal {
    pub fn new(pred: Predicate, terms: Vec<Term>) -> Self {
        Self {
            pred,
            terms,
            positive: true,
        }
    }

    pub fn negative(pred: Predicate, terms: Vec<Term>) -> Self {
        Self {
            pred,
            terms,
            positive: false,
        }
    }

    pub fn invert(&self) -> Self {
        Self {
            pred: self.pred.clone(),
            terms: self.terms.clone(),
            positive: !self.positive,
        }
    }

    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_const)
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        for term in &self.terms {
            term.collect_vars(out);
        }
    }

    /// Canonical call-pattern tag: two literals get the same tag exactly when
    /// they are variants of each other (same predicate, same ground values at
    /// bound positions, same sharing structure among free positions). Used as
    /// the table key during resolution.
    pub fn tag(&self) -> String {
        let mut out = String::new();
        if !self.positive {
            out.push('~');
        }
        let _ = write!(out, "{}/{}:", self.pred.name, self.pred.arity);
        let mut next = 0usize;
        let mut seen = HashMap::new();
        for term in &self.terms {
            term.write_tag(&mut out, &mut next, &mut seen);
        }
        out
    }

    pub fn subst(&self, env: &Bindings) -> Literal {
        if env.is_empty() {
            return self.clone();
        }
        Literal {
            pred: self.pred.clone(),
            terms: self.terms.iter().map(|t| env.apply(t)).collect(),
            positive: self.positive,
        }
    }

    /// Unifies this literal with another of the same predicate, extending the
    /// given substitution. Returns `None` on clash.
    pub fn unify(&self, other: &Literal, env: &Bindings) -> Option<Bindings> {
        if self.pred != other.pred {
            return None;
        }
        let mut env = env.clone();
        for (a, b) in self.terms.iter().zip(other.terms.iter()) {
            if !env.unify_terms(a, b) {
                return None;
            }
        }
        Some(env)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "~")?;
        }
        if self.pred.name == "=" && self.terms.len() == 2 {
            return write!(f, "{} = {}", self.terms[0], self.terms[1]);
        }
        write!(f, "{}", self.pred.name)?;
        if !self.terms.is_empty() {
            write!(f, "(")?;
            for (i, term) in self.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{term}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A substitution from variable names to terms. Bindings are extended during
/// unification and applied with full chasing, so a bound variable may itself
/// map to another bound variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    map: HashMap<String, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn bind(&mut self, var: impl Into<String>, term: Term) {
        self.map.insert(var.into(), term);
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.map.get(var)
    }

    /// Follows variable-to-variable links until a constant, compound, or
    /// unbound variable is reached. Does not descend into compounds.
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term.clone();
        while let Term::Var(v) = &current {
            match self.map.get(v) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    /// Applies the substitution throughout the term.
    pub fn apply(&self, term: &Term) -> Term {
        let walked = self.walk(term);
        match walked {
            Term::Ctor { name, args } => Term::Ctor {
                name,
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            other => other,
        }
    }

    fn occurs(&self, var: &str, term: &Term) -> bool {
        match self.walk(term) {
            Term::Var(v) => v == var,
            Term::Ctor { args, .. } => args.iter().any(|a| self.occurs(var, a)),
            _ => false,
        }
    }

    /// Robinson unification with occurs check. Extends the substitution in
    /// place and reports whether the two terms unify.
    pub fn unify_terms(&mut self, a: &Term, b: &Term) -> bool {
        let a = self.walk(a);
        let b = self.walk(b);
        match (a, b) {
            (Term::Var(x), Term::Var(y)) if x == y => true,
            (Term::Var(x), b) => {
                if self.occurs(&x, &b) {
                    return false;
                }
                self.bind(x, b);
                true
            }
            (a, Term::Var(y)) => {
                if self.occurs(&y, &a) {
                    return false;
                }
                self.bind(y, a);
                true
            }
            (Term::Ctor { name: na, args: aa }, Term::Ctor { name: nb, args: ab }) => {
                na == nb
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab.iter()).all(|(x, y)| self.unify_terms(x, y))
            }
            (a, b) => a == b,
        }
    }
}

/// A clause: a positive head, a body of literals, and a descriptive sentence
/// stating in which worlds the clause holds. A clause with an empty body is a
/// fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clause {
    pub head: Literal,
    pub body: Vec<Literal>,
    pub sentence: Sentence,
}

impl Clause {
    pub fn fact(head: Literal) -> Self {
        Self {
            head,
            body: Vec::new(),
            sentence: Sentence::True,
        }
    }

    pub fn new(head: Literal, body: Vec<Literal>, sentence: Sentence) -> Self {
        Self {
            head,
            body,
            sentence,
        }
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        self.head.collect_vars(out);
        for lit in &self.body {
            lit.collect_vars(out);
        }
        self.sentence.collect_vars(out);
    }

    pub fn subst(&self, env: &Bindings) -> Clause {
        if env.is_empty() {
            return self.clone();
        }
        Clause {
            head: self.head.subst(env),
            body: self.body.iter().map(|l| l.subst(env)).collect(),
            sentence: self.sentence.subst(env),
        }
    }

    /// Standardizes the clause apart: every head and body variable is
    /// replaced by a fresh one drawn from the given counter. Must be called
    /// once per activation so that no two activations share variables. The
    /// sentence is carried verbatim: labels are opaque during resolution, and
    /// only generator expansion substitutes into them.
    pub fn rename(&self, fresh: &mut u64) -> Clause {
        let mut vars = BTreeSet::new();
        self.head.collect_vars(&mut vars);
        for lit in &self.body {
            lit.collect_vars(&mut vars);
        }
        if vars.is_empty() {
            return self.clone();
        }
        let mut env = Bindings::new();
        for var in vars {
            *fresh += 1;
            env.bind(var, Term::Var(format!("_R{fresh}")));
        }
        Clause {
            head: self.head.subst(&env),
            body: self.body.iter().map(|l| l.subst(&env)).collect(),
            sentence: self.sentence.clone(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for (i, lit) in self.body.iter().enumerate() {
            if i == 0 {
                write!(f, " :- ")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{lit}")?;
        }
        if self.sentence != Sentence::True {
            write!(f, " [{}]", self.sentence)?;
        }
        Ok(())
    }
}

/// Renames the variables of an answer tuple to canonical positional names so
/// that structurally equal answers from different activations compare equal.
pub fn canonicalize_tuple(terms: &[Term]) -> Vec<Term> {
    if terms.iter().all(Term::is_const) {
        return terms.to_vec();
    }
    let mut env = Bindings::new();
    let mut vars = BTreeSet::new();
    let mut ordered = Vec::new();
    for term in terms {
        let mut local = BTreeSet::new();
        term.collect_vars(&mut local);
        for v in local {
            if vars.insert(v.clone()) {
                ordered.push(v);
            }
        }
    }
    for (i, var) in ordered.into_iter().enumerate() {
        env.bind(var, Term::Var(format!("_A{i}")));
    }
    terms.iter().map(|t| env.apply(t)).collect()
}
