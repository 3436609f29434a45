use std::collections::{HashMap, HashSet};

use crate::diagnostics::Diagnostic;
use crate::knowledge::KnowledgeBase;
use crate::stratify::Strata;
use crate::terms::{canonicalize_tuple, Bindings, Literal, Predicate, Term};
use crate::worlds::{conjunct, disjunct, equivalent, is_contradiction, Sentence};

/// Resource ceiling for a single query: total answers across all tables.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub max_answers: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_answers: 100_000,
        }
    }
}

/// Observation hook for the `-d` debug trace. All methods default to no-ops.
pub trait Tracer {
    fn ask(&mut self, _query: &Literal) {}
    fn subgoal(&mut self, _goal: &Literal, _depth: usize) {}
    fn answer(&mut self, _goal: &Literal, _terms: &[Term], _sentence: &Sentence) {}
    fn complete(&mut self, _goal: &Literal, _answers: usize) {}
    fn done(&mut self, _query: &Literal, _answers: usize) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub terms: Vec<Term>,
    pub sentence: Sentence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSet {
    pub query: Literal,
    pub answers: Vec<Answer>,
    pub warnings: Vec<Diagnostic>,
}

struct Table {
    goal: Literal,
    answers: Vec<(Vec<Term>, Sentence)>,
    index: HashMap<Vec<Term>, usize>,
    complete: bool,
    dfn: usize,
}

/// Sentinel dependency value: the consulted table was complete.
const COMPLETE: usize = usize::MAX;

/// Top-down SLDNF evaluator with tabling and sentence propagation.
///
/// Tables are keyed by the call pattern of the goal and driven in rounds: a
/// stack of in-evaluation tables identifies mutually recursive call patterns,
/// and the outermost member of such a group re-evaluates the whole group
/// until no table gains an answer, then freezes it. Sentences conjoin along
/// clause bodies and disjoin across proofs of the same answer tuple; the
/// fixpoint test is semantic equivalence, not syntactic equality, so cyclic
/// proofs of labeled clauses converge.
pub struct Resolver<'a> {
    kb: &'a KnowledgeBase,
    strata: &'a Strata,
    config: ResolverConfig,
    tracer: Option<&'a mut dyn Tracer>,
    tables: HashMap<String, usize>,
    store: Vec<Table>,
    stack: Vec<usize>,
    next_dfn: usize,
    fresh: u64,
    total_answers: usize,
    warned: HashSet<Predicate>,
    warnings: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    pub fn new(kb: &'a KnowledgeBase, strata: &'a Strata) -> Self {
        Self {
            kb,
            strata,
            config: ResolverConfig::default(),
            tracer: None,
            tables: HashMap::new(),
            store: Vec::new(),
            stack: Vec::new(),
            next_dfn: 0,
            fresh: 0,
            total_answers: 0,
            warned: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tracer(mut self, tracer: &'a mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Evaluates a query literal to completion and returns its answers in
    /// discovery order: clause declaration order crossed with binding
    /// discovery order. Tables do not survive the call.
    pub fn ask(&mut self, query: &Literal) -> Result<AnswerSet, Diagnostic> {
        if !query.positive {
            return Err(Diagnostic::new(
                "E-PARSE",
                "only positive literals can be queried",
                None,
            ));
        }
        self.tables.clear();
        self.store.clear();
        self.stack.clear();
        self.next_dfn = 0;
        self.fresh = 0;
        self.total_answers = 0;
        self.warned.clear();
        self.warnings.clear();

        if let Some(tracer) = self.tracer.as_deref_mut() {
            tracer.ask(query);
        }
        self.solve(query)?;

        let table = &self.store[self.tables[&query.tag()]];
        let answers: Vec<Answer> = table
            .answers
            .iter()
            .map(|(terms, sentence)| Answer {
                terms: terms.clone(),
                sentence: sentence.clone(),
            })
            .collect();
        if let Some(tracer) = self.tracer.as_deref_mut() {
            tracer.done(query, answers.len());
        }
        Ok(AnswerSet {
            query: query.clone(),
            answers,
            warnings: self.warnings.clone(),
        })
    }

    /// Ensures a table for the goal exists and is as complete as the current
    /// evaluation allows. Returns `COMPLETE` when the table froze, or the
    /// depth-first number of the innermost in-evaluation table it depends on.
    fn solve(&mut self, goal: &Literal) -> Result<usize, Diagnostic> {
        let key = goal.tag();
        if let Some(&ti) = self.tables.get(&key) {
            if self.store[ti].complete {
                return Ok(COMPLETE);
            }
            return Ok(self.store[ti].dfn);
        }

        if !self.kb.defines(&goal.pred) && self.warned.insert(goal.pred.clone()) {
            self.warnings.push(Diagnostic::new(
                "E-PREDICATE",
                format!("predicate {} has no clauses; its answer set is empty", goal.pred),
                None,
            ));
        }

        let dfn = self.next_dfn;
        self.next_dfn += 1;
        let ti = self.store.len();
        self.store.push(Table {
            goal: goal.clone(),
            answers: Vec::new(),
            index: HashMap::new(),
            complete: false,
            dfn,
        });
        self.tables.insert(key, ti);
        self.stack.push(ti);
        let position = self.stack.len() - 1;
        if let Some(tracer) = self.tracer.as_deref_mut() {
            tracer.subgoal(goal, position);
        }

        let mut min = COMPLETE;
        loop {
            let mut changed = false;
            let mut i = position;
            while i < self.stack.len() {
                let member = self.stack[i];
                let (member_changed, member_min) = self.evaluate_table(member)?;
                changed |= member_changed;
                min = min.min(member_min);
                i += 1;
            }
            if !changed {
                break;
            }
        }

        if min >= dfn {
            for member in self.stack.drain(position..) {
                self.store[member].complete = true;
            }
            if let Some(tracer) = self.tracer.as_deref_mut() {
                let answers = self.store[ti].answers.len();
                tracer.complete(&self.store[ti].goal.clone(), answers);
            }
            Ok(COMPLETE)
        } else {
            Ok(min)
        }
    }

    /// Runs every applicable clause (and extension) against the table's goal
    /// once, using the answers discovered so far for recursive subgoals.
    fn evaluate_table(&mut self, ti: usize) -> Result<(bool, usize), Diagnostic> {
        let goal = self.store[ti].goal.clone();
        let mut changed = false;
        let mut min = COMPLETE;
        let kb = self.kb;

        if let Some(provider) = kb.provider_for(&goal.pred) {
            for (row, sentence) in provider.resolve(&goal, kb)? {
                if row.len() != goal.pred.arity {
                    return Err(Diagnostic::new(
                        "E-EXTENSION",
                        format!(
                            "extension '{}' produced a tuple of arity {} for {}",
                            provider.name(),
                            row.len(),
                            goal.pred
                        ),
                        None,
                    ));
                }
                let row = self.rename_tuple(&row);
                let mut env = Bindings::new();
                if !goal
                    .terms
                    .iter()
                    .zip(row.iter())
                    .all(|(a, b)| env.unify_terms(a, b))
                {
                    continue;
                }
                let tuple: Vec<Term> = goal.terms.iter().map(|t| env.apply(t)).collect();
                changed |= self.add_answer(ti, tuple, sentence.simplify())?;
            }
        }

        for clause in kb.clauses_for(&goal.pred) {
            let activation = clause.rename(&mut self.fresh);
            let Some(env) = goal.unify(&activation.head, &Bindings::new()) else {
                continue;
            };
            let (clause_changed, clause_min) =
                self.resolve_body(ti, &goal, activation.body, env, activation.sentence)?;
            changed |= clause_changed;
            min = min.min(clause_min);
        }

        Ok((changed, min))
    }

    /// Resolves the remaining body literals of one clause activation,
    /// threading the accumulated substitution and sentence through.
    fn resolve_body(
        &mut self,
        ti: usize,
        goal: &Literal,
        body: Vec<Literal>,
        env: Bindings,
        sentence: Sentence,
    ) -> Result<(bool, usize), Diagnostic> {
        let sentence = sentence.simplify();
        if is_contradiction(&sentence) {
            return Ok((false, COMPLETE));
        }
        if body.is_empty() {
            let tuple: Vec<Term> = goal.terms.iter().map(|t| env.apply(t)).collect();
            let changed = self.add_answer(ti, tuple, sentence)?;
            return Ok((changed, COMPLETE));
        }

        let Some(index) = select_index(&body, &env) else {
            return Err(Diagnostic::new(
                "E-SAFETY",
                "selected a non-grounded negative literal",
                None,
            ));
        };
        let mut rest = body;
        let lit = rest.remove(index).subst(&env);

        if lit.positive {
            let mut min = self.solve(&lit)?;
            let mut changed = false;
            let sub = self.tables[&lit.tag()];
            let snapshot = self.store[sub].answers.clone();
            for (row, answer_sentence) in snapshot {
                let row = self.rename_tuple(&row);
                let mut extended = env.clone();
                if !lit
                    .terms
                    .iter()
                    .zip(row.iter())
                    .all(|(a, b)| extended.unify_terms(a, b))
                {
                    continue;
                }
                let (step_changed, step_min) = self.resolve_body(
                    ti,
                    goal,
                    rest.clone(),
                    extended,
                    conjunct(vec![sentence.clone(), answer_sentence]),
                )?;
                changed |= step_changed;
                min = min.min(step_min);
            }
            Ok((changed, min))
        } else {
            let positive = lit.invert();
            let head_stratum = self.strata.get(&goal.pred).copied().unwrap_or(0);
            let neg_stratum = self.strata.get(&positive.pred).copied().unwrap_or(0);
            if neg_stratum >= head_stratum {
                return Err(Diagnostic::new(
                    "E-STRATIFY",
                    format!(
                        "negated predicate {} is not below {} in the stratification",
                        positive.pred, goal.pred
                    ),
                    None,
                ));
            }
            let dep = self.solve(&positive)?;
            if dep != COMPLETE {
                return Err(Diagnostic::new(
                    "E-STRATIFY",
                    format!("negation of {} depends on an incomplete subgoal", positive.pred),
                    None,
                ));
            }
            let sub = self.tables[&positive.tag()];
            let proofs: Vec<Sentence> = self.store[sub]
                .answers
                .iter()
                .filter(|(row, _)| *row == positive.terms)
                .map(|(_, s)| s.clone())
                .collect();
            let negated = Sentence::Not(Box::new(disjunct(proofs))).simplify();
            let combined = conjunct(vec![sentence, negated]);
            if is_contradiction(&combined) {
                return Ok((false, COMPLETE));
            }
            self.resolve_body(ti, goal, rest, env, combined)
        }
    }

    /// Records an answer tuple, merging the sentence disjunctively with any
    /// earlier proof of the same tuple. The change test is semantic so that
    /// recursion through labeled clauses reaches a fixpoint.
    fn add_answer(
        &mut self,
        ti: usize,
        tuple: Vec<Term>,
        sentence: Sentence,
    ) -> Result<bool, Diagnostic> {
        if is_contradiction(&sentence) {
            return Ok(false);
        }
        let tuple = canonicalize_tuple(&tuple);
        let changed;
        let (terms, merged) = {
            let table = &mut self.store[ti];
            match table.index.get(&tuple) {
                Some(&slot) => {
                    let previous = table.answers[slot].1.clone();
                    let merged = disjunct(vec![previous.clone(), sentence]);
                    if equivalent(&merged, &previous) {
                        return Ok(false);
                    }
                    // A sentence update is a derivation too; counting it keeps
                    // the ceiling effective when sentences grow without new
                    // tuples appearing.
                    self.total_answers += 1;
                    if self.total_answers > self.config.max_answers {
                        return Err(Diagnostic::new(
                            "E-RESOURCE",
                            format!(
                                "answer ceiling of {} exceeded; the query may not terminate",
                                self.config.max_answers
                            ),
                            None,
                        ));
                    }
                    table.answers[slot].1 = merged.clone();
                    changed = true;
                    (tuple, merged)
                }
                None => {
                    self.total_answers += 1;
                    if self.total_answers > self.config.max_answers {
                        return Err(Diagnostic::new(
                            "E-RESOURCE",
                            format!(
                                "answer ceiling of {} exceeded; the query may not terminate",
                                self.config.max_answers
                            ),
                            None,
                        ));
                    }
                    table.index.insert(tuple.clone(), table.answers.len());
                    table.answers.push((tuple.clone(), sentence.clone()));
                    changed = true;
                    (tuple, sentence)
                }
            }
        };
        if let Some(tracer) = self.tracer.as_deref_mut() {
            let goal = self.store[ti].goal.clone();
            tracer.answer(&goal, &terms, &merged);
        }
        Ok(changed)
    }

    /// Renames the variables of a stored answer tuple apart before it is
    /// unified into a consumer, so activations never share variables.
    fn rename_tuple(&mut self, terms: &[Term]) -> Vec<Term> {
        if terms.iter().all(Term::is_const) {
            return terms.to_vec();
        }
        let mut vars = std::collections::BTreeSet::new();
        for term in terms {
            term.collect_vars(&mut vars);
        }
        let mut env = Bindings::new();
        for var in vars {
            self.fresh += 1;
            env.bind(var, Term::Var(format!("_R{}", self.fresh)));
        }
        terms.iter().map(|t| env.apply(t)).collect()
    }
}

/// Literal selection: the first positive literal, or failing that the first
/// negative literal that is ground under the current substitution.
fn select_index(body: &[Literal], env: &Bindings) -> Option<usize> {
    body.iter()
        .position(|lit| lit.positive)
        .or_else(|| body.iter().position(|lit| lit.subst(env).is_ground()))
}
