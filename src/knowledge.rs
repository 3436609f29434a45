use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::diagnostics::Diagnostic;
use crate::extensions::{builtin_equality, Extension};
use crate::terms::{Clause, Predicate, Term};
use crate::worlds::Label;

/// The clause store plus the probability declarations of a program. Clauses
/// are indexed by the head's predicate and kept in declaration order, which
/// the resolver relies on for deterministic answer order. The knowledge base
/// is mutated between queries only; a running query treats it as read-only.
pub struct KnowledgeBase {
    clauses: HashMap<Predicate, Vec<Clause>>,
    probabilities: HashMap<Term, Vec<(Term, f64)>>,
    providers: HashMap<Predicate, Rc<dyn Extension>>,
    loaded: Vec<String>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase {
    pub fn new() -> Self {
        let mut kb = Self {
            clauses: HashMap::new(),
            probabilities: HashMap::new(),
            providers: HashMap::new(),
            loaded: Vec::new(),
        };
        kb.register_extension(builtin_equality())
            .expect("built-in predicates never collide in an empty knowledge base");
        kb
    }

    /// Asserts a clause after checking the safety conditions: all head
    /// variables occur in the body, and all variables of negative body
    /// literals occur in positive body literals.
    pub fn assert_clause(&mut self, clause: Clause) -> Result<(), Diagnostic> {
        check_safety(&clause)?;
        self.clauses
            .entry(clause.head.pred.clone())
            .or_default()
            .push(clause);
        Ok(())
    }

    /// Retracts the first structurally equal clause. A miss is a no-op.
    pub fn retract_clause(&mut self, clause: &Clause) {
        if let Some(list) = self.clauses.get_mut(&clause.head.pred) {
            if let Some(index) = list.iter().position(|c| c == clause) {
                list.remove(index);
            }
            if list.is_empty() {
                self.clauses.remove(&clause.head.pred);
            }
        }
    }

    pub fn clauses_for(&self, pred: &Predicate) -> &[Clause] {
        self.clauses.get(pred).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the predicate has asserted clauses or an extension provider.
    pub fn defines(&self, pred: &Predicate) -> bool {
        self.clauses.contains_key(pred) || self.providers.contains_key(pred)
    }

    pub fn provider_for(&self, pred: &Predicate) -> Option<Rc<dyn Extension>> {
        self.providers.get(pred).cloned()
    }

    /// Predicates with asserted clauses, sorted for deterministic listings.
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut preds: Vec<&Predicate> = self.clauses.keys().collect();
        preds.sort();
        preds
    }

    pub fn all_clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.values().flatten()
    }

    pub fn has_negation(&self) -> bool {
        self.all_clauses()
            .any(|clause| clause.body.iter().any(|lit| !lit.positive))
    }

    /// Registers an extension, claiming all its declared predicates. A
    /// predicate already provided by another extension is a collision.
    pub fn register_extension(&mut self, ext: Rc<dyn Extension>) -> Result<(), Diagnostic> {
        if self.loaded.iter().any(|name| name == ext.name()) {
            return Ok(());
        }
        for pred in ext.predicates() {
            if let Some(existing) = self.providers.get(&pred) {
                return Err(Diagnostic::new(
                    "E-EXTENSION",
                    format!(
                        "predicate {} is already provided by extension '{}'",
                        pred,
                        existing.name()
                    ),
                    None,
                ));
            }
            self.providers.insert(pred, Rc::clone(&ext));
        }
        self.loaded.push(ext.name().to_string());
        Ok(())
    }

    pub fn loaded_extensions(&self) -> &[String] {
        &self.loaded
    }

    pub fn set_probability(&mut self, label: &Label, probability: f64) -> Result<(), Diagnostic> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(Diagnostic::new(
                "E-PROB",
                format!("probability {probability} for label '{label}' is outside [0, 1]"),
                None,
            ));
        }
        let distribution = self.probabilities.entry(label.partition.clone()).or_default();
        match distribution.iter_mut().find(|(v, _)| *v == label.value) {
            Some(entry) => entry.1 = probability,
            None => distribution.push((label.value.clone(), probability)),
        }
        Ok(())
    }

    /// Assigns `1/k` to each of the `k` values the partition currently takes
    /// in asserted clause sentences. The value set is frozen at declaration
    /// time; values that appear later do not re-normalize the distribution.
    pub fn set_uniform(&mut self, partition: &Term) {
        let values = self.parts(partition);
        if values.is_empty() {
            return;
        }
        let share = 1.0 / values.len() as f64;
        let distribution = values.into_iter().map(|v| (v, share)).collect();
        self.probabilities.insert(partition.clone(), distribution);
    }

    /// Scans the sentences of all asserted clauses for the values the
    /// partition is compared against.
    pub fn parts(&self, partition: &Term) -> BTreeSet<Term> {
        let mut labels = BTreeSet::new();
        for clause in self.all_clauses() {
            clause.sentence.labels(&mut labels);
        }
        labels
            .into_iter()
            .filter(|label| label.partition == *partition)
            .map(|label| label.value)
            .collect()
    }

    pub fn distribution(&self, partition: &Term) -> Option<&[(Term, f64)]> {
        self.probabilities.get(partition).map(Vec::as_slice)
    }

    pub fn probability(&self, label: &Label) -> Option<f64> {
        self.probabilities
            .get(&label.partition)?
            .iter()
            .find(|(value, _)| *value == label.value)
            .map(|(_, p)| *p)
    }
}

fn check_safety(clause: &Clause) -> Result<(), Diagnostic> {
    let mut head_vars = BTreeSet::new();
    clause.head.collect_vars(&mut head_vars);

    let mut pos_vars = BTreeSet::new();
    let mut neg_vars = BTreeSet::new();
    for lit in &clause.body {
        if lit.positive {
            lit.collect_vars(&mut pos_vars);
        } else {
            lit.collect_vars(&mut neg_vars);
        }
    }

    if let Some(var) = head_vars.difference(&pos_vars).next() {
        return Err(Diagnostic::new(
            "E-SAFETY",
            format!("unsafe clause '{clause}': head variable {var} does not occur in a positive body literal"),
            None,
        ));
    }
    if let Some(var) = neg_vars.difference(&pos_vars).next() {
        return Err(Diagnostic::new(
            "E-SAFETY",
            format!("unsafe clause '{clause}': variable {var} occurs only under negation"),
            None,
        ));
    }
    Ok(())
}
