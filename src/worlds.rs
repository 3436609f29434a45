use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::terms::{Bindings, Term};

/// An atomic world label `partition = value`. Labels over the same partition
/// but different values are mutually exclusive: a world assigns exactly one
/// value to each partition. Partition and value are terms so that label
/// functions such as `c(C) = h` can be instantiated by substitution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub partition: Term,
    pub value: Term,
}

impl Label {
    pub fn new(partition: Term, value: Term) -> Self {
        Self { partition, value }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.partition, self.value)
    }
}

/// A total choice of one value per partition.
pub type World = BTreeMap<Term, Term>;

/// A descriptive sentence: a propositional formula over labels, attached to
/// clauses and propagated through resolution. Conjunction and disjunction are
/// n-ary with sorted, deduplicated operands so that semantically equal
/// sentences built along different proof orders compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentence {
    True,
    False,
    Lit(Label),
    And(Vec<Sentence>),
    Or(Vec<Sentence>),
    Not(Box<Sentence>),
}

impl Sentence {
    pub fn lit(partition: Term, value: Term) -> Self {
        Sentence::Lit(Label::new(partition, value))
    }

    /// Evaluates the sentence in a world. A label holds iff the world maps its
    /// partition to its value.
    pub fn evaluate(&self, world: &World) -> bool {
        match self {
            Sentence::True => true,
            Sentence::False => false,
            Sentence::Lit(label) => world.get(&label.partition) == Some(&label.value),
            Sentence::And(items) => items.iter().all(|s| s.evaluate(world)),
            Sentence::Or(items) => items.iter().any(|s| s.evaluate(world)),
            Sentence::Not(sub) => !sub.evaluate(world),
        }
    }

    /// Replaces every label whose partition is decided by the (possibly
    /// partial) world with `True` or `False`, then simplifies. Labels over
    /// undecided partitions survive.
    pub fn assume(&self, world: &World) -> Sentence {
        self.map_labels(&|label| match world.get(&label.partition) {
            Some(value) if *value == label.value => Sentence::True,
            Some(_) => Sentence::False,
            None => Sentence::Lit(label.clone()),
        })
        .simplify()
    }

    fn map_labels(&self, f: &impl Fn(&Label) -> Sentence) -> Sentence {
        match self {
            Sentence::True => Sentence::True,
            Sentence::False => Sentence::False,
            Sentence::Lit(label) => f(label),
            Sentence::And(items) => Sentence::And(items.iter().map(|s| s.map_labels(f)).collect()),
            Sentence::Or(items) => Sentence::Or(items.iter().map(|s| s.map_labels(f)).collect()),
            Sentence::Not(sub) => Sentence::Not(Box::new(sub.map_labels(f))),
        }
    }

    pub fn labels(&self, out: &mut BTreeSet<Label>) {
        match self {
            Sentence::True | Sentence::False => {}
            Sentence::Lit(label) => {
                out.insert(label.clone());
            }
            Sentence::And(items) | Sentence::Or(items) => {
                for item in items {
                    item.labels(out);
                }
            }
            Sentence::Not(sub) => sub.labels(out),
        }
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        let mut labels = BTreeSet::new();
        self.labels(&mut labels);
        for label in labels {
            label.partition.collect_vars(out);
            label.value.collect_vars(out);
        }
    }

    pub fn subst(&self, env: &Bindings) -> Sentence {
        if env.is_empty() {
            return self.clone();
        }
        self.map_labels(&|label| {
            Sentence::Lit(Label::new(env.apply(&label.partition), env.apply(&label.value)))
        })
    }

    /// Semantics-preserving simplification. Flattens nested conjunctions and
    /// disjunctions, sorts and deduplicates operands, applies the unit and
    /// double-negation laws, collapses complementary operands, and recognizes
    /// partition exclusivity: a conjunction containing `p=v` and `p=w` with
    /// `v != w` is false.
    pub fn simplify(&self) -> Sentence {
        match self {
            Sentence::True | Sentence::False | Sentence::Lit(_) => self.clone(),
            Sentence::Not(sub) => match sub.simplify() {
                Sentence::True => Sentence::False,
                Sentence::False => Sentence::True,
                Sentence::Not(inner) => *inner,
                simplified => Sentence::Not(Box::new(simplified)),
            },
            Sentence::And(items) => {
                let mut flat = BTreeSet::new();
                for item in items {
                    match item.simplify() {
                        Sentence::True => {}
                        Sentence::False => return Sentence::False,
                        Sentence::And(inner) => flat.extend(inner),
                        simplified => {
                            flat.insert(simplified);
                        }
                    }
                }
                if conjunction_contradicts(&flat) {
                    return Sentence::False;
                }
                rebuild(flat, Sentence::True, Sentence::And)
            }
            Sentence::Or(items) => {
                let mut flat = BTreeSet::new();
                for item in items {
                    match item.simplify() {
                        Sentence::False => {}
                        Sentence::True => return Sentence::True,
                        Sentence::Or(inner) => flat.extend(inner),
                        simplified => {
                            flat.insert(simplified);
                        }
                    }
                }
                if has_complement(&flat) {
                    return Sentence::True;
                }
                rebuild(flat, Sentence::False, Sentence::Or)
            }
        }
    }
}

fn rebuild(
    mut items: BTreeSet<Sentence>,
    empty: Sentence,
    wrap: fn(Vec<Sentence>) -> Sentence,
) -> Sentence {
    match items.len() {
        0 => empty,
        1 => items.pop_first().expect("nonempty set"),
        _ => wrap(items.into_iter().collect()),
    }
}

fn has_complement(items: &BTreeSet<Sentence>) -> bool {
    items
        .iter()
        .any(|s| items.contains(&Sentence::Not(Box::new(s.clone()))))
}

fn conjunction_contradicts(items: &BTreeSet<Sentence>) -> bool {
    if has_complement(items) {
        return true;
    }
    // Partition exclusivity over the direct label operands.
    let mut chosen: BTreeMap<&Term, &Term> = BTreeMap::new();
    for item in items {
        if let Sentence::Lit(label) = item {
            match chosen.get(&label.partition) {
                Some(value) if **value != label.value => return true,
                Some(_) => {}
                None => {
                    chosen.insert(&label.partition, &label.value);
                }
            }
        }
    }
    false
}

/// Ceiling on the number of worlds enumerated by the semantic checks below.
/// Beyond it the checks fall back to structural comparison.
const WORLD_ENUMERATION_CAP: usize = 4096;

fn partition_values(sentences: &[&Sentence]) -> BTreeMap<Term, Vec<Term>> {
    let mut labels = BTreeSet::new();
    for sentence in sentences {
        sentence.labels(&mut labels);
    }
    let mut parts: BTreeMap<Term, Vec<Term>> = BTreeMap::new();
    for label in labels {
        let values = parts.entry(label.partition).or_default();
        if !values.contains(&label.value) {
            values.push(label.value);
        }
    }
    // A world may assign a value no label mentions; one sentinel per
    // partition stands in for all of them. The name cannot be produced by
    // the surface syntax.
    for values in parts.values_mut() {
        values.push(Term::Ctor {
            name: "<other>".to_string(),
            args: Vec::new(),
        });
    }
    parts
}

fn for_each_world(
    parts: &BTreeMap<Term, Vec<Term>>,
    mut visit: impl FnMut(&World) -> bool,
) -> Option<bool> {
    let total: usize = parts
        .values()
        .try_fold(1usize, |acc, v| acc.checked_mul(v.len()))?;
    if total > WORLD_ENUMERATION_CAP {
        return None;
    }
    let partitions: Vec<(&Term, &Vec<Term>)> = parts.iter().collect();
    let mut indices = vec![0usize; partitions.len()];
    loop {
        let world: World = partitions
            .iter()
            .zip(indices.iter())
            .map(|((p, values), &i)| ((*p).clone(), values[i].clone()))
            .collect();
        if !visit(&world) {
            return Some(false);
        }
        let mut dim = 0;
        loop {
            if dim == partitions.len() {
                return Some(true);
            }
            indices[dim] += 1;
            if indices[dim] < partitions[dim].1.len() {
                break;
            }
            indices[dim] = 0;
            dim += 1;
        }
    }
}

/// Semantic equivalence: the two sentences evaluate identically in every
/// world over their partitions. Falls back to structural equality when the
/// world space is too large to enumerate.
pub fn equivalent(a: &Sentence, b: &Sentence) -> bool {
    if a == b {
        return true;
    }
    let parts = partition_values(&[a, b]);
    match for_each_world(&parts, |world| a.evaluate(world) == b.evaluate(world)) {
        Some(result) => result,
        None => false,
    }
}

/// True when the sentence holds in no world, i.e. it only describes worlds
/// that violate partition exclusivity. Conservative: falls back to a
/// structural check when the world space is too large.
pub fn is_contradiction(sentence: &Sentence) -> bool {
    if *sentence == Sentence::False {
        return true;
    }
    let parts = partition_values(&[sentence]);
    match for_each_world(&parts, |world| !sentence.evaluate(world)) {
        Some(result) => result,
        None => false,
    }
}

/// Conjunction constructor used during body resolution; always simplified.
pub fn conjunct(items: Vec<Sentence>) -> Sentence {
    Sentence::And(items).simplify()
}

/// Disjunction constructor used when a goal has several proofs; always
/// simplified.
pub fn disjunct(items: Vec<Sentence>) -> Sentence {
    Sentence::Or(items).simplify()
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentence::True => write!(f, "true"),
            Sentence::False => write!(f, "false"),
            Sentence::Lit(label) => write!(f, "{label}"),
            Sentence::And(items) => write_nary(f, items, "and"),
            Sentence::Or(items) => write_nary(f, items, "or"),
            Sentence::Not(sub) => write!(f, "not {sub}"),
        }
    }
}

fn write_nary(f: &mut fmt::Formatter<'_>, items: &[Sentence], op: &str) -> fmt::Result {
    if items.len() == 1 {
        return write!(f, "{}", items[0]);
    }
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}
