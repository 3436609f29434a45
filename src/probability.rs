use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::diagnostics::Diagnostic;
use crate::knowledge::KnowledgeBase;
use crate::resolver::AnswerSet;
use crate::terms::{Literal, Term};
use crate::worlds::{Sentence, World};

/// One reported answer: the instantiated argument tuple, the sentence under
/// which it holds, and (for the Monte-Carlo backend) the estimated
/// probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportedAnswer {
    pub terms: Vec<Term>,
    pub sentence: Sentence,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub query: Literal,
    pub answers: Vec<ReportedAnswer>,
    pub iterations: Option<usize>,
    pub warnings: Vec<Diagnostic>,
}

/// The deterministic backend reports the answers whose sentence holds under
/// the explicitly selected world parts. Meeting a label over an unselected
/// partition is an error, matching the interactive `.select` workflow.
pub fn deterministic(set: &AnswerSet, selections: &World) -> Result<QueryReport, Diagnostic> {
    let mut answers = Vec::new();
    for answer in &set.answers {
        match answer.sentence.assume(selections) {
            Sentence::True => answers.push(ReportedAnswer {
                terms: answer.terms.clone(),
                sentence: Sentence::True,
                probability: None,
            }),
            Sentence::False => {}
            undecided => {
                let mut labels = BTreeSet::new();
                undecided.labels(&mut labels);
                let partition = labels
                    .first()
                    .map(|label| label.partition.to_string())
                    .unwrap_or_else(|| "?".to_string());
                return Err(Diagnostic::new(
                    "E-PROB",
                    format!(
                        "cannot decide '{}': no part selected for partitioning '{}'",
                        answer.sentence, partition
                    ),
                    None,
                ));
            }
        }
    }
    Ok(QueryReport {
        query: set.query.clone(),
        answers,
        iterations: None,
        warnings: set.warnings.clone(),
    })
}

/// The exact backend reports each answer with its simplified sentence and no
/// numeric probability. It refuses programs with negation: negation-as-
/// failure sentences are not probability-independent, which this backend
/// does not model.
pub fn exact(kb: &KnowledgeBase, set: &AnswerSet) -> Result<QueryReport, Diagnostic> {
    if kb.has_negation() {
        return Err(Diagnostic::new(
            "E-UNSUPPORTED",
            "the exact backend cannot evaluate programs with negation",
            None,
        ));
    }
    let answers = set
        .answers
        .iter()
        .map(|answer| ReportedAnswer {
            terms: answer.terms.clone(),
            sentence: answer.sentence.simplify(),
            probability: None,
        })
        .collect();
    Ok(QueryReport {
        query: set.query.clone(),
        answers,
        iterations: None,
        warnings: set.warnings.clone(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct MontecarloConfig {
    /// Number of worlds to draw. Zero means unbounded sampling, which
    /// requires a convergence threshold.
    pub samples: usize,
    /// Seed for the world generator; absent means a nondeterministic seed.
    pub seed: Option<u64>,
    /// Stop early once the 95% Wilson-score half-width of every answer falls
    /// below this threshold.
    pub approximate: Option<f64>,
}

impl Default for MontecarloConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: None,
            approximate: None,
        }
    }
}

const MIN_SAMPLES: usize = 100;
const UNBOUNDED_CEILING: usize = 10_000_000;

/// The Monte-Carlo backend draws worlds from the declared distributions and
/// reports hit frequencies per answer.
pub fn montecarlo(
    kb: &KnowledgeBase,
    set: &AnswerSet,
    config: &MontecarloConfig,
) -> Result<QueryReport, Diagnostic> {
    if config.samples == 0 && config.approximate.is_none() {
        return Err(Diagnostic::new(
            "E-RESOURCE",
            "unbounded sampling requires a convergence threshold",
            None,
        ));
    }

    let partitions = referenced_partitions(kb, set)?;

    let seed = config.seed.unwrap_or_else(nondeterministic_seed);
    let mut rng = SplitMix64::new(seed);
    let mut hits = vec![0usize; set.answers.len()];
    let mut count = 0usize;

    loop {
        count += 1;
        let world = draw_world(kb, &partitions, &mut rng);
        for (i, answer) in set.answers.iter().enumerate() {
            if answer.sentence.evaluate(&world) {
                hits[i] += 1;
            }
        }

        if let Some(threshold) = config.approximate {
            if count >= MIN_SAMPLES
                && hits
                    .iter()
                    .all(|&h| wilson_half_width(h, count) <= threshold)
            {
                break;
            }
        }
        if config.samples != 0 && count >= config.samples {
            break;
        }
        if config.samples == 0 && count >= UNBOUNDED_CEILING {
            return Err(Diagnostic::new(
                "E-RESOURCE",
                format!("sampling did not converge within {UNBOUNDED_CEILING} worlds"),
                None,
            ));
        }
    }

    let answers = set
        .answers
        .iter()
        .zip(hits.iter())
        .map(|(answer, &h)| ReportedAnswer {
            terms: answer.terms.clone(),
            sentence: answer.sentence.clone(),
            probability: Some(h as f64 / count as f64),
        })
        .collect();
    Ok(QueryReport {
        query: set.query.clone(),
        answers,
        iterations: Some(count),
        warnings: set.warnings.clone(),
    })
}

/// Collects the partitions the answer sentences refer to and validates that
/// each referenced label has a probability and each touched distribution
/// sums to one.
fn referenced_partitions(kb: &KnowledgeBase, set: &AnswerSet) -> Result<BTreeSet<Term>, Diagnostic> {
    let mut labels = BTreeSet::new();
    for answer in &set.answers {
        answer.sentence.labels(&mut labels);
    }

    let mut partitions = BTreeSet::new();
    for label in &labels {
        if kb.probability(label).is_none() {
            return Err(Diagnostic::new(
                "E-PROB",
                format!("no probability declared for label '{label}'"),
                None,
            ));
        }
        partitions.insert(label.partition.clone());
    }

    for partition in &partitions {
        let distribution = kb
            .distribution(partition)
            .expect("partition with a declared label probability");
        let total: f64 = distribution.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(Diagnostic::new(
                "E-PROB",
                format!("probabilities for partitioning '{partition}' sum to {total}, expected 1"),
                None,
            ));
        }
    }

    Ok(partitions)
}

fn draw_world(kb: &KnowledgeBase, partitions: &BTreeSet<Term>, rng: &mut SplitMix64) -> World {
    let mut world = World::new();
    for partition in partitions {
        let distribution = kb
            .distribution(partition)
            .expect("validated before sampling");
        let roll = rng.next_f64();
        let mut acc = 0.0;
        let mut chosen = &distribution[distribution.len() - 1].0;
        for (value, probability) in distribution {
            acc += probability;
            if acc >= roll {
                chosen = value;
                break;
            }
        }
        world.insert(partition.clone(), chosen.clone());
    }
    world
}

/// Half-width of the 95% Wilson score interval for `hits` out of `n`.
fn wilson_half_width(hits: usize, n: usize) -> f64 {
    let z = 1.959_963_984_540_054_f64;
    let n = n as f64;
    let p = hits as f64 / n;
    let z2 = z * z;
    z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / (1.0 + z2 / n)
}

fn nondeterministic_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E3779B97F4A7C15)
}

/// SplitMix64: a small, fast, seedable generator with a reproducible stream
/// per seed. The corpus samples with hand-rolled generators; reproducibility
/// per (seed, index) is all the Monte-Carlo contract needs.
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw from [0, 1) with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
