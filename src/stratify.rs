use std::collections::{HashMap, HashSet};

use crate::diagnostics::Diagnostic;
use crate::knowledge::KnowledgeBase;
use crate::terms::Predicate;

pub type Strata = HashMap<Predicate, usize>;

/// Computes a stratification of the program: positive dependencies may not
/// decrease the stratum and negative dependencies must strictly increase it.
/// A program admitting no such assignment has a negative dependency cycle and
/// is rejected.
pub fn compute_strata(kb: &KnowledgeBase) -> Result<Strata, Vec<Diagnostic>> {
    let mut predicates: HashSet<Predicate> = HashSet::new();
    let mut dependencies = Vec::new();
    let mut errors = Vec::new();

    for clause in kb.all_clauses() {
        predicates.insert(clause.head.pred.clone());
        for lit in &clause.body {
            predicates.insert(lit.pred.clone());
            if !lit.positive && lit.pred == clause.head.pred {
                errors.push(Diagnostic::new(
                    "E-STRATIFY",
                    format!("self-negation detected on predicate {}", lit.pred),
                    None,
                ));
            }
            dependencies.push((clause.head.pred.clone(), lit.pred.clone(), !lit.positive));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let n = predicates.len().max(1);
    let mut strata: Strata = predicates.iter().map(|p| (p.clone(), 0usize)).collect();

    for _ in 0..(n * n + 1) {
        let mut changed = false;
        for (head, dep, is_neg) in &dependencies {
            let sh = *strata.get(head).unwrap_or(&0);
            let sd = *strata.get(dep).unwrap_or(&0);
            let required = if *is_neg { sd + 1 } else { sd };
            if sh < required {
                strata.insert(head.clone(), required);
                if required > n {
                    errors.push(Diagnostic::new(
                        "E-STRATIFY",
                        format!("negative dependency cycle through predicate {head}"),
                        None,
                    ));
                    return Err(errors);
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (head, dep, is_neg) in &dependencies {
        let sh = *strata.get(head).unwrap_or(&0);
        let sd = *strata.get(dep).unwrap_or(&0);
        if (!is_neg && sh < sd) || (*is_neg && sh <= sd) {
            errors.push(Diagnostic::new(
                "E-STRATIFY",
                format!(
                    "stratification constraint violated: {} {} {}",
                    head,
                    if *is_neg { ">" } else { ">=" },
                    dep
                ),
                None,
            ));
        }
    }

    if errors.is_empty() {
        Ok(strata)
    } else {
        Err(errors)
    }
}
