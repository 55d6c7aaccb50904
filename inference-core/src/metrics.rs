use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;

pub fn accuracy_score(truth: &[i64], predicted: &[i64]) -> Result<f64> {
    check_lengths(truth, predicted)?;
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / truth.len() as f64)
}

fn check_lengths(truth: &[i64], predicted: &[i64]) -> Result<()> {
    if truth.len() != predicted.len() {
        bail!("{} labels but {} predictions", truth.len(), predicted.len());
    }
    if truth.is_empty() {
        bail!("no labels to score");
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub weighted_f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class precision, recall and F1 over every label seen in either input
pub fn classification_report(truth: &[i64], predicted: &[i64]) -> Result<ClassificationReport> {
    check_lengths(truth, predicted)?;

    let mut labels: Vec<i64> = truth.iter().chain(predicted).copied().collect();
    labels.sort_unstable();
    labels.dedup();

    let classes: Vec<ClassMetrics> = labels
        .iter()
        .map(|&class| {
            let tp = truth.iter().zip(predicted).filter(|(t, p)| **t == class && **p == class).count();
            let predicted_pos = predicted.iter().filter(|&&p| p == class).count();
            let support = truth.iter().filter(|&&t| t == class).count();

            let precision = ratio(tp, predicted_pos);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };

            ClassMetrics {
                class,
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect();

    let total = truth.len();
    let macro_f1 = classes.iter().map(|c| c.f1_score).sum::<f64>() / classes.len() as f64;
    let weighted_f1 = classes.iter().map(|c| c.f1_score * c.support as f64).sum::<f64>() / total as f64;

    Ok(ClassificationReport {
        classes,
        accuracy: accuracy_score(truth, predicted)?,
        macro_f1,
        weighted_f1,
        support: total,
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>10} {:>10} {:>10} {:>10}", "class", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.class, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>10} {:>10} {:>10.2} {:>10}", "accuracy", "", "", self.accuracy, self.support)?;
        writeln!(f, "{:>12} {:>10} {:>10} {:>10.2} {:>10}", "macro avg", "", "", self.macro_f1, self.support)?;
        write!(f, "{:>12} {:>10} {:>10} {:>10.2} {:>10}", "weighted avg", "", "", self.weighted_f1, self.support)
    }
}
