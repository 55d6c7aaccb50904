use crate::error::InferenceError;
use crate::types::ModelSummary;

/// A trained classifier that scores a single row of features.
///
/// Implementations are immutable once built, so a loaded model can be shared
/// across request handlers without locking.
pub trait Classifier: Send + Sync {
    /// Number of features a row must have
    fn n_features(&self) -> usize;

    /// Class labels, in the order used by `predict_proba`
    fn classes(&self) -> &[i64];

    /// Per-class probabilities for one row
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    fn summary(&self) -> ModelSummary;

    /// Most probable class label for one row
    fn predict(&self, features: &[f64]) -> Result<i64, InferenceError> {
        let probabilities = self.predict_proba(features)?;
        label_for(self.classes(), &probabilities)
    }
}

/// Pick the label with the highest probability; ties go to the first class
pub fn label_for(classes: &[i64], probabilities: &[f64]) -> Result<i64, InferenceError> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((idx, p)),
        }
    }

    best.and_then(|(idx, _)| classes.get(idx).copied())
        .ok_or_else(|| InferenceError::invalid_input("model produced no class probabilities"))
}

/// Shape and value checks shared by every classifier
pub fn check_features(features: &[f64], expected: usize) -> Result<(), InferenceError> {
    if features.len() != expected {
        return Err(InferenceError::invalid_input(format!(
            "X has {} features, but the model is expecting {} features as input",
            features.len(),
            expected
        )));
    }

    if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
        return Err(InferenceError::invalid_input(format!(
            "feature at index {} is not a finite number",
            pos
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_for_picks_highest() {
        assert_eq!(label_for(&[3, 7, 9], &[0.2, 0.5, 0.3]), Ok(7));
    }

    #[test]
    fn test_label_for_ties_go_to_first_class() {
        assert_eq!(label_for(&[0, 1], &[0.5, 0.5]), Ok(0));
    }

    #[test]
    fn test_label_for_empty() {
        assert!(label_for(&[], &[]).is_err());
    }

    #[test]
    fn test_check_features_dimension() {
        assert!(check_features(&[1.0, 2.0], 2).is_ok());

        let err = check_features(&[1.0, 2.0, 3.0], 4).unwrap_err();
        assert_eq!(
            err,
            InferenceError::invalid_input("X has 3 features, but the model is expecting 4 features as input")
        );
    }

    #[test]
    fn test_check_features_non_finite() {
        assert!(matches!(
            check_features(&[1.0, f64::NAN], 2),
            Err(InferenceError::InvalidInput(_))
        ));
        assert!(check_features(&[f64::INFINITY, 0.0], 2).is_err());
    }
}
