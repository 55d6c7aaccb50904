use crate::classifier::label_for;
use crate::error::InferenceError;
use crate::holder::ModelHolder;
use crate::types::*;
use tracing::debug;

/// Trait defining the prediction service interface
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait::async_trait]
pub trait InferenceServiceTrait: Send + Sync {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResponse, InferenceError>;
    fn is_ready(&self) -> bool;
    fn model_summary(&self) -> Option<ModelSummary>;
}

/// Prediction service over a model held for the life of the process
pub struct InferenceService {
    holder: ModelHolder,
}

impl InferenceService {
    pub fn new(holder: ModelHolder) -> Self {
        Self { holder }
    }
}

fn validate_request(request: &PredictionRequest) -> Result<(), InferenceError> {
    if request.features.is_empty() {
        return Err(InferenceError::invalid_input("features must not be empty"));
    }
    if let Some(pos) = request.features.iter().position(|v| !v.is_finite()) {
        return Err(InferenceError::invalid_input(format!(
            "feature at index {} is not a finite number",
            pos
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl InferenceServiceTrait for InferenceService {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResponse, InferenceError> {
        // An empty holder wins over bad input
        let model = self.holder.get()?;
        validate_request(&request)?;

        let probability = model.predict_proba(&request.features)?;
        let prediction = label_for(model.classes(), &probability)?;
        debug!("Predicted class {} from {} features", prediction, request.features.len());

        Ok(PredictionResponse::new(prediction, probability))
    }

    fn is_ready(&self) -> bool {
        self.holder.is_loaded()
    }

    fn model_summary(&self) -> Option<ModelSummary> {
        self.holder.get().ok().map(|model| model.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::forest::RandomForestClassifier;

    fn four_feature_service() -> InferenceService {
        let dataset = Dataset::make_classification(200, 4, 4, 0, 42);
        let params = Hyperparameters {
            n_estimators: 20,
            ..Hyperparameters::default()
        };
        let model = RandomForestClassifier::fit(&dataset, &params).unwrap();
        InferenceService::new(ModelHolder::with_model(model))
    }

    #[tokio::test]
    async fn test_predict_four_features() {
        let service = four_feature_service();
        let request = PredictionRequest {
            features: vec![1.0, 2.0, 3.0, 4.0],
        };

        let response = service.predict(request).await.unwrap();
        assert!(response.prediction == 0 || response.prediction == 1);
        assert_eq!(response.probability.len(), 2);
        assert!((response.probability[0] + response.probability[1] - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_prediction_matches_most_probable_class() {
        let service = four_feature_service();
        for features in [vec![-2.0, 1.0, 0.5, -1.0], vec![2.0, -1.0, -0.5, 1.0], vec![0.0; 4]] {
            let response = service.predict(PredictionRequest { features }).await.unwrap();
            let best = if response.probability[1] > response.probability[0] { 1 } else { 0 };
            assert_eq!(response.prediction, best);
        }
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let service = InferenceService::new(ModelHolder::empty());
        assert!(!service.is_ready());
        assert!(service.model_summary().is_none());

        let response = service
            .predict(PredictionRequest {
                features: vec![1.0, 2.0, 3.0, 4.0],
            })
            .await;
        assert_eq!(response, Err(InferenceError::ModelNotLoaded));

        // Even garbage input reports the missing model first
        let response = service.predict(PredictionRequest { features: vec![] }).await;
        assert_eq!(response, Err(InferenceError::ModelNotLoaded));
    }

    #[tokio::test]
    async fn test_predict_bad_input() {
        let service = four_feature_service();

        for features in [vec![], vec![1.0, 2.0, 3.0], vec![1.0; 5], vec![1.0, f64::NAN, 0.0, 0.0]] {
            let result = service.predict(PredictionRequest { features }).await;
            assert!(matches!(result, Err(InferenceError::InvalidInput(_))), "{:?}", result);
        }
    }

    #[tokio::test]
    async fn test_model_summary() {
        let service = four_feature_service();
        assert!(service.is_ready());

        let summary = service.model_summary().unwrap();
        assert_eq!(summary.algorithm, "random_forest");
        assert_eq!(summary.n_features, 4);
        assert_eq!(summary.classes, vec![0, 1]);
        assert!(summary.trained_at.is_some());
    }
}
