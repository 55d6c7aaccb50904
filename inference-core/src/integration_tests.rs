use crate::{
    accuracy_score, classification_report, load_model, save_metrics, save_model, Classifier, Dataset,
    Hyperparameters, InferenceError, InferenceService, InferenceServiceTrait, ModelHolder, ModelStatus,
    PredictionRequest, RandomForestClassifier, TrainingMetrics, METRICS_FILE_NAME,
};

/// Train, persist, load and serve a model end to end
#[tokio::test]
async fn test_train_save_load_predict_workflow() {
    let dir = tempfile::tempdir().unwrap();

    // 1. Sample data, split the way the training job does it
    let dataset = Dataset::make_classification(400, 8, 6, 0, 42);
    let (train, test) = dataset.train_test_split(0.2, 42).unwrap();
    assert_eq!(train.len(), 320);
    assert_eq!(test.len(), 80);

    // 2. Fit and evaluate
    let params = Hyperparameters {
        n_estimators: 30,
        max_depth: 8,
        ..Hyperparameters::default()
    };
    let model = RandomForestClassifier::fit(&train, &params).unwrap();
    let train_predictions = model.predict_batch(&train.features).unwrap();
    let test_predictions = model.predict_batch(&test.features).unwrap();

    let metrics = TrainingMetrics {
        train_accuracy: accuracy_score(&train.targets, &train_predictions).unwrap(),
        test_accuracy: accuracy_score(&test.targets, &test_predictions).unwrap(),
    };
    assert!(metrics.train_accuracy > 0.95, "train accuracy {}", metrics.train_accuracy);
    assert!(metrics.test_accuracy > 0.85, "test accuracy {}", metrics.test_accuracy);

    let report = classification_report(&test.targets, &test_predictions).unwrap();
    assert_eq!(report.classes.len(), 2);
    assert_eq!(report.support, 80);

    // 3. Persist both artifacts
    let model_path = save_model(&model, &dir.path().join("model")).unwrap();
    let metrics_path = save_metrics(&metrics, &dir.path().join("output")).unwrap();
    assert!(metrics_path.ends_with(METRICS_FILE_NAME));

    // 4. Load into a holder and serve
    let holder = ModelHolder::load(&model_path);
    assert_eq!(holder.status(), &ModelStatus::Loaded);
    let service = InferenceService::new(holder);

    for row in test.features.iter().take(25) {
        let response = service
            .predict(PredictionRequest { features: row.clone() })
            .await
            .unwrap();

        assert_eq!(response.probability.len(), 2);
        assert!((response.probability.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        assert_eq!(response.prediction, model.predict(row).unwrap());
    }
}

#[test]
fn test_reloaded_model_matches_fitted_model() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::make_classification(120, 5, 3, 0, 11);
    let model = RandomForestClassifier::fit(&dataset, &Hyperparameters::default()).unwrap();

    let path = save_model(&model, dir.path()).unwrap();
    let loaded = load_model(&path).unwrap();

    for row in &dataset.features {
        assert_eq!(loaded.predict_proba(row).unwrap(), model.predict_proba(row).unwrap());
    }
}

#[tokio::test]
async fn test_service_over_failed_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, br#"{"format_version": 1}"#).unwrap();

    let holder = ModelHolder::load(&path);
    assert!(matches!(holder.status(), ModelStatus::LoadFailed(_)));

    let service = InferenceService::new(holder);
    assert!(!service.is_ready());

    for features in [vec![1.0, 2.0], vec![]] {
        let result = service.predict(PredictionRequest { features }).await;
        assert_eq!(result, Err(InferenceError::ModelNotLoaded));
    }
}
