use anyhow::{Context, Result};
use clap::Parser;
use inference_core::{
    accuracy_score, classification_report, save_metrics, save_model, ClassificationReport, Dataset,
    Hyperparameters, RandomForestClassifier, TrainingMetrics, METRICS_FILE_NAME, MODEL_FILE_NAME,
};
use shared::{upload_file, ObjectStorageRepository, S3Uri};
use std::path::{Path, PathBuf};
use tracing::info;

pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";

/// Training job arguments. Directory flags default to the SageMaker
/// container environment, then to the standard `/opt/ml` layout.
#[derive(Debug, Clone, Parser)]
#[command(name = "train", about = "Train a random forest classifier from SageMaker data channels")]
pub struct TrainArgs {
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 42)]
    pub random_state: u64,

    #[arg(long, env = "SM_MODEL_DIR", default_value = "/opt/ml/model")]
    pub model_dir: PathBuf,

    /// Directory holding train.csv
    #[arg(long, env = "SM_CHANNEL_TRAIN", default_value = "/opt/ml/input/data/train")]
    pub train: PathBuf,

    /// Directory holding test.csv
    #[arg(long, env = "SM_CHANNEL_TEST", default_value = "/opt/ml/input/data/test")]
    pub test: PathBuf,

    #[arg(long, env = "SM_OUTPUT_DATA_DIR", default_value = "/opt/ml/output")]
    pub output_data_dir: PathBuf,

    /// Also upload model.json and metrics.json under this s3:// prefix
    #[arg(long, env = "MODEL_UPLOAD_URI")]
    pub upload_to: Option<S3Uri>,

    /// Write a synthetic 1000x20 dataset into the train and test channels first
    #[arg(long)]
    pub generate_sample_data: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl TrainArgs {
    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            random_state: self.random_state,
            ..Hyperparameters::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    pub metrics: TrainingMetrics,
    pub report: ClassificationReport,
}

/// Generate sample data and write it as headerless CSV into both channels
pub fn prepare_sample_data(train_dir: &Path, test_dir: &Path, seed: u64) -> Result<(PathBuf, PathBuf)> {
    let dataset = Dataset::make_classification(1000, 20, 15, 5, seed);
    let (train, test) = dataset.train_test_split(0.2, seed)?;

    let train_path = train_dir.join(TRAIN_FILE_NAME);
    let test_path = test_dir.join(TEST_FILE_NAME);
    train.write_csv_path(&train_path)?;
    test.write_csv_path(&test_path)?;

    info!("Training data saved to: {}", train_path.display());
    info!("Test data saved to: {}", test_path.display());
    Ok((train_path, test_path))
}

pub fn load_data(train_dir: &Path, test_dir: &Path) -> Result<(Dataset, Dataset)> {
    let train = Dataset::from_csv_path(&train_dir.join(TRAIN_FILE_NAME))?;
    let test = Dataset::from_csv_path(&test_dir.join(TEST_FILE_NAME))?;

    info!("Train data shape: ({}, {})", train.len(), train.n_features() + 1);
    info!("Test data shape: ({}, {})", test.len(), test.n_features() + 1);

    if train.n_features() != test.n_features() {
        anyhow::bail!(
            "train data has {} features but test data has {}",
            train.n_features(),
            test.n_features()
        );
    }
    Ok((train, test))
}

/// Load the channels, fit, evaluate, then write metrics and the model artifact
pub fn train_model(args: &TrainArgs) -> Result<TrainingOutcome> {
    info!("Loading data...");
    let (train, test) = load_data(&args.train, &args.test)?;

    info!("Training model...");
    let model = RandomForestClassifier::fit(&train, &args.hyperparameters()).context("fitting model")?;

    let train_predictions = model.predict_batch(&train.features)?;
    let test_predictions = model.predict_batch(&test.features)?;

    let metrics = TrainingMetrics {
        train_accuracy: accuracy_score(&train.targets, &train_predictions)?,
        test_accuracy: accuracy_score(&test.targets, &test_predictions)?,
    };
    info!("Training Accuracy: {:.4}", metrics.train_accuracy);
    info!("Test Accuracy: {:.4}", metrics.test_accuracy);

    let report = classification_report(&test.targets, &test_predictions)?;
    info!("Classification Report:\n{}", report);

    let metrics_path = save_metrics(&metrics, &args.output_data_dir)?;
    let model_path = save_model(&model, &args.model_dir)?;

    Ok(TrainingOutcome {
        model_path,
        metrics_path,
        metrics,
        report,
    })
}

/// Upload the model artifact and metrics under `destination`
pub async fn upload_artifacts(
    repository: &dyn ObjectStorageRepository,
    outcome: &TrainingOutcome,
    destination: &S3Uri,
) -> Result<Vec<S3Uri>> {
    let mut uploaded = Vec::new();
    for (path, name) in [
        (&outcome.model_path, MODEL_FILE_NAME),
        (&outcome.metrics_path, METRICS_FILE_NAME),
    ] {
        let target = destination.join(name);
        upload_file(repository, path, &target, "application/json").await?;
        uploaded.push(target);
    }
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MockObjectStorageRepository;

    fn args_for(root: &Path) -> TrainArgs {
        TrainArgs::try_parse_from([
            "train",
            "--n-estimators",
            "15",
            "--max-depth",
            "6",
            "--model-dir",
            root.join("model").to_str().unwrap(),
            "--train",
            root.join("input/train").to_str().unwrap(),
            "--test",
            root.join("input/test").to_str().unwrap(),
            "--output-data-dir",
            root.join("output").to_str().unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_args() {
        let args = TrainArgs::try_parse_from([
            "train",
            "--n-estimators",
            "5",
            "--random-state",
            "7",
            "--upload-to",
            "s3://artifacts/runs/1",
            "--generate-sample-data",
        ])
        .unwrap();

        assert_eq!(args.n_estimators, 5);
        assert_eq!(args.max_depth, 10);
        assert_eq!(args.random_state, 7);
        assert!(args.generate_sample_data);
        assert_eq!(args.upload_to, Some(S3Uri::new("artifacts", "runs/1")));

        let params = args.hyperparameters();
        assert_eq!(params.n_estimators, 5);
        assert_eq!(params.min_samples_split, 2);
    }

    #[test]
    fn test_parse_rejects_bad_upload_uri() {
        assert!(TrainArgs::try_parse_from(["train", "--upload-to", "/tmp/out"]).is_err());
        assert!(TrainArgs::try_parse_from(["train", "--n-estimators", "many"]).is_err());
    }

    #[test]
    fn test_prepare_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        let (train_path, test_path) =
            prepare_sample_data(&dir.path().join("train"), &dir.path().join("test"), 42).unwrap();

        let train = Dataset::from_csv_path(&train_path).unwrap();
        let test = Dataset::from_csv_path(&test_path).unwrap();
        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);
        assert_eq!(train.n_features(), 20);
    }

    #[test]
    fn test_train_model_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(dir.path());
        prepare_sample_data(&args.train, &args.test, 42).unwrap();

        let outcome = train_model(&args).unwrap();

        assert_eq!(outcome.model_path, dir.path().join("model").join(MODEL_FILE_NAME));
        assert!(outcome.model_path.exists());
        assert!(outcome.metrics.train_accuracy > 0.9, "{:?}", outcome.metrics);
        assert!(outcome.metrics.test_accuracy > 0.8, "{:?}", outcome.metrics);
        assert_eq!(outcome.report.support, 200);

        let written: TrainingMetrics =
            serde_json::from_slice(&std::fs::read(&outcome.metrics_path).unwrap()).unwrap();
        assert_eq!(written, outcome.metrics);

        let model = inference_core::load_model(&outcome.model_path).unwrap();
        assert_eq!(model.hyperparameters().n_estimators, 15);
    }

    #[test]
    fn test_train_model_missing_channel() {
        let dir = tempfile::tempdir().unwrap();
        let err = train_model(&args_for(dir.path())).unwrap_err();
        assert!(format!("{:#}", err).contains(TRAIN_FILE_NAME), "{:#}", err);
    }

    #[test]
    fn test_load_data_rejects_mismatched_channels() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TRAIN_FILE_NAME), "1,2,0\n3,4,1\n").unwrap();
        std::fs::write(dir.path().join(TEST_FILE_NAME), "1,0\n").unwrap();

        assert!(load_data(dir.path(), dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_upload_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join(MODEL_FILE_NAME);
        let metrics_path = dir.path().join(METRICS_FILE_NAME);
        std::fs::write(&model_path, b"{}").unwrap();
        std::fs::write(&metrics_path, b"{}").unwrap();

        let outcome = TrainingOutcome {
            model_path,
            metrics_path,
            metrics: TrainingMetrics {
                train_accuracy: 1.0,
                test_accuracy: 1.0,
            },
            report: classification_report(&[0, 1], &[0, 1]).unwrap(),
        };

        let mut mock = MockObjectStorageRepository::new();
        mock.expect_put_object()
            .withf(|req| req.bucket == "artifacts" && req.key == "runs/1/model.json")
            .times(1)
            .returning(|_| Ok("etag-model".to_string()));
        mock.expect_put_object()
            .withf(|req| req.bucket == "artifacts" && req.key == "runs/1/metrics.json")
            .times(1)
            .returning(|_| Ok("etag-metrics".to_string()));

        let destination = S3Uri::new("artifacts", "runs/1/");
        let uploaded = upload_artifacts(&mock, &outcome, &destination).await.unwrap();
        assert_eq!(uploaded.len(), 2);
        assert_eq!(uploaded[0].to_string(), "s3://artifacts/runs/1/model.json");
    }
}
