use anyhow::Result;
use clap::Parser;
use shared::{parse_log_level, AwsS3Repository, S3Settings};
use tracing::info;
use training::{prepare_sample_data, train_model, upload_artifacts, TrainArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = TrainArgs::parse();

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .init();

    info!("SageMaker Training Job");
    info!(
        "Hyperparameters: n_estimators={}, max_depth={}, random_state={}",
        args.n_estimators, args.max_depth, args.random_state
    );

    if args.generate_sample_data {
        prepare_sample_data(&args.train, &args.test, args.random_state)?;
    }

    let job_args = args.clone();
    let outcome = tokio::task::spawn_blocking(move || train_model(&job_args)).await??;

    if let Some(destination) = &args.upload_to {
        let repository = AwsS3Repository::new(S3Settings::from_env()).await?;
        for uri in upload_artifacts(&repository, &outcome, destination).await? {
            info!("Artifact available at {}", uri);
        }
    }

    info!(
        "Training complete! test_accuracy={:.4}, model at {}",
        outcome.metrics.test_accuracy,
        outcome.model_path.display()
    );

    Ok(())
}
