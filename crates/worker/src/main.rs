use std::sync::Arc;

use eggbank_db::blob::LocalBlobStore;
use eggbank_db::store::PgDocumentStore;
use eggbank_pipeline::batch::BatchProcessor;
use eggbank_pipeline::config::PipelineConfig;
use eggbank_pipeline::frame::FrameProcessor;
use eggbank_pipeline::inference::{InferenceAdapter, ScriptModelLoader};
use eggbank_worker::config::WorkerConfig;
use eggbank_worker::runner::{Worker, WorkerExit};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eggbank_worker=debug,eggbank_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let pipeline_config = PipelineConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    tracing::info!(
        model_path = %pipeline_config.model_path.display(),
        model_version = %pipeline_config.model_version,
        storage_dir = %pipeline_config.storage_dir.display(),
        "Loaded worker configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = eggbank_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    eggbank_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    // --- Pipeline ---
    // The model is loaded on the first frame, not here.
    let store = Arc::new(PgDocumentStore::new(pool.clone()));
    let blobs = Arc::new(LocalBlobStore::new(pipeline_config.storage_dir.clone()));
    let loader = Arc::new(ScriptModelLoader::new(&pipeline_config));
    let inference = Arc::new(InferenceAdapter::new(loader));
    let frames = FrameProcessor::new(store.clone(), inference, pipeline_config.model_version.clone());
    let processor = BatchProcessor::new(store, blobs, frames);

    let worker_id = format!(
        "eggbank-worker-{}-{}",
        std::process::id(),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    );
    let worker = Worker::new(pool, processor, worker_config, worker_id);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    match worker.run(cancel).await {
        WorkerExit::Shutdown => tracing::info!("Graceful shutdown complete"),
        WorkerExit::Recycle => tracing::info!("Task allowance used up; exiting for restart"),
        WorkerExit::Fatal => {
            tracing::error!("Worker cannot continue; exiting");
            std::process::exit(1);
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), stopping worker");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, stopping worker");
        }
    }
}
