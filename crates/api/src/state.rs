use std::sync::Arc;

use eggbank_db::blob::BlobStore;
use eggbank_db::store::DocumentStore;
use eggbank_pipeline::approval::EligibilityApproval;
use eggbank_pipeline::intake::FrameIntake;
use eggbank_pipeline::orchestrator::EvaluationOrchestrator;
use eggbank_pipeline::queue::TaskQueue;
use eggbank_pipeline::status::StatusReporter;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every service holds its collaborators behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<ServerConfig>,
    pub orchestrator: EvaluationOrchestrator,
    pub reporter: StatusReporter,
    pub approval: EligibilityApproval,
    pub intake: FrameIntake,
}

impl AppState {
    /// Wire the pipeline services over the given collaborators.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn TaskQueue>,
        config: ServerConfig,
    ) -> Self {
        Self {
            orchestrator: EvaluationOrchestrator::new(Arc::clone(&store), queue),
            reporter: StatusReporter::new(Arc::clone(&store)),
            approval: EligibilityApproval::new(Arc::clone(&store)),
            intake: FrameIntake::new(Arc::clone(&store), blobs),
            config: Arc::new(config),
            store,
        }
    }
}
