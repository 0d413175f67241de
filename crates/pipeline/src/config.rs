use std::path::PathBuf;
use std::time::Duration;

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detection model weights.
    pub model_path: PathBuf,
    /// Version tag stamped on every stored detection result.
    pub model_version: String,
    /// Minimum detection score kept by the model.
    pub confidence_threshold: f64,
    /// Inference device passed to the model process (`cuda` or `cpu`).
    pub device: String,
    /// Python interpreter running the model process.
    pub python: String,
    /// Model server script.
    pub script: PathBuf,
    /// Longest wait for one detection reply before the model process is
    /// considered lost.
    pub request_timeout: Duration,
    /// Root directory of stored frame images.
    pub storage_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model_final.pth"),
            model_version: "v1.0".into(),
            confidence_threshold: 0.5,
            device: "cuda".into(),
            python: "python3".into(),
            script: PathBuf::from("scripts/detect_server.py"),
            request_timeout: Duration::from_secs(120),
            storage_dir: PathBuf::from("./storage"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                     |
    /// |------------------------------|-----------------------------|
    /// | `MODEL_PATH`                 | `models/model_final.pth`    |
    /// | `MODEL_VERSION`              | `v1.0`                      |
    /// | `MODEL_CONFIDENCE_THRESHOLD` | `0.5`                       |
    /// | `MODEL_DEVICE`               | `cuda`                      |
    /// | `INFERENCE_PYTHON`           | `python3`                   |
    /// | `INFERENCE_SCRIPT`           | `scripts/detect_server.py`  |
    /// | `MODEL_REQUEST_TIMEOUT_SECS` | `120`                       |
    /// | `STORAGE_DIR`                | `./storage`                 |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let confidence_threshold: f64 = std::env::var("MODEL_CONFIDENCE_THRESHOLD")
            .map(|v| {
                v.parse()
                    .expect("MODEL_CONFIDENCE_THRESHOLD must be a valid f64")
            })
            .unwrap_or(defaults.confidence_threshold);

        let request_timeout = std::env::var("MODEL_REQUEST_TIMEOUT_SECS")
            .map(|v| {
                Duration::from_secs(
                    v.parse()
                        .expect("MODEL_REQUEST_TIMEOUT_SECS must be a valid u64"),
                )
            })
            .unwrap_or(defaults.request_timeout);

        Self {
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            model_version: std::env::var("MODEL_VERSION").unwrap_or(defaults.model_version),
            confidence_threshold,
            device: std::env::var("MODEL_DEVICE").unwrap_or(defaults.device),
            python: std::env::var("INFERENCE_PYTHON").unwrap_or(defaults.python),
            script: std::env::var("INFERENCE_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.script),
            request_timeout,
            storage_dir: std::env::var("STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
        }
    }
}
