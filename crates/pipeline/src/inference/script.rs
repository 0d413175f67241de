//! Detection model served by a long-lived Python process.
//!
//! The process is started once per worker with the model weights loaded and
//! then answers one JSON request per line on stdin with one JSON response
//! per line on stdout:
//!
//! ```text
//! <- {"ready": true}
//! -> {"image": "/abs/path/frame.jpg"}
//! <- {"detections": [{"classId": 2, "label": "oocyte", "score": 0.98, "bbox": [x1, y1, x2, y2]}]}
//! <- {"error": "could not read image", "kind": "imageUnreadable"}
//! ```
//!
//! The child is spawned with `kill_on_drop(true)` so dropping the model
//! (worker recycle, shutdown) terminates the process.
//!
//! Replies carry no request id, so the stream is only trusted while every
//! request has had exactly one reply read. A timeout, a broken pipe or an
//! exited process ends the session: the child is killed and every later
//! call fails with [`InferenceError::ModelUnavailable`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eggbank_core::detection::{BoundingBox, Detection, DetectionClass};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::{DetectionModel, InferenceError, ModelLoader};
use crate::config::PipelineConfig;

/// Maximum time the model process may take to report readiness.
const LOAD_TIMEOUT: Duration = Duration::from_secs(180);

/// Loader that spawns the model server script.
#[derive(Debug, Clone)]
pub struct ScriptModelLoader {
    python: String,
    script: PathBuf,
    weights: PathBuf,
    device: String,
    confidence_threshold: f64,
    request_timeout: Duration,
}

impl ScriptModelLoader {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            python: config.python.clone(),
            script: config.script.clone(),
            weights: config.model_path.clone(),
            device: config.device.clone(),
            confidence_threshold: config.confidence_threshold,
            request_timeout: config.request_timeout,
        }
    }
}

#[async_trait]
impl ModelLoader for ScriptModelLoader {
    async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError> {
        for (what, path) in [("model weights", &self.weights), ("model script", &self.script)] {
            let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
            if !exists {
                return Err(InferenceError::ModelUnavailable(format!(
                    "{what} not found: {}",
                    path.display()
                )));
            }
        }

        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script)
            .arg("--weights")
            .arg(&self.weights)
            .arg("--device")
            .arg(&self.device)
            .arg("--threshold")
            .arg(self.confidence_threshold.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            InferenceError::ModelUnavailable(format!("failed to start {}: {e}", self.python))
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(InferenceError::ModelUnavailable(
                "model process has no stdio pipes".into(),
            ));
        };
        let mut session = Session {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let line = tokio::time::timeout(LOAD_TIMEOUT, session.read_line())
            .await
            .map_err(|_| InferenceError::ModelUnavailable("model load timed out".into()))?
            .map_err(InferenceError::ModelUnavailable)?;
        let ready =
            parse_response(&line).map_err(|e| InferenceError::ModelUnavailable(e.to_string()))?;

        match ready {
            Response::Ready { ready: true } => {}
            Response::Error { error, .. } => return Err(InferenceError::ModelUnavailable(error)),
            other => {
                return Err(InferenceError::ModelUnavailable(format!(
                    "unexpected handshake: {other:?}"
                )))
            }
        }

        tracing::info!(
            weights = %self.weights.display(),
            device = %self.device,
            "Detection model process ready",
        );
        Ok(Arc::new(ScriptModel {
            session: Mutex::new(Some(session)),
            request_timeout: self.request_timeout,
        }))
    }
}

/// Running model process. Requests are serialized through the mutex; the
/// session is `None` once the process has been shut down.
pub struct ScriptModel {
    session: Mutex<Option<Session>>,
    request_timeout: Duration,
}

struct Session {
    _child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Session {
    /// Next reply line. Errors mean the process is gone.
    async fn read_line(&mut self) -> Result<String, String> {
        self.stdout
            .next_line()
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "model process exited".to_string())
    }

    async fn send(&mut self, request: &Request<'_>) -> Result<(), String> {
        let mut line = serde_json::to_vec(request).map_err(|e| e.to_string())?;
        line.push(b'\n');
        self.stdin.write_all(&line).await.map_err(|e| e.to_string())?;
        self.stdin.flush().await.map_err(|e| e.to_string())
    }

    /// One request and its reply line.
    async fn exchange(&mut self, request: &Request<'_>) -> Result<String, String> {
        self.send(request).await?;
        self.read_line().await
    }
}

fn parse_response(line: &str) -> Result<Response, InferenceError> {
    serde_json::from_str(line)
        .map_err(|e| InferenceError::Backend(format!("invalid model response: {e}")))
}

#[derive(Serialize)]
struct Request<'a> {
    image: &'a Path,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Response {
    Detections { detections: Vec<RawDetection> },
    Error {
        error: String,
        #[serde(default)]
        kind: Option<String>,
    },
    Ready { ready: bool },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetection {
    #[serde(default)]
    class_id: Option<usize>,
    #[serde(default)]
    label: Option<String>,
    score: f64,
    bbox: [f64; 4],
}

impl RawDetection {
    fn normalize(self) -> Detection {
        let class = match (&self.label, self.class_id) {
            (Some(label), _) => DetectionClass::from_model_label(label),
            (None, Some(id)) => DetectionClass::from_class_id(id),
            (None, None) => DetectionClass::Unknown,
        };
        let [x1, y1, x2, y2] = self.bbox;
        Detection {
            class,
            confidence: self.score,
            bbox: BoundingBox { x1, y1, x2, y2 },
        }
    }
}

#[async_trait]
impl DetectionModel for ScriptModel {
    async fn detect(&self, image: &Path) -> Result<Vec<Detection>, InferenceError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(InferenceError::ModelUnavailable(
                "model process was shut down after an earlier failure".into(),
            ));
        };

        let reply = match tokio::time::timeout(
            self.request_timeout,
            session.exchange(&Request { image }),
        )
        .await
        {
            Ok(reply) => reply,
            Err(_) => Err(format!(
                "no reply within {}ms",
                self.request_timeout.as_millis()
            )),
        };

        let line = match reply {
            Ok(line) => line,
            Err(reason) => {
                tracing::error!(
                    image = %image.display(),
                    error = %reason,
                    "Model process lost; shutting it down",
                );
                // Dropping the session kills the child along with any reply
                // still in flight.
                *guard = None;
                return Err(InferenceError::ModelUnavailable(format!(
                    "model process lost: {reason}"
                )));
            }
        };
        let response = parse_response(&line)?;

        match response {
            Response::Detections { detections } => {
                Ok(detections.into_iter().map(RawDetection::normalize).collect())
            }
            Response::Error { error, kind } if kind.as_deref() == Some("imageUnreadable") => {
                Err(InferenceError::ImageUnreadable {
                    path: image.to_path_buf(),
                    reason: error,
                })
            }
            Response::Error { error, .. } => Err(InferenceError::Backend(error)),
            Response::Ready { .. } => Err(InferenceError::Backend(
                "unexpected handshake during detection".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
