use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::registry::ArtifactManifest;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// One execution of a pipeline step, with enough logged state to reproduce
/// it: parameters, the exact artifact versions consumed, and what was
/// published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub job_type: String,
    pub git_commit_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub parameters: Value,
    pub used_artifacts: Vec<String>,
    pub logged_artifacts: Vec<String>,
    pub summary: Option<Value>,
    pub error: Option<String>,
}

impl RunRecord {
    pub fn start(job_type: impl Into<String>, parameters: Value) -> Self {
        let git_commit_hash =
            std::env::var("NYCSTAYS_GIT_COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string());

        RunRecord {
            run_id: Uuid::new_v4(),
            job_type: job_type.into(),
            git_commit_hash,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            parameters,
            used_artifacts: Vec::new(),
            logged_artifacts: Vec::new(),
            summary: None,
            error: None,
        }
    }

    /// Record that an exact artifact version was consumed by this run.
    pub fn use_artifact(&mut self, reference: impl Into<String>) {
        self.used_artifacts.push(reference.into());
    }

    /// Record an artifact version published by this run.
    pub fn log_artifact(&mut self, manifest: &ArtifactManifest) {
        self.logged_artifacts.push(manifest.reference());
    }

    pub fn finish_success(&mut self, summary: Value) {
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Success;
        self.summary = Some(summary);
    }

    pub fn finish_failed(&mut self, error: impl Into<String>) {
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
    }
}
