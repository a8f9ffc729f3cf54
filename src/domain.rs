use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GnpsError;

/// Opaque identifier of a ProteoSAFe task. Genuine task ids are exactly
/// 32 alphanumeric characters; anything else returned by the submission
/// endpoint is an error message in disguise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = GnpsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid =
            trimmed.len() == 32 && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(GnpsError::InvalidTaskId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Job state as reported by the status endpoint. Only DONE, FAILED and
/// SUSPENDED are terminal; everything else means "ask again later".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done,
    Failed,
    Suspended,
    Other(String),
}

impl JobStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "RUNNING" => JobStatus::Running,
            "DONE" => JobStatus::Done,
            "FAILED" => JobStatus::Failed,
            "SUSPENDED" => JobStatus::Suspended,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Done | JobStatus::Failed | JobStatus::Suspended
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Done)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Done => write!(f, "DONE"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Suspended => write!(f, "SUSPENDED"),
            JobStatus::Other(value) => write!(f, "{value}"),
        }
    }
}

/// GNPS account credentials, read once per ingestion from a JSON file.
/// The session built from them is never shared across ingestion calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, GnpsError> {
        let content = fs::read_to_string(path)
            .map_err(|_| GnpsError::CredentialsRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| GnpsError::CredentialsParse(err.to_string()))
    }
}
