use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GnpsError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("failed to read manifest at {0}")]
    ManifestRead(PathBuf),

    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("failed to read credentials file at {0}")]
    CredentialsRead(PathBuf),

    #[error("failed to parse credentials JSON: {0}")]
    CredentialsParse(String),

    #[error("task creation at GNPS failed: no task id returned")]
    TaskNotCreated,

    #[error("task creation at GNPS failed with response: {0}")]
    SubmissionRejected(String),

    #[error("invalid task id: {0}")]
    InvalidTaskId(String),

    #[error("GNPS job failed: {task}")]
    JobFailed { task: String },

    #[error("ingestion cancelled while waiting for task {task}")]
    Cancelled { task: String },

    #[error("required column missing: {0}")]
    MissingColumn(String),

    #[error("malformed row: {0}")]
    MalformedRow(String),

    #[error("sample label not present in manifest: {0}")]
    UnknownSampleLabel(String),

    #[error("GNPS request failed: {0}")]
    Http(String),

    #[error("GNPS returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("FTP transfer failed: {0}")]
    Ftp(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
