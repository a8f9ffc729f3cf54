use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::domain::{Credentials, JobStatus, TaskId};
use crate::error::GnpsError;

pub const BASE_URL: &str = "https://gnps.ucsd.edu";

/// Fixed delay between status queries.
pub const POLL_BACKOFF: Duration = Duration::from_secs(1);

/// Seam over the ProteoSAFe HTTP surface: session login + job submission,
/// status queries, and result download.
pub trait GnpsClient: Send + Sync {
    /// Authenticates and submits a job. Returns the tentative task id, or
    /// `None` when the response text cannot possibly be one (the service
    /// reports submission errors as free-form HTML in the same field).
    fn invoke(
        &self,
        parameters: &[(String, String)],
        credentials: &Credentials,
    ) -> Result<Option<String>, GnpsError>;

    fn job_status(&self, task: &TaskId) -> Result<JobStatus, GnpsError>;

    fn download_buckettable(&self, task: &TaskId, destination: &Path) -> Result<(), GnpsError>;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Clone)]
pub struct GnpsHttpClient {
    client: Client,
    base_url: String,
}

impl GnpsHttpClient {
    pub fn new() -> Result<Self, GnpsError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, GnpsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("gnps-ingest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| GnpsError::Http(err.to_string()))?,
        );

        // Cookie store carries the login session into the submission call.
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| GnpsError::Http(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, GnpsError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "GNPS request failed".to_string());
            return Err(GnpsError::HttpStatus { status, message });
        }
        Ok(response)
    }
}

impl GnpsClient for GnpsHttpClient {
    fn invoke(
        &self,
        parameters: &[(String, String)],
        credentials: &Credentials,
    ) -> Result<Option<String>, GnpsError> {
        let login_url = format!("{}/ProteoSAFe/user/login.jsp", self.base_url);
        let login_form = [
            ("user", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("login", "Sign in"),
        ];
        let response = self
            .client
            .post(&login_url)
            .form(&login_form)
            .send()
            .map_err(|err| GnpsError::Http(err.to_string()))?;
        Self::check_status(response)?;

        let invoke_url = format!("{}/ProteoSAFe/InvokeTools", self.base_url);
        let response = self
            .client
            .post(&invoke_url)
            .form(parameters)
            .send()
            .map_err(|err| GnpsError::Http(err.to_string()))?;
        let text = Self::check_status(response)?
            .text()
            .map_err(|err| GnpsError::Http(err.to_string()))?;

        debug!(response = %text, "InvokeTools response");
        Ok(accept_tentative_handle(text))
    }

    fn job_status(&self, task: &TaskId) -> Result<JobStatus, GnpsError> {
        let url = format!(
            "{}/ProteoSAFe/status_json.jsp?task={}",
            self.base_url,
            task.as_str()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| GnpsError::Http(err.to_string()))?;
        let parsed: StatusResponse = Self::check_status(response)?
            .json()
            .map_err(|err| GnpsError::Http(err.to_string()))?;
        Ok(JobStatus::parse(&parsed.status))
    }

    fn download_buckettable(&self, task: &TaskId, destination: &Path) -> Result<(), GnpsError> {
        let url = format!(
            "{}/ProteoSAFe/DownloadResultFile?task={}&block=main&file=cluster_buckets/",
            self.base_url,
            task.as_str()
        );
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| GnpsError::Http(err.to_string()))?;
        let mut response = Self::check_status(response)?;
        let mut file = File::create(destination)
            .map_err(|err| GnpsError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| GnpsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Tentative-handle validation: the submission endpoint returns either a
/// task id or an HTML error page in the same text field. Only lengths in
/// 4..=60 are plausible ids; everything else means no task was created.
pub fn accept_tentative_handle(text: String) -> Option<String> {
    if (4..=60).contains(&text.len()) {
        Some(text)
    } else {
        None
    }
}

/// Blocks until the task reaches a terminal status, querying once per
/// backoff interval without bound. Transient query failures are retried,
/// never surfaced. The caller owns the overall timeout via `cancel`, which
/// interrupts both the query gaps and any in-progress backoff sleep.
pub fn wait_for_completion<G: GnpsClient + ?Sized>(
    client: &G,
    task: &TaskId,
    cancel: &CancelToken,
) -> Result<JobStatus, GnpsError> {
    wait_for_completion_with(client, task, cancel, POLL_BACKOFF)
}

pub fn wait_for_completion_with<G: GnpsClient + ?Sized>(
    client: &G,
    task: &TaskId,
    cancel: &CancelToken,
    backoff: Duration,
) -> Result<JobStatus, GnpsError> {
    loop {
        if cancel.is_cancelled() {
            return Err(GnpsError::Cancelled {
                task: task.to_string(),
            });
        }

        match client.job_status(task) {
            Ok(status) if status.is_success() => {
                info!(task = %task, "GNPS job finished");
                return Ok(status);
            }
            Ok(JobStatus::Failed) | Ok(JobStatus::Suspended) => {
                return Err(GnpsError::JobFailed {
                    task: task.to_string(),
                });
            }
            Ok(status) => {
                debug!(task = %task, %status, "job still in progress");
            }
            Err(err) => {
                debug!(task = %task, error = %err, "transient status query failure, retrying");
            }
        }

        if cancel.wait_timeout(backoff) {
            return Err(GnpsError::Cancelled {
                task: task.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tentative_handle_window() {
        assert_eq!(accept_tentative_handle("abc".to_string()), None);
        assert_eq!(
            accept_tentative_handle("abcd".to_string()),
            Some("abcd".to_string())
        );
        let sixty = "x".repeat(60);
        assert_eq!(accept_tentative_handle(sixty.clone()), Some(sixty));
        assert_eq!(accept_tentative_handle("x".repeat(61)), None);
        assert_eq!(accept_tentative_handle(String::new()), None);
    }
}
