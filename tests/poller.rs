use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use gnps_ingest::cancel::CancelToken;
use gnps_ingest::domain::{Credentials, JobStatus, TaskId};
use gnps_ingest::error::GnpsError;
use gnps_ingest::gnps::{GnpsClient, wait_for_completion_with};

const TASK: &str = "abcdef0123456789abcdef0123456789";
const FAST: Duration = Duration::from_millis(1);

/// Replays a scripted sequence of status responses and counts queries.
struct ScriptedStatus {
    responses: Mutex<Vec<Result<JobStatus, GnpsError>>>,
    queries: Mutex<usize>,
}

impl ScriptedStatus {
    fn new(responses: Vec<Result<JobStatus, GnpsError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            queries: Mutex::new(0),
        }
    }

    fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

impl GnpsClient for ScriptedStatus {
    fn invoke(
        &self,
        _parameters: &[(String, String)],
        _credentials: &Credentials,
    ) -> Result<Option<String>, GnpsError> {
        panic!("poller must not invoke");
    }

    fn job_status(&self, _task: &TaskId) -> Result<JobStatus, GnpsError> {
        *self.queries.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Past the script, report an endless in-progress job.
            return Ok(JobStatus::Running);
        }
        responses.remove(0)
    }

    fn download_buckettable(&self, _task: &TaskId, _destination: &Path) -> Result<(), GnpsError> {
        panic!("poller must not download");
    }
}

fn task() -> TaskId {
    TASK.parse().unwrap()
}

#[test]
fn polls_until_done_with_exact_query_count() {
    let client = ScriptedStatus::new(vec![
        Ok(JobStatus::Running),
        Ok(JobStatus::Running),
        Ok(JobStatus::Done),
    ]);

    let status = wait_for_completion_with(&client, &task(), &CancelToken::new(), FAST).unwrap();

    assert_eq!(status, JobStatus::Done);
    assert_eq!(client.queries(), 3);
}

#[test]
fn failed_status_stops_polling_immediately() {
    let client = ScriptedStatus::new(vec![Ok(JobStatus::Running), Ok(JobStatus::Failed)]);

    let err =
        wait_for_completion_with(&client, &task(), &CancelToken::new(), FAST).unwrap_err();

    assert_matches!(err, GnpsError::JobFailed { task } if task == TASK);
    assert_eq!(client.queries(), 2);
}

#[test]
fn suspended_is_a_failure_terminal() {
    let client = ScriptedStatus::new(vec![Ok(JobStatus::Suspended)]);

    let err =
        wait_for_completion_with(&client, &task(), &CancelToken::new(), FAST).unwrap_err();

    assert_matches!(err, GnpsError::JobFailed { .. });
    assert_eq!(client.queries(), 1);
}

#[test]
fn transient_query_errors_are_retried_not_surfaced() {
    let client = ScriptedStatus::new(vec![
        Err(GnpsError::Http("connection reset".to_string())),
        Ok(JobStatus::Done),
    ]);

    let status = wait_for_completion_with(&client, &task(), &CancelToken::new(), FAST).unwrap();

    assert_eq!(status, JobStatus::Done);
    assert_eq!(client.queries(), 2);
}

#[test]
fn unknown_statuses_are_non_terminal() {
    let client = ScriptedStatus::new(vec![
        Ok(JobStatus::Other("LAUNCHING".to_string())),
        Ok(JobStatus::Done),
    ]);

    let status = wait_for_completion_with(&client, &task(), &CancelToken::new(), FAST).unwrap();

    assert_eq!(status, JobStatus::Done);
    assert_eq!(client.queries(), 2);
}

#[test]
fn cancellation_interrupts_the_backoff_sleep() {
    let client = ScriptedStatus::new(vec![Ok(JobStatus::Running)]);
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let start = Instant::now();
    let err =
        wait_for_completion_with(&client, &task(), &cancel, Duration::from_secs(60)).unwrap_err();
    handle.join().unwrap();

    assert_matches!(err, GnpsError::Cancelled { task } if task == TASK);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn pre_cancelled_token_skips_all_queries() {
    let client = ScriptedStatus::new(vec![Ok(JobStatus::Done)]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = wait_for_completion_with(&client, &task(), &cancel, FAST).unwrap_err();

    assert_matches!(err, GnpsError::Cancelled { .. });
    assert_eq!(client.queries(), 0);
}
