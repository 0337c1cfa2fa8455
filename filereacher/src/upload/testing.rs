use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use bytes::Bytes;
use filereacher_core::path;
use filereacher_core::{FileReacherError, PathToken, SessionToken, UploadSession};
use reqwest::StatusCode;

use super::progress::ProgressReporter;
use super::task::UploadApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start { path: String, size: u64 },
    Chunk { path: String, offset: u64, len: usize },
    Complete { path: String },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    sessions: HashMap<String, String>,
    received: HashMap<String, Vec<u8>>,
    next_cookie: u64,
    fail_start: HashSet<String>,
    fail_chunk: HashSet<(String, u64)>,
}

/// Upload server double keyed by the joined destination path.
#[derive(Default)]
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

fn refused(message: &str) -> FileReacherError {
    FileReacherError::Api {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.to_string(),
    }
}

impl FakeApi {
    pub(crate) fn fail_start(&self, path: &str) {
        self.state.lock().unwrap().fail_start.insert(path.to_string());
    }

    pub(crate) fn fail_chunk(&self, path: &str, offset: u64) {
        self.state
            .lock()
            .unwrap()
            .fail_chunk
            .insert((path.to_string(), offset));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn received(&self, path: &str) -> Vec<u8> {
        self.state
            .lock()
            .unwrap()
            .received
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

impl UploadApi for FakeApi {
    async fn start_upload(
        &self,
        token: &PathToken,
        size: u64,
    ) -> Result<UploadSession, FileReacherError> {
        tokio::task::yield_now().await;
        let path = path::decode(token)?.joined();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Start {
            path: path.clone(),
            size,
        });
        if state.fail_start.contains(&path) {
            return Err(refused("start refused"));
        }
        state.next_cookie += 1;
        let cookie = state.next_cookie.to_string();
        state.sessions.insert(cookie.clone(), path);
        Ok(UploadSession {
            cookie: SessionToken::new(cookie),
        })
    }

    async fn upload_chunk(
        &self,
        cookie: &SessionToken,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), FileReacherError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let path = state
            .sessions
            .get(cookie.as_str())
            .cloned()
            .ok_or_else(|| refused("unknown cookie"))?;
        state.calls.push(Call::Chunk {
            path: path.clone(),
            offset,
            len: chunk.len(),
        });
        if state.fail_chunk.contains(&(path.clone(), offset)) {
            return Err(refused("chunk refused"));
        }
        state.received.entry(path).or_default().extend_from_slice(&chunk);
        Ok(())
    }

    async fn complete_upload(&self, cookie: &SessionToken) -> Result<(), FileReacherError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let path = state
            .sessions
            .remove(cookie.as_str())
            .ok_or_else(|| refused("unknown cookie"))?;
        state.calls.push(Call::Complete { path });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Report {
    Show(String),
    Progress(f64),
    Pending(usize),
    Hide,
}

#[derive(Default)]
pub(crate) struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub(crate) fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub(crate) fn progress(&self) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter_map(|report| match report {
                Report::Progress(value) => Some(format!("{value:.2}")),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn show(&self, name: &str) {
        self.reports.lock().unwrap().push(Report::Show(name.to_string()));
    }

    fn set_progress(&self, percentage: f64) {
        self.reports.lock().unwrap().push(Report::Progress(percentage));
    }

    fn set_pending_count(&self, count: usize) {
        self.reports.lock().unwrap().push(Report::Pending(count));
    }

    fn hide(&self) {
        self.reports.lock().unwrap().push(Report::Hide);
    }
}

pub(crate) fn destination(name: &str) -> PathToken {
    path::encode_with_name(&filereacher_core::RemotePath::root(), name).unwrap()
}
