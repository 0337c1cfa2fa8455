use bytes::Bytes;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use crate::path::{PathError, PathToken};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5210/";
const GENERIC_FAILURE: &str = "API call failed";

#[derive(Debug, Error)]
pub enum FileReacherError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Api,
    Decoding,
}

impl FileReacherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileReacherError::Request(err) if err.is_decode() => ErrorKind::Api,
            FileReacherError::Request(_) | FileReacherError::Url(_) => ErrorKind::Transport,
            FileReacherError::Api { .. } | FileReacherError::MalformedBody(_) => ErrorKind::Api,
            FileReacherError::Path(_) => ErrorKind::Decoding,
        }
    }
}

#[derive(Clone)]
pub struct FileReacherClient {
    http: Client,
    base_url: Url,
}

impl FileReacherClient {
    pub fn new() -> Result<Self, FileReacherError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, FileReacherError> {
        let mut base_url = Url::parse(base_url)?;
        // Endpoints are relative; without the slash `join` would drop the last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn info(&self) -> Result<StoreInfo, FileReacherError> {
        let url = self.endpoint("info")?;
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    pub async fn list(&self, path: &PathToken) -> Result<DirectoryListing, FileReacherError> {
        let mut url = self.endpoint("list")?;
        url.query_pairs_mut().append_pair("path", path.as_str());
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    pub fn download_url(&self, path: &PathToken) -> Result<Url, FileReacherError> {
        let mut url = self.endpoint("download")?;
        url.query_pairs_mut().append_pair("path", path.as_str());
        Ok(url)
    }

    /// Starts a download and returns the response once the server has
    /// accepted it, leaving the body unread for streaming.
    pub async fn download(&self, path: &PathToken) -> Result<Response, FileReacherError> {
        let url = self.download_url(path)?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::OK {
            return Ok(response);
        }
        Err(Self::failure(response).await)
    }

    pub async fn mkdir(&self, path: &PathToken) -> Result<(), FileReacherError> {
        self.path_call(Method::POST, "mkdir", path).await
    }

    pub async fn rename(&self, path: &PathToken, to: &PathToken) -> Result<(), FileReacherError> {
        let mut url = self.endpoint("rename")?;
        url.query_pairs_mut()
            .append_pair("path", path.as_str())
            .append_pair("to", to.as_str());
        let response = self.http.put(url).send().await?;
        Self::handle_response::<IgnoredAny>(response).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &PathToken) -> Result<(), FileReacherError> {
        self.path_call(Method::DELETE, "delete", path).await
    }

    pub async fn rmdir(&self, path: &PathToken) -> Result<(), FileReacherError> {
        self.path_call(Method::DELETE, "rmdir", path).await
    }

    pub async fn start_upload(
        &self,
        path: &PathToken,
        size: u64,
    ) -> Result<UploadSession, FileReacherError> {
        let mut url = self.endpoint("upload")?;
        url.query_pairs_mut()
            .append_pair("path", path.as_str())
            .append_pair("size", &size.to_string());
        let response = self.http.post(url).send().await?;
        Self::handle_response(response).await
    }

    pub async fn upload_chunk(
        &self,
        cookie: &SessionToken,
        offset: u64,
        chunk: Bytes,
    ) -> Result<(), FileReacherError> {
        let mut url = self.endpoint("upload")?;
        url.query_pairs_mut()
            .append_pair("cookie", cookie.as_str())
            .append_pair("offset", &offset.to_string());
        let response = self.http.patch(url).body(chunk).send().await?;
        Self::handle_response::<IgnoredAny>(response).await?;
        Ok(())
    }

    pub async fn complete_upload(&self, cookie: &SessionToken) -> Result<(), FileReacherError> {
        let mut url = self.endpoint("upload")?;
        url.query_pairs_mut().append_pair("cookie", cookie.as_str());
        let response = self.http.put(url).send().await?;
        Self::handle_response::<IgnoredAny>(response).await?;
        Ok(())
    }

    async fn path_call(
        &self,
        method: Method,
        endpoint: &str,
        path: &PathToken,
    ) -> Result<(), FileReacherError> {
        let mut url = self.endpoint(endpoint)?;
        url.query_pairs_mut().append_pair("path", path.as_str());
        let response = self.http.request(method, url).send().await?;
        Self::handle_response::<IgnoredAny>(response).await?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, FileReacherError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, FileReacherError> {
        let status = response.status();
        let body = response.text().await?;
        let value = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => value,
            Err(_) if status != StatusCode::OK => {
                return Err(FileReacherError::Api {
                    status,
                    message: GENERIC_FAILURE.to_string(),
                });
            }
            Err(err) => return Err(FileReacherError::MalformedBody(err)),
        };
        if let Some(message) = error_message(&value) {
            return Err(FileReacherError::Api { status, message });
        }
        if status != StatusCode::OK {
            return Err(FileReacherError::Api {
                status,
                message: GENERIC_FAILURE.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn failure(response: Response) -> FileReacherError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| error_message(&value))
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        FileReacherError::Api { status, message }
    }
}

// A null or empty `error` field does not signal a failure.
fn error_message(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(false) => None,
        serde_json::Value::String(text) if text.is_empty() => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DirectoryListing {
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub mtime: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UploadSession {
    pub cookie: SessionToken,
}

/// Server-issued identifier tying chunk and completion requests to one upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SessionToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(value) => SessionToken(value.to_string()),
            Raw::Text(value) => SessionToken(value),
        })
    }
}
