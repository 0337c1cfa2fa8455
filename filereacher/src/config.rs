use crate::upload::UploadConfig;
use crate::upload::queue::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5210/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub chunk_size: u64,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank or unusable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = lookup("FILEREACHER_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let chunk_size = read_u64(&lookup, "FILEREACHER_CHUNK_SIZE", DEFAULT_CHUNK_SIZE);
        Self {
            server_url,
            chunk_size,
        }
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            chunk_size: self.chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

fn read_u64<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
