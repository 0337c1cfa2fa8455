use filereacher_core::path::{self, PathError, PathToken, RemotePath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub label: String,
    pub token: PathToken,
}

/// The currently viewed location.
#[derive(Debug, Clone, Default)]
pub struct PathStack {
    path: RemotePath,
}

impl PathStack {
    pub fn new(path: RemotePath) -> Self {
        Self { path }
    }

    pub fn push(&mut self, name: &str) -> Result<(), PathError> {
        self.path.push(name)
    }

    pub fn pop(&mut self) -> Option<String> {
        self.path.pop()
    }

    pub fn replace(&mut self, path: RemotePath) {
        self.path = path;
    }

    pub fn current(&self) -> &RemotePath {
        &self.path
    }

    pub fn token(&self) -> PathToken {
        path::encode(&self.path)
    }

    /// One crumb per segment. Empty segments (the root) carry the store name.
    pub fn breadcrumbs(&self, store_name: &str) -> Vec<Breadcrumb> {
        self.path
            .segments()
            .iter()
            .enumerate()
            .map(|(index, segment)| Breadcrumb {
                label: if segment.is_empty() {
                    store_name.to_string()
                } else {
                    segment.clone()
                },
                token: path::encode_prefix(&self.path, index + 1),
            })
            .collect()
    }
}
