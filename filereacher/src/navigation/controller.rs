use std::future::Future;

use filereacher_core::path::{self, PathError, PathToken, RemotePath};
use filereacher_core::{DirectoryListing, ErrorKind, FileReacherClient, FileReacherError};
use thiserror::Error;
use tracing::{debug, warn};

use super::history::History;
use super::stack::{Breadcrumb, PathStack};

/// Segment name that means "go to the parent directory".
pub const ASCEND: &str = "..";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("listing failed: {0}")]
    Listing(#[from] FileReacherError),
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}

impl NavigationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavigationError::Listing(err) => err.kind(),
            NavigationError::Path(_) => ErrorKind::Decoding,
        }
    }
}

/// Fetches directory contents for a path.
pub trait Lister: Send + Sync {
    fn list(
        &self,
        path: &PathToken,
    ) -> impl Future<Output = Result<DirectoryListing, FileReacherError>> + Send;
}

impl Lister for FileReacherClient {
    async fn list(&self, path: &PathToken) -> Result<DirectoryListing, FileReacherError> {
        FileReacherClient::list(self, path).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Listing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub path: RemotePath,
    pub entries: DirectoryListing,
}

impl Listing {
    /// Whether a parent entry is offered.
    pub fn can_ascend(&self) -> bool {
        !self.path.is_root()
    }
}

/// A listing request tagged with the location it was issued for.
#[derive(Debug, Clone)]
pub struct ListingRequest {
    seq: u64,
    path: RemotePath,
    token: PathToken,
}

impl ListingRequest {
    pub fn token(&self) -> &PathToken {
        &self.token
    }

    pub fn path(&self) -> &RemotePath {
        &self.path
    }
}

pub struct NavigationController<L, H> {
    lister: L,
    history: H,
    store_name: String,
    stack: PathStack,
    state: NavState,
    listing: Option<Listing>,
    issued: u64,
}

impl<L: Lister, H: History> NavigationController<L, H> {
    /// Starts at the location recorded in `history`, or the root when it
    /// carries none or an undecodable one. No listing is requested yet.
    pub fn new(lister: L, history: H, store_name: impl Into<String>) -> Self {
        let initial = match history.current_token() {
            Some(token) => path::decode(&token).unwrap_or_else(|err| {
                warn!(%token, "ignoring undecodable start location: {err}");
                RemotePath::root()
            }),
            None => RemotePath::root(),
        };
        Self {
            lister,
            history,
            store_name: store_name.into(),
            stack: PathStack::new(initial),
            state: NavState::Idle,
            listing: None,
            issued: 0,
        }
    }

    pub fn current(&self) -> &RemotePath {
        self.stack.current()
    }

    pub fn token(&self) -> PathToken {
        self.stack.token()
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.stack.breadcrumbs(&self.store_name)
    }

    pub fn title(&self) -> String {
        let mut location = self.stack.current().joined();
        location.push('/');
        format!("FileReacher - {} - {}", self.store_name, location)
    }

    /// Descends into `name`, ascends for [`ASCEND`], or just refreshes for
    /// `None`. With `add_to_history` the move is recorded and the shown
    /// listing is cleared before the new one is requested.
    pub async fn navigate(
        &mut self,
        name: Option<&str>,
        add_to_history: bool,
    ) -> Result<(), NavigationError> {
        match name {
            Some(ASCEND) => {
                self.stack.pop();
            }
            Some(name) => self.stack.push(name)?,
            None => {}
        }

        if add_to_history {
            let token = self.stack.token();
            self.history.push_entry(self.stack.current().last(), &token);
            self.listing = None;
        }
        let request = self.begin_listing();
        let result = self.lister.list(request.token()).await;
        self.finish_listing(request, result)
    }

    pub async fn ascend(&mut self, add_to_history: bool) -> Result<(), NavigationError> {
        if self.stack.current().is_root() {
            return Ok(());
        }
        self.navigate(Some(ASCEND), add_to_history).await
    }

    pub async fn refresh(&mut self) -> Result<(), NavigationError> {
        self.navigate(None, false).await
    }

    /// Jumps to the location in `token`. An undecodable token lands on the
    /// root and the decoding error is still returned.
    pub async fn restore(
        &mut self,
        token: &PathToken,
        add_to_history: bool,
    ) -> Result<(), NavigationError> {
        match path::decode(token) {
            Ok(target) => {
                self.stack.replace(target);
                self.navigate(None, add_to_history).await
            }
            Err(err) => {
                warn!(%token, "undecodable location, showing root: {err}");
                self.stack.replace(RemotePath::root());
                self.navigate(None, add_to_history).await?;
                Err(err.into())
            }
        }
    }

    pub async fn on_history_pop(&mut self) -> Result<(), NavigationError> {
        let token = self.history.current_token().unwrap_or_else(PathToken::root);
        self.restore(&token, false).await
    }

    pub fn begin_listing(&mut self) -> ListingRequest {
        self.issued += 1;
        self.state = NavState::Listing;
        let path = self.stack.current().clone();
        debug!(seq = self.issued, path = %path, "requesting listing");
        ListingRequest {
            seq: self.issued,
            token: path::encode(&path),
            path,
        }
    }

    /// Applies a listing result unless a newer request was issued since or
    /// the location moved on. A failed listing leaves the previous one shown.
    pub fn finish_listing(
        &mut self,
        request: ListingRequest,
        result: Result<DirectoryListing, FileReacherError>,
    ) -> Result<(), NavigationError> {
        if request.seq != self.issued || &request.path != self.stack.current() {
            debug!(seq = request.seq, path = %request.path, "discarding stale listing");
            return Ok(());
        }
        self.state = NavState::Idle;
        let entries = result?;
        self.listing = Some(Listing {
            path: request.path,
            entries,
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
