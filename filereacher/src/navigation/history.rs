use filereacher_core::PathToken;

/// Collaborator that records locations the way a browser's session history
/// does.
pub trait History {
    fn push_entry(&mut self, title: &str, token: &PathToken);
    /// Token of the entry currently shown, `None` when it carries no path.
    fn current_token(&self) -> Option<PathToken>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub title: String,
    pub token: Option<PathToken>,
}

/// In-memory back/forward history.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
}

impl SessionHistory {
    pub fn new(initial: Option<PathToken>) -> Self {
        Self {
            entries: vec![HistoryEntry {
                title: String::new(),
                token: initial,
            }],
            cursor: 0,
        }
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(None)
    }
}

impl History for SessionHistory {
    fn push_entry(&mut self, title: &str, token: &PathToken) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            title: title.to_string(),
            token: Some(token.clone()),
        });
        self.cursor = self.entries.len() - 1;
    }

    fn current_token(&self) -> Option<PathToken> {
        self.entries
            .get(self.cursor)
            .and_then(|entry| entry.token.clone())
    }
}
