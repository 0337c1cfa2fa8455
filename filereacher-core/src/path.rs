//! Reversible encoding between remote paths and URL-embeddable tokens.
//!
//! A path is an ordered list of segment names. The root is a single empty
//! segment, so `["", "docs"]` joins to `"/docs"`. Tokens are the standard
//! base64 encoding of the `/`-joined path.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("path token is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("segment {0:?} contains a path separator")]
    Separator(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    segments: Vec<String>,
}

impl RemotePath {
    pub fn root() -> Self {
        Self {
            segments: vec![String::new()],
        }
    }

    /// Builds a path from segment names. An empty iterator yields the root.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for segment in segments {
            out.push(validate_segment(segment.into())?);
        }
        if out.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self { segments: out })
    }

    fn from_joined(joined: &str) -> Self {
        Self {
            segments: joined.split(SEPARATOR).map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn push(&mut self, name: impl Into<String>) -> Result<(), PathError> {
        self.segments.push(validate_segment(name.into())?);
        Ok(())
    }

    /// Removes the last segment. The path never shrinks below one segment.
    pub fn pop(&mut self) -> Option<String> {
        if self.is_root() {
            return None;
        }
        self.segments.pop()
    }

    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, PathError> {
        let mut path = self.clone();
        path.push(name)?;
        Ok(path)
    }

    /// The first `limit` segments, clamped so at least one segment remains.
    pub fn prefix(&self, limit: usize) -> Self {
        let limit = limit.clamp(1, self.segments.len());
        Self {
            segments: self.segments[..limit].to_vec(),
        }
    }

    pub fn parent(&self) -> Self {
        self.prefix(self.segments.len().saturating_sub(1))
    }

    pub fn joined(&self) -> String {
        self.segments.join("/")
    }
}

impl Default for RemotePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

fn validate_segment(segment: String) -> Result<String, PathError> {
    if segment.contains(SEPARATOR) {
        return Err(PathError::Separator(segment));
    }
    Ok(segment)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathToken(String);

impl PathToken {
    /// Wraps a token taken from outside (a URL query, history entry) without
    /// checking it. Validity is established by [`decode`].
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn root() -> Self {
        encode(&RemotePath::root())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PathToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn encode(path: &RemotePath) -> PathToken {
    PathToken(STANDARD.encode(path.joined()))
}

pub fn decode(token: &PathToken) -> Result<RemotePath, PathError> {
    let bytes = STANDARD.decode(token.as_str())?;
    let joined = String::from_utf8(bytes)?;
    Ok(RemotePath::from_joined(&joined))
}

/// Token for an entry inside `path`, without modifying `path`.
pub fn encode_with_name(path: &RemotePath, name: &str) -> Result<PathToken, PathError> {
    Ok(encode(&path.with_name(name)?))
}

/// Token for the ancestor made of the first `limit` segments of `path`.
pub fn encode_prefix(path: &RemotePath, limit: usize) -> PathToken {
    encode(&path.prefix(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> RemotePath {
        RemotePath::from_segments(segments.iter().copied()).unwrap()
    }

    #[test]
    fn root_encodes_to_empty_token() {
        assert_eq!(encode(&RemotePath::root()).as_str(), "");
        assert_eq!(decode(&PathToken::new("")).unwrap(), RemotePath::root());
    }

    #[test]
    fn decode_inverts_encode() {
        let samples = [
            path(&[""]),
            path(&["", "docs"]),
            path(&["", "docs", "2024", "Hello World.txt"]),
            path(&["", "ünïcödé", "файл"]),
            path(&["", "", "empty-middle"]),
        ];
        for sample in samples {
            assert_eq!(decode(&encode(&sample)).unwrap(), sample);
        }
    }

    #[test]
    fn encodes_joined_segments_as_base64() {
        assert_eq!(encode(&path(&["", "docs"])).as_str(), "L2RvY3M=");
        assert_eq!(decode(&PathToken::new("L2RvY3M=")).unwrap(), path(&["", "docs"]));
    }

    #[test]
    fn decode_rejects_invalid_tokens() {
        assert!(matches!(
            decode(&PathToken::new("not base64!")),
            Err(PathError::Base64(_))
        ));
        // 0xff 0xfe is not utf-8
        assert!(matches!(
            decode(&PathToken::new("//4=")),
            Err(PathError::Utf8(_))
        ));
    }

    #[test]
    fn encode_with_name_leaves_path_untouched() {
        let base = path(&["", "docs"]);
        let token = encode_with_name(&base, "a.txt").unwrap();
        assert_eq!(decode(&token).unwrap(), path(&["", "docs", "a.txt"]));
        assert_eq!(base, path(&["", "docs"]));
    }

    #[test]
    fn encode_prefix_addresses_ancestors() {
        let base = path(&["", "docs", "2024"]);
        assert_eq!(decode(&encode_prefix(&base, 1)).unwrap().joined(), "");
        assert_eq!(decode(&encode_prefix(&base, 2)).unwrap().joined(), "/docs");
        assert_eq!(decode(&encode_prefix(&base, 3)).unwrap().joined(), "/docs/2024");
        assert_eq!(encode_prefix(&base, 10), encode(&base));
    }

    #[test]
    fn segments_may_not_contain_separator() {
        let mut base = RemotePath::root();
        assert_eq!(
            base.push("a/b"),
            Err(PathError::Separator("a/b".to_string()))
        );
        assert!(encode_with_name(&base, "x/y").is_err());
        assert_eq!(base, RemotePath::root());
    }

    #[test]
    fn pop_stops_at_root() {
        let mut base = path(&["", "docs"]);
        assert_eq!(base.pop().as_deref(), Some("docs"));
        assert!(base.is_root());
        assert_eq!(base.pop(), None);
        assert_eq!(base, RemotePath::root());
    }

    #[test]
    fn empty_segment_list_is_root() {
        let empty: [&str; 0] = [];
        assert_eq!(RemotePath::from_segments(empty).unwrap(), RemotePath::root());
    }
}
