use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::normalizer;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum CommentId {
    Index(i64),
    Text(String),
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentId::Index(n) => write!(f, "{n}"),
            CommentId::Text(s) => f.write_str(s),
        }
    }
}

/// A single normalized comment. Never mutated after the normalizer builds it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    id: CommentId,
    username: String,
    text: String,
}

impl CommentRecord {
    pub fn new(id: CommentId, username: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id, username: username.into(), text: text.into() }
    }

    pub fn id(&self) -> &CommentId { &self.id }
    pub fn username(&self) -> &str { &self.username }
    pub fn text(&self) -> &str { &self.text }
}

/// Ordered comments from one load. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentBatch(Vec<CommentRecord>);

impl CommentBatch {
    pub fn empty() -> Self { Self(Vec::new()) }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn get(&self, index: usize) -> Option<&CommentRecord> { self.0.get(index) }
    pub fn iter(&self) -> std::slice::Iter<'_, CommentRecord> { self.0.iter() }
}

impl From<Vec<CommentRecord>> for CommentBatch {
    fn from(records: Vec<CommentRecord>) -> Self { Self(records) }
}

pub fn placeholder_username(index: usize) -> String {
    format!("user_{index}")
}

/// Text written when the user copies the winner.
pub fn announcement(winner: &CommentRecord) -> String {
    format!("Vencedor do sorteio: @{}\nComentário: \"{}\"", winner.username, winner.text)
}

// Accepts either JSON (array, {"comments": [...]}, or any nesting the
// structural search understands) or plain text with one comment per line.
// Invalid UTF-8 becomes U+FFFD and a leading byte-order mark is dropped.
pub fn read_comments_from_file(path: impl AsRef<Path>) -> Result<CommentBatch> {
    let bytes = fs::read(path)?;
    let decoded = String::from_utf8_lossy(&bytes);
    let content = decoded.strip_prefix('\u{feff}').unwrap_or(decoded.as_ref());
    normalizer::normalize(content)
}
