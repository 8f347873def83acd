//! @ai:module:intent Define data structures for manifests, intent documents and resolved chunks
//! @ai:module:layer domain
//! @ai:module:public_api Manifest, IntentEntry, IntentStatus, IntentDocument, Frontmatter, Chunk, Link, AnchorResult, ResolvedChunk, ChunkState
//! @ai:module:depends_on anchor
//! @ai:module:stateless true

use crate::anchor::AnchorSpec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// @ai:intent Repository-level index of intent documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub version: u64,
    pub default_lang: String,
    pub intents: Vec<IntentEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
}

/// @ai:intent One manifest line pointing at an intent document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentEntry {
    pub id: String,
    pub file: String,
    pub status: IntentStatus,
}

/// @ai:intent A manifest entry that was dropped while parsing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

/// @ai:intent Lifecycle status of an intent document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntentStatus {
    Active,
    Draft,
    Archived,
    Other(String),
}

impl IntentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            IntentStatus::Active => "active",
            IntentStatus::Draft => "draft",
            IntentStatus::Archived => "archived",
            IntentStatus::Other(s) => s,
        }
    }
}

impl From<&str> for IntentStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => IntentStatus::Active,
            "draft" => IntentStatus::Draft,
            "archived" => IntentStatus::Archived,
            _ => IntentStatus::Other(value.trim().to_string()),
        }
    }
}

impl Serialize for IntentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IntentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(IntentStatus::from(raw.as_str()))
    }
}

impl Manifest {
    /// @ai:intent Iterate over the entries that take part in resolution
    /// @ai:effects pure
    pub fn active(&self) -> impl Iterator<Item = &IntentEntry> {
        self.intents
            .iter()
            .filter(|entry| entry.status == IntentStatus::Active)
    }
}

/// @ai:intent Structured header of an intent document
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub id: String,
    pub files: Vec<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub risk: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lang: Option<String>,
}

/// @ai:intent One parsed intent document, resolved into a single language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentDocument {
    pub frontmatter: Frontmatter,
    pub title: String,
    pub summary: String,
    pub motivation: String,
    pub chunks: Vec<Chunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ParseIssue>,
}

/// @ai:intent One documented unit of rationale tied to an anchor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub anchor: AnchorSpec,
    pub title: String,
    pub description: String,
    pub decisions: Vec<String>,
    pub links: Vec<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_hash: Option<String>,
}

impl Chunk {
    /// @ai:intent Build the globally unique id used to report overlaps
    /// @ai:example ("f1") -> "f1#@function:handle"
    pub fn anchor_id(&self, intent_id: &str) -> String {
        format!("{}#{}", intent_id, self.anchor)
    }
}

/// @ai:intent Relation from one chunk to another anchor, possibly in another file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub target: String,
    pub reason: String,
}

/// @ai:intent Kinds of units dropped while parsing a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Chunk,
    Link,
}

/// @ai:intent A unit of a document that failed to parse and was dropped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParseIssue {
    pub line: usize,
    pub kind: IssueKind,
    pub message: String,
}

/// @ai:intent Location and fingerprint of an anchor inside one source text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnchorResult {
    pub found: bool,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub content: String,
    pub hash: String,
}

impl AnchorResult {
    /// @ai:intent A miss, reported as a value instead of an error
    pub fn not_found() -> Self {
        Self {
            found: false,
            start_line: None,
            end_line: None,
            content: String::new(),
            hash: String::new(),
        }
    }

    /// @ai:intent Inclusive 1-indexed line range, when the anchor has one
    pub fn range(&self) -> Option<(usize, usize)> {
        match (self.found, self.start_line, self.end_line) {
            (true, Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// @ai:intent A chunk annotated with its resolution against current source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedChunk {
    pub anchor_id: String,
    #[serde(flatten)]
    pub chunk: Chunk,
    pub resolved_file: Option<String>,
    pub resolved: Option<AnchorResult>,
    pub hash_match: Option<bool>,
    pub overlaps: Vec<String>,
}

/// @ai:intent Freshness of a chunk relative to current source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    Fresh,
    Stale,
    Obsolete,
    New,
}

impl ResolvedChunk {
    /// @ai:intent Classify the chunk as fresh, stale, obsolete or new
    /// @ai:post Obsolete iff resolved is None
    /// @ai:effects pure
    pub fn state(&self) -> ChunkState {
        match (&self.resolved, self.hash_match) {
            (None, _) => ChunkState::Obsolete,
            (Some(_), Some(true)) => ChunkState::Fresh,
            (Some(_), Some(false)) => ChunkState::Stale,
            (Some(_), None) => ChunkState::New,
        }
    }
}
