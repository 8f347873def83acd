//! @ai:module:intent Report obsolete, stale, new and overlapping chunks as coded issues
//! @ai:module:layer application
//! @ai:module:public_api check_resolution, find_unlisted_documents, CheckConfig, CheckResult, CheckIssue, Severity
//! @ai:module:depends_on resolution, intent
//! @ai:module:stateless true

use crate::intent::{ChunkState, IssueKind, Manifest};
use crate::resolution::Resolution;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// @ai:intent Severity level for check issues
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

/// @ai:intent Where an issue points: a document or source file, optionally a line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// @ai:intent A single problem found while checking intents against source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub location: Location,
    pub suggestion: Option<String>,
}

/// @ai:intent Configuration for the checker
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    pub stale_is_error: bool,
    pub report_new: bool,
    pub report_overlaps: bool,
}

impl CheckConfig {
    /// @ai:intent Create a strict check configuration
    pub fn strict() -> Self {
        Self {
            stale_is_error: true,
            report_new: true,
            report_overlaps: true,
        }
    }
}

/// @ai:intent Result of checking a resolution
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckResult {
    pub documents_checked: usize,
    pub chunks_checked: usize,
    pub issues: Vec<CheckIssue>,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckResult {
    /// @ai:intent Check if the intents are in sync with source (no errors)
    pub fn passed(&self) -> bool {
        self.errors == 0
    }

    fn push(&mut self, issue: CheckIssue) {
        match issue.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.issues.push(issue);
    }

    fn add(
        &mut self,
        severity: Severity,
        code: &str,
        message: String,
        location: Location,
        suggestion: Option<String>,
    ) {
        self.push(CheckIssue {
            severity,
            code: code.to_string(),
            message,
            location,
            suggestion,
        });
    }
}

/// @ai:intent Turn a resolution into a list of coded issues
/// @ai:effects pure
pub fn check_resolution(
    manifest: &Manifest,
    resolution: &Resolution,
    config: &CheckConfig,
) -> CheckResult {
    let mut result = CheckResult {
        documents_checked: resolution.documents.len() + resolution.failures.len(),
        ..Default::default()
    };

    for skipped in &manifest.skipped {
        result.add(
            Severity::Warning,
            "W005",
            format!(
                "Manifest entry #{} skipped: {}",
                skipped.index, skipped.reason
            ),
            Location::new("manifest", None),
            skipped
                .id
                .as_ref()
                .map(|id| format!("Give `{}` both an `id` and a `file`", id)),
        );
    }

    for failure in &resolution.failures {
        result.add(
            Severity::Error,
            "E002",
            format!("Intent document `{}` unusable: {}", failure.id, failure.reason),
            Location::new(failure.file.clone(), None),
            None,
        );
    }

    for doc in &resolution.documents {
        for issue in &doc.skipped {
            let what = match issue.kind {
                IssueKind::Chunk => "chunk",
                IssueKind::Link => "link",
            };
            result.add(
                Severity::Warning,
                "W003",
                format!("Skipped malformed {}: {}", what, issue.message),
                Location::new(doc.file.clone(), Some(issue.line)),
                None,
            );
        }

        for chunk in &doc.chunks {
            result.chunks_checked += 1;
            let hash = chunk.resolved.as_ref().map(|r| r.hash.clone());
            let at_source = Location::new(
                chunk.resolved_file.clone().unwrap_or_else(|| doc.file.clone()),
                chunk.resolved.as_ref().and_then(|r| r.start_line),
            );

            match chunk.state() {
                ChunkState::Fresh => {}
                ChunkState::Obsolete => result.add(
                    Severity::Error,
                    "E001",
                    format!(
                        "Chunk `{}` not found in {}",
                        chunk.anchor_id,
                        doc.frontmatter.files.join(", ")
                    ),
                    Location::new(doc.file.clone(), None),
                    Some("Update the anchor or remove the chunk".to_string()),
                ),
                ChunkState::Stale => result.add(
                    if config.stale_is_error {
                        Severity::Error
                    } else {
                        Severity::Warning
                    },
                    "W001",
                    format!("Chunk `{}` changed since it was documented", chunk.anchor_id),
                    at_source,
                    hash.map(|h| format!("Review the rationale, then store <!-- hash: {} -->", h)),
                ),
                ChunkState::New if config.report_new && !chunk.chunk.anchor.is_virtual() => {
                    result.add(
                        Severity::Info,
                        "I001",
                        format!("Chunk `{}` has no stored hash", chunk.anchor_id),
                        at_source,
                        hash.map(|h| format!("Add <!-- hash: {} -->", h)),
                    )
                }
                ChunkState::New => {}
            }

            if config.report_overlaps && !chunk.overlaps.is_empty() {
                result.add(
                    Severity::Warning,
                    "W002",
                    format!(
                        "Chunk `{}` overlaps {}",
                        chunk.anchor_id,
                        chunk.overlaps.join(", ")
                    ),
                    Location::new(
                        chunk.resolved_file.clone().unwrap_or_else(|| doc.file.clone()),
                        chunk.resolved.as_ref().and_then(|r| r.start_line),
                    ),
                    None,
                );
            }
        }
    }

    result
}

/// @ai:intent Find markdown documents in the intent directory that the manifest does not list
/// @ai:post paths are relative to `intent_dir`, sorted
/// @ai:effects fs:read
pub fn find_unlisted_documents(intent_dir: &Path, manifest: &Manifest) -> Vec<PathBuf> {
    let listed: HashSet<PathBuf> = manifest
        .intents
        .iter()
        .map(|e| PathBuf::from(&e.file))
        .collect();

    let mut unlisted: Vec<PathBuf> = WalkDir::new(intent_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "md"))
        .filter_map(|e| e.path().strip_prefix(intent_dir).ok().map(Path::to_path_buf))
        .filter(|rel| !listed.contains(rel))
        .collect();

    unlisted.sort();
    unlisted
}

/// @ai:intent Add W004 warnings for documents nobody will ever resolve
/// @ai:effects pure
pub fn report_unlisted(result: &mut CheckResult, unlisted: &[PathBuf]) {
    for path in unlisted {
        result.add(
            Severity::Warning,
            "W004",
            "Intent document is not listed in the manifest".to_string(),
            Location::new(path.display().to_string(), None),
            Some("Add it to the manifest's `intents` or delete it".to_string()),
        );
    }
}
