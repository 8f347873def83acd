//! @ai:module:intent Resolve every active intent document of a manifest against current source
//! @ai:module:layer application
//! @ai:module:public_api resolve_manifest, resolve_chunk, ResolveOptions, Resolution, ResolvedDocument, DocumentFailure
//! @ai:module:depends_on manifest, document, resolver, overlap, source, intent
//! @ai:module:stateless true

use crate::document::{try_parse_document, DocumentOptions};
use crate::intent::{
    Chunk, ChunkState, Frontmatter, IntentDocument, IntentEntry, Manifest, ParseIssue,
    ResolvedChunk,
};
use crate::overlap::{detect_overlaps, OverlapEntry};
use crate::resolver::{resolve_anchor_with, HashPolicy};
use crate::source::SourceProvider;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source texts keyed by repository-relative path; `None` when unreadable
pub type SourceTexts = HashMap<String, Option<String>>;

/// @ai:intent Knobs for one resolution run
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Requested language; the manifest's default language when absent
    pub lang: Option<String>,
    pub hash_policy: HashPolicy,
}

/// @ai:intent An intent document whose chunks have been resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedDocument {
    pub id: String,
    pub file: String,
    pub frontmatter: Frontmatter,
    pub title: String,
    pub summary: String,
    pub motivation: String,
    pub chunks: Vec<ResolvedChunk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<ParseIssue>,
}

/// @ai:intent An active manifest entry whose document could not be used
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFailure {
    pub id: String,
    pub file: String,
    pub reason: String,
}

/// @ai:intent Outcome of resolving a whole manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Resolution {
    pub lang: String,
    pub documents: Vec<ResolvedDocument>,
    pub failures: Vec<DocumentFailure>,
}

impl Resolution {
    /// @ai:intent Iterate over every resolved chunk with its document id
    pub fn chunks(&self) -> impl Iterator<Item = (&str, &ResolvedChunk)> {
        self.documents
            .iter()
            .flat_map(|doc| doc.chunks.iter().map(move |c| (doc.id.as_str(), c)))
    }

    /// @ai:intent Count chunks in a given state
    pub fn count(&self, state: ChunkState) -> usize {
        self.chunks().filter(|(_, c)| c.state() == state).count()
    }
}

/// @ai:intent Parse and resolve all active documents, then detect overlaps across all of them
/// @ai:pre provider returns UTF-8 text
/// @ai:post only active entries appear in documents or failures
/// @ai:post each source file is requested from the provider at most once
/// @ai:effects reads through provider
pub fn resolve_manifest(
    manifest: &Manifest,
    provider: &dyn SourceProvider,
    options: &ResolveOptions,
) -> Resolution {
    let lang = options
        .lang
        .clone()
        .unwrap_or_else(|| manifest.default_lang.clone());
    // Without a requested language each document falls back to its own default
    let doc_options = DocumentOptions {
        lang: options.lang.as_deref(),
        default_lang: &manifest.default_lang,
    };

    let mut parsed: Vec<(&IntentEntry, IntentDocument)> = Vec::new();
    let mut failures = Vec::new();

    for entry in manifest.active() {
        let outcome = provider
            .read_document(&entry.file)
            .ok_or_else(|| "document could not be read".to_string())
            .and_then(|text| try_parse_document(&text, &doc_options).map_err(|e| e.to_string()));

        match outcome {
            Ok(doc) => parsed.push((entry, doc)),
            Err(reason) => {
                tracing::warn!(
                    id = %entry.id,
                    file = %entry.file,
                    %reason,
                    "skipping intent document"
                );
                failures.push(DocumentFailure {
                    id: entry.id.clone(),
                    file: entry.file.clone(),
                    reason,
                });
            }
        }
    }

    let mut sources = SourceTexts::new();
    for (_, doc) in &parsed {
        for file in &doc.frontmatter.files {
            if !sources.contains_key(file) {
                sources.insert(file.clone(), provider.read_source(file));
            }
        }
    }

    let policy = options.hash_policy;
    let mut documents: Vec<ResolvedDocument> = parsed
        .into_par_iter()
        .map(|(entry, doc)| resolve_document(entry, doc, &sources, policy))
        .collect();

    apply_overlaps(&mut documents);

    let resolution = Resolution {
        lang,
        documents,
        failures,
    };

    tracing::info!(
        documents = resolution.documents.len(),
        failures = resolution.failures.len(),
        fresh = resolution.count(ChunkState::Fresh),
        stale = resolution.count(ChunkState::Stale),
        obsolete = resolution.count(ChunkState::Obsolete),
        new = resolution.count(ChunkState::New),
        "resolution finished"
    );

    resolution
}

fn resolve_document(
    entry: &IntentEntry,
    doc: IntentDocument,
    sources: &SourceTexts,
    policy: HashPolicy,
) -> ResolvedDocument {
    let chunks = doc
        .chunks
        .into_iter()
        .map(|chunk| resolve_chunk(chunk, &entry.id, &doc.frontmatter.files, sources, policy))
        .collect();

    ResolvedDocument {
        id: entry.id.clone(),
        file: entry.file.clone(),
        frontmatter: doc.frontmatter,
        title: doc.title,
        summary: doc.summary,
        motivation: doc.motivation,
        chunks,
        skipped: doc.skipped,
    }
}

/// @ai:intent Resolve one chunk against candidate files in priority order
/// @ai:post resolved_file is the first file where the anchor was found
/// @ai:post hash_match is None unless both a stored hash and a resolution exist
/// @ai:effects pure
pub fn resolve_chunk(
    chunk: Chunk,
    intent_id: &str,
    files: &[String],
    sources: &SourceTexts,
    policy: HashPolicy,
) -> ResolvedChunk {
    let anchor_id = chunk.anchor_id(intent_id);

    let (resolved_file, resolved) = if chunk.anchor.is_virtual() {
        (None, Some(resolve_anchor_with(&chunk.anchor, "", policy)))
    } else {
        files
            .iter()
            .find_map(|file| {
                let text = sources.get(file)?.as_deref()?;
                let result = resolve_anchor_with(&chunk.anchor, text, policy);
                result.found.then(|| (Some(file.clone()), Some(result)))
            })
            .unwrap_or((None, None))
    };

    if resolved.is_none() {
        tracing::debug!(anchor = %anchor_id, "anchor not found in any candidate file");
    }

    let hash_match = match (&chunk.stored_hash, &resolved) {
        (Some(stored), Some(result)) => Some(stored.eq_ignore_ascii_case(&result.hash)),
        _ => None,
    };

    ResolvedChunk {
        anchor_id,
        chunk,
        resolved_file,
        resolved,
        hash_match,
        overlaps: Vec::new(),
    }
}

/// @ai:intent Run overlap detection once across every document and write results back
fn apply_overlaps(documents: &mut [ResolvedDocument]) {
    let entries: Vec<OverlapEntry> = documents
        .iter()
        .flat_map(|doc| doc.chunks.iter())
        .map(|chunk| OverlapEntry {
            anchor_id: chunk.anchor_id.clone(),
            file: chunk.resolved_file.clone(),
            range: chunk.resolved.as_ref().and_then(|r| r.range()),
        })
        .collect();

    let overlaps = detect_overlaps(&entries);

    for chunk in documents.iter_mut().flat_map(|doc| doc.chunks.iter_mut()) {
        if let Some(others) = overlaps.get(&chunk.anchor_id) {
            chunk.overlaps = others.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest;
    use crate::resolver::fingerprint;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = "version: 1\nintents:\n  - id: f1\n    file: f1.intent.md\n    status: active\n";

    /// `def handle(x):` spans lines 10-14
    fn handler_source() -> String {
        let mut lines: Vec<String> = (1..=9).map(|i| format!("# line {}", i)).collect();
        lines.extend([
            "def handle(x):".to_string(),
            "    if not x:".to_string(),
            "        return None".to_string(),
            "    y = x * 2".to_string(),
            "    return y".to_string(),
            "".to_string(),
            "def other():".to_string(),
            "    pass".to_string(),
        ]);
        lines.join("\n")
    }

    fn handler_hash() -> String {
        let source = handler_source();
        let lines: Vec<&str> = source.lines().collect();
        fingerprint(&lines[9..14].join("\n"), HashPolicy::Trimmed)
    }

    fn document(stored_hash: Option<&str>) -> String {
        let hash_line = stored_hash
            .map(|h| format!("<!-- hash: {} -->\n", h))
            .unwrap_or_default();
        format!(
            "---\nid: f1\nfiles: [\"a.py\"]\n---\n# Handling\n\n### @function:handle | Handler\nen: Doubles input.\n{}",
            hash_line
        )
    }

    fn run(doc: &str, source: Option<&str>) -> Resolution {
        let manifest = parse_manifest(MANIFEST).unwrap();
        let mut provider = MemorySource::new().with_document("f1.intent.md", doc);
        if let Some(source) = source {
            provider = provider.with_source("a.py", source);
        }
        resolve_manifest(&manifest, &provider, &ResolveOptions::default())
    }

    #[test]
    fn test_fresh_chunk_matches_stored_hash() {
        let hash = handler_hash();
        let resolution = run(&document(Some(&hash)), Some(&handler_source()));

        let chunk = &resolution.documents[0].chunks[0];
        assert_eq!(chunk.resolved_file.as_deref(), Some("a.py"));
        let resolved = chunk.resolved.as_ref().unwrap();
        assert_eq!(resolved.start_line, Some(10));
        assert_eq!(resolved.end_line, Some(14));
        assert_eq!(chunk.hash_match, Some(true));
        assert_eq!(chunk.state(), ChunkState::Fresh);
    }

    #[test]
    fn test_stale_and_new_chunks() {
        let stale = run(&document(Some("deadbeef")), Some(&handler_source()));
        assert_eq!(stale.documents[0].chunks[0].hash_match, Some(false));
        assert_eq!(stale.count(ChunkState::Stale), 1);

        let new = run(&document(None), Some(&handler_source()));
        assert_eq!(new.documents[0].chunks[0].hash_match, None);
        assert_eq!(new.count(ChunkState::New), 1);
    }

    #[test]
    fn test_missing_function_is_obsolete() {
        let resolution = run(&document(Some("deadbeef")), Some("def other():\n    pass\n"));

        let chunk = &resolution.documents[0].chunks[0];
        assert_eq!(chunk.resolved, None);
        assert_eq!(chunk.resolved_file, None);
        assert_eq!(chunk.hash_match, None);
        assert_eq!(chunk.state(), ChunkState::Obsolete);
    }

    #[test]
    fn test_unreadable_source_is_obsolete_not_failure() {
        let resolution = run(&document(None), None);
        assert!(resolution.failures.is_empty());
        assert_eq!(resolution.count(ChunkState::Obsolete), 1);
    }

    #[test]
    fn test_first_candidate_file_wins() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        let doc = "---\nid: f1\nfiles: [a.py, b.py, c.py]\n---\n### @function:go | Go\n";
        let provider = MemorySource::new()
            .with_document("f1.intent.md", doc)
            .with_source("a.py", "x = 1\n")
            .with_source("b.py", "def go():\n    pass\n")
            .with_source("c.py", "def go():\n    return 1\n");

        let resolution = resolve_manifest(&manifest, &provider, &ResolveOptions::default());
        assert_eq!(
            resolution.documents[0].chunks[0].resolved_file.as_deref(),
            Some("b.py")
        );
    }

    #[test]
    fn test_overlaps_within_and_across_documents() {
        let manifest = parse_manifest(
            "intents:\n  - id: f1\n    file: f1.md\n  - id: f2\n    file: f2.md\n  - id: f3\n    file: f3.md\n    status: draft\n",
        )
        .unwrap();
        let source: String = (1..=30).map(|i| format!("line {}\n", i)).collect();
        let provider = MemorySource::new()
            .with_document(
                "f1.md",
                "---\nid: f1\nfiles: a.py\n---\n### @line:1-10 | Top\n### @chunk:idea | Idea\n",
            )
            .with_document(
                "f2.md",
                "---\nid: f2\nfiles: [b.py, a.py]\n---\n### @line:8-20 | Middle\n### @line:25-30 | Bottom\n",
            )
            .with_document("f3.md", "---\nid: f3\nfiles: a.py\n---\n### @line:1-30 | Draft\n")
            .with_source("a.py", &source);

        let resolution = resolve_manifest(&manifest, &provider, &ResolveOptions::default());
        assert_eq!(resolution.documents.len(), 2);

        let f1 = &resolution.documents[0].chunks;
        let f2 = &resolution.documents[1].chunks;

        assert_eq!(f1[0].overlaps, vec!["f2#@line:8-20".to_string()]);
        assert_eq!(f2[0].overlaps, vec!["f1#@line:1-10".to_string()]);
        assert!(f2[1].overlaps.is_empty());

        // Conceptual chunks resolve without a file and never overlap
        assert!(f1[1].resolved.as_ref().unwrap().found);
        assert_eq!(f1[1].resolved_file, None);
        assert!(f1[1].overlaps.is_empty());
    }

    #[test]
    fn test_document_failures_are_reported() {
        let manifest = parse_manifest(
            "intents:\n  - id: gone\n    file: gone.md\n  - id: bad\n    file: bad.md\n",
        )
        .unwrap();
        let provider = MemorySource::new().with_document("bad.md", "no frontmatter here");

        let resolution = resolve_manifest(&manifest, &provider, &ResolveOptions::default());

        assert!(resolution.documents.is_empty());
        let ids: Vec<_> = resolution.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["gone", "bad"]);
    }

    #[test]
    fn test_document_default_language_applies_without_request() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        let doc = "---\nid: f1\ndefault_lang: fr\n---\n## Summary\nen: Hello\nfr: Bonjour\n";
        let provider = MemorySource::new().with_document("f1.intent.md", doc);

        let resolution = resolve_manifest(&manifest, &provider, &ResolveOptions::default());
        assert_eq!(resolution.lang, "en");
        assert_eq!(resolution.documents[0].summary, "Bonjour");

        let parsed = crate::document::parse_document(doc, None).unwrap();
        assert_eq!(parsed.summary, resolution.documents[0].summary);
    }

    #[test]
    fn test_requested_language() {
        let manifest = parse_manifest(MANIFEST).unwrap();
        let doc = "---\nid: f1\n---\n# Title\n# fr: Titre\n### @chunk:c | Note\n### fr: Remarque\n";
        let provider = MemorySource::new().with_document("f1.intent.md", doc);

        let options = ResolveOptions {
            lang: Some("fr".to_string()),
            ..Default::default()
        };
        let resolution = resolve_manifest(&manifest, &provider, &options);

        assert_eq!(resolution.lang, "fr");
        assert_eq!(resolution.documents[0].title, "Titre");
        assert_eq!(resolution.documents[0].chunks[0].chunk.title, "Remarque");
    }
}
