//! @ai:module:intent Intent document library: tie design rationale to source anchors and detect drift
//! @ai:module:layer infrastructure
//! @ai:module:public_api manifest, document, resolver, overlap, resolution, check, output, error
//! @ai:module:stateless true
//!
//! # Intent Parser
//!
//! Intent documents are Markdown files that record *why* a piece of code looks the
//! way it does. Each chunk of rationale points at a region of source through an
//! anchor (`@function:handle`, `@method:Router.dispatch`, `@line:10-14`, ...) and may
//! carry the hash of that region as it was when the rationale was written. Resolving
//! a manifest relocates every anchor in current source, recomputes its hash and
//! classifies each chunk as fresh, stale, obsolete or new.
//!
//! ## Example
//!
//! ```rust,no_run
//! use intent_parser::{check, output, resolution, manifest, FsSource, ResolveOptions};
//!
//! let source = FsSource::new(".", ".intent");
//! let text = source.read_manifest("manifest.yaml").unwrap();
//! let manifest = manifest::parse_manifest(&text).unwrap();
//!
//! let resolved = resolution::resolve_manifest(&manifest, &source, &ResolveOptions::default());
//! println!("{}", output::format_resolution(&resolved, output::OutputFormat::JsonPretty));
//!
//! let result = check::check_resolution(&manifest, &resolved, &check::CheckConfig::strict());
//! println!("{}", output::format_check_result(&result, output::OutputFormat::Text));
//! ```

pub mod anchor;
pub mod block;
pub mod check;
pub mod config;
pub mod document;
pub mod error;
pub mod intent;
pub mod lang;
pub mod manifest;
pub mod output;
pub mod overlap;
pub mod resolution;
pub mod resolver;
pub mod source;

pub use anchor::{AnchorSpec, LinkTarget};
pub use check::{
    check_resolution, find_unlisted_documents, CheckConfig, CheckIssue, CheckResult, Severity,
};
pub use config::Config;
pub use document::{parse_document, parse_document_with, DocumentOptions};
pub use error::{Error, Result};
pub use intent::{
    AnchorResult, Chunk, ChunkState, Frontmatter, IntentDocument, IntentEntry, IntentStatus,
    Link, Manifest, ResolvedChunk,
};
pub use manifest::{parse_manifest, parse_manifest_with, EntryPolicy};
pub use output::{format_check_result, format_resolution, to_json, OutputFormat};
pub use overlap::{detect_overlaps, OverlapEntry};
pub use resolution::{resolve_manifest, Resolution, ResolveOptions};
pub use resolver::{fingerprint, resolve_anchor, resolve_anchor_with, HashPolicy};
pub use source::{FsSource, MemorySource, SourceProvider};
