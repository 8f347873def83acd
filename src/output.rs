//! @ai:module:intent Format resolutions, check reports and parsed inputs as text or JSON
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_resolution, format_check_result, format_manifest, format_document, format_anchor_result
//! @ai:module:depends_on check, resolution, intent
//! @ai:module:stateless true

use crate::check::{CheckResult, Severity};
use crate::error::Result;
use crate::intent::{AnchorResult, Chunk, ChunkState, IntentDocument, Manifest, ResolvedChunk};
use crate::resolution::Resolution;
use colored::Colorize;
use serde::Serialize;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Json => to_json(value, false),
        OutputFormat::JsonPretty => to_json(value, true),
        OutputFormat::Text => text(value),
    }
}

/// @ai:intent Serialize a value as JSON, reporting serializer failures
/// @ai:effects pure
pub fn try_to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// @ai:intent Format any serializable value as JSON, empty output when serialization fails
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    try_to_json(value, pretty).unwrap_or_else(|e| {
        tracing::error!(error = %e, "cannot render JSON output");
        String::new()
    })
}

/// @ai:intent Format a whole-manifest resolution
/// @ai:effects pure
pub fn format_resolution(resolution: &Resolution, format: OutputFormat) -> String {
    render(resolution, format, format_resolution_text)
}

fn state_label(state: ChunkState) -> colored::ColoredString {
    match state {
        ChunkState::Fresh => "fresh".green(),
        ChunkState::Stale => "stale".yellow().bold(),
        ChunkState::Obsolete => "obsolete".red().bold(),
        ChunkState::New => "new".blue(),
    }
}

fn resolved_chunk_text(chunk: &ResolvedChunk) -> String {
    let location = match (&chunk.resolved_file, chunk.resolved.as_ref().and_then(|r| r.range())) {
        (Some(file), Some((start, end))) => format!("{}:{}-{}", file, start, end),
        (Some(file), None) => file.clone(),
        (None, _) if chunk.chunk.anchor.is_virtual() => "conceptual".to_string(),
        (None, _) => "not found".to_string(),
    };

    let mut line = format!(
        "  [{}] {} {} {}\n",
        state_label(chunk.state()),
        chunk.chunk.anchor.to_string().cyan(),
        chunk.chunk.title,
        location.dimmed()
    );

    if !chunk.overlaps.is_empty() {
        line.push_str(&format!(
            "      {} {}\n",
            "overlaps:".yellow(),
            chunk.overlaps.join(", ")
        ));
    }

    line
}

fn format_resolution_text(resolution: &Resolution) -> String {
    let mut output = String::new();

    for doc in &resolution.documents {
        output.push_str(&format!("{} {}\n", doc.id.bold(), doc.title));
        output.push_str(&format!("  {}\n", doc.file.dimmed()));

        for chunk in &doc.chunks {
            output.push_str(&resolved_chunk_text(chunk));
        }
        output.push('\n');
    }

    for failure in &resolution.failures {
        output.push_str(&format!(
            "{} {} ({}) - {}\n",
            "FAILED".red().bold(),
            failure.id,
            failure.file.dimmed(),
            failure.reason
        ));
    }

    output.push_str(&format!(
        "Resolved {} documents in `{}`: {} fresh, {} stale, {} obsolete, {} new\n",
        resolution.documents.len(),
        resolution.lang,
        resolution.count(ChunkState::Fresh),
        resolution.count(ChunkState::Stale),
        resolution.count(ChunkState::Obsolete),
        resolution.count(ChunkState::New)
    ));

    output
}

/// @ai:intent Format check results as a string
/// @ai:effects pure
pub fn format_check_result(result: &CheckResult, format: OutputFormat) -> String {
    render(result, format, format_check_result_text)
}

/// @ai:intent Format check results as human-readable text
/// @ai:effects pure
fn format_check_result_text(result: &CheckResult) -> String {
    let mut output = String::new();

    for issue in &result.issues {
        let severity_str = match issue.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
            Severity::Info => "INFO".blue(),
        };

        let location = match issue.location.line {
            Some(line) => format!("{}:{}", issue.location.file, line),
            None => issue.location.file.clone(),
        };

        output.push_str(&format!(
            "{} {} - {} ({})\n",
            severity_str,
            location.dimmed(),
            issue.message,
            issue.code.dimmed()
        ));

        if let Some(suggestion) = &issue.suggestion {
            output.push_str(&format!("  {} {}\n", "hint:".cyan(), suggestion));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Checked {} documents, {} chunks\n",
        result.documents_checked, result.chunks_checked
    ));

    if result.errors > 0 {
        output.push_str(&format!(
            "{} errors, {} warnings\n",
            result.errors.to_string().red().bold(),
            result.warnings.to_string().yellow()
        ));
    } else if result.warnings > 0 {
        output.push_str(&format!(
            "{} {} warnings\n",
            "OK".green().bold(),
            result.warnings.to_string().yellow()
        ));
    } else {
        output.push_str(&format!("{} Intents in sync\n", "OK".green().bold()));
    }

    output
}

/// @ai:intent Format a parsed manifest
/// @ai:effects pure
pub fn format_manifest(manifest: &Manifest, format: OutputFormat) -> String {
    render(manifest, format, |manifest| {
        let mut output = format!(
            "Manifest v{} (default language `{}`)\n",
            manifest.version, manifest.default_lang
        );

        for entry in &manifest.intents {
            output.push_str(&format!(
                "  {} {} [{}]\n",
                entry.id.cyan(),
                entry.file,
                entry.status.as_str()
            ));
        }

        for skipped in &manifest.skipped {
            output.push_str(&format!(
                "  {} entry #{}: {}\n",
                "skipped".yellow(),
                skipped.index,
                skipped.reason
            ));
        }

        output
    })
}

fn chunk_text(chunk: &Chunk) -> String {
    let mut output = format!("  {} {}\n", chunk.anchor.to_string().cyan(), chunk.title.bold());

    if !chunk.description.is_empty() {
        for line in chunk.description.lines() {
            output.push_str(&format!("    {}\n", line));
        }
    }

    for decision in &chunk.decisions {
        output.push_str(&format!("    {} {}\n", ">".dimmed(), decision));
    }

    for link in &chunk.links {
        output.push_str(&format!("    -> {} | {}\n", link.target, link.reason));
    }

    if let Some(hash) = &chunk.stored_hash {
        output.push_str(&format!("    {} {}\n", "hash:".dimmed(), hash));
    }

    output
}

/// @ai:intent Format one parsed intent document
/// @ai:effects pure
pub fn format_document(doc: &IntentDocument, format: OutputFormat) -> String {
    render(doc, format, |doc| {
        let mut output = format!("{} {}\n", doc.frontmatter.id.bold(), doc.title);

        if !doc.frontmatter.files.is_empty() {
            output.push_str(&format!("  files: {}\n", doc.frontmatter.files.join(", ")));
        }
        if !doc.summary.is_empty() {
            output.push_str(&format!("\n  {}\n", doc.summary));
        }

        output.push_str(&format!("\n  Chunks ({}):\n", doc.chunks.len()));
        for chunk in &doc.chunks {
            output.push_str(&chunk_text(chunk));
        }

        for issue in &doc.skipped {
            output.push_str(&format!(
                "  {} line {}: {}\n",
                "skipped".yellow(),
                issue.line,
                issue.message
            ));
        }

        output
    })
}

/// @ai:intent Format the result of resolving a single anchor
/// @ai:effects pure
pub fn format_anchor_result(result: &AnchorResult, format: OutputFormat) -> String {
    render(result, format, |result| {
        if !result.found {
            return format!("{}\n", "not found".red().bold());
        }

        let mut output = match result.range() {
            Some((start, end)) => format!("lines {}-{} ", start, end),
            None => String::new(),
        };
        output.push_str(&format!("{} {}\n", "hash:".dimmed(), result.hash));

        if !result.content.is_empty() {
            output.push_str(&result.content);
            output.push('\n');
        }

        output
    })
}
