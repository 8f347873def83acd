//! @ai:module:intent Parse an intent document (frontmatter plus multilingual body) into chunks
//! @ai:module:layer application
//! @ai:module:public_api parse_document, parse_document_with, try_parse_document, DocumentOptions
//! @ai:module:depends_on anchor, intent, lang, error
//! @ai:module:stateless true

use crate::anchor::{AnchorSpec, LinkTarget};
use crate::error::{Error, Result};
use crate::intent::{Chunk, Frontmatter, IntentDocument, IssueKind, Link, ParseIssue};
use crate::lang::{select_lines, select_text, split_tag, TaggedLine};
use crate::manifest::DEFAULT_LANG;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

const FRONTMATTER_DELIMITER: &str = "---";

/// @ai:intent Language settings used while resolving a document
#[derive(Debug, Clone, Copy)]
pub struct DocumentOptions<'a> {
    /// Requested language; the default language when absent
    pub lang: Option<&'a str>,
    /// Fallback language, usually the manifest's `default_lang`
    pub default_lang: &'a str,
}

impl Default for DocumentOptions<'_> {
    fn default() -> Self {
        Self {
            lang: None,
            default_lang: DEFAULT_LANG,
        }
    }
}

/// @ai:intent Parse a document in the requested language, English as the fallback
/// @ai:post None when the frontmatter is missing or invalid
/// @ai:effects pure
pub fn parse_document(text: &str, lang: Option<&str>) -> Option<IntentDocument> {
    parse_document_with(
        text,
        &DocumentOptions {
            lang,
            ..Default::default()
        },
    )
}

/// @ai:intent Parse a document, failing softly with None
/// @ai:effects pure
pub fn parse_document_with(text: &str, options: &DocumentOptions) -> Option<IntentDocument> {
    match try_parse_document(text, options) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(error = %e, "intent document rejected");
            None
        }
    }
}

/// @ai:intent Parse a document and report why it was rejected
/// @ai:pre text starts with a `---` delimited YAML frontmatter block
/// @ai:post malformed chunks and links are dropped and listed in `skipped`
/// @ai:effects pure
pub fn try_parse_document(text: &str, options: &DocumentOptions) -> Result<IntentDocument> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();

    let (yaml, body_start) = split_frontmatter(&lines)?;
    let frontmatter = parse_frontmatter(&yaml)?;

    let default_lang = frontmatter
        .default_lang
        .clone()
        .unwrap_or_else(|| options.default_lang.to_lowercase());
    let lang = options
        .lang
        .map(str::to_lowercase)
        .unwrap_or_else(|| default_lang.clone());

    let mut body = BodyParser::new(&lang, &default_lang);
    for (idx, line) in lines.iter().enumerate().skip(body_start) {
        body.feed(idx + 1, line);
    }
    body.finish_chunk();

    Ok(IntentDocument {
        title: body.title(),
        summary: select_text(&body.summary, &lang, &default_lang),
        motivation: select_text(&body.motivation, &lang, &default_lang),
        chunks: body.chunks,
        skipped: body.skipped,
        frontmatter,
    })
}

/// @ai:intent Locate the YAML block between the leading `---` delimiters
/// @ai:post returns the YAML text and the index of the first body line
/// @ai:effects pure
fn split_frontmatter(lines: &[&str]) -> Result<(String, usize)> {
    let open = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::Document("empty document".to_string()))?;

    if lines[open].trim() != FRONTMATTER_DELIMITER {
        return Err(Error::Document("missing frontmatter".to_string()));
    }

    let close = lines[open + 1..]
        .iter()
        .position(|l| l.trim() == FRONTMATTER_DELIMITER)
        .map(|offset| open + 1 + offset)
        .ok_or_else(|| Error::Document("unterminated frontmatter".to_string()))?;

    Ok((lines[open + 1..close].join("\n"), close + 1))
}

/// @ai:intent Decode the frontmatter mapping; `id` is the only required key
/// @ai:effects pure
fn parse_frontmatter(yaml: &str) -> Result<Frontmatter> {
    let value: Value = if yaml.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(yaml)?
    };
    let map = value
        .as_mapping()
        .ok_or_else(|| Error::Document("frontmatter is not a mapping".to_string()))?;

    let id = scalar(map, "id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Document("frontmatter has no `id`".to_string()))?;

    let mut files: Vec<String> = Vec::new();
    for file in string_list(map, "files") {
        if !files.contains(&file) {
            files.push(file);
        }
    }

    Ok(Frontmatter {
        id,
        files,
        author: scalar(map, "author"),
        date: scalar(map, "date"),
        status: scalar(map, "status"),
        risk: scalar(map, "risk"),
        tags: string_list(map, "tags"),
        default_lang: scalar(map, "default_lang").map(|l| l.to_lowercase()),
    })
}

fn scalar(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A single string or a list of strings
fn string_list(map: &Mapping, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn hash_comment() -> &'static Regex {
    static HASH: OnceLock<Regex> = OnceLock::new();
    HASH.get_or_init(|| {
        Regex::new(r"^<!--\s*hash:\s*([0-9A-Za-z]+)\s*-->$").expect("valid hash comment regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Summary,
    Motivation,
    Chunks,
    Other,
}

impl Section {
    fn from_heading(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "summary" => Section::Summary,
            "motivation" => Section::Motivation,
            "chunks" => Section::Chunks,
            _ => Section::Other,
        }
    }
}

/// @ai:intent A chunk collected line by line until its next sibling starts
#[derive(Debug)]
struct ChunkDraft {
    anchor: AnchorSpec,
    title: String,
    title_overrides: Vec<(String, String)>,
    description: Vec<TaggedLine>,
    decisions: Vec<TaggedLine>,
    links: Vec<Link>,
    stored_hash: Option<String>,
}

#[derive(Debug)]
enum Current {
    None,
    Chunk(ChunkDraft),
    /// Body of a chunk whose header failed to parse
    Dropped,
}

/// @ai:intent Line-oriented state machine over the document body
struct BodyParser<'a> {
    lang: &'a str,
    default_lang: &'a str,
    section: Section,
    in_fence: bool,
    title: Option<String>,
    title_overrides: Vec<(String, String)>,
    summary: Vec<TaggedLine>,
    motivation: Vec<TaggedLine>,
    current: Current,
    chunks: Vec<Chunk>,
    skipped: Vec<ParseIssue>,
}

impl<'a> BodyParser<'a> {
    fn new(lang: &'a str, default_lang: &'a str) -> Self {
        Self {
            lang,
            default_lang,
            section: Section::Preamble,
            in_fence: false,
            title: None,
            title_overrides: Vec::new(),
            summary: Vec::new(),
            motivation: Vec::new(),
            current: Current::None,
            chunks: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// @ai:intent Consume one body line
    /// @ai:pre line_no is the 1-indexed line number in the whole document
    fn feed(&mut self, line_no: usize, line: &str) {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            self.in_fence = !self.in_fence;
            self.push_content(TaggedLine {
                lang: None,
                text: line.trim_end().to_string(),
            });
            return;
        }
        if self.in_fence {
            self.push_content(TaggedLine {
                lang: None,
                text: line.trim_end().to_string(),
            });
            return;
        }

        if let Some(rest) = trimmed.strip_prefix("### ") {
            let rest = rest.trim();
            if rest.starts_with('@') {
                self.start_chunk(line_no, rest);
                return;
            }
            if let (Current::Chunk(draft), Some((lang, text))) =
                (&mut self.current, split_tag(rest))
            {
                draft.title_overrides.push((lang, text.to_string()));
                return;
            }
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            self.finish_chunk();
            self.section = Section::from_heading(rest);
            return;
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            if self.section == Section::Preamble {
                match split_tag(rest) {
                    Some((lang, text)) => self.title_overrides.push((lang, text.to_string())),
                    None if self.title.is_none() => self.title = Some(rest.trim().to_string()),
                    None => {}
                }
                return;
            }
        }

        if trimmed.is_empty() || trimmed == "---" {
            return;
        }

        match &mut self.current {
            Current::Dropped => {}
            Current::Chunk(draft) => {
                if let Some(decision) = trimmed.strip_prefix('>') {
                    let decision = decision.trim();
                    if !decision.is_empty() {
                        draft.decisions.push(TaggedLine::parse(decision));
                    }
                } else if let Some(link) = trimmed.strip_prefix("->") {
                    match parse_link(link) {
                        Ok(link) => draft.links.push(link),
                        Err(e) => {
                            tracing::warn!(line = line_no, error = %e, "dropping link");
                            self.skipped.push(ParseIssue {
                                line: line_no,
                                kind: IssueKind::Link,
                                message: e.to_string(),
                            });
                        }
                    }
                } else if let Some(captures) = hash_comment().captures(trimmed) {
                    draft.stored_hash = captures.get(1).map(|m| m.as_str().to_lowercase());
                } else {
                    draft.description.push(TaggedLine::parse(trimmed));
                }
            }
            Current::None => match self.section {
                Section::Summary => self.summary.push(TaggedLine::parse(trimmed)),
                Section::Motivation => self.motivation.push(TaggedLine::parse(trimmed)),
                _ => {}
            },
        }
    }

    /// Content inside code fences is kept verbatim as neutral text
    fn push_content(&mut self, line: TaggedLine) {
        match &mut self.current {
            Current::Chunk(draft) => draft.description.push(line),
            Current::Dropped => {}
            Current::None => match self.section {
                Section::Summary => self.summary.push(line),
                Section::Motivation => self.motivation.push(line),
                _ => {}
            },
        }
    }

    /// @ai:intent Open a chunk from a `### @anchor | Title` header, or drop it when the anchor is bad
    fn start_chunk(&mut self, line_no: usize, header: &str) {
        self.finish_chunk();
        self.section = Section::Chunks;

        let (anchor, title) = match header.split_once(" | ") {
            Some((anchor, title)) => (anchor, title.trim()),
            None => (header, ""),
        };

        match anchor.parse::<AnchorSpec>() {
            // Anchor ids must stay unique within a document
            Ok(anchor) if self.chunks.iter().any(|c| c.anchor == anchor) => {
                tracing::warn!(line = line_no, %anchor, "dropping duplicate chunk");
                self.skipped.push(ParseIssue {
                    line: line_no,
                    kind: IssueKind::Chunk,
                    message: format!("duplicate anchor `{}`", anchor),
                });
                self.current = Current::Dropped;
            }
            Ok(anchor) => {
                self.current = Current::Chunk(ChunkDraft {
                    anchor,
                    title: title.to_string(),
                    title_overrides: Vec::new(),
                    description: Vec::new(),
                    decisions: Vec::new(),
                    links: Vec::new(),
                    stored_hash: None,
                });
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "dropping chunk");
                self.skipped.push(ParseIssue {
                    line: line_no,
                    kind: IssueKind::Chunk,
                    message: e.to_string(),
                });
                self.current = Current::Dropped;
            }
        }
    }

    fn finish_chunk(&mut self) {
        let Current::Chunk(draft) = std::mem::replace(&mut self.current, Current::None) else {
            return;
        };

        let title = pick_override(&draft.title_overrides, self.lang)
            .unwrap_or(draft.title);

        self.chunks.push(Chunk {
            anchor: draft.anchor,
            title,
            description: select_text(&draft.description, self.lang, self.default_lang),
            decisions: select_lines(&draft.decisions, self.lang, self.default_lang)
                .into_iter()
                .map(str::to_string)
                .collect(),
            links: draft.links,
            stored_hash: draft.stored_hash,
        });
    }

    /// @ai:intent Requested-language override, else the primary heading, else the default-language override
    fn title(&self) -> String {
        pick_override(&self.title_overrides, self.lang)
            .or_else(|| self.title.clone())
            .or_else(|| pick_override(&self.title_overrides, self.default_lang))
            .unwrap_or_default()
    }
}

fn pick_override(overrides: &[(String, String)], lang: &str) -> Option<String> {
    overrides
        .iter()
        .find(|(code, _)| code == lang)
        .map(|(_, text)| text.clone())
}

/// @ai:intent Parse `target | reason` from a link line
/// @ai:effects pure
fn parse_link(raw: &str) -> Result<Link> {
    let (target, reason) = match raw.split_once(" | ") {
        Some((target, reason)) => (target, reason.trim()),
        None => (raw, ""),
    };
    let target: LinkTarget = target.trim().parse()?;
    Ok(Link {
        target: target.to_string(),
        reason: reason.to_string(),
    })
}
