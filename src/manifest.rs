//! @ai:module:intent Parse the repository manifest listing intent documents
//! @ai:module:layer application
//! @ai:module:public_api parse_manifest, parse_manifest_with, try_parse_manifest, EntryPolicy
//! @ai:module:depends_on intent, error
//! @ai:module:stateless true

use crate::error::{Error, Result};
use crate::intent::{IntentEntry, IntentStatus, Manifest, SkippedEntry};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_VERSION: u64 = 1;

/// @ai:intent How the parser treats a malformed entry among valid siblings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryPolicy {
    /// Drop the entry and record it in `Manifest::skipped`
    #[default]
    Skip,
    /// Reject the whole manifest
    Strict,
}

/// @ai:intent Parse manifest text with the default (skipping) entry policy
/// @ai:post None for empty, malformed or structurally invalid input
/// @ai:effects pure
pub fn parse_manifest(text: &str) -> Option<Manifest> {
    parse_manifest_with(text, EntryPolicy::default())
}

/// @ai:intent Parse manifest text, failing softly with None
/// @ai:effects pure
pub fn parse_manifest_with(text: &str, policy: EntryPolicy) -> Option<Manifest> {
    match try_parse_manifest(text, policy) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::debug!(error = %e, "manifest rejected");
            None
        }
    }
}

/// @ai:intent Parse manifest text and report why it was rejected
/// @ai:pre text is UTF-8 YAML
/// @ai:post every returned entry has a non-empty id and file, ids are unique
/// @ai:effects pure
pub fn try_parse_manifest(text: &str, policy: EntryPolicy) -> Result<Manifest> {
    if text.trim().is_empty() {
        return Err(Error::Manifest("empty manifest".to_string()));
    }

    let root: Value = serde_yaml::from_str(text)?;
    let root = root
        .as_mapping()
        .ok_or_else(|| Error::Manifest("top level is not a mapping".to_string()))?;

    let version = match get(root, "version") {
        None | Some(Value::Null) => DEFAULT_VERSION,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| Error::Manifest("`version` is not an unsigned integer".to_string()))?,
    };

    let default_lang = match get(root, "default_lang") {
        None | Some(Value::Null) => DEFAULT_LANG.to_string(),
        Some(Value::String(lang)) if !lang.trim().is_empty() => lang.trim().to_lowercase(),
        Some(_) => {
            return Err(Error::Manifest(
                "`default_lang` is not a language code".to_string(),
            ))
        }
    };

    let raw_entries = match get(root, "intents") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.clone(),
        Some(_) => return Err(Error::Manifest("`intents` is not a list".to_string())),
    };

    let mut intents = Vec::with_capacity(raw_entries.len());
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in raw_entries.iter().enumerate() {
        let outcome = parse_entry(raw).and_then(|entry| {
            if seen.insert(entry.id.clone()) {
                Ok(entry)
            } else {
                Err(format!("duplicate id `{}`", entry.id))
            }
        });

        match outcome {
            Ok(entry) => intents.push(entry),
            Err(message) => {
                if policy == EntryPolicy::Strict {
                    return Err(Error::ManifestEntry { index, message });
                }
                tracing::warn!(index, reason = %message, "skipping manifest entry");
                skipped.push(SkippedEntry {
                    index,
                    id: raw
                        .as_mapping()
                        .and_then(|m| get(m, "id"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    reason: message,
                });
            }
        }
    }

    Ok(Manifest {
        version,
        default_lang,
        intents,
        skipped,
    })
}

/// @ai:intent Decode one list-of-maps item into an entry
/// @ai:effects pure
fn parse_entry(raw: &Value) -> std::result::Result<IntentEntry, String> {
    let map = raw
        .as_mapping()
        .ok_or_else(|| "entry is not a mapping".to_string())?;

    let id = required_string(map, "id")?;
    let file = required_string(map, "file")?;
    let status = match get(map, "status") {
        None | Some(Value::Null) => IntentStatus::Active,
        Some(Value::String(status)) => IntentStatus::from(status.as_str()),
        Some(_) => return Err("`status` is not a string".to_string()),
    };

    Ok(IntentEntry { id, file, status })
}

fn required_string(map: &Mapping, key: &str) -> std::result::Result<String, String> {
    match get(map, key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) if key == "id" => Ok(n.to_string()),
        Some(_) => Err(format!("`{}` is not a non-empty string", key)),
        None => Err(format!("missing `{}`", key)),
    }
}

fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
version: 2
default_lang: fr
intents:
  - id: f1
    file: f1.intent.md
    status: active
  - id: f2
    file: f2.intent.md
    status: draft
  - id: f3
    file: f3.intent.md
"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = parse_manifest(MANIFEST).unwrap();

        assert_eq!(manifest.version, 2);
        assert_eq!(manifest.default_lang, "fr");
        assert_eq!(manifest.intents.len(), 3);
        assert_eq!(manifest.intents[1].status, IntentStatus::Draft);
        // status defaults to active
        assert_eq!(manifest.intents[2].status, IntentStatus::Active);

        let active: Vec<_> = manifest.active().map(|e| e.id.as_str()).collect();
        assert_eq!(active, vec!["f1", "f3"]);
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let manifest = parse_manifest("intents: []").unwrap();
        assert_eq!(manifest.version, DEFAULT_VERSION);
        assert_eq!(manifest.default_lang, "en");
        assert!(manifest.intents.is_empty());
    }

    #[test]
    fn test_structural_failures_yield_none() {
        assert!(parse_manifest("").is_none());
        assert!(parse_manifest("   \n").is_none());
        assert!(parse_manifest("- just\n- a list\n").is_none());
        assert!(parse_manifest("version: one\nintents: []").is_none());
        assert!(parse_manifest("intents: nope").is_none());
        assert!(parse_manifest("intents: [unclosed").is_none());
        assert!(parse_manifest("default_lang: [en]").is_none());
    }

    #[test]
    fn test_skip_policy_keeps_siblings() {
        let text = r#"
intents:
  - id: ok
    file: ok.intent.md
  - id: nofile
  - just a string
  - id: ok
    file: dup.intent.md
  - id: ok2
    file: ok2.intent.md
    status: archived
"#;
        let manifest = parse_manifest(text).unwrap();

        let ids: Vec<_> = manifest.intents.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "ok2"]);

        let skipped: Vec<_> = manifest.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3]);
        assert_eq!(manifest.skipped[0].id.as_deref(), Some("nofile"));
        assert!(manifest.skipped[2].reason.contains("duplicate"));
    }

    #[test]
    fn test_strict_policy_rejects_whole_manifest() {
        let text = "intents:\n  - id: a\n    file: a.md\n  - id: b\n";
        assert!(parse_manifest_with(text, EntryPolicy::Strict).is_none());

        let err = try_parse_manifest(text, EntryPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::ManifestEntry { index: 1, .. }));

        assert_eq!(
            parse_manifest_with(text, EntryPolicy::Skip)
                .unwrap()
                .intents
                .len(),
            1
        );
    }
}
