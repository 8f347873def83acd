//! @ai:module:intent Parse textual anchor references into a closed set of anchor kinds
//! @ai:module:layer domain
//! @ai:module:public_api AnchorSpec, LinkTarget
//! @ai:module:depends_on error
//! @ai:module:stateless true

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// @ai:intent A symbolic reference to a code location or to a code-less concept
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnchorSpec {
    Function { name: String },
    Class { name: String },
    Method { class: String, method: String },
    Pattern { text: String },
    Line { start: usize, end: usize },
    Chunk { id: String },
}

impl AnchorSpec {
    /// @ai:intent Check whether the anchor refers to a concept rather than to code
    pub fn is_virtual(&self) -> bool {
        matches!(self, AnchorSpec::Chunk { .. })
    }

    /// @ai:intent Short kind name as written in anchor syntax
    pub fn kind(&self) -> &'static str {
        match self {
            AnchorSpec::Function { .. } => "function",
            AnchorSpec::Class { .. } => "class",
            AnchorSpec::Method { .. } => "method",
            AnchorSpec::Pattern { .. } => "pattern",
            AnchorSpec::Line { .. } => "line",
            AnchorSpec::Chunk { .. } => "chunk",
        }
    }
}

impl fmt::Display for AnchorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorSpec::Function { name } => write!(f, "@function:{}", name),
            AnchorSpec::Class { name } => write!(f, "@class:{}", name),
            AnchorSpec::Method { class, method } => write!(f, "@method:{}.{}", class, method),
            AnchorSpec::Pattern { text } => write!(f, "@pattern:{}", text),
            AnchorSpec::Line { start, end } if start == end => write!(f, "@line:{}", start),
            AnchorSpec::Line { start, end } => write!(f, "@line:{}-{}", start, end),
            AnchorSpec::Chunk { id } => write!(f, "@chunk:{}", id),
        }
    }
}

/// @ai:intent Parse anchor syntax such as `@function:handle` or `@line:10-20`
/// @ai:example ("@function:handle") -> Function { name: "handle" }
/// @ai:example ("@method:Router.dispatch") -> Method { class: "Router", method: "dispatch" }
/// @ai:example ("@bogus:x") -> Err(InvalidAnchor)
/// @ai:effects pure
impl FromStr for AnchorSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = |message: &str| Error::InvalidAnchor {
            anchor: raw.to_string(),
            message: message.to_string(),
        };

        let body = raw
            .strip_prefix('@')
            .ok_or_else(|| invalid("anchors start with `@`"))?;
        let (kind, value) = body
            .split_once(':')
            .ok_or_else(|| invalid("expected `@kind:value`"))?;

        // Patterns keep their inner whitespace, everything else is an identifier
        let value = if kind == "pattern" { value } else { value.trim() };
        if value.trim().is_empty() {
            return Err(invalid("empty anchor value"));
        }

        match kind {
            "function" => Ok(AnchorSpec::Function {
                name: identifier(value).ok_or_else(|| invalid("not an identifier"))?,
            }),
            "class" => Ok(AnchorSpec::Class {
                name: identifier(value).ok_or_else(|| invalid("not an identifier"))?,
            }),
            "method" => {
                let (class, method) = value
                    .split_once("::")
                    .or_else(|| value.rsplit_once('.'))
                    .ok_or_else(|| invalid("expected `Class.method`"))?;
                Ok(AnchorSpec::Method {
                    class: identifier(class).ok_or_else(|| invalid("bad class name"))?,
                    method: identifier(method).ok_or_else(|| invalid("bad method name"))?,
                })
            }
            "pattern" => Ok(AnchorSpec::Pattern {
                text: value.to_string(),
            }),
            "line" | "lines" => {
                let (start, end) = match value.split_once('-') {
                    Some((start, end)) => (start.trim(), end.trim()),
                    None => (value, value),
                };
                let start: usize = start.parse().map_err(|_| invalid("bad start line"))?;
                let end: usize = end.parse().map_err(|_| invalid("bad end line"))?;
                if start == 0 || end < start {
                    return Err(invalid("line range must be 1-indexed and ascending"));
                }
                Ok(AnchorSpec::Line { start, end })
            }
            "chunk" => Ok(AnchorSpec::Chunk {
                id: value.to_string(),
            }),
            other => Err(invalid(&format!("unknown anchor kind `{}`", other))),
        }
    }
}

fn identifier(value: &str) -> Option<String> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    valid.then(|| value.to_string())
}

/// @ai:intent Target of a chunk link, optionally qualified with another file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub file: Option<String>,
    pub anchor: AnchorSpec,
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}{}", file, self.anchor),
            None => write!(f, "{}", self.anchor),
        }
    }
}

/// @ai:intent Parse `@anchor` or `file@anchor` link targets
/// @ai:example ("b.py@function:helper") -> LinkTarget { file: Some("b.py"), .. }
/// @ai:effects pure
impl FromStr for LinkTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let at = raw.find('@').ok_or_else(|| Error::InvalidAnchor {
            anchor: raw.to_string(),
            message: "link target has no anchor".to_string(),
        })?;

        let file = raw[..at].trim();
        let anchor = raw[at..].parse()?;

        Ok(LinkTarget {
            file: (!file.is_empty()).then(|| file.to_string()),
            anchor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_kind() {
        assert_eq!(
            "@function:handle".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Function {
                name: "handle".to_string()
            }
        );
        assert_eq!(
            "@class:Router".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Class {
                name: "Router".to_string()
            }
        );
        assert_eq!(
            "@method:Router::dispatch".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Method {
                class: "Router".to_string(),
                method: "dispatch".to_string()
            }
        );
        assert_eq!(
            "@pattern:if retries > 3".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Pattern {
                text: "if retries > 3".to_string()
            }
        );
        assert_eq!(
            "@line:4-9".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Line { start: 4, end: 9 }
        );
        assert_eq!(
            "@line:7".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Line { start: 7, end: 7 }
        );
        assert_eq!(
            "@chunk:overview".parse::<AnchorSpec>().unwrap(),
            AnchorSpec::Chunk {
                id: "overview".to_string()
            }
        );
    }

    #[test]
    fn test_display_is_canonical_syntax() {
        for raw in [
            "@function:handle",
            "@method:Router.dispatch",
            "@line:3-5",
            "@line:3",
            "@chunk:why",
        ] {
            assert_eq!(raw.parse::<AnchorSpec>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_rejects_malformed_anchors() {
        for raw in [
            "function:handle",
            "@function",
            "@function:",
            "@bogus:x",
            "@method:nodot",
            "@line:9-3",
            "@line:0-3",
            "@line:a-b",
            "@function:has space",
        ] {
            assert!(raw.parse::<AnchorSpec>().is_err(), "accepted {}", raw);
        }
    }

    #[test]
    fn test_link_targets() {
        let local: LinkTarget = "@class:Router".parse().unwrap();
        assert_eq!(local.file, None);
        assert_eq!(local.to_string(), "@class:Router");

        let remote: LinkTarget = "src/b.py@function:helper".parse().unwrap();
        assert_eq!(remote.file.as_deref(), Some("src/b.py"));
        assert_eq!(remote.to_string(), "src/b.py@function:helper");

        assert!("no-anchor-here".parse::<LinkTarget>().is_err());
    }
}
