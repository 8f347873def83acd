//! @ai:module:intent Locate an anchor inside one source text and fingerprint the region
//! @ai:module:layer application
//! @ai:module:public_api resolve_anchor, resolve_anchor_with, fingerprint, HashPolicy
//! @ai:module:depends_on anchor, block, intent
//! @ai:module:stateless true

use crate::anchor::AnchorSpec;
use crate::block::{block_end, opens_block};
use crate::intent::AnchorResult;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest
pub const HASH_LEN: usize = 16;

/// Words that can precede a call but never name a return type
const NOT_A_TYPE: &[&str] = &[
    "return", "await", "new", "throw", "yield", "else", "case", "if", "elif", "while", "for",
    "not", "and", "or", "in", "is", "assert", "print", "delete", "typeof", "go", "defer",
];

/// @ai:intent How resolved content is normalized before hashing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Trim leading and trailing blank lines only
    #[default]
    Trimmed,
    /// Also trim every line, drop blank lines and collapse whitespace runs
    Normalized,
}

impl HashPolicy {
    /// @ai:intent Apply the policy to extracted content
    /// @ai:effects pure
    pub fn normalize(&self, content: &str) -> String {
        let lines: Vec<&str> = content.lines().collect();
        let first = lines.iter().position(|l| !l.trim().is_empty());
        let last = lines.iter().rposition(|l| !l.trim().is_empty());

        let (first, last) = match (first, last) {
            (Some(first), Some(last)) => (first, last),
            _ => return String::new(),
        };
        let kept = &lines[first..=last];

        match self {
            HashPolicy::Trimmed => kept.join("\n"),
            HashPolicy::Normalized => kept
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// @ai:intent Deterministic fingerprint of region content
/// @ai:post identical content and policy always give the identical hash
/// @ai:example ("") -> "e3b0c44298fc1c14"
/// @ai:effects pure
pub fn fingerprint(content: &str, policy: HashPolicy) -> String {
    let digest = Sha256::digest(policy.normalize(content).as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex.truncate(HASH_LEN);
    hex
}

/// @ai:intent Resolve an anchor against source text with the default hash policy
/// @ai:effects pure
pub fn resolve_anchor(spec: &AnchorSpec, source: &str) -> AnchorResult {
    resolve_anchor_with(spec, source, HashPolicy::default())
}

/// @ai:intent Resolve an anchor against source text
/// @ai:pre source is the full text of one file
/// @ai:post found == false means the anchor is obsolete in this file, never an error
/// @ai:post start_line and end_line are 1-indexed and inclusive
/// @ai:effects pure
pub fn resolve_anchor_with(spec: &AnchorSpec, source: &str, policy: HashPolicy) -> AnchorResult {
    let lines: Vec<&str> = source.lines().collect();

    let range = match spec {
        AnchorSpec::Function { name } => find_function(&lines, name, 0, lines.len()),
        AnchorSpec::Class { name } => find_class(&lines, name),
        AnchorSpec::Method { class, method } => find_method(&lines, class, method),
        AnchorSpec::Pattern { text } => find_pattern(&lines, text),
        AnchorSpec::Line { start, end } => clamp_lines(lines.len(), *start, *end),
        AnchorSpec::Chunk { .. } => {
            return AnchorResult {
                found: true,
                start_line: None,
                end_line: None,
                content: String::new(),
                hash: fingerprint("", policy),
            };
        }
    };

    match range {
        Some((start, end)) => {
            let content = lines[start..=end].join("\n");
            AnchorResult {
                found: true,
                start_line: Some(start + 1),
                end_line: Some(end + 1),
                hash: fingerprint(&content, policy),
                content,
            }
        }
        None => AnchorResult::not_found(),
    }
}

/// @ai:intent Declaration shapes for functions and procedures named `name`
/// @ai:effects pure
fn function_patterns(name: &str) -> Vec<String> {
    let n = regex::escape(name);
    vec![
        // def / fun (Python, Ruby, Kotlin)
        format!(
            r"^\s*(?:(?:export|default|async|public|private|protected|internal|static|override|suspend|inline)\s+)*(?:def|fun)\s+(?:self\.)?{n}\b"
        ),
        // function declarations (JavaScript, TypeScript, PHP, Lua)
        format!(
            r"^\s*(?:(?:export|default|async|public|private|protected|static|local)\s+)*function\s*\*?\s*{n}\s*[(<]"
        ),
        // assignment-style: const/let/var name = (...) => / function
        format!(
            r"^\s*(?:export\s+)?(?:const|let|var)\s+{n}\s*(?::[^=]*)?=\s*(?:async\s+)?(?:function\b|\(|[A-Za-z_$][\w$]*\s*=>)"
        ),
        // Rust
        format!(
            r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|default)\s+)*(?:extern\s+"[^"]*"\s+)?fn\s+{n}\s*[(<]"#
        ),
        // Go, with an optional receiver
        format!(r"^\s*func\s+(?:\([^)]*\)\s*)?{n}\s*[(\[]"),
        // class-body shorthand: name(args) {
        format!(
            r"^\s*(?:(?:public|private|protected|static|async|override|readonly|get|set)\s+)*\*?{n}\s*\([^;]*\)\s*(?::\s*[^{{;=]+)?\{{\s*$"
        ),
    ]
}

/// Typed declarations (`public void name(...) {`), whose return type must not be a keyword
fn typed_declaration(name: &str) -> String {
    let n = regex::escape(name);
    format!(
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|override|virtual|inline|extern|const)\s+)*([\w<>\[\],.?*&:]+)\s+[*&]?{n}\s*\([^;]*$"
    )
}

/// @ai:intent Declaration shape for classes and other named type bodies
/// @ai:effects pure
fn class_pattern(name: &str) -> String {
    let n = regex::escape(name);
    format!(
        r"^\s*(?:(?:export|default|public|private|protected|internal|abstract|final|sealed|static|data|partial|open|enum|pub(?:\([^)]*\))?)\s+)*(?:class|struct|interface|trait|enum|object|record|module|impl(?:<[^>]*>)?(?:\s+[\w:<>, ]+\s+for)?)\s+{n}\b"
    )
}

fn compile(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(error = %e, "skipping invalid declaration pattern");
                None
            }
        })
        .collect()
}

/// @ai:intent First function declaration named `name` within lines[from..to]
/// @ai:post range is clamped to `to`
/// @ai:effects pure
fn find_function(lines: &[&str], name: &str, from: usize, to: usize) -> Option<(usize, usize)> {
    let shapes = compile(&function_patterns(name));
    let typed = Regex::new(&typed_declaration(name)).ok();

    let is_declaration = |line: &str| {
        shapes.iter().any(|re| re.is_match(line))
            || typed.as_ref().is_some_and(|re| {
                re.captures(line)
                    .and_then(|c| c.get(1))
                    .is_some_and(|ty| !NOT_A_TYPE.contains(&ty.as_str()))
            })
    };

    let start = (from..to.min(lines.len())).find(|&idx| is_declaration(lines[idx]))?;
    let end = block_end(lines, start).min(to.saturating_sub(1)).max(start);
    Some((start, end))
}

/// @ai:intent Every class region named `name`, in file order
/// @ai:effects pure
fn class_regions(lines: &[&str], name: &str) -> Vec<(usize, usize)> {
    let Ok(re) = Regex::new(&class_pattern(name)) else {
        return Vec::new();
    };

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| re.is_match(line))
        .map(|(idx, _)| (idx, block_end(lines, idx)))
        .collect()
}

fn find_class(lines: &[&str], name: &str) -> Option<(usize, usize)> {
    class_regions(lines, name).into_iter().next()
}

/// @ai:intent Find `method` inside the first `class` region that declares it
/// @ai:effects pure
fn find_method(lines: &[&str], class: &str, method: &str) -> Option<(usize, usize)> {
    class_regions(lines, class)
        .into_iter()
        .filter(|(start, end)| end > start)
        .find_map(|(start, end)| find_function(lines, method, start + 1, end + 1))
}

/// @ai:intent First line containing `text`, widened to its block when the line opens one
/// @ai:effects pure
fn find_pattern(lines: &[&str], text: &str) -> Option<(usize, usize)> {
    let start = lines.iter().position(|line| line.contains(text))?;
    let end = if opens_block(lines[start]) {
        block_end(lines, start)
    } else {
        start
    };
    Some((start, end))
}

/// @ai:intent Clamp a 1-indexed inclusive range to the file, as 0-indexed bounds
/// @ai:effects pure
fn clamp_lines(total: usize, start: usize, end: usize) -> Option<(usize, usize)> {
    let start = start.max(1);
    if total == 0 || start > total {
        return None;
    }
    let end = end.max(start).min(total);
    Some((start - 1, end - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PY: &str = "import os\n\n\nclass Handler:\n    def __init__(self):\n        self.x = 1\n\n    def handle(self, x):\n        if x:\n            return x\n        return None\n\n\ndef handle(x):\n    return x * 2\n";

    fn function(name: &str) -> AnchorSpec {
        AnchorSpec::Function {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_python_function() {
        let result = resolve_anchor(&function("handle"), PY);
        // The method inside Handler comes first in the file
        assert!(result.found);
        assert_eq!(result.start_line, Some(8));
        assert_eq!(result.end_line, Some(11));
        assert!(result.content.starts_with("    def handle(self, x):"));
    }

    #[test]
    fn test_python_class_and_method() {
        let class = resolve_anchor(
            &AnchorSpec::Class {
                name: "Handler".to_string(),
            },
            PY,
        );
        assert_eq!((class.start_line, class.end_line), (Some(4), Some(11)));

        let method = resolve_anchor(
            &AnchorSpec::Method {
                class: "Handler".to_string(),
                method: "__init__".to_string(),
            },
            PY,
        );
        assert_eq!((method.start_line, method.end_line), (Some(5), Some(6)));
    }

    #[test]
    fn test_hash_comment_after_python_header() {
        let src = "def handle(x):  #noqa\n    y = x\n    return y\n\nz = 1\n";
        let result = resolve_anchor(&function("handle"), src);
        assert_eq!((result.start_line, result.end_line), (Some(1), Some(3)));

        // Body edits must change the fingerprint
        let edited = resolve_anchor(&function("handle"), &src.replace("return y", "return y + 1"));
        assert_ne!(result.hash, edited.hash);

        let class = resolve_anchor(
            &AnchorSpec::Class {
                name: "Handler".to_string(),
            },
            "class Handler:  #type: ignore\n    x = 1\n    y = 2\n\nz = 3\n",
        );
        assert_eq!((class.start_line, class.end_line), (Some(1), Some(3)));
    }

    #[test]
    fn test_multiline_bodiless_declarations() {
        let arrow = resolve_anchor(
            &function("double"),
            "const double = (x) =>\n  x * 2;\n\nconst other = 1;\n",
        );
        assert_eq!((arrow.start_line, arrow.end_line), (Some(1), Some(2)));

        let abstract_method = resolve_anchor(
            &function("handle"),
            "interface Svc {\n    int handle(\n        int x,\n        int y);\n}\n",
        );
        assert_eq!(
            (abstract_method.start_line, abstract_method.end_line),
            (Some(2), Some(4))
        );
    }

    #[test]
    fn test_method_outside_class_is_not_found() {
        let src = "class A:\n    def a(self):\n        pass\n\ndef b():\n    pass\n";
        let result = resolve_anchor(
            &AnchorSpec::Method {
                class: "A".to_string(),
                method: "b".to_string(),
            },
            src,
        );
        assert!(!result.found);
        assert_eq!(result.range(), None);
    }

    #[test]
    fn test_javascript_declaration_styles() {
        let src = "// utils\nexport async function load(url) {\n  return fetch(url);\n}\n\nconst parse = (text) => {\n  return JSON.parse(text);\n};\n\nlet twice = x => x * 2;\n";

        let load = resolve_anchor(&function("load"), src);
        assert_eq!((load.start_line, load.end_line), (Some(2), Some(4)));

        let parse = resolve_anchor(&function("parse"), src);
        assert_eq!((parse.start_line, parse.end_line), (Some(6), Some(8)));

        let twice = resolve_anchor(&function("twice"), src);
        assert_eq!((twice.start_line, twice.end_line), (Some(10), Some(10)));
    }

    #[test]
    fn test_rust_method_in_impl_after_struct() {
        let src = "pub struct Router {\n    routes: Vec<String>,\n}\n\nimpl Router {\n    pub fn dispatch(&self, path: &str) -> bool {\n        self.routes.iter().any(|r| r == path)\n    }\n}\n";
        let result = resolve_anchor(
            &AnchorSpec::Method {
                class: "Router".to_string(),
                method: "dispatch".to_string(),
            },
            src,
        );
        assert_eq!((result.start_line, result.end_line), (Some(6), Some(8)));
    }

    #[test]
    fn test_typed_declaration_skips_call_sites() {
        let src = "class Svc {\n    void run() {\n        return handle(x);\n    }\n    public int handle(int x) {\n        return x;\n    }\n}\n";
        let result = resolve_anchor(&function("handle"), src);
        assert_eq!((result.start_line, result.end_line), (Some(5), Some(7)));
    }

    #[test]
    fn test_similar_names_do_not_match() {
        let src = "def handle_all(x):\n    pass\n";
        assert!(!resolve_anchor(&function("handle"), src).found);
    }

    #[test]
    fn test_pattern_single_line_and_block() {
        let src = "x = 1\nif x > 0:\n    y = 2\n    z = 3\nprint(x)\n";
        let single = resolve_anchor(
            &AnchorSpec::Pattern {
                text: "x = 1".to_string(),
            },
            src,
        );
        assert_eq!((single.start_line, single.end_line), (Some(1), Some(1)));

        let block = resolve_anchor(
            &AnchorSpec::Pattern {
                text: "if x > 0".to_string(),
            },
            src,
        );
        assert_eq!((block.start_line, block.end_line), (Some(2), Some(4)));

        let missing = resolve_anchor(
            &AnchorSpec::Pattern {
                text: "nowhere".to_string(),
            },
            src,
        );
        assert!(!missing.found);
    }

    #[test]
    fn test_line_ranges() {
        let src = "a\nb\nc\nd\n";
        let exact = resolve_anchor(&AnchorSpec::Line { start: 2, end: 3 }, src);
        assert!(exact.found);
        assert_eq!((exact.start_line, exact.end_line), (Some(2), Some(3)));
        assert_eq!(exact.content, "b\nc");

        let clamped = resolve_anchor(&AnchorSpec::Line { start: 3, end: 99 }, src);
        assert_eq!((clamped.start_line, clamped.end_line), (Some(3), Some(4)));

        let past_end = resolve_anchor(&AnchorSpec::Line { start: 5, end: 6 }, src);
        assert!(!past_end.found);
    }

    #[test]
    fn test_virtual_chunk_anchor() {
        let result = resolve_anchor(
            &AnchorSpec::Chunk {
                id: "overview".to_string(),
            },
            "",
        );
        assert!(result.found);
        assert_eq!(result.range(), None);
        assert!(result.content.is_empty());
    }

    #[test]
    fn test_fingerprint_policies() {
        let a = "\n\n    def f():\n        return 1\n\n";
        let b = "    def f():\n        return 1";
        let c = "def f():\n    return   1";

        assert_eq!(fingerprint(a, HashPolicy::Trimmed), fingerprint(b, HashPolicy::Trimmed));
        assert_ne!(fingerprint(b, HashPolicy::Trimmed), fingerprint(c, HashPolicy::Trimmed));
        assert_eq!(
            fingerprint(b, HashPolicy::Normalized),
            fingerprint(c, HashPolicy::Normalized)
        );
        assert_eq!(fingerprint("", HashPolicy::Trimmed), "e3b0c44298fc1c14");
        assert_eq!(fingerprint(b, HashPolicy::Trimmed).len(), HASH_LEN);
    }

    #[test]
    fn test_hash_is_stable_for_same_content() {
        let spec = function("handle");
        let first = resolve_anchor(&spec, PY);
        let second = resolve_anchor(&spec, PY);
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.hash, fingerprint(&first.content, HashPolicy::Trimmed));
    }
}
