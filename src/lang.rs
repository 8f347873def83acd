//! @ai:module:intent Split language-tagged lines and pick the lines for a requested language
//! @ai:module:layer domain
//! @ai:module:public_api TaggedLine, split_tag, select_lines
//! @ai:module:stateless true

use regex::Regex;
use std::sync::OnceLock;

/// @ai:intent A content line with its optional language tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub lang: Option<String>,
    pub text: String,
}

impl TaggedLine {
    pub fn parse(line: &str) -> Self {
        match split_tag(line) {
            Some((lang, text)) => Self {
                lang: Some(lang),
                text: text.to_string(),
            },
            None => Self {
                lang: None,
                text: line.trim().to_string(),
            },
        }
    }
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(r"^\s*([a-z]{2}(?:-[a-zA-Z0-9]{2})?):\s+(.*)$").expect("valid tag regex")
    })
}

/// @ai:intent Split `"<lang>: text"` into its code and text
/// @ai:example ("fr: Bonjour") -> Some(("fr", "Bonjour"))
/// @ai:example ("Note: plain") -> None
/// @ai:effects pure
pub fn split_tag(line: &str) -> Option<(String, &str)> {
    let captures = tag_regex().captures(line)?;
    let lang = captures.get(1)?.as_str().to_lowercase();
    let text = captures.get(2)?.as_str().trim();
    Some((lang, text))
}

/// @ai:intent Resolve a block of lines into one language
/// @ai:post neutral lines are always kept, in original order
/// @ai:post lines tagged `lang` are kept when any exist, otherwise lines tagged `default_lang`
/// @ai:effects pure
pub fn select_lines<'a>(
    lines: &'a [TaggedLine],
    lang: &str,
    default_lang: &str,
) -> Vec<&'a str> {
    let has = |code: &str| lines.iter().any(|l| l.lang.as_deref() == Some(code));

    let chosen = if has(lang) { lang } else { default_lang };

    lines
        .iter()
        .filter(|l| match l.lang.as_deref() {
            None => true,
            Some(code) => code == chosen,
        })
        .map(|l| l.text.as_str())
        .collect()
}

/// @ai:intent Resolve a block of lines into one language and join them
/// @ai:effects pure
pub fn select_text(lines: &[TaggedLine], lang: &str, default_lang: &str) -> String {
    select_lines(lines, lang, default_lang).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lines: &[&str]) -> Vec<TaggedLine> {
        lines.iter().map(|l| TaggedLine::parse(l)).collect()
    }

    #[test]
    fn test_split_tag() {
        assert_eq!(split_tag("fr: Bonjour"), Some(("fr".to_string(), "Bonjour")));
        assert_eq!(split_tag("pt-br: Olá"), Some(("pt-br".to_string(), "Olá")));
        assert_eq!(split_tag("Note: not a tag"), None);
        assert_eq!(split_tag("PT-BR: Olá"), None);
        assert_eq!(split_tag("zh-hant: 你好"), None);
        assert_eq!(split_tag("fr:nospace"), None);
        assert_eq!(split_tag("plain text"), None);
    }

    #[test]
    fn test_fallback_to_default_language() {
        let lines = block(&["en: English line", "Neutral line"]);

        assert_eq!(
            select_lines(&lines, "fr", "en"),
            vec!["English line", "Neutral line"]
        );
        assert_eq!(
            select_lines(&lines, "en", "en"),
            vec!["English line", "Neutral line"]
        );
    }

    #[test]
    fn test_requested_language_replaces_default() {
        let lines = block(&["en: Hello", "fr: Bonjour", "Shared"]);

        assert_eq!(select_lines(&lines, "fr", "en"), vec!["Bonjour", "Shared"]);
        assert_eq!(select_text(&lines, "de", "en"), "Hello\nShared");
    }

    #[test]
    fn test_manifest_default_language_is_honoured() {
        let lines = block(&["en: Hello", "fr: Bonjour"]);
        assert_eq!(select_lines(&lines, "de", "fr"), vec!["Bonjour"]);
    }
}
