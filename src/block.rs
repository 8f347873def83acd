//! @ai:module:intent Detect how a code block is delimited and find where it ends
//! @ai:module:layer domain
//! @ai:module:public_api BlockStyle, block_end
//! @ai:module:stateless true

/// @ai:intent Block delimiting strategies, chosen from the opening line rather than the language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }` bodies, ended when brace depth returns to zero
    Braces,
    /// `:` headers, ended when indentation returns to the header's level
    Indentation,
    /// Declarations without a body, or one-liners
    SingleLine,
}

/// How many lines a declaration header may span before we give up on finding its body
const MAX_HEADER_LINES: usize = 32;

/// Tokens that continue a header onto the next line
const CONTINUATIONS: &[&str] = &[
    "where", "->", ":", "throws", "extends", "implements", "with", "=>", ")", "|",
];

/// @ai:intent Strips string literals and comments from code, carrying state across lines
#[derive(Debug, Default)]
struct Scanner {
    block_comment: bool,
    triple_quote: Option<char>,
}

impl Scanner {
    /// @ai:intent Return the code characters of a line, without literals or comments
    /// @ai:effects pure
    fn code_of(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.block_comment {
                if c == '*' && next == Some('/') {
                    self.block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if let Some(quote) = self.triple_quote {
                if is_triple(&chars, i, quote) {
                    self.triple_quote = None;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }

            match c {
                '/' if next == Some('/') => break,
                '/' if next == Some('*') => {
                    self.block_comment = true;
                    i += 2;
                }
                '#' if starts_hash_comment(&chars, i) => break,
                '"' | '\'' if is_triple(&chars, i, c) => {
                    self.triple_quote = Some(c);
                    i += 3;
                }
                '"' | '`' => i = skip_literal(&chars, i, c),
                '\'' => {
                    // Lifetimes and labels (`&'a`, `<'a>`) are not literals
                    let prev = if i > 0 { Some(chars[i - 1]) } else { None };
                    let lifetime = prev.map_or(false, |p| p == '&' || p == '<');
                    let closes = chars[i + 1..].contains(&'\'');
                    if lifetime || !closes {
                        out.push(c);
                        i += 1;
                    } else {
                        i = skip_literal(&chars, i, c);
                    }
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        out
    }
}

/// Preprocessor directives that begin with `#` but are code
const DIRECTIVES: &[&str] = &[
    "include", "define", "undef", "if", "ifdef", "ifndef", "elif", "else", "endif", "pragma",
    "error", "import", "region", "endregion",
];

/// `#` opens a comment unless it starts an attribute (`#[`, `#![`), a shebang,
/// a preprocessor directive, or sits inside an identifier or member access (`this.#x`)
fn starts_hash_comment(chars: &[char], i: usize) -> bool {
    let next = chars.get(i + 1).copied();
    if matches!(next, Some('[') | Some('!')) {
        return false;
    }

    if i > 0 {
        let prev = chars[i - 1];
        if prev.is_alphanumeric() || prev == '_' || prev == '.' || prev == '$' {
            return false;
        }
    }

    if chars[..i].iter().all(|c| c.is_whitespace()) {
        let word: String = chars[i + 1..]
            .iter()
            .skip_while(|c| **c == ' ' || **c == '\t')
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if DIRECTIVES.contains(&word.as_str()) {
            return false;
        }
    }

    true
}

fn is_triple(chars: &[char], i: usize, quote: char) -> bool {
    chars.len() >= i + 3 && chars[i..i + 3].iter().all(|&c| c == quote)
}

/// Index just past the literal opened at `start`, or the end of the line
fn skip_literal(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// @ai:intent Count leading indentation, tabs as four columns
/// @ai:effects pure
pub fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn starts_with_continuation(line: &str) -> bool {
    CONTINUATIONS.iter().any(|k| line.starts_with(k))
}

fn next_non_blank<'a>(lines: &[&'a str], from: usize) -> Option<&'a str> {
    lines[from.min(lines.len())..]
        .iter()
        .copied()
        .find(|l| !l.trim().is_empty())
}

/// @ai:intent Walk a declaration header and report its body style plus the header's last line
/// @ai:pre start < lines.len()
/// @ai:effects pure
fn scan_header(lines: &[&str], start: usize) -> (BlockStyle, usize) {
    let mut scanner = Scanner::default();
    let mut depth: i32 = 0;

    let end = lines.len().min(start + MAX_HEADER_LINES);
    for idx in start..end {
        let code = scanner.code_of(lines[idx]);

        for c in code.chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = (depth - 1).max(0),
                '{' if depth == 0 => return (BlockStyle::Braces, idx),
                ';' if depth == 0 => return (BlockStyle::SingleLine, idx),
                _ => {}
            }
        }

        if depth > 0 || scanner.triple_quote.is_some() || scanner.block_comment {
            continue;
        }

        let trimmed = code.trim_end();
        if trimmed.ends_with(':') {
            return (BlockStyle::Indentation, idx);
        }

        let continued = ["=>", "->", ",", "=", "("]
            .iter()
            .any(|tail| trimmed.ends_with(tail))
            || (idx > start && starts_with_continuation(trimmed.trim_start()));
        let next = next_non_blank(lines, idx + 1).map(str::trim_start);

        match next {
            Some(n) if n.starts_with('{') => return (BlockStyle::Braces, idx + 1),
            Some(n) if continued || starts_with_continuation(n) => continue,
            _ => return (BlockStyle::SingleLine, idx),
        }
    }

    (BlockStyle::SingleLine, start)
}

/// @ai:intent Detect the block style opened by the line at `start`
/// @ai:effects pure
pub fn detect_style(lines: &[&str], start: usize) -> BlockStyle {
    if start >= lines.len() {
        return BlockStyle::SingleLine;
    }
    scan_header(lines, start).0
}

/// @ai:intent Check whether a single line ends by opening a block (`{` or `:`)
/// @ai:example ("if retries > 3:") -> true
/// @ai:example ("retries += 1") -> false
/// @ai:effects pure
pub fn opens_block(line: &str) -> bool {
    let code = Scanner::default().code_of(line);
    let trimmed = code.trim_end();
    trimmed.ends_with('{') || trimmed.ends_with(':')
}

/// @ai:intent Find the last line (0-indexed, inclusive) of the block opened at `start`
/// @ai:pre start < lines.len()
/// @ai:post result >= start and result < lines.len()
/// @ai:effects pure
pub fn block_end(lines: &[&str], start: usize) -> usize {
    if start >= lines.len() {
        return lines.len().saturating_sub(1);
    }

    match scan_header(lines, start) {
        (BlockStyle::SingleLine, header_end) => header_end,
        (BlockStyle::Braces, _) => brace_end(lines, start),
        (BlockStyle::Indentation, header_end) => indent_end(lines, start, header_end),
    }
}

/// @ai:intent Follow brace depth from the header until the body closes
/// @ai:effects pure
fn brace_end(lines: &[&str], start: usize) -> usize {
    let mut scanner = Scanner::default();
    let mut parens: i32 = 0;
    let mut braces: i32 = 0;
    let mut opened = false;

    for (idx, line) in lines.iter().enumerate().skip(start) {
        for c in scanner.code_of(line).chars() {
            match c {
                // Braces inside a parameter list (`f(x = {})`) belong to the header
                '(' | '[' if !opened => parens += 1,
                ')' | ']' if !opened => parens = (parens - 1).max(0),
                '{' if opened || parens == 0 => {
                    braces += 1;
                    opened = true;
                }
                '}' if opened => {
                    braces -= 1;
                    if braces <= 0 {
                        return idx;
                    }
                }
                _ => {}
            }
        }
    }

    lines.len() - 1
}

/// @ai:intent Extend the block while lines stay deeper than the header's indentation
/// @ai:effects pure
fn indent_end(lines: &[&str], start: usize, header_end: usize) -> usize {
    let baseline = indent_of(lines[start]);
    let mut scanner = Scanner::default();
    let mut last = header_end;

    for (idx, line) in lines.iter().enumerate().skip(header_end + 1) {
        if scanner.triple_quote.is_some() {
            scanner.code_of(line);
            last = idx;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if indent_of(line) <= baseline {
            // Dedented comments do not close a Python body
            if trimmed.starts_with('#') {
                continue;
            }
            break;
        }

        scanner.code_of(line);
        last = idx;
    }

    last
}
