/*!
 * Placeholder protection.
 *
 * Format specifiers, escape sequences, XML comments, CDATA delimiters and
 * configured patterns are swapped for sentinels of the form `__<salt>_<n>__`
 * before text is sent to a provider, and swapped back afterwards. Sentinels
 * contain only digits and underscores so providers tend to leave them alone.
 */

use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ConfigError, RestoreError};

/// Printf-style specifiers: `%s`, `%d`, `%1$s`, `%.2f`, `%%`
static FORMAT_SPECIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%(?:\d+\$)?[-#+0,(]*\d*(?:\.\d+)?[sdifxXeEgGcbhnoS%]").unwrap()
});

/// Android escapes, including `\uXXXX` and a backslash before a line break
static ESCAPE_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\u[0-9a-fA-F]{4}|\\\r?\n|\\[ntrb'"\\@?]"#).unwrap()
});

/// Whole XML comments and the two CDATA delimiters, protected whatever the
/// configured patterns are
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[|\]\]>").unwrap());

/// CDATA delimiters as they appear in a span's original text
pub const CDATA_OPEN: &str = "<![CDATA[";
pub const CDATA_CLOSE: &str = "]]>";

static SENTINEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(\d+)_(\d+)__").unwrap());

/// Patterns protected when the configuration names none
///
/// Inline XML tags, entities, `{0}` / `{name}` style arguments and `[...]` blocks.
pub const DEFAULT_PROTECTED_PATTERNS: &[&str] = &[
    r"</?[A-Za-z][\w:.-]*(?:\s+[\w:.-]+\s*=\s*(?:'[^']*'|\x22[^\x22]*\x22))*\s*/?>",
    r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);",
    r"\{\d+\}",
    r"\{[A-Za-z_][A-Za-z0-9_]*\}",
    r"\[[^\[\]\r\n]*\]",
];

/// What a protected span covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// XML comment or CDATA delimiter
    Markup,
    /// Format specifier such as `%1$s`
    Placeholder,
    /// Escape sequence such as `\n`
    Escape,
    /// Match of a configured pattern
    Regex,
}

impl SpanKind {
    fn priority(&self) -> u8 {
        match self {
            Self::Markup => 0,
            Self::Placeholder => 1,
            Self::Escape => 2,
            Self::Regex => 3,
        }
    }
}

/// One substring hidden behind a sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedSpan {
    /// Token that replaced the text
    pub sentinel: String,
    /// Text that was replaced
    pub original_text: String,
    /// Kind of the first match in the span
    pub kind: SpanKind,
}

impl ProtectedSpan {
    /// Whether text following this span lies inside a CDATA section, given
    /// whether the text before it did
    pub fn leaves_cdata_open(&self, open_before: bool) -> bool {
        match (self.original_text.rfind(CDATA_OPEN), self.original_text.rfind(CDATA_CLOSE)) {
            (Some(open), Some(close)) => open > close,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => open_before,
        }
    }
}

/// Output of [`PlaceholderMask::protect`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedText {
    /// Text with every span replaced by its sentinel
    pub masked: String,
    /// Spans in first-seen order
    pub spans: Vec<ProtectedSpan>,
}

/// Protects and restores substrings a provider must not touch
#[derive(Debug, Clone)]
pub struct PlaceholderMask {
    patterns: Vec<Regex>,
}

impl PlaceholderMask {
    /// Build a mask with the given extra patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| ConfigError::Invalid {
                    field: "protection.patterns".to_string(),
                    reason: format!("'{}': {}", p.as_ref(), e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Replace protected substrings with sentinels
    pub fn protect(&self, text: &str) -> MaskedText {
        let mut candidates: Vec<(usize, usize, SpanKind)> = Vec::new();
        candidates.extend(MARKUP.find_iter(text).map(|m| (m.start(), m.end(), SpanKind::Markup)));
        candidates.extend(FORMAT_SPECIFIER.find_iter(text).map(|m| (m.start(), m.end(), SpanKind::Placeholder)));
        candidates.extend(ESCAPE_SEQUENCE.find_iter(text).map(|m| (m.start(), m.end(), SpanKind::Escape)));
        for pattern in &self.patterns {
            candidates.extend(
                pattern
                    .find_iter(text)
                    .filter(|m| !m.is_empty())
                    .map(|m| (m.start(), m.end(), SpanKind::Regex)),
            );
        }
        if candidates.is_empty() {
            return MaskedText {
                masked: text.to_string(),
                spans: Vec::new(),
            };
        }

        // Earliest start first, then the longest match
        candidates.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.priority().cmp(&b.2.priority()))
        });

        let mut ranges: Vec<(usize, usize, SpanKind)> = Vec::new();
        for (start, end, kind) in candidates {
            match ranges.last_mut() {
                Some(last) if start < last.1 => continue,
                // Touching matches share one sentinel
                Some(last) if start == last.1 => last.1 = end,
                _ => ranges.push((start, end, kind)),
            }
        }

        let salt = pick_salt(text);
        let mut masked = String::with_capacity(text.len());
        let mut spans = Vec::with_capacity(ranges.len());
        let mut cursor = 0;
        for (n, (start, end, kind)) in ranges.into_iter().enumerate() {
            let sentinel = format!("__{}_{}__", salt, n);
            masked.push_str(&text[cursor..start]);
            masked.push_str(&sentinel);
            spans.push(ProtectedSpan {
                sentinel,
                original_text: text[start..end].to_string(),
                kind,
            });
            cursor = end;
        }
        masked.push_str(&text[cursor..]);

        MaskedText { masked, spans }
    }

    /// Put the original text back in place of every sentinel
    ///
    /// Tokens that look like sentinels but carry another salt belong to the
    /// text itself and are left alone.
    pub fn restore(&self, masked: &str, spans: &[ProtectedSpan]) -> Result<String, RestoreError> {
        let mut out = String::with_capacity(masked.len());
        let mut seen = HashSet::new();
        for segment in split_sentinels(masked, spans) {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Sentinel { token, index } => {
                    let span = index
                        .and_then(|i| spans.get(i))
                        .filter(|span| span.sentinel == token)
                        .ok_or_else(|| RestoreError::Unknown(token.to_string()))?;
                    if !seen.insert(token) {
                        return Err(RestoreError::Duplicated(token.to_string()));
                    }
                    out.push_str(&span.original_text);
                }
            }
        }

        if seen.len() != spans.len() {
            debug!("Restore found {} of {} protected tokens", seen.len(), spans.len());
            return Err(RestoreError::CountMismatch {
                expected: spans.len(),
                found: seen.len(),
            });
        }
        Ok(out)
    }
}

/// Piece of masked text: plain text or a sentinel of the active salt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Sentinel {
        token: &'a str,
        /// Span index encoded in the token, if it fits in a `usize`
        index: Option<usize>,
    },
}

/// Split masked text at the sentinels carrying the salt of `spans`
///
/// Only `__<salt>_<digits>__` with the exact salt counts, so a sentinel-shaped
/// fragment of the source text next to a real sentinel cannot swallow it.
pub fn split_sentinels<'a>(masked: &'a str, spans: &[ProtectedSpan]) -> Vec<Segment<'a>> {
    let Some((salt, _)) = spans.first().and_then(|span| sentinel_parts(&span.sentinel)) else {
        return vec![Segment::Text(masked)];
    };
    let prefix = format!("__{}_", salt);

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut from = 0;
    while let Some(offset) = masked[from..].find(&prefix) {
        let start = from + offset;
        let digits = start + prefix.len();
        let width = masked[digits..].bytes().take_while(u8::is_ascii_digit).count();
        if width == 0 || !masked[digits + width..].starts_with("__") {
            from = start + 1;
            continue;
        }
        let end = digits + width + 2;
        if cursor < start {
            segments.push(Segment::Text(&masked[cursor..start]));
        }
        segments.push(Segment::Sentinel {
            token: &masked[start..end],
            index: masked[digits..digits + width].parse().ok(),
        });
        cursor = end;
        from = end;
    }
    if cursor < masked.len() || segments.is_empty() {
        segments.push(Segment::Text(&masked[cursor..]));
    }
    segments
}

impl Default for PlaceholderMask {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PROTECTED_PATTERNS
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
        }
    }
}

/// Whether anything but sentinels, whitespace, digits and punctuation remains
///
/// Sentinels are digits and underscores only, so any letter is real text.
pub fn has_translatable_text(masked: &str) -> bool {
    masked.chars().any(|c| c.is_alphabetic())
}

/// Smallest salt whose sentinel prefix does not already occur in the text
fn pick_salt(text: &str) -> u32 {
    let mut salt = 1;
    while text.contains(&format!("__{}_", salt)) {
        salt += 1;
    }
    salt
}

fn sentinel_parts(sentinel: &str) -> Option<(String, usize)> {
    let caps = SENTINEL.captures(sentinel)?;
    let salt = caps.get(1)?.as_str().to_string();
    let index = caps.get(2)?.as_str().parse().ok()?;
    Some((salt, index))
}
