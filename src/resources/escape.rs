/*!
 * Android escaping for text coming back from a translation provider.
 *
 * Runs on masked text, so inline tags and escapes that were already present in
 * the source are hidden behind sentinels and never escaped twice.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// Where a run of provider output sits inside the resource value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeContext {
    /// The run starts the value, so a leading `@` or `?` needs escaping
    pub at_start: bool,
    /// The run is inside an Android double-quoted string, where `'` is literal
    pub quoted: bool,
}

impl Default for EscapeContext {
    fn default() -> Self {
        Self {
            at_start: true,
            quoted: false,
        }
    }
}

/// Whether a raw value is an Android double-quoted string (`"Don't"`)
pub fn is_quoted(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') && !raw.ends_with("\\\"")
}

/// Make provider output safe to store as raw resource text
///
/// - a bare `&` becomes `&amp;` (existing entities are kept)
/// - `<` becomes `&lt;`
/// - `'` and `"` get a backslash unless already escaped
/// - a leading `@` or `?` is escaped so Android does not read a reference
pub fn escape_translated(text: &str) -> String {
    escape_fragment(text, EscapeContext::default())
}

/// [`escape_translated`] for one run of a larger value
pub fn escape_fragment(text: &str, context: EscapeContext) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, next)) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '&' if ENTITY.is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '\'' if context.quoted => out.push('\''),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '@' | '?' if i == 0 && context.at_start => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
