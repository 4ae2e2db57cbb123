//! Locating the link under the cursor on a single line of text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// `[text](target "title")` and `![alt](target)`. Group 1 is an angle
/// bracketed target, group 2 a plain one (balanced parentheses allowed).
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"!?\[(?:[^\[\]]|\[[^\[\]]*\])*\]\(\s*(?:<([^<>\n]+)>|([^\s()<>]*(?:\([^\s()<>]*\)[^\s()<>]*)*))(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#,
    )
    .expect("markdown link pattern must compile")
});

static AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(https?://[^<>\s]+)>").expect("autolink pattern must compile")
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\[\]{}|\\^`]+"#)
        .expect("bare URL pattern must compile")
});

/// A link found on a line. `span` is a byte range covering the whole
/// construct (for markdown links: from `[` or `!` through `)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    pub span: Range<usize>,
    pub target: String,
}

/// Return the web URL whose link span contains `character`.
///
/// `character` is an LSP column, counted in UTF-16 code units. Only absolute
/// `http`/`https` targets are returned; a cursor on any other link, or on no
/// link at all, yields `None`.
pub fn extract_link_at_position(line: &str, character: u32) -> Option<String> {
    let offset = utf16_to_byte_offset(line, character);
    find_links(line)
        .into_iter()
        .find(|link| link.span.contains(&offset))
        .map(|link| link.target)
        .filter(|target| is_web_url(target))
}

/// All link spans on `line`, ordered by start offset, never overlapping.
pub fn find_links(line: &str) -> Vec<LinkSpan> {
    let mut links: Vec<LinkSpan> = Vec::new();

    for caps in MARKDOWN_LINK.captures_iter(line) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        links.push(LinkSpan {
            span: whole.range(),
            target: target.as_str().to_string(),
        });
    }

    for caps in AUTOLINK.captures_iter(line) {
        let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_unless_overlapping(&mut links, whole.range(), target.as_str());
    }

    for m in BARE_URL.find_iter(line) {
        let trimmed = trim_bare_url(m.as_str());
        let span = m.start()..m.start() + trimmed.len();
        push_unless_overlapping(&mut links, span, trimmed);
    }

    links.sort_by_key(|link| link.span.start);
    links
}

fn push_unless_overlapping(links: &mut Vec<LinkSpan>, span: Range<usize>, target: &str) {
    let overlaps = links
        .iter()
        .any(|l| l.span.start < span.end && span.start < l.span.end);
    if !overlaps {
        links.push(LinkSpan {
            span,
            target: target.to_string(),
        });
    }
}

/// Strip sentence punctuation and unbalanced closing parentheses that the
/// bare URL pattern swallows, e.g. `(see https://a.b/c).`
fn trim_bare_url(raw: &str) -> &str {
    let mut url = raw;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '*' | '_' | '~' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !strip {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

fn is_web_url(target: &str) -> bool {
    url::Url::parse(target)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

/// Convert a UTF-16 column into a byte offset, clamped to the line length.
fn utf16_to_byte_offset(line: &str, character: u32) -> usize {
    let target = character as usize;
    let mut units = 0usize;
    for (idx, ch) in line.char_indices() {
        if units >= target {
            return idx;
        }
        units += ch.len_utf16();
    }
    line.len()
}
