//! HTML → markdown conversion.
//!
//! Deliberately small: enough structure (headings, paragraphs, lists, links,
//! code, quotes, emphasis) to read a page in an editor, with page chrome such
//! as navigation, scripts and footers dropped.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector must parse"));

/// Preferred content roots, most specific first.
static CONTENT_ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["main", "article", "[role=main]", "body"]
        .iter()
        .map(|s| Selector::parse(s).expect("content root selector must parse"))
        .collect()
});

const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "head", "nav", "header", "footer", "aside", "form",
    "button", "iframe", "svg", "canvas", "select",
];

const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "main", "figure", "figcaption", "table", "dl", "dd", "dt",
    "details", "summary", "address",
];

/// The text of the document's `<title>`, whitespace-collapsed.
pub fn html_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let title = doc.select(&TITLE).next()?;
    let text = collapse_whitespace(&title.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Convert an HTML document to markdown. Relative links resolve against `base`.
pub fn html_to_markdown(html: &str, base: &Url) -> String {
    let doc = Html::parse_document(html);
    let root = CONTENT_ROOTS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .unwrap_or_else(|| doc.root_element());

    let mut renderer = Renderer::new(base);
    renderer.children(root);
    renderer.finish()
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Bullet,
    Ordered(usize),
}

struct Renderer<'b> {
    base: &'b Url,
    out: String,
    lists: Vec<ListKind>,
}

impl<'b> Renderer<'b> {
    fn new(base: &'b Url) -> Self {
        Self {
            base,
            out: String::new(),
            lists: Vec::new(),
        }
    }

    fn children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                self.element(child_el);
            } else if let Node::Text(text) = child.value() {
                self.text(text);
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        if SKIPPED.contains(&name) {
            return;
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(name.as_bytes()[1] - b'0');
                self.block_break();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.children(el);
                self.block_break();
            }
            "br" => {
                self.trim_trailing_spaces();
                self.out.push('\n');
            }
            "hr" => {
                self.block_break();
                self.out.push_str("---");
                self.block_break();
            }
            "pre" => {
                let code: String = el.text().collect();
                self.block_break();
                self.out.push_str("```\n");
                self.out.push_str(code.trim_end_matches('\n'));
                self.out.push_str("\n```");
                self.block_break();
            }
            "code" | "kbd" | "samp" => {
                let code = collapse_whitespace(&el.text().collect::<String>());
                if !code.is_empty() {
                    self.out.push('`');
                    self.out.push_str(&code);
                    self.out.push('`');
                }
            }
            "strong" | "b" => self.wrapped(el, "**"),
            "em" | "i" => self.wrapped(el, "_"),
            "a" => self.link(el),
            "img" => self.image(el),
            "ul" | "ol" => {
                self.list_break();
                self.lists.push(if name == "ol" {
                    ListKind::Ordered(1)
                } else {
                    ListKind::Bullet
                });
                self.children(el);
                self.lists.pop();
                if self.lists.is_empty() {
                    self.block_break();
                }
            }
            "li" => self.list_item(el),
            "blockquote" => {
                let inner = self.render_nested(el);
                self.block_break();
                let quoted: Vec<String> = inner.lines().map(|l| format!("> {l}").trim_end().to_string()).collect();
                self.out.push_str(&quoted.join("\n"));
                self.block_break();
            }
            "tr" => {
                self.list_break();
                self.children(el);
            }
            "td" | "th" => {
                self.children(el);
                self.trim_trailing_spaces();
                self.out.push_str(" | ");
            }
            _ if BLOCKS.contains(&name) => {
                self.block_break();
                self.children(el);
                self.block_break();
            }
            _ => self.children(el),
        }
    }

    fn wrapped(&mut self, el: ElementRef<'_>, marker: &str) {
        let inner = self.render_inline(el);
        if inner.is_empty() {
            return;
        }
        self.out.push_str(marker);
        self.out.push_str(&inner);
        self.out.push_str(marker);
        self.trailing_space(el);
    }

    fn link(&mut self, el: ElementRef<'_>) {
        let text = self.render_inline(el);
        let target = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))
            .and_then(|h| self.base.join(h).ok());

        match target {
            Some(url) if text.is_empty() => {
                self.out.push('<');
                self.out.push_str(url.as_str());
                self.out.push('>');
            }
            Some(url) => {
                self.out.push('[');
                self.out.push_str(&text);
                self.out.push_str("](");
                self.out.push_str(url.as_str());
                self.out.push(')');
            }
            None => self.out.push_str(&text),
        }
        self.trailing_space(el);
    }

    fn image(&mut self, el: ElementRef<'_>) {
        let Some(src) = el.value().attr("src").and_then(|s| self.base.join(s.trim()).ok()) else {
            return;
        };
        let alt = collapse_whitespace(el.value().attr("alt").unwrap_or_default());
        self.out.push_str("![");
        self.out.push_str(&alt);
        self.out.push_str("](");
        self.out.push_str(src.as_str());
        self.out.push(')');
    }

    fn list_item(&mut self, el: ElementRef<'_>) {
        self.list_break();
        let depth = self.lists.len().saturating_sub(1);
        self.out.push_str(&"  ".repeat(depth));
        match self.lists.last_mut() {
            Some(ListKind::Ordered(n)) => {
                self.out.push_str(&format!("{n}. "));
                *n += 1;
            }
            _ => self.out.push_str("- "),
        }
        self.children(el);
    }

    /// Render `el`'s children into a separate buffer with the same list state.
    fn render_nested(&mut self, el: ElementRef<'_>) -> String {
        let saved = std::mem::take(&mut self.out);
        self.children(el);
        let inner = std::mem::replace(&mut self.out, saved);
        tidy(&inner)
    }

    /// Render `el`'s children as a trimmed inline string. Whitespace at the
    /// edges of the element is kept outside whatever the caller wraps it in.
    fn render_inline(&mut self, el: ElementRef<'_>) -> String {
        if el.text().next().is_some_and(|t| t.starts_with(char::is_whitespace)) {
            self.push_space();
        }
        let saved = std::mem::take(&mut self.out);
        self.children(el);
        let inner = std::mem::replace(&mut self.out, saved);
        inner.trim().to_string()
    }

    fn trailing_space(&mut self, el: ElementRef<'_>) {
        if el.text().last().is_some_and(|t| t.ends_with(char::is_whitespace)) {
            self.push_space();
        }
    }

    fn text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.push_space();
            } else {
                self.out.push(ch);
            }
        }
    }

    fn push_space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches(' ').len();
        self.out.truncate(kept);
    }

    /// End the current line without opening a paragraph gap.
    fn list_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Ensure a blank line separates what follows from what came before.
    fn block_break(&mut self) {
        if !self.lists.is_empty() {
            self.list_break();
            return;
        }
        let kept = self.out.trim_end().len();
        self.out.truncate(kept);
        if !self.out.is_empty() {
            self.out.push_str("\n\n");
        }
    }

    fn finish(self) -> String {
        tidy(&self.out)
    }
}

/// Trim line ends, squeeze runs of blank lines and trim the whole text.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
