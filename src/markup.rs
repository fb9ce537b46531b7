//! HTML to Markdown rendering for Ghost post bodies.
//!
//! Ghost stores rendered HTML for every post. Hugo wants Markdown, so each
//! body is parsed with html5ever into a DOM tree and walked once, emitting
//! CommonMark. The renderer knows the structures Ghost's editors produce
//! (paragraphs, headings, lists, quotes, code, figures, links, images) and
//! strips everything else down to its text.
//!
//! Rendering rules that matter downstream:
//!
//! - **No line wrapping.** A paragraph is always one line (plus explicit
//!   `<br>` breaks), so image and link constructs are never split across
//!   lines and the image scanners in [`crate::images`] see them whole.
//! - **Links and images are preserved.** Destinations are percent-encoded
//!   only where Markdown requires it (spaces, parentheses, angle brackets).
//! - **Text stays text.** Markdown punctuation in prose is backslash-escaped,
//!   and so is anything at the start of a line that Hugo would otherwise read
//!   as a list item, heading, or quote (`2020. What a year.`, `- not a list`).

use html5ever::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use std::sync::LazyLock;

/// Placeholder Ghost writes in place of its own base URL.
pub const DEFAULT_URL_PLACEHOLDER: &str = "__GHOST_URL__";

/// Bytes that would end or break a Markdown link destination.
const DESTINATION: &AsciiSet = &CONTROLS.add(b' ').add(b'(').add(b')').add(b'<').add(b'>');

static ORDERED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,9})([.)])").expect("ORDERED_MARKER_RE should compile")
});

/// Elements whose content never reaches the output.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "head", "iframe", "object",
];

/// Containers that start and end a paragraph but add no syntax of their own.
const CONTAINERS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "aside", "main", "nav", "figure",
    "figcaption", "table", "thead", "tbody", "tfoot", "tr", "dl", "dt", "dd", "address",
    "details", "summary", "li",
];

/// Convert a Ghost HTML body into Markdown.
///
/// Every occurrence of `placeholder` is replaced with `site_url` (trailing
/// slash removed) before rendering. The result is trimmed.
pub fn to_markdown(html: &str, site_url: &str, placeholder: &str) -> String {
    let html = if placeholder.is_empty() {
        html.to_string()
    } else {
        html.replace(placeholder, site_url.trim_end_matches('/'))
    };
    html_to_markdown(&html)
}

/// Render HTML to Markdown without any URL substitution.
pub fn html_to_markdown(html: &str) -> String {
    let dom = parse_body(html);
    let Some(body) = find_first_element(&dom.document, "body") else {
        return String::new();
    };
    let blocks = render_blocks(&body.children.borrow());
    join_blocks(&blocks, false).trim().to_string()
}

fn parse_body(html: &str) -> RcDom {
    let wrapped = format!("<!DOCTYPE html><html><head></head><body>{html}</body></html>");
    parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .one(wrapped.as_bytes())
}

fn find_first_element(handle: &Handle, name: &str) -> Option<Handle> {
    if tag(handle) == Some(name) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_first_element(child, name))
}

fn tag(handle: &Handle) -> Option<&str> {
    match handle.data {
        NodeData::Element { ref name, .. } => Some(&*name.local),
        _ => None,
    }
}

/// Trimmed, non-empty attribute value.
fn attr(handle: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { ref attrs, .. } = handle.data else {
        return None;
    };
    attrs
        .borrow()
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw text of a subtree, `<br>` as newline.
fn text_content(handle: &Handle, out: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } if tag(handle) == Some("br") => out.push('\n'),
        NodeData::Element { .. } => {
            for child in handle.children.borrow().iter() {
                text_content(child, out);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Blocks
// ============================================================================

struct Block {
    text: String,
    list: bool,
}

impl Block {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            list: false,
        }
    }
}

/// Blocks finished so far plus the inline run still being collected.
#[derive(Default)]
struct Collector {
    blocks: Vec<Block>,
    inline: String,
}

impl Collector {
    fn flush(&mut self) {
        let text = finish_inline(&self.inline);
        self.inline.clear();
        if !text.is_empty() {
            self.blocks.push(Block::new(text));
        }
    }

    fn push(&mut self, block: Block) {
        self.flush();
        if !block.text.trim().is_empty() {
            self.blocks.push(block);
        }
    }
}

fn render_blocks(children: &[Handle]) -> Vec<Block> {
    let mut out = Collector::default();
    for child in children {
        render_node(child, &mut out);
    }
    out.flush();
    out.blocks
}

/// Blocks are separated by a blank line. Inside a list item a nested list
/// follows its parent line directly so the list stays tight.
fn join_blocks(blocks: &[Block], in_item: bool) -> String {
    let mut joined = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            joined.push_str(if in_item && block.list { "\n" } else { "\n\n" });
        }
        joined.push_str(&block.text);
    }
    joined
}

fn render_node(node: &Handle, out: &mut Collector) {
    match node.data {
        NodeData::Text { ref contents } => push_text(&mut out.inline, &contents.borrow()),
        NodeData::Element { ref name, .. } => {
            let name = &*name.local;
            match name {
                _ if SKIPPED.contains(&name) => {}
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = name[1..].parse().unwrap_or(1);
                    out.push(heading(node, level));
                }
                "ul" | "ol" => out.push(list(node, name == "ol")),
                "blockquote" => out.push(blockquote(node)),
                "pre" => out.push(code_block(node)),
                "hr" => out.push(Block::new("* * *")),
                _ if CONTAINERS.contains(&name) => {
                    out.flush();
                    for child in node.children.borrow().iter() {
                        render_node(child, out);
                    }
                    out.flush();
                }
                _ => render_inline(node, &mut out.inline),
            }
        }
        _ => {}
    }
}

fn heading(node: &Handle, level: usize) -> Block {
    let mut inline = String::new();
    render_inline_children(node, &mut inline);
    let text = finish_inline(&inline.replace('\n', " "));
    if text.is_empty() {
        return Block::new("");
    }
    Block::new(format!("{} {}", "#".repeat(level), text))
}

fn list(node: &Handle, ordered: bool) -> Block {
    let mut number: u64 = attr(node, "start")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let mut items: Vec<String> = Vec::new();
    for child in node.children.borrow().iter() {
        match tag(child) {
            Some("li") => {
                let marker = if ordered {
                    format!("{number}. ")
                } else {
                    "- ".to_string()
                };
                number += 1;
                items.push(list_item(child, &marker));
            }
            // `<ul><li>a</li><ul>…</ul></ul>`: the stray list belongs to the
            // item before it.
            Some(nested @ ("ul" | "ol")) => {
                let nested = list(child, nested == "ol");
                match items.last_mut() {
                    Some(last) => {
                        last.push('\n');
                        last.push_str(&indent(&nested.text, 2));
                    }
                    None => items.push(nested.text),
                }
            }
            _ => {}
        }
    }
    Block {
        text: items.join("\n"),
        list: true,
    }
}

fn list_item(li: &Handle, marker: &str) -> String {
    let content = join_blocks(&render_blocks(&li.children.borrow()), true);
    if content.is_empty() {
        return marker.trim_end().to_string();
    }
    let mut lines = content.lines();
    let mut rendered = format!("{marker}{}", lines.next().unwrap_or_default());
    let rest: Vec<&str> = lines.collect();
    if !rest.is_empty() {
        rendered.push('\n');
        rendered.push_str(&indent(&rest.join("\n"), marker.len()));
    }
    rendered
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn blockquote(node: &Handle) -> Block {
    let inner = join_blocks(&render_blocks(&node.children.borrow()), false);
    let quoted = inner
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Block::new(quoted)
}

fn code_block(pre: &Handle) -> Block {
    let lang = find_first_element(pre, "code")
        .and_then(|code| attr(&code, "class"))
        .and_then(|class| code_language(&class))
        .unwrap_or_default();
    let mut code = String::new();
    text_content(pre, &mut code);
    let code = code.trim_matches('\n');
    let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
    Block::new(format!("{fence}{lang}\n{code}\n{fence}"))
}

/// `language-rust` / `lang-rust` class on a `<code>` inside `<pre>`.
fn code_language(class: &str) -> Option<String> {
    class.split_whitespace().find_map(|c| {
        c.strip_prefix("language-")
            .or_else(|| c.strip_prefix("lang-"))
            .filter(|lang| !lang.is_empty())
            .map(String::from)
    })
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

// ============================================================================
// Inline content
// ============================================================================

fn render_inline_children(node: &Handle, buf: &mut String) {
    for child in node.children.borrow().iter() {
        render_inline(child, buf);
    }
}

fn render_inline(node: &Handle, buf: &mut String) {
    let name = match node.data {
        NodeData::Text { ref contents } => {
            push_text(buf, &contents.borrow());
            return;
        }
        NodeData::Element { ref name, .. } => &*name.local,
        _ => return,
    };
    match name {
        _ if SKIPPED.contains(&name) => {}
        "br" => buf.push('\n'),
        "strong" | "b" => wrap(node, buf, "**"),
        "em" | "i" => wrap(node, buf, "*"),
        "del" | "s" | "strike" => wrap(node, buf, "~~"),
        "code" => {
            let mut code = String::new();
            text_content(node, &mut code);
            let code = code.split_whitespace().collect::<Vec<_>>().join(" ");
            if !code.is_empty() {
                buf.push_str(&code_span(&code));
            }
        }
        "a" => link(node, buf),
        "img" => {
            if let Some(src) = attr(node, "src") {
                let alt = attr(node, "alt").unwrap_or_default();
                buf.push_str(&image_markdown(&alt, &src, attr(node, "title").as_deref()));
            }
        }
        "td" | "th" => {
            buf.push(' ');
            render_inline_children(node, buf);
            buf.push(' ');
        }
        _ => render_inline_children(node, buf),
    }
}

/// Append a text node: whitespace collapsed, Markdown punctuation escaped.
fn push_text(buf: &mut String, raw: &str) {
    let mut collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if raw.starts_with(char::is_whitespace) {
        collapsed.insert(0, ' ');
    }
    if raw.ends_with(char::is_whitespace) && !collapsed.ends_with(' ') {
        collapsed.push(' ');
    }
    let at_line_start = buf.is_empty() || buf.ends_with([' ', '\n']);
    let text = if at_line_start {
        collapsed.trim_start()
    } else {
        collapsed.as_str()
    };
    buf.push_str(&escape_text(text));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Emphasis markers must hug their content, so edge whitespace moves outside.
fn wrap(node: &Handle, buf: &mut String, marker: &str) {
    let mut raw = String::new();
    text_content(node, &mut raw);
    let mut inner = String::new();
    render_inline_children(node, &mut inner);
    let trimmed = inner.trim();
    let spaced = |buf: &mut String| {
        if !buf.is_empty() && !buf.ends_with([' ', '\n']) {
            buf.push(' ');
        }
    };
    if raw.starts_with(char::is_whitespace) {
        spaced(buf);
    }
    if trimmed.is_empty() {
        return;
    }
    buf.push_str(marker);
    buf.push_str(trimmed);
    buf.push_str(marker);
    if raw.ends_with(char::is_whitespace) {
        buf.push(' ');
    }
}

fn code_span(code: &str) -> String {
    if code.contains('`') {
        format!("`` {code} ``")
    } else {
        format!("`{code}`")
    }
}

fn link(node: &Handle, buf: &mut String) {
    let mut label = String::new();
    render_inline_children(node, &mut label);
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(href) = attr(node, "href") else {
        buf.push_str(&label);
        return;
    };
    let label = if label.is_empty() {
        escape_text(&href)
    } else {
        label
    };
    // `!` right before `[` would turn the link into an image.
    if buf.ends_with('!') {
        buf.pop();
        buf.push_str("\\!");
    }
    buf.push_str(&format!(
        "[{label}]({}{})",
        encode_url(&href),
        title_suffix(attr(node, "title").as_deref())
    ));
}

fn encode_url(url: &str) -> String {
    utf8_percent_encode(url, DESTINATION).to_string()
}

fn title_suffix(title: Option<&str>) -> String {
    title
        .map(|t| format!(" \"{}\"", t.replace('"', "'")))
        .unwrap_or_default()
}

fn image_markdown(alt: &str, src: &str, title: Option<&str>) -> String {
    let alt = alt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('[', "\\[")
        .replace(']', "\\]");
    format!("![{alt}]({}{})", encode_url(src), title_suffix(title))
}

/// Turn a collected inline run into finished paragraph text.
///
/// Each `<br>` line is trimmed and escaped on its own; lines are joined with
/// Markdown hard breaks.
fn finish_inline(inline: &str) -> String {
    inline
        .split('\n')
        .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .map(|line| escape_line_start(&line))
        .collect::<Vec<_>>()
        .join("  \n")
}

/// Escape a leading marker that would make the line a list item, heading,
/// quote, fence or setext underline.
fn escape_line_start(line: &str) -> String {
    if line.starts_with(['#', '-', '+', '=', '>']) || line.starts_with("~~~") {
        return format!("\\{line}");
    }
    ORDERED_MARKER_RE.replace(line, "$1\\$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_single_lines() {
        let html = "<p>First paragraph\nthat spans\n   several source lines.</p><p>Second.</p>";
        assert_eq!(
            html_to_markdown(html),
            "First paragraph that spans several source lines.\n\nSecond."
        );
    }

    #[test]
    fn long_paragraph_is_not_wrapped() {
        let words = vec!["word"; 60].join(" ");
        let md = html_to_markdown(&format!("<p>{words}</p>"));
        assert_eq!(md.lines().count(), 1);
    }

    #[test]
    fn headings_and_emphasis() {
        let html = "<h2>Title <em>here</em></h2><p>Some <strong>bold</strong> text.</p>";
        assert_eq!(
            html_to_markdown(html),
            "## Title *here*\n\nSome **bold** text."
        );
    }

    #[test]
    fn emphasis_whitespace_moves_outside_markers() {
        assert_eq!(
            html_to_markdown("<p>Some<strong> bold </strong>text</p>"),
            "Some **bold** text"
        );
    }

    #[test]
    fn links_preserved() {
        let html = r#"<p>See <a href="https://example.com/a?b=1&amp;c=2">the docs</a>.</p>"#;
        assert_eq!(
            html_to_markdown(html),
            "See [the docs](https://example.com/a?b=1&c=2)."
        );
    }

    #[test]
    fn link_after_exclamation_stays_a_link() {
        assert_eq!(
            html_to_markdown(r#"<p>Wow!<a href="/next">next</a></p>"#),
            "Wow\\![next](/next)"
        );
    }

    #[test]
    fn images_preserved_with_any_attribute_order() {
        let html = concat!(
            r#"<p><img alt="A cat" src="/content/images/cat.jpg">"#,
            r#"<img src="dog.png" alt="A dog"></p>"#
        );
        assert_eq!(
            html_to_markdown(html),
            "![A cat](/content/images/cat.jpg)![A dog](dog.png)"
        );
    }

    #[test]
    fn image_without_alt_has_empty_alt() {
        assert_eq!(
            html_to_markdown(r#"<p>Hello <img src="pic.jpg"></p>"#),
            "Hello ![](pic.jpg)"
        );
    }

    #[test]
    fn destinations_percent_encoded() {
        assert_eq!(
            html_to_markdown(
                r#"<p><img src="/content/images/my pic (1).jpg" title="A &quot;q&quot;"></p>"#
            ),
            "![](/content/images/my%20pic%20%281%29.jpg \"A 'q'\")"
        );
        assert_eq!(
            html_to_markdown(r#"<p><img src="/content/images/my%20pic.jpg"></p>"#),
            "![](/content/images/my%20pic.jpg)"
        );
    }

    #[test]
    fn ghost_image_card_with_caption() {
        let html = concat!(
            r#"<figure class="kg-card kg-image-card">"#,
            r#"<img src="/content/images/2020/01/a.jpg" class="kg-image" alt="Sunset">"#,
            r#"<figcaption>Taken at dusk</figcaption></figure>"#
        );
        assert_eq!(
            html_to_markdown(html),
            "![Sunset](/content/images/2020/01/a.jpg)\n\nTaken at dusk"
        );
    }

    #[test]
    fn unordered_and_ordered_lists() {
        let html =
            "<ul><li>one</li><li>two</li></ul><ol start=\"3\"><li>three</li><li>four</li></ol>";
        assert_eq!(html_to_markdown(html), "- one\n- two\n\n3. three\n4. four");
    }

    #[test]
    fn nested_list_indented() {
        let html = "<ul><li>parent<ul><li>child</li></ul></li><li>sibling</li></ul>";
        assert_eq!(html_to_markdown(html), "- parent\n  - child\n- sibling");
    }

    #[test]
    fn unclosed_list_items() {
        let html = "<ul><li>a<li>b</ul>";
        assert_eq!(html_to_markdown(html), "- a\n- b");
    }

    #[test]
    fn blockquote_prefixed() {
        let html = "<blockquote><p>Quoted one.</p><p>Quoted two.</p></blockquote><p>After</p>";
        assert_eq!(
            html_to_markdown(html),
            "> Quoted one.\n>\n> Quoted two.\n\nAfter"
        );
    }

    #[test]
    fn code_blocks_keep_whitespace() {
        let html = concat!(
            "<pre><code class=\"language-rust\">",
            "fn main() {\n    println!(\"&lt;hi&gt;\");\n}",
            "</code></pre>"
        );
        assert_eq!(
            html_to_markdown(html),
            "```rust\nfn main() {\n    println!(\"<hi>\");\n}\n```"
        );
    }

    #[test]
    fn code_block_fence_longer_than_content_run() {
        let md = html_to_markdown("<pre><code>a ``` b</code></pre>");
        assert_eq!(md, "````\na ``` b\n````");
    }

    #[test]
    fn inline_code() {
        assert_eq!(
            html_to_markdown("<p>Run <code>cargo   doc</code> now</p>"),
            "Run `cargo doc` now"
        );
    }

    #[test]
    fn scripts_styles_and_comments_dropped() {
        let html = "<style>p{}</style><p>Kept<!-- note --></p><script>alert(1)</script>";
        assert_eq!(html_to_markdown(html), "Kept");
    }

    #[test]
    fn unknown_tags_stripped_to_text() {
        assert_eq!(
            html_to_markdown("<p><span class=\"x\">Just</span> <mark>text</mark></p>"),
            "Just text"
        );
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(
            html_to_markdown("<p>a &amp; b &#233; &#x1F600; &hellip;</p>"),
            "a & b é 😀 …"
        );
    }

    #[test]
    fn placeholder_replaced_with_site_url() {
        let html = r#"<p><img src="__GHOST_URL__/content/images/2020/01/pic.jpg"></p>"#;
        assert_eq!(
            to_markdown(html, "https://blog.example.com/", DEFAULT_URL_PLACEHOLDER),
            "![](https://blog.example.com/content/images/2020/01/pic.jpg)"
        );
    }

    #[test]
    fn horizontal_rule_and_line_break() {
        assert_eq!(
            html_to_markdown("<p>a<br>b</p><hr><p>c</p>"),
            "a  \nb\n\n* * *\n\nc"
        );
    }

    // =========================================================================
    // Escaping
    // =========================================================================

    #[test]
    fn paragraph_starting_like_a_list_is_escaped() {
        assert_eq!(
            html_to_markdown("<p>2020. What a year.</p><p>- not a list</p><p>+ nor this</p>"),
            "2020\\. What a year.\n\n\\- not a list\n\n\\+ nor this"
        );
    }

    #[test]
    fn paragraph_starting_like_heading_or_quote_is_escaped() {
        assert_eq!(
            html_to_markdown("<p># not a heading</p><p>&gt; not a quote</p>"),
            "\\# not a heading\n\n\\> not a quote"
        );
    }

    #[test]
    fn line_after_break_is_escaped() {
        assert_eq!(
            html_to_markdown("<p>Intro<br>1) first</p>"),
            "Intro  \n1\\) first"
        );
    }

    #[test]
    fn inline_markdown_punctuation_escaped() {
        assert_eq!(
            html_to_markdown("<p>a *star*, [brackets], snake_case and &lt;tag&gt;</p>"),
            "a \\*star\\*, \\[brackets\\], snake\\_case and \\<tag>"
        );
    }

    #[test]
    fn list_item_text_escaped_but_markers_kept() {
        assert_eq!(
            html_to_markdown("<ol><li>1. already numbered</li></ol>"),
            "1. 1\\. already numbered"
        );
    }

    #[test]
    fn numbers_mid_line_untouched() {
        assert_eq!(
            html_to_markdown("<p>In 2020. we left.</p>"),
            "In 2020. we left."
        );
    }
}
