//! Allow-list HTML sanitizer for extracted article bodies.
//!
//! Board content is author-supplied HTML and is re-rendered verbatim, so the
//! sanitizer is strict: only an explicit set of tags and per-tag attributes
//! survives, inline styles are filtered down to a safe property list, and
//! event handlers, scripts and frames never pass through. Unknown tags are
//! unwrapped rather than dropped so their text is preserved.
//!
//! Media handling is folded into serialization: lazy-load attributes replace
//! placeholder `src` values, relative URLs are absolutized, and every image
//! gains `loading="lazy"` and `referrerpolicy="no-referrer"`. The absolute
//! image URLs encountered along the way are collected for the caller.

use ego_tree::NodeRef;
use html_escape::{encode_double_quoted_attribute, encode_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::Html;

use crate::utils::absolutize;

const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "img", "strong", "em", "b", "i",
    "h1", "h2", "h3", "h4", "h5", "h6",
    "ul", "ol", "li", "blockquote", "a", "div", "span",
    "table", "tr", "td", "th", "thead", "tbody",
    "figure", "figcaption", "video", "source",
];

/// Removed together with their content; everything else unknown is unwrapped.
const STRIP_TAGS: &[&str] = &[
    "script", "style", "iframe", "noscript", "object", "embed", "form", "input",
];

const ALLOWED_CSS_PROPS: &[&str] = &[
    "text-align", "font-size", "font-weight", "font-style",
    "color", "background-color",
    "margin", "margin-top", "margin-bottom", "margin-left", "margin-right",
    "padding", "padding-top", "padding-bottom", "padding-left", "padding-right",
    "width", "max-width", "height",
    "display", "text-decoration", "line-height", "letter-spacing",
    "border", "border-bottom", "border-top",
];

/// Lazy-load attributes probed for the real media URL, in preference order.
const LAZY_ATTRS: &[&str] = &[
    "data-src", "data-original", "data-lazy-src", "data-lazy", "data-actualsrc",
];

/// `src` values that are lazy-load stand-ins, not real images.
const PLACEHOLDER_PATTERNS: &[&str] = &["loading", "placeholder", "blank", "spacer", "pixel"];

const VOID_TAGS: &[&str] = &["br", "img", "source"];

static EMPTY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<p>\s*</p>|<div>\s*</div>|<span>\s*</span>").unwrap());
static BR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(<br\s*/?>){3,}").unwrap());

/// Sanitized body HTML plus the absolute image URLs it references.
#[derive(Debug, Default)]
pub struct SanitizeOutput {
    pub html: String,
    pub images: Vec<String>,
}

/// Sanitize an HTML fragment against the allow-list.
///
/// `base_url` anchors relative `src`/`href` resolution. The output HTML is
/// re-serialized from scratch, so malformed input markup cannot smuggle
/// anything past the filter.
pub fn sanitize_fragment(html: &str, base_url: &str) -> SanitizeOutput {
    let doc = Html::parse_fragment(html);
    let mut out = SanitizeOutput::default();
    for child in doc.root_element().children() {
        serialize(child, base_url, &mut out);
    }
    out.html = EMPTY_TAG.replace_all(&out.html, "").into_owned();
    out.html = BR_RUN.replace_all(&out.html, "<br><br>").into_owned();
    out.html = out.html.trim().to_string();
    out
}

/// Filter an inline `style` value down to allow-listed properties.
///
/// Declarations whose value contains `url(`, `expression(`, `javascript:` or
/// `import` are dropped regardless of property.
pub fn sanitize_css(style: &str) -> String {
    let mut safe = Vec::new();
    for declaration in style.split(';') {
        let declaration = declaration.trim();
        let Some((prop, value)) = declaration.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_lowercase();
        let value = value.trim();
        let value_lower = value.to_lowercase();
        if ["url(", "expression(", "javascript:", "import"]
            .iter()
            .any(|danger| value_lower.contains(danger))
        {
            continue;
        }
        if ALLOWED_CSS_PROPS.contains(&prop.as_str()) {
            safe.push(format!("{prop}: {value}"));
        }
    }
    safe.join("; ")
}

fn serialize(node: NodeRef<'_, Node>, base: &str, out: &mut SanitizeOutput) {
    match node.value() {
        Node::Text(text) => out.html.push_str(&encode_text(&*text.text)),
        Node::Element(el) => {
            let name = el.name();
            if STRIP_TAGS.contains(&name) {
                return;
            }
            if !ALLOWED_TAGS.contains(&name) {
                // unwrap: keep the content, lose the tag
                for child in node.children() {
                    serialize(child, base, out);
                }
                return;
            }
            match name {
                "img" => emit_img(node, base, out),
                "video" => emit_video(node, base, out),
                "source" => emit_source(node, base, out),
                "a" => emit_anchor(node, base, out),
                _ => emit_generic(node, name, base, out),
            }
        }
        // comments, doctypes and processing instructions are dropped
        _ => {}
    }
}

fn element(node: NodeRef<'_, Node>) -> &scraper::node::Element {
    match node.value() {
        Node::Element(el) => el,
        _ => unreachable!("serialize dispatches on Node::Element"),
    }
}

fn emit_generic(node: NodeRef<'_, Node>, name: &str, base: &str, out: &mut SanitizeOutput) {
    out.html.push('<');
    out.html.push_str(name);
    push_style(node, out);
    out.html.push('>');
    if VOID_TAGS.contains(&name) {
        return;
    }
    for child in node.children() {
        serialize(child, base, out);
    }
    out.html.push_str("</");
    out.html.push_str(name);
    out.html.push('>');
}

fn emit_img(node: NodeRef<'_, Node>, base: &str, out: &mut SanitizeOutput) {
    let el = element(node);
    let Some(src) = media_src(node, base) else {
        return;
    };
    out.html.push_str("<img src=\"");
    out.html.push_str(&encode_double_quoted_attribute(&src));
    out.html.push('"');
    if let Some(alt) = el.attr("alt") {
        out.html.push_str(" alt=\"");
        out.html.push_str(&encode_double_quoted_attribute(alt));
        out.html.push('"');
    }
    out.html
        .push_str(" loading=\"lazy\" referrerpolicy=\"no-referrer\"");
    push_style(node, out);
    out.html.push('>');
    if src.starts_with("http") {
        out.images.push(src);
    }
}

fn emit_video(node: NodeRef<'_, Node>, base: &str, out: &mut SanitizeOutput) {
    let el = element(node);
    out.html.push_str("<video");
    if let Some(src) = media_src(node, base) {
        out.html.push_str(" src=\"");
        out.html.push_str(&encode_double_quoted_attribute(&src));
        out.html.push('"');
    }
    if let Some(poster) = el.attr("poster").and_then(|p| absolutize(p, base)) {
        out.html.push_str(" poster=\"");
        out.html.push_str(&encode_double_quoted_attribute(&poster));
        out.html.push('"');
    }
    for flag in ["autoplay", "loop", "muted"] {
        if el.attr(flag).is_some() {
            out.html.push(' ');
            out.html.push_str(flag);
        }
    }
    out.html.push_str(" controls playsinline");
    push_style(node, out);
    out.html.push('>');
    for child in node.children() {
        serialize(child, base, out);
    }
    out.html.push_str("</video>");
}

fn emit_source(node: NodeRef<'_, Node>, base: &str, out: &mut SanitizeOutput) {
    let el = element(node);
    out.html.push_str("<source");
    if let Some(src) = el.attr("src").and_then(|s| absolutize(s, base)) {
        out.html.push_str(" src=\"");
        out.html.push_str(&encode_double_quoted_attribute(&src));
        out.html.push('"');
    }
    if let Some(kind) = el.attr("type") {
        out.html.push_str(" type=\"");
        out.html.push_str(&encode_double_quoted_attribute(kind));
        out.html.push('"');
    }
    out.html.push('>');
}

fn emit_anchor(node: NodeRef<'_, Node>, base: &str, out: &mut SanitizeOutput) {
    let el = element(node);
    let href = el.attr("href").unwrap_or("").trim();
    if href.is_empty() || href.to_lowercase().starts_with("javascript:") {
        // dangerous or empty link: keep only the text
        for child in node.children() {
            serialize(child, base, out);
        }
        return;
    }
    let resolved = if href.starts_with("http") || href.starts_with("mailto:") || href.starts_with('#')
    {
        href.to_string()
    } else {
        match absolutize(href, base) {
            Some(url) => url,
            None => {
                for child in node.children() {
                    serialize(child, base, out);
                }
                return;
            }
        }
    };
    out.html.push_str("<a href=\"");
    out.html.push_str(&encode_double_quoted_attribute(&resolved));
    out.html.push('"');
    push_style(node, out);
    out.html.push('>');
    for child in node.children() {
        serialize(child, base, out);
    }
    out.html.push_str("</a>");
}

/// Resolve the real media URL for an `img` or `video`: lazy-load attributes
/// win over a placeholder `src`; data-URLs and unresolvable sources drop the
/// element.
fn media_src(node: NodeRef<'_, Node>, base: &str) -> Option<String> {
    let el = element(node);
    let lazy = LAZY_ATTRS.iter().find_map(|attr| {
        el.attr(attr)
            .filter(|v| v.starts_with("http") || v.starts_with('/'))
    });
    let declared = el.attr("src").unwrap_or("");
    let src = match lazy {
        Some(real) if declared.is_empty() || is_placeholder(declared) => real,
        _ if declared.is_empty() => return None,
        _ => declared,
    };
    if src.starts_with("data:") {
        return None;
    }
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    absolutize(src, base)
}

fn is_placeholder(src: &str) -> bool {
    let lower = src.to_lowercase();
    PLACEHOLDER_PATTERNS.iter().any(|p| lower.contains(p)) || src.starts_with("data:")
}

fn push_style(node: NodeRef<'_, Node>, out: &mut SanitizeOutput) {
    let Some(style) = element(node).attr("style") else {
        return;
    };
    let safe = sanitize_css(style);
    if !safe.is_empty() {
        out.html.push_str(" style=\"");
        out.html.push_str(&encode_double_quoted_attribute(&safe));
        out.html.push('"');
    }
}
