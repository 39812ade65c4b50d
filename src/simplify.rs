//! HTML simplification for model consumption.
//!
//! Raw page markup is far too token-heavy for a model with a limited context
//! window. This module prunes it to the content that matters: non-content
//! subtrees are dropped wholesale, attributes are cut down to a small
//! allow-list, and the result is re-serialized with stable indentation.
//!
//! Purely a tree transform over already-fetched markup: no network access,
//! no script execution, and idempotent by construction.

use scraper::{ElementRef, Html};

/// Tags whose entire subtree carries nothing a model can act on.
const STRIP_TAGS: [&str; 6] = ["script", "style", "svg", "meta", "link", "noscript"];

/// The only attributes kept on surviving elements, emitted in this order.
const ALLOWED_ATTRS: [&str; 8] = [
    "id",
    "class",
    "name",
    "href",
    "type",
    "placeholder",
    "aria-label",
    "role",
];

/// Elements that never have children and take no closing tag.
const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Reduce raw page markup to a simplified, model-readable form.
///
/// Removes script/style/svg/meta/link/noscript subtrees, comments, and the
/// doctype; keeps only allow-listed attributes; re-serializes with 2-space
/// indentation. Simplifying already-simplified markup yields the same
/// result.
pub fn simplify_html(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut out = String::new();
    write_element(document.root_element(), 0, &mut out);
    out
}

fn write_element(el: ElementRef, depth: usize, out: &mut String) {
    let tag = el.value().name();

    indent(out, depth);
    out.push('<');
    out.push_str(tag);
    for attr in ALLOWED_ATTRS {
        if let Some(value) = el.value().attr(attr) {
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            push_escaped_attr(value, out);
            out.push('"');
        }
    }
    out.push_str(">\n");

    if VOID_TAGS.contains(&tag) {
        return;
    }

    // Consecutive text siblings are buffered into one line so re-parsing the
    // output reproduces the same node structure (idempotency).
    let mut pending_text = String::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if STRIP_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            flush_text(&mut pending_text, depth + 1, out);
            write_element(child_el, depth + 1, out);
        } else if let Some(text) = child.value().as_text() {
            pending_text.push_str(text);
        }
        // Comments, doctypes, and processing instructions are dropped.
    }
    flush_text(&mut pending_text, depth + 1, out);

    indent(out, depth);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn flush_text(pending: &mut String, depth: usize, out: &mut String) {
    let collapsed = collapse_whitespace(pending);
    pending.clear();
    if collapsed.is_empty() {
        return;
    }
    indent(out, depth);
    push_escaped_text(&collapsed, out);
    out.push('\n');
}

/// Collapse runs of whitespace to a single space and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn push_escaped_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Sample &amp; Co</title>
    <link rel="stylesheet" href="/app.css">
    <style>body { color: red; }</style>
    <script>alert("tracking");</script>
</head>
<body onload="boot()" data-page="home">
    <!-- navigation -->
    <noscript>Enable JS</noscript>
    <svg viewBox="0 0 10 10"><circle r="4"/></svg>
    <div id="main" class="wrapper grid" style="margin: 0" data-test="x">
        <a href="/login" onclick="track()" aria-label="Log in">Login</a>
        <input type="text" name="q" placeholder="Search" autocomplete="off">
        <p>Hello    <b>world</b>   again</p>
    </div>
</body>
</html>"#;

    #[test]
    fn test_removes_non_content_subtrees() {
        let cleaned = simplify_html(SAMPLE);
        for tag in ["<script", "<style", "<svg", "<meta", "<link", "<noscript"] {
            assert!(!cleaned.contains(tag), "{tag} should be removed:\n{cleaned}");
        }
        assert!(!cleaned.contains("tracking"));
        assert!(!cleaned.contains("color: red"));
        assert!(!cleaned.contains("Enable JS"));
    }

    #[test]
    fn test_keeps_only_allow_listed_attributes() {
        let cleaned = simplify_html(SAMPLE);
        assert!(cleaned.contains(r#"id="main""#));
        assert!(cleaned.contains(r#"class="wrapper grid""#));
        assert!(cleaned.contains(r#"href="/login""#));
        assert!(cleaned.contains(r#"aria-label="Log in""#));
        assert!(cleaned.contains(r#"type="text""#));
        assert!(cleaned.contains(r#"name="q""#));
        assert!(cleaned.contains(r#"placeholder="Search""#));

        assert!(!cleaned.contains("style="));
        assert!(!cleaned.contains("data-"));
        assert!(!cleaned.contains("onclick"));
        assert!(!cleaned.contains("onload"));
        assert!(!cleaned.contains("autocomplete"));
    }

    #[test]
    fn test_keeps_visible_content() {
        let cleaned = simplify_html(SAMPLE);
        assert!(cleaned.contains("Login"));
        assert!(cleaned.contains("Hello"));
        assert!(cleaned.contains("world"));
        assert!(cleaned.contains("Sample &amp; Co"));
    }

    #[test]
    fn test_drops_comments() {
        let cleaned = simplify_html(SAMPLE);
        assert!(!cleaned.contains("navigation"));
        assert!(!cleaned.contains("<!--"));
    }

    #[test]
    fn test_idempotent() {
        let once = simplify_html(SAMPLE);
        let twice = simplify_html(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_on_adjacent_text_around_stripped_tags() {
        // Text separated only by a removed subtree merges into one node on
        // re-parse; the serializer must produce the same line either way.
        let html = "<p>before <script>x()</script> after</p>";
        let once = simplify_html(html);
        assert!(once.contains("before after"));
        assert_eq!(once, simplify_html(&once));
    }

    #[test]
    fn test_collapses_whitespace_runs_in_text() {
        let cleaned = simplify_html("<p>a \n\t  b</p>");
        assert!(cleaned.contains("a b"));
        assert!(!cleaned.contains("a  b"));
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let cleaned = simplify_html("<div><input type=\"text\"><br></div>");
        assert!(cleaned.contains("<input type=\"text\">"));
        assert!(!cleaned.contains("</input>"));
        assert!(!cleaned.contains("</br>"));
        assert_eq!(cleaned, simplify_html(&cleaned));
    }

    #[test]
    fn test_empty_input_yields_stable_skeleton() {
        let once = simplify_html("");
        // html5ever always builds the html/head/body skeleton.
        assert!(once.contains("<html>"));
        assert_eq!(once, simplify_html(&once));
    }

    #[test]
    fn test_escapes_survive_round_trip() {
        let html = r#"<p title="5 > 3">a &lt; b &amp; c</p>"#;
        let once = simplify_html(html);
        assert!(once.contains("a &lt; b &amp; c"));
        assert!(!once.contains("title="));
        assert_eq!(once, simplify_html(&once));
    }
}
