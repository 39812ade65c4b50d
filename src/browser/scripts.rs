//! Named in-page scripts evaluated against the active page.
//!
//! The candidate query and the visibility predicate are defined once and
//! spliced into both the element scanner and the text locator, so the two
//! operations can never drift apart in what they consider clickable or
//! visible.

/// CSS query for the elements an agent can usefully interact with.
pub const INTERACTIVE_QUERY: &str =
    r#"button, a, input, select, textarea, [role="button"], [onclick]"#;

/// Defines `isVisible(el)`: positive rendered box, not hidden, not
/// `display:none`. An element failing this is invisible to a human user and
/// must be neither surfaced nor clicked.
const VISIBILITY_PREDICATE: &str = r#"const isVisible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
               style.visibility !== 'hidden' && style.display !== 'none';
    };"#;

/// Script enumerating visible interactive elements in DOM order.
///
/// Each entry carries a derived name (innerText, placeholder, value, or
/// aria-label, whichever is non-empty first), a best-effort CSS selector,
/// and a link when the element has one. Unnamed elements are dropped unless
/// they are form controls, whose selector alone is the useful signal.
pub fn scan_interactive_elements() -> String {
    format!(
        r#"(() => {{
    {VISIBILITY_PREDICATE}
    const items = [];
    document.querySelectorAll('{INTERACTIVE_QUERY}').forEach((el) => {{
        if (!isVisible(el)) return;

        const tag = el.tagName.toLowerCase();

        let selector = tag;
        if (el.id) {{
            selector += '#' + el.id;
        }} else if (el.className && typeof el.className === 'string' && el.className.trim() !== '') {{
            selector += '.' + el.className.trim().split(/\s+/)[0];
        }}

        let name = el.innerText || el.placeholder || el.value || el.getAttribute('aria-label') || '';
        name = name.replace(/\s+/g, ' ').trim().substring(0, 100);

        if (!name && !['input', 'select', 'textarea'].includes(tag)) return;

        let link = null;
        if (tag === 'a' && el.href) {{
            link = el.href;
        }} else if (el.getAttribute('href')) {{
            link = el.getAttribute('href');
        }}

        items.push({{ name: name, selector: selector, link: link }});
    }});
    return items;
}})()"#
    )
}

/// Script locating the first visible element whose comparable text matches
/// and clicking it.
///
/// The search text goes into the page as a JSON argument object, never by
/// splicing raw text into the script source. Element info is captured before
/// the click fires, since the click may replace the DOM.
pub fn click_by_text(text: &str, exact_match: bool) -> String {
    let args = serde_json::json!({ "text": text, "exactMatch": exact_match });
    format!(
        r#"((args) => {{
    const text = args.text;
    const exactMatch = args.exactMatch;
    {VISIBILITY_PREDICATE}
    const candidates = Array.from(document.querySelectorAll('{INTERACTIVE_QUERY}'));
    let target = null;
    for (const el of candidates) {{
        if (!isVisible(el)) continue;
        const elementText = (el.innerText || el.value || el.getAttribute('aria-label') || '').trim();
        if (exactMatch) {{
            if (elementText === text) {{ target = el; break; }}
        }} else {{
            if (elementText.toLowerCase().includes(text.toLowerCase())) {{ target = el; break; }}
        }}
    }}
    if (!target) {{
        return {{ found: false, tag: '', text: '', id: '', className: '' }};
    }}
    const info = {{
        found: true,
        tag: target.tagName.toLowerCase(),
        text: (target.innerText || target.value || '').substring(0, 100),
        id: target.id,
        className: (typeof target.className === 'string') ? target.className : ''
    }};
    target.click();
    return info;
}})({args})"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_and_locator_share_candidate_query() {
        let scan = scan_interactive_elements();
        let click = click_by_text("Login", false);
        assert!(scan.contains(INTERACTIVE_QUERY));
        assert!(click.contains(INTERACTIVE_QUERY));
    }

    #[test]
    fn test_scanner_and_locator_share_visibility_predicate() {
        let scan = scan_interactive_elements();
        let click = click_by_text("Login", false);
        assert!(scan.contains("const isVisible"));
        assert!(click.contains("const isVisible"));
        assert!(scan.contains("rect.width > 0 && rect.height > 0"));
        assert!(click.contains("rect.width > 0 && rect.height > 0"));
    }

    #[test]
    fn test_click_script_embeds_arguments_as_json() {
        // Quotes and backslashes in the search text must not break out of
        // the argument object.
        let script = click_by_text(r#"say "hi" \ bye"#, true);
        assert!(script.contains(r#""text":"say \"hi\" \\ bye""#));
        assert!(!script.contains(r#"say "hi""#));
    }

    #[test]
    fn test_click_script_carries_exact_match_flag() {
        assert!(click_by_text("x", true).contains("\"exactMatch\":true"));
        assert!(click_by_text("x", false).contains("\"exactMatch\":false"));
    }
}
