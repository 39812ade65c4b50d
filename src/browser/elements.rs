//! Records produced by the page-side element queries.

use serde::{Deserialize, Serialize};

/// An interactive element discovered by the page scanner.
///
/// Produced fresh on every scan; the descriptor has no identity beyond the
/// DOM snapshot it was taken from. The `selector` is a best-effort CSS
/// selector (`tag#id`, `tag.firstClass`, or bare tag as a last resort) and
/// may be non-unique in the fallback case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Derived visible text or accessible label, whitespace-collapsed and
    /// truncated to 100 characters.
    pub name: String,

    /// Best-effort CSS selector addressing the element.
    pub selector: String,

    /// Resolved `href` for anchors, raw `href` attribute otherwise, or null.
    pub link: Option<String>,
}

/// Outcome of a text-based element search, captured before the click fires.
///
/// The click may mutate or remove the element, so the identifying fields are
/// read first and carried back to the caller unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub found: bool,
    pub tag: String,
    /// Element text truncated to 100 characters.
    pub text: String,
    pub id: String,
    #[serde(rename = "className")]
    pub class_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_serializes_missing_link_as_null() {
        let descriptor = ElementDescriptor {
            name: "Submit".to_string(),
            selector: "button#submit".to_string(),
            link: None,
        };

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "Submit");
        assert_eq!(json["selector"], "button#submit");
        assert!(json["link"].is_null());
    }

    #[test]
    fn test_descriptor_round_trip_with_link() {
        let descriptor = ElementDescriptor {
            name: "Docs".to_string(),
            selector: "a.nav".to_string(),
            link: Some("https://example.com/docs".to_string()),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let back: ElementDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.link.as_deref(), Some("https://example.com/docs"));
    }

    #[test]
    fn test_match_result_uses_camel_case_class_name() {
        let json = serde_json::json!({
            "found": true,
            "tag": "button",
            "text": "Login",
            "id": "login-btn",
            "className": "btn btn-primary"
        });

        let result: MatchResult = serde_json::from_value(json).unwrap();
        assert!(result.found);
        assert_eq!(result.class_name, "btn btn-primary");

        let back = serde_json::to_value(&result).unwrap();
        assert!(back.get("className").is_some());
        assert!(back.get("class_name").is_none());
    }
}
