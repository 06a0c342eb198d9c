//! Defensive parsing of the selection model's answer

use tracing::{debug, warn};

use crate::routing::types::SelectionResponse;

/// What the classifier should do with a model answer
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Valid answer naming only known disks, in catalog order
    Chosen { names: Vec<String>, notes: String },
    /// Unusable answer: every loaded disk is relevant
    Fallback,
}

/// Return the first balanced `{...}` substring of `text`.
///
/// Braces inside JSON string literals are not counted. If the first `{`
/// never closes, there is no object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Interpret the raw model text against the catalog names.
///
/// Anything other than a parseable object with a non-empty `selected` list
/// made up entirely of catalog names is a fallback.
pub fn parse_selection(raw: &str, catalog: &[String]) -> Selection {
    let Some(object) = extract_json_object(raw) else {
        warn!("Selection response contained no JSON object, using all disks");
        return Selection::Fallback;
    };

    let response: SelectionResponse = match serde_json::from_str(object) {
        Ok(response) => response,
        Err(e) => {
            warn!("Selection response did not parse ({}), using all disks", e);
            return Selection::Fallback;
        }
    };

    if response.selected.is_empty() {
        debug!("Selection response chose no disks, using all disks");
        return Selection::Fallback;
    }

    if let Some(unknown) = response.selected.iter().find(|n| !catalog.contains(n)) {
        warn!(
            "Selection response named unknown disk '{}', using all disks",
            unknown
        );
        return Selection::Fallback;
    }

    let names = catalog
        .iter()
        .filter(|name| response.selected.contains(name))
        .cloned()
        .collect();

    Selection::Chosen {
        names,
        notes: response.notes.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        vec!["a.dsk".into(), "b.dsk".into(), "c.dsk".into()]
    }

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_object_inside_prose() {
        let raw = "Sure! Here you go:\n```json\n{\"selected\": [\"a.dsk\"], \"notes\": \"x\"}\n```\nAnything else? {}";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"selected\": [\"a.dsk\"], \"notes\": \"x\"}")
        );
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let raw = r#"{"notes": "a } and \" { inside", "selected": []} trailing }"#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"notes": "a } and \" { inside", "selected": []}"#)
        );
    }

    #[test]
    fn test_extract_unbalanced() {
        assert_eq!(extract_json_object("{\"selected\": [\"a.dsk\""), None);
        assert_eq!(extract_json_object("no json"), None);
    }

    #[test]
    fn test_parse_valid_selection_in_catalog_order() {
        let raw = r#"{"selected": ["c.dsk", "a.dsk", "a.dsk"], "notes": "both apply"}"#;
        assert_eq!(
            parse_selection(raw, &catalog()),
            Selection::Chosen {
                names: vec!["a.dsk".into(), "c.dsk".into()],
                notes: "both apply".into()
            }
        );
    }

    #[test]
    fn test_parse_missing_notes() {
        let raw = r#"{"selected": ["b.dsk"]}"#;
        assert_eq!(
            parse_selection(raw, &catalog()),
            Selection::Chosen {
                names: vec!["b.dsk".into()],
                notes: String::new()
            }
        );
    }

    #[test]
    fn test_parse_fallbacks() {
        for raw in [
            "I think disk a is best",
            r#"{"selected": []}"#,
            r#"{"selected": ["a.dsk", "ghost.dsk"]}"#,
            r#"{"selected": "a.dsk"}"#,
            r#"{"notes": "forgot the list"}"#,
        ] {
            assert_eq!(parse_selection(raw, &catalog()), Selection::Fallback, "{raw}");
        }
    }
}
