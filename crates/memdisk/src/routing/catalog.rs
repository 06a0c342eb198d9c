//! Catalog summaries shown to the selection model
//!
//! The selection step never sees full disk content. Each disk is reduced to
//! a short block: persona line, skills, knowledge themes and at most two
//! quotes. Disks without any of those fields fall back to a field listing
//! (objects) or a text excerpt (strings).

use serde_json::{Map, Value};

use crate::disk::DiskContent;

const MAX_LINE_CHARS: usize = 200;
const MAX_LIST_ITEMS: usize = 12;
const MAX_QUOTES: usize = 2;

/// Summarize one disk under a `[name]` header
pub fn summarize_disk(name: &str, content: &DiskContent) -> String {
    let mut lines = vec![format!("[{name}]")];

    match content {
        Value::Object(map) => {
            let before = lines.len();
            if let Some(persona) = persona_line(map) {
                lines.push(format!("persona: {persona}"));
            }
            let skills = skills(map);
            if !skills.is_empty() {
                lines.push(format!("skills: {}", skills.join(", ")));
            }
            let themes = knowledge_themes(map);
            if !themes.is_empty() {
                lines.push(format!("knowledge: {}", themes.join(", ")));
            }
            for quote in quotes(map) {
                lines.push(format!("quote: \"{quote}\""));
            }
            if lines.len() == before {
                let keys: Vec<&str> = map.keys().take(MAX_LIST_ITEMS).map(String::as_str).collect();
                lines.push(format!("fields: {}", keys.join(", ")));
            }
        }
        Value::String(text) => lines.push(format!("text: {}", clip(text))),
        other => lines.push(format!("value: {}", clip(&other.to_string()))),
    }

    lines.join("\n")
}

/// Summaries of every disk, in the given order, separated by blank lines
pub fn build_catalog<'a, I>(disks: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a DiskContent)>,
{
    disks
        .into_iter()
        .map(|(name, content)| summarize_disk(name, content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn persona_line(map: &Map<String, Value>) -> Option<String> {
    match map.get("persona") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(clip(s.trim())),
        Some(Value::Object(persona)) => joined_fields(persona),
        _ => joined_fields(map),
    }
}

fn joined_fields(map: &Map<String, Value>) -> Option<String> {
    let parts: Vec<&str> = ["name", "role", "description", "summary"]
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(clip(&parts.join(" - ")))
    }
}

fn skills(map: &Map<String, Value>) -> Vec<String> {
    let Some(Value::Array(items)) = map.get("skills") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| label(item, &["name", "skill", "title"]))
        .take(MAX_LIST_ITEMS)
        .collect()
}

fn knowledge_themes(map: &Map<String, Value>) -> Vec<String> {
    match map.get("knowledge") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| label(item, &["theme", "topic", "title", "name"]))
            .take(MAX_LIST_ITEMS)
            .collect(),
        Some(Value::Object(knowledge)) => knowledge
            .keys()
            .filter(|k| k.as_str() != "quotes")
            .take(MAX_LIST_ITEMS)
            .cloned()
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![clip(s.trim())],
        _ => Vec::new(),
    }
}

fn quotes(map: &Map<String, Value>) -> Vec<String> {
    let source = map.get("quotes").or_else(|| {
        map.get("knowledge")
            .and_then(Value::as_object)
            .and_then(|k| k.get("quotes"))
    });
    let Some(Value::Array(items)) = source else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| label(item, &["text", "quote"]))
        .take(MAX_QUOTES)
        .collect()
}

/// A list entry as text: the string itself, or the first named field
fn label(item: &Value, keys: &[&str]) -> Option<String> {
    let text = match item {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str)),
        _ => None,
    }?;
    let text = text.trim();
    (!text.is_empty()).then(|| clip(text))
}

fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_LINE_CHARS {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(MAX_LINE_CHARS).collect();
    clipped.push_str("...");
    clipped
}
