//! Prompt for the disk selection step

/// Instructions given to the selection model ahead of the catalog
pub const SELECTION_INSTRUCTIONS: &str = r#"You route user prompts to memory disks. Each memory disk below is summarized with its persona, skills, knowledge themes and sample quotes.

Choose the disks whose memories would help answer the user prompt. Use the exact disk names shown in square brackets. If none of them clearly apply, choose the ones closest to the topic."#;

/// Response contract appended after the prompt
pub const SELECTION_RESPONSE_FORMAT: &str = r#"Respond ONLY with JSON in this exact format, with no other text:
{"selected": ["disk name", "..."], "notes": "one sentence on why these disks were chosen"}"#;

/// Render the selection prompt.
///
/// Built with `format!` rather than placeholder substitution so text inside
/// the user prompt or a disk summary can never be re-expanded.
pub fn render_selection_prompt(user_prompt: &str, catalog: &str) -> String {
    format!(
        "{SELECTION_INSTRUCTIONS}\n\nMemory disks:\n{catalog}\n\nUser prompt:\n{user_prompt}\n\n{SELECTION_RESPONSE_FORMAT}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_selection_prompt_contains_parts() {
        let prompt = render_selection_prompt("how do I bake bread?", "[baker.dsk]\npersona: Baker");
        assert!(prompt.contains("[baker.dsk]"));
        assert!(prompt.contains("User prompt:\nhow do I bake bread?"));
        assert!(prompt.ends_with(SELECTION_RESPONSE_FORMAT));
    }

    #[test]
    fn test_placeholders_in_input_are_literal() {
        let prompt = render_selection_prompt("{catalog}", "[a.dsk]");
        assert!(prompt.contains("User prompt:\n{catalog}"));
    }
}
