// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it;
// this file only holds the pieces more than one of them appends.

/// Closing instruction for every system prompt whose reply is parsed as JSON.
pub const JSON_ONLY_REPLY: &str =
    "Формат ответа — строго JSON без markdown-обёртки, без пояснений до или после.";

/// Hard rule shared by the writer and the editor prompts.
pub const RUSSIAN_ONLY: &str = "Текст ТОЛЬКО на русском языке.";

/// Appends the JSON-only instruction and the expected reply shape to a system prompt.
pub fn with_json_reply(system: &str, schema: &str) -> String {
    format!("{system}\n\n{JSON_ONLY_REPLY}\n{schema}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_json_reply_appends_schema_last() {
        let prompt = with_json_reply("Ты редактор.", r#"{"text":"..."}"#);
        assert!(prompt.starts_with("Ты редактор.\n\n"));
        assert!(prompt.contains(JSON_ONLY_REPLY));
        assert!(prompt.ends_with(r#"{"text":"..."}"#));
    }
}
