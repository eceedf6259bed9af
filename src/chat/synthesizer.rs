//! Turns a natural-language instruction into either a plain reply or a
//! delimited SQL transformation, via the configured LLM provider.

use crate::llm::models::{ChatMessage, ChatOptions};
use crate::llm::{LlmError, LlmProvider};
use crate::table::Table;

pub const CODE_START: &str = "###SQL###";
pub const CODE_END: &str = "###END_SQL###";

/// What one synthesis call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesis {
    /// No code markers: the whole reply is a conversational message.
    Reply(String),
    /// A transformation plus the friendly text that preceded it.
    Transform { sql: String, message: String },
}

pub async fn synthesize(
    llm: &dyn LlmProvider,
    table: &Table,
    transcript: &[ChatMessage],
    preview_rows: usize,
    max_history_messages: usize,
) -> Result<Synthesis, LlmError> {
    let system_prompt = build_system_prompt(table, preview_rows);

    let start = transcript.len().saturating_sub(max_history_messages);
    let window = &transcript[start..];

    let options = ChatOptions {
        system_prompt: Some(system_prompt),
        temperature: Some(0.0),
        ..Default::default()
    };

    let raw = llm.complete(window, options).await?;
    Ok(parse_reply(&raw))
}

pub fn build_system_prompt(table: &Table, preview_rows: usize) -> String {
    format!(
        r#"You are a data cleaning assistant working on a single table.

The table lives in DuckDB under the name `df` with these columns: {columns}.

Sample rows:
{preview}

RULES:
1. When the user asks for a change to the data, answer with a short friendly
   message followed by DuckDB SQL that modifies `df` IN PLACE, in this exact
   format:

   [your message]
   {start}
   [SQL statements against df]
   {end}

2. Only ever read and write the table `df`. Never CREATE other tables or
   views, never ATTACH files, and never invent rows that are not derived from
   the existing data.
3. Use the EXACT column names listed above, quoted with double quotes when
   they contain spaces.
4. When the user is just chatting or asking a question, answer in plain text
   with no {start} block.
5. Keep messages short. Never explain the SQL."#,
        columns = table.columns.join(", "),
        preview = table.preview(preview_rows),
        start = CODE_START,
        end = CODE_END,
    )
}

/// Marker-based extraction, independent of any formatting noise around the
/// block. Both markers must be present for the reply to count as code.
pub fn parse_reply(raw: &str) -> Synthesis {
    let Some(start_idx) = raw.find(CODE_START) else {
        return Synthesis::Reply(raw.trim().to_string());
    };
    let after_start = &raw[start_idx + CODE_START.len()..];
    let Some(end_idx) = after_start.find(CODE_END) else {
        return Synthesis::Reply(raw.trim().to_string());
    };

    let sql = after_start[..end_idx].trim().to_string();
    let message = raw[..start_idx].trim().to_string();
    Synthesis::Transform { sql, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_is_a_reply() {
        let parsed = parse_reply("Hello! How can I help with your data?");
        assert_eq!(
            parsed,
            Synthesis::Reply("Hello! How can I help with your data?".into())
        );
    }

    #[test]
    fn delimited_block_is_a_transform() {
        let raw = "Removing empty rows!\n###SQL###\nDELETE FROM df WHERE a IS NULL;\n###END_SQL###\n";
        match parse_reply(raw) {
            Synthesis::Transform { sql, message } => {
                assert_eq!(sql, "DELETE FROM df WHERE a IS NULL;");
                assert_eq!(message, "Removing empty rows!");
            }
            other => panic!("expected transform, got {:?}", other),
        }
    }

    #[test]
    fn missing_end_marker_falls_back_to_reply() {
        let raw = "Sure!\n###SQL###\nDELETE FROM df;";
        assert!(matches!(parse_reply(raw), Synthesis::Reply(_)));
    }

    #[test]
    fn trailing_noise_after_end_marker_is_ignored() {
        let raw = "Done.\n###SQL###\nUPDATE df SET a = 1;\n###END_SQL###\nAnything else?";
        match parse_reply(raw) {
            Synthesis::Transform { sql, .. } => assert_eq!(sql, "UPDATE df SET a = 1;"),
            other => panic!("expected transform, got {:?}", other),
        }
    }

    #[test]
    fn system_prompt_embeds_a_bounded_preview() {
        let table = Table::new(
            vec!["a".into()],
            (0..20).map(|i| vec![json!(i)]).collect(),
        );
        let prompt = build_system_prompt(&table, 3);
        assert!(prompt.contains("a"));
        assert!(prompt.contains(CODE_START));
        assert!(!prompt.contains("19"));
    }
}
