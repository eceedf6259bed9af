//! Best-effort audit trail for accepted transformations.
//!
//! A secondary model call summarizes the turn into a title and description;
//! both the summary call and the storage write are allowed to fail without
//! touching the transformation result the user already received.

use tracing::{info, warn};

use crate::db::{service::DbService, DbPool};
use crate::llm::models::{ChatMessage, ChatOptions};
use crate::llm::LlmProvider;

pub const FALLBACK_TITLE: &str = "Data transformation";
pub const FALLBACK_DESCRIPTION: &str = "Transformation applied through the chat assistant.";

const SUMMARY_PROMPT: &str = "Summarize the data transformation below in two lines, \
exactly in this format and nothing else:\nTitle: <at most six words>\nDescription: <one sentence>";

pub async fn record_action(
    llm: &dyn LlmProvider,
    pool: &DbPool,
    session_id: &str,
    instruction: &str,
    sql: &str,
) {
    let (title, description) = summarize(llm, instruction, sql).await;

    let result = {
        let conn = pool.lock().unwrap();
        DbService::insert_action(&conn, session_id, instruction, sql, &title, &description)
    };

    match result {
        Ok(record) => info!("Audit record {} stored for session {}", record.id, session_id),
        Err(e) => warn!("Failed to persist audit record for session {}: {}", session_id, e),
    }
}

async fn summarize(llm: &dyn LlmProvider, instruction: &str, sql: &str) -> (String, String) {
    let request = ChatMessage::user(format!(
        "Instruction: {}\n\nSQL applied:\n{}",
        instruction, sql
    ));
    let options = ChatOptions {
        system_prompt: Some(SUMMARY_PROMPT.to_string()),
        temperature: Some(0.0),
        max_tokens: Some(200),
        ..Default::default()
    };

    match llm.complete(&[request], options).await {
        Ok(reply) => parse_summary(&reply),
        Err(e) => {
            warn!("Audit summary call failed: {}", e);
            (FALLBACK_TITLE.to_string(), FALLBACK_DESCRIPTION.to_string())
        }
    }
}

/// Pulls `Title:` / `Description:` lines out of the reply; anything that
/// doesn't parse falls back to the fixed placeholders.
pub fn parse_summary(raw: &str) -> (String, String) {
    let mut title = None;
    let mut description = None;

    for line in raw.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Title:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                title = Some(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("Description:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                description = Some(rest.to_string());
            }
        }
    }

    (
        title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        description.unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_summary_parses() {
        let (title, description) =
            parse_summary("Title: Remove duplicates\nDescription: Dropped repeated rows.");
        assert_eq!(title, "Remove duplicates");
        assert_eq!(description, "Dropped repeated rows.");
    }

    #[test]
    fn malformed_summary_falls_back() {
        let (title, description) = parse_summary("I cannot help with that.");
        assert_eq!(title, FALLBACK_TITLE);
        assert_eq!(description, FALLBACK_DESCRIPTION);
    }

    #[test]
    fn partial_summary_falls_back_per_field() {
        let (title, description) = parse_summary("Title: Filter rows\nDescription:");
        assert_eq!(title, "Filter rows");
        assert_eq!(description, FALLBACK_DESCRIPTION);
    }
}
