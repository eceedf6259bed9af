//! The per-turn pipeline: undo check, synthesis, execution, audit, response.

pub mod audit;
pub mod executor;
pub mod session;
pub mod synthesizer;
pub mod undo;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::llm::models::ChatMessage;
use crate::llm::{LlmError, LlmProvider};
use crate::table::Table;
use executor::Outcome;
use session::{SessionHandle, SessionStore};
use synthesizer::Synthesis;

#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub instruction: String,
    /// Row data for the root snapshot; only meaningful on a session's first turn.
    pub raw_data: Option<Vec<Map<String, Value>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub message: String,
    pub data: Vec<Map<String, Value>>,
    pub stack_depth: usize,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("instruction must not be empty")]
    InvalidInstruction,
    #[error("unknown session and no row data to start one from")]
    MissingData,
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] LlmError),
}

pub struct TurnEngine {
    llm: Arc<dyn LlmProvider>,
    pool: DbPool,
    sessions: SessionStore,
    preview_rows: usize,
    max_history_messages: usize,
    max_snapshots: usize,
}

impl TurnEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, pool: DbPool, config: &AppConfig) -> Self {
        Self {
            llm,
            pool,
            sessions: SessionStore::new(
                Duration::from_secs(config.session.ttl_secs),
                config.session.capacity,
            ),
            preview_rows: config.chat.preview_rows,
            max_history_messages: config.chat.max_history_messages,
            max_snapshots: config.chat.max_snapshots,
        }
    }

    /// Runs one conversation turn. Execution failures are NOT errors here:
    /// they come back as a normal response carrying the failure message and
    /// the unchanged snapshot, so the conversation can continue.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        let instruction = request.instruction.trim().to_string();
        if instruction.is_empty() {
            return Err(TurnError::InvalidInstruction);
        }

        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let handle = self.resolve_session(&session_id, request.raw_data)?;

        // One turn holds the session lock end to end; turns against the same
        // session serialize while other sessions proceed.
        let mut state = handle.lock().await;
        state
            .transcript
            .push(ChatMessage::user(instruction.clone()));

        // Cancellation wins over synthesis on every turn.
        if undo::is_cancellation(&instruction) {
            let message = if state.pop_snapshot() {
                info!("Session {}: undo applied", session_id);
                undo::UNDO_APPLIED_MSG
            } else {
                undo::NOTHING_TO_UNDO_MSG
            };
            return Ok(self.respond(&session_id, &mut state, message.to_string()));
        }

        let synthesis = synthesizer::synthesize(
            self.llm.as_ref(),
            state.current(),
            &state.transcript,
            self.preview_rows,
            self.max_history_messages,
        )
        .await?;

        let message = match synthesis {
            Synthesis::Reply(text) => text,
            Synthesis::Transform { sql, message } => {
                match executor::apply(state.current(), &sql) {
                    Outcome::Applied(new_table) => {
                        state.push_snapshot(new_table, self.max_snapshots);
                        audit::record_action(
                            self.llm.as_ref(),
                            &self.pool,
                            &session_id,
                            &instruction,
                            &sql,
                        )
                        .await;
                        success_message(&message, &sql)
                    }
                    Outcome::Failed(error) => {
                        format!("The transformation failed: {}. The table was left unchanged.", error)
                    }
                }
            }
        };

        Ok(self.respond(&session_id, &mut state, message))
    }

    fn resolve_session(
        &self,
        session_id: &str,
        raw_data: Option<Vec<Map<String, Value>>>,
    ) -> Result<SessionHandle, TurnError> {
        if let Some(handle) = self.sessions.get(session_id) {
            return Ok(handle);
        }
        let records = raw_data.ok_or(TurnError::MissingData)?;
        let root = Table::from_records(&records);
        Ok(self.sessions.get_or_create(session_id, || root))
    }

    fn respond(
        &self,
        session_id: &str,
        state: &mut session::SessionState,
        message: String,
    ) -> TurnResponse {
        state
            .transcript
            .push(ChatMessage::assistant(message.clone()));
        TurnResponse {
            session_id: session_id.to_string(),
            message,
            data: state.current().to_records(),
            stack_depth: state.stack.len(),
        }
    }
}

fn success_message(model_message: &str, sql: &str) -> String {
    let lead = if model_message.is_empty() {
        "Transformation applied."
    } else {
        model_message
    };
    format!("{}\n\n```sql\n{}\n```", lead, sql)
}
