use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted log entry describing an accepted transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: i64,
    pub session_id: String,
    pub instruction: String,
    pub generated_code: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
