pub mod ops;
pub mod safe;

use serde_json::{Map, Value};

/// One versioned state of the working table. Snapshots are immutable once
/// pushed onto a session's stack; transformations always operate on a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Ingests a raw client row-set. Column order is first-seen order across
    /// all records. Blank-string cells become null, and rows that end up
    /// entirely null are dropped.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let row: Vec<Value> = columns
                .iter()
                .map(|col| clean_cell(record.get(col).cloned().unwrap_or(Value::Null)))
                .collect();
            if row.iter().any(|v| !v.is_null()) {
                rows.push(row);
            }
        }

        Self { columns, rows }
    }

    /// Renders the JSON row-set shape used by the API layer.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (col, cell) in self.columns.iter().zip(row.iter()) {
                    record.insert(col.clone(), cell.clone());
                }
                record
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Compact textual preview for the synthesis prompt: header plus the
    /// first `limit` rows, pipe-separated.
    pub fn preview(&self, limit: usize) -> String {
        let mut out = self.columns.join(" | ");
        for row in self.rows.iter().take(limit) {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            out.push_str(&cells.join(" | "));
        }
        out
    }
}

fn clean_cell(value: Value) -> Value {
    match value {
        Value::String(s) if s.trim().is_empty() => Value::Null,
        other => other,
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
