//! Manual cleaning primitives that don't need a round trip through the model.

use std::collections::HashSet;

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::table::Table;

/// Input patterns tried, in order, when standardizing a date column.
const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

impl Table {
    /// Drops duplicate rows, keeping the first occurrence.
    pub fn dedup_rows(&self) -> Table {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                let key = serde_json::to_string(row).unwrap_or_default();
                seen.insert(key)
            })
            .cloned()
            .collect();
        Table::new(self.columns.clone(), rows)
    }

    /// Blanks out every cell of a column. Unknown columns are a no-op.
    pub fn clear_column(&self, column: &str) -> Table {
        self.map_column(column, |_| Value::String(String::new()))
    }

    /// Title-cases string cells of a column.
    pub fn capitalize_column(&self, column: &str) -> Table {
        self.map_column(column, |cell| match cell {
            Value::String(s) => Value::String(title_case(s)),
            other => other.clone(),
        })
    }

    /// Strips non-digit characters from phone numbers; a leading zero is
    /// rewritten to `dial_prefix` when one is given.
    pub fn normalize_phone_column(&self, column: &str, dial_prefix: Option<&str>) -> Table {
        self.map_column(column, |cell| {
            let raw = match cell {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => return other.clone(),
            };
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            let normalized = match (digits.strip_prefix('0'), dial_prefix) {
                (Some(rest), Some(prefix)) => format!("{}{}", prefix, rest),
                _ => digits,
            };
            Value::String(normalized)
        })
    }

    /// Rewrites every cell of a date column to `output_format`. Cells that do
    /// not parse as a date under any known input pattern become null; an
    /// invalid output pattern is a no-op.
    pub fn standardize_date_column(&self, column: &str, output_format: &str) -> Table {
        let items: Vec<Item> = StrftimeItems::new(output_format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return self.clone();
        }
        self.map_column(column, |cell| {
            let raw = match cell {
                Value::String(s) => s.trim(),
                _ => return Value::Null,
            };
            match parse_date(raw) {
                Some(date) => Value::String(date.format(output_format).to_string()),
                None => Value::Null,
            }
        })
    }

    fn map_column<F>(&self, column: &str, f: F) -> Table
    where
        F: Fn(&Value) -> Value,
    {
        let Some(idx) = self.column_index(column) else {
            return self.clone();
        };
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row[idx] = f(&row[idx]);
                row
            })
            .collect();
        Table::new(self.columns.clone(), rows)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::new(
            vec!["name".into(), "phone".into()],
            vec![
                vec![json!("ana maria"), json!("06 12-34-56")],
                vec![json!("ana maria"), json!("06 12-34-56")],
                vec![json!("BO"), json!(712345678)],
            ],
        )
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let table = sample().dedup_rows();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0][0], json!("ana maria"));
    }

    #[test]
    fn capitalize_title_cases_strings_only() {
        let table = sample().capitalize_column("name");
        assert_eq!(table.rows[0][0], json!("Ana Maria"));
        assert_eq!(table.rows[2][0], json!("Bo"));
    }

    #[test]
    fn phone_normalization_strips_and_prefixes() {
        let table = sample().normalize_phone_column("phone", Some("+212"));
        assert_eq!(table.rows[0][1], json!("+2126123456"));
        assert_eq!(table.rows[2][1], json!("712345678"));
    }

    #[test]
    fn unknown_column_is_a_no_op() {
        let table = sample();
        assert_eq!(table.clear_column("missing"), table);
    }

    #[test]
    fn date_standardization_handles_mixed_input_formats() {
        let table = Table::new(
            vec!["joined".into()],
            vec![
                vec![json!("2024-01-05")],
                vec![json!("05/01/2024")],
                vec![json!("2024-01-05 13:45:00")],
            ],
        )
        .standardize_date_column("joined", "%d/%m/%Y");
        assert_eq!(table.rows[0][0], json!("05/01/2024"));
        assert_eq!(table.rows[1][0], json!("05/01/2024"));
        assert_eq!(table.rows[2][0], json!("05/01/2024"));
    }

    #[test]
    fn unparseable_dates_become_null() {
        let table = Table::new(
            vec!["joined".into()],
            vec![
                vec![json!("not a date")],
                vec![json!(42)],
                vec![json!("2024-02-29")],
            ],
        )
        .standardize_date_column("joined", "%Y-%m-%d");
        assert_eq!(table.rows[0][0], Value::Null);
        assert_eq!(table.rows[1][0], Value::Null);
        assert_eq!(table.rows[2][0], json!("2024-02-29"));
    }

    #[test]
    fn invalid_output_pattern_is_a_no_op() {
        let table = Table::new(vec!["d".into()], vec![vec![json!("2024-01-05")]]);
        assert_eq!(table.standardize_date_column("d", "%Q"), table);
    }
}
