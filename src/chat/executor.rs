//! Applies synthesized SQL to a snapshot inside an isolated scope.
//!
//! Each application gets a fresh in-memory DuckDB connection holding exactly
//! one table, `df`, loaded from a copy of the snapshot. The synthesized SQL
//! can only reach that table; the surrounding process, filesystem and network
//! are not part of the scope. After the batch runs, `df` is read back as the
//! result; SQL that never touched it yields the unchanged copy, which is a
//! valid no-op.

use duckdb::types::Value as DuckValue;
use duckdb::{params_from_iter, Connection};
use serde_json::Value;
use tracing::warn;

use crate::table::{safe, Table};

pub const TABLE_NAME: &str = "df";

#[derive(Debug)]
pub enum Outcome {
    Applied(Table),
    Failed(String),
}

/// Never panics past this boundary: every failure is captured into
/// `Outcome::Failed` and the caller's snapshot stays untouched.
pub fn apply(table: &Table, sql: &str) -> Outcome {
    match run(table, sql) {
        Ok(result) => Outcome::Applied(result),
        Err(e) => {
            warn!("Transformation failed: {}", e);
            Outcome::Failed(e.to_string())
        }
    }
}

fn run(table: &Table, sql: &str) -> duckdb::Result<Table> {
    if table.columns.is_empty() {
        return Err(duckdb::Error::InvalidQuery);
    }

    let conn = Connection::open_in_memory()?;
    load(&conn, table)?;
    conn.execute_batch(sql)?;
    read_back(&conn)
}

fn load(conn: &Connection, table: &Table) -> duckdb::Result<()> {
    let column_defs: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{} {}", quote_ident(name), infer_type(table, i)))
        .collect();

    conn.execute_batch(&format!(
        "CREATE TABLE {} ({});",
        TABLE_NAME,
        column_defs.join(", ")
    ))?;

    if table.rows.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; table.columns.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} VALUES ({})",
        TABLE_NAME, placeholders
    ))?;
    for row in &table.rows {
        let values: Vec<DuckValue> = row.iter().map(safe::duck_from_json).collect();
        stmt.execute(params_from_iter(values))?;
    }
    Ok(())
}

fn read_back(conn: &Connection) -> duckdb::Result<Table> {
    // Schema first, so a zero-row result still carries its columns.
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns
         WHERE table_name = ? ORDER BY ordinal_position",
    )?;
    let columns: Vec<String> = stmt
        .query_map([TABLE_NAME], |row| row.get(0))?
        .collect::<duckdb::Result<_>>()?;

    if columns.is_empty() {
        // The synthesized SQL dropped the working table.
        return Err(duckdb::Error::QueryReturnedNoRows);
    }

    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", TABLE_NAME))?;
    let mut duck_rows = stmt.query([])?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    while let Some(row) = duck_rows.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: DuckValue = row.get(i)?;
            cells.push(safe::json_from_duck(value));
        }
        rows.push(cells);
    }

    Ok(Table::new(columns, rows))
}

/// A column is typed by the widest scalar it holds; anything mixed or
/// non-numeric lands on VARCHAR and DuckDB casts inserts accordingly.
fn infer_type(table: &Table, col: usize) -> &'static str {
    let mut saw_bool = false;
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_other = false;

    for row in &table.rows {
        match &row[col] {
            Value::Null => {}
            Value::Bool(_) => saw_bool = true,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    saw_int = true;
                } else {
                    saw_float = true;
                }
            }
            _ => saw_other = true,
        }
    }

    if saw_other || (saw_bool && (saw_int || saw_float)) {
        "VARCHAR"
    } else if saw_bool {
        "BOOLEAN"
    } else if saw_float {
        "DOUBLE"
    } else if saw_int {
        "BIGINT"
    } else {
        "VARCHAR"
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::new(
            vec!["a".into(), "label".into()],
            vec![
                vec![json!(1), json!("keep")],
                vec![json!(2), json!("drop")],
                vec![json!(3), json!("keep")],
            ],
        )
    }

    #[test]
    fn filter_produces_a_new_snapshot() {
        let outcome = apply(&sample(), "DELETE FROM df WHERE label = 'drop';");
        match outcome {
            Outcome::Applied(table) => {
                assert_eq!(table.row_count(), 2);
                assert_eq!(table.columns, vec!["a", "label"]);
            }
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn untouched_table_is_a_no_op_result() {
        let table = sample();
        match apply(&table, "SELECT count(*) FROM df;") {
            Outcome::Applied(result) => assert_eq!(result, table),
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn bad_sql_is_captured_not_raised() {
        match apply(&sample(), "DELETE FROM df WHERE nonsense_column = 1;") {
            Outcome::Failed(msg) => assert!(!msg.is_empty()),
            Outcome::Applied(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn dropping_the_working_table_fails() {
        assert!(matches!(
            apply(&sample(), "DROP TABLE df;"),
            Outcome::Failed(_)
        ));
    }

    #[test]
    fn added_columns_come_back() {
        let sql = "ALTER TABLE df ADD COLUMN note VARCHAR; UPDATE df SET note = 'x';";
        match apply(&sample(), sql) {
            Outcome::Applied(table) => {
                assert_eq!(table.columns, vec!["a", "label", "note"]);
                assert_eq!(table.rows[0][2], json!("x"));
            }
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn deleting_everything_keeps_the_schema() {
        match apply(&sample(), "DELETE FROM df;") {
            Outcome::Applied(table) => {
                assert_eq!(table.row_count(), 0);
                assert_eq!(table.columns, vec!["a", "label"]);
            }
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn non_finite_results_serialize_as_strings() {
        let table = Table::new(vec!["x".into()], vec![vec![json!(1.5)]]);
        match apply(&table, "UPDATE df SET x = CAST('nan' AS DOUBLE);") {
            Outcome::Applied(result) => assert_eq!(result.rows[0][0], json!("NaN")),
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn nulls_and_mixed_columns_round_trip() {
        let table = Table::new(
            vec!["v".into()],
            vec![vec![json!("7")], vec![Value::Null], vec![json!("text")]],
        );
        match apply(&table, "SELECT 1;") {
            Outcome::Applied(result) => {
                assert_eq!(result.rows[1][0], Value::Null);
                assert_eq!(result.rows[2][0], json!("text"));
            }
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn quoted_column_names_survive() {
        let table = Table::new(
            vec!["first name".into()],
            vec![vec![json!("ana")]],
        );
        match apply(&table, "UPDATE df SET \"first name\" = upper(\"first name\");") {
            Outcome::Applied(result) => assert_eq!(result.rows[0][0], json!("ANA")),
            Outcome::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[test]
    fn empty_table_cannot_enter_the_scope() {
        let table = Table::new(vec![], vec![]);
        assert!(matches!(apply(&table, "SELECT 1;"), Outcome::Failed(_)));
    }
}
