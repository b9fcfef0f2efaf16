use crate::core::transform::currency_column;
use crate::domain::model::QueryResult;
use crate::utils::error::{EtlError, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Currency whose converted column the default average query reads.
pub const DEFAULT_QUERY_CURRENCY: &str = "GBP";
/// Name column the default top-five query reads.
pub const DEFAULT_NAME_COLUMN: &str = "Name";

/// The three reporting queries: every row, the mean GBP market cap, and the top five names.
pub fn default_queries(table_name: &str) -> Vec<String> {
    vec![
        format!("SELECT * FROM {}", table_name),
        format!(
            "SELECT AVG({}) FROM {}",
            currency_column(DEFAULT_QUERY_CURRENCY),
            table_name
        ),
        format!("SELECT {} FROM {} LIMIT 5", DEFAULT_NAME_COLUMN, table_name),
    ]
}

/// Substitutes `{table}` in configured statements.
pub fn render_statement(template: &str, table_name: &str) -> String {
    template.replace(TABLE_PLACEHOLDER, table_name)
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!("<{} byte blob>", bytes.len())),
    }
}

pub fn run_query(statement: &str, conn: &Connection) -> Result<QueryResult> {
    let query_err = |e: rusqlite::Error| EtlError::QueryError {
        statement: statement.to_string(),
        message: e.to_string(),
    };

    let mut stmt = conn.prepare(statement).map_err(query_err)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(to_json))
                .collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(query_err)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(query_err)?;

    tracing::debug!("Query returned {} rows: {}", rows.len(), statement);

    Ok(QueryResult {
        statement: statement.to_string(),
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::load::load_to_db;
    use crate::core::transform::transform;
    use crate::domain::model::{EnrichedRecord, ExchangeRateTable, Record, Table};

    const BANKS: [(&str, &str); 7] = [
        ("JPMorgan Chase", "432.92"),
        ("Bank of America", "231.52"),
        ("Industrial and Commercial Bank of China", "194.56"),
        ("Agricultural Bank of China", "160.68"),
        ("HDFC Bank", "157.91"),
        ("Wells Fargo", "155.87"),
        ("HSBC Holdings PLC", "148.90"),
    ];

    fn enriched(count: usize) -> Table<EnrichedRecord> {
        let mut table = Table::new(vec!["Name".to_string(), "MC_USD_Billion".to_string()]);
        for (name, value) in BANKS.iter().take(count) {
            table.push(Record {
                name: name.to_string(),
                market_cap_usd: value.to_string(),
            });
        }
        let rates: ExchangeRateTable = [("EUR", 0.93), ("GBP", 0.8), ("INR", 82.95)]
            .into_iter()
            .map(|(c, r)| (c.to_string(), r))
            .collect();
        let currencies = vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()];
        transform(&table, &rates, &currencies).unwrap()
    }

    fn loaded(count: usize) -> (Connection, Table<EnrichedRecord>) {
        let conn = Connection::open_in_memory().unwrap();
        let table = enriched(count);
        load_to_db(&table, "Largest_banks", &conn).unwrap();
        (conn, table)
    }

    #[test]
    fn test_select_all_returns_every_row() {
        let (conn, table) = loaded(7);
        let queries = default_queries("Largest_banks");

        let result = run_query(&queries[0], &conn).unwrap();
        assert_eq!(result.columns, table.columns());
        assert_eq!(result.rows.len(), 7);
        assert_eq!(result.rows[0][0], serde_json::json!("JPMorgan Chase"));
        assert_eq!(result.rows[0][3], serde_json::json!(346.4));
    }

    #[test]
    fn test_average_matches_in_memory_mean() {
        let (conn, table) = loaded(7);
        let queries = default_queries("Largest_banks");

        let result = run_query(&queries[1], &conn).unwrap();
        let reported = result.rows[0][0].as_f64().unwrap();

        let gbp: Vec<f64> = table.iter().filter_map(|r| r.converted("GBP")).collect();
        let mean = gbp.iter().sum::<f64>() / gbp.len() as f64;
        assert!((reported - mean).abs() < 1e-9);
    }

    #[test]
    fn test_first_five_names_in_order() {
        for count in [3, 5, 7] {
            let (conn, table) = loaded(count);
            let queries = default_queries("Largest_banks");

            let result = run_query(&queries[2], &conn).unwrap();
            assert_eq!(result.columns, vec!["Name"]);
            assert_eq!(result.rows.len(), count.min(5));

            let names: Vec<&str> = result.rows.iter().map(|r| r[0].as_str().unwrap()).collect();
            let expected: Vec<&str> = table.iter().take(5).map(|r| r.name()).collect();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn test_bad_statement_is_query_error() {
        let (conn, _) = loaded(1);
        let result = run_query("SELECT nope FROM missing_table", &conn);
        match result {
            Err(EtlError::QueryError { statement, .. }) => {
                assert_eq!(statement, "SELECT nope FROM missing_table")
            }
            other => panic!("expected QueryError, got {:?}", other),
        }
    }

    #[test]
    fn test_render_statement() {
        assert_eq!(
            render_statement("SELECT Name, MC_EUR_Billion FROM {table}", "banks"),
            "SELECT Name, MC_EUR_Billion FROM banks"
        );
    }
}
