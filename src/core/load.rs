use crate::domain::model::{EnrichedRecord, Table};
use crate::utils::error::{EtlError, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Writes the table as CSV with a header row, replacing any existing file.
pub fn load_to_csv<P: AsRef<Path>>(table: &Table<EnrichedRecord>, path: P) -> Result<()> {
    let path = path.as_ref();
    let storage_err =
        |e: csv::Error| EtlError::storage(format!("Writing CSV to {}: {}", path.display(), e));

    let mut writer = csv::Writer::from_path(path).map_err(storage_err)?;
    writer.write_record(table.columns()).map_err(storage_err)?;

    for record in table {
        let mut fields = Vec::with_capacity(table.columns().len());
        fields.push(record.name().to_string());
        fields.push(record.market_cap_usd().to_string());
        fields.extend(record.conversions().iter().map(|c| c.value.to_string()));
        writer.write_record(&fields).map_err(storage_err)?;
    }

    writer
        .flush()
        .map_err(|e| EtlError::storage(format!("Flushing CSV {}: {}", path.display(), e)))?;

    tracing::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replaces `table_name` with a fresh table holding every row, in order.
/// The first column is stored as TEXT and all monetary columns as REAL.
pub fn load_to_db(table: &Table<EnrichedRecord>, table_name: &str, conn: &Connection) -> Result<()> {
    let storage_err = |e: rusqlite::Error| {
        EtlError::storage(format!("Writing table {}: {}", table_name, e))
    };

    let target = quote_identifier(table_name);
    let definitions = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let sql_type = if i == 0 { "TEXT" } else { "REAL" };
            format!("{} {}", quote_identifier(column), sql_type)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=table.columns().len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.unchecked_transaction().map_err(storage_err)?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {target}; CREATE TABLE {target} ({definitions});"
    ))
    .map_err(storage_err)?;

    {
        let mut insert = tx
            .prepare(&format!("INSERT INTO {target} VALUES ({placeholders})"))
            .map_err(storage_err)?;

        for record in table {
            let values = std::iter::once(Value::Text(record.name().to_string()))
                .chain(std::iter::once(Value::Real(record.market_cap_usd())))
                .chain(record.conversions().iter().map(|c| Value::Real(c.value)));
            insert.execute(params_from_iter(values)).map_err(storage_err)?;
        }
    }

    tx.commit().map_err(storage_err)?;

    tracing::debug!("Inserted {} rows into {}", table.len(), table_name);
    Ok(())
}
