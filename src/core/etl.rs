use crate::core::extract::Extractor;
use crate::core::load::{load_to_csv, load_to_db};
use crate::core::query::run_query;
use crate::core::transform::transform;
use crate::domain::model::{EnrichedRecord, ExchangeRateTable, QueryResult, Record, Table};
use crate::domain::ports::{ConfigProvider, DocumentSource};
use crate::utils::error::{EtlError, Result};
use crate::utils::logger::ProgressLog;
use rusqlite::Connection;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    CsvLoad,
    Connect,
    DatabaseLoad,
    Query,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "Extraction",
            Stage::Transform => "Transformation",
            Stage::CsvLoad => "CSV load",
            Stage::Connect => "Database connection",
            Stage::DatabaseLoad => "Database load",
            Stage::Query => "Query",
            Stage::Close => "Closing database connection",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub csv_path: String,
    pub table_name: String,
    pub query_results: Vec<QueryResult>,
}

/// Runs extract, transform, CSV load, database load and the reporting queries in
/// that order, writing a progress line after each step and a failure line
/// before aborting on the first error.
pub struct EtlEngine<S: DocumentSource, C: ConfigProvider> {
    source: S,
    config: C,
    log: ProgressLog,
}

impl<S: DocumentSource, C: ConfigProvider> EtlEngine<S, C> {
    pub fn new(source: S, config: C) -> Self {
        let log = ProgressLog::new(config.log_path());
        Self {
            source,
            config,
            log,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.log.log("Starting ETL Process")?;

        self.log.log("Starting Extract process from website")?;
        let extracted = self.guard(Stage::Extract, self.extract().await)?;
        tracing::debug!("Extracted {} records", extracted.len());
        self.log.log("Extraction from website has ended")?;

        self.log
            .log("Starting transformation, converting data and adding as columns")?;
        let transformed = self.guard(Stage::Transform, self.transform(&extracted))?;
        self.log.log("Transformation has ended")?;

        self.log.log("Starting Load to CSV file")?;
        self.guard(
            Stage::CsvLoad,
            load_to_csv(&transformed, self.config.csv_path()),
        )?;
        self.log.log("Loading has ended")?;

        let query_results = {
            self.log.log("Start connecting to database")?;
            // Dropping the connection closes it, so every early return below releases it.
            let conn = self.guard(Stage::Connect, self.connect())?;

            self.log.log("Starting load to database")?;
            self.guard(
                Stage::DatabaseLoad,
                load_to_db(&transformed, self.config.table_name(), &conn),
            )?;
            self.log.log("Loading to database ended")?;

            self.log.log("Running queries on database")?;
            let mut results = Vec::new();
            for statement in self.config.queries() {
                let result = self.guard(Stage::Query, run_query(&statement, &conn))?;
                println!("{}", result.statement);
                println!("{}", result);
                results.push(result);
            }
            self.log.log("Running queries on database has ended")?;

            self.log.log("Closing database connection")?;
            self.guard(
                Stage::Close,
                conn.close().map_err(|(_, e)| {
                    EtlError::storage(format!("Closing {}: {}", self.config.db_path(), e))
                }),
            )?;
            results
        };
        self.log.log("Connection to database is closed")?;
        self.log.log("ETL process has ended")?;

        Ok(RunSummary {
            rows: transformed.len(),
            csv_path: self.config.csv_path().to_string(),
            table_name: self.config.table_name().to_string(),
            query_results,
        })
    }

    async fn extract(&self) -> Result<Table<Record>> {
        let markup = self.source.fetch(self.config.source_url()).await?;

        let mut extractor = Extractor::new(self.config.expected_columns().to_vec())?;
        if let Some(heading) = self.config.table_heading() {
            extractor = extractor.with_heading(heading);
        }
        extractor.extract(&markup)
    }

    fn transform(&self, table: &Table<Record>) -> Result<Table<EnrichedRecord>> {
        let rates = ExchangeRateTable::from_path(self.config.rates_path())?;
        transform(table, &rates, self.config.currencies())
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(self.config.db_path()).map_err(|e| {
            EtlError::storage(format!("Opening {}: {}", self.config.db_path(), e))
        })
    }

    /// Records a failed stage in the progress log before handing the error back.
    fn guard<T>(&self, stage: Stage, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            let message = format!("{} failed: {}", stage, e);
            tracing::error!("{} (category: {:?})", message, e.category());
            if let Err(log_err) = self.log.append(&message) {
                tracing::warn!("Could not write failure to progress log: {}", log_err);
            }
            e
        })
    }
}
