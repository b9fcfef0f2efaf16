use crate::core::query::{
    default_queries, render_statement, DEFAULT_NAME_COLUMN, DEFAULT_QUERY_CURRENCY,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SOURCE_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub transform: TransformConfig,
    pub load: LoadConfig,
    pub log: LogConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Heading the ranked table sits under; empty takes the first table in the document.
    pub table_heading: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub rates_path: String,
    pub currencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub csv_path: String,
    pub db_path: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Replaces the default reporting queries; `{table}` is substituted.
    pub statements: Option<Vec<String>>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            table_heading: Some("By market capitalization".to_string()),
            columns: vec!["Name".to_string(), "MC_USD_Billion".to_string()],
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            rates_path: "./exchange_rate.csv".to_string(),
            currencies: vec!["EUR".to_string(), "GBP".to_string(), "INR".to_string()],
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            csv_path: "./Largest_banks_data.csv".to_string(),
            db_path: "Banks.db".to_string(),
            table_name: "Largest_banks".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: "./code_log.txt".to_string(),
        }
    }
}

impl EtlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Bad substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_address("source.url", &self.source.url)?;
        if self.extract.columns.len() != 2 {
            return Err(EtlError::InvalidConfigValueError {
                field: "extract.columns".to_string(),
                value: self.extract.columns.join(","),
                reason: "Exactly two columns (name, USD value) are required".to_string(),
            });
        }
        for column in &self.extract.columns {
            validation::validate_sql_identifier("extract.columns", column)?;
        }
        validation::validate_path("transform.rates_path", &self.transform.rates_path)?;
        validation::validate_currency_codes("transform.currencies", &self.transform.currencies)?;
        validation::validate_path("load.csv_path", &self.load.csv_path)?;
        validation::validate_path("load.db_path", &self.load.db_path)?;
        validation::validate_sql_identifier("load.table_name", &self.load.table_name)?;
        validation::validate_path("log.path", &self.log.path)?;

        match &self.query.statements {
            Some(statements) => {
                for statement in statements {
                    validation::validate_non_empty_string("query.statements", statement)?;
                }
            }
            // The default queries read the GBP column and the name column.
            None => {
                if !self
                    .transform
                    .currencies
                    .iter()
                    .any(|c| c == DEFAULT_QUERY_CURRENCY)
                {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "transform.currencies".to_string(),
                        value: self.transform.currencies.join(","),
                        reason: format!(
                            "The default queries need {}; add it or set query.statements",
                            DEFAULT_QUERY_CURRENCY
                        ),
                    });
                }
                if self.extract.columns[0] != DEFAULT_NAME_COLUMN {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "extract.columns".to_string(),
                        value: self.extract.columns.join(","),
                        reason: format!(
                            "The default queries need a '{}' column; rename it or set query.statements",
                            DEFAULT_NAME_COLUMN
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl ConfigProvider for EtlConfig {
    fn source_url(&self) -> &str {
        &self.source.url
    }

    fn table_heading(&self) -> Option<&str> {
        self.extract
            .table_heading
            .as_deref()
            .filter(|heading| !heading.trim().is_empty())
    }

    fn expected_columns(&self) -> &[String] {
        &self.extract.columns
    }

    fn rates_path(&self) -> &str {
        &self.transform.rates_path
    }

    fn currencies(&self) -> &[String] {
        &self.transform.currencies
    }

    fn csv_path(&self) -> &str {
        &self.load.csv_path
    }

    fn db_path(&self) -> &str {
        &self.load.db_path
    }

    fn table_name(&self) -> &str {
        &self.load.table_name
    }

    fn log_path(&self) -> &str {
        &self.log.path
    }

    fn queries(&self) -> Vec<String> {
        match &self.query.statements {
            Some(statements) => statements
                .iter()
                .map(|s| render_statement(s, &self.load.table_name))
                .collect(),
            None => default_queries(&self.load.table_name),
        }
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_reference_run() {
        let config = EtlConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.table_name(), "Largest_banks");
        assert_eq!(config.csv_path(), "./Largest_banks_data.csv");
        assert_eq!(config.log_path(), "./code_log.txt");
        assert_eq!(config.currencies(), &["EUR", "GBP", "INR"]);
        assert_eq!(
            config.queries(),
            vec![
                "SELECT * FROM Largest_banks",
                "SELECT AVG(MC_GBP_Billion) FROM Largest_banks",
                "SELECT Name FROM Largest_banks LIMIT 5",
            ]
        );
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[source]
url = "https://example.com/banks"

[transform]
rates_path = "./rates.csv"
currencies = ["GBP"]

[load]
table_name = "banks"
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source_url(), "https://example.com/banks");
        assert_eq!(config.rates_path(), "./rates.csv");
        assert_eq!(config.currencies(), &["GBP"]);
        assert_eq!(config.table_name(), "banks");
        // untouched sections keep their defaults
        assert_eq!(config.db_path(), "Banks.db");
        assert_eq!(config.table_heading(), Some("By market capitalization"));
    }

    #[test]
    fn test_empty_heading_means_first_table() {
        let config = EtlConfig::from_toml_str("[extract]\ntable_heading = \"\"\n").unwrap();
        assert_eq!(config.table_heading(), None);
    }

    #[test]
    fn test_query_overrides_substitute_table() {
        let toml_content = r#"
[load]
table_name = "banks"

[query]
statements = [
    "SELECT Name, MC_GBP_Billion FROM {table}",
    "SELECT Name, MC_EUR_Billion FROM {table}",
]
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.queries(),
            vec![
                "SELECT Name, MC_GBP_Billion FROM banks",
                "SELECT Name, MC_EUR_Billion FROM banks",
            ]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MARKET_CAP_ETL_TEST_RATES", "/data/rates.csv");

        let toml_content = r#"
[transform]
rates_path = "${MARKET_CAP_ETL_TEST_RATES}"
"#;

        let config = EtlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.rates_path(), "/data/rates.csv");

        std::env::remove_var("MARKET_CAP_ETL_TEST_RATES");
    }

    #[test]
    fn test_config_validation() {
        let unsafe_table = r#"
[load]
table_name = "banks; DROP TABLE x"
"#;
        let config = EtlConfig::from_toml_str(unsafe_table).unwrap();
        assert!(config.validate().is_err());

        let bad_url = r#"
[source]
url = "ftp://example.com/banks"
"#;
        let config = EtlConfig::from_toml_str(bad_url).unwrap();
        assert!(config.validate().is_err());

        let no_currencies = r#"
[transform]
currencies = []
"#;
        let config = EtlConfig::from_toml_str(no_currencies).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_queries_need_gbp_and_name_columns() {
        let without_gbp = r#"
[transform]
currencies = ["EUR"]
"#;
        let config = EtlConfig::from_toml_str(without_gbp).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::InvalidConfigValueError { ref field, .. }) if field == "transform.currencies"
        ));

        let renamed_name = r#"
[extract]
columns = ["Bank", "MC_USD_Billion"]
"#;
        let config = EtlConfig::from_toml_str(renamed_name).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::InvalidConfigValueError { ref field, .. }) if field == "extract.columns"
        ));

        // Own statements lift the requirement.
        let with_statements = r#"
[transform]
currencies = ["EUR"]

[query]
statements = ["SELECT AVG(MC_EUR_Billion) FROM {table}"]
"#;
        let config = EtlConfig::from_toml_str(with_statements).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = EtlConfig::from_toml_str("[load\ntable_name = 1");
        assert!(matches!(result, Err(EtlError::ConfigError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[log]
path = "./etl.log"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = EtlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.log_path(), "./etl.log");
    }
}
