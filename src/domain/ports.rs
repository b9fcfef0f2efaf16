use crate::utils::error::Result;

/// Anything that can hand back the raw markup for an address.
pub trait DocumentSource: Send + Sync {
    fn fetch(&self, address: &str) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Every tunable of a run, read by the orchestrator.
pub trait ConfigProvider: Send + Sync {
    fn source_url(&self) -> &str;
    fn table_heading(&self) -> Option<&str>;
    fn expected_columns(&self) -> &[String];
    fn rates_path(&self) -> &str;
    fn currencies(&self) -> &[String];
    fn csv_path(&self) -> &str;
    fn db_path(&self) -> &str;
    fn table_name(&self) -> &str;
    fn log_path(&self) -> &str;
    fn queries(&self) -> Vec<String>;
}
