pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "market-cap-etl")]
#[command(about = "Scrape bank market caps, convert currencies, load to CSV and SQLite, run reports")]
pub struct CliConfig {
    /// Path to TOML configuration file; built-in defaults apply when it does not exist
    #[arg(short, long, default_value = "etl-config.toml")]
    pub config: String,

    /// Override the source address from the configuration
    #[arg(long)]
    pub url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
