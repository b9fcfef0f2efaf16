use anyhow::Context;
use clap::Parser;
use market_cap_etl::domain::ports::ConfigProvider;
use market_cap_etl::utils::{logger, validation::Validate};
use market_cap_etl::{AnySource, CliConfig, EtlConfig, EtlEngine};
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    logger::init_cli_logger(args.verbose);
    tracing::info!("Starting market-cap-etl");

    let mut config = if Path::new(&args.config).exists() {
        tracing::info!("Loading configuration from: {}", args.config);
        EtlConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load config file '{}'", args.config))?
    } else {
        tracing::info!("No config file at {}, using built-in defaults", args.config);
        EtlConfig::default()
    };

    if let Some(url) = args.url {
        tracing::info!("Source address overridden to: {}", url);
        config.source.url = url;
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        return Err(e).context("Invalid configuration");
    }

    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let timeout = config.source.timeout_seconds.map(Duration::from_secs);
    let source = AnySource::for_address(config.source_url(), timeout)?;
    let engine = EtlEngine::new(source, config);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!(
                "ETL process completed: {} rows saved to {} and table {}",
                summary.rows,
                summary.csv_path,
                summary.table_name
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("ETL process failed: {} (category: {:?})", e, e.category());
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            Err(e).context("ETL process failed")
        }
    }
}
