pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::source::{AnySource, FileSource, HttpSource};
pub use config::toml_config::EtlConfig;
pub use core::etl::{EtlEngine, RunSummary};
pub use utils::error::{EtlError, Result};
