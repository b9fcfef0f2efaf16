use crate::domain::ports::DocumentSource;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::ConfigError {
                message: format!("Cannot build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

fn retrieval_err(address: &str, e: impl std::fmt::Display) -> EtlError {
    EtlError::RetrievalError {
        address: address.to_string(),
        message: e.to_string(),
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self, address: &str) -> Result<String> {
        tracing::debug!("Requesting document from: {}", address);
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|e| retrieval_err(address, e))?;

        tracing::debug!("Document response status: {}", response.status());
        let response = response
            .error_for_status()
            .map_err(|e| retrieval_err(address, e))?;

        response.text().await.map_err(|e| retrieval_err(address, e))
    }
}

/// Reads markup from disk; the address is a path or a `file://` URL.
#[derive(Debug, Clone, Default)]
pub struct FileSource;

impl FileSource {
    fn path_for(address: &str) -> Result<PathBuf> {
        if address.starts_with("file://") {
            let url = url::Url::parse(address).map_err(|e| retrieval_err(address, e))?;
            url.to_file_path()
                .map_err(|_| retrieval_err(address, "not a local file URL"))
        } else {
            Ok(PathBuf::from(address))
        }
    }
}

impl DocumentSource for FileSource {
    async fn fetch(&self, address: &str) -> Result<String> {
        let path = Self::path_for(address)?;
        tracing::debug!("Reading document from: {}", path.display());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| retrieval_err(address, e))
    }
}

/// Picks HTTP or file retrieval from the shape of the address.
#[derive(Debug, Clone)]
pub enum AnySource {
    Http(HttpSource),
    File(FileSource),
}

impl AnySource {
    pub fn for_address(address: &str, timeout: Option<Duration>) -> Result<Self> {
        if address.starts_with("http://") || address.starts_with("https://") {
            let http = match timeout {
                Some(timeout) => HttpSource::with_timeout(timeout)?,
                None => HttpSource::new(),
            };
            Ok(AnySource::Http(http))
        } else {
            Ok(AnySource::File(FileSource))
        }
    }
}

impl DocumentSource for AnySource {
    async fn fetch(&self, address: &str) -> Result<String> {
        match self {
            AnySource::Http(source) => source.fetch(address).await,
            AnySource::File(source) => source.fetch(address).await,
        }
    }
}
