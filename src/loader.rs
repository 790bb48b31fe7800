//! Scheme-based document loaders
//!
//! A [`Loader`] fetches the bytes of a schema document given its URI. The
//! returned [`DocumentStream`] owns whatever transport resource backs it
//! (response body, file handle) and releases it when dropped, so every exit
//! path of the caller closes the stream.

use std::fs::File;
use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use url::Url;

use crate::error::{Result, SchemaError};

/// A readable, scoped document body
pub type DocumentStream = Box<dyn Read + Send>;

/// Default request timeout of [`HttpLoader`]
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches a document for a URI
pub trait Loader: Send + Sync {
    fn load(&self, url: &str) -> Result<DocumentStream>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<DocumentStream> + Send + Sync,
{
    fn load(&self, url: &str) -> Result<DocumentStream> {
        self(url)
    }
}

/// GET loader for `http` and `https`
///
/// One client is shared by both schemes. Anything other than `200 OK` is an
/// error carrying the URL, numeric status and reason phrase; the response
/// body is dropped before returning it.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
}

impl HttpLoader {
    /// Create a loader with the default 10 second timeout
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_HTTP_TIMEOUT, None)
    }

    /// Create a loader with a custom timeout and user agent
    pub fn with_options(timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| SchemaError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Loader for HttpLoader {
    fn load(&self, url: &str) -> Result<DocumentStream> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SchemaError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            drop(response);
            return Err(SchemaError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(Box::new(response))
    }
}

/// Loader for `file://` URIs
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, url: &str) -> Result<DocumentStream> {
        let path = Url::parse(url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| SchemaError::InvalidUri(url.to_string()))?;

        let file = File::open(&path).map_err(|e| SchemaError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Box::new(file))
    }
}
