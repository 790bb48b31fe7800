//! Error types for the schema resolver

use thiserror::Error;

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Coarse classification of a [`SchemaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A handler must be registered before resolution can proceed
    Configuration,
    /// The loader failed to fetch the document
    Transport,
    /// The fetched stream could not be drained
    Read,
    /// A content decoder or media-type unmarshaler failed
    Decode,
    /// The document is not a valid schema
    Compile,
    /// The reference itself is malformed or points nowhere
    Reference,
    /// Local filesystem or configuration failure
    Io,
}

/// Resolver errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("no loader registered for scheme {scheme}")]
    NoLoader { scheme: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status code {status}: {reason}")]
    HttpStatus {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("failed to read data from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{encoding} decode error: {message}")]
    Decode { encoding: String, message: String },

    #[error("{format} unmarshal error: {message}")]
    Unmarshal { format: String, message: String },

    #[error("failed to compile schema: {message}")]
    Compile { message: String },

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("anchor '{anchor}' not found in {uri}")]
    AnchorNotFound { uri: String, anchor: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::NoLoader { .. } | SchemaError::HttpClient(_) => ErrorKind::Configuration,
            SchemaError::Transport { .. } | SchemaError::HttpStatus { .. } => ErrorKind::Transport,
            SchemaError::Read { .. } => ErrorKind::Read,
            SchemaError::Decode { .. } | SchemaError::Unmarshal { .. } => ErrorKind::Decode,
            SchemaError::Compile { .. } => ErrorKind::Compile,
            SchemaError::InvalidUri(_) | SchemaError::AnchorNotFound { .. } => ErrorKind::Reference,
            SchemaError::Io(_) | SchemaError::Config(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn compile(message: impl Into<String>) -> Self {
        SchemaError::Compile {
            message: message.into(),
        }
    }
}
