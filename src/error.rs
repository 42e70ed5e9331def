//! Error taxonomy shared by the store, the list engine and the HTTP layer.
//!
//! Each failure domain has its own enum so a host can decide how to present
//! it (close the view, show an offline notice, keep the old list) by matching
//! on variants instead of inspecting messages.

use thiserror::Error;

use crate::model::{IndexPath, RecordId};

/// A view could not be opened because its query is not evaluable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field '{field}' in filter")]
    UnknownField { field: String },

    #[error("unknown sort key '{key}'")]
    UnknownSortKey { key: String },
}

/// The store reported a change that cannot be applied to the current list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("invalid section change '{kind}' at section {index}")]
    InvalidSectionChange { kind: &'static str, index: usize },

    #[error("row {path} out of bounds for {phase} state")]
    RowOutOfBounds { path: IndexPath, phase: &'static str },

    #[error("section {index} out of bounds for {phase} state")]
    SectionOutOfBounds { index: usize, phase: &'static str },

    #[error("row {path} addressed twice in one batch")]
    DuplicateRow { path: IndexPath },

    #[error("section {index} addressed twice in one batch")]
    DuplicateSection { index: usize },
}

/// A remote request failed. Decode failures are transport failures too.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {code}")]
    Status { code: u16 },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// True when the failure means the network itself is not usable.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Unreachable(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                code: status.as_u16(),
            }
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Writing to the persisted collection failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("record {id} does not exist")]
    NotFound { id: RecordId },

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

/// Failures surfaced by list engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("no row at {path}")]
    OutOfBounds { path: IndexPath },

    #[error("no row action named '{title}'")]
    UnknownAction { title: String },

    #[error("list has no open view")]
    NotConfigured,
}

/// The configuration file exists but cannot be used.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
