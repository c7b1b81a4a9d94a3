//! Hard failures of a validation run.
//!
//! Ordinary bad input never surfaces here; it is collected as
//! [`Violation`](crate::violation::Violation)s in the report. These variants
//! are reserved for conditions the caller has to fix in code or environment.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The tabular input could not be opened or streamed.
    #[error("Reading {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: io::Error,
    },
    /// The column map or record schema is ambiguous or inconsistent.
    #[error("Invalid column mapping: {0}")]
    Schema(String),
    /// A caller-supplied hook or validator reported failure without usable violations.
    #[error("{handler} reported failure without violations: {detail}")]
    InvalidHandlerContract {
        handler: &'static str,
        detail: String,
    },
}

impl EngineError {
    pub fn io(source_name: impl Into<String>, source: io::Error) -> Self {
        EngineError::Io {
            source_name: source_name.into(),
            source,
        }
    }

    pub fn schema(detail: impl Into<String>) -> Self {
        EngineError::Schema(detail.into())
    }

    pub fn contract(handler: &'static str, detail: impl Into<String>) -> Self {
        EngineError::InvalidHandlerContract {
            handler,
            detail: detail.into(),
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self, EngineError::Io { .. })
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        let detail = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => EngineError::io("csv input", source),
            _ => EngineError::io(
                "csv input",
                io::Error::new(io::ErrorKind::InvalidData, detail),
            ),
        }
    }
}
