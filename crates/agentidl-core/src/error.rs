//! Error types for the AgentIDL core
//!
//! All fallible operations return `Result<T, Error>`.
//! Rule violations are never errors: they are collected as findings in a
//! [`ValidationReport`](crate::validator::ValidationReport). Errors here abort
//! the unit of work that raised them (a compilation, a document check, or a
//! single intent call).

/// AgentIDL error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Syntax or structure violation in the interface definition source
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The parsed definition set contains no interface
    #[error("No interface definition found")]
    NoInterfaceDefinition,

    /// A message arrived for an intent the receiving agent never registered
    #[error("Unhandled intent '{intent}' at agent '{agent}'")]
    UnhandledIntent { agent: String, intent: String },

    /// `call_method` named an operation missing from the caller's model
    #[error("Unknown method '{method}'")]
    UnknownMethod { method: String },

    /// A registered handler settled with an error
    #[error("Handler for intent '{intent}' failed: {reason}")]
    HandlerFailed { intent: String, reason: String },

    /// A runtime document could not be read as structured data
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Configuration or rule document could not be loaded
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure while loading inputs
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type alias for AgentIDL operations
pub type Result<T> = std::result::Result<T, Error>;
