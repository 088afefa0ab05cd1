use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::eval::EvalState;
use crate::result::EvalResult;

/// Coarse classification of [`NreplError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PortDiscovery,
    Connection,
    ProtocolDecode,
    FileNotFound,
    Limit,
    Other,
}

/// nREPL client errors
#[derive(Debug, Error)]
pub enum NreplError {
    #[error("No {file} file found in {scope}. Make sure your {repl} REPL is running.")]
    PortNotFound {
        file: &'static str,
        scope: &'static str,
        repl: &'static str,
    },

    #[error("Error reading port file {}: {source}", path.display())]
    PortFileUnreadable { path: PathBuf, source: io::Error },

    #[error("Invalid port {port:?} in {}", path.display())]
    InvalidPort { path: PathBuf, port: String },

    #[error("Failed to connect to nREPL server at {addr}: {source}")]
    Connection { addr: String, source: io::Error },

    #[error("Malformed nREPL frame: {0}")]
    ProtocolDecode(String),

    #[error("nREPL server closed the connection")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("repl_type must be either 'clj' or 'cljs', got {0:?}")]
    InvalidReplKind(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No done status after {0} frames")]
    FrameLimit(usize),

    #[error("Timed out after {0:?} waiting for the evaluation to finish")]
    Timeout(Duration),

    #[error("Evaluation is {actual:?}, expected {expected:?}")]
    InvalidState { expected: EvalState, actual: EvalState },

    #[error("{source}\nPartial output before failure:\n{partial}")]
    Incomplete {
        partial: EvalResult,
        source: Box<NreplError>,
    },
}

impl NreplError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NreplError::PortNotFound { .. }
            | NreplError::PortFileUnreadable { .. }
            | NreplError::InvalidPort { .. } => ErrorKind::PortDiscovery,
            NreplError::Connection { .. } | NreplError::ConnectionClosed | NreplError::Io(_) => {
                ErrorKind::Connection
            }
            NreplError::ProtocolDecode(_) => ErrorKind::ProtocolDecode,
            NreplError::FileNotFound(_) => ErrorKind::FileNotFound,
            NreplError::FrameLimit(_) | NreplError::Timeout(_) => ErrorKind::Limit,
            NreplError::Incomplete { source, .. } => source.kind(),
            NreplError::InvalidReplKind(_)
            | NreplError::Config(_)
            | NreplError::InvalidState { .. } => ErrorKind::Other,
        }
    }

    /// Whether the connection can no longer be trusted to be at a frame
    /// boundary after this error.
    pub fn poisons_connection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::ProtocolDecode | ErrorKind::Limit
        )
    }
}
