//! Error types for window sources and descriptor parsing.

use thiserror::Error;

/// Errors raised while collecting a window snapshot from the host.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A D-Bus call to the window manager failed.
    #[error("D-Bus error: {0}")]
    DbusError(#[from] zbus::Error),

    /// KWin accepted the script but the reply carried no script number.
    #[error("Could not find KWin script number in reply: {0}")]
    ScriptNotRegistered(String),

    /// Reading the script output back from the journal failed.
    #[error("Journal read failed: {0}")]
    JournalFailed(String),

    /// The host answered but produced nothing usable.
    #[error("No output reported by {0}")]
    NoOutput(&'static str),

    /// Failed to parse a host response.
    #[error("Failed to parse host response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The requested source is not available in this session.
    #[error("Window source '{0}' is not available")]
    Unavailable(&'static str),
}

/// Errors raised when reading a descriptor line back.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// The line does not have the field layout of the selected mode.
    #[error("Unexpected descriptor format: '{0}'")]
    UnexpectedFormat(String),

    /// The pid field is neither empty nor a number.
    #[error("Invalid pid '{pid}' in descriptor '{line}'")]
    InvalidPid { pid: String, line: String },
}
