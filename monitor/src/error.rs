//! Error types for AFK Monitor.
//!
//! Each module owns its error type; [`MonitorError`] wraps them for the run
//! loop and the binary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::parser::ParseError;
use crate::tailer::TailerError;
use crate::webhook::SenderError;

/// Errors that can stop monitoring.
///
/// # Examples
///
/// ```
/// use afk_monitor::error::MonitorError;
/// use afk_monitor::parser::parse_line;
///
/// fn first_kind(line: &str) -> Result<String, MonitorError> {
///     Ok(parse_line(line)?.kind)
/// }
///
/// assert!(first_kind("not json").is_err());
/// ```
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The journal could not be found or read.
    #[error("journal error: {0}")]
    Tailer(#[from] TailerError),

    /// A journal line could not be parsed and the policy is to abort.
    #[error("malformed journal line: {0}")]
    Parse(#[from] ParseError),

    /// The remote channel could not be set up.
    #[error("webhook error: {0}")]
    Sender(#[from] SenderError),

    /// Terminal or file system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
