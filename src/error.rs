use std::result::Result as StdResult;
use thiserror::Error as ThisError;

/// Errors which can occur during device setup, command parsing and communication.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An operation could not be performed because it was prohibited by safety checks (e.g.
    /// accessing RAM beyond the 16-bit address space).
    #[error("Invalid request")]
    InvalidRequest,

    /// No attached USB device matched the selection.
    #[error("Device not found")]
    DeviceNotFound,

    /// The verb of a command is not part of the command vocabulary.
    #[error("Unknown command \"{0}\"")]
    UnknownCommand(String),

    /// A command argument is missing, malformed or out of range.
    #[error("Command {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    /// A bulk read returned less data than requested and short reads were not allowed.
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// A bulk write did not transfer the complete buffer.
    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// An Intel hex file could not be parsed.
    #[error("Intel hex line {line}: {reason}")]
    HexFile { line: usize, reason: String },

    /// Reading a file or stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error occurred during the raw USB communication.
    #[error(transparent)]
    Usb(#[from] rusb::Error),
}

impl Error {
    pub(crate) fn invalid_argument(command: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            command,
            reason: reason.into(),
        }
    }
}

/// Shorthand for a Result with the crate's own Error type.
pub type Result<T> = StdResult<T, Error>;
