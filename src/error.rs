use failure::Fail;
use std::io;
use std::string::FromUtf8Error;

/// Error type for logkv
#[derive(Fail, Debug)]
pub enum KvsError {
    /// IO error
    #[fail(display = "IO error: {}", _0)]
    Io(#[cause] io::Error),
    /// Serialization or deserialization error
    #[fail(display = "serde_json error: {}", _0)]
    Serde(#[cause] serde_json::Error),
    /// A frame payload is not valid UTF-8
    #[fail(display = "UTF-8 error: {}", _0)]
    Utf8(#[cause] FromUtf8Error),
    /// The peer closed the stream before a whole frame arrived
    #[fail(display = "Socket connection broken")]
    ConnectionBroken,
    /// The length prefix of a frame is not a decimal number
    #[fail(display = "Invalid frame length: {:?}", _0)]
    InvalidFrameLength(String),
    /// Request text with more tokens than `<command> <key> <value>`
    #[fail(display = "Invalid operation: {:?}", _0)]
    MalformedOperation(String),
    /// The command needs a key but none was given
    #[fail(display = "Missing key for {}", _0)]
    MissingKey(String),
    /// The command needs a value but none was given
    #[fail(display = "Missing value for {}", _0)]
    MissingValue(String),
    /// Removing or getting a key which does not exist
    #[fail(display = "Key not found: {}", _0)]
    KeyNotFound(String),
    /// A complete log line could not be deserialized during replay
    #[fail(display = "Corrupt command log at line {}", line)]
    CorruptLog {
        /// 1-based line number in the log file
        line: usize,
    },
}

impl From<io::Error> for KvsError {
    fn from(err: io::Error) -> KvsError {
        KvsError::Io(err)
    }
}

impl From<serde_json::Error> for KvsError {
    fn from(err: serde_json::Error) -> KvsError {
        KvsError::Serde(err)
    }
}

impl From<FromUtf8Error> for KvsError {
    fn from(err: FromUtf8Error) -> KvsError {
        KvsError::Utf8(err)
    }
}

/// Result type for logkv
pub type Result<T> = std::result::Result<T, KvsError>;
