use thiserror::Error;

/// Errors arising from transport I/O, the handshake, and the frame engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hostname resolution failed for {host}:{port}")]
    HostnameResolutionFailed { host: String, port: u16 },

    #[error("socket error: {0}")]
    Socket(String),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("timed out after {timeout:?}")]
    Timeout { timeout: std::time::Duration },

    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("monotonic timer unavailable")]
    TimerFailure,

    #[error("unexpected method: expected one of {expected:?}, got {got:?}")]
    WrongMethod {
        expected: Vec<crate::protocol::MethodId>,
        got: crate::protocol::MethodId,
    },

    #[error("incompatible AMQP version: server offered {major}-{minor}, expected {}-{}", crate::PROTOCOL_VERSION_MAJOR, crate::PROTOCOL_VERSION_MINOR)]
    IncompatibleAmqpVersion { major: u8, minor: u8 },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors from decoding or encoding AMQP wire data: frames, field tables,
/// and method arguments.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame too short ({len} bytes, minimum 8)")]
    FrameTooShort { len: usize },

    #[error("bad frame-end byte (expected 0xCE, got 0x{got:02X})")]
    BadFrameEnd { got: u8 },

    #[error("buffer exhausted reading {what}: need {need} bytes, got {got}")]
    Truncated { what: &'static str, need: usize, got: usize },

    #[error("invalid field-table type tag 0x{tag:02X}")]
    UnknownFieldType { tag: u8 },

    #[error("invalid UTF-8 in {what}: {source}")]
    InvalidString {
        what: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
pub type CodecResult<T> = std::result::Result<T, CodecError>;
