/// Error types.
///
/// Nothing in a node is fatal: these surface to the polling loop, which logs
/// them and carries on with the next cycle.
use embedded_io::ErrorKind;
use thiserror_no_std::Error;

/// Failure talking to the modem or the operator console.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The serial port reported an error
    #[error("serial I/O failed: {0:?}")]
    Io(ErrorKind),
}

impl LinkError {
    pub(crate) fn io<E: embedded_io::Error>(err: E) -> Self {
        LinkError::Io(err.kind())
    }
}

/// Failure decoding an uplink payload on the network side.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload shorter than the node's layout
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    /// Hex string has an odd number of characters
    #[error("hex payload has odd length {0}")]
    OddLength(usize),

    /// Non-hex character at the given position
    #[error("invalid hex digit at position {0}")]
    InvalidHex(usize),

    /// Decoded payload would not fit the largest layout
    #[error("payload longer than {0} bytes")]
    TooLong(usize),
}
