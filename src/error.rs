// Error taxonomy for the crate.
//
// Callers branch on these distinctions (e.g. bad padding vs. invalid key, or
// timeout vs. closed), so each failure is constructed at the call site with the
// most specific variant available. There is no shared error queue: every error
// is an owned value and can never be attributed to a later operation.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An argument was missing, empty, or otherwise unusable before any
    /// underlying call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An offset or length fell outside a declared bound.
    #[error("out of bounds: {0}")]
    OutOfBounds(&'static str),

    /// Input could not be parsed or had the wrong length for its declared
    /// encoding (DER, fixed-length keys/signatures, SEC1 points, ...).
    #[error("malformed input: {0}")]
    Format(String),

    /// Key material was structurally valid but unusable (wrong length for the
    /// algorithm, rejected by the underlying library, weak or all-zero result).
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// RSA decryption padding check failed. Distinct from `InvalidKey` and
    /// `Crypto` because callers treat it as a data error, not a key error.
    #[error("bad padding")]
    BadPadding,

    /// A primitive operation failed without a more specific classification.
    #[error("crypto operation failed: {0}")]
    Crypto(&'static str),

    /// TLS protocol failure reported by rustls.
    #[error("tls error: {0}")]
    Tls(rustls::Error),

    /// A blocking socket operation exceeded its timeout.
    #[error("socket operation timed out")]
    Timeout,

    /// The connection or its descriptor was closed.
    #[error("connection closed")]
    Closed,

    /// The connection was interrupted by a concurrent `interrupt()` call.
    #[error("connection interrupted")]
    Interrupted,

    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => Error::Closed,
            _ => Error::Io(e),
        }
    }
}

impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        match e {
            rustls::Error::InvalidMessage(_) => Error::format(format!("{e}")),
            other => Error::Tls(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let e: Error = io::Error::new(io::ErrorKind::TimedOut, "t").into();
        assert!(matches!(e, Error::Timeout));
        let e: Error = io::Error::new(io::ErrorKind::WouldBlock, "w").into();
        assert!(matches!(e, Error::Timeout));
    }

    #[test]
    fn test_io_disconnect_maps_to_closed() {
        for kind in [
            io::ErrorKind::UnexpectedEof,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionReset,
        ] {
            let e: Error = io::Error::new(kind, "x").into();
            assert!(matches!(e, Error::Closed));
        }
    }
}
