use std::num::ParseIntError;
use std::result;

use thiserror::Error;

pub use crate::param::ParseError;

/// Error returned by the executor wrapped in a
/// [`DigestTransport`](crate::DigestTransport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid header syntax: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid {0} prefix, expected \"Digest \"")]
    InvalidPrefix(&'static str),
    #[error("invalid nc value {value:?}: {source}")]
    InvalidNonceCount {
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(String),
    #[error("unsupported qop: {0:?}")]
    UnsupportedQop(String),
    #[error("no usable digest challenge in response")]
    NoUsableChallenge,
    #[error("failed to generate cnonce: {0}")]
    Entropy(#[source] rand::Error),
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] std::io::Error),
    #[error("invalid Authorization header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    /// True for malformed header grammar, as opposed to a well-formed header
    /// that asks for something unsupported.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::InvalidPrefix(_) | Error::InvalidNonceCount { .. }
        )
    }
}

pub type Result<T> = result::Result<T, Error>;
