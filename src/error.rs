//! Error types for backend access and export.

use snafu::Snafu;

/// Failure talking to the balancing-data backend.
///
/// A well-formed empty result (e.g. VWAP 404) is not an error and never
/// surfaces as one of these variants.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    /// Request never reached the server or was rejected at transport level
    #[snafu(display("network error: {message}"))]
    Network { message: String },

    /// Non-2xx status; `message` is the `error` field of the JSON body when present
    #[snafu(display("server error {status}: {message}"))]
    Server { status: u16, message: String },

    /// 2xx response whose body did not match the expected shape
    #[snafu(display("invalid response body: {source}"))]
    Decode { source: reqwest::Error },

    #[snafu(display("invalid api base url {base}: {source}"))]
    InvalidBase { base: String, source: url::ParseError },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FetchError::Network {
                message: err.to_string(),
            },
        }
    }
}

/// CSV export failure.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExportError {
    #[snafu(display("no data to export"))]
    Empty,

    #[snafu(display("csv error: {source}"))]
    Csv { source: csv::Error },

    #[snafu(display("io error: {source}"))]
    Io { source: std::io::Error },
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;
