use thiserror::Error;

use crate::iov::{IovDataError, IovTimeStamp};

#[derive(Error, Debug)]
pub enum WebError {
    #[error("timestamp error `{0}`")]
    Timestamp(#[from] IovDataError),
    #[error("HTTP error: status: {}: {message}", status_str(.status))]
    RemoteFetch {
        status: Option<u16>,
        message: String,
    },
    #[error("time {0}: data not found in database")]
    EmptyDataset(IovTimeStamp),
    #[error("malformed dataset header: {0}")]
    MalformedHeader(String),
    #[error("channel {0} is not found in database")]
    ChannelNotFound(u64),
    #[error("column named `{0}` is not found in database")]
    ColumnNotFound(String),
    #[error("no data cached, call ensure_fresh first")]
    NoDataCached,
    #[error("channel {channel} column `{column}`: {source}")]
    FieldDecode {
        channel: u64,
        column: String,
        source: FieldError,
    },
    #[error("key column of row {row}: {source}")]
    KeyDecode { row: usize, source: FieldError },
    #[error("failed to build http client `{0}`")]
    Client(String),
    #[error("invalid retry policy `{0}`")]
    InvalidRetry(String),
}

fn status_str(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// Failure decoding one positional field of a tuple
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("column {column} out of range, tuple has {fields} fields")]
    OutOfRange { column: usize, fields: usize },
    #[error("row {0} out of range")]
    RowOutOfRange(usize),
    #[error("`{0}` is not an integer")]
    NotInteger(String),
    #[error("`{0}` is not a float")]
    NotFloat(String),
}
