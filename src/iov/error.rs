use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IovDataError {
    #[error("don't know how to convert timestamp `{0}`, expected 19 digits of ns since epoch")]
    InvalidTimestampFormat(u64),
    #[error("malformed timestamp `{0}`")]
    MalformedTimeStamp(String),
    #[error("substamp `{0}` exceeds database precision")]
    SubStampOutOfRange(u32),
}
