use thiserror::Error;

use calibdb::{config::ConfigError, webdb::WebError};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("config error `{0}`")]
    ConfigError(ConfigError),
    #[error("database error `{0}`")]
    WebError(WebError),
    #[error("json encoding error `{0}`")]
    JsonEncodingError(String),
}

impl From<serde_json::Error> for DispatchError {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonEncodingError(value.to_string())
    }
}

impl From<ConfigError> for DispatchError {
    fn from(value: ConfigError) -> Self {
        Self::ConfigError(value)
    }
}

impl From<WebError> for DispatchError {
    fn from(value: WebError) -> Self {
        Self::WebError(value)
    }
}
