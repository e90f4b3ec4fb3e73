//! Client for the conditions database web interface. A [`DbFolder`] keeps one
//! interval of validity of a folder in memory and serves channel lookups
//! from it.

pub mod dataset;
pub mod error;
pub mod folder;
pub mod retry;
pub mod source;

#[cfg(test)]
pub(crate) mod mock;

pub use dataset::{Dataset, Tuple};
pub use error::{FieldError, WebError};
pub use folder::{DbFolder, FieldValue, LookupStats};
pub use retry::{RetryConfig, RetryPolicy};
pub use source::{DataRequest, DataSource, FetchFailure, HttpSource};
