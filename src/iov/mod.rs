//! Interval of validity primitives: the database timestamp type and the
//! decoder for raw detector clock values.

pub mod decoder;
pub mod error;
pub mod timestamp;

pub use decoder::decode_timestamp;
pub use error::IovDataError;
pub use timestamp::IovTimeStamp;

/// Number of sub-second digits the database stores
pub const MAX_SUBSTAMP_LENGTH: usize = 6;
/// Largest substamp representable at [`MAX_SUBSTAMP_LENGTH`] digits
pub const MAX_SUBSTAMP_VALUE: u32 = 999_999;
