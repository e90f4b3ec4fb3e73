//! Services layered on top of a [`crate::webdb::DbFolder`].

pub mod channel_status;

pub use channel_status::{ChannelStatus, ChannelStatusProvider};
