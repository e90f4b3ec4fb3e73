//! Client side cache for calibration constants kept in a conditions database.
//!
//! Each folder of constants is valid over an interval of time. A
//! [`webdb::DbFolder`] holds one interval of a folder in memory and answers
//! `(time, channel, column)` lookups from it, going back to the database only
//! when the time leaves the cached interval.

pub mod config;
pub mod iov;
pub mod provider;
pub mod webdb;

