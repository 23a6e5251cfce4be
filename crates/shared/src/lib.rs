//! Wire types shared between the Fruit Management client and its tests.
//!
//! Everything here mirrors the JSON the backend services emit and accept.
//! No I/O lives in this crate.

pub mod api;
pub mod models;
pub mod time;

pub use api::*;
pub use models::*;
pub use time::{Timestamp, TimestampError};
