#![forbid(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod model;
pub mod time;

pub use error::{Error, ParseEnumError};
pub use time::Clock;
