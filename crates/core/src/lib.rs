//! Core types shared by every tickq crate.
//!
//! All fallible operations return [`Result`], whose error is the single
//! [`Error`] enum defined here.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
