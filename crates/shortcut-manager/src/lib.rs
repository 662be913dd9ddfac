//! Manage Steam non-Steam-game shortcuts on the local machine or over SSH.

pub mod artwork;
pub mod config;
mod error;
pub mod griddb;
pub mod logging;
pub mod shortcut;
pub mod steam;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Error, Result};
