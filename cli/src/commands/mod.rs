//! Command implementations.

pub mod config;
pub mod daemon;
pub mod token;
