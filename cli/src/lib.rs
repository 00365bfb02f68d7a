//! cconnector CLI library: argument parsing, commands and output.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cli;
pub mod commands;
pub mod output;
