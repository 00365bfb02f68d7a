//! Integration tests for the cconnector CLI
//!
//! These tests spawn the actual binary against a temporary credential
//! record.

mod cli_tests;
mod daemon_command;
mod token_commands;
