//! Stageboard CLI - file-backed pipeline boards from the terminal.
//!
//! The binary is a thin shell over [`commands`]; argument parsing lives in [`cli`].

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
