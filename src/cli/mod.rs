//! Command handlers for the `multisig` binary

pub mod commands;

pub use commands::*;
