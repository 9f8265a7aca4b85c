//! Command line interface module
//!
//! Argument parsing, environment overrides and the runner that wires the
//! registry client, the blob collector and report output together.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
