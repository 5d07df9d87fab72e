//! cascade-cli: command-line front end for cascade
//!
//! The binary entry point lives in `main.rs`; this crate exposes
//! [`run`] so the CLI can be embedded and tested.

mod cli;

pub use cli::run;
