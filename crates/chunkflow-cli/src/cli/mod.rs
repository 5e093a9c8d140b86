//! Command-line plumbing around the batch engine.
//!
//! ## Structure
//!
//! - [`config`] - clap arguments and their validated form.
//! - [`input`] - sourcing acquisition ids from stdin.
//! - [`order`] - the `order` command: authenticate, fan out, print.
//! - [`telemetry`] - log subscriber setup.

pub mod config;
pub mod input;
pub mod order;
pub mod telemetry;
