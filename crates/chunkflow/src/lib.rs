#![doc = include_str!("../README.md")]

mod aggregate;
mod chunk;
mod config;
mod coordinator;
mod dispatch;
mod error;
mod gate;
mod submit;

pub use crate::aggregate::*;
pub use crate::chunk::*;
pub use crate::config::*;
pub use crate::coordinator::*;
pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::gate::*;
pub use crate::submit::*;
// Re-exported so callers can hand in their own token without depending on
// `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;
