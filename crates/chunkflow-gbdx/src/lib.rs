#![doc = include_str!("../README.md")]

mod auth;
mod client;
mod common;

pub use auth::*;
pub use client::*;
pub use common::*;
// Public re-export so downstream crates can reach the engine via
// `chunkflow_gbdx::chunkflow`
pub use chunkflow;
