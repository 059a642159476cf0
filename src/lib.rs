//! Bazelisk - a version-aware launcher for Bazel
//!
//! Resolves the Bazel version a workspace asks for, downloads or builds it,
//! and runs it with the caller's arguments, streams and signals.

pub mod cache;
pub mod cli;
pub mod config;
pub mod delegate;
pub mod error;
pub mod http;
pub mod migrate;
pub mod provision;
pub mod versions;
pub mod workspace;

pub use error::{BazeliskError, BazeliskResult};
