//! Command-line interface

pub mod args;
pub mod launch;

pub use args::Cli;
pub use launch::launch;
