//! Incompatible-flag migration

pub mod engine;
pub mod flags;

pub use engine::{MigrationEngine, MigrationOutcome};
pub use flags::{incompatible_flags, insert_args, sorted_names, FlagDetails};
