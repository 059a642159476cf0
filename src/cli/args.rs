//! CLI argument capture using clap derive

use clap::Parser;

/// Bazelisk - runs the right Bazel version for a workspace
///
/// Every argument is passed through to Bazel. `--migrate` and `--strict`
/// are only recognised as the first argument.
#[derive(Parser, Debug)]
#[command(name = "bazelisk")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Arguments for Bazel
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
