//! Finding which incompatible flags break a build
//!
//! Three phases run in order: every flag at once, then no flags, then each
//! flag on its own. Each trial may be preceded by `shutdown` and
//! `clean --expunge` when requested.

use crate::config::Config;
use crate::delegate::Launcher;
use crate::error::BazeliskResult;
use crate::migrate::flags::{insert_args, sorted_names, FlagDetails};
use console::style;
use std::collections::BTreeMap;
use tracing::debug;

/// How a migration run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The command passed with every flag enabled
    NoMigrationNeeded,
    /// The command failed even without any flag
    BaselineFailed(i32),
    /// A requested `shutdown` or `clean` failed
    MaintenanceFailed { command: String, code: i32 },
    /// Per-flag results, each list in flag name order
    Report {
        passing: Vec<FlagDetails>,
        failing: Vec<FlagDetails>,
    },
}

impl MigrationOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoMigrationNeeded => 0,
            Self::BaselineFailed(code) => *code,
            Self::MaintenanceFailed { code, .. } => *code,
            Self::Report { .. } => 1,
        }
    }

    /// Final summary printed after the trials
    pub fn summary(&self) -> String {
        match self {
            Self::NoMigrationNeeded => "Success: No migration needed.\n".to_string(),
            Self::BaselineFailed(_) => {
                "Failure: Command failed, even without incompatible flags.\n".to_string()
            }
            Self::MaintenanceFailed { command, .. } => {
                format!("Failure: {} command failed.\n", command)
            }
            Self::Report { passing, failing } => {
                let mut out = String::from("\n\n+++ Result\n\n");
                out.push_str("Command was successful with the following flags:\n");
                for flag in passing {
                    out.push_str(&format!("  {}\n", flag));
                }
                out.push('\n');
                out.push_str("Migration is needed for the following flags:\n");
                for flag in failing {
                    out.push_str(&format!("  {}\n", flag));
                }
                out
            }
        }
    }
}

/// Runs the three migration phases through a [`Launcher`]
pub struct MigrationEngine<'a, L: ?Sized> {
    launcher: &'a L,
    flags: BTreeMap<String, FlagDetails>,
    shutdown: bool,
    clean: bool,
}

impl<'a, L: Launcher + ?Sized> MigrationEngine<'a, L> {
    /// `shutdown` and `clean` come from the configuration toggles
    pub fn new(
        launcher: &'a L,
        flags: BTreeMap<String, FlagDetails>,
        config: &Config,
    ) -> Self {
        Self {
            launcher,
            flags,
            shutdown: config.shutdown,
            clean: config.clean,
        }
    }

    /// Run all phases for `base_args` and print the result to stdout
    pub async fn run(&self, base_args: &[String]) -> BazeliskResult<MigrationOutcome> {
        let outcome = self.run_phases(base_args).await?;
        print!("{}", outcome.summary());
        Ok(outcome)
    }

    async fn run_phases(&self, base_args: &[String]) -> BazeliskResult<MigrationOutcome> {
        let names = sorted_names(&self.flags);

        let all_flags = insert_args(base_args, &names);
        match self.trial("with all incompatible flags", &all_flags).await? {
            Err(outcome) => return Ok(outcome),
            Ok(0) => return Ok(MigrationOutcome::NoMigrationNeeded),
            Ok(_) => {}
        }

        match self.trial("with no incompatible flags", base_args).await? {
            Err(outcome) => return Ok(outcome),
            Ok(0) => {}
            Ok(code) => return Ok(MigrationOutcome::BaselineFailed(code)),
        }

        let mut passing = Vec::new();
        let mut failing = Vec::new();
        for name in &names {
            let args = insert_args(base_args, std::slice::from_ref(name));
            let code = match self.trial(&format!("with {}", name), &args).await? {
                Err(outcome) => return Ok(outcome),
                Ok(code) => code,
            };
            debug!("{} exited with {}", name, code);

            let details = self.flags[name].clone();
            if code == 0 {
                passing.push(details);
            } else {
                failing.push(details);
            }
        }

        Ok(MigrationOutcome::Report { passing, failing })
    }

    /// One phase: maintenance steps, then the command. The inner `Err`
    /// carries a maintenance failure that ends the migration.
    async fn trial(
        &self,
        label: &str,
        args: &[String],
    ) -> BazeliskResult<Result<i32, MigrationOutcome>> {
        println!("\n\n{}\n", style(format!("--- Running Bazel {}", label)).bold());

        if self.shutdown {
            if let Some(failed) = self.maintenance("shutdown", &["shutdown"]).await? {
                return Ok(Err(failed));
            }
        }
        if self.clean {
            if let Some(failed) = self.maintenance("clean", &["clean", "--expunge"]).await? {
                return Ok(Err(failed));
            }
        }

        println!("bazel {}", args.join(" "));
        Ok(Ok(self.launcher.run(args).await?))
    }

    async fn maintenance(
        &self,
        command: &str,
        args: &[&str],
    ) -> BazeliskResult<Option<MigrationOutcome>> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        println!("bazel {}", args.join(" "));
        let code = self.launcher.run(&args).await?;
        println!();

        Ok((code != 0).then(|| MigrationOutcome::MaintenanceFailed {
            command: command.to_string(),
            code,
        }))
    }
}
