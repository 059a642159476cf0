//! Version specification parsing
//!
//! Grammar: `[<fork>/]<value>` or `<fork>/commit/<sha>`, where `<value>` is an
//! exact tag, `latest`, `latest-<N>`, one of the named aliases, or an
//! absolute / home-relative path to a local binary.

use crate::error::{BazeliskError, BazeliskResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical upstream owner
pub const UPSTREAM_FORK: &str = "bazelbuild";

/// Named version aliases, only recognised for the upstream fork
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alias {
    /// Last commit that passed postsubmit
    LastGreen,
    /// Last commit that passed the downstream pipeline
    LastDownstreamGreen,
    /// Newest release candidate (or release, once shipped)
    LastRc,
}

impl Alias {
    pub fn all() -> &'static [Self] {
        &[Self::LastGreen, Self::LastDownstreamGreen, Self::LastRc]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastGreen => "last_green",
            Self::LastDownstreamGreen => "last_downstream_green",
            Self::LastRc => "last_rc",
        }
    }

    fn from_value(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.as_str() == value)
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The form a version specification takes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionForm {
    /// An exact release tag, used unchanged
    Literal(String),
    /// `latest` (0) or `latest-<N>`
    LatestOffset(usize),
    /// One of the [`Alias`] names
    NamedAlias(Alias),
    /// `<fork>/commit/<sha>`
    SourceCommit(String),
    /// A binary on the local filesystem, used as-is
    LocalPath(PathBuf),
}

/// A parsed version specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub fork: String,
    pub form: VersionForm,
}

impl VersionDescriptor {
    /// Parse a raw specification string
    pub fn parse(raw: &str) -> BazeliskResult<Self> {
        let raw = raw.trim();
        let invalid = |reason: &str| BazeliskError::InvalidSpecFormat {
            spec: raw.to_string(),
            reason: reason.to_string(),
        };

        if is_local_path(raw) {
            return Ok(Self {
                fork: UPSTREAM_FORK.to_string(),
                form: VersionForm::LocalPath(PathBuf::from(raw)),
            });
        }

        let segments: Vec<&str> = raw.split('/').collect();
        let (fork, value) = match segments.as_slice() {
            [value] => (UPSTREAM_FORK, *value),
            [fork, value] => (*fork, *value),
            [fork, "commit", sha] => {
                if fork.is_empty() || sha.is_empty() {
                    return Err(invalid("fork and commit must not be empty"));
                }
                return Ok(Self {
                    fork: fork.to_string(),
                    form: VersionForm::SourceCommit(sha.to_string()),
                });
            }
            [_, _, _] => {
                return Err(invalid(
                    "three-part versions must have the form <fork>/commit/<sha>",
                ))
            }
            _ => return Err(invalid("more than 3 \"/\"-separated components")),
        };

        if fork.is_empty() {
            return Err(invalid("fork must not be empty"));
        }
        if value.is_empty() {
            return Err(invalid("version must not be empty"));
        }

        Ok(Self {
            fork: fork.to_string(),
            form: parse_value(fork, value).map_err(|reason| invalid(&reason))?,
        })
    }

    /// Whether this targets the canonical upstream fork
    pub fn is_upstream(&self) -> bool {
        self.fork == UPSTREAM_FORK
    }
}

impl fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.form {
            VersionForm::LocalPath(path) => return write!(f, "{}", path.display()),
            VersionForm::SourceCommit(sha) => return write!(f, "{}/commit/{}", self.fork, sha),
            VersionForm::Literal(tag) => tag.clone(),
            VersionForm::LatestOffset(0) => "latest".to_string(),
            VersionForm::LatestOffset(n) => format!("latest-{}", n),
            VersionForm::NamedAlias(alias) => alias.to_string(),
        };

        if self.is_upstream() {
            f.write_str(&value)
        } else {
            write!(f, "{}/{}", self.fork, value)
        }
    }
}

fn parse_value(fork: &str, value: &str) -> Result<VersionForm, String> {
    if let Some(rest) = value.strip_prefix("latest") {
        if rest.is_empty() {
            return Ok(VersionForm::LatestOffset(0));
        }
        if let Some(digits) = rest.strip_prefix('-') {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                return digits
                    .parse()
                    .map(VersionForm::LatestOffset)
                    .map_err(|e| format!("could not parse offset \"{}\": {}", digits, e));
            }
        }
    }

    if fork == UPSTREAM_FORK {
        if let Some(alias) = Alias::from_value(value) {
            return Ok(VersionForm::NamedAlias(alias));
        }
    }

    Ok(VersionForm::Literal(value.to_string()))
}

fn is_local_path(raw: &str) -> bool {
    raw.starts_with('/') || raw.starts_with('~') || Path::new(raw).is_absolute()
}

/// Expand a leading `~` against the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> VersionDescriptor {
        VersionDescriptor::parse(raw).unwrap()
    }

    #[test]
    fn literal_defaults_to_upstream() {
        let d = parse("5.0.0");
        assert_eq!(d.fork, UPSTREAM_FORK);
        assert_eq!(d.form, VersionForm::Literal("5.0.0".to_string()));
    }

    #[test]
    fn latest_forms() {
        assert_eq!(parse("latest").form, VersionForm::LatestOffset(0));
        assert_eq!(parse("latest-1").form, VersionForm::LatestOffset(1));
        assert_eq!(parse("latest-0").form, VersionForm::LatestOffset(0));
        assert_eq!(
            parse("latest-x").form,
            VersionForm::Literal("latest-x".to_string())
        );
        assert_eq!(
            parse("latest-").form,
            VersionForm::Literal("latest-".to_string())
        );
    }

    #[test]
    fn fork_prefix() {
        let d = parse("myorg/latest-2");
        assert_eq!(d.fork, "myorg");
        assert_eq!(d.form, VersionForm::LatestOffset(2));
    }

    #[test]
    fn source_commit() {
        let d = parse("myorg/commit/abc123");
        assert_eq!(d.fork, "myorg");
        assert_eq!(d.form, VersionForm::SourceCommit("abc123".to_string()));
    }

    #[test]
    fn aliases_only_for_upstream() {
        assert_eq!(
            parse("last_green").form,
            VersionForm::NamedAlias(Alias::LastGreen)
        );
        assert_eq!(
            parse("bazelbuild/last_rc").form,
            VersionForm::NamedAlias(Alias::LastRc)
        );
        assert_eq!(
            parse("myorg/last_downstream_green").form,
            VersionForm::Literal("last_downstream_green".to_string())
        );
    }

    #[test]
    fn local_paths_short_circuit() {
        let d = parse("/opt/bazel/bin/bazel");
        assert_eq!(d.form, VersionForm::LocalPath(PathBuf::from("/opt/bazel/bin/bazel")));

        let d = parse("~/bin/bazel");
        assert_eq!(d.form, VersionForm::LocalPath(PathBuf::from("~/bin/bazel")));
    }

    #[test]
    fn invalid_formats() {
        for raw in ["a/b/c", "a/b/c/d", "", "myorg/", "a/commit/", "x//y"] {
            let err = VersionDescriptor::parse(raw).unwrap_err();
            assert!(
                matches!(err, BazeliskError::InvalidSpecFormat { .. }),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn offset_overflow_is_rejected() {
        let err = VersionDescriptor::parse("latest-99999999999999999999999").unwrap_err();
        assert!(matches!(err, BazeliskError::InvalidSpecFormat { .. }));
    }

    #[test]
    fn display_reparses_to_same_descriptor() {
        for raw in [
            "5.0.0",
            "latest",
            "latest-3",
            "last_green",
            "last_downstream_green",
            "last_rc",
            "myorg/6.1.0",
            "myorg/latest-1",
            "myorg/last_rc",
            "myorg/commit/abc123",
            "bazelbuild/commit/deadbeef",
            "/usr/local/bin/bazel",
        ] {
            let d = parse(raw);
            assert_eq!(parse(&d.to_string()), d, "round trip of {raw:?}");
        }
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        let p = PathBuf::from("/usr/bin/bazel");
        assert_eq!(expand_home(&p), p);
    }

    #[test]
    fn expand_home_replaces_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/bin/bazel")), home.join("bin/bazel"));
        }
    }
}
