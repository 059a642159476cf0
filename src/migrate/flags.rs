//! Incompatible flags announced for a Bazel release
//!
//! Flags come from GitHub issues labelled `migration-<major>.<minor>` whose
//! title starts with the flag name.

use crate::cache::MetadataCache;
use crate::error::{BazeliskError, BazeliskResult};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

const ISSUE_SEARCH_URL: &str =
    "https://api.github.com/search/issues?per_page=100&q=repo:bazelbuild/bazel+label:migration-";
const BREAKING_CHANGE_PREFIX: &str = "breaking-change-";
const UNKNOWN_RELEASE: &str = "TBD";

static MAJOR_MINOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+").expect("version pattern is valid"));

static FLAG_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^incompatible_\w+").expect("flag pattern is valid"));

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Issue {
    title: String,
    html_url: String,
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct IssueList {
    #[serde(default)]
    items: Vec<Issue>,
}

/// An incompatible flag and where it is tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDetails {
    /// `--incompatible_<name>`
    pub name: String,
    /// Release expected to flip the default, or `TBD`
    pub release_to_flip: String,
    pub issue_url: String,
}

impl fmt::Display for FlagDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Bazel {}: {})",
            self.name, self.release_to_flip, self.issue_url
        )
    }
}

/// Incompatible flags for `version`, keyed by flag name
pub async fn incompatible_flags(
    cache: &MetadataCache,
    version: &str,
) -> BazeliskResult<BTreeMap<String, FlagDetails>> {
    let major_minor = MAJOR_MINOR
        .find(version)
        .map(|m| m.as_str())
        .ok_or_else(|| BazeliskError::InvalidVersion(version.to_string()))?;

    let url = format!("{}{}", ISSUE_SEARCH_URL, major_minor);
    let body = cache
        .fetch(
            &url,
            &format!("flags-{}", major_minor),
            "list of flags from GitHub",
        )
        .await?;

    let flags = parse_issues(&body)?;
    debug!("Found {} incompatible flags for {}", flags.len(), major_minor);
    Ok(flags)
}

fn parse_issues(body: &[u8]) -> BazeliskResult<BTreeMap<String, FlagDetails>> {
    let issues: IssueList = serde_json::from_slice(body)?;

    Ok(issues
        .items
        .into_iter()
        .filter_map(|issue| {
            let flag = FLAG_TITLE.find(&issue.title)?;
            let name = format!("--{}", flag.as_str());
            let details = FlagDetails {
                name: name.clone(),
                release_to_flip: breaking_release(&issue.labels),
                issue_url: issue.html_url,
            };
            Some((name, details))
        })
        .collect())
}

fn breaking_release(labels: &[Label]) -> String {
    labels
        .iter()
        .find_map(|l| l.name.strip_prefix(BREAKING_CHANGE_PREFIX))
        .unwrap_or(UNKNOWN_RELEASE)
        .to_string()
}

/// Insert `new` into `base` right before a `--` separator, or at the end
pub fn insert_args(base: &[String], new: &[String]) -> Vec<String> {
    let at = base.iter().position(|a| a == "--").unwrap_or(base.len());
    let mut args = Vec::with_capacity(base.len() + new.len());
    args.extend_from_slice(&base[..at]);
    args.extend_from_slice(new);
    args.extend_from_slice(&base[at..]);
    args
}

/// Flag names in alphabetical order
pub fn sorted_names(flags: &BTreeMap<String, FlagDetails>) -> Vec<String> {
    flags.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeHttp;
    use std::sync::Arc;
    use tempfile::TempDir;

    const ISSUES: &str = r#"{
        "items": [
            {
                "title": "incompatible_b: remove legacy thing",
                "html_url": "https://github.com/bazelbuild/bazel/issues/2",
                "labels": [{"name": "migration-6.4"}, {"name": "breaking-change-7.0"}]
            },
            {
                "title": "incompatible_a",
                "html_url": "https://github.com/bazelbuild/bazel/issues/1",
                "labels": []
            },
            {
                "title": "Not a flag",
                "html_url": "https://github.com/bazelbuild/bazel/issues/3",
                "labels": []
            }
        ]
    }"#;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn issues_become_flags() {
        let flags = parse_issues(ISSUES.as_bytes()).unwrap();

        assert_eq!(
            sorted_names(&flags),
            strings(&["--incompatible_a", "--incompatible_b"])
        );
        assert_eq!(flags["--incompatible_a"].release_to_flip, "TBD");
        assert_eq!(
            flags["--incompatible_b"].to_string(),
            "--incompatible_b (Bazel 7.0: https://github.com/bazelbuild/bazel/issues/2)"
        );
    }

    #[tokio::test]
    async fn query_uses_major_minor() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new().route(
            "https://api.github.com/search/issues?per_page=100&q=repo:bazelbuild/bazel+label:migration-6.4",
            ISSUES,
        ));
        let cache = MetadataCache::new(temp.path(), http.clone(), None);

        let flags = incompatible_flags(&cache, "6.4.0rc2").await.unwrap();

        assert_eq!(flags.len(), 2);
        assert!(temp.path().join("flags-6.4").is_file());
    }

    #[tokio::test]
    async fn unknown_version_is_rejected() {
        let temp = TempDir::new().unwrap();
        let http = Arc::new(FakeHttp::new());
        let cache = MetadataCache::new(temp.path(), http.clone(), None);

        assert!(matches!(
            incompatible_flags(&cache, "unknown").await,
            Err(BazeliskError::InvalidVersion(_))
        ));
        assert!(http.calls().is_empty());
    }

    #[test]
    fn insert_before_separator() {
        let base = strings(&["build", "//...", "--", "-//foo"]);
        assert_eq!(
            insert_args(&base, &strings(&["--x", "--y"])),
            strings(&["build", "//...", "--x", "--y", "--", "-//foo"])
        );
    }

    #[test]
    fn insert_appends_without_separator() {
        let base = strings(&["build", "//..."]);
        assert_eq!(
            insert_args(&base, &strings(&["--x"])),
            strings(&["build", "//...", "--x"])
        );
    }

    #[test]
    fn insert_uses_first_separator() {
        let base = strings(&["run", "--", "a", "--", "b"]);
        assert_eq!(
            insert_args(&base, &strings(&["--x"])),
            strings(&["run", "--x", "--", "a", "--", "b"])
        );
    }

    #[test]
    fn insert_preserves_base_order_for_every_split() {
        let new = strings(&["--n1", "--n2"]);
        for len in 0..5 {
            for sep in 0..=len {
                let mut base: Vec<String> = (0..len).map(|i| format!("a{}", i)).collect();
                if sep < len {
                    base[sep] = "--".to_string();
                }
                let out = insert_args(&base, &new);

                let kept: Vec<String> = out.iter().filter(|a| !new.contains(a)).cloned().collect();
                assert_eq!(kept, base);
                let first_new = out.iter().position(|a| a == "--n1").unwrap();
                assert_eq!(&out[first_new..first_new + 2], new.as_slice());
                match base.iter().position(|a| a == "--") {
                    Some(i) => assert_eq!(first_new, i),
                    None => assert_eq!(first_new, base.len()),
                }
            }
        }
    }
}
