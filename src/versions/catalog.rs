//! Remote version catalogs
//!
//! Two catalog shapes are queried:
//! - the GitHub release list of a fork (paginated JSON array), cached
//! - the release bucket's delimiter listing (`{"prefixes": [...]}`), which
//!   is what release candidates are discovered from

use crate::cache::MetadataCache;
use crate::error::{BazeliskError, BazeliskResult};
use crate::versions::spec::{Alias, UPSTREAM_FORK};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

const GITHUB_API: &str = "https://api.github.com";
const BUCKET_LISTING_URL: &str = "https://www.googleapis.com/storage/v1/b/bazel/o?delimiter=/";
const LAST_GREEN_BASE_URL: &str =
    "https://storage.googleapis.com/bazel-untrusted-builds/last_green_commit/";

/// Releases requested per page of the release list
pub const RELEASES_PER_PAGE: usize = 100;
/// Upper bound on release-list pages fetched for one query
pub const MAX_RELEASE_PAGES: usize = 10;

static RC_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.\d+\.\d+)/rc(\d+)/$").expect("release candidate pattern is valid")
});

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
}

#[derive(Debug, Default, Deserialize)]
struct BucketListing {
    #[serde(default)]
    prefixes: Vec<String>,
}

/// Queries release lists and bucket listings
#[derive(Clone)]
pub struct VersionCatalog {
    cache: MetadataCache,
}

impl VersionCatalog {
    pub fn new(cache: MetadataCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Non-prerelease tags of `fork`, in catalog order
    pub async fn release_tags(&self, fork: &str) -> BazeliskResult<Vec<String>> {
        let mut tags = Vec::new();

        for page in 1..=MAX_RELEASE_PAGES {
            let url = format!(
                "{}/repos/{}/bazel/releases?per_page={}&page={}",
                GITHUB_API, fork, RELEASES_PER_PAGE, page
            );
            let body = self
                .cache
                .fetch(
                    &url,
                    &releases_cache_key(fork, page),
                    &format!("list of Bazel releases from github.com/{}", fork),
                )
                .await?;

            let releases: Vec<Release> = serde_json::from_slice(&body)?;
            let full_page = releases.len() >= RELEASES_PER_PAGE;
            tags.extend(
                releases
                    .into_iter()
                    .filter(|r| !r.prerelease)
                    .map(|r| r.tag_name),
            );

            if !full_page {
                break;
            }
        }

        debug!("Found {} releases for {}", tags.len(), fork);
        Ok(tags)
    }

    /// "Directory" prefixes directly under `prefix` in the release bucket
    pub async fn bucket_prefixes(&self, prefix: &str) -> BazeliskResult<Vec<String>> {
        let url = if prefix.is_empty() {
            BUCKET_LISTING_URL.to_string()
        } else {
            format!("{}&prefix={}", BUCKET_LISTING_URL, prefix)
        };

        let body = self
            .cache
            .fetch_uncached(&url, "list of Bazel versions in the release bucket")
            .await?;
        let listing: BucketListing = serde_json::from_slice(&body)?;
        Ok(listing.prefixes)
    }

    /// Newest release candidate of the newest version in the bucket, or that
    /// version's release tag when it has already shipped
    pub async fn latest_release_candidate(&self) -> BazeliskResult<String> {
        let versions: Vec<String> = self
            .bucket_prefixes("")
            .await?
            .iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .collect();
        let latest = nth_most_recent(&versions, 0)?;

        let entries = self.bucket_prefixes(&format!("{}/", latest)).await?;
        highest_release_candidate(&entries)
    }

    /// Commit published for a last-green alias
    pub async fn last_green_commit(&self, alias: Alias) -> BazeliskResult<String> {
        let suffix = last_green_suffix(alias).ok_or_else(|| {
            BazeliskError::Internal(format!("{} has no last-green endpoint", alias))
        })?;
        let url = format!("{}{}", LAST_GREEN_BASE_URL, suffix);

        let body = self
            .cache
            .fetch_uncached(&url, &format!("{} commit", alias))
            .await?;
        let commit = String::from_utf8_lossy(&body).trim().to_string();
        if commit.is_empty() {
            return Err(BazeliskError::MalformedCatalogEntry {
                entry: url,
                reason: "empty commit".to_string(),
            });
        }
        Ok(commit)
    }
}

/// Cache key for one page of a fork's release list
pub fn releases_cache_key(fork: &str, page: usize) -> String {
    let stem = if fork == UPSTREAM_FORK {
        "releases".to_string()
    } else {
        format!("{}-releases", fork)
    };

    if page <= 1 {
        format!("{}.json", stem)
    } else {
        format!("{}-page{}.json", stem, page)
    }
}

fn last_green_suffix(alias: Alias) -> Option<&'static str> {
    match alias {
        Alias::LastGreen => Some("github.com/bazelbuild/bazel.git/bazel-bazel"),
        Alias::LastDownstreamGreen => Some("downstream_pipeline"),
        Alias::LastRc => None,
    }
}

/// Parse a release tag as a semantic version.
///
/// Accepts missing minor/patch components (`5.0` → `5.0.0`), a leading `v`,
/// and release-candidate suffixes without a dash (`5.0.0rc3` → `5.0.0-rc3`).
pub fn parse_version(tag: &str) -> Option<Version> {
    let tag = tag.trim();
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    if let Ok(v) = Version::parse(tag) {
        return Some(v);
    }

    let (core, pre) = match tag.find(|c: char| !(c.is_ascii_digit() || c == '.')) {
        Some(i) => (&tag[..i], tag[i..].trim_start_matches('-')),
        None => (tag, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    let mut normalized = parts.join(".");
    if !pre.is_empty() {
        normalized.push('-');
        normalized.push_str(pre);
    }
    Version::parse(&normalized).ok()
}

/// Tag at position `offset` from the newest, after ordering by version.
///
/// Tags that do not parse are dropped with a warning rather than failing the
/// whole lookup.
pub fn nth_most_recent(tags: &[String], offset: usize) -> BazeliskResult<String> {
    let mut parsed: Vec<(Version, &str)> = tags
        .iter()
        .filter_map(|tag| match parse_version(tag) {
            Some(v) => Some((v, tag.as_str())),
            None => {
                warn!("Could not parse version: {}", tag);
                None
            }
        })
        .collect();

    if offset >= parsed.len() {
        return Err(BazeliskError::OffsetOutOfRange {
            offset,
            available: parsed.len(),
        });
    }

    parsed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    Ok(parsed[parsed.len() - 1 - offset].1.to_string())
}

/// Pick the active release candidate from the entries nested under one
/// version in the bucket
pub fn highest_release_candidate(entries: &[String]) -> BazeliskResult<String> {
    if let Some(shipped) = entries.iter().find(|e| e.contains("release")) {
        let version = shipped.split('/').next().unwrap_or(shipped);
        debug!("{} has already been released, no active release candidate", version);
        return Ok(version.to_string());
    }

    let mut best: Option<(&str, u32)> = None;
    for entry in entries {
        let caps = RC_ENTRY
            .captures(entry)
            .ok_or_else(|| BazeliskError::MalformedCatalogEntry {
                entry: entry.clone(),
                reason: "expected <version>/rc<N>/".to_string(),
            })?;
        let version = caps.get(1).map_or("", |m| m.as_str());
        let rc: u32 = caps[2]
            .parse()
            .map_err(|e| BazeliskError::MalformedCatalogEntry {
                entry: entry.clone(),
                reason: format!("invalid release candidate number: {}", e),
            })?;

        if best.is_none_or(|(_, max)| rc > max) {
            best = Some((version, rc));
        }
    }

    best.map(|(version, rc)| format!("{}rc{}", version, rc))
        .ok_or_else(|| BazeliskError::MalformedCatalogEntry {
            entry: String::new(),
            reason: "no release candidates listed".to_string(),
        })
}
