//! Remote metadata caching
//!
//! Catalog and issue-tracker payloads are cached under the cache home,
//! one file per key:
//!
//! | Key | Payload |
//! |-----|---------|
//! | `releases.json` | upstream release list |
//! | `<fork>-releases.json` | release list of a fork |
//! | `flags-<major.minor>` | incompatible-flag issue search |
//!
//! Staleness is the only invalidation signal; nothing is evicted by size.

pub mod metadata;

pub use metadata::{CacheEntry, MetadataCache, FRESHNESS_WINDOW};
