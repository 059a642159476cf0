//! Version specifications, catalogs and resolution

pub mod catalog;
pub mod resolve;
pub mod spec;

pub use catalog::{nth_most_recent, parse_version, VersionCatalog};
pub use resolve::{ArtifactSource, ResolvedVersion, VersionResolver, UNKNOWN_VERSION};
pub use spec::{Alias, VersionDescriptor, VersionForm, UPSTREAM_FORK};
