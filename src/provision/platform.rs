//! Platform naming for release artifacts

use crate::error::{BazeliskError, BazeliskResult};
use crate::versions::parse_version;
use semver::Version;
use std::fmt;

/// First release with native arm64 binaries for macOS
const DARWIN_ARM64_SINCE: Version = Version::new(4, 1, 0);

/// Operating systems with published binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

/// Machine architectures with published binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

/// Target platform of a downloaded binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detect the platform this process runs on
    pub fn detect() -> BazeliskResult<Self> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a platform from OS and architecture names
    pub fn from_names(os: &str, arch: &str) -> BazeliskResult<Self> {
        let os = match os {
            "linux" => Os::Linux,
            "macos" | "darwin" => Os::Darwin,
            "windows" => Os::Windows,
            other => {
                return Err(BazeliskError::UnsupportedPlatform(format!(
                    "operating system \"{}\", must be Linux, macOS or Windows",
                    other
                )))
            }
        };
        let arch = match arch {
            "x86_64" | "amd64" => Arch::X86_64,
            "aarch64" | "arm64" => Arch::Arm64,
            other => {
                return Err(BazeliskError::UnsupportedPlatform(format!(
                    "machine architecture \"{}\", must be arm64 or x86_64",
                    other
                )))
            }
        };
        Ok(Self { os, arch })
    }

    fn os_name(&self) -> &'static str {
        match self.os {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        }
    }

    /// Platform name used by the CI artifact archive
    pub fn ci_name(&self) -> &'static str {
        match self.os {
            Os::Linux => "ubuntu1404",
            Os::Darwin => "macos",
            Os::Windows => "windows",
        }
    }

    pub fn executable_suffix(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }

    /// Architecture to download for `version`.
    ///
    /// macOS arm64 binaries only exist from 4.1.0 on; older versions use the
    /// x86_64 build. Versions that do not parse keep the native architecture.
    pub fn arch_for(&self, version: &str) -> Arch {
        if self.os == Os::Darwin && self.arch == Arch::Arm64 {
            if let Some(v) = parse_version(version) {
                if v < DARWIN_ARM64_SINCE {
                    return Arch::X86_64;
                }
            }
        }
        self.arch
    }

    /// `bazel-<version>-<os>-<arch><suffix>`
    pub fn binary_filename(&self, version: &str) -> String {
        format!(
            "bazel-{}-{}-{}{}",
            version,
            self.os_name(),
            self.arch_for(version).as_str(),
            self.executable_suffix()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os_name(), self.arch.as_str())
    }
}
