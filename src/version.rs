// version.rs — Host version identifiers and the ranges layout sets are keyed by.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A host build version, as reported by the host's `app.version` tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl HostVersion {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl From<(u16, u16, u16)> for HostVersion {
    fn from((major, minor, patch): (u16, u16, u16)) -> Self {
        Self::new(major, minor, patch)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid host version string '{0}'")]
pub struct VersionParseError(pub String);

impl FromStr for HostVersion {
    type Err = VersionParseError;

    /// Accepts `"3.4.1"`, `"3.4"` and a leading `v` as used by release tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let trimmed = s.trim().trim_start_matches('v');
        let mut parts = trimmed.split('.');

        let mut next = |required: bool| -> Result<u16, VersionParseError> {
            match parts.next() {
                Some(p) => p.parse::<u16>().map_err(|_| err()),
                None if required => Err(err()),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(true)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self::new(major, minor, patch))
    }
}

/// Inclusive range of host versions sharing one memory layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionRange {
    pub min: HostVersion,
    pub max: HostVersion,
}

impl VersionRange {
    /// Every patch release of `major.minor`.
    pub const fn minor_series(major: u16, minor: u16) -> Self {
        Self {
            min: HostVersion::new(major, minor, 0),
            max: HostVersion::new(major, minor, u16::MAX),
        }
    }

    pub fn contains(&self, v: HostVersion) -> bool {
        self.min <= v && v <= self.max
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min.major == self.max.major
            && self.min.minor == self.max.minor
            && self.min.patch == 0
            && self.max.patch == u16::MAX
        {
            write!(f, "{}.{}.x", self.min.major, self.min.minor)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}
