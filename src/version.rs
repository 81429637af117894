use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VersionError;

/// A `MAJOR.MINOR.PATCH` server version.
///
/// Parsing is lenient about trailing components: `"6"` and `"6.10"` are read as
/// `6.0.0` and `6.10.0`. Ordering is numeric per component, so `6.10.0 > 6.9.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Lower bound used when a definition declares no `fromversion`.
pub const DEFAULT_FROM_VERSION: Version = Version::new(0, 0, 0);

/// Upper bound used when a definition declares no `toversion`.
pub const DEFAULT_TO_VERSION: Version = Version::new(99, 99, 99);

/// First server version that understands `external-` prefixed artifacts.
pub const CUTOVER_VERSION: Version = Version::new(6, 10, 0);

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse an optional version string, substituting `default` when it is absent or blank.
    pub fn parse_or(raw: Option<&str>, default: Version) -> Result<Version, VersionError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(default),
            Some(s) => s.parse(),
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || VersionError::Invalid(s.to_owned());

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut parts = [0u64; 3];
        let mut count = 0;
        for component in trimmed.split('.') {
            if count == parts.len() {
                return Err(invalid());
            }
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            parts[count] = component.parse().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which export variants an artifact gets, relative to the cutover version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBucket {
    /// `from >= cutover`: only the `external-` prefixed variant.
    ModernOnly,
    /// `to < cutover`: only the unprefixed variant.
    LegacyOnly,
    /// `from < cutover <= to`: both variants, byte-identical.
    Straddling,
}

impl VersionBucket {
    /// Classify a declared compatibility range against `cutover`.
    ///
    /// `ModernOnly` is checked first, so an inverted range starting at or after the
    /// cutover is still modern-only.
    pub fn classify(from: Version, to: Version, cutover: Version) -> Self {
        if from >= cutover {
            VersionBucket::ModernOnly
        } else if to < cutover {
            VersionBucket::LegacyOnly
        } else {
            VersionBucket::Straddling
        }
    }
}
