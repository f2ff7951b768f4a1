//! Document version arithmetic.
//!
//! Versions are `N.X` strings: minor versions (X >= 1) are drafts in
//! progress, major versions (N.0 with N >= 1) have been effective. `0.1` is
//! the initial version of every new document.

use crate::error::QmsError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const INITIAL: Version = Version { major: 0, minor: 1 };

    /// True when the document has ever been approved (major part >= 1).
    pub fn has_been_effective(&self) -> bool {
        self.major >= 1
    }

    /// `N.X -> N+1.0`
    pub fn bump_major(&self) -> Version {
        Version {
            major: self.major + 1,
            minor: 0,
        }
    }

    /// First draft version after an effective release: `N.0 -> N.1`.
    pub fn next_draft(&self) -> Version {
        Version {
            major: self.major,
            minor: 1,
        }
    }
}

impl FromStr for Version {
    type Err = QmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QmsError::Storage {
            message: format!("invalid version '{s}' (expected N.X)"),
        };
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Version {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parses a stored version string, defaulting to `0.1` when malformed input
/// is encountered in legacy metadata.
pub fn parse_or_initial(s: &str) -> Version {
    s.parse().unwrap_or(Version::INITIAL)
}
