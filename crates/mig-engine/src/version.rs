//! Schema versions and the patterns tasks are gated on

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Generation-3 pattern
pub const MULE_3_VERSION: &str = "3.*.*";
/// Generation-4 pattern
pub const MULE_4_VERSION: &str = "4.*.*";

/// Version could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{0}'")]
pub struct InvalidVersion(pub String);

/// Concrete `major.minor.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl SchemaVersion {
    /// Construct from components
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = InvalidVersion;

    /// Missing minor/patch components default to zero
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32, InvalidVersion> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let version = Self::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// `major.minor.patch` pattern where any component may be `*`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionPattern {
    components: [Option<u32>; 3],
}

impl VersionPattern {
    /// Pattern matching every version
    #[must_use]
    pub fn any() -> Self {
        Self { components: [None; 3] }
    }

    /// Pattern matching one major version
    #[must_use]
    pub fn major(major: u32) -> Self {
        Self {
            components: [Some(major), None, None],
        }
    }

    /// Check a version against the pattern
    #[must_use]
    pub fn matches(&self, version: &SchemaVersion) -> bool {
        let actual = [version.major, version.minor, version.patch];
        self.components
            .iter()
            .zip(actual)
            .all(|(expected, actual)| expected.map_or(true, |e| e == actual))
    }
}

impl Display for VersionPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| c.map_or_else(|| "*".to_string(), |v| v.to_string()))
            .collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for VersionPattern {
    type Err = InvalidVersion;

    /// Missing trailing components are wildcards: `4` means `4.*.*`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(InvalidVersion(s.to_string()));
        }
        let mut components = [None; 3];
        for (slot, part) in components.iter_mut().zip(parts) {
            *slot = match part {
                "*" | "x" => None,
                digits => Some(digits.parse().map_err(|_| InvalidVersion(s.to_string()))?),
            };
        }
        Ok(Self { components })
    }
}

impl TryFrom<String> for VersionPattern {
    type Error = InvalidVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionPattern> for String {
    fn from(pattern: VersionPattern) -> Self {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_versions() {
        assert_eq!("3.9.1".parse::<SchemaVersion>().unwrap(), SchemaVersion::new(3, 9, 1));
        assert_eq!("4".parse::<SchemaVersion>().unwrap(), SchemaVersion::new(4, 0, 0));
        assert!("4.a".parse::<SchemaVersion>().is_err());
        assert!("1.2.3.4".parse::<SchemaVersion>().is_err());
        assert!("".parse::<SchemaVersion>().is_err());
    }

    #[test]
    fn patterns_match_by_component() {
        let mule3: VersionPattern = MULE_3_VERSION.parse().unwrap();
        assert!(mule3.matches(&SchemaVersion::new(3, 8, 5)));
        assert!(!mule3.matches(&SchemaVersion::new(4, 1, 0)));

        let pinned: VersionPattern = "4.1.*".parse().unwrap();
        assert!(pinned.matches(&SchemaVersion::new(4, 1, 7)));
        assert!(!pinned.matches(&SchemaVersion::new(4, 2, 0)));

        assert!(VersionPattern::any().matches(&SchemaVersion::new(9, 9, 9)));
        assert_eq!("4".parse::<VersionPattern>().unwrap(), VersionPattern::major(4));
    }

    #[test]
    fn pattern_round_trips_through_serde() {
        let pattern: VersionPattern = serde_json::from_str("\"3.*.*\"").unwrap();
        assert_eq!(pattern, VersionPattern::major(3));
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"3.*.*\"");
        assert!(serde_json::from_str::<VersionPattern>("\"three\"").is_err());
    }

    proptest! {
        #[test]
        fn major_pattern_matches_only_its_major(major in 0u32..10, minor in 0u32..20, patch in 0u32..20, other in 0u32..10) {
            let version = SchemaVersion::new(major, minor, patch);
            prop_assert!(VersionPattern::major(major).matches(&version));
            prop_assert_eq!(VersionPattern::major(other).matches(&version), other == major);
            prop_assert!(VersionPattern::any().matches(&version));
        }
    }
}
