//! Kinds of project and where their configuration files live

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Kind of project, by schema generation and packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    /// Generation-3 application
    #[serde(rename = "MULE_THREE_APPLICATION")]
    Mule3Application,
    /// Generation-3 shared domain
    #[serde(rename = "MULE_THREE_DOMAIN")]
    Mule3Domain,
    /// Generation-3 gateway policy
    #[serde(rename = "MULE_THREE_POLICY")]
    Mule3Policy,
    /// Generation-4 application
    #[serde(rename = "MULE_FOUR_APPLICATION")]
    Mule4Application,
    /// Generation-4 shared domain
    #[serde(rename = "MULE_FOUR_DOMAIN")]
    Mule4Domain,
    /// Generation-4 gateway policy
    #[serde(rename = "MULE_FOUR_POLICY")]
    Mule4Policy,
}

/// Test configuration directory, shared by every project type
pub const MUNIT_DIR: &str = "src/test/munit";

impl ProjectType {
    /// All project types
    pub const ALL: [Self; 6] = [
        Self::Mule3Application,
        Self::Mule3Domain,
        Self::Mule3Policy,
        Self::Mule4Application,
        Self::Mule4Domain,
        Self::Mule4Policy,
    ];

    /// Schema generation (3 or 4)
    #[must_use]
    pub fn generation(self) -> u8 {
        match self {
            Self::Mule3Application | Self::Mule3Domain | Self::Mule3Policy => 3,
            Self::Mule4Application | Self::Mule4Domain | Self::Mule4Policy => 4,
        }
    }

    /// Directories, relative to the base path, holding configuration files
    #[must_use]
    pub fn config_dirs(self) -> &'static [&'static str] {
        match self {
            Self::Mule3Application => &["src/main/app", MUNIT_DIR],
            Self::Mule3Domain => &["src/main/domain", MUNIT_DIR],
            Self::Mule3Policy => &["src/main/policy", MUNIT_DIR],
            Self::Mule4Application | Self::Mule4Domain | Self::Mule4Policy => &["src/main/mule", MUNIT_DIR],
        }
    }

    /// Project type a migration from this one produces
    #[must_use]
    pub fn target(self) -> Self {
        match self {
            Self::Mule3Application | Self::Mule4Application => Self::Mule4Application,
            Self::Mule3Domain | Self::Mule4Domain => Self::Mule4Domain,
            Self::Mule3Policy | Self::Mule4Policy => Self::Mule4Policy,
        }
    }

    /// Canonical upper-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mule3Application => "MULE_THREE_APPLICATION",
            Self::Mule3Domain => "MULE_THREE_DOMAIN",
            Self::Mule3Policy => "MULE_THREE_POLICY",
            Self::Mule4Application => "MULE_FOUR_APPLICATION",
            Self::Mule4Domain => "MULE_FOUR_DOMAIN",
            Self::Mule4Policy => "MULE_FOUR_POLICY",
        }
    }
}

impl Display for ProjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown project type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown project type '{0}'")]
pub struct UnknownProjectType(pub String);

impl FromStr for ProjectType {
    type Err = UnknownProjectType;

    /// Accepts the canonical name or a kebab-case short form (`mule3-application`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let found = match normalized.as_str() {
            "mule-three-application" | "mule3-application" => Self::Mule3Application,
            "mule-three-domain" | "mule3-domain" => Self::Mule3Domain,
            "mule-three-policy" | "mule3-policy" => Self::Mule3Policy,
            "mule-four-application" | "mule4-application" => Self::Mule4Application,
            "mule-four-domain" | "mule4-domain" => Self::Mule4Domain,
            "mule-four-policy" | "mule4-policy" => Self::Mule4Policy,
            _ => return Err(UnknownProjectType(s.to_string())),
        };
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_and_short_names() {
        for ty in ProjectType::ALL {
            assert_eq!(ty.as_str().parse::<ProjectType>().unwrap(), ty);
        }
        assert_eq!("mule4-domain".parse::<ProjectType>().unwrap(), ProjectType::Mule4Domain);
        assert!("mule5-application".parse::<ProjectType>().is_err());
    }

    #[test]
    fn directories_by_generation() {
        assert_eq!(ProjectType::Mule3Policy.config_dirs(), &["src/main/policy", MUNIT_DIR]);
        assert_eq!(ProjectType::Mule4Policy.config_dirs(), &["src/main/mule", MUNIT_DIR]);
        assert_eq!(ProjectType::Mule3Domain.target(), ProjectType::Mule4Domain);
    }

    #[test]
    fn serializes_canonical_name() {
        let yaml = serde_yaml::to_string(&ProjectType::Mule4Application).unwrap();
        assert_eq!(yaml.trim(), "MULE_FOUR_APPLICATION");
    }
}
