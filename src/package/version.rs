//! Package versions.
//!
//! A descriptor may declare its version as a dotted string (`"1.2.0"`) or as
//! an array of components (`[1, 2, "beta"]`). Both normalize to an ordered
//! list of components; numeric components compare numerically.

use serde::Deserialize;
use std::fmt;

/// One version component.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[serde(untagged)]
pub enum VersionPart {
    Number(u64),
    Text(String),
}

impl VersionPart {
    fn parse(text: &str) -> Self {
        match text.parse::<u64>() {
            Ok(n) => VersionPart::Number(n),
            Err(_) => VersionPart::Text(text.to_string()),
        }
    }
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Number(n) => write!(f, "{}", n),
            VersionPart::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Text(String),
    Parts(Vec<VersionPart>),
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(from = "RawVersion")]
pub struct Version(Vec<VersionPart>);

impl From<RawVersion> for Version {
    fn from(raw: RawVersion) -> Self {
        match raw {
            RawVersion::Text(text) => Version::parse(&text),
            RawVersion::Parts(parts) => Version(parts),
        }
    }
}

impl Version {
    /// Split a dotted version string. The empty string is the empty version.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Version::default();
        }
        Version(text.split('.').map(VersionPart::parse).collect())
    }

    pub fn parts(&self) -> &[VersionPart] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}
