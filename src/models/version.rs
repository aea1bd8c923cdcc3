//! Dataset version strings (`MM.mm.ppp`)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}\.[0-9]{2}\.[0-9]{3}$").expect("version pattern is valid"));

/// Field widths of the three version components
const WIDTHS: [usize; 3] = [2, 2, 3];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed version '{input}': expected XX.XX.XXX")]
pub struct VersionError {
    pub input: String,
}

/// A zero-padded `MAJOR.MINOR.PATCH` version.
///
/// Always stored in padded form, so ordering and equality are plain string
/// comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionString(String);

impl VersionString {
    /// Parse a version, padding short numeric components (`1.0.1` -> `01.00.001`)
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if VERSION_PATTERN.is_match(trimmed) {
            return Ok(Self(trimmed.to_string()));
        }

        let error = || VersionError {
            input: input.to_string(),
        };

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != WIDTHS.len() {
            return Err(error());
        }

        let mut padded = Vec::with_capacity(WIDTHS.len());
        for (part, width) in parts.iter().zip(WIDTHS) {
            if part.is_empty() || part.len() > width || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(error());
            }
            padded.push(format!("{part:0>width$}"));
        }

        Ok(Self(padded.join(".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionString {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VersionString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The version a reference points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "camelCase")]
pub enum RefVersion {
    /// Whatever the newest stored version is at resolution time
    Latest,
    Pinned(VersionString),
    /// A pinned version that does not follow the version format
    Malformed(String),
}

impl RefVersion {
    /// Interpret the raw version field of a reference.
    ///
    /// Absent, empty and `latest` all mean the newest version.
    pub fn from_field(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return RefVersion::Latest;
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case("latest") {
            return RefVersion::Latest;
        }
        match VersionString::parse(raw) {
            Ok(version) => RefVersion::Pinned(version),
            Err(_) => RefVersion::Malformed(raw.to_string()),
        }
    }
}

impl fmt::Display for RefVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefVersion::Latest => f.write_str("latest"),
            RefVersion::Pinned(version) => write!(f, "{version}"),
            RefVersion::Malformed(raw) => write!(f, "{raw}"),
        }
    }
}
