use chrono::{DateTime, FixedOffset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SCHEMA_VERSION: u32 = 1;

/// Language name to byte count, for one repository or summed across many.
pub type LanguageBytes = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`.
    pub fn from_name_with_owner(full: &str) -> Option<Self> {
        let (owner, name) = full.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(owner, name))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub authored_at: DateTime<FixedOffset>,
}

impl Commit {
    pub fn new(authored_at: DateTime<FixedOffset>) -> Self {
        Self { authored_at }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatKind {
    Daily,
    Weekly,
    Languages,
    Unknown(String),
}

impl StatKind {
    pub fn needs_commits(&self) -> bool {
        matches!(self, StatKind::Daily | StatKind::Weekly)
    }

    pub fn needs_languages(&self) -> bool {
        matches!(self, StatKind::Languages)
    }
}

impl FromStr for StatKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Ok(match key.as_str() {
            "day-stats" | "day-of-hour" | "hour-of-day" | "daily" => StatKind::Daily,
            "week-stats" | "day-of-week" | "weekly" => StatKind::Weekly,
            "language-stats" | "language-usage" | "languages" => StatKind::Languages,
            _ => StatKind::Unknown(s.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBucket {
    pub hour: u32,
    pub commit_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBucket {
    #[serde(with = "weekday_name")]
    pub weekday: Weekday,
    pub commit_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    pub name: String,
    pub bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub time_zone: String,
    pub total_commits: u64,
    pub daily: Option<Vec<HourBucket>>,
    pub weekly: Option<Vec<DayBucket>>,
    pub languages: Option<Vec<LanguageShare>>,
    /// Requested identifiers that matched no statistic.
    #[serde(default)]
    pub unknown: Vec<String>,
}

mod weekday_name {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&day.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Weekday, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_kind_accepts_legacy_and_descriptive_names() {
        assert_eq!("DAY_STATS".parse::<StatKind>().unwrap(), StatKind::Daily);
        assert_eq!("day-of-hour".parse::<StatKind>().unwrap(), StatKind::Daily);
        assert_eq!("WEEK_STATS".parse::<StatKind>().unwrap(), StatKind::Weekly);
        assert_eq!("day-of-week".parse::<StatKind>().unwrap(), StatKind::Weekly);
        assert_eq!("LANGUAGE_STATS".parse::<StatKind>().unwrap(), StatKind::Languages);
        assert_eq!("language-usage".parse::<StatKind>().unwrap(), StatKind::Languages);
        assert_eq!(
            "MOON_STATS".parse::<StatKind>().unwrap(),
            StatKind::Unknown("MOON_STATS".to_string())
        );
    }

    #[test]
    fn repository_parses_name_with_owner() {
        let repo = Repository::from_name_with_owner("octo/hello").unwrap();
        assert_eq!(repo.owner, "octo");
        assert_eq!(repo.name, "hello");
        assert_eq!(repo.full_name(), "octo/hello");
        assert!(Repository::from_name_with_owner("nope").is_none());
        assert!(Repository::from_name_with_owner("/x").is_none());
    }
}
