use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::CrevError;

/// How thoroughly a crate was reviewed, or how well it was understood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
    None,
}

/// Overall verdict of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Strong,
    Positive,
    Neutral,
    Negative,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::High, Level::Medium, Level::Low, Level::None];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
            Level::None => "none",
        }
    }
}

impl Rating {
    pub const ALL: [Rating; 4] = [
        Rating::Strong,
        Rating::Positive,
        Rating::Neutral,
        Rating::Negative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Strong => "strong",
            Rating::Positive => "positive",
            Rating::Neutral => "neutral",
            Rating::Negative => "negative",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Matching is exact: "High" is rejected just like "bogus".
impl FromStr for Level {
    type Err = CrevError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| CrevError::InvalidLevel(s.to_string()))
    }
}

impl FromStr for Rating {
    type Err = CrevError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::ALL
            .into_iter()
            .find(|rating| rating.as_str() == s)
            .ok_or_else(|| CrevError::InvalidRating(s.to_string()))
    }
}

/// The substantive content of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewScore {
    pub thoroughness: Level,
    pub understanding: Level,
    pub rating: Rating,
}

impl Default for ReviewScore {
    fn default() -> Self {
        Self {
            thoroughness: Level::Low,
            understanding: Level::Medium,
            rating: Rating::Positive,
        }
    }
}

/// A reviewed package as reported by cargo-crev
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub source: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub digest: String,
}

/// Author of a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicId {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A published review, decoded from `cargo crev proof find`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub date: String,
    pub package: PackageIdentity,
    pub review: ReviewScore,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PublicId>,
}

impl ReviewRecord {
    /// The review date, if it is a valid RFC 3339 timestamp
    pub fn parsed_date(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.date.trim()).ok()
    }
}

/// Input for a new review submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    pub review: ReviewScore,
    pub alternatives: Vec<String>,
    pub comment: String,
}

impl ReviewDraft {
    pub fn new(review: ReviewScore) -> Self {
        Self {
            review,
            ..Self::default()
        }
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Sort records newest first; records with unparsable dates go last, in input order
pub fn sort_newest_first(records: &mut [ReviewRecord]) {
    records.sort_by(|a, b| match (a.parsed_date(), b.parsed_date()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
