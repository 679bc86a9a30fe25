//! Record types flowing through the annotation pipeline

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::deserializers::{de_count, de_post_id, de_string, de_string_or_list, de_tags};

/// Difficulty label, ordered easy < medium < hard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Ordinal used for aggregation: easy=1, medium=2, hard=3
    pub fn ordinal(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Maps an ordinal back to a label, clamping into 1..=3
    pub fn from_ordinal(ordinal: u64) -> Self {
        match ordinal.clamp(1, 3) {
            1 => Difficulty::Easy,
            2 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!(
                "unknown difficulty '{}', expected easy|medium|hard",
                other
            )),
        }
    }
}

/// Term (case-preserving) -> difficulty label
pub type TermMapping = BTreeMap<String, Difficulty>;

/// A cleaned question as produced by the extraction stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default = "missing_post_id", deserialize_with = "de_post_id")]
    pub post_id: i64,
    #[serde(default, deserialize_with = "de_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de_string_or_list")]
    pub latex_title: Vec<String>,
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "de_string")]
    pub body: String,
    #[serde(default, deserialize_with = "de_string_or_list")]
    pub latex: Vec<String>,
    #[serde(default, deserialize_with = "de_count")]
    pub score: i64,
    #[serde(default, deserialize_with = "de_count")]
    pub view_count: i64,
}

/// Sentinel used by the extraction stage when a post carries no id
pub const MISSING_POST_ID: i64 = -1;

fn missing_post_id() -> i64 {
    MISSING_POST_ID
}

/// One line of the annotated output store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub post_id: i64,
    pub title: String,
    pub latex_title: Vec<String>,
    pub tags: Vec<String>,
    pub raw_passage: String,
    pub terms: TermMapping,
    pub simplified_passage: String,
    pub difficulty: Difficulty,
}
