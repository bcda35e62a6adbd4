use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored state for one question link. The identifier is the lookup key,
/// not part of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: LinkStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl LinkRecord {
    pub fn pending(email: String, name: Option<String>) -> Self {
        Self {
            email,
            name,
            status: LinkStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Yes,
    No,
}

/// The two values a recipient may submit. Parsed strictly; anything other
/// than `"yes"` or `"no"` is rejected before the store is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "yes" => Some(Answer::Yes),
            "no" => Some(Answer::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
        }
    }
}

impl From<Answer> for LinkStatus {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Yes => LinkStatus::Yes,
            Answer::No => LinkStatus::No,
        }
    }
}
