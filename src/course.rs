//! Course records as served by the recommendation backend.
//!
//! The backend hands out rows of a CSV export, so field names carry spaces
//! and any value may be a string, a number or null. Every field is kept as
//! optional text; numeric views are parsed on demand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Maximum number of topics offered as filter choices.
pub const TOPIC_LIMIT: usize = 15;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Course {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(rename = "Course Title", default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    /// Comma-joined keyword list.
    #[serde(rename = "Keyword", default, deserialize_with = "lenient_text")]
    pub keywords: Option<String>,
    #[serde(rename = "Instructor", default, deserialize_with = "lenient_text")]
    pub instructor: Option<String>,
    #[serde(rename = "Level", default, deserialize_with = "lenient_text")]
    pub level: Option<String>,
    #[serde(rename = "Rating", default, deserialize_with = "lenient_text")]
    pub rating: Option<String>,
    /// Approximate hours to complete.
    #[serde(
        rename = "Duration to complete (Approx.)",
        default,
        deserialize_with = "lenient_text"
    )]
    pub duration: Option<String>,
    #[serde(rename = "What you will learn", default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(rename = "Course Url", default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(rename = "Offered By", default, deserialize_with = "lenient_text")]
    pub offered_by: Option<String>,
    #[serde(rename = "Number of Review", default, deserialize_with = "lenient_text")]
    pub review_count: Option<String>,
    #[serde(rename = "Schedule", default, deserialize_with = "lenient_text")]
    pub schedule: Option<String>,
    #[serde(rename = "Modules", default, deserialize_with = "lenient_text")]
    pub modules: Option<String>,
    /// Columns this client does not know about, kept for display.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    pub fn rating_value(&self) -> Option<f64> {
        self.rating.as_deref().and_then(parse_leading_number)
    }

    pub fn duration_hours(&self) -> Option<f64> {
        self.duration.as_deref().and_then(parse_leading_number)
    }

    /// Individual keywords, trimmed, empties dropped.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .as_deref()
            .map(|k| k.split(',').map(str::trim).filter(|k| !k.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled course")
    }
}

/// Collect the distinct keywords of `courses` in first-seen order, capped at
/// [`TOPIC_LIMIT`].
pub fn unique_topics(courses: &[Course]) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for keyword in courses.iter().flat_map(|c| c.keyword_list()) {
        if topics.len() == TOPIC_LIMIT {
            break;
        }
        if !topics.iter().any(|t| t == keyword) {
            topics.push(keyword.to_string());
        }
    }
    topics
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").expect("valid number regex")
});

/// Read the longest numeric prefix of `s` after leading whitespace.
///
/// `"8 hours"` reads as 8, `"4.5"` as 4.5, `"n/a"` as nothing.
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let m = LEADING_NUMBER.find(s)?;
    m.as_str().parse().ok()
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
