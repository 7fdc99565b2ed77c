//! Learner profile fields that drive recommendations.

use crate::course::lenient_text;
use serde::{Deserialize, Serialize};

/// Field names accepted by the backend, in the order they are displayed.
pub const FIELDS: &[&str] = &[
    "name",
    "age",
    "job_role",
    "career_goals",
    "skills",
    "interests",
    "interested_courses",
    "liked_courses",
];

/// Only set fields are sent, so a partial profile updates only those columns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub job_role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub interested_courses: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub liked_courses: Option<String>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        FIELDS.iter().all(|f| self.get(f).is_none())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        let value = match field {
            "name" => &self.name,
            "age" => &self.age,
            "job_role" => &self.job_role,
            "career_goals" => &self.career_goals,
            "skills" => &self.skills,
            "interests" => &self.interests,
            "interested_courses" => &self.interested_courses,
            "liked_courses" => &self.liked_courses,
            _ => return None,
        };
        value.as_deref()
    }

    /// Set `field` to `value`. Returns false for an unknown field name.
    pub fn set(&mut self, field: &str, value: &str) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "age" => &mut self.age,
            "job_role" => &mut self.job_role,
            "career_goals" => &mut self.career_goals,
            "skills" => &mut self.skills,
            "interests" => &mut self.interests,
            "interested_courses" => &mut self.interested_courses,
            "liked_courses" => &mut self.liked_courses,
            _ => return false,
        };
        *slot = Some(value.to_string());
        true
    }

    /// Build a profile update from `key=value` words.
    pub fn from_assignments<S: AsRef<str>>(words: &[S]) -> Result<Self, String> {
        let mut profile = Profile::default();
        for word in words {
            let word = word.as_ref();
            let Some((key, value)) = word.split_once('=') else {
                return Err(format!("Expected key=value, got '{}'", word));
            };
            if !profile.set(key.trim(), value.trim()) {
                return Err(format!(
                    "Unknown profile field '{}'. Known fields: {}",
                    key.trim(),
                    FIELDS.join(", ")
                ));
            }
        }
        Ok(profile)
    }

    /// Whether this update would make the backend regenerate recommendations.
    pub fn touches_recommendation_inputs(&self) -> bool {
        self.career_goals.is_some() || self.skills.is_some() || self.interests.is_some()
    }
}
