//! Client-side narrowing of a fetched course list.
//!
//! Every criterion is optional. An unset criterion places no constraint;
//! a set criterion excludes courses whose field is missing or unparsable.
//! All active criteria are combined with logical AND.

use crate::course::Course;
use std::fmt;

/// Course length bands, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    /// Up to 10 hours.
    Short,
    /// More than 10, up to 30 hours.
    Medium,
    /// More than 30 hours.
    Long,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "long" => Some(Self::Long),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    pub fn contains(&self, hours: f64) -> bool {
        match self {
            Self::Short => hours <= 10.0,
            Self::Medium => hours > 10.0 && hours <= 30.0,
            Self::Long => hours > 30.0,
        }
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Free text matched against title, keywords and instructor.
    pub search_term: String,
    pub level: Option<String>,
    /// Only thresholds above zero take effect.
    pub min_rating: Option<f64>,
    pub duration: Option<DurationBucket>,
    /// Selected topics in selection order, no duplicates.
    pub topics: Vec<String>,
}

impl FilterCriteria {
    /// True when no criterion would exclude anything.
    pub fn is_empty(&self) -> bool {
        self.search_term.trim().is_empty()
            && self.level.is_none()
            && self.active_min_rating().is_none()
            && self.duration.is_none()
            && self.topics.is_empty()
    }

    /// Select `topic` if it is not selected yet, deselect it otherwise.
    pub fn toggle_topic(&mut self, topic: &str) {
        if let Some(pos) = self.topics.iter().position(|t| t == topic) {
            self.topics.remove(pos);
        } else {
            self.topics.push(topic.to_string());
        }
    }

    /// Clear every criterion, including the search term.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn active_min_rating(&self) -> Option<f64> {
        self.min_rating.filter(|r| *r > 0.0)
    }

    /// Whether `course` passes every active criterion.
    pub fn matches(&self, course: &Course) -> bool {
        self.matches_search(course)
            && self.matches_level(course)
            && self.matches_rating(course)
            && self.matches_duration(course)
            && self.matches_topics(course)
    }

    fn matches_search(&self, course: &Course) -> bool {
        if self.search_term.trim().is_empty() {
            return true;
        }
        let needle = self.search_term.to_lowercase();
        [&course.title, &course.keywords, &course.instructor]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    fn matches_level(&self, course: &Course) -> bool {
        match &self.level {
            Some(level) => course.level.as_deref() == Some(level.as_str()),
            None => true,
        }
    }

    fn matches_rating(&self, course: &Course) -> bool {
        match self.active_min_rating() {
            Some(min) => course.rating_value().is_some_and(|r| r >= min),
            None => true,
        }
    }

    fn matches_duration(&self, course: &Course) -> bool {
        match self.duration {
            Some(bucket) => course.duration_hours().is_some_and(|h| bucket.contains(h)),
            None => true,
        }
    }

    fn matches_topics(&self, course: &Course) -> bool {
        if self.topics.is_empty() {
            return true;
        }
        let keywords = course.keywords.as_deref().unwrap_or("").to_lowercase();
        self.topics
            .iter()
            .any(|topic| keywords.contains(&topic.to_lowercase()))
    }
}

/// Courses from `courses` that satisfy `criteria`, in their original order.
pub fn filter<'a>(courses: &'a [Course], criteria: &FilterCriteria) -> Vec<&'a Course> {
    courses.iter().filter(|c| criteria.matches(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::course;

    fn sample() -> Vec<Course> {
        vec![
            course("Intro to Python", "python, basics", "Beginner", "4.5", "8"),
            course("Advanced ML", "ml, ai", "Advanced", "3.0", "40"),
        ]
    }

    fn titles(result: &[&Course]) -> Vec<String> {
        result.iter().map(|c| c.display_title().to_string()).collect()
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let courses = sample();
        let result = filter(&courses, &FilterCriteria::default());
        assert_eq!(result.len(), courses.len());
        assert!(result.iter().zip(&courses).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_level_scenario() {
        let courses = sample();
        let criteria = FilterCriteria {
            level: Some("Beginner".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Intro to Python"]);
    }

    #[test]
    fn test_level_is_exact_match() {
        let courses = sample();
        let criteria = FilterCriteria {
            level: Some("beginner".to_string()),
            ..Default::default()
        };
        assert!(filter(&courses, &criteria).is_empty());
    }

    #[test]
    fn test_min_rating_scenario() {
        let courses = sample();
        let criteria = FilterCriteria {
            min_rating: Some(4.0),
            ..Default::default()
        };
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Intro to Python"]);
    }

    #[test]
    fn test_zero_rating_threshold_is_inactive() {
        let mut courses = sample();
        courses.push(Course {
            title: Some("Unrated".to_string()),
            ..Course::default()
        });
        let criteria = FilterCriteria {
            min_rating: Some(0.0),
            ..Default::default()
        };
        assert!(criteria.is_empty());
        assert_eq!(filter(&courses, &criteria).len(), 3);
    }

    #[test]
    fn test_search_scenario() {
        let courses = sample();
        let criteria = FilterCriteria {
            search_term: "ml".to_string(),
            ..Default::default()
        };
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Advanced ML"]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_covers_instructor() {
        let mut courses = sample();
        courses[1].instructor = Some("Grace Hopper".to_string());
        let criteria = FilterCriteria {
            search_term: "HOPPER".to_string(),
            ..Default::default()
        };
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Advanced ML"]);
    }

    #[test]
    fn test_blank_search_is_inactive() {
        let courses = sample();
        let criteria = FilterCriteria {
            search_term: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(filter(&courses, &criteria).len(), 2);
    }

    #[test]
    fn test_duration_bucket_boundaries() {
        assert!(DurationBucket::Short.contains(10.0));
        assert!(!DurationBucket::Medium.contains(10.0));
        assert!(!DurationBucket::Long.contains(10.0));

        assert!(!DurationBucket::Short.contains(30.0));
        assert!(DurationBucket::Medium.contains(30.0));
        assert!(!DurationBucket::Long.contains(30.0));

        assert!(!DurationBucket::Short.contains(30.01));
        assert!(!DurationBucket::Medium.contains(30.01));
        assert!(DurationBucket::Long.contains(30.01));
    }

    #[test]
    fn test_duration_filter_excludes_unparsable() {
        let courses = vec![
            course("ten", "", "", "", "10"),
            course("thirty", "", "", "", "30 hours"),
            course("unknown", "", "", "", "n/a"),
        ];
        for (bucket, expected) in [
            (DurationBucket::Short, vec!["ten"]),
            (DurationBucket::Medium, vec!["thirty"]),
            (DurationBucket::Long, vec![]),
        ] {
            let criteria = FilterCriteria {
                duration: Some(bucket),
                ..Default::default()
            };
            assert_eq!(titles(&filter(&courses, &criteria)), expected);
        }
    }

    #[test]
    fn test_topics_match_any() {
        let courses = sample();
        let mut criteria = FilterCriteria::default();
        criteria.toggle_topic("AI");
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Advanced ML"]);

        criteria.toggle_topic("basics");
        assert_eq!(filter(&courses, &criteria).len(), 2);

        criteria.toggle_topic("AI");
        assert_eq!(criteria.topics, vec!["basics"]);
        assert_eq!(titles(&filter(&courses, &criteria)), vec!["Intro to Python"]);
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let courses = sample();
        let criteria = FilterCriteria {
            search_term: "python".to_string(),
            min_rating: Some(4.8),
            ..Default::default()
        };
        assert!(filter(&courses, &criteria).is_empty());
    }

    #[test]
    fn test_subset_and_idempotent() {
        let courses = vec![
            course("Intro to Python", "python, basics", "Beginner", "4.5", "8"),
            course("Advanced ML", "ml, ai", "Advanced", "3.0", "40"),
            course("Data Science", "python, data", "Intermediate", "4.1", "20"),
            course("Web Basics", "html, basics", "Beginner", "", "12"),
            Course::default(),
        ];
        let criteria_set = vec![
            FilterCriteria::default(),
            FilterCriteria {
                search_term: "basics".to_string(),
                ..Default::default()
            },
            FilterCriteria {
                level: Some("Beginner".to_string()),
                duration: Some(DurationBucket::Medium),
                ..Default::default()
            },
            FilterCriteria {
                min_rating: Some(4.0),
                topics: vec!["python".to_string()],
                ..Default::default()
            },
        ];

        for criteria in &criteria_set {
            let once: Vec<Course> = filter(&courses, criteria).into_iter().cloned().collect();
            assert!(once.iter().all(|c| courses.contains(c)));

            let twice: Vec<Course> = filter(&once, criteria).into_iter().cloned().collect();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut criteria = FilterCriteria {
            search_term: "x".to_string(),
            level: Some("Advanced".to_string()),
            min_rating: Some(3.0),
            duration: Some(DurationBucket::Long),
            topics: vec!["ai".to_string()],
        };
        assert!(!criteria.is_empty());
        criteria.reset();
        assert!(criteria.is_empty());
        assert_eq!(criteria, FilterCriteria::default());
    }

    #[test]
    fn test_duration_bucket_parse() {
        assert_eq!(DurationBucket::from_str("Short"), Some(DurationBucket::Short));
        assert_eq!(DurationBucket::from_str("long"), Some(DurationBucket::Long));
        assert_eq!(DurationBucket::from_str("forever"), None);
        assert_eq!(DurationBucket::Medium.to_string(), "medium");
    }
}
