//! View state and plain-text rendering for the interactive client.

use crate::course::{unique_topics, Course};
use crate::filter::{filter, DurationBucket, FilterCriteria};
use crate::profile::{Profile, FIELDS};
use std::fmt::Write as _;

/// Level labels offered as filter choices.
pub const LEVELS: &[&str] = &["Beginner", "Intermediate", "Advanced", "Mixed"];

/// Highest selectable minimum rating.
pub const MAX_RATING: f64 = 5.0;

/// Map user input onto one of [`LEVELS`], ignoring case.
pub fn canonical_level(input: &str) -> Option<&'static str> {
    LEVELS
        .iter()
        .copied()
        .find(|level| level.eq_ignore_ascii_case(input.trim()))
}

/// The recommended-courses view: the last fetched list plus the active
/// criteria. The visible subset is recomputed from the full list on every
/// call to [`Catalog::visible`].
#[derive(Debug, Default)]
pub struct Catalog {
    courses: Vec<Course>,
    loaded: bool,
    pub criteria: FilterCriteria,
}

impl Catalog {
    pub fn load(&mut self, courses: Vec<Course>) {
        self.courses = courses;
        self.loaded = true;
    }

    /// Forget the fetched list and criteria (sign-out, profile change).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn visible(&self) -> Vec<&Course> {
        filter(&self.courses, &self.criteria)
    }

    pub fn topics(&self) -> Vec<String> {
        unique_topics(&self.courses)
    }
}

/// The dashboard's one-at-a-time walk through the recommendations.
#[derive(Debug, Default)]
pub struct Carousel {
    courses: Vec<Course>,
    index: usize,
}

impl Carousel {
    pub fn load(&mut self, courses: Vec<Course>) {
        self.courses = courses;
        self.index = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Course> {
        self.courses.get(self.index)
    }

    /// Advance, wrapping from the last course to the first.
    pub fn next(&mut self) -> Option<&Course> {
        if self.courses.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.courses.len();
        self.current()
    }

    /// Step back, wrapping from the first course to the last.
    pub fn prev(&mut self) -> Option<&Course> {
        if self.courses.is_empty() {
            return None;
        }
        let len = self.courses.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }
}

fn stars(rating: f64) -> String {
    let full = rating.clamp(0.0, 5.0).floor() as usize;
    format!("{}{}", "★".repeat(full), "☆".repeat(5 - full))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

/// One line per course for the catalog listing.
pub fn course_line(n: usize, course: &Course) -> String {
    let mut line = format!("{:>3}. {}", n, course.display_title());
    if let Some(level) = &course.level {
        let _ = write!(line, " [{}]", level);
    }
    if let Some(rating) = course.rating_value().filter(|r| *r > 0.0) {
        let _ = write!(line, " {} {}", stars(rating), rating);
    }
    if let Some(duration) = &course.duration {
        let _ = write!(line, " · {} hours", duration);
    }
    if let Some(instructor) = &course.instructor {
        let _ = write!(line, " · By: {}", instructor);
    }
    if let Some(id) = &course.id {
        let _ = write!(line, " (id {})", id);
    }
    line
}

/// Dashboard card for the course at `position` of `total`.
pub fn course_card(course: &Course, position: usize, total: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}/{}] {}", position + 1, total, course.display_title());
    let keywords = course.keyword_list();
    if !keywords.is_empty() {
        let _ = writeln!(out, "  Topics: {}", keywords.join(", "));
    }
    if let Some(rating) = course.rating_value() {
        let _ = writeln!(out, "  Rating: {} {}", stars(rating), rating);
    }
    if let Some(description) = &course.description {
        let _ = writeln!(out, "  {}", truncate(description, 150));
    }
    if let Some(duration) = &course.duration {
        let _ = writeln!(out, "  Duration: {} hours", duration);
    }
    if let Some(url) = &course.url {
        let _ = writeln!(out, "  {}", url);
    }
    out
}

/// Full course-details view.
pub fn course_details(course: &Course) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", course.display_title());
    if let Some(keywords) = &course.keywords {
        let _ = writeln!(out, "{}", keywords);
    }
    let _ = writeln!(out);
    if let Some(description) = &course.description {
        let _ = writeln!(out, "What you will learn:\n  {}\n", description);
    }

    let fields = [
        ("Instructor", &course.instructor),
        ("Level", &course.level),
        ("Duration", &course.duration),
        ("Offered by", &course.offered_by),
        ("Rating", &course.rating),
        ("Reviews", &course.review_count),
        ("Schedule", &course.schedule),
        ("Modules", &course.modules),
        ("Course URL", &course.url),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "  {:<11} {}", format!("{}:", label), value);
        }
    }
    out
}

/// Summary of the active criteria, or `None` when nothing is filtered.
pub fn criteria_summary(criteria: &FilterCriteria) -> Option<String> {
    if criteria.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !criteria.search_term.trim().is_empty() {
        parts.push(format!("search \"{}\"", criteria.search_term));
    }
    if let Some(level) = &criteria.level {
        parts.push(format!("level {}", level));
    }
    if let Some(rating) = criteria.min_rating.filter(|r| *r > 0.0) {
        parts.push(format!("rating >= {}", rating));
    }
    if let Some(bucket) = criteria.duration {
        parts.push(format!("duration {}", bucket));
    }
    if !criteria.topics.is_empty() {
        parts.push(format!("topics {}", criteria.topics.join(" | ")));
    }
    Some(parts.join(", "))
}

/// The catalog listing with its filter summary.
pub fn catalog_listing(catalog: &Catalog) -> String {
    let mut out = String::new();
    let visible = catalog.visible();
    let _ = writeln!(
        out,
        "Recommended courses ({} of {})",
        visible.len(),
        catalog.courses().len()
    );
    if let Some(summary) = criteria_summary(&catalog.criteria) {
        let _ = writeln!(out, "Filters: {}", summary);
    }
    if visible.is_empty() {
        if catalog.courses().is_empty() {
            let _ = writeln!(
                out,
                "No recommendations yet. Describe your goals with /setup to get some."
            );
        } else {
            let _ = writeln!(out, "No courses match your filters. Try /reset.");
        }
    }
    for (i, course) in visible.iter().enumerate() {
        let _ = writeln!(out, "{}", course_line(i + 1, course));
    }
    out
}

/// Topic choices, marking the selected ones.
pub fn topic_choices(catalog: &Catalog) -> String {
    let topics = catalog.topics();
    if topics.is_empty() {
        return "No topics available. Load courses with /courses first.\n".to_string();
    }
    let mut out = String::from("Topics:\n");
    for topic in topics {
        let marker = if catalog.criteria.topics.contains(&topic) {
            "*"
        } else {
            " "
        };
        let _ = writeln!(out, "  {} {}", marker, topic);
    }
    out
}

pub fn duration_choices() -> String {
    DurationBucket::ALL
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

pub fn profile_view(profile: &Profile, email: &str, account_id: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", profile.name.as_deref().unwrap_or(email));
    let _ = writeln!(out, "  Email:      {}", email);
    let _ = writeln!(out, "  Account ID: {}", account_id);
    if profile.is_empty() {
        let _ = writeln!(
            out,
            "Your profile is empty. Try /setup career_goals=\"...\" skills=\"...\" interests=\"...\""
        );
        return out;
    }
    for field in FIELDS {
        if let Some(value) = profile.get(field) {
            let _ = writeln!(out, "  {:<19} {}", format!("{}:", field), value);
        }
    }
    out
}
