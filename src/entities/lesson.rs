//! Lesson learned entity (Lição Aprendida)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{default_revision, Entity};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::numbering::SequenceFamily;

/// Lesson status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LessonStatus::Draft => write!(f, "draft"),
            LessonStatus::Published => write!(f, "published"),
            LessonStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for LessonStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(LessonStatus::Draft),
            "published" => Ok(LessonStatus::Published),
            "archived" => Ok(LessonStatus::Archived),
            _ => Err(format!(
                "Invalid lesson status: {}. Use draft, published, or archived",
                s
            )),
        }
    }
}

/// Lesson learned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: EntityId,

    /// Yearly number (e.g., "LA-2025-004")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    pub title: String,

    /// Project, product or process where it happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// What happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what_happened: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,

    /// Record that triggered it (e.g., "RNC-0042")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub date: NaiveDate,

    #[serde(default)]
    pub status: LessonStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created: DateTime<Utc>,

    pub author: String,

    #[serde(default = "default_revision")]
    pub revision: u32,
}

impl Entity for Lesson {
    const PREFIX: EntityPrefix = EntityPrefix::Lsn;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    fn family(&self) -> SequenceFamily {
        SequenceFamily::Lesson
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn state(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl Lesson {
    pub fn new(title: String, date: NaiveDate, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Lsn),
            number: None,
            title,
            context: None,
            what_happened: None,
            lesson: None,
            recommendation: None,
            source: None,
            date,
            status: LessonStatus::default(),
            tags: Vec::new(),
            created: Utc::now(),
            author,
            revision: 1,
        }
    }

    /// Case-insensitive match against title, lesson and tags
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self
                .lesson
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&query))
            || self.tags.iter().any(|t| t.to_lowercase() == query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lesson_creation_and_yaml() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 14).unwrap();
        let mut lesson = Lesson::new("Check primer lot before blasting".to_string(), date, "qa".to_string());
        lesson.number = Some("LA-2025-004".to_string());
        lesson.source = Some("RNC-0042".to_string());

        let yaml = serde_yml::to_string(&lesson).unwrap();
        let parsed: Lesson = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed.display_ref(), "LA-2025-004");
        assert_eq!(parsed.family(), SequenceFamily::Lesson);
        assert_eq!(parsed.status, LessonStatus::Draft);
    }

    #[test]
    fn test_matches() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 14).unwrap();
        let mut lesson = Lesson::new("Primer adhesion".to_string(), date, "qa".to_string());
        lesson.lesson = Some("Humidity above 85% ruins the coat".to_string());
        lesson.tags.push("painting".to_string());

        assert!(lesson.matches("PRIMER"));
        assert!(lesson.matches("humidity"));
        assert!(lesson.matches("painting"));
        assert!(!lesson.matches("welding"));
    }
}
