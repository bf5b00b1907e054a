use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::Level;

pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonEvent {
    pub lesson_id: String,
    pub lesson_title: String,
    /// Controlled-vocabulary subject; legacy records leave it empty.
    #[serde(default)]
    pub subject: Option<String>,
    pub completed: bool,
    #[serde(default)]
    pub score: Option<u8>,
    pub time_spent_minutes: u32,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

impl LessonEvent {
    /// Score clamped into the 0-100 range, if the lesson was graded.
    pub fn graded_score(&self) -> Option<u8> {
        self.score.map(|score| score.min(MAX_SCORE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Submitted,
    Graded,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Submitted => "submitted",
            AssignmentStatus::Graded => "graded",
            AssignmentStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AssignmentStatus::Pending),
            "submitted" => Ok(AssignmentStatus::Submitted),
            "graded" => Ok(AssignmentStatus::Graded),
            "overdue" => Ok(AssignmentStatus::Overdue),
            other => anyhow::bail!("unknown assignment status '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    pub assignment_id: String,
    pub title: String,
    pub subject: String,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
    pub time_spent_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Lesson,
    Assignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub kind: ActivityKind,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub name: String,
    pub progress: u32,
    pub lessons: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_lessons: u32,
    pub completed_lessons: u32,
    pub average_score: f64,
    pub total_study_time_minutes: u64,
    pub study_streak_days: u32,
    pub weekly_goal_percent: u32,
    pub current_level: Level,
    pub next_level: Level,
    pub current_points: u32,
    pub points_to_next_level: u32,
    pub topics_mastered: Vec<String>,
    pub topics_to_review: Vec<String>,
    pub recent_activity: Vec<ActivityItem>,
    pub subject_progress: Vec<SubjectProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    Milestone,
    Streak,
    Learning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub title: String,
    pub description: String,
    pub kind: AchievementKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStatusCounts {
    pub pending: usize,
    pub submitted: usize,
    pub graded: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: uuid::Uuid,
    pub full_name: String,
    pub email: String,
    pub grade: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_parsing_is_closed() {
        assert_eq!(
            "Graded".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Graded
        );
        assert_eq!(
            " overdue ".parse::<AssignmentStatus>().unwrap(),
            AssignmentStatus::Overdue
        );
        assert!("archived".parse::<AssignmentStatus>().is_err());
    }

    #[test]
    fn graded_score_clamps_out_of_range_values() {
        let lesson = LessonEvent {
            lesson_id: "l1".to_string(),
            lesson_title: "Algebra Basics".to_string(),
            subject: None,
            completed: true,
            score: Some(140),
            time_spent_minutes: 10,
            completed_at: None,
            attempts: 1,
        };
        assert_eq!(lesson.graded_score(), Some(100));
    }

    #[test]
    fn lesson_serializes_with_camel_case_and_iso_timestamps() {
        let lesson = LessonEvent {
            lesson_id: "l1".to_string(),
            lesson_title: "Algebra Basics".to_string(),
            subject: Some("Algebra".to_string()),
            completed: true,
            score: Some(90),
            time_spent_minutes: 12,
            completed_at: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()),
            attempts: 2,
        };

        let value = serde_json::to_value(&lesson).unwrap();
        assert_eq!(value["lessonId"], "l1");
        assert_eq!(value["timeSpentMinutes"], 12);
        assert_eq!(value["completedAt"], "2026-03-02T09:30:00Z");

        let parsed: LessonEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, lesson);
    }
}
