use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::curriculum::GradeBand;
use crate::level::Level;
use crate::models::{
    Achievement, AchievementKind, ActivityItem, ActivityKind, AssignmentEvent, AssignmentStatus,
    AssignmentStatusCounts, LessonEvent, ProgressSummary, SubjectProgress, MAX_SCORE,
};

pub const RECENT_ACTIVITY_LIMIT: usize = 5;
pub const MASTERY_SCORE: u8 = 80;
pub const REVIEW_SCORE: u8 = 60;
const POINTS_PER_LESSON: u32 = 20;
const POINTS_PER_SCORE_BAND: u32 = 5;
const STREAK_ACHIEVEMENT_DAYS: u32 = 3;

pub fn compute_summary(
    lessons: &[LessonEvent],
    assignments: &[AssignmentEvent],
    grade: &str,
    now: DateTime<Utc>,
) -> ProgressSummary {
    let completed_lessons = lessons.iter().filter(|lesson| lesson.completed).count() as u32;
    let total_lessons = (lessons.len() as u32).max(1);
    let average_score = average_score(lessons);

    let total_study_time_minutes = lessons
        .iter()
        .map(|lesson| u64::from(lesson.time_spent_minutes))
        .chain(
            assignments
                .iter()
                .map(|assignment| u64::from(assignment.time_spent_minutes)),
        )
        .sum();

    let current_points = level_points(completed_lessons, average_score);
    let standing = Level::standing(current_points);

    ProgressSummary {
        total_lessons,
        completed_lessons,
        average_score,
        total_study_time_minutes,
        study_streak_days: study_streak(lessons, now.date_naive()),
        weekly_goal_percent: percent(completed_lessons, total_lessons),
        current_level: standing.current,
        next_level: standing.next,
        current_points,
        points_to_next_level: standing.next_threshold,
        topics_mastered: completed_titles(lessons, |score| score >= MASTERY_SCORE),
        topics_to_review: completed_titles(lessons, |score| score < REVIEW_SCORE),
        recent_activity: recent_activity(lessons, assignments),
        subject_progress: subject_progress(lessons, GradeBand::from_grade(grade)),
    }
}

/// Unrounded mean over graded lessons; ungraded lessons do not count as zero.
pub fn average_score(lessons: &[LessonEvent]) -> f64 {
    let (total, count) = lessons
        .iter()
        .filter_map(LessonEvent::graded_score)
        .fold((0u64, 0u64), |(total, count), score| {
            (total + u64::from(score), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

pub fn level_points(completed_lessons: u32, average_score: f64) -> u32 {
    let score_bands = (average_score / 10.0).floor().max(0.0) as u32;
    completed_lessons * POINTS_PER_LESSON + score_bands * POINTS_PER_SCORE_BAND
}

/// Consecutive UTC days ending `today` with at least one completed lesson.
/// Several completions on the same day fill a single slot, and completions
/// dated after `today` are ignored.
pub fn study_streak(lessons: &[LessonEvent], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = lessons
        .iter()
        .filter(|lesson| lesson.completed)
        .filter_map(|lesson| lesson.completed_at)
        .map(|completed_at| completed_at.date_naive())
        .filter(|day| *day <= today)
        .collect();

    let mut streak = 0u32;
    for (index, day) in days.iter().rev().enumerate() {
        if (today - *day).num_days() != index as i64 {
            break;
        }
        streak += 1;
    }
    streak
}

fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}

fn completed_titles(lessons: &[LessonEvent], keep: impl Fn(u8) -> bool) -> Vec<String> {
    lessons
        .iter()
        .filter(|lesson| lesson.completed)
        .filter(|lesson| lesson.graded_score().is_some_and(&keep))
        .map(|lesson| lesson.lesson_title.clone())
        .collect()
}

/// An unfinished attempt on a lesson that was already completed keeps the
/// completion and the best score; only the attempt count and time move on.
pub fn merge_lesson_attempt(previous: Option<&LessonEvent>, attempt: LessonEvent) -> LessonEvent {
    match previous {
        Some(previous) if previous.completed && !attempt.completed => LessonEvent {
            completed: true,
            completed_at: previous.completed_at,
            score: previous.score.max(attempt.score),
            time_spent_minutes: previous
                .time_spent_minutes
                .saturating_add(attempt.time_spent_minutes),
            attempts: attempt.attempts.max(previous.attempts),
            ..attempt
        },
        _ => attempt,
    }
}

pub fn recent_activity(
    lessons: &[LessonEvent],
    assignments: &[AssignmentEvent],
) -> Vec<ActivityItem> {
    let lesson_items = lessons
        .iter()
        .filter(|lesson| lesson.completed)
        .filter_map(|lesson| {
            lesson.completed_at.map(|timestamp| ActivityItem {
                id: lesson.lesson_id.clone(),
                kind: ActivityKind::Lesson,
                title: format!("Completed: {}", lesson.lesson_title),
                timestamp,
                score: lesson.graded_score(),
            })
        });

    let assignment_items = assignments
        .iter()
        .filter(|assignment| assignment.status == AssignmentStatus::Graded)
        .filter_map(|assignment| {
            assignment.graded_at.map(|timestamp| ActivityItem {
                id: assignment.assignment_id.clone(),
                kind: ActivityKind::Assignment,
                title: format!("Assignment: {}", assignment.title),
                timestamp,
                score: assignment.score.map(|score| score.min(MAX_SCORE)),
            })
        });

    let mut items: Vec<ActivityItem> = lesson_items.chain(assignment_items).collect();
    items.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
    items.truncate(RECENT_ACTIVITY_LIMIT);
    items
}

pub fn subject_progress(lessons: &[LessonEvent], band: GradeBand) -> Vec<SubjectProgress> {
    band.subjects()
        .iter()
        .map(|subject| {
            let completed = lessons
                .iter()
                .filter(|lesson| lesson.completed && subject.covers(lesson))
                .count() as u32;

            SubjectProgress {
                name: subject.name.to_string(),
                progress: percent(completed, subject.lessons).min(100),
                lessons: subject.lessons,
                completed,
            }
        })
        .collect()
}

pub fn achievements(summary: &ProgressSummary) -> Vec<Achievement> {
    let mut earned = vec![Achievement {
        title: "Welcome to EduMath GH!".to_string(),
        description: "Started your mathematics journey".to_string(),
        kind: AchievementKind::Milestone,
    }];

    if summary.study_streak_days >= STREAK_ACHIEVEMENT_DAYS {
        earned.push(Achievement {
            title: "Study Streak Master!".to_string(),
            description: format!("{} days in a row", summary.study_streak_days),
            kind: AchievementKind::Streak,
        });
    }

    if !summary.topics_mastered.is_empty() {
        earned.push(Achievement {
            title: "First Topic Mastered!".to_string(),
            description: "Scored 80 or above on a completed lesson".to_string(),
            kind: AchievementKind::Learning,
        });
    }

    earned
}

pub fn assignment_status_counts(assignments: &[AssignmentEvent]) -> AssignmentStatusCounts {
    let mut counts = AssignmentStatusCounts::default();
    for assignment in assignments {
        match assignment.status {
            AssignmentStatus::Pending => counts.pending += 1,
            AssignmentStatus::Submitted => counts.submitted += 1,
            AssignmentStatus::Graded => counts.graded += 1,
            AssignmentStatus::Overdue => counts.overdue += 1,
        }
    }
    counts
}
