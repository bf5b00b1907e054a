use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AssignmentEvent, ProgressSummary, StudentRecord};
use crate::progress;

pub fn build_report(
    student: &StudentRecord,
    today: NaiveDate,
    summary: &ProgressSummary,
    assignments: &[AssignmentEvent],
) -> String {
    let counts = progress::assignment_status_counts(assignments);
    let achievements = progress::achievements(summary);

    let mut output = String::new();

    let _ = writeln!(output, "# Progress Report: {}", student.full_name);
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        student.email, student.grade, today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Lessons completed: {} of {}",
        summary.completed_lessons, summary.total_lessons
    );
    let _ = writeln!(output, "- Average score: {:.0}%", summary.average_score);
    let _ = writeln!(
        output,
        "- Study time: {} minutes",
        summary.total_study_time_minutes
    );
    let _ = writeln!(output, "- Study streak: {} days", summary.study_streak_days);
    let _ = writeln!(output, "- Weekly goal: {}%", summary.weekly_goal_percent);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Level");
    let _ = writeln!(
        output,
        "{} with {} points ({} unlocks at {} points)",
        summary.current_level,
        summary.current_points,
        summary.next_level,
        summary.points_to_next_level
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    for subject in summary.subject_progress.iter() {
        let _ = writeln!(
            output,
            "- {}: {}% ({} of {} lessons)",
            subject.name, subject.progress, subject.completed, subject.lessons
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Topics");
    write_topics(&mut output, "Mastered", &summary.topics_mastered);
    write_topics(&mut output, "To review", &summary.topics_to_review);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Assignments");
    if assignments.is_empty() {
        let _ = writeln!(output, "No assignments recorded yet.");
    } else {
        let _ = writeln!(
            output,
            "- {} pending, {} submitted, {} graded, {} overdue",
            counts.pending, counts.submitted, counts.graded, counts.overdue
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");
    if summary.recent_activity.is_empty() {
        let _ = writeln!(output, "No recent activity.");
    } else {
        for item in summary.recent_activity.iter() {
            let score = item
                .score
                .map(|score| format!(" ({score}%)"))
                .unwrap_or_default();
            let _ = writeln!(
                output,
                "- {} on {}{}",
                item.title,
                item.timestamp.date_naive(),
                score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Achievements");
    for achievement in achievements.iter() {
        let _ = writeln!(
            output,
            "- {}: {}",
            achievement.title, achievement.description
        );
    }

    output
}

fn write_topics(output: &mut String, label: &str, topics: &[String]) {
    if topics.is_empty() {
        let _ = writeln!(output, "- {label}: none yet");
    } else {
        let _ = writeln!(output, "- {label}: {}", topics.join(", "));
    }
}
