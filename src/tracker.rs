use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AssignmentEvent, LessonEvent, ProgressSummary};
use crate::progress;
use crate::store::EventStore;

/// Holds the last snapshot fetched for one student. A failed refresh leaves
/// the previous snapshot in place so summaries keep working.
pub struct ProgressTracker<S> {
    store: S,
    student_id: Uuid,
    grade: String,
    lessons: Vec<LessonEvent>,
    assignments: Vec<AssignmentEvent>,
}

impl<S: EventStore> ProgressTracker<S> {
    pub fn new(store: S, student_id: Uuid, grade: impl Into<String>) -> Self {
        Self {
            store,
            student_id,
            grade: grade.into(),
            lessons: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> anyhow::Result<()> {
        let fetched = async {
            let lessons = self.store.list_lesson_events(self.student_id).await?;
            let assignments = self.store.list_assignment_events(self.student_id).await?;
            anyhow::Ok((lessons, assignments))
        }
        .await;

        match fetched {
            Ok((lessons, assignments)) => {
                tracing::debug!(
                    student_id = %self.student_id,
                    lessons = lessons.len(),
                    assignments = assignments.len(),
                    "refreshed progress snapshot"
                );
                self.lessons = lessons;
                self.assignments = assignments;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    student_id = %self.student_id,
                    error = %error,
                    "keeping previous progress snapshot"
                );
                Err(error)
            }
        }
    }

    pub async fn record_lesson(&mut self, event: LessonEvent) -> anyhow::Result<()> {
        let previous = self
            .lessons
            .iter()
            .find(|lesson| lesson.lesson_id == event.lesson_id);
        let event = progress::merge_lesson_attempt(previous, event);
        self.store.upsert_lesson_event(self.student_id, &event).await?;
        self.lessons.retain(|lesson| lesson.lesson_id != event.lesson_id);
        self.lessons.push(event);
        Ok(())
    }

    pub async fn record_assignment(&mut self, event: AssignmentEvent) -> anyhow::Result<()> {
        self.store
            .upsert_assignment_event(self.student_id, &event)
            .await?;
        self.assignments
            .retain(|assignment| assignment.assignment_id != event.assignment_id);
        self.assignments.push(event);
        Ok(())
    }

    pub fn summary(&self, now: DateTime<Utc>) -> ProgressSummary {
        progress::compute_summary(&self.lessons, &self.assignments, &self.grade, now)
    }

    pub fn lessons(&self) -> &[LessonEvent] {
        &self.lessons
    }

    pub fn assignments(&self) -> &[AssignmentEvent] {
        &self.assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{find_game, GameSession};
    use crate::level::Level;
    use crate::models::AssignmentStatus;
    use crate::store::memory::MemoryEventStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
    }

    fn lesson(id: &str, score: u8) -> LessonEvent {
        LessonEvent {
            lesson_id: id.to_string(),
            lesson_title: format!("Algebra {id}"),
            subject: Some("Algebra".to_string()),
            completed: true,
            score: Some(score),
            time_spent_minutes: 15,
            completed_at: Some(now()),
            attempts: 1,
        }
    }

    #[tokio::test]
    async fn refresh_loads_snapshot_from_store() {
        let store = MemoryEventStore::default();
        let student = Uuid::new_v4();
        store.upsert_lesson_event(student, &lesson("l1", 90)).await.unwrap();

        let mut tracker = ProgressTracker::new(store, student, "JHS 1");
        tracker.refresh().await.unwrap();

        let summary = tracker.summary(now());
        assert_eq!(summary.completed_lessons, 1);
        assert_eq!(summary.study_streak_days, 1);
        assert_eq!(summary.subject_progress[0].completed, 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_last_snapshot() {
        let store = MemoryEventStore::default();
        let student = Uuid::new_v4();
        store.upsert_lesson_event(student, &lesson("l1", 90)).await.unwrap();

        let mut tracker = ProgressTracker::new(store, student, "JHS 1");
        tracker.refresh().await.unwrap();

        tracker.store.set_fail_reads(true);
        assert!(tracker.refresh().await.is_err());
        assert_eq!(tracker.lessons().len(), 1);
        assert_eq!(tracker.summary(now()).average_score, 90.0);
    }

    #[tokio::test]
    async fn recording_replaces_local_copy_and_recomputes() {
        let store = MemoryEventStore::default();
        let student = Uuid::new_v4();
        let mut tracker = ProgressTracker::new(store, student, "JHS 1");

        tracker.record_lesson(lesson("l1", 40)).await.unwrap();
        tracker.record_lesson(lesson("l1", 100)).await.unwrap();
        tracker
            .record_assignment(AssignmentEvent {
                assignment_id: "a1".to_string(),
                title: "Linear Equations Practice".to_string(),
                subject: "Algebra".to_string(),
                status: AssignmentStatus::Graded,
                score: Some(85),
                submitted_at: Some(now()),
                graded_at: Some(now()),
                time_spent_minutes: 30,
            })
            .await
            .unwrap();

        assert_eq!(tracker.lessons().len(), 1);
        assert_eq!(tracker.assignments().len(), 1);

        let summary = tracker.summary(now());
        assert_eq!(summary.average_score, 100.0);
        assert_eq!(summary.total_study_time_minutes, 45);
        assert_eq!(summary.recent_activity.len(), 2);
        assert_eq!(summary.current_level, Level::Beginner);
    }

    #[tokio::test]
    async fn lost_replay_does_not_undo_completed_game() {
        let store = MemoryEventStore::default();
        let student = Uuid::new_v4();
        let mut tracker = ProgressTracker::new(store, student, "Primary 1");
        let game = find_game("counting-numbers").unwrap();

        let mut perfect = GameSession::new(game);
        perfect.start();
        for answer in ["3", "5", "7", "4", "6"] {
            perfect.answer(answer).unwrap();
        }
        tracker
            .record_lesson(perfect.lesson_event(now(), 5, 1).unwrap())
            .await
            .unwrap();

        let mut lost = GameSession::new(game);
        lost.start();
        for answer in ["1", "1", "1"] {
            lost.answer(answer).unwrap();
        }
        tracker
            .record_lesson(lost.lesson_event(now(), 3, 2).unwrap())
            .await
            .unwrap();

        let summary = tracker.summary(now());
        assert_eq!(summary.completed_lessons, 1);
        assert_eq!(summary.average_score, 100.0);
        assert_eq!(summary.topics_mastered, vec!["Counting Adventure!".to_string()]);
        assert_eq!(summary.study_streak_days, 1);

        tracker.refresh().await.unwrap();
        let stored = &tracker.lessons()[0];
        assert!(stored.completed);
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.time_spent_minutes, 8);
    }

    #[tokio::test]
    async fn failed_write_leaves_snapshot_untouched() {
        let store = MemoryEventStore::default();
        let student = Uuid::new_v4();
        let mut tracker = ProgressTracker::new(store, student, "JHS 1");
        tracker.record_lesson(lesson("l1", 70)).await.unwrap();

        tracker.store.set_fail_writes(true);
        assert!(tracker.record_lesson(lesson("l1", 20)).await.is_err());
        assert_eq!(tracker.lessons()[0].score, Some(70));
    }
}
