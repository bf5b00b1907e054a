use uuid::Uuid;

use crate::models::{AssignmentEvent, LessonEvent};

/// Persistence for the two per-student event logs. Upserts are keyed by the
/// event's own id and the last write wins.
#[allow(async_fn_in_trait)]
pub trait EventStore {
    async fn list_lesson_events(&self, student_id: Uuid) -> anyhow::Result<Vec<LessonEvent>>;

    async fn list_assignment_events(
        &self,
        student_id: Uuid,
    ) -> anyhow::Result<Vec<AssignmentEvent>>;

    async fn upsert_lesson_event(&self, student_id: Uuid, event: &LessonEvent)
        -> anyhow::Result<()>;

    async fn upsert_assignment_event(
        &self,
        student_id: Uuid,
        event: &AssignmentEvent,
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod memory {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::EventStore;
    use crate::models::{AssignmentEvent, LessonEvent};

    #[derive(Default)]
    struct Logs {
        lessons: BTreeMap<String, LessonEvent>,
        assignments: BTreeMap<String, AssignmentEvent>,
    }

    /// In-process store with switchable failures for exercising callers.
    #[derive(Default)]
    pub struct MemoryEventStore {
        students: Mutex<HashMap<Uuid, Logs>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl MemoryEventStore {
        pub fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn check_reads(&self) -> anyhow::Result<()> {
            if self.fail_reads.load(Ordering::SeqCst) {
                anyhow::bail!("event store unavailable");
            }
            Ok(())
        }

        fn check_writes(&self) -> anyhow::Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                anyhow::bail!("event store rejected write");
            }
            Ok(())
        }
    }

    impl EventStore for MemoryEventStore {
        async fn list_lesson_events(&self, student_id: Uuid) -> anyhow::Result<Vec<LessonEvent>> {
            self.check_reads()?;
            let students = self.students.lock().expect("store lock poisoned");
            Ok(students
                .get(&student_id)
                .map(|logs| logs.lessons.values().cloned().collect())
                .unwrap_or_default())
        }

        async fn list_assignment_events(
            &self,
            student_id: Uuid,
        ) -> anyhow::Result<Vec<AssignmentEvent>> {
            self.check_reads()?;
            let students = self.students.lock().expect("store lock poisoned");
            Ok(students
                .get(&student_id)
                .map(|logs| logs.assignments.values().cloned().collect())
                .unwrap_or_default())
        }

        async fn upsert_lesson_event(
            &self,
            student_id: Uuid,
            event: &LessonEvent,
        ) -> anyhow::Result<()> {
            self.check_writes()?;
            let mut students = self.students.lock().expect("store lock poisoned");
            students
                .entry(student_id)
                .or_default()
                .lessons
                .insert(event.lesson_id.clone(), event.clone());
            Ok(())
        }

        async fn upsert_assignment_event(
            &self,
            student_id: Uuid,
            event: &AssignmentEvent,
        ) -> anyhow::Result<()> {
            self.check_writes()?;
            let mut students = self.students.lock().expect("store lock poisoned");
            students
                .entry(student_id)
                .or_default()
                .assignments
                .insert(event.assignment_id.clone(), event.clone());
            Ok(())
        }
    }

    mod tests {
        use super::*;
        use crate::models::AssignmentStatus;

        fn lesson(id: &str, score: Option<u8>) -> LessonEvent {
            LessonEvent {
                lesson_id: id.to_string(),
                lesson_title: format!("Lesson {id}"),
                subject: None,
                completed: score.is_some(),
                score,
                time_spent_minutes: 5,
                completed_at: None,
                attempts: 1,
            }
        }

        #[tokio::test]
        async fn upserts_replace_by_id() {
            let store = MemoryEventStore::default();
            let student = Uuid::new_v4();

            store.upsert_lesson_event(student, &lesson("l1", None)).await.unwrap();
            store
                .upsert_lesson_event(student, &lesson("l1", Some(85)))
                .await
                .unwrap();
            store.upsert_lesson_event(student, &lesson("l2", None)).await.unwrap();

            let lessons = store.list_lesson_events(student).await.unwrap();
            assert_eq!(lessons.len(), 2);
            assert_eq!(lessons[0].score, Some(85));
        }

        #[tokio::test]
        async fn students_are_isolated() {
            let store = MemoryEventStore::default();
            let first = Uuid::new_v4();
            let second = Uuid::new_v4();
            let assignment = AssignmentEvent {
                assignment_id: "a1".to_string(),
                title: "Fractions Test".to_string(),
                subject: "Number Theory".to_string(),
                status: AssignmentStatus::Pending,
                score: None,
                submitted_at: None,
                graded_at: None,
                time_spent_minutes: 0,
            };

            store.upsert_assignment_event(first, &assignment).await.unwrap();

            assert_eq!(store.list_assignment_events(first).await.unwrap().len(), 1);
            assert!(store.list_assignment_events(second).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn failures_surface_as_errors() {
            let store = MemoryEventStore::default();
            store.set_fail_reads(true);
            assert!(store.list_lesson_events(Uuid::new_v4()).await.is_err());

            store.set_fail_writes(true);
            assert!(store
                .upsert_lesson_event(Uuid::new_v4(), &lesson("l1", None))
                .await
                .is_err());
        }
    }
}
