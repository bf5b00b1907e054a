use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AssignmentEvent, AssignmentStatus, LessonEvent, StudentRecord, MAX_SCORE};
use crate::store::EventStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventStore for PgEventStore {
    async fn list_lesson_events(&self, student_id: Uuid) -> anyhow::Result<Vec<LessonEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT lesson_id, lesson_title, subject, completed, score,
                   time_spent_minutes, completed_at, attempts
            FROM student_progress.lesson_events
            WHERE student_id = $1
            ORDER BY lesson_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load lesson events")?;

        rows.iter().map(lesson_from_row).collect()
    }

    async fn list_assignment_events(
        &self,
        student_id: Uuid,
    ) -> anyhow::Result<Vec<AssignmentEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT assignment_id, title, subject, status, score,
                   submitted_at, graded_at, time_spent_minutes
            FROM student_progress.assignment_events
            WHERE student_id = $1
            ORDER BY assignment_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load assignment events")?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn upsert_lesson_event(
        &self,
        student_id: Uuid,
        event: &LessonEvent,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO student_progress.lesson_events
            (student_id, lesson_id, lesson_title, subject, completed, score,
             time_spent_minutes, completed_at, attempts, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (student_id, lesson_id) DO UPDATE
            SET lesson_title = EXCLUDED.lesson_title,
                subject = EXCLUDED.subject,
                completed = EXCLUDED.completed,
                score = EXCLUDED.score,
                time_spent_minutes = EXCLUDED.time_spent_minutes,
                completed_at = EXCLUDED.completed_at,
                attempts = EXCLUDED.attempts,
                updated_at = now()
            "#,
        )
        .bind(student_id)
        .bind(&event.lesson_id)
        .bind(&event.lesson_title)
        .bind(event.subject.as_deref())
        .bind(event.completed)
        .bind(event.score.map(i32::from))
        .bind(i32::try_from(event.time_spent_minutes)?)
        .bind(event.completed_at)
        .bind(i32::try_from(event.attempts.max(1))?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store lesson event {}", event.lesson_id))?;

        Ok(())
    }

    async fn upsert_assignment_event(
        &self,
        student_id: Uuid,
        event: &AssignmentEvent,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO student_progress.assignment_events
            (student_id, assignment_id, title, subject, status, score,
             submitted_at, graded_at, time_spent_minutes, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (student_id, assignment_id) DO UPDATE
            SET title = EXCLUDED.title,
                subject = EXCLUDED.subject,
                status = EXCLUDED.status,
                score = EXCLUDED.score,
                submitted_at = EXCLUDED.submitted_at,
                graded_at = EXCLUDED.graded_at,
                time_spent_minutes = EXCLUDED.time_spent_minutes,
                updated_at = now()
            "#,
        )
        .bind(student_id)
        .bind(&event.assignment_id)
        .bind(&event.title)
        .bind(&event.subject)
        .bind(event.status.as_str())
        .bind(event.score.map(i32::from))
        .bind(event.submitted_at)
        .bind(event.graded_at)
        .bind(i32::try_from(event.time_spent_minutes)?)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store assignment event {}", event.assignment_id))?;

        Ok(())
    }
}

fn lesson_from_row(row: &PgRow) -> anyhow::Result<LessonEvent> {
    Ok(LessonEvent {
        lesson_id: row.try_get("lesson_id")?,
        lesson_title: row.try_get("lesson_title")?,
        subject: row.try_get("subject")?,
        completed: row.try_get("completed")?,
        score: score_from_column(row.try_get("score")?)?,
        time_spent_minutes: u32::try_from(row.try_get::<i32, _>("time_spent_minutes")?)?,
        completed_at: row.try_get("completed_at")?,
        attempts: u32::try_from(row.try_get::<i32, _>("attempts")?)?,
    })
}

fn assignment_from_row(row: &PgRow) -> anyhow::Result<AssignmentEvent> {
    let status: String = row.try_get("status")?;
    Ok(AssignmentEvent {
        assignment_id: row.try_get("assignment_id")?,
        title: row.try_get("title")?,
        subject: row.try_get("subject")?,
        status: status.parse()?,
        score: score_from_column(row.try_get("score")?)?,
        submitted_at: row.try_get("submitted_at")?,
        graded_at: row.try_get("graded_at")?,
        time_spent_minutes: u32::try_from(row.try_get::<i32, _>("time_spent_minutes")?)?,
    })
}

fn score_from_column(score: Option<i32>) -> anyhow::Result<Option<u8>> {
    score
        .map(|value| {
            u8::try_from(value)
                .ok()
                .filter(|score| *score <= MAX_SCORE)
                .with_context(|| format!("score {value} is outside 0-100"))
        })
        .transpose()
}

pub async fn upsert_student(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    grade: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO student_progress.students (id, full_name, email, grade)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, grade = EXCLUDED.grade
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(grade)
    .fetch_one(pool)
    .await?
    .try_get("id")?;

    Ok(id)
}

pub async fn find_student(pool: &PgPool, email: &str) -> anyhow::Result<StudentRecord> {
    let row = sqlx::query(
        "SELECT id, full_name, email, grade FROM student_progress.students WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no student registered with email {email}"))?;

    Ok(StudentRecord {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        grade: row.try_get("grade")?,
    })
}

pub async fn seed(pool: &PgPool, now: DateTime<Utc>) -> anyhow::Result<()> {
    let store = PgEventStore::new(pool.clone());
    let days_ago = |days: i64| Some(now - Duration::days(days));

    let ama = upsert_student(pool, "Ama Mensah", "ama.mensah@edumath.gh", "Primary 2").await?;
    let kwame = upsert_student(pool, "Kwame Asante", "kwame.asante@edumath.gh", "JHS 1").await?;
    let efua = upsert_student(pool, "Efua Owusu", "efua.owusu@edumath.gh", "SHS 2").await?;

    let lessons = vec![
        (
            ama,
            "counting-numbers",
            "Counting Adventure!",
            Some("Counting & Numbers"),
            true,
            Some(100),
            6,
            days_ago(0),
            1,
        ),
        (
            ama,
            "shapes-colors",
            "Shape Detective!",
            Some("Basic Shapes"),
            true,
            Some(60),
            5,
            days_ago(1),
            2,
        ),
        (
            ama,
            "addition-basics",
            "Addition Magic!",
            Some("Simple Addition"),
            false,
            None,
            3,
            None,
            1,
        ),
        (
            kwame,
            "jhs-algebra-1",
            "Algebra: Linear Expressions",
            None,
            true,
            Some(85),
            25,
            days_ago(0),
            1,
        ),
        (
            kwame,
            "jhs-algebra-2",
            "Algebra: Solving Equations",
            None,
            true,
            Some(72),
            30,
            days_ago(1),
            1,
        ),
        (
            kwame,
            "jhs-geometry-1",
            "Geometry: Angles on a Line",
            None,
            true,
            Some(55),
            20,
            days_ago(2),
            3,
        ),
        (
            kwame,
            "jhs-statistics-1",
            "Statistics: Mean and Mode",
            None,
            false,
            Some(40),
            15,
            None,
            1,
        ),
        (
            efua,
            "shs-calculus-1",
            "Calculus: Limits",
            Some("Calculus"),
            true,
            Some(91),
            40,
            days_ago(3),
            1,
        ),
        (
            efua,
            "shs-trig-1",
            "Trigonometry: Ratios",
            Some("Trigonometry"),
            true,
            Some(48),
            35,
            days_ago(5),
            2,
        ),
    ];

    for (student, id, title, subject, completed, score, minutes, completed_at, attempts) in lessons
    {
        let event = LessonEvent {
            lesson_id: id.to_string(),
            lesson_title: title.to_string(),
            subject: subject.map(str::to_string),
            completed,
            score,
            time_spent_minutes: minutes,
            completed_at,
            attempts,
        };
        store.upsert_lesson_event(student, &event).await?;
    }

    let assignments = vec![
        (
            kwame,
            "jhs-a1",
            "Linear Equations Practice",
            "Algebra",
            AssignmentStatus::Pending,
            None,
            None,
            None,
            0,
        ),
        (
            kwame,
            "jhs-a2",
            "Geometry Angles Quiz",
            "Geometry",
            AssignmentStatus::Submitted,
            None,
            days_ago(1),
            None,
            35,
        ),
        (
            kwame,
            "jhs-a3",
            "Fractions Test",
            "Number Theory",
            AssignmentStatus::Graded,
            Some(85),
            days_ago(4),
            days_ago(3),
            40,
        ),
        (
            kwame,
            "jhs-a4",
            "Word Problems Set",
            "Algebra",
            AssignmentStatus::Overdue,
            None,
            None,
            None,
            0,
        ),
        (
            efua,
            "shs-a1",
            "Derivatives Worksheet",
            "Calculus",
            AssignmentStatus::Graded,
            Some(78),
            days_ago(2),
            days_ago(1),
            50,
        ),
    ];

    for (student, id, title, subject, status, score, submitted_at, graded_at, minutes) in assignments
    {
        let event = AssignmentEvent {
            assignment_id: id.to_string(),
            title: title.to_string(),
            subject: subject.to_string(),
            status,
            score,
            submitted_at,
            graded_at,
            time_spent_minutes: minutes,
        };
        store.upsert_assignment_event(student, &event).await?;
    }

    Ok(())
}

#[derive(serde::Deserialize)]
struct LessonCsvRow {
    full_name: String,
    email: String,
    grade: String,
    lesson_id: String,
    lesson_title: String,
    subject: Option<String>,
    completed: bool,
    score: Option<u8>,
    time_spent_minutes: u32,
    completed_at: Option<DateTime<Utc>>,
    attempts: Option<u32>,
}

#[derive(serde::Deserialize)]
struct AssignmentCsvRow {
    full_name: String,
    email: String,
    grade: String,
    assignment_id: String,
    title: String,
    subject: String,
    status: AssignmentStatus,
    score: Option<u8>,
    submitted_at: Option<DateTime<Utc>>,
    graded_at: Option<DateTime<Utc>>,
    time_spent_minutes: u32,
}

fn check_score(score: Option<u8>, line: usize) -> anyhow::Result<()> {
    if let Some(value) = score {
        anyhow::ensure!(value <= MAX_SCORE, "row {line}: score {value} is outside 0-100");
    }
    Ok(())
}

pub async fn import_lessons_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let store = PgEventStore::new(pool.clone());
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for (index, result) in reader.deserialize::<LessonCsvRow>().enumerate() {
        let row = result.with_context(|| format!("row {}: malformed lesson record", index + 1))?;
        check_score(row.score, index + 1)?;

        let student_id = upsert_student(pool, &row.full_name, &row.email, &row.grade).await?;
        let subject = row.subject.filter(|subject| !subject.trim().is_empty());
        let event = LessonEvent {
            lesson_id: row.lesson_id,
            lesson_title: row.lesson_title,
            subject,
            completed: row.completed,
            score: row.score,
            time_spent_minutes: row.time_spent_minutes,
            completed_at: row.completed_at.filter(|_| row.completed),
            attempts: row.attempts.unwrap_or(1).max(1),
        };
        store.upsert_lesson_event(student_id, &event).await?;
        imported += 1;
    }

    tracing::info!(imported, path = %csv_path.display(), "imported lesson events");
    Ok(imported)
}

pub async fn import_assignments_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let store = PgEventStore::new(pool.clone());
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for (index, result) in reader.deserialize::<AssignmentCsvRow>().enumerate() {
        let row =
            result.with_context(|| format!("row {}: malformed assignment record", index + 1))?;
        check_score(row.score, index + 1)?;

        let student_id = upsert_student(pool, &row.full_name, &row.email, &row.grade).await?;
        let event = AssignmentEvent {
            assignment_id: row.assignment_id,
            title: row.title,
            subject: row.subject,
            status: row.status,
            score: row.score,
            submitted_at: row.submitted_at,
            graded_at: row.graded_at,
            time_spent_minutes: row.time_spent_minutes,
        };
        store.upsert_assignment_event(student_id, &event).await?;
        imported += 1;
    }

    tracing::info!(imported, path = %csv_path.display(), "imported assignment events");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_outside_range_are_rejected() {
        assert_eq!(score_from_column(None).unwrap(), None);
        assert_eq!(score_from_column(Some(80)).unwrap(), Some(80));
        assert!(score_from_column(Some(101)).is_err());
        assert!(score_from_column(Some(-4)).is_err());
        assert!(check_score(Some(120), 3).is_err());
        assert!(check_score(Some(100), 3).is_ok());
    }

    #[test]
    fn lesson_rows_parse_optional_columns() {
        let data = "\
full_name,email,grade,lesson_id,lesson_title,subject,completed,score,time_spent_minutes,completed_at,attempts
Kwame Asante,kwame@edumath.gh,JHS 1,l1,Algebra Basics,Algebra,true,88,20,2026-03-02T10:00:00Z,2
Kwame Asante,kwame@edumath.gh,JHS 1,l2,Geometry Angles,,false,,5,,
";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<LessonCsvRow> = reader
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].score, Some(88));
        assert!(rows[0].completed_at.is_some());
        assert_eq!(rows[1].score, None);
        assert_eq!(rows[1].completed_at, None);
        assert_eq!(rows[1].attempts, None);
    }

    #[test]
    fn assignment_rows_reject_unknown_status() {
        let data = "\
full_name,email,grade,assignment_id,title,subject,status,score,submitted_at,graded_at,time_spent_minutes
Efua Owusu,efua@edumath.gh,SHS 2,a1,Derivatives,Calculus,archived,,,,10
";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let parsed: Result<Vec<AssignmentCsvRow>, _> = reader.deserialize().collect();
        assert!(parsed.is_err());
    }
}
