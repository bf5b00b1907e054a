use crate::models::LessonEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    Primary,
    Jhs,
    Shs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub name: &'static str,
    pub lessons: u32,
}

const PRIMARY_SUBJECTS: [Subject; 4] = [
    Subject {
        name: "Counting & Numbers",
        lessons: 8,
    },
    Subject {
        name: "Basic Shapes",
        lessons: 6,
    },
    Subject {
        name: "Simple Addition",
        lessons: 10,
    },
    Subject {
        name: "Money & Time",
        lessons: 7,
    },
];

const JHS_SUBJECTS: [Subject; 4] = [
    Subject {
        name: "Algebra",
        lessons: 15,
    },
    Subject {
        name: "Geometry",
        lessons: 12,
    },
    Subject {
        name: "Statistics",
        lessons: 8,
    },
    Subject {
        name: "Number Theory",
        lessons: 10,
    },
];

const SHS_SUBJECTS: [Subject; 4] = [
    Subject {
        name: "Advanced Algebra",
        lessons: 20,
    },
    Subject {
        name: "Calculus",
        lessons: 18,
    },
    Subject {
        name: "Trigonometry",
        lessons: 15,
    },
    Subject {
        name: "Statistics",
        lessons: 12,
    },
];

impl GradeBand {
    /// Grades such as "Primary 2" or "Basic 4" fall in the primary band,
    /// "JHS 1" in the junior band; anything unrecognised is treated as senior.
    pub fn from_grade(grade: &str) -> Self {
        let grade = grade.to_lowercase();
        if grade.contains("primary") || grade.contains("basic") {
            GradeBand::Primary
        } else if grade.contains("jhs") {
            GradeBand::Jhs
        } else {
            GradeBand::Shs
        }
    }

    pub fn subjects(self) -> &'static [Subject] {
        match self {
            GradeBand::Primary => &PRIMARY_SUBJECTS,
            GradeBand::Jhs => &JHS_SUBJECTS,
            GradeBand::Shs => &SHS_SUBJECTS,
        }
    }
}

impl Subject {
    /// Explicit subjects match by name. Legacy records without one fall back
    /// to looking for the subject's first word inside the lesson title.
    pub fn covers(&self, lesson: &LessonEvent) -> bool {
        match lesson.subject.as_deref() {
            Some(subject) => subject.trim().eq_ignore_ascii_case(self.name),
            None => {
                let keyword = self
                    .name
                    .split_whitespace()
                    .next()
                    .unwrap_or(self.name)
                    .to_lowercase();
                lesson.lesson_title.to_lowercase().contains(&keyword)
            }
        }
    }
}
