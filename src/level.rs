use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

/// Points required to reach each level, lowest first. The last rung is only
/// ever reported as the next level; points beyond it stay on the rung below.
const LADDER: &[(Level, u32)] = &[
    (Level::Beginner, 0),
    (Level::Intermediate, 100),
    (Level::Advanced, 300),
    (Level::Expert, 600),
    (Level::Master, 1000),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStanding {
    pub current: Level,
    pub next: Level,
    pub next_threshold: u32,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Expert => "Expert",
            Level::Master => "Master",
        }
    }

    pub fn standing(points: u32) -> LevelStanding {
        let awardable = &LADDER[..LADDER.len() - 1];
        let index = awardable
            .iter()
            .rposition(|(_, threshold)| points >= *threshold)
            .unwrap_or(0);
        let (current, _) = LADDER[index];
        let (next, next_threshold) = LADDER[index + 1];

        LevelStanding {
            current,
            next,
            next_threshold,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
