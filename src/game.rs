//! Lesson games for primary learners: five short rounds, three lives and a
//! star rating at the end.

use chrono::{DateTime, Utc};

use crate::models::LessonEvent;

pub const STARTING_LIVES: u8 = 3;
pub const POINTS_PER_ROUND: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    Counting {
        items: &'static str,
        objects: u32,
        question: &'static str,
    },
    Arithmetic {
        answer: i64,
        story: &'static str,
    },
    Shape {
        shape: &'static str,
        options: [&'static str; 3],
        answer: &'static str,
    },
}

#[derive(Debug)]
pub struct Game {
    pub lesson_id: &'static str,
    pub title: &'static str,
    pub rounds: [Round; 5],
}

const fn counting(items: &'static str, objects: u32, question: &'static str) -> Round {
    Round::Counting {
        items,
        objects,
        question,
    }
}

const fn sum(left: i64, right: i64, story: &'static str) -> Round {
    Round::Arithmetic {
        answer: left + right,
        story,
    }
}

const fn difference(left: i64, right: i64, story: &'static str) -> Round {
    Round::Arithmetic {
        answer: left - right,
        story,
    }
}

const BASIC_SHAPES: [&str; 3] = ["Circle", "Square", "Triangle"];
const FANCY_SHAPES: [&str; 3] = ["Star", "Heart", "Diamond"];

const fn shape(shape: &'static str, options: [&'static str; 3], answer: &'static str) -> Round {
    Round::Shape {
        shape,
        options,
        answer,
    }
}

pub static CATALOG: [Game; 4] = [
    Game {
        lesson_id: "counting-numbers",
        title: "Counting Adventure!",
        rounds: [
            counting("🍎", 3, "How many apples does Ama have?"),
            counting("⚽", 5, "Count the footballs in the field!"),
            counting("🌟", 7, "How many stars can you see?"),
            counting("🚗", 4, "Count the cars on the road!"),
            counting("🎈", 6, "How many balloons are there?"),
        ],
    },
    Game {
        lesson_id: "addition-basics",
        title: "Addition Magic!",
        rounds: [
            sum(
                2,
                1,
                "Kwame has 2 oranges. His sister gives him 1 more. How many does he have now?",
            ),
            sum(
                3,
                2,
                "There are 3 birds in a tree. 2 more birds join them. How many birds in total?",
            ),
            sum(
                4,
                3,
                "Ama bought 4 pencils. Her friend gave her 3 more. How many pencils does she have?",
            ),
            sum(
                5,
                2,
                "In the classroom, there are 5 boys and 2 girls. How many children in total?",
            ),
            sum(
                6,
                4,
                "Kofi saved 6 cedis. His father gave him 4 more. How much money does he have?",
            ),
        ],
    },
    Game {
        lesson_id: "subtraction-basics",
        title: "Subtraction Safari!",
        rounds: [
            difference(5, 2, "There were 5 mangoes on the tree. 2 fell down. How many are left?"),
            difference(
                7,
                3,
                "Ama had 7 stickers. She gave 3 to her friend. How many does she have left?",
            ),
            difference(
                8,
                5,
                "There were 8 chickens in the yard. 5 went inside. How many are still outside?",
            ),
            difference(
                6,
                4,
                "Kwame had 6 marbles. He lost 4 while playing. How many marbles does he have now?",
            ),
            difference(
                9,
                6,
                "There were 9 students in class. 6 went home early. How many students are left?",
            ),
        ],
    },
    Game {
        lesson_id: "shapes-colors",
        title: "Shape Detective!",
        rounds: [
            shape("🔴", BASIC_SHAPES, "Circle"),
            shape("🟦", BASIC_SHAPES, "Square"),
            shape("🔺", BASIC_SHAPES, "Triangle"),
            shape("⭐", FANCY_SHAPES, "Star"),
            shape("💎", FANCY_SHAPES, "Diamond"),
        ],
    },
];

pub fn find_game(lesson_id: &str) -> Option<&'static Game> {
    CATALOG.iter().find(|game| game.lesson_id == lesson_id)
}

impl Round {
    pub fn prompt(&self) -> String {
        match self {
            Round::Counting {
                items,
                objects,
                question,
            } => format!("{question} {}", items.repeat(*objects as usize)),
            Round::Arithmetic { story, .. } => story.to_string(),
            Round::Shape { shape, options, .. } => {
                format!("What shape is this? {shape} ({})", options.join(" / "))
            }
        }
    }

    /// Numeric rounds compare the parsed number; shape rounds compare the
    /// option name, ignoring case and surrounding whitespace.
    pub fn accepts(&self, answer: &str) -> bool {
        let answer = answer.trim();
        match self {
            Round::Counting { objects, .. } => answer.parse::<u32>().ok() == Some(*objects),
            Round::Arithmetic { answer: expected, .. } => {
                answer.parse::<i64>().ok() == Some(*expected)
            }
            Round::Shape {
                answer: expected, ..
            } => answer.eq_ignore_ascii_case(expected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Ready,
    Playing,
    Completed,
    OutOfLives,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    pub score: u8,
    pub lives: u8,
    pub state: GameState,
}

#[derive(Debug)]
pub struct GameSession {
    game: &'static Game,
    round: usize,
    score: u8,
    lives: u8,
    state: GameState,
}

impl GameSession {
    pub fn new(game: &'static Game) -> Self {
        Self {
            game,
            round: 0,
            score: 0,
            lives: STARTING_LIVES,
            state: GameState::Ready,
        }
    }

    pub fn start(&mut self) {
        if self.state == GameState::Ready {
            self.state = GameState::Playing;
        }
    }

    pub fn current_round(&self) -> Option<&Round> {
        match self.state {
            GameState::Playing => self.game.rounds.get(self.round),
            _ => None,
        }
    }

    pub fn answer(&mut self, answer: &str) -> anyhow::Result<Feedback> {
        let Some(round) = self.current_round() else {
            anyhow::bail!("game '{}' is not in progress", self.game.lesson_id);
        };

        let correct = round.accepts(answer);
        if correct {
            self.score += POINTS_PER_ROUND;
        } else {
            self.lives = self.lives.saturating_sub(1);
        }

        if !correct && self.lives == 0 {
            self.state = GameState::OutOfLives;
        } else if self.round + 1 < self.game.rounds.len() {
            self.round += 1;
        } else {
            self.state = GameState::Completed;
        }

        Ok(Feedback {
            correct,
            score: self.score,
            lives: self.lives,
            state: self.state,
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn stars(&self) -> u8 {
        stars_for(self.score)
    }

    /// Lesson record for a finished session; `None` while it is still running.
    pub fn lesson_event(
        &self,
        finished_at: DateTime<Utc>,
        time_spent_minutes: u32,
        attempts: u32,
    ) -> Option<LessonEvent> {
        let completed = match self.state {
            GameState::Completed => true,
            GameState::OutOfLives => false,
            GameState::Ready | GameState::Playing => return None,
        };

        Some(LessonEvent {
            lesson_id: self.game.lesson_id.to_string(),
            lesson_title: self.game.title.to_string(),
            subject: None,
            completed,
            score: Some(self.score),
            time_spent_minutes,
            completed_at: completed.then_some(finished_at),
            attempts,
        })
    }
}

pub fn stars_for(score: u8) -> u8 {
    match score {
        80..=u8::MAX => 3,
        60..=79 => 2,
        40..=59 => 1,
        _ => 0,
    }
}
