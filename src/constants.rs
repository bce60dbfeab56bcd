//! Configuration constants for the trivia game system
//!
//! This module contains the tuning values and limits used throughout
//! the game so that timing, scoring, and size boundaries live in one
//! place instead of being scattered across components.

/// Session-wide limits
pub mod session {
    /// Maximum number of participants in a single game session
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Capacity of the event queue feeding the game task
    pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
}

/// Round timing and scoring constants
pub mod round {
    use std::time::Duration;

    /// How long the answer window stays open for each question
    pub const ANSWER_WINDOW: Duration = Duration::from_secs(15);
    /// Pause between the reveal and the next question
    pub const REVEAL_PAUSE: Duration = Duration::from_secs(5);
    /// Points awarded for a correct answer
    pub const POINTS_PER_CORRECT: u64 = 10;
}

/// Question bank limits
pub mod bank {
    /// Maximum length of a category name in characters
    pub const MAX_CATEGORY_LENGTH: usize = 100;
    /// Maximum length of a question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 200;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
    /// Minimum number of answer options per question
    pub const MIN_OPTION_COUNT: usize = 2;
    /// Maximum number of answer options per question
    pub const MAX_OPTION_COUNT: usize = 8;
}

/// Display name constraints
pub mod names {
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Name assigned to participants who never pick one (or pick an invalid one)
    pub const PLACEHOLDER: &str = "Anonymous";
}
