//! Question bank loading, validation, and rotation
//!
//! The question bank is a read-only mapping from category name to an
//! ordered list of questions, loaded once at startup and never mutated.
//! The [`Selector`] walks the bank in passes: every question of every
//! category exactly once per pass, categories in a freshly shuffled
//! order each pass, so the rotation never stalls and never repeats a
//! pairing before the whole bank has been served.

use std::{
    collections::{HashMap, HashSet},
    io::Read,
};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or rotating the question bank
///
/// All of these are configuration errors: they surface at startup and
/// the game loop must not begin while any of them stand.
#[derive(Error, Debug)]
pub enum Error {
    /// The bank file could not be read
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    /// The bank file is not valid JSON of the expected shape
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] serde_json::Error),
    /// The bank contains no questions at all
    #[error("question bank has no questions")]
    Empty,
    /// A category exists but has an empty question list
    #[error("category {category:?} has no questions")]
    EmptyCategory {
        /// Name of the offending category
        category: String,
    },
    /// A field failed length/count validation
    #[error("invalid question bank: {0}")]
    Invalid(#[from] garde::Report),
    /// A category name is longer than the configured limit
    #[error("category name {category:?} is too long")]
    CategoryTooLong {
        /// Name of the offending category
        category: String,
    },
    /// A question's correct answer is not one of its options
    #[error("category {category:?}, question {index}: correct answer is not one of the options")]
    AnswerNotInOptions {
        /// Name of the offending category
        category: String,
        /// Zero-based index of the question within the category
        index: usize,
    },
    /// A question lists the same option twice
    #[error("category {category:?}, question {index}: duplicate options")]
    DuplicateOptions {
        /// Name of the offending category
        category: String,
        /// Zero-based index of the question within the category
        index: usize,
    },
}

/// A single question record as stored in the bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text shown to participants
    #[garde(length(max = crate::constants::bank::MAX_QUESTION_LENGTH))]
    pub question: String,
    /// The fixed set of answer options, in display order
    #[garde(
        length(min = crate::constants::bank::MIN_OPTION_COUNT, max = crate::constants::bank::MAX_OPTION_COUNT),
        inner(length(max = crate::constants::bank::MAX_OPTION_LENGTH))
    )]
    pub options: Vec<String>,
    /// The correct answer; must be a member of `options`
    #[garde(skip)]
    pub answer: String,
}

/// The full question bank: category name to ordered question list
///
/// Immutable for the process lifetime once loaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBank {
    categories: HashMap<String, Vec<Question>>,
}

impl QuestionBank {
    /// Parses and validates a question bank from a JSON reader
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] when the JSON is malformed, the bank is
    /// empty, or any question is incoherent (see [`QuestionBank::validate`]).
    pub fn from_reader(reader: impl Read) -> Result<Self, Error> {
        let bank: Self = serde_json::from_reader(reader)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Checks every structural invariant of the bank
    ///
    /// # Errors
    ///
    /// * [`Error::Empty`] if there are no categories
    /// * [`Error::EmptyCategory`] if a category has no questions
    /// * [`Error::Invalid`] for field length/count violations
    /// * [`Error::CategoryTooLong`] for over-long category names
    /// * [`Error::DuplicateOptions`] if a question repeats an option
    /// * [`Error::AnswerNotInOptions`] if a correct answer is missing
    ///   from its own options
    pub fn validate(&self) -> Result<(), Error> {
        if self.categories.is_empty() {
            return Err(Error::Empty);
        }

        for (category, questions) in &self.categories {
            if questions.is_empty() {
                return Err(Error::EmptyCategory {
                    category: category.clone(),
                });
            }
            if category.len() > crate::constants::bank::MAX_CATEGORY_LENGTH {
                return Err(Error::CategoryTooLong {
                    category: category.clone(),
                });
            }

            for (index, question) in questions.iter().enumerate() {
                Validate::validate(question)?;

                let distinct: HashSet<&str> =
                    question.options.iter().map(String::as_str).collect();
                if distinct.len() != question.options.len() {
                    return Err(Error::DuplicateOptions {
                        category: category.clone(),
                        index,
                    });
                }
                if !distinct.contains(question.answer.as_str()) {
                    return Err(Error::AnswerNotInOptions {
                        category: category.clone(),
                        index,
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the total number of questions across all categories
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Checks if the bank contains any questions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A question chosen by the selector, together with its category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    /// Category the question was drawn from
    pub category: String,
    /// The chosen question record
    pub question: Question,
}

/// Walks the question bank in exhaustive passes
///
/// Within a pass, categories are served in a shuffled order and each
/// category's questions in their stored order; once every question has
/// been served the pass ends and a new shuffled pass begins. The
/// selector can therefore always produce a next question as long as the
/// bank validated as non-empty.
#[derive(Debug)]
pub struct Selector {
    bank: QuestionBank,
    pass: Vec<String>,
    category_cursor: usize,
    question_cursor: usize,
}

impl Selector {
    /// Creates a selector over a validated bank
    ///
    /// # Errors
    ///
    /// Returns any validation error from [`QuestionBank::validate`]; in
    /// particular an empty bank is refused here so the game loop can
    /// never start without a question to serve.
    pub fn new(bank: QuestionBank) -> Result<Self, Error> {
        bank.validate()?;

        let mut pass = bank.categories.keys().cloned().sorted().collect_vec();
        fastrand::shuffle(&mut pass);

        Ok(Self {
            bank,
            pass,
            category_cursor: 0,
            question_cursor: 0,
        })
    }

    /// Produces the next question in the rotation
    pub fn select_next(&mut self) -> Selected {
        let category = self.pass[self.category_cursor].clone();
        let questions = &self.bank.categories[&category];
        let question = questions[self.question_cursor].clone();

        self.question_cursor += 1;
        if self.question_cursor >= questions.len() {
            self.question_cursor = 0;
            self.category_cursor += 1;
            if self.category_cursor >= self.pass.len() {
                self.category_cursor = 0;
                fastrand::shuffle(&mut self.pass);
            }
        }

        Selected { category, question }
    }
}
