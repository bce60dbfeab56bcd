//! Single-round state machine
//!
//! A round is one question's full lifecycle: announced to everyone,
//! accepting answers for a fixed window, then closed, scored, and
//! revealed. All transitions go through a guarded `change_state`, so
//! the accepting-answers boundary is a single flag flip and a reveal
//! can only ever happen once per round.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use itertools::Itertools;
use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::{
    bank::{Question, Selected},
    constants::round::{ANSWER_WINDOW, POINTS_PER_CORRECT, REVEAL_PAUSE},
    scoreboard::Scoreboard,
    session::Tunnel,
    watcher::{Id, Watchers},
};

use super::game::{AlarmMessage, UpdateMessage};

/// The phase of a round's lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Created but not yet announced
    #[default]
    Pending,
    /// Announced; submissions are being accepted
    Accepting,
    /// The answer window has expired; scoring in progress
    Closed,
    /// The correct answer and scores have been published
    Revealed,
}

/// Snapshot of an in-progress round for late joiners
///
/// Carries everything a client needs to render the current question.
/// The correct answer is deliberately absent from this type.
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
    /// Category the question was drawn from
    pub category: String,
    /// The question text
    pub question: String,
    /// Answer options in display order
    pub options: Vec<String>,
    /// Zero-based index of this round since the game started
    pub index: usize,
    /// Time left in the answer window (zero once closed)
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub remaining: Duration,
    /// Whether submissions are currently being accepted
    pub accepting: bool,
}

/// Runtime state of the active round
#[derive(Debug)]
pub struct Round {
    category: String,
    question: Question,
    index: usize,

    /// First recorded submission per participant; never overwritten
    answers: HashMap<Id, String>,
    /// When the answer window opened
    started: Option<Instant>,
    phase: Phase,
}

impl Round {
    /// Creates a pending round from a selected question
    pub fn new(selected: Selected, index: usize) -> Self {
        Self {
            category: selected.category,
            question: selected.question,
            index,
            answers: HashMap::new(),
            started: None,
            phase: Phase::Pending,
        }
    }

    /// Zero-based index of this round since the game started
    ///
    /// Alarms carry this index so a timer scheduled for an earlier round
    /// can never advance a later one.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether submissions are currently being accepted
    pub fn accepting(&self) -> bool {
        self.phase == Phase::Accepting
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Attempts to transition from one phase to another
    ///
    /// Returns `true` only when the current phase matched `before`; every
    /// announcement and the scoring pass sit behind such a guard, which
    /// is what makes duplicate alarms harmless.
    fn change_state(&mut self, before: Phase, after: Phase) -> bool {
        if self.phase == before {
            self.phase = after;

            true
        } else {
            false
        }
    }

    /// Announces the question and opens the answer window
    ///
    /// Broadcasts `new-question` (options, never the answer), starts the
    /// window clock, and schedules the reveal alarm.
    pub fn play<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        watchers: &Watchers,
        mut schedule_message: S,
        tunnel_finder: F,
    ) {
        if self.change_state(Phase::Pending, Phase::Accepting) {
            self.started = Some(Instant::now());

            let payload = UpdateMessage::NewQuestion {
                category: self.category.clone(),
                question: self.question.question.clone(),
                options: self.question.options.clone(),
                index: self.index,
                duration: ANSWER_WINDOW,
            }
            .to_message();
            watchers.announce(&payload, tunnel_finder);

            schedule_message(
                AlarmMessage::ProceedToReveal { index: self.index },
                ANSWER_WINDOW,
            );
        }
    }

    /// Records a participant's submission
    ///
    /// Returns `false` without side effects when the window is not open
    /// or the participant already answered this round; the first
    /// submission always stays in effect.
    pub fn record_answer(&mut self, watcher_id: Id, answer: String) -> bool {
        if !self.accepting() {
            return false;
        }

        match self.answers.entry(watcher_id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant.insert(answer);
                true
            }
        }
    }

    /// Closes the window, scores the round, and publishes the reveal
    ///
    /// Every recorded answer equal to the correct one earns a fixed
    /// reward; participants who never answered or answered wrong are
    /// untouched. The whole pass is guarded by the Accepting→Closed
    /// transition, so calling this twice for the same round changes
    /// nothing the second time.
    ///
    /// Returns `true` when this call performed the reveal.
    pub fn reveal<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        scoreboard: &mut Scoreboard,
        watchers: &Watchers,
        mut schedule_message: S,
        tunnel_finder: F,
    ) -> bool {
        if !self.change_state(Phase::Accepting, Phase::Closed) {
            return false;
        }

        let awards = self
            .answers
            .iter()
            .filter(|(id, answer)| {
                watchers.has_watcher(**id) && *answer == &self.question.answer
            })
            .map(|(id, _)| (*id, POINTS_PER_CORRECT))
            .collect_vec();
        scoreboard.award(&awards);

        self.phase = Phase::Revealed;

        let payload = UpdateMessage::RevealAnswer {
            correct_answer: self.question.answer.clone(),
            players: scoreboard.roster(watchers),
        }
        .to_message();
        watchers.announce(&payload, &tunnel_finder);

        watchers.announce_with(
            |id, _| {
                let answer = self.answers.get(&id)?;
                Some(
                    UpdateMessage::AnswerResult {
                        correct: *answer == self.question.answer,
                        score: scoreboard.score(id),
                    }
                    .to_message(),
                )
            },
            &tunnel_finder,
        );

        schedule_message(
            AlarmMessage::ProceedToNext { index: self.index },
            REVEAL_PAUSE,
        );

        true
    }

    /// Builds the answer-free snapshot sent to late joiners
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            category: self.category.clone(),
            question: self.question.question.clone(),
            options: self.question.options.clone(),
            index: self.index,
            remaining: if self.accepting() {
                self.started
                    .map_or(ANSWER_WINDOW, |started| {
                        ANSWER_WINDOW.saturating_sub(started.elapsed())
                    })
            } else {
                Duration::ZERO
            },
            accepting: self.accepting(),
        }
    }
}
