//! Core game session logic
//!
//! This module contains the session context that owns all mutable game
//! state: the participant registry, the scoreboard, the question
//! rotation, and the active round. Every handler receives the context
//! explicitly; there is no process-wide state. The context is driven
//! from outside by three inputs — participant lifecycle, inbound
//! messages, and scheduled alarms — and talks back to participants only
//! through `tunnel_finder` closures, so the whole engine runs against
//! mock tunnels in tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;

use crate::{
    bank::{self, QuestionBank, Selector},
    constants::names::PLACEHOLDER,
    names,
    round::{Phase, Round, RoundSnapshot},
    scoreboard::{PlayerEntry, Scoreboard},
    session::Tunnel,
    watcher::{self, Id, Watchers},
};

/// Messages received from participants
///
/// The wire format is internally tagged JSON with kebab-case kinds,
/// matching what clients send: `{"type": "submit-answer", "answer": "..."}`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum IncomingMessage {
    /// Explicit join signal; replays the welcome synchronization
    Join,
    /// Request to change the display name
    SetName {
        /// The requested name (sanitized before use)
        name: String,
    },
    /// Answer submission for the active round
    SubmitAnswer {
        /// The chosen option text
        answer: String,
    },
}

/// Events broadcast or sent to participants about state changes
#[serde_with::serde_as]
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UpdateMessage {
    /// Roster/score snapshot; sent on join, leave, rename, and reveal
    PlayerUpdate {
        /// Every registered participant's public projection
        players: HashMap<Id, PlayerEntry>,
    },
    /// A new round has started; never carries the answer
    NewQuestion {
        /// Category the question was drawn from
        category: String,
        /// The question text
        question: String,
        /// Answer options in display order
        options: Vec<String>,
        /// Zero-based round index since the game started
        index: usize,
        /// Length of the answer window
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// The round is over; discloses the answer and updated scores
    RevealAnswer {
        /// The correct option text
        correct_answer: String,
        /// Roster snapshot including the round's score changes
        players: HashMap<Id, PlayerEntry>,
    },
    /// Per-participant verdict, sent only to those who answered
    AnswerResult {
        /// Whether the recorded answer was correct
        correct: bool,
        /// The participant's total score after this round
        score: u64,
    },
}

impl UpdateMessage {
    /// Converts the message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never
    /// happen with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// State synchronization sent to a single participant on connect
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SyncMessage {
    /// Greets a participant with their id and the in-progress round
    Welcome {
        /// The participant's newly assigned id
        player_id: Id,
        /// Snapshot of the active round, if one exists
        round: Option<RoundSnapshot>,
    },
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never
    /// happen with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Scheduled timer events driving round progression
///
/// Each alarm carries the index of the round it was scheduled for; the
/// game ignores alarms whose index no longer matches the active round,
/// so a timer from an earlier round can never fire into a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The answer window has elapsed; close, score, and reveal
    ProceedToReveal {
        /// Round the alarm was scheduled for
        index: usize,
    },
    /// The post-reveal pause has elapsed; start the next round
    ProceedToNext {
        /// Round the alarm was scheduled for
        index: usize,
    },
}

/// Whether a round is currently in flight
#[derive(Debug)]
enum State {
    /// No round yet; the first join starts the loop
    Idle,
    /// A round is active (accepting, closed, or revealed)
    Round(Box<Round>),
}

/// The game session context
///
/// Owns all mutable state of one trivia session. Methods are generic
/// over the tunnel type and a `tunnel_finder` closure mapping ids to
/// live tunnels, plus a `schedule_message` closure for one-shot timers,
/// exactly the seams the server's game task and the tests plug into.
#[derive(Debug)]
pub struct Game {
    selector: Selector,
    watchers: Watchers,
    scoreboard: Scoreboard,
    state: State,
    /// Index the next round will get; monotonic, never reused
    rounds_played: usize,
}

impl Game {
    /// Creates a session over a validated question bank
    ///
    /// # Errors
    ///
    /// Returns a [`bank::Error`] when the bank fails validation; in
    /// particular an empty bank is refused before any round can start.
    pub fn new(question_bank: QuestionBank) -> Result<Self, bank::Error> {
        Ok(Self {
            selector: Selector::new(question_bank)?,
            watchers: Watchers::default(),
            scoreboard: Scoreboard::default(),
            state: State::Idle,
            rounds_played: 0,
        })
    }

    /// Registers a newly connected participant
    ///
    /// The participant starts with the placeholder name and a zero
    /// score, receives their welcome synchronization (id plus the
    /// in-progress round, if any), and appears in the roster broadcast
    /// that follows. The first join also starts the round loop.
    ///
    /// # Errors
    ///
    /// Returns [`watcher::Error::MaximumPlayers`] when the session is full.
    pub fn add_player<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        watcher_id: Id,
        schedule_message: S,
        tunnel_finder: F,
    ) -> Result<(), watcher::Error> {
        self.watchers
            .add_player(watcher_id, PLACEHOLDER.to_owned())?;

        self.watchers
            .send_to(&self.sync_message(watcher_id).to_message(), watcher_id, &tunnel_finder);

        self.broadcast_roster(&tunnel_finder);

        if matches!(self.state, State::Idle) {
            self.start_round(schedule_message, tunnel_finder);
        }

        Ok(())
    }

    /// Removes a participant and broadcasts the shrunken roster
    ///
    /// Disconnection is a normal lifecycle transition, not an error;
    /// unknown ids are ignored so duplicate cleanup is harmless.
    pub fn remove_player<T: Tunnel, F: Fn(Id) -> Option<T>>(
        &mut self,
        watcher_id: Id,
        tunnel_finder: F,
    ) {
        if !self.watchers.has_watcher(watcher_id) {
            return;
        }

        self.watchers.remove_watcher(watcher_id, &tunnel_finder);
        self.scoreboard.remove(watcher_id);

        self.broadcast_roster(&tunnel_finder);
    }

    /// Handles an inbound message from a participant
    ///
    /// Messages from unknown ids are dropped. Answer submissions that
    /// violate round state (window closed, already answered) are
    /// rejected silently with no score effect.
    pub fn receive_message<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        watcher_id: Id,
        message: IncomingMessage,
        _schedule_message: S,
        tunnel_finder: F,
    ) {
        if !self.watchers.has_watcher(watcher_id) {
            return;
        }

        match message {
            IncomingMessage::Join => {
                self.watchers.send_to(
                    &self.sync_message(watcher_id).to_message(),
                    watcher_id,
                    &tunnel_finder,
                );
            }
            IncomingMessage::SetName { name } => {
                self.watchers.set_name(watcher_id, names::clean(&name));
                self.broadcast_roster(&tunnel_finder);
            }
            IncomingMessage::SubmitAnswer { answer } => {
                if let State::Round(round) = &mut self.state {
                    round.record_answer(watcher_id, answer);
                }
            }
        }
    }

    /// Handles a scheduled alarm
    ///
    /// Stale alarms — carrying an index other than the active round's,
    /// or arriving when no round exists — are ignored, which makes timer
    /// cancellation race-free without any cancellation machinery.
    pub fn receive_alarm<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        match message {
            AlarmMessage::ProceedToReveal { index } => {
                let revealed = if let State::Round(round) = &mut self.state
                    && round.index() == index
                {
                    round.reveal(
                        &mut self.scoreboard,
                        &self.watchers,
                        schedule_message,
                        &tunnel_finder,
                    )
                } else {
                    false
                };

                // The reveal changed scores, so the roster snapshot follows it.
                if revealed {
                    self.broadcast_roster(&tunnel_finder);
                }
            }
            AlarmMessage::ProceedToNext { index } => {
                let advance = matches!(
                    &self.state,
                    State::Round(round)
                        if round.index() == index && round.phase() == Phase::Revealed
                );
                if advance {
                    self.start_round(schedule_message, tunnel_finder);
                }
            }
        }
    }

    /// The number of participants currently registered
    pub fn player_count(&self) -> usize {
        self.watchers.count()
    }

    /// Selects the next question and opens its answer window
    fn start_round<T: Tunnel, F: Fn(Id) -> Option<T>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        schedule_message: S,
        tunnel_finder: F,
    ) {
        let selected = self.selector.select_next();
        let mut round = Round::new(selected, self.rounds_played);
        self.rounds_played += 1;

        round.play(&self.watchers, schedule_message, tunnel_finder);

        self.state = State::Round(Box::new(round));
    }

    /// Builds the welcome synchronization for one participant
    fn sync_message(&self, watcher_id: Id) -> SyncMessage {
        SyncMessage::Welcome {
            player_id: watcher_id,
            round: match &self.state {
                State::Idle => None,
                State::Round(round) => Some(round.snapshot()),
            },
        }
    }

    /// Broadcasts the current roster to everyone
    fn broadcast_roster<T: Tunnel, F: Fn(Id) -> Option<T>>(&self, tunnel_finder: F) {
        let payload = UpdateMessage::PlayerUpdate {
            players: self.scoreboard.roster(&self.watchers),
        }
        .to_message();
        self.watchers.announce(&payload, tunnel_finder);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap, rc::Rc};

    use crate::bank::Question;

    use super::*;

    #[derive(Clone, Default)]
    struct MockTunnel {
        sent: Rc<RefCell<Vec<String>>>,
    }

    impl Tunnel for MockTunnel {
        fn send(&self, payload: &str) {
            self.sent.borrow_mut().push(payload.to_owned());
        }

        fn close(&self) {}
    }

    fn single_question_bank() -> QuestionBank {
        serde_json::from_str(
            r#"{
                "Geography": [
                    {
                        "question": "What is the capital of France?",
                        "options": ["Paris", "Rome", "Berlin"],
                        "answer": "Paris"
                    },
                    {
                        "question": "What is the capital of Italy?",
                        "options": ["Paris", "Rome", "Berlin"],
                        "answer": "Rome"
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    struct Fixture {
        game: Game,
        tunnels: HashMap<Id, MockTunnel>,
        alarms: Vec<(AlarmMessage, Duration)>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                game: Game::new(single_question_bank()).unwrap(),
                tunnels: HashMap::new(),
                alarms: Vec::new(),
            }
        }

        fn join(&mut self) -> Id {
            let id = Id::new();
            self.tunnels.insert(id, MockTunnel::default());
            let tunnels = &self.tunnels;
            self.game
                .add_player(
                    id,
                    |alarm, after| self.alarms.push((alarm, after)),
                    |id| tunnels.get(&id).cloned(),
                )
                .unwrap();
            id
        }

        fn leave(&mut self, id: Id) {
            let tunnels = &self.tunnels;
            self.game.remove_player(id, |id| tunnels.get(&id).cloned());
            self.tunnels.remove(&id);
        }

        fn receive(&mut self, id: Id, message: IncomingMessage) {
            let tunnels = &self.tunnels;
            self.game.receive_message(
                id,
                message,
                |alarm, after| self.alarms.push((alarm, after)),
                |id| tunnels.get(&id).cloned(),
            );
        }

        fn alarm(&mut self, message: AlarmMessage) {
            let tunnels = &self.tunnels;
            self.game.receive_alarm(
                message,
                |alarm, after| self.alarms.push((alarm, after)),
                |id| tunnels.get(&id).cloned(),
            );
        }

        fn submit(&mut self, id: Id, answer: &str) {
            self.receive(
                id,
                IncomingMessage::SubmitAnswer {
                    answer: answer.to_owned(),
                },
            );
        }

        fn sent_to(&self, id: Id) -> Vec<serde_json::Value> {
            self.tunnels[&id]
                .sent
                .borrow()
                .iter()
                .map(|payload| serde_json::from_str(payload).unwrap())
                .collect()
        }

        fn last_of_kind(&self, id: Id, kind: &str) -> serde_json::Value {
            self.sent_to(id)
                .into_iter()
                .rev()
                .find(|m| m["type"] == kind)
                .unwrap_or_else(|| panic!("no {kind} message sent to {id}"))
        }

        fn correct_answer(&self, id: Id) -> String {
            // The active round's answer, read off the reveal path: submit
            // nothing, just inspect the latest new-question and match it
            // against the fixture bank.
            let question = self.last_of_kind(id, "new-question");
            if question["question"] == "What is the capital of France?" {
                "Paris".to_owned()
            } else {
                "Rome".to_owned()
            }
        }
    }

    #[test]
    fn test_first_join_gets_welcome_then_round_starts() {
        let mut fixture = Fixture::new();
        let id = fixture.join();

        let messages = fixture.sent_to(id);
        assert_eq!(messages[0]["type"], "welcome");
        assert_eq!(messages[0]["playerId"], id.to_string());
        assert!(messages[0].get("round").is_none());
        assert_eq!(messages[1]["type"], "player-update");
        assert_eq!(messages[2]["type"], "new-question");
        assert_eq!(messages[2]["index"], 0);

        assert_eq!(
            fixture.alarms,
            [(
                AlarmMessage::ProceedToReveal { index: 0 },
                crate::constants::round::ANSWER_WINDOW
            )]
        );
    }

    #[test]
    fn test_mid_round_join_gets_round_snapshot() {
        let mut fixture = Fixture::new();
        let first = fixture.join();
        let second = fixture.join();

        let welcome = fixture.last_of_kind(second, "welcome");
        assert_eq!(welcome["round"]["accepting"], true);
        assert_eq!(welcome["round"]["index"], 0);
        assert!(welcome["round"].get("answer").is_none());

        // No second round was started by the second join.
        assert_eq!(fixture.alarms.len(), 1);
        let _ = first;
    }

    #[test]
    fn test_roster_tracks_connects_and_disconnects() {
        let mut fixture = Fixture::new();
        let a = fixture.join();
        let b = fixture.join();
        let c = fixture.join();
        fixture.leave(b);

        let roster = fixture.last_of_kind(a, "player-update");
        let players = roster["players"].as_object().unwrap();
        assert_eq!(players.len(), 2);
        assert!(players.contains_key(&a.to_string()));
        assert!(players.contains_key(&c.to_string()));
        assert!(!players.contains_key(&b.to_string()));
    }

    #[test]
    fn test_set_name_is_cleaned_and_broadcast() {
        let mut fixture = Fixture::new();
        let a = fixture.join();
        let b = fixture.join();

        fixture.receive(
            a,
            IncomingMessage::SetName {
                name: "  Ada  ".to_owned(),
            },
        );
        fixture.receive(
            b,
            IncomingMessage::SetName {
                name: "   ".to_owned(),
            },
        );

        let roster = fixture.last_of_kind(a, "player-update");
        assert_eq!(roster["players"][&a.to_string()]["name"], "Ada");
        assert_eq!(roster["players"][&b.to_string()]["name"], "Anonymous");
    }

    #[test]
    fn test_correct_answer_scores_ten_on_reveal() {
        let mut fixture = Fixture::new();
        let id = fixture.join();
        let answer = fixture.correct_answer(id);

        fixture.submit(id, &answer);
        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });

        let reveal = fixture.last_of_kind(id, "reveal-answer");
        assert_eq!(reveal["correctAnswer"], answer);
        assert_eq!(reveal["players"][&id.to_string()]["score"], 10);

        let result = fixture.last_of_kind(id, "answer-result");
        assert_eq!(result["correct"], true);
        assert_eq!(result["score"], 10);

        // The post-reveal roster broadcast carries the new total.
        let roster = fixture.last_of_kind(id, "player-update");
        assert_eq!(roster["players"][&id.to_string()]["score"], 10);
    }

    #[test]
    fn test_duplicate_reveal_alarm_is_ignored() {
        let mut fixture = Fixture::new();
        let id = fixture.join();
        let answer = fixture.correct_answer(id);
        fixture.submit(id, &answer);

        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });
        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });

        let reveals = fixture
            .sent_to(id)
            .into_iter()
            .filter(|m| m["type"] == "reveal-answer")
            .count();
        assert_eq!(reveals, 1);

        let reveal = fixture.last_of_kind(id, "reveal-answer");
        assert_eq!(reveal["players"][&id.to_string()]["score"], 10);
    }

    #[test]
    fn test_submission_after_window_closes_is_rejected() {
        let mut fixture = Fixture::new();
        let id = fixture.join();
        let answer = fixture.correct_answer(id);

        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });
        fixture.submit(id, &answer);

        let reveal = fixture.last_of_kind(id, "reveal-answer");
        assert_eq!(reveal["players"][&id.to_string()]["score"], 0);
        assert!(!fixture
            .sent_to(id)
            .iter()
            .any(|m| m["type"] == "answer-result"));
    }

    #[test]
    fn test_late_joiner_appears_in_next_round_with_zero_score() {
        let mut fixture = Fixture::new();
        let early = fixture.join();
        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });

        // Joins after the window closed; their submission is rejected.
        let late = fixture.join();
        fixture.submit(late, "Paris");

        fixture.alarm(AlarmMessage::ProceedToNext { index: 0 });

        let question = fixture.last_of_kind(late, "new-question");
        assert_eq!(question["index"], 1);

        let roster = fixture.last_of_kind(early, "player-update");
        assert_eq!(roster["players"][&late.to_string()]["score"], 0);
    }

    #[test]
    fn test_round_advances_and_stale_alarms_cannot_double_advance() {
        let mut fixture = Fixture::new();
        let id = fixture.join();

        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });
        fixture.alarm(AlarmMessage::ProceedToNext { index: 0 });

        // Replays of round 0's alarms arrive after round 1 started.
        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });
        fixture.alarm(AlarmMessage::ProceedToNext { index: 0 });

        let questions = fixture
            .sent_to(id)
            .into_iter()
            .filter(|m| m["type"] == "new-question")
            .count();
        assert_eq!(questions, 2);
    }

    #[test]
    fn test_next_alarm_before_reveal_is_ignored() {
        let mut fixture = Fixture::new();
        let id = fixture.join();

        fixture.alarm(AlarmMessage::ProceedToNext { index: 0 });

        let questions = fixture
            .sent_to(id)
            .into_iter()
            .filter(|m| m["type"] == "new-question")
            .count();
        assert_eq!(questions, 1);
    }

    #[test]
    fn test_alarm_with_no_round_is_a_no_op() {
        let mut fixture = Fixture::new();
        fixture.alarm(AlarmMessage::ProceedToReveal { index: 0 });
        fixture.alarm(AlarmMessage::ProceedToNext { index: 0 });
        assert!(fixture.alarms.is_empty());
    }

    #[test]
    fn test_messages_from_unknown_ids_are_dropped() {
        let mut fixture = Fixture::new();
        let id = fixture.join();
        let stranger = Id::new();

        fixture.receive(
            stranger,
            IncomingMessage::SetName {
                name: "Mallory".to_owned(),
            },
        );

        let roster = fixture.last_of_kind(id, "player-update");
        assert_eq!(roster["players"].as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_join_message_replays_welcome() {
        let mut fixture = Fixture::new();
        let id = fixture.join();

        fixture.receive(id, IncomingMessage::Join);

        let welcomes = fixture
            .sent_to(id)
            .into_iter()
            .filter(|m| m["type"] == "welcome")
            .count();
        assert_eq!(welcomes, 2);
    }

    #[test]
    fn test_incoming_message_wire_format() {
        let set_name: IncomingMessage =
            serde_json::from_str(r#"{"type": "set-name", "name": "Ada"}"#).unwrap();
        assert!(matches!(set_name, IncomingMessage::SetName { name } if name == "Ada"));

        let submit: IncomingMessage =
            serde_json::from_str(r#"{"type": "submit-answer", "answer": "Paris"}"#).unwrap();
        assert!(matches!(submit, IncomingMessage::SubmitAnswer { answer } if answer == "Paris"));

        let join: IncomingMessage = serde_json::from_str(r#"{"type": "join"}"#).unwrap();
        assert!(matches!(join, IncomingMessage::Join));
    }
}
