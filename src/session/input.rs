use serde::{Deserialize, Serialize};

use crate::session::game::GameSession;
use crate::store::KvStore;

/// Inputs the rendering layer may send into a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    CardPressed(u32),
    AnswerSubmitted(usize),
    RetryRequested,
    AdvanceRequested,
    TopicSelected(String),
    AbandonRequested,
}

/// Route an event to its transition. Returns `false` when the event did not
/// apply in the current phase; such events leave the session untouched.
pub fn apply<S: KvStore>(session: &mut GameSession<S>, event: GameEvent) -> bool {
    match event {
        GameEvent::CardPressed(id) => session.press_card(id),
        GameEvent::AnswerSubmitted(index) => session.submit_answer(index),
        GameEvent::RetryRequested => session.retry(),
        GameEvent::AdvanceRequested => session.advance(),
        GameEvent::TopicSelected(name) => session.select_topic(&name),
        GameEvent::AbandonRequested => session.abandon(),
    }
}

/// Parse a terminal command line (`f 3`, `a 1`, `t science`, `r`, `n`, `q`).
pub fn parse_command(line: &str) -> Option<GameEvent> {
    let mut parts = line.split_whitespace();
    let verb = parts.next()?;
    let arg = parts.next();
    match (verb, arg) {
        ("f" | "flip", Some(id)) => id.parse().ok().map(GameEvent::CardPressed),
        ("a" | "answer", Some(index)) => index.parse().ok().map(GameEvent::AnswerSubmitted),
        ("t" | "topic", Some(name)) => Some(GameEvent::TopicSelected(name.to_string())),
        ("r" | "retry", None) => Some(GameEvent::RetryRequested),
        ("n" | "next", None) => Some(GameEvent::AdvanceRequested),
        ("q" | "quit", None) => Some(GameEvent::AbandonRequested),
        _ => None,
    }
}
