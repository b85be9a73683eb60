//! Interview dialogue: transcript, prompt policy, the turn state machine and
//! the task that drives it against a relay.

pub mod controller;
pub mod prompt;
pub mod session;
pub mod transcript;

pub use controller::{ControllerHandle, RelayOpener, TurnCommand, TurnEvent, spawn_controller};
pub use prompt::{QUESTION_BUDGET, first_turn_prompt, follow_up_prompt};
pub use session::{TurnOutcome, TurnSession, TurnStart, TurnState, error_marker};
pub use transcript::{Role, Transcript, Utterance, UtteranceHandle, UtteranceStatus};

use serde::{Deserialize, Serialize};

/// Body of one interview relay call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueRequest {
    pub prompt: String,
    #[serde(rename = "isFirstMessage", default)]
    pub is_first_turn: bool,
}

impl DialogueRequest {
    pub fn first_turn(prompt: String) -> Self {
        Self {
            prompt,
            is_first_turn: true,
        }
    }

    pub fn follow_up(prompt: String) -> Self {
        Self {
            prompt,
            is_first_turn: false,
        }
    }
}
