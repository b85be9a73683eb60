use super::DialogueRequest;
use super::prompt::{first_turn_prompt, follow_up_prompt};
use super::transcript::{Role, Transcript, UtteranceHandle};
use crate::client::ConsumerEvent;
use crate::error::{StreamError, TurnRejection};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    /// Job title accepted, first relay call not made yet.
    AwaitingFirstTurn,
    Streaming,
}

/// How a streamed reply ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { text: String },
    /// The relay reported an error record.
    Failed { message: String },
    /// The stream broke on this side: bad status, dropped connection or
    /// no terminal record.
    Interrupted { error: StreamError },
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A turn that is ready to be relayed: the request to send and the handle
/// of the reply slot its events must be applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStart {
    pub request: DialogueRequest,
    pub handle: UtteranceHandle,
}

/// Text left in a reply slot whose turn failed.
pub fn error_marker(message: &str) -> String {
    format!("Error: {message}")
}

/// Dialogue state of one interview. Pure: performs no I/O, so every
/// transition can be driven directly.
#[derive(Debug)]
pub struct TurnSession {
    id: Uuid,
    state: TurnState,
    in_flight: bool,
    transcript: Transcript,
    original_prompt: Option<String>,
    active: Option<UtteranceHandle>,
}

impl Default for TurnSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: TurnState::Idle,
            in_flight: false,
            transcript: Transcript::new(),
            original_prompt: None,
            active: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn original_prompt(&self) -> Option<&str> {
        self.original_prompt.as_deref()
    }

    pub fn active_reply(&self) -> Option<UtteranceHandle> {
        self.active
    }

    fn ensure_idle(&self) -> Result<(), TurnRejection> {
        if self.in_flight {
            return Err(TurnRejection::InFlight);
        }
        match self.state {
            TurnState::Idle => Ok(()),
            TurnState::AwaitingFirstTurn => Err(TurnRejection::TurnPending),
            TurnState::Streaming => Err(TurnRejection::InFlight),
        }
    }

    /// Starts a fresh interview: the transcript is cleared and the opening
    /// instructions become the original prompt for every later turn.
    pub fn submit_job_title(&mut self, job_title: &str) -> Result<DialogueRequest, TurnRejection> {
        let job_title = job_title.trim();
        if job_title.is_empty() {
            return Err(TurnRejection::EmptyInput);
        }
        self.ensure_idle()?;

        let prompt = first_turn_prompt(job_title);
        self.transcript.clear();
        self.original_prompt = Some(prompt.clone());
        self.state = TurnState::AwaitingFirstTurn;
        tracing::info!(session = %self.id, job_title, "interview started");

        Ok(DialogueRequest::first_turn(prompt))
    }

    /// Marks the pending first turn as relayed and opens its reply slot.
    pub fn begin_stream(&mut self) -> Result<UtteranceHandle, TurnRejection> {
        if self.state != TurnState::AwaitingFirstTurn {
            return Err(TurnRejection::NotAwaitingTurn);
        }
        self.open_reply()
    }

    /// [`submit_job_title`](Self::submit_job_title) and
    /// [`begin_stream`](Self::begin_stream) in one step.
    pub fn start_interview(&mut self, job_title: &str) -> Result<TurnStart, TurnRejection> {
        let request = self.submit_job_title(job_title)?;
        let handle = self.begin_stream()?;
        Ok(TurnStart { request, handle })
    }

    /// Records the candidate's answer and opens the reply slot for the
    /// interviewer's next turn. Rejected without any change while a reply is
    /// still streaming.
    pub fn submit_answer(&mut self, answer: &str) -> Result<TurnStart, TurnRejection> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(TurnRejection::EmptyInput);
        }
        self.ensure_idle()?;
        let Some(original) = self.original_prompt.as_deref() else {
            return Err(TurnRejection::NoInterview);
        };

        self.transcript.append(Role::User, answer);
        let request = DialogueRequest::follow_up(follow_up_prompt(original, &self.transcript));
        let handle = self.open_reply()?;
        Ok(TurnStart { request, handle })
    }

    fn open_reply(&mut self) -> Result<UtteranceHandle, TurnRejection> {
        let handle = self
            .transcript
            .open(Role::Model)
            .ok_or(TurnRejection::InFlight)?;
        self.active = Some(handle);
        self.in_flight = true;
        self.state = TurnState::Streaming;
        Ok(handle)
    }

    /// Folds one consumer event into the reply slot. Returns the outcome
    /// once the event is terminal.
    pub fn apply(
        &mut self,
        handle: UtteranceHandle,
        event: &ConsumerEvent,
    ) -> Result<Option<TurnOutcome>, TurnRejection> {
        if self.active != Some(handle) {
            return Err(TurnRejection::StaleHandle);
        }
        let outcome = match event {
            ConsumerEvent::Update { text } => {
                self.transcript.update(handle, text);
                return Ok(None);
            }
            ConsumerEvent::Completed { text } => {
                self.transcript.seal(handle, text);
                TurnOutcome::Completed { text: text.clone() }
            }
            ConsumerEvent::Failed { message } => {
                self.transcript.fail(handle, &error_marker(message));
                TurnOutcome::Failed {
                    message: message.clone(),
                }
            }
        };
        Ok(Some(self.finish(outcome)))
    }

    /// Ends the turn after a local stream failure.
    pub fn fail_transport(
        &mut self,
        handle: UtteranceHandle,
        error: StreamError,
    ) -> Result<TurnOutcome, TurnRejection> {
        if self.active != Some(handle) {
            return Err(TurnRejection::StaleHandle);
        }
        self.transcript.fail(handle, &error_marker(&error.to_string()));
        Ok(self.finish(TurnOutcome::Interrupted { error }))
    }

    fn finish(&mut self, outcome: TurnOutcome) -> TurnOutcome {
        self.in_flight = false;
        self.active = None;
        self.state = TurnState::Idle;
        if outcome.is_success() {
            tracing::debug!(session = %self.id, turns = self.transcript.len(), "turn completed");
        } else {
            tracing::warn!(session = %self.id, ?outcome, "turn failed");
        }
        outcome
    }
}
