//! Runs a [`TurnSession`] on its own task. Commands come in over one channel
//! and [`TurnEvent`]s go out over another; the session is only ever touched
//! from this task.

use super::DialogueRequest;
use super::session::{TurnOutcome, TurnSession, TurnStart};
use super::transcript::UtteranceHandle;
use crate::client::{ConsumerEvent, ConsumerStream, RelayClient};
use crate::error::{StreamError, TurnRejection};
use anyhow::Context;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 32;

/// Opens the relay stream for one turn.
pub trait RelayOpener: Send + Sync + 'static {
    fn open(&self, request: &DialogueRequest) -> ConsumerStream;
}

impl RelayOpener for RelayClient {
    fn open(&self, request: &DialogueRequest) -> ConsumerStream {
        self.stream_interview(request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnCommand {
    StartInterview { job_title: String },
    SubmitAnswer { answer: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// The candidate's answer was recorded, before its relay call starts.
    AnswerRecorded { text: String },
    ReplyStarted {
        handle: UtteranceHandle,
        is_first_turn: bool,
    },
    /// Full reply text so far.
    ReplyUpdated {
        handle: UtteranceHandle,
        text: String,
    },
    ReplyFinished {
        handle: UtteranceHandle,
        outcome: TurnOutcome,
    },
    Rejected {
        command: TurnCommand,
        reason: TurnRejection,
    },
}

pub struct ControllerHandle {
    commands: mpsc::Sender<TurnCommand>,
    events: mpsc::Receiver<TurnEvent>,
    task: JoinHandle<TurnSession>,
}

impl ControllerHandle {
    pub async fn send(&self, command: TurnCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("turn controller has stopped"))
    }

    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.events.recv().await
    }

    /// Closes the command channel and returns the final session state. A
    /// reply still streaming is abandoned.
    pub async fn shutdown(self) -> anyhow::Result<TurnSession> {
        let Self { commands, task, .. } = self;
        drop(commands);
        task.await.context("turn controller task panicked")
    }
}

pub fn spawn_controller<R: RelayOpener>(relay: R) -> ControllerHandle {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(run_controller(relay, command_rx, event_tx));
    ControllerHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

struct ActiveReply {
    handle: UtteranceHandle,
    stream: ConsumerStream,
}

async fn next_relay_event(
    active: &mut Option<ActiveReply>,
) -> Option<Result<ConsumerEvent, StreamError>> {
    match active {
        Some(reply) => reply.stream.next().await,
        None => std::future::pending().await,
    }
}

async fn run_controller<R: RelayOpener>(
    relay: R,
    mut commands: mpsc::Receiver<TurnCommand>,
    events: mpsc::Sender<TurnEvent>,
) -> TurnSession {
    let mut session = TurnSession::new();
    let mut active: Option<ActiveReply> = None;
    tracing::debug!(session = %session.id(), "turn controller started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                if let Some(reply) = handle_command(&mut session, &relay, command, &events).await {
                    active = Some(reply);
                }
            }
            next = next_relay_event(&mut active) => {
                let Some(reply) = active.as_ref() else {
                    continue;
                };
                let handle = reply.handle;
                let finished = match next {
                    Some(Ok(event)) => match session.apply(handle, &event) {
                        Ok(None) => {
                            if let ConsumerEvent::Update { text } = event {
                                emit(&events, TurnEvent::ReplyUpdated { handle, text }).await;
                            }
                            None
                        }
                        Ok(Some(outcome)) => Some(outcome),
                        Err(reason) => {
                            tracing::warn!(?reason, "dropping relay event for inactive reply");
                            None
                        }
                    },
                    Some(Err(error)) => session.fail_transport(handle, error).ok(),
                    None => session.fail_transport(handle, StreamError::Truncated).ok(),
                };
                if let Some(outcome) = finished {
                    active = None;
                    emit(&events, TurnEvent::ReplyFinished { handle, outcome }).await;
                }
            }
        }
    }

    tracing::debug!(session = %session.id(), "turn controller stopped");
    session
}

async fn handle_command<R: RelayOpener>(
    session: &mut TurnSession,
    relay: &R,
    command: TurnCommand,
    events: &mpsc::Sender<TurnEvent>,
) -> Option<ActiveReply> {
    let started = match &command {
        TurnCommand::StartInterview { job_title } => session.start_interview(job_title),
        TurnCommand::SubmitAnswer { answer } => session.submit_answer(answer),
    };

    let TurnStart { request, handle } = match started {
        Ok(start) => start,
        Err(reason) => {
            tracing::debug!(?reason, "turn command rejected");
            emit(events, TurnEvent::Rejected { command, reason }).await;
            return None;
        }
    };

    if let TurnCommand::SubmitAnswer { answer } = command {
        emit(
            events,
            TurnEvent::AnswerRecorded {
                text: answer.trim().to_string(),
            },
        )
        .await;
    }
    emit(
        events,
        TurnEvent::ReplyStarted {
            handle,
            is_first_turn: request.is_first_turn,
        },
    )
    .await;

    Some(ActiveReply {
        handle,
        stream: relay.open(&request),
    })
}

async fn emit(events: &mpsc::Sender<TurnEvent>, event: TurnEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!("turn event receiver dropped");
    }
}
