//! Terminal front end: reads candidate input from stdin and renders the
//! interviewer's reply as it streams in.

use crate::client::{ConsumerEvent, RelayClient};
use crate::error::TurnRejection;
use crate::interview::{TurnCommand, TurnEvent, TurnOutcome, error_marker, spawn_controller};
use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

/// Prints only the part of a growing message not shown yet.
#[derive(Debug, Default)]
struct ReplyView {
    printed: usize,
}

impl ReplyView {
    fn show_growth(&mut self, text: &str, out: &mut impl Write) -> io::Result<()> {
        if let Some(delta) = text.get(self.printed..) {
            out.write_all(delta.as_bytes())?;
        }
        self.printed = text.len();
        Ok(())
    }

    fn render(&mut self, event: &TurnEvent, out: &mut impl Write) -> io::Result<()> {
        match event {
            TurnEvent::AnswerRecorded { .. } => {}
            TurnEvent::ReplyStarted { .. } => {
                self.printed = 0;
                write!(out, "\nInterviewer: ")?;
            }
            TurnEvent::ReplyUpdated { text, .. } => self.show_growth(text, out)?,
            TurnEvent::ReplyFinished { outcome, .. } => match outcome {
                TurnOutcome::Completed { text } => {
                    self.show_growth(text, out)?;
                    write!(out, "\n\nYou: ")?;
                }
                TurnOutcome::Failed { message } => {
                    write!(out, "\n[{}]\n\nYou: ", error_marker(message))?;
                }
                TurnOutcome::Interrupted { error } => {
                    write!(out, "\n[{}]\n\nYou: ", error_marker(&error.to_string()))?;
                }
            },
            TurnEvent::Rejected { reason, .. } => match reason {
                TurnRejection::EmptyInput => {}
                TurnRejection::InFlight | TurnRejection::TurnPending => {
                    writeln!(out, "\n(still answering, wait for the question to finish)")?;
                }
                other => writeln!(out, "\n({other})")?,
            },
        }
        out.flush()
    }
}

/// What the input loop should do with one line of stdin.
#[derive(Debug, PartialEq, Eq)]
enum LineAction {
    Quit,
    Send(TurnCommand),
}

/// Exit bookkeeping for the interview loop. Commands count as pending from
/// the moment they are sent until the controller starts a reply for them or
/// rejects them, so closing stdin right after a line never drops that turn.
#[derive(Debug)]
struct DriverState {
    started: bool,
    pending: usize,
    streaming: bool,
    input_open: bool,
}

impl DriverState {
    fn new(interview_requested: bool) -> Self {
        Self {
            started: false,
            pending: usize::from(interview_requested),
            streaming: false,
            input_open: true,
        }
    }

    fn on_line(&self, line: String) -> LineAction {
        if QUIT_COMMANDS.contains(&line.trim()) {
            LineAction::Quit
        } else if self.started {
            LineAction::Send(TurnCommand::SubmitAnswer { answer: line })
        } else {
            LineAction::Send(TurnCommand::StartInterview { job_title: line })
        }
    }

    fn on_sent(&mut self) {
        self.pending += 1;
    }

    fn on_input_closed(&mut self) {
        self.input_open = false;
    }

    fn on_event(&mut self, event: &TurnEvent) {
        match event {
            TurnEvent::ReplyStarted { .. } => {
                self.started = true;
                self.streaming = true;
                self.pending = self.pending.saturating_sub(1);
            }
            TurnEvent::Rejected { .. } => self.pending = self.pending.saturating_sub(1),
            TurnEvent::ReplyFinished { .. } => self.streaming = false,
            TurnEvent::AnswerRecorded { .. } | TurnEvent::ReplyUpdated { .. } => {}
        }
    }

    /// True once stdin is closed and nothing sent is still owed a reply.
    fn is_done(&self) -> bool {
        !self.input_open && !self.streaming && self.pending == 0
    }
}

/// Runs one interview until stdin closes or the user quits.
pub async fn run_interview(client: RelayClient, job_title: Option<String>) -> Result<()> {
    println!("Mock interview via {}", client.base_url());
    println!("Type your answers and press Enter. /quit to leave.");

    let mut controller = spawn_controller(client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view = ReplyView::default();
    let mut stdout = io::stdout();
    let mut state = DriverState::new(job_title.is_some());

    match job_title {
        Some(job_title) => controller.send(TurnCommand::StartInterview { job_title }).await?,
        None => {
            print!("Job title: ");
            stdout.flush()?;
        }
    }

    loop {
        tokio::select! {
            line = lines.next_line(), if state.input_open => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    state.on_input_closed();
                    if state.is_done() {
                        break;
                    }
                    continue;
                };
                match state.on_line(line) {
                    LineAction::Quit => break,
                    LineAction::Send(command) => {
                        controller.send(command).await?;
                        state.on_sent();
                    }
                }
            }
            event = controller.next_event() => {
                let Some(event) = event else {
                    break;
                };
                state.on_event(&event);
                view.render(&event, &mut stdout)?;
                if state.is_done() {
                    break;
                }
            }
        }
    }

    println!();
    let session = controller.shutdown().await?;
    tracing::info!(
        session = %session.id(),
        utterances = session.transcript().len(),
        "interview ended"
    );
    Ok(())
}

/// Streams one generic chat reply to stdout.
pub async fn run_chat(client: RelayClient, message: &str) -> Result<()> {
    let mut events = client.stream_chat(message);
    let mut view = ReplyView::default();
    let mut stdout = io::stdout();

    while let Some(event) = events.next().await {
        match event? {
            ConsumerEvent::Update { text } => view.show_growth(&text, &mut stdout)?,
            ConsumerEvent::Completed { text } => {
                view.show_growth(&text, &mut stdout)?;
                writeln!(stdout)?;
                return Ok(());
            }
            ConsumerEvent::Failed { message } => {
                anyhow::bail!("relay reported an error: {message}")
            }
        }
        stdout.flush()?;
    }
    Ok(())
}
