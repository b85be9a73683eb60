use crate::support::{GatewayTestServer, ScriptedProvider};
use interview_relay::client::RelayClient;
use interview_relay::error::{StreamError, TurnRejection};
use interview_relay::interview::{
    ControllerHandle, Role, TurnCommand, TurnEvent, TurnOutcome, UtteranceStatus,
    spawn_controller,
};
use std::time::Duration;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn next_event(controller: &mut ControllerHandle) -> TurnEvent {
    tokio::time::timeout(EVENT_TIMEOUT, controller.next_event())
        .await
        .expect("controller should emit an event in time")
        .expect("controller should still be running")
}

/// Collects events up to and including the next `ReplyFinished`.
async fn until_finished(controller: &mut ControllerHandle) -> (Vec<TurnEvent>, TurnOutcome) {
    let mut seen = Vec::new();
    loop {
        match next_event(controller).await {
            TurnEvent::ReplyFinished { outcome, .. } => return (seen, outcome),
            other => seen.push(other),
        }
    }
}

async fn start(controller: &ControllerHandle, job_title: &str) {
    controller
        .send(TurnCommand::StartInterview {
            job_title: job_title.into(),
        })
        .await
        .expect("controller should accept commands");
}

async fn answer(controller: &ControllerHandle, text: &str) {
    controller
        .send(TurnCommand::SubmitAnswer {
            answer: text.into(),
        })
        .await
        .expect("controller should accept commands");
}

#[tokio::test]
async fn backend_engineer_interview_end_to_end() {
    let provider = ScriptedProvider::new(vec![
        vec![Ok("Tell"), Ok(" me"), Ok(" about...")],
        vec![Ok("Which"), Ok(" crates?")],
    ]);
    let server = GatewayTestServer::start(provider.clone()).await;
    let mut controller = spawn_controller(RelayClient::new(&server.base_url(), 10));

    start(&controller, "Backend Engineer").await;
    let (events, outcome) = until_finished(&mut controller).await;
    assert!(matches!(
        events.first(),
        Some(TurnEvent::ReplyStarted {
            is_first_turn: true,
            ..
        })
    ));
    let updates: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            TurnEvent::ReplyUpdated { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec!["Tell", "Tell me", "Tell me about..."]);
    assert_eq!(
        outcome,
        TurnOutcome::Completed {
            text: "Tell me about...".into()
        }
    );

    answer(&controller, "Five years of Rust services").await;
    assert_eq!(
        next_event(&mut controller).await,
        TurnEvent::AnswerRecorded {
            text: "Five years of Rust services".into()
        }
    );
    let (_, outcome) = until_finished(&mut controller).await;
    assert!(outcome.is_success());

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    let follow_up = &prompts[1];
    let at_original = follow_up
        .find(&prompts[0])
        .expect("follow-up should embed the original instructions");
    let at_question = follow_up.find("Model: Tell me about...").unwrap();
    let at_answer = follow_up.find("User: Five years of Rust services").unwrap();
    assert!(at_original < at_question && at_question < at_answer);

    let session = controller.shutdown().await.unwrap();
    assert!(!session.is_in_flight());
    let roles: Vec<_> = session.transcript().iter().map(|u| u.role).collect();
    assert_eq!(roles, vec![Role::Model, Role::User, Role::Model]);
    assert!(session.transcript().iter().all(|u| u.status == UtteranceStatus::Sealed));
    assert_eq!(session.transcript().last().unwrap().text, "Which crates?");
}

#[tokio::test]
async fn answer_during_stream_is_rejected_and_not_relayed() {
    let provider = ScriptedProvider::new(vec![
        vec![Ok("Tell"), Ok(" me"), Ok(" more")],
        vec![Ok("Next")],
    ])
    .with_fragment_delay(Duration::from_millis(50));
    let server = GatewayTestServer::start(provider.clone()).await;
    let mut controller = spawn_controller(RelayClient::new(&server.base_url(), 10));

    start(&controller, "Data Analyst").await;
    assert!(matches!(
        next_event(&mut controller).await,
        TurnEvent::ReplyStarted { .. }
    ));

    answer(&controller, "impatient answer").await;
    let (events, outcome) = until_finished(&mut controller).await;
    assert!(events.iter().any(|event| matches!(
        event,
        TurnEvent::Rejected {
            reason: TurnRejection::InFlight,
            ..
        }
    )));
    assert!(outcome.is_success());
    assert_eq!(provider.prompts().len(), 1);

    answer(&controller, "patient answer").await;
    let (_, outcome) = until_finished(&mut controller).await;
    assert!(outcome.is_success());
    assert_eq!(provider.prompts().len(), 2);
    assert!(!provider.prompts()[1].contains("impatient answer"));

    let session = controller.shutdown().await.unwrap();
    assert_eq!(session.transcript().len(), 3);
}

#[tokio::test]
async fn upstream_error_marks_reply_and_allows_retry() {
    let provider = ScriptedProvider::new(vec![
        vec![Ok("Tell me")],
        vec![Ok("Half"), Err("boom")],
        vec![Ok("Recovered")],
    ]);
    let server = GatewayTestServer::start(provider.clone()).await;
    let mut controller = spawn_controller(RelayClient::new(&server.base_url(), 10));

    start(&controller, "Nurse").await;
    until_finished(&mut controller).await;

    answer(&controller, "Ten years on wards").await;
    let (_, outcome) = until_finished(&mut controller).await;
    match outcome {
        TurnOutcome::Failed { message } => assert!(message.contains("boom")),
        other => panic!("expected Failed outcome, got {other:?}"),
    }

    answer(&controller, "Ten years on wards").await;
    let (_, outcome) = until_finished(&mut controller).await;
    assert!(outcome.is_success());
    assert!(!provider.prompts()[2].contains("boom"));

    let session = controller.shutdown().await.unwrap();
    let failed: Vec<_> = session
        .transcript()
        .iter()
        .filter(|u| u.is_failed())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].text.contains("boom"));
    assert!(!session.is_in_flight());
}

#[tokio::test]
async fn unreachable_relay_interrupts_turn() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut controller = spawn_controller(RelayClient::new(&format!("http://{addr}"), 2));
    start(&controller, "Chef").await;

    let (_, outcome) = until_finished(&mut controller).await;
    assert!(matches!(
        outcome,
        TurnOutcome::Interrupted {
            error: StreamError::Transport(_)
        }
    ));

    let session = controller.shutdown().await.unwrap();
    assert!(!session.is_in_flight());
    let reply = session.transcript().last().unwrap();
    assert!(reply.is_failed());
    assert!(reply.text.starts_with("Error: "));
}
