//! Deep reset flow: confirmation, start, and the polling session
//!
//! Timer-driven tests run on a paused clock so the 2.5 s poll interval and
//! 1.2 s redirect delay elapse instantly and deterministically.


use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

use ayursync_core::operation::{TRIGGER_BUSY_LABEL, TRIGGER_IDLE_LABEL};
use ayursync_core::{
    start_deep_reset, ApiClient, ApiConfig, ApiError, ConfirmError, DeepResetController,
    Destination, GateError, HttpResponse, LogLine, MonitorConfig, MonitorEvent, OperationStatus,
    PollingSession, SessionOutcome, SessionStore, StartAck, StepEntry,
};
use test_utils::{ScriptedAdminApi, ScriptedTransport};

const POLL: Duration = Duration::from_millis(2500);
const REDIRECT: Duration = Duration::from_millis(1200);

async fn drain(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later - earlier;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(50),
        "expected a gap of {:?}, got {:?}",
        expected,
        gap
    );
}

// ----------------------------------------------------------------------------
// Polling Session
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_progress_sequence_until_completed() {
    let api = Arc::new(ScriptedAdminApi::new().with_statuses(vec![
        Ok(OperationStatus::running(0.2)),
        Ok(OperationStatus::running(0.6)),
        Ok(OperationStatus::completed()),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let started = Instant::now();

    let handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;
    let finished = Instant::now();

    let widths: Vec<String> = events
        .iter()
        .filter_map(|e| e.view().map(|v| v.width_label()))
        .collect();
    assert_eq!(widths, vec!["20%", "60%", "100%"]);
    assert!(matches!(events[2], MonitorEvent::Completed(_)));
    assert_eq!(events[3], MonitorEvent::Navigate(Destination::NewSuggestions));
    assert_eq!(events.len(), 4);

    let calls = api.status_call_times();
    assert_eq!(calls.len(), 3);
    assert_gap(calls[0], calls[1], POLL);
    assert_gap(calls[1], calls[2], POLL);
    assert_gap(started, finished, POLL * 2 + REDIRECT);

    assert_eq!(handle.join().await, SessionOutcome::Completed);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.status_call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_error_stops_polling() {
    let api = Arc::new(
        ScriptedAdminApi::new().with_statuses(vec![Ok(OperationStatus::failed("disk full"))]),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        MonitorEvent::Failed { message, view } => {
            assert!(message.contains("disk full"));
            assert_eq!(view.lines.last(), Some(&LogLine::Error("disk full".into())));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(handle.join().await, SessionOutcome::Failed("disk full".into()));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.status_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_null_step_fields_still_complete_session() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Ok(HttpResponse::json(
        200,
        &json!({"state": null, "progress": 0.5, "steps": [{"ts": null, "msg": "Seeding"}]}),
    )));
    transport.push(Ok(HttpResponse::json(
        200,
        &json!({
            "state": "completed",
            "progress": 1.0,
            "steps": [{"ts": null, "msg": "Seeding"}, {"ts": "2025-09-01T10:00:09", "msg": null}]
        }),
    )));
    let client = ApiClient::with_transport(
        transport.clone(),
        ApiConfig::new("http://backend.test/api"),
        SessionStore::in_memory(Some("tok".into())),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(Arc::new(client), MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;

    assert!(matches!(events[0], MonitorEvent::Progress(_)));
    match &events[1] {
        MonitorEvent::Completed(view) => assert_eq!(
            view.lines,
            vec![
                LogLine::Step(" - Seeding".into()),
                LogLine::Step("10:00:09 - ".into()),
                LogLine::Done,
            ]
        ),
        other => panic!("expected Completed, got {:?}", other),
    }
    assert_eq!(events[2], MonitorEvent::Navigate(Destination::NewSuggestions));
    assert_eq!(handle.join().await, SessionOutcome::Completed);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_keeps_polling() {
    let api = Arc::new(ScriptedAdminApi::new().with_statuses(vec![
        Err(ApiError::Transport("connection reset".into())),
        Err(ApiError::Http {
            status: 502,
            detail: "An unknown error occurred (502)".into(),
        }),
        Ok(OperationStatus::completed()),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;

    // Failures are never surfaced as events.
    assert!(matches!(events[0], MonitorEvent::Completed(_)));
    assert_eq!(events.len(), 2);

    let calls = api.status_call_times();
    assert_eq!(calls.len(), 3);
    assert_gap(calls[0], calls[1], POLL);
    assert_gap(calls[1], calls[2], POLL);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_poll_abandons_session() {
    let api = Arc::new(ScriptedAdminApi::new().with_statuses(vec![
        Ok(OperationStatus::running(0.1)),
        Err(ApiError::Unauthorized),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;

    assert_eq!(
        events.last(),
        Some(&MonitorEvent::Abandoned(SessionOutcome::LoggedOut))
    );
    assert_eq!(handle.join().await, SessionOutcome::LoggedOut);
    assert_eq!(api.status_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_attempt_cap_ends_session() {
    let api = Arc::new(ScriptedAdminApi::new());
    let config = MonitorConfig {
        max_poll_attempts: Some(3),
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(api.clone(), config, tx);
    let events = drain(&mut rx).await;

    let progress = events
        .iter()
        .filter(|e| matches!(e, MonitorEvent::Progress(_)))
        .count();
    assert_eq!(progress, 3);
    assert_eq!(
        events.last(),
        Some(&MonitorEvent::Abandoned(SessionOutcome::AttemptsExhausted {
            attempts: 3
        }))
    );
    assert_eq!(
        handle.join().await,
        SessionOutcome::AttemptsExhausted { attempts: 3 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_scheduling() {
    let api = Arc::new(ScriptedAdminApi::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    let first = rx.recv().await;
    assert!(matches!(first, Some(MonitorEvent::Progress(_))));

    handle.cancel();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(api.status_call_count(), 1);
    assert!(rx.recv().await.is_none());
    assert_eq!(handle.join().await, SessionOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_tears_session_down() {
    let api = Arc::new(ScriptedAdminApi::new());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = PollingSession::spawn(api.clone(), MonitorConfig::default(), tx);
    rx.recv().await;
    drop(handle);
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(api.status_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cumulative_log_is_replaced_not_appended() {
    let first_steps = vec![StepEntry::new("2025-09-01T10:00:00", "Truncating")];
    let mut second_steps = first_steps.clone();
    second_steps.push(StepEntry::new("2025-09-01T10:00:04", "<Discovery>"));

    let api = Arc::new(ScriptedAdminApi::new().with_statuses(vec![
        Ok(OperationStatus::running(0.3).with_steps(first_steps)),
        Ok(OperationStatus::running(0.5).with_steps(second_steps.clone())),
        Ok(OperationStatus::completed().with_steps(second_steps)),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _handle = PollingSession::spawn(api, MonitorConfig::default(), tx);
    let events = drain(&mut rx).await;

    let line_counts: Vec<usize> = events
        .iter()
        .filter_map(|e| e.view().map(|v| v.lines.len()))
        .collect();
    assert_eq!(line_counts, vec![1, 2, 3]);

    let last = events[2].view().unwrap();
    assert_eq!(
        last.lines,
        vec![
            LogLine::Step("10:00:00 - Truncating".into()),
            LogLine::Step("10:00:04 - &lt;Discovery&gt;".into()),
            LogLine::Done,
        ]
    );
}

// ----------------------------------------------------------------------------
// Controller
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_accepted_start_disables_trigger_and_polls() {
    let api = Arc::new(ScriptedAdminApi::accepting().with_statuses(vec![
        Ok(OperationStatus::running(0.5)),
        Ok(OperationStatus::completed()),
    ]));
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    controller.open_gate().unwrap().set_input("reset all");
    controller.confirm(tx).await.unwrap();

    assert!(!controller.is_gate_open());
    assert!(!controller.trigger().is_enabled());
    assert_eq!(controller.trigger().label(), TRIGGER_BUSY_LABEL);
    assert_eq!(api.start_call_count(), 1);
    assert!(matches!(
        controller.open_gate(),
        Err(GateError::TriggerDisabled)
    ));

    while let Some(event) = rx.recv().await {
        controller.observe(&event);
        if let MonitorEvent::Completed(_) = event {
            assert!(controller.trigger().is_enabled());
            assert_eq!(controller.trigger().label(), TRIGGER_IDLE_LABEL);
        }
    }
    assert_eq!(api.status_call_count(), 2);
}

#[tokio::test]
async fn test_rejected_start_keeps_gate_for_retry() {
    let api = Arc::new(ScriptedAdminApi::new());
    api.push_start(Ok(StartAck {
        status: Some("rejected".into()),
        message: None,
    }));
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();

    controller.open_gate().unwrap().set_input("RESET ALL");
    let err = controller.confirm(tx).await.unwrap_err();

    assert!(matches!(
        err,
        ConfirmError::Start(ApiError::UnexpectedResponse(_))
    ));
    let gate = controller.gate().expect("gate stays open");
    assert_eq!(gate.input(), "RESET ALL");
    assert!(!gate.is_busy());
    assert!(gate.is_confirm_enabled());
    assert!(controller.trigger().is_enabled());
    assert!(!controller.is_polling());
    assert_eq!(api.status_call_count(), 0);
}

#[tokio::test]
async fn test_network_error_on_start_then_retry_succeeds() {
    let api = Arc::new(ScriptedAdminApi::new());
    api.push_start(Err(ApiError::Transport("connection refused".into())));
    api.push_start(Ok(StartAck {
        status: Some("accepted".into()),
        message: None,
    }));
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();

    controller.open_gate().unwrap().set_input("reset all");
    let err = controller.confirm(tx.clone()).await.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(api.start_call_count(), 1);

    controller.confirm(tx).await.unwrap();
    assert_eq!(api.start_call_count(), 2);
    assert!(!controller.trigger().is_enabled());
    controller.teardown();
    assert!(controller.trigger().is_enabled());
}

#[tokio::test]
async fn test_gate_is_reused_and_cancel_has_no_side_effects() {
    let api = Arc::new(ScriptedAdminApi::accepting());
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());

    controller.open_gate().unwrap().set_input("RESET");
    let reopened = controller.open_gate().unwrap();
    assert_eq!(reopened.input(), "RESET");

    controller.cancel_gate();
    assert!(!controller.is_gate_open());
    assert_eq!(controller.open_gate().unwrap().input(), "");
    assert_eq!(api.start_call_count(), 0);
}

#[tokio::test]
async fn test_confirm_refused_without_phrase() {
    let api = Arc::new(ScriptedAdminApi::accepting());
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();

    let err = controller.confirm(tx.clone()).await.unwrap_err();
    assert!(matches!(err, ConfirmError::Gate(GateError::NotOpen)));

    controller.open_gate().unwrap().set_input("RESET");
    let err = controller.confirm(tx).await.unwrap_err();
    assert!(matches!(err, ConfirmError::Gate(GateError::PhraseMismatch)));
    assert_eq!(api.start_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_on_spawned_task_then_finish() {
    let api = Arc::new(
        ScriptedAdminApi::new().with_statuses(vec![Ok(OperationStatus::completed())]),
    );
    api.push_start(Err(ApiError::Transport("timed out".into())));
    api.push_start(Ok(StartAck {
        status: Some("accepted".into()),
        message: None,
    }));
    let mut controller = DeepResetController::new(api.clone(), MonitorConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel();

    controller.open_gate().unwrap().set_input("RESET ALL");
    controller.begin_confirm().unwrap();
    let backend = controller.api();
    let result = tokio::spawn(async move { start_deep_reset(backend.as_ref()).await })
        .await
        .unwrap();
    // The gate stays busy until the result is applied
    assert!(controller.gate().unwrap().is_busy());
    let err = controller.finish_start(result, tx.clone()).unwrap_err();
    assert!(matches!(err, ConfirmError::Start(ApiError::Transport(_))));
    assert_eq!(controller.gate().unwrap().input(), "RESET ALL");
    assert!(controller.trigger().is_enabled());

    controller.begin_confirm().unwrap();
    let backend = controller.api();
    let result = tokio::spawn(async move { start_deep_reset(backend.as_ref()).await })
        .await
        .unwrap();
    controller.finish_start(result, tx).unwrap();
    assert!(!controller.is_gate_open());
    assert!(!controller.trigger().is_enabled());
    assert_eq!(api.start_call_count(), 2);

    let events = drain(&mut rx).await;
    assert!(matches!(events[0], MonitorEvent::Completed(_)));
}

#[tokio::test]
async fn test_finish_start_requires_busy_gate() {
    let api = Arc::new(ScriptedAdminApi::accepting());
    let mut controller = DeepResetController::new(api, MonitorConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();
    let ack = || {
        Ok(StartAck {
            status: Some("accepted".into()),
            message: None,
        })
    };

    let err = controller.finish_start(ack(), tx.clone()).unwrap_err();
    assert!(matches!(err, ConfirmError::Gate(GateError::NotOpen)));

    controller.open_gate().unwrap().set_input("RESET ALL");
    let err = controller.finish_start(ack(), tx).unwrap_err();
    assert!(matches!(err, ConfirmError::Gate(GateError::PhraseMismatch)));
    assert!(!controller.is_polling());
}
