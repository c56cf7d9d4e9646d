mod common;

use common::{finished_event, quick_success, Harness, Script, ScriptedExtractor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vidqueue::queue::{EntryStatus, QueueEvent, StatusState};
use vidqueue::TaskEvent;

const A: &str = "https://videos.test/a";
const B: &str = "https://videos.test/b";

fn queue_stopped() -> QueueEvent {
    QueueEvent::QueueFinished {
        message: "Queue stopped.".into(),
        state: StatusState::Warning,
    }
}

#[tokio::test]
async fn stop_cancels_the_active_item_and_halts_the_queue() {
    let extractor = ScriptedExtractor::new(quick_success()).with(A, Script::UntilCanceled);
    let mut h = Harness::new(extractor);
    h.controller.enqueue([A, B], "Best (Video + Audio)").unwrap();
    h.controller.start().unwrap();

    loop {
        let msg = h.pump().await;
        if matches!(msg.event, TaskEvent::Progress { .. }) {
            break;
        }
    }
    h.controller.request_stop();
    assert!(h.controller.is_stop_requested());
    h.run_to_idle().await;

    assert_eq!(h.statuses(), vec![EntryStatus::Canceled, EntryStatus::Queued]);
    // Canceled entries keep the last progress they reached
    assert_eq!(h.controller.entries()[0].progress_text, "30.0%");
    assert!(!h.controller.has_live_task());
    assert_eq!(h.extractor.downloads().len(), 1);

    let events = h.events();
    assert!(events.contains(&QueueEvent::Status {
        message: "Cancelling current item...".into(),
        state: StatusState::Warning,
    }));
    assert!(events.contains(&QueueEvent::Log {
        line: "Cancel requested...".into()
    }));
    assert!(events.contains(&QueueEvent::Log {
        line: "[Item 1] Download canceled.".into()
    }));
    assert_eq!(finished_event(&events), Some(&queue_stopped()));
}

#[tokio::test]
async fn stop_after_the_task_already_failed_leaves_it_failed() {
    let extractor = ScriptedExtractor::new(quick_success())
        .with(A, Script::FailInfo("ERROR: HTTP Error 403: Forbidden".into()));
    let mut h = Harness::new(extractor);
    h.controller.enqueue([A, B], "Best (Video + Audio)").unwrap();
    h.controller.start().unwrap();

    // The task finishes before the owner gets to see it
    let mut pending = Vec::new();
    loop {
        let msg = h.next_message().await;
        let finished = matches!(msg.event, TaskEvent::Finished { .. });
        pending.push(msg);
        if finished {
            break;
        }
    }
    assert_eq!(h.statuses()[0], EntryStatus::Downloading);

    h.controller.request_stop();
    for msg in pending {
        h.controller.handle_task_message(msg);
    }
    h.run_to_idle().await;

    assert_eq!(h.statuses(), vec![EntryStatus::Failed, EntryStatus::Queued]);
    assert_eq!(h.controller.entries()[0].progress_text, "0%");
    assert_eq!(finished_event(&h.events()), Some(&queue_stopped()));

    // Nothing else gets started
    let quiet = tokio::time::timeout(Duration::from_millis(50), h.task_rx.recv()).await;
    assert!(quiet.is_err());
    assert_eq!(h.extractor.downloads().len(), 0);
}

#[tokio::test]
async fn any_error_after_cancel_counts_as_canceled() {
    let release = Arc::new(Notify::new());
    let extractor = ScriptedExtractor::new(quick_success()).with(
        A,
        Script::Hang(release.clone(), "ERROR: connection reset by peer".into()),
    );
    let mut h = Harness::new(extractor);
    h.controller.enqueue([A], "Best (Video + Audio)").unwrap();
    h.controller.start().unwrap();

    loop {
        let msg = h.pump().await;
        if msg.event == TaskEvent::Log("Starting download...".into()) {
            break;
        }
    }
    h.controller.request_stop();
    release.notify_one();
    h.run_to_idle().await;

    assert_eq!(h.statuses(), vec![EntryStatus::Canceled]);
    assert!(!h
        .log_lines()
        .iter()
        .any(|line| line.contains("connection reset")));
}

#[tokio::test]
async fn queue_can_be_restarted_after_a_stop() {
    let extractor = ScriptedExtractor::new(quick_success()).with(A, Script::UntilCanceled);
    let mut h = Harness::new(extractor);
    h.controller.enqueue([A, B], "Best (Video + Audio)").unwrap();
    h.controller.start().unwrap();

    loop {
        if matches!(h.pump().await.event, TaskEvent::Progress { .. }) {
            break;
        }
    }
    h.controller.request_stop();
    h.run_to_idle().await;
    assert!(!h.controller.is_stop_requested());

    h.controller.start().unwrap();
    h.run_to_idle().await;
    assert_eq!(h.statuses(), vec![EntryStatus::Canceled, EntryStatus::Done]);

    assert_eq!(h.controller.clear_finished(), Ok(2));
    assert!(h.controller.entries().is_empty());
}

#[tokio::test]
async fn second_stop_is_harmless() {
    let extractor = ScriptedExtractor::new(quick_success()).with(A, Script::UntilCanceled);
    let mut h = Harness::new(extractor);
    h.controller.enqueue([A, B], "Best (Video + Audio)").unwrap();
    h.controller.start().unwrap();

    h.controller.request_stop();
    h.controller.request_stop();
    h.run_to_idle().await;

    assert_eq!(h.statuses(), vec![EntryStatus::Canceled, EntryStatus::Queued]);
    let cancel_lines = h
        .log_lines()
        .into_iter()
        .filter(|line| line == "Cancel requested...")
        .count();
    assert_eq!(cancel_lines, 1);

    h.controller.request_stop();
    assert!(!h.controller.is_stop_requested());
}
