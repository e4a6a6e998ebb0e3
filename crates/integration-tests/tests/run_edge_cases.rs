//! Edge cases around the run lifecycle: cancellation, idempotent submission,
//! status read failures and concurrent runs.

use std::sync::Arc;
use std::time::Duration;

use kb_sync_core::application::{
    cancel_channel, Orchestrator, OrchestratorSettings, PollSettings, RetryPolicy,
};
use kb_sync_core::domain::{JobRequest, RemoteError, RunOutcome};
use kb_sync_core::port::id_provider::mocks::SequentialIdProvider;
use kb_sync_core::port::ingestion_service::mocks::ScriptedIngestionService;
use kb_sync_core::port::time_provider::mocks::ManualTimeProvider;
use tokio_test::{assert_err, assert_ok};

fn request() -> JobRequest {
    JobRequest::new("KB12345678", "DS12345678").unwrap()
}

fn orchestrator(
    service: Arc<ScriptedIngestionService>,
    clock: Arc<ManualTimeProvider>,
    settings: OrchestratorSettings,
) -> Orchestrator {
    Orchestrator::new(
        service,
        clock,
        Arc::new(SequentialIdProvider::new("kb-sync")),
        settings,
    )
}

#[test]
fn test_blank_identifiers_rejected() {
    assert_err!(JobRequest::new("", "DS1"));
    assert_err!(JobRequest::new("KB1", "   "));
}

/// Retried submission carries one client token, so the service sees a single logical request
#[tokio::test]
async fn test_retried_submission_reuses_client_token() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
    service
        .push_start_err(RemoteError::transport("RequestTimeout"))
        .push_start_ok("job-1");
    service.push_status("COMPLETE");

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    let outcome = assert_ok!(orch.run(&request()).await);
    assert!(outcome.is_success());

    let calls = service.start_calls();
    let token = calls[0].client_token.clone().unwrap();
    assert!(token.len() >= 33);
    assert!(calls.iter().all(|c| c.client_token.as_deref() == Some(token.as_str())));
}

/// Separate runs never share a client token
#[tokio::test]
async fn test_each_run_gets_fresh_token() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
    service.repeat_status("COMPLETE");

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    assert_ok!(orch.run(&request()).await);
    assert_ok!(orch.run(&request()).await);

    let calls = service.start_calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].client_token, calls[1].client_token);
}

/// A failed status read ends the run with the default policy
#[tokio::test]
async fn test_status_read_failure_is_fatal_by_default() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
    service.push_start_ok("job-1");
    service
        .push_status("STARTING")
        .push_status_err(RemoteError::transport("connection reset"))
        .push_status("COMPLETE");

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    let outcome = assert_ok!(orch.run(&request()).await);

    match outcome {
        RunOutcome::PollFailed {
            handle,
            cause,
            last_snapshot,
            ..
        } => {
            assert_eq!(handle.as_str(), "job-1");
            assert!(cause.is_retryable());
            assert_eq!(last_snapshot.unwrap().status.as_str(), "STARTING");
        }
        other => panic!("expected PollFailed, got {:?}", other),
    }
    assert_eq!(service.status_call_count(), 2);
}

/// With read retry enabled the same failure is absorbed
#[tokio::test]
async fn test_status_read_retry_when_enabled() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
    service
        .push_status("STARTING")
        .push_status_err(RemoteError::transport("connection reset"))
        .push_status("COMPLETE");

    let settings = OrchestratorSettings {
        poll: PollSettings {
            read_retry: RetryPolicy::new(3, Duration::from_secs(2), 2.0),
            ..PollSettings::default()
        },
        ..OrchestratorSettings::default()
    };
    let orch = orchestrator(service.clone(), clock, settings);
    let outcome = assert_ok!(orch.run(&request()).await);

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(service.status_call_count(), 3);
}

/// Unknown statuses keep the loop going
#[tokio::test]
async fn test_unknown_status_is_not_terminal() {
    let clock = Arc::new(ManualTimeProvider::new(0));
    let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
    service
        .push_status("STOPPING")
        .push_status("SOMETHING_NEW")
        .push_status("STOPPED");

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    let outcome = assert_ok!(orch.run(&request()).await);

    assert!(matches!(outcome, RunOutcome::Stopped(_)));
    assert_eq!(service.status_call_count(), 3);
}

/// Cancel while the poller is sleeping between reads
#[tokio::test]
async fn test_cancel_mid_poll() {
    let clock = Arc::new(ManualTimeProvider::frozen(0));
    let service = Arc::new(ScriptedIngestionService::new());
    service.push_start_ok("job-1");
    service.repeat_status("IN_PROGRESS");

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    let (cancel_tx, cancel) = cancel_channel();

    let run = tokio::spawn(async move { orch.run_with_cancel(&request(), &cancel).await });

    while service.status_call_count() == 0 {
        tokio::task::yield_now().await;
    }
    cancel_tx.cancel();

    let outcome = assert_ok!(run.await.unwrap());
    match outcome {
        RunOutcome::Cancelled {
            handle,
            last_snapshot,
            ..
        } => {
            assert_eq!(handle.unwrap().as_str(), "job-1");
            assert_eq!(last_snapshot.unwrap().status.as_str(), "IN_PROGRESS");
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
}

/// Cancel during the submission backoff: no job handle, no status reads
#[tokio::test]
async fn test_cancel_during_submission_backoff() {
    let clock = Arc::new(ManualTimeProvider::frozen(0));
    let service = Arc::new(ScriptedIngestionService::new());
    service.push_start_err(RemoteError::transport("ThrottlingException"));

    let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());
    let (cancel_tx, cancel) = cancel_channel();

    let run = tokio::spawn(async move { orch.run_with_cancel(&request(), &cancel).await });

    while service.start_call_count() == 0 {
        tokio::task::yield_now().await;
    }
    cancel_tx.cancel();

    let outcome = assert_ok!(run.await.unwrap());
    assert!(matches!(outcome, RunOutcome::Cancelled { handle: None, .. }));
    assert_eq!(service.start_call_count(), 1);
    assert_eq!(service.status_call_count(), 0);
}

/// Independent runs share nothing: each keeps its own handle
#[tokio::test]
async fn test_concurrent_runs_keep_their_handles() {
    let mut tasks = Vec::new();
    for i in 0..4 {
        let clock = Arc::new(ManualTimeProvider::new(0));
        let service = Arc::new(ScriptedIngestionService::new().with_clock(clock.clone()));
        service.push_start_ok(format!("job-{}", i));
        service
            .push_status("IN_PROGRESS")
            .push_status("COMPLETE");
        let orch = orchestrator(service.clone(), clock, OrchestratorSettings::default());

        tasks.push(tokio::spawn(async move {
            let outcome = orch.run(&request()).await;
            (i, service, outcome)
        }));
    }

    for task in tasks {
        let (i, service, outcome) = task.await.unwrap();
        let outcome = assert_ok!(outcome);
        let expected = format!("job-{}", i);
        assert_eq!(outcome.handle().unwrap().as_str(), expected);
        assert!(service
            .status_calls()
            .iter()
            .all(|c| c.job_id.as_str() == expected));
    }
}
