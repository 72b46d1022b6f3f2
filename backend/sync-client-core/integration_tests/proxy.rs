use crate::helpers::{MockBinder, MockEngine, RecordingSink, sample_result, transport_error};

use sync_client_core::error::ProxyError;
use sync_client_core::proxy::{BindRequest, ConnectionStatus, SyncServiceProxy};
use sync_client_core::{SYNC_SERVICE_CLASS, SYNC_SERVICE_PACKAGE};

use models::{SyncAttachmentState, SyncProgressState, SyncStatus};

use std::sync::Arc;
use std::thread;

fn proxy_with(binder: &Arc<MockBinder>, sink: &Arc<RecordingSink>) -> SyncServiceProxy {
    SyncServiceProxy::new(binder.clone()).with_diagnostics(sink.clone())
}

/// Runs every delegated operation against `proxy` with `app_name`.
fn all_operations(proxy: &SyncServiceProxy, app_name: &str) -> Vec<(&'static str, ProxyError)> {
    let mut errors = Vec::new();
    if let Err(e) = proxy.start_sync(app_name, SyncAttachmentState::Sync) {
        errors.push(("start_sync", e));
    }
    if let Err(e) = proxy.reset_server(app_name, SyncAttachmentState::None) {
        errors.push(("reset_server", e));
    }
    if let Err(e) = proxy.get_status(app_name) {
        errors.push(("get_status", e));
    }
    if let Err(e) = proxy.get_progress(app_name) {
        errors.push(("get_progress", e));
    }
    if let Err(e) = proxy.get_update_message(app_name) {
        errors.push(("get_update_message", e));
    }
    if let Err(e) = proxy.get_sync_result(app_name) {
        errors.push(("get_sync_result", e));
    }
    errors
}

/// **VALUE**: Verifies that an empty namespace fails every operation with InvalidArgument,
/// in every connection state, without reaching the engine.
///
/// **WHY THIS MATTERS**: The engine keys sessions by namespace. An empty one must never
/// leave the process, and the check must not depend on being connected.
///
/// **BUG THIS CATCHES**: Would catch validation running after the connection check
/// (reporting NotConnected instead) or an operation that skips validation.
#[test]
fn given_empty_app_name_when_any_operation_then_invalid_argument_and_engine_untouched() {
    // GIVEN: An unbound proxy and a bound proxy
    let sink = RecordingSink::new();
    let unbound = proxy_with(&MockBinder::new(), &sink);

    let engine = MockEngine::new();
    let binder = MockBinder::new();
    *binder.connect_with.lock().unwrap() = Some(engine.handle());
    let bound = proxy_with(&binder, &sink);
    bound.request_bind().unwrap();

    for proxy in [&unbound, &bound] {
        let state_before = proxy.state();

        // WHEN: Every operation is called with an empty or blank namespace
        for app_name in ["", "   "] {
            let errors = all_operations(proxy, app_name);

            // THEN: All six fail with InvalidArgument
            assert_eq!(errors.len(), 6);
            for (operation, error) in errors {
                assert!(
                    matches!(error, ProxyError::InvalidArgument { .. }),
                    "{operation} should fail with InvalidArgument, got {error:?}"
                );
            }
        }

        // THEN: State unchanged
        assert_eq!(proxy.state(), state_before);
    }

    // THEN: Engine never called, nothing reported
    assert!(engine.calls().is_empty());
    assert!(sink.reports().is_empty());
}

/// **VALUE**: Verifies that a requested bind with no callback yet leaves every operation
/// failing with NotConnected.
///
/// **WHY THIS MATTERS**: Binding is asynchronous. Callers that race ahead of the engine
/// must get a clear, retryable error rather than a hang.
///
/// **BUG THIS CATCHES**: Would catch `BindRequested` being treated as connected, or
/// NotConnected being reported as a communication failure.
#[test]
fn given_bind_requested_without_callback_when_operations_called_then_not_connected() {
    // GIVEN: A proxy whose bind is pending
    let binder = MockBinder::new();
    let sink = RecordingSink::new();
    let proxy = proxy_with(&binder, &sink);
    proxy.request_bind().unwrap();
    assert_eq!(proxy.state(), ConnectionStatus::BindRequested);
    assert!(!proxy.is_connected());

    // WHEN: Every operation is called
    let errors = all_operations(&proxy, "default");

    // THEN: All fail with NotConnected and nothing is reported as a remote failure
    assert_eq!(errors.len(), 6);
    for (operation, error) in errors {
        assert!(
            matches!(error, ProxyError::NotConnected { .. }),
            "{operation} should fail with NotConnected, got {error:?}"
        );
    }
    assert!(sink.reports().is_empty());
}

/// **VALUE**: Verifies that `request_bind()` sends the configured request once and is a
/// no-op while a bind is pending or established.
///
/// **WHY THIS MATTERS**: Each bind may launch an engine process. Repeated calls from a UI
/// must not start several.
///
/// **BUG THIS CATCHES**: Would catch a missing state check in `request_bind()`.
#[test]
fn given_pending_or_bound_when_request_bind_again_then_binder_called_once() {
    // GIVEN: A proxy with a custom bind request
    let binder = MockBinder::new();
    let request = BindRequest {
        package: "org.example.sync".to_string(),
        class_name: "org.example.sync.Engine".to_string(),
        auto_create: false,
    };
    let proxy = proxy_with(&binder, &RecordingSink::new()).with_bind_request(request.clone());

    // WHEN: Bind is requested twice, then again after connecting
    proxy.request_bind().unwrap();
    proxy.request_bind().unwrap();
    proxy.on_connected(MockEngine::new().handle());
    proxy.request_bind().unwrap();

    // THEN: The binder saw exactly one request, with the configured identity
    assert_eq!(binder.bind_count(), 1);
    assert_eq!(binder.binds.lock().unwrap()[0], request);
    assert!(proxy.is_connected());
}

/// **VALUE**: Verifies the default bind request targets the standard sync service.
#[test]
fn given_default_proxy_when_request_bind_then_targets_standard_service() {
    // GIVEN: A proxy with defaults
    let binder = MockBinder::new();
    let proxy = SyncServiceProxy::new(binder.clone());

    // WHEN: Requesting a bind
    proxy.request_bind().unwrap();

    // THEN: Standard package and class with auto-create
    let binds = binder.binds.lock().unwrap();
    assert_eq!(binds[0].package, SYNC_SERVICE_PACKAGE);
    assert_eq!(binds[0].class_name, SYNC_SERVICE_CLASS);
    assert!(binds[0].auto_create);
}

/// **VALUE**: Verifies that a bind rejected by the host reverts to Unbound and can be retried.
///
/// **WHY THIS MATTERS**: A rejected bind will never call back. Staying in BindRequested
/// would make every later `request_bind()` a no-op and the proxy unusable.
///
/// **BUG THIS CATCHES**: Would catch the state not being reverted on rejection.
#[test]
fn given_binder_rejects_when_request_bind_then_bind_error_and_unbound() {
    // GIVEN: A binder that rejects
    let binder = MockBinder::new();
    *binder.reject_bind.lock().unwrap() = true;
    let proxy = proxy_with(&binder, &RecordingSink::new());

    // WHEN: Requesting a bind
    let result = proxy.request_bind();

    // THEN: Bind error, back to Unbound
    assert!(matches!(result, Err(ProxyError::Bind { .. })));
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);

    // WHEN: The host accepts on retry
    *binder.reject_bind.lock().unwrap() = false;
    proxy.request_bind().unwrap();

    // THEN: Bind is pending
    assert_eq!(proxy.state(), ConnectionStatus::BindRequested);
}

/// **VALUE**: Verifies that each operation, once bound, returns the engine's answer unchanged.
///
/// **WHY THIS MATTERS**: This is the proxy's core job; any transformation of engine
/// answers would misreport sync state to the user.
///
/// **BUG THIS CATCHES**: Would catch an operation wired to the wrong engine method or
/// passing the wrong attachment policy.
#[test]
fn given_bound_proxy_when_operations_called_then_engine_answers_returned_verbatim() {
    // GIVEN: A bound proxy
    let engine = MockEngine::new();
    let proxy = proxy_with(&MockBinder::new(), &RecordingSink::new());
    proxy.request_bind().unwrap();
    proxy.on_connected(engine.handle());

    // WHEN: Every operation is called
    let started = proxy.start_sync("default", SyncAttachmentState::Upload).unwrap();
    let reset = proxy.reset_server("default", SyncAttachmentState::None).unwrap();
    let status = proxy.get_status("default").unwrap();
    let progress = proxy.get_progress("default").unwrap();
    let message = proxy.get_update_message("default").unwrap();
    let result = proxy.get_sync_result("default").unwrap();

    // THEN: Answers match the engine
    assert!(started);
    assert!(reset);
    assert_eq!(status, SyncStatus::Syncing);
    assert_eq!(progress, SyncProgressState::Rows);
    assert_eq!(message, "Syncing default: 3 of 5 tables");
    assert_eq!(result, sample_result());

    // THEN: Each engine method was called once with the right arguments
    assert_eq!(
        engine.calls(),
        vec![
            "synchronize_with_server:default:upload",
            "reset_server:default:none",
            "get_sync_status:default",
            "get_sync_progress:default",
            "get_sync_update_message:default",
            "get_sync_result:default",
        ]
    );
}

/// **VALUE**: Verifies that a remote failure is reported against its namespace, returned
/// unchanged, and leaves the connection state alone.
///
/// **WHY THIS MATTERS**: Callers need the engine's exact failure; operators need it in the
/// namespace's log. A transient failure must not tear down a healthy binding.
///
/// **BUG THIS CATCHES**: Would catch the error being rewritten, the report going to the
/// wrong namespace, or a failed call forcing a disconnect.
#[test]
fn given_remote_failure_when_get_status_then_logged_against_app_and_reraised_identically() {
    // GIVEN: A bound proxy whose engine fails
    let failure = transport_error("pipe closed");
    let engine = MockEngine::failing(failure.clone());
    let sink = RecordingSink::new();
    let proxy = proxy_with(&MockBinder::new(), &sink);
    proxy.request_bind().unwrap();
    proxy.on_connected(engine.handle());

    // WHEN: Querying status for app1
    let error = proxy.get_status("app1").unwrap_err();

    // THEN: Communication error carrying the identical failure
    match &error {
        ProxyError::Communication { operation, source } => {
            assert_eq!(*operation, "get_sync_status");
            assert_eq!(source, &failure);
        }
        other => panic!("Expected Communication error, got {other:?}"),
    }

    // THEN: Reported once against app1
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "app1");
    assert_eq!(reports[0].1, "get_sync_status");
    assert_eq!(reports[0].2, failure);

    // THEN: Still bound
    assert_eq!(proxy.state(), ConnectionStatus::Bound);
}

/// **VALUE**: Verifies that calls fail with NotConnected after `on_disconnected`.
///
/// **WHY THIS MATTERS**: The handle is gone once the engine disconnects. Using a stale
/// handle would send calls into a dead transport.
///
/// **BUG THIS CATCHES**: Would catch `on_disconnected()` leaving the handle in place.
#[test]
fn given_disconnected_proxy_when_operations_called_then_not_connected() {
    // GIVEN: A proxy that connected, then lost the engine
    let engine = MockEngine::new();
    let proxy = proxy_with(&MockBinder::new(), &RecordingSink::new());
    proxy.request_bind().unwrap();
    proxy.on_connected(engine.handle());
    proxy.on_disconnected();

    // WHEN: Every operation is called
    let errors = all_operations(&proxy, "default");

    // THEN: NotConnected everywhere, engine never reached
    assert_eq!(errors.len(), 6);
    assert!(
        errors
            .iter()
            .all(|(_, e)| matches!(e, ProxyError::NotConnected { .. }))
    );
    assert!(engine.calls().is_empty());
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
}

/// **VALUE**: Verifies that host callbacks apply last-write-wins.
///
/// **WHY THIS MATTERS**: The host may report connect and disconnect in quick succession;
/// the proxy must end up in whatever state was reported last.
///
/// **BUG THIS CATCHES**: Would catch callbacks being ignored outside `BindRequested`
/// (e.g. a reconnect after a disconnect being dropped).
#[test]
fn given_callback_sequence_when_applied_then_last_one_wins() {
    // GIVEN: A proxy with a pending bind
    let first = MockEngine::new();
    let second = MockEngine::new();
    let proxy = proxy_with(&MockBinder::new(), &RecordingSink::new());
    proxy.request_bind().unwrap();

    // WHEN: connected, disconnected, connected to a new engine
    proxy.on_connected(first.handle());
    proxy.on_disconnected();
    proxy.on_connected(second.handle());

    // THEN: Bound to the second engine
    assert!(proxy.is_connected());
    proxy.get_status("default").unwrap();
    assert!(first.calls().is_empty());
    assert_eq!(second.calls(), vec!["get_sync_status:default"]);

    // WHEN: Disconnected twice, then connected without a bind request
    proxy.on_disconnected();
    proxy.on_disconnected();
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
    proxy.on_connected(first.handle());

    // THEN: Bound again
    assert_eq!(proxy.state(), ConnectionStatus::Bound);
}

/// **VALUE**: Verifies that `shutdown()` releases the binding once and is idempotent.
///
/// **WHY THIS MATTERS**: Shutdown runs from drop paths and error handlers, often more than
/// once. Unbinding twice would fail or release someone else's binding.
///
/// **BUG THIS CATCHES**: Would catch `shutdown()` calling unbind while already Unbound.
#[test]
fn given_bound_proxy_when_shutdown_twice_then_unbound_once() {
    // GIVEN: A bound proxy
    let binder = MockBinder::new();
    let proxy = proxy_with(&binder, &RecordingSink::new());
    proxy.request_bind().unwrap();
    proxy.on_connected(MockEngine::new().handle());

    // WHEN: Shutting down twice
    proxy.shutdown();
    proxy.shutdown();

    // THEN: One unbind, state Unbound
    assert_eq!(binder.unbind_count(), 1);
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
    assert!(matches!(
        proxy.get_status("default"),
        Err(ProxyError::NotConnected { .. })
    ));

    // WHEN: Shutting down a proxy that never bound
    let idle_binder = MockBinder::new();
    proxy_with(&idle_binder, &RecordingSink::new()).shutdown();

    // THEN: No unbind
    assert_eq!(idle_binder.unbind_count(), 0);
}

/// **VALUE**: Verifies that a pending bind is released by `shutdown()` and can be re-armed.
///
/// **WHY THIS MATTERS**: Users cancel slow binds. The proxy must release the pending bind
/// and accept a fresh `request_bind()` afterwards.
///
/// **BUG THIS CATCHES**: Would catch shutdown only handling the bound state.
#[test]
fn given_pending_bind_when_shutdown_then_released_and_rebindable() {
    // GIVEN: A pending bind
    let binder = MockBinder::new();
    let proxy = proxy_with(&binder, &RecordingSink::new());
    proxy.request_bind().unwrap();

    // WHEN: Shutting down, then binding again
    proxy.shutdown();
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
    proxy.request_bind().unwrap();

    // THEN: Released once, second bind issued
    assert_eq!(binder.unbind_count(), 1);
    assert_eq!(binder.bind_count(), 2);
    assert_eq!(proxy.state(), ConnectionStatus::BindRequested);
}

/// **VALUE**: Verifies that an unbind failure is swallowed and still leaves the proxy Unbound.
///
/// **BUG THIS CATCHES**: Would catch shutdown panicking or staying Bound when the host
/// has already dropped the service.
#[test]
fn given_unbind_fails_when_shutdown_then_unbound_anyway() {
    // GIVEN: A bound proxy whose binder fails to unbind
    let binder = MockBinder::new();
    *binder.fail_unbind.lock().unwrap() = true;
    let proxy = proxy_with(&binder, &RecordingSink::new());
    proxy.request_bind().unwrap();
    proxy.on_connected(MockEngine::new().handle());

    // WHEN: Shutting down
    proxy.shutdown();

    // THEN: Unbound despite the failure
    assert_eq!(binder.unbind_count(), 1);
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
}

/// **VALUE**: Verifies that callbacks delivered through the binder's connection reach the proxy.
///
/// **WHY THIS MATTERS**: Real binders only ever see the `ServiceConnection`, never the proxy.
#[test]
fn given_binder_connection_when_callbacks_delivered_then_proxy_state_follows() {
    // GIVEN: A pending bind
    let binder = MockBinder::new();
    let proxy = proxy_with(&binder, &RecordingSink::new());
    proxy.request_bind().unwrap();
    let connection = binder.last_connection();
    assert_eq!(connection.id(), proxy.connection().id());

    // WHEN/THEN: Connect and disconnect through the binder's handle
    connection.on_connected(MockEngine::new().handle());
    assert!(proxy.is_connected());
    connection.on_disconnected();
    assert!(!proxy.is_connected());
}

/// **VALUE**: Verifies that callbacks may run concurrently with in-flight calls.
///
/// **WHY THIS MATTERS**: Callbacks arrive on the host's thread while callers block in
/// engine calls. Holding the state lock across a call would deadlock the callback.
///
/// **BUG THIS CATCHES**: Would catch the read lock being held for the duration of the
/// remote call.
#[test]
fn given_calls_in_flight_when_disconnect_delivered_then_no_deadlock() {
    // GIVEN: A bound proxy shared across threads
    let engine = MockEngine::new();
    let proxy = Arc::new(proxy_with(&MockBinder::new(), &RecordingSink::new()));
    proxy.request_bind().unwrap();
    proxy.on_connected(engine.handle());

    // WHEN: Callers issue calls while the host flips the connection
    let callers: Vec<_> = (0..4)
        .map(|_| {
            let proxy = Arc::clone(&proxy);
            thread::spawn(move || {
                for _ in 0..200 {
                    match proxy.get_progress("default") {
                        Ok(progress) => assert_eq!(progress, SyncProgressState::Rows),
                        Err(ProxyError::NotConnected { .. }) => {}
                        Err(other) => panic!("Unexpected error: {other:?}"),
                    }
                }
            })
        })
        .collect();

    for _ in 0..200 {
        proxy.on_disconnected();
        proxy.on_connected(engine.handle());
    }

    // THEN: Every caller finishes and the last callback wins
    for caller in callers {
        caller.join().unwrap();
    }
    assert!(proxy.is_connected());
}

/// **VALUE**: Verifies that a NotConnected error points at the line that made the call.
///
/// **WHY THIS MATTERS**: Operations are `#[track_caller]` so log lines name the caller's
/// code. A location inside the proxy tells the reader nothing.
///
/// **BUG THIS CATCHES**: Would catch the location being captured inside a closure,
/// which breaks the `#[track_caller]` chain.
#[test]
fn given_unbound_proxy_when_operation_fails_then_location_is_caller() {
    // GIVEN: An unbound proxy
    let proxy = proxy_with(&MockBinder::new(), &RecordingSink::new());

    // WHEN: Calling an operation
    let expected_line = line!() + 1;
    let error = proxy.get_status("default").unwrap_err();

    // THEN: The location is this test's call site
    match error {
        ProxyError::NotConnected { location, .. } => {
            assert!(
                location.file.ends_with("proxy.rs") && location.file.contains("integration_tests"),
                "Location should be the caller, got {}",
                location.file
            );
            assert_eq!(location.line, expected_line);
        }
        other => panic!("Expected NotConnected, got {other:?}"),
    }
}
