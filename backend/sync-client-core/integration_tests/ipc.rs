use crate::helpers::{
    HostFault, MockEngine, RecordingSink, TEST_AUTH_TOKEN, authenticate, connect_to_host,
    is_connection_closed, receive_response, sample_result, send_protobuf,
    spawn_misbehaving_host, unused_port, wait_for, wait_for_async,
};

use sync_client_core::config::EngineConfig;
use sync_client_core::engine::SyncEngineInterface;
use sync_client_core::error::{ProxyError, RemoteError};
use sync_client_core::ipc::{EngineHostHandle, WsServiceBinder, start_engine_host};
use sync_client_core::proto::{
    AppRequest, EngineErrorCode, EngineRequest, SyncRequest, engine_request, engine_response,
};
use sync_client_core::proxy::{BindRequest, ConnectionStatus, SyncServiceProxy};

use common::ErrorLocation;
use models::{SyncAttachmentState, SyncProgressState, SyncStatus};

use std::panic::Location;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use futures_util::SinkExt;
use tokio::runtime::{Handle, Runtime};
use tokio_tungstenite::tungstenite::Message;

const CONNECT_WAIT: Duration = Duration::from_secs(5);

async fn start_test_host(engine: Arc<MockEngine>) -> EngineHostHandle {
    start_engine_host(
        0,
        Some(TEST_AUTH_TOKEN.to_string()),
        engine as Arc<dyn SyncEngineInterface>,
    )
    .await
    .expect("Failed to start engine host")
}

fn status_request(request_id: u64, app_name: &str) -> EngineRequest {
    EngineRequest {
        request_id,
        payload: Some(engine_request::Payload::GetSyncStatus(AppRequest {
            app_name: app_name.to_string(),
        })),
    }
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Bind request that never launches an engine.
fn connect_only() -> BindRequest {
    BindRequest {
        auto_create: false,
        ..BindRequest::default()
    }
}

/// Bind a proxy to the engine listening on `port` and wait until it is connected.
fn bound_proxy(runtime: &Runtime, port: u16, sink: Arc<RecordingSink>) -> Arc<SyncServiceProxy> {
    let binder = Arc::new(WsServiceBinder::new(
        runtime.handle().clone(),
        engine_config(port, TEST_AUTH_TOKEN),
    ));
    let proxy = SyncServiceProxy::new(binder)
        .with_bind_request(connect_only())
        .with_diagnostics(sink);
    proxy.request_bind().expect("bind should be accepted");
    assert!(wait_for(CONNECT_WAIT, || proxy.is_connected()));
    Arc::new(proxy)
}

/// Run `get_status("app1")` on a plain thread, giving up after `CONNECT_WAIT`.
fn status_off_thread(proxy: &Arc<SyncServiceProxy>) -> Result<SyncStatus, ProxyError> {
    let (done, result) = mpsc::channel();
    let caller = Arc::clone(proxy);
    thread::spawn(move || {
        let _ = done.send(caller.get_status("app1"));
    });
    result
        .recv_timeout(CONNECT_WAIT)
        .expect("get_status should return instead of blocking")
}

fn engine_config(port: u16, token: &str) -> EngineConfig {
    EngineConfig {
        port: Some(port),
        auth_token: Some(token.to_string()),
        auto_create: false,
        connect_timeout_secs: 1,
        ..EngineConfig::default()
    }
}

// ============================================
// ENGINE HOST
// ============================================

/// **VALUE**: Verifies that an authenticated client gets engine answers correlated by request id.
///
/// **WHY THIS MATTERS**: The client pipelines calls and matches answers by `request_id`.
/// A host that echoes the wrong id would hand one caller another caller's answer.
///
/// **BUG THIS CATCHES**: Would catch responses carrying a fixed or reused request id,
/// or the host dispatching to the wrong engine method.
#[tokio::test(flavor = "multi_thread")]
async fn given_authenticated_client_when_requests_sent_then_answers_match_request_ids() {
    // GIVEN: A host serving a mock engine and an authenticated client
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let mut ws = connect_to_host(host.port()).await;
    assert!(authenticate(&mut ws, TEST_AUTH_TOKEN).await.success);

    // WHEN: Two requests are pipelined
    send_protobuf(&mut ws, &status_request(2, "default")).await;
    send_protobuf(
        &mut ws,
        &EngineRequest {
            request_id: 3,
            payload: Some(engine_request::Payload::SynchronizeWithServer(SyncRequest {
                app_name: "default".to_string(),
                attachment_state: SyncAttachmentState::Download.into(),
            })),
        },
    )
    .await;

    // THEN: Each answer carries its request id and payload
    let first = receive_response(&mut ws).await;
    assert_eq!(first.request_id, 2);
    match first.payload {
        Some(engine_response::Payload::SyncStatus(status)) => {
            assert_eq!(status.status, i32::from(SyncStatus::Syncing));
        }
        other => panic!("Expected SyncStatus, got {other:?}"),
    }

    let second = receive_response(&mut ws).await;
    assert_eq!(second.request_id, 3);
    assert!(matches!(
        second.payload,
        Some(engine_response::Payload::Accepted(ref a)) if a.accepted
    ));

    assert_eq!(
        engine.calls(),
        vec![
            "get_sync_status:default",
            "synchronize_with_server:default:download"
        ]
    );
}

/// **VALUE**: Verifies that a wrong token is refused and the socket closed.
///
/// **WHY THIS MATTERS**: The token is the only barrier against other local processes
/// triggering syncs or server resets.
///
/// **BUG THIS CATCHES**: Would catch the host serving requests after a failed handshake.
#[tokio::test(flavor = "multi_thread")]
async fn given_wrong_token_when_authenticating_then_rejected_and_closed() {
    // GIVEN: A running host
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let mut ws = connect_to_host(host.port()).await;

    // WHEN: Authenticating with the wrong token
    let response = authenticate(&mut ws, "wrong-token").await;

    // THEN: Rejected with a reason, connection closed, engine untouched
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Invalid authentication token"));
    assert!(is_connection_closed(&mut ws).await);
    assert!(engine.calls().is_empty());
}

/// **VALUE**: Verifies that a first frame other than the handshake closes the connection.
///
/// **BUG THIS CATCHES**: Would catch the host answering engine calls from clients that
/// skipped authentication.
#[tokio::test(flavor = "multi_thread")]
async fn given_request_before_handshake_when_sent_then_connection_closed() {
    // GIVEN: A running host and an unauthenticated client
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let mut ws = connect_to_host(host.port()).await;

    // WHEN: Sending a status request first
    send_protobuf(&mut ws, &status_request(2, "default")).await;

    // THEN: Closed without reaching the engine
    assert!(is_connection_closed(&mut ws).await);
    assert!(engine.calls().is_empty());
}

/// **VALUE**: Verifies that an empty namespace is rejected by the host with InvalidArgument.
///
/// **WHY THIS MATTERS**: Not every client goes through the proxy's validation.
#[tokio::test(flavor = "multi_thread")]
async fn given_empty_app_name_when_sent_to_host_then_invalid_argument_error() {
    // GIVEN: An authenticated client
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let mut ws = connect_to_host(host.port()).await;
    assert!(authenticate(&mut ws, TEST_AUTH_TOKEN).await.success);

    // WHEN: Requesting status for an empty namespace
    send_protobuf(&mut ws, &status_request(5, "")).await;

    // THEN: Error response, engine untouched
    let response = receive_response(&mut ws).await;
    assert_eq!(response.request_id, 5);
    match response.payload {
        Some(engine_response::Payload::Error(error)) => {
            assert_eq!(error.code, i32::from(EngineErrorCode::InvalidArgument));
        }
        other => panic!("Expected Error, got {other:?}"),
    }
    assert!(engine.calls().is_empty());
}

/// **VALUE**: Verifies that a second handshake after authentication is answered with an error.
#[tokio::test(flavor = "multi_thread")]
async fn given_authenticated_client_when_handshake_repeated_then_auth_error() {
    // GIVEN: An authenticated client
    let host = start_test_host(MockEngine::new()).await;
    let mut ws = connect_to_host(host.port()).await;
    assert!(authenticate(&mut ws, TEST_AUTH_TOKEN).await.success);

    // WHEN: Handshaking again
    let response = {
        send_protobuf(
            &mut ws,
            &EngineRequest {
                request_id: 9,
                payload: Some(engine_request::Payload::AuthHandshake(Default::default())),
            },
        )
        .await;
        receive_response(&mut ws).await
    };

    // THEN: Auth error for that request, connection still usable
    assert_eq!(response.request_id, 9);
    assert!(matches!(
        response.payload,
        Some(engine_response::Payload::Error(ref e)) if e.code == i32::from(EngineErrorCode::AuthError)
    ));
    send_protobuf(&mut ws, &status_request(10, "default")).await;
    assert_eq!(receive_response(&mut ws).await.request_id, 10);
}

/// **VALUE**: Verifies that an undecodable request closes the connection.
///
/// **WHY THIS MATTERS**: The host cannot tell which request the bytes were meant to be,
/// so any answer would carry a request id no caller is waiting on.
///
/// **BUG THIS CATCHES**: Would catch the host replying under a made-up request id and
/// leaving the client's call unanswered.
#[tokio::test(flavor = "multi_thread")]
async fn given_authenticated_client_when_garbage_sent_then_connection_closed() {
    // GIVEN: An authenticated client
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let mut ws = connect_to_host(host.port()).await;
    assert!(authenticate(&mut ws, TEST_AUTH_TOKEN).await.success);

    // WHEN: Sending bytes that are not a protobuf message
    ws.send(Message::Binary(vec![0xFF, 0xFF, 0xFF].into()))
        .await
        .expect("Failed to send frame");

    // THEN: Closed without an answer and without reaching the engine
    assert!(is_connection_closed(&mut ws).await);
    assert!(engine.calls().is_empty());
}

// ============================================
// BINDER + PROXY
// ============================================

/// **VALUE**: Verifies the full path: proxy bind over WebSocket, every operation answered
/// by the hosted engine, then shutdown.
///
/// **WHY THIS MATTERS**: This is how the client is used in production. Each layer is
/// tested alone elsewhere; this catches mismatches between them.
///
/// **BUG THIS CATCHES**: Would catch wire encodings that differ between client and host,
/// a binder that never delivers `on_connected`, or the aggregate losing tables in transit.
#[test]
fn given_engine_host_when_proxy_binds_over_websocket_then_operations_reach_engine() {
    // GIVEN: A host on a background runtime and a proxy using the WebSocket binder
    let runtime = runtime();
    let engine = MockEngine::new();
    let host = runtime.block_on(start_test_host(engine.clone()));
    let binder = Arc::new(WsServiceBinder::new(
        runtime.handle().clone(),
        engine_config(host.port(), TEST_AUTH_TOKEN),
    ));
    let proxy = SyncServiceProxy::new(binder.clone()).with_bind_request(connect_only());

    // WHEN: Binding
    proxy.request_bind().expect("bind should be accepted");

    // THEN: Connected shortly after
    assert!(wait_for(CONNECT_WAIT, || proxy.is_connected()));

    // WHEN/THEN: Every operation returns the engine's answer
    assert!(proxy.start_sync("default", SyncAttachmentState::Sync).unwrap());
    assert!(proxy.reset_server("default", SyncAttachmentState::None).unwrap());
    assert_eq!(proxy.get_status("default").unwrap(), SyncStatus::Syncing);
    assert_eq!(proxy.get_progress("default").unwrap(), SyncProgressState::Rows);
    assert_eq!(
        proxy.get_update_message("default").unwrap(),
        "Syncing default: 3 of 5 tables"
    );
    assert_eq!(proxy.get_sync_result("default").unwrap(), sample_result());

    // WHEN: Shutting down
    proxy.shutdown();

    // THEN: Unbound, session released, calls rejected locally
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
    assert!(wait_for(CONNECT_WAIT, || binder.active_sessions() == 0));
    assert!(matches!(
        proxy.get_status("default"),
        Err(ProxyError::NotConnected { .. })
    ));
}

/// **VALUE**: Verifies that an engine failure crosses the wire with its code and message.
///
/// **WHY THIS MATTERS**: Users act on the engine's reason (bad credentials, server down).
/// Flattening it into a generic transport error loses that.
///
/// **BUG THIS CATCHES**: Would catch the host mapping every failure to `Internal`, or the
/// client dropping the message.
#[test]
fn given_engine_failure_when_called_over_websocket_then_code_and_message_preserved() {
    // GIVEN: A bound proxy whose engine fails every call
    let runtime = runtime();
    let engine = MockEngine::failing(RemoteError::Engine {
        code: EngineErrorCode::EngineFailure,
        message: "server returned 503".to_string(),
        location: ErrorLocation::from(Location::caller()),
    });
    let host = runtime.block_on(start_test_host(engine.clone()));
    let binder = Arc::new(WsServiceBinder::new(
        runtime.handle().clone(),
        engine_config(host.port(), TEST_AUTH_TOKEN),
    ));
    let sink = RecordingSink::new();
    let proxy = SyncServiceProxy::new(binder)
        .with_bind_request(connect_only())
        .with_diagnostics(sink.clone());
    proxy.request_bind().unwrap();
    assert!(wait_for(CONNECT_WAIT, || proxy.is_connected()));

    // WHEN: Querying status
    let error = proxy.get_status("app1").unwrap_err();

    // THEN: Engine error with the original code and message, reported, still bound
    match error.remote() {
        Some(RemoteError::Engine { code, message, .. }) => {
            assert_eq!(*code, EngineErrorCode::EngineFailure);
            assert_eq!(message, "server returned 503");
        }
        other => panic!("Expected engine error, got {other:?}"),
    }
    assert_eq!(sink.reports().len(), 1);
    assert_eq!(sink.reports()[0].0, "app1");
    assert!(proxy.is_connected());
}

/// **VALUE**: Verifies that a bind to an unreachable engine ends in `on_disconnected`.
///
/// **WHY THIS MATTERS**: Without the callback the proxy would sit in BindRequested
/// forever and `request_bind()` could never be retried.
///
/// **BUG THIS CATCHES**: Would catch connect failures being logged but not delivered.
#[test]
fn given_unreachable_engine_when_bind_requested_then_disconnected_delivered() {
    // GIVEN: A binder pointed at a port nothing listens on
    let runtime = runtime();
    let binder = Arc::new(WsServiceBinder::new(
        runtime.handle().clone(),
        engine_config(unused_port(), TEST_AUTH_TOKEN),
    ));
    let proxy = SyncServiceProxy::new(binder.clone()).with_bind_request(connect_only());

    // WHEN: Binding
    proxy.request_bind().unwrap();
    assert_eq!(proxy.state(), ConnectionStatus::BindRequested);

    // THEN: Back to Unbound once the connect timeout passes
    assert!(wait_for(CONNECT_WAIT, || {
        proxy.state() == ConnectionStatus::Unbound
    }));
    assert_eq!(binder.active_sessions(), 0);
}

/// **VALUE**: Verifies that a token mismatch fails the bind instead of binding.
///
/// **BUG THIS CATCHES**: Would catch the binder delivering `on_connected` before the
/// handshake response arrives.
#[test]
fn given_wrong_token_when_bind_requested_then_never_bound() {
    // GIVEN: A host and a binder configured with a different token
    let runtime = runtime();
    let engine = MockEngine::new();
    let host = runtime.block_on(start_test_host(engine.clone()));
    let binder = Arc::new(WsServiceBinder::new(
        runtime.handle().clone(),
        engine_config(host.port(), "not-the-token"),
    ));
    let proxy = SyncServiceProxy::new(binder).with_bind_request(connect_only());

    // WHEN: Binding
    proxy.request_bind().unwrap();

    // THEN: Ends Unbound without ever reaching the engine
    assert!(wait_for(CONNECT_WAIT, || {
        proxy.state() == ConnectionStatus::Unbound
    }));
    assert!(engine.calls().is_empty());
}

/// **VALUE**: Verifies that a binder with no port and auto-create disabled rejects the bind.
#[test]
fn given_no_port_and_no_auto_create_when_bind_requested_then_bind_error() {
    // GIVEN: Nothing to connect to and launching disabled
    let runtime = runtime();
    let config = EngineConfig {
        port: None,
        auto_create: false,
        ..EngineConfig::default()
    };
    let binder = Arc::new(WsServiceBinder::new(runtime.handle().clone(), config));
    let proxy = SyncServiceProxy::new(binder).with_bind_request(connect_only());

    // WHEN: Binding
    let result = proxy.request_bind();

    // THEN: Rejected synchronously and left Unbound
    assert!(matches!(result, Err(ProxyError::Bind { .. })));
    assert_eq!(proxy.state(), ConnectionStatus::Unbound);
}

// ============================================
// TRANSPORT FAILURES
// ============================================

/// **VALUE**: Verifies that an undecodable engine answer fails the waiting call.
///
/// **WHY THIS MATTERS**: A reply that cannot be decoded cannot be matched to its
/// request. Dropping it silently would leave the caller blocked forever.
///
/// **BUG THIS CATCHES**: Would catch the session logging a decode failure and carrying
/// on while the pending call is never completed.
#[test]
fn given_undecodable_response_when_called_then_protocol_error_and_session_lost() {
    // GIVEN: A proxy bound to a host that answers with garbage
    let runtime = runtime();
    let port = runtime.block_on(spawn_misbehaving_host(HostFault::Garbage));
    let sink = RecordingSink::new();
    let proxy = bound_proxy(&runtime, port, sink.clone());

    // WHEN: Querying status
    let error = status_off_thread(&proxy).unwrap_err();

    // THEN: Communication error carrying a protocol fault, reported against the app
    assert!(matches!(error, ProxyError::Communication { .. }), "{error:?}");
    assert!(
        matches!(error.remote(), Some(RemoteError::Protocol { .. })),
        "Expected protocol error, got {:?}",
        error.remote()
    );
    assert_eq!(sink.reports().len(), 1);
    assert_eq!(sink.reports()[0].0, "app1");

    // THEN: The session is treated as lost
    assert!(wait_for(CONNECT_WAIT, || {
        proxy.state() == ConnectionStatus::Unbound
    }));
}

/// **VALUE**: Verifies that a call in flight when the engine connection drops fails with
/// Disconnected, and the proxy then becomes Unbound.
///
/// **WHY THIS MATTERS**: An engine crash mid-call is the common transport failure. The
/// caller must see a communication error, and later calls must see NotConnected so the
/// caller knows to rebind.
///
/// **BUG THIS CATCHES**: Would catch pending calls left waiting after the socket closes,
/// or a lost session that never delivers `on_disconnected`.
#[test]
fn given_call_in_flight_when_engine_connection_drops_then_disconnected_and_unbound() {
    // GIVEN: A proxy bound to a host that hangs up instead of answering
    let runtime = runtime();
    let port = runtime.block_on(spawn_misbehaving_host(HostFault::HangUp));
    let sink = RecordingSink::new();
    let proxy = bound_proxy(&runtime, port, sink.clone());

    // WHEN: Querying status
    let error = status_off_thread(&proxy).unwrap_err();

    // THEN: Communication error wrapping Disconnected
    assert!(
        matches!(error.remote(), Some(RemoteError::Disconnected { .. })),
        "Expected Disconnected, got {error:?}"
    );
    assert_eq!(sink.reports().len(), 1);

    // THEN: Unbound, and further calls are rejected locally
    assert!(wait_for(CONNECT_WAIT, || {
        proxy.state() == ConnectionStatus::Unbound
    }));
    assert!(matches!(
        proxy.get_status("app1"),
        Err(ProxyError::NotConnected { .. })
    ));
}

/// **VALUE**: Verifies that a bound proxy can be called from a task on a multi-thread
/// tokio runtime.
///
/// **WHY THIS MATTERS**: Callers use the proxy from whatever thread they run on, and
/// async services run on tokio workers.
///
/// **BUG THIS CATCHES**: Would catch the blocking wait panicking inside the runtime.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn given_bound_proxy_when_called_from_async_task_then_engine_answers() {
    // GIVEN: Host and binder on this test's runtime, proxy bound
    let engine = MockEngine::new();
    let host = start_test_host(engine.clone()).await;
    let binder = Arc::new(WsServiceBinder::new(
        Handle::current(),
        engine_config(host.port(), TEST_AUTH_TOKEN),
    ));
    let proxy = Arc::new(SyncServiceProxy::new(binder).with_bind_request(connect_only()));
    proxy.request_bind().unwrap();
    assert!(wait_for_async(CONNECT_WAIT, || proxy.is_connected()).await);

    // WHEN: Calling from a spawned task
    let task_proxy = Arc::clone(&proxy);
    let status = tokio::spawn(async move { task_proxy.get_status("app1") })
        .await
        .expect("task should not panic");

    // THEN: The engine's answer comes back
    assert_eq!(status.unwrap(), SyncStatus::Syncing);
    assert_eq!(engine.calls(), vec!["get_sync_status:app1"]);
    proxy.shutdown();
}

/// **VALUE**: Verifies that a call from a current-thread runtime fails instead of
/// panicking.
///
/// **WHY THIS MATTERS**: A current-thread runtime has no other worker to hand its tasks
/// to, so blocking it could stall the session the call waits on.
///
/// **BUG THIS CATCHES**: Would catch `blocking_recv` being reached inside the runtime.
#[test]
fn given_current_thread_runtime_when_called_then_transport_error_and_still_bound() {
    // GIVEN: A bound proxy and a separate current-thread runtime
    let runtime = runtime();
    let engine = MockEngine::new();
    let host = runtime.block_on(start_test_host(engine.clone()));
    let proxy = bound_proxy(&runtime, host.port(), RecordingSink::new());
    let local = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    // WHEN: Calling from inside it
    let result = local.block_on(async { proxy.get_status("app1") });

    // THEN: Transport error, engine untouched, connection kept
    let error = result.unwrap_err();
    assert!(
        matches!(error.remote(), Some(RemoteError::Transport { .. })),
        "Expected Transport, got {error:?}"
    );
    assert!(engine.calls().is_empty());
    assert!(proxy.is_connected());
}
