//! Streamable-HTTP adapter against an in-process axum server.
//!
//! The server answers in JSON or SSE mode, hands out a session id on
//! `initialize`, and records which session id each request carried.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use mc_mcp_client::{
    AdapterConfig, AdapterError, AdapterFactory, CallContext, HttpAdapter, Interrupt, ServerAdapter, TransportError,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const SESSION: &str = "sess-42";

#[derive(Default)]
struct ServerState {
    sse: bool,
    /// Never acknowledge notifications.
    stall_notifications: bool,
    /// Never answer `DELETE`.
    stall_delete: bool,
    /// (method, session header) per POST.
    posts: Mutex<Vec<(String, Option<String>)>>,
    deletes: Mutex<Vec<Option<String>>>,
}

fn session_of(headers: &HeaderMap) -> Option<String> {
    headers.get("mcp-session-id").and_then(|v| v.to_str().ok()).map(str::to_owned)
}

async fn handle_post(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let method = body["method"].as_str().unwrap_or_default().to_owned();
    state.posts.lock().unwrap().push((method.clone(), session_of(&headers)));

    let Some(id) = body.get("id").cloned() else {
        if state.stall_notifications {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        return StatusCode::ACCEPTED.into_response();
    };

    let result = match method.as_str() {
        "initialize" => json!({
            "protocolVersion": "2025-03-26",
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "axum-mcp", "version": "0.3.0" }
        }),
        "tools/list" => json!({ "tools": [{ "name": "echo", "inputSchema": { "type": "object" } }] }),
        "tools/call" => {
            let text = body["params"]["arguments"]["text"].as_str().unwrap_or_default();
            json!({ "content": [{ "type": "text", "text": format!("echo: {text}") }] })
        }
        "prompts/get" => return (StatusCode::INTERNAL_SERVER_ERROR, "prompt store offline").into_response(),
        _ => json!({}),
    };
    let reply = json!({ "jsonrpc": "2.0", "id": id, "result": result });

    let mut resp = if state.sse {
        let notice = json!({ "jsonrpc": "2.0", "method": "notifications/progress", "params": { "progress": 1 } });
        let stream = format!(": keep-alive\n\nevent: message\ndata: {notice}\n\nevent: message\ndata: {reply}\n\n");
        ([(header::CONTENT_TYPE, "text/event-stream")], stream).into_response()
    } else {
        Json(reply).into_response()
    };
    if method == "initialize" {
        resp.headers_mut().insert("mcp-session-id", HeaderValue::from_static(SESSION));
    }
    resp
}

async fn handle_delete(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> StatusCode {
    state.deletes.lock().unwrap().push(session_of(&headers));
    if state.stall_delete {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    StatusCode::NO_CONTENT
}

async fn start_server(sse: bool) -> (SocketAddr, Arc<ServerState>) {
    start_server_with(ServerState {
        sse,
        ..Default::default()
    })
    .await
}

async fn start_server_with(state: ServerState) -> (SocketAddr, Arc<ServerState>) {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/mcp", post(handle_post).delete(handle_delete))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

fn ctx() -> CallContext {
    CallContext::timeout(Duration::from_secs(10))
}

#[tokio::test]
async fn json_replies_and_session_header_round_trip() {
    let (addr, state) = start_server(false).await;
    let mut adapter = HttpAdapter::new(AdapterConfig::http(format!("http://{addr}/mcp"))).unwrap();

    adapter.connect(&ctx()).await.unwrap();
    assert_eq!(adapter.server_info().unwrap().name, "axum-mcp");

    let tools = adapter.list_tools(&ctx()).await.unwrap();
    assert_eq!(tools[0].name, "echo");

    let mut args = serde_json::Map::new();
    args.insert("text".into(), json!("hi"));
    let result = adapter.call_tool(&ctx(), "echo", args).await.unwrap();
    assert_eq!(result.content[0].text.as_deref(), Some("echo: hi"));

    adapter.disconnect().await.unwrap();

    let posts = state.posts.lock().unwrap().clone();
    assert_eq!(posts[0], ("initialize".to_string(), None));
    assert_eq!(posts[1], ("notifications/initialized".to_string(), Some(SESSION.to_string())));
    assert!(posts[2..].iter().all(|(_, s)| s.as_deref() == Some(SESSION)));
    assert_eq!(*state.deletes.lock().unwrap(), vec![Some(SESSION.to_string())]);
}

#[tokio::test]
async fn event_stream_replies_are_parsed() {
    let (addr, state) = start_server(true).await;
    let mut adapter = AdapterFactory::new()
        .create_from_endpoint(&format!("http://{addr}/mcp"), false)
        .unwrap();

    adapter.connect(&ctx()).await.unwrap();
    assert_eq!(adapter.server_info().unwrap().version, "0.3.0");

    let tools = adapter.list_tools(&ctx()).await.unwrap();
    assert_eq!(tools.len(), 1);

    adapter.disconnect().await.unwrap();
    assert_eq!(state.deletes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn http_error_status_is_wrapped_and_connection_survives() {
    let (addr, _state) = start_server(false).await;
    let mut adapter = HttpAdapter::new(AdapterConfig::http(format!("http://{addr}/mcp"))).unwrap();
    adapter.connect(&ctx()).await.unwrap();

    let err = adapter.get_prompt(&ctx(), "summary", Default::default()).await.unwrap_err();

    match err {
        AdapterError::OperationFailed {
            operation,
            target,
            source: TransportError::Http { status, body },
        } => {
            assert_eq!(operation, "get prompt");
            assert_eq!(target, "summary");
            assert_eq!(status, 500);
            assert_eq!(body, "prompt store offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(adapter.is_connected());
    adapter.disconnect().await.unwrap();
}

#[tokio::test]
async fn unknown_path_fails_handshake() {
    let (addr, state) = start_server(false).await;
    let mut adapter = HttpAdapter::new(AdapterConfig::http(format!("http://{addr}/missing"))).unwrap();

    let err = adapter.connect(&ctx()).await.unwrap_err();

    assert!(
        matches!(err, AdapterError::HandshakeFailed(TransportError::Http { status: 404, .. })),
        "got {err:?}"
    );
    assert!(!adapter.is_connected());
    // No session was issued, so nothing to delete.
    assert!(state.deletes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_server_fails_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut adapter = HttpAdapter::new(AdapterConfig::http(format!("http://{addr}/mcp"))).unwrap();
    let err = adapter.connect(&ctx()).await.unwrap_err();

    assert!(
        matches!(err, AdapterError::HandshakeFailed(TransportError::Request(_))),
        "got {err:?}"
    );
}

#[tokio::test]
async fn stalled_session_delete_does_not_hold_up_a_failed_connect() {
    let (addr, state) = start_server_with(ServerState {
        stall_notifications: true,
        stall_delete: true,
        ..Default::default()
    })
    .await;
    let config = AdapterConfig::http(format!("http://{addr}/mcp")).with_timeout(Duration::from_millis(500));
    let mut adapter = HttpAdapter::new(config).unwrap();

    let started = tokio::time::Instant::now();
    let outcome = tokio::time::timeout(
        Duration::from_secs(20),
        adapter.connect(&CallContext::timeout(Duration::from_secs(1))),
    )
    .await
    .expect("connect must return once the close grace runs out");

    let err = outcome.unwrap_err();
    assert!(
        matches!(err, AdapterError::HandshakeFailed(TransportError::Interrupted(Interrupt::DeadlineExceeded))),
        "got {err:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
    assert!(!adapter.is_connected());
    assert_eq!(*state.deletes.lock().unwrap(), vec![Some(SESSION.to_string())]);
}

#[tokio::test]
async fn stalled_session_delete_bounds_disconnect() {
    let (addr, _state) = start_server_with(ServerState {
        stall_delete: true,
        ..Default::default()
    })
    .await;
    let mut adapter = HttpAdapter::new(AdapterConfig::http(format!("http://{addr}/mcp"))).unwrap();
    adapter.connect(&ctx()).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(20), adapter.disconnect())
        .await
        .expect("disconnect must return once the close grace runs out");

    assert!(matches!(outcome, Err(AdapterError::Disconnect(_))), "got {outcome:?}");
    assert!(!adapter.is_connected());
}
