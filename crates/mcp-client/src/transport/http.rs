use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

use super::{McpTransport, TransportError};
use crate::protocol::{classify_incoming, Incoming, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Header carrying the server-assigned session id.
pub(crate) const SESSION_HEADER: &str = "Mcp-Session-Id";

const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Bound on the session-terminating `DELETE`.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Streamable-HTTP transport.
///
/// Every message is a `POST` to one endpoint. The server answers a request
/// either with a JSON body or with an SSE stream whose `data:` payloads
/// carry the response. A session id handed out on the first reply is echoed
/// on every later message and ended with `DELETE` on close.
#[derive(Debug)]
pub struct HttpTransport {
    http: Client,
    url: Url,
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
    alive: AtomicBool,
}

impl HttpTransport {
    /// Build a transport for `url`. No request is made until the first message.
    pub fn new(url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url).map_err(|e| TransportError::Request(format!("invalid URL {url:?}: {e}")))?;
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            url,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
        })
    }

    /// The session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|s| s.clone())
    }

    fn remember_session(&self, resp: &Response) {
        let Some(id) = resp.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()) else {
            return;
        };
        if let Ok(mut slot) = self.session_id.lock() {
            if slot.as_deref() != Some(id) {
                tracing::debug!(session_id = %id, "MCP server assigned session");
                *slot = Some(id.to_owned());
            }
        }
    }

    async fn post(&self, body: String) -> Result<Response, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::Protocol("transport is closed".into()));
        }

        let mut rb = self
            .http
            .post(self.url.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(id) = self.session_id() {
            rb = rb.header(SESSION_HEADER, id);
        }

        let resp = rb.send().await?;
        self.remember_session(&resp);

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http { status, body });
        }
        Ok(resp)
    }

    /// Pull the response for `id` out of an SSE reply.
    ///
    /// Returns as soon as the matching event arrives; the server may keep
    /// the stream open afterwards.
    async fn read_event_stream(resp: Response, id: u64) -> Result<JsonRpcResponse, TransportError> {
        let mut stream = resp.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            pending.extend_from_slice(&chunk?);
            buffer.push_str(&take_utf8(&mut pending));
            for data in drain_data_lines(&mut buffer) {
                if let Some(found) = match_response(&data, id) {
                    return Ok(found);
                }
            }
        }
        // Flush a final event that was not followed by a blank line.
        buffer.push_str(&String::from_utf8_lossy(&pending));
        buffer.push_str("\n\n");
        for data in drain_data_lines(&mut buffer) {
            if let Some(found) = match_response(&data, id) {
                return Ok(found);
            }
        }
        Err(TransportError::Protocol(format!("event stream ended without a response to request {id}")))
    }

    /// Pull the response for `id` out of a JSON reply (single or batch).
    async fn read_json_body(resp: Response, id: u64) -> Result<JsonRpcResponse, TransportError> {
        let body = resp.text().await?;
        let trimmed = body.trim();
        if trimmed.starts_with('[') {
            let batch: Vec<Value> = serde_json::from_str(trimmed)?;
            for item in batch {
                if let Some(found) = match_response(&item.to_string(), id) {
                    return Ok(found);
                }
            }
        } else if let Some(found) = match_response(trimmed, id) {
            return Ok(found);
        }
        Err(TransportError::Protocol(format!("reply did not contain a response to request {id}: {trimmed}")))
    }
}

fn match_response(raw: &str, id: u64) -> Option<JsonRpcResponse> {
    match classify_incoming(raw) {
        Incoming::Response(resp) if resp.id == id => Some(resp),
        Incoming::Response(resp) => {
            tracing::debug!(expected_id = id, got_id = resp.id, "skipping response to another request");
            None
        }
        Incoming::ServerMessage(method) => {
            tracing::debug!(%method, "ignoring server-initiated message");
            None
        }
        Incoming::Unrecognized => None,
    }
}

/// Decode the longest valid UTF-8 prefix of `pending`, keeping a split
/// multi-byte sequence for the next chunk.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(s) => s.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
    pending.drain(..valid);
    text
}

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line. Multiple `data:` lines within one
/// event are joined with `\n`. Consumed bytes are drained from `buffer`;
/// a trailing partial event stays for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    if buffer.contains('\r') {
        *buffer = buffer.replace("\r\n", "\n");
    }

    let mut payloads = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect();
        let joined = data.join("\n");
        if !joined.trim().is_empty() {
            payloads.push(joined);
        }
    }
    payloads
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        tracing::debug!(id, method, url = %self.url, "sending MCP request");
        let resp = self.post(body).await?;

        let is_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_stream {
            Self::read_event_stream(resp, id).await
        } else {
            Self::read_json_body(resp, id).await
        }
    }

    async fn send_notification(&self, method: &str) -> Result<(), TransportError> {
        let body = serde_json::to_string(&JsonRpcNotification::new(method))?;
        tracing::debug!(method, url = %self.url, "sending MCP notification");
        // Usually 202 Accepted with an empty body; anything 2xx is fine.
        self.post(body).await.map(|_| ())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(id) = self.session_id() else {
            return Ok(());
        };

        let sent = self
            .http
            .delete(self.url.clone())
            .header(SESSION_HEADER, &id)
            .timeout(CLOSE_GRACE)
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    tracing::warn!(session_id = %id, grace = ?CLOSE_GRACE, "MCP session termination timed out");
                }
                return Err(e.into());
            }
        };
        let status = resp.status();
        // Servers that do not support explicit termination answer 405.
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TransportError::Http { status: status.as_u16(), body })
    }
}
