//! Scripted in-memory transport for adapter tests.
//!
//! A [`Script`] decides how each method is answered and records what the
//! adapter did: every request and notification, every open and close.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mc_mcp_client::protocol::{JsonRpcError, JsonRpcResponse};
use mc_mcp_client::{AdapterConfig, McpTransport, TransportError, TransportKind, TransportOpener};
use serde_json::{json, Value};

/// How one request is answered.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(Value),
    RpcError(i64, &'static str),
    /// The process is gone.
    Exited,
    /// A transient failure that does not look like a dead process.
    Flaky(&'static str),
    /// Never answer.
    Hang,
}

#[derive(Default)]
pub struct Script {
    queued: Mutex<HashMap<String, VecDeque<Step>>>,
    always: Mutex<HashMap<String, Step>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    fail_open: AtomicBool,
    fail_close: AtomicBool,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer the next `method` request with `step`.
    pub fn push(&self, method: &str, step: Step) -> &Self {
        self.queued.lock().unwrap().entry(method.into()).or_default().push_back(step);
        self
    }

    /// Answer every `method` request with `step` once the queue is empty.
    pub fn always(&self, method: &str, step: Step) -> &Self {
        self.always.lock().unwrap().insert(method.into(), step);
        self
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(m, _)| m == method).count()
    }

    pub fn params(&self, method: &str) -> Vec<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn next_step(&self, method: &str) -> Step {
        if let Some(step) = self.queued.lock().unwrap().get_mut(method).and_then(VecDeque::pop_front) {
            return step;
        }
        if let Some(step) = self.always.lock().unwrap().get(method) {
            return step.clone();
        }
        match method {
            "initialize" => Step::Respond(init_result("scripted", "1.0.0")),
            _ => Step::Respond(json!({})),
        }
    }
}

pub fn init_result(name: &str, version: &str) -> Value {
    json!({
        "protocolVersion": "2025-03-26",
        "capabilities": { "tools": {} },
        "serverInfo": { "name": name, "version": version }
    })
}

pub struct ScriptedTransport {
    script: Arc<Script>,
    next_id: AtomicUsize,
}

#[async_trait]
impl McpTransport for ScriptedTransport {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, TransportError> {
        self.script.calls.lock().unwrap().push((method.to_owned(), params));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
        let mut resp = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: None,
        };
        match self.script.next_step(method) {
            Step::Respond(value) => resp.result = Some(value),
            Step::RpcError(code, message) => {
                resp.error = Some(JsonRpcError {
                    code,
                    message: message.into(),
                    data: None,
                })
            }
            Step::Exited => return Err(TransportError::ProcessExited),
            Step::Flaky(msg) => return Err(TransportError::Protocol(msg.into())),
            Step::Hang => std::future::pending::<()>().await,
        }
        Ok(resp)
    }

    async fn send_notification(&self, method: &str) -> Result<(), TransportError> {
        self.script.calls.lock().unwrap().push((method.to_owned(), None));
        Ok(())
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Protocol("close refused".into()));
        }
        Ok(())
    }
}

pub struct ScriptedOpener(pub Arc<Script>);

impl TransportOpener for ScriptedOpener {
    fn open(&self, _kind: TransportKind, _config: &AdapterConfig) -> Result<Box<dyn McpTransport>, TransportError> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)));
        }
        Ok(Box::new(ScriptedTransport {
            script: self.0.clone(),
            next_id: AtomicUsize::new(1),
        }))
    }
}

pub fn opener(script: &Arc<Script>) -> Arc<dyn TransportOpener> {
    Arc::new(ScriptedOpener(script.clone()))
}
