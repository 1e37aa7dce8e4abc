//! Shared fixtures for integration tests: mock ledger node, mock delegated
//! signer, mock push relay, scripted strategies and capabilities.
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use broadcast_fallback::blockchain::Confirmation;
use broadcast_fallback::capability::{
    BroadcastHook, CapabilityError, DelegatedToken, ExtensionAgent, ExtensionResponse, LocalKey,
    PushSession,
};
use broadcast_fallback::dispatch::{AttemptContext, BroadcastStrategy};
use broadcast_fallback::operations::CacheKey;
use broadcast_fallback::{
    AuthMethod, AuthorityLevel, Capabilities, Failure, OperationSet, SideEffects,
};

pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// A request as seen by a mock HTTP server.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

async fn read_request(socket: &mut TcpStream) -> Option<HttpRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);

    Some(HttpRequest {
        method,
        path,
        authorization,
        body,
    })
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &Value) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    let payload = body.to_string();
    let response = format!(
        concat!(
            "HTTP/1.1 {status} {reason}\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: {}\r\n",
            "Connection: close\r\n\r\n{payload}"
        ),
        payload.len(),
        status = status,
        reason = reason,
        payload = payload
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start an HTTP server on an ephemeral port. Every request is recorded.
pub async fn start_http_server<F>(handler: F) -> (String, Arc<Mutex<Vec<HttpRequest>>>)
where
    F: Fn(&HttpRequest) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let log = log.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    let (status, body) = handler(&request);
                    log.lock().unwrap().push(request);
                    write_response(&mut socket, status, &body).await;
                }
            });
        }
    });

    (format!("http://{addr}"), seen)
}

/// Dynamic global properties served by [`start_mock_node`].
pub fn head_block() -> Value {
    json!({
        "head_block_number": 90_000_123u64,
        "head_block_id": "055d4a7bf2a1c3d4e5f60718293a4b5c6d7e8f90",
        "time": "2024-05-01T12:00:00",
    })
}

/// JSON-RPC ledger node. `broadcast` is the envelope body (`result` or
/// `error`) answered to `broadcast_transaction_synchronous`.
pub async fn start_mock_node(broadcast: Value) -> (String, Arc<Mutex<Vec<HttpRequest>>>) {
    start_http_server(move |request| {
        let id = request.body.get("id").cloned().unwrap_or(json!(1));
        let method = request.body.get("method").and_then(Value::as_str).unwrap_or("");
        let mut envelope = json!({ "jsonrpc": "2.0", "id": id });
        match method {
            "condenser_api.get_dynamic_global_properties" => {
                envelope["result"] = head_block();
            }
            "condenser_api.broadcast_transaction_synchronous" => {
                for (key, value) in broadcast.as_object().into_iter().flatten() {
                    envelope[key] = value.clone();
                }
            }
            other => {
                let message = format!("unknown method {other}");
                envelope["error"] = json!({ "code": -32601, "message": message });
            }
        }
        (200, envelope)
    })
    .await
}

/// Methods called on a mock node, in order.
pub fn rpc_methods(seen: &Arc<Mutex<Vec<HttpRequest>>>) -> Vec<String> {
    seen.lock()
        .unwrap()
        .iter()
        .filter_map(|r| r.body.get("method").and_then(Value::as_str).map(str::to_string))
        .collect()
}

// ---------------------------------------------------------------------------
// Push relay
// ---------------------------------------------------------------------------

/// How the mock relay answers a `sign_req`.
#[derive(Debug, Clone)]
pub enum RelayReply {
    Ack(Value),
    Nack,
    Err(Value),
    /// Send `sign_wait` and then nothing.
    Silent,
}

/// Websocket relay on an ephemeral port. Received requests are recorded.
pub async fn start_mock_relay(reply: RelayReply) -> (String, Arc<Mutex<Vec<Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
                    return;
                };
                let _ = ws
                    .send(Message::Text(
                        json!({"cmd": "connected", "server": "mock"}).to_string().into(),
                    ))
                    .await;
                while let Some(Ok(frame)) = ws.next().await {
                    let Message::Text(text) = frame else { continue };
                    let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    if request["cmd"] != "sign_req" {
                        continue;
                    }
                    log.lock().unwrap().push(request);

                    let uuid = "c2b2c5a4-0000-4000-8000-000000000001";
                    let expire = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap()
                        .as_millis() as u64
                        + 60_000;
                    let wait = json!({"cmd": "sign_wait", "uuid": uuid, "expire": expire});
                    let _ = ws.send(Message::Text(wait.to_string().into())).await;

                    let answer = match &reply {
                        RelayReply::Ack(data) => {
                            json!({"cmd": "sign_ack", "uuid": uuid, "data": data})
                        }
                        RelayReply::Nack => json!({"cmd": "sign_nack", "uuid": uuid, "data": uuid}),
                        RelayReply::Err(error) => {
                            json!({"cmd": "sign_err", "uuid": uuid, "error": error})
                        }
                        RelayReply::Silent => continue,
                    };
                    let _ = ws.send(Message::Text(answer.to_string().into())).await;
                }
            });
        }
    });

    (format!("ws://{addr}"), seen)
}

// ---------------------------------------------------------------------------
// Scripted strategies and capabilities
// ---------------------------------------------------------------------------

/// Strategy that replays scripted results and logs every call.
pub struct ScriptedStrategy {
    method: AuthMethod,
    script: Mutex<VecDeque<Result<Confirmation, Failure>>>,
    delay: Duration,
    calls: Arc<Mutex<Vec<AuthMethod>>>,
}

impl ScriptedStrategy {
    /// `calls` is shared between strategies to observe the visit order.
    pub fn new(
        method: AuthMethod,
        script: Vec<Result<Confirmation, Failure>>,
        calls: Arc<Mutex<Vec<AuthMethod>>>,
    ) -> Self {
        Self {
            method,
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            calls,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl BroadcastStrategy for ScriptedStrategy {
    fn method(&self) -> AuthMethod {
        self.method
    }

    async fn attempt(
        &self,
        _operations: &OperationSet,
        _authority: AuthorityLevel,
        _credential: broadcast_fallback::capability::Credential,
        _ctx: &AttemptContext,
    ) -> Result<Confirmation, Failure> {
        self.calls.lock().unwrap().push(self.method);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Failure::Text("script exhausted".into())))
    }
}

struct NullAgent;

#[async_trait]
impl ExtensionAgent for NullAgent {
    async fn request_broadcast(
        &self,
        _: &str,
        _: Value,
        _: &str,
    ) -> Result<ExtensionResponse, Failure> {
        Err(Failure::Text("not wired".into()))
    }
}

struct NullHook;

#[async_trait]
impl BroadcastHook for NullHook {
    async fn broadcast(
        &self,
        _: &str,
        _: &OperationSet,
        _: AuthorityLevel,
    ) -> Result<Confirmation, Failure> {
        Err(Failure::Text("not wired".into()))
    }
}

/// Capabilities exposing a credential for each method in `present`, and
/// counting side-effect hook calls.
#[derive(Default)]
pub struct FakeCapabilities {
    pub present: HashSet<AuthMethod>,
    pub failing: HashSet<AuthMethod>,
    pub local_key: Option<String>,
    pub extension: Option<Arc<dyn ExtensionAgent>>,
    pub activity: Mutex<Vec<(u32, u64, String)>>,
    pub invalidations: AtomicUsize,
    pub invalidated_keys: Mutex<Vec<CacheKey>>,
}

impl FakeCapabilities {
    pub fn with(methods: &[AuthMethod]) -> Self {
        Self {
            present: methods.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing(mut self, method: AuthMethod) -> Self {
        self.failing.insert(method);
        self
    }

    pub fn activity_calls(&self) -> usize {
        self.activity.lock().unwrap().len()
    }

    pub fn invalidation_calls(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    fn check(&self, method: AuthMethod) -> Result<bool, CapabilityError> {
        if self.failing.contains(&method) {
            return Err(CapabilityError::Store(format!("{method} store locked")));
        }
        Ok(self.present.contains(&method))
    }
}

#[async_trait]
impl SideEffects for FakeCapabilities {
    async fn record_activity(
        &self,
        code: u32,
        block: u64,
        tx: &str,
    ) -> Result<(), CapabilityError> {
        self.activity.lock().unwrap().push((code, block, tx.to_string()));
        Ok(())
    }

    async fn invalidate_caches(&self, keys: &[CacheKey]) -> Result<(), CapabilityError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.invalidated_keys.lock().unwrap().extend_from_slice(keys);
        Ok(())
    }
}

#[async_trait]
impl Capabilities for FakeCapabilities {
    async fn local_key(
        &self,
        _user: &str,
        _authority: AuthorityLevel,
    ) -> Result<Option<LocalKey>, CapabilityError> {
        let key = self.local_key.clone().unwrap_or_else(|| TEST_PRIVATE_KEY.to_string());
        Ok(self.check(AuthMethod::LocalKey)?.then(|| LocalKey::new(key)))
    }

    async fn delegated_token(
        &self,
        _user: &str,
    ) -> Result<Option<DelegatedToken>, CapabilityError> {
        Ok(self
            .check(AuthMethod::DelegatedToken)?
            .then(|| DelegatedToken::new("token-123")))
    }

    async fn extension_agent(
        &self,
        _user: &str,
    ) -> Result<Option<Arc<dyn ExtensionAgent>>, CapabilityError> {
        let agent = self
            .extension
            .clone()
            .unwrap_or_else(|| Arc::new(NullAgent) as Arc<dyn ExtensionAgent>);
        Ok(self.check(AuthMethod::BrowserExtension)?.then_some(agent))
    }

    async fn push_session(&self, user: &str) -> Result<Option<PushSession>, CapabilityError> {
        Ok(self
            .check(AuthMethod::PushHardware)?
            .then(|| PushSession::new(user, "push-token")))
    }

    async fn custom_hook(
        &self,
        _user: &str,
    ) -> Result<Option<Arc<dyn BroadcastHook>>, CapabilityError> {
        Ok(self
            .check(AuthMethod::Custom)?
            .then(|| Arc::new(NullHook) as Arc<dyn BroadcastHook>))
    }
}

pub fn auth_missing() -> Failure {
    Failure::Text("missing required posting authority:Missing Posting Authority alice".into())
}

pub fn vote_action() -> broadcast_fallback::Action {
    broadcast_fallback::Action::Vote {
        voter: "alice".into(),
        author: "bob".into(),
        permlink: "hello-world".into(),
        weight: 10_000,
    }
}

pub fn transfer_action() -> broadcast_fallback::Action {
    broadcast_fallback::Action::Transfer {
        from: "alice".into(),
        to: "bob".into(),
        amount: "1.000 HIVE".into(),
        memo: "thanks".into(),
    }
}
