use crate::issues::IssueQueryHandler;
use crate::mcp;
use crate::tools::*;
use futures::future::AbortHandle;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

// Distinguishes an explicit `"id": null` (a request) from a missing id (a notification).
fn present_id<'de, D>(d: D) -> Result<Option<Id>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Id::deserialize(d).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default, deserialize_with = "present_id")]
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response { jsonrpc: "2.0".into(), result: None, error: Some(RpcError { code, message: message.into(), data }), id }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response { jsonrpc: "2.0".into(), result: Some(result), error: None, id }
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct CancelledParams {
    #[serde(rename = "requestId")]
    request_id: Id,
    #[serde(default)]
    reason: Option<String>,
}

type InFlight = Arc<Mutex<HashMap<Id, AbortHandle>>>;

struct Server {
    handler: Arc<IssueQueryHandler>,
    in_flight: InFlight,
    out: mpsc::UnboundedSender<Response>,
    calls: JoinSet<()>,
}

/// Serve newline-delimited JSON-RPC on stdin/stdout until stdin closes.
/// Tool calls run concurrently; every response goes through a single writer task.
pub async fn run_stdio_server(handler: IssueQueryHandler) -> anyhow::Result<()> {
    info!("Starting github-issues-mcp stdio server; protocol={}", PROTOCOL_VERSION);
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_responses(rx));

    let mut server = Server::new(handler, tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                server.handle_line(&line).await;
            }
            Some(_) = server.calls.join_next(), if !server.calls.is_empty() => {}
        }
    }

    debug!("stdin closed; waiting for {} in-flight call(s)", server.calls.len());
    while server.calls.join_next().await.is_some() {}
    drop(server);
    writer.await??;
    info!("github-issues-mcp stdio server stopped");
    Ok(())
}

async fn write_responses(mut rx: mpsc::UnboundedReceiver<Response>) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    while let Some(resp) = rx.recv().await {
        let mut payload = serde_json::to_vec(&resp)?;
        payload.push(b'\n');
        out.write_all(&payload).await?;
        out.flush().await?;
    }
    Ok(())
}

impl Server {
    fn new(handler: IssueQueryHandler, out: mpsc::UnboundedSender<Response>) -> Self {
        Self {
            handler: Arc::new(handler),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            out,
            calls: JoinSet::new(),
        }
    }

    // Finished calls stay in the JoinSet until joined.
    fn reap_finished(&mut self) {
        while self.calls.try_join_next().is_some() {}
    }

    fn reply(&self, resp: Response) {
        if self.out.send(resp).is_err() {
            warn!("response writer has stopped; dropping response");
        }
    }

    async fn handle_line(&mut self, line: &str) {
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                self.reply(rpc_error(None, -32700, &format!("Parse error: {}", e), None));
                return;
            }
        };
        let req: Request = match serde_json::from_value(raw) {
            Ok(r) => r,
            Err(e) => {
                self.reply(rpc_error(None, -32600, &format!("Invalid Request: {}", e), None));
                return;
            }
        };
        if req.jsonrpc != "2.0" {
            self.reply(rpc_error(req.id, -32600, "Invalid Request: jsonrpc must be \"2.0\"", None));
            return;
        }
        debug!("Received method={}", req.method);

        if req.id.is_none() {
            self.handle_notification(&req.method, req.params).await;
            return;
        }
        match req.method.as_str() {
            "initialize" => self.reply(handle_initialize(req.id)),
            "ping" => self.reply(rpc_ok(req.id, serde_json::json!({}))),
            "tools/list" => self.reply(handle_tools_list(req.id)),
            "tools/call" => self.spawn_tool_call(req.id, req.params).await,
            other => self.reply(rpc_error(req.id, -32601, &format!("Method not found: {}", other), None)),
        }
    }

    async fn handle_notification(&self, method: &str, params: Value) {
        match method {
            "notifications/cancelled" => {
                let Ok(cancel) = serde_json::from_value::<CancelledParams>(params) else {
                    warn!("ignoring malformed notifications/cancelled");
                    return;
                };
                if let Some(abort) = self.in_flight.lock().await.remove(&cancel.request_id) {
                    info!(
                        "cancelling request {:?} ({})",
                        cancel.request_id,
                        cancel.reason.as_deref().unwrap_or("no reason given")
                    );
                    abort.abort();
                }
            }
            "notifications/initialized" => {}
            other => debug!("ignoring notification {}", other),
        }
    }

    async fn spawn_tool_call(&mut self, id: Option<Id>, params: Value) {
        let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
            self.reply(rpc_error(id, -32602, "Invalid params", None));
            return;
        };
        if call.name != GET_ISSUES {
            self.reply(rpc_error(id, -32601, &format!("Tool not found: {}", call.name), None));
            return;
        }

        self.reap_finished();
        let (abort, registration) = AbortHandle::new_pair();
        if let Some(key) = id.clone() {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(&key) {
                drop(in_flight);
                self.reply(rpc_error(id, -32600, "Invalid Request: id is already in flight", None));
                return;
            }
            in_flight.insert(key, abort);
        }
        let handler = Arc::clone(&self.handler);
        let in_flight = Arc::clone(&self.in_flight);
        let out = self.out.clone();
        self.calls.spawn(async move {
            let result = handler.handle_with_cancel(&call.arguments, registration).await;
            if let Some(key) = &id {
                in_flight.lock().await.remove(key);
            }
            if let Err(e) = &result {
                warn!("{} failed: {} ({})", GET_ISSUES, e, e.code());
            }
            if out.send(rpc_ok(id, mcp::call_result(&result))).is_err() {
                warn!("response writer has stopped; dropping response");
            }
        });
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "github-issues-mcp",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

fn handle_tools_list(id: Option<Id>) -> Response {
    let tools = tool_descriptors();
    rpc_ok(id, serde_json::json!({ "tools": tools }))
}
