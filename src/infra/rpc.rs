use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};

/// Status string the catalog returns on success.
pub const STATUS_OK: &str = "200 OK";

pub const METHOD_LOG_IN: &str = "LogIn";
pub const METHOD_NO_OPERATION: &str = "NoOperation";
pub const METHOD_SEARCH: &str = "SearchSubtitles";
pub const METHOD_DOWNLOAD: &str = "DownloadSubtitles";

/// A remote procedure call to the subtitle catalog.
///
/// Replies are objects carrying at least a `status` string, plus `token`
/// and `data` depending on the method.
pub trait RpcTransport: Send + Sync {
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value>;
}

/// The `status` member of a reply, if any.
pub fn reply_status(reply: &Value) -> Option<&str> {
    reply.get("status").and_then(Value::as_str)
}

/// Blocking JSON-RPC 2.0 transport over HTTP.
pub struct HttpRpcTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcReply {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl HttpRpcTransport {
    pub fn new(endpoint: impl Into<String>, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
        })
    }
}

impl RpcTransport for HttpRpcTransport {
    fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("Calling {method} (request {id})");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .map_err(|e| Error::Transport(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "{method} failed: HTTP {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .map_err(|e| Error::Transport(format!("{method}: {e}")))?;
        let reply: JsonRpcReply = serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("{method} reply is not JSON-RPC: {e}")))?;

        if let Some(error) = reply.error {
            return Err(Error::Transport(format!(
                "{method} failed: {} ({})",
                error.message, error.code
            )));
        }
        reply
            .result
            .ok_or_else(|| Error::Parse(format!("{method} reply has no result")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_status() {
        assert_eq!(reply_status(&json!({"status": "200 OK"})), Some(STATUS_OK));
        assert_eq!(reply_status(&json!({"status": 200})), None);
        assert_eq!(reply_status(&json!({})), None);
    }

    #[test]
    fn test_json_rpc_reply_shapes() {
        let ok: JsonRpcReply =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"status":"200 OK"}}"#)
                .unwrap();
        assert!(ok.error.is_none());
        assert_eq!(ok.result.unwrap()["status"], "200 OK");

        let err: JsonRpcReply = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no such method"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.unwrap().code, -32601);
    }
}
