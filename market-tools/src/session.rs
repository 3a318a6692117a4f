//! Line-oriented request loop: one JSON request in, one JSON response out.
//!
//! A request names either a tool-invocation operation or a function-calling name:
//! `{"operation": "list-coins", "arguments": {"page": 2}}` or
//! `{"function": "list_coins", "arguments": {"page": 2}}`. Every request gets exactly one
//! `{"ok": bool, "text": "..."}` line back, including malformed ones.

use crate::dispatch::Dispatcher;
use crate::payload::ToolPayload;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{stdin, BufRead, Write};
use tracing::debug;

pub trait RequestSource: Send + 'static {
    /// Next raw request line. `None` ends the session.
    fn next_request(&mut self) -> Result<Option<String>>;
}

/// Reads requests from stdin. A blank line, `exit` or EOF ends the session.
pub struct StdinSource;

impl RequestSource for StdinSource {
    fn next_request(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read request from stdin")?;
        if read == 0 || ends_session(&line) {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn ends_session(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.eq_ignore_ascii_case("exit")
}

/// Vector-based request source for testing.
pub struct VecSource {
    buf: std::vec::IntoIter<String>,
}

impl VecSource {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            buf: lines.into_iter(),
        }
    }
}

impl RequestSource for VecSource {
    fn next_request(&mut self) -> Result<Option<String>> {
        match self.buf.next() {
            Some(line) if !ends_session(&line) => {
                debug!("Providing request: {}", line);
                Ok(Some(line))
            }
            _ => {
                debug!("No more requests available");
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    operation: Option<String>,
    function: Option<String>,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    ok: bool,
    text: String,
}

impl From<ToolPayload> for SessionResponse {
    fn from(payload: ToolPayload) -> Self {
        Self {
            ok: !payload.is_error,
            text: payload.text,
        }
    }
}

impl SessionResponse {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: reason.into(),
        }
    }
}

/// Answers requests from `source` until it runs dry. Returns how many were handled.
pub async fn run_session<S, W>(
    dispatcher: &Dispatcher,
    mut source: S,
    out: &mut W,
) -> Result<usize>
where
    S: RequestSource,
    W: Write,
{
    let mut handled = 0;
    while let Some(line) = source.next_request()? {
        let response = handle(dispatcher, &line).await;
        let encoded = serde_json::to_string(&response).context("Failed to encode response")?;
        writeln!(out, "{encoded}").context("Failed to write response")?;
        out.flush().context("Failed to flush response")?;
        handled += 1;
    }
    Ok(handled)
}

async fn handle(dispatcher: &Dispatcher, line: &str) -> SessionResponse {
    let request: SessionRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return SessionResponse::rejected(format!("malformed request: {e}")),
    };

    let result = match (request.operation, request.function) {
        (Some(name), None) => dispatcher.dispatch(&name, request.arguments).await,
        (None, Some(name)) => dispatcher.dispatch_function(&name, request.arguments).await,
        _ => {
            return SessionResponse::rejected(
                "malformed request: exactly one of `operation` or `function` must be set",
            )
        }
    };

    match result {
        Ok(payload) => payload.into(),
        Err(e) => ToolPayload::from_error(&e).into(),
    }
}
