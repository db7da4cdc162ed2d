use axum::body::{Body, Bytes};
use futures::stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use tokio::sync::mpsc;

use crate::logger::{InteractionLogger, InteractionRecord};

/// Terminal SSE sentinel, relayed as the literal final frame.
pub const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

const ERROR_BODY_PREVIEW_LIMIT: usize = 300;

/// A single parsed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub delta_content: Option<String>,
    pub is_terminal: bool,
}

/// Parse one `data:`-prefixed frame. Returns `None` for anything else
/// (comments, empty separators, non-data lines).
pub fn parse_frame(frame: &str) -> Option<StreamEvent> {
    let line = frame.trim();
    let payload = line.strip_prefix("data:")?.trim();

    if payload == "[DONE]" {
        return Some(StreamEvent {
            delta_content: None,
            is_terminal: true,
        });
    }

    Some(StreamEvent {
        delta_content: delta_content(payload),
        is_terminal: false,
    })
}

fn delta_content(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_owned)
}

/// Rebuilds the assistant's full reply from relayed chunks.
///
/// Splits each chunk on the blank-line frame delimiter and appends every
/// `choices[0].delta.content` string in arrival order. Frames cut at a chunk
/// boundary whose payload no longer parses are dropped from the aggregate;
/// the relay forwards the raw bytes either way, so only the log is lossy.
#[derive(Debug, Default)]
pub struct ReplyAggregator {
    reply: String,
    done: bool,
}

impl ReplyAggregator {
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        for part in text.split("\n\n") {
            let Some(event) = parse_frame(part) else {
                continue;
            };
            if event.is_terminal {
                self.done = true;
            } else if !self.done {
                if let Some(content) = event.delta_content {
                    self.reply.push_str(&content);
                }
            }
        }
    }

    pub fn full_reply(&self) -> &str {
        &self.reply
    }

    pub fn into_full_reply(self) -> String {
        self.reply
    }
}

/// One `data: {"choices":[{"delta":{"content": <message>}}]}\n\n` frame.
pub fn error_frame(message: &str) -> Bytes {
    let payload = json!({"choices": [{"delta": {"content": message}}]});
    Bytes::from(format!("data: {}\n\n", payload))
}

pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME)
}

/// Two-frame synthetic failure body: one error delta frame, one terminal
/// frame. Used when the backend cannot be contacted before any byte arrived.
pub fn synthetic_failure_body(message: &str) -> Body {
    let frames = vec![
        Ok::<_, Infallible>(error_frame(message)),
        Ok(done_frame()),
    ];
    Body::from_stream(stream::iter(frames))
}

fn channel_body(rx: mpsc::Receiver<Bytes>) -> Body {
    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });
    Body::from_stream(stream)
}

/// Relay a backend streaming response to the caller.
///
/// A spawned task drives the backend stream: every chunk is forwarded
/// byte-for-byte through a bounded channel while the aggregator rebuilds the
/// reply text. When the caller disconnects the channel send fails and the
/// task drops the response, closing the backend connection. Exactly one
/// interaction record is written per call, after the last forwarded byte.
pub fn relay_stream(
    response: reqwest::Response,
    logger: InteractionLogger,
    request_body: Value,
) -> Body {
    let (tx, rx) = mpsc::channel::<Bytes>(16);

    tokio::spawn(async move {
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            // The backend refused before streaming began; its error travels
            // inside the SSE payload since our 200 is already committed.
            let text = response.text().await.unwrap_or_default();
            let preview: String = text.chars().take(ERROR_BODY_PREVIEW_LIMIT).collect();
            let payload = json!({"error": status.as_u16(), "body": preview});
            let _ = tx.send(Bytes::from(format!("data: {}\n\n", payload))).await;
            let _ = tx.send(done_frame()).await;

            logger
                .append(InteractionRecord::new(
                    status.as_u16(),
                    request_body,
                    json!({"stream": true, "full_reply": ""}),
                ))
                .await;
            return;
        }

        let mut response = response;
        let mut aggregator = ReplyAggregator::default();

        loop {
            // A dropped caller must cancel the backend read even while the
            // backend is silent, so the read races against channel closure.
            let chunk = tokio::select! {
                chunk = response.chunk() => chunk,
                _ = tx.closed() => {
                    tracing::debug!("Streaming caller disconnected, cancelling backend stream");
                    break;
                }
            };

            match chunk {
                Ok(Some(chunk)) => {
                    aggregator.push_chunk(&chunk);
                    if tx.send(chunk).await.is_err() {
                        tracing::debug!("Streaming caller disconnected, cancelling backend stream");
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = %err, "Backend stream failed mid-relay");
                    let _ = tx
                        .send(error_frame("\n[Error] Lost connection to the LLM backend."))
                        .await;
                    let _ = tx.send(done_frame()).await;
                    break;
                }
            }
        }

        drop(response);

        // Whatever was aggregated up to this point, even for a cancelled or
        // mid-stream-failed relay.
        logger
            .append(InteractionRecord::new(
                status.as_u16(),
                request_body,
                json!({"stream": true, "full_reply": aggregator.into_full_reply()}),
            ))
            .await;
    });

    channel_body(rx)
}
