//! Server-sent events from a streamed chat reply

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

use crate::{ChatChunk, DocReference, PlatformError, Result};

/// Payload that marks the end of a stream
pub const DONE: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    docs: Vec<DocReference>,
}

/// Decode one event payload into a chunk
pub fn parse_chunk(payload: &str) -> Result<ChatChunk> {
    let event: StreamEvent = serde_json::from_str(payload)
        .map_err(|e| PlatformError::InvalidResponse(format!("stream event: {e}")))?;

    let content = event
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content);

    Ok(ChatChunk {
        content,
        docs: event.docs,
    })
}

/// Decode an event stream body and forward each chunk until `[DONE]`
///
/// Transport errors are forwarded once and end the stream.
pub async fn forward_events<S, B, E>(body: S, tx: mpsc::Sender<Result<ChatChunk>>)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<PlatformError> + fmt::Display,
{
    let events = body.eventsource();
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        let chunk = match event {
            Ok(event) if event.data.trim() == DONE => return,
            Ok(event) if event.data.trim().is_empty() => continue,
            Ok(event) => parse_chunk(&event.data),
            Err(EventStreamError::Transport(e)) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
            Err(e) => Err(PlatformError::InvalidResponse(format!("event stream: {e}"))),
        };

        if tx.send(chunk).await.is_err() {
            trace!("Chat stream receiver dropped");
            return;
        }
    }
}
