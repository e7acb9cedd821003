//! Relay encoder: normalized events to client-facing `text/event-stream` frames.
//!
//! ```text
//! data: {"content":"<token>"}\n\n   one per token
//! data: [DONE]\n\n                  normal end
//! data: {"error":"<message>"}\n\n   failure; no [DONE] follows
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use tokio_util::sync::DropGuard;
use tracing::{Span, info, warn};

use crate::ai::events::{EventStream, FailureKind, NormalizedEvent};

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Serialize)]
struct ContentFrame<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    error: &'a str,
}

fn data_frame<T: Serialize>(payload: &T) -> Bytes {
    let json = serde_json::to_string(payload)
        .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string());
    Bytes::from(format!("data: {json}\n\n"))
}

/// Encodes one event as a single outbound frame.
#[must_use]
pub fn encode_event(event: &NormalizedEvent) -> Bytes {
    match event {
        NormalizedEvent::Token(text) => data_frame(&ContentFrame { content: text }),
        NormalizedEvent::Terminal => Bytes::from_static(DONE_FRAME.as_bytes()),
        NormalizedEvent::Failure { message, .. } => data_frame(&ErrorFrame { error: message }),
    }
}

/// Outbound body stream for one chat request.
///
/// Frames are written in event order. The stream ends right after the first
/// terminal-class event and drops the upstream event stream at that point;
/// nothing produced afterwards is ever written. An upstream that ends
/// without a terminal-class event is reported as a read failure.
///
/// Dropping the relay (for example when the client disconnects) drops the
/// optional cancellation guard, which cancels the upstream request.
pub struct RelayStream {
    events: Option<EventStream>,
    tokens: usize,
    span: Span,
    _cancel_guard: Option<DropGuard>,
}

impl RelayStream {
    #[must_use]
    pub fn new(events: EventStream) -> Self {
        Self {
            events: Some(events),
            tokens: 0,
            span: Span::current(),
            _cancel_guard: None,
        }
    }

    /// Cancels the guarded token when the relay is dropped.
    #[must_use]
    pub fn with_cancel_guard(mut self, guard: DropGuard) -> Self {
        self._cancel_guard = Some(guard);
        self
    }

    /// Returns `true` once the closing frame has been written.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.events.is_none()
    }

    fn close(&mut self, event: &NormalizedEvent) {
        self.events = None;
        let _enter = self.span.enter();
        match event {
            NormalizedEvent::Failure { kind, message } => {
                warn!(kind = %kind, error = %message, tokens = self.tokens, "Chat stream failed");
            }
            _ => info!(tokens = self.tokens, "Chat stream completed"),
        }
    }
}

impl std::fmt::Debug for RelayStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayStream")
            .field("closed", &self.is_closed())
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(events) = self.events.as_mut() else {
            return Poll::Ready(None);
        };

        let event = match events.as_mut().poll_next(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(event)) => event,
            Poll::Ready(None) => NormalizedEvent::failure(
                FailureKind::StreamRead,
                "Stream ended unexpectedly",
            ),
        };

        let frame = encode_event(&event);
        if event.is_terminal() {
            self.close(&event);
        } else {
            self.tokens += 1;
        }
        Poll::Ready(Some(Ok(frame)))
    }
}
