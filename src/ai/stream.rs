//! Drives a chunk decoder over an open upstream response body.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decoder::{ChunkDecoder, LineInterpreter};
use super::events::{EventStream, FailureKind, NormalizedEvent};

/// Type alias for the boxed upstream byte stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

enum Read {
    Chunk(Option<Result<Bytes, reqwest::Error>>),
    TimedOut,
    Cancelled,
}

/// Normalized events read from one upstream response body.
///
/// Each call to [`next_event`](Self::next_event) reads at most one network
/// chunk and decodes it fully before handing out its events in order. Once
/// a terminal-class event has been returned the body is dropped, which
/// releases the connection, and every later call returns `None`.
pub struct UpstreamEvents<I> {
    provider: &'static str,
    byte_stream: Option<ByteStream>,
    decoder: ChunkDecoder<I>,
    pending: VecDeque<NormalizedEvent>,
    cancel: CancellationToken,
    idle_timeout: Duration,
    completed: bool,
}

impl<I> std::fmt::Debug for UpstreamEvents<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamEvents")
            .field("provider", &self.provider)
            .field("open", &self.byte_stream.is_some())
            .field("pending_len", &self.pending.len())
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<I: LineInterpreter + 'static> UpstreamEvents<I> {
    #[must_use]
    pub fn new(
        provider: &'static str,
        byte_stream: ByteStream,
        decoder: ChunkDecoder<I>,
        cancel: CancellationToken,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            byte_stream: Some(byte_stream),
            decoder,
            pending: VecDeque::new(),
            cancel,
            idle_timeout,
            completed: false,
        }
    }

    /// Returns the next normalized event, or `None` once the stream is over.
    pub async fn next_event(&mut self) -> Option<NormalizedEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.finish();
                }
                return Some(event);
            }
            if self.completed {
                return None;
            }

            let Some(byte_stream) = self.byte_stream.as_mut() else {
                self.completed = true;
                return None;
            };

            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Read::Cancelled,
                next = tokio::time::timeout(self.idle_timeout, byte_stream.next()) => match next {
                    Ok(item) => Read::Chunk(item),
                    Err(_) => Read::TimedOut,
                },
            };

            match read {
                Read::Chunk(Some(Ok(bytes))) => {
                    debug!(provider = self.provider, len = bytes.len(), "Upstream chunk");
                    self.pending.extend(self.decoder.feed(&bytes));
                }
                Read::Chunk(Some(Err(e))) => {
                    warn!(provider = self.provider, error = %e, "Upstream body became unreadable");
                    self.finish();
                    return Some(NormalizedEvent::failure(
                        FailureKind::StreamRead,
                        format!("Error reading {} stream: {e}", self.provider),
                    ));
                }
                Read::Chunk(None) => {
                    self.byte_stream = None;
                    self.pending.extend(self.decoder.close());
                    if self.pending.is_empty() {
                        self.completed = true;
                    }
                }
                Read::TimedOut => {
                    warn!(
                        provider = self.provider,
                        idle_secs = self.idle_timeout.as_secs(),
                        "Upstream stream went idle"
                    );
                    self.finish();
                    return Some(NormalizedEvent::failure(
                        FailureKind::Timeout,
                        format!(
                            "{} sent no data for {} seconds",
                            self.provider,
                            self.idle_timeout.as_secs()
                        ),
                    ));
                }
                Read::Cancelled => {
                    info!(provider = self.provider, "Request cancelled; releasing upstream connection");
                    self.finish();
                    return Some(NormalizedEvent::failure(
                        FailureKind::Cancelled,
                        "Request cancelled",
                    ));
                }
            }
        }
    }

    /// Returns `true` once the stream has ended.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Converts into a boxed lazy event stream.
    #[must_use]
    pub fn into_stream(self) -> EventStream {
        futures::stream::unfold(self, |mut events| async move {
            events.next_event().await.map(|event| (event, events))
        })
        .boxed()
    }

    fn finish(&mut self) {
        self.completed = true;
        self.pending.clear();
        self.byte_stream = None;
    }
}
