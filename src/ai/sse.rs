//! Sentinel-delimited streaming used by OpenAI-compatible chat completions.
//!
//! Each framing unit is a `data: <json>` line. Content deltas live at
//! `choices[0].delta.content` and the literal payload `[DONE]` ends the
//! stream. Everything else is tolerated:
//! - SSE comments (`: OPENROUTER PROCESSING`) and `event:` lines are skipped
//! - payloads without a content delta (role announcements, usage) are skipped
//! - payloads that are not valid JSON are skipped; the stream continues

use serde_json::Value;
use tracing::debug;

use super::decoder::{ChunkDecoder, LineInterpreter, extract_error_message};
use super::events::{FailureKind, NormalizedEvent};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const CONTENT_POINTER: &str = "/choices/0/delta/content";

/// Line interpreter for the `data:`/`[DONE]` framing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SseLines;

/// Decoder for OpenAI-compatible streams.
pub type SseDecoder = ChunkDecoder<SseLines>;

impl LineInterpreter for SseLines {
    fn family(&self) -> &'static str {
        "sse"
    }

    fn interpret(&self, line: &str, out: &mut Vec<NormalizedEvent>) {
        let Some(data) = line.trim().strip_prefix(DATA_PREFIX) else {
            return;
        };
        let data = data.trim();

        if data == DONE_SENTINEL {
            out.push(NormalizedEvent::Terminal);
            return;
        }

        let json: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping SSE data line that is not JSON");
                return;
            }
        };

        if let Some(message) = extract_error_message(&json) {
            out.push(NormalizedEvent::failure(FailureKind::UpstreamPayload, message));
            return;
        }

        if let Some(content) = json
            .pointer(CONTENT_POINTER)
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
        {
            out.push(NormalizedEvent::Token(content.to_string()));
        }
    }
}
