//! Newline-delimited JSON streaming used by the local Ollama backend.
//!
//! Every line is a complete JSON object. Content lives at `message.content`
//! and a boolean `done` field ends the stream; there is no sentinel line.

use serde_json::Value;
use tracing::debug;

use super::decoder::{ChunkDecoder, LineInterpreter, extract_error_message};
use super::events::{FailureKind, NormalizedEvent};

const CONTENT_POINTER: &str = "/message/content";

#[derive(Debug, Default, Clone, Copy)]
pub struct NdjsonLines;

/// Decoder for newline-delimited JSON streams.
pub type NdjsonDecoder = ChunkDecoder<NdjsonLines>;

impl LineInterpreter for NdjsonLines {
    fn family(&self) -> &'static str {
        "ndjson"
    }

    fn interpret(&self, line: &str, out: &mut Vec<NormalizedEvent>) {
        let json: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping NDJSON line that is not JSON");
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

        if json.get("done").and_then(Value::as_bool) == Some(true) {
            out.push(NormalizedEvent::Terminal);
        }
    }
}
