//! Chunk-boundary behavior of the line decoders.
//!
//! A stream must decode to the same events however the network splits it.

use anima::NormalizedEvent;
use anima::ai::decoder::{ChunkDecoder, LineInterpreter};
use anima::ai::ndjson::NdjsonDecoder;
use anima::ai::sse::SseDecoder;

const SSE_BODY: &str = concat!(
    ": OPENROUTER PROCESSING\n",
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
    "\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Grüße\"}}]}\n",
    "\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\", 世界\"}}]}\r\n",
    "\r\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\" 🎉\"}}]}\n",
    "\n",
    "data: [DONE]\n",
    "\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
);

const NDJSON_BODY: &str = concat!(
    "{\"message\":{\"role\":\"assistant\",\"content\":\"Hé\"},\"done\":false}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":false}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
    "{\"message\":{\"role\":\"assistant\",\"content\":\"late\"},\"done\":false}\n",
);

fn token(s: &str) -> NormalizedEvent {
    NormalizedEvent::Token(s.to_string())
}

fn decode_whole<I: LineInterpreter>(mut decoder: ChunkDecoder<I>, body: &[u8]) -> Vec<NormalizedEvent> {
    let mut events = decoder.feed(body);
    events.extend(decoder.close());
    events
}

fn decode_split<I: LineInterpreter>(
    mut decoder: ChunkDecoder<I>,
    body: &[u8],
    at: usize,
) -> Vec<NormalizedEvent> {
    let (head, tail) = body.split_at(at);
    let mut events = decoder.feed(head);
    events.extend(decoder.feed(tail));
    events.extend(decoder.close());
    events
}

fn assert_single_terminal(events: &[NormalizedEvent]) {
    let terminals: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(terminals, vec![events.len() - 1], "events: {events:?}");
}

#[test]
fn test_sse_whole_body() {
    let events = decode_whole(SseDecoder::default(), SSE_BODY.as_bytes());

    assert_eq!(
        events,
        vec![token("Grüße"), token(", 世界"), token(" 🎉"), NormalizedEvent::Terminal]
    );
}

#[test]
fn test_sse_every_split_point_yields_identical_events() {
    let body = SSE_BODY.as_bytes();
    let expected = decode_whole(SseDecoder::default(), body);

    for at in 0..=body.len() {
        let events = decode_split(SseDecoder::default(), body, at);
        assert_eq!(events, expected, "split at byte {at}");
        assert_single_terminal(&events);
    }
}

#[test]
fn test_sse_byte_at_a_time() {
    let mut decoder = SseDecoder::default();
    let mut events = Vec::new();
    for byte in SSE_BODY.as_bytes() {
        events.extend(decoder.feed(std::slice::from_ref(byte)));
    }
    events.extend(decoder.close());

    assert_eq!(events, decode_whole(SseDecoder::default(), SSE_BODY.as_bytes()));
}

#[test]
fn test_ndjson_every_split_point_yields_identical_events() {
    let body = NDJSON_BODY.as_bytes();
    let expected = decode_whole(NdjsonDecoder::default(), body);
    assert_eq!(expected, vec![token("Hé"), token("llo"), NormalizedEvent::Terminal]);

    for at in 0..=body.len() {
        let events = decode_split(NdjsonDecoder::default(), body, at);
        assert_eq!(events, expected, "split at byte {at}");
        assert_single_terminal(&events);
    }
}

#[test]
fn test_three_way_splits_preserve_order() {
    let body = SSE_BODY.as_bytes();
    let expected = decode_whole(SseDecoder::default(), body);

    for first in (0..body.len()).step_by(7) {
        for second in (first..body.len()).step_by(11) {
            let mut decoder = SseDecoder::default();
            let mut events = decoder.feed(&body[..first]);
            events.extend(decoder.feed(&body[first..second]));
            events.extend(decoder.feed(&body[second..]));
            events.extend(decoder.close());
            assert_eq!(events, expected, "splits at {first} and {second}");
        }
    }
}

#[test]
fn test_truncated_body_still_ends_with_one_terminal() {
    let body = SSE_BODY.as_bytes();
    let cut = SSE_BODY.find("data: [DONE]").unwrap_or(body.len());

    let events = decode_whole(SseDecoder::default(), &body[..cut]);

    assert_single_terminal(&events);
    assert_eq!(events.len(), 4);
}
