//! Server-Sent Events support
//!
//! Every event is a bare `data:` line carrying one JSON object.

use crate::candidates::CandidateEvent;
use crate::protocol::ReplyEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Stream a conversational reply
pub fn reply_stream(
    rx: mpsc::Receiver<ReplyEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse_response(ReceiverStream::new(rx).map(|event| reply_event_to_json(&event)))
}

/// Stream ranking candidates
pub fn candidate_stream(
    rx: mpsc::Receiver<CandidateEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    sse_response(ReceiverStream::new(rx).map(|event| candidate_event_to_json(&event)))
}

fn sse_response(
    stream: impl Stream<Item = Value> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream.map(|data| Ok(Event::default().data(data.to_string())));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn reply_event_to_json(event: &ReplyEvent) -> Value {
    match event {
        ReplyEvent::Segment(segment) => json!({ "response": segment.as_str() }),
        ReplyEvent::Done { history } => json!({ "done": true, "history": history }),
        ReplyEvent::Error { message } => json!({ "error": message }),
    }
}

fn candidate_event_to_json(event: &CandidateEvent) -> Value {
    match event {
        CandidateEvent::Token { index, token } => json!({
            "index": index,
            "token": token,
            "done": false
        }),
        CandidateEvent::CandidateDone { index, candidate } => json!({
            "index": index,
            "done": true,
            "full_response": candidate.text,
            "tokens": candidate.tokens
        }),
        CandidateEvent::AllDone { responses } => json!({
            "all_done": true,
            "responses": responses
        }),
        CandidateEvent::Error { message } => json!({ "error": message }),
    }
}
