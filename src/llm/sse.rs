use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::llm::{GenerationError, TextStream};

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

struct DecoderState<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, GenerationError>>,
    finished: bool,
}

impl<S> DecoderState<S> {
    fn drain_events(&mut self) {
        while let Some(pos) = find_event_boundary(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            self.push_event(&event[..pos]);
        }
    }

    fn push_event(&mut self, raw: &[u8]) {
        if self.finished {
            return;
        }
        match decode_event(raw) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

fn find_event_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Decode one server-sent event into the text it carries, if any.
fn decode_event(raw: &[u8]) -> Result<Option<String>, GenerationError> {
    let event = String::from_utf8_lossy(raw);
    let data: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|d| d.strip_prefix(' ').unwrap_or(d))
        .collect();

    if data.is_empty() {
        return Ok(None);
    }
    let data = data.join("\n");
    if data.trim().is_empty() || data.trim() == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk =
        serde_json::from_str(&data).map_err(|e| GenerationError::Decode(e.to_string()))?;

    if let Some(error) = chunk.error {
        let message = if error.status.is_empty() {
            error.message
        } else {
            format!("{}: {}", error.status, error.message)
        };
        return Err(GenerationError::from_status(error.code, message));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Turn a raw `text/event-stream` body into a stream of generated text.
///
/// Events may be split across byte chunks at any point. The stream ends after
/// the first error, whether it came from the transport or from an error
/// payload inside the stream.
pub fn decode_text_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecoderState {
        inner: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state
                        .buffer
                        .extend(chunk.as_ref().iter().copied().filter(|b| *b != b'\r'));
                    state.drain_events();
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(GenerationError::Stream(e.to_string())));
                    state.finished = true;
                }
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_event(&rest);
                    state.finished = true;
                }
            }
        }
    }))
}
