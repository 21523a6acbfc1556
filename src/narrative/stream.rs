//! Streaming chat completions as a sequence of cumulative snapshots.
//!
//! The endpoint sends server-sent events carrying content deltas. They are
//! folded into full-text snapshots here, so consumers always overwrite the
//! displayed text instead of appending to it. [`SnapshotReducer`] drops
//! snapshots identical to the last one rendered.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};
pub use tokio_util::sync::CancellationToken;

use crate::errors::AIError;
use crate::types::ai::OpenAIStreamChunk;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Incremental line decoder for `text/event-stream` bodies.
///
/// Network chunks may split lines or multi-byte characters, so raw bytes are
/// buffered until a newline arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        Self::parse_line(&line).into_iter().collect()
    }

    fn parse_line(line: &[u8]) -> Option<SseEvent> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(['\n', '\r']);
        let payload = line.strip_prefix("data:")?.trim_start();
        match payload {
            "" => None,
            "[DONE]" => Some(SseEvent::Done),
            other => Some(SseEvent::Data(other.to_string())),
        }
    }
}

/// Folds content deltas into the full text received so far.
#[derive(Debug, Default)]
pub struct SnapshotAccumulator {
    content: String,
}

impl SnapshotAccumulator {
    /// Apply one `data:` payload and return the cumulative snapshot.
    pub fn apply(&mut self, payload: &str) -> Result<String, AIError> {
        let chunk: OpenAIStreamChunk =
            serde_json::from_str(payload).map_err(AIError::StreamParse)?;
        if let Some(error) = chunk.error {
            return Err(AIError::StreamError(error.message));
        }
        for choice in chunk.choices {
            if let Some(delta) = choice.delta.content {
                self.content.push_str(&delta);
            }
        }
        Ok(self.content.clone())
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

struct SnapshotState<S> {
    bytes: S,
    decoder: SseDecoder,
    accumulator: SnapshotAccumulator,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

/// Turn a raw response body into a stream of cumulative snapshots.
///
/// The stream ends at `[DONE]`, at end of body, or right after the first error.
pub fn snapshot_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, AIError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<AIError>,
{
    let state = SnapshotState {
        bytes,
        decoder: SseDecoder::default(),
        accumulator: SnapshotAccumulator::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                match event {
                    SseEvent::Done => {
                        st.pending.clear();
                        st.finished = true;
                        return None;
                    }
                    SseEvent::Data(payload) => {
                        let item = st.accumulator.apply(&payload);
                        if item.is_err() {
                            st.pending.clear();
                            st.finished = true;
                        }
                        return Some((item, st));
                    }
                }
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.finished = true;
                    let events = st.decoder.finish();
                    st.pending.extend(events);
                }
            }
        }
    })
}

/// Keeps the last rendered snapshot and rejects redundant ones.
#[derive(Debug, Default)]
pub struct SnapshotReducer {
    last: Option<String>,
}

impl SnapshotReducer {
    /// Returns `true` when `snapshot` should be rendered.
    pub fn accept(&mut self, snapshot: &str) -> bool {
        if snapshot.is_empty() || self.last.as_deref() == Some(snapshot) {
            return false;
        }
        self.last = Some(snapshot.to_string());
        true
    }

    pub fn latest(&self) -> Option<&str> {
        self.last.as_deref()
    }

    pub fn into_latest(self) -> String {
        self.last.unwrap_or_default()
    }
}

/// Owns the cancellation token of the in-flight stream, if any.
///
/// Starting a new stream cancels the previous one so two streams never race
/// to overwrite the same output.
#[derive(Debug, Default)]
pub struct StreamSlot {
    current: Option<CancellationToken>,
}

impl StreamSlot {
    pub fn begin(&mut self) -> CancellationToken {
        if let Some(previous) = self.current.take() {
            if !previous.is_cancelled() {
                tracing::debug!("取消上一个未完成的流式请求");
            }
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

/// How a consumed stream ended. Both variants carry the last rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(String),
    Cancelled(String),
}

impl StreamOutcome {
    pub fn text(&self) -> &str {
        match self {
            StreamOutcome::Completed(text) | StreamOutcome::Cancelled(text) => text,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamOutcome::Cancelled(_))
    }
}

/// Drive a snapshot stream, calling `render` once per distinct snapshot.
pub async fn consume_snapshots<S, F>(
    snapshots: S,
    cancel: &CancellationToken,
    mut render: F,
) -> Result<StreamOutcome, AIError>
where
    S: Stream<Item = Result<String, AIError>>,
    F: FnMut(&str),
{
    futures_util::pin_mut!(snapshots);
    let mut reducer = SnapshotReducer::default();
    let mut received = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(snapshots = received, "流式请求已取消");
                return Ok(StreamOutcome::Cancelled(reducer.into_latest()));
            }
            next = snapshots.next() => match next {
                Some(Ok(snapshot)) => {
                    received += 1;
                    if reducer.accept(&snapshot) {
                        render(&snapshot);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("流式响应失败: {}", e);
                    return Err(e);
                }
                None => break,
            }
        }
    }

    tracing::debug!(snapshots = received, "流式响应结束");
    Ok(StreamOutcome::Completed(reducer.into_latest()))
}
