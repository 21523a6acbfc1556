//! AI narrative over the aggregated incidents: prompt building, the
//! streamed completion and terminal rendering of the reply.

pub mod client;
pub mod markdown;
pub mod prompts;
pub mod stream;

pub use client::ChatClient;
pub use markdown::{clean_ai_output, render_markdown};
pub use prompts::{question_messages, summary_messages, PromptData, ServiceBreakdown};
pub use stream::{
    consume_snapshots, snapshot_stream, CancellationToken, SnapshotReducer, StreamOutcome,
    StreamSlot,
};
