use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::error::AgentError;

/// One decoded event from the engine's reply stream. Reasoning fragments
/// arrive before answer fragments and are kept separate so the caller can
/// log the chain of thought without mixing it into the reply body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub reasoning: Option<String>,
    pub content: Option<String>,
    pub finished: bool,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn finished() -> Self {
        Self {
            finished: true,
            ..Self::default()
        }
    }
}

/// Accumulates stream chunks into a complete reply.
///
/// A reply only counts as complete once a finish signal has been seen;
/// a stream that just stops is reported as incomplete no matter how much
/// content arrived.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    content: String,
    reasoning: String,
    completed: bool,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk in. Returns true once the finish signal has been seen.
    pub fn push(&mut self, chunk: &StreamChunk) -> bool {
        if let Some(reasoning) = &chunk.reasoning {
            self.reasoning.push_str(reasoning);
        }
        if let Some(content) = &chunk.content {
            self.content.push_str(content);
        }
        if chunk.finished {
            self.completed = true;
        }
        self.completed
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn finish(self) -> Result<String, AgentError> {
        if self.completed {
            Ok(self.content)
        } else {
            Err(AgentError::StreamIncomplete)
        }
    }

    /// Drains `stream` until a finish signal or the stream ends, returning
    /// the assembled content. Chunk-level errors abort assembly.
    pub async fn assemble<S>(mut stream: S) -> Result<String, AgentError>
    where
        S: Stream<Item = Result<StreamChunk, AgentError>> + Unpin,
    {
        let mut assembler = Self::new();
        while let Some(chunk) = stream.next().await {
            if assembler.push(&chunk?) {
                break;
            }
        }
        if !assembler.reasoning.is_empty() {
            debug!(chars = assembler.reasoning.len(), "Collected reasoning trace");
        }
        assembler.finish()
    }
}

#[derive(Deserialize)]
struct SseEvent {
    choices: Vec<SseChoice>,
}

#[derive(Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: SseDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Incremental decoder for the engine's server-sent-event wire format.
///
/// Bytes arrive in arbitrary splits, which can land inside a multi-byte
/// character; the decoder buffers raw bytes and only decodes complete
/// lines. Malformed event payloads are skipped, not fatal.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            // The space after the colon is optional in the wire format.
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();
            if data == "[DONE]" {
                chunks.push(StreamChunk::finished());
                continue;
            }

            let event: SseEvent = match serde_json::from_str(data) {
                Ok(event) => event,
                Err(e) => {
                    debug!(error = %e, "Skipping malformed stream event");
                    continue;
                }
            };

            for choice in event.choices {
                let mut chunk = StreamChunk {
                    reasoning: choice.delta.reasoning_content,
                    content: choice.delta.content,
                    finished: choice.finish_reason.as_deref() == Some("stop"),
                };
                if chunk.reasoning.as_deref() == Some("") {
                    chunk.reasoning = None;
                }
                if chunk.content.as_deref() == Some("") {
                    chunk.content = None;
                }
                if chunk != StreamChunk::default() {
                    chunks.push(chunk);
                }
            }
        }

        chunks
    }
}
