use crate::error::LlmError;
use crate::llm::{sse_data_payload, Completion, GenerationOptions};
use crate::traits::TextGenerator;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

/// Client for a llama.cpp-style local completion server.
///
/// The server answers `POST /completion` with an event stream; each
/// `data: `-prefixed payload is a JSON object carrying a `content` fragment
/// and a `stop` flag (the final event additionally carries timing metadata,
/// which is ignored here).
pub struct LlamaServerGenerator {
    endpoint: String,
    client: Client,
}

impl LlamaServerGenerator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LlmError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint,
            client: Client::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEvent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

/// Accumulates `content` fragments line by line until a `stop` event.
/// Malformed payloads are counted rather than silently discarded.
#[derive(Debug, Default)]
struct EventAssembler {
    text: String,
    dropped: usize,
    stopped: bool,
}

impl EventAssembler {
    fn push_line(&mut self, line: &str) {
        if self.stopped {
            return;
        }

        let Some(payload) = sse_data_payload(line) else {
            return;
        };
        if payload.is_empty() {
            return;
        }

        match serde_json::from_str::<CompletionEvent>(payload) {
            Ok(event) => {
                self.text.push_str(&event.content);
                if event.stop {
                    self.stopped = true;
                }
            }
            Err(_) => self.dropped += 1,
        }
    }

    fn into_completion(self) -> Completion {
        Completion {
            text: self.text,
            dropped_fragments: self.dropped,
        }
    }
}

#[async_trait]
impl TextGenerator for LlamaServerGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError> {
        let response = self
            .client
            .post(format!("{}/completion", self.endpoint))
            .json(&json!({
                "prompt": prompt,
                "n_predict": options.max_new_tokens,
                "stream": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::BackendResponse {
                backend: "llama-server".to_string(),
                details: response.status().to_string(),
            });
        }

        let mut assembler = EventAssembler::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|&byte| byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                assembler.push_line(String::from_utf8_lossy(&line).trim_end());

                if assembler.stopped {
                    break 'read;
                }
            }
        }

        // Trailing bytes without a final newline still hold the last event.
        if !assembler.stopped && !buffer.is_empty() {
            assembler.push_line(String::from_utf8_lossy(&buffer).trim_end());
        }

        if assembler.dropped > 0 {
            tracing::warn!(
                dropped = assembler.dropped,
                "discarded malformed completion events"
            );
        }

        Ok(assembler.into_completion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_concatenate_in_arrival_order() {
        let mut assembler = EventAssembler::default();
        assembler.push_line(r#"data: {"content":"Hel","stop":false}"#);
        assembler.push_line(r#"data: {"content":"lo","stop":false}"#);
        assembler.push_line(
            r#"data: {"content":"!","stop":true,"timings":{"predicted_ms":12.5}}"#,
        );

        assert!(assembler.stopped);
        let completion = assembler.into_completion();
        assert_eq!(completion.text, "Hello!");
        assert_eq!(completion.dropped_fragments, 0);
    }

    #[test]
    fn malformed_payloads_are_counted_not_swallowed() {
        let mut assembler = EventAssembler::default();
        assembler.push_line(r#"data: {"content":"a","stop":false}"#);
        assembler.push_line("data: {not json");
        assembler.push_line(r#"data: {"content":"b","stop":true}"#);

        let completion = assembler.into_completion();
        assert_eq!(completion.text, "ab");
        assert_eq!(completion.dropped_fragments, 1);
    }

    #[test]
    fn non_data_lines_and_blanks_are_ignored() {
        let mut assembler = EventAssembler::default();
        assembler.push_line("");
        assembler.push_line("data: ");
        assembler.push_line(": keep-alive");
        assembler.push_line(r#"data: {"content":"x","stop":true}"#);

        let completion = assembler.into_completion();
        assert_eq!(completion.text, "x");
        assert_eq!(completion.dropped_fragments, 0);
    }

    #[test]
    fn events_after_stop_are_ignored() {
        let mut assembler = EventAssembler::default();
        assembler.push_line(r#"data: {"content":"done","stop":true}"#);
        assembler.push_line(r#"data: {"content":"late","stop":false}"#);

        let completion = assembler.into_completion();
        assert_eq!(completion.text, "done");
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        assert!(LlamaServerGenerator::new("nope").is_err());
        assert!(LlamaServerGenerator::new("http://localhost:8080").is_ok());
    }
}
