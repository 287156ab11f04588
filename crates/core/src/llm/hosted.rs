use crate::error::LlmError;
use crate::llm::{sse_data_payload, Completion, GenerationOptions};
use crate::traits::TextGenerator;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Credentials and addressing for the hosted generation API, threaded in
/// explicitly rather than read from the process environment at call sites.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub api_key: String,
    pub base_url: String,
    pub project_id: String,
}

/// Client for the hosted text-generation API. The endpoint streams
/// generated-text fragments as server-sent events; fragments are
/// concatenated in arrival order.
pub struct HostedGenerator {
    config: HostedConfig,
    client: Client,
}

impl HostedGenerator {
    pub fn new(mut config: HostedConfig) -> Result<Self, LlmError> {
        Url::parse(&config.base_url)?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            config,
            client: Client::new(),
        })
    }
}

/// Pull the generated-text fragment out of one event payload. The API
/// nests fragments under `results`; a bare `generated_text` field is
/// accepted as well.
fn fragment_text(value: &Value) -> Option<&str> {
    value
        .pointer("/results/0/generated_text")
        .or_else(|| value.pointer("/generated_text"))
        .and_then(Value::as_str)
}

#[derive(Debug, Default)]
struct FragmentAssembler {
    text: String,
    dropped: usize,
    done: bool,
}

impl FragmentAssembler {
    fn push_line(&mut self, line: &str) {
        if self.done {
            return;
        }

        let Some(payload) = sse_data_payload(line) else {
            return;
        };
        if payload.is_empty() {
            return;
        }
        if payload == "[DONE]" {
            self.done = true;
            return;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => match fragment_text(&value) {
                Some(fragment) => self.text.push_str(fragment),
                None => self.dropped += 1,
            },
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
impl TextGenerator for HostedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, LlmError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/text/generation_stream",
                self.config.base_url
            ))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "input": prompt,
                "project_id": self.config.project_id,
                "parameters": {
                    "decoding_method": options.decoding.as_str(),
                    "max_new_tokens": options.max_new_tokens,
                    "temperature": options.temperature,
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::BackendResponse {
                backend: "hosted".to_string(),
                details: response.status().to_string(),
            });
        }

        let mut assembler = FragmentAssembler::default();
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline) = buffer.iter().position(|&byte| byte == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                assembler.push_line(String::from_utf8_lossy(&line).trim_end());

                if assembler.done {
                    break 'read;
                }
            }
        }

        if !assembler.done && !buffer.is_empty() {
            assembler.push_line(String::from_utf8_lossy(&buffer).trim_end());
        }

        if assembler.dropped > 0 {
            tracing::warn!(
                dropped = assembler.dropped,
                "discarded malformed generation events"
            );
        }

        Ok(assembler.into_completion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_and_bare_fragments_are_extracted() {
        let nested = json!({ "results": [{ "generated_text": "Hello" }] });
        assert_eq!(fragment_text(&nested), Some("Hello"));

        let bare = json!({ "generated_text": " world" });
        assert_eq!(fragment_text(&bare), Some(" world"));

        let neither = json!({ "status": "ok" });
        assert_eq!(fragment_text(&neither), None);
    }

    #[test]
    fn stream_concatenates_fragments_until_done() {
        let mut assembler = FragmentAssembler::default();
        assembler.push_line(r#"data: {"results":[{"generated_text":"The answer"}]}"#);
        assembler.push_line(r#"data: {"results":[{"generated_text":" is 42."}]}"#);
        assembler.push_line("data: [DONE]");
        assembler.push_line(r#"data: {"results":[{"generated_text":"ignored"}]}"#);

        let completion = assembler.into_completion();
        assert_eq!(completion.text, "The answer is 42.");
        assert_eq!(completion.dropped_fragments, 0);
    }

    #[test]
    fn unparseable_events_are_counted() {
        let mut assembler = FragmentAssembler::default();
        assembler.push_line(r#"data: {"generated_text":"ok"}"#);
        assembler.push_line("data: garbage");
        assembler.push_line(r#"data: {"no_text_here":true}"#);

        let completion = assembler.into_completion();
        assert_eq!(completion.text, "ok");
        assert_eq!(completion.dropped_fragments, 2);
    }

    #[test]
    fn base_url_is_validated_and_trimmed() {
        let generator = HostedGenerator::new(HostedConfig {
            api_key: "key".to_string(),
            base_url: "https://api.example.com/".to_string(),
            project_id: "proj".to_string(),
        })
        .unwrap();
        assert_eq!(generator.config.base_url, "https://api.example.com");

        assert!(HostedGenerator::new(HostedConfig {
            api_key: "key".to_string(),
            base_url: "no scheme".to_string(),
            project_id: "proj".to_string(),
        })
        .is_err());
    }
}
