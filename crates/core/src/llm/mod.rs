//! Generation backends.
//!
//! Both backends are reached through the same seam: submit a prompt plus
//! [`GenerationOptions`], receive a finite ordered sequence of text
//! fragments already concatenated into a [`Completion`]. The wire-level
//! differences (bearer-authenticated SSE endpoint vs. raw llama.cpp-style
//! chunked JSON) live in the adapters.

pub mod hosted;
pub mod local;

pub use hosted::{HostedConfig, HostedGenerator};
pub use local::LlamaServerGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingMethod {
    Greedy,
    Sample,
}

impl DecodingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodingMethod::Greedy => "greedy",
            DecodingMethod::Sample => "sample",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub decoding: DecodingMethod,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            decoding: DecodingMethod::Greedy,
            max_new_tokens: 300,
            temperature: 0.7,
        }
    }
}

/// The concatenated fragment stream. `dropped_fragments` counts stream
/// payloads that failed to parse and were discarded; callers can decide
/// whether an incomplete concatenation is acceptable.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub dropped_fragments: usize,
}

/// Strip the fixed `data: ` event prefix, returning the payload.
pub(crate) fn sse_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(str::trim)
}
