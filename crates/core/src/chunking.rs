use crate::error::IngestError;
use crate::extractor::PageText;

pub const DEFAULT_MAX_WORDS: usize = 150;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Upper bound on words per chunk.
    pub max_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

/// A page-labeled excerpt, already wrapped in its display form
/// `[Page no. {page}] "{text}"`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChunk {
    pub text: String,
    pub page_number: u32,
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Split ordered page texts into word windows of at most `max_words`.
///
/// A trailing window shorter than `max_words` is not emitted mid-document:
/// its words are carried forward to the front of the next page's word
/// stream and inherit that page's number. Only the final window of the
/// final page may be short. Output order is emission order and is fully
/// determined by the input.
pub fn chunk_pages(pages: &[PageText], config: ChunkerConfig) -> Result<Vec<PageChunk>, IngestError> {
    if config.max_words == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "max_words must be positive".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for (index, page) in pages.iter().enumerate() {
        let mut words = std::mem::take(&mut pending);
        words.extend(
            normalize_whitespace(&page.text)
                .split(' ')
                .filter(|word| !word.is_empty())
                .map(str::to_string),
        );

        let last_page = index + 1 == pages.len();
        let mut offset = 0;

        while offset < words.len() {
            let end = (offset + config.max_words).min(words.len());

            if end == words.len() && end - offset < config.max_words && !last_page {
                pending = words.split_off(offset);
                break;
            }

            let body = words[offset..end].join(" ");
            chunks.push(PageChunk {
                text: format!("[Page no. {}] \"{}\"", page.number, body.trim()),
                page_number: page.number,
            });
            offset = end;
        }
    }

    Ok(chunks)
}
