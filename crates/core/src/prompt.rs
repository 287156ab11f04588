//! Assembles the instruction prompt handed to the generation backend.

const HEADER: &str = "Search results:\n";

const INSTRUCTIONS: &str = "Answer the question using only the search results above. \
If several distinct subjects share the same name, keep them separate in the answer. \
If the search results are not relevant to the question, reply \"Found Nothing\". \
Keep the answer short.\n\n";

/// Concatenate retrieved chunks and the question into a single prompt.
/// Chunk order is preserved; no re-ranking happens here.
pub fn build_prompt(question: &str, chunks: &[String]) -> String {
    let mut prompt = String::from(HEADER);

    for chunk in chunks {
        prompt.push_str(chunk);
        prompt.push_str("\n\n");
    }

    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("Query: ");
    prompt.push_str(question);
    prompt.push_str("\n\nAnswer: ");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_still_produce_the_full_frame() {
        let prompt = build_prompt("Q", &[]);

        assert!(prompt.starts_with("Search results:\n"));
        assert!(prompt.contains("Found Nothing"));
        assert!(prompt.ends_with("Query: Q\n\nAnswer: "));
        assert!(prompt.contains("Search results:\nAnswer the question"));
    }

    #[test]
    fn chunk_order_is_preserved() {
        let chunks = vec![
            "[Page no. 1] \"first\"".to_string(),
            "[Page no. 2] \"second\"".to_string(),
        ];
        let prompt = build_prompt("what happened?", &chunks);

        let first = prompt.find("first").unwrap();
        let second = prompt.find("second").unwrap();
        assert!(first < second);
        assert!(prompt.contains("[Page no. 1] \"first\"\n\n[Page no. 2] \"second\"\n\n"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let chunks = vec!["[Page no. 3] \"text\"".to_string()];
        assert_eq!(
            build_prompt("q", &chunks),
            build_prompt("q", &chunks)
        );
    }
}
