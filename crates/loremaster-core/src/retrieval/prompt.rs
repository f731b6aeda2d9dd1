//! Prompt assembly
//!
//! Formats surviving chunks into the context block shown to the LLM.

use super::RetrievedChunk;
use crate::llm::ChatMessage;

/// Persona establishing grounded, cited answers
const SYSTEM_PROMPT: &str = "You are an expert on the Advanced Dungeons & Dragons 1st Edition \
rulebooks. Answer the question using only the rulebook excerpts provided. Cite page numbers \
when the excerpts include them. If the excerpts do not contain the answer, say so plainly \
instead of guessing.";

/// Answer returned when retrieval produced no context at all
pub const NO_CONTEXT_ANSWER: &str = "I could not find any relevant passages in the rulebooks \
for that question.";

const CHUNK_DELIMITER: &str = "---";

/// Build the system and user messages for a grounded completion
pub fn build_messages(question: &str, chunks: &[RetrievedChunk]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Rulebook excerpts:\n\n{}\nQuestion: {}",
            format_context(chunks),
            question
        )),
    ]
}

fn format_context(chunks: &[RetrievedChunk]) -> String {
    let total = chunks.len();
    let mut out = String::new();

    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!("[Chunk {}/{}]", i + 1, total));
        if let Some(title) = chunk.title() {
            out.push_str(&format!(" {}", title));
        }
        if let Some(page) = chunk.metadata.get("page") {
            out.push_str(&format!(" (page {})", page));
        }
        if let Some(category) = chunk.metadata.get("category").and_then(|v| v.as_str()) {
            if category != "null" {
                out.push_str(&format!(" [{}]", category));
            }
        }
        out.push_str("\n\n");
        out.push_str(&chunk.text);
        out.push_str("\n\n");
        out.push_str(CHUNK_DELIMITER);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MetadataValue;
    use std::collections::HashMap;

    fn chunk(title: Option<&str>, page: Option<i64>, category: Option<&str>) -> RetrievedChunk {
        let mut metadata = HashMap::new();
        if let Some(t) = title {
            metadata.insert("title".to_string(), MetadataValue::from(t));
        }
        if let Some(p) = page {
            metadata.insert("page".to_string(), MetadataValue::Int(p));
        }
        if let Some(c) = category {
            metadata.insert("category".to_string(), MetadataValue::from(c));
        }
        RetrievedChunk {
            id: "x".to_string(),
            text: "Some rule text.".to_string(),
            metadata,
            distance: 0.1,
        }
    }

    #[test]
    fn builds_system_and_user_messages() {
        let messages = build_messages("How far can an owlbear see?", &[chunk(None, None, None)]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.ends_with("Question: How far can an owlbear see?"));
    }

    #[test]
    fn headers_carry_title_page_and_category() {
        let chunks = vec![
            chunk(Some("OWLBEAR"), Some(77), None),
            chunk(Some("Demon: Orcus"), None, Some("Demon")),
        ];
        let messages = build_messages("q", &chunks);
        let body = &messages[1].content;

        assert!(body.contains("[Chunk 1/2] OWLBEAR (page 77)"));
        assert!(body.contains("[Chunk 2/2] Demon: Orcus [Demon]"));
        assert!(body.contains("Some rule text."));
        assert!(body.contains("---"));
    }

    #[test]
    fn null_category_is_omitted() {
        let messages = build_messages("q", &[chunk(Some("RULE"), None, Some("null"))]);
        assert!(!messages[1].content.contains("[null]"));
    }
}
