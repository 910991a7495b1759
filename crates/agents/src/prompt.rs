// Path: crates/agents/src/prompt.rs

//! Prompt construction shared by the agents.
//!
//! The reader answers a scope question strictly from supplied chunks; the
//! validator audits the reader's citations with a structurally different
//! prompt. Both are told to return a bare JSON object and nothing else.

use scopegate_api::index::IndexedChunk;
use scopegate_types::agent::ReaderOutput;

/// Renders retrieved chunks as a numbered evidence block. Chunk identity is
/// spelled out so citations can name `(document_id, chunk_index)` exactly.
pub fn render_chunks(chunks: &[IndexedChunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "--- EVIDENCE {} | document_id: {} | chunk_index: {} | source: {} | effective: {} ---\n{}\n\n",
            i,
            chunk.meta.document_id,
            chunk.meta.chunk_index,
            chunk.meta.source_kind,
            chunk.meta.effective_start,
            chunk.text
        ));
    }
    out
}

/// The reader's system prompt.
pub fn reader_system() -> String {
    "You are a tariff scope reader for a legal verification system.\n\
     You answer ONLY from the evidence chunks supplied in the user message.\n\
     Never use outside knowledge. If the chunks do not entail a yes-or-no\n\
     answer, set in_scope to \"unknown\".\n\n\
     Every citation quote MUST be copied verbatim, character for character,\n\
     from a single chunk. Do not paraphrase, normalize, or merge text from\n\
     different chunks; a quote that is not an exact substring is discarded\n\
     by a mechanical check and your answer is wasted.\n\n\
     Return ONLY a JSON object with this shape (no markdown fences):\n\
     {\n\
       \"answer\": {\"in_scope\": \"yes|no|unknown\", \"program\": \"...\",\n\
                  \"hts\": \"...\", \"claim_codes\": [\"9903.xx.yy\"],\n\
                  \"confidence\": \"high|medium|low\"},\n\
       \"citations\": [{\"document_id\": \"...\", \"chunk_index\": 0,\n\
                      \"quote\": \"verbatim text\",\n\
                      \"why_this_supports\": \"...\"}],\n\
       \"missing_info\": [], \"contradictions\": []\n\
     }"
        .to_string()
}

/// The reader's user message for one question.
pub fn reader_user(question: &str, chunks: &[IndexedChunk]) -> String {
    format!(
        "QUESTION: {}\n\nEVIDENCE CHUNKS:\n{}",
        question,
        render_chunks(chunks)
    )
}

/// The validator's system prompt. Deliberately a checklist audit, not a
/// question-answering prompt, so reader and validator do not share failure
/// modes.
pub fn validator_system() -> String {
    "You audit citations produced by another system. You do not answer the\n\
     underlying question and you have no opinion about tariffs.\n\n\
     For each citation in the submission, work through this checklist:\n\
     1. Does the quote appear verbatim in the chunk it names?\n\
     2. Does the quoted text actually state what the answer claims, without\n\
        inference beyond the words on the page?\n\
     3. Does the quote concern the same HTS code and program as the answer?\n\
     4. Do any supplied chunks contradict the answer?\n\n\
     A submission is verified only if every citation passes every point.\n\
     Return ONLY a JSON object (no markdown fences):\n\
     {\"verified\": true|false,\n\
      \"failures\": [{\"citation_index\": 0, \"reason\": \"...\"}],\n\
      \"confidence\": \"high|medium|low\"}"
        .to_string()
}

/// The validator's user message: the same chunks plus the reader's output.
pub fn validator_user(chunks: &[IndexedChunk], reader_output: &ReaderOutput) -> String {
    let submission =
        serde_json::to_string_pretty(reader_output).unwrap_or_else(|_| "{}".to_string());
    format!(
        "EVIDENCE CHUNKS:\n{}\nSUBMISSION TO AUDIT:\n{}",
        render_chunks(chunks),
        submission
    )
}

/// The discovery agent's system prompt. Contractually limited to locator
/// records; conclusions about scope are out of bounds.
pub fn discovery_system() -> String {
    "You locate primary-source US tariff documents. You may use your\n\
     knowledge of where such documents live, but you NEVER state whether\n\
     anything is in scope; you only point at documents.\n\n\
     Acceptable source kinds and locators:\n\
     - \"federal_register\": a citation like \"90 FR 21891\" or an\n\
       https://www.federalregister.gov/ URL\n\
     - \"csms_bulletin\": a CSMS number like \"65936570\" or an\n\
       https://content.govdelivery.com/ URL\n\
     - \"usitc_hts\": an https://hts.usitc.gov/ URL\n\n\
     Return ONLY a JSON object (no markdown fences):\n\
     {\"candidates\": [{\"source_kind\": \"...\", \"locator\": \"...\",\n\
                      \"why_relevant\": \"...\",\n\
                      \"expected_contents\": [\"...\"]}]}"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use scopegate_api::index::ChunkMeta;
    use scopegate_types::document::{DocumentId, SourceKind, Tier};

    fn chunk(text: &str) -> IndexedChunk {
        IndexedChunk {
            meta: ChunkMeta {
                tier: Tier::A,
                source_kind: SourceKind::CsmsBulletin,
                document_id: DocumentId([1u8; 16]),
                chunk_index: 3,
                published_at: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
                effective_start: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                program_hint: None,
            },
            text: text.into(),
            score: 0.9,
            lexical_score: 0.5,
        }
    }

    #[test]
    fn chunk_rendering_names_identity_exactly() {
        let rendered = render_chunks(&[chunk("Subheading 8544.42.9090 is covered.")]);
        assert!(rendered.contains("document_id: 01010101010101010101010101010101"));
        assert!(rendered.contains("chunk_index: 3"));
        assert!(rendered.contains("Subheading 8544.42.9090 is covered."));
    }

    #[test]
    fn reader_and_validator_prompts_differ_materially() {
        let r = reader_system();
        let v = validator_system();
        assert!(r.contains("in_scope"));
        assert!(v.contains("checklist"));
        assert!(!v.contains("You answer ONLY from the evidence"));
    }
}
