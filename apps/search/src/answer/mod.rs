//! Answer composition: retrieved chunks + query -> prompt -> completion text.

pub mod prompts;

use std::sync::Arc;

use tracing::info;

use crate::llm_client::{CompletionService, LlmError};
use crate::store::SearchResult;
use prompts::{candidate_prompt, CONTEXT_SEPARATOR};

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub prompt: String,
}

/// Joins chunk texts in rank order.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.entry.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(query: &str, results: &[SearchResult]) -> String {
    candidate_prompt(query, &build_context(results))
}

#[derive(Clone)]
pub struct AnswerComposer {
    completion: Arc<dyn CompletionService>,
}

impl AnswerComposer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub async fn compose(&self, query: &str, results: &[SearchResult]) -> Result<Answer, LlmError> {
        let prompt = build_prompt(query, results);
        info!("Requesting candidate summary ({} chunks)", results.len());
        let text = self.completion.complete(&prompt).await?;
        Ok(Answer { text, prompt })
    }
}
