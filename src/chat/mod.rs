// Question answering: guardrail check, retrieval, grounded generation and
// citation assembly, one AnswerResult per question


pub mod guardrail;
pub mod history;
pub mod prompt;

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::database::{RetrievedMatch, VectorStore};
use crate::embeddings::{Embedder, TextGenerator};
use crate::retrieval::{Confidence, ContextPreview, Retriever};

pub use guardrail::{Guardrail, GuardrailConfig, Verdict};
pub use history::{ConversationHistory, Message, PROMPT_HISTORY_MESSAGES, Role};

/// A citation drawn from retrieval, never from model output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCitation {
    pub url: String,
    pub section_title: String,
    pub start_char: usize,
    pub end_char: usize,
    /// `1 - distance` for the first match from this URL, clamped to `[0, 1]`
    pub relevance_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub response: String,
    pub sources: Vec<SourceCitation>,
    pub confidence: Confidence,
    pub context_used: bool,
    pub guardrail_triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnswerResult {
    fn blocked(message: String) -> Self {
        Self {
            response: message,
            sources: Vec::new(),
            confidence: Confidence::Low,
            context_used: false,
            guardrail_triggered: true,
            error: None,
        }
    }

    fn failed(err: &crate::RagError) -> Self {
        Self {
            response: format!("I encountered an error: {}. Please try again.", err),
            sources: Vec::new(),
            confidence: Confidence::Low,
            context_used: false,
            guardrail_triggered: false,
            error: Some(err.to_string()),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-question knobs
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Feed the recent conversation back into the prompt
    pub include_history: bool,
    /// Extra grounding text, e.g. an uploaded document
    pub additional_context: Option<String>,
    /// Overrides the configured `top_k`
    pub max_context_chunks: Option<usize>,
}

impl Default for AskOptions {
    #[inline]
    fn default() -> Self {
        Self {
            include_history: true,
            additional_context: None,
            max_context_chunks: None,
        }
    }
}

/// Citations for `matches`: first occurrence of each URL, http(s) only
#[inline]
pub fn collect_sources(matches: &[RetrievedMatch]) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .filter(|m| {
            let url = m.chunk.source_url().as_str();
            url.starts_with("http://") || url.starts_with("https://")
        })
        .filter(|m| seen.insert(m.chunk.source_url().as_str()))
        .map(|m| SourceCitation {
            url: m.chunk.source_url().to_string(),
            section_title: m.chunk.section_title().to_string(),
            start_char: m.chunk.start_char(),
            end_char: m.chunk.end_char(),
            relevance_score: Some((1.0 - m.distance).clamp(0.0, 1.0)),
        })
        .collect()
}

/// Answers questions over the index with a text generator
///
/// Each call to [`Assistant::ask`] runs guardrail check, retrieval and
/// composition in turn and ends in exactly one [`AnswerResult`]: blocked,
/// answered, or errored. Nothing is retried.
pub struct Assistant<E, S, G> {
    retriever: Retriever<E, S>,
    generator: G,
    guardrail: Guardrail,
    history: ConversationHistory,
}

impl<E: Embedder, S: VectorStore, G: TextGenerator> Assistant<E, S, G> {
    #[inline]
    pub fn new(retriever: Retriever<E, S>, generator: G, guardrail: Guardrail) -> Self {
        Self {
            retriever,
            generator,
            guardrail,
            history: ConversationHistory::new(),
        }
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<E, S> {
        &self.retriever
    }

    #[inline]
    pub fn retriever_mut(&mut self) -> &mut Retriever<E, S> {
        &mut self.retriever
    }

    #[inline]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[inline]
    pub async fn ask(&mut self, query: &str, options: &AskOptions) -> AnswerResult {
        if let Verdict::Blocked { term, message } = self.guardrail.check(query) {
            warn!("Guardrail blocked query on term {:?}", term);
            return AnswerResult::blocked(message);
        }

        let k = options
            .max_context_chunks
            .unwrap_or(self.retriever.config().top_k);

        let matches = match self.retriever.retrieve(query, k).await {
            Ok(matches) => matches,
            Err(e) => {
                error!("Retrieval failed: {}", e);
                return AnswerResult::failed(&e);
            }
        };

        self.compose(query, &matches, options).await
    }

    /// Generate an answer grounded in `matches` and record the exchange
    #[inline]
    pub async fn compose(
        &mut self,
        query: &str,
        matches: &[RetrievedMatch],
        options: &AskOptions,
    ) -> AnswerResult {
        let context = prompt::with_additional_context(
            &prompt::format_context(matches),
            options.additional_context.as_deref(),
        );

        let chat_history = if options.include_history {
            prompt::format_history(self.history.recent(PROMPT_HISTORY_MESSAGES))
        } else {
            String::new()
        };

        let rendered = prompt::render_prompt(&context, query, &chat_history);
        debug!(
            "Prompt of {} chars with {} matches",
            rendered.len(),
            matches.len()
        );

        let raw = match self.generator.generate(&rendered).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Generation failed: {}", e);
                return AnswerResult::failed(&e);
            }
        };

        let response = prompt::strip_sources_section(&raw);
        let confidence = self.retriever.score(matches);
        self.history.push_exchange(query, &response);

        info!(
            "Answered with {} confidence from {} matches",
            confidence,
            matches.len()
        );

        AnswerResult {
            response,
            sources: collect_sources(matches),
            confidence,
            context_used: !matches.is_empty(),
            guardrail_triggered: false,
            error: None,
        }
    }

    /// What would ground an answer to `query`, using the configured preview size
    #[inline]
    pub async fn preview(&self, query: &str) -> crate::Result<Vec<ContextPreview>> {
        self.retriever
            .preview(query, self.retriever.config().preview_chunks)
            .await
    }

    #[inline]
    pub fn history(&self) -> &[Message] {
        self.history.messages()
    }

    #[inline]
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    #[inline]
    pub fn export_history(&self, path: &Path) -> anyhow::Result<()> {
        self.history.save(path)
    }

    /// Replace the current history with one saved earlier
    #[inline]
    pub fn load_history(&mut self, path: &Path) -> anyhow::Result<()> {
        self.history = ConversationHistory::load(path)?;
        Ok(())
    }
}
