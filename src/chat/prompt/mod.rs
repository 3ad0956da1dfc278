// Prompt assembly: grounding context, conversation transcript and the
// instruction template, plus cleanup of the model's reply

#[cfg(test)]
mod tests;

use std::fmt::Write;

use super::history::Message;
use crate::database::RetrievedMatch;

/// Context placeholder when retrieval found nothing
pub const NO_CONTEXT: &str = "No relevant context found.";

const ADDITIONAL_CONTEXT_HEADING: &str = "--- Additional Context (from uploaded document) ---";

/// Label each match as `[Source N]` with its section, URL and content
#[inline]
pub fn format_context(matches: &[RetrievedMatch]) -> String {
    if matches.is_empty() {
        return NO_CONTEXT.to_string();
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "[Source {}]\nSection: {}\nURL: {}\nContent: {}\n",
                i + 1,
                m.chunk.section_title(),
                m.chunk.source_url(),
                m.chunk.content()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append externally supplied text under its own heading
#[inline]
pub fn with_additional_context(context: &str, additional: Option<&str>) -> String {
    match additional.map(str::trim).filter(|a| !a.is_empty()) {
        Some(extra) => format!("{}\n\n{}\n{}", context, ADDITIONAL_CONTEXT_HEADING, extra),
        None => context.to_string(),
    }
}

/// One `Role: content` line per message
#[inline]
pub fn format_history(messages: &[Message]) -> String {
    messages.iter().fold(String::new(), |mut out, m| {
        let _ = writeln!(out, "{}: {}", m.role.label(), m.content);
        out
    })
}

/// Fill the answer instructions with the grounding context, transcript and question
#[inline]
pub fn render_prompt(context: &str, question: &str, chat_history: &str) -> String {
    format!(
        r#"You are a helpful assistant that answers questions about GitLab's Handbook and Direction pages.

IMPORTANT GUIDELINES:
1. Only answer questions based on the provided context from GitLab's documentation
2. If you don't know the answer or the context doesn't contain relevant information, clearly state that
3. DO NOT make up or invent source URLs or section titles - only reference what is in the provided context
4. Be transparent about uncertainty
5. Provide comprehensive, detailed explanations that fully address the user's question
6. Structure your response clearly with proper paragraphs and organization
7. Include relevant details, examples, and key points from the context
8. If asked about topics outside GitLab documentation, politely redirect to GitLab-related questions
9. Do not include a "Sources:" section in your response - sources will be displayed separately
10. Ensure your response is helpful, informative, and easy to understand

GUARDRAILS:
- Only discuss topics related to GitLab's Handbook and Direction pages
- Do not provide information about topics not covered in the provided context
- Maintain professionalism and accuracy
- If the context doesn't fully answer the question, acknowledge what information is available and what is missing

Your goal is to help employees and aspiring employees learn about GitLab's practices, values, and direction through clear, comprehensive explanations.

Previous conversation:
{chat_history}

Context from GitLab documentation:
{context}

User question: {question}

Please provide a comprehensive, well-structured answer that fully explains the topic based on the context above. Include relevant details, examples, and key points. Make sure your explanation is clear and helpful. Do not list sources in your response."#
    )
}

/// Drop everything from the first line starting with "sources:" (any case)
#[inline]
pub fn strip_sources_section(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .take_while(|line| !line.trim().to_lowercase().starts_with("sources:"))
        .collect();
    kept.join("\n").trim().to_string()
}
