use super::*;
use crate::chat::history::ConversationHistory;
use crate::testing::chunk;

fn matches() -> Vec<RetrievedMatch> {
    vec![
        RetrievedMatch {
            chunk: chunk(
                "https://handbook.gitlab.com/handbook/values",
                "CREDIT",
                "Collaboration, Results, Efficiency",
            ),
            distance: 0.1,
        },
        RetrievedMatch {
            chunk: chunk(
                "https://about.gitlab.com/direction",
                "Vision",
                "Everyone can contribute",
            ),
            distance: 0.2,
        },
    ]
}

#[test]
fn context_labels_sources() {
    let context = format_context(&matches());
    assert_eq!(
        context,
        "[Source 1]\nSection: CREDIT\nURL: https://handbook.gitlab.com/handbook/values\nContent: Collaboration, Results, Efficiency\n\n[Source 2]\nSection: Vision\nURL: https://about.gitlab.com/direction\nContent: Everyone can contribute\n"
    );
}

#[test]
fn empty_context_placeholder() {
    assert_eq!(format_context(&[]), NO_CONTEXT);
}

#[test]
fn additional_context_is_delimited() {
    let combined = with_additional_context("base", Some("uploaded notes"));
    assert_eq!(
        combined,
        "base\n\n--- Additional Context (from uploaded document) ---\nuploaded notes"
    );
    assert_eq!(with_additional_context("base", Some("   ")), "base");
    assert_eq!(with_additional_context("base", None), "base");
}

#[test]
fn history_transcript() {
    let mut history = ConversationHistory::new();
    history.push_exchange("Hi", "Hello!");
    assert_eq!(
        format_history(history.messages()),
        "User: Hi\nAssistant: Hello!\n"
    );
    assert_eq!(format_history(&[]), "");
}

#[test]
fn prompt_embeds_all_parts() {
    let prompt = render_prompt("CTX", "What is CREDIT?", "User: Hi\n");
    assert!(prompt.starts_with("You are a helpful assistant"));
    assert!(prompt.contains("Previous conversation:\nUser: Hi\n\n\nContext from GitLab documentation:\nCTX\n"));
    assert!(prompt.contains("User question: What is CREDIT?"));
    assert!(prompt.contains("Do not include a \"Sources:\" section"));
    assert!(prompt.ends_with("Do not list sources in your response."));
}

#[test]
fn strips_trailing_sources() {
    let raw = "GitLab values collaboration.\n\nSources:\n- https://invented.example.com";
    assert_eq!(strip_sources_section(raw), "GitLab values collaboration.");

    let raw = "Answer text\n  SOURCES: made up";
    assert_eq!(strip_sources_section(raw), "Answer text");
}

#[test]
fn keeps_text_without_sources_line() {
    let raw = "  Our sources: of truth are in the handbook.\nMore text  ";
    assert_eq!(
        strip_sources_section(raw),
        "Our sources: of truth are in the handbook.\nMore text"
    );
}
