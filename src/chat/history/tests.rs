use super::*;
use tempfile::TempDir;

#[test]
fn exchanges_append_in_order() {
    let mut history = ConversationHistory::new();
    history.push_exchange("What are the values?", "CREDIT.");
    history.push_exchange("What does the C stand for?", "Collaboration.");

    assert_eq!(history.len(), 4);
    assert_eq!(history.messages()[0].role, Role::User);
    assert_eq!(history.messages()[3].content, "Collaboration.");
}

#[test]
fn recent_keeps_tail() {
    let mut history = ConversationHistory::new();
    for i in 0..3 {
        history.push_exchange(&format!("q{}", i), &format!("a{}", i));
    }

    let recent = history.recent(PROMPT_HISTORY_MESSAGES);
    let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
    assert_eq!(history.recent(100).len(), 6);
}

#[test]
fn clear_empties() {
    let mut history = ConversationHistory::new();
    history.push_exchange("q", "a");
    history.clear();
    assert!(history.is_empty());
}

#[test]
fn save_and_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("nested").join("history.json");

    let mut history = ConversationHistory::new();
    history.push_exchange("Is GitLab remote?", "Yes, all-remote.");
    history.save(&path).expect("should save history");

    let json = fs::read_to_string(&path).expect("should read file");
    assert!(json.contains("\"role\": \"user\""));

    let loaded = ConversationHistory::load(&path).expect("should load history");
    assert_eq!(loaded, history);
}

#[test]
fn missing_file_loads_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let loaded = ConversationHistory::load(&temp_dir.path().join("absent.json"))
        .expect("should load empty history");
    assert!(loaded.is_empty());
}

#[test]
fn malformed_file_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "{not json").expect("should write");
    assert!(ConversationHistory::load(&path).is_err());
}
