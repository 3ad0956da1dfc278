use super::load_existing_config as load_existing_config_impl;
use super::non_empty as non_empty_impl;
use std::fs;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(temp_dir.path().join("config.toml"), "[ollama\n").expect("should write");

    let config = load_existing_config_impl(temp_dir.path());
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.ollama.embedding_model.is_empty());
    assert_eq!(config.get_base_dir(), temp_dir.path());
}

#[test]
fn model_names_must_not_be_blank() {
    assert!(non_empty_impl(&"llama3.2:latest".to_string()).is_ok());
    assert!(non_empty_impl(&"   ".to_string()).is_err());
}
