#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Messages from the end of the history fed back into the prompt
pub const PROMPT_HISTORY_MESSAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Rolling record of answered exchanges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one answered question
    #[inline]
    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.messages.push(Message {
            role: Role::User,
            content: question.to_string(),
        });
        self.messages.push(Message {
            role: Role::Assistant,
            content: answer.to_string(),
        });
    }

    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages, oldest first
    #[inline]
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Write the history as a pretty JSON list of `{role, content}`
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.messages)
            .context("Failed to serialize conversation history")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write history file: {}", path.display()))
    }

    /// Read a history written by [`ConversationHistory::save`]; a missing file is empty
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history file: {}", path.display()))?;
        let messages = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse history file: {}", path.display()))?;
        Ok(Self { messages })
    }
}
