// Keyword denylist applied before retrieval. A blunt filter with false
// positives ("hackathon" matches "hack"); it is not a security boundary.


use serde::{Deserialize, Serialize};

/// Terms that block a query when they appear anywhere in it, case-insensitively
pub const DEFAULT_DENYLIST: &[&str] = &[
    "hack",
    "exploit",
    "bypass",
    "unauthorized access",
    "personal information",
    "private data",
    "confidential",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuardrailConfig {
    pub denylist: Vec<String>,
}

impl Default for GuardrailConfig {
    #[inline]
    fn default() -> Self {
        Self {
            denylist: DEFAULT_DENYLIST.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked { term: String, message: String },
}

impl Verdict {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// User-facing refusal, if blocked
    #[inline]
    pub fn refusal(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Blocked { message, .. } => Some(message),
        }
    }
}

/// Refusal naming the matched term
#[inline]
pub fn refusal_message(term: &str) -> String {
    format!(
        "I can only help with questions about GitLab's public Handbook and Direction pages. I cannot assist with {}.",
        term
    )
}

#[derive(Debug, Clone)]
pub struct Guardrail {
    terms: Vec<String>,
}

impl Guardrail {
    #[inline]
    pub fn new(config: &GuardrailConfig) -> Self {
        let terms = config
            .denylist
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// First denylisted term found in `query` wins
    #[inline]
    pub fn check(&self, query: &str) -> Verdict {
        let lower = query.to_lowercase();
        self.terms
            .iter()
            .find(|term| lower.contains(term.as_str()))
            .map_or(Verdict::Allowed, |term| Verdict::Blocked {
                term: term.clone(),
                message: refusal_message(term),
            })
    }
}

impl Default for Guardrail {
    #[inline]
    fn default() -> Self {
        Self::new(&GuardrailConfig::default())
    }
}
