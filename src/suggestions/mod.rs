// Curated starter questions


pub const GENERAL: &[&str] = &[
    "What are GitLab's core values?",
    "How does GitLab handle remote work?",
    "What is GitLab's product direction?",
    "How does GitLab approach engineering?",
    "What are GitLab's security practices?",
    "How does GitLab handle customer success?",
    "What is GitLab's approach to transparency?",
    "How does GitLab manage teams?",
    "What are GitLab's hiring practices?",
    "How does GitLab approach diversity and inclusion?",
    "What is GitLab's compensation philosophy?",
    "How does GitLab handle performance reviews?",
    "What are GitLab's engineering principles?",
    "How does GitLab approach product development?",
    "What is GitLab's marketing strategy?",
];

pub const CATEGORIES: &[&str] = &["values", "engineering", "product", "people"];

const FALLBACK_COUNT: usize = 3;

/// Questions for a category (case-insensitive); unknown names get the first general ones
#[inline]
pub fn for_category(name: &str) -> Vec<&'static str> {
    let questions: &[&'static str] = match name.trim().to_lowercase().as_str() {
        "values" => &[
            "What are GitLab's core values?",
            "How does GitLab practice transparency?",
            "What is GitLab's approach to collaboration?",
        ],
        "engineering" => &[
            "What are GitLab's engineering principles?",
            "How does GitLab handle code reviews?",
            "What is GitLab's approach to testing?",
        ],
        "product" => &[
            "What is GitLab's product direction?",
            "How does GitLab prioritize features?",
            "What is GitLab's product development process?",
        ],
        "people" => &[
            "How does GitLab handle remote work?",
            "What are GitLab's hiring practices?",
            "How does GitLab approach diversity and inclusion?",
        ],
        _ => &GENERAL[..FALLBACK_COUNT],
    };
    questions.to_vec()
}

/// `n` distinct general questions starting at a seed-chosen offset
#[inline]
pub fn sample(n: usize, seed: u64) -> Vec<&'static str> {
    let len = GENERAL.len();
    let start = (seed % len as u64) as usize;
    GENERAL
        .iter()
        .cycle()
        .skip(start)
        .take(n.min(len))
        .copied()
        .collect()
}
