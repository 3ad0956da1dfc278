// Corpus file: the hand-off between scraping and ingestion


use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::extractor::Section;

/// Write sections as a pretty-printed JSON list
#[inline]
pub fn save_corpus(path: &Path, sections: &[Section]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create corpus directory: {}", parent.display())
            })?;
        }
    }

    let json = serde_json::to_string_pretty(sections).context("Failed to serialize corpus")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write corpus file: {}", path.display()))?;

    info!("Saved {} sections to {}", sections.len(), path.display());
    Ok(())
}

/// Read the corpus file. A missing file is not an error: it yields no sections.
#[inline]
pub fn load_corpus(path: &Path) -> Result<Vec<Section>> {
    if !path.exists() {
        warn!(
            "Corpus file {} does not exist; run the scrape command first",
            path.display()
        );
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let sections: Vec<Section> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;

    info!("Loaded {} sections from {}", sections.len(), path.display());
    Ok(sections)
}
