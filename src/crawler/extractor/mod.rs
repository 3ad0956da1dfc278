
use fancy_regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use super::domain::PageUrl;
use crate::RagError;

/// Title used for content that appears before the first heading
pub const INTRODUCTION_TITLE: &str = "Introduction";
/// Title used when a page has no heading-delimited sections at all
pub const MAIN_CONTENT_TITLE: &str = "Main Content";

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];
const BLOCK_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "div"];
const LANDMARK_TAGS: &[&str] = &["nav", "header", "footer", "aside"];
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static CONTENT_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("content|main|article").expect("class pattern is valid"));
static BLOCK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, div").expect("valid selector")
});

/// One heading-delimited block of page text, the unit of citation provenance.
///
/// Offsets count characters in a per-page running stream, so
/// `end_char - start_char` always equals the character length of `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SectionRecord")]
pub struct Section {
    source_url: PageUrl,
    section_title: String,
    start_char: usize,
    end_char: usize,
    content: String,
}

/// Unchecked on-disk shape of a [`Section`]
#[derive(Debug, Deserialize)]
struct SectionRecord {
    source_url: PageUrl,
    section_title: String,
    start_char: usize,
    end_char: usize,
    content: String,
}

impl TryFrom<SectionRecord> for Section {
    type Error = RagError;

    fn try_from(record: SectionRecord) -> Result<Self, Self::Error> {
        let length = record.content.chars().count();
        if record.end_char < record.start_char || record.end_char - record.start_char != length {
            return Err(RagError::InvalidRecord(format!(
                "section '{}' of {} spans [{}, {}) but holds {} characters",
                record.section_title, record.source_url, record.start_char, record.end_char, length
            )));
        }

        Ok(Self {
            source_url: record.source_url,
            section_title: record.section_title,
            start_char: record.start_char,
            end_char: record.end_char,
            content: record.content,
        })
    }
}

impl Section {
    /// Create a section starting at `start_char`; the end offset follows from the content
    #[inline]
    pub fn new(source_url: PageUrl, section_title: &str, content: String, start_char: usize) -> Self {
        let end_char = start_char + content.chars().count();
        Self {
            source_url,
            section_title: section_title.to_string(),
            start_char,
            end_char,
            content,
        }
    }

    #[inline]
    pub fn source_url(&self) -> &PageUrl {
        &self.source_url
    }

    #[inline]
    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn start_char(&self) -> usize {
        self.start_char
    }

    #[inline]
    pub fn end_char(&self) -> usize {
        self.end_char
    }

    /// Character length of the content
    #[inline]
    pub fn len(&self) -> usize {
        self.end_char - self.start_char
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thresholds for what counts as content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Elements with less normalized text than this are ignored
    pub min_element_chars: usize,
    /// Sections with less text than this are dropped
    pub min_section_chars: usize,
}

impl Default for ExtractionConfig {
    #[inline]
    fn default() -> Self {
        Self {
            min_element_chars: 10,
            min_section_chars: 50,
        }
    }
}

/// Collapse whitespace runs to single spaces and trim
#[inline]
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Accumulates element text until the next heading closes the section
struct SectionBuilder<'a> {
    source_url: &'a PageUrl,
    config: &'a ExtractionConfig,
    sections: Vec<Section>,
    title: String,
    parts: Vec<String>,
    offset: usize,
}

impl<'a> SectionBuilder<'a> {
    fn new(source_url: &'a PageUrl, config: &'a ExtractionConfig) -> Self {
        Self {
            source_url,
            config,
            sections: Vec::new(),
            title: INTRODUCTION_TITLE.to_string(),
            parts: Vec::new(),
            offset: 0,
        }
    }

    fn push_text(&mut self, text: String) {
        self.parts.push(text);
    }

    fn start_section(&mut self, title: String) {
        self.flush();
        self.title = title;
    }

    fn flush(&mut self) {
        if self.parts.is_empty() {
            return;
        }

        let content = self.parts.join(" ");
        self.parts.clear();

        let length = content.chars().count();
        if length < self.config.min_section_chars {
            debug!(
                "Dropping short section '{}' ({} chars) from {}",
                self.title, length, self.source_url
            );
            return;
        }

        let section = Section::new(self.source_url.clone(), &self.title, content, self.offset);
        self.offset = section.end_char();
        self.sections.push(section);
    }

    fn finish(mut self) -> Vec<Section> {
        self.flush();
        self.sections
    }
}

/// Split one page into titled sections with running character offsets.
///
/// Headings are the only section boundary. Content under navigation, header,
/// footer and aside landmarks is ignored. When no section qualifies, the whole
/// content root becomes a single "Main Content" section.
#[inline]
pub fn extract_sections(html: &str, source_url: &PageUrl, config: &ExtractionConfig) -> Vec<Section> {
    let document = Html::parse_document(html);
    let root = content_root(&document);

    let mut builder = SectionBuilder::new(source_url, config);

    for element in root.select(&BLOCK_SELECTOR) {
        if is_hidden(element) {
            continue;
        }

        let name = element.value().name();
        if HEADING_TAGS.contains(&name) {
            let title = clean_text(&visible_text(element));
            if !title.is_empty() {
                builder.start_section(title);
            }
            continue;
        }

        let text = clean_text(&own_text(element));
        if text.chars().count() >= config.min_element_chars {
            builder.push_text(text);
        }
    }

    let sections = builder.finish();
    if !sections.is_empty() {
        debug!("Extracted {} sections from {}", sections.len(), source_url);
        return sections;
    }

    let all_text = clean_text(&visible_text(root));
    if all_text.chars().count() < config.min_section_chars {
        debug!("No usable content found on {}", source_url);
        return Vec::new();
    }

    debug!("Falling back to a single section for {}", source_url);
    vec![Section::new(
        source_url.clone(),
        MAIN_CONTENT_TITLE,
        all_text,
        0,
    )]
}

/// Pick the element that holds the page's primary content
fn content_root(document: &Html) -> ElementRef<'_> {
    for selector in ["main", "article"] {
        if let Ok(selector) = Selector::parse(selector) {
            if let Some(element) = document.select(&selector).find(|e| is_rendered_root(*e)) {
                return element;
            }
        }
    }

    if let Ok(div_selector) = Selector::parse("div[class]") {
        let content_div = document.select(&div_selector).find(|div| {
            is_rendered_root(*div)
                && div
                    .value()
                    .classes()
                    .any(|class| CONTENT_CLASS.is_match(class).unwrap_or(false))
        });
        if let Some(element) = content_div {
            return element;
        }
    }

    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return body;
        }
    }

    document.root_element()
}

/// A content root candidate must not be, or sit inside, a landmark
fn is_rendered_root(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    !LANDMARK_TAGS.contains(&name) && !INVISIBLE_TAGS.contains(&name) && !is_hidden(element)
}

/// Whether an element sits inside a landmark or non-rendered element
fn is_hidden(element: ElementRef<'_>) -> bool {
    element.ancestors().any(|ancestor| {
        ancestor.value().as_element().is_some_and(|e| {
            LANDMARK_TAGS.contains(&e.name()) || INVISIBLE_TAGS.contains(&e.name())
        })
    })
}

/// Text belonging to this element, excluding nested block elements that are
/// visited on their own
fn own_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text, true);
    text
}

/// All rendered text under an element, skipping landmarks and scripts
fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text, false);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String, skip_blocks: bool) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(child_element) => {
                let name = child_element.name();
                if LANDMARK_TAGS.contains(&name) || INVISIBLE_TAGS.contains(&name) {
                    continue;
                }
                if skip_blocks && BLOCK_TAGS.contains(&name) {
                    // Keep neighbouring words apart
                    out.push(' ');
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out, skip_blocks);
                }
            }
            _ => {}
        }
    }
}
