use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analytics::{Analytics, Insights};
use crate::chat::{AnswerResult, AskOptions, Assistant, Guardrail, SourceCitation};
use crate::config::Config;
use crate::crawler::corpus::{load_corpus, save_corpus};
use crate::crawler::domain::CrawlDomain;
use crate::crawler::extractor::ExtractionConfig;
use crate::crawler::{HttpClient, scrape_domain};
use crate::database::{LanceStore, VectorStore};
use crate::embeddings::{OllamaClient, RecursiveSplitter, split_sections};
use crate::indexer::{Index, IngestReport};
use crate::retrieval::{Confidence, ContextPreview, Retriever};
use crate::suggestions;

/// The assistant wired to Ollama and the on-disk index
pub type HandbookAssistant = Assistant<OllamaClient, LanceStore, OllamaClient>;

fn selected_domains<'a>(config: &'a Config, names: &[String]) -> Result<Vec<&'a CrawlDomain>> {
    if names.is_empty() {
        return Ok(config.domains.iter().collect());
    }

    names
        .iter()
        .map(|name| {
            config.domain(name).with_context(|| {
                let known: Vec<&str> = config.domains.iter().map(|d| d.name.as_str()).collect();
                format!("Unknown domain '{}' (configured: {})", name, known.join(", "))
            })
        })
        .collect()
}

/// Crawl and extract each selected domain in turn, then write the corpus file
#[inline]
pub async fn scrape(
    config: &Config,
    domain_names: &[String],
    max_depth: Option<usize>,
    max_pages: Option<usize>,
) -> Result<()> {
    let domains = selected_domains(config, domain_names)?;

    let mut crawler_config = config.crawler.clone();
    if let Some(depth) = max_depth {
        crawler_config.max_depth = depth;
    }
    if let Some(pages) = max_pages {
        crawler_config.max_pages = pages;
    }
    let limits = crawler_config.limits();

    let mut client = HttpClient::new(crawler_config);
    let extraction = ExtractionConfig::default();
    let mut sections = Vec::new();

    for domain in domains {
        println!(
            "{} {} ({})",
            style("Scraping").bold().cyan(),
            style(&domain.name).bold(),
            domain.base_url
        );

        let scraped = scrape_domain(&mut client, domain, limits, &extraction).await?;
        println!(
            "  {} pages discovered, {} sections extracted, {} pages failed",
            scraped.urls.len(),
            scraped.sections.len(),
            scraped.failed_pages
        );
        sections.extend(scraped.sections);
    }

    let path = config.corpus_path();
    save_corpus(&path, &sections)
        .with_context(|| format!("Could not write corpus to {}", path.display()))?;

    println!(
        "{} Saved {} sections to {}",
        style("✓").green(),
        sections.len(),
        style(path.display()).cyan()
    );
    Ok(())
}

/// Index over the configured Ollama embedder and the LanceDB directory
#[inline]
pub async fn open_index(config: &Config) -> Result<Index<OllamaClient, LanceStore>> {
    let embedder =
        OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    let store = LanceStore::open(config.vector_database_path())
        .await
        .context("Failed to open vector database")?;

    Ok(Index::new(embedder, store).with_batch_size(config.retrieval.ingest_batch_size))
}

/// Split the corpus into chunks and load them, unless the index is already populated
#[inline]
pub async fn ingest(config: &Config, reset: bool) -> Result<()> {
    let sections = load_corpus(&config.corpus_path())?;
    if sections.is_empty() {
        println!(
            "{}",
            style("⚠ The corpus is empty. Run `handbook-rag scrape` first.").yellow()
        );
        return Ok(());
    }

    let splitter = RecursiveSplitter::from_config(&config.chunking)?;
    let chunks = split_sections(&sections, &splitter);
    println!(
        "Split {} sections into {} chunks",
        sections.len(),
        chunks.len()
    );

    let mut index = open_index(config).await?;
    if reset {
        index.reset().await?;
    }

    match index.ingest(&chunks).await? {
        IngestReport::Skipped { existing } => {
            println!(
                "{} Index already holds {} chunks; nothing to do. Use --reset to reload.",
                style("ℹ").blue(),
                existing
            );
        }
        IngestReport::Loaded { chunks, batches } => {
            println!(
                "{} Loaded {} chunks in {} batches",
                style("✓").green(),
                chunks,
                batches
            );
        }
    }

    Ok(())
}

/// Build the index and assistant from configuration
#[inline]
pub async fn build_assistant(config: &Config) -> Result<HandbookAssistant> {
    let index = open_index(config).await?;
    let generator =
        OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;

    if index.count().await? == 0 {
        warn!("The index is empty; answers will have no grounding context");
    }

    Ok(Assistant::new(
        Retriever::new(index, config.retrieval.clone()),
        generator,
        Guardrail::new(&config.guardrail),
    ))
}

fn open_analytics(config: &Config) -> Analytics {
    Analytics::open(config.analytics_path()).unwrap_or_else(|e| {
        warn!("Analytics unavailable, not persisting: {:#}", e);
        Analytics::in_memory()
    })
}

fn track(analytics: &mut Analytics, query: &str, result: &AnswerResult) {
    if let Err(e) = analytics.track(query, result) {
        warn!("Failed to record analytics: {:#}", e);
    }
}

fn confidence_badge(confidence: Confidence) -> String {
    let styled = match confidence {
        Confidence::High => style(format!("🟢 {}", confidence.label())).green(),
        Confidence::Medium => style(format!("🟡 {}", confidence.label())).yellow(),
        Confidence::Low => style(format!("🔴 {}", confidence.label())).red(),
    };
    styled.to_string()
}

fn print_sources(sources: &[SourceCitation]) {
    if sources.is_empty() {
        println!("{}", style("No sources").dim());
        return;
    }

    println!("{}", style("Sources:").bold());
    for source in sources {
        let relevance = source
            .relevance_score
            .map(|score| format!(" (relevance {:.2})", score))
            .unwrap_or_default();
        println!(
            "  📄 {} {}{}",
            style(&source.section_title).bold(),
            style(&source.url).cyan().underlined(),
            style(relevance).dim()
        );
    }
}

fn print_answer(result: &AnswerResult) {
    println!();
    if result.guardrail_triggered {
        println!("{}", style(&result.response).yellow());
        return;
    }
    if result.is_error() {
        println!("{}", style(&result.response).red());
        return;
    }

    println!("{}", result.response);
    println!();
    println!("Confidence: {}", confidence_badge(result.confidence));
    if !result.context_used {
        println!(
            "{}",
            style("No documentation matched this question; the answer is not grounded.").yellow()
        );
    }
    print_sources(&result.sources);
}

fn print_previews(previews: &[ContextPreview]) {
    if previews.is_empty() {
        println!("{}", style("No matching context found.").yellow());
        return;
    }

    for (i, preview) in previews.iter().enumerate() {
        println!(
            "{} {} {}",
            style(format!("[{}]", i + 1)).dim(),
            style(&preview.section_title).bold(),
            style(&preview.url).cyan()
        );
        println!("    {}", preview.preview);
    }
}

/// Answer one question, print it with its citations, and record it
#[inline]
pub async fn ask(
    config: &Config,
    question: &str,
    context_file: Option<&Path>,
    no_history: bool,
) -> Result<()> {
    let additional_context = context_file
        .map(|path| {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read context file: {}", path.display()))
        })
        .transpose()?;

    let mut assistant = build_assistant(config).await?;
    let options = AskOptions {
        include_history: !no_history,
        additional_context,
        max_context_chunks: None,
    };

    let result = assistant.ask(question, &options).await;
    print_answer(&result);

    let mut analytics = open_analytics(config);
    track(&mut analytics, question, &result);
    Ok(())
}

/// Show what would ground an answer to `question`
#[inline]
pub async fn preview(config: &Config, question: &str) -> Result<()> {
    let assistant = build_assistant(config).await?;
    let previews = assistant.preview(question).await?;
    print_previews(&previews);
    Ok(())
}

enum ChatCommand {
    Quit,
    Clear,
    Reinit,
    Export(PathBuf),
    Sources,
    Help,
    Ask(String),
}

fn parse_chat_input(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let (command, argument) = input
        .split_once(char::is_whitespace)
        .map_or((input, ""), |(c, a)| (c, a.trim()));

    Some(match command {
        "/quit" | "/exit" => ChatCommand::Quit,
        "/clear" => ChatCommand::Clear,
        "/reinit" => ChatCommand::Reinit,
        "/export" => ChatCommand::Export(if argument.is_empty() {
            PathBuf::from("conversation_history.json")
        } else {
            PathBuf::from(argument)
        }),
        "/sources" => ChatCommand::Sources,
        "/help" => ChatCommand::Help,
        _ => ChatCommand::Ask(input.to_string()),
    })
}

fn print_chat_help() {
    println!("{}", style("Commands:").bold());
    println!("  /clear          forget the conversation so far");
    println!("  /reinit         rebuild the index connection and assistant");
    println!("  /export [PATH]  save the conversation as JSON");
    println!("  /sources        show the sources of the last answer");
    println!("  /quit           leave");
}

/// Interactive question loop
#[inline]
pub async fn chat(config: &Config) -> Result<()> {
    let mut assistant = build_assistant(config).await?;
    let mut analytics = open_analytics(config);
    let mut last_sources: Vec<SourceCitation> = Vec::new();

    println!(
        "{}",
        style("GitLab Handbook Assistant").bold().cyan()
    );
    println!("Ask about the Handbook or Direction pages. Try one of these:");
    for question in suggestions::sample(4, analytics.total_queries()) {
        println!("  • {}", question);
    }
    println!("Type /help for commands.");

    loop {
        println!();
        let Ok(line) = Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        else {
            break;
        };

        let Some(command) = parse_chat_input(&line) else {
            continue;
        };

        match command {
            ChatCommand::Quit => break,
            ChatCommand::Help => print_chat_help(),
            ChatCommand::Clear => {
                assistant.clear_history();
                last_sources.clear();
                println!("{}", style("Conversation cleared.").green());
            }
            ChatCommand::Reinit => {
                assistant = build_assistant(config).await?;
                last_sources.clear();
                info!("Assistant re-initialized");
                println!("{}", style("Assistant re-initialized.").green());
            }
            ChatCommand::Export(path) => match assistant.export_history(&path) {
                Ok(()) => println!("Saved conversation to {}", style(path.display()).cyan()),
                Err(e) => println!("{} {:#}", style("Export failed:").red(), e),
            },
            ChatCommand::Sources => print_sources(&last_sources),
            ChatCommand::Ask(question) => {
                let result = assistant.ask(&question, &AskOptions::default()).await;
                print_answer(&result);
                track(&mut analytics, &question, &result);
                last_sources = result.sources;
            }
        }
    }

    Ok(())
}

fn print_insights(insights: &Insights) {
    println!("{}", style("📈 Usage Insights").bold().cyan());
    if insights.total_queries == 0 {
        println!("No queries yet");
        return;
    }

    println!("  Total queries: {}", insights.total_queries);
    println!(
        "  Average confidence: {:.2} (high {}, medium {}, low {})",
        insights.average_confidence,
        insights.confidence_distribution.high,
        insights.confidence_distribution.medium,
        insights.confidence_distribution.low
    );
    println!("  Guardrail triggers: {}", insights.guardrail_triggers);
    println!("  Error rate: {:.2}%", insights.error_rate);

    if !insights.top_sources.is_empty() {
        println!();
        println!("{}", style("Top sources:").bold());
        for (url, count) in &insights.top_sources {
            println!("  {:>4}  {}", count, style(url).cyan());
        }
    }

    println!();
    println!("{}", style("Recent queries:").bold());
    for record in &insights.recent_queries {
        let flag = if record.guardrail_triggered {
            " [blocked]"
        } else if record.error {
            " [error]"
        } else {
            ""
        };
        println!(
            "  {} {} ({}, {} sources){}",
            style(record.timestamp.format("%Y-%m-%d %H:%M")).dim(),
            record.query,
            record.confidence,
            record.sources_count,
            flag
        );
    }
}

#[inline]
pub fn show_insights(config: &Config) -> Result<()> {
    let analytics = Analytics::open(config.analytics_path())?;
    print_insights(&analytics.insights());
    Ok(())
}

/// Report corpus size, index size and Ollama health
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("📊 Handbook Assistant Status").bold().cyan());
    println!("{}", "=".repeat(40));

    let corpus_path = config.corpus_path();
    if corpus_path.exists() {
        match load_corpus(&corpus_path) {
            Ok(sections) => println!("📄 Corpus: {} sections", sections.len()),
            Err(e) => println!("❌ Corpus: unreadable - {:#}", e),
        }
    } else {
        println!("📭 Corpus: not scraped yet");
    }

    match LanceStore::open(config.vector_database_path()).await {
        Ok(store) => match store.count().await {
            Ok(count) => println!("🔍 Index: {} chunks", count),
            Err(e) => println!("❌ Index: {}", e),
        },
        Err(e) => println!("❌ Index: failed to open - {}", e),
    }

    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => println!(
                "✅ Ollama: {} ({} / {})",
                client.base_url(),
                config.ollama.embedding_model,
                config.ollama.generation_model
            ),
            Err(e) => println!("⚠️  Ollama: unhealthy - {:#}", e),
        },
        Err(e) => println!("❌ Ollama: {:#}", e),
    }

    match Analytics::open(config.analytics_path()) {
        Ok(analytics) => println!("📈 Queries answered: {}", analytics.total_queries()),
        Err(e) => println!("❌ Analytics: {:#}", e),
    }

    Ok(())
}

/// Print starter questions, optionally for one category
#[inline]
pub fn suggest(category: Option<&str>) {
    let questions = match category {
        Some(name) => {
            if !suggestions::CATEGORIES.contains(&name.trim().to_lowercase().as_str()) {
                println!(
                    "{}",
                    style(format!(
                        "Unknown category '{}'; showing general questions. Categories: {}",
                        name,
                        suggestions::CATEGORIES.join(", ")
                    ))
                    .yellow()
                );
            }
            suggestions::for_category(name)
        }
        None => suggestions::GENERAL.to_vec(),
    };

    for question in questions {
        println!("  • {}", question);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_input_parsing() {
        assert!(parse_chat_input("   ").is_none());
        assert!(matches!(parse_chat_input("/quit"), Some(ChatCommand::Quit)));
        assert!(matches!(parse_chat_input("/clear"), Some(ChatCommand::Clear)));
        assert!(matches!(
            parse_chat_input(" /sources "),
            Some(ChatCommand::Sources)
        ));

        match parse_chat_input("/export out/chat.json") {
            Some(ChatCommand::Export(path)) => assert_eq!(path, PathBuf::from("out/chat.json")),
            _ => panic!("expected export command"),
        }
        match parse_chat_input("/export") {
            Some(ChatCommand::Export(path)) => {
                assert_eq!(path, PathBuf::from("conversation_history.json"));
            }
            _ => panic!("expected export command"),
        }
        match parse_chat_input("What are GitLab's values?") {
            Some(ChatCommand::Ask(q)) => assert_eq!(q, "What are GitLab's values?"),
            _ => panic!("expected a question"),
        }
    }

    #[test]
    fn domain_selection() {
        let config = Config::default();
        let all = selected_domains(&config, &[]).expect("should select all");
        assert_eq!(all.len(), 2);

        let one = selected_domains(&config, &["direction".to_string()])
            .expect("should select direction");
        assert_eq!(one[0].name, "direction");

        let err = selected_domains(&config, &["blog".to_string()])
            .expect_err("should reject unknown domain");
        assert!(err.to_string().contains("handbook, direction"));
    }

    #[test]
    fn badges() {
        assert!(confidence_badge(Confidence::High).contains("High"));
        assert!(confidence_badge(Confidence::Low).contains("Low"));
    }
}
