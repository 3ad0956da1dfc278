use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use handbook_rag::commands::{
    ask, chat, ingest, preview, scrape, show_insights, show_status, suggest,
};
use handbook_rag::config::{Config, resolve_base_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "handbook-rag")]
#[command(about = "Ask questions about the GitLab Handbook and Direction pages")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to $HANDBOOK_RAG_HOME, then ~/.handbook-rag)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the configured domains and write the corpus file
    Scrape {
        /// How many link levels to follow from each seed
        #[arg(long)]
        max_depth: Option<usize>,
        /// Maximum pages visited per domain
        #[arg(long)]
        max_pages: Option<usize>,
        /// Only scrape these domains (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Split the corpus and load it into the vector index
    Ingest {
        /// Clear the index first so the corpus is reloaded
        #[arg(long)]
        reset: bool,
    },
    /// Answer a single question
    Ask {
        question: String,
        /// Extra grounding text, e.g. an exported document
        #[arg(long)]
        context_file: Option<PathBuf>,
        /// Do not include earlier conversation in the prompt
        #[arg(long)]
        no_history: bool,
    },
    /// Show the documentation that would ground an answer
    Preview { question: String },
    /// Interactive conversation
    Chat,
    /// Usage analytics
    Insights,
    /// Corpus, index and Ollama status
    Status,
    /// Configure Ollama connection and crawler settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Print starter questions
    Suggest {
        /// values, engineering, product or people
        #[arg(long)]
        category: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = resolve_base_dir(cli.home.as_deref())?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&base_dir)?);
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Suggest { category } => {
            suggest(category.as_deref());
        }
        command => {
            let config = Config::load(&base_dir)?;
            match command {
                Commands::Scrape {
                    max_depth,
                    max_pages,
                    domains,
                } => scrape(&config, &domains, max_depth, max_pages).await?,
                Commands::Ingest { reset } => ingest(&config, reset).await?,
                Commands::Ask {
                    question,
                    context_file,
                    no_history,
                } => ask(&config, &question, context_file.as_deref(), no_history).await?,
                Commands::Preview { question } => preview(&config, &question).await?,
                Commands::Chat => chat(&config).await?,
                Commands::Insights => show_insights(&config)?,
                Commands::Status => show_status(&config).await?,
                Commands::Config { .. } | Commands::Suggest { .. } => {}
            }
        }
    }

    Ok(())
}
