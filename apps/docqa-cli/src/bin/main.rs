use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa_core::config::Config;
use docqa_core::source::DirectorySource;
use docqa_core::traits::DocumentSource;
use docqa_gate::{is_clear_question, RetrievalGate, UNCLEAR_QUESTION};
use docqa_vector::IndexStore;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Answer questions from a local document collection")]
struct Cli {
    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from the document directory
    Index {
        /// Overrides source.dir
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Ask a question and print the response as JSON
    Ask {
        question: String,
        /// Include the matched chunk in the output
        #[arg(long)]
        matched: bool,
    },
    /// Show the active index
    Status,
    /// List the documents the source currently provides
    Sources {
        /// Overrides source.dir
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

const PREVIEW_CHARS: usize = 300;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info,warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = Config::load_from(&cli.config_dir, &env_name).context("loading config")?;
    let mut settings = config.settings()?;

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Command::Status => rt.block_on(async {
            let store = IndexStore::new(&settings.index.dir);
            match store.status().await? {
                Some((version, manifest)) => {
                    println!("index: {}", store.root().display());
                    println!("version: {version}");
                    println!("{}", serde_json::to_string_pretty(&manifest)?);
                }
                None => println!("no index at {}", store.root().display()),
            }
            Ok::<(), anyhow::Error>(())
        }),
        Command::Sources { source } => {
            let dir = source.unwrap_or_else(|| PathBuf::from(&settings.source.dir));
            let documents = DirectorySource::new(&dir, settings.source.extension.clone()).fetch_documents();
            if documents.is_empty() {
                println!("no documents found in {}", dir.display());
            }
            for doc in &documents {
                println!("📄 {} ({} chars)", doc.source_label, doc.content.chars().count());
                println!("   {}", doc.preview(PREVIEW_CHARS));
            }
            println!("{} documents", documents.len());
            Ok(())
        }
        Command::Index { source } => {
            if let Some(dir) = source {
                settings.source.dir = dir.to_string_lossy().into_owned();
            }
            let mut gate = build_gate(&settings)?;
            rt.block_on(async {
                let version = gate.rebuild().await?;
                println!("✅ index {version} written to {}", gate.store().root().display());
                Ok::<(), anyhow::Error>(())
            })
        }
        Command::Ask { question, matched } => {
            let mut gate = build_gate(&settings)?;
            rt.block_on(async {
                let output = if !matched {
                    serde_json::to_value(gate.ask(&question).await?)?
                } else if is_clear_question(&question) {
                    let answer = gate.answer(&question).await?;
                    serde_json::json!({ "question": question, "response": answer.response, "matched": answer.matched })
                } else {
                    serde_json::json!({ "question": question, "response": UNCLEAR_QUESTION, "matched": null })
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
                Ok::<(), anyhow::Error>(())
            })
        }
    }
}

fn build_gate(settings: &docqa_core::config::Settings) -> anyhow::Result<RetrievalGate<DirectorySource>> {
    let source = DirectorySource::new(&settings.source.dir, settings.source.extension.clone());
    let embedder = docqa_embed::from_config(&settings.embedding)?;
    Ok(RetrievalGate::new(source, embedder, settings)?)
}
