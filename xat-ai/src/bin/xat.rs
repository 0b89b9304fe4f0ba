//! xat - operator CLI for the annotation pipeline
//!
//! Scans saved HTML pages, requests suggestions, and manages the judgment
//! store and the pipeline settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xat_common::config::{database_path, default_config_path, load_toml_config, resolve_root_folder, TomlConfig};
use xat_common::events::EventBus;
use xat_common::AiConfig;

use xat_ai::db::{interactions, settings};
use xat_ai::dom::{Document, SharedDocument};
use xat_ai::gateway::{BoundaryChannel, HttpChannel, InferenceBroker, LocalChannel};
use xat_ai::models::{Sentiment, TagRequest};
use xat_ai::pipeline::{resolve_ai_config, Pipeline};
use xat_ai::scanner::HeadlessMenu;
use xat_ai::store::{export_bundle, import_bundle, overview_stats, ExportBundle, JudgmentStore, SqliteStore};
use xat_ai::IdentityHandle;

#[derive(Parser, Debug)]
#[command(name = "xat")]
#[command(about = "Annotate accounts with sentiment judgments and AI suggestions")]
#[command(version)]
struct Cli {
    /// Root folder holding the database
    #[arg(short, long, global = true, env = "XAT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, global = true, env = "XAT_CONFIG")]
    config: Option<PathBuf>,

    /// Run inference in-process instead of through the xat-ai service
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate a saved HTML page and print (or write) the result
    Scan {
        page: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Compute a suggestion for an account visible on a saved page
    Suggest { page: PathBuf, identity: String },
    /// Save a judgment
    Tag {
        identity: String,
        sentiment: String,
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Per-topic sentiment, `topic=sentiment` (repeatable)
        #[arg(short, long = "topic")]
        topics: Vec<String>,
    },
    /// Delete a judgment
    Untag { identity: String },
    /// List every judgment
    List,
    /// Record an interaction (like, retweet, reply, bookmark, ...)
    Record { identity: String, kind: String },
    /// Export all judgments as JSON
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Import judgments from an export file
    Import { file: PathBuf },
    /// Overview counts
    Stats,
    /// List the models offered by the inference service
    TestConnection,
    /// Show or change the pipeline settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        service_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        content_analysis: Option<bool>,
        #[arg(long)]
        pattern_recognition: Option<bool>,
        #[arg(long)]
        auto_suggest: Option<bool>,
    },
}

/// Resolved configuration and the opened store
struct Env {
    toml: TomlConfig,
    store: Arc<SqliteStore>,
    ai: AiConfig,
    local: bool,
}

impl Env {
    async fn open(cli: &Cli) -> Result<Self> {
        let config_path = cli.config.clone().unwrap_or_else(default_config_path);
        let toml = load_toml_config(&config_path)?;
        let root = resolve_root_folder(cli.root_folder.as_deref(), "XAT_ROOT_FOLDER", Some(&toml));
        let store = Arc::new(SqliteStore::open(&database_path(&root)).await?);
        let ai = resolve_ai_config(store.pool(), &toml.ai).await?;
        Ok(Self {
            toml,
            store,
            ai,
            local: cli.local,
        })
    }

    fn channel(&self) -> Result<Arc<dyn BoundaryChannel>> {
        let timeout = Duration::from_secs(self.toml.broker.request_timeout_secs.max(1));
        if self.local {
            let broker = InferenceBroker::new(timeout)?.with_allowed_services(&self.toml.broker.allowed_services);
            Ok(Arc::new(LocalChannel::spawn(Arc::new(broker), 16)))
        } else {
            Ok(Arc::new(HttpChannel::new(&self.toml.broker.url(), timeout)?))
        }
    }

    fn pipeline(&self, document: SharedDocument, menu: Arc<HeadlessMenu>) -> Result<Pipeline> {
        Ok(Pipeline::new(
            document,
            self.store.clone(),
            self.channel()?,
            menu,
            self.ai.clone(),
            EventBus::new(100),
        ))
    }
}

fn load_page(path: &Path) -> Result<SharedDocument> {
    let html = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Document::parse(&html).into_shared())
}

fn parse_topics(topics: &[String]) -> Result<std::collections::BTreeMap<String, Sentiment>> {
    let mut parsed = std::collections::BTreeMap::new();
    for entry in topics {
        let Some((topic, sentiment)) = entry.split_once('=') else {
            bail!("Topic '{}' must look like topic=sentiment", entry);
        };
        parsed.insert(topic.trim().to_string(), sentiment.parse::<Sentiment>()?);
    }
    Ok(parsed)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xat_ai=warn,xat_common=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let env = Env::open(&cli).await?;

    match cli.command {
        Command::Scan { page, out } => {
            let document = load_page(&page)?;
            let pipeline = env.pipeline(document.clone(), Arc::new(HeadlessMenu::new()))?;
            let report = pipeline.scanner.scan().await;
            eprintln!(
                "{} regions seen, {} annotated, {} badges, {} tag buttons",
                report.nodes_seen, report.nodes_annotated, report.badges_rendered, report.buttons_rendered
            );
            let doc = document.lock().await;
            let html = doc.to_html(doc.root());
            match out {
                Some(path) => std::fs::write(&path, html)?,
                None => println!("{}", html),
            }
        }
        Command::Suggest { page, identity } => {
            let identity = IdentityHandle::parse(&identity)?;
            let pipeline = env.pipeline(load_page(&page)?, Arc::new(HeadlessMenu::new()))?;
            match pipeline.suggestions.suggest(&identity).await {
                Some(suggestion) => print_json(&suggestion)?,
                None => println!("No suggestion available for @{}", identity),
            }
        }
        Command::Tag {
            identity,
            sentiment,
            notes,
            topics,
        } => {
            let identity = IdentityHandle::parse(&identity)?;
            let request = TagRequest {
                sentiment: sentiment.parse()?,
                topic_sentiments: parse_topics(&topics)?,
                notes,
                ..TagRequest::default()
            };
            let pipeline = env.pipeline(Document::default().into_shared(), Arc::new(HeadlessMenu::new()))?;
            let judgment = pipeline.scanner.save_judgment(&identity, request).await?;
            print_json(&judgment)?;
        }
        Command::Untag { identity } => {
            let identity = IdentityHandle::parse(&identity)?;
            let pipeline = env.pipeline(Document::default().into_shared(), Arc::new(HeadlessMenu::new()))?;
            if pipeline.scanner.delete_judgment(&identity).await? {
                println!("Removed judgment for @{}", identity);
            } else {
                println!("No judgment stored for @{}", identity);
            }
        }
        Command::List => {
            for judgment in env.store.list_judgments().await? {
                println!(
                    "{} @{:<20} {:<9} {}{}",
                    judgment.sentiment.icon(),
                    judgment.identity,
                    judgment.sentiment,
                    xat_common::time::short_date(&judgment.last_updated),
                    if judgment.suggested_by_ai { "  (AI)" } else { "" }
                );
            }
        }
        Command::Record { identity, kind } => {
            let identity = IdentityHandle::parse(&identity)?;
            let pipeline = env.pipeline(Document::default().into_shared(), Arc::new(HeadlessMenu::new()))?;
            match pipeline.recorder.record(&identity, kind.trim()).await {
                Some(event) => println!("Recorded #{}: {} with @{}", event.id, event.kind, identity),
                None => println!("Not recorded (pattern recognition is off)"),
            }
        }
        Command::Export { out } => {
            let bundle = export_bundle(env.store.as_ref()).await?;
            let json = serde_json::to_string_pretty(&bundle)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("Exported {} judgments to {}", bundle.accounts.len(), path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let bundle: ExportBundle = serde_json::from_str(&raw).context("Not an export file")?;
            let count = import_bundle(env.store.as_ref(), &bundle).await?;
            println!("Imported {} judgments", count);
        }
        Command::Stats => {
            let stats = overview_stats(env.store.as_ref(), chrono::Utc::now()).await?;
            let recorded = interactions::count_interactions(env.store.pool()).await?;
            println!("Accounts tagged:   {}", stats.total_accounts);
            println!("Updated today:     {}", stats.updated_today);
            println!("Interactions:      {}", recorded);
        }
        Command::TestConnection => {
            let pipeline = env.pipeline(Document::default().into_shared(), Arc::new(HeadlessMenu::new()))?;
            match pipeline.test_connection().await {
                Ok(models) => {
                    println!("Connected to {} ({} models)", env.ai.base_url(), models.len());
                    for model in models {
                        let marker = if model == env.ai.model { "*" } else { " " };
                        println!(" {} {}", marker, model);
                    }
                }
                Err(e) => bail!("Connection to {} failed: {}", env.ai.base_url(), e),
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show => print_json(&env.ai)?,
            ConfigAction::Set {
                enabled,
                service_url,
                model,
                content_analysis,
                pattern_recognition,
                auto_suggest,
            } => {
                let mut ai = env.ai.clone();
                if let Some(v) = enabled {
                    ai.enabled = v;
                }
                if let Some(v) = service_url {
                    ai.service_url = v;
                }
                if let Some(v) = model {
                    ai.model = v;
                }
                if let Some(v) = content_analysis {
                    ai.features.content_analysis = v;
                }
                if let Some(v) = pattern_recognition {
                    ai.features.pattern_recognition = v;
                }
                if let Some(v) = auto_suggest {
                    ai.features.auto_suggest = v;
                }
                settings::save_ai_config(env.store.pool(), &ai).await?;
                print_json(&ai)?;
            }
        },
    }

    Ok(())
}
