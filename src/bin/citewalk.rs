//! Citewalk CLI: citation-graph paper discovery.
//!
//! Usage:
//!   citewalk [--db path] [--log-level LEVEL] discover [--max-papers N] [--max-depth D]
//!   citewalk filter [--support-threshold T]
//!   citewalk enrich [--support-threshold T]
//!   citewalk check

use citewalk::config::{default_topics, load_topics_file, log_filter_directive};
use citewalk::{
    DiscoveryEngine, MetadataEnricher, OpenAiJudge, OpenStore, PaperStore, SemanticScholarClient,
    Settings, SqliteStore, SupportFilter,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "citewalk",
    version,
    about = "Citation-graph paper discovery with relevance-gated expansion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover papers for the configured research topics
    Discover {
        /// Maximum papers collected per search query
        #[arg(long)]
        max_papers: Option<usize>,
        /// Maximum reference hops below a seed paper
        #[arg(long)]
        max_depth: Option<u32>,
        /// Relevance (0-1) a paper needs before it is expanded
        #[arg(long)]
        relevance_threshold: Option<f64>,
        /// JSON file with additional topics (array of strings)
        #[arg(long)]
        topics_file: Option<PathBuf>,
        /// Skip the built-in topic list
        #[arg(long)]
        no_default_topics: bool,
    },
    /// Re-evaluate stored papers and disable those below the support threshold
    Filter {
        /// Support level (0-10) a paper needs to stay active
        #[arg(long)]
        support_threshold: Option<f64>,
    },
    /// Backfill venue, journal and open-access metadata for supported papers
    Enrich {
        /// Support level (0-10) a paper needs to be enriched
        #[arg(long)]
        support_threshold: Option<f64>,
    },
    /// Validate credentials and storage connectivity, then exit
    Check,
}

/// `--log-level` wins over `RUST_LOG`, which wins over `LOG_LEVEL`
fn init_tracing(cli_directive: Option<&str>, settings_level: &str) {
    let filter = match cli_directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(log_filter_directive(settings_level).unwrap_or("info"))
        }),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the store and confirm it answers.
fn open_store(db_path: &Path) -> Option<Arc<SqliteStore>> {
    let store = match SqliteStore::open(db_path) {
        Ok(store) => store,
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "Failed to open database");
            return None;
        }
    };
    if let Err(e) = store.ping() {
        error!(path = %db_path.display(), error = %e, "Database connection failed");
        return None;
    }
    Some(Arc::new(store))
}

fn build_judge(settings: &Settings) -> Option<Arc<OpenAiJudge>> {
    let api_key = match settings.require_openai_key() {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "Cannot start without credentials");
            return None;
        }
    };

    let mut judge = OpenAiJudge::new(api_key, &settings.research_focus).with_model(&settings.gpt_model);
    if let Some(url) = &settings.openai_base_url {
        judge = judge.with_base_url(url);
    }
    Some(Arc::new(judge))
}

fn build_source(settings: &Settings) -> Arc<SemanticScholarClient> {
    Arc::new(SemanticScholarClient::new(
        settings.semantic_scholar_api_key.clone(),
    ))
}

fn collect_topics(topics_file: Option<&Path>, include_defaults: bool) -> Vec<String> {
    let mut topics = if include_defaults {
        default_topics()
    } else {
        Vec::new()
    };

    if let Some(path) = topics_file {
        match load_topics_file(path) {
            Ok(extra) => {
                info!(count = extra.len(), path = %path.display(), "Loaded additional topics");
                topics.extend(extra);
            }
            Err(e) => error!(error = %e, "Ignoring topics file"),
        }
    }

    topics
}

async fn cmd_discover(
    settings: &Settings,
    db_path: &Path,
    max_papers: Option<usize>,
    max_depth: Option<u32>,
    relevance_threshold: Option<f64>,
    topics_file: Option<&Path>,
    include_defaults: bool,
) -> i32 {
    let Some(judge) = build_judge(settings) else {
        return 1;
    };
    let Some(store) = open_store(db_path) else {
        return 1;
    };

    let mut config = settings.discovery_config();
    if let Some(max) = max_papers {
        config = config.with_max_papers_per_search(max);
    }
    if let Some(depth) = max_depth {
        config = config.with_max_reference_depth(depth);
    }
    if let Some(threshold) = relevance_threshold {
        config = config.with_relevance_threshold(threshold);
    }

    let topics = collect_topics(topics_file, include_defaults);
    if topics.is_empty() {
        warn!("No topics to discover");
        return 0;
    }

    info!(
        topics = topics.len(),
        max_papers_per_search = config.max_papers_per_search,
        max_reference_depth = config.max_reference_depth,
        relevance_threshold = config.relevance_threshold,
        "Starting discovery"
    );

    let engine = DiscoveryEngine::new(build_source(settings), judge, store.clone(), config);
    let interrupt = engine.cancellation_token().cancel_on_ctrl_c();

    let started = Instant::now();
    let stats = engine.discover(&topics).await;
    interrupt.abort();

    let total_papers = store.count_papers().unwrap_or_default();
    info!(
        runtime_secs = started.elapsed().as_secs(),
        topics_processed = stats.topics_processed,
        papers_processed = stats.papers_processed,
        papers_persisted = stats.papers_persisted,
        papers_abandoned = stats.papers_abandoned,
        searches_recorded = stats.searches_recorded,
        searches_skipped = stats.searches_skipped,
        judge_fallbacks = stats.judge_fallbacks,
        total_papers,
        cancelled = stats.cancelled,
        "Discovery finished"
    );
    0
}

async fn cmd_filter(settings: &Settings, db_path: &Path, threshold: Option<f64>) -> i32 {
    let Some(judge) = build_judge(settings) else {
        return 1;
    };
    let Some(store) = open_store(db_path) else {
        return 1;
    };

    let filter = SupportFilter::new(judge, store)
        .with_threshold(threshold.unwrap_or(settings.support_threshold));
    match filter.run().await {
        Ok(_) => 0,
        Err(e) => {
            error!(error = %e, "Support filter failed");
            1
        }
    }
}

async fn cmd_enrich(settings: &Settings, db_path: &Path, threshold: Option<f64>) -> i32 {
    let Some(store) = open_store(db_path) else {
        return 1;
    };

    let enricher = MetadataEnricher::new(build_source(settings), store)
        .with_threshold(threshold.unwrap_or(settings.support_threshold));
    match enricher.run().await {
        Ok(_) => 0,
        Err(e) => {
            error!(error = %e, "Enrichment failed");
            1
        }
    }
}

fn cmd_check(settings: &Settings, db_path: &Path) -> i32 {
    if build_judge(settings).is_none() {
        return 1;
    }
    let Some(store) = open_store(db_path) else {
        return 1;
    };

    let papers = store.count_papers().unwrap_or_default();
    info!(path = %db_path.display(), papers, "Credentials and storage OK");
    0
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let cli_directive = match cli.log_level.as_deref().map(log_filter_directive).transpose() {
        Ok(directive) => directive,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(cli_directive, &settings.log_level);

    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path.clone());

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match cli.command {
            Commands::Discover {
                max_papers,
                max_depth,
                relevance_threshold,
                topics_file,
                no_default_topics,
            } => {
                cmd_discover(
                    &settings,
                    &db_path,
                    max_papers,
                    max_depth,
                    relevance_threshold,
                    topics_file.as_deref(),
                    !no_default_topics,
                )
                .await
            }
            Commands::Filter { support_threshold } => {
                cmd_filter(&settings, &db_path, support_threshold).await
            }
            Commands::Enrich { support_threshold } => {
                cmd_enrich(&settings, &db_path, support_threshold).await
            }
            Commands::Check => cmd_check(&settings, &db_path),
        }
    });
    std::process::exit(code);
}
