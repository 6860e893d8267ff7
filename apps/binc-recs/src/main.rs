//! binc-recs - recommendation diagnostics
//!
//! Reports which numerical libraries the engine can use, trains on a CSV of
//! interactions and prints recommendations, or scores review sentiment.
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`).

use std::path::{Path, PathBuf};

use binc_recommend::io::{read_interactions_path, read_reviews_path};
use binc_recommend::{
    interaction::validate_records, BackendKind, CapabilitySet, CollaborativeFilteringEngine,
    DependencyManager, RecommendConfig, RecommendationService, SentimentAnalyzer, ServiceConfig,
    UserId,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "binc-recs")]
#[command(about = "Collaborative filtering diagnostics for binc")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); the standard location is used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Force a backend (factorization, toolkit, fallback)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report library availability and language resources
    Status {
        /// Download missing language resources
        #[arg(long)]
        fetch: bool,
    },

    /// Train on an interaction CSV and recommend for one user
    Recommend {
        /// CSV with a user_id,product_id,score header
        #[arg(long)]
        interactions: PathBuf,

        /// User to recommend for
        #[arg(long)]
        user: UserId,

        /// Number of recommendations
        #[arg(short, default_value = "10")]
        n: usize,

        /// Pad with popular products even when the config file turns padding off
        #[arg(long)]
        popular: bool,
    },

    /// Score review sentiment
    Sentiment {
        /// CSV with a user_id,product_id,rating,comment header
        #[arg(long)]
        reviews: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Status { fetch } => cmd_status(config, cli.backend, fetch),
        Commands::Recommend {
            interactions,
            user,
            n,
            popular,
        } => cmd_recommend(config, cli.backend, &interactions, user, n, popular),
        Commands::Sentiment { reviews } => cmd_sentiment(config, &reviews),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> CliResult<RecommendConfig> {
    let config = match path {
        Some(path) => {
            let mut config = RecommendConfig::load(path)?;
            config.probe.apply_env();
            config
        }
        None => RecommendConfig::load_standard()?,
    };
    Ok(config)
}

fn print_json(value: &serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The forced backend when one is given, otherwise the best `caps` supports
fn effective_backend(caps: &CapabilitySet, forced: Option<BackendKind>) -> BackendKind {
    forced.unwrap_or_else(|| BackendKind::select(caps))
}

/// `--popular` can only switch padding on; the config file decides otherwise
fn service_config(config: &RecommendConfig, popular: bool) -> ServiceConfig {
    let mut service = config.service.clone();
    service.popular_fallback |= popular;
    service
}

fn cmd_status(
    mut config: RecommendConfig,
    backend: Option<BackendKind>,
    fetch: bool,
) -> CliResult<()> {
    config.probe.fetch_missing_resources |= fetch;
    let probe = DependencyManager::new(config.probe);
    let report = probe.status_report();
    let caps = probe.capabilities();
    let backend = effective_backend(&caps, backend);

    print_json(&json!({
        "backend": backend,
        "backend_supported": backend.is_supported_by(&caps),
        "data_dir": probe.data_dir(),
        "healthy": report.is_healthy(),
        "report": report,
    }))
}

fn cmd_recommend(
    config: RecommendConfig,
    backend: Option<BackendKind>,
    interactions: &Path,
    user: UserId,
    n: usize,
    popular: bool,
) -> CliResult<()> {
    let probe = DependencyManager::new(config.probe.clone());
    let caps = probe.capabilities();
    let engine = match backend {
        Some(kind) => {
            CollaborativeFilteringEngine::with_backend(&caps, config.engine.clone(), kind)?
        }
        None => CollaborativeFilteringEngine::new(&caps, config.engine.clone()),
    };

    let mut service =
        RecommendationService::with_engine(engine, service_config(&config, popular));

    let records = read_interactions_path(interactions)?;
    let batch = validate_records(&records)?;
    tracing::info!("Loaded {} interactions from {:?}", batch.len(), interactions);
    let summary = service.try_train(&batch)?;

    print_json(&json!({
        "training": summary,
        "user_id": user,
        "recommendations": service.recommend(user, n),
    }))
}

fn cmd_sentiment(config: RecommendConfig, reviews: &Path) -> CliResult<()> {
    let probe = DependencyManager::new(config.probe);
    let analyzer = SentimentAnalyzer::from_probe(&probe);
    let reviews = read_reviews_path(reviews)?;

    let scored: Vec<serde_json::Value> = reviews
        .iter()
        .map(|review| {
            json!({
                "user_id": review.user_id,
                "product_id": review.product_id,
                "rating": review.rating,
                "sentiment": analyzer.analyze(review),
            })
        })
        .collect();

    print_json(&json!({
        "lexicon": analyzer.has_lexicon(),
        "reviews": scored,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popular_flag_does_not_override_config() {
        let config = RecommendConfig::default();
        assert!(service_config(&config, false).popular_fallback);
        assert!(service_config(&config, true).popular_fallback);

        let mut config = RecommendConfig::default();
        config.service.popular_fallback = false;
        assert!(!service_config(&config, false).popular_fallback);
        assert!(service_config(&config, true).popular_fallback);
    }

    #[test]
    fn test_status_reports_forced_backend() {
        let caps = CapabilitySet::none();
        assert_eq!(effective_backend(&caps, None), BackendKind::Fallback);
        assert_eq!(
            effective_backend(&caps, Some(BackendKind::Toolkit)),
            BackendKind::Toolkit
        );
        assert!(!BackendKind::Toolkit.is_supported_by(&caps));
    }
}
