use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use identx_core::ModelStore;
use identx_engine::{DedupeConfig, Deduper};
use identx_index::{FixedDimEmbedder, HashingEmbedder};
use identx_training::{
    build_index, generate_pairs, load_identities, train_or_generate, EmbeddingCache, PairGenConfig,
};

/// Fuzzy identity resolution over a tabular identity dataset
#[derive(Parser, Debug)]
#[command(name = "identx")]
#[command(about = "Flags probable duplicate identities before account creation", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check one identity record (JSON file) against a dataset
    Check {
        /// Identity dataset CSV
        #[arg(short, long)]
        data: PathBuf,

        /// JSON file holding the record to check
        #[arg(short, long)]
        record: PathBuf,

        /// Classifier artifact; falls back to rule-based scoring when absent
        #[arg(long, default_value = "model.bin")]
        model: PathBuf,

        /// Embedding dimension
        #[arg(long, default_value_t = 512)]
        dim: usize,

        /// Candidates retrieved per check
        #[arg(long, default_value_t = 200)]
        top_k: usize,

        /// Duplicate decision threshold
        #[arg(long, default_value_t = 0.82)]
        threshold: f32,
    },

    /// Mine labeled training pairs from a dataset
    PreparePairs {
        /// Identity dataset CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output pair file (CSV)
        #[arg(short, long, default_value = "labeled_pairs.csv")]
        output: PathBuf,

        /// Embedding dimension
        #[arg(long, default_value_t = 512)]
        dim: usize,

        /// Positive pairs per query row
        #[arg(long, default_value_t = 5)]
        max_pos: usize,

        /// Pairs per output flush
        #[arg(long, default_value_t = 10_000)]
        chunk_size: usize,

        /// Embedding cache directory
        #[arg(long, default_value = ".embed-cache")]
        cache_dir: PathBuf,
    },

    /// Train the duplicate classifier, generating pairs first if needed
    Train {
        /// Identity dataset CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Pair file; generated from the dataset when it does not exist
        #[arg(long, default_value = "labeled_pairs.csv")]
        pairs: PathBuf,

        /// Where to write the classifier artifact
        #[arg(long, default_value = "model.bin")]
        model: PathBuf,

        /// Embedding dimension
        #[arg(long, default_value_t = 512)]
        dim: usize,

        /// Embedding cache directory
        #[arg(long, default_value = ".embed-cache")]
        cache_dir: PathBuf,
    },
}

fn embedder(dim: usize) -> FixedDimEmbedder<HashingEmbedder> {
    FixedDimEmbedder::new(HashingEmbedder::new(256), dim)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting identx v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Check {
            data,
            record,
            model,
            dim,
            top_k,
            threshold,
        } => {
            let rows = load_identities(&data)?;
            let embedder = Arc::new(embedder(dim));
            let index = Arc::new(build_index(&rows, embedder.as_ref(), None)?);
            info!(identities = index.len(), "index ready");

            let record: identx_core::IdentityRecord =
                serde_json::from_reader(std::fs::File::open(&record)?)?;

            let config = DedupeConfig {
                vector_dim: dim,
                top_k,
                threshold,
                model_path: model,
                ..Default::default()
            };
            let deduper = Deduper::new(embedder, index, Arc::new(ModelStore::new()), config);
            let decision = deduper.check(&record)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }

        Command::PreparePairs {
            data,
            output,
            dim,
            max_pos,
            chunk_size,
            cache_dir,
        } => {
            let rows = load_identities(&data)?;
            let embedder = embedder(dim);
            let cache = EmbeddingCache::new(&cache_dir)?;
            let index = build_index(&rows, &embedder, Some(&cache))?;

            let config = PairGenConfig {
                max_pos_per_query: max_pos,
                chunk_size,
                ..Default::default()
            };
            let stats = generate_pairs(&index, &output, &config)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Command::Train {
            data,
            pairs,
            model,
            dim,
            cache_dir,
        } => {
            let rows = load_identities(&data)?;
            let embedder = embedder(dim);
            let cache = EmbeddingCache::new(&cache_dir)?;
            let index = build_index(&rows, &embedder, Some(&cache))?;

            let store = ModelStore::new();
            let report = train_or_generate(
                &pairs,
                &index,
                &embedder,
                &store,
                &model,
                &PairGenConfig::default(),
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
