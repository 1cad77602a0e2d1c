//! Train an LDA model from corpus files
//!
//! Usage:
//! ```
//! cargo run --release --bin train_lda -- --corpus data/corpus.txt --vocab data/vocab.txt \
//!     --topics 50 --model-out model.txt --top-words 10
//! ```
//!
//! With `--load-model` the EM run is skipped: the dump is read back, matched
//! against the corpus and the document posteriors are recomputed.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use variational_lda::utils::evaluation::ModelSummary;
use variational_lda::{
    dump_log, dump_model, read_model, Corpus, IdMap, LdaConfig, LdaModel, Trainer, Vocabulary,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fit LDA with variational EM")]
struct Args {
    /// Corpus file: one document per line, whitespace-separated word indices
    #[arg(short, long)]
    corpus: PathBuf,

    /// Vocabulary file: one word per line
    #[arg(short, long)]
    vocab: PathBuf,

    /// JSON configuration; command-line flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of topics
    #[arg(short = 'k', long)]
    topics: Option<usize>,

    /// Seed for parameter initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum EM iterations
    #[arg(long)]
    max_em: Option<usize>,

    /// Run the E-step on a single thread
    #[arg(long)]
    sequential: bool,

    /// Reuse a model dump instead of training
    #[arg(long)]
    load_model: Option<PathBuf>,

    /// Write the model dump here
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Write per-document γ and φ here
    #[arg(long)]
    log_out: Option<PathBuf>,

    /// Top words printed per topic
    #[arg(long, default_value = "10")]
    top_words: usize,

    /// CSV of `external_id,document_index` pairs
    #[arg(long)]
    id_map: Option<PathBuf>,

    /// External ids whose topic estimates are printed
    #[arg(long, num_args = 1..)]
    query_id: Vec<u64>,

    /// Print evaluation metrics
    #[arg(long)]
    summary: bool,
}

fn load_config(args: &Args) -> Result<LdaConfig> {
    let mut config = match &args.config {
        Some(path) => LdaConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LdaConfig::default(),
    };

    if let Some(k) = args.topics {
        config.n_topics = k;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(max_em) = args.max_em {
        config.max_em_iterations = max_em;
    }
    if args.sequential {
        config.parallel = false;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let corpus = Arc::new(
        Corpus::load(&args.corpus)
            .with_context(|| format!("reading corpus {}", args.corpus.display()))?,
    );
    let vocabulary = Arc::new(
        Vocabulary::load(&args.vocab)
            .with_context(|| format!("reading vocabulary {}", args.vocab.display()))?,
    );
    info!(
        "Loaded {} documents ({} tokens) over {} words",
        corpus.len(),
        corpus.total_tokens(),
        vocabulary.len()
    );

    let model = match &args.load_model {
        Some(path) => {
            let persisted = read_model(path)
                .with_context(|| format!("reading model {}", path.display()))?;
            if persisted.n_topics != config.n_topics {
                info!(
                    "Using {} topics from {} instead of the configured {}",
                    persisted.n_topics,
                    path.display(),
                    config.n_topics
                );
            }
            let mut model = LdaModel::from_persisted(persisted, corpus, vocabulary)?;
            model.refresh_posteriors(&config)?;
            model
        }
        None => {
            let trained = Trainer::new(config.clone())?.train(corpus, vocabulary)?;
            println!(
                "EM stopped after {} iterations: {:?}",
                trained.iterations(),
                trained.stop_reason
            );
            trained.model
        }
    };

    if let Some(path) = &args.model_out {
        let message = format!("LDA model, {} topics", model.n_topics());
        dump_model(&model, path, &message)
            .with_context(|| format!("writing model {}", path.display()))?;
        info!("Model written to {}", path.display());
    }
    if let Some(path) = &args.log_out {
        dump_log(&model, path, "Variational parameters")
            .with_context(|| format!("writing log {}", path.display()))?;
        info!("Variational parameters written to {}", path.display());
    }

    println!("\n=== Topics ===\n");
    for topic in model.topics(args.top_words) {
        println!("{}", topic);
    }

    if args.summary {
        println!();
        ModelSummary::from_model(&model, args.top_words).print();
    }

    if !args.query_id.is_empty() {
        let Some(path) = &args.id_map else {
            bail!("--query-id requires --id-map");
        };
        let ids = IdMap::load(path).with_context(|| format!("reading id map {}", path.display()))?;

        println!("\n=== Topic estimates ===\n");
        for &id in &args.query_id {
            let estimate = model.topic_estimate_for(id, &ids);
            if ids.resolve(id).is_none() {
                println!("  {}: unknown id, zero vector", id);
            }
            let formatted: Vec<String> = estimate.iter().map(|p| format!("{:.4}", p)).collect();
            println!("  {}: [{}]", id, formatted.join(", "));
        }
    }

    Ok(())
}
