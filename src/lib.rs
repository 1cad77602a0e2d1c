//! # Variational LDA
//!
//! Latent Dirichlet Allocation fitted with variational Expectation-Maximization,
//! used to reduce documents to topic-distribution vectors.
//!
//! This library provides:
//! - Corpus, vocabulary and external-id loading
//! - The E-step (per-document variational inference) and the M-step
//!   (β re-estimation and Newton-Raphson for α)
//! - The EM driver with convergence, iteration cap and cancellation
//! - Model dumps, reloads and evaluation metrics
//! - Text preprocessing for building a corpus from raw text
//!
//! ## Example
//!
//! ```rust,no_run
//! use variational_lda::{train, Corpus, LdaConfig, Vocabulary};
//!
//! fn main() -> variational_lda::Result<()> {
//!     let corpus = Corpus::load("corpus.txt")?;
//!     let vocabulary = Vocabulary::load("vocab.txt")?;
//!
//!     let config = LdaConfig::new(20).max_em_iterations(50);
//!     let trained = train(corpus, &config, vocabulary)?;
//!
//!     for topic in trained.model.topics(10) {
//!         println!("{}", topic);
//!     }
//!     println!("{:?}", trained.model.topic_estimate(0));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod math;
pub mod models;
pub mod preprocessing;
pub mod utils;

pub use config::LdaConfig;
pub use data::{Corpus, Document, IdMap, Vocabulary};
pub use error::{LdaError, Result};
pub use models::{
    train, CancellationFlag, InferenceOutcome, LdaModel, StopReason, TopicSummary, TrainedModel,
    Trainer,
};
pub use preprocessing::{CorpusBuilder, Tokenizer};
pub use utils::io::{dump_log, dump_model, read_model, PersistedModel};

/// Common imports for training and querying
pub mod prelude {
    pub use crate::config::LdaConfig;
    pub use crate::data::{Corpus, Document, IdMap, Vocabulary};
    pub use crate::error::{LdaError, Result};
    pub use crate::models::{
        train, CancellationFlag, InferenceOutcome, LdaModel, StopReason, TopicSummary,
        TrainedModel, Trainer,
    };
    pub use crate::utils::evaluation::{kl_divergence, ModelSummary};
    pub use crate::utils::io::{dump_model, read_model, PersistedModel};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
