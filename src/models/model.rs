//! Parameter container for a fitted (or in-training) LDA model
//!
//! Holds the corpus-global parameters α and β and the per-document
//! variational parameters γ_d and φ_d. It carries no algorithmic logic beyond
//! construction and read-only queries; the E-step and M-step produce new
//! values which the trainer swaps in.

use crate::config::LdaConfig;
use crate::data::{Corpus, Document, IdMap, Vocabulary};
use crate::error::{LdaError, Result};
use crate::math::normalize;
use crate::models::inference::{document_bound, DocumentPosterior, InferenceEngine};
use crate::utils::io::PersistedModel;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use std::sync::Arc;

/// Latent Dirichlet Allocation model
#[derive(Debug, Clone)]
pub struct LdaModel {
    /// Concentration vector (K)
    alpha: Array1<f64>,
    /// Topic-word matrix (K × V), rows on the simplex
    beta: Array2<f64>,
    /// Posterior Dirichlet parameters per document (K each)
    gamma: Vec<Array1<f64>>,
    /// Topic assignment distributions per document (K × N_d each)
    phi: Vec<Array2<f64>>,
    corpus: Arc<Corpus>,
    vocabulary: Arc<Vocabulary>,
}

impl LdaModel {
    /// Build the starting model for training.
    ///
    /// α and β are drawn from a ChaCha8 stream seeded with `config.seed`:
    /// K draws for α first, then β row by row. Each draw is uniform on
    /// (0, 1), so every entry is strictly positive before normalization.
    /// An explicit `config.initial_alpha` replaces the drawn α; the α draws
    /// are still consumed so β depends on the seed alone.
    pub fn initialize(
        corpus: Arc<Corpus>,
        vocabulary: Arc<Vocabulary>,
        config: &LdaConfig,
    ) -> Result<Self> {
        config.validate()?;
        if corpus.is_empty() {
            return Err(LdaError::EmptyCorpus);
        }
        if vocabulary.is_empty() {
            return Err(LdaError::EmptyVocabulary);
        }
        corpus.check_vocabulary(vocabulary.len())?;

        let n_topics = config.n_topics;
        let vocab_size = vocabulary.len();

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let unit = Uniform::new(f64::MIN_POSITIVE, 1.0);

        let drawn_alpha: Array1<f64> = (0..n_topics).map(|_| unit.sample(&mut rng)).collect();
        let alpha = match &config.initial_alpha {
            Some(explicit) => Array1::from(explicit.clone()),
            None => normalize(drawn_alpha.view())?,
        };

        let mut beta = Array2::zeros((n_topics, vocab_size));
        for mut row in beta.rows_mut() {
            let draws: Array1<f64> = (0..vocab_size).map(|_| unit.sample(&mut rng)).collect();
            row.assign(&normalize(draws.view())?);
        }

        let gamma = vec![Array1::zeros(n_topics); corpus.len()];
        let phi = corpus
            .documents()
            .iter()
            .map(|doc| Array2::zeros((n_topics, doc.len())))
            .collect();

        Ok(Self {
            alpha,
            beta,
            gamma,
            phi,
            corpus,
            vocabulary,
        })
    }

    /// Rebuild a model from a parsed dump.
    ///
    /// The dump carries α and β only; posteriors start zero-filled and can be
    /// recomputed with [`LdaModel::refresh_posteriors`].
    pub fn from_persisted(
        persisted: PersistedModel,
        corpus: Arc<Corpus>,
        vocabulary: Arc<Vocabulary>,
    ) -> Result<Self> {
        let n_topics = persisted.alpha.len();
        if n_topics == 0 {
            return Err(LdaError::InvalidTopicCount);
        }
        if persisted.n_documents != corpus.len() {
            return Err(LdaError::DimensionMismatch {
                what: "documents",
                expected: corpus.len(),
                found: persisted.n_documents,
            });
        }
        if persisted.beta.ncols() != vocabulary.len() {
            return Err(LdaError::DimensionMismatch {
                what: "vocabulary",
                expected: vocabulary.len(),
                found: persisted.beta.ncols(),
            });
        }
        if persisted.alpha.iter().any(|&a| !(a > 0.0) || !a.is_finite()) {
            return Err(LdaError::InvalidParameter(
                "persisted alpha must be finite and positive".into(),
            ));
        }
        if persisted.beta.iter().any(|&b| !(b >= 0.0) || !b.is_finite()) {
            return Err(LdaError::InvalidParameter(
                "persisted beta must be finite and non-negative".into(),
            ));
        }
        corpus.check_vocabulary(vocabulary.len())?;

        let gamma = vec![Array1::zeros(n_topics); corpus.len()];
        let phi = corpus
            .documents()
            .iter()
            .map(|doc| Array2::zeros((n_topics, doc.len())))
            .collect();

        Ok(Self {
            alpha: persisted.alpha,
            beta: persisted.beta,
            gamma,
            phi,
            corpus,
            vocabulary,
        })
    }

    /// Number of topics (K)
    pub fn n_topics(&self) -> usize {
        self.alpha.len()
    }

    /// Vocabulary size (V)
    pub fn vocab_size(&self) -> usize {
        self.beta.ncols()
    }

    /// Number of documents (D)
    pub fn n_documents(&self) -> usize {
        self.gamma.len()
    }

    pub fn alpha(&self) -> &Array1<f64> {
        &self.alpha
    }

    pub fn beta(&self) -> &Array2<f64> {
        &self.beta
    }

    pub fn gamma(&self, document: usize) -> Option<&Array1<f64>> {
        self.gamma.get(document)
    }

    pub fn phi(&self, document: usize) -> Option<&Array2<f64>> {
        self.phi.get(document)
    }

    pub fn gammas(&self) -> &[Array1<f64>] {
        &self.gamma
    }

    pub fn phis(&self) -> &[Array2<f64>] {
        &self.phi
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Replace α and β with the result of an M-step
    pub fn set_global_parameters(&mut self, alpha: Array1<f64>, beta: Array2<f64>) -> Result<()> {
        if alpha.len() != self.n_topics() {
            return Err(LdaError::DimensionMismatch {
                what: "alpha",
                expected: self.n_topics(),
                found: alpha.len(),
            });
        }
        if beta.nrows() != self.beta.nrows() {
            return Err(LdaError::DimensionMismatch {
                what: "beta rows",
                expected: self.beta.nrows(),
                found: beta.nrows(),
            });
        }
        if beta.ncols() != self.beta.ncols() {
            return Err(LdaError::DimensionMismatch {
                what: "beta columns",
                expected: self.beta.ncols(),
                found: beta.ncols(),
            });
        }
        self.alpha = alpha;
        self.beta = beta;
        Ok(())
    }

    /// Replace every document's γ and φ with the result of an E-step
    pub fn set_posteriors(&mut self, posteriors: Vec<DocumentPosterior>) -> Result<()> {
        if posteriors.len() != self.n_documents() {
            return Err(LdaError::DimensionMismatch {
                what: "posteriors",
                expected: self.n_documents(),
                found: posteriors.len(),
            });
        }
        let (gamma, phi): (Vec<_>, Vec<_>) = posteriors.into_iter().map(|p| (p.gamma, p.phi)).unzip();
        self.gamma = gamma;
        self.phi = phi;
        Ok(())
    }

    /// Run the E-step for a document that is not part of the training corpus.
    /// The model itself is not modified.
    pub fn infer(&self, document: &Document, config: &LdaConfig) -> Result<DocumentPosterior> {
        let vocab_size = self.vocab_size();
        if let Some((position, &word)) = document
            .words()
            .iter()
            .enumerate()
            .find(|&(_, &w)| w >= vocab_size)
        {
            return Err(LdaError::WordOutOfRange {
                document: 0,
                position,
                word,
                vocab_size,
            });
        }
        let engine = InferenceEngine::new(&self.alpha, &self.beta, config);
        Ok(engine.infer(document))
    }

    /// Recompute every document's posterior against the current α and β,
    /// e.g. after reloading a dump.
    pub fn refresh_posteriors(&mut self, config: &LdaConfig) -> Result<()> {
        let posteriors = {
            let engine = InferenceEngine::new(&self.alpha, &self.beta, config);
            engine.infer_corpus(&self.corpus, config.parallel, None)
        };
        match posteriors {
            Some(posteriors) => self.set_posteriors(posteriors),
            None => Ok(()),
        }
    }

    /// Topic estimate for a document: γ_d normalized to sum to one.
    ///
    /// Returns a zero vector of length K when `document` does not resolve
    /// to a document of this model, or when its posterior has not been
    /// computed yet. Callers treat the zero vector as a neutral feature.
    pub fn topic_estimate(&self, document: usize) -> Array1<f64> {
        self.gamma
            .get(document)
            .and_then(|gamma| normalize(gamma.view()).ok())
            .unwrap_or_else(|| Array1::zeros(self.n_topics()))
    }

    /// Topic estimate for an external document id, resolved through `ids`.
    /// Unmapped ids produce the zero vector.
    pub fn topic_estimate_for(&self, external_id: u64, ids: &IdMap) -> Array1<f64> {
        match ids.resolve(external_id) {
            Some(document) => self.topic_estimate(document),
            None => Array1::zeros(self.n_topics()),
        }
    }

    /// Sum of the per-document variational lower bounds under the current
    /// parameters and posteriors
    pub fn lower_bound(&self) -> f64 {
        let log_beta = self.beta.mapv(f64::ln);
        self.corpus
            .documents()
            .iter()
            .zip(self.gamma.iter().zip(self.phi.iter()))
            .map(|(doc, (gamma, phi))| {
                document_bound(&self.alpha, &log_beta, doc, gamma, phi)
            })
            .sum()
    }

    /// `exp(-bound / total_tokens)`; lower is better
    pub fn perplexity(&self) -> f64 {
        let tokens = self.corpus.total_tokens();
        if tokens == 0 {
            return f64::NAN;
        }
        (-self.lower_bound() / tokens as f64).exp()
    }
}
