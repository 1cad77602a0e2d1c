//! E-step: per-document variational inference
//!
//! For a document with tokens w_1..w_N and read-only α, β the engine iterates
//!
//! ```text
//! φ[k][n] ∝ β[k][w_n] · exp(ψ(γ_k))
//! γ_k     = α_k + Σ_n φ[k][n]
//! ```
//!
//! starting from uniform φ and `γ_k = α_k + N/K`, until the largest change
//! in γ drops below the configured tolerance or the round cap is reached.

use crate::config::LdaConfig;
use crate::data::{Corpus, Document};
use crate::math::{digamma, normalize_log_scores};
use crate::models::trainer::CancellationFlag;
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use statrs::function::gamma::ln_gamma;

/// How a document's fixed-point iteration ended. Both are normal outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// Change in γ fell below the tolerance
    Converged,
    /// Round cap reached first
    IterationCapped,
}

/// Variational parameters computed for one document
#[derive(Debug, Clone)]
pub struct DocumentPosterior {
    /// Posterior Dirichlet parameters (K)
    pub gamma: Array1<f64>,
    /// Topic assignment distributions (K × N), columns on the simplex
    pub phi: Array2<f64>,
    pub outcome: InferenceOutcome,
    /// Rounds run
    pub rounds: usize,
    /// Variational lower bound of the document at the final parameters
    pub bound: f64,
}

/// Runs the E-step against fixed global parameters.
///
/// ln β is computed once at construction and shared by every document.
#[derive(Debug)]
pub struct InferenceEngine<'a> {
    alpha: &'a Array1<f64>,
    log_beta: Array2<f64>,
    max_iterations: usize,
    tolerance: f64,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(alpha: &'a Array1<f64>, beta: &Array2<f64>, config: &LdaConfig) -> Self {
        Self {
            alpha,
            log_beta: beta.mapv(f64::ln),
            max_iterations: config.max_inference_iterations,
            tolerance: config.inference_convergence_tolerance,
        }
    }

    pub fn n_topics(&self) -> usize {
        self.alpha.len()
    }

    /// Starting point of the iteration: uniform φ columns, `γ_k = α_k + N/K`
    pub fn initial_state(&self, document: &Document) -> (Array1<f64>, Array2<f64>) {
        let k = self.n_topics();
        let n = document.len();
        let phi = Array2::from_elem((k, n), 1.0 / k as f64);
        let gamma = self.alpha.mapv(|a| a + n as f64 / k as f64);
        (gamma, phi)
    }

    /// One fixed-point round: refresh every φ column from the current γ, then
    /// recompute γ from the new φ. Returns the largest absolute change in γ.
    pub fn update_round(
        &self,
        document: &Document,
        gamma: &mut Array1<f64>,
        phi: &mut Array2<f64>,
    ) -> f64 {
        let k = self.n_topics();
        let digamma_gamma = gamma.mapv(digamma);
        let mut fallbacks = 0usize;

        for (n, &word) in document.words().iter().enumerate() {
            let log_scores = Array1::from_shape_fn(k, |t| self.log_beta[[t, word]] + digamma_gamma[t]);
            let (column, fell_back) = normalize_log_scores(log_scores.view());
            if fell_back {
                fallbacks += 1;
            }
            phi.column_mut(n).assign(&column);
        }

        if fallbacks > 0 {
            warn!(
                "{} token(s) had zero probability under every topic; using uniform assignments",
                fallbacks
            );
        }

        let updated = self.alpha + &phi.sum_axis(Axis(1));
        let change = updated
            .iter()
            .zip(gamma.iter())
            .map(|(new, old)| (new - old).abs())
            .fold(0.0, f64::max);
        *gamma = updated;
        change
    }

    /// Run the fixed-point iteration for one document
    pub fn infer(&self, document: &Document) -> DocumentPosterior {
        let (mut gamma, mut phi) = self.initial_state(document);
        let mut outcome = InferenceOutcome::IterationCapped;
        let mut rounds = 0;

        while rounds < self.max_iterations {
            let change = self.update_round(document, &mut gamma, &mut phi);
            rounds += 1;
            if change < self.tolerance {
                outcome = InferenceOutcome::Converged;
                break;
            }
        }

        let bound = document_bound(self.alpha, &self.log_beta, document, &gamma, &phi);
        DocumentPosterior {
            gamma,
            phi,
            outcome,
            rounds,
            bound,
        }
    }

    /// Run the E-step over a whole corpus, in document order.
    ///
    /// Documents are independent, so the parallel path produces exactly the
    /// same posteriors as the sequential one. Returns `None` when `cancel`
    /// is raised before every document has been processed.
    pub fn infer_corpus(
        &self,
        corpus: &Corpus,
        parallel: bool,
        cancel: Option<&CancellationFlag>,
    ) -> Option<Vec<DocumentPosterior>> {
        let cancelled = || cancel.map_or(false, CancellationFlag::is_cancelled);
        let run = |document: &Document| {
            if cancelled() {
                None
            } else {
                Some(self.infer(document))
            }
        };

        let posteriors: Option<Vec<DocumentPosterior>> = if parallel {
            corpus.documents().par_iter().map(run).collect()
        } else {
            corpus.documents().iter().map(run).collect()
        };

        if let Some(posteriors) = &posteriors {
            let capped = posteriors
                .iter()
                .filter(|p| p.outcome == InferenceOutcome::IterationCapped)
                .count();
            debug!(
                "E-step finished: {} documents, {} hit the round cap",
                posteriors.len(),
                capped
            );
        }
        posteriors
    }
}

/// Variational lower bound of one document.
///
/// ```text
/// L_d = lnΓ(Σα) − Σ lnΓ(α_k) + Σ (α_k − 1) E[ln θ_k]
///     − lnΓ(Σγ) + Σ lnΓ(γ_k) − Σ (γ_k − 1) E[ln θ_k]
///     + Σ_n Σ_k φ[k][n] (E[ln θ_k] + ln β[k][w_n] − ln φ[k][n])
/// ```
/// with `E[ln θ_k] = ψ(γ_k) − ψ(Σγ)`.
pub fn document_bound(
    alpha: &Array1<f64>,
    log_beta: &Array2<f64>,
    document: &Document,
    gamma: &Array1<f64>,
    phi: &Array2<f64>,
) -> f64 {
    let gamma_sum = gamma.sum();
    if !(gamma_sum > 0.0) {
        return 0.0;
    }
    let digamma_sum = digamma(gamma_sum);
    let e_log_theta = gamma.mapv(|g| digamma(g) - digamma_sum);

    let mut bound = ln_gamma(alpha.sum()) - ln_gamma(gamma_sum);
    for k in 0..alpha.len() {
        bound += (alpha[k] - 1.0) * e_log_theta[k] - ln_gamma(alpha[k]);
        bound += ln_gamma(gamma[k]) - (gamma[k] - 1.0) * e_log_theta[k];
    }

    for (n, &word) in document.words().iter().enumerate() {
        for k in 0..alpha.len() {
            let p = phi[[k, n]];
            if p > 0.0 {
                let log_b = log_beta[[k, word]];
                let log_b = if log_b.is_finite() { log_b } else { 0.0 };
                bound += p * (e_log_theta[k] + log_b - p.ln());
            }
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn engine_inputs() -> (Array1<f64>, Array2<f64>) {
        let alpha = array![0.5, 0.8];
        let beta = array![[0.6, 0.3, 0.05, 0.05], [0.05, 0.05, 0.4, 0.5]];
        (alpha, beta)
    }

    #[test]
    fn test_initial_state() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let doc = Document::new(vec![0, 1, 2, 3]);

        let (gamma, phi) = engine.initial_state(&doc);
        assert_eq!(gamma, array![2.5, 2.8]);
        assert!(phi.iter().all(|&p| p == 0.5));
    }

    #[test]
    fn test_converged_columns_on_simplex() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2).max_inference_iterations(200);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let doc = Document::new(vec![0, 0, 1, 3, 2, 0]);

        let posterior = engine.infer(&doc);
        assert_eq!(posterior.outcome, InferenceOutcome::Converged);
        for column in posterior.phi.columns() {
            assert_abs_diff_eq!(column.sum(), 1.0, epsilon = 1e-9);
        }
        assert!(posterior.gamma.iter().all(|&g| g > 0.0));
        // γ = α + Σ_n φ, so Σγ = Σα + N
        assert_abs_diff_eq!(posterior.gamma.sum(), alpha.sum() + 6.0, epsilon = 1e-9);
        // Word-0-heavy document leans to topic 0
        assert!(posterior.gamma[0] > posterior.gamma[1]);
    }

    #[test]
    fn test_iteration_cap_is_reported() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2)
            .max_inference_iterations(1)
            .inference_convergence_tolerance(1e-15);
        let engine = InferenceEngine::new(&alpha, &beta, &config);

        let posterior = engine.infer(&Document::new(vec![0, 2, 3]));
        assert_eq!(posterior.outcome, InferenceOutcome::IterationCapped);
        assert_eq!(posterior.rounds, 1);
        for column in posterior.phi.columns() {
            assert_abs_diff_eq!(column.sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let (alpha, beta) = engine_inputs();
        let tolerance = 1e-8;
        let config = LdaConfig::new(2)
            .max_inference_iterations(1000)
            .inference_convergence_tolerance(tolerance);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let doc = Document::new(vec![1, 1, 2, 0, 3]);

        let posterior = engine.infer(&doc);
        assert_eq!(posterior.outcome, InferenceOutcome::Converged);

        let mut gamma = posterior.gamma.clone();
        let mut phi = posterior.phi.clone();
        let change = engine.update_round(&doc, &mut gamma, &mut phi);
        assert!(change < tolerance);
        for (a, b) in phi.iter().zip(posterior.phi.iter()) {
            assert!((a - b).abs() < 10.0 * tolerance);
        }
    }

    #[test]
    fn test_empty_document() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2);
        let engine = InferenceEngine::new(&alpha, &beta, &config);

        let posterior = engine.infer(&Document::default());
        assert_eq!(posterior.outcome, InferenceOutcome::Converged);
        assert_eq!(posterior.gamma, alpha);
        assert_eq!(posterior.phi.dim(), (2, 0));
    }

    #[test]
    fn test_zero_beta_word_uses_uniform_column() {
        let alpha = array![1.0, 1.0];
        let beta = array![[1.0, 0.0], [1.0, 0.0]];
        let config = LdaConfig::new(2);
        let engine = InferenceEngine::new(&alpha, &beta, &config);

        let posterior = engine.infer(&Document::new(vec![1]));
        assert_eq!(posterior.phi.column(0).to_vec(), vec![0.5, 0.5]);
        assert!(posterior.bound.is_finite());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let corpus = Corpus::new(vec![
            vec![0, 1, 2].into(),
            vec![3, 3, 2].into(),
            vec![0].into(),
            Document::default(),
        ]);

        let sequential = engine.infer_corpus(&corpus, false, None).unwrap();
        let parallel = engine.infer_corpus(&corpus, true, None).unwrap();
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.gamma, p.gamma);
            assert_eq!(s.phi, p.phi);
        }
    }

    #[test]
    fn test_cancelled_corpus_run() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let corpus = Corpus::new(vec![vec![0, 1].into(), vec![2].into()]);

        let flag = CancellationFlag::new();
        flag.cancel();
        assert!(engine.infer_corpus(&corpus, false, Some(&flag)).is_none());
    }

    #[test]
    fn test_bound_improves_over_initial_state() {
        let (alpha, beta) = engine_inputs();
        let config = LdaConfig::new(2).max_inference_iterations(100);
        let engine = InferenceEngine::new(&alpha, &beta, &config);
        let doc = Document::new(vec![0, 0, 1, 2, 3, 3]);
        let log_beta = beta.mapv(f64::ln);

        let (gamma0, phi0) = engine.initial_state(&doc);
        let initial = document_bound(&alpha, &log_beta, &doc, &gamma0, &phi0);
        let posterior = engine.infer(&doc);
        assert!(posterior.bound > initial);
    }
}
