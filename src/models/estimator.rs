//! M-step: re-estimation of the global parameters
//!
//! β is the row-normalized sum of φ columns over every token of the corpus.
//! α maximizes the corpus-summed Dirichlet part of the lower bound by
//! Newton-Raphson; the Hessian `diag(−D·ψ'(α)) + D·ψ'(Σα)·11ᵀ` is solved in
//! O(K) and steps are halved until every α_k stays positive.

use crate::config::LdaConfig;
use crate::data::Corpus;
use crate::error::{LdaError, Result};
use crate::math::{digamma, normalize_or_uniform, solve_structured_newton_step, trigamma};
use crate::models::inference::DocumentPosterior;
use log::{debug, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

/// How the α update ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonReport {
    /// Newton iterations taken
    pub iterations: usize,
    /// Euclidean norm of the gradient at the returned α
    pub gradient_norm: f64,
    /// Whether the gradient norm fell below the tolerance
    pub converged: bool,
    /// Total step halvings across all iterations
    pub backtracks: usize,
}

/// New global parameters produced by one M-step
#[derive(Debug, Clone)]
pub struct GlobalParameters {
    pub alpha: Array1<f64>,
    pub beta: Array2<f64>,
    pub newton: NewtonReport,
    /// Topics that received no mass and were reset to uniform
    pub empty_topics: usize,
}

/// M-step settings
#[derive(Debug, Clone)]
pub struct Estimator {
    max_newton_iterations: usize,
    newton_tolerance: f64,
    max_backtracks: usize,
    parallel: bool,
}

impl Estimator {
    pub fn new(config: &LdaConfig) -> Self {
        Self {
            max_newton_iterations: config.max_newton_iterations,
            newton_tolerance: config.newton_tolerance,
            max_backtracks: config.max_backtracks,
            parallel: config.parallel,
        }
    }

    /// Compute new α and β from the posteriors of every document.
    ///
    /// `alpha` is the Newton starting point (the current concentration).
    /// Posteriors are only borrowed; the caller moves them into the model
    /// afterwards.
    pub fn estimate(
        &self,
        corpus: &Corpus,
        posteriors: &[DocumentPosterior],
        alpha: &Array1<f64>,
        vocab_size: usize,
    ) -> Result<GlobalParameters> {
        if posteriors.len() != corpus.len() {
            return Err(LdaError::DimensionMismatch {
                what: "posteriors",
                expected: corpus.len(),
                found: posteriors.len(),
            });
        }

        let (beta, empty_topics) = estimate_beta(
            corpus,
            posteriors.iter().map(|p| &p.phi),
            alpha.len(),
            vocab_size,
        );
        let gammas: Vec<&Array1<f64>> = posteriors.iter().map(|p| &p.gamma).collect();
        let suff_stats = self.alpha_sufficient_statistics(&gammas);
        let (alpha, newton) = self.estimate_alpha(alpha, &suff_stats, corpus.len())?;

        Ok(GlobalParameters {
            alpha,
            beta,
            newton,
            empty_topics,
        })
    }

    /// `Σ_d (ψ(γ_dk) − ψ(Σ_j γ_dj))` for every topic k.
    ///
    /// Per-document terms may be computed in parallel; they are always summed
    /// in document order.
    pub fn alpha_sufficient_statistics(&self, gammas: &[&Array1<f64>]) -> Array1<f64> {
        let n_topics = gammas.first().map_or(0, |g| g.len());
        let per_document = |gamma: &&Array1<f64>| {
            let digamma_sum = digamma(gamma.sum());
            gamma.mapv(|g| digamma(g) - digamma_sum)
        };

        let terms: Vec<Array1<f64>> = if self.parallel {
            gammas.par_iter().map(per_document).collect()
        } else {
            gammas.iter().map(per_document).collect()
        };

        terms
            .iter()
            .fold(Array1::zeros(n_topics), |acc, term| acc + term)
    }

    /// Newton-Raphson for α given the sufficient statistics of `n_documents`
    /// documents. Every accepted iterate is strictly positive.
    pub fn estimate_alpha(
        &self,
        initial: &Array1<f64>,
        suff_stats: &Array1<f64>,
        n_documents: usize,
    ) -> Result<(Array1<f64>, NewtonReport)> {
        let d = n_documents as f64;
        let mut alpha = initial.clone();
        let mut total_backtracks = 0;
        let mut iterations = 0;

        let gradient_at = |alpha: &Array1<f64>| -> Array1<f64> {
            let digamma_sum = digamma(alpha.sum());
            Array1::from_shape_fn(alpha.len(), |k| {
                d * (digamma_sum - digamma(alpha[k])) + suff_stats[k]
            })
        };

        let mut gradient = gradient_at(&alpha);
        let mut gradient_norm = gradient.dot(&gradient).sqrt();

        while iterations < self.max_newton_iterations && gradient_norm >= self.newton_tolerance {
            let hessian_diagonal = alpha.mapv(|a| -d * trigamma(a));
            let off_diagonal = d * trigamma(alpha.sum());
            let delta = solve_structured_newton_step(&gradient, &hessian_diagonal, off_diagonal);

            let mut step = 1.0;
            let mut backtracks = 0;
            let candidate = loop {
                let candidate = &alpha - &(&delta * step);
                if candidate.iter().all(|&a| a > 0.0 && a.is_finite()) {
                    break candidate;
                }
                if backtracks == self.max_backtracks {
                    return Err(LdaError::OptimizationFailed {
                        iteration: iterations,
                        backtracks,
                    });
                }
                step *= 0.5;
                backtracks += 1;
            };

            total_backtracks += backtracks;
            alpha = candidate;
            iterations += 1;
            gradient = gradient_at(&alpha);
            gradient_norm = gradient.dot(&gradient).sqrt();
            debug!(
                "Newton iteration {}: |g| = {:.3e}, step = {}",
                iterations, gradient_norm, step
            );
        }

        let converged = gradient_norm < self.newton_tolerance;
        if !converged {
            debug!(
                "Alpha update stopped after {} iterations with |g| = {:.3e}",
                iterations, gradient_norm
            );
        }

        Ok((
            alpha,
            NewtonReport {
                iterations,
                gradient_norm,
                converged,
                backtracks: total_backtracks,
            },
        ))
    }
}

/// Accumulate φ columns into a K × V matrix and normalize each row.
///
/// A topic that received no mass at all becomes the uniform distribution
/// over the vocabulary; the number of such topics is returned alongside.
pub fn estimate_beta<'a>(
    corpus: &Corpus,
    phis: impl IntoIterator<Item = &'a Array2<f64>>,
    n_topics: usize,
    vocab_size: usize,
) -> (Array2<f64>, usize) {
    let mut accumulator = Array2::<f64>::zeros((n_topics, vocab_size));

    for (document, phi) in corpus.documents().iter().zip(phis) {
        for (n, &word) in document.words().iter().enumerate() {
            let mut column = accumulator.column_mut(word);
            column += &phi.column(n);
        }
    }

    let mut empty_topics = 0;
    for (topic, mut row) in accumulator.rows_mut().into_iter().enumerate() {
        let (normalized, fell_back) = normalize_or_uniform(row.view());
        if fell_back {
            warn!("Topic {} received no mass; resetting it to uniform", topic);
            empty_topics += 1;
        }
        row.assign(&normalized);
    }

    (accumulator, empty_topics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Document;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn estimator() -> Estimator {
        Estimator::new(&LdaConfig::new(2).parallel(false))
    }

    #[test]
    fn test_beta_rows_on_simplex() {
        let corpus = Corpus::new(vec![vec![0, 2].into(), vec![1, 1, 2].into()]);
        let phis = vec![
            array![[0.9, 0.2], [0.1, 0.8]],
            array![[0.5, 0.3, 0.0], [0.5, 0.7, 1.0]],
        ];

        let (beta, empty) = estimate_beta(&corpus, &phis, 2, 4);
        assert_eq!(empty, 0);
        for row in beta.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        // Topic 0 mass: word0 0.9, word1 0.8, word2 0.2, word3 0
        assert_abs_diff_eq!(beta[[0, 0]], 0.9 / 1.9, epsilon = 1e-12);
        assert_abs_diff_eq!(beta[[0, 1]], 0.8 / 1.9, epsilon = 1e-12);
        assert_eq!(beta[[0, 3]], 0.0);
    }

    #[test]
    fn test_beta_empty_topic_is_uniform() {
        let corpus = Corpus::new(vec![vec![0, 1].into()]);
        let phis = vec![array![[1.0, 1.0], [0.0, 0.0]]];

        let (beta, empty) = estimate_beta(&corpus, &phis, 2, 4);
        assert_eq!(empty, 1);
        assert!(beta.row(1).iter().all(|&b| b == 0.25));
    }

    #[test]
    fn test_alpha_sufficient_statistics_parallel_matches() {
        let gammas = vec![array![1.5, 2.5, 0.3], array![4.0, 0.2, 0.9], array![1.0, 1.0, 1.0]];
        let refs: Vec<&Array1<f64>> = gammas.iter().collect();
        let seq = estimator().alpha_sufficient_statistics(&refs);
        let par = Estimator::new(&LdaConfig::new(3).parallel(true)).alpha_sufficient_statistics(&refs);
        assert_eq!(seq, par);

        let expected0: f64 = gammas
            .iter()
            .map(|g| digamma(g[0]) - digamma(g.sum()))
            .sum();
        assert_abs_diff_eq!(seq[0], expected0, epsilon = 1e-12);
    }

    #[test]
    fn test_alpha_recovers_dirichlet_parameters() {
        // Sufficient statistics generated by a known α make that α the
        // stationary point: ss_k = D(ψ(α_k) − ψ(Σα)).
        let truth = array![0.4, 1.3, 2.2];
        let d = 50usize;
        let digamma_sum = digamma(truth.sum());
        let suff_stats = truth.mapv(|a| d as f64 * (digamma(a) - digamma_sum));

        let (alpha, report) = estimator()
            .estimate_alpha(&array![0.5, 1.0, 2.0], &suff_stats, d)
            .unwrap();

        assert!(report.converged);
        for (a, t) in alpha.iter().zip(truth.iter()) {
            assert_abs_diff_eq!(a, t, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_alpha_stays_positive_from_hard_start() {
        // Very small true concentration forces large negative Newton steps.
        let truth = array![0.01, 0.02];
        let d = 10usize;
        let digamma_sum = digamma(truth.sum());
        let suff_stats = truth.mapv(|a| d as f64 * (digamma(a) - digamma_sum));

        let est = Estimator::new(&LdaConfig::new(2).parallel(false).max_newton_iterations(500));
        let (alpha, report) = est.estimate_alpha(&array![5.0, 5.0], &suff_stats, d).unwrap();

        assert!(alpha.iter().all(|&a| a > 0.0));
        assert!(report.backtracks > 0);
    }

    #[test]
    fn test_backtrack_budget_exhausted() {
        let truth = array![0.01, 0.02];
        let d = 10usize;
        let digamma_sum = digamma(truth.sum());
        let suff_stats = truth.mapv(|a| d as f64 * (digamma(a) - digamma_sum));

        let est = Estimator::new(&LdaConfig::new(2).parallel(false).max_backtracks(0));
        let result = est.estimate_alpha(&array![5.0, 5.0], &suff_stats, d);
        assert!(matches!(result, Err(LdaError::OptimizationFailed { .. })));
    }

    #[test]
    fn test_estimate_checks_posterior_count() {
        let corpus = Corpus::new(vec![Document::new(vec![0])]);
        let result = estimator().estimate(&corpus, &[], &array![1.0, 1.0], 1);
        assert!(matches!(result, Err(LdaError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_estimate_from_borrowed_posteriors() {
        use crate::models::inference::InferenceOutcome;

        let corpus = Corpus::new(vec![vec![0, 2].into(), vec![1, 1, 2].into()]);
        let phis = vec![
            array![[0.9, 0.2], [0.1, 0.8]],
            array![[0.5, 0.3, 0.0], [0.5, 0.7, 1.0]],
        ];
        let gammas = vec![array![2.0, 1.9], array![1.8, 3.2]];
        let posteriors: Vec<DocumentPosterior> = gammas
            .iter()
            .zip(phis.iter())
            .map(|(gamma, phi)| DocumentPosterior {
                gamma: gamma.clone(),
                phi: phi.clone(),
                outcome: InferenceOutcome::Converged,
                rounds: 1,
                bound: 0.0,
            })
            .collect();

        let est = estimator();
        let globals = est.estimate(&corpus, &posteriors, &array![1.0, 1.0], 4).unwrap();
        let (beta, _) = estimate_beta(&corpus, &phis, 2, 4);
        assert_eq!(globals.beta, beta);

        let refs: Vec<&Array1<f64>> = gammas.iter().collect();
        let (alpha, _) = est
            .estimate_alpha(&array![1.0, 1.0], &est.alpha_sufficient_statistics(&refs), 2)
            .unwrap();
        assert_eq!(globals.alpha, alpha);
        // Posteriors are untouched
        assert_eq!(posteriors[1].phi, phis[1]);
    }
}
