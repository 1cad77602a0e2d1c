//! Variational EM driver
//!
//! Each round runs the E-step over every document against the current α, β,
//! swaps the new posteriors into the model, then runs the M-step and swaps in
//! the new α, β. Training stops when the relative change of the corpus lower
//! bound falls below `em_convergence_tolerance`, when `max_em_iterations`
//! rounds have run, when the cancellation flag is raised, or when the α
//! update cannot keep every entry positive.

use crate::config::LdaConfig;
use crate::data::{Corpus, Vocabulary};
use crate::error::{LdaError, Result};
use crate::models::estimator::Estimator;
use crate::models::inference::{InferenceEngine, InferenceOutcome};
use crate::models::model::LdaModel;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why training stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Relative change of the lower bound fell below the tolerance
    Converged,
    /// `max_em_iterations` rounds ran without converging
    IterationCapped,
    /// The cancellation flag was raised; the model reflects the last
    /// completed round
    Cancelled,
    /// Newton-Raphson for α ran out of step halvings in EM round `round`;
    /// the model reflects the last completed round
    OptimizationFailed {
        round: usize,
        newton_iteration: usize,
        backtracks: usize,
    },
}

/// Statistics of one completed EM round
#[derive(Debug, Clone, PartialEq)]
pub struct EmRound {
    pub iteration: usize,
    /// Corpus lower bound from this round's E-step
    pub bound: f64,
    /// `|(previous − bound) / previous|`, absent in the first round
    pub relative_change: Option<f64>,
    /// Documents whose E-step hit the round cap
    pub capped_documents: usize,
    pub newton_iterations: usize,
}

/// Outcome of [`Trainer::train`]
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LdaModel,
    pub stop_reason: StopReason,
    pub history: Vec<EmRound>,
}

impl TrainedModel {
    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }

    /// Number of completed EM rounds
    pub fn iterations(&self) -> usize {
        self.history.len()
    }
}

/// Shared flag checked once per EM round and once per document
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Variational EM trainer
#[derive(Debug, Clone)]
pub struct Trainer {
    config: LdaConfig,
    cancel: Option<CancellationFlag>,
}

impl Trainer {
    pub fn new(config: LdaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    /// Attach a flag that stops training at the next check
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, CancellationFlag::is_cancelled)
    }

    /// Fit a model to `corpus`
    pub fn train(
        &self,
        corpus: impl Into<Arc<Corpus>>,
        vocabulary: impl Into<Arc<Vocabulary>>,
    ) -> Result<TrainedModel> {
        let config = &self.config;
        let mut model = LdaModel::initialize(corpus.into(), vocabulary.into(), config)?;
        let estimator = Estimator::new(config);

        info!(
            "Training LDA: {} topics, {} documents, {} words, {} tokens",
            model.n_topics(),
            model.n_documents(),
            model.vocab_size(),
            model.corpus().total_tokens()
        );

        let mut history = Vec::new();
        let mut previous_bound: Option<f64> = None;
        let mut stop_reason = StopReason::IterationCapped;

        for iteration in 0..config.max_em_iterations {
            if self.cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }

            // E-step
            let posteriors = {
                let engine = InferenceEngine::new(model.alpha(), model.beta(), config);
                engine.infer_corpus(model.corpus(), config.parallel, self.cancel.as_ref())
            };
            let posteriors = match posteriors {
                Some(posteriors) => posteriors,
                None => {
                    stop_reason = StopReason::Cancelled;
                    break;
                }
            };

            let bound: f64 = posteriors.iter().map(|p| p.bound).sum();
            let capped_documents = posteriors
                .iter()
                .filter(|p| p.outcome == InferenceOutcome::IterationCapped)
                .count();

            // M-step, computed before anything is swapped in
            let globals = match estimator.estimate(
                model.corpus(),
                &posteriors,
                model.alpha(),
                model.vocab_size(),
            ) {
                Ok(globals) => globals,
                Err(LdaError::OptimizationFailed {
                    iteration: newton_iteration,
                    backtracks,
                }) => {
                    stop_reason = StopReason::OptimizationFailed {
                        round: iteration,
                        newton_iteration,
                        backtracks,
                    };
                    break;
                }
                Err(e) => return Err(e),
            };
            model.set_posteriors(posteriors)?;
            model.set_global_parameters(globals.alpha, globals.beta)?;

            let relative_change = previous_bound.map(|previous| {
                if previous == 0.0 {
                    (bound - previous).abs()
                } else {
                    ((previous - bound) / previous).abs()
                }
            });

            info!(
                "EM iteration {}: bound = {:.6}, relative change = {}, capped documents = {}",
                iteration,
                bound,
                relative_change.map_or_else(|| "n/a".to_string(), |c| format!("{:.3e}", c)),
                capped_documents
            );

            history.push(EmRound {
                iteration,
                bound,
                relative_change,
                capped_documents,
                newton_iterations: globals.newton.iterations,
            });

            if let Some(change) = relative_change {
                if change < config.em_convergence_tolerance {
                    stop_reason = StopReason::Converged;
                    break;
                }
            }
            previous_bound = Some(bound);
        }

        match stop_reason {
            StopReason::Converged => info!("EM converged after {} iterations", history.len()),
            StopReason::IterationCapped => warn!(
                "EM stopped at the iteration cap ({}) without converging",
                config.max_em_iterations
            ),
            StopReason::Cancelled => warn!("EM cancelled after {} iterations", history.len()),
            StopReason::OptimizationFailed {
                round,
                newton_iteration,
                backtracks,
            } => warn!(
                "EM stopped in iteration {}: alpha update left the positive orthant at Newton iteration {} after {} step halvings; keeping the previous round",
                round, newton_iteration, backtracks
            ),
        }

        Ok(TrainedModel {
            model,
            stop_reason,
            history,
        })
    }
}

/// Fit a model with `config`; shorthand for `Trainer::new(config)?.train(..)`
pub fn train(
    corpus: impl Into<Arc<Corpus>>,
    config: &LdaConfig,
    vocabulary: impl Into<Arc<Vocabulary>>,
) -> Result<TrainedModel> {
    Trainer::new(config.clone())?.train(corpus, vocabulary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Document;
    use crate::error::LdaError;
    use approx::assert_abs_diff_eq;

    fn small_corpus() -> (Corpus, Vocabulary) {
        let corpus = Corpus::new(vec![
            Document::new(vec![0, 1, 0, 1, 0]),
            Document::new(vec![2, 3, 3, 2, 3]),
            Document::new(vec![0, 1, 2, 3]),
        ]);
        let vocab = Vocabulary::new(vec!["w0".into(), "w1".into(), "w2".into(), "w3".into()]);
        (corpus, vocab)
    }

    #[test]
    fn test_iteration_cap_reported() {
        let (corpus, vocab) = small_corpus();
        let config = LdaConfig::new(2)
            .max_em_iterations(2)
            .em_convergence_tolerance(1e-300);

        let trained = train(corpus, &config, vocab).unwrap();
        assert_eq!(trained.stop_reason, StopReason::IterationCapped);
        assert_eq!(trained.iterations(), 2);
        assert!(trained.history[0].relative_change.is_none());
        assert!(trained.history[1].relative_change.is_some());
    }

    #[test]
    fn test_converges_with_loose_tolerance() {
        let (corpus, vocab) = small_corpus();
        let config = LdaConfig::new(2).max_em_iterations(100).em_convergence_tolerance(0.5);

        let trained = train(corpus, &config, vocab).unwrap();
        assert!(trained.converged());
        assert!(trained.iterations() >= 2);
        let last = trained.history.last().unwrap();
        assert!(last.relative_change.unwrap() < 0.5);
    }

    #[test]
    fn test_parameters_after_training() {
        let (corpus, vocab) = small_corpus();
        let config = LdaConfig::new(2).max_em_iterations(20);

        let trained = train(corpus, &config, vocab).unwrap();
        let model = &trained.model;

        for row in model.beta().rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
        assert!(model.alpha().iter().all(|&a| a > 0.0));
        for phi in model.phis() {
            for column in phi.columns() {
                assert_abs_diff_eq!(column.sum(), 1.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_bound_is_non_decreasing() {
        let (corpus, vocab) = small_corpus();
        let config = LdaConfig::new(2)
            .max_em_iterations(15)
            .em_convergence_tolerance(1e-300)
            .max_inference_iterations(500)
            .inference_convergence_tolerance(1e-10);

        let trained = train(corpus, &config, vocab).unwrap();
        for pair in trained.history.windows(2) {
            assert!(pair[1].bound >= pair[0].bound - 1e-4);
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let (corpus, vocab) = small_corpus();
        let base = LdaConfig::new(2).max_em_iterations(5);

        let seq = train(corpus.clone(), &base.clone().parallel(false), vocab.clone()).unwrap();
        let par = train(corpus, &base.parallel(true), vocab).unwrap();

        assert_eq!(seq.model.alpha(), par.model.alpha());
        assert_eq!(seq.model.beta(), par.model.beta());
        assert_eq!(seq.model.gammas(), par.model.gammas());
    }

    #[test]
    fn test_cancelled_before_start() {
        let (corpus, vocab) = small_corpus();
        let flag = CancellationFlag::new();
        flag.cancel();

        let trained = Trainer::new(LdaConfig::new(2))
            .unwrap()
            .with_cancellation(flag)
            .train(corpus, vocab)
            .unwrap();

        assert_eq!(trained.stop_reason, StopReason::Cancelled);
        assert_eq!(trained.iterations(), 0);
        assert!(trained.model.gammas().iter().all(|g| g.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_failed_alpha_update_keeps_last_round() {
        // Long single-word documents pull the optimal α far below the
        // starting point, where the Hessian is nearly flat; without step
        // halving the first Newton step lands below zero
        let corpus = Corpus::new(vec![
            Document::new(vec![0; 1000]),
            Document::new(vec![1; 1000]),
            Document::new(vec![0, 1]),
        ]);
        let vocab = Vocabulary::new(vec!["w0".into(), "w1".into()]);
        let config = LdaConfig::new(2)
            .initial_alpha(vec![50.0, 50.0])
            .max_backtracks(0)
            .max_em_iterations(30);

        let trained = train(corpus, &config, vocab).unwrap();
        let round = match trained.stop_reason {
            StopReason::OptimizationFailed { round, backtracks, .. } => {
                assert_eq!(backtracks, 0);
                round
            }
            other => panic!("expected a failed alpha update, got {:?}", other),
        };

        assert_eq!(trained.iterations(), round);
        assert!(!trained.converged());
        assert!(trained.model.alpha().iter().all(|&a| a > 0.0));
        for row in trained.model.beta().rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Trainer::new(LdaConfig::new(0)),
            Err(LdaError::InvalidTopicCount)
        ));
    }
}
