//! Hyperparameters and stopping criteria for variational EM

use crate::error::{LdaError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// LDA training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdaConfig {
    /// Number of topics (K)
    pub n_topics: usize,
    /// Explicit starting concentration vector. `None` selects the seeded
    /// random initialization, normalized to sum to one.
    pub initial_alpha: Option<Vec<f64>>,
    /// Max fixed-point rounds per document in the E-step
    pub max_inference_iterations: usize,
    /// Max absolute change in gamma below which a document has converged
    pub inference_convergence_tolerance: f64,
    /// Max number of EM rounds
    pub max_em_iterations: usize,
    /// Relative change of the corpus lower bound below which EM stops
    pub em_convergence_tolerance: f64,
    /// Max Newton-Raphson iterations for the alpha update
    pub max_newton_iterations: usize,
    /// Gradient norm below which the alpha update stops
    pub newton_tolerance: f64,
    /// Max step halvings per Newton iteration
    pub max_backtracks: usize,
    /// Seed for the ChaCha8 stream used to initialize alpha and beta
    pub seed: u64,
    /// Run the E-step on the rayon thread pool
    pub parallel: bool,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            n_topics: 100,
            initial_alpha: None,
            max_inference_iterations: 20,
            inference_convergence_tolerance: 1e-6,
            max_em_iterations: 100,
            em_convergence_tolerance: 1e-4,
            max_newton_iterations: 100,
            newton_tolerance: 1e-5,
            max_backtracks: 40,
            seed: 10701,
            parallel: true,
        }
    }
}

impl LdaConfig {
    /// Create a new configuration with specified number of topics
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the explicit starting concentration vector
    pub fn initial_alpha(mut self, alpha: Vec<f64>) -> Self {
        self.initial_alpha = Some(alpha);
        self
    }

    /// Set max E-step rounds per document
    pub fn max_inference_iterations(mut self, n: usize) -> Self {
        self.max_inference_iterations = n;
        self
    }

    /// Set E-step convergence tolerance
    pub fn inference_convergence_tolerance(mut self, tol: f64) -> Self {
        self.inference_convergence_tolerance = tol;
        self
    }

    /// Set max EM rounds
    pub fn max_em_iterations(mut self, n: usize) -> Self {
        self.max_em_iterations = n;
        self
    }

    /// Set EM convergence tolerance
    pub fn em_convergence_tolerance(mut self, tol: f64) -> Self {
        self.em_convergence_tolerance = tol;
        self
    }

    /// Set max Newton-Raphson iterations
    pub fn max_newton_iterations(mut self, n: usize) -> Self {
        self.max_newton_iterations = n;
        self
    }

    /// Set Newton-Raphson gradient tolerance
    pub fn newton_tolerance(mut self, tol: f64) -> Self {
        self.newton_tolerance = tol;
        self
    }

    /// Set max step halvings
    pub fn max_backtracks(mut self, n: usize) -> Self {
        self.max_backtracks = n;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable/disable the parallel E-step
    pub fn parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }

    /// Check every invariant the trainer relies on
    pub fn validate(&self) -> Result<()> {
        if self.n_topics == 0 {
            return Err(LdaError::InvalidTopicCount);
        }
        if let Some(alpha) = &self.initial_alpha {
            if alpha.len() != self.n_topics {
                return Err(LdaError::DimensionMismatch {
                    what: "initial_alpha",
                    expected: self.n_topics,
                    found: alpha.len(),
                });
            }
            if alpha.iter().any(|&a| !(a > 0.0) || !a.is_finite()) {
                return Err(LdaError::InvalidParameter(
                    "initial_alpha entries must be finite and positive".into(),
                ));
            }
        }
        if !(self.inference_convergence_tolerance > 0.0) {
            return Err(LdaError::InvalidParameter(
                "inference_convergence_tolerance must be positive".into(),
            ));
        }
        if !(self.em_convergence_tolerance > 0.0) {
            return Err(LdaError::InvalidParameter(
                "em_convergence_tolerance must be positive".into(),
            ));
        }
        if !(self.newton_tolerance > 0.0) {
            return Err(LdaError::InvalidParameter(
                "newton_tolerance must be positive".into(),
            ));
        }
        if self.max_inference_iterations == 0 {
            return Err(LdaError::InvalidParameter(
                "max_inference_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = LdaConfig::default();
        assert_eq!(config.n_topics, 100);
        assert_eq!(config.max_inference_iterations, 20);
        assert_eq!(config.inference_convergence_tolerance, 1e-6);
        assert_eq!(config.max_em_iterations, 100);
        assert_eq!(config.em_convergence_tolerance, 1e-4);
        assert!(config.initial_alpha.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            LdaConfig::new(0).validate(),
            Err(LdaError::InvalidTopicCount)
        ));

        let wrong_len = LdaConfig::new(3).initial_alpha(vec![1.0, 1.0]);
        assert!(matches!(
            wrong_len.validate(),
            Err(LdaError::DimensionMismatch { .. })
        ));

        let non_positive = LdaConfig::new(2).initial_alpha(vec![1.0, 0.0]);
        assert!(matches!(
            non_positive.validate(),
            Err(LdaError::InvalidParameter(_))
        ));

        let bad_tol = LdaConfig::new(2).inference_convergence_tolerance(0.0);
        assert!(bad_tol.validate().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"n_topics": 4, "initial_alpha": [0.5, 0.5, 0.5, 0.5], "seed": 7}}"#)
            .unwrap();

        let config = LdaConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.n_topics, 4);
        assert_eq!(config.seed, 7);
        assert_eq!(config.initial_alpha, Some(vec![0.5; 4]));
        assert_eq!(config.max_em_iterations, 100);
    }

    #[test]
    fn test_json_invalid_alpha_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"n_topics": 3, "initial_alpha": [1.0]}}"#).unwrap();
        assert!(LdaConfig::from_json_file(file.path()).is_err());
    }
}
