//! Latent Dirichlet Allocation fitted by variational EM
//!
//! - `model`: parameter container (α, β, γ, φ) and queries
//! - `inference`: E-step, per-document fixed-point iteration
//! - `estimator`: M-step, β accumulation and Newton-Raphson for α
//! - `trainer`: EM driver
//! - `topics`: top words and topic summaries

pub mod estimator;
pub mod inference;
pub mod model;
pub mod topics;
pub mod trainer;

pub use estimator::{Estimator, GlobalParameters, NewtonReport};
pub use inference::{DocumentPosterior, InferenceEngine, InferenceOutcome};
pub use model::LdaModel;
pub use topics::TopicSummary;
pub use trainer::{train, CancellationFlag, EmRound, StopReason, TrainedModel, Trainer};
