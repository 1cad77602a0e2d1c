//! Text preprocessing module
//!
//! Tokenization and cleaning of raw text, and encoding of token lists into
//! a `Vocabulary` and `Corpus` for training.

pub mod corpus_builder;
pub mod tokenizer;

pub use corpus_builder::CorpusBuilder;
pub use tokenizer::Tokenizer;
