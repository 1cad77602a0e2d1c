//! Corpus-side data model
//!
//! - `Vocabulary`: word ↔ index
//! - `Document` / `Corpus`: token sequences of word indices
//! - `IdMap`: external document ids resolved to corpus positions

pub mod corpus;
pub mod id_map;
pub mod vocabulary;

pub use corpus::{Corpus, Document};
pub use id_map::IdMap;
pub use vocabulary::Vocabulary;
