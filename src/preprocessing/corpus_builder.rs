//! Tokenized text → `Vocabulary` + `Corpus`
//!
//! Terms are filtered by document frequency, optionally capped to the most
//! frequent `max_features`, then indexed alphabetically. Documents keep their
//! token order; tokens outside the fitted vocabulary are dropped.

use crate::data::{Corpus, Document, Vocabulary};
use hashbrown::{HashMap, HashSet};

/// Vocabulary selection and corpus encoding
#[derive(Debug, Clone)]
pub struct CorpusBuilder {
    /// Minimum document frequency for term inclusion
    min_df: usize,
    /// Maximum document frequency ratio for term inclusion
    max_df_ratio: f64,
    /// Maximum vocabulary size
    max_features: Option<usize>,
    vocabulary: Vocabulary,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self {
            min_df: 1,
            max_df_ratio: 1.0,
            max_features: None,
            vocabulary: Vocabulary::default(),
        }
    }

    /// Set minimum document frequency
    pub fn min_df(mut self, min_df: usize) -> Self {
        self.min_df = min_df;
        self
    }

    /// Set maximum document frequency ratio
    pub fn max_df_ratio(mut self, ratio: f64) -> Self {
        self.max_df_ratio = ratio;
        self
    }

    /// Set maximum vocabulary size
    pub fn max_features(mut self, max: usize) -> Self {
        self.max_features = Some(max);
        self
    }

    /// Select the vocabulary from tokenized documents
    pub fn fit(&mut self, tokenized_docs: &[Vec<String>]) -> &Vocabulary {
        let mut term_doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in tokenized_docs {
            let unique_terms: HashSet<&str> = doc.iter().map(|s| s.as_str()).collect();
            for term in unique_terms {
                *term_doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_df = (tokenized_docs.len() as f64 * self.max_df_ratio) as usize;
        let mut filtered_terms: Vec<(&str, usize)> = term_doc_freq
            .into_iter()
            .filter(|&(_, df)| df >= self.min_df && df <= max_df)
            .collect();

        // Most frequent first; equal frequencies in term order so the cut is stable
        filtered_terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(max) = self.max_features {
            filtered_terms.truncate(max);
        }

        let mut words: Vec<String> = filtered_terms
            .into_iter()
            .map(|(term, _)| term.to_string())
            .collect();
        words.sort();

        log::debug!("Selected {} vocabulary terms", words.len());
        self.vocabulary = Vocabulary::new(words);
        &self.vocabulary
    }

    /// Encode documents against the fitted vocabulary
    pub fn transform(&self, tokenized_docs: &[Vec<String>]) -> Corpus {
        tokenized_docs
            .iter()
            .map(|doc| {
                Document::new(
                    doc.iter()
                        .filter_map(|token| self.vocabulary.index_of(token))
                        .collect(),
                )
            })
            .collect()
    }

    /// Fit then transform; returns the vocabulary with the encoded corpus
    pub fn fit_transform(&mut self, tokenized_docs: &[Vec<String>]) -> (Vocabulary, Corpus) {
        self.fit(tokenized_docs);
        (self.vocabulary.clone(), self.transform(tokenized_docs))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

impl Default for CorpusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Vec<String>> {
        vec![
            vec!["tent", "stove", "tent"],
            vec!["stove", "lamp"],
            vec!["tent", "kayak", "paddle"],
        ]
        .into_iter()
        .map(|doc| doc.into_iter().map(String::from).collect())
        .collect()
    }

    #[test]
    fn test_fit_transform() {
        let mut builder = CorpusBuilder::new();
        let (vocab, corpus) = builder.fit_transform(&docs());

        assert_eq!(vocab.words(), &["kayak", "lamp", "paddle", "stove", "tent"]);
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.documents()[0].words(), &[4, 3, 4]);
        assert_eq!(corpus.documents()[2].words(), &[4, 0, 2]);
    }

    #[test]
    fn test_min_df_drops_rare_terms() {
        let mut builder = CorpusBuilder::new().min_df(2);
        let (vocab, corpus) = builder.fit_transform(&docs());

        assert_eq!(vocab.words(), &["stove", "tent"]);
        // Out-of-vocabulary tokens are dropped
        assert_eq!(corpus.documents()[1].words(), &[0]);
        assert_eq!(corpus.documents()[2].words(), &[1]);
    }

    #[test]
    fn test_max_features_ties_are_stable() {
        let mut builder = CorpusBuilder::new().max_features(3);
        let vocab = builder.fit(&docs()).clone();

        // tent (2), stove (2), then the alphabetically first df-1 term
        assert_eq!(vocab.words(), &["kayak", "stove", "tent"]);
    }

    #[test]
    fn test_max_df_ratio() {
        let mut builder = CorpusBuilder::new().max_df_ratio(0.5);
        let vocab = builder.fit(&docs()).clone();
        assert!(vocab.index_of("tent").is_none());
        assert!(vocab.index_of("lamp").is_some());
    }
}
