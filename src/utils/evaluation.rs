//! Evaluation metrics for fitted topic models

use crate::data::Corpus;
use crate::models::model::LdaModel;
use hashbrown::HashSet;
use ndarray::{Array2, ArrayView1};

/// `KL(p ‖ q) = Σ_i p_i ln(p_i / q_i)` for two distributions over the same
/// support. Terms with `p_i = 0` contribute nothing; `q_i = 0` with
/// `p_i > 0` makes the divergence infinite.
pub fn kl_divergence(p: ArrayView1<f64>, q: ArrayView1<f64>) -> f64 {
    p.iter()
        .zip(q.iter())
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| {
            if qi > 0.0 {
                pi * (pi / qi).ln()
            } else {
                f64::INFINITY
            }
        })
        .sum()
}

/// Pairwise `KL(β_i ‖ β_j)` over the rows of a topic-word matrix
pub fn topic_divergence_matrix(beta: &Array2<f64>) -> Array2<f64> {
    let n = beta.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| kl_divergence(beta.row(i), beta.row(j)))
}

/// Co-occurrence based metrics over a training corpus
pub struct Evaluator {
    /// Distinct words of every document
    document_words: Vec<HashSet<usize>>,
}

impl Evaluator {
    pub fn new(corpus: &Corpus) -> Self {
        let document_words = corpus
            .documents()
            .iter()
            .map(|doc| doc.words().iter().copied().collect())
            .collect();
        Self { document_words }
    }

    fn document_frequency(&self, word: usize) -> usize {
        self.document_words
            .iter()
            .filter(|words| words.contains(&word))
            .count()
    }

    fn co_document_frequency(&self, w1: usize, w2: usize) -> usize {
        self.document_words
            .iter()
            .filter(|words| words.contains(&w1) && words.contains(&w2))
            .count()
    }

    /// UMass coherence of a topic given its top words (vocabulary indices,
    /// heaviest first).
    ///
    /// Averages `ln((D(w_i, w_j) + 1) / D(w_j))` over pairs where `w_j`
    /// ranks above `w_i`. Higher (less negative) is more coherent. `None`
    /// for fewer than two words or when no pair has a word that occurs.
    pub fn umass_coherence(&self, top_words: &[usize]) -> Option<f64> {
        if top_words.len() < 2 {
            return None;
        }

        let mut coherence = 0.0;
        let mut pair_count = 0;

        for (i, &w_i) in top_words.iter().enumerate().skip(1) {
            for &w_j in &top_words[..i] {
                let d_j = self.document_frequency(w_j);
                if d_j == 0 {
                    continue;
                }
                let d_ij = self.co_document_frequency(w_i, w_j) as f64;
                coherence += ((d_ij + 1.0) / d_j as f64).ln();
                pair_count += 1;
            }
        }

        if pair_count > 0 {
            Some(coherence / pair_count as f64)
        } else {
            None
        }
    }
}

/// Share of distinct words among all top words. 1.0 means no topic shares
/// a top word with another.
pub fn topic_diversity(topics: &[Vec<String>]) -> f64 {
    let all_words: Vec<&str> = topics.iter().flatten().map(|s| s.as_str()).collect();
    if all_words.is_empty() {
        return 0.0;
    }

    let unique_words: HashSet<&str> = all_words.iter().copied().collect();
    unique_words.len() as f64 / all_words.len() as f64
}

/// Jaccard similarity between the top-word sets of two topics
pub fn topic_overlap(topic1: &[String], topic2: &[String]) -> f64 {
    let set1: HashSet<&str> = topic1.iter().map(|s| s.as_str()).collect();
    let set2: HashSet<&str> = topic2.iter().map(|s| s.as_str()).collect();

    let union = set1.union(&set2).count();
    if union == 0 {
        return 0.0;
    }

    set1.intersection(&set2).count() as f64 / union as f64
}

/// Summary statistics for a fitted model
#[derive(Debug, Clone)]
pub struct ModelSummary {
    pub n_topics: usize,
    pub n_documents: usize,
    pub vocab_size: usize,
    /// Corpus variational lower bound
    pub lower_bound: f64,
    pub perplexity: f64,
    /// Average coherence over topics that have one
    pub avg_coherence: Option<f64>,
    pub diversity: f64,
    /// Smallest pairwise KL divergence between distinct topics
    pub min_topic_divergence: Option<f64>,
    /// Largest Jaccard overlap between the top words of two topics
    pub max_topic_overlap: Option<f64>,
    pub topic_coherences: Vec<Option<f64>>,
}

impl ModelSummary {
    /// Summarize `model`, judging topics by their `n_words` top words
    pub fn from_model(model: &LdaModel, n_words: usize) -> Self {
        let evaluator = Evaluator::new(model.corpus());

        let top_indices: Vec<Vec<usize>> = model
            .beta()
            .rows()
            .into_iter()
            .map(|row| crate::models::topics::top_k_indices(row, n_words))
            .collect();
        let top_words: Vec<Vec<String>> = model
            .top_topic_words(n_words)
            .into_iter()
            .map(|words| words.into_iter().map(|(word, _)| word).collect())
            .collect();

        let topic_coherences: Vec<Option<f64>> = top_indices
            .iter()
            .map(|words| evaluator.umass_coherence(words))
            .collect();
        let coherence_values: Vec<f64> = topic_coherences.iter().filter_map(|&c| c).collect();
        let avg_coherence = if coherence_values.is_empty() {
            None
        } else {
            Some(coherence_values.iter().sum::<f64>() / coherence_values.len() as f64)
        };

        let divergences = topic_divergence_matrix(model.beta());
        let min_topic_divergence = divergences
            .indexed_iter()
            .filter(|((i, j), _)| i != j)
            .map(|(_, &d)| d)
            .min_by(|a, b| a.total_cmp(b));

        let max_topic_overlap = top_words
            .iter()
            .enumerate()
            .flat_map(|(i, a)| top_words[i + 1..].iter().map(move |b| topic_overlap(a, b)))
            .max_by(|a, b| a.total_cmp(b));

        Self {
            n_topics: model.n_topics(),
            n_documents: model.n_documents(),
            vocab_size: model.vocab_size(),
            lower_bound: model.lower_bound(),
            perplexity: model.perplexity(),
            avg_coherence,
            diversity: topic_diversity(&top_words),
            min_topic_divergence,
            max_topic_overlap,
            topic_coherences,
        }
    }

    /// Print summary to console
    pub fn print(&self) {
        println!("=== Topic Model Summary ===");
        println!("Number of topics: {}", self.n_topics);
        println!("Documents: {}, vocabulary: {}", self.n_documents, self.vocab_size);
        println!("Lower bound: {:.4}", self.lower_bound);
        println!("Perplexity: {:.2}", self.perplexity);

        if let Some(coh) = self.avg_coherence {
            println!("Average coherence: {:.4}", coh);
        }
        println!("Topic diversity: {:.4}", self.diversity);
        if let Some(kl) = self.min_topic_divergence {
            println!("Closest topic pair KL: {:.4}", kl);
        }
        if let Some(overlap) = self.max_topic_overlap {
            println!("Largest top-word overlap: {:.4}", overlap);
        }

        println!("\nPer-topic coherence:");
        for (i, coh) in self.topic_coherences.iter().enumerate() {
            match coh {
                Some(c) => println!("  Topic {}: {:.4}", i, c),
                None => println!("  Topic {}: N/A", i),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_kl_divergence() {
        let p = array![0.5, 0.5];
        let q = array![0.9, 0.1];
        assert_eq!(kl_divergence(p.view(), p.view()), 0.0);

        let expected = 0.5 * (0.5f64 / 0.9).ln() + 0.5 * (0.5f64 / 0.1).ln();
        assert_abs_diff_eq!(kl_divergence(p.view(), q.view()), expected, epsilon = 1e-12);
        assert!(kl_divergence(p.view(), q.view()) > 0.0);
    }

    #[test]
    fn test_kl_divergence_zero_support() {
        let p = array![0.0, 1.0];
        let q = array![1.0, 0.0];
        assert_eq!(kl_divergence(p.view(), q.view()), f64::INFINITY);
        // p_i = 0 terms are skipped
        assert_eq!(kl_divergence(q.view(), array![1.0, 0.0].view()), 0.0);
    }

    #[test]
    fn test_divergence_matrix_diagonal() {
        let beta = array![[0.7, 0.3], [0.2, 0.8]];
        let matrix = topic_divergence_matrix(&beta);
        assert_eq!(matrix[[0, 0]], 0.0);
        assert_eq!(matrix[[1, 1]], 0.0);
        assert!(matrix[[0, 1]] > 0.0);
    }

    #[test]
    fn test_topic_diversity() {
        let topics = vec![
            vec!["rate".to_string(), "bond".to_string()],
            vec!["equity".to_string(), "dividend".to_string()],
        ];
        assert_eq!(topic_diversity(&topics), 1.0);

        let overlapping = vec![
            vec!["rate".to_string(), "bond".to_string()],
            vec!["rate".to_string(), "equity".to_string()],
        ];
        assert_eq!(topic_diversity(&overlapping), 0.75);
        assert_eq!(topic_diversity(&[]), 0.0);
    }

    #[test]
    fn test_topic_overlap() {
        let topic1 = vec!["rate".to_string(), "bond".to_string()];
        let topic2 = vec!["rate".to_string(), "equity".to_string()];
        assert_abs_diff_eq!(topic_overlap(&topic1, &topic2), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_umass_coherence() {
        let corpus = Corpus::new(vec![
            vec![0, 1].into(),
            vec![0, 1, 1].into(),
            vec![2].into(),
            vec![2, 2].into(),
        ]);
        let evaluator = Evaluator::new(&corpus);

        // Words 0 and 1 always co-occur: ln((2 + 1) / 2)
        let together = evaluator.umass_coherence(&[0, 1]).unwrap();
        assert_abs_diff_eq!(together, (3.0f64 / 2.0).ln(), epsilon = 1e-12);

        // Words 0 and 2 never co-occur: ln(1 / 2)
        let apart = evaluator.umass_coherence(&[0, 2]).unwrap();
        assert!(apart < together);

        assert!(evaluator.umass_coherence(&[0]).is_none());
        assert!(evaluator.umass_coherence(&[7, 8]).is_none());
    }
}
