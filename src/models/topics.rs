//! Human-readable topic views
//!
//! Top words are selected with a bounded min-heap instead of sorting every
//! row; ties on weight go to the lowest vocabulary index.

use crate::models::model::LdaModel;
use ndarray::ArrayView1;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Topic representation with words and weights
#[derive(Debug, Clone)]
pub struct TopicSummary {
    /// Topic index
    pub index: usize,
    /// Top words with their β weights, heaviest first
    pub top_words: Vec<(String, f64)>,
    /// Mean share of the topic across documents
    pub prevalence: f64,
}

/// Heap entry ordered by weight, then by *descending* index so that the
/// lower index ranks higher on equal weights.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    weight: f64,
    index: usize,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Indices of the `k` largest entries of `weights`, heaviest first.
///
/// Returns `min(k, weights.len())` indices; equal weights are ordered by
/// ascending index.
pub fn top_k_indices(weights: ArrayView1<f64>, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for (index, &weight) in weights.iter().enumerate() {
        let entry = Ranked { weight, index };
        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(smallest)) = heap.peek() {
            if entry > *smallest {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }

    // Ascending order of Reverse<_> is descending order of Ranked
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(entry)| entry.index)
        .collect()
}

impl LdaModel {
    /// The `k` heaviest words of every topic as `(word, β weight)` pairs
    pub fn top_topic_words(&self, k: usize) -> Vec<Vec<(String, f64)>> {
        self.beta()
            .rows()
            .into_iter()
            .map(|row| {
                top_k_indices(row, k)
                    .into_iter()
                    .filter_map(|index| {
                        self.vocabulary()
                            .word(index)
                            .map(|word| (word.to_string(), row[index]))
                    })
                    .collect()
            })
            .collect()
    }

    /// Topic summaries with `n_words` top words each.
    ///
    /// Prevalence is the topic's share of the normalized γ averaged over the
    /// documents; it is zero everywhere before posteriors are computed.
    pub fn topics(&self, n_words: usize) -> Vec<TopicSummary> {
        let n_documents = self.n_documents().max(1) as f64;
        let mut prevalence = vec![0.0; self.n_topics()];
        for document in 0..self.n_documents() {
            for (total, share) in prevalence.iter_mut().zip(self.topic_estimate(document).iter()) {
                *total += share;
            }
        }

        self.top_topic_words(n_words)
            .into_iter()
            .zip(prevalence)
            .enumerate()
            .map(|(index, (top_words, total))| TopicSummary {
                index,
                top_words,
                prevalence: total / n_documents,
            })
            .collect()
    }
}

impl std::fmt::Display for TopicSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Topic {}: (prevalence: {:.2}%) [",
            self.index,
            self.prevalence * 100.0
        )?;
        for (i, (word, weight)) in self.top_words.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.3}", word, weight)?;
        }
        write!(f, "]")
    }
}
