//! Word ↔ index mapping

use crate::error::{LdaError, Result};
use hashbrown::HashMap;
use std::fs;
use std::path::Path;

/// Ordered list of words; a word's index is its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from words in index order.
    ///
    /// Duplicate words keep their first index for lookups.
    pub fn new(words: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            index.entry(word.clone()).or_insert(i);
        }
        Self { words, index }
    }

    /// Read a vocabulary file: one word per line, index = line position.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse vocabulary text. Blank lines are rejected because they would
    /// silently shift every following index.
    pub fn parse(text: &str) -> Result<Self> {
        let mut words = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let word = line.trim();
            if word.is_empty() {
                return Err(LdaError::parse(line_no + 1, "empty vocabulary entry"));
            }
            words.push(word.to_string());
        }
        Ok(Self::new(words))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `index`
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Index of `word`
    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}
