//! Documents as ordered sequences of vocabulary indices

use crate::error::{LdaError, Result};
use std::fs;
use std::path::Path;

/// One document: a word index per token occurrence, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    words: Vec<usize>,
}

impl Document {
    pub fn new(words: Vec<usize>) -> Self {
        Self { words }
    }

    /// Word indices, one per token
    pub fn words(&self) -> &[usize] {
        &self.words
    }

    /// Number of tokens (N_d)
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl From<Vec<usize>> for Document {
    fn from(words: Vec<usize>) -> Self {
        Self::new(words)
    }
}

/// Collection of documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Read a corpus file: one document per line, whitespace-separated word
    /// indices. An empty line is an empty document.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut documents = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let words = line
                .split_whitespace()
                .map(|token| {
                    token.parse::<usize>().map_err(|_| {
                        LdaError::parse(line_no + 1, format!("invalid word index '{}'", token))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            documents.push(Document::new(words));
        }
        Ok(Self::new(documents))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of documents (D)
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total token count over all documents
    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }

    /// Check that every word index is below `vocab_size`
    pub fn check_vocabulary(&self, vocab_size: usize) -> Result<()> {
        for (document, doc) in self.documents.iter().enumerate() {
            if let Some((position, &word)) =
                doc.words().iter().enumerate().find(|&(_, &w)| w >= vocab_size)
            {
                return Err(LdaError::WordOutOfRange {
                    document,
                    position,
                    word,
                    vocab_size,
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<Document> for Corpus {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corpus() {
        let corpus = Corpus::parse("0 1 1 3\n\n2 0\n").unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.documents()[0].words(), &[0, 1, 1, 3]);
        assert!(corpus.documents()[1].is_empty());
        assert_eq!(corpus.total_tokens(), 6);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = Corpus::parse("0 1\n2 x 3\n").unwrap_err();
        assert!(matches!(err, LdaError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_check_vocabulary() {
        let corpus = Corpus::new(vec![vec![0, 1].into(), vec![2, 4, 1].into()]);
        assert!(corpus.check_vocabulary(5).is_ok());
        match corpus.check_vocabulary(4) {
            Err(LdaError::WordOutOfRange {
                document, position, word, ..
            }) => {
                assert_eq!((document, position, word), (1, 1, 4));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
