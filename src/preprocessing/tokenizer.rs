//! Text tokenization and cleaning
//!
//! Turns raw text into lowercase word tokens:
//! - URL, e-mail and HTML removal
//! - Unicode word segmentation
//! - Stop word and length filtering

use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

fn builtin(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

/// Regexes applied on every `clean` call, compiled once per tokenizer
#[derive(Debug, Clone)]
struct CleaningPatterns {
    url: Regex,
    email: Regex,
    html: Regex,
    special: Regex,
    number: Regex,
    whitespace: Regex,
}

impl CleaningPatterns {
    fn new() -> Self {
        Self {
            url: builtin(r"https?://\S+"),
            email: builtin(r"\S+@\S+\.\S+"),
            html: builtin(r"<[^>]+>"),
            special: builtin(r"[^\w\s]"),
            number: builtin(r"\b\d+\b"),
            whitespace: builtin(r"\s+"),
        }
    }
}

/// Tokenizer configuration and functionality
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// Stop words to filter out
    stop_words: HashSet<String>,
    /// Minimum token length
    min_length: usize,
    /// Maximum token length
    max_length: usize,
    lowercase: bool,
    remove_numbers: bool,
    /// Custom patterns to remove
    remove_patterns: Vec<Regex>,
    patterns: CleaningPatterns,
}

impl Tokenizer {
    /// Create a new tokenizer with default English stop words
    pub fn new() -> Self {
        Self {
            stop_words: default_stop_words(),
            min_length: 2,
            max_length: 50,
            lowercase: true,
            remove_numbers: true,
            remove_patterns: vec![],
            patterns: CleaningPatterns::new(),
        }
    }

    /// Tokenizer for movie plot summaries: drops narration words that show
    /// up in nearly every synopsis and say nothing about the genre
    pub fn for_plot_summaries() -> Self {
        let mut tokenizer = Self::new().min_length(3);
        tokenizer.add_stop_words(&[
            "film", "films", "movie", "movies", "story", "plot", "character", "characters",
            "scene", "scenes", "later", "eventually", "finally", "begins", "becomes", "meanwhile",
            "however", "named", "soon", "back", "tells", "takes", "find", "finds", "one", "two",
            "meets", "decides", "must", "gets",
        ]);
        tokenizer
    }

    /// Add custom stop words
    pub fn add_stop_words(&mut self, words: &[&str]) {
        for word in words {
            self.stop_words.insert(word.to_lowercase());
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    /// Set minimum token length
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Set maximum token length
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    pub fn lowercase(mut self, enable: bool) -> Self {
        self.lowercase = enable;
        self
    }

    pub fn remove_numbers(mut self, enable: bool) -> Self {
        self.remove_numbers = enable;
        self
    }

    /// Add a pattern to remove from text
    pub fn add_remove_pattern(&mut self, pattern: &str) -> Result<(), regex::Error> {
        self.remove_patterns.push(Regex::new(pattern)?);
        Ok(())
    }

    /// Clean and normalize text
    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_string();

        for pattern in &self.remove_patterns {
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }

        let p = &self.patterns;
        cleaned = p.url.replace_all(&cleaned, " ").into_owned();
        cleaned = p.email.replace_all(&cleaned, " ").into_owned();
        cleaned = p.html.replace_all(&cleaned, " ").into_owned();
        cleaned = p.special.replace_all(&cleaned, " ").into_owned();

        if self.remove_numbers {
            cleaned = p.number.replace_all(&cleaned, " ").into_owned();
        }

        if self.lowercase {
            cleaned = cleaned.to_lowercase();
        }

        p.whitespace.replace_all(&cleaned, " ").trim().to_string()
    }

    /// Tokenize text into words
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.clean(text)
            .unicode_words()
            .filter(|word| {
                let len = word.chars().count();
                len >= self.min_length && len <= self.max_length && !self.is_stop_word(word)
            })
            .map(|s| s.to_string())
            .collect()
    }

    /// Tokenize multiple documents
    pub fn tokenize_documents<S: AsRef<str>>(&self, documents: &[S]) -> Vec<Vec<String>> {
        documents.iter().map(|doc| self.tokenize(doc.as_ref())).collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Default English stop words
fn default_stop_words() -> HashSet<String> {
    let words = [
        // Articles
        "a", "an", "the",
        // Pronouns
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those",
        // Verbs
        "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
        "do", "does", "did", "doing", "would", "should", "could", "ought", "might", "must",
        "shall", "will", "can", "may",
        // Prepositions
        "at", "by", "for", "from", "in", "into", "of", "on", "to", "with", "about", "against",
        "between", "during", "before", "after", "above", "below", "up", "down", "out", "off",
        "over", "under", "again", "further", "then", "once",
        // Conjunctions
        "and", "but", "or", "nor", "so", "yet", "both", "either", "neither", "not", "only",
        "than", "when", "where", "while", "if", "because", "as", "until", "although",
        // Other common words
        "here", "there", "all", "each", "few", "more", "most", "other", "some", "such", "no",
        "any", "own", "same", "too", "very", "just", "also", "now", "how", "why", "well",
    ];

    words.iter().map(|s| s.to_string()).collect()
}
