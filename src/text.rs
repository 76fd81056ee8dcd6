use std::collections::HashSet;
use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

/// English stopwords, one per line. Contraction fragments (`don`, `ll`) are listed
/// because tokens are split on apostrophes.
const ENGLISH_STOPWORDS: &str = include_str!("stopwords-en.txt");

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("static pattern"))
}

/// Stopwords removed from every document before the dictionary is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn english() -> Self {
        Self::from_lines(ENGLISH_STOPWORDS)
    }

    /// English stopwords extended with user-defined ones, given one per line.
    pub fn english_with(user_defined: &str) -> Self {
        let mut stopwords = Self::english();
        stopwords.extend_from_lines(user_defined);
        stopwords
    }

    pub fn from_lines(text: &str) -> Self {
        let mut stopwords = Self::empty();
        stopwords.extend_from_lines(text);
        stopwords
    }

    pub fn extend_from_lines(&mut self, text: &str) {
        self.words.extend(
            text.lines()
                .map(|line| line.trim().to_lowercase())
                .filter(|line| !line.is_empty()),
        );
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Sorted list, used both for downloads and for cache keys.
    pub fn sorted(&self) -> Vec<&str> {
        let mut words: Vec<&str> = self.words.iter().map(String::as_str).collect();
        words.sort_unstable();
        words
    }

    pub fn to_text(&self) -> String {
        self.sorted().join("\n")
    }
}

/// Replace every run of characters outside `[A-Za-z0-9]` by a single space.
pub fn strip_non_alphanumeric(text: &str) -> String {
    non_alphanumeric().replace_all(text, " ").into_owned()
}

/// Lowercased, stopword-filtered tokens of a document.
pub fn tokenize(text: &str, stopwords: &Stopwords) -> Vec<String> {
    strip_non_alphanumeric(text)
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !stopwords.contains(word))
        .map(|word| word.to_string())
        .collect()
}

/// Sentences split on the literal `". "`. Abbreviations and decimals mis-split.
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(". ")
}

/// Deduplicated word set of one sentence, in order of first occurrence.
pub fn sentence_words(sentence: &str, stopwords: &Stopwords) -> IndexSet<String> {
    tokenize(sentence, stopwords).into_iter().collect()
}
