use std::collections::HashMap;

use counter::Counter;
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::text::{tokenize, Stopwords};

pub type TokenId = usize;

/// Bijection between the distinct tokens of a corpus and dense ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    token_to_id: HashMap<String, TokenId>,
    id_to_token: Vec<String>,
}

impl Dictionary {
    /// Ids are assigned in order of first appearance across the documents.
    pub fn build(documents: &[Vec<String>]) -> Self {
        let mut dictionary = Dictionary::default();
        for tokens in documents {
            dictionary.add_document(tokens);
        }
        dictionary
    }

    fn add_document(&mut self, tokens: &[String]) {
        for token in tokens {
            if !self.token_to_id.contains_key(token.as_str()) {
                self.token_to_id.insert(token.clone(), self.id_to_token.len());
                self.id_to_token.push(token.clone());
            }
        }
    }

    pub fn id(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    pub fn tokens(&self) -> &[String] {
        &self.id_to_token
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Tokens unknown to the dictionary are dropped.
    pub fn doc2bow(&self, tokens: &[String]) -> BagOfWords {
        let counts: Counter<TokenId> = tokens.iter().filter_map(|t| self.id(t)).collect();
        let mut pairs: Vec<(TokenId, usize)> = counts.into_iter().collect();
        pairs.sort_unstable_by_key(|&(id, _)| id);
        BagOfWords(pairs)
    }
}

/// Sparse `(token id, count)` pairs of one document, unique ids in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagOfWords(Vec<(TokenId, usize)>);

impl BagOfWords {
    pub fn from_pairs(mut pairs: Vec<(TokenId, usize)>) -> Self {
        pairs.sort_unstable_by_key(|&(id, _)| id);
        pairs.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
        BagOfWords(pairs)
    }

    pub fn entries(&self) -> &[(TokenId, usize)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of tokens in the document, counting repeats.
    pub fn total_count(&self) -> usize {
        self.0.iter().map(|&(_, count)| count).sum()
    }
}

/// A corpus in bag-of-words form together with the dictionary that produced it.
#[derive(Debug, Clone, Default)]
pub struct BowCorpus {
    pub dictionary: Dictionary,
    pub documents: Vec<BagOfWords>,
}

impl BowCorpus {
    pub fn build(corpus: &Corpus, stopwords: &Stopwords) -> Self {
        let tokens: Vec<Vec<String>> = corpus
            .contents()
            .map(|content| tokenize(content, stopwords))
            .collect();
        let dictionary = Dictionary::build(&tokens);
        let documents = tokens.iter().map(|doc| dictionary.doc2bow(doc)).collect();

        log::debug!(
            "Built dictionary of {} tokens over {} documents",
            dictionary.len(),
            tokens.len()
        );
        BowCorpus { dictionary, documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn average_document_length(&self) -> f64 {
        if self.documents.is_empty() {
            return 0.0;
        }
        let total: usize = self.documents.iter().map(BagOfWords::total_count).sum();
        total as f64 / self.documents.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_ids_follow_first_appearance() {
        let dictionary = Dictionary::build(&[tokens("beta alpha beta"), tokens("gamma alpha")]);
        assert_eq!(dictionary.id("beta"), Some(0));
        assert_eq!(dictionary.id("alpha"), Some(1));
        assert_eq!(dictionary.id("gamma"), Some(2));
        assert_eq!(dictionary.tokens()[2], "gamma");
        assert_eq!(dictionary.len(), 3);
    }

    #[test]
    fn test_doc2bow_counts_and_sorts() {
        let dictionary = Dictionary::build(&[tokens("a b c")]);
        let bow = dictionary.doc2bow(&tokens("c a c unknown c"));
        assert_eq!(bow.entries(), &[(0, 1), (2, 3)]);
        assert_eq!(bow.total_count(), 4);
    }

    #[test]
    fn test_from_pairs_merges_duplicates() {
        let bow = BagOfWords::from_pairs(vec![(3, 1), (1, 2), (3, 4)]);
        assert_eq!(bow.entries(), &[(1, 2), (3, 5)]);
    }

    #[test]
    fn test_bow_corpus_applies_stopwords() {
        let corpus = Corpus::new(vec![
            Document::new("1", "The cats chase the mice", None),
            Document::new("2", "Mice run", None),
        ]);
        let bow = BowCorpus::build(&corpus, &Stopwords::english());
        assert_eq!(bow.dictionary.len(), 4);
        assert!(bow.dictionary.id("the").is_none());
        assert_eq!(bow.len(), 2);
        assert!((bow.average_document_length() - 2.5).abs() < 1e-12);
    }
}
