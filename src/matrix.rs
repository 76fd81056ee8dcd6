use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dictionary::BowCorpus;
use crate::error::{ExplorerError, Result};
use crate::topic_modeling::{SparseTopics, TopicId, TopicModel};

/// Dense documents x topics weight matrix, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTopicMatrix {
    num_documents: usize,
    num_topics: usize,
    weights: Vec<f64>,
}

impl DocumentTopicMatrix {
    pub fn zeros(num_documents: usize, num_topics: usize) -> Self {
        DocumentTopicMatrix {
            num_documents,
            num_topics,
            weights: vec![0.0; num_documents * num_topics],
        }
    }

    /// Densifies one sparse distribution per document; unmentioned topics stay 0.
    pub fn from_sparse(distributions: &[SparseTopics], num_topics: usize) -> Result<Self> {
        let mut matrix = Self::zeros(distributions.len(), num_topics);
        for (doc, topics) in distributions.iter().enumerate() {
            for &(topic, weight) in topics {
                matrix.set(doc, topic, weight)?;
            }
        }
        Ok(matrix)
    }

    /// Queries the model for every document of the corpus.
    pub fn build<M: TopicModel>(corpus: &BowCorpus, model: &M) -> Result<Self> {
        let distributions: Vec<SparseTopics> = corpus
            .documents
            .iter()
            .map(|bow| model.topic_distribution(bow))
            .collect();
        Self::from_sparse(&distributions, model.num_topics())
    }

    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn is_empty(&self) -> bool {
        self.num_documents == 0
    }

    fn check_document(&self, doc: usize) -> Result<()> {
        if doc >= self.num_documents {
            return Err(ExplorerError::IndexOutOfBounds {
                index: doc,
                max: self.num_documents,
            });
        }
        Ok(())
    }

    fn check_topic(&self, topic: TopicId) -> Result<()> {
        if topic >= self.num_topics {
            return Err(ExplorerError::IndexOutOfBounds {
                index: topic,
                max: self.num_topics,
            });
        }
        Ok(())
    }

    pub fn get(&self, doc: usize, topic: TopicId) -> Result<f64> {
        self.check_document(doc)?;
        self.check_topic(topic)?;
        Ok(self.weights[doc * self.num_topics + topic])
    }

    /// Weights must be finite and non-negative.
    pub fn set(&mut self, doc: usize, topic: TopicId, weight: f64) -> Result<()> {
        self.check_document(doc)?;
        self.check_topic(topic)?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(ExplorerError::Model(format!(
                "document {} has invalid weight {} for topic {}",
                doc, weight, topic
            )));
        }
        self.weights[doc * self.num_topics + topic] = weight;
        Ok(())
    }

    pub fn row(&self, doc: usize) -> Result<&[f64]> {
        self.check_document(doc)?;
        let start = doc * self.num_topics;
        Ok(&self.weights[start..start + self.num_topics])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        let k = self.num_topics;
        (0..self.num_documents).map(move |doc| &self.weights[doc * k..(doc + 1) * k])
    }

    pub fn column(&self, topic: TopicId) -> Result<Vec<f64>> {
        self.check_topic(topic)?;
        Ok(self.rows().map(|row| row[topic]).collect())
    }

    /// Average weight of every topic across the corpus, computed in one pass.
    pub fn column_marginals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.num_topics];
        if self.num_documents == 0 {
            return totals;
        }
        for row in self.rows() {
            for (total, weight) in totals.iter_mut().zip(row) {
                *total += weight;
            }
        }
        let n = self.num_documents as f64;
        totals.iter_mut().for_each(|total| *total /= n);
        totals
    }

    /// Document indices by descending weight for `topic`; ties keep document order.
    pub fn documents_by_topic(&self, topic: TopicId) -> Result<Vec<usize>> {
        let column = self.column(topic)?;
        let mut order: Vec<usize> = (0..self.num_documents).collect();
        order.sort_by(|&a, &b| column[b].total_cmp(&column[a]));
        Ok(order)
    }

    pub fn top_document(&self, topic: TopicId) -> Result<Option<usize>> {
        Ok(self.documents_by_topic(topic)?.first().copied())
    }

    /// Sums topic weights per year; documents without a year are skipped.
    pub fn yearly_totals(&self, years: &[Option<i32>]) -> Result<BTreeMap<i32, Vec<f64>>> {
        if years.len() != self.num_documents {
            return Err(ExplorerError::configuration(format!(
                "{} years given for {} documents",
                years.len(),
                self.num_documents
            )));
        }
        let mut totals: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for (row, year) in self.rows().zip(years) {
            let Some(year) = year else { continue };
            let sums = totals.entry(*year).or_insert_with(|| vec![0.0; self.num_topics]);
            for (sum, weight) in sums.iter_mut().zip(row) {
                *sum += weight;
            }
        }
        Ok(totals)
    }
}
