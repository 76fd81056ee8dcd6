use std::fmt::Write;

use indexmap::IndexSet;
use serde::Serialize;

use crate::corpus::Corpus;
use crate::error::{ExplorerError, Result};
use crate::matrix::DocumentTopicMatrix;
use crate::text::{sentence_words, sentences, Stopwords};
use crate::topic_modeling::TopicId;

/// Symmetric co-occurrence counts between `size` entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCounts {
    size: usize,
    counts: Vec<usize>, // Only cells with row < column are used
}

impl PairCounts {
    pub fn new(size: usize) -> Self {
        PairCounts {
            size,
            counts: vec![0; size * size],
        }
    }

    fn cell(&self, a: usize, b: usize) -> usize {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        low * self.size + high
    }

    pub fn increment(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let cell = self.cell(a, b);
        self.counts[cell] += 1;
    }

    pub fn count(&self, a: usize, b: usize) -> usize {
        if a == b || a >= self.size || b >= self.size {
            return 0;
        }
        self.counts[self.cell(a, b)]
    }

    /// Unordered pairs `(a, b)` with `a < b` and a count of at least `min_count`.
    pub fn pairs_at_least(&self, min_count: usize) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        (0..self.size).flat_map(move |a| {
            (a + 1..self.size).filter_map(move |b| {
                let count = self.counts[a * self.size + b];
                (count >= min_count).then_some((a, b, count))
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<T> {
    pub source: T,
    pub target: T,
    pub count: usize,
    pub thickness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicNode {
    pub topic: TopicId,
    pub weight: f64, // Average weight of the topic across the corpus
    pub size: f64,   // Proportional to the square root of the weight, so area tracks weight
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicCooccurrenceGraph {
    pub nodes: Vec<TopicNode>,
    pub edges: Vec<Edge<TopicId>>,
}

impl TopicCooccurrenceGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn edge(&self, a: TopicId, b: TopicId) -> Option<&Edge<TopicId>> {
        self.edges
            .iter()
            .find(|e| (e.source, e.target) == (a, b) || (e.source, e.target) == (b, a))
    }

    /// Graphviz source with one fixed-size circle per topic.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("graph {\n    node [shape=circle, fixedsize=true];\n");
        for node in &self.nodes {
            let _ = writeln!(dot, "    \"{}\" [width=\"{:.4}\"];", node.topic, node.size);
        }
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "    \"{}\" -- \"{}\" [penwidth=\"{}\"];",
                edge.source, edge.target, edge.thickness
            );
        }
        dot.push_str("}\n");
        dot
    }
}

/// Topics co-occur in a document when both reach `min_weight` there.
#[derive(Debug, Clone, Copy)]
pub struct TopicCooccurrence {
    min_weight: f64,
    min_edges: usize,
}

impl TopicCooccurrence {
    pub fn new(min_weight: f64, min_edges: usize) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_weight) {
            return Err(ExplorerError::configuration(format!(
                "minimum weight must lie in [0, 1], got {}",
                min_weight
            )));
        }
        if min_edges < 1 {
            return Err(ExplorerError::configuration("minimum number of edges must be at least 1"));
        }
        Ok(TopicCooccurrence { min_weight, min_edges })
    }

    pub fn qualifying_topics(&self, row: &[f64]) -> Vec<TopicId> {
        row.iter()
            .enumerate()
            .filter(|&(_, &weight)| weight >= self.min_weight)
            .map(|(topic, _)| topic)
            .collect()
    }

    /// Each pair of qualifying topics counts once per document.
    pub fn count_pairs(&self, matrix: &DocumentTopicMatrix) -> PairCounts {
        let mut counts = PairCounts::new(matrix.num_topics());
        for row in matrix.rows() {
            let topics = self.qualifying_topics(row);
            for (i, &a) in topics.iter().enumerate() {
                for &b in &topics[i + 1..] {
                    counts.increment(a, b);
                }
            }
        }
        counts
    }

    pub fn graph(&self, matrix: &DocumentTopicMatrix) -> TopicCooccurrenceGraph {
        if matrix.is_empty() {
            return TopicCooccurrenceGraph::default();
        }

        let nodes = matrix
            .column_marginals()
            .into_iter()
            .enumerate()
            .map(|(topic, weight)| TopicNode {
                topic,
                weight,
                size: 2.0 * weight.sqrt(),
            })
            .collect();

        let edges = self
            .count_pairs(matrix)
            .pairs_at_least(self.min_edges)
            .map(|(source, target, count)| Edge {
                source,
                target,
                count,
                thickness: count as f64,
            })
            .collect();

        TopicCooccurrenceGraph { nodes, edges }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordCooccurrenceGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge<String>>,
}

impl KeywordCooccurrenceGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&Edge<String>> {
        self.edges.iter().find(|e| {
            (e.source == a && e.target == b) || (e.source == b && e.target == a)
        })
    }

    pub fn to_dot(&self) -> String {
        let mut dot = String::from("graph {\n    node [shape=plaintext];\n");
        for node in &self.nodes {
            let _ = writeln!(dot, "    {};", quote(node));
        }
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "    {} -- {} [penwidth=\"{:.4}\"];",
                quote(&edge.source),
                quote(&edge.target),
                edge.thickness
            );
        }
        dot.push_str("}\n");
        dot
    }
}

fn quote(label: &str) -> String {
    format!("\"{}\"", label.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Words co-occur when they share a sentence of a single document.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCooccurrence<'a> {
    stopwords: &'a Stopwords,
    min_edges: usize,
}

impl<'a> KeywordCooccurrence<'a> {
    pub fn new(stopwords: &'a Stopwords, min_edges: usize) -> Result<Self> {
        if min_edges < 1 {
            return Err(ExplorerError::configuration("minimum number of edges must be at least 1"));
        }
        Ok(KeywordCooccurrence { stopwords, min_edges })
    }

    pub fn sentence_word_sets(&self, text: &str) -> Vec<IndexSet<String>> {
        sentences(text)
            .map(|sentence| sentence_words(sentence, self.stopwords))
            .collect()
    }

    pub fn graph(&self, text: &str) -> KeywordCooccurrenceGraph {
        let sentence_sets = self.sentence_word_sets(text);

        // Dense word index in order of first appearance
        let index: IndexSet<&str> = sentence_sets
            .iter()
            .flat_map(|words| words.iter().map(String::as_str))
            .collect();

        let mut counts = PairCounts::new(index.len());
        for words in &sentence_sets {
            let ids: Vec<usize> = words.iter().filter_map(|w| index.get_index_of(w.as_str())).collect();
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    counts.increment(a, b);
                }
            }
        }

        let mut connected = vec![false; index.len()];
        let mut edges = Vec::new();
        for (a, b, count) in counts.pairs_at_least(self.min_edges) {
            connected[a] = true;
            connected[b] = true;
            edges.push(Edge {
                source: index[a].to_string(),
                target: index[b].to_string(),
                count,
                thickness: (count as f64).sqrt(),
            });
        }

        let nodes = index
            .iter()
            .zip(&connected)
            .filter(|&(_, &keep)| keep)
            .map(|(word, _)| word.to_string())
            .collect();

        KeywordCooccurrenceGraph { nodes, edges }
    }

    /// Keyword graph of the document that weighs highest on `topic`.
    pub fn graph_for_topic(
        &self,
        corpus: &Corpus,
        matrix: &DocumentTopicMatrix,
        topic: TopicId,
    ) -> Result<KeywordCooccurrenceGraph> {
        if corpus.is_empty() || matrix.is_empty() {
            return Ok(KeywordCooccurrenceGraph::default());
        }
        let Some(doc) = matrix.top_document(topic)? else {
            return Ok(KeywordCooccurrenceGraph::default());
        };
        // A topic that no document carries has no top document.
        if matrix.get(doc, topic)? <= 0.0 {
            log::info!("No document carries topic {}", topic);
            return Ok(KeywordCooccurrenceGraph::default());
        }
        let document = corpus.document(doc)?;
        log::info!("Keyword co-occurrences of topic {} in document {:?}", topic, document.name);
        Ok(self.graph(&document.content))
    }
}
