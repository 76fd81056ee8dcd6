//! Exploratory analysis of topic models fitted over a text corpus.
//!
//! A corpus table is turned into bags of words, a topic model is fitted, and
//! the analyzers derive views from it: the document-topic matrix, topic and
//! keyword co-occurrence graphs, topic trends and topic stability across
//! repeated fits.

pub mod alignment;
pub mod assignment;
pub mod cache;
pub mod config;
pub mod cooccurrence;
pub mod corpus;
pub mod dictionary;
pub mod error;
pub mod matrix;
pub mod report;
pub mod text;
pub mod topic_modeling;

pub use alignment::{AlignmentReport, TopicAlignment};
pub use cache::{CorpusCache, PreparedCorpus};
pub use config::ExplorerConfig;
pub use cooccurrence::{KeywordCooccurrence, KeywordCooccurrenceGraph, TopicCooccurrence, TopicCooccurrenceGraph};
pub use corpus::{Corpus, Document};
pub use dictionary::{BagOfWords, BowCorpus, Dictionary};
pub use error::{ExplorerError, Result};
pub use matrix::DocumentTopicMatrix;
pub use text::Stopwords;
pub use topic_modeling::{GibbsLda, LdaConfig, LdaModel, SparseTopics, TopicId, TopicInferenceEngine, TopicModel};
