use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cooccurrence::{KeywordCooccurrence, TopicCooccurrence};
use crate::error::{ExplorerError, Result};
use crate::text::Stopwords;
use crate::topic_modeling::LdaConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub num_topics: usize,
    pub model: LdaConfig,
    pub topic_graph: TopicGraphConfig,
    pub keyword_graph: KeywordGraphConfig,
    pub stability: StabilityConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            num_topics: 10,
            model: LdaConfig::default(),
            topic_graph: TopicGraphConfig::default(),
            keyword_graph: KeywordGraphConfig::default(),
            stability: StabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicGraphConfig {
    pub min_weight: f64, // Both topics must reach this weight in a document
    pub min_edges: usize,
}

impl Default for TopicGraphConfig {
    fn default() -> Self {
        TopicGraphConfig {
            min_weight: 0.1,
            min_edges: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordGraphConfig {
    pub min_edges: usize,
}

impl Default for KeywordGraphConfig {
    fn default() -> Self {
        KeywordGraphConfig { min_edges: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub runs: usize,
    pub chunks: usize, // Overrides the model's chunk count for stability runs
}

impl Default for StabilityConfig {
    fn default() -> Self {
        StabilityConfig { runs: 4, chunks: 1 }
    }
}

impl ExplorerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ExplorerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_topics == 0 {
            return Err(ExplorerError::configuration("number of topics must be at least 1"));
        }
        self.model.validate()?;
        self.topic_cooccurrence()?;
        KeywordCooccurrence::new(&Stopwords::empty(), self.keyword_graph.min_edges)?;
        if self.stability.runs == 0 {
            return Err(ExplorerError::configuration("number of runs must be at least 1"));
        }
        if self.stability.chunks == 0 {
            return Err(ExplorerError::configuration("number of chunks must be at least 1"));
        }
        Ok(())
    }

    pub fn topic_cooccurrence(&self) -> Result<TopicCooccurrence> {
        TopicCooccurrence::new(self.topic_graph.min_weight, self.topic_graph.min_edges)
    }

    /// Model settings used for stability runs.
    pub fn stability_model(&self) -> LdaConfig {
        LdaConfig {
            chunks: self.stability.chunks,
            ..self.model.clone()
        }
    }
}
