use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::dictionary::{BagOfWords, BowCorpus, TokenId};
use crate::error::{ExplorerError, Result};

pub type TopicId = usize;

/// Sparse `(topic, weight)` pairs for one document, as reported by a model.
pub type SparseTopics = Vec<(TopicId, f64)>;

// Fixed-point iterations used to infer a document's topic mixture.
const INFERENCE_ITERATIONS: usize = 100;
const INFERENCE_TOLERANCE: f64 = 1e-8;

/// A fitted topic model, queried by the analyzers.
pub trait TopicModel {
    fn num_topics(&self) -> usize;

    /// The `n` highest weighted tokens of a topic, in descending order of weight.
    fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>>;

    /// Topic mixture of a document; negligible topics are omitted.
    fn topic_distribution(&self, document: &BagOfWords) -> SparseTopics;
}

/// Anything that can fit a [`TopicModel`] to a bag-of-words corpus.
pub trait TopicInferenceEngine {
    type Model: TopicModel;

    fn fit(&self, corpus: &BowCorpus, num_topics: usize) -> Result<Self::Model>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlphaPrior {
    /// 1 / K
    #[default]
    Symmetric,
    /// 0.05 * average document length / K
    Talley,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdaConfig {
    pub iterations: usize,         // Gibbs sweeps per chunk and pass
    pub passes: usize,             // Passes over the whole corpus
    pub chunks: usize,             // Documents are swept in this many consecutive chunks
    pub alpha: AlphaPrior,         // Document-topic concentration
    pub beta: Option<f64>,         // Topic-word concentration, 1 / K when unset
    pub seed: Option<u64>,         // Unset means every fit starts from fresh entropy
    pub minimum_probability: f64,  // Topics below this weight are left out of distributions
}

impl Default for LdaConfig {
    fn default() -> Self {
        LdaConfig {
            iterations: 50,
            passes: 1,
            chunks: 1,
            alpha: AlphaPrior::Symmetric,
            beta: None,
            seed: None,
            minimum_probability: 0.01,
        }
    }
}

impl LdaConfig {
    pub fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            return Err(ExplorerError::configuration("passes must be at least 1"));
        }
        if self.chunks == 0 {
            return Err(ExplorerError::configuration("number of chunks must be at least 1"));
        }
        if let Some(beta) = self.beta {
            if !(beta > 0.0) {
                return Err(ExplorerError::configuration(format!("beta must be positive, got {}", beta)));
            }
        }
        if !(0.0..=1.0).contains(&self.minimum_probability) {
            return Err(ExplorerError::configuration(format!(
                "minimum probability must lie in [0, 1], got {}",
                self.minimum_probability
            )));
        }
        Ok(())
    }
}

/// Latent Dirichlet Allocation fitted with collapsed Gibbs sampling.
pub struct GibbsLda {
    config: LdaConfig,
}

impl GibbsLda {
    pub fn new(config: LdaConfig) -> Self {
        GibbsLda { config }
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    fn alpha(&self, corpus: &BowCorpus, num_topics: usize) -> f64 {
        let symmetric = 1.0 / num_topics as f64;
        match self.config.alpha {
            AlphaPrior::Symmetric => symmetric,
            AlphaPrior::Talley => {
                let alpha = 0.05 * corpus.average_document_length() / num_topics as f64;
                if alpha > 0.0 {
                    alpha
                } else {
                    log::warn!("Empty documents give no Talley prior, using symmetric alpha");
                    symmetric
                }
            }
        }
    }

    fn chunksize(&self, num_documents: usize) -> usize {
        num_documents.div_ceil(self.config.chunks).max(1)
    }
}

impl TopicInferenceEngine for GibbsLda {
    type Model = LdaModel;

    fn fit(&self, corpus: &BowCorpus, num_topics: usize) -> Result<LdaModel> {
        self.config.validate()?;
        if num_topics == 0 {
            return Err(ExplorerError::configuration("number of topics must be at least 1"));
        }

        let vocab_size = corpus.dictionary.len();
        let alpha = self.alpha(corpus, num_topics);
        let beta = self.config.beta.unwrap_or(1.0 / num_topics as f64);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Step 1: Expand bags of words into token positions
        let documents: Vec<Vec<TokenId>> = corpus
            .documents
            .iter()
            .map(|bow| {
                bow.entries()
                    .iter()
                    .flat_map(|&(id, count)| std::iter::repeat(id).take(count))
                    .collect()
            })
            .collect();

        // Step 2: Random initialization
        let mut state = GibbsState::initialize(&documents, num_topics, vocab_size, &mut rng);

        // Step 3: Sweep the corpus chunk by chunk
        let chunksize = self.chunksize(documents.len());
        let mut weights = vec![0.0; num_topics];
        for pass in 0..self.config.passes {
            let mut start = 0;
            while start < documents.len() {
                let end = (start + chunksize).min(documents.len());
                for _iteration in 0..self.config.iterations {
                    for doc_id in start..end {
                        state.resample_document(doc_id, &documents[doc_id], alpha, beta, &mut weights, &mut rng)?;
                    }
                }
                log::debug!("Pass {}: sampled documents {}..{}", pass + 1, start, end);
                start = end;
            }
        }

        // Step 4: Convert counts to topic-word probabilities
        let phi = state.topic_word_matrix(beta);
        log::info!(
            "Fitted LDA with {} topics over {} documents and {} tokens",
            num_topics,
            documents.len(),
            vocab_size
        );

        Ok(LdaModel {
            num_topics,
            alpha,
            beta,
            vocabulary: corpus.dictionary.tokens().to_vec(),
            topic_word_matrix: phi,
            minimum_probability: self.config.minimum_probability,
        })
    }
}

struct GibbsState {
    assignments: Vec<Vec<TopicId>>,   // Topic of every token position
    doc_topic_counts: Vec<Vec<usize>>,  // Documents x Topics
    topic_word_counts: Vec<Vec<usize>>, // Topics x Words
    topic_counts: Vec<usize>,
}

impl GibbsState {
    fn initialize(documents: &[Vec<TokenId>], num_topics: usize, vocab_size: usize, rng: &mut StdRng) -> Self {
        let mut state = GibbsState {
            assignments: Vec::with_capacity(documents.len()),
            doc_topic_counts: vec![vec![0; num_topics]; documents.len()],
            topic_word_counts: vec![vec![0; vocab_size]; num_topics],
            topic_counts: vec![0; num_topics],
        };

        for (doc_id, doc) in documents.iter().enumerate() {
            let mut topics = Vec::with_capacity(doc.len());
            for &word_id in doc {
                let topic = rng.gen_range(0..num_topics);
                state.doc_topic_counts[doc_id][topic] += 1;
                state.topic_word_counts[topic][word_id] += 1;
                state.topic_counts[topic] += 1;
                topics.push(topic);
            }
            state.assignments.push(topics);
        }
        state
    }

    fn resample_document(
        &mut self,
        doc_id: usize,
        doc: &[TokenId],
        alpha: f64,
        beta: f64,
        weights: &mut [f64],
        rng: &mut StdRng,
    ) -> Result<()> {
        let vocab_beta = self.topic_word_counts.first().map_or(0, Vec::len) as f64 * beta;

        for (pos, &word_id) in doc.iter().enumerate() {
            let old_topic = self.assignments[doc_id][pos];

            // Remove current assignment
            self.doc_topic_counts[doc_id][old_topic] -= 1;
            self.topic_word_counts[old_topic][word_id] -= 1;
            self.topic_counts[old_topic] -= 1;

            // p(t) ∝ (n_dt + α) (n_tw + β) / (n_t + Vβ)
            for (topic, weight) in weights.iter_mut().enumerate() {
                let doc_prob = self.doc_topic_counts[doc_id][topic] as f64 + alpha;
                let word_prob = (self.topic_word_counts[topic][word_id] as f64 + beta)
                    / (self.topic_counts[topic] as f64 + vocab_beta);
                *weight = doc_prob * word_prob;
            }

            let total: f64 = weights.iter().sum();
            let new_topic = if total <= f64::EPSILON {
                rng.gen_range(0..weights.len())
            } else {
                WeightedIndex::new(&*weights)
                    .map_err(|e| ExplorerError::Model(format!("invalid sampling weights: {}", e)))?
                    .sample(rng)
            };

            // Add new assignment
            self.doc_topic_counts[doc_id][new_topic] += 1;
            self.topic_word_counts[new_topic][word_id] += 1;
            self.topic_counts[new_topic] += 1;
            self.assignments[doc_id][pos] = new_topic;
        }
        Ok(())
    }

    fn topic_word_matrix(&self, beta: f64) -> Vec<Vec<f64>> {
        self.topic_word_counts
            .iter()
            .zip(&self.topic_counts)
            .map(|(word_counts, &topic_count)| {
                let denominator = topic_count as f64 + word_counts.len() as f64 * beta;
                word_counts
                    .iter()
                    .map(|&count| (count as f64 + beta) / denominator)
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaModel {
    num_topics: usize,
    alpha: f64,
    beta: f64,
    vocabulary: Vec<String>,
    topic_word_matrix: Vec<Vec<f64>>, // Topics x Words
    minimum_probability: f64,
}

impl LdaModel {
    fn ranked_words(&self, topic: TopicId, n: usize) -> Vec<(String, f64)> {
        let mut word_probs: Vec<(usize, f64)> = self.topic_word_matrix[topic]
            .iter()
            .copied()
            .enumerate()
            .collect();
        word_probs.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        word_probs
            .into_iter()
            .take(n)
            .map(|(word_id, prob)| (self.vocabulary[word_id].clone(), prob))
            .collect()
    }

    /// Full topic mixture θ of a document, with φ held fixed.
    pub fn infer(&self, document: &BagOfWords) -> Vec<f64> {
        let k = self.num_topics;
        let mut theta = vec![1.0 / k as f64; k];
        let words: Vec<(TokenId, f64)> = document
            .entries()
            .iter()
            .filter(|&&(id, _)| id < self.vocabulary.len())
            .map(|&(id, count)| (id, count as f64))
            .collect();
        if words.is_empty() {
            return theta;
        }

        for _ in 0..INFERENCE_ITERATIONS {
            let mut next = vec![self.alpha; k];
            for &(word_id, count) in &words {
                let norm: f64 = (0..k).map(|t| self.topic_word_matrix[t][word_id] * theta[t]).sum();
                if norm <= 0.0 {
                    continue;
                }
                for (t, slot) in next.iter_mut().enumerate() {
                    *slot += count * self.topic_word_matrix[t][word_id] * theta[t] / norm;
                }
            }

            let total: f64 = next.iter().sum();
            next.iter_mut().for_each(|p| *p /= total);
            let delta = next
                .iter()
                .zip(&theta)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            theta = next;
            if delta < INFERENCE_TOLERANCE {
                break;
            }
        }
        theta
    }
}

impl TopicModel for LdaModel {
    fn num_topics(&self) -> usize {
        self.num_topics
    }

    fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>> {
        if topic >= self.num_topics {
            return Err(ExplorerError::IndexOutOfBounds {
                index: topic,
                max: self.num_topics,
            });
        }
        Ok(self.ranked_words(topic, n))
    }

    fn topic_distribution(&self, document: &BagOfWords) -> SparseTopics {
        self.infer(document)
            .into_iter()
            .enumerate()
            .filter(|&(_, weight)| weight >= self.minimum_probability)
            .collect()
    }
}
