//! Topic stability across repeated fits.
//!
//! The same configuration is fitted several times. Topics of every run are
//! matched to the topics of the first run by minimizing the total average
//! Jaccard distance between their top words (Greene et al., 2014).

use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::assignment;
use crate::dictionary::BowCorpus;
use crate::error::{ExplorerError, Result};
use crate::topic_modeling::{TopicId, TopicInferenceEngine, TopicModel};

/// Words kept per topic and run.
pub const TOP_WORDS: usize = 10;

// The empty top-0 list carries no information and is left out.
const JACCARD_DEPTHS: RangeInclusive<usize> = 1..=TOP_WORDS - 1;

/// 1 - |A ∩ B| / |A ∪ B| of two word lists taken as sets; 0 when both are empty.
pub fn jaccard_distance(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    1.0 - intersection as f64 / union as f64
}

/// Jaccard distance of the top-n prefixes, averaged over n = 1..=9.
pub fn average_jaccard_distance(a: &[String], b: &[String]) -> f64 {
    let depths = JACCARD_DEPTHS.count() as f64;
    JACCARD_DEPTHS
        .map(|n| jaccard_distance(&a[..n.min(a.len())], &b[..n.min(b.len())]))
        .sum::<f64>()
        / depths
}

/// Reference topics x other topics average Jaccard distances.
pub fn distance_matrix(reference: &[Vec<String>], other: &[Vec<String>]) -> Result<Vec<Vec<f64>>> {
    if reference.len() != other.len() {
        return Err(ExplorerError::configuration(format!(
            "cannot align a model with {} topics to one with {}",
            reference.len(),
            other.len()
        )));
    }
    Ok(reference
        .iter()
        .map(|a| other.iter().map(|b| average_jaccard_distance(a, b)).collect())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentReport {
    pub num_topics: usize,
    pub num_runs: usize,
    pub topics: Vec<Vec<String>>,      // Topics x Runs, top words joined by spaces
    pub matches: Vec<Vec<TopicId>>,    // Topics x Runs, topic of run r aligned to reference topic t
    pub distances: Vec<Vec<Vec<f64>>>, // One topics x topics matrix per run after the first
    pub stability: Vec<f64>,           // Mean distance of the matched pairs, per run after the first
}

impl AlignmentReport {
    pub fn aligned_topic(&self, topic: TopicId, run: usize) -> Option<TopicId> {
        self.matches.get(topic)?.get(run).copied()
    }

    /// Mean matched distance over all runs compared with the first; `None` for a single run.
    pub fn mean_stability(&self) -> Option<f64> {
        if self.stability.is_empty() {
            return None;
        }
        Some(self.stability.iter().sum::<f64>() / self.stability.len() as f64)
    }
}

/// Top words of every topic of a model.
pub fn topic_words<M: TopicModel>(model: &M, n: usize) -> Result<Vec<Vec<String>>> {
    (0..model.num_topics())
        .map(|topic| -> Result<Vec<String>> {
            Ok(model
                .top_words(topic, n)?
                .into_iter()
                .map(|(word, _)| word)
                .collect())
        })
        .collect()
}

/// Aligns every model to the first one. All models must have `num_topics` topics.
pub fn align<M: TopicModel>(models: &[M], num_topics: usize) -> Result<AlignmentReport> {
    if let Some(model) = models.iter().find(|m| m.num_topics() != num_topics) {
        return Err(ExplorerError::configuration(format!(
            "expected models with {} topics, got one with {}",
            num_topics,
            model.num_topics()
        )));
    }

    let words: Vec<Vec<Vec<String>>> = models
        .iter()
        .map(|model| topic_words(model, TOP_WORDS))
        .collect::<Result<_>>()?;

    let topics: Vec<Vec<String>> = (0..num_topics)
        .map(|topic| words.iter().map(|run| run[topic].join(" ")).collect())
        .collect();

    // The first column holds the reference topics themselves.
    let mut matches: Vec<Vec<TopicId>> = (0..num_topics).map(|topic| vec![topic]).collect();
    let mut distances = Vec::new();
    let mut stability = Vec::new();

    if let Some((reference, others)) = words.split_first() {
        for (run, other) in others.iter().enumerate() {
            let cost = distance_matrix(reference, other)?;
            let assignment = assignment::solve(&cost)?;
            for (topic, &aligned) in assignment.iter().enumerate() {
                matches[topic].push(aligned);
            }
            let mean = if num_topics == 0 {
                0.0
            } else {
                assignment::total_cost(&cost, &assignment)? / num_topics as f64
            };
            log::debug!("Run {} aligned with mean distance {:.3}", run + 1, mean);
            stability.push(mean);
            distances.push(cost);
        }
    }

    Ok(AlignmentReport {
        num_topics,
        num_runs: models.len(),
        topics,
        matches,
        distances,
        stability,
    })
}

/// Repeated fits of one configuration, aligned to the first fit.
pub struct TopicAlignment<'a, E: TopicInferenceEngine> {
    engine: &'a E,
    corpus: &'a BowCorpus,
    num_topics: usize,
    num_runs: usize,
}

impl<'a, E: TopicInferenceEngine> TopicAlignment<'a, E> {
    pub fn new(engine: &'a E, corpus: &'a BowCorpus, num_topics: usize, num_runs: usize) -> Result<Self> {
        if num_topics == 0 {
            return Err(ExplorerError::configuration("number of topics must be at least 1"));
        }
        if num_runs == 0 {
            return Err(ExplorerError::configuration("number of runs must be at least 1"));
        }
        Ok(TopicAlignment {
            engine,
            corpus,
            num_topics,
            num_runs,
        })
    }

    /// Fits the models one after another, calling `progress` with the run index after each fit.
    pub fn fit_models<F: FnMut(usize)>(&self, mut progress: F) -> Result<Vec<E::Model>> {
        let mut models = Vec::with_capacity(self.num_runs);
        for run in 0..self.num_runs {
            log::info!("Stability run {}/{}", run + 1, self.num_runs);
            models.push(self.engine.fit(self.corpus, self.num_topics)?);
            progress(run);
        }
        Ok(models)
    }

    pub fn fit<F: FnMut(usize)>(&self, progress: F) -> Result<AlignmentReport> {
        let models = self.fit_models(progress)?;
        align(&models, self.num_topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::BagOfWords;
    use crate::topic_modeling::SparseTopics;
    use std::cell::Cell;

    #[derive(Clone)]
    struct WordListModel {
        topics: Vec<Vec<String>>,
    }

    impl WordListModel {
        fn new(topics: &[&str]) -> Self {
            WordListModel {
                topics: topics
                    .iter()
                    .map(|t| t.split_whitespace().map(String::from).collect())
                    .collect(),
            }
        }
    }

    impl TopicModel for WordListModel {
        fn num_topics(&self) -> usize {
            self.topics.len()
        }

        fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>> {
            Ok(self.topics[topic].iter().take(n).map(|w| (w.clone(), 0.1)).collect())
        }

        fn topic_distribution(&self, _document: &BagOfWords) -> SparseTopics {
            Vec::new()
        }
    }

    /// Returns the queued models in order, one per fit.
    struct ScriptedEngine {
        models: Vec<WordListModel>,
        calls: Cell<usize>,
    }

    impl TopicInferenceEngine for ScriptedEngine {
        type Model = WordListModel;

        fn fit(&self, _corpus: &BowCorpus, _num_topics: usize) -> Result<WordListModel> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            Ok(self.models[call % self.models.len()].clone())
        }
    }

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    const SPORTS: &str = "ball goal team match score player coach league field win";
    const FOOD: &str = "bread cheese wine pasta sauce salt oven bake taste meal";
    const SPACE: &str = "rocket orbit moon launch star planet nasa mars probe crew";

    #[test]
    fn test_jaccard_distance() {
        assert_eq!(jaccard_distance(&words("a b c"), &words("a b c")), 0.0);
        assert_eq!(jaccard_distance(&words("a b"), &words("c d")), 1.0);
        assert!((jaccard_distance(&words("a b c d"), &words("c d e f")) - (1.0 - 2.0 / 6.0)).abs() < 1e-12);
        assert_eq!(jaccard_distance(&[], &[]), 0.0);
    }

    #[test]
    fn test_average_jaccard_excludes_empty_prefix() {
        let a = words(SPORTS);
        assert_eq!(average_jaccard_distance(&a, &a), 0.0);
        assert_eq!(average_jaccard_distance(&a, &words(FOOD)), 1.0);

        // Lists differ only in their first word: depth n shares n - 1 of n + 1 words.
        let b = words("x goal team match score player coach league field win");
        let expected = (1..=9)
            .map(|n| 1.0 - (n as f64 - 1.0) / (n as f64 + 1.0))
            .sum::<f64>()
            / 9.0;
        assert!((average_jaccard_distance(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_distance_matrix_rejects_mismatched_topics() {
        let result = distance_matrix(&[words(SPORTS)], &[words(SPORTS), words(FOOD)]);
        assert!(matches!(result, Err(ExplorerError::Configuration(_))));
    }

    #[test]
    fn test_identical_runs_align_to_identity() {
        let model = WordListModel::new(&[SPORTS, FOOD, SPACE]);
        let report = align(&[model.clone(), model], 3).unwrap();

        assert_eq!(report.matches, vec![vec![0, 0], vec![1, 1], vec![2, 2]]);
        assert_eq!(report.stability, vec![0.0]);
        assert_eq!(report.distances[0][0][0], 0.0);
        assert_eq!(report.distances[0][0][1], 1.0);
        assert_eq!(report.topics[1][1], FOOD);
    }

    #[test]
    fn test_permuted_run_is_recovered() {
        let reference = WordListModel::new(&[SPORTS, FOOD, SPACE]);
        let shuffled = WordListModel::new(&[SPACE, SPORTS, FOOD]);
        let report = align(&[reference, shuffled], 3).unwrap();

        assert_eq!(report.aligned_topic(0, 1), Some(1));
        assert_eq!(report.aligned_topic(1, 1), Some(2));
        assert_eq!(report.aligned_topic(2, 1), Some(0));
        assert_eq!(report.mean_stability(), Some(0.0));
    }

    #[test]
    fn test_align_rejects_mismatched_models() {
        let a = WordListModel::new(&[SPORTS, FOOD]);
        let b = WordListModel::new(&[SPORTS]);
        assert!(matches!(align(&[a, b], 2), Err(ExplorerError::Configuration(_))));
    }

    #[test]
    fn test_single_run() {
        let report = align(&[WordListModel::new(&[SPORTS, FOOD])], 2).unwrap();
        assert_eq!(report.matches, vec![vec![0], vec![1]]);
        assert!(report.distances.is_empty());
        assert_eq!(report.mean_stability(), None);
    }

    #[test]
    fn test_fit_reports_progress_per_run() {
        let engine = ScriptedEngine {
            models: vec![
                WordListModel::new(&[SPORTS, FOOD]),
                WordListModel::new(&[FOOD, SPORTS]),
            ],
            calls: Cell::new(0),
        };
        let corpus = BowCorpus::default();
        let alignment = TopicAlignment::new(&engine, &corpus, 2, 3).unwrap();

        let mut completed = Vec::new();
        let report = alignment.fit(|run| completed.push(run)).unwrap();

        assert_eq!(completed, vec![0, 1, 2]);
        assert_eq!(engine.calls.get(), 3);
        assert_eq!(report.num_runs, 3);
        assert_eq!(report.matches, vec![vec![0, 1, 0], vec![1, 0, 1]]);
        assert_eq!(report.topics[0], vec![SPORTS, FOOD, SPORTS]);
    }

    #[test]
    fn test_invalid_alignment_parameters() {
        let engine = ScriptedEngine {
            models: vec![WordListModel::new(&[SPORTS])],
            calls: Cell::new(0),
        };
        let corpus = BowCorpus::default();
        assert!(TopicAlignment::new(&engine, &corpus, 0, 2).is_err());
        assert!(TopicAlignment::new(&engine, &corpus, 1, 0).is_err());
    }
}
