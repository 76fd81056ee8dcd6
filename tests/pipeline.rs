use std::cell::Cell;
use std::io::Write;
use std::sync::Arc;

use approx::assert_relative_eq;
use topic_explorer::dictionary::TokenId;
use topic_explorer::report;
use topic_explorer::{
    BagOfWords, BowCorpus, Corpus, CorpusCache, DocumentTopicMatrix, ExplorerError, GibbsLda, KeywordCooccurrence,
    LdaConfig, Result, SparseTopics, Stopwords, TopicAlignment, TopicCooccurrence, TopicId, TopicInferenceEngine,
    TopicModel,
};

const CORPUS: &str = "name,content,year
d1,The cat chased the mouse. The cat slept.,2019
d2,A dog barked at the cat. The dog ran.,2019
d3,Stars shine over the moon. The moon rose.,2020
d4,The cat watched the rocket reach the moon.,2020
";

/// Gives a document full weight on every topic whose first word it contains, split evenly.
struct KeywordModel {
    topics: Vec<Vec<String>>,
    keys: Vec<Option<TokenId>>,
}

impl TopicModel for KeywordModel {
    fn num_topics(&self) -> usize {
        self.topics.len()
    }

    fn top_words(&self, topic: TopicId, n: usize) -> Result<Vec<(String, f64)>> {
        let words = self.topics.get(topic).ok_or(ExplorerError::IndexOutOfBounds {
            index: topic,
            max: self.topics.len(),
        })?;
        Ok(words.iter().take(n).map(|w| (w.clone(), 0.1)).collect())
    }

    fn topic_distribution(&self, document: &BagOfWords) -> SparseTopics {
        let present: Vec<TopicId> = self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, key)| matches!(key, Some(id) if document.entries().iter().any(|(t, _)| t == id)))
            .map(|(topic, _)| topic)
            .collect();
        let weight = 1.0 / present.len().max(1) as f64;
        present.into_iter().map(|topic| (topic, weight)).collect()
    }
}

/// Every fit rotates the topic order by one, like a sampler landing on permuted topics.
struct RotatingEngine {
    topics: Vec<Vec<&'static str>>,
    fits: Cell<usize>,
}

impl RotatingEngine {
    fn new() -> Self {
        RotatingEngine {
            topics: vec![vec!["cat", "dog", "mouse"], vec!["moon", "stars", "rocket"]],
            fits: Cell::new(0),
        }
    }
}

impl TopicInferenceEngine for RotatingEngine {
    type Model = KeywordModel;

    fn fit(&self, corpus: &BowCorpus, num_topics: usize) -> Result<KeywordModel> {
        let fit = self.fits.get();
        self.fits.set(fit + 1);
        let mut topics: Vec<Vec<String>> = self
            .topics
            .iter()
            .take(num_topics)
            .map(|words| words.iter().map(|w| w.to_string()).collect())
            .collect();
        let len = topics.len();
        topics.rotate_left(fit % len);
        let keys = topics.iter().map(|words| corpus.dictionary.id(&words[0])).collect();
        Ok(KeywordModel { topics, keys })
    }
}

fn load() -> (Corpus, Stopwords, Arc<BowCorpus>) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CORPUS.as_bytes()).unwrap();
    let corpus = Corpus::from_path(file.path()).unwrap();
    let stopwords = Stopwords::english();
    let prepared = Arc::new(BowCorpus::build(&corpus, &stopwords));
    (corpus, stopwords, prepared)
}

#[test]
fn test_topic_views_from_csv() {
    let (corpus, _, prepared) = load();
    assert_eq!(corpus.len(), 4);
    assert!(corpus.has_years());

    let model = RotatingEngine::new().fit(&prepared, 2).unwrap();
    let matrix = DocumentTopicMatrix::build(&prepared, &model).unwrap();
    assert_eq!(matrix.num_documents(), 4);
    assert_eq!(matrix.row(0).unwrap(), &[1.0, 0.0]);
    assert_eq!(matrix.row(3).unwrap(), &[0.5, 0.5]);

    let graph = TopicCooccurrence::new(0.1, 1).unwrap().graph(&matrix);
    assert_eq!(graph.nodes.len(), 2);
    assert_relative_eq!(graph.nodes[0].weight, 0.625, epsilon = 1e-12);
    assert_relative_eq!(graph.nodes[1].weight, 0.375, epsilon = 1e-12);
    assert_relative_eq!(graph.nodes[0].size, 2.0 * 0.625f64.sqrt(), epsilon = 1e-12);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edge(1, 0).map(|e| e.count), Some(1));

    // Raising the bar above the shared document's weight removes the edge
    let strict = TopicCooccurrence::new(0.6, 1).unwrap().graph(&matrix);
    assert!(strict.edges.is_empty());
    assert_eq!(strict.nodes.len(), 2);

    let trends = report::topic_trends(&corpus, &matrix).unwrap().unwrap();
    assert_eq!(trends.keys().copied().collect::<Vec<_>>(), vec![2019, 2020]);
    assert_relative_eq!(trends[&2019][0], 2.0, epsilon = 1e-12);
    assert_relative_eq!(trends[&2020][0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(trends[&2020][1], 1.5, epsilon = 1e-12);
}

#[test]
fn test_keyword_graph_of_top_document() {
    let (corpus, stopwords, prepared) = load();
    let model = RotatingEngine::new().fit(&prepared, 2).unwrap();
    let matrix = DocumentTopicMatrix::build(&prepared, &model).unwrap();

    let analyzer = KeywordCooccurrence::new(&stopwords, 1).unwrap();
    let graph = analyzer.graph_for_topic(&corpus, &matrix, 0).unwrap();
    assert_eq!(graph.nodes, vec!["cat", "chased", "mouse", "slept"]);
    assert_eq!(graph.edge("mouse", "cat").map(|e| e.count), Some(1));
    assert_eq!(graph.edge("cat", "slept").map(|e| e.count), Some(1));
    assert!(graph.edge("mouse", "slept").is_none());

    assert!(analyzer.graph_for_topic(&corpus, &matrix, 5).is_err());

    let strict = KeywordCooccurrence::new(&stopwords, 2).unwrap();
    assert!(strict.graph_for_topic(&corpus, &matrix, 0).unwrap().is_empty());
}

#[test]
fn test_stability_recovers_rotated_topics() {
    let (_, _, prepared) = load();
    let engine = RotatingEngine::new();
    let mut finished = Vec::new();
    let alignment = TopicAlignment::new(&engine, &prepared, 2, 3).unwrap();
    let report = alignment.fit(|run| finished.push(run)).unwrap();

    assert_eq!(finished, vec![0, 1, 2]);
    assert_eq!(report.matches, vec![vec![0, 1, 0], vec![1, 0, 1]]);
    assert_eq!(report.mean_stability(), Some(0.0));

    let mut table = tempfile::NamedTempFile::new().unwrap();
    report::write_alignment_csv(table.as_file_mut(), &report).unwrap();
    let written = std::fs::read_to_string(table.path()).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("topic,run_0,run_1,run_2,match_0,match_1,match_2"));
    assert_eq!(
        lines.next(),
        Some("0,cat dog mouse,moon stars rocket,cat dog mouse,0,1,0")
    );
}

#[test]
fn test_cache_reuses_prepared_corpus() {
    let stopwords = Stopwords::english();
    let mut cache = CorpusCache::new();

    let first = cache.get_or_build(CORPUS.as_bytes(), &stopwords).unwrap();
    let second = cache.get_or_build(CORPUS.as_bytes(), &stopwords).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.corpus.len(), 4);
    assert_eq!((cache.hits(), cache.misses()), (1, 1));

    let more = Stopwords::english_with("cat");
    let third = cache.get_or_build(CORPUS.as_bytes(), &more).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert!(third.bow.dictionary.id("cat").is_none());
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_seeded_gibbs_fit_is_reproducible() {
    let (_, _, prepared) = load();
    let config = LdaConfig {
        iterations: 20,
        seed: Some(7),
        ..LdaConfig::default()
    };

    let first = GibbsLda::new(config.clone()).fit(&prepared, 2).unwrap();
    let second = GibbsLda::new(config).fit(&prepared, 2).unwrap();
    assert_eq!(first.top_words(0, 3).unwrap(), second.top_words(0, 3).unwrap());
    assert!(first.top_words(2, 3).is_err());

    let matrix = DocumentTopicMatrix::build(&prepared, &first).unwrap();
    for row in matrix.rows() {
        assert!(row.iter().all(|&w| w >= 0.0));
        assert!(row.iter().sum::<f64>() <= 1.0 + 1e-9);
    }
}
