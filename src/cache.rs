use std::collections::HashMap;
use std::sync::Arc;

use xxhash_rust::xxh64::Xxh64;

use crate::corpus::Corpus;
use crate::dictionary::BowCorpus;
use crate::error::Result;
use crate::text::Stopwords;

/// Content address of a prepared corpus: source bytes plus preprocessing config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    pub fn new(source: &[u8], stopwords: &Stopwords) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.update(&(source.len() as u64).to_le_bytes());
        hasher.update(source);
        for word in stopwords.sorted() {
            hasher.update(word.as_bytes());
            hasher.update(b"\n");
        }
        CacheKey(hasher.digest())
    }
}

/// A parsed corpus together with its dictionary and bags of words.
#[derive(Debug)]
pub struct PreparedCorpus {
    pub corpus: Corpus,
    pub bow: BowCorpus,
}

/// Prepared corpora, reused while source and stopwords are unchanged.
///
/// Entries are built from the very bytes they are keyed by, so a hit always
/// returns the preparation of that source.
#[derive(Debug, Default)]
pub struct CorpusCache {
    entries: HashMap<CacheKey, Arc<PreparedCorpus>>,
    hits: usize,
    misses: usize,
}

impl CorpusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `source` as a corpus table and prepares it, unless the same source
    /// and stopwords were prepared before.
    pub fn get_or_build(&mut self, source: &[u8], stopwords: &Stopwords) -> Result<Arc<PreparedCorpus>> {
        let key = CacheKey::new(source, stopwords);
        if let Some(prepared) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Corpus cache hit {:016x}", key.0);
            return Ok(Arc::clone(prepared));
        }

        let corpus = Corpus::from_reader(source)?;
        self.misses += 1;
        log::info!("Preparing corpus ({} documents, {} stopwords)", corpus.len(), stopwords.len());
        let bow = BowCorpus::build(&corpus, stopwords);
        let prepared = Arc::new(PreparedCorpus { corpus, bow });
        self.entries.insert(key, Arc::clone(&prepared));
        Ok(prepared)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
