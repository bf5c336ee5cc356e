//! Cache de corpora lidos, pertencente a quem chama.
//!
//! Cada corpus é lido do disco no máximo uma vez durante a vida do cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::corpus::{read_corpus, Corpus, LoadedCorpus, ReadOptions};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct CorpusCache {
    options: ReadOptions,
    entries: HashMap<Corpus, LoadedCorpus>,
}

impl CorpusCache {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Retorna o corpus, lendo-o na primeira chamada. Falhas não são guardadas.
    pub fn get_or_load(&mut self, corpus: Corpus) -> Result<&LoadedCorpus> {
        match self.entries.entry(corpus) {
            Entry::Occupied(entry) => {
                debug!(corpus = %corpus, "corpus cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let loaded = read_corpus(corpus, &self.options)?;
                Ok(entry.insert(loaded))
            }
        }
    }

    pub fn contains(&self, corpus: Corpus) -> bool {
        self.entries.contains_key(&corpus)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descarta um corpus para forçar nova leitura.
    pub fn invalidate(&mut self, corpus: Corpus) -> Option<LoadedCorpus> {
        self.entries.remove(&corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_loads_once() {
        let mut cache = CorpusCache::default();
        assert!(cache.is_empty());

        let first = cache.get_or_load(Corpus::Mock).unwrap().messages.as_ptr();
        let second = cache.get_or_load(Corpus::Mock).unwrap().messages.as_ptr();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(Corpus::Mock));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache = CorpusCache::new(ReadOptions {
            data_dir: PathBuf::from("/nonexistent/nlu-data"),
            strict: false,
        });
        assert!(cache.get_or_load(Corpus::Rasa).is_err());
        assert!(!cache.contains(Corpus::Rasa));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = CorpusCache::default();
        cache.get_or_load(Corpus::Mock).unwrap();
        assert!(cache.invalidate(Corpus::Mock).is_some());
        assert!(cache.is_empty());
    }
}
