use super::stop_words::is_stop_word;
use super::SparseVector;
use anyhow::bail;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Term-frequency / inverse-document-frequency vectorizer with smoothed idf
/// and L2-normalized output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    stop_words: bool,
}

impl TfidfVectorizer {
    pub fn new(stop_words: bool) -> Self {
        Self {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            stop_words,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        token_regex()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !(self.stop_words && is_stop_word(token)))
            .map(str::to_string)
            .collect()
    }

    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> anyhow::Result<()> {
        if documents.is_empty() {
            bail!("Cannot fit vectorizer on an empty corpus");
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let unique: BTreeSet<String> = self.tokenize(document.as_ref()).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            bail!("Corpus contains no usable tokens; documents may only contain stop words");
        }

        let n = documents.len() as f64;
        self.vocabulary = HashMap::with_capacity(document_frequency.len());
        self.idf = Vec::with_capacity(document_frequency.len());
        // BTreeMap iteration gives lexicographic feature order
        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            self.idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            self.vocabulary.insert(term, index);
        }

        log::debug!(
            "Fitted vectorizer on {} documents, vocabulary size {}",
            documents.len(),
            self.vocabulary.len()
        );
        Ok(())
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in self.tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in vector.iter_mut() {
                *weight /= norm;
            }
        }
        vector
    }

    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> anyhow::Result<Vec<SparseVector>> {
        self.fit(documents)?;
        Ok(documents
            .iter()
            .map(|d| self.transform(d.as_ref()))
            .collect())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}
