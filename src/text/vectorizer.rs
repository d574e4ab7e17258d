// Vocabulary fitting and feature matrices.
//
// One fit produces a VocabularyModel plus two weightings of the same columns:
// raw counts (what the topic model expects) and L2-normalised smooth TF-IDF
// (keywords, similarity, clustering). Column order is alphabetical so the
// term -> index mapping does not depend on document order.

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tokenize::{StopWords, Tokenizer};
use crate::error::{AnalysisError, Result};

/// Vocabulary filtering options.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizerConfig {
    /// Terms in more than this fraction of documents are dropped (0 < max_df <= 1)
    pub max_df: f64,
    /// Terms in fewer than this many documents are dropped
    pub min_df: usize,
    /// Keep at most this many terms, by corpus-wide count
    pub max_features: Option<usize>,
    pub stop_words: StopWords,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_df: 0.9,
            min_df: 1,
            max_features: Some(10_000),
            stop_words: StopWords::English,
        }
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        if self.max_features == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "max_features must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Term -> column mapping with the document-frequency statistics it was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyModel {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    document_frequency: Vec<usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

impl VocabularyModel {
    fn new(mut entries: Vec<(String, usize)>, n_documents: usize) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let n = n_documents as f64;
        let mut terms = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        let mut document_frequency = Vec::with_capacity(entries.len());
        let mut idf = Vec::with_capacity(entries.len());

        for (i, (term, df)) in entries.into_iter().enumerate() {
            index.insert(term.clone(), i);
            terms.push(term);
            document_frequency.push(df);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self {
            terms,
            index,
            document_frequency,
            idf,
            n_documents,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in column order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn document_frequency(&self, index: usize) -> usize {
        self.document_frequency[index]
    }

    pub fn idf(&self, index: usize) -> f64 {
        self.idf[index]
    }

    /// Number of documents the vocabulary was fit on.
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    Counts,
    TfIdf,
}

/// Dense documents x terms matrix. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    weighting: Weighting,
}

impl FeatureMatrix {
    pub fn new(values: Array2<f64>, weighting: Weighting) -> Self {
        Self { values, weighting }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.row(i)
    }

    /// (column, weight) pairs of the nonzero entries in row `i`.
    pub fn nonzero(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .row(i)
            .into_iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| *v != 0.0)
    }
}

/// Output of a single vocabulary fit.
#[derive(Debug, Clone)]
pub struct Vectorized {
    pub vocabulary: VocabularyModel,
    pub counts: FeatureMatrix,
    pub tfidf: FeatureMatrix,
}

pub struct Vectorizer {
    config: VectorizerConfig,
    tokenizer: Tokenizer,
}

impl Vectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        let tokenizer = Tokenizer::new(&config.stop_words);
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Fit a vocabulary on `texts` and build both weightings of the corpus.
    pub fn fit_transform<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vectorized> {
        self.config.validate()?;

        let tokenized: Vec<Vec<String>> = texts
            .iter()
            .map(|t| self.tokenizer.tokenize(t.as_ref()))
            .collect();

        let vocabulary = self.build_vocabulary(&tokenized)?;
        let counts = count_matrix(&vocabulary, &tokenized);
        let tfidf = tfidf_matrix(&vocabulary, &counts);

        info!(
            documents = tokenized.len(),
            terms = vocabulary.len(),
            "Fitted vocabulary"
        );

        Ok(Vectorized {
            vocabulary,
            counts,
            tfidf,
        })
    }

    /// Count matrix of new texts against an already fitted vocabulary.
    /// Tokens outside the vocabulary are ignored.
    pub fn transform_counts<S: AsRef<str>>(
        &self,
        vocabulary: &VocabularyModel,
        texts: &[S],
    ) -> FeatureMatrix {
        let tokenized: Vec<Vec<String>> = texts
            .iter()
            .map(|t| self.tokenizer.tokenize(t.as_ref()))
            .collect();
        count_matrix(vocabulary, &tokenized)
    }

    /// TF-IDF matrix of new texts against an already fitted vocabulary.
    pub fn transform_tfidf<S: AsRef<str>>(
        &self,
        vocabulary: &VocabularyModel,
        texts: &[S],
    ) -> FeatureMatrix {
        tfidf_matrix(vocabulary, &self.transform_counts(vocabulary, texts))
    }

    fn build_vocabulary(&self, tokenized: &[Vec<String>]) -> Result<VocabularyModel> {
        let n_documents = tokenized.len();

        // term -> (document frequency, corpus-wide count)
        let mut stats: HashMap<&str, (usize, usize)> = HashMap::new();
        for doc in tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for tok in doc {
                let entry = stats.entry(tok.as_str()).or_insert((0, 0));
                entry.1 += 1;
                if seen.insert(tok.as_str()) {
                    entry.0 += 1;
                }
            }
        }

        let max_doc_count = self.config.max_df * n_documents as f64;
        let mut kept: Vec<(&str, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= self.config.min_df && (*df as f64) <= max_doc_count)
            .map(|(term, (df, total))| (term, df, total))
            .collect();

        if let Some(max) = self.config.max_features {
            if kept.len() > max {
                kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
                debug!(dropped = kept.len() - max, "Truncating vocabulary to max_features");
                kept.truncate(max);
            }
        }

        if kept.is_empty() {
            return Err(AnalysisError::EmptyVocabulary {
                documents: n_documents,
                min_df: self.config.min_df,
                max_df: self.config.max_df,
            });
        }

        Ok(VocabularyModel::new(
            kept.into_iter()
                .map(|(term, df, _)| (term.to_string(), df))
                .collect(),
            n_documents,
        ))
    }
}

fn count_matrix(vocabulary: &VocabularyModel, tokenized: &[Vec<String>]) -> FeatureMatrix {
    let mut values = Array2::<f64>::zeros((tokenized.len(), vocabulary.len()));
    for (row, doc) in tokenized.iter().enumerate() {
        for tok in doc {
            if let Some(col) = vocabulary.index_of(tok) {
                values[[row, col]] += 1.0;
            }
        }
    }
    FeatureMatrix::new(values, Weighting::Counts)
}

fn tfidf_matrix(vocabulary: &VocabularyModel, counts: &FeatureMatrix) -> FeatureMatrix {
    let mut values = counts.values().clone();
    for mut row in values.rows_mut() {
        for (col, v) in row.iter_mut().enumerate() {
            *v *= vocabulary.idf(col);
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    FeatureMatrix::new(values, Weighting::TfIdf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_stop_words() -> VectorizerConfig {
        VectorizerConfig {
            max_df: 1.0,
            min_df: 1,
            max_features: None,
            stop_words: StopWords::None,
        }
    }

    #[test]
    fn test_vocabulary_is_alphabetical() {
        let v = Vectorizer::new(no_stop_words());
        let out = v.fit_transform(&["zebra apple", "mango apple"]).unwrap();
        assert_eq!(out.vocabulary.terms(), &["apple", "mango", "zebra"]);
        assert_eq!(out.vocabulary.index_of("mango"), Some(1));
        assert_eq!(out.vocabulary.document_frequency(0), 2);
    }

    #[test]
    fn test_max_df_drops_ubiquitous_terms() {
        let config = VectorizerConfig {
            max_df: 0.5,
            ..no_stop_words()
        };
        let out = Vectorizer::new(config)
            .fit_transform(&["common alpha", "common beta", "common gamma", "delta"])
            .unwrap();
        assert!(out.vocabulary.index_of("common").is_none());
        assert!(out.vocabulary.index_of("alpha").is_some());
    }

    #[test]
    fn test_min_df_drops_rare_terms() {
        let config = VectorizerConfig {
            min_df: 2,
            ..no_stop_words()
        };
        let out = Vectorizer::new(config)
            .fit_transform(&["shared rare", "shared other"])
            .unwrap();
        assert_eq!(out.vocabulary.terms(), &["shared"]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let config = VectorizerConfig {
            max_features: Some(1),
            ..no_stop_words()
        };
        let out = Vectorizer::new(config)
            .fit_transform(&["often often rare", "often"])
            .unwrap();
        assert_eq!(out.vocabulary.terms(), &["often"]);
    }

    #[test]
    fn test_empty_vocabulary_error() {
        let config = VectorizerConfig {
            stop_words: StopWords::custom(["only", "stop", "words"]),
            ..no_stop_words()
        };
        let err = Vectorizer::new(config)
            .fit_transform(&["only stop words"])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyVocabulary { documents: 1, .. }));
    }

    #[test]
    fn test_empty_corpus_is_empty_vocabulary() {
        let empty: [&str; 0] = [];
        let err = Vectorizer::new(no_stop_words()).fit_transform(&empty).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyVocabulary { documents: 0, .. }));
    }

    #[test]
    fn test_counts_and_tfidf_rows() {
        let out = Vectorizer::new(no_stop_words())
            .fit_transform(&["apple apple pear", "pear"])
            .unwrap();
        assert_eq!(out.counts.values()[[0, 0]], 2.0);
        assert_eq!(out.counts.values()[[0, 1]], 1.0);
        assert_eq!(out.counts.weighting(), Weighting::Counts);

        for i in 0..out.tfidf.n_rows() {
            let norm: f64 = out.tfidf.row(i).iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-12);
        }
        // apple is rarer, so it outweighs pear in document 0
        assert!(out.tfidf.values()[[0, 0]] > out.tfidf.values()[[0, 1]]);
    }

    #[test]
    fn test_smooth_idf_formula() {
        let out = Vectorizer::new(no_stop_words())
            .fit_transform(&["apple", "apple pear", "kiwi"])
            .unwrap();
        let apple = out.vocabulary.index_of("apple").unwrap();
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((out.vocabulary.idf(apple) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_max_df_rejected() {
        let config = VectorizerConfig {
            max_df: 1.5,
            ..no_stop_words()
        };
        let err = Vectorizer::new(config).fit_transform(&["a b"]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let v = Vectorizer::new(no_stop_words());
        let out = v.fit_transform(&["apple pear"]).unwrap();
        let counts = v.transform_counts(&out.vocabulary, &["apple banana apple"]);
        assert_eq!(counts.values().row(0).to_vec(), vec![2.0, 0.0]);
    }
}
