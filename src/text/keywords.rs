// Per-document keywords: the n highest TF-IDF terms of each row.

use std::cmp::Ordering;

use super::vectorizer::{FeatureMatrix, VocabularyModel};

/// Top-n term extraction over a fitted TF-IDF matrix.
#[derive(Debug, Clone, Copy)]
pub struct KeywordExtractor {
    pub n: usize,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self { n: 5 }
    }
}

impl KeywordExtractor {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Keywords for every document, in row order.
    pub fn extract(&self, tfidf: &FeatureMatrix, vocabulary: &VocabularyModel) -> Vec<Vec<String>> {
        (0..tfidf.n_rows())
            .map(|row| self.extract_row(tfidf, vocabulary, row))
            .collect()
    }

    /// Keywords of one document, strongest first. Equal weights fall back to
    /// vocabulary order so the result does not depend on float summation order.
    /// Never padded: a row with fewer than `n` nonzero terms returns all of them.
    pub fn extract_row(
        &self,
        tfidf: &FeatureMatrix,
        vocabulary: &VocabularyModel,
        row: usize,
    ) -> Vec<String> {
        self.ranked_row(tfidf, row)
            .into_iter()
            .filter_map(|(col, _)| vocabulary.term(col).map(str::to_string))
            .collect()
    }

    /// (column, weight) pairs behind `extract_row`.
    pub fn ranked_row(&self, tfidf: &FeatureMatrix, row: usize) -> Vec<(usize, f64)> {
        if self.n == 0 {
            return Vec::new();
        }
        let mut entries: Vec<(usize, f64)> = tfidf.nonzero(row).collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        entries.truncate(self.n);
        entries
    }
}
