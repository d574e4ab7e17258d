// Corpus: one immutable snapshot of the articles plus the features derived
// from them.
//
// Every model in a run reads the same Corpus, so keywords, topics and events
// all index the same vocabulary and their outputs can be compared row by row.

pub mod document;

use tracing::info;

use crate::error::Result;
use crate::text::vectorizer::{FeatureMatrix, Vectorizer, VectorizerConfig, VocabularyModel};

pub use document::{Document, Sentiment};

#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<Document>,
    vocabulary: VocabularyModel,
    counts: FeatureMatrix,
    tfidf: FeatureMatrix,
    config: VectorizerConfig,
}

impl Corpus {
    /// Vectorize `documents` once and freeze the result.
    pub fn build(documents: Vec<Document>, config: &VectorizerConfig) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(Document::text).collect();
        let vectorized = Vectorizer::new(config.clone()).fit_transform(&texts)?;

        info!(
            documents = documents.len(),
            vocabulary = vectorized.vocabulary.len(),
            "Built corpus"
        );

        Ok(Self {
            documents,
            vocabulary: vectorized.vocabulary,
            counts: vectorized.counts,
            tfidf: vectorized.tfidf,
            config: config.clone(),
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary(&self) -> &VocabularyModel {
        &self.vocabulary
    }

    /// Raw term counts, the topic model's input.
    pub fn counts(&self) -> &FeatureMatrix {
        &self.counts
    }

    /// L2-normalised TF-IDF weights, used by keywords and event clustering.
    pub fn tfidf(&self) -> &FeatureMatrix {
        &self.tfidf
    }

    pub fn vectorizer_config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Row index of the article with the given id.
    pub fn position(&self, article_id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == article_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize::StopWords;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_build_keeps_row_order() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let docs = vec![
            Document::new("a", "site-a.com", ts, "Markets surge", ""),
            Document::new("b", "site-b.com", ts, "Weather turns cold", ""),
        ];
        let config = VectorizerConfig {
            stop_words: StopWords::None,
            max_df: 1.0,
            ..VectorizerConfig::default()
        };
        let corpus = Corpus::build(docs, &config).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.counts().n_rows(), 2);
        assert_eq!(corpus.tfidf().n_cols(), corpus.vocabulary().len());
        assert_eq!(corpus.position("b"), Some(1));

        let markets = corpus.vocabulary().index_of("markets").unwrap();
        assert_eq!(corpus.counts().values()[[0, markets]], 1.0);
        assert_eq!(corpus.counts().values()[[1, markets]], 0.0);
    }
}
