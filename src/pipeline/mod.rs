// Analysis pipeline: one corpus snapshot in, keywords, topics and events out.
//
// The corpus is vectorized once. Keyword extraction and event clustering read
// its TF-IDF matrix and the topic model reads its count matrix, so every
// per-article annotation refers to the same vocabulary.

pub mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{Corpus, Document, Sentiment};
use crate::error::Result;
use crate::events::{ClusterConfig, EventCluster, EventClusterer};
use crate::text::keywords::KeywordExtractor;
use crate::text::vectorizer::VectorizerConfig;
use crate::topics::{Topic, TopicAssignment, TopicModel, TopicModelConfig};

pub use report::Report;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub vectorizer: VectorizerConfig,
    pub topics: TopicModelConfig,
    pub clusters: ClusterConfig,
    /// Keywords kept per article
    pub keywords: usize,
    /// Terms listed per topic
    pub topic_terms: usize,
    /// Size of the "top N" correlation tables
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            topics: TopicModelConfig::default(),
            clusters: ClusterConfig::default(),
            keywords: 5,
            topic_terms: 10,
            top_n: 10,
        }
    }
}

/// Everything the run derived for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnnotation {
    pub article_id: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    /// Full article text, searched for country and region mentions
    pub body: String,
    pub category: Option<String>,
    pub geography: Option<String>,
    pub topic: usize,
    pub event: usize,
    pub sentiment: Option<Sentiment>,
    pub keywords: Vec<String>,
}

/// Fitted models and their per-article outputs for one run.
pub struct Analysis {
    pub corpus: Corpus,
    pub topic_model: TopicModel,
    pub clusterer: EventClusterer,
    pub topics: Vec<Topic>,
    pub assignments: Vec<TopicAssignment>,
    pub annotations: Vec<ArticleAnnotation>,
}

impl Analysis {
    pub fn events(&self) -> Vec<EventCluster> {
        self.clusterer.clusters()
    }
}

/// Vectorize `documents` and fit every model over the shared corpus.
pub fn run(documents: Vec<Document>, config: &PipelineConfig) -> Result<Analysis> {
    let corpus = Corpus::build(documents, &config.vectorizer)?;
    analyze(corpus, config)
}

/// Fit every model over an already built corpus.
pub fn analyze(corpus: Corpus, config: &PipelineConfig) -> Result<Analysis> {
    let keywords =
        KeywordExtractor::new(config.keywords).extract(corpus.tfidf(), corpus.vocabulary());

    let topic_model = TopicModel::fit_corpus(&corpus, &config.topics)?;
    let assignments = topic_model.assignments();
    let topics = topic_model.topics(corpus.vocabulary(), config.topic_terms);

    let clusterer = EventClusterer::fit_corpus(&corpus, &config.clusters)?;

    let annotations: Vec<ArticleAnnotation> = corpus
        .documents()
        .iter()
        .zip(keywords)
        .zip(assignments.iter().zip(clusterer.labels()))
        .map(|((doc, keywords), (assignment, &event))| ArticleAnnotation {
            article_id: doc.id.clone(),
            source: doc.source.clone(),
            published_at: doc.published_at,
            title: doc.title.clone(),
            body: doc.body.clone(),
            category: doc.category.clone(),
            geography: doc.geography.clone(),
            topic: assignment.topic,
            event,
            sentiment: doc.sentiment,
            keywords,
        })
        .collect();

    info!(
        articles = annotations.len(),
        topics = topic_model.n_topics(),
        events = clusterer.n_clusters(),
        "Pipeline complete"
    );

    Ok(Analysis {
        corpus,
        topic_model,
        clusterer,
        topics,
        assignments,
        annotations,
    })
}
