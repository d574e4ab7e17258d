// Data models: rows read back from the database.
//
// Kept apart from the queries so other modules can use them without
// depending on rusqlite directly.

use serde::{Deserialize, Serialize};

/// Summary row of one stored analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub articles: i64,
    pub vocabulary_size: i64,
    pub n_topics: i64,
    pub n_events: i64,
    pub seed: i64,
    pub created_at: String,
}

/// One article with the labels the run assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub article_id: String,
    pub source: String,
    pub published_at: String,
    pub title: String,
    pub sentiment: Option<String>,
    pub topic_id: i64,
    pub event_id: i64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: i64,
    pub article_count: i64,
    pub earliest_source: Option<String>,
    pub earliest_at: Option<String>,
}
