// Report: every correlation table of one run, bundled for rendering and
// JSON export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Analysis;
use crate::correlation::{
    CoReportingMatrix, CorrelationEngine, CorrelationResult, EarliestReporter, EventCount,
    ExternalTables, GroupSentiment, MentionCount, SentimentDistribution, SourceContentStats,
    SourceCount, SourceSentimentStats, TopicDiversity, TopicTrend, TrafficRank,
};
use crate::topics::Topic;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub articles: usize,
    pub vocabulary_size: usize,
    pub topic_iterations: usize,
    pub event_inertia: f64,
    pub topics: Vec<Topic>,
    pub event_article_counts: Vec<EventCount>,
    pub earliest_reporters: Vec<EarliestReporter>,
    pub co_reporting: CoReportingMatrix,
    pub sentiment_vs_volume: CorrelationResult,
    pub traffic_vs_volume: CorrelationResult,
    pub sentiment_by_category: Vec<GroupSentiment>,
    pub sentiment_by_country: Vec<GroupSentiment>,
    pub sentiment_by_region: Vec<GroupSentiment>,
    pub sentiment_by_topic: Vec<GroupSentiment>,
    pub sentiment_by_source: Vec<SourceSentimentStats>,
    pub sentiment_distribution: SentimentDistribution,
    pub sentiment_distribution_top_sites: SentimentDistribution,
    pub top_sources: Vec<SourceCount>,
    pub top_sites: Vec<TrafficRank>,
    pub topic_diversity: Vec<TopicDiversity>,
    pub topic_trends: Vec<TopicTrend>,
    // Added after the first stored runs; older reports load with these empty
    #[serde(default)]
    pub most_mentioned_countries: Vec<MentionCount>,
    /// Least mentioned first
    #[serde(default)]
    pub least_mentioned_countries: Vec<MentionCount>,
    #[serde(default)]
    pub region_mentions: Vec<MentionCount>,
    #[serde(default)]
    pub content_by_source: Vec<SourceContentStats>,
}

impl Report {
    pub fn build(analysis: &Analysis, tables: &ExternalTables, top_n: usize) -> Self {
        let engine = CorrelationEngine::new(&analysis.annotations, tables);
        let countries = engine.country_mention_counts();

        Self {
            generated_at: Utc::now(),
            articles: analysis.corpus.len(),
            vocabulary_size: analysis.corpus.vocabulary().len(),
            topic_iterations: analysis.topic_model.iterations(),
            event_inertia: analysis.clusterer.inertia(),
            topics: analysis.topics.clone(),
            event_article_counts: engine.event_article_counts(),
            earliest_reporters: engine.earliest_reporters(),
            co_reporting: engine.co_reporting_matrix(),
            sentiment_vs_volume: engine.sentiment_vs_volume(),
            traffic_vs_volume: engine.traffic_vs_volume(),
            sentiment_by_category: engine.mean_sentiment_by_category(),
            sentiment_by_country: engine.mean_sentiment_by_country(),
            sentiment_by_region: engine.mean_sentiment_by_region(),
            sentiment_by_topic: engine.mean_sentiment_by_topic(),
            sentiment_by_source: engine.sentiment_stats_by_source(),
            sentiment_distribution: engine.sentiment_distribution(),
            sentiment_distribution_top_sites: engine.sentiment_distribution_top_sites(top_n),
            top_sources: engine.top_sources_by_article_count(top_n),
            top_sites: engine.top_sites_by_traffic(top_n),
            topic_diversity: engine.topic_diversity(),
            topic_trends: engine.topic_trends(),
            most_mentioned_countries: countries.iter().take(top_n).cloned().collect(),
            least_mentioned_countries: countries.iter().rev().take(top_n).cloned().collect(),
            region_mentions: engine.region_mention_counts(),
            content_by_source: engine.content_stats_by_source(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
