// Correlation engine: joins the per-article annotations of one run with the
// external traffic and geography tables and derives aggregate tables and
// Pearson coefficients.
//
// Everything here is read-only over the annotations. Groups that carry no
// usable observations are left out of their table rather than reported as
// zero.

pub mod mentions;
pub mod pearson;
pub mod stats;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::corpus::Sentiment;
use crate::pipeline::ArticleAnnotation;

pub use mentions::MentionCount;
pub use pearson::{correlate_keyed, pearson, CorrelationResult};
pub use stats::{normalize_site, Region, Spread};

/// One row of the site traffic ranking (1 = most visited).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRank {
    pub domain: String,
    pub global_rank: u64,
}

/// Country a publishing site is based in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLocation {
    pub site: String,
    /// ISO country code
    pub country: String,
    /// Country name, when the table carries one; used for mention counts
    #[serde(default)]
    pub name: Option<String>,
}

/// External tables joined against the annotations by normalised site name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalTables {
    pub traffic: Vec<TrafficRank>,
    pub geography: Vec<SiteLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarliestReporter {
    pub event: usize,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub event: usize,
    pub articles: usize,
}

/// Pairwise Pearson of the sources' per-event article counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoReportingMatrix {
    pub sources: Vec<String>,
    pub events: Vec<usize>,
    /// Row-major, `sources.len()` squared; None where undefined
    pub coefficients: Vec<Vec<Option<f64>>>,
}

impl CoReportingMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.sources.iter().position(|s| s == a)?;
        let j = self.sources.iter().position(|s| s == b)?;
        self.coefficients[i][j]
    }

    /// Number of events each coefficient was computed over.
    pub fn sample_size(&self) -> usize {
        self.events.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSentiment {
    pub group: String,
    pub mean: f64,
    pub articles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSentimentStats {
    pub source: String,
    pub mean: f64,
    pub median: f64,
    pub variance: f64,
    pub count: usize,
}

/// Share of each sentiment label within a set of articles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub scope: String,
    pub total: usize,
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl SentimentDistribution {
    fn from_labels(scope: impl Into<String>, labels: &[Sentiment]) -> Self {
        let total = labels.len();
        let share = |label: Sentiment| {
            if total == 0 {
                0.0
            } else {
                labels.iter().filter(|&&l| l == label).count() as f64 / total as f64
            }
        };
        Self {
            scope: scope.into(),
            total,
            negative: share(Sentiment::Negative),
            neutral: share(Sentiment::Neutral),
            positive: share(Sentiment::Positive),
        }
    }

    pub fn fraction(&self, label: Sentiment) -> f64 {
        match label {
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Positive => self.positive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub articles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDiversity {
    pub source: String,
    pub topics: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTrend {
    pub date: NaiveDate,
    pub topic: usize,
    pub articles: usize,
}

/// Per-source spread of body length (characters) and title length (words).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContentStats {
    pub source: String,
    pub articles: usize,
    pub content_length: Spread,
    pub title_words: Spread,
}

pub struct CorrelationEngine<'a> {
    annotations: &'a [ArticleAnnotation],
    /// normalised domain -> rank, first occurrence wins
    traffic: BTreeMap<String, u64>,
    /// normalised site -> country code
    geography: BTreeMap<String, String>,
    /// Country names listed in the geography table
    country_names: BTreeSet<String>,
}

impl<'a> CorrelationEngine<'a> {
    pub fn new(annotations: &'a [ArticleAnnotation], tables: &ExternalTables) -> Self {
        let mut traffic = BTreeMap::new();
        for row in &tables.traffic {
            traffic
                .entry(normalize_site(&row.domain))
                .or_insert(row.global_rank);
        }
        let mut geography = BTreeMap::new();
        for row in &tables.geography {
            geography
                .entry(normalize_site(&row.site))
                .or_insert_with(|| row.country.trim().to_ascii_uppercase());
        }

        let country_names = tables
            .geography
            .iter()
            .filter_map(|row| row.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let engine = Self {
            annotations,
            traffic,
            geography,
            country_names,
        };

        if !engine.traffic.is_empty() {
            let unmatched = engine
                .sources()
                .into_iter()
                .filter(|s| !engine.traffic.contains_key(s))
                .count();
            if unmatched > 0 {
                warn!(unmatched, "Sources without a traffic rank");
            }
        }
        info!(
            articles = annotations.len(),
            traffic_rows = engine.traffic.len(),
            geography_rows = engine.geography.len(),
            "Correlation engine ready"
        );
        engine
    }

    /// Distinct normalised source names, ascending.
    pub fn sources(&self) -> BTreeSet<String> {
        self.annotations
            .iter()
            .map(|a| normalize_site(&a.source))
            .collect()
    }

    /// Distinct event ids present in the run, ascending.
    pub fn events(&self) -> Vec<usize> {
        self.annotations
            .iter()
            .map(|a| a.event)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Source that published first on each event. Equal timestamps go to the
    /// alphabetically first source.
    pub fn earliest_reporters(&self) -> Vec<EarliestReporter> {
        let mut first_by_pair: BTreeMap<(usize, String), DateTime<Utc>> = BTreeMap::new();
        for a in self.annotations {
            let key = (a.event, normalize_site(&a.source));
            first_by_pair
                .entry(key)
                .and_modify(|t| *t = (*t).min(a.published_at))
                .or_insert(a.published_at);
        }

        let mut earliest: BTreeMap<usize, (String, DateTime<Utc>)> = BTreeMap::new();
        // Pairs iterate source-ascending within an event; only a strictly
        // earlier timestamp replaces the current pick.
        for ((event, source), ts) in first_by_pair {
            match earliest.get(&event) {
                Some((_, best)) if *best <= ts => {}
                _ => {
                    earliest.insert(event, (source, ts));
                }
            }
        }

        earliest
            .into_iter()
            .map(|(event, (source, published_at))| EarliestReporter {
                event,
                source,
                published_at,
            })
            .collect()
    }

    /// Articles per event, largest first (ties by event id).
    pub fn event_article_counts(&self) -> Vec<EventCount> {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for a in self.annotations {
            *counts.entry(a.event).or_default() += 1;
        }
        let mut rows: Vec<EventCount> = counts
            .into_iter()
            .map(|(event, articles)| EventCount { event, articles })
            .collect();
        rows.sort_by(|a, b| b.articles.cmp(&a.articles).then(a.event.cmp(&b.event)));
        rows
    }

    pub fn co_reporting_matrix(&self) -> CoReportingMatrix {
        let events = self.events();
        let sources: Vec<String> = self.sources().into_iter().collect();

        let mut counts: BTreeMap<(&str, usize), f64> = BTreeMap::new();
        let normalized: Vec<String> = self
            .annotations
            .iter()
            .map(|a| normalize_site(&a.source))
            .collect();
        for (a, source) in self.annotations.iter().zip(&normalized) {
            *counts.entry((source.as_str(), a.event)).or_default() += 1.0;
        }

        let vectors: Vec<Vec<f64>> = sources
            .iter()
            .map(|s| {
                events
                    .iter()
                    .map(|&e| counts.get(&(s.as_str(), e)).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let coefficients = vectors
            .iter()
            .map(|x| vectors.iter().map(|y| pearson(x, y)).collect())
            .collect();

        CoReportingMatrix {
            sources,
            events,
            coefficients,
        }
    }

    /// Per-event mean sentiment against per-event article count.
    pub fn sentiment_vs_volume(&self) -> CorrelationResult {
        let mut scores: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        let mut volume: BTreeMap<usize, f64> = BTreeMap::new();
        for a in self.annotations {
            *volume.entry(a.event).or_default() += 1.0;
            if let Some(s) = a.sentiment {
                scores.entry(a.event).or_default().push(s.score());
            }
        }
        let mean_sentiment: BTreeMap<usize, f64> = scores
            .into_iter()
            .filter_map(|(event, v)| stats::mean(&v).map(|m| (event, m)))
            .collect();

        correlate_keyed(
            "event_mean_sentiment",
            "event_article_count",
            &mean_sentiment,
            &volume,
        )
    }

    /// Per-source traffic rank against per-source article count.
    pub fn traffic_vs_volume(&self) -> CorrelationResult {
        let volume = self.source_volume();
        let rank: BTreeMap<String, f64> = volume
            .keys()
            .filter_map(|s| self.traffic.get(s).map(|&r| (s.clone(), r as f64)))
            .collect();

        correlate_keyed("traffic_rank", "source_article_count", &rank, &volume)
    }

    pub fn mean_sentiment_by_category(&self) -> Vec<GroupSentiment> {
        self.group_sentiment(|a| a.category.clone())
    }

    pub fn mean_sentiment_by_country(&self) -> Vec<GroupSentiment> {
        self.group_sentiment(|a| self.country_of(a))
    }

    pub fn mean_sentiment_by_region(&self) -> Vec<GroupSentiment> {
        self.group_sentiment(|a| {
            self.country_of(a)
                .map(|c| Region::from_country(&c).as_str().to_string())
        })
    }

    pub fn mean_sentiment_by_topic(&self) -> Vec<GroupSentiment> {
        self.group_sentiment(|a| Some(a.topic.to_string()))
    }

    /// Mean, median and population variance of sentiment per source.
    pub fn sentiment_stats_by_source(&self) -> Vec<SourceSentimentStats> {
        let mut scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for a in self.annotations {
            if let Some(s) = a.sentiment {
                scores
                    .entry(normalize_site(&a.source))
                    .or_default()
                    .push(s.score());
            }
        }
        scores
            .into_iter()
            .filter_map(|(source, v)| {
                Some(SourceSentimentStats {
                    mean: stats::mean(&v)?,
                    median: stats::median(&v)?,
                    variance: stats::variance(&v)?,
                    count: v.len(),
                    source,
                })
            })
            .collect()
    }

    pub fn sentiment_distribution(&self) -> SentimentDistribution {
        let labels: Vec<Sentiment> = self.annotations.iter().filter_map(|a| a.sentiment).collect();
        SentimentDistribution::from_labels("all sources", &labels)
    }

    /// Label shares restricted to the `n` highest-traffic sites.
    pub fn sentiment_distribution_top_sites(&self, n: usize) -> SentimentDistribution {
        let top: BTreeSet<String> = self
            .top_sites_by_traffic(n)
            .into_iter()
            .map(|t| t.domain)
            .collect();
        let labels: Vec<Sentiment> = self
            .annotations
            .iter()
            .filter(|a| top.contains(&normalize_site(&a.source)))
            .filter_map(|a| a.sentiment)
            .collect();
        SentimentDistribution::from_labels(format!("top {n} sites by traffic"), &labels)
    }

    /// Most prolific sources, ties by name.
    pub fn top_sources_by_article_count(&self, n: usize) -> Vec<SourceCount> {
        let mut rows: Vec<SourceCount> = self
            .source_volume()
            .into_iter()
            .map(|(source, count)| SourceCount {
                source,
                articles: count as usize,
            })
            .collect();
        rows.sort_by(|a, b| b.articles.cmp(&a.articles).then(a.source.cmp(&b.source)));
        rows.truncate(n);
        rows
    }

    /// Best-ranked sites of the traffic table (lowest rank first).
    pub fn top_sites_by_traffic(&self, n: usize) -> Vec<TrafficRank> {
        let mut rows: Vec<TrafficRank> = self
            .traffic
            .iter()
            .map(|(domain, &global_rank)| TrafficRank {
                domain: domain.clone(),
                global_rank,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.global_rank
                .cmp(&b.global_rank)
                .then(a.domain.cmp(&b.domain))
        });
        rows.truncate(n);
        rows
    }

    /// Distinct topics each source wrote about, broadest first.
    pub fn topic_diversity(&self) -> Vec<TopicDiversity> {
        let mut topics: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for a in self.annotations {
            topics
                .entry(normalize_site(&a.source))
                .or_default()
                .insert(a.topic);
        }
        let mut rows: Vec<TopicDiversity> = topics
            .into_iter()
            .map(|(source, set)| TopicDiversity {
                source,
                topics: set.len(),
            })
            .collect();
        rows.sort_by(|a, b| b.topics.cmp(&a.topics).then(a.source.cmp(&b.source)));
        rows
    }

    /// Article counts per (publication date, topic), chronological.
    pub fn topic_trends(&self) -> Vec<TopicTrend> {
        let mut counts: BTreeMap<(NaiveDate, usize), usize> = BTreeMap::new();
        for a in self.annotations {
            *counts
                .entry((a.published_at.date_naive(), a.topic))
                .or_default() += 1;
        }
        counts
            .into_iter()
            .map(|((date, topic), articles)| TopicTrend {
                date,
                topic,
                articles,
            })
            .collect()
    }

    /// Articles whose title or body names each country of the geography
    /// table (whole words, any case), most mentioned first. Countries no
    /// article mentions are listed with zero.
    pub fn country_mention_counts(&self) -> Vec<MentionCount> {
        let rows = self
            .country_names
            .iter()
            .filter_map(|name| {
                let pattern = mentions::mention_pattern(name, true)?;
                Some(MentionCount {
                    name: name.clone(),
                    articles: self.count_matching(|text| pattern.is_match(text)),
                })
            })
            .collect();
        mentions::rank(rows)
    }

    /// Articles covering each region. Africa, EU and Middle East count
    /// articles naming any site located there; US, China, Russia and Ukraine
    /// count articles naming the country itself.
    pub fn region_mention_counts(&self) -> Vec<MentionCount> {
        let mut sites: BTreeMap<Region, Vec<regex_lite::Regex>> = BTreeMap::new();
        for (site, code) in &self.geography {
            for region in Region::all_for_country(code) {
                if let Some(pattern) = mentions::mention_pattern(site, true) {
                    sites.entry(region).or_default().push(pattern);
                }
            }
        }

        let mut rows = Vec::new();
        for region in [Region::Africa, Region::Eu, Region::MiddleEast] {
            let patterns = sites.get(&region).map(Vec::as_slice).unwrap_or_default();
            rows.push(MentionCount {
                name: region.as_str().to_string(),
                articles: self.count_matching(|text| patterns.iter().any(|p| p.is_match(text))),
            });
        }
        for &(name, case_insensitive) in mentions::NAMED_REGIONS {
            if let Some(pattern) = mentions::mention_pattern(name, case_insensitive) {
                rows.push(MentionCount {
                    name: name.to_string(),
                    articles: self.count_matching(|text| pattern.is_match(text)),
                });
            }
        }
        mentions::rank(rows)
    }

    /// Body length and title word count per source, ascending by source.
    pub fn content_stats_by_source(&self) -> Vec<SourceContentStats> {
        let mut lengths: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
        for a in self.annotations {
            let entry = lengths.entry(normalize_site(&a.source)).or_default();
            entry.0.push(a.body.chars().count() as f64);
            entry.1.push(a.title.split_whitespace().count() as f64);
        }
        lengths
            .into_iter()
            .filter_map(|(source, (content, titles))| {
                Some(SourceContentStats {
                    articles: content.len(),
                    content_length: stats::spread(&content)?,
                    title_words: stats::spread(&titles)?,
                    source,
                })
            })
            .collect()
    }

    fn count_matching<F: Fn(&str) -> bool>(&self, matches: F) -> usize {
        self.annotations
            .iter()
            .filter(|a| matches(&a.title) || matches(&a.body))
            .count()
    }

    fn source_volume(&self) -> BTreeMap<String, f64> {
        let mut volume: BTreeMap<String, f64> = BTreeMap::new();
        for a in self.annotations {
            *volume.entry(normalize_site(&a.source)).or_default() += 1.0;
        }
        volume
    }

    /// Country from the article itself, else from the geography table.
    fn country_of(&self, a: &ArticleAnnotation) -> Option<String> {
        a.geography
            .as_ref()
            .map(|c| c.trim().to_ascii_uppercase())
            .or_else(|| self.geography.get(&normalize_site(&a.source)).cloned())
    }

    fn group_sentiment<F>(&self, key: F) -> Vec<GroupSentiment>
    where
        F: Fn(&ArticleAnnotation) -> Option<String>,
    {
        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for a in self.annotations {
            let (Some(sentiment), Some(group)) = (a.sentiment, key(a)) else {
                continue;
            };
            groups.entry(group).or_default().push(sentiment.score());
        }
        groups
            .into_iter()
            .filter_map(|(group, v)| {
                Some(GroupSentiment {
                    mean: stats::mean(&v)?,
                    articles: v.len(),
                    group,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ann(
        id: &str,
        source: &str,
        hour: u32,
        event: usize,
        sentiment: Sentiment,
    ) -> ArticleAnnotation {
        ArticleAnnotation {
            article_id: id.to_string(),
            source: source.to_string(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            title: String::new(),
            body: String::new(),
            category: None,
            geography: None,
            topic: event,
            event,
            sentiment: Some(sentiment),
            keywords: Vec::new(),
        }
    }

    #[test]
    fn test_earliest_reporter_tie_goes_to_first_name() {
        let rows = vec![
            ann("1", "zeta.com", 3, 0, Sentiment::Neutral),
            ann("2", "alpha.com", 3, 0, Sentiment::Neutral),
            ann("3", "beta.com", 5, 0, Sentiment::Neutral),
        ];
        let engine = CorrelationEngine::new(&rows, &ExternalTables::default());
        let earliest = engine.earliest_reporters();
        assert_eq!(earliest.len(), 1);
        assert_eq!(earliest[0].source, "alpha.com");
    }

    #[test]
    fn test_www_prefix_joins_traffic() {
        let rows = vec![
            ann("1", "www.Alpha.com", 1, 0, Sentiment::Positive),
            ann("2", "beta.com", 1, 0, Sentiment::Negative),
        ];
        let tables = ExternalTables {
            traffic: vec![
                TrafficRank {
                    domain: "alpha.com".into(),
                    global_rank: 5,
                },
                TrafficRank {
                    domain: "beta.com".into(),
                    global_rank: 50,
                },
            ],
            geography: Vec::new(),
        };
        let engine = CorrelationEngine::new(&rows, &tables);
        let dist = engine.sentiment_distribution_top_sites(1);
        assert_eq!(dist.total, 1);
        assert_eq!(dist.positive, 1.0);
    }

    #[test]
    fn test_region_from_geography_table() {
        let rows = vec![ann("1", "news.ng", 1, 0, Sentiment::Negative)];
        let tables = ExternalTables {
            traffic: Vec::new(),
            geography: vec![SiteLocation {
                site: "news.ng".into(),
                country: "ng".into(),
                name: None,
            }],
        };
        let engine = CorrelationEngine::new(&rows, &tables);
        let by_region = engine.mean_sentiment_by_region();
        assert_eq!(by_region[0].group, "Africa");
        assert_eq!(by_region[0].mean, -1.0);
    }

    #[test]
    fn test_articles_without_sentiment_are_skipped() {
        let mut rows = vec![ann("1", "a.com", 1, 0, Sentiment::Positive)];
        rows.push(ArticleAnnotation {
            sentiment: None,
            ..ann("2", "a.com", 2, 0, Sentiment::Positive)
        });
        let engine = CorrelationEngine::new(&rows, &ExternalTables::default());
        let stats = engine.sentiment_stats_by_source();
        assert_eq!(stats[0].count, 1);
        assert_eq!(engine.sentiment_distribution().total, 1);
    }
}
