// Unit tests for the two models over a shared corpus: LDA topics and k-means
// events. Topic and cluster ids are arbitrary labels, so assertions compare
// partitions or repeated fits with the same seed, never ids across seeds.

use chrono::{TimeZone, Utc};
use newsprism::corpus::{Corpus, Document};
use newsprism::error::AnalysisError;
use newsprism::events::{ClusterConfig, EventClusterer};
use newsprism::text::tokenize::StopWords;
use newsprism::text::vectorizer::VectorizerConfig;
use newsprism::topics::{TopicModel, TopicModelConfig};

fn corpus(texts: &[&str]) -> Corpus {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let docs = texts
        .iter()
        .enumerate()
        .map(|(i, t)| Document::new(format!("doc{i}"), "wire.example", ts, *t, ""))
        .collect();
    let config = VectorizerConfig {
        max_df: 1.0,
        stop_words: StopWords::custom(["and", "as", "the", "to"]),
        ..VectorizerConfig::default()
    };
    Corpus::build(docs, &config).unwrap()
}

fn news_corpus() -> Corpus {
    corpus(&[
        "central bank raises interest rates to fight inflation",
        "inflation data pushes bank to hold interest rates",
        "rates decision lifts bank shares and bond yields",
        "storm floods coastal towns and forces evacuations",
        "coastal storm damage grows as floods spread inland",
        "evacuations ordered as storm approaches the coast",
    ])
}

fn topic_config(k: usize, seed: u64) -> TopicModelConfig {
    TopicModelConfig {
        n_topics: k,
        seed,
        ..TopicModelConfig::default()
    }
}

fn cluster_config(k: usize, seed: u64) -> ClusterConfig {
    ClusterConfig {
        n_clusters: k,
        seed,
        ..ClusterConfig::default()
    }
}

// ============================================================
// TopicModel
// ============================================================

#[test]
fn topic_model_is_deterministic_for_a_seed() {
    let c = news_corpus();
    let a = TopicModel::fit_corpus(&c, &topic_config(2, 11)).unwrap();
    let b = TopicModel::fit_corpus(&c, &topic_config(2, 11)).unwrap();

    assert_eq!(a.iterations(), b.iterations());
    assert_eq!(a.log_likelihood().to_bits(), b.log_likelihood().to_bits());
    for d in 0..c.len() {
        assert_eq!(a.document_distribution(d), b.document_distribution(d));
    }
    assert_eq!(a.assignments(), b.assignments());
}

#[test]
fn topic_distributions_are_probability_vectors() {
    let c = news_corpus();
    let model = TopicModel::fit_corpus(&c, &topic_config(3, 5)).unwrap();

    for t in 0..model.n_topics() {
        let sum: f64 = model.topic_term_distribution(t).sum();
        assert!((sum - 1.0).abs() < 1e-9, "topic {t} sums to {sum}");
    }
    for assignment in model.assignments() {
        let sum: f64 = assignment.distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(assignment.topic < 3);
    }
}

#[test]
fn twenty_topics_over_five_documents_is_insufficient() {
    let c = corpus(&[
        "markets rally on earnings",
        "storm hits the coast",
        "election results announced",
        "new vaccine approved",
        "team wins the final",
    ]);
    let err = TopicModel::fit_corpus(&c, &topic_config(20, 42)).unwrap_err();
    match err {
        AnalysisError::InsufficientData {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 20);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }
}

#[test]
fn duplicate_documents_do_not_count_as_distinct() {
    let c = corpus(&["same story", "same story", "same story"]);
    let err = TopicModel::fit_corpus(&c, &topic_config(2, 42)).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { available: 1, .. }));
}

#[test]
fn topic_model_rejects_tfidf_input() {
    let c = news_corpus();
    let err = TopicModel::fit(c.tfidf(), &topic_config(2, 42)).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}

#[test]
fn top_terms_come_from_the_shared_vocabulary() {
    let c = news_corpus();
    let model = TopicModel::fit_corpus(&c, &topic_config(2, 42)).unwrap();
    for topic in model.topics(c.vocabulary(), 5) {
        assert_eq!(topic.top_terms.len(), 5);
        for (term, p) in &topic.top_terms {
            assert!(c.vocabulary().index_of(term).is_some());
            assert!(*p > 0.0);
        }
    }
}

#[test]
fn transform_of_training_rows_gives_valid_distributions() {
    let c = news_corpus();
    let model = TopicModel::fit_corpus(&c, &topic_config(2, 42)).unwrap();
    let inferred = model.transform(c.counts()).unwrap();
    assert_eq!(inferred.len(), c.len());
    for a in inferred {
        let sum: f64 = a.distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

// ============================================================
// EventClusterer
// ============================================================

#[test]
fn clustering_separates_the_two_stories() {
    let c = news_corpus();
    let fit = EventClusterer::fit_corpus(&c, &cluster_config(2, 42)).unwrap();
    let l = fit.labels();
    assert_eq!(l[0], l[1]);
    assert_eq!(l[1], l[2]);
    assert_eq!(l[3], l[4]);
    assert_eq!(l[4], l[5]);
    assert_ne!(l[0], l[3]);
}

#[test]
fn clustering_is_deterministic_for_a_seed() {
    let c = news_corpus();
    let a = EventClusterer::fit_corpus(&c, &cluster_config(3, 9)).unwrap();
    let b = EventClusterer::fit_corpus(&c, &cluster_config(3, 9)).unwrap();
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.centroids(), b.centroids());
    assert_eq!(a.inertia().to_bits(), b.inertia().to_bits());
}

#[test]
fn partition_is_stable_across_seeds_even_if_ids_are_not() {
    let c = news_corpus();
    let a = EventClusterer::fit_corpus(&c, &cluster_config(2, 1)).unwrap();
    let b = EventClusterer::fit_corpus(&c, &cluster_config(2, 2)).unwrap();

    // Compare "same cluster" relations instead of raw ids
    let (la, lb) = (a.labels(), b.labels());
    for i in 0..c.len() {
        for j in 0..c.len() {
            assert_eq!(la[i] == la[j], lb[i] == lb[j], "pair ({i}, {j})");
        }
    }
}

#[test]
fn every_document_belongs_to_exactly_one_event() {
    let c = news_corpus();
    let fit = EventClusterer::fit_corpus(&c, &cluster_config(3, 42)).unwrap();
    let clusters = fit.clusters();
    assert_eq!(clusters.len(), 3);

    let mut members: Vec<usize> = clusters.iter().flat_map(|e| e.members.clone()).collect();
    members.sort();
    assert_eq!(members, (0..c.len()).collect::<Vec<_>>());

    let ids = clusters[fit.labels()[0]].article_ids(&c);
    assert!(ids.contains(&"doc0"));
}

#[test]
fn more_clusters_than_documents_is_insufficient() {
    let c = corpus(&["one story", "another story"]);
    let err = EventClusterer::fit_corpus(&c, &cluster_config(5, 42)).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::InsufficientData {
            requested: 5,
            available: 2,
            ..
        }
    ));
}

#[test]
fn zero_clusters_is_invalid() {
    let c = news_corpus();
    let err = EventClusterer::fit_corpus(&c, &cluster_config(0, 42)).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}
