// Database queries: reads and writes for analysis runs.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use super::models::{RunSummary, StoredArticle, StoredEvent};
use crate::pipeline::{Analysis, Report};

// --- Runs ---

/// Store one complete run: articles, topic keywords, events, features and
/// the serialized report. Returns the new run id.
pub fn save_run(
    conn: &Connection,
    analysis: &Analysis,
    report: &Report,
    seed: u64,
) -> Result<i64> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to start transaction for run")?;

    let report_json = serde_json::to_string(report)?;
    tx.execute(
        "INSERT INTO runs (articles, vocabulary_size, n_topics, n_events, seed, report_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            analysis.corpus.len() as i64,
            analysis.corpus.vocabulary().len() as i64,
            analysis.topic_model.n_topics() as i64,
            analysis.clusterer.n_clusters() as i64,
            seed as i64,
            report_json,
        ],
    )?;
    let run_id = tx.last_insert_rowid();

    {
        let mut insert_article = tx.prepare(
            "INSERT INTO articles (run_id, article_id, source, published_at, title, category, sentiment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let mut insert_topic = tx.prepare(
            "INSERT INTO topics (run_id, article_id, topic_id, topic_label, keywords)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut insert_features = tx.prepare(
            "INSERT INTO features (run_id, article_id, tfidf, topic_id, event_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;

        let documents = analysis.corpus.documents();
        for (row, (doc, ann)) in documents.iter().zip(&analysis.annotations).enumerate() {
            insert_article.execute(params![
                run_id,
                doc.id,
                doc.source,
                doc.published_at.to_rfc3339(),
                doc.title,
                doc.category,
                doc.sentiment.map(|s| s.as_str()),
            ])?;

            let label = analysis
                .topics
                .get(ann.topic)
                .map(|t| t.label())
                .unwrap_or_default();
            insert_topic.execute(params![
                run_id,
                ann.article_id,
                ann.topic as i64,
                label,
                serde_json::to_string(&ann.keywords)?,
            ])?;

            let tfidf = analysis.corpus.tfidf().row(row).to_vec();
            insert_features.execute(params![
                run_id,
                ann.article_id,
                serde_json::to_string(&tfidf)?,
                ann.topic as i64,
                ann.event as i64,
            ])?;
        }

        let mut insert_event = tx.prepare(
            "INSERT INTO events (run_id, event_id, article_count, earliest_source, earliest_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for cluster in analysis.events() {
            let earliest = report
                .earliest_reporters
                .iter()
                .find(|e| e.event == cluster.id);
            insert_event.execute(params![
                run_id,
                cluster.id as i64,
                cluster.members.len() as i64,
                earliest.map(|e| e.source.as_str()),
                earliest.map(|e| e.published_at.to_rfc3339()),
            ])?;
        }
    }

    tx.commit().context("Failed to commit run")?;
    Ok(run_id)
}

/// Most recent run, if any.
pub fn latest_run(conn: &Connection) -> Result<Option<RunSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, articles, vocabulary_size, n_topics, n_events, seed, created_at
         FROM runs ORDER BY id DESC LIMIT 1",
    )?;
    let result = stmt
        .query_row([], |row| {
            Ok(RunSummary {
                id: row.get(0)?,
                articles: row.get(1)?,
                vocabulary_size: row.get(2)?,
                n_topics: row.get(3)?,
                n_events: row.get(4)?,
                seed: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(result)
}

pub fn run_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
    Ok(count)
}

/// Number of articles stored for a run.
pub fn article_count(conn: &Connection, run_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM articles WHERE run_id = ?1",
        params![run_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Delete every run except the newest `keep`. Articles, topics, events and
/// features go with their run through the foreign keys. Returns the number
/// of runs removed.
pub fn prune_runs(conn: &Connection, keep: usize) -> Result<usize> {
    let removed = conn
        .execute(
            "DELETE FROM runs WHERE id NOT IN (
                 SELECT id FROM runs ORDER BY id DESC LIMIT ?1
             )",
            params![keep as i64],
        )
        .context("Failed to prune runs")?;
    Ok(removed)
}

/// Load the serialized report of a run (None for runs stored without one).
pub fn load_report(conn: &Connection, run_id: i64) -> Result<Option<Report>> {
    let json: Option<Option<String>> = conn
        .query_row(
            "SELECT report_json FROM runs WHERE id = ?1",
            params![run_id],
            |row| row.get(0),
        )
        .optional()?;

    match json.flatten() {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Articles of a run with their topic, event and keywords, in publication
/// order.
pub fn get_articles(conn: &Connection, run_id: i64) -> Result<Vec<StoredArticle>> {
    let mut stmt = conn.prepare(
        "SELECT a.article_id, a.source, a.published_at, a.title, a.sentiment,
                t.topic_id, f.event_id, t.keywords
         FROM articles a
         JOIN topics t ON t.run_id = a.run_id AND t.article_id = a.article_id
         JOIN features f ON f.run_id = a.run_id AND f.article_id = a.article_id
         WHERE a.run_id = ?1
         ORDER BY a.published_at, a.article_id",
    )?;

    let rows = stmt.query_map(params![run_id], |row| {
        let keywords_json: String = row.get(7)?;
        let keywords: Vec<String> = serde_json::from_str(&keywords_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(StoredArticle {
            article_id: row.get(0)?,
            source: row.get(1)?,
            published_at: row.get(2)?,
            title: row.get(3)?,
            sentiment: row.get(4)?,
            topic_id: row.get(5)?,
            event_id: row.get(6)?,
            keywords,
        })
    })?;

    let mut articles = Vec::new();
    for row in rows {
        articles.push(row?);
    }
    Ok(articles)
}

/// Events of a run, largest first.
pub fn get_events(conn: &Connection, run_id: i64) -> Result<Vec<StoredEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, article_count, earliest_source, earliest_at
         FROM events WHERE run_id = ?1
         ORDER BY article_count DESC, event_id",
    )?;
    let rows = stmt.query_map(params![run_id], |row| {
        Ok(StoredEvent {
            event_id: row.get(0)?,
            article_count: row.get(1)?,
            earliest_source: row.get(2)?,
            earliest_at: row.get(3)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Stored TF-IDF vector of one article.
pub fn get_features(
    conn: &Connection,
    run_id: i64,
    article_id: &str,
) -> Result<Option<Vec<f64>>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT tfidf FROM features WHERE run_id = ?1 AND article_id = ?2",
            params![run_id, article_id],
            |row| row.get(0),
        )
        .optional()?;

    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

// rusqlite's optional() helper: converts "no rows" into None
use rusqlite::OptionalExtension;
