// Colored terminal output for topics, events and correlation tables.
//
// main.rs delegates all terminal formatting here.

use colored::Colorize;

use super::{format_coefficient, truncate_chars};
use crate::correlation::{
    CoReportingMatrix, CorrelationResult, GroupSentiment, MentionCount, SentimentDistribution,
    SourceContentStats, SourceSentimentStats,
};
use crate::corpus::Corpus;
use crate::pipeline::Report;
use crate::topics::Topic;

/// Display the full report of one run.
pub fn display_report(report: &Report) {
    println!(
        "\n{}",
        format!(
            "=== Analysis ({} articles, {} terms) ===",
            report.articles, report.vocabulary_size
        )
        .bold()
    );

    display_topics(&report.topics);
    display_events(report);

    println!("\n{}", "=== Correlations ===".bold());
    display_correlation(&report.sentiment_vs_volume);
    display_correlation(&report.traffic_vs_volume);
    display_co_reporting(&report.co_reporting);

    display_sentiment_groups("Sentiment by category", &report.sentiment_by_category);
    display_sentiment_groups("Sentiment by region", &report.sentiment_by_region);
    display_sentiment_groups("Sentiment by country", &report.sentiment_by_country);
    display_source_stats(&report.sentiment_by_source);
    display_distribution(&report.sentiment_distribution);
    display_distribution(&report.sentiment_distribution_top_sites);

    if !report.topic_diversity.is_empty() {
        println!("\n  {}", "Topic diversity by source".underline());
        for row in &report.topic_diversity {
            println!("    {:<32} {:>3} topics", truncate_chars(&row.source, 30), row.topics);
        }
    }

    display_mentions("Region coverage", &report.region_mentions);
    display_mentions("Most mentioned countries", &report.most_mentioned_countries);
    display_mentions("Least mentioned countries", &report.least_mentioned_countries);
    display_content_stats(&report.content_by_source);
    println!();
}

pub fn display_topics(topics: &[Topic]) {
    if topics.is_empty() {
        println!("No topics found.");
        return;
    }

    println!("\n{}", format!("=== Topics ({}) ===", topics.len()).bold());
    for topic in topics {
        let terms: Vec<String> = topic
            .top_terms
            .iter()
            .map(|(term, p)| format!("{term} ({p:.3})"))
            .collect();
        println!(
            "  {:>3}. {:<6} {}",
            topic.id,
            format!("{:.0}%", topic.prevalence * 100.0).cyan(),
            terms.join(", ").dimmed()
        );
    }
}

pub fn display_events(report: &Report) {
    println!(
        "\n{}",
        format!("=== Events ({}) ===", report.event_article_counts.len()).bold()
    );
    println!(
        "  {:>5}  {:>8}  {:<32} {}",
        "Event".dimmed(),
        "Articles".dimmed(),
        "First reported by".dimmed(),
        "At".dimmed(),
    );
    println!("  {}", "-".repeat(72).dimmed());

    for row in &report.event_article_counts {
        let earliest = report.earliest_reporters.iter().find(|e| e.event == row.event);
        let (source, at) = match earliest {
            Some(e) => (
                truncate_chars(&e.source, 30),
                e.published_at.format("%Y-%m-%d %H:%M").to_string(),
            ),
            None => ("?".to_string(), String::new()),
        };
        println!("  {:>5}  {:>8}  {:<32} {}", row.event, row.articles, source, at.dimmed());
    }
}

pub fn display_correlation(result: &CorrelationResult) {
    let value = match result.coefficient {
        Some(r) if r.abs() >= 0.5 => format_coefficient(Some(r)).bold(),
        Some(r) => format_coefficient(Some(r)).normal(),
        None => format_coefficient(None).yellow(),
    };
    println!(
        "  {} vs {}: {} (n={})",
        result.metric_a, result.metric_b, value, result.sample_size
    );
}

pub fn display_co_reporting(matrix: &CoReportingMatrix) {
    if matrix.sources.len() < 2 {
        return;
    }
    println!(
        "\n  {} (over {} events)",
        "Co-reporting correlation".underline(),
        matrix.sample_size()
    );
    print!("    {:<20}", "");
    for source in &matrix.sources {
        print!(" {:>8}", truncate_chars(source, 5));
    }
    println!();
    for (source, row) in matrix.sources.iter().zip(&matrix.coefficients) {
        print!("    {:<20}", truncate_chars(source, 17));
        for value in row {
            match value {
                Some(r) => print!(" {:>8.2}", r),
                None => print!(" {:>8}", "-".dimmed()),
            }
        }
        println!();
    }
}

pub fn display_sentiment_groups(title: &str, rows: &[GroupSentiment]) {
    if rows.is_empty() {
        return;
    }
    println!("\n  {}", title.underline());
    for row in rows {
        println!(
            "    {:<24} {} ({} articles)",
            truncate_chars(&row.group, 22),
            colorize_sentiment(row.mean),
            row.articles
        );
    }
}

pub fn display_source_stats(rows: &[SourceSentimentStats]) {
    if rows.is_empty() {
        return;
    }
    println!("\n  {}", "Sentiment by source".underline());
    println!(
        "    {:<32} {:>6} {:>6} {:>6} {:>5}",
        "Source".dimmed(),
        "Mean".dimmed(),
        "Median".dimmed(),
        "Var".dimmed(),
        "n".dimmed(),
    );
    for row in rows {
        println!(
            "    {:<32} {:>+6.2} {:>+6.2} {:>6.2} {:>5}",
            truncate_chars(&row.source, 30),
            row.mean,
            row.median,
            row.variance,
            row.count
        );
    }
}

pub fn display_distribution(dist: &SentimentDistribution) {
    if dist.total == 0 {
        return;
    }
    println!(
        "\n  Sentiment mix, {} ({} articles): {} {} {}",
        dist.scope,
        dist.total,
        format!("{:.0}% negative", dist.negative * 100.0).red(),
        format!("{:.0}% neutral", dist.neutral * 100.0).normal(),
        format!("{:.0}% positive", dist.positive * 100.0).green(),
    );
}

pub fn display_mentions(title: &str, rows: &[MentionCount]) {
    if rows.is_empty() {
        return;
    }
    println!("\n  {}", title.underline());
    for row in rows {
        println!("    {:<24} {:>6} articles", truncate_chars(&row.name, 22), row.articles);
    }
}

pub fn display_content_stats(rows: &[SourceContentStats]) {
    if rows.is_empty() {
        return;
    }
    println!("\n  {}", "Article length by source (median [q1, q3])".underline());
    println!(
        "    {:<32} {:>5} {:>20} {:>16}",
        "Source".dimmed(),
        "n".dimmed(),
        "Body chars".dimmed(),
        "Title words".dimmed(),
    );
    for row in rows {
        let body = format!(
            "{:.0} [{:.0}, {:.0}]",
            row.content_length.median, row.content_length.q1, row.content_length.q3
        );
        let title = format!(
            "{:.0} [{:.0}, {:.0}]",
            row.title_words.median, row.title_words.q1, row.title_words.q3
        );
        println!(
            "    {:<32} {:>5} {:>20} {:>16}",
            truncate_chars(&row.source, 30),
            row.articles,
            body,
            title
        );
    }
}

/// Keywords per article, as printed by `newsprism keywords`.
pub fn display_keywords(corpus: &Corpus, keywords: &[Vec<String>], limit: usize) {
    println!(
        "\n{}",
        format!(
            "=== Keywords ({} articles, {} terms) ===",
            corpus.len(),
            corpus.vocabulary().len()
        )
        .bold()
    );
    for (doc, words) in corpus.documents().iter().zip(keywords).take(limit) {
        println!(
            "  {:<16} {}",
            truncate_chars(&doc.id, 14),
            words.join(", ").cyan()
        );
    }
    if corpus.len() > limit {
        println!("  {}", format!("... {} more", corpus.len() - limit).dimmed());
    }
}

/// Keywords of a text outside the corpus, scored with the corpus vocabulary.
pub fn display_text_keywords(corpus: &Corpus, text: &str, keywords: &[String]) {
    println!(
        "\n{}",
        format!("=== Keywords ({} terms known) ===", corpus.vocabulary().len()).bold()
    );
    println!("  {}", truncate_chars(text, 60).dimmed());
    if keywords.is_empty() {
        println!("  {}", "No known terms in this text.".yellow());
    } else {
        println!("  {}", keywords.join(", ").cyan());
    }
}

pub fn display_similarity(a: &[String], b: &[String], score: f64) {
    println!("  A: {}", a.join(", ").dimmed());
    println!("  B: {}", b.join(", ").dimmed());
    println!("  Cosine similarity: {}", format!("{score:.3}").bold());
}

fn colorize_sentiment(mean: f64) -> colored::ColoredString {
    let text = format!("{mean:+.2}");
    match mean {
        m if m > 0.25 => text.green(),
        m if m < -0.25 => text.red(),
        _ => text.normal(),
    }
}
