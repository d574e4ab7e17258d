// Markdown report: the same tables as the terminal view, for sharing.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use super::format_coefficient;
use crate::correlation::{CorrelationResult, GroupSentiment, MentionCount};
use crate::pipeline::Report;

/// Render a report as a markdown document.
pub fn render(report: &Report) -> String {
    let mut md = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(md, "# News analysis report\n");
    let _ = writeln!(
        md,
        "Generated {} from {} articles ({} vocabulary terms).\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.articles,
        report.vocabulary_size
    );

    let _ = writeln!(md, "## Topics\n");
    let _ = writeln!(md, "| Topic | Share | Top terms |");
    let _ = writeln!(md, "|---:|---:|---|");
    for topic in &report.topics {
        let terms: Vec<&str> = topic.top_terms.iter().map(|(t, _)| t.as_str()).collect();
        let _ = writeln!(
            md,
            "| {} | {:.0}% | {} |",
            topic.id,
            topic.prevalence * 100.0,
            terms.join(", ")
        );
    }

    let _ = writeln!(md, "\n## Events\n");
    let _ = writeln!(md, "| Event | Articles | First reported by | At |");
    let _ = writeln!(md, "|---:|---:|---|---|");
    for row in &report.event_article_counts {
        let earliest = report.earliest_reporters.iter().find(|e| e.event == row.event);
        let (source, at) = earliest
            .map(|e| (e.source.clone(), e.published_at.to_rfc3339()))
            .unwrap_or_default();
        let _ = writeln!(md, "| {} | {} | {} | {} |", row.event, row.articles, source, at);
    }

    let _ = writeln!(md, "\n## Correlations\n");
    for result in [&report.sentiment_vs_volume, &report.traffic_vs_volume] {
        let _ = writeln!(md, "{}", correlation_line(result));
    }

    if report.co_reporting.sources.len() > 1 {
        let _ = writeln!(
            md,
            "\n### Co-reporting (over {} events)\n",
            report.co_reporting.sample_size()
        );
        let _ = writeln!(md, "| | {} |", report.co_reporting.sources.join(" | "));
        let _ = writeln!(
            md,
            "|---|{}",
            "---:|".repeat(report.co_reporting.sources.len())
        );
        for (source, row) in report
            .co_reporting
            .sources
            .iter()
            .zip(&report.co_reporting.coefficients)
        {
            let cells: Vec<String> = row
                .iter()
                .map(|v| v.map(|r| format!("{r:.2}")).unwrap_or_else(|| "-".to_string()))
                .collect();
            let _ = writeln!(md, "| {} | {} |", source, cells.join(" | "));
        }
    }

    group_table(&mut md, "Sentiment by category", &report.sentiment_by_category);
    group_table(&mut md, "Sentiment by region", &report.sentiment_by_region);
    group_table(&mut md, "Sentiment by country", &report.sentiment_by_country);
    group_table(&mut md, "Sentiment by topic", &report.sentiment_by_topic);

    if !report.sentiment_by_source.is_empty() {
        let _ = writeln!(md, "\n### Sentiment by source\n");
        let _ = writeln!(md, "| Source | Mean | Median | Variance | Articles |");
        let _ = writeln!(md, "|---|---:|---:|---:|---:|");
        for row in &report.sentiment_by_source {
            let _ = writeln!(
                md,
                "| {} | {:+.2} | {:+.2} | {:.2} | {} |",
                row.source, row.mean, row.median, row.variance, row.count
            );
        }
    }

    if !report.top_sources.is_empty() {
        let _ = writeln!(md, "\n### Most active sources\n");
        for (i, row) in report.top_sources.iter().enumerate() {
            let _ = writeln!(md, "{}. {} ({} articles)", i + 1, row.source, row.articles);
        }
    }

    mention_table(&mut md, "Region coverage", &report.region_mentions);
    mention_table(&mut md, "Most mentioned countries", &report.most_mentioned_countries);
    mention_table(&mut md, "Least mentioned countries", &report.least_mentioned_countries);

    if !report.content_by_source.is_empty() {
        let _ = writeln!(md, "\n### Article length by source\n");
        let _ = writeln!(
            md,
            "| Source | Articles | Body chars (min / q1 / median / q3 / max) | Title words (median) |"
        );
        let _ = writeln!(md, "|---|---:|---|---:|");
        for row in &report.content_by_source {
            let c = &row.content_length;
            let _ = writeln!(
                md,
                "| {} | {} | {:.0} / {:.0} / {:.0} / {:.0} / {:.0} | {:.1} |",
                row.source, row.articles, c.min, c.q1, c.median, c.q3, c.max, row.title_words.median
            );
        }
    }

    md
}

/// Render and write the report to `path`.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    std::fs::write(path, render(report))
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn correlation_line(result: &CorrelationResult) -> String {
    format!(
        "- **{} vs {}**: {} (n = {})",
        result.metric_a,
        result.metric_b,
        format_coefficient(result.coefficient),
        result.sample_size
    )
}

fn mention_table(md: &mut String, title: &str, rows: &[MentionCount]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(md, "\n### {title}\n");
    let _ = writeln!(md, "| Name | Articles |");
    let _ = writeln!(md, "|---|---:|");
    for row in rows {
        let _ = writeln!(md, "| {} | {} |", row.name, row.articles);
    }
}

fn group_table(md: &mut String, title: &str, rows: &[GroupSentiment]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(md, "\n### {title}\n");
    let _ = writeln!(md, "| Group | Mean sentiment | Articles |");
    let _ = writeln!(md, "|---|---:|---:|");
    for row in rows {
        let _ = writeln!(md, "| {} | {:+.2} | {} |", row.group, row.mean, row.articles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_correlation_renders_as_insufficient() {
        let line = correlation_line(&CorrelationResult {
            metric_a: "a".into(),
            metric_b: "b".into(),
            coefficient: None,
            sample_size: 1,
        });
        assert!(line.contains("insufficient data"));
        assert!(line.contains("n = 1"));
    }
}
