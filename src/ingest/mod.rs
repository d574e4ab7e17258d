// CSV ingestion: the only place raw tables enter the crate.
//
// Each reader checks its columns up front and fails with a Schema error that
// names the file, the column and the data row (1-based). Sentiment labels and
// site countries are attached to the Documents here so the rest of the
// pipeline only sees typed values.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use tracing::{info, warn};

use crate::correlation::{normalize_site, ExternalTables, SiteLocation, TrafficRank};
use crate::corpus::{Document, Sentiment};
use crate::error::{AnalysisError, Result};

/// Header positions of one CSV, looked up case-insensitively.
struct Columns {
    source_name: String,
    headers: Vec<String>,
}

impl Columns {
    fn new(source_name: &str, headers: &StringRecord) -> Self {
        Self {
            source_name: source_name.to_string(),
            headers: headers.iter().map(|h| h.trim().to_lowercase()).collect(),
        }
    }

    fn optional(&self, column: &str) -> Option<usize> {
        let column = column.to_lowercase();
        self.headers.iter().position(|h| *h == column)
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.optional(column).ok_or_else(|| {
            AnalysisError::schema(&self.source_name, format!("missing required column `{column}`"))
        })
    }

    /// Trimmed value, None when the cell is absent or blank.
    fn get<'r>(&self, record: &'r StringRecord, index: usize) -> Option<&'r str> {
        record.get(index).map(str::trim).filter(|s| !s.is_empty())
    }

    fn get_required<'r>(
        &self,
        record: &'r StringRecord,
        index: usize,
        column: &str,
        row: usize,
    ) -> Result<&'r str> {
        self.get(record, index).ok_or_else(|| {
            AnalysisError::schema(
                &self.source_name,
                format!("empty value in column `{column}` at row {row}"),
            )
        })
    }

    fn invalid(&self, column: &str, row: usize, value: &str, expected: &str) -> AnalysisError {
        AnalysisError::schema(
            &self.source_name,
            format!("column `{column}` at row {row}: `{value}` is not {expected}"),
        )
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` (also with a `T`) or a bare
/// date. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Read the articles table. Duplicate ids keep their first row.
pub fn read_articles<R: Read>(reader: R, source_name: &str) -> Result<Vec<Document>> {
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(source_name, rdr.headers()?);
    let id_col = columns.require("article_id")?;
    let source_col = columns.require("source_name")?;
    let published_col = columns.require("published_at")?;
    let title_col = columns.require("title")?;
    let body_col = columns.require("full_content")?;
    let category_col = columns.optional("category");

    let mut documents: Vec<Document> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 1;

        let id = columns.get_required(&record, id_col, "article_id", row)?;
        if let Some(first) = seen.get(id) {
            warn!(article_id = id, row, first_row = *first, "Dropping duplicate article");
            continue;
        }

        let source = columns.get_required(&record, source_col, "source_name", row)?;
        let raw_ts = columns.get_required(&record, published_col, "published_at", row)?;
        let published_at = parse_timestamp(raw_ts)
            .ok_or_else(|| columns.invalid("published_at", row, raw_ts, "a timestamp"))?;

        let mut doc = Document::new(
            id,
            source,
            published_at,
            columns.get(&record, title_col).unwrap_or_default(),
            columns.get(&record, body_col).unwrap_or_default(),
        );
        if let Some(category) = category_col.and_then(|c| columns.get(&record, c)) {
            doc = doc.with_category(category);
        }

        seen.insert(id.to_string(), row);
        documents.push(doc);
    }

    info!(file = source_name, articles = documents.len(), "Loaded articles");
    Ok(documents)
}

/// Read article id -> title sentiment. Duplicate ids keep their first label.
pub fn read_sentiment<R: Read>(
    reader: R,
    source_name: &str,
) -> Result<HashMap<String, Sentiment>> {
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(source_name, rdr.headers()?);
    let id_col = columns.require("article_id")?;
    let label_col = columns.require("title_sentiment")?;

    let mut labels = HashMap::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let id = columns.get_required(&record, id_col, "article_id", row)?;
        let raw = columns.get_required(&record, label_col, "title_sentiment", row)?;
        let sentiment = raw
            .parse::<Sentiment>()
            .map_err(|_| columns.invalid("title_sentiment", row, raw, "a sentiment label"))?;
        labels.entry(id.to_string()).or_insert(sentiment);
    }

    info!(file = source_name, labels = labels.len(), "Loaded sentiment labels");
    Ok(labels)
}

pub fn read_traffic<R: Read>(reader: R, source_name: &str) -> Result<Vec<TrafficRank>> {
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(source_name, rdr.headers()?);
    let domain_col = columns.require("Domain")?;
    let rank_col = columns.require("GlobalRank")?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let domain = columns.get_required(&record, domain_col, "Domain", row)?;
        let raw = columns.get_required(&record, rank_col, "GlobalRank", row)?;
        let global_rank: u64 = raw
            .parse()
            .map_err(|_| columns.invalid("GlobalRank", row, raw, "an integer rank"))?;
        rows.push(TrafficRank {
            domain: domain.to_string(),
            global_rank,
        });
    }

    info!(file = source_name, sites = rows.len(), "Loaded traffic ranks");
    Ok(rows)
}

pub fn read_geography<R: Read>(reader: R, source_name: &str) -> Result<Vec<SiteLocation>> {
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(source_name, rdr.headers()?);
    let site_col = columns.require("SourceCommonName")?;
    let location_col = columns.require("location")?;
    let name_col = columns.optional("Country");

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let site = columns.get_required(&record, site_col, "SourceCommonName", row)?;
        // Sites with no known location are simply not mapped
        let Some(country) = columns.get(&record, location_col) else {
            continue;
        };
        rows.push(SiteLocation {
            site: site.to_string(),
            country: country.to_string(),
            name: name_col
                .and_then(|c| columns.get(&record, c))
                .map(str::to_string),
        });
    }

    info!(file = source_name, sites = rows.len(), "Loaded site locations");
    Ok(rows)
}

/// Attach sentiment labels by article id and countries by normalised site.
/// Earlier geography rows win over later ones for the same site.
pub fn attach_labels(
    documents: Vec<Document>,
    sentiment: &HashMap<String, Sentiment>,
    geography: &[SiteLocation],
) -> Vec<Document> {
    let mut countries: HashMap<String, &str> = HashMap::new();
    for loc in geography {
        countries
            .entry(normalize_site(&loc.site))
            .or_insert(loc.country.as_str());
    }

    documents
        .into_iter()
        .map(|doc| {
            let label = sentiment.get(&doc.id).copied();
            let country = countries.get(&normalize_site(&doc.source)).copied();
            let doc = match label {
                Some(s) => doc.with_sentiment(s),
                None => doc,
            };
            match country {
                Some(c) => doc.with_geography(c),
                None => doc,
            }
        })
        .collect()
}

/// Paths of the input tables. Only the articles table is required.
#[derive(Debug, Clone, Default)]
pub struct DatasetPaths {
    pub articles: PathBuf,
    pub sentiment: Option<PathBuf>,
    pub traffic: Option<PathBuf>,
    pub geography: Option<PathBuf>,
}

/// Labelled documents plus the tables the correlation engine joins against.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub documents: Vec<Document>,
    pub tables: ExternalTables,
}

pub fn load_dataset(paths: &DatasetPaths) -> Result<Dataset> {
    let documents = read_articles(open(&paths.articles)?, &display(&paths.articles))?;

    let sentiment = match &paths.sentiment {
        Some(p) => read_sentiment(open(p)?, &display(p))?,
        None => HashMap::new(),
    };
    let traffic = match &paths.traffic {
        Some(p) => read_traffic(open(p)?, &display(p))?,
        None => Vec::new(),
    };
    let geography = match &paths.geography {
        Some(p) => read_geography(open(p)?, &display(p))?,
        None => Vec::new(),
    };

    let documents = attach_labels(documents, &sentiment, &geography);
    Ok(Dataset {
        documents,
        tables: ExternalTables { traffic, geography },
    })
}

fn open(path: &Path) -> Result<std::fs::File> {
    Ok(std::fs::File::open(path)?)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
