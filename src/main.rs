use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use newsprism::config::Config;
use newsprism::corpus::Corpus;
use newsprism::ingest::{self, DatasetPaths};
use newsprism::output::{markdown, terminal};
use newsprism::pipeline::{self, Report};
use newsprism::text::keywords::KeywordExtractor;
use newsprism::text::similarity::keyword_similarity;
use newsprism::text::vectorizer::Vectorizer;

/// newsprism: topics, events and reporting correlations for news corpora.
///
/// Reads an article table, fits a topic model and an event clustering over
/// one shared vocabulary, and correlates the result with sentiment, site
/// traffic and geography.
#[derive(Parser)]
#[command(name = "newsprism", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the results database
    Init,

    /// Run the full analysis over an articles CSV
    Analyze {
        /// Articles table (article_id, source_name, published_at, title, full_content)
        articles: PathBuf,

        /// Title sentiment labels (article_id, title_sentiment)
        #[arg(long)]
        sentiment: Option<PathBuf>,

        /// Site traffic ranks (Domain, GlobalRank)
        #[arg(long)]
        traffic: Option<PathBuf>,

        /// Site locations (SourceCommonName, location, optional Country)
        #[arg(long)]
        geography: Option<PathBuf>,

        /// Number of topics (overrides NEWSPRISM_TOPICS)
        #[arg(long)]
        topics: Option<usize>,

        /// Number of event clusters (overrides NEWSPRISM_CLUSTERS)
        #[arg(long)]
        clusters: Option<usize>,

        /// Random seed for both models (overrides NEWSPRISM_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Drop terms in more than this fraction of articles (overrides NEWSPRISM_MAX_DF)
        #[arg(long)]
        max_df: Option<f64>,

        /// Drop terms in fewer than this many articles (overrides NEWSPRISM_MIN_DF)
        #[arg(long)]
        min_df: Option<usize>,

        /// Keywords per article (overrides NEWSPRISM_KEYWORDS)
        #[arg(long)]
        keywords: Option<usize>,

        /// Iteration cap for both models (overrides NEWSPRISM_MAX_ITER)
        #[arg(long)]
        max_iter: Option<usize>,

        /// Convergence tolerance for both models (overrides NEWSPRISM_TOLERANCE)
        #[arg(long)]
        tolerance: Option<f64>,

        /// Also write a markdown report to this path
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Also write the report as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,

        /// Don't store the run in the database
        #[arg(long)]
        no_save: bool,
    },

    /// Print the top TF-IDF keywords of each article
    Keywords {
        articles: PathBuf,

        /// Score this text against the articles' vocabulary instead
        #[arg(long)]
        text: Option<String>,

        /// Keywords per article (overrides NEWSPRISM_KEYWORDS)
        #[arg(long, short)]
        n: Option<usize>,

        /// Only print the first N articles
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Cosine similarity of two comma-separated keyword lists
    Similarity {
        /// e.g. "election,vote,senate"
        a: String,
        b: String,
    },

    /// Show database status and the latest stored run
    Status,

    /// Delete stored runs except the most recent ones
    Prune {
        /// Number of runs to keep
        #[arg(long, default_value = "5")]
        keep: usize,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("newsprism=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = Config::load()?;
            init_database(&config)?;
        }

        Commands::Analyze {
            articles,
            sentiment,
            traffic,
            geography,
            topics,
            clusters,
            seed,
            max_df,
            min_df,
            keywords,
            max_iter,
            tolerance,
            markdown: markdown_path,
            json,
            no_save,
        } => {
            let mut config = Config::load()?;
            if let Some(t) = topics {
                config.topics = t;
            }
            if let Some(c) = clusters {
                config.clusters = c;
            }
            if let Some(s) = seed {
                config.seed = s;
            }
            if let Some(d) = max_df {
                config.max_df = d;
            }
            if let Some(d) = min_df {
                config.min_df = d;
            }
            if let Some(n) = keywords {
                config.keywords = n;
            }
            if max_iter.is_some() {
                config.max_iterations = max_iter;
            }
            if let Some(t) = tolerance {
                config.tolerance = t;
            }
            config.validate()?;

            let paths = DatasetPaths {
                articles,
                sentiment,
                traffic,
                geography,
            };
            let dataset = ingest::load_dataset(&paths)
                .with_context(|| format!("Failed to load {}", paths.articles.display()))?;
            println!("Loaded {} articles.", dataset.documents.len());

            let pipeline_config = config.pipeline();
            let spinner = spinner("Fitting topics and events...")?;
            let analysis = pipeline::run(dataset.documents, &pipeline_config);
            spinner.finish_and_clear();
            let analysis = analysis?;

            let report = Report::build(&analysis, &dataset.tables, pipeline_config.top_n);
            terminal::display_report(&report);

            if let Some(path) = markdown_path {
                markdown::write_report(&report, &path)?;
                println!("Markdown report written to {}", path.display());
            }
            if let Some(path) = json {
                std::fs::write(&path, report.to_json()?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("JSON report written to {}", path.display());
            }

            if !no_save {
                save_run(&config, &analysis, &report)?;
            }
        }

        Commands::Keywords {
            articles,
            text,
            n,
            limit,
        } => {
            let mut config = Config::load()?;
            if let Some(n) = n {
                config.keywords = n;
            }

            let file = std::fs::File::open(&articles)
                .with_context(|| format!("Failed to open {}", articles.display()))?;
            let documents = ingest::read_articles(file, &articles.display().to_string())?;
            let corpus = Corpus::build(documents, &config.vectorizer())?;
            let extractor = KeywordExtractor::new(config.keywords);

            match text {
                Some(text) => {
                    let vectorizer = Vectorizer::new(corpus.vectorizer_config().clone());
                    let tfidf = vectorizer.transform_tfidf(corpus.vocabulary(), &[text.as_str()]);
                    let keywords = extractor.extract_row(&tfidf, corpus.vocabulary(), 0);
                    terminal::display_text_keywords(&corpus, &text, &keywords);
                }
                None => {
                    let keywords = extractor.extract(corpus.tfidf(), corpus.vocabulary());
                    terminal::display_keywords(&corpus, &keywords, limit);
                }
            }
        }

        Commands::Similarity { a, b } => {
            let a = split_keywords(&a);
            let b = split_keywords(&b);
            let score = keyword_similarity(&a, &b)?;
            terminal::display_similarity(&a, &b, score);
        }

        Commands::Status => {
            let config = Config::load()?;
            show_status(&config)?;
        }

        Commands::Prune { keep } => {
            let config = Config::load()?;
            prune_runs(&config, keep)?;
        }
    }

    Ok(())
}

fn split_keywords(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg} ({elapsed})")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

#[cfg(feature = "sqlite")]
fn init_database(config: &Config) -> Result<()> {
    info!("Initializing newsprism database...");
    let conn = newsprism::db::initialize(&config.db_path)?;
    let table_count = newsprism::db::schema::table_count(&conn)?;
    println!("Database initialized at: {}", config.db_path);
    println!("Tables created: {table_count}");
    println!("\nNext: newsprism analyze <articles.csv> --sentiment <ratings.csv>");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn init_database(_config: &Config) -> Result<()> {
    anyhow::bail!("Built without the `sqlite` feature; there is no database to initialize.")
}

#[cfg(feature = "sqlite")]
fn save_run(config: &Config, analysis: &pipeline::Analysis, report: &Report) -> Result<()> {
    let conn = newsprism::db::initialize(&config.db_path)?;
    let run_id = newsprism::db::queries::save_run(&conn, analysis, report, config.seed)?;
    info!(run_id, db = %config.db_path, "Stored run");
    println!("Saved as run #{run_id} in {}", config.db_path);
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn save_run(_config: &Config, _analysis: &pipeline::Analysis, _report: &Report) -> Result<()> {
    info!("Built without the `sqlite` feature; run not stored");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn show_status(config: &Config) -> Result<()> {
    newsprism::status::show(&config.db_path)
}

#[cfg(not(feature = "sqlite"))]
fn show_status(_config: &Config) -> Result<()> {
    println!("Database support not compiled in (enable the `sqlite` feature).");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn prune_runs(config: &Config, keep: usize) -> Result<()> {
    let conn = newsprism::db::open(&config.db_path)?;
    let removed = newsprism::db::queries::prune_runs(&conn, keep)?;
    info!(removed, keep, "Pruned runs");
    println!("Removed {removed} run(s); kept the latest {keep}.");
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn prune_runs(_config: &Config, _keep: usize) -> Result<()> {
    println!("Database support not compiled in (enable the `sqlite` feature).");
    Ok(())
}
