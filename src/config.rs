use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::events::ClusterConfig;
use crate::pipeline::PipelineConfig;
use crate::text::tokenize::StopWords;
use crate::text::vectorizer::VectorizerConfig;
use crate::topics::TopicModelConfig;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. CLI flags override
/// individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_df: f64,
    pub min_df: usize,
    /// None disables the vocabulary size cap (NEWSPRISM_MAX_FEATURES=0)
    pub max_features: Option<usize>,
    pub stop_words: StopWords,
    pub topics: usize,
    pub clusters: usize,
    pub keywords: usize,
    pub seed: u64,
    /// Applies to both models when set; otherwise each keeps its own default
    pub max_iterations: Option<usize>,
    pub tolerance: f64,
    pub db_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_df: 0.9,
            min_df: 1,
            max_features: Some(10_000),
            stop_words: StopWords::English,
            topics: 10,
            clusters: 10,
            keywords: 5,
            seed: 42,
            max_iterations: None,
            tolerance: 1e-4,
            db_path: "./newsprism.db".to_string(),
        }
    }
}

/// Parse an env var, falling back to `default` when it is unset or blank.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from NEWSPRISM_* environment variables.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let max_features = match env_or("NEWSPRISM_MAX_FEATURES", 10_000usize)? {
            0 => None,
            n => Some(n),
        };
        let stop_words = env::var("NEWSPRISM_STOP_WORDS")
            .map(|s| StopWords::parse(&s))
            .unwrap_or(defaults.stop_words);
        let max_iterations = match env::var("NEWSPRISM_MAX_ITER") {
            Ok(_) => Some(env_or("NEWSPRISM_MAX_ITER", 300usize)?),
            Err(_) => None,
        };

        let config = Self {
            max_df: env_or("NEWSPRISM_MAX_DF", defaults.max_df)?,
            min_df: env_or("NEWSPRISM_MIN_DF", defaults.min_df)?,
            max_features,
            stop_words,
            topics: env_or("NEWSPRISM_TOPICS", defaults.topics)?,
            clusters: env_or("NEWSPRISM_CLUSTERS", defaults.clusters)?,
            keywords: env_or("NEWSPRISM_KEYWORDS", defaults.keywords)?,
            seed: env_or("NEWSPRISM_SEED", defaults.seed)?,
            max_iterations,
            tolerance: env_or("NEWSPRISM_TOLERANCE", defaults.tolerance)?,
            db_path: env::var("NEWSPRISM_DB_PATH").unwrap_or(defaults.db_path),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the parsers alone can't enforce.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            anyhow::bail!(
                "NEWSPRISM_MAX_DF must be in (0, 1], got {}.",
                self.max_df
            );
        }
        if self.topics == 0 {
            anyhow::bail!("NEWSPRISM_TOPICS must be at least 1.");
        }
        if self.clusters == 0 {
            anyhow::bail!("NEWSPRISM_CLUSTERS must be at least 1.");
        }
        if self.max_iterations == Some(0) {
            anyhow::bail!("NEWSPRISM_MAX_ITER must be at least 1.");
        }
        if self.tolerance < 0.0 {
            anyhow::bail!("NEWSPRISM_TOLERANCE must not be negative.");
        }
        Ok(())
    }

    pub fn vectorizer(&self) -> VectorizerConfig {
        VectorizerConfig {
            max_df: self.max_df,
            min_df: self.min_df,
            max_features: self.max_features,
            stop_words: self.stop_words.clone(),
        }
    }

    /// Model parameters for one pipeline run.
    pub fn pipeline(&self) -> PipelineConfig {
        let topic_defaults = TopicModelConfig::default();
        let cluster_defaults = ClusterConfig::default();
        PipelineConfig {
            vectorizer: self.vectorizer(),
            topics: TopicModelConfig {
                n_topics: self.topics,
                max_iterations: self
                    .max_iterations
                    .unwrap_or(topic_defaults.max_iterations),
                tolerance: self.tolerance,
                seed: self.seed,
                ..topic_defaults
            },
            clusters: ClusterConfig {
                n_clusters: self.clusters,
                max_iterations: self
                    .max_iterations
                    .unwrap_or(cluster_defaults.max_iterations),
                tolerance: self.tolerance,
                seed: self.seed,
                ..cluster_defaults
            },
            keywords: self.keywords,
            ..PipelineConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_carries_shared_seed() {
        let config = Config {
            seed: 7,
            topics: 3,
            clusters: 4,
            ..Config::default()
        };
        let p = config.pipeline();
        assert_eq!(p.topics.seed, 7);
        assert_eq!(p.clusters.seed, 7);
        assert_eq!(p.topics.n_topics, 3);
        assert_eq!(p.clusters.n_clusters, 4);
        assert_eq!(p.clusters.max_iterations, 300);
    }

    #[test]
    fn test_max_iterations_applies_to_both_models() {
        let config = Config {
            max_iterations: Some(25),
            ..Config::default()
        };
        let p = config.pipeline();
        assert_eq!(p.topics.max_iterations, 25);
        assert_eq!(p.clusters.max_iterations, 25);
    }

    #[test]
    fn test_validate_rejects_bad_max_df() {
        let config = Config {
            max_df: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iterations_and_negative_tolerance() {
        let zero_iter = Config {
            max_iterations: Some(0),
            ..Config::default()
        };
        assert!(zero_iter.validate().is_err());

        let negative = Config {
            tolerance: -1e-3,
            ..Config::default()
        };
        assert!(negative.validate().is_err());

        let overridden = Config {
            max_df: 1.0,
            min_df: 2,
            keywords: 0,
            max_iterations: Some(5),
            tolerance: 0.0,
            ..Config::default()
        };
        assert!(overridden.validate().is_ok());
        let p = overridden.pipeline();
        assert_eq!(p.vectorizer.min_df, 2);
        assert_eq!(p.keywords, 0);
        assert_eq!(p.topics.max_iterations, 5);
        assert_eq!(p.clusters.tolerance, 0.0);
    }
}
