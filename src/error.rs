// Error taxonomy for the analysis core.
//
// Vectorization and model-fitting failures carry the parameters that caused
// them so the caller can adjust configuration. Sparse data in the correlation
// layer is never an error; see `correlation::CorrelationResult`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Document-frequency filtering (or stop-word removal) left no terms.
    #[error(
        "vocabulary is empty after filtering {documents} documents \
         (min_df={min_df}, max_df={max_df}); relax the filters or add documents"
    )]
    EmptyVocabulary {
        documents: usize,
        min_df: usize,
        max_df: f64,
    },

    /// Fewer usable documents than requested topics/clusters.
    #[error("{model} needs at least {requested} usable documents, corpus has {available}")]
    InsufficientData {
        model: &'static str,
        requested: usize,
        available: usize,
    },

    /// Input table is missing a column or holds a value of the wrong type.
    #[error("schema error in {source_name}: {message}")]
    Schema {
        source_name: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl AnalysisError {
    pub(crate) fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
