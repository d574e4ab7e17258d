// newsprism: topic, event and correlation analysis for news corpora
//
// This is the library root. Each module corresponds to one stage of the
// analysis, leaf-first: text features, the shared corpus, the two models,
// the pipeline that runs them, and the correlation engine over its output.

pub mod config;
pub mod corpus;
pub mod correlation;
pub mod error;
pub mod events;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod text;
pub mod topics;

#[cfg(feature = "sqlite")]
pub mod db;
#[cfg(feature = "sqlite")]
pub mod status;

pub use error::{AnalysisError, Result};
