// Topic modelling: LDA decomposition of the shared count matrix.

pub mod lda;

pub use lda::{Topic, TopicAssignment, TopicModel, TopicModelConfig};
