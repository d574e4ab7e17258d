// Event detection: k-means grouping of articles that cover the same
// real-world occurrence.

pub mod kmeans;

pub use kmeans::{ClusterConfig, EventCluster, EventClusterer};
