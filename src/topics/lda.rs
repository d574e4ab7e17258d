// Latent Dirichlet Allocation over the raw count matrix.
//
// Collapsed Gibbs sampling driven by a seeded StdRng, so a fixed
// (matrix, k, seed, iteration settings) tuple always yields bit-identical
// distributions. Convergence is checked every `evaluate_every` sweeps on the
// data log-likelihood under the current point estimates.
//
// Topic ids mean nothing outside the fit that produced them: a different seed
// can permute them.

use std::collections::HashSet;

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::error::{AnalysisError, Result};
use crate::text::vectorizer::{FeatureMatrix, VocabularyModel, Weighting};

/// Fitting parameters for the topic model.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicModelConfig {
    pub n_topics: usize,
    /// Document-topic prior; `None` means 1/k
    pub alpha: Option<f64>,
    /// Topic-term prior; `None` means 1/k
    pub beta: Option<f64>,
    /// Cap on full Gibbs sweeps over the corpus
    pub max_iterations: usize,
    /// Stop when the relative log-likelihood change drops to this or below
    pub tolerance: f64,
    /// Sweeps between convergence checks
    pub evaluate_every: usize,
    pub seed: u64,
}

impl Default for TopicModelConfig {
    fn default() -> Self {
        Self {
            n_topics: 10,
            alpha: None,
            beta: None,
            max_iterations: 200,
            tolerance: 1e-4,
            evaluate_every: 10,
            seed: 42,
        }
    }
}

impl TopicModelConfig {
    fn priors(&self) -> Result<(f64, f64)> {
        if self.n_topics == 0 {
            return Err(AnalysisError::InvalidConfig(
                "topic count must be positive".to_string(),
            ));
        }
        let default = 1.0 / self.n_topics as f64;
        let alpha = self.alpha.unwrap_or(default);
        let beta = self.beta.unwrap_or(default);
        if alpha <= 0.0 || beta <= 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "Dirichlet priors must be positive (alpha={alpha}, beta={beta})"
            )));
        }
        Ok((alpha, beta))
    }
}

/// Arg-max topic of one document plus its full distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub topic: usize,
    pub distribution: Vec<f64>,
}

impl TopicAssignment {
    fn from_distribution(distribution: Vec<f64>) -> Self {
        Self {
            topic: argmax(&distribution),
            distribution,
        }
    }
}

/// A topic summarised by its heaviest terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: usize,
    /// (term, probability), most probable first
    pub top_terms: Vec<(String, f64)>,
    /// Share of corpus documents whose arg-max topic is this one
    pub prevalence: f64,
}

impl Topic {
    pub fn label(&self) -> String {
        self.top_terms
            .iter()
            .take(3)
            .map(|(t, _)| t.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Debug, Clone)]
pub struct TopicModel {
    alpha: f64,
    /// k x V, rows sum to 1
    topic_term: Array2<f64>,
    /// D x k, rows sum to 1
    doc_topic: Array2<f64>,
    iterations: usize,
    log_likelihood: f64,
    tolerance: f64,
}

impl TopicModel {
    /// Fit on the corpus' shared count matrix.
    pub fn fit_corpus(corpus: &Corpus, config: &TopicModelConfig) -> Result<Self> {
        Self::fit(corpus.counts(), config)
    }

    pub fn fit(counts: &FeatureMatrix, config: &TopicModelConfig) -> Result<Self> {
        let (alpha, beta) = config.priors()?;
        if counts.weighting() != Weighting::Counts {
            return Err(AnalysisError::InvalidConfig(
                "topic model expects a raw count matrix, not TF-IDF weights".to_string(),
            ));
        }

        let k = config.n_topics;
        let available = distinct_nonzero_rows(counts);
        if available < k {
            return Err(AnalysisError::InsufficientData {
                model: "topic model",
                requested: k,
                available,
            });
        }

        let n_docs = counts.n_rows();
        let n_terms = counts.n_cols();
        let beta_sum = beta * n_terms as f64;
        let mut rng = StdRng::seed_from_u64(config.seed);

        // One entry per token occurrence: (document, term)
        let mut tokens: Vec<(usize, usize)> = Vec::new();
        for d in 0..n_docs {
            for (w, c) in counts.nonzero(d) {
                for _ in 0..c.round() as usize {
                    tokens.push((d, w));
                }
            }
        }

        let mut doc_topic_counts = Array2::<f64>::zeros((n_docs, k));
        let mut topic_term_counts = Array2::<f64>::zeros((k, n_terms));
        let mut topic_totals = Array1::<f64>::zeros(k);
        let mut assignment: Vec<usize> = Vec::with_capacity(tokens.len());

        for &(d, w) in &tokens {
            let t = rng.random_range(0..k);
            assignment.push(t);
            doc_topic_counts[[d, t]] += 1.0;
            topic_term_counts[[t, w]] += 1.0;
            topic_totals[t] += 1.0;
        }

        let mut weights = vec![0.0; k];
        let mut previous_ll: Option<f64> = None;
        let mut log_likelihood = f64::NEG_INFINITY;
        let mut iterations = 0;
        let evaluate_every = config.evaluate_every.max(1);

        for sweep in 1..=config.max_iterations {
            for (i, &(d, w)) in tokens.iter().enumerate() {
                let old = assignment[i];
                doc_topic_counts[[d, old]] -= 1.0;
                topic_term_counts[[old, w]] -= 1.0;
                topic_totals[old] -= 1.0;

                let mut total = 0.0;
                for t in 0..k {
                    total += (doc_topic_counts[[d, t]] + alpha)
                        * (topic_term_counts[[t, w]] + beta)
                        / (topic_totals[t] + beta_sum);
                    weights[t] = total;
                }

                let u = rng.random::<f64>() * total;
                let new = weights.iter().position(|&c| u < c).unwrap_or(k - 1);

                assignment[i] = new;
                doc_topic_counts[[d, new]] += 1.0;
                topic_term_counts[[new, w]] += 1.0;
                topic_totals[new] += 1.0;
            }
            iterations = sweep;

            if sweep % evaluate_every == 0 || sweep == config.max_iterations {
                let doc_topic = normalize_doc_topic(&doc_topic_counts, alpha);
                let topic_term = normalize_topic_term(&topic_term_counts, &topic_totals, beta);
                log_likelihood = data_log_likelihood(counts, &doc_topic, &topic_term);
                debug!(sweep, log_likelihood, "Topic model sweep");

                if let Some(prev) = previous_ll {
                    let scale = prev.abs().max(f64::MIN_POSITIVE);
                    let change = ((log_likelihood - prev) / scale).abs();
                    if change <= config.tolerance {
                        break;
                    }
                }
                previous_ll = Some(log_likelihood);
            }
        }

        let doc_topic = normalize_doc_topic(&doc_topic_counts, alpha);
        let topic_term = normalize_topic_term(&topic_term_counts, &topic_totals, beta);
        if iterations == 0 {
            log_likelihood = data_log_likelihood(counts, &doc_topic, &topic_term);
        }

        info!(
            topics = k,
            documents = n_docs,
            tokens = tokens.len(),
            iterations,
            log_likelihood,
            "Fitted topic model"
        );

        Ok(Self {
            alpha,
            topic_term,
            doc_topic,
            iterations,
            log_likelihood,
            tolerance: config.tolerance,
        })
    }

    pub fn n_topics(&self) -> usize {
        self.topic_term.nrows()
    }

    /// Sweeps actually run before convergence or the cap.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Distribution of topic `k` over vocabulary columns.
    pub fn topic_term_distribution(&self, topic: usize) -> ArrayView1<'_, f64> {
        self.topic_term.row(topic)
    }

    /// Distribution of training document `d` over topics.
    pub fn document_distribution(&self, doc: usize) -> ArrayView1<'_, f64> {
        self.doc_topic.row(doc)
    }

    /// Arg-max topic of every training document, in corpus order.
    pub fn assignments(&self) -> Vec<TopicAssignment> {
        self.doc_topic
            .rows()
            .into_iter()
            .map(|row| TopicAssignment::from_distribution(row.to_vec()))
            .collect()
    }

    /// The `n` most probable terms of a topic (ties by vocabulary index).
    pub fn top_terms(
        &self,
        topic: usize,
        vocabulary: &VocabularyModel,
        n: usize,
    ) -> Vec<(String, f64)> {
        let mut ranked: Vec<(usize, f64)> = self
            .topic_term
            .row(topic)
            .iter()
            .copied()
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
            .into_iter()
            .take(n)
            .filter_map(|(i, p)| vocabulary.term(i).map(|t| (t.to_string(), p)))
            .collect()
    }

    /// Every topic with its top terms and prevalence among training documents.
    pub fn topics(&self, vocabulary: &VocabularyModel, n_terms: usize) -> Vec<Topic> {
        let assignments = self.assignments();
        let n_docs = assignments.len().max(1) as f64;
        (0..self.n_topics())
            .map(|id| Topic {
                id,
                top_terms: self.top_terms(id, vocabulary, n_terms),
                prevalence: assignments.iter().filter(|a| a.topic == id).count() as f64 / n_docs,
            })
            .collect()
    }

    /// Infer topic distributions for unseen count rows against the fitted
    /// topics (fixed-point folding-in; topic-term distributions stay frozen).
    pub fn transform(&self, counts: &FeatureMatrix) -> Result<Vec<TopicAssignment>> {
        if counts.n_cols() != self.topic_term.ncols() {
            return Err(AnalysisError::InvalidConfig(format!(
                "matrix has {} columns, topic model was fit on {}",
                counts.n_cols(),
                self.topic_term.ncols()
            )));
        }

        let k = self.n_topics();
        let mut out = Vec::with_capacity(counts.n_rows());
        for d in 0..counts.n_rows() {
            let row: Vec<(usize, f64)> = counts.nonzero(d).collect();
            let mut theta = vec![1.0 / k as f64; k];

            for _ in 0..100 {
                let mut next = vec![self.alpha; k];
                for &(w, c) in &row {
                    let norm: f64 = (0..k).map(|t| theta[t] * self.topic_term[[t, w]]).sum();
                    if norm <= 0.0 {
                        continue;
                    }
                    for t in 0..k {
                        next[t] += c * theta[t] * self.topic_term[[t, w]] / norm;
                    }
                }
                let total: f64 = next.iter().sum();
                next.iter_mut().for_each(|v| *v /= total);

                let shift: f64 = next.iter().zip(&theta).map(|(a, b)| (a - b).abs()).sum();
                theta = next;
                if shift <= self.tolerance {
                    break;
                }
            }
            out.push(TopicAssignment::from_distribution(theta));
        }
        Ok(out)
    }
}

/// Index of the largest value; exact ties go to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Number of distinct rows with at least one nonzero entry.
pub fn distinct_nonzero_rows(matrix: &FeatureMatrix) -> usize {
    let mut seen: HashSet<Vec<u64>> = HashSet::new();
    for row in matrix.values().rows() {
        if row.iter().any(|&v| v != 0.0) {
            seen.insert(row.iter().map(|v| v.to_bits()).collect());
        }
    }
    seen.len()
}

fn normalize_doc_topic(counts: &Array2<f64>, alpha: f64) -> Array2<f64> {
    let fallback = 1.0 / counts.ncols() as f64;
    let mut out = counts.mapv(|c| c + alpha);
    for mut row in out.rows_mut() {
        let total = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|v| v / total);
        } else {
            row.fill(fallback);
        }
    }
    out
}

fn normalize_topic_term(counts: &Array2<f64>, totals: &Array1<f64>, beta: f64) -> Array2<f64> {
    let beta_sum = beta * counts.ncols() as f64;
    let mut out = counts.mapv(|c| c + beta);
    for (t, mut row) in out.rows_mut().into_iter().enumerate() {
        let denom = totals[t] + beta_sum;
        row.mapv_inplace(|v| v / denom);
    }
    out
}

/// Sum over documents and terms of count * ln(sum_t theta_dt * phi_tw).
fn data_log_likelihood(
    counts: &FeatureMatrix,
    doc_topic: &Array2<f64>,
    topic_term: &Array2<f64>,
) -> f64 {
    let mut ll = 0.0;
    for d in 0..counts.n_rows() {
        for (w, c) in counts.nonzero(d) {
            let p = doc_topic.row(d).dot(&topic_term.column(w));
            ll += c * p.max(f64::MIN_POSITIVE).ln();
        }
    }
    ll
}
