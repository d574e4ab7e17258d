// Cosine similarity between two keyword lists.
//
// Each list becomes a pseudo-document and a fresh two-document TF-IDF space is
// fit over exactly that pair. Scores are only comparable within one pair: two
// different pairs live in two different vocabularies.

use super::tokenize::StopWords;
use super::vectorizer::{Vectorizer, VectorizerConfig};
use crate::error::Result;

/// Similarity in [0, 1]: 1 for identical weighted term distributions,
/// 0 when the lists share no terms.
///
/// Fails with `EmptyVocabulary` when neither list contains a usable token.
pub fn keyword_similarity<A, B>(keywords_a: &[A], keywords_b: &[B]) -> Result<f64>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let doc_a = join(keywords_a);
    let doc_b = join(keywords_b);

    let vectorizer = Vectorizer::new(VectorizerConfig {
        max_df: 1.0,
        min_df: 1,
        max_features: None,
        stop_words: StopWords::None,
    });
    let space = vectorizer.fit_transform(&[doc_a, doc_b])?;

    // Rows are L2-normalised, so the dot product is the cosine. A row with no
    // terms stays all-zero and scores 0 against anything.
    let a = space.tfidf.row(0);
    let b = space.tfidf.row(1);
    let dot = a.dot(&b);
    Ok(dot.clamp(0.0, 1.0))
}

fn join<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    #[test]
    fn test_identical_lists_score_one() {
        let kw = ["markets", "surge", "earnings"];
        let score = keyword_similarity(&kw, &kw).unwrap();
        assert!((score - 1.0).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_disjoint_lists_score_zero() {
        let score = keyword_similarity(&["markets", "surge"], &["weather", "cold"]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_partial_overlap_is_between() {
        let score =
            keyword_similarity(&["markets", "surge", "rally"], &["markets", "earnings"]).unwrap();
        assert!(score > 0.0 && score < 1.0, "got {score}");
    }

    #[test]
    fn test_one_empty_side_scores_zero() {
        let empty: [&str; 0] = [];
        let score = keyword_similarity(&empty, &["markets"]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_both_empty_is_error() {
        let empty: [&str; 0] = [];
        let err = keyword_similarity(&empty, &empty).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyVocabulary { .. }));
    }
}
