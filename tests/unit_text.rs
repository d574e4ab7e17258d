// Unit tests for the text layer: vectorizer, keyword extraction and
// keyword-list similarity, exercised through the public API.

use newsprism::error::AnalysisError;
use newsprism::text::keywords::KeywordExtractor;
use newsprism::text::similarity::keyword_similarity;
use newsprism::text::tokenize::StopWords;
use newsprism::text::vectorizer::{Vectorizer, VectorizerConfig};

fn permissive() -> VectorizerConfig {
    VectorizerConfig {
        max_df: 1.0,
        min_df: 1,
        max_features: None,
        stop_words: StopWords::None,
    }
}

// ============================================================
// Vectorizer
// ============================================================

#[test]
fn vocabulary_is_independent_of_document_order() {
    let texts = [
        "central bank raises rates",
        "storm floods coastal towns",
        "bank shares fall after rates decision",
    ];
    let reversed = [texts[2], texts[1], texts[0]];

    let a = Vectorizer::new(permissive()).fit_transform(&texts).unwrap();
    let b = Vectorizer::new(permissive()).fit_transform(&reversed).unwrap();

    assert_eq!(a.vocabulary.terms(), b.vocabulary.terms());
    for (row_a, row_b) in [(0, 2), (1, 1), (2, 0)] {
        assert_eq!(a.tfidf.row(row_a), b.tfidf.row(row_b));
        assert_eq!(a.counts.row(row_a), b.counts.row(row_b));
    }
}

#[test]
fn stop_words_never_enter_the_vocabulary() {
    let config = VectorizerConfig {
        stop_words: StopWords::custom(["as", "after", "this"]),
        ..permissive()
    };
    let out = Vectorizer::new(config)
        .fit_transform(&["stocks rally as markets surge", "markets surge after earnings"])
        .unwrap();
    for word in ["as", "after", "this"] {
        assert!(out.vocabulary.index_of(word).is_none(), "{word} leaked");
    }
    assert!(out.vocabulary.index_of("markets").is_some());
}

#[test]
fn single_character_tokens_are_ignored() {
    let out = Vectorizer::new(permissive())
        .fit_transform(&["a b c markets"])
        .unwrap();
    assert_eq!(out.vocabulary.terms(), &["markets".to_string()]);
}

#[test]
fn tfidf_rows_are_unit_length() {
    let out = Vectorizer::new(permissive())
        .fit_transform(&["alpha beta beta", "beta gamma", "gamma gamma delta"])
        .unwrap();
    for row in 0..out.tfidf.n_rows() {
        let norm: f64 = out.tfidf.row(row).iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12, "row {row} has norm {norm}");
    }
}

#[test]
fn everything_filtered_is_empty_vocabulary() {
    let config = VectorizerConfig {
        max_df: 0.5,
        ..permissive()
    };
    let err = Vectorizer::new(config)
        .fit_transform(&["same words", "same words"])
        .unwrap_err();
    match err {
        AnalysisError::EmptyVocabulary {
            documents, max_df, ..
        } => {
            assert_eq!(documents, 2);
            assert_eq!(max_df, 0.5);
        }
        other => panic!("expected EmptyVocabulary, got {other:?}"),
    }
}

// ============================================================
// KeywordExtractor
// ============================================================

#[test]
fn keyword_lists_never_exceed_n() {
    let texts = [
        "parliament votes on the new budget after a long debate",
        "budget",
        "floods hit the northern region as rivers burst their banks",
    ];
    let out = Vectorizer::new(permissive()).fit_transform(&texts).unwrap();
    for n in [0, 1, 3, 50] {
        let keywords = KeywordExtractor::new(n).extract(&out.tfidf, &out.vocabulary);
        assert_eq!(keywords.len(), texts.len());
        for (row, list) in keywords.iter().enumerate() {
            let nonzero = out.tfidf.nonzero(row).count();
            assert_eq!(list.len(), n.min(nonzero), "row {row}, n {n}");
        }
    }
}

#[test]
fn keywords_are_strongest_first() {
    let out = Vectorizer::new(permissive())
        .fit_transform(&["flood flood flood warning", "warning issued"])
        .unwrap();
    let ranked = KeywordExtractor::new(3).ranked_row(&out.tfidf, 0);
    for pair in ranked.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }
    assert_eq!(out.vocabulary.term(ranked[0].0), Some("flood"));
}

#[test]
fn new_text_keywords_come_from_the_fitted_vocabulary() {
    let vectorizer = Vectorizer::new(permissive());
    let out = vectorizer
        .fit_transform(&["flood warning issued", "budget vote", "budget debate"])
        .unwrap();

    let tfidf = vectorizer.transform_tfidf(&out.vocabulary, &["budget budget flood tsunami"]);
    assert_eq!(tfidf.n_rows(), 1);
    assert_eq!(tfidf.n_cols(), out.vocabulary.len());
    let keywords = KeywordExtractor::new(5).extract_row(&tfidf, &out.vocabulary, 0);
    assert_eq!(keywords, vec!["budget", "flood"]);

    let unknown = vectorizer.transform_tfidf(&out.vocabulary, &["tsunami earthquake"]);
    assert!(KeywordExtractor::new(5)
        .extract_row(&unknown, &out.vocabulary, 0)
        .is_empty());
}

// ============================================================
// Similarity
// ============================================================

#[test]
fn similarity_is_symmetric() {
    let a = ["election", "senate", "vote"];
    let b = ["vote", "turnout"];
    let ab = keyword_similarity(&a, &b).unwrap();
    let ba = keyword_similarity(&b, &a).unwrap();
    assert!((ab - ba).abs() < 1e-12);
}

#[test]
fn similarity_ignores_order_within_a_list() {
    let s1 = keyword_similarity(&["storm", "coast"], &["coast", "storm"]).unwrap();
    assert!((s1 - 1.0).abs() < 1e-9);
}

#[test]
fn similarity_keeps_words_a_stop_list_would_drop() {
    // The refit uses no stop words, so even "the" counts as a term
    let score = keyword_similarity(&["the"], &["the"]).unwrap();
    assert!((score - 1.0).abs() < 1e-9);
}
