// Text features: tokenization, vocabulary fitting, keywords and keyword similarity.

pub mod keywords;
pub mod similarity;
pub mod tokenize;
pub mod vectorizer;
