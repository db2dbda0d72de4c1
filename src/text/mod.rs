pub mod stop_words;
pub mod vectorizer;

pub use vectorizer::TfidfVectorizer;

/// `(feature index, weight)` pairs sorted by index
pub type SparseVector = Vec<(usize, f64)>;
