//! TF-IDF vectorization of a keyword collection.
//!
//! Each keyword is one document. Features are character n-grams or whole
//! words, weighted with smoothed IDF and L2-normalized per row.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use serpcluster_shared::{Analyzer, ClusterError, ClusteringConfig, StopWords};

use crate::stop_words::ENGLISH_STOP_WORDS;

/// Sparse row: `(feature index, weight)` pairs sorted by index.
pub(crate) type SparseRow = Vec<(usize, f64)>;

/// Row-major sparse TF-IDF matrix.
#[derive(Debug, Clone)]
pub(crate) struct TfidfMatrix {
    pub rows: Vec<SparseRow>,
    pub n_features: usize,
}

impl TfidfMatrix {
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }
}

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Fit the vocabulary and IDF weights on `docs` and return their vectors.
///
/// Fails with [`ClusterError::NotEnoughUniqueKeywords`] when no document
/// produces a single feature.
pub(crate) fn fit_transform(
    docs: &[&str],
    config: &ClusteringConfig,
) -> Result<TfidfMatrix, ClusterError> {
    let stop_words: HashSet<&str> = match config.stop_words {
        StopWords::None => HashSet::new(),
        StopWords::English => ENGLISH_STOP_WORDS.iter().copied().collect(),
    };

    let analyzed: Vec<Vec<String>> = docs
        .iter()
        .map(|doc| analyze(doc, config, &stop_words))
        .collect();

    // Vocabulary indices follow lexical order of the features.
    let mut vocabulary: BTreeMap<&str, usize> = BTreeMap::new();
    for features in &analyzed {
        for feature in features {
            vocabulary.entry(feature.as_str()).or_insert(0);
        }
    }
    if vocabulary.is_empty() {
        return Err(ClusterError::NotEnoughUniqueKeywords);
    }
    for (index, slot) in vocabulary.values_mut().enumerate() {
        *slot = index;
    }
    let n_features = vocabulary.len();

    let counts: Vec<BTreeMap<usize, f64>> = analyzed
        .iter()
        .map(|features| {
            let mut row = BTreeMap::new();
            for feature in features {
                *row.entry(vocabulary[feature.as_str()]).or_insert(0.0) += 1.0;
            }
            row
        })
        .collect();

    let mut document_frequency = vec![0usize; n_features];
    for row in &counts {
        for &index in row.keys() {
            document_frequency[index] += 1;
        }
    }

    let n_docs = docs.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    let rows = counts
        .into_iter()
        .map(|row| {
            let mut weighted: SparseRow = row
                .into_iter()
                .map(|(index, tf)| (index, tf * idf[index]))
                .collect();
            let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in &mut weighted {
                    *w /= norm;
                }
            }
            weighted
        })
        .collect();

    Ok(TfidfMatrix { rows, n_features })
}

/// Split one document into its features.
fn analyze(doc: &str, config: &ClusteringConfig, stop_words: &HashSet<&str>) -> Vec<String> {
    let lowered = doc.to_lowercase();
    match config.analyzer {
        Analyzer::Word => WORD_RE
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|token| !stop_words.contains(token))
            .map(str::to_string)
            .collect(),
        Analyzer::CharWb => lowered
            .split_whitespace()
            .filter(|word| !stop_words.contains(word))
            .flat_map(|word| char_wb_ngrams(word, config.ngram_min, config.ngram_max))
            .collect(),
    }
}

/// Character n-grams of a single space-padded word.
///
/// A padded word shorter than `n` contributes itself once for that `n`.
fn char_wb_ngrams(word: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let padded: Vec<char> = std::iter::once(' ')
        .chain(word.chars())
        .chain(std::iter::once(' '))
        .collect();
    let len = padded.len();
    let mut grams = Vec::new();

    for n in min_n..=max_n {
        if n >= len {
            grams.push(padded.iter().collect());
            continue;
        }
        for start in 0..=(len - n) {
            grams.push(padded[start..start + n].iter().collect());
        }
    }

    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(analyzer: Analyzer) -> ClusteringConfig {
        ClusteringConfig {
            analyzer,
            ..ClusteringConfig::default()
        }
    }

    fn dot(a: &SparseRow, b: &SparseRow) -> f64 {
        let lookup: BTreeMap<usize, f64> = b.iter().copied().collect();
        a.iter()
            .map(|(i, w)| w * lookup.get(i).copied().unwrap_or(0.0))
            .sum()
    }

    #[test]
    fn char_wb_pads_and_slides() {
        let grams = char_wb_ngrams("seo", 3, 3);
        assert_eq!(grams, vec![" se", "seo", "eo "]);
    }

    #[test]
    fn char_wb_short_word_emits_padded_word_once() {
        let grams = char_wb_ngrams("ab", 5, 5);
        assert_eq!(grams, vec![" ab "]);
    }

    #[test]
    fn word_analyzer_gives_one_hot_rows() {
        let matrix = fit_transform(&["rust", "search"], &config(Analyzer::Word)).unwrap();
        assert_eq!(matrix.n_features, 2);
        assert_eq!(matrix.rows[0], vec![(0, 1.0)]);
        assert_eq!(matrix.rows[1], vec![(1, 1.0)]);
    }

    #[test]
    fn rows_are_unit_length() {
        let docs = ["marketing", "market", "strategy", "strategies"];
        let matrix = fit_transform(&docs, &ClusteringConfig::default()).unwrap();
        for row in &matrix.rows {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn shared_substrings_raise_similarity() {
        let docs = ["marketing", "marketer", "zoology"];
        let matrix = fit_transform(&docs, &ClusteringConfig::default()).unwrap();
        let related = dot(&matrix.rows[0], &matrix.rows[1]);
        let unrelated = dot(&matrix.rows[0], &matrix.rows[2]);
        assert!(related > unrelated);
        assert!(unrelated.abs() < 1e-12);
    }

    #[test]
    fn stop_words_only_is_an_empty_vocabulary() {
        let mut cfg = config(Analyzer::Word);
        cfg.stop_words = StopWords::English;
        let err = fit_transform(&["about", "would", "these"], &cfg).unwrap_err();
        assert_eq!(err, ClusterError::NotEnoughUniqueKeywords);
    }

    #[test]
    fn stop_words_filter_char_analyzer_too() {
        let mut cfg = ClusteringConfig::default();
        cfg.stop_words = StopWords::English;
        let matrix = fit_transform(&["about", "keyword"], &cfg).unwrap();
        assert!(matrix.rows[0].is_empty());
        assert!(!matrix.rows[1].is_empty());
    }

    #[test]
    fn rarer_features_weigh_more() {
        let matrix = fit_transform(&["aaaa bbbb", "aaaa"], &config(Analyzer::Word)).unwrap();
        let row = &matrix.rows[0];
        assert_eq!(row.len(), 2);
        // "bbbb" occurs in one document, "aaaa" in both.
        assert!(row[1].1 > row[0].1);
        assert_eq!(matrix.rows[1], vec![(0, 1.0)]);
    }
}
