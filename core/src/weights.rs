use crate::index::{Document, Keyword};
use std::collections::HashMap;

/// Dampened idf: `log10(1 + df / n)`. Lies in `[0, log10(2)]` for `df <= n` and
/// grows with `df`, so common words weigh slightly more, not less.
#[inline]
pub fn inverse_document_frequency(df: usize, n: usize) -> f64 {
    if n == 0 { return 0.0; }
    (1.0 + df as f64 / n as f64).log10()
}

#[inline]
pub fn term_frequency(occurrences: usize, doc_len: usize) -> f64 {
    if doc_len == 0 { return 0.0; }
    occurrences as f64 / doc_len as f64
}

/// Fills in idf for every keyword and tf for every occurrence. Must run once all
/// documents are indexed; every value is recomputed from scratch.
pub fn compute_weights(documents: &[Document], vocabulary: &mut HashMap<String, Keyword>) {
    let n = documents.len();
    for keyword in vocabulary.values_mut() {
        keyword.inverse_document_frequency = inverse_document_frequency(keyword.document_frequency(), n);
        for occ in keyword.occurrences.iter_mut() {
            let doc_len = documents.get(occ.document_id as usize).map_or(0, |d| d.tokens.len());
            occ.term_frequency = term_frequency(occ.positions.len(), doc_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_bounds_and_monotonicity() {
        let n = 10;
        let mut prev = 0.0;
        for df in 1..=n {
            let idf = inverse_document_frequency(df, n);
            assert!(idf > 0.0 && idf <= 2f64.log10());
            assert!(idf >= prev);
            prev = idf;
        }
        assert!(inverse_document_frequency(n - 1, n) < 2f64.log10());
    }

    #[test]
    fn idf_matches_formula() {
        assert!((inverse_document_frequency(1, 2) - 1.5f64.log10()).abs() < 1e-12);
        assert_eq!(inverse_document_frequency(0, 0), 0.0);
    }

    #[test]
    fn tf_is_fraction_of_tokens() {
        assert_eq!(term_frequency(2, 4), 0.5);
        assert_eq!(term_frequency(0, 0), 0.0);
    }
}
