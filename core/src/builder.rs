//! Inverted index construction.
//!
//! Map phase: each document is scanned on its own rayon task into a local
//! `word -> positions` table. Reduce phase: the tables are merged on one
//! thread in document order, so every keyword lists its occurrences in the
//! order documents were loaded and repeated builds are identical.

use crate::index::{DocId, Document, Keyword, Occurrence};
use rayon::prelude::*;
use std::collections::HashMap;

/// Positions of every distinct word within one document.
fn local_positions(doc: &Document) -> HashMap<&str, Vec<u32>> {
    let mut positions: HashMap<&str, Vec<u32>> = HashMap::new();
    for (pos, token) in doc.tokens.iter().enumerate() {
        positions.entry(token.as_str()).or_default().push(pos as u32);
    }
    positions
}

/// Builds the vocabulary for `documents`, using each document's index as its id.
/// Weights are left at zero; see [`crate::weights::compute_weights`].
pub fn build_vocabulary(documents: &[Document]) -> HashMap<String, Keyword> {
    // MAP
    let per_doc: Vec<HashMap<&str, Vec<u32>>> = documents.par_iter().map(local_positions).collect();

    // REDUCE
    let mut vocabulary: HashMap<String, Keyword> = HashMap::new();
    for (doc_id, words) in per_doc.into_iter().enumerate() {
        for (word, positions) in words {
            vocabulary
                .entry(word.to_string())
                .or_insert_with(|| Keyword::new(word))
                .occurrences.push(Occurrence { document_id: doc_id as DocId, positions, term_frequency: 0.0 });
        }
    }
    vocabulary
}
