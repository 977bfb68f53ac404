//! Phrase-gated, tf-idf ranked search.
//!
//! A document is a candidate when the whole query occurs in it as a run of
//! consecutive tokens starting at one of the lead word's positions. Candidates
//! are then scored with the summed `tf * idf` of every query word they
//! contain anywhere, not only inside the matched phrase.

use crate::index::{DocId, IndexSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: DocId,
    pub score: f64,
}

#[inline]
fn phrase_at<S: AsRef<str>>(tokens: &[String], start: usize, query: &[S]) -> bool {
    let Some(end) = start.checked_add(query.len()) else { return false };
    match tokens.get(start..end) {
        Some(window) => window.iter().zip(query).all(|(t, q)| t == q.as_ref()),
        None => false, // phrase runs past the end of the document
    }
}

/// Ranks documents containing `query` as a phrase, highest score first. Equal
/// scores keep the order in which candidates were found.
pub fn search<S: AsRef<str>>(snapshot: &IndexSnapshot, query: &[S]) -> Vec<SearchHit> {
    let Some(lead) = query.first().and_then(|w| snapshot.keyword(w.as_ref())) else {
        return Vec::new();
    };

    let mut hits: Vec<SearchHit> = Vec::new();
    let mut slot: HashMap<DocId, usize> = HashMap::new();
    for occ in &lead.occurrences {
        let Some(doc) = snapshot.document(occ.document_id) else { continue };
        if occ.positions.iter().any(|&p| phrase_at(&doc.tokens, p as usize, query)) {
            slot.insert(occ.document_id, hits.len());
            hits.push(SearchHit { document_id: occ.document_id, score: 0.0 });
        }
    }

    for word in query {
        let Some(keyword) = snapshot.keyword(word.as_ref()) else { continue };
        for occ in &keyword.occurrences {
            if let Some(&i) = slot.get(&occ.document_id) {
                hits[i].score += occ.term_frequency * keyword.inverse_document_frequency;
            }
        }
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits
}
