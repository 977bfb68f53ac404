use crate::builder::build_vocabulary;
use crate::error::{Error, Result};
use crate::weights::{compute_weights, inverse_document_frequency, term_frequency};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type DocId = u32;
pub type Category = usize;

pub const HAM: Category = 0;
pub const SPAM: Category = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Unlabeled,
    Category(Category),
}

impl Label {
    pub fn category(self) -> Option<Category> {
        match self {
            Label::Unlabeled => None,
            Label::Category(c) => Some(c),
        }
    }

    pub fn is_spam(self) -> bool { self == Label::Category(SPAM) }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Unlabeled => f.write_str("unlabeled"),
            Label::Category(HAM) => f.write_str("ham"),
            Label::Category(SPAM) => f.write_str("spam"),
            Label::Category(c) => write!(f, "category {c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub content: String,
    pub tokens: Vec<String>,
    label: Label,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tokens: Vec<String>, label: Label) -> Self {
        Self { title: title.into(), content: content.into(), tokens, label }
    }

    pub fn label(&self) -> Label { self.label }

    /// Moves an unlabeled document to `Category(category)`. Labels are assigned at
    /// most once; a document that already carries one is left untouched.
    pub fn assign_label(&mut self, category: Category) -> Result<()> {
        match self.label {
            Label::Unlabeled => {
                self.label = Label::Category(category);
                Ok(())
            }
            Label::Category(_) => Err(Error::LabelAlreadyAssigned { title: self.title.clone() }),
        }
    }
}

/// One word in one document: every position it occupies plus its term frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub document_id: DocId,
    pub positions: Vec<u32>, // strictly increasing
    pub term_frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub occurrences: Vec<Occurrence>, // document-loading order
    pub inverse_document_frequency: f64,
}

impl Keyword {
    pub fn new(word: impl Into<String>) -> Self {
        Self { word: word.into(), occurrences: Vec::new(), inverse_document_frequency: 0.0 }
    }

    pub fn document_frequency(&self) -> usize { self.occurrences.len() }

    pub fn occurrence_in(&self, document_id: DocId) -> Option<&Occurrence> {
        self.occurrences.iter().find(|o| o.document_id == document_id)
    }
}

/// The fully built, read-only state that queries run against.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub documents: Vec<Document>,
    pub vocabulary: HashMap<String, Keyword>,
}

impl IndexSnapshot {
    /// Indexes `documents` and computes weights. Documents without tokens are
    /// dropped first, so ids are positions in the surviving sequence.
    pub fn build(mut documents: Vec<Document>) -> Self {
        let before = documents.len();
        documents.retain(|d| !d.tokens.is_empty());
        if documents.len() != before {
            tracing::debug!(excluded = before - documents.len(), "excluded documents without tokens");
        }

        let mut vocabulary = build_vocabulary(&documents);
        compute_weights(&documents, &mut vocabulary);
        tracing::info!(num_docs = documents.len(), num_keywords = vocabulary.len(), "index snapshot built");
        Self { documents, vocabulary }
    }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.documents.get(id as usize) }

    pub fn keyword(&self, word: &str) -> Option<&Keyword> { self.vocabulary.get(word) }

    /// Checks the invariants a decoded snapshot must satisfy: every occurrence
    /// points at a real document holding the word at each listed position,
    /// occurrences run in document order, every token of every document is
    /// covered exactly once, and the stored weights equal the ones
    /// `compute_weights` would produce.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(Error::CorruptSnapshot(msg));
        let mut covered = 0usize;

        for (key, keyword) in &self.vocabulary {
            if *key != keyword.word {
                return corrupt(format!("keyword {:?} stored under {key:?}", keyword.word));
            }
            if keyword.occurrences.is_empty() {
                return corrupt(format!("keyword {key:?} has no occurrences"));
            }
            let idf = inverse_document_frequency(keyword.document_frequency(), self.documents.len());
            if keyword.inverse_document_frequency != idf {
                return corrupt(format!("keyword {key:?} has idf {} instead of {idf}", keyword.inverse_document_frequency));
            }
            if let Some(w) = keyword.occurrences.windows(2).find(|w| w[0].document_id >= w[1].document_id) {
                return corrupt(format!("keyword {key:?} lists document {} after document {}", w[1].document_id, w[0].document_id));
            }
            for occ in &keyword.occurrences {
                let Some(doc) = self.document(occ.document_id) else {
                    return corrupt(format!("keyword {key:?} references missing document {}", occ.document_id));
                };
                if occ.positions.is_empty() || occ.positions.windows(2).any(|w| w[0] >= w[1]) {
                    return corrupt(format!("keyword {key:?} has unordered positions in document {}", occ.document_id));
                }
                let tf = term_frequency(occ.positions.len(), doc.tokens.len());
                if occ.term_frequency != tf {
                    return corrupt(format!("keyword {key:?} has tf {} instead of {tf} in document {}", occ.term_frequency, occ.document_id));
                }
                for &pos in &occ.positions {
                    if doc.tokens.get(pos as usize) != Some(&keyword.word) {
                        return corrupt(format!("document {} has no {key:?} at position {pos}", occ.document_id));
                    }
                }
                covered += occ.positions.len();
            }
        }

        let total_tokens: usize = self.documents.iter().map(|d| d.tokens.len()).sum();
        if covered != total_tokens {
            return corrupt(format!("{covered} indexed positions for {total_tokens} tokens"));
        }
        if let Some(doc) = self.documents.iter().find(|d| d.tokens.is_empty()) {
            return corrupt(format!("document {:?} has no tokens", doc.title));
        }
        Ok(())
    }
}
