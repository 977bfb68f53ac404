use crate::classifier::NaiveBayes;
use crate::error::Result;
use crate::index::{Category, DocId, Document, IndexSnapshot, Label};
use rand::seq::SliceRandom;
use rand::Rng;

/// Documents in loading order. A document's id is its position here.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

/// Ids of labeled documents used for training and for held-out evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<DocId>,
    pub test: Vec<DocId>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Appends `doc` unless it has no tokens. Returns the id it was stored under.
    pub fn push(&mut self, doc: Document) -> Option<DocId> {
        if doc.tokens.is_empty() {
            tracing::debug!(title = %doc.title, "skipping document without tokens");
            return None;
        }
        let id = self.documents.len() as DocId;
        self.documents.push(doc);
        Some(id)
    }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn get(&self, id: DocId) -> Option<&Document> { self.documents.get(id as usize) }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn labeled_ids(&self) -> Vec<DocId> {
        self.documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.label() != Label::Unlabeled)
            .map(|(i, _)| i as DocId)
            .collect()
    }

    /// Shuffles the labeled documents and keeps `ceil(n * train_fraction)` of them for training.
    pub fn split_labeled<R: Rng + ?Sized>(&self, train_fraction: f64, rng: &mut R) -> TrainTestSplit {
        let mut ids = self.labeled_ids();
        ids.shuffle(rng);
        let fraction = train_fraction.clamp(0.0, 1.0);
        let train_count = ((ids.len() as f64) * fraction).ceil() as usize;
        let test = ids.split_off(train_count.min(ids.len()));
        TrainTestSplit { train: ids, test }
    }

    /// `(tokens, category)` pairs for the given labeled ids; unlabeled or unknown ids are skipped.
    pub fn examples(&self, ids: &[DocId]) -> Vec<(&[String], Category)> {
        ids.iter()
            .filter_map(|&id| {
                let doc = self.get(id)?;
                Some((doc.tokens.as_slice(), doc.label().category()?))
            })
            .collect()
    }

    /// Writes a predicted label onto every unlabeled document. Returns how many were labeled.
    pub fn classify_unlabeled(&mut self, model: &NaiveBayes) -> Result<usize> {
        let mut labeled = 0;
        for doc in self.documents.iter_mut().filter(|d| d.label() == Label::Unlabeled) {
            let category = model.predict(doc.tokens.as_slice());
            doc.assign_label(category)?;
            labeled += 1;
        }
        tracing::info!(labeled, "classified unlabeled documents");
        Ok(labeled)
    }

    pub fn into_snapshot(self) -> IndexSnapshot { IndexSnapshot::build(self.documents) }
}
