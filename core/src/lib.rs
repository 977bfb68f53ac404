//! Phrase-aware keyword search and Naive-Bayes spam classification over a
//! corpus of short text messages.

pub mod builder;
pub mod classifier;
pub mod error;
pub mod index;
pub mod loader;
pub mod persist;
pub mod search;
pub mod store;
pub mod tokenizer;
pub mod weights;

pub use classifier::{ConfusionMatrix, NaiveBayes};
pub use error::{Error, Result};
pub use index::{Category, DocId, Document, IndexSnapshot, Keyword, Label, Occurrence, HAM, SPAM};
pub use search::{search, SearchHit};
pub use store::{DocumentStore, TrainTestSplit};
