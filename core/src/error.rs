use crate::index::Category;

/// Errors raised by the engine. Per-record anomalies (malformed lines, empty
/// documents, unseen words) are absorbed where they occur and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot train a classifier without labeled documents")]
    EmptyTrainingSet,
    #[error("classifier needs at least one category")]
    NoCategories,
    #[error("category {category} out of range for {n_categories} categories")]
    CategoryOutOfRange { category: Category, n_categories: usize },
    #[error("document {title:?} already has a label")]
    LabelAlreadyAssigned { title: String },
    #[error("corrupt index snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
