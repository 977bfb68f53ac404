use crate::{ConfusionMatrix, IndexSnapshot, NaiveBayes};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_keywords: u32,
    pub created_at: String,
    pub version: u32,
    /// Held-out evaluation of the classifier, when a test split existed.
    #[serde(default)]
    pub evaluation: Option<ConfusionMatrix>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn encode_snapshot(snapshot: &IndexSnapshot) -> Result<Vec<u8>> {
    Ok(bincode::serialize(snapshot)?)
}

/// Decodes a snapshot blob and rejects it unless the index invariants hold.
pub fn decode_snapshot(bytes: &[u8]) -> Result<IndexSnapshot> {
    let snapshot: IndexSnapshot = bincode::deserialize(bytes)?;
    snapshot.validate()?;
    Ok(snapshot)
}

fn write_file(path: PathBuf, bytes: &[u8]) -> Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    Ok(())
}

fn read_file(path: PathBuf) -> Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_snapshot(paths: &IndexPaths, snapshot: &IndexSnapshot) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_file(paths.snapshot(), &encode_snapshot(snapshot)?)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<IndexSnapshot> {
    decode_snapshot(&read_file(paths.snapshot())?)
}

pub fn save_model(paths: &IndexPaths, model: &NaiveBayes) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_file(paths.model(), &bincode::serialize(model)?)
}

pub fn load_model(paths: &IndexPaths) -> Result<NaiveBayes> {
    let model = bincode::deserialize(&read_file(paths.model())?)?;
    Ok(model)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_file(paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Load everything needed to serve queries: snapshot, classifier and meta.
pub fn load_index(paths: &IndexPaths) -> Result<(IndexSnapshot, NaiveBayes, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        anyhow::bail!("unsupported index version {} (expected {FORMAT_VERSION})", meta.version);
    }
    let snapshot = load_snapshot(paths)?;
    let model = load_model(paths)?;
    let n_categories = model.n_categories();
    if let Some(doc) = snapshot.documents.iter().find(|d| d.label().category().is_some_and(|c| c >= n_categories)) {
        anyhow::bail!("document {:?} is labeled {} but the model knows {n_categories} categories", doc.title, doc.label());
    }
    Ok((snapshot, model, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Label};

    fn snapshot() -> IndexSnapshot {
        let doc = |t: &str, l| Document::new(t, t, t.split_whitespace().map(String::from).collect(), l);
        IndexSnapshot::build(vec![doc("buy cheap watches now", Label::Category(1)), doc("team meeting notes", Label::Unlabeled)])
    }

    #[test]
    fn blob_round_trip() {
        let s = snapshot();
        let decoded = decode_snapshot(&encode_snapshot(&s).unwrap()).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn decode_rejects_broken_snapshot() {
        let mut s = snapshot();
        s.vocabulary.get_mut("buy").unwrap().occurrences[0].document_id = 9;
        let bytes = encode_snapshot(&s).unwrap();
        assert!(decode_snapshot(&bytes).is_err());
        assert!(decode_snapshot(&[1, 2, 3]).is_err());
    }

    #[test]
    fn files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let s = snapshot();
        let tokens = s.documents[0].tokens.clone();
        let model = NaiveBayes::train(&[(tokens.as_slice(), 1)], 2).unwrap();
        let meta = MetaFile {
            num_docs: 2,
            num_keywords: s.vocabulary.len() as u32,
            created_at: "2024-01-01T00:00:00Z".into(),
            version: FORMAT_VERSION,
            evaluation: Some(ConfusionMatrix::new(2)),
        };
        save_snapshot(&paths, &s).unwrap();
        save_model(&paths, &model).unwrap();
        save_meta(&paths, &meta).unwrap();

        let (s2, model2, meta2) = load_index(&paths).unwrap();
        assert_eq!(s2, s);
        assert_eq!(model2, model);
        assert_eq!(meta2, meta);
    }

    #[test]
    fn load_rejects_labels_the_model_does_not_know() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let doc = |t: &str, l| Document::new(t, t, t.split_whitespace().map(String::from).collect(), l);
        let s = IndexSnapshot::build(vec![doc("buy cheap watches", Label::Category(3)), doc("see you soon", Label::Category(0))]);
        let tokens = s.documents[1].tokens.clone();
        let model = NaiveBayes::train(&[(tokens.as_slice(), 0)], 2).unwrap();
        assert_eq!(model.n_categories(), 2);
        let meta = MetaFile {
            num_docs: 2,
            num_keywords: s.vocabulary.len() as u32,
            created_at: "2024-01-01T00:00:00Z".into(),
            version: FORMAT_VERSION,
            evaluation: None,
        };
        save_snapshot(&paths, &s).unwrap();
        save_model(&paths, &model).unwrap();
        save_meta(&paths, &meta).unwrap();

        let err = load_index(&paths).unwrap_err();
        assert!(err.to_string().contains("labeled category 3 but the model knows 2 categories"), "{err}");
    }
}
