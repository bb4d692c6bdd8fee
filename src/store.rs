use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use log::{info, warn};

use crate::{error::Result, models::ResolvedSnapshot};

/// Snapshots of one document, by block instance id.
pub type DocumentMeta = BTreeMap<String, ResolvedSnapshot>;

/// Hex MD5 of the raw decklist text. Snapshots are only ever reused on an
/// exact match of this digest.
pub fn content_hash(raw: &str) -> String {
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// Resolved metadata keyed by document id, then block instance id.
pub trait MetadataStore {
    /// Absent documents yield an empty map.
    fn load(&self, document: &str) -> Result<DocumentMeta>;
    fn save(&mut self, document: &str, meta: DocumentMeta) -> Result<()>;
    fn remove(&mut self, document: &str) -> Result<()>;

    fn snapshot(&self, document: &str, instance: &str) -> Result<Option<ResolvedSnapshot>> {
        Ok(self.load(document)?.remove(instance))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: HashMap<String, DocumentMeta>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryStore {
    fn load(&self, document: &str) -> Result<DocumentMeta> {
        Ok(self.documents.get(document).cloned().unwrap_or_default())
    }

    fn save(&mut self, document: &str, meta: DocumentMeta) -> Result<()> {
        self.documents.insert(document.to_owned(), meta);
        Ok(())
    }

    fn remove(&mut self, document: &str) -> Result<()> {
        self.documents.remove(document);
        Ok(())
    }
}

/// Every document in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, DocumentMeta>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(all) => Ok(all),
            Err(e) => {
                warn!("ignoring unreadable store {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, all: &BTreeMap<String, DocumentMeta>) -> Result<()> {
        let json = serde_json::to_string_pretty(all)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl MetadataStore for JsonFileStore {
    fn load(&self, document: &str) -> Result<DocumentMeta> {
        Ok(self.read_all()?.remove(document).unwrap_or_default())
    }

    fn save(&mut self, document: &str, meta: DocumentMeta) -> Result<()> {
        let mut all = self.read_all()?;
        info!(
            "storing {} snapshot(s) for document {} in {}",
            meta.len(),
            document,
            self.path.display()
        );
        all.insert(document.to_owned(), meta);
        self.write_all(&all)
    }

    fn remove(&mut self, document: &str) -> Result<()> {
        let mut all = self.read_all()?;
        if all.remove(document).is_some() {
            self.write_all(&all)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(hash: &str) -> ResolvedSnapshot {
        ResolvedSnapshot {
            content_hash: hash.to_owned(),
            fetched_at: 1,
            cards: Default::default(),
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mtg-decklist-{}-{}.json", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn hash_is_content_addressed() {
        assert_eq!(content_hash("1 Forest"), content_hash("1 Forest"));
        assert_ne!(content_hash("1 Forest"), content_hash("1 Forest\n"));
        assert_eq!(content_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let path = temp_path("store");
        let mut store = JsonFileStore::new(&path);
        assert!(store.load("post-1").unwrap().is_empty());

        let mut meta = DocumentMeta::new();
        meta.insert("block-a".to_owned(), snapshot("abc"));
        store.save("post-1", meta).unwrap();
        store.save("post-2", DocumentMeta::new()).unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.snapshot("post-1", "block-a").unwrap(), Some(snapshot("abc")));
        assert_eq!(reopened.snapshot("post-1", "block-b").unwrap(), None);

        store.remove("post-1").unwrap();
        assert!(store.load("post-1").unwrap().is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_store_reads_as_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.load("post-1").unwrap().is_empty());
        fs::remove_file(&path).unwrap();
    }
}
