use std::{
    collections::HashSet,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{debug, info, warn};

use crate::{
    config::Config,
    error::Result,
    models::{card_key, CardMap, DecklistBlock, ResolvedSnapshot},
    mtg::{CardCatalog, COLLECTION_LIMIT},
    parsing::parse_decklist,
    store::{content_hash, DocumentMeta, MetadataStore},
};

pub const DEFAULT_PACING: Duration = Duration::from_millis(110);

/// Turns decklist text into card metadata, one paced collection request per
/// chunk of names.
pub struct Resolver<C> {
    catalog: C,
    chunk_size: usize,
    pacing: Duration,
}

impl<C: CardCatalog> Resolver<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            chunk_size: COLLECTION_LIMIT,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_config(catalog: C, config: &Config) -> Self {
        Self {
            catalog,
            chunk_size: config.chunk_size.clamp(1, COLLECTION_LIMIT),
            pacing: config.pacing(),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Looks up every distinct name. Requests run one after another with the
    /// pacing delay between them; a failed chunk is logged and skipped.
    pub async fn fetch_cards(&self, names: &[String]) -> CardMap {
        let names = distinct_names(names);
        let mut cards = CardMap::new();

        for (i, chunk) in names.chunks(self.chunk_size).enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            match self.catalog.fetch_collection(chunk).await {
                Ok(records) => {
                    for record in records {
                        cards.insert(card_key(&record.name), record);
                    }
                }
                Err(e) => warn!("skipping chunk {} ({} names): {}", i, chunk.len(), e),
            }
        }

        cards
    }

    /// Reuses `previous` untouched when `raw` hashes the same, otherwise
    /// builds a fresh snapshot.
    pub async fn resolve(&self, raw: &str, previous: Option<&ResolvedSnapshot>) -> ResolvedSnapshot {
        let hash = content_hash(raw);
        if let Some(previous) = previous.filter(|p| p.content_hash == hash) {
            debug!("decklist {} unchanged, reusing snapshot", hash);
            return previous.clone();
        }

        let names = parse_decklist(raw).names();
        let cards = self.fetch_cards(&names).await;
        info!("resolved {}/{} card names for decklist {}", cards.len(), names.len(), hash);

        ResolvedSnapshot {
            content_hash: hash,
            fetched_at: unix_now(),
            cards,
        }
    }

    /// Recomputes the stored metadata of a document after it was saved.
    /// Instances that left the document are dropped from the store.
    pub async fn refresh_document<S: MetadataStore>(
        &self,
        store: &mut S,
        document: &str,
        blocks: &[DecklistBlock],
    ) -> Result<DocumentMeta> {
        if blocks.is_empty() {
            store.remove(document)?;
            return Ok(DocumentMeta::new());
        }

        let previous = store.load(document)?;
        let mut meta = DocumentMeta::new();

        for block in blocks {
            let instance = block.instance_id.trim();
            if instance.is_empty() || block.content.is_empty() {
                continue;
            }
            let snapshot = self.resolve(&block.content, previous.get(instance)).await;
            meta.insert(instance.to_owned(), snapshot);
        }

        store.save(document, meta.clone())?;
        Ok(meta)
    }
}

/// Trimmed, non-empty names with case-insensitive duplicates removed. The
/// first spelling wins.
pub fn distinct_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
