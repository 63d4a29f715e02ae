use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::catalog::GrailCatalog;
use crate::classifier::GrailMatcher;
use crate::decoder::SaveDecoder;
use crate::event_bus::{EventBus, GrailEvent, ItemDetectionPayload, DETECTION_ITEM_FOUND};
use crate::extract::{extract_character_items, extract_stash_items};
use crate::items::{is_shared_stash_path, ExtractedItem, SaveSource};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetectionKey {
    pub item_id: String,
    pub ethereal: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub item_id: String,
    #[serde(default)]
    pub is_ethereal: bool,
}

#[derive(Default)]
struct SeenState {
    global: HashSet<DetectionKey>,
    by_file: HashMap<PathBuf, HashSet<DetectionKey>>,
}

pub struct ItemDetectionService {
    bus: Arc<EventBus>,
    decoder: Arc<dyn SaveDecoder>,
    catalog: Mutex<Arc<GrailCatalog>>,
    seen: Mutex<SeenState>,
}

impl ItemDetectionService {
    pub fn new(bus: Arc<EventBus>, decoder: Arc<dyn SaveDecoder>, catalog: Arc<GrailCatalog>) -> Self {
        Self {
            bus,
            decoder,
            catalog: Mutex::new(catalog),
            seen: Mutex::new(SeenState::default()),
        }
    }

    pub fn set_grail_items(&self, catalog: Arc<GrailCatalog>) {
        match self.catalog.lock() {
            Ok(mut active_catalog) => *active_catalog = catalog,
            Err(error) => {
                tracing::error!("Failed to replace grail catalog: {error}");
            }
        }
    }

    pub(crate) fn current_catalog(&self) -> Arc<GrailCatalog> {
        match self.catalog.lock() {
            Ok(active_catalog) => Arc::clone(&active_catalog),
            Err(error) => {
                tracing::error!("Failed to read grail catalog: {error}");
                Arc::new(GrailCatalog::new(Vec::new()))
            }
        }
    }

    pub fn initialize_from_database(&self, progress_records: &[ProgressRecord]) {
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(error) => {
                tracing::error!("Failed to lock detection state: {error}");
                return;
            }
        };

        for record in progress_records {
            seen.global.insert(DetectionKey {
                item_id: record.item_id.clone(),
                ethereal: record.is_ethereal,
            });
        }

        tracing::debug!(
            seeded_keys = seen.global.len(),
            "Seeded detection state from persisted progress"
        );
    }

    pub async fn analyze_save_file(
        &self,
        source: &SaveSource,
        pre_extracted_items: Option<Vec<ExtractedItem>>,
    ) {
        // A supplied list is authoritative, even when empty; the file is
        // only read when no extraction result is handed in.
        let extracted_items = match pre_extracted_items {
            Some(extracted_items) => extracted_items,
            None => self.read_and_extract(source).await,
        };

        let matcher = GrailMatcher::new(self.current_catalog());
        for extracted_item in extracted_items {
            let Some(grail_item) = matcher.resolve_extracted(&extracted_item) else {
                continue;
            };

            let detection_key = DetectionKey {
                item_id: grail_item.id.clone(),
                ethereal: extracted_item.ethereal,
            };
            if !self.mark_seen(&source.path, detection_key) {
                continue;
            }

            self.bus.emit(&GrailEvent::ItemDetection(ItemDetectionPayload {
                event_type: DETECTION_ITEM_FOUND.to_string(),
                item: extracted_item.clone(),
                grail_item: grail_item.clone(),
            }));
        }
    }

    pub fn clear_seen_items(&self, save_file_path: Option<&Path>) {
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(error) => {
                tracing::error!("Failed to lock detection state: {error}");
                return;
            }
        };

        match save_file_path {
            None => {
                seen.global.clear();
                seen.by_file.clear();
            }
            Some(path) => {
                // Per-file and global state are coupled: clearing a file
                // lets its items fire again on the next parse.
                if let Some(file_keys) = seen.by_file.remove(path) {
                    for key in file_keys {
                        seen.global.remove(&key);
                    }
                }
            }
        }
    }

    fn mark_seen(&self, save_file_path: &Path, detection_key: DetectionKey) -> bool {
        let mut seen = match self.seen.lock() {
            Ok(seen) => seen,
            Err(error) => {
                tracing::error!("Failed to lock detection state: {error}");
                return false;
            }
        };

        if seen.global.contains(&detection_key) {
            return false;
        }

        seen.global.insert(detection_key.clone());
        seen.by_file
            .entry(save_file_path.to_path_buf())
            .or_default()
            .insert(detection_key);
        true
    }

    async fn read_and_extract(&self, source: &SaveSource) -> Vec<ExtractedItem> {
        let bytes = match tokio::fs::read(&source.path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(
                    "Failed to read save file '{}': {error}",
                    source.path.display()
                );
                return Vec::new();
            }
        };

        let matcher = GrailMatcher::new(self.current_catalog());
        if is_shared_stash_path(&source.path) {
            match self.decoder.decode_stash(&bytes) {
                Ok(stash) => extract_stash_items(&matcher, &stash, &source.name),
                Err(error) => {
                    tracing::warn!(
                        "Failed to decode shared stash '{}': {error}",
                        source.path.display()
                    );
                    Vec::new()
                }
            }
        } else {
            match self.decoder.decode_character(&bytes) {
                Ok(save) => extract_character_items(&matcher, &save, &source.name),
                Err(error) => {
                    tracing::warn!(
                        "Failed to decode save file '{}': {error}",
                        source.path.display()
                    );
                    Vec::new()
                }
            }
        }
    }
}
