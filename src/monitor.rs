use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, UNIX_EPOCH};
use tokio::task::JoinHandle;

use crate::classifier::GrailMatcher;
use crate::decoder::SaveDecoder;
use crate::detection::ItemDetectionService;
use crate::event_bus::{
    EventBus, GrailEvent, MonitoringErrorPayload, MonitoringStartedPayload,
    MonitoringStoppedPayload, SaveFileEventPayload, ERROR_DIRECTORY_NOT_FOUND, SAVE_FILE_UPDATED,
};
use crate::executor::execute_concurrently;
use crate::extract::{extract_character_items, extract_stash_items};
use crate::items::{
    character_class_name, is_character_save_path, is_shared_stash_path, save_name_from_path,
    ExtractedItem, SaveSource,
};
use crate::settings::{
    validated_debounce_delay, validated_tick_interval, GameMode, GrailSettings, SettingsProvider,
};

const PARSE_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub(crate) struct MonitorConfig {
    pub(crate) save_dir: PathBuf,
    pub(crate) game_mode: GameMode,
    pub(crate) tick_interval: Duration,
    pub(crate) debounce_delay: Duration,
}

impl MonitorConfig {
    fn from_settings(settings: &GrailSettings) -> Self {
        Self {
            save_dir: PathBuf::from(&settings.save_dir),
            game_mode: settings.game_mode,
            tick_interval: validated_tick_interval(settings.tick_reader_interval_ms),
            debounce_delay: validated_debounce_delay(settings.file_change_debounce_ms),
        }
    }
}

#[derive(Default)]
struct MonitorShared {
    watching: bool,
    watcher: Option<notify::RecommendedWatcher>,
    tick_handle: Option<JoinHandle<()>>,
    config: Option<MonitorConfig>,
    change_counter: u64,
    last_change_at: Option<Instant>,
    last_processed_counter: u64,
    initial_parse_pending: bool,
    force_parse_requested: bool,
    parse_in_flight: bool,
    save_sources: HashMap<PathBuf, SaveSource>,
}

struct ParseClaim {
    silent: bool,
    counter_snapshot: u64,
}

pub struct SaveFileMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    bus: Arc<EventBus>,
    decoder: Arc<dyn SaveDecoder>,
    detector: Arc<ItemDetectionService>,
    settings: Arc<dyn SettingsProvider>,
    shared: Mutex<MonitorShared>,
}

impl SaveFileMonitor {
    pub fn new(
        bus: Arc<EventBus>,
        decoder: Arc<dyn SaveDecoder>,
        detector: Arc<ItemDetectionService>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                bus,
                decoder,
                detector,
                settings,
                shared: Mutex::new(MonitorShared::default()),
            }),
        }
    }

    pub async fn start_monitoring(&self) -> Result<(), String> {
        {
            let shared = self.inner.shared.lock().map_err(|error| error.to_string())?;
            if shared.watching {
                return Ok(());
            }
        }

        let settings = self.inner.settings.get_all_settings();
        let config = MonitorConfig::from_settings(&settings);

        if !config.save_dir.is_dir() {
            self.inner
                .bus
                .emit(&GrailEvent::MonitoringError(MonitoringErrorPayload {
                    error_type: ERROR_DIRECTORY_NOT_FOUND.to_string(),
                    message: format!(
                        "Save directory '{}' does not exist",
                        config.save_dir.display()
                    ),
                    directory: config.save_dir.to_string_lossy().to_string(),
                }));
            return Ok(());
        }

        let inner_for_watcher = Arc::clone(&self.inner);
        let mut watcher = notify::recommended_watcher(
            move |notification: Result<Event, notify::Error>| match notification {
                Ok(event) => {
                    if is_relevant_notification(&event) {
                        inner_for_watcher.record_change();
                    }
                }
                Err(error) => {
                    tracing::warn!("Save directory watcher error: {error}");
                }
            },
        )
        .map_err(|error| error.to_string())?;
        watcher
            .watch(&config.save_dir, RecursiveMode::NonRecursive)
            .map_err(|error| error.to_string())?;

        let save_file_count = collect_save_file_paths(&config).len();

        {
            let mut shared = self.inner.shared.lock().map_err(|error| error.to_string())?;
            if shared.watching {
                return Ok(());
            }
            shared.watcher = Some(watcher);
            shared.config = Some(config.clone());
            shared.change_counter = 0;
            shared.last_processed_counter = 0;
            shared.last_change_at = None;
            shared.initial_parse_pending = true;
            shared.force_parse_requested = false;
            shared.watching = true;
        }

        // The initial pass bypasses the debounce window entirely.
        MonitorInner::trigger_parse_if_due(&self.inner, &config);

        let tick_inner = Arc::clone(&self.inner);
        let tick_config = config.clone();
        let tick_handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(tick_config.tick_interval);
            loop {
                tick.tick().await;
                MonitorInner::trigger_parse_if_due(&tick_inner, &tick_config);
            }
        });

        {
            let mut shared = self.inner.shared.lock().map_err(|error| error.to_string())?;
            shared.tick_handle = Some(tick_handle);
        }

        tracing::info!(
            directory = %config.save_dir.display(),
            save_file_count,
            "Started save file monitoring"
        );
        self.inner
            .bus
            .emit(&GrailEvent::MonitoringStarted(MonitoringStartedPayload {
                directory: config.save_dir.to_string_lossy().to_string(),
                save_file_count,
            }));

        Ok(())
    }

    pub fn stop_monitoring(&self) {
        let (was_watching, tick_handle, watcher) = {
            let mut shared = match self.inner.shared.lock() {
                Ok(shared) => shared,
                Err(error) => {
                    tracing::error!("Failed to lock monitor state: {error}");
                    return;
                }
            };

            let was_watching = shared.watching;
            shared.watching = false;
            (was_watching, shared.tick_handle.take(), shared.watcher.take())
        };

        drop(watcher);
        if let Some(tick_handle) = tick_handle {
            tick_handle.abort();
        }

        if was_watching {
            tracing::info!("Stopped save file monitoring");
            self.inner
                .bus
                .emit(&GrailEvent::MonitoringStopped(MonitoringStoppedPayload {}));
        }
    }

    pub fn request_parse(&self) {
        match self.inner.shared.lock() {
            Ok(mut shared) => shared.force_parse_requested = true,
            Err(error) => {
                tracing::error!("Failed to lock monitor state: {error}");
            }
        }
    }

    pub fn save_sources(&self) -> Vec<SaveSource> {
        match self.inner.shared.lock() {
            Ok(shared) => shared.save_sources.values().cloned().collect(),
            Err(error) => {
                tracing::error!("Failed to lock monitor state: {error}");
                Vec::new()
            }
        }
    }

    pub async fn parse_all_save_directories(&self, silent: bool) {
        let config = self.inner.active_config();
        self.inner.run_parse_pass(&config, silent).await;
    }
}

impl MonitorInner {
    // Single decision point for every parse trigger: the initial pass, an
    // explicit request, and debounced change bursts all come through here.
    fn trigger_parse_if_due(inner: &Arc<MonitorInner>, config: &MonitorConfig) {
        let Some(claim) = inner.claim_parse_slot(config) else {
            return;
        };

        let parse_inner = Arc::clone(inner);
        let parse_config = config.clone();
        tokio::spawn(async move {
            parse_inner.run_parse_pass(&parse_config, claim.silent).await;
            parse_inner.finish_parse(claim.counter_snapshot);
        });
    }

    fn claim_parse_slot(&self, config: &MonitorConfig) -> Option<ParseClaim> {
        let mut shared = match self.shared.lock() {
            Ok(shared) => shared,
            Err(error) => {
                tracing::error!("Failed to lock monitor state: {error}");
                return None;
            }
        };

        if !shared.watching || shared.parse_in_flight {
            return None;
        }

        let due_to_initial = shared.initial_parse_pending;
        let due_to_force = shared.force_parse_requested;
        let debounce_elapsed = shared
            .last_change_at
            .map(|changed_at| changed_at.elapsed() >= config.debounce_delay)
            .unwrap_or(false);
        let changes_pending = shared.change_counter > shared.last_processed_counter;
        let due_to_changes =
            config.game_mode != GameMode::Manual && debounce_elapsed && changes_pending;

        if !(due_to_initial || due_to_force || due_to_changes) {
            return None;
        }

        shared.initial_parse_pending = false;
        shared.force_parse_requested = false;
        shared.parse_in_flight = true;

        Some(ParseClaim {
            silent: due_to_initial,
            counter_snapshot: shared.change_counter,
        })
    }

    fn finish_parse(&self, counter_snapshot: u64) {
        match self.shared.lock() {
            Ok(mut shared) => {
                shared.parse_in_flight = false;
                shared.last_processed_counter = shared.last_processed_counter.max(counter_snapshot);
            }
            Err(error) => {
                tracing::error!("Failed to lock monitor state: {error}");
            }
        }
    }

    fn record_change(&self) {
        match self.shared.lock() {
            Ok(mut shared) => {
                shared.change_counter = shared.change_counter.saturating_add(1);
                shared.last_change_at = Some(Instant::now());
            }
            Err(error) => {
                tracing::error!("Failed to record save file change: {error}");
            }
        }
    }

    fn active_config(&self) -> MonitorConfig {
        if let Ok(shared) = self.shared.lock() {
            if let Some(config) = shared.config.as_ref() {
                return config.clone();
            }
        }

        MonitorConfig::from_settings(&self.settings.get_all_settings())
    }

    async fn run_parse_pass(&self, config: &MonitorConfig, silent: bool) {
        let save_file_paths = collect_save_file_paths(config);
        tracing::debug!(
            save_file_count = save_file_paths.len(),
            silent,
            "Parsing save directories"
        );

        let parse_tasks: Vec<_> = save_file_paths
            .into_iter()
            .map(|path| self.parse_save_file(path))
            .collect();
        let parse_results = execute_concurrently(parse_tasks, PARSE_CONCURRENCY).await;

        for (source, extracted_items) in parse_results.into_iter().flatten() {
            match self.shared.lock() {
                Ok(mut shared) => {
                    shared
                        .save_sources
                        .insert(source.path.clone(), source.clone());
                }
                Err(error) => {
                    tracing::error!("Failed to lock monitor state: {error}");
                }
            }

            self.detector
                .analyze_save_file(&source, Some(extracted_items.clone()))
                .await;

            self.bus.emit(&GrailEvent::SaveFileEvent(SaveFileEventPayload {
                event_type: SAVE_FILE_UPDATED.to_string(),
                file: source.path.to_string_lossy().to_string(),
                extracted_items,
                silent,
            }));
        }
    }

    async fn parse_save_file(
        &self,
        path: PathBuf,
    ) -> Result<(SaveSource, Vec<ExtractedItem>), String> {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|error| format!("Failed to read save file '{}': {error}", path.display()))?;
        let matcher = GrailMatcher::new(self.detector.current_catalog());
        let modified_at = file_modified_epoch_seconds(&path);

        if is_shared_stash_path(&path) {
            let stash = self.decoder.decode_stash(&bytes).map_err(|error| {
                format!("Failed to decode shared stash '{}': {error}", path.display())
            })?;
            let name = save_name_from_path(&path, Some(stash.hardcore));
            let extracted_items = extract_stash_items(&matcher, &stash, &name);
            let source = SaveSource {
                path,
                name,
                character_class: character_class_name(u8::MAX).to_string(),
                level: 0,
                difficulty: Default::default(),
                hardcore: stash.hardcore,
                expansion: true,
                modified_at,
            };
            Ok((source, extracted_items))
        } else {
            let save = self.decoder.decode_character(&bytes).map_err(|error| {
                format!("Failed to decode save file '{}': {error}", path.display())
            })?;
            let name = save_name_from_path(&path, None);
            let extracted_items = extract_character_items(&matcher, &save, &name);
            let source = SaveSource {
                path,
                name,
                character_class: character_class_name(save.header.class_id).to_string(),
                level: save.header.level,
                difficulty: save.header.difficulty,
                hardcore: save.header.hardcore,
                expansion: save.header.expansion,
                modified_at,
            };
            Ok((source, extracted_items))
        }
    }
}

fn is_relevant_notification(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !relevant_kind {
        return false;
    }

    event
        .paths
        .iter()
        .any(|path| is_character_save_path(path) || is_shared_stash_path(path))
}

fn candidate_save_directories(config: &MonitorConfig) -> Vec<PathBuf> {
    let mut directories = vec![config.save_dir.clone()];
    directories.retain(|directory| directory.is_dir());
    directories
}

fn collect_save_file_paths(config: &MonitorConfig) -> Vec<PathBuf> {
    let mut save_file_paths = Vec::new();

    for directory in candidate_save_directories(config) {
        let directory_entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    "Failed to read save directory '{}': {error}",
                    directory.display()
                );
                continue;
            }
        };

        for entry_result in directory_entries {
            let Ok(entry) = entry_result else {
                continue;
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if is_character_save_path(&path) || is_shared_stash_path(&path) {
                save_file_paths.push(path);
            }
        }
    }

    save_file_paths.sort();
    save_file_paths
}

fn file_modified_epoch_seconds(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
