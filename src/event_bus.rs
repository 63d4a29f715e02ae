use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::catalog::CatalogItem;
use crate::items::ExtractedItem;

pub(crate) const ERROR_DIRECTORY_NOT_FOUND: &str = "directory-not-found";
pub(crate) const DETECTION_ITEM_FOUND: &str = "item-found";
pub(crate) const SAVE_FILE_UPDATED: &str = "updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    MonitoringStarted,
    MonitoringStopped,
    MonitoringError,
    ItemDetection,
    SaveFileEvent,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::MonitoringStarted => "monitoring-started",
            Topic::MonitoringStopped => "monitoring-stopped",
            Topic::MonitoringError => "monitoring-error",
            Topic::ItemDetection => "item-detection",
            Topic::SaveFileEvent => "save-file-event",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStartedPayload {
    pub directory: String,
    pub save_file_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStoppedPayload {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringErrorPayload {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub directory: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetectionPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    pub item: ExtractedItem,
    pub grail_item: CatalogItem,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFileEventPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    pub file: String,
    pub extracted_items: Vec<ExtractedItem>,
    pub silent: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GrailEvent {
    MonitoringStarted(MonitoringStartedPayload),
    MonitoringStopped(MonitoringStoppedPayload),
    MonitoringError(MonitoringErrorPayload),
    ItemDetection(ItemDetectionPayload),
    SaveFileEvent(SaveFileEventPayload),
}

impl GrailEvent {
    pub fn topic(&self) -> Topic {
        match self {
            GrailEvent::MonitoringStarted(_) => Topic::MonitoringStarted,
            GrailEvent::MonitoringStopped(_) => Topic::MonitoringStopped,
            GrailEvent::MonitoringError(_) => Topic::MonitoringError,
            GrailEvent::ItemDetection(_) => Topic::ItemDetection,
            GrailEvent::SaveFileEvent(_) => Topic::SaveFileEvent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

type HandlerFn = dyn Fn(&GrailEvent) -> Result<(), String> + Send + Sync;

pub struct EventBus {
    handlers: Mutex<HashMap<Topic, Vec<(HandlerId, Arc<HandlerFn>)>>>,
    next_handler_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            next_handler_id: AtomicU64::new(1),
        }
    }

    pub fn on(
        &self,
        topic: Topic,
        handler: impl Fn(&GrailEvent) -> Result<(), String> + Send + Sync + 'static,
    ) -> HandlerId {
        let handler_id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        match self.handlers.lock() {
            Ok(mut handlers) => {
                handlers
                    .entry(topic)
                    .or_default()
                    .push((handler_id, Arc::new(handler)));
            }
            Err(error) => {
                tracing::error!(topic = topic.as_str(), "Failed to register event handler: {error}");
            }
        }

        handler_id
    }

    pub fn off(&self, topic: Topic, handler_id: HandlerId) {
        match self.handlers.lock() {
            Ok(mut handlers) => {
                if let Some(topic_handlers) = handlers.get_mut(&topic) {
                    topic_handlers.retain(|(registered_id, _)| *registered_id != handler_id);
                }
            }
            Err(error) => {
                tracing::error!(topic = topic.as_str(), "Failed to remove event handler: {error}");
            }
        }
    }

    pub fn emit(&self, event: &GrailEvent) {
        let topic = event.topic();
        // Snapshot so handlers can subscribe/unsubscribe re-entrantly.
        let topic_handlers = match self.handlers.lock() {
            Ok(handlers) => handlers.get(&topic).cloned().unwrap_or_default(),
            Err(error) => {
                tracing::error!(topic = topic.as_str(), "Failed to lock event handlers: {error}");
                return;
            }
        };

        for (handler_id, handler) in topic_handlers {
            if let Err(error) = handler(event) {
                tracing::warn!(
                    topic = topic.as_str(),
                    handler_id = handler_id.0,
                    "Event handler failed: {error}"
                );
            }
        }
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        match self.handlers.lock() {
            Ok(handlers) => handlers.get(&topic).map(Vec::len).unwrap_or(0),
            Err(error) => {
                tracing::error!(topic = topic.as_str(), "Failed to lock event handlers: {error}");
                0
            }
        }
    }

    pub fn clear(&self) {
        match self.handlers.lock() {
            Ok(mut handlers) => handlers.clear(),
            Err(error) => {
                tracing::error!("Failed to clear event handlers: {error}");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
