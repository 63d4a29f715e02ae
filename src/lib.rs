pub mod catalog;
pub mod classifier;
pub mod decoder;
pub mod detection;
pub mod event_bus;
pub mod executor;
pub mod extract;
pub mod items;
pub mod logging;
pub mod monitor;
pub mod settings;
pub mod stats;

pub use catalog::{normalize_item_name, CatalogItem, CatalogItemType, EtherealType, GrailCatalog};
pub use classifier::{classify_raw_item, GrailMatcher, RawItemClass};
pub use decoder::{
    CharacterHeader, CharacterSave, Difficulty, MagicAttribute, RawItemRecord, SaveDecoder,
    StashPage, StashSave,
};
pub use detection::{DetectionKey, ItemDetectionService, ProgressRecord};
pub use event_bus::{EventBus, GrailEvent, HandlerId, Topic};
pub use executor::execute_concurrently;
pub use items::{character_class_name, save_name_from_path, ExtractedItem, SaveSource};
pub use logging::init_logging;
pub use monitor::SaveFileMonitor;
pub use settings::{GameMode, GameVersion, GrailSettings, SettingsProvider};
pub use stats::{
    CategoryStats, GrailStats, GrailTemplates, StatsCategory, StatsEngine, SubStats, TemplateLeaf,
    TemplateNode,
};
