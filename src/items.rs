use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::catalog::CatalogItemType;
use crate::decoder::Difficulty;

pub(crate) const CHARACTER_SAVE_EXTENSION: &str = "d2s";
pub(crate) const SHARED_STASH_EXTENSION: &str = "d2i";
const SHARED_STASH_NAME_MARKER: &str = "sharedstash";
const HARDCORE_NAME_MARKER: &str = "hardcore";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSource {
    pub path: PathBuf,
    pub name: String,
    pub character_class: String,
    pub level: u32,
    pub difficulty: Difficulty,
    pub hardcore: bool,
    pub expansion: bool,
    pub modified_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedItem {
    pub name: String,
    pub item_type: CatalogItemType,
    pub quality: Option<u8>,
    pub level: Option<u32>,
    pub ethereal: bool,
    pub socket_count: u8,
    pub timestamp: u64,
    pub character_name: String,
    pub location: String,
}

pub fn save_name_from_path(path: &Path, hardcore_override: Option<bool>) -> String {
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or_default();

    if is_shared_stash_path(path) {
        let hardcore = hardcore_override.unwrap_or_else(|| {
            file_name.to_ascii_lowercase().contains(HARDCORE_NAME_MARKER)
        });
        let mode = if hardcore { "Hardcore" } else { "Softcore" };
        return format!("Shared Stash {mode}");
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or(file_name)
        .to_string()
}

pub fn is_shared_stash_path(path: &Path) -> bool {
    let extension_matches = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.eq_ignore_ascii_case(SHARED_STASH_EXTENSION))
        .unwrap_or(false);
    if extension_matches {
        return true;
    }

    path.file_name()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase().contains(SHARED_STASH_NAME_MARKER))
        .unwrap_or(false)
}

pub(crate) fn is_character_save_path(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.eq_ignore_ascii_case(CHARACTER_SAVE_EXTENSION))
        .unwrap_or(false)
}

pub fn character_class_name(class_id: u8) -> &'static str {
    match class_id {
        0 => "Amazon",
        1 => "Sorceress",
        2 => "Necromancer",
        3 => "Paladin",
        4 => "Barbarian",
        5 => "Druid",
        6 => "Assassin",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::{character_class_name, is_shared_stash_path, save_name_from_path};
    use std::path::Path;

    #[test]
    fn character_saves_display_as_file_stem() {
        let path = Path::new("/saves/MySorc.d2s");
        assert_eq!(save_name_from_path(path, None), "MySorc");
    }

    #[test]
    fn hardcore_override_is_ignored_for_character_saves() {
        let path = Path::new("/saves/MySorc.d2s");
        assert_eq!(save_name_from_path(path, Some(true)), "MySorc");
    }

    #[test]
    fn stash_names_fall_back_to_filename_substring() {
        let softcore = Path::new("/saves/SharedStashSoftCoreV2.d2i");
        let hardcore = Path::new("/saves/SharedStashHardCoreV2.d2i");
        assert_eq!(save_name_from_path(softcore, None), "Shared Stash Softcore");
        assert_eq!(save_name_from_path(hardcore, None), "Shared Stash Hardcore");
    }

    #[test]
    fn explicit_hardcore_flag_takes_precedence_over_filename() {
        let path = Path::new("/saves/SharedStashSoftCoreV2.d2i");
        assert_eq!(save_name_from_path(path, Some(true)), "Shared Stash Hardcore");
    }

    #[test]
    fn detects_stash_files_by_extension_and_name() {
        assert!(is_shared_stash_path(Path::new("/saves/SharedStashHardCoreV2.d2i")));
        assert!(is_shared_stash_path(Path::new("/saves/sharedstash.dat")));
        assert!(!is_shared_stash_path(Path::new("/saves/MySorc.d2s")));
    }

    #[test]
    fn maps_the_seven_character_classes() {
        assert_eq!(character_class_name(0), "Amazon");
        assert_eq!(character_class_name(1), "Sorceress");
        assert_eq!(character_class_name(2), "Necromancer");
        assert_eq!(character_class_name(3), "Paladin");
        assert_eq!(character_class_name(4), "Barbarian");
        assert_eq!(character_class_name(5), "Druid");
        assert_eq!(character_class_name(6), "Assassin");
        assert_eq!(character_class_name(7), "unknown");
        assert_eq!(character_class_name(255), "unknown");
    }
}
