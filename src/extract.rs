use crate::catalog::{normalize_item_name, CatalogItemType};
use crate::classifier::{classify_raw_item, GrailMatcher, RawItemClass};
use crate::decoder::{CharacterSave, RawItemRecord, StashSave};
use crate::items::ExtractedItem;

// Socketed containers cannot legitimately nest this deep; anything beyond
// is malformed decoder output.
const MAX_SOCKET_DEPTH: usize = 8;

pub(crate) const LOCATION_INVENTORY: &str = "inventory";
pub(crate) const LOCATION_MERCENARY: &str = "mercenary";
pub(crate) const LOCATION_CORPSE: &str = "corpse";
pub(crate) const LOCATION_SHARED_STASH: &str = "shared stash";

pub fn extract_character_items(
    matcher: &GrailMatcher,
    save: &CharacterSave,
    character_name: &str,
) -> Vec<ExtractedItem> {
    let mut extracted_items = Vec::new();
    extract_items_from_list(
        matcher,
        &save.items,
        &mut extracted_items,
        character_name,
        LOCATION_INVENTORY,
    );
    extract_items_from_list(
        matcher,
        &save.merc_items,
        &mut extracted_items,
        character_name,
        LOCATION_MERCENARY,
    );
    extract_items_from_list(
        matcher,
        &save.corpse_items,
        &mut extracted_items,
        character_name,
        LOCATION_CORPSE,
    );

    extracted_items
}

pub fn extract_stash_items(
    matcher: &GrailMatcher,
    stash: &StashSave,
    stash_name: &str,
) -> Vec<ExtractedItem> {
    let mut extracted_items = Vec::new();
    for page in &stash.pages {
        extract_items_from_list(
            matcher,
            &page.items,
            &mut extracted_items,
            stash_name,
            LOCATION_SHARED_STASH,
        );
    }

    extracted_items
}

pub fn extract_items_from_list(
    matcher: &GrailMatcher,
    raw_items: &[RawItemRecord],
    accumulator: &mut Vec<ExtractedItem>,
    character_name: &str,
    location: &str,
) {
    extract_with_depth(matcher, raw_items, accumulator, character_name, location, 0);
}

fn extract_with_depth(
    matcher: &GrailMatcher,
    raw_items: &[RawItemRecord],
    accumulator: &mut Vec<ExtractedItem>,
    character_name: &str,
    location: &str,
    depth: usize,
) {
    for raw_item in raw_items {
        if let Some(extracted_item) = extract_single_item(matcher, raw_item, character_name, location)
        {
            accumulator.push(extracted_item);
        }

        if raw_item.socketed_items.is_empty() {
            continue;
        }

        if depth >= MAX_SOCKET_DEPTH {
            tracing::warn!(
                character = character_name,
                "Skipping socketed contents nested deeper than {MAX_SOCKET_DEPTH} levels"
            );
            continue;
        }

        extract_with_depth(
            matcher,
            &raw_item.socketed_items,
            accumulator,
            character_name,
            location,
            depth + 1,
        );
    }
}

fn extract_single_item(
    matcher: &GrailMatcher,
    raw_item: &RawItemRecord,
    character_name: &str,
    location: &str,
) -> Option<ExtractedItem> {
    let (display_name, item_type) = match classify_raw_item(raw_item) {
        RawItemClass::Rune(rune_code) => match matcher.catalog().rune_by_code(&rune_code) {
            Some(rune) => (rune.name.clone(), CatalogItemType::Rune),
            None => {
                tracing::debug!(rune_code = %rune_code, "Skipping rune with unknown code");
                return None;
            }
        },
        RawItemClass::Runeword(runeword_name) => {
            match matcher
                .catalog()
                .runeword_by_name(&normalize_item_name(&runeword_name))
            {
                Some(runeword) => (runeword.name.clone(), CatalogItemType::Runeword),
                None => {
                    // The decoder sometimes emits this field for items that
                    // are not runewords at all.
                    tracing::warn!(
                        runeword_name = %runeword_name,
                        character = character_name,
                        "Discarding unrecognized runeword name"
                    );
                    return None;
                }
            }
        }
        RawItemClass::UniqueOrSet(raw_name) => match matcher.resolve(raw_item) {
            Some(catalog_item) => (catalog_item.name.clone(), catalog_item.item_type),
            None => {
                let item_type = if raw_item.set_name.is_some() {
                    CatalogItemType::Set
                } else {
                    CatalogItemType::Unique
                };
                (raw_name, item_type)
            }
        },
        RawItemClass::Unclassified => return None,
    };

    Some(ExtractedItem {
        name: display_name,
        item_type,
        quality: raw_item.quality,
        level: raw_item.level,
        ethereal: raw_item.ethereal,
        socket_count: raw_item.socket_count,
        timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        character_name: character_name.to_string(),
        location: location.to_string(),
    })
}
