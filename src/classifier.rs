use std::sync::Arc;

use crate::catalog::{normalize_item_name, CatalogItem, CatalogItemType, GrailCatalog};
use crate::decoder::RawItemRecord;
use crate::items::ExtractedItem;

const RUNE_CODE_MIN: u8 = 1;
const RUNE_CODE_MAX: u8 = 33;
const FACET_BASE_NAME: &str = "rainbowfacet";
const FACET_DEATH_MARKER: &str = "item_skillondeath";
const FACET_LEVEL_UP_MARKER: &str = "item_skillonlevelup";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawItemClass {
    Rune(String),
    Runeword(String),
    UniqueOrSet(String),
    Unclassified,
}

pub fn classify_raw_item(raw_item: &RawItemRecord) -> RawItemClass {
    if let Some(type_code) = raw_item.type_code.as_deref() {
        if is_rune_code(type_code) {
            return RawItemClass::Rune(type_code.trim().to_ascii_lowercase());
        }
    }

    if let Some(runeword_name) = raw_item.runeword_name.as_deref() {
        if !runeword_name.trim().is_empty() {
            return RawItemClass::Runeword(correct_runeword_name(runeword_name).to_string());
        }
    }

    if let Some(unique_name) = raw_item.unique_name.as_deref() {
        if !unique_name.trim().is_empty() {
            return RawItemClass::UniqueOrSet(unique_name.to_string());
        }
    }

    if let Some(set_name) = raw_item.set_name.as_deref() {
        if !set_name.trim().is_empty() {
            return RawItemClass::UniqueOrSet(set_name.to_string());
        }
    }

    // Rare names are generator-created and can coincide with real catalog
    // names, so they never participate in classification.
    RawItemClass::Unclassified
}

pub fn is_rune_code(type_code: &str) -> bool {
    let type_code = type_code.trim();
    if type_code.len() != 3 || !type_code.is_ascii() {
        return false;
    }

    let (prefix, digits) = type_code.split_at(1);
    if !prefix.eq_ignore_ascii_case("r") {
        return false;
    }

    digits
        .parse::<u8>()
        .map(|number| (RUNE_CODE_MIN..=RUNE_CODE_MAX).contains(&number))
        .unwrap_or(false)
}

pub fn correct_runeword_name(runeword_name: &str) -> &str {
    // The save decoder mis-decodes the Lore runeword as "Love".
    if normalize_item_name(runeword_name) == "love" {
        "Lore"
    } else {
        runeword_name
    }
}

pub struct GrailMatcher {
    catalog: Arc<GrailCatalog>,
}

impl GrailMatcher {
    pub fn new(catalog: Arc<GrailCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GrailCatalog {
        &self.catalog
    }

    pub fn resolve(&self, raw_item: &RawItemRecord) -> Option<&CatalogItem> {
        match classify_raw_item(raw_item) {
            RawItemClass::Rune(code) => self.catalog.rune_by_code(&code),
            RawItemClass::Runeword(runeword_name) => self
                .catalog
                .runeword_by_name(&normalize_item_name(&runeword_name)),
            RawItemClass::UniqueOrSet(display_name) => {
                if let Some(variant_name) = facet_variant_name(raw_item, &display_name) {
                    if let Some(item) = self
                        .catalog
                        .unique_set_by_name(&normalize_item_name(&variant_name))
                    {
                        return Some(item);
                    }
                }
                self.catalog
                    .unique_set_by_name(&normalize_item_name(&display_name))
            }
            RawItemClass::Unclassified => None,
        }
    }

    pub fn resolve_extracted(&self, extracted_item: &ExtractedItem) -> Option<&CatalogItem> {
        let normalized_name = normalize_item_name(&extracted_item.name);
        match extracted_item.item_type {
            CatalogItemType::Rune => self.catalog.rune_by_name(&normalized_name),
            CatalogItemType::Runeword => self.catalog.runeword_by_name(&normalized_name),
            CatalogItemType::Unique | CatalogItemType::Set => {
                self.catalog.unique_set_by_name(&normalized_name)
            }
        }
    }
}

pub(crate) fn facet_variant_name(raw_item: &RawItemRecord, display_name: &str) -> Option<String> {
    if normalize_item_name(display_name) != FACET_BASE_NAME {
        return None;
    }

    let mut trigger = None;
    let mut element = None;
    for attribute in &raw_item.magic_attributes {
        match attribute.name.as_str() {
            FACET_DEATH_MARKER => trigger = Some("Death"),
            FACET_LEVEL_UP_MARKER => trigger = Some("Level-up"),
            "passive_fire_mastery" => element = Some("Fire"),
            "passive_cold_mastery" => element = Some("Cold"),
            "passive_ltng_mastery" => element = Some("Lightning"),
            "passive_pois_mastery" => element = Some("Poison"),
            _ => {}
        }
    }

    Some(format!("Rainbow Facet ({} {})", element?, trigger?))
}

#[cfg(test)]
mod tests {
    use super::{
        classify_raw_item, correct_runeword_name, is_rune_code, GrailMatcher, RawItemClass,
    };
    use crate::catalog::{CatalogItem, CatalogItemType, EtherealType, GrailCatalog};
    use crate::decoder::{MagicAttribute, RawItemRecord};
    use std::sync::Arc;

    fn catalog_item(id: &str, name: &str, item_type: CatalogItemType) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            code: None,
            item_type,
            category: String::new(),
            sub_category: String::new(),
            ethereal_type: EtherealType::None,
            added_in_patch_2_4: false,
        }
    }

    fn test_catalog() -> Arc<GrailCatalog> {
        let mut ber = catalog_item("ber", "Ber", CatalogItemType::Rune);
        ber.code = Some("r30".to_string());

        Arc::new(GrailCatalog::new(vec![
            ber,
            catalog_item("lore", "Lore", CatalogItemType::Runeword),
            catalog_item("shako", "Harlequin Crest", CatalogItemType::Unique),
            catalog_item(
                "facet_fire_death",
                "Rainbow Facet (Fire Death)",
                CatalogItemType::Unique,
            ),
            catalog_item(
                "facet_cold_levelup",
                "Rainbow Facet (Cold Level-up)",
                CatalogItemType::Unique,
            ),
        ]))
    }

    fn raw_item() -> RawItemRecord {
        RawItemRecord::default()
    }

    #[test]
    fn recognizes_rune_codes_in_the_fixed_range() {
        assert!(is_rune_code("r01"));
        assert!(is_rune_code("r30"));
        assert!(is_rune_code("r33"));
        assert!(!is_rune_code("r00"));
        assert!(!is_rune_code("r34"));
        assert!(!is_rune_code("rin"));
        assert!(!is_rune_code("amu"));
        assert!(!is_rune_code("r3"));
    }

    #[test]
    fn resolves_rune_by_type_code() {
        let matcher = GrailMatcher::new(test_catalog());
        let mut item = raw_item();
        item.type_code = Some("r30".to_string());

        let resolved = matcher.resolve(&item).expect("Expected Ber rune to resolve");
        assert_eq!(resolved.id, "ber");
    }

    #[test]
    fn corrects_misdecoded_lore_runeword() {
        assert_eq!(correct_runeword_name("Love"), "Lore");
        assert_eq!(correct_runeword_name("Lore"), "Lore");
        assert_eq!(correct_runeword_name("Enigma"), "Enigma");

        let matcher = GrailMatcher::new(test_catalog());
        let mut love = raw_item();
        love.runeword_name = Some("Love".to_string());
        let mut lore = raw_item();
        lore.runeword_name = Some("Lore".to_string());

        let love_id = matcher.resolve(&love).map(|item| item.id.clone());
        let lore_id = matcher.resolve(&lore).map(|item| item.id.clone());
        assert_eq!(love_id, Some("lore".to_string()));
        assert_eq!(love_id, lore_id);
    }

    #[test]
    fn never_resolves_from_rare_names() {
        let matcher = GrailMatcher::new(test_catalog());
        let mut item = raw_item();
        item.rare_name = Some("Harlequin Crest".to_string());
        item.rare_name2 = Some("Lore".to_string());

        assert_eq!(classify_raw_item(&item), RawItemClass::Unclassified);
        assert!(matcher.resolve(&item).is_none());
    }

    #[test]
    fn resolves_facet_variant_from_magic_attributes() {
        let matcher = GrailMatcher::new(test_catalog());
        let mut item = raw_item();
        item.unique_name = Some("Rainbow Facet".to_string());
        item.magic_attributes = vec![
            MagicAttribute {
                name: "item_skillondeath".to_string(),
                values: vec![1],
            },
            MagicAttribute {
                name: "passive_fire_mastery".to_string(),
                values: vec![5],
            },
        ];

        let resolved = matcher.resolve(&item).expect("Expected facet variant to resolve");
        assert_eq!(resolved.id, "facet_fire_death");

        item.magic_attributes = vec![
            MagicAttribute {
                name: "item_skillonlevelup".to_string(),
                values: vec![1],
            },
            MagicAttribute {
                name: "passive_cold_mastery".to_string(),
                values: vec![5],
            },
        ];
        let resolved = matcher.resolve(&item).expect("Expected facet variant to resolve");
        assert_eq!(resolved.id, "facet_cold_levelup");
    }

    #[test]
    fn unmatched_names_resolve_to_none_without_error() {
        let matcher = GrailMatcher::new(test_catalog());
        let mut item = raw_item();
        item.unique_name = Some("Completely Unknown Item".to_string());

        assert!(matcher.resolve(&item).is_none());
    }

    #[test]
    fn classifies_uniques_and_sets_by_name_fields() {
        let mut unique = raw_item();
        unique.unique_name = Some("Harlequin Crest".to_string());
        assert_eq!(
            classify_raw_item(&unique),
            RawItemClass::UniqueOrSet("Harlequin Crest".to_string())
        );

        let mut set_piece = raw_item();
        set_piece.set_name = Some("Tal Rasha's Guardianship".to_string());
        assert_eq!(
            classify_raw_item(&set_piece),
            RawItemClass::UniqueOrSet("Tal Rasha's Guardianship".to_string())
        );
    }
}
