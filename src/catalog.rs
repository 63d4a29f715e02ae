use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogItemType {
    Unique,
    Set,
    Rune,
    Runeword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtherealType {
    #[default]
    None,
    Optional,
    Only,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub item_type: CatalogItemType,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub ethereal_type: EtherealType,
    #[serde(default)]
    pub added_in_patch_2_4: bool,
}

pub struct GrailCatalog {
    items: Vec<CatalogItem>,
    by_id: HashMap<String, usize>,
    rune_by_code: HashMap<String, usize>,
    rune_by_name: HashMap<String, usize>,
    runeword_by_name: HashMap<String, usize>,
    unique_set_by_name: HashMap<String, usize>,
}

impl GrailCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        let mut by_id = HashMap::new();
        let mut rune_by_code = HashMap::new();
        let mut rune_by_name = HashMap::new();
        let mut runeword_by_name = HashMap::new();
        let mut unique_set_by_name = HashMap::new();

        for (index, item) in items.iter().enumerate() {
            by_id.insert(item.id.clone(), index);

            let normalized_name = normalize_item_name(&item.name);
            match item.item_type {
                CatalogItemType::Rune => {
                    if let Some(code) = item.code.as_deref() {
                        rune_by_code.insert(code.to_ascii_lowercase(), index);
                    }
                    rune_by_name.insert(normalized_name, index);
                }
                CatalogItemType::Runeword => {
                    runeword_by_name.insert(normalized_name, index);
                }
                CatalogItemType::Unique | CatalogItemType::Set => {
                    unique_set_by_name.insert(normalized_name, index);
                }
            }
        }

        Self {
            items,
            by_id,
            rune_by_code,
            rune_by_name,
            runeword_by_name,
            unique_set_by_name,
        }
    }

    pub fn item_by_id(&self, id: &str) -> Option<&CatalogItem> {
        self.by_id.get(id).map(|index| &self.items[*index])
    }

    pub fn rune_by_code(&self, code: &str) -> Option<&CatalogItem> {
        self.rune_by_code
            .get(&code.to_ascii_lowercase())
            .map(|index| &self.items[*index])
    }

    pub fn rune_by_name(&self, normalized_name: &str) -> Option<&CatalogItem> {
        self.rune_by_name
            .get(normalized_name)
            .map(|index| &self.items[*index])
    }

    pub fn runeword_by_name(&self, normalized_name: &str) -> Option<&CatalogItem> {
        self.runeword_by_name
            .get(normalized_name)
            .map(|index| &self.items[*index])
    }

    pub fn unique_set_by_name(&self, normalized_name: &str) -> Option<&CatalogItem> {
        self.unique_set_by_name
            .get(normalized_name)
            .map(|index| &self.items[*index])
    }

    pub fn is_known_runeword(&self, name: &str) -> bool {
        self.runeword_by_name
            .contains_key(&normalize_item_name(name))
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }
}

pub fn normalize_item_name(name: &str) -> String {
    name.chars()
        .map(fold_diacritic)
        .filter(|character| character.is_ascii_alphanumeric())
        .map(|character| character.to_ascii_lowercase())
        .collect()
}

fn fold_diacritic(character: char) -> char {
    match character {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ý' | 'Ý' | 'ÿ' => 'y',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        _ => character,
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_item_name, CatalogItem, CatalogItemType, EtherealType, GrailCatalog};

    fn build_catalog_item(id: &str, name: &str, item_type: CatalogItemType) -> CatalogItem {
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

    #[test]
    fn normalizes_case_spacing_and_punctuation() {
        assert_eq!(normalize_item_name("The Stone of Jordan"), "thestoneofjordan");
        assert_eq!(normalize_item_name("Mara's Kaleidoscope"), "maraskaleidoscope");
        assert_eq!(normalize_item_name("Rainbow Facet (Fire Death)"), "rainbowfacetfiredeath");
    }

    #[test]
    fn folds_diacritics_during_normalization() {
        assert_eq!(normalize_item_name("Ondal's Wisdom"), "ondalswisdom");
        assert_eq!(normalize_item_name("Éclair"), "eclair");
        assert_eq!(normalize_item_name("Für Elise"), "furelise");
    }

    #[test]
    fn indexes_runes_by_code_case_insensitively() {
        let mut ber = build_catalog_item("ber", "Ber", CatalogItemType::Rune);
        ber.code = Some("r30".to_string());
        let catalog = GrailCatalog::new(vec![ber]);

        assert_eq!(catalog.rune_by_code("r30").map(|item| item.id.as_str()), Some("ber"));
        assert_eq!(catalog.rune_by_code("R30").map(|item| item.id.as_str()), Some("ber"));
        assert!(catalog.rune_by_code("r99").is_none());
    }

    #[test]
    fn separates_runeword_and_unique_name_lookups() {
        let catalog = GrailCatalog::new(vec![
            build_catalog_item("lore", "Lore", CatalogItemType::Runeword),
            build_catalog_item("shako", "Harlequin Crest", CatalogItemType::Unique),
        ]);

        assert!(catalog.is_known_runeword("Lore"));
        assert!(!catalog.is_known_runeword("Harlequin Crest"));
        assert_eq!(
            catalog.unique_set_by_name("harlequincrest").map(|item| item.id.as_str()),
            Some("shako")
        );
        assert!(catalog.unique_set_by_name("lore").is_none());
    }
}
