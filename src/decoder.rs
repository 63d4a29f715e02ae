use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MagicAttribute {
    pub name: String,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawItemRecord {
    pub unique_name: Option<String>,
    pub set_name: Option<String>,
    pub rare_name: Option<String>,
    pub rare_name2: Option<String>,
    pub runeword_name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub quality: Option<u8>,
    pub level: Option<u32>,
    pub ethereal: bool,
    pub socket_count: u8,
    pub socketed_items: Vec<RawItemRecord>,
    pub magic_attributes: Vec<MagicAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Normal,
    Nightmare,
    Hell,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterHeader {
    pub name: String,
    pub class_id: u8,
    pub level: u32,
    pub hardcore: bool,
    pub expansion: bool,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterSave {
    pub header: CharacterHeader,
    pub items: Vec<RawItemRecord>,
    pub merc_items: Vec<RawItemRecord>,
    pub corpse_items: Vec<RawItemRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StashPage {
    pub items: Vec<RawItemRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StashSave {
    pub hardcore: bool,
    pub pages: Vec<StashPage>,
}

pub trait SaveDecoder: Send + Sync {
    fn decode_character(&self, bytes: &[u8]) -> Result<CharacterSave, String>;

    fn decode_stash(&self, bytes: &[u8]) -> Result<StashSave, String>;
}
