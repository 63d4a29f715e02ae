use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::catalog::EtherealType;
use crate::settings::{GameMode, GameVersion, GrailSettings};

const RUNE_TOTAL: usize = 33;
const RUNEWORD_TOTAL_RESURRECTED: usize = 85;
const RUNEWORD_TOTAL_CLASSIC: usize = 78;
const NEW_ITEM_SOUND_COOLDOWN: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone)]
pub enum TemplateNode {
    Group(BTreeMap<String, TemplateNode>),
    Leaf(TemplateLeaf),
}

#[derive(Debug, Clone)]
pub struct TemplateLeaf {
    pub item_id: String,
    pub ethereal_type: EtherealType,
    pub added_in_patch_2_4: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsCategory {
    Items,
    Runes,
    Runewords,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub exists: usize,
    pub owned: usize,
    pub percent: u8,
    pub remaining: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStats {
    pub normal: CategoryStats,
    pub ethereal: CategoryStats,
    pub runes: CategoryStats,
    pub runewords: CategoryStats,
    pub newly_found_ids: Vec<String>,
    #[serde(skip)]
    pub(crate) found_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GrailTemplates {
    pub armor: TemplateNode,
    pub weapons: TemplateNode,
    pub jewelry: TemplateNode,
    pub sets: TemplateNode,
    pub ethereal_armor: Option<TemplateNode>,
    pub ethereal_weapons: Option<TemplateNode>,
    pub ethereal_jewelry: Option<TemplateNode>,
    pub runes: TemplateNode,
    pub runewords: TemplateNode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrailStats {
    pub armor: SubStats,
    pub weapons: SubStats,
    pub jewelry: SubStats,
    pub sets: SubStats,
    pub runes: SubStats,
    pub runewords: SubStats,
    pub total: SubStats,
    pub newly_found_ids: Vec<String>,
}

struct FlattenedTemplate {
    normal: Vec<TemplateLeaf>,
    ethereal: Vec<TemplateLeaf>,
}

pub struct StatsEngine {
    flatten_cache: Mutex<HashMap<String, Arc<FlattenedTemplate>>>,
    previous_found: Mutex<HashSet<String>>,
    last_sound_at: Mutex<Option<Instant>>,
}

impl StatsEngine {
    pub fn new() -> Self {
        Self {
            flatten_cache: Mutex::new(HashMap::new()),
            previous_found: Mutex::new(HashSet::new()),
            last_sound_at: Mutex::new(None),
        }
    }

    pub fn compute_stats(
        &self,
        owned: &HashSet<String>,
        owned_ethereal: &HashSet<String>,
        templates: &GrailTemplates,
        settings: &GrailSettings,
        on_new_item: Option<&(dyn Fn() + Send + Sync)>,
    ) -> GrailStats {
        let armor = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.armor,
            templates.ethereal_armor.as_ref(),
            StatsCategory::Items,
            settings,
            "armor",
        );
        let weapons = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.weapons,
            templates.ethereal_weapons.as_ref(),
            StatsCategory::Items,
            settings,
            "weapons",
        );
        let jewelry = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.jewelry,
            templates.ethereal_jewelry.as_ref(),
            StatsCategory::Items,
            settings,
            "jewelry",
        );
        let sets = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.sets,
            None,
            StatsCategory::Items,
            settings,
            "sets",
        );
        let runes = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.runes,
            None,
            StatsCategory::Runes,
            settings,
            "runes",
        );
        let runewords = self.compute_sub_stats(
            owned,
            owned_ethereal,
            &templates.runewords,
            None,
            StatsCategory::Runewords,
            settings,
            "runewords",
        );

        let total = sum_sub_stats(&[&armor, &weapons, &jewelry, &sets, &runes, &runewords]);

        let current_found: HashSet<String> = [&armor, &weapons, &jewelry, &sets, &runes, &runewords]
            .iter()
            .flat_map(|sub| sub.found_ids.iter().cloned())
            .collect();
        let newly_found_ids = self.replace_found_snapshot(current_found);

        if !newly_found_ids.is_empty() {
            self.maybe_trigger_new_item_sound(settings, on_new_item);
        }

        GrailStats {
            armor,
            weapons,
            jewelry,
            sets,
            runes,
            runewords,
            total,
            newly_found_ids,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn compute_sub_stats(
        &self,
        owned: &HashSet<String>,
        owned_ethereal: &HashSet<String>,
        template: &TemplateNode,
        ethereal_template: Option<&TemplateNode>,
        category: StatsCategory,
        settings: &GrailSettings,
        cache_key: &str,
    ) -> SubStats {
        let flattened = self.flattened(template, ethereal_template, settings, cache_key);

        let mut sub_stats = match category {
            StatsCategory::Items => compute_item_stats(owned, owned_ethereal, &flattened, settings),
            StatsCategory::Runes => compute_rune_stats(owned, &flattened, settings),
            StatsCategory::Runewords => compute_runeword_stats(owned, &flattened, settings),
        };

        sub_stats.newly_found_ids = match self.previous_found.lock() {
            Ok(previous_found) => sub_stats
                .found_ids
                .iter()
                .filter(|item_id| !previous_found.contains(*item_id))
                .cloned()
                .collect(),
            Err(error) => {
                tracing::error!("Failed to lock stats history: {error}");
                Vec::new()
            }
        };

        sub_stats
    }

    pub fn clear_history(&self) {
        match self.previous_found.lock() {
            Ok(mut previous_found) => previous_found.clear(),
            Err(error) => {
                tracing::error!("Failed to lock stats history: {error}");
            }
        }
        match self.last_sound_at.lock() {
            Ok(mut last_sound_at) => *last_sound_at = None,
            Err(error) => {
                tracing::error!("Failed to lock sound trigger state: {error}");
            }
        }
    }

    fn flattened(
        &self,
        template: &TemplateNode,
        ethereal_template: Option<&TemplateNode>,
        settings: &GrailSettings,
        cache_key: &str,
    ) -> Arc<FlattenedTemplate> {
        let memo_key = format!(
            "{cache_key}|runes:{}|runewords:{}|ethereal:{}",
            settings.grail_runes, settings.grail_runewords, settings.grail_ethereal
        );

        if let Ok(cache) = self.flatten_cache.lock() {
            if let Some(flattened) = cache.get(&memo_key) {
                return Arc::clone(flattened);
            }
        }

        let all_leaves = flatten_leaves(template);
        let normal = all_leaves
            .iter()
            .filter(|leaf| leaf.ethereal_type != EtherealType::Only)
            .cloned()
            .collect();
        let ethereal = if settings.grail_ethereal {
            let ethereal_source = ethereal_template
                .map(flatten_leaves)
                .unwrap_or(all_leaves);
            ethereal_source
                .into_iter()
                .filter(|leaf| leaf.ethereal_type != EtherealType::None)
                .collect()
        } else {
            Vec::new()
        };

        let flattened = Arc::new(FlattenedTemplate { normal, ethereal });
        match self.flatten_cache.lock() {
            Ok(mut cache) => {
                cache.insert(memo_key, Arc::clone(&flattened));
            }
            Err(error) => {
                tracing::error!("Failed to lock stats flatten cache: {error}");
            }
        }

        flattened
    }

    fn replace_found_snapshot(&self, current_found: HashSet<String>) -> Vec<String> {
        match self.previous_found.lock() {
            Ok(mut previous_found) => {
                let mut newly_found: Vec<String> = current_found
                    .iter()
                    .filter(|item_id| !previous_found.contains(*item_id))
                    .cloned()
                    .collect();
                newly_found.sort();
                *previous_found = current_found;
                newly_found
            }
            Err(error) => {
                tracing::error!("Failed to lock stats history: {error}");
                Vec::new()
            }
        }
    }

    fn maybe_trigger_new_item_sound(
        &self,
        settings: &GrailSettings,
        on_new_item: Option<&(dyn Fn() + Send + Sync)>,
    ) {
        let Some(on_new_item) = on_new_item else {
            return;
        };
        if settings.game_mode == GameMode::Manual {
            return;
        }

        let should_trigger = match self.last_sound_at.lock() {
            Ok(mut last_sound_at) => {
                let cooled_down = last_sound_at
                    .map(|triggered_at| triggered_at.elapsed() >= NEW_ITEM_SOUND_COOLDOWN)
                    .unwrap_or(true);
                if cooled_down {
                    *last_sound_at = Some(Instant::now());
                }
                cooled_down
            }
            Err(error) => {
                tracing::error!("Failed to lock sound trigger state: {error}");
                false
            }
        };

        if should_trigger {
            on_new_item();
        }
    }
}

impl Default for StatsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_item_stats(
    owned: &HashSet<String>,
    owned_ethereal: &HashSet<String>,
    flattened: &FlattenedTemplate,
    settings: &GrailSettings,
) -> SubStats {
    let mut found_ids = Vec::new();
    let mut normal_owned = 0;
    let mut ethereal_owned = 0;

    let merged_counting = settings.grail_normal && settings.grail_ethereal && !settings.grail_each;
    if merged_counting {
        // With both grails active an item found in either form counts once,
        // toward the normal bucket.
        for leaf in &flattened.normal {
            if owned.contains(&leaf.item_id) || owned_ethereal.contains(&leaf.item_id) {
                normal_owned += 1;
                found_ids.push(leaf.item_id.clone());
            }
        }
    } else {
        if settings.grail_normal {
            for leaf in &flattened.normal {
                if owned.contains(&leaf.item_id) {
                    normal_owned += 1;
                    found_ids.push(leaf.item_id.clone());
                }
            }
        }
        if settings.grail_ethereal {
            for leaf in &flattened.ethereal {
                if owned_ethereal.contains(&leaf.item_id) {
                    ethereal_owned += 1;
                    found_ids.push(leaf.item_id.clone());
                }
            }
        }
    }

    found_ids.sort();
    found_ids.dedup();

    let normal_exists = if settings.grail_normal {
        flattened.normal.len()
    } else {
        0
    };

    SubStats {
        normal: category_stats(normal_owned, normal_exists),
        ethereal: category_stats(ethereal_owned, flattened.ethereal.len()),
        runes: CategoryStats::default(),
        runewords: CategoryStats::default(),
        newly_found_ids: Vec::new(),
        found_ids,
    }
}

fn compute_rune_stats(
    owned: &HashSet<String>,
    flattened: &FlattenedTemplate,
    settings: &GrailSettings,
) -> SubStats {
    let mut found_ids = Vec::new();
    let mut runes_owned = 0;

    if settings.grail_runes {
        for leaf in &flattened.normal {
            if owned.contains(&leaf.item_id) {
                runes_owned += 1;
                found_ids.push(leaf.item_id.clone());
            }
        }
    }

    let runes_exist = if settings.grail_runes { RUNE_TOTAL } else { 0 };

    SubStats {
        normal: CategoryStats::default(),
        ethereal: CategoryStats::default(),
        runes: category_stats(runes_owned, runes_exist),
        runewords: CategoryStats::default(),
        newly_found_ids: Vec::new(),
        found_ids,
    }
}

fn compute_runeword_stats(
    owned: &HashSet<String>,
    flattened: &FlattenedTemplate,
    settings: &GrailSettings,
) -> SubStats {
    let classic = settings.game_version == GameVersion::Classic;
    let mut found_ids = Vec::new();
    let mut runewords_owned = 0;

    if settings.grail_runewords {
        for leaf in &flattened.normal {
            // Patch 2.4 runewords do not exist in the Classic version.
            if classic && leaf.added_in_patch_2_4 {
                continue;
            }
            if owned.contains(&leaf.item_id) {
                runewords_owned += 1;
                found_ids.push(leaf.item_id.clone());
            }
        }
    }

    let runewords_exist = if settings.grail_runewords {
        if classic {
            RUNEWORD_TOTAL_CLASSIC
        } else {
            RUNEWORD_TOTAL_RESURRECTED
        }
    } else {
        0
    };

    SubStats {
        normal: CategoryStats::default(),
        ethereal: CategoryStats::default(),
        runes: CategoryStats::default(),
        runewords: category_stats(runewords_owned, runewords_exist),
        newly_found_ids: Vec::new(),
        found_ids,
    }
}

fn flatten_leaves(node: &TemplateNode) -> Vec<TemplateLeaf> {
    let mut leaves = Vec::new();
    let mut pending = vec![node];
    while let Some(current) = pending.pop() {
        match current {
            TemplateNode::Leaf(leaf) => leaves.push(leaf.clone()),
            TemplateNode::Group(children) => pending.extend(children.values()),
        }
    }

    leaves
}

fn category_stats(owned: usize, exists: usize) -> CategoryStats {
    CategoryStats {
        exists,
        owned,
        percent: percent_value(owned, exists),
        remaining: exists.saturating_sub(owned),
    }
}

fn percent_value(owned: usize, exists: usize) -> u8 {
    if exists == 0 {
        return 0;
    }
    if owned >= exists {
        return 100;
    }

    let rounded = ((owned as f64 / exists as f64) * 100.0).round() as u8;
    // A category is never shown complete unless it actually is.
    if rounded >= 100 {
        99
    } else {
        rounded
    }
}

fn sum_sub_stats(sub_stats: &[&SubStats]) -> SubStats {
    let mut normal_owned = 0;
    let mut normal_exists = 0;
    let mut ethereal_owned = 0;
    let mut ethereal_exists = 0;
    let mut runes_owned = 0;
    let mut runes_exist = 0;
    let mut runewords_owned = 0;
    let mut runewords_exist = 0;

    for sub in sub_stats {
        normal_owned += sub.normal.owned;
        normal_exists += sub.normal.exists;
        ethereal_owned += sub.ethereal.owned;
        ethereal_exists += sub.ethereal.exists;
        runes_owned += sub.runes.owned;
        runes_exist += sub.runes.exists;
        runewords_owned += sub.runewords.owned;
        runewords_exist += sub.runewords.exists;
    }

    SubStats {
        normal: category_stats(normal_owned, normal_exists),
        ethereal: category_stats(ethereal_owned, ethereal_exists),
        runes: category_stats(runes_owned, runes_exist),
        runewords: category_stats(runewords_owned, runewords_exist),
        newly_found_ids: Vec::new(),
        found_ids: Vec::new(),
    }
}
