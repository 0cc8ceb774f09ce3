use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::classify::classify;
use super::database::DefinitionSource;
use super::types::{DefFamily, Definition};

pub const DEFAULT_EXPIRY_INTERVAL_TICKS: u64 = 2_500;
pub const DEFAULT_DISPLAY_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub expiry_interval_ticks: u64,
    pub display_cap: usize,
    pub limit_enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            expiry_interval_ticks: DEFAULT_EXPIRY_INTERVAL_TICKS,
            display_cap: DEFAULT_DISPLAY_CAP,
            limit_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheBuildError {
    #[error("definition '{def_name}' appears more than once in the {family} family")]
    DuplicateDefinition { family: DefFamily, def_name: String },
}

/// category → definitions, plus the sorted list of categories seen.
#[derive(Debug, Clone, Default, PartialEq)]
struct CategoryIndex {
    buckets: HashMap<String, Vec<Arc<Definition>>>,
    categories: Vec<String>,
}

impl CategoryIndex {
    /// `defs` must already be filtered to `family` and sorted by label.
    fn build(family: DefFamily, defs: &[Arc<Definition>]) -> Result<Self, CacheBuildError> {
        let mut seen = HashSet::<&str>::with_capacity(defs.len());
        let mut index = Self::default();

        for def in defs {
            if !seen.insert(def.def_name.as_str()) {
                return Err(CacheBuildError::DuplicateDefinition {
                    family,
                    def_name: def.def_name.clone(),
                });
            }
            let category = classify(family, def);
            match index.buckets.get_mut(category) {
                Some(bucket) => bucket.push(Arc::clone(def)),
                None => {
                    index.categories.push(category.to_string());
                    index
                        .buckets
                        .insert(category.to_string(), vec![Arc::clone(def)]);
                }
            }
        }

        index.categories.sort();
        Ok(index)
    }

    fn bucket(&self, category: &str) -> &[Arc<Definition>] {
        self.buckets
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Item definitions grouped by source pack, then by category.
#[derive(Debug, Clone, Default, PartialEq)]
struct PackIndex {
    by_pack: HashMap<String, BTreeMap<String, Vec<Arc<Definition>>>>,
    flat: HashMap<String, Vec<Arc<Definition>>>,
    pack_names: Vec<String>,
}

impl PackIndex {
    fn build(items: &[Arc<Definition>]) -> Self {
        let mut by_pack = HashMap::<String, BTreeMap<String, Vec<Arc<Definition>>>>::new();
        for def in items {
            by_pack
                .entry(def.pack_key().to_string())
                .or_default()
                .entry(classify(DefFamily::Item, def).to_string())
                .or_default()
                .push(Arc::clone(def));
        }

        // Flat lists concatenate the category buckets in category order.
        let flat = by_pack
            .iter()
            .map(|(pack, categories)| {
                let defs = categories.values().flatten().cloned().collect::<Vec<_>>();
                (pack.clone(), defs)
            })
            .collect::<HashMap<_, _>>();

        let mut pack_names = by_pack.keys().cloned().collect::<Vec<_>>();
        pack_names.sort();

        Self {
            by_pack,
            flat,
            pack_names,
        }
    }
}

/// Serializable view of the cache contents, keyed by def names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheSnapshot {
    pub last_refresh_tick: Option<u64>,
    pub families: BTreeMap<&'static str, BTreeMap<String, Vec<String>>>,
    pub packs: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Per-family category indexes over a [`DefinitionSource`], rebuilt at most
/// once per tick and only after `expiry_interval_ticks` have passed.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCache {
    settings: CacheSettings,
    last_refresh_tick: Option<u64>,
    families: [CategoryIndex; 4],
    packs: PackIndex,
}

impl DefinitionCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn set_display_cap(&mut self, display_cap: usize) {
        self.settings.display_cap = display_cap.max(1);
    }

    pub fn set_limit_enabled(&mut self, limit_enabled: bool) {
        self.settings.limit_enabled = limit_enabled;
    }

    pub fn last_refresh_tick(&self) -> Option<u64> {
        self.last_refresh_tick
    }

    pub fn is_expired(&self, current_tick: u64) -> bool {
        match self.last_refresh_tick {
            None => true,
            Some(last) => current_tick > last.saturating_add(self.settings.expiry_interval_ticks),
        }
    }

    pub fn refresh_all<S>(&mut self, source: &S, current_tick: u64)
    where
        S: DefinitionSource + ?Sized,
    {
        if self.last_refresh_tick == Some(current_tick) {
            debug!(tick = current_tick, "def_cache_refresh_skipped_same_tick");
            return;
        }

        let mut ordered = source.definitions().to_vec();
        // Stable: equal labels keep source order.
        ordered.sort_by(|a, b| a.label.cmp(&b.label));

        for family in DefFamily::ALL {
            let filtered = ordered
                .iter()
                .filter(|def| family.includes(def))
                .cloned()
                .collect::<Vec<_>>();

            match CategoryIndex::build(family, &filtered) {
                Ok(index) => {
                    if family == DefFamily::Item {
                        self.packs = PackIndex::build(&filtered);
                    }
                    self.families[family.index()] = index;
                }
                Err(error) => {
                    warn!(
                        family = %family,
                        tick = current_tick,
                        error = %error,
                        "def_cache_family_refresh_failed_keeping_previous"
                    );
                }
            }
        }

        self.last_refresh_tick = Some(current_tick);
        info!(
            tick = current_tick,
            source_count = ordered.len(),
            item_count = self.family(DefFamily::Item).len(),
            building_count = self.family(DefFamily::Building).len(),
            terrain_count = self.family(DefFamily::Terrain).len(),
            creature_count = self.family(DefFamily::CreatureKind).len(),
            pack_count = self.packs.pack_names.len(),
            "def_cache_refreshed"
        );
    }

    /// Sorted categories for `family`, refreshing first when expired.
    pub fn categories<S>(&mut self, source: &S, current_tick: u64, family: DefFamily) -> &[String]
    where
        S: DefinitionSource + ?Sized,
    {
        self.refresh_if_expired(source, current_tick);
        self.cached_categories(family)
    }

    /// Definitions in one category, refreshing first when expired. Unknown
    /// categories yield an empty slice.
    pub fn by_category<S>(
        &mut self,
        source: &S,
        current_tick: u64,
        family: DefFamily,
        category: &str,
        apply_limit: bool,
    ) -> &[Arc<Definition>]
    where
        S: DefinitionSource + ?Sized,
    {
        self.refresh_if_expired(source, current_tick);
        self.cached_by_category(family, category, apply_limit)
    }

    pub fn cached_categories(&self, family: DefFamily) -> &[String] {
        &self.family(family).categories
    }

    pub fn cached_by_category(
        &self,
        family: DefFamily,
        category: &str,
        apply_limit: bool,
    ) -> &[Arc<Definition>] {
        let bucket = self.family(family).bucket(category);
        let cap = self.settings.display_cap;
        if apply_limit && self.settings.limit_enabled && cap < bucket.len() {
            &bucket[..cap]
        } else {
            bucket
        }
    }

    /// Category buckets for one pack, in category order.
    pub fn mod_categories<'a>(
        &'a self,
        pack: &str,
    ) -> impl Iterator<Item = (&'a str, &'a [Arc<Definition>])> + 'a {
        self.packs
            .by_pack
            .get(pack)
            .into_iter()
            .flat_map(|categories| {
                categories
                    .iter()
                    .map(|(category, defs)| (category.as_str(), defs.as_slice()))
            })
    }

    pub fn mod_flat(&self, pack: &str) -> &[Arc<Definition>] {
        self.packs
            .flat
            .get(pack)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn pack_names(&self) -> &[String] {
        &self.packs.pack_names
    }

    /// Drops every index; the next self-refreshing read rebuilds.
    pub fn clear(&mut self) {
        self.families = Default::default();
        self.packs = PackIndex::default();
        self.last_refresh_tick = None;
        debug!("def_cache_cleared");
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let families = DefFamily::ALL
            .iter()
            .map(|family| {
                let index = self.family(*family);
                let buckets = index
                    .categories
                    .iter()
                    .map(|category| (category.clone(), def_names(index.bucket(category))))
                    .collect::<BTreeMap<_, _>>();
                (family.as_str(), buckets)
            })
            .collect();
        let packs = self
            .packs
            .by_pack
            .iter()
            .map(|(pack, categories)| {
                let buckets = categories
                    .iter()
                    .map(|(category, defs)| (category.clone(), def_names(defs)))
                    .collect::<BTreeMap<_, _>>();
                (pack.clone(), buckets)
            })
            .collect();

        CacheSnapshot {
            last_refresh_tick: self.last_refresh_tick,
            families,
            packs,
        }
    }

    fn refresh_if_expired<S>(&mut self, source: &S, current_tick: u64)
    where
        S: DefinitionSource + ?Sized,
    {
        if self.is_expired(current_tick) {
            self.refresh_all(source, current_tick);
        }
    }

    fn family(&self, family: DefFamily) -> &CategoryIndex {
        &self.families[family.index()]
    }
}

fn def_names(defs: &[Arc<Definition>]) -> Vec<String> {
    defs.iter().map(|def| def.def_name.clone()).collect()
}
