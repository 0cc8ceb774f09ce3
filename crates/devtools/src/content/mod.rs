mod cache;
mod classify;
mod compiler;
mod database;
mod discovery;
mod types;

pub use cache::{
    CacheBuildError, CacheSettings, CacheSnapshot, DefinitionCache, DEFAULT_DISPLAY_CAP,
    DEFAULT_EXPIRY_INTERVAL_TICKS,
};
pub use classify::{
    classify, default_category, first_match, CategoryRule, BUILDING_DEFAULT_CATEGORY,
    BUILDING_RULES, CREATURE_DEFAULT_CATEGORY, CREATURE_RULES, ITEM_DEFAULT_CATEGORY, ITEM_RULES,
    TERRAIN_DEFAULT_CATEGORY, TERRAIN_RULES,
};
pub use compiler::{load_def_database, ContentErrorCode, ContentLoadError, SourceLocation};
pub use database::{DefDatabase, DefinitionSource};
pub use discovery::{ContentLoadRequest, DiscoveryError, DEFS_DIR_NAME, PACK_METADATA_FILE};
pub use types::{
    DefFamily, DefKind, Definition, Intelligence, PawnKindProps, RaceProps, SourcePack, TechLevel,
    TerrainProps, ThingCategory, ThingFlags, ThingProps, CORE_PACK_NAME,
};
