use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

/// Grouping key used when a definition has no owning pack.
pub const CORE_PACK_NAME: &str = "Core";

/// The four kinds of definitions the cache indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefFamily {
    Item,
    Building,
    Terrain,
    CreatureKind,
}

impl DefFamily {
    pub const ALL: [DefFamily; 4] = [
        DefFamily::Item,
        DefFamily::Building,
        DefFamily::Terrain,
        DefFamily::CreatureKind,
    ];

    pub const fn index(self) -> usize {
        match self {
            DefFamily::Item => 0,
            DefFamily::Building => 1,
            DefFamily::Terrain => 2,
            DefFamily::CreatureKind => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DefFamily::Item => "item",
            DefFamily::Building => "building",
            DefFamily::Terrain => "terrain",
            DefFamily::CreatureKind => "creature",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "item" | "items" => Some(DefFamily::Item),
            "building" | "buildings" => Some(DefFamily::Building),
            "terrain" => Some(DefFamily::Terrain),
            "creature" | "creatures" | "pawnkind" => Some(DefFamily::CreatureKind),
            _ => None,
        }
    }

    /// Whether `def` belongs to this family at all.
    pub fn includes(self, def: &Definition) -> bool {
        match (self, &def.kind) {
            (DefFamily::Item, DefKind::Thing(thing)) => {
                thing.category == ThingCategory::Item && thing.market_value > 0.0
            }
            (DefFamily::Building, DefKind::Thing(thing)) => {
                thing.category == ThingCategory::Building
                    && thing.flags.contains(ThingFlags::BUILDABLE)
            }
            (DefFamily::Terrain, DefKind::Terrain(terrain)) => {
                terrain.designation_category.is_some() || terrain.buildable
            }
            (DefFamily::CreatureKind, DefKind::PawnKind(kind)) => kind.race.is_some(),
            _ => false,
        }
    }
}

impl fmt::Display for DefFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content package that contributed a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePack {
    pub package_id: String,
    pub name: Option<String>,
}

impl SourcePack {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.package_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub def_name: String,
    pub label: String,
    pub source_pack: Option<SourcePack>,
    pub kind: DefKind,
}

impl Definition {
    /// Pack grouping key: display name, then package id, then [`CORE_PACK_NAME`].
    pub fn pack_key(&self) -> &str {
        match self.source_pack.as_ref() {
            Some(pack) if !pack.display_name().is_empty() => pack.display_name(),
            _ => CORE_PACK_NAME,
        }
    }

    /// Label for user-facing text; falls back to the def name when unlabeled.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.def_name
        } else {
            &self.label
        }
    }

    pub fn as_thing(&self) -> Option<&ThingProps> {
        match &self.kind {
            DefKind::Thing(thing) => Some(thing),
            _ => None,
        }
    }

    pub fn as_terrain(&self) -> Option<&TerrainProps> {
        match &self.kind {
            DefKind::Terrain(terrain) => Some(terrain),
            _ => None,
        }
    }

    pub fn as_pawn_kind(&self) -> Option<&PawnKindProps> {
        match &self.kind {
            DefKind::PawnKind(kind) => Some(kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefKind {
    Thing(ThingProps),
    Terrain(TerrainProps),
    PawnKind(PawnKindProps),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ThingCategory {
    Item,
    Building,
    Plant,
    Pawn,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum TechLevel {
    #[default]
    Undefined,
    Neolithic,
    Medieval,
    Industrial,
    Spacer,
    Ultra,
    Archotech,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ThingFlags: u32 {
        const WEAPON = 1 << 0;
        const APPAREL = 1 << 1;
        const INGESTIBLE = 1 << 2;
        const MEDICINE = 1 << 3;
        const BUILDING_MATERIAL = 1 << 4;
        const STUFF = 1 << 5;
        const ART = 1 << 6;
        const POWERED = 1 << 7;
        const BUILDABLE = 1 << 8;
        const WORK_TABLE = 1 << 9;
        const FURNITURE = 1 << 10;
    }
}

impl ThingFlags {
    /// Parses the XML spelling of one flag (`Weapon`, `BuildingMaterial`, ...).
    pub fn from_xml_name(raw: &str) -> Option<Self> {
        let flag = match raw {
            "Weapon" => Self::WEAPON,
            "Apparel" => Self::APPAREL,
            "Ingestible" => Self::INGESTIBLE,
            "Medicine" => Self::MEDICINE,
            "BuildingMaterial" => Self::BUILDING_MATERIAL,
            "Stuff" => Self::STUFF,
            "Art" => Self::ART,
            "Powered" => Self::POWERED,
            "Buildable" => Self::BUILDABLE,
            "WorkTable" => Self::WORK_TABLE,
            "Furniture" => Self::FURNITURE,
            _ => return None,
        };
        Some(flag)
    }
}

impl Serialize for ThingFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ThingProps {
    pub category: ThingCategory,
    pub market_value: f32,
    pub tech_level: TechLevel,
    pub flags: ThingFlags,
    pub designation_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TerrainProps {
    pub designation_category: Option<String>,
    pub buildable: bool,
    pub natural: bool,
    pub water: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Intelligence {
    #[default]
    Animal,
    ToolUser,
    Humanlike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RaceProps {
    pub intelligence: Intelligence,
    pub mechanoid: bool,
    pub insect: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PawnKindProps {
    pub race: Option<RaceProps>,
}
