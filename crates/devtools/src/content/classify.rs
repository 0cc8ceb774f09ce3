//! Ordered rule tables that assign each definition to exactly one category.
//!
//! Several attributes routinely co-occur on one definition (a medicine is
//! also ingestible, a sculpture may be powered), so each table is evaluated
//! top to bottom and the first matching rule wins.

use super::types::{
    DefFamily, Definition, Intelligence, PawnKindProps, TechLevel, TerrainProps, ThingFlags,
    ThingProps,
};

pub const ITEM_DEFAULT_CATEGORY: &str = "Miscellaneous";
pub const BUILDING_DEFAULT_CATEGORY: &str = "Uncategorized";
pub const TERRAIN_DEFAULT_CATEGORY: &str = "Special";
pub const CREATURE_DEFAULT_CATEGORY: &str = "Other";

/// One predicate → category entry. Returning `Some` ends the scan.
pub struct CategoryRule<P> {
    pub name: &'static str,
    pub category: fn(&P) -> Option<&str>,
}

impl<P> std::fmt::Debug for CategoryRule<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub const ITEM_RULES: &[CategoryRule<ThingProps>] = &[
    CategoryRule {
        name: "weapon",
        category: |thing| thing.flags.contains(ThingFlags::WEAPON).then_some("Weapons"),
    },
    CategoryRule {
        name: "apparel",
        category: |thing| thing.flags.contains(ThingFlags::APPAREL).then_some("Apparel"),
    },
    CategoryRule {
        name: "ingestible",
        category: |thing| {
            thing
                .flags
                .contains(ThingFlags::INGESTIBLE)
                .then_some("Food & Drugs")
        },
    },
    CategoryRule {
        name: "medicine",
        category: |thing| thing.flags.contains(ThingFlags::MEDICINE).then_some("Medicine"),
    },
    CategoryRule {
        name: "building_material",
        category: |thing| {
            thing
                .flags
                .contains(ThingFlags::BUILDING_MATERIAL)
                .then_some("Building Materials")
        },
    },
    CategoryRule {
        name: "stuff",
        category: |thing| thing.flags.contains(ThingFlags::STUFF).then_some("Raw Materials"),
    },
    CategoryRule {
        name: "tech_tier",
        category: |thing| match thing.tech_level {
            TechLevel::Archotech => Some("Archotech"),
            TechLevel::Ultra => Some("Ultratech"),
            TechLevel::Spacer => Some("Spacer Tech"),
            _ => None,
        },
    },
    CategoryRule {
        name: "art",
        category: |thing| thing.flags.contains(ThingFlags::ART).then_some("Art"),
    },
    CategoryRule {
        name: "powered",
        category: |thing| {
            thing
                .flags
                .contains(ThingFlags::POWERED)
                .then_some("Powered Devices")
        },
    },
];

pub const BUILDING_RULES: &[CategoryRule<ThingProps>] = &[
    CategoryRule {
        name: "designation_category",
        category: |thing| {
            thing
                .designation_category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty())
        },
    },
    CategoryRule {
        name: "powered",
        category: |thing| thing.flags.contains(ThingFlags::POWERED).then_some("Power"),
    },
    CategoryRule {
        name: "work_table",
        category: |thing| {
            thing
                .flags
                .contains(ThingFlags::WORK_TABLE)
                .then_some("Production")
        },
    },
    CategoryRule {
        name: "furniture",
        category: |thing| thing.flags.contains(ThingFlags::FURNITURE).then_some("Furniture"),
    },
];

pub const TERRAIN_RULES: &[CategoryRule<TerrainProps>] = &[
    CategoryRule {
        name: "water",
        category: |terrain| terrain.water.then_some("Water"),
    },
    CategoryRule {
        name: "buildable",
        category: |terrain| terrain.buildable.then_some("Floors"),
    },
    CategoryRule {
        name: "natural",
        category: |terrain| terrain.natural.then_some("Natural"),
    },
];

pub const CREATURE_RULES: &[CategoryRule<PawnKindProps>] = &[
    CategoryRule {
        name: "humanlike",
        category: |kind| {
            kind.race
                .as_ref()
                .filter(|race| race.intelligence == Intelligence::Humanlike)
                .map(|_| "Humanlike")
        },
    },
    CategoryRule {
        name: "mechanoid",
        category: |kind| {
            kind.race
                .as_ref()
                .filter(|race| race.mechanoid)
                .map(|_| "Mechanoids")
        },
    },
    CategoryRule {
        name: "insect",
        category: |kind| kind.race.as_ref().filter(|race| race.insect).map(|_| "Insects"),
    },
    CategoryRule {
        name: "animal",
        category: |kind| {
            kind.race
                .as_ref()
                .filter(|race| race.intelligence == Intelligence::Animal)
                .map(|_| "Animals")
        },
    },
];

pub fn default_category(family: DefFamily) -> &'static str {
    match family {
        DefFamily::Item => ITEM_DEFAULT_CATEGORY,
        DefFamily::Building => BUILDING_DEFAULT_CATEGORY,
        DefFamily::Terrain => TERRAIN_DEFAULT_CATEGORY,
        DefFamily::CreatureKind => CREATURE_DEFAULT_CATEGORY,
    }
}

pub fn first_match<'a, P>(rules: &[CategoryRule<P>], props: &'a P) -> Option<&'a str> {
    rules.iter().find_map(|rule| (rule.category)(props))
}

/// Total: a definition whose attributes don't fit the family lands in the
/// family's default bucket.
pub fn classify(family: DefFamily, def: &Definition) -> &str {
    let matched = match family {
        DefFamily::Item => def.as_thing().and_then(|thing| first_match(ITEM_RULES, thing)),
        DefFamily::Building => def
            .as_thing()
            .and_then(|thing| first_match(BUILDING_RULES, thing)),
        DefFamily::Terrain => def
            .as_terrain()
            .and_then(|terrain| first_match(TERRAIN_RULES, terrain)),
        DefFamily::CreatureKind => def
            .as_pawn_kind()
            .and_then(|kind| first_match(CREATURE_RULES, kind)),
    };
    matched.unwrap_or_else(|| default_category(family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::{DefKind, RaceProps, ThingCategory};

    fn thing_def(flags: ThingFlags, tech_level: TechLevel) -> Definition {
        Definition {
            def_name: "Thing".to_string(),
            label: "thing".to_string(),
            source_pack: None,
            kind: DefKind::Thing(ThingProps {
                category: ThingCategory::Item,
                market_value: 10.0,
                tech_level,
                flags,
                designation_category: None,
            }),
        }
    }

    fn creature_def(race: Option<RaceProps>) -> Definition {
        Definition {
            def_name: "Kind".to_string(),
            label: "kind".to_string(),
            source_pack: None,
            kind: DefKind::PawnKind(PawnKindProps { race }),
        }
    }

    #[test]
    fn item_rules_follow_documented_precedence() {
        let names = ITEM_RULES.iter().map(|rule| rule.name).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "weapon",
                "apparel",
                "ingestible",
                "medicine",
                "building_material",
                "stuff",
                "tech_tier",
                "art",
                "powered",
            ]
        );
    }

    #[test]
    fn weapon_wins_over_every_other_item_attribute() {
        let def = thing_def(ThingFlags::all(), TechLevel::Archotech);
        assert_eq!(classify(DefFamily::Item, &def), "Weapons");
    }

    #[test]
    fn ingestible_medicine_lands_in_food_and_drugs() {
        let def = thing_def(
            ThingFlags::INGESTIBLE | ThingFlags::MEDICINE,
            TechLevel::Industrial,
        );
        assert_eq!(classify(DefFamily::Item, &def), "Food & Drugs");
    }

    #[test]
    fn tech_tier_precedes_art_and_power() {
        let def = thing_def(ThingFlags::ART | ThingFlags::POWERED, TechLevel::Spacer);
        assert_eq!(classify(DefFamily::Item, &def), "Spacer Tech");

        let def = thing_def(ThingFlags::ART | ThingFlags::POWERED, TechLevel::Industrial);
        assert_eq!(classify(DefFamily::Item, &def), "Art");

        let def = thing_def(ThingFlags::POWERED, TechLevel::Medieval);
        assert_eq!(classify(DefFamily::Item, &def), "Powered Devices");
    }

    #[test]
    fn unmatched_item_uses_default_bucket() {
        let def = thing_def(ThingFlags::empty(), TechLevel::Industrial);
        assert_eq!(classify(DefFamily::Item, &def), ITEM_DEFAULT_CATEGORY);
    }

    #[test]
    fn building_designation_category_wins_and_blank_is_ignored() {
        let mut def = thing_def(ThingFlags::POWERED, TechLevel::Industrial);
        if let DefKind::Thing(thing) = &mut def.kind {
            thing.category = ThingCategory::Building;
            thing.designation_category = Some("Security".to_string());
        }
        assert_eq!(classify(DefFamily::Building, &def), "Security");

        if let DefKind::Thing(thing) = &mut def.kind {
            thing.designation_category = Some("  ".to_string());
        }
        assert_eq!(classify(DefFamily::Building, &def), "Power");
    }

    #[test]
    fn terrain_water_beats_buildable() {
        let def = Definition {
            def_name: "BridgeWater".to_string(),
            label: "water".to_string(),
            source_pack: None,
            kind: DefKind::Terrain(TerrainProps {
                designation_category: Some("Floors".to_string()),
                buildable: true,
                natural: true,
                water: true,
            }),
        };
        assert_eq!(classify(DefFamily::Terrain, &def), "Water");
    }

    #[test]
    fn creature_rules_cover_race_kinds() {
        let humanlike = creature_def(Some(RaceProps {
            intelligence: Intelligence::Humanlike,
            mechanoid: false,
            insect: false,
        }));
        assert_eq!(classify(DefFamily::CreatureKind, &humanlike), "Humanlike");

        let mech = creature_def(Some(RaceProps {
            intelligence: Intelligence::ToolUser,
            mechanoid: true,
            insect: false,
        }));
        assert_eq!(classify(DefFamily::CreatureKind, &mech), "Mechanoids");

        let bug = creature_def(Some(RaceProps {
            intelligence: Intelligence::Animal,
            mechanoid: false,
            insect: true,
        }));
        assert_eq!(classify(DefFamily::CreatureKind, &bug), "Insects");

        let animal = creature_def(Some(RaceProps::default()));
        assert_eq!(classify(DefFamily::CreatureKind, &animal), "Animals");

        let tool_user = creature_def(Some(RaceProps {
            intelligence: Intelligence::ToolUser,
            mechanoid: false,
            insect: false,
        }));
        assert_eq!(
            classify(DefFamily::CreatureKind, &tool_user),
            CREATURE_DEFAULT_CATEGORY
        );
    }

    #[test]
    fn family_mismatch_falls_back_to_default() {
        let def = creature_def(None);
        assert_eq!(classify(DefFamily::Terrain, &def), TERRAIN_DEFAULT_CATEGORY);
        assert_eq!(classify(DefFamily::Building, &def), BUILDING_DEFAULT_CATEGORY);
    }
}
