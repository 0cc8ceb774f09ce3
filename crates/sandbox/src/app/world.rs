use std::collections::BTreeMap;
use std::sync::Arc;

use devtools::content::{DefDatabase, DefinitionSource, Intelligence};
use devtools::{
    AreaPurpose, Cell, CellRect, Definition, HostActionError, TargetingHost, ThingTarget,
    WorldCommand, WorldQuery,
};
use serde::Serialize;
use tracing::debug;

pub(crate) const DEFAULT_MAP_SIZE: i32 = 24;
/// Largest accepted width or height. Larger requests are clamped.
pub(crate) const MAX_MAP_SIDE: i32 = 1024;
pub(crate) const BASE_TERRAIN: &str = "Soil";
const PAWN_HIT_POINTS: u32 = 100;
const PLANT_HIT_POINTS: u32 = 30;
const ITEM_HIT_POINTS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) enum ThingKind {
    Pawn {
        food_level: f32,
        has_food_need: bool,
        animal: bool,
        tame: bool,
    },
    Plant {
        growth: f32,
    },
    Item,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Thing {
    pub(crate) id: u64,
    pub(crate) def_name: String,
    pub(crate) label: String,
    pub(crate) cell: Cell,
    pub(crate) hit_points: u32,
    pub(crate) kind: ThingKind,
}

impl Thing {
    fn is_pawn(&self) -> bool {
        matches!(self.kind, ThingKind::Pawn { .. })
    }

    pub(crate) fn as_target(&self) -> ThingTarget {
        let (is_pawn, has_food_need, is_animal) = match self.kind {
            ThingKind::Pawn {
                has_food_need,
                animal,
                ..
            } => (true, has_food_need, animal),
            _ => (false, false, false),
        };
        ThingTarget {
            id: self.id,
            cell: self.cell,
            label: self.label.clone(),
            is_pawn,
            has_food_need,
            is_animal,
        }
    }
}

#[derive(Debug, Clone)]
struct GridMap {
    width: i32,
    height: i32,
    terrain: Vec<String>,
}

impl GridMap {
    fn new(width: i32, height: i32) -> Self {
        let width = width.clamp(0, MAX_MAP_SIDE);
        let height = height.clamp(0, MAX_MAP_SIDE);
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            terrain: vec![BASE_TERRAIN.to_string(); cells],
        }
    }

    fn bounds(&self) -> Option<CellRect> {
        (self.width > 0 && self.height > 0).then(|| {
            CellRect::from_corners(Cell::new(0, 0), Cell::new(self.width - 1, self.height - 1))
        })
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if !(0..self.width).contains(&cell.x) || !(0..self.height).contains(&cell.z) {
            return None;
        }
        let row = usize::try_from(cell.z).ok()?.checked_mul(self.width as usize)?;
        row.checked_add(usize::try_from(cell.x).ok()?)
    }
}

/// A flat grid of terrain with things on top. The map can be unloaded while
/// a targeting session is armed.
#[derive(Debug, Clone)]
pub(crate) struct SandboxWorld {
    map: Option<GridMap>,
    things: BTreeMap<u64, Thing>,
    next_thing_id: u64,
}

impl SandboxWorld {
    pub(crate) fn new(width: i32, height: i32) -> Self {
        Self {
            map: Some(GridMap::new(width, height)),
            things: BTreeMap::new(),
            next_thing_id: 1,
        }
    }

    /// A map with a row of young plants, a colonist and an animal.
    pub(crate) fn with_demo_population(width: i32, height: i32) -> Self {
        let mut world = Self::new(width, height);
        for x in 2..8 {
            world.add_thing(
                "Plant_Potato",
                "potato plant",
                Cell::new(x, 2),
                ThingKind::Plant {
                    growth: 0.1 * x as f32,
                },
            );
        }
        world.add_thing(
            "Colonist",
            "Engie",
            Cell::new(width / 2, height / 2),
            ThingKind::Pawn {
                food_level: 0.3,
                has_food_need: true,
                animal: false,
                tame: false,
            },
        );
        world.add_thing(
            "Muffalo",
            "muffalo",
            Cell::new(width / 2 + 3, height / 2 + 1),
            ThingKind::Pawn {
                food_level: 0.5,
                has_food_need: true,
                animal: true,
                tame: false,
            },
        );
        world.add_thing("Steel", "steel", Cell::new(4, 6), ThingKind::Item);
        world
    }

    pub(crate) fn load_map(&mut self, width: i32, height: i32) {
        self.map = Some(GridMap::new(width, height));
        self.things.clear();
    }

    pub(crate) fn unload_map(&mut self) -> bool {
        self.things.clear();
        self.map.take().is_some()
    }

    pub(crate) fn size(&self) -> Option<(i32, i32)> {
        self.map.as_ref().map(|map| (map.width, map.height))
    }

    pub(crate) fn terrain_at(&self, cell: Cell) -> Option<&str> {
        let map = self.map.as_ref()?;
        map.index(cell).map(|index| map.terrain[index].as_str())
    }

    pub(crate) fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    pub(crate) fn thing(&self, id: u64) -> Option<&Thing> {
        self.things.get(&id)
    }

    pub(crate) fn add_thing(
        &mut self,
        def_name: &str,
        label: &str,
        cell: Cell,
        kind: ThingKind,
    ) -> u64 {
        let id = self.next_thing_id;
        self.next_thing_id += 1;
        let hit_points = match kind {
            ThingKind::Pawn { .. } => PAWN_HIT_POINTS,
            ThingKind::Plant { .. } => PLANT_HIT_POINTS,
            ThingKind::Item => ITEM_HIT_POINTS,
        };
        self.things.insert(
            id,
            Thing {
                id,
                def_name: def_name.to_string(),
                label: label.to_string(),
                cell,
                hit_points,
                kind,
            },
        );
        id
    }

    fn things_in(&self, rect: CellRect) -> impl Iterator<Item = &Thing> {
        self.things.values().filter(move |thing| rect.contains(thing.cell))
    }

    fn is_eligible(thing: &Thing, purpose: AreaPurpose) -> bool {
        match purpose {
            AreaPurpose::GrowPlants => {
                matches!(thing.kind, ThingKind::Plant { growth } if growth < 1.0)
            }
            AreaPurpose::ClearThings => !thing.is_pawn(),
        }
    }

    fn explode(&mut self, center: Cell, radius: f32, damage: u32) -> usize {
        let mut destroyed = Vec::new();
        let mut affected = 0;
        for thing in self.things.values_mut() {
            if thing.cell.within_radius(center, radius) {
                affected += 1;
                thing.hit_points = thing.hit_points.saturating_sub(damage);
                if thing.hit_points == 0 {
                    destroyed.push(thing.id);
                }
            }
        }
        for id in destroyed {
            self.things.remove(&id);
        }
        affected
    }

    fn paint(&mut self, center: Cell, terrain: &Definition, radius: f32) -> usize {
        let Some(map) = self.map.as_mut() else {
            return 0;
        };
        let Some(bounds) = map.bounds() else {
            return 0;
        };
        let mut painted = 0;
        for cell in Cell::radial_cells(center, radius, bounds) {
            if let Some(index) = map.index(cell) {
                map.terrain[index] = terrain.def_name.clone();
                painted += 1;
            }
        }
        painted
    }

    fn spawn(&mut self, cell: Cell, kind: &Definition) -> Result<usize, HostActionError> {
        let race = kind
            .as_pawn_kind()
            .and_then(|props| props.race)
            .ok_or_else(|| HostActionError::UnsupportedDefinition {
                def_name: kind.def_name.clone(),
                reason: "not a creature kind with a race".to_string(),
            })?;
        if self.things.values().any(|thing| thing.is_pawn() && thing.cell == cell) {
            return Err(HostActionError::SpawnBlocked {
                cell,
                reason: "another pawn stands there".to_string(),
            });
        }
        self.add_thing(
            &kind.def_name,
            kind.display_label(),
            cell,
            ThingKind::Pawn {
                food_level: 1.0,
                has_food_need: !race.mechanoid,
                animal: race.intelligence == Intelligence::Animal && !race.mechanoid,
                tame: false,
            },
        );
        Ok(1)
    }

    fn designate(&mut self, rect: CellRect, purpose: AreaPurpose) -> usize {
        let eligible = self
            .things_in(rect)
            .filter(|thing| Self::is_eligible(thing, purpose))
            .map(|thing| thing.id)
            .collect::<Vec<_>>();
        for id in &eligible {
            match purpose {
                AreaPurpose::GrowPlants => {
                    if let Some(Thing {
                        kind: ThingKind::Plant { growth },
                        ..
                    }) = self.things.get_mut(id)
                    {
                        *growth = 1.0;
                    }
                }
                AreaPurpose::ClearThings => {
                    self.things.remove(id);
                }
            }
        }
        eligible.len()
    }

    fn pawn_mut(&mut self, thing_id: u64) -> Result<&mut Thing, HostActionError> {
        self.things
            .get_mut(&thing_id)
            .filter(|thing| thing.is_pawn())
            .ok_or(HostActionError::ThingMissing { thing_id })
    }
}

/// Borrowed pairing of the world with the loaded definitions, handed to the
/// targeting session for one frame.
pub(crate) struct HostView<'a> {
    pub(crate) world: &'a mut SandboxWorld,
    pub(crate) defs: &'a DefDatabase,
}

impl WorldQuery for SandboxWorld {
    fn map_bounds(&self) -> Option<CellRect> {
        self.map.as_ref().and_then(GridMap::bounds)
    }

    fn map_available(&self) -> bool {
        self.map.is_some()
    }

    fn resolve_definition(&self, _def_name: &str) -> Option<Arc<Definition>> {
        None
    }

    fn count_eligible(&self, rect: CellRect, purpose: AreaPurpose) -> usize {
        self.things_in(rect)
            .filter(|thing| Self::is_eligible(thing, purpose))
            .count()
    }
}

impl WorldQuery for HostView<'_> {
    fn map_bounds(&self) -> Option<CellRect> {
        self.world.map_bounds()
    }

    fn map_available(&self) -> bool {
        self.world.map_available()
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        self.world.in_bounds(cell)
    }

    fn resolve_definition(&self, def_name: &str) -> Option<Arc<Definition>> {
        self.defs.definition_by_name(def_name)
    }

    fn count_eligible(&self, rect: CellRect, purpose: AreaPurpose) -> usize {
        self.world.count_eligible(rect, purpose)
    }
}

impl TargetingHost for HostView<'_> {
    fn apply(&mut self, command: &WorldCommand) -> Result<usize, HostActionError> {
        if !self.world.map_available() {
            return Err(HostActionError::NoMap);
        }
        debug!(?command, "sandbox_apply");
        match command {
            WorldCommand::Explode {
                center,
                radius,
                damage,
                ..
            } => Ok(self.world.explode(*center, *radius, *damage)),
            WorldCommand::PaintTerrain {
                center,
                terrain,
                radius,
            } => {
                if terrain.as_terrain().is_none() {
                    return Err(HostActionError::UnsupportedDefinition {
                        def_name: terrain.def_name.clone(),
                        reason: "not a terrain definition".to_string(),
                    });
                }
                Ok(self.world.paint(*center, terrain, *radius))
            }
            WorldCommand::SpawnPawn { cell, kind } => {
                if !self.world.in_bounds(*cell) {
                    return Err(HostActionError::OutOfBounds { cell: *cell });
                }
                self.world.spawn(*cell, kind)
            }
            WorldCommand::DesignateArea { rect, purpose } => {
                Ok(self.world.designate(*rect, *purpose))
            }
            WorldCommand::FeedPawn { thing_id } => {
                let pawn = self.world.pawn_mut(*thing_id)?;
                if let ThingKind::Pawn { food_level, .. } = &mut pawn.kind {
                    *food_level = 1.0;
                }
                Ok(1)
            }
            WorldCommand::TameAnimal { thing_id } => {
                let pawn = self.world.pawn_mut(*thing_id)?;
                if let ThingKind::Pawn { tame, .. } = &mut pawn.kind {
                    *tame = true;
                }
                Ok(1)
            }
        }
    }
}
