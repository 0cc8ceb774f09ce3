use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::content::Definition;

use super::types::{Cell, CellRect, TargetEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AreaPurpose {
    GrowPlants,
    ClearThings,
}

impl AreaPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GrowPlants => "grow",
            Self::ClearThings => "clear",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "grow" | "grow_plants" | "growing" => Some(Self::GrowPlants),
            "clear" | "clear_things" => Some(Self::ClearThings),
            _ => None,
        }
    }

    /// What the host counts as eligible inside a selected area.
    pub fn eligible_label(self) -> &'static str {
        match self {
            Self::GrowPlants => "Growable plants in area",
            Self::ClearThings => "Things to clear in area",
        }
    }
}

/// A fully resolved action, handed to the host exactly once per accepted
/// target. Definitions are re-resolved right before the command is built.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldCommand {
    Explode {
        center: Cell,
        damage_kind: String,
        radius: f32,
        damage: u32,
    },
    PaintTerrain {
        center: Cell,
        terrain: Arc<Definition>,
        radius: f32,
    },
    SpawnPawn {
        cell: Cell,
        kind: Arc<Definition>,
    },
    DesignateArea {
        rect: CellRect,
        purpose: AreaPurpose,
    },
    FeedPawn {
        thing_id: u64,
    },
    TameAnimal {
        thing_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostActionError {
    #[error("no map is loaded")]
    NoMap,
    #[error("cell {cell} is outside the map")]
    OutOfBounds { cell: Cell },
    #[error("cannot spawn at {cell}: {reason}")]
    SpawnBlocked { cell: Cell, reason: String },
    #[error("thing {thing_id} no longer exists")]
    ThingMissing { thing_id: u64 },
    #[error("definition '{def_name}' cannot be used here: {reason}")]
    UnsupportedDefinition { def_name: String, reason: String },
}

/// Read-only view of the host world used by validity checks and previews.
pub trait WorldQuery {
    /// Every cell of the loaded map, or `None` when no map is loaded.
    fn map_bounds(&self) -> Option<CellRect>;

    fn map_available(&self) -> bool {
        self.map_bounds().is_some()
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        self.map_bounds().is_some_and(|bounds| bounds.contains(cell))
    }

    fn resolve_definition(&self, def_name: &str) -> Option<Arc<Definition>>;

    fn count_eligible(&self, rect: CellRect, purpose: AreaPurpose) -> usize;
}

pub trait TargetingHost: WorldQuery {
    /// Applies one command and returns how many cells or things it touched.
    fn apply(&mut self, command: &WorldCommand) -> Result<usize, HostActionError>;
}

pub trait TargetEventSource {
    /// `None` means no input is pending this frame.
    fn poll_event(&mut self) -> Option<TargetEvent>;
}

impl<I> TargetEventSource for I
where
    I: Iterator<Item = TargetEvent>,
{
    fn poll_event(&mut self) -> Option<TargetEvent> {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_purpose_parses_aliases() {
        assert_eq!(AreaPurpose::parse("Grow"), Some(AreaPurpose::GrowPlants));
        assert_eq!(AreaPurpose::parse("clear_things"), Some(AreaPurpose::ClearThings));
        assert_eq!(AreaPurpose::parse("dig"), None);
    }

    #[test]
    fn iterators_act_as_event_sources() {
        let mut events = vec![TargetEvent::Cell(Cell::new(1, 2)), TargetEvent::Cancel].into_iter();
        assert_eq!(events.poll_event(), Some(TargetEvent::Cell(Cell::new(1, 2))));
        assert_eq!(events.poll_event(), Some(TargetEvent::Cancel));
        assert_eq!(events.poll_event(), None);
    }
}
