//! The cancellable, self-re-arming targeting loop.
//!
//! A session is armed with one [`TargetingAction`] and then fed pointer
//! resolutions one at a time. Each accepted target either applies the action
//! and leaves the session armed, records the first corner of a two-corner
//! selection, or finishes the selection. A cancel event (or a rejected
//! target) always returns the session to idle with every field reset.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::host::{AreaPurpose, TargetEventSource, TargetingHost, WorldCommand, WorldQuery};
use super::messages::{MessageLog, MessageSeverity};
use super::preview::{PreviewState, Rgba};
use super::types::{Cell, CellRect, TargetEvent, ThingTarget};

const EXPLOSION_COLOR: Rgba = [255, 88, 40, 255];
const PAINT_COLOR: Rgba = [96, 200, 120, 255];
const SPAWN_COLOR: Rgba = [96, 160, 255, 255];
const AREA_COLOR: Rgba = [255, 214, 80, 255];
const FEED_COLOR: Rgba = [128, 220, 255, 255];
const TAME_COLOR: Rgba = [255, 160, 220, 255];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TargetingAction {
    Explode {
        damage_kind: String,
        radius: f32,
        damage: u32,
    },
    PaintTerrain {
        terrain_def: String,
        radius: f32,
    },
    SpawnPawn {
        kind_def: String,
    },
    SelectArea {
        purpose: AreaPurpose,
    },
    FeedPawn,
    TameAnimal,
}

impl TargetingAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Explode { .. } => "explosion targeting",
            Self::PaintTerrain { .. } => "terrain painting",
            Self::SpawnPawn { .. } => "pawn spawning",
            Self::SelectArea { .. } => "area selection",
            Self::FeedPawn => "pawn feeding",
            Self::TameAnimal => "animal taming",
        }
    }

    /// Definition the action needs at apply time, if any.
    pub fn bound_def_name(&self) -> Option<&str> {
        match self {
            Self::PaintTerrain { terrain_def, .. } => Some(terrain_def),
            Self::SpawnPawn { kind_def } => Some(kind_def),
            _ => None,
        }
    }

    pub fn radius(&self) -> Option<f32> {
        match self {
            Self::Explode { radius, .. } | Self::PaintTerrain { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    pub fn is_two_stage(&self) -> bool {
        matches!(self, Self::SelectArea { .. })
    }

    pub fn targets_things(&self) -> bool {
        matches!(self, Self::FeedPawn | Self::TameAnimal)
    }

    fn accepts_thing(&self, thing: &ThingTarget) -> bool {
        match self {
            Self::FeedPawn => thing.is_pawn && thing.has_food_need,
            Self::TameAnimal => thing.is_pawn && thing.is_animal,
            _ => true,
        }
    }

    fn thing_requirement(&self) -> &'static str {
        match self {
            Self::FeedPawn => "a pawn with a food need",
            Self::TameAnimal => "an animal",
            _ => "a valid target",
        }
    }

    fn preview_color(&self) -> Rgba {
        match self {
            Self::Explode { .. } => EXPLOSION_COLOR,
            Self::PaintTerrain { .. } => PAINT_COLOR,
            Self::SpawnPawn { .. } => SPAWN_COLOR,
            Self::SelectArea { .. } => AREA_COLOR,
            Self::FeedPawn => FEED_COLOR,
            Self::TameAnimal => TAME_COLOR,
        }
    }

    fn target_identity(&self) -> Option<String> {
        match self {
            Self::Explode { damage_kind, .. } => Some(damage_kind.clone()),
            other => other.bound_def_name().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ArmMode {
    #[default]
    Repeat,
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    #[default]
    Idle,
    Armed,
    ArmedSecondCorner {
        first_corner: Cell,
    },
}

/// Outcome of feeding one event to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Action applied (or attempted); the session is armed again.
    Rearmed,
    AwaitingSecondCorner,
    /// Final stage applied; the session is idle.
    Completed,
    Cancelled,
    /// Bound definition was gone at apply time; nothing was applied.
    Skipped,
    /// The session was idle.
    Ignored,
}

enum Resolved {
    Cell(Cell),
    Thing(ThingTarget),
}

impl Resolved {
    fn cell(&self) -> Cell {
        match self {
            Self::Cell(cell) => *cell,
            Self::Thing(thing) => thing.cell,
        }
    }
}

enum Rejection {
    Cancelled,
    Rejected(String),
}

#[derive(Debug, Default)]
pub struct TargetingSession {
    state: SessionState,
    action: Option<TargetingAction>,
    mode: ArmMode,
    bound_def: Option<String>,
    preview: PreviewState,
    actions_executed: u64,
}

impl TargetingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub fn action(&self) -> Option<&TargetingAction> {
        self.action.as_ref()
    }

    pub fn mode(&self) -> ArmMode {
        self.mode
    }

    pub fn bound_definition(&self) -> Option<&str> {
        self.bound_def.as_deref()
    }

    /// State the preview renderer reads each frame.
    pub fn preview(&self) -> &PreviewState {
        &self.preview
    }

    /// Host calls made since the session was created.
    pub fn actions_executed(&self) -> u64 {
        self.actions_executed
    }

    /// Arms the session, replacing any action already in progress.
    pub fn begin(&mut self, action: TargetingAction, mode: ArmMode, messages: &mut MessageLog) {
        if let Some(previous) = &self.action {
            debug!(previous = previous.name(), "targeting_replaced");
        }

        self.bound_def = action.bound_def_name().map(ToString::to_string);
        self.preview = PreviewState {
            active: true,
            target_def: action.target_identity(),
            radius: action.radius(),
            damage: match &action {
                TargetingAction::Explode { damage, .. } => Some(*damage),
                _ => None,
            },
            color: action.preview_color(),
            area: match &action {
                TargetingAction::SelectArea { purpose } => Some(*purpose),
                _ => None,
            },
            first_corner: None,
        };
        self.state = SessionState::Armed;
        self.mode = mode;

        let hint = if action.is_two_stage() {
            "click the first corner"
        } else if action.targets_things() {
            "click a target"
        } else {
            "click cells"
        };
        messages.push(
            MessageSeverity::Neutral,
            format!("Started {}: {hint}, right-click to stop.", action.name()),
        );
        info!(action = action.name(), mode = ?mode, "targeting_armed");
        self.action = Some(action);
    }

    /// Drops the bound definition, as external teardown would. The next
    /// accepted target is skipped instead of acting on it.
    pub fn release_definition(&mut self) -> Option<String> {
        self.preview.target_def = None;
        self.bound_def.take()
    }

    /// Resets every field. Safe to call at any time; returns whether a
    /// session was active.
    pub fn clear(&mut self) -> bool {
        let was_active = self.is_active();
        self.reset();
        was_active
    }

    /// Feeds events until the source runs dry or the session goes idle.
    pub fn pump<E, H>(
        &mut self,
        events: &mut E,
        host: &mut H,
        messages: &mut MessageLog,
    ) -> Vec<Transition>
    where
        E: TargetEventSource + ?Sized,
        H: TargetingHost + ?Sized,
    {
        let mut transitions = Vec::new();
        while self.is_active() {
            let Some(event) = events.poll_event() else {
                break;
            };
            transitions.push(self.handle_event(event, host, messages));
        }
        transitions
    }

    /// Performs exactly one transition.
    pub fn handle_event<H>(
        &mut self,
        event: TargetEvent,
        host: &mut H,
        messages: &mut MessageLog,
    ) -> Transition
    where
        H: TargetingHost + ?Sized,
    {
        let Some(action) = self.action.clone() else {
            debug!(?event, "targeting_event_ignored");
            return Transition::Ignored;
        };

        let target = match resolve_target(&action, event, &*host) {
            Ok(target) => target,
            Err(Rejection::Cancelled) => return self.stop(messages),
            Err(Rejection::Rejected(reason)) => {
                messages.push(MessageSeverity::RejectInput, reason);
                return self.stop(messages);
            }
        };

        match self.state {
            SessionState::Idle => Transition::Ignored,
            SessionState::Armed if action.is_two_stage() => {
                let first_corner = target.cell();
                self.state = SessionState::ArmedSecondCorner { first_corner };
                self.preview.first_corner = Some(first_corner);
                messages.push(
                    MessageSeverity::Neutral,
                    format!("First corner set at {first_corner}; click the second corner."),
                );
                Transition::AwaitingSecondCorner
            }
            SessionState::ArmedSecondCorner { first_corner } => {
                let TargetingAction::SelectArea { purpose } = &action else {
                    self.state = SessionState::Armed;
                    return Transition::Ignored;
                };
                let rect = CellRect::from_corners(first_corner, target.cell());
                self.execute(
                    &action,
                    WorldCommand::DesignateArea {
                        rect,
                        purpose: *purpose,
                    },
                    None,
                    host,
                    messages,
                );
                self.reset();
                Transition::Completed
            }
            SessionState::Armed => {
                let Some(command) = self.build_command(&action, &target, &*host) else {
                    debug!(
                        action = action.name(),
                        def_name = ?self.bound_def,
                        "targeting_stale_definition_skipped"
                    );
                    return self.after_single_stage(Transition::Skipped);
                };
                let thing = match &target {
                    Resolved::Thing(thing) => Some(thing),
                    Resolved::Cell(_) => None,
                };
                self.execute(&action, command, thing, host, messages);
                self.after_single_stage(Transition::Rearmed)
            }
        }
    }

    fn build_command<H>(
        &self,
        action: &TargetingAction,
        target: &Resolved,
        host: &H,
    ) -> Option<WorldCommand>
    where
        H: WorldQuery + ?Sized,
    {
        let cell = target.cell();
        let command = match action {
            TargetingAction::Explode {
                damage_kind,
                radius,
                damage,
            } => WorldCommand::Explode {
                center: cell,
                damage_kind: damage_kind.clone(),
                radius: *radius,
                damage: *damage,
            },
            TargetingAction::PaintTerrain { radius, .. } => WorldCommand::PaintTerrain {
                center: cell,
                terrain: host.resolve_definition(self.bound_def.as_deref()?)?,
                radius: *radius,
            },
            TargetingAction::SpawnPawn { .. } => WorldCommand::SpawnPawn {
                cell,
                kind: host.resolve_definition(self.bound_def.as_deref()?)?,
            },
            TargetingAction::SelectArea { purpose } => WorldCommand::DesignateArea {
                rect: CellRect::from_corners(cell, cell),
                purpose: *purpose,
            },
            TargetingAction::FeedPawn => WorldCommand::FeedPawn {
                thing_id: thing_id(target)?,
            },
            TargetingAction::TameAnimal => WorldCommand::TameAnimal {
                thing_id: thing_id(target)?,
            },
        };
        Some(command)
    }

    fn execute<H>(
        &mut self,
        action: &TargetingAction,
        command: WorldCommand,
        thing: Option<&ThingTarget>,
        host: &mut H,
        messages: &mut MessageLog,
    ) where
        H: TargetingHost + ?Sized,
    {
        self.actions_executed += 1;
        match host.apply(&command) {
            Ok(affected) => {
                info!(action = action.name(), affected, "targeting_action_applied");
                messages.push(
                    MessageSeverity::Positive,
                    confirmation(&command, thing, affected),
                );
            }
            Err(error) => {
                warn!(action = action.name(), error = %error, "targeting_action_failed");
                messages.push(
                    MessageSeverity::RejectInput,
                    format!("Could not apply {}: {error}", action.name()),
                );
            }
        }
    }

    fn after_single_stage(&mut self, transition: Transition) -> Transition {
        match self.mode {
            ArmMode::Repeat => transition,
            ArmMode::Once => {
                self.reset();
                if transition == Transition::Rearmed {
                    Transition::Completed
                } else {
                    transition
                }
            }
        }
    }

    fn stop(&mut self, messages: &mut MessageLog) -> Transition {
        let name = self
            .action
            .as_ref()
            .map(TargetingAction::name)
            .unwrap_or("targeting");
        messages.push(MessageSeverity::Neutral, format!("Stopped {name}."));
        info!(action = name, "targeting_stopped");
        self.reset();
        Transition::Cancelled
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.action = None;
        self.mode = ArmMode::default();
        self.bound_def = None;
        self.preview = PreviewState::default();
    }
}

fn resolve_target<H>(
    action: &TargetingAction,
    event: TargetEvent,
    host: &H,
) -> Result<Resolved, Rejection>
where
    H: WorldQuery + ?Sized,
{
    let target = match event {
        TargetEvent::Cancel => return Err(Rejection::Cancelled),
        TargetEvent::Cell(_) if action.targets_things() => return Err(Rejection::Cancelled),
        TargetEvent::Cell(cell) => Resolved::Cell(cell),
        TargetEvent::Thing(thing) if action.targets_things() => {
            if !action.accepts_thing(&thing) {
                return Err(Rejection::Rejected(format!(
                    "{} is not {}.",
                    thing.label,
                    action.thing_requirement()
                )));
            }
            Resolved::Thing(thing)
        }
        TargetEvent::Thing(thing) => Resolved::Cell(thing.cell),
    };

    if !host.map_available() {
        return Err(Rejection::Rejected("No map is loaded.".to_string()));
    }
    let cell = target.cell();
    if !host.in_bounds(cell) {
        return Err(Rejection::Rejected(format!(
            "Cell {cell} is outside the map."
        )));
    }
    Ok(target)
}

fn thing_id(target: &Resolved) -> Option<u64> {
    match target {
        Resolved::Thing(thing) => Some(thing.id),
        Resolved::Cell(_) => None,
    }
}

fn confirmation(command: &WorldCommand, thing: Option<&ThingTarget>, affected: usize) -> String {
    let thing_label = thing.map(|thing| thing.label.as_str()).unwrap_or("target");
    match command {
        WorldCommand::Explode {
            center,
            damage_kind,
            radius,
            damage,
        } => format!(
            "Detonated {damage_kind} at {center} (radius {radius:.1}, damage {damage})."
        ),
        WorldCommand::PaintTerrain {
            center,
            terrain,
            radius,
        } => format!(
            "Painted {} at {center} (radius {radius:.1}, {affected} cells).",
            terrain.display_label()
        ),
        WorldCommand::SpawnPawn { cell, kind } => {
            format!("Spawned {} at {cell}.", kind.display_label())
        }
        WorldCommand::DesignateArea { rect, purpose } => format!(
            "Designated {} area {}x{} at {} ({affected} eligible).",
            purpose.as_str(),
            rect.width(),
            rect.height(),
            rect.min
        ),
        WorldCommand::FeedPawn { .. } => format!("Fed {thing_label}."),
        WorldCommand::TameAnimal { .. } => format!("Tamed {thing_label}."),
    }
}
