mod host;
mod messages;
mod preview;
mod session;
mod types;

pub use host::{
    AreaPurpose, HostActionError, TargetEventSource, TargetingHost, WorldCommand, WorldQuery,
};
pub use messages::{MessageLog, MessageSeverity, StatusMessage};
pub use preview::{
    draw_preview, plan_preview, GridViewport, PreviewPlan, PreviewState, Rgba, Ring, RING_SCALES,
};
pub use session::{ArmMode, SessionState, TargetingAction, TargetingSession, Transition};
pub use types::{Cell, CellRect, TargetEvent, ThingTarget};
