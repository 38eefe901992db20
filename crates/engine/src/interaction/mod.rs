mod registry;
mod sequencer;

pub use registry::{InteractionRegistry, RebuildRequest, VisibilityDelta};
pub use sequencer::{ClickDisposition, TriggerContext, TriggerPhase, TriggerSequencer};
