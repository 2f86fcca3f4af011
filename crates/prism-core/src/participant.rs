//! Contract implemented by external rendering and effect modules.

use crate::error::ParticipantError;
use crate::events::EffectEvent;
use crate::state::{StatePatch, VisualEffectState};

/// A rendering or effect module that consumes the shared state.
///
/// Only `name` and `on_state_update` are required. The event callback and the
/// contribution are optional capabilities; the defaults opt out of them.
pub trait Participant {
    /// Unique, non-empty registry key.
    fn name(&self) -> &str;

    fn on_state_update(&mut self, state: &VisualEffectState) -> Result<(), ParticipantError>;

    fn on_effect_event(&mut self, _event: &EffectEvent) -> Result<(), ParticipantError> {
        Ok(())
    }

    /// Values this participant wants merged into the next state, if any.
    fn contribution(&mut self) -> Option<StatePatch> {
        None
    }
}

/// Which callback a recorded outcome came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallbackKind {
    StateUpdate,
    EffectEvent,
}

impl CallbackKind {
    fn as_str(self) -> &'static str {
        match self {
            CallbackKind::StateUpdate => "state update",
            CallbackKind::EffectEvent => "effect event",
        }
    }
}

// Streaks are tracked per callback so a participant that handles events but
// always fails state updates is still pruned.
pub(crate) struct Registration {
    pub name: String,
    pub handle: Box<dyn Participant>,
    pub last_contribution_ms: Option<f64>,
    state_failures: u32,
    event_failures: u32,
}

impl Registration {
    pub fn new(handle: Box<dyn Participant>) -> Self {
        Self {
            name: handle.name().to_owned(),
            handle,
            last_contribution_ms: None,
            state_failures: 0,
            event_failures: 0,
        }
    }

    /// Record a callback outcome; returns true when the call failed.
    pub fn record(&mut self, result: Result<(), ParticipantError>, kind: CallbackKind) -> bool {
        let streak = match kind {
            CallbackKind::StateUpdate => &mut self.state_failures,
            CallbackKind::EffectEvent => &mut self.event_failures,
        };
        match result {
            Ok(()) => {
                *streak = 0;
                false
            }
            Err(e) => {
                *streak += 1;
                if *streak == 1 {
                    log::warn!("[coordinator] `{}` {} failed: {}", self.name, kind.as_str(), e);
                } else {
                    log::debug!(
                        "[coordinator] `{}` {} failed again ({}): {}",
                        self.name,
                        kind.as_str(),
                        streak,
                        e
                    );
                }
                true
            }
        }
    }

    pub fn exceeded(&self, max_failures: u32) -> bool {
        self.state_failures.max(self.event_failures) >= max_failures.max(1)
    }
}
