//! Lifecycle state machine for stream functions.

use thiserror::Error;
use tracing::debug;

/// States a stream function moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, no handler yet.
    Created,
    /// A handler is stored; ready to connect.
    HandlerAttached,
    /// Connected to the broker.
    Connected,
    /// Pulling frames and invoking the handler.
    Running,
    /// Finished; no further frames are processed.
    Terminated,
}

impl StreamState {
    /// Returns `true` once the function has connected, including later states.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Running | Self::Terminated)
    }

    /// Returns `true` once the function has terminated.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Events that trigger lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Store (or replace) the handler.
    AttachHandler,
    /// Connect to the broker.
    Connect,
    /// Start the receive loop.
    Run,
    /// Stop for good.
    Terminate,
}

/// Lifecycle state manager.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    name: String,
    state: StreamState,
}

impl Lifecycle {
    /// Constructs a lifecycle controller for the named function.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StreamState::Created,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Applies a lifecycle event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the supplied event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: LifecycleEvent) -> LifecycleResult<StreamState> {
        let next = match (self.state, event) {
            (StreamState::Created | StreamState::HandlerAttached, LifecycleEvent::AttachHandler) => {
                Some(StreamState::HandlerAttached)
            }
            (StreamState::HandlerAttached, LifecycleEvent::Connect) => Some(StreamState::Connected),
            (StreamState::Connected, LifecycleEvent::Run) => Some(StreamState::Running),
            (_, LifecycleEvent::Terminate) => Some(StreamState::Terminated),
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(LifecycleError::InvalidTransition {
                name: self.name.clone(),
                from: self.state,
                event,
            });
        };

        self.enter(next_state, event);
        Ok(self.state)
    }

    /// Moves to [`StreamState::Terminated`], which every state accepts.
    pub fn terminate(&mut self) {
        self.enter(StreamState::Terminated, LifecycleEvent::Terminate);
    }

    fn enter(&mut self, next_state: StreamState, event: LifecycleEvent) {
        if next_state != self.state {
            debug!(
                name = %self.name,
                ?self.state,
                ?next_state,
                ?event,
                "stream function lifecycle transition"
            );
            self.state = next_state;
        }
    }
}

/// Errors emitted by the lifecycle controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid lifecycle transition from {from:?} via {event:?} for stream function `{name}`")]
    InvalidTransition {
        /// Name of the function whose transition failed.
        name: String,
        /// State prior to the attempted transition.
        from: StreamState,
        /// Event that triggered the failure.
        event: LifecycleEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
