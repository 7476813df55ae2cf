//! Interval timers owned by boards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tile_adventure_core::{TimerId, WorldEvent};

use crate::events::{EventHandlerCollection, HandlerSnapshot};

/// Whether a timer accumulates time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimerState {
    /// The timer accumulates time and fires.
    Running,
    /// The timer keeps its accumulated time but does not advance.
    #[default]
    Stopped,
}

/// Board timer that fires once per elapsed interval.
#[derive(Debug)]
pub struct Timer {
    id: TimerId,
    name: String,
    interval: Duration,
    state: TimerState,
    elapsed: Duration,
    handlers: Option<EventHandlerCollection>,
}

impl Timer {
    /// Creates a stopped timer firing every `interval`.
    ///
    /// A zero interval never fires.
    #[must_use]
    pub fn new(id: TimerId, name: impl Into<String>, interval: Duration) -> Self {
        Self {
            id,
            name: name.into(),
            interval,
            state: TimerState::Stopped,
            elapsed: Duration::ZERO,
            handlers: None,
        }
    }

    /// Creates the timer in the running state.
    #[must_use]
    pub fn running(mut self) -> Self {
        self.state = TimerState::Running;
        self
    }

    /// Attaches a handler collection.
    #[must_use]
    pub fn with_event_handlers(mut self, handlers: EventHandlerCollection) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Unique identifier of the timer.
    #[must_use]
    pub const fn id(&self) -> TimerId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interval between firings.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Current running state.
    #[must_use]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    /// Time accumulated towards the next firing.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Resumes accumulating time.
    pub fn start(&mut self) {
        self.state = TimerState::Running;
    }

    /// Pauses the timer without discarding accumulated time.
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
    }

    /// Discards accumulated time, keeping the running state.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// Handlers attached to the timer, if any.
    #[must_use]
    pub fn event_handlers(&self) -> Option<&EventHandlerCollection> {
        self.handlers.as_ref()
    }

    /// Mutable access to the attached handlers, if any.
    pub fn event_handlers_mut(&mut self) -> Option<&mut EventHandlerCollection> {
        self.handlers.as_mut()
    }

    /// Replaces (or detaches) the handler collection, returning the previous one.
    pub fn set_event_handlers(
        &mut self,
        handlers: Option<EventHandlerCollection>,
    ) -> Option<EventHandlerCollection> {
        std::mem::replace(&mut self.handlers, handlers)
    }

    /// Accumulates `dt` and returns how many intervals elapsed, at most `limit`.
    ///
    /// Intervals beyond the limit are dropped so that a long stall does not
    /// produce an unbounded burst of firings.
    pub(crate) fn advance(&mut self, dt: Duration, limit: u32) -> u32 {
        if self.state == TimerState::Stopped || self.interval.is_zero() {
            return 0;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let mut firings = 0;
        while self.elapsed >= self.interval && firings < limit {
            self.elapsed -= self.interval;
            firings += 1;
        }
        if firings == limit {
            self.elapsed = Duration::from_nanos(
                u64::try_from(self.elapsed.as_nanos() % self.interval.as_nanos())
                    .unwrap_or_default(),
            );
        }
        firings
    }

    pub(crate) fn restore(&mut self, state: TimerState, elapsed: Duration) {
        self.state = state;
        self.elapsed = elapsed;
    }

    pub(crate) fn snapshot<E: WorldEvent>(&self) -> HandlerSnapshot<E> {
        self.handlers
            .as_ref()
            .map_or_else(HandlerSnapshot::empty, EventHandlerCollection::snapshot::<E>)
    }
}
