//! Event vocabulary dispatched to game-content handlers.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{ActorInstanceId, BoardId, Coordinate, PlayerId, TimerId};

/// Discriminates the event types handlers can be registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// An actor instance was placed onto a board.
    ActorInstanceCreated,
    /// An actor instance was removed from a board.
    ActorInstanceDestroyed,
    /// An actor instance moved between two coordinates.
    ActorInstanceMoved,
    /// An actor instance attempted to move onto another actor instance.
    ActorInstanceTouchedActorInstance,
    /// The player and an actor instance collided.
    PlayerTouchedActorInstance,
    /// The player moved between two coordinates of the same board.
    PlayerMoved,
    /// The player arrived on a board through an exit.
    PlayerEnteredBoard,
    /// The player is about to leave a board through an exit.
    PlayerExitedBoard,
    /// A board timer accumulated one full interval.
    TimerElapsed,
}

impl EventKind {
    /// Stable name of the kind, used in logs and persisted registrations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActorInstanceCreated => "actorInstanceCreated",
            Self::ActorInstanceDestroyed => "actorInstanceDestroyed",
            Self::ActorInstanceMoved => "actorInstanceMoved",
            Self::ActorInstanceTouchedActorInstance => "actorInstanceTouchedActorInstance",
            Self::PlayerTouchedActorInstance => "playerTouchedActorInstance",
            Self::PlayerMoved => "playerMoved",
            Self::PlayerEnteredBoard => "playerEnteredBoard",
            Self::PlayerExitedBoard => "playerExitedBoard",
            Self::TimerElapsed => "timerElapsed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome reported by a handler, and the aggregate of a whole dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventResult {
    /// The handler did not respond. Neutral element of [`EventResult::combine`].
    #[default]
    Unhandled,
    /// The handler reacted and lets game logic continue.
    Completed,
    /// The handler vetoes the game logic that follows the event.
    Canceled,
}

impl EventResult {
    /// Folds the next handler's result into an accumulated result.
    ///
    /// A cancellation is sticky. Otherwise the most recent non-neutral result
    /// wins, and neutral results never overwrite an earlier response.
    #[must_use]
    pub const fn combine(self, next: EventResult) -> EventResult {
        match (self, next) {
            (Self::Canceled, _) | (_, Self::Canceled) => Self::Canceled,
            (current, Self::Unhandled) => current,
            (_, next) => next,
        }
    }

    /// Reports whether the result vetoes subsequent game logic.
    #[must_use]
    pub const fn is_canceled(self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Event payload that can be dispatched through a handler collection.
pub trait WorldEvent: fmt::Debug + Send + Sync + 'static {
    /// Kind under which handlers for this payload are registered.
    const KIND: EventKind;
}

/// Fired after an actor instance occupies the actor-instance layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorInstanceCreatedEvent {
    /// Board that now owns the actor instance.
    pub board_id: BoardId,
    /// Actor instance that was placed.
    pub actor_instance_id: ActorInstanceId,
    /// Coordinate the actor instance occupies.
    pub coordinate: Coordinate,
}

impl WorldEvent for ActorInstanceCreatedEvent {
    const KIND: EventKind = EventKind::ActorInstanceCreated;
}

/// Fired after an actor instance vacates the actor-instance layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorInstanceDestroyedEvent {
    /// Board that owned the actor instance.
    pub board_id: BoardId,
    /// Actor instance that was removed.
    pub actor_instance_id: ActorInstanceId,
    /// Coordinate the actor instance occupied before removal.
    pub coordinate: Coordinate,
}

impl WorldEvent for ActorInstanceDestroyedEvent {
    const KIND: EventKind = EventKind::ActorInstanceDestroyed;
}

/// Fired after an actor instance moved to a new coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorInstanceMovedEvent {
    /// Board on which the move happened.
    pub board_id: BoardId,
    /// Actor instance that moved.
    pub actor_instance_id: ActorInstanceId,
    /// Coordinate occupied before the move.
    pub from: Coordinate,
    /// Coordinate occupied after the move.
    pub to: Coordinate,
}

impl WorldEvent for ActorInstanceMovedEvent {
    const KIND: EventKind = EventKind::ActorInstanceMoved;
}

/// Fired on the touched actor instance when another actor instance bumps into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorInstanceTouchedActorInstanceEvent {
    /// Board on which the collision happened.
    pub board_id: BoardId,
    /// Actor instance whose move was blocked.
    pub source_actor_instance_id: ActorInstanceId,
    /// Actor instance occupying the requested destination.
    pub target_actor_instance_id: ActorInstanceId,
}

impl WorldEvent for ActorInstanceTouchedActorInstanceEvent {
    const KIND: EventKind = EventKind::ActorInstanceTouchedActorInstance;
}

/// Fired on an actor instance whenever it and the player collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerTouchedActorInstanceEvent {
    /// Board on which the collision happened.
    pub board_id: BoardId,
    /// The player involved in the collision.
    pub player_id: PlayerId,
    /// Actor instance involved in the collision.
    pub actor_instance_id: ActorInstanceId,
}

impl WorldEvent for PlayerTouchedActorInstanceEvent {
    const KIND: EventKind = EventKind::PlayerTouchedActorInstance;
}

/// Fired after the player moved within a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerMovedEvent {
    /// Board on which the move happened.
    pub board_id: BoardId,
    /// The player that moved.
    pub player_id: PlayerId,
    /// Coordinate occupied before the move.
    pub from: Coordinate,
    /// Coordinate occupied after the move.
    pub to: Coordinate,
}

impl WorldEvent for PlayerMovedEvent {
    const KIND: EventKind = EventKind::PlayerMoved;
}

/// Fired on a board after the player arrived through an exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerEnteredBoardEvent {
    /// Board the player entered.
    pub board_id: BoardId,
    /// Board the player came from.
    pub previous_board_id: BoardId,
    /// The player that entered.
    pub player_id: PlayerId,
    /// Coordinate the player occupies on the entered board.
    pub coordinate: Coordinate,
}

impl WorldEvent for PlayerEnteredBoardEvent {
    const KIND: EventKind = EventKind::PlayerEnteredBoard;
}

/// Fired on a board before the player leaves it through an exit.
///
/// A [`EventResult::Canceled`] aggregate keeps the player on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerExitedBoardEvent {
    /// Board the player is leaving.
    pub board_id: BoardId,
    /// Board the exit leads to.
    pub destination_board_id: BoardId,
    /// The player that is leaving.
    pub player_id: PlayerId,
    /// Coordinate of the exit on the board being left.
    pub coordinate: Coordinate,
}

impl WorldEvent for PlayerExitedBoardEvent {
    const KIND: EventKind = EventKind::PlayerExitedBoard;
}

/// Fired on a timer's handlers for every full interval it accumulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerElapsedEvent {
    /// Board that owns the timer.
    pub board_id: BoardId,
    /// Timer that elapsed.
    pub timer_id: TimerId,
    /// Interval the timer fires at.
    pub interval: Duration,
}

impl WorldEvent for TimerElapsedEvent {
    const KIND: EventKind = EventKind::TimerElapsed;
}

#[cfg(test)]
mod tests {
    use super::EventResult;

    #[test]
    fn cancellation_is_sticky() {
        let aggregate = [
            EventResult::Completed,
            EventResult::Canceled,
            EventResult::Completed,
            EventResult::Unhandled,
        ]
        .into_iter()
        .fold(EventResult::default(), EventResult::combine);

        assert_eq!(aggregate, EventResult::Canceled);
    }

    #[test]
    fn neutral_results_do_not_overwrite_responses() {
        let aggregate = EventResult::Unhandled
            .combine(EventResult::Completed)
            .combine(EventResult::Unhandled);

        assert_eq!(aggregate, EventResult::Completed);
    }

    #[test]
    fn empty_dispatch_is_unhandled() {
        let aggregate = std::iter::empty::<EventResult>()
            .fold(EventResult::default(), EventResult::combine);
        assert_eq!(aggregate, EventResult::Unhandled);
    }
}
