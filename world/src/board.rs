//! Layered boards and the movement rules that keep them consistent.
//!
//! A [`Board`] owns three aligned layers: background sprites, foreground
//! sprites that block movement, and the actor instances standing on it. Every
//! request is fully validated before anything is mutated, the state is then
//! mutated once, and only afterwards are the resulting events dispatched.

use std::{collections::HashMap, time::Duration};

use thiserror::Error;
use tile_adventure_core::{
    ActorInstanceCreatedEvent, ActorInstanceDestroyedEvent, ActorInstanceId,
    ActorInstanceMovedEvent, ActorInstanceTouchedActorInstanceEvent, BoardId, Coordinate,
    Direction, EventResult, PlayerId, PlayerMovedEvent, PlayerTouchedActorInstanceEvent, Size,
    TimerElapsedEvent, TimerId, WorldEvent,
};
use tracing::debug;

use crate::{
    actor::{ActorInstance, Roster},
    events::{EventContext, EventHandlerCollection, HandlerSnapshot},
    layer::{LayerError, Sprite, SpriteLayer, Tile, TileLayer},
    player::Player,
    timer::Timer,
};

/// Passage that moves the player to another board when stepping off an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardExit {
    coordinate: Coordinate,
    direction: Direction,
    destination_board_id: BoardId,
    destination_coordinate: Coordinate,
}

impl BoardExit {
    /// Creates an exit taken by stepping `direction` from `coordinate`.
    #[must_use]
    pub const fn new(
        coordinate: Coordinate,
        direction: Direction,
        destination_board_id: BoardId,
        destination_coordinate: Coordinate,
    ) -> Self {
        Self {
            coordinate,
            direction,
            destination_board_id,
            destination_coordinate,
        }
    }

    /// Edge coordinate the exit is taken from.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Direction the player steps to take the exit.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Board the exit leads to.
    #[must_use]
    pub const fn destination_board_id(&self) -> BoardId {
        self.destination_board_id
    }

    /// Coordinate the player arrives at on the destination board.
    #[must_use]
    pub const fn destination_coordinate(&self) -> Coordinate {
        self.destination_coordinate
    }
}

/// Reasons a board operation may be rejected.
///
/// These describe caller mistakes. Ordinary contention such as walking into a
/// wall is reported through [`MoveOutcome::Blocked`] instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    /// A layer rejected the coordinate.
    #[error(transparent)]
    Layer(#[from] LayerError),
    /// No actor instance with the identifier is placed on the board.
    #[error("actor instance {actor_instance_id} is not placed on this board")]
    UnknownActorInstance {
        /// Identifier that was looked up.
        actor_instance_id: ActorInstanceId,
    },
    /// The actor instance and the actor-instance layer disagree on its location.
    #[error("actor instance {actor_instance_id} is not at its indexed coordinate {coordinate}")]
    Desynchronized {
        /// Identifier of the inconsistent actor instance.
        actor_instance_id: ActorInstanceId,
        /// Coordinate the board recorded for the actor instance.
        coordinate: Coordinate,
    },
    /// The actor instance belongs to another board.
    #[error("actor instance {actor_instance_id} belongs to board {owner}, not {board_id}")]
    WrongBoard {
        /// Identifier of the actor instance.
        actor_instance_id: ActorInstanceId,
        /// Board the actor instance claims as owner.
        owner: BoardId,
        /// Board the actor instance was offered to.
        board_id: BoardId,
    },
    /// An actor instance with the identifier is already placed.
    #[error("actor instance {actor_instance_id} is already placed")]
    DuplicateActorInstance {
        /// Identifier of the duplicate.
        actor_instance_id: ActorInstanceId,
    },
    /// Another actor instance occupies the coordinate.
    #[error("an actor instance already occupies {coordinate}")]
    Occupied {
        /// Contested coordinate.
        coordinate: Coordinate,
    },
    /// A foreground sprite blocks the coordinate.
    #[error("a foreground sprite blocks {coordinate}")]
    ForegroundBlocked {
        /// Blocked coordinate.
        coordinate: Coordinate,
    },
    /// The player stands on the coordinate.
    #[error("the player occupies {coordinate}")]
    PlayerOccupied {
        /// Contested coordinate.
        coordinate: Coordinate,
    },
    /// The player stands on another board.
    #[error("player {player_id} is on board {player_board_id}, not {board_id}")]
    PlayerNotOnBoard {
        /// Identifier of the player.
        player_id: PlayerId,
        /// Board the player stands on.
        player_board_id: BoardId,
        /// Board the request was made against.
        board_id: BoardId,
    },
}

/// Thing that prevented a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Obstruction {
    /// Another actor instance occupies the destination.
    ActorInstance(ActorInstanceId),
    /// A foreground sprite occupies the destination.
    Foreground,
    /// The player occupies the destination.
    Player,
    /// The move leaves the board and no exit leads anywhere.
    Edge,
    /// A handler canceled the move.
    Vetoed,
}

/// Result of a validated movement request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The entity moved and the moved event was dispatched.
    Moved {
        /// Coordinate before the move.
        from: Coordinate,
        /// Coordinate after the move.
        to: Coordinate,
        /// Aggregate result of the moved event.
        result: EventResult,
    },
    /// The destination equals the current coordinate; nothing happened.
    Stationary,
    /// The move was refused and no state changed.
    Blocked {
        /// What refused the move.
        obstruction: Obstruction,
        /// Aggregate result of the touch event, if one was dispatched.
        result: EventResult,
    },
    /// The player left the board through an exit.
    Transferred {
        /// Board the player arrived on.
        board_id: BoardId,
        /// Coordinate the player arrived at.
        coordinate: Coordinate,
        /// Aggregate result of the entered event.
        result: EventResult,
    },
}

impl MoveOutcome {
    /// Reports whether the entity ended the request where it asked to be.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }

    const fn blocked(obstruction: Obstruction, result: EventResult) -> Self {
        Self::Blocked {
            obstruction,
            result,
        }
    }
}

/// Authoritative state of one board.
#[derive(Debug)]
pub struct Board {
    id: BoardId,
    name: String,
    description: String,
    size: Size,
    background: SpriteLayer,
    foreground: SpriteLayer,
    actor_instances: TileLayer<ActorInstance>,
    locations: HashMap<ActorInstanceId, Coordinate>,
    exits: Vec<BoardExit>,
    timers: Vec<Timer>,
    handlers: EventHandlerCollection,
}

impl Board {
    /// Creates an empty board with three layers of the provided size.
    #[must_use]
    pub fn new(
        id: BoardId,
        name: impl Into<String>,
        description: impl Into<String>,
        size: Size,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            size,
            background: SpriteLayer::new(size),
            foreground: SpriteLayer::new(size),
            actor_instances: TileLayer::new(size),
            locations: HashMap::new(),
            exits: Vec::new(),
            timers: Vec::new(),
            handlers: EventHandlerCollection::new(),
        }
    }

    /// Sets the exits leading off the board.
    #[must_use]
    pub fn with_exits(mut self, exits: Vec<BoardExit>) -> Self {
        self.exits = exits;
        self
    }

    /// Sets the timers owned by the board.
    #[must_use]
    pub fn with_timers(mut self, timers: Vec<Timer>) -> Self {
        self.timers = timers;
        self
    }

    /// Sets the board-scoped handler collection.
    #[must_use]
    pub fn with_event_handlers(mut self, handlers: EventHandlerCollection) -> Self {
        self.handlers = handlers;
        self
    }

    /// Unique identifier of the board.
    #[must_use]
    pub const fn id(&self) -> BoardId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bounds shared by all three layers.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Decorative layer drawn beneath everything else.
    #[must_use]
    pub fn background_layer(&self) -> &SpriteLayer {
        &self.background
    }

    /// Mutable access to the background layer, which never affects movement.
    pub fn background_layer_mut(&mut self) -> &mut SpriteLayer {
        &mut self.background
    }

    /// Layer of sprites that block movement.
    #[must_use]
    pub fn foreground_layer(&self) -> &SpriteLayer {
        &self.foreground
    }

    /// Layer holding the placed actor instances.
    #[must_use]
    pub fn actor_instance_layer(&self) -> &TileLayer<ActorInstance> {
        &self.actor_instances
    }

    /// Writes or clears a foreground sprite.
    ///
    /// A sprite may not be placed beneath an actor instance or the player.
    pub(crate) fn set_foreground_sprite(
        &mut self,
        player: &Player,
        coordinate: Coordinate,
        sprite: Option<Sprite>,
    ) -> Result<Option<Sprite>, BoardError> {
        if sprite.is_some() {
            if self.actor_instances.is_occupied(coordinate)? {
                return Err(BoardError::Occupied { coordinate });
            }
            if player.occupies(self.id, coordinate) {
                return Err(BoardError::PlayerOccupied { coordinate });
            }
        }
        Ok(self.foreground.set(coordinate, sprite)?)
    }

    /// Looks up a placed actor instance.
    #[must_use]
    pub fn actor_instance(&self, actor_instance_id: ActorInstanceId) -> Option<&ActorInstance> {
        let coordinate = self.locations.get(&actor_instance_id)?;
        self.actor_instances
            .get(*coordinate)
            .ok()
            .flatten()
            .filter(|actor| actor.id() == actor_instance_id)
    }

    /// Mutable access to a placed actor instance.
    pub fn actor_instance_mut(
        &mut self,
        actor_instance_id: ActorInstanceId,
    ) -> Option<&mut ActorInstance> {
        let coordinate = self.locations.get(&actor_instance_id)?;
        self.actor_instances
            .get_mut(*coordinate)
            .ok()
            .flatten()
            .filter(|actor| actor.id() == actor_instance_id)
    }

    /// Actor instance standing on the coordinate, if any.
    pub fn actor_instance_at(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<&ActorInstance>, BoardError> {
        Ok(self.actor_instances.get(coordinate)?)
    }

    /// Exits in declaration order.
    #[must_use]
    pub fn exits(&self) -> &[BoardExit] {
        &self.exits
    }

    /// Exit taken by stepping `direction` from `coordinate`, if any.
    #[must_use]
    pub fn exit_at(&self, coordinate: Coordinate, direction: Direction) -> Option<&BoardExit> {
        self.exits
            .iter()
            .find(|exit| exit.coordinate == coordinate && exit.direction == direction)
    }

    /// Timers in declaration order.
    #[must_use]
    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    /// Mutable access to a timer's state and handlers.
    pub fn timer_mut(&mut self, timer_id: TimerId) -> Option<&mut Timer> {
        self.timers.iter_mut().find(|timer| timer.id() == timer_id)
    }

    /// Board-scoped handlers, notified when the player enters or leaves.
    #[must_use]
    pub fn event_handlers(&self) -> &EventHandlerCollection {
        &self.handlers
    }

    /// Mutable access to the board-scoped handlers.
    pub fn event_handlers_mut(&mut self) -> &mut EventHandlerCollection {
        &mut self.handlers
    }

    /// Reports whether a foreground sprite, an actor instance or the player
    /// occupies the coordinate.
    pub fn is_blocked(&self, player: &Player, coordinate: Coordinate) -> Result<bool, BoardError> {
        Ok(self.foreground.is_occupied(coordinate)?
            || self.actor_instances.is_occupied(coordinate)?
            || player.occupies(self.id, coordinate))
    }

    /// Attempts to move an actor instance to `destination`.
    ///
    /// Unknown or desynchronised actor instances and out-of-bounds destinations
    /// are errors. Bumping into another actor instance notifies that instance
    /// with [`ActorInstanceTouchedActorInstanceEvent`]; bumping into the player
    /// notifies the mover with [`PlayerTouchedActorInstanceEvent`]. A blocked
    /// move changes nothing.
    pub(crate) fn try_move_actor_instance(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        actor_instance_id: ActorInstanceId,
        destination: Coordinate,
    ) -> Result<MoveOutcome, BoardError> {
        let from = self.locate(actor_instance_id)?;
        self.check_bounds(destination)?;
        if destination == from {
            return Ok(MoveOutcome::Stationary);
        }

        if let Some(target) = self.actor_instances.get(destination)?.map(ActorInstance::id) {
            let event = ActorInstanceTouchedActorInstanceEvent {
                board_id: self.id,
                source_actor_instance_id: actor_instance_id,
                target_actor_instance_id: target,
            };
            let result = self.dispatch_to_actor_instance(player, roster, target, &event);
            return Ok(MoveOutcome::blocked(
                Obstruction::ActorInstance(target),
                result,
            ));
        }
        if self.foreground.is_occupied(destination)? {
            return Ok(MoveOutcome::blocked(
                Obstruction::Foreground,
                EventResult::Unhandled,
            ));
        }
        if player.occupies(self.id, destination) {
            let event = PlayerTouchedActorInstanceEvent {
                board_id: self.id,
                player_id: player.id(),
                actor_instance_id,
            };
            let result = self.dispatch_to_actor_instance(player, roster, actor_instance_id, &event);
            return Ok(MoveOutcome::blocked(Obstruction::Player, result));
        }

        self.actor_instances.move_tile(from, destination)?;
        let _ = self.locations.insert(actor_instance_id, destination);
        debug!(
            board = %self.id,
            actor_instance = %actor_instance_id,
            %from,
            to = %destination,
            "actor instance moved"
        );

        let event = ActorInstanceMovedEvent {
            board_id: self.id,
            actor_instance_id,
            from,
            to: destination,
        };
        let result = self.dispatch_to_actor_instance(player, roster, actor_instance_id, &event);
        Ok(MoveOutcome::Moved {
            from,
            to: destination,
            result,
        })
    }

    /// Attempts to move the player to `destination` within this board.
    ///
    /// Walking into an actor instance notifies it with
    /// [`PlayerTouchedActorInstanceEvent`]. A successful move dispatches
    /// [`PlayerMovedEvent`] to the player's handlers.
    pub(crate) fn try_move_player(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        destination: Coordinate,
    ) -> Result<MoveOutcome, BoardError> {
        self.check_player(player)?;
        self.check_bounds(destination)?;
        let from = player.coordinate();
        if destination == from {
            return Ok(MoveOutcome::Stationary);
        }

        if self.foreground.is_occupied(destination)? {
            return Ok(MoveOutcome::blocked(
                Obstruction::Foreground,
                EventResult::Unhandled,
            ));
        }
        if let Some(target) = self.actor_instances.get(destination)?.map(ActorInstance::id) {
            let result = self.player_touch(player, roster, target);
            return Ok(MoveOutcome::blocked(
                Obstruction::ActorInstance(target),
                result,
            ));
        }

        player.set_coordinate(destination);
        debug!(board = %self.id, %from, to = %destination, "player moved");

        let event = PlayerMovedEvent {
            board_id: self.id,
            player_id: player.id(),
            from,
            to: destination,
        };
        let snapshot = player.snapshot::<PlayerMovedEvent>();
        let result = self.dispatch(player, roster, &snapshot, &event);
        Ok(MoveOutcome::Moved {
            from,
            to: destination,
            result,
        })
    }

    /// Places an actor instance at its own coordinate and dispatches
    /// [`ActorInstanceCreatedEvent`] to it.
    pub(crate) fn add_actor_instance(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        actor_instance: ActorInstance,
    ) -> Result<EventResult, BoardError> {
        self.check_placement(&actor_instance)?;
        let coordinate = actor_instance.coordinate();
        if player.occupies(self.id, coordinate) {
            return Err(BoardError::PlayerOccupied { coordinate });
        }
        let actor_instance_id = actor_instance.id();
        if roster.owner(actor_instance_id).is_some() {
            return Err(BoardError::DuplicateActorInstance { actor_instance_id });
        }

        self.insert_actor_instance(actor_instance)?;
        let _ = roster.claim(actor_instance_id, self.id);
        debug!(
            board = %self.id,
            actor_instance = %actor_instance_id,
            %coordinate,
            "actor instance created"
        );

        let event = ActorInstanceCreatedEvent {
            board_id: self.id,
            actor_instance_id,
            coordinate,
        };
        Ok(self.dispatch_to_actor_instance(player, roster, actor_instance_id, &event))
    }

    /// Removes an actor instance and dispatches [`ActorInstanceDestroyedEvent`]
    /// to it once its slot is vacant.
    pub(crate) fn remove_actor_instance(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        actor_instance_id: ActorInstanceId,
    ) -> Result<(ActorInstance, EventResult), BoardError> {
        let coordinate = self.locate(actor_instance_id)?;
        let actor_instance =
            self.actor_instances
                .take(coordinate)?
                .ok_or(BoardError::Desynchronized {
                    actor_instance_id,
                    coordinate,
                })?;
        let _ = self.locations.remove(&actor_instance_id);
        roster.release(actor_instance_id);
        debug!(
            board = %self.id,
            actor_instance = %actor_instance_id,
            %coordinate,
            "actor instance destroyed"
        );

        let event = ActorInstanceDestroyedEvent {
            board_id: self.id,
            actor_instance_id,
            coordinate,
        };
        let snapshot = actor_instance.snapshot::<ActorInstanceDestroyedEvent>();
        let result = self.dispatch(player, roster, &snapshot, &event);
        Ok((actor_instance, result))
    }

    /// Advances running timers by `dt`, dispatching [`TimerElapsedEvent`] once
    /// per elapsed interval, at most `max_firings` times per timer.
    ///
    /// Returns the number of firings dispatched.
    pub(crate) fn tick(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        dt: Duration,
        max_firings: u32,
    ) -> u32 {
        let mut total = 0_u32;
        for index in 0..self.timers.len() {
            let Some(timer) = self.timers.get_mut(index) else {
                continue;
            };
            let firings = timer.advance(dt, max_firings);
            if firings == 0 {
                continue;
            }

            let event = TimerElapsedEvent {
                board_id: self.id,
                timer_id: timer.id(),
                interval: timer.interval(),
            };
            let snapshot = timer.snapshot::<TimerElapsedEvent>();
            debug!(board = %self.id, timer = %event.timer_id, firings, "timer elapsed");
            for _ in 0..firings {
                let _ = self.dispatch(player, roster, &snapshot, &event);
            }
            total = total.saturating_add(firings);
        }
        total
    }

    pub(crate) fn player_touch(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        actor_instance_id: ActorInstanceId,
    ) -> EventResult {
        let event = PlayerTouchedActorInstanceEvent {
            board_id: self.id,
            player_id: player.id(),
            actor_instance_id,
        };
        self.dispatch_to_actor_instance(player, roster, actor_instance_id, &event)
    }

    pub(crate) fn dispatch_board_event<E: WorldEvent>(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        event: &E,
    ) -> EventResult {
        let snapshot = self.handlers.snapshot::<E>();
        self.dispatch(player, roster, &snapshot, event)
    }

    /// Validates and places an actor instance without dispatching events.
    pub(crate) fn place_actor_instance(
        &mut self,
        actor_instance: ActorInstance,
    ) -> Result<(), BoardError> {
        self.check_placement(&actor_instance)?;
        self.insert_actor_instance(actor_instance)
    }

    pub(crate) fn foreground_layer_mut(&mut self) -> &mut SpriteLayer {
        &mut self.foreground
    }

    fn check_bounds(&self, coordinate: Coordinate) -> Result<(), BoardError> {
        if self.size.contains(coordinate) {
            Ok(())
        } else {
            Err(LayerError::OutOfBounds {
                coordinate,
                size: self.size,
            }
            .into())
        }
    }

    fn check_player(&self, player: &Player) -> Result<(), BoardError> {
        if player.board_id() == self.id {
            Ok(())
        } else {
            Err(BoardError::PlayerNotOnBoard {
                player_id: player.id(),
                player_board_id: player.board_id(),
                board_id: self.id,
            })
        }
    }

    fn check_placement(&self, actor_instance: &ActorInstance) -> Result<(), BoardError> {
        let actor_instance_id = actor_instance.id();
        if actor_instance.board_id() != self.id {
            return Err(BoardError::WrongBoard {
                actor_instance_id,
                owner: actor_instance.board_id(),
                board_id: self.id,
            });
        }
        if self.locations.contains_key(&actor_instance_id) {
            return Err(BoardError::DuplicateActorInstance { actor_instance_id });
        }

        let coordinate = actor_instance.coordinate();
        if self.actor_instances.is_occupied(coordinate)? {
            return Err(BoardError::Occupied { coordinate });
        }
        if self.foreground.is_occupied(coordinate)? {
            return Err(BoardError::ForegroundBlocked { coordinate });
        }
        Ok(())
    }

    fn insert_actor_instance(&mut self, actor_instance: ActorInstance) -> Result<(), BoardError> {
        let actor_instance_id = actor_instance.id();
        let coordinate = actor_instance.coordinate();
        let _ = self.actor_instances.set(coordinate, Some(actor_instance))?;
        let _ = self.locations.insert(actor_instance_id, coordinate);
        Ok(())
    }

    /// Resolves the indexed coordinate of an actor instance and verifies that
    /// the layer slot and the instance itself agree with it.
    fn locate(&self, actor_instance_id: ActorInstanceId) -> Result<Coordinate, BoardError> {
        let coordinate = *self
            .locations
            .get(&actor_instance_id)
            .ok_or(BoardError::UnknownActorInstance { actor_instance_id })?;
        match self.actor_instances.get(coordinate)? {
            Some(actor)
                if actor.id() == actor_instance_id && actor.coordinate() == coordinate =>
            {
                Ok(coordinate)
            }
            _ => Err(BoardError::Desynchronized {
                actor_instance_id,
                coordinate,
            }),
        }
    }

    fn dispatch_to_actor_instance<E: WorldEvent>(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        actor_instance_id: ActorInstanceId,
        event: &E,
    ) -> EventResult {
        let snapshot = self
            .actor_instance(actor_instance_id)
            .map_or_else(HandlerSnapshot::empty, ActorInstance::snapshot::<E>);
        self.dispatch(player, roster, &snapshot, event)
    }

    fn dispatch<E: WorldEvent>(
        &mut self,
        player: &mut Player,
        roster: &mut Roster,
        snapshot: &HandlerSnapshot<E>,
        event: &E,
    ) -> EventResult {
        if snapshot.is_empty() {
            return EventResult::Unhandled;
        }
        let mut context = EventContext::new(self, player, roster);
        snapshot.invoke(&mut context, event).into_result()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tile_adventure_core::{ActorId, Character, Color};

    use super::*;
    use crate::layer::Placement;

    const BOARD: BoardId = BoardId::from_u128(1);
    const GOBLIN: ActorInstanceId = ActorInstanceId::from_u128(11);
    const RAT: ActorInstanceId = ActorInstanceId::from_u128(12);

    fn wall() -> Character {
        Character::new('#', Color::GRAY, Color::BLACK)
    }

    fn actor(id: ActorInstanceId, coordinate: Coordinate) -> ActorInstance {
        ActorInstance::new(
            id,
            ActorId::from_u128(1),
            BOARD,
            "Goblin",
            coordinate,
            Character::new('g', Color::GREEN, Color::BLACK),
        )
    }

    fn player_at(coordinate: Coordinate) -> Player {
        Player::new(
            PlayerId::from_u128(1),
            BOARD,
            coordinate,
            Character::new('@', Color::WHITE, Color::BLACK),
        )
    }

    /// 3x3 board, foreground at (1,1), goblin at (0,0), player at (2,2).
    fn cellar() -> (Board, Player, Roster) {
        let mut board = Board::new(BOARD, "Cellar", "Damp and dark.", Size::new(3, 3));
        let mut player = player_at(Coordinate::new(2, 2));
        let mut roster = Roster::default();
        let centre = Coordinate::new(1, 1);
        let _ = board
            .set_foreground_sprite(&player, centre, Some(Sprite::new(centre, wall())))
            .expect("free cell");
        let _ = board
            .add_actor_instance(&mut player, &mut roster, actor(GOBLIN, Coordinate::new(0, 0)))
            .expect("free cell");
        (board, player, roster)
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn log_kind<E: WorldEvent>(handlers: &mut EventHandlerCollection, log: &Log) {
        let log = Arc::clone(log);
        let _ = handlers.register::<E, _>("log", move |_, event: &E| {
            log.lock().expect("log lock").push(format!("{event:?}"));
            Ok(EventResult::Completed)
        });
    }

    fn logged(log: &Log) -> Vec<String> {
        log.lock().expect("log lock").clone()
    }

    #[test]
    fn move_onto_foreground_is_blocked_and_changes_nothing() {
        let (mut board, mut player, mut roster) = cellar();

        let outcome = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(1, 1))
            .expect("valid request");

        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                obstruction: Obstruction::Foreground,
                result: EventResult::Unhandled,
            }
        );
        assert!(!outcome.succeeded());
        let goblin = board.actor_instance(GOBLIN).expect("still placed");
        assert_eq!(goblin.coordinate(), Coordinate::new(0, 0));
    }

    #[test]
    fn move_onto_free_cell_vacates_source() {
        let (mut board, mut player, mut roster) = cellar();
        let destination = Coordinate::new(0, 1);

        let outcome = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, destination)
            .expect("valid request");

        assert!(matches!(outcome, MoveOutcome::Moved { to, .. } if to == destination));
        assert!(board
            .actor_instance_at(Coordinate::new(0, 0))
            .expect("in bounds")
            .is_none());
        let goblin = board.actor_instance(GOBLIN).expect("still placed");
        assert_eq!(goblin.coordinate(), destination);
    }

    #[test]
    fn move_onto_player_notifies_mover() {
        let (mut board, mut player, mut roster) = cellar();
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<PlayerTouchedActorInstanceEvent>(&mut handlers, &log);
        let _ = board
            .actor_instance_mut(GOBLIN)
            .expect("placed")
            .set_event_handlers(Some(handlers));
        for step in [Coordinate::new(0, 2), Coordinate::new(1, 2)] {
            let _ = board
                .try_move_actor_instance(&mut player, &mut roster, GOBLIN, step)
                .expect("valid request");
        }

        let outcome = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(2, 2))
            .expect("valid request");

        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                obstruction: Obstruction::Player,
                result: EventResult::Completed,
            }
        );
        assert_eq!(logged(&log).len(), 1);
        assert_eq!(player.coordinate(), Coordinate::new(2, 2));
        let goblin = board.actor_instance(GOBLIN).expect("still placed");
        assert_eq!(goblin.coordinate(), Coordinate::new(1, 2));
    }

    #[test]
    fn move_onto_actor_notifies_target_only() {
        let (mut board, mut player, mut roster) = cellar();
        let target_log = Log::default();
        let mut target_handlers = EventHandlerCollection::new();
        log_kind::<ActorInstanceTouchedActorInstanceEvent>(&mut target_handlers, &target_log);
        let rat = actor(RAT, Coordinate::new(1, 0)).with_event_handlers(target_handlers);
        let _ = board.add_actor_instance(&mut player, &mut roster, rat).expect("free cell");
        let mover_log = Log::default();
        let mut mover_handlers = EventHandlerCollection::new();
        log_kind::<ActorInstanceTouchedActorInstanceEvent>(&mut mover_handlers, &mover_log);
        let _ = board
            .actor_instance_mut(GOBLIN)
            .expect("placed")
            .set_event_handlers(Some(mover_handlers));

        let outcome = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(1, 0))
            .expect("valid request");

        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                obstruction: Obstruction::ActorInstance(RAT),
                result: EventResult::Completed,
            }
        );
        assert_eq!(logged(&target_log).len(), 1);
        assert!(logged(&mover_log).is_empty());
    }

    #[test]
    fn self_move_is_stationary_without_events() {
        let (mut board, mut player, mut roster) = cellar();
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<ActorInstanceMovedEvent>(&mut handlers, &log);
        log_kind::<ActorInstanceTouchedActorInstanceEvent>(&mut handlers, &log);
        let _ = board
            .actor_instance_mut(GOBLIN)
            .expect("placed")
            .set_event_handlers(Some(handlers));

        let outcome = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(0, 0))
            .expect("valid request");

        assert_eq!(outcome, MoveOutcome::Stationary);
        assert!(outcome.succeeded());
        assert!(logged(&log).is_empty());
    }

    #[test]
    fn desynchronised_actor_cannot_move() {
        let (mut board, mut player, mut roster) = cellar();
        board
            .actor_instance_mut(GOBLIN)
            .expect("placed")
            .set_coordinate(Coordinate::new(2, 0), Placement::issue());

        let error = board
            .try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(0, 1))
            .expect_err("desynchronised");

        assert_eq!(
            error,
            BoardError::Desynchronized {
                actor_instance_id: GOBLIN,
                coordinate: Coordinate::new(0, 0),
            }
        );
        assert!(board
            .actor_instance_at(Coordinate::new(0, 1))
            .expect("in bounds")
            .is_none());
    }

    #[test]
    fn unknown_actor_and_out_of_bounds_are_errors() {
        let (mut board, mut player, mut roster) = cellar();

        assert_eq!(
            board.try_move_actor_instance(&mut player, &mut roster, RAT, Coordinate::new(0, 1)),
            Err(BoardError::UnknownActorInstance {
                actor_instance_id: RAT
            })
        );
        assert!(matches!(
            board.try_move_actor_instance(&mut player, &mut roster, GOBLIN, Coordinate::new(-1, 0)),
            Err(BoardError::Layer(LayerError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn invalid_placements_are_rejected() {
        let (mut board, mut player, mut roster) = cellar();
        let foreign = ActorInstance::new(
            RAT,
            ActorId::from_u128(1),
            BoardId::from_u128(99),
            "Rat",
            Coordinate::new(2, 0),
            wall(),
        );

        assert!(matches!(
            board.add_actor_instance(&mut player, &mut roster, foreign),
            Err(BoardError::WrongBoard { .. })
        ));
        let twin = actor(GOBLIN, Coordinate::new(2, 0));
        assert_eq!(
            board.add_actor_instance(&mut player, &mut roster, twin),
            Err(BoardError::DuplicateActorInstance {
                actor_instance_id: GOBLIN
            })
        );
        assert_eq!(
            board.add_actor_instance(&mut player, &mut roster, actor(RAT, Coordinate::new(0, 0))),
            Err(BoardError::Occupied {
                coordinate: Coordinate::new(0, 0)
            })
        );
        assert_eq!(
            board.add_actor_instance(&mut player, &mut roster, actor(RAT, Coordinate::new(1, 1))),
            Err(BoardError::ForegroundBlocked {
                coordinate: Coordinate::new(1, 1)
            })
        );
        assert_eq!(
            board.add_actor_instance(&mut player, &mut roster, actor(RAT, Coordinate::new(2, 2))),
            Err(BoardError::PlayerOccupied {
                coordinate: Coordinate::new(2, 2)
            })
        );
        assert!(roster.claim(RAT, BoardId::from_u128(99)));
        assert_eq!(
            board.add_actor_instance(&mut player, &mut roster, actor(RAT, Coordinate::new(2, 0))),
            Err(BoardError::DuplicateActorInstance {
                actor_instance_id: RAT
            })
        );
        assert!(board.actor_instance(RAT).is_none());
    }

    #[test]
    fn add_and_remove_fire_lifecycle_events() {
        let (mut board, mut player, mut roster) = cellar();
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<ActorInstanceCreatedEvent>(&mut handlers, &log);
        log_kind::<ActorInstanceDestroyedEvent>(&mut handlers, &log);
        let rat = actor(RAT, Coordinate::new(2, 0)).with_event_handlers(handlers);

        let created = board
            .add_actor_instance(&mut player, &mut roster, rat)
            .expect("free cell");
        assert_eq!(roster.owner(RAT), Some(BOARD));
        let (removed, destroyed) = board
            .remove_actor_instance(&mut player, &mut roster, RAT)
            .expect("placed");

        assert_eq!(created, EventResult::Completed);
        assert_eq!(destroyed, EventResult::Completed);
        assert_eq!(removed.id(), RAT);
        assert_eq!(roster.owner(RAT), None);
        assert_eq!(logged(&log).len(), 2);
        assert!(board
            .actor_instance_at(Coordinate::new(2, 0))
            .expect("in bounds")
            .is_none());
        assert!(board.actor_instance(RAT).is_none());
    }

    #[test]
    fn player_walking_into_actor_touches_it() {
        let (mut board, mut player, mut roster) = cellar();
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<PlayerTouchedActorInstanceEvent>(&mut handlers, &log);
        let rat = actor(RAT, Coordinate::new(2, 1)).with_event_handlers(handlers);
        let _ = board.add_actor_instance(&mut player, &mut roster, rat).expect("free cell");

        let outcome = board
            .try_move_player(&mut player, &mut roster, Coordinate::new(2, 1))
            .expect("valid request");

        assert_eq!(
            outcome,
            MoveOutcome::Blocked {
                obstruction: Obstruction::ActorInstance(RAT),
                result: EventResult::Completed,
            }
        );
        assert_eq!(player.coordinate(), Coordinate::new(2, 2));
        assert_eq!(logged(&log).len(), 1);
    }

    #[test]
    fn player_move_notifies_player_handlers() {
        let (mut board, player, mut roster) = cellar();
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<PlayerMovedEvent>(&mut handlers, &log);
        let mut player = player.with_event_handlers(handlers);

        let outcome = board
            .try_move_player(&mut player, &mut roster, Coordinate::new(1, 2))
            .expect("valid request");

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: Coordinate::new(2, 2),
                to: Coordinate::new(1, 2),
                result: EventResult::Completed,
            }
        );
        assert_eq!(player.coordinate(), Coordinate::new(1, 2));
        assert_eq!(logged(&log).len(), 1);
    }

    #[test]
    fn foreground_cannot_cover_occupied_cells() {
        let (mut board, player, _) = cellar();
        let at = |x, y| Some(Sprite::new(Coordinate::new(x, y), wall()));

        assert_eq!(
            board.set_foreground_sprite(&player, Coordinate::new(0, 0), at(0, 0)),
            Err(BoardError::Occupied {
                coordinate: Coordinate::new(0, 0)
            })
        );
        assert_eq!(
            board.set_foreground_sprite(&player, Coordinate::new(2, 2), at(2, 2)),
            Err(BoardError::PlayerOccupied {
                coordinate: Coordinate::new(2, 2)
            })
        );
        assert!(board
            .set_foreground_sprite(&player, Coordinate::new(1, 1), None)
            .expect("in bounds")
            .is_some());
        assert!(board.is_blocked(&player, Coordinate::new(0, 0)).expect("in bounds"));
        assert!(!board.is_blocked(&player, Coordinate::new(1, 1)).expect("in bounds"));
    }

    #[test]
    fn tick_dispatches_one_event_per_interval() {
        let log = Log::default();
        let mut handlers = EventHandlerCollection::new();
        log_kind::<TimerElapsedEvent>(&mut handlers, &log);
        let timer = Timer::new(TimerId::from_u128(5), "drip", Duration::from_millis(100))
            .running()
            .with_event_handlers(handlers);
        let mut board =
            Board::new(BOARD, "Cellar", "", Size::new(2, 2)).with_timers(vec![timer]);
        let mut player = player_at(Coordinate::new(0, 0));
        let mut roster = Roster::default();

        assert_eq!(board.tick(&mut player, &mut roster, Duration::from_millis(350), 16), 3);
        assert_eq!(logged(&log).len(), 3);
        board.timer_mut(TimerId::from_u128(5)).expect("declared").stop();
        assert_eq!(board.tick(&mut player, &mut roster, Duration::from_secs(1), 16), 0);
    }
}
