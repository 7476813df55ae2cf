//! Movable entities placed on a board's actor-instance layer.

use std::collections::HashMap;

use tile_adventure_core::{ActorId, ActorInstanceId, BoardId, Character, Coordinate, WorldEvent};

use crate::{
    events::{EventHandlerCollection, HandlerSnapshot},
    layer::{Placement, Tile},
};

/// World-wide index of the board holding each placed actor instance.
#[derive(Debug, Default)]
pub(crate) struct Roster {
    owners: HashMap<ActorInstanceId, BoardId>,
}

impl Roster {
    /// Board holding the actor instance, if it is placed anywhere.
    pub(crate) fn owner(&self, actor_instance_id: ActorInstanceId) -> Option<BoardId> {
        self.owners.get(&actor_instance_id).copied()
    }

    /// Records the owner. Returns `false` when the identifier is already taken.
    pub(crate) fn claim(&mut self, actor_instance_id: ActorInstanceId, board_id: BoardId) -> bool {
        if self.owners.contains_key(&actor_instance_id) {
            return false;
        }
        let _ = self.owners.insert(actor_instance_id, board_id);
        true
    }

    pub(crate) fn release(&mut self, actor_instance_id: ActorInstanceId) {
        let _ = self.owners.remove(&actor_instance_id);
    }
}

/// Placed occurrence of an actor template.
///
/// The owning board keeps the instance's coordinate in lockstep with the slot
/// it occupies; only its layer may rewrite the coordinate.
#[derive(Debug)]
pub struct ActorInstance {
    id: ActorInstanceId,
    actor_id: ActorId,
    board_id: BoardId,
    name: String,
    description: String,
    coordinate: Coordinate,
    character: Character,
    handlers: Option<EventHandlerCollection>,
}

impl ActorInstance {
    /// Creates an unplaced actor instance without handlers.
    #[must_use]
    pub fn new(
        id: ActorInstanceId,
        actor_id: ActorId,
        board_id: BoardId,
        name: impl Into<String>,
        coordinate: Coordinate,
        character: Character,
    ) -> Self {
        Self {
            id,
            actor_id,
            board_id,
            name: name.into(),
            description: String::new(),
            coordinate,
            character,
            handlers: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attaches a handler collection.
    #[must_use]
    pub fn with_event_handlers(mut self, handlers: EventHandlerCollection) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Unique identifier of the instance.
    #[must_use]
    pub const fn id(&self) -> ActorInstanceId {
        self.id
    }

    /// Template the instance was spawned from.
    #[must_use]
    pub const fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    /// Board that owns the instance.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Appearance of the instance.
    #[must_use]
    pub const fn character(&self) -> Character {
        self.character
    }

    /// Replaces the appearance of the instance.
    pub fn set_character(&mut self, character: Character) {
        self.character = character;
    }

    /// Handlers attached to the instance, if any.
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

    pub(crate) fn snapshot<E: WorldEvent>(&self) -> HandlerSnapshot<E> {
        self.handlers
            .as_ref()
            .map_or_else(HandlerSnapshot::empty, EventHandlerCollection::snapshot::<E>)
    }
}

impl Tile for ActorInstance {
    fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    fn set_coordinate(&mut self, coordinate: Coordinate, _: Placement) {
        self.coordinate = coordinate;
    }
}

#[cfg(test)]
mod tests {
    use tile_adventure_core::{Color, EventResult, TimerElapsedEvent};

    use super::*;

    fn goblin() -> ActorInstance {
        ActorInstance::new(
            ActorInstanceId::from_u128(1),
            ActorId::from_u128(10),
            BoardId::from_u128(100),
            "Goblin",
            Coordinate::new(1, 2),
            Character::new('g', Color::GREEN, Color::BLACK),
        )
    }

    #[test]
    fn missing_collection_yields_empty_snapshot() {
        let actor = goblin();
        assert!(actor.event_handlers().is_none());
        assert!(actor.snapshot::<TimerElapsedEvent>().is_empty());
    }

    #[test]
    fn attached_collection_is_snapshotted() {
        let mut handlers = EventHandlerCollection::new();
        let _ =
            handlers.register::<TimerElapsedEvent, _>("growl", |_, _| Ok(EventResult::Completed));
        let mut actor = goblin().with_event_handlers(handlers);

        assert_eq!(actor.snapshot::<TimerElapsedEvent>().len(), 1);
        let detached = actor.set_event_handlers(None);
        assert!(detached.is_some());
        assert!(actor.snapshot::<TimerElapsedEvent>().is_empty());
    }

    #[test]
    fn descriptive_fields_are_mutable() {
        let mut actor = goblin().with_description("Smells of cabbage.");
        actor.set_name("Hobgoblin");
        actor.set_description("Smells worse.");

        assert_eq!(actor.name(), "Hobgoblin");
        assert_eq!(actor.description(), "Smells worse.");
        assert_eq!(actor.coordinate(), Coordinate::new(1, 2));
    }

    #[test]
    fn roster_refuses_a_second_owner() {
        let mut roster = Roster::default();
        let id = ActorInstanceId::from_u128(1);

        assert!(roster.claim(id, BoardId::from_u128(1)));
        assert!(!roster.claim(id, BoardId::from_u128(2)));
        assert_eq!(roster.owner(id), Some(BoardId::from_u128(1)));

        roster.release(id);
        assert_eq!(roster.owner(id), None);
        assert!(roster.claim(id, BoardId::from_u128(2)));
    }
}
