//! The single player-controlled entity of a world.

use tile_adventure_core::{BoardId, Character, Coordinate, PlayerId, WorldEvent};

use crate::events::{EventHandlerCollection, HandlerSnapshot};

/// Player bound to exactly one board at a time.
///
/// Location can only change through board and world operations, which keep
/// the player inside its board and off blocked coordinates.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    board_id: BoardId,
    coordinate: Coordinate,
    character: Character,
    handlers: Option<EventHandlerCollection>,
}

impl Player {
    /// Creates a player standing on the provided board.
    #[must_use]
    pub fn new(
        id: PlayerId,
        board_id: BoardId,
        coordinate: Coordinate,
        character: Character,
    ) -> Self {
        Self {
            id,
            board_id,
            coordinate,
            character,
            handlers: None,
        }
    }

    /// Attaches a handler collection.
    #[must_use]
    pub fn with_event_handlers(mut self, handlers: EventHandlerCollection) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Unique identifier of the player.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Board the player currently stands on.
    #[must_use]
    pub const fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Coordinate the player occupies.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Appearance of the player.
    #[must_use]
    pub const fn character(&self) -> Character {
        self.character
    }

    /// Replaces the appearance of the player.
    pub fn set_character(&mut self, character: Character) {
        self.character = character;
    }

    /// Handlers attached to the player, if any.
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

    /// Reports whether the player stands on the board at the coordinate.
    #[must_use]
    pub fn occupies(&self, board_id: BoardId, coordinate: Coordinate) -> bool {
        self.board_id == board_id && self.coordinate == coordinate
    }

    pub(crate) fn set_coordinate(&mut self, coordinate: Coordinate) {
        self.coordinate = coordinate;
    }

    pub(crate) fn relocate(&mut self, board_id: BoardId, coordinate: Coordinate) {
        self.board_id = board_id;
        self.coordinate = coordinate;
    }

    pub(crate) fn snapshot<E: WorldEvent>(&self) -> HandlerSnapshot<E> {
        self.handlers
            .as_ref()
            .map_or_else(HandlerSnapshot::empty, EventHandlerCollection::snapshot::<E>)
    }
}
