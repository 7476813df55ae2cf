//! Serializable records describing boards, timers and the player.
//!
//! Records carry plain data only. Handlers are stored by the name they were
//! registered under and resolved through a host-provided [`HandlerCatalog`]
//! when the records are loaded back. Loading re-validates every invariant the
//! runtime types rely on, so a record set that loads successfully describes a
//! consistent world.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_adventure_core::{
    ActorId, ActorInstanceId, BoardId, Character, Coordinate, Direction, EventKind, PlayerId,
    Size, TimerId,
};

use crate::{
    actor::ActorInstance,
    board::{Board, BoardError, BoardExit},
    events::{EventHandlerCollection, HandlerCatalog},
    layer::{Sprite, SpriteLayer, Tile},
    player::Player,
    query,
    timer::{Timer, TimerState},
    World, WorldError,
};

/// Largest number of cells a loaded board may cover.
pub const MAX_BOARD_AREA: usize = 1 << 20;

/// Handler registration persisted by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRecord {
    /// Event kind the handler was registered for.
    pub kind: EventKind,
    /// Catalog name of the handler.
    pub name: String,
}

/// Persisted sprite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteRecord {
    /// Slot the sprite occupies.
    pub coordinate: Coordinate,
    /// Appearance of the sprite.
    pub character: Character,
}

/// Persisted actor instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorInstanceRecord {
    /// Unique identifier.
    pub id: ActorInstanceId,
    /// Template identifier.
    pub actor_id: ActorId,
    /// Owning board.
    pub board_id: BoardId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Slot the instance occupies.
    pub coordinate: Coordinate,
    /// Appearance.
    pub character: Character,
    /// Handler registrations; `None` when no collection is attached.
    pub handlers: Option<Vec<HandlerRecord>>,
}

/// Persisted board exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRecord {
    /// Edge coordinate the exit is taken from.
    pub coordinate: Coordinate,
    /// Direction stepped to take the exit.
    pub direction: Direction,
    /// Board the exit leads to.
    pub destination_board_id: BoardId,
    /// Arrival coordinate on the destination board.
    pub destination_coordinate: Coordinate,
}

/// Persisted timer, including its progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Unique identifier.
    pub id: TimerId,
    /// Display name.
    pub name: String,
    /// Interval between firings.
    pub interval: Duration,
    /// Running state.
    pub state: TimerState,
    /// Time accumulated towards the next firing.
    pub elapsed: Duration,
    /// Handler registrations; `None` when no collection is attached.
    pub handlers: Option<Vec<HandlerRecord>>,
}

/// Persisted board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    /// Unique identifier.
    pub id: BoardId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Bounds of every layer.
    pub size: Size,
    /// Background sprites in row-major order.
    pub background: Vec<SpriteRecord>,
    /// Foreground sprites in row-major order.
    pub foreground: Vec<SpriteRecord>,
    /// Actor instances in row-major order.
    pub actor_instances: Vec<ActorInstanceRecord>,
    /// Exits in declaration order.
    pub exits: Vec<ExitRecord>,
    /// Timers in declaration order.
    pub timers: Vec<TimerRecord>,
    /// Board-scoped handler registrations.
    pub handlers: Vec<HandlerRecord>,
}

/// Persisted player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Unique identifier.
    pub id: PlayerId,
    /// Board the player stands on.
    pub board_id: BoardId,
    /// Coordinate the player occupies.
    pub coordinate: Coordinate,
    /// Appearance.
    pub character: Character,
    /// Handler registrations; `None` when no collection is attached.
    pub handlers: Option<Vec<HandlerRecord>>,
}

/// Reasons a record set may fail to load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No catalog entry carries the handler name.
    #[error("no handler named `{name}` is available")]
    UnknownHandler {
        /// Name that failed to resolve.
        name: String,
    },
    /// The catalog entry handles a different event kind than recorded.
    #[error("handler `{name}` handles {available}, but the record expects {recorded}")]
    HandlerKindMismatch {
        /// Handler name.
        name: String,
        /// Kind stored in the record.
        recorded: EventKind,
        /// Kind the catalog entry handles.
        available: EventKind,
    },
    /// Two sprites of one layer share a coordinate.
    #[error("board {board_id} has two {layer} sprites at {coordinate}")]
    DuplicateSprite {
        /// Board being loaded.
        board_id: BoardId,
        /// Layer holding the duplicate.
        layer: &'static str,
        /// Shared coordinate.
        coordinate: Coordinate,
    },
    /// The board covers more cells than a loaded board may allocate.
    #[error("board {board_id} of size {size} exceeds {} cells", MAX_BOARD_AREA)]
    BoardTooLarge {
        /// Board being loaded.
        board_id: BoardId,
        /// Recorded size.
        size: Size,
    },
    /// An exit starts outside its board.
    #[error("board {board_id} declares an exit at {coordinate} outside its bounds")]
    ExitOutOfBounds {
        /// Board being loaded.
        board_id: BoardId,
        /// Exit coordinate.
        coordinate: Coordinate,
    },
    /// Board contents violate a placement rule.
    #[error("board {board_id} is inconsistent")]
    Board {
        /// Board being loaded.
        board_id: BoardId,
        /// Violated rule.
        #[source]
        source: BoardError,
    },
    /// The assembled boards and player do not form a valid world.
    #[error(transparent)]
    World(#[from] WorldError),
}

impl EventHandlerCollection {
    /// Describes the registrations by kind and name.
    #[must_use]
    pub fn to_records(&self) -> Vec<HandlerRecord> {
        self.registrations()
            .map(|(kind, _, name)| HandlerRecord {
                kind,
                name: name.to_owned(),
            })
            .collect()
    }

    /// Rebuilds a collection, resolving every name through the catalog.
    pub fn from_records(
        records: &[HandlerRecord],
        catalog: &HandlerCatalog,
    ) -> Result<Self, LoadError> {
        let mut collection = Self::new();
        for record in records {
            let (available, handler) =
                catalog
                    .resolve(&record.name)
                    .ok_or_else(|| LoadError::UnknownHandler {
                        name: record.name.clone(),
                    })?;
            if available != record.kind {
                return Err(LoadError::HandlerKindMismatch {
                    name: record.name.clone(),
                    recorded: record.kind,
                    available,
                });
            }
            let _ = collection.insert(record.kind, record.name.clone(), handler);
        }
        Ok(collection)
    }
}

fn optional_records(handlers: Option<&EventHandlerCollection>) -> Option<Vec<HandlerRecord>> {
    handlers.map(EventHandlerCollection::to_records)
}

fn optional_collection(
    records: Option<&[HandlerRecord]>,
    catalog: &HandlerCatalog,
) -> Result<Option<EventHandlerCollection>, LoadError> {
    records
        .map(|records| EventHandlerCollection::from_records(records, catalog))
        .transpose()
}

impl ActorInstance {
    /// Captures the instance as a record.
    #[must_use]
    pub fn to_record(&self) -> ActorInstanceRecord {
        ActorInstanceRecord {
            id: self.id(),
            actor_id: self.actor_id(),
            board_id: self.board_id(),
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            coordinate: self.coordinate(),
            character: self.character(),
            handlers: optional_records(self.event_handlers()),
        }
    }

    /// Rebuilds an unplaced instance from a record.
    pub fn from_record(
        record: &ActorInstanceRecord,
        catalog: &HandlerCatalog,
    ) -> Result<Self, LoadError> {
        let mut actor_instance = Self::new(
            record.id,
            record.actor_id,
            record.board_id,
            record.name.clone(),
            record.coordinate,
            record.character,
        )
        .with_description(record.description.clone());
        let handlers = optional_collection(record.handlers.as_deref(), catalog)?;
        let _ = actor_instance.set_event_handlers(handlers);
        Ok(actor_instance)
    }
}

impl Timer {
    /// Captures the timer and its progress as a record.
    #[must_use]
    pub fn to_record(&self) -> TimerRecord {
        TimerRecord {
            id: self.id(),
            name: self.name().to_owned(),
            interval: self.interval(),
            state: self.state(),
            elapsed: self.elapsed(),
            handlers: optional_records(self.event_handlers()),
        }
    }

    /// Rebuilds a timer, restoring its progress.
    pub fn from_record(record: &TimerRecord, catalog: &HandlerCatalog) -> Result<Self, LoadError> {
        let mut timer = Self::new(record.id, record.name.clone(), record.interval);
        timer.restore(record.state, record.elapsed);
        let handlers = optional_collection(record.handlers.as_deref(), catalog)?;
        let _ = timer.set_event_handlers(handlers);
        Ok(timer)
    }
}

impl Player {
    /// Captures the player as a record.
    #[must_use]
    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id(),
            board_id: self.board_id(),
            coordinate: self.coordinate(),
            character: self.character(),
            handlers: optional_records(self.event_handlers()),
        }
    }

    /// Rebuilds a player. Placement is validated when the world is assembled.
    pub fn from_record(record: &PlayerRecord, catalog: &HandlerCatalog) -> Result<Self, LoadError> {
        let mut player = Self::new(
            record.id,
            record.board_id,
            record.coordinate,
            record.character,
        );
        let handlers = optional_collection(record.handlers.as_deref(), catalog)?;
        let _ = player.set_event_handlers(handlers);
        Ok(player)
    }
}

fn sprite_records(layer: &SpriteLayer) -> Vec<SpriteRecord> {
    layer
        .iter()
        .map(|sprite| SpriteRecord {
            coordinate: sprite.coordinate(),
            character: sprite.character(),
        })
        .collect()
}

fn fill_sprites(
    board_id: BoardId,
    name: &'static str,
    layer: &mut SpriteLayer,
    records: &[SpriteRecord],
) -> Result<(), LoadError> {
    for record in records {
        let sprite = Sprite::new(record.coordinate, record.character);
        let displaced = layer
            .set(record.coordinate, Some(sprite))
            .map_err(|error| LoadError::Board {
                board_id,
                source: error.into(),
            })?;
        if displaced.is_some() {
            return Err(LoadError::DuplicateSprite {
                board_id,
                layer: name,
                coordinate: record.coordinate,
            });
        }
    }
    Ok(())
}

impl Board {
    /// Captures the board, its layers, exits, timers and handlers as a record.
    #[must_use]
    pub fn to_record(&self) -> BoardRecord {
        BoardRecord {
            id: self.id(),
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            size: self.size(),
            background: sprite_records(self.background_layer()),
            foreground: sprite_records(self.foreground_layer()),
            actor_instances: self
                .actor_instance_layer()
                .iter()
                .map(ActorInstance::to_record)
                .collect(),
            exits: self
                .exits()
                .iter()
                .map(|exit| ExitRecord {
                    coordinate: exit.coordinate(),
                    direction: exit.direction(),
                    destination_board_id: exit.destination_board_id(),
                    destination_coordinate: exit.destination_coordinate(),
                })
                .collect(),
            timers: self.timers().iter().map(Timer::to_record).collect(),
            handlers: self.event_handlers().to_records(),
        }
    }

    /// Rebuilds a board without dispatching any event.
    ///
    /// Exits must start inside the board; their destinations are checked when
    /// the world is assembled.
    pub fn from_record(record: &BoardRecord, catalog: &HandlerCatalog) -> Result<Self, LoadError> {
        let board_id = record.id;
        if record.size.area() > MAX_BOARD_AREA {
            return Err(LoadError::BoardTooLarge {
                board_id,
                size: record.size,
            });
        }
        let mut exits = Vec::with_capacity(record.exits.len());
        for exit in &record.exits {
            if !record.size.contains(exit.coordinate) {
                return Err(LoadError::ExitOutOfBounds {
                    board_id,
                    coordinate: exit.coordinate,
                });
            }
            exits.push(BoardExit::new(
                exit.coordinate,
                exit.direction,
                exit.destination_board_id,
                exit.destination_coordinate,
            ));
        }
        let timers = record
            .timers
            .iter()
            .map(|timer| Timer::from_record(timer, catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let handlers = EventHandlerCollection::from_records(&record.handlers, catalog)?;

        let mut board = Self::new(
            board_id,
            record.name.clone(),
            record.description.clone(),
            record.size,
        )
        .with_exits(exits)
        .with_timers(timers)
        .with_event_handlers(handlers);

        fill_sprites(
            board_id,
            "background",
            board.background_layer_mut(),
            &record.background,
        )?;
        fill_sprites(
            board_id,
            "foreground",
            board.foreground_layer_mut(),
            &record.foreground,
        )?;
        for actor_record in &record.actor_instances {
            let actor_instance = ActorInstance::from_record(actor_record, catalog)?;
            board
                .place_actor_instance(actor_instance)
                .map_err(|source| LoadError::Board { board_id, source })?;
        }
        Ok(board)
    }
}

impl World {
    /// Captures every board, in identifier order, and the player.
    #[must_use]
    pub fn to_records(&self) -> (Vec<BoardRecord>, PlayerRecord) {
        let boards = query::boards(self).map(Board::to_record).collect();
        (boards, query::player(self).to_record())
    }

    /// Rebuilds a world from records, validating every board and the player.
    pub fn from_records(
        boards: &[BoardRecord],
        player: &PlayerRecord,
        catalog: &HandlerCatalog,
    ) -> Result<Self, LoadError> {
        let boards = boards
            .iter()
            .map(|record| Board::from_record(record, catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let player = Player::from_record(player, catalog)?;
        Ok(World::new(boards, player)?)
    }
}
