#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the tile adventure engine.
//!
//! A [`World`] owns every [`Board`] and the single [`Player`]. Boards enforce
//! the movement rules of their three layers; the world adds the operations that
//! span boards, namely exits and timer ticks. Game content reacts to changes
//! through the handler collections described in [`events`].

pub mod actor;
pub mod board;
pub mod events;
pub mod layer;
pub mod persist;
pub mod player;
pub mod timer;

use std::{collections::BTreeMap, num::NonZeroU32, time::Duration};

use thiserror::Error;
use tile_adventure_core::{
    ActorInstanceId, BoardId, Coordinate, Direction, EventResult, PlayerEnteredBoardEvent,
    PlayerExitedBoardEvent,
};
use tracing::debug;

use actor::Roster;

pub use actor::ActorInstance;
pub use board::{Board, BoardError, BoardExit, MoveOutcome, Obstruction};
pub use events::{
    Dispatch, EventContext, EventHandler, EventHandlerCollection, FaultCause, HandlerCatalog,
    HandlerFault, HandlerId, HandlerSnapshot,
};
pub use layer::{LayerError, Placement, Sprite, SpriteLayer, Tile, TileLayer};
pub use persist::LoadError;
pub use player::Player;
pub use timer::{Timer, TimerState};

const DEFAULT_MAX_TIMER_FIRINGS_PER_TICK: NonZeroU32 = match NonZeroU32::new(16) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

/// Tunable parameters of a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    max_timer_firings_per_tick: NonZeroU32,
}

impl Config {
    /// Creates a configuration with an explicit catch-up limit for timers.
    #[must_use]
    pub const fn new(max_timer_firings_per_tick: NonZeroU32) -> Self {
        Self {
            max_timer_firings_per_tick,
        }
    }

    /// Maximum number of times one timer fires during a single tick.
    #[must_use]
    pub const fn max_timer_firings_per_tick(&self) -> NonZeroU32 {
        self.max_timer_firings_per_tick
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TIMER_FIRINGS_PER_TICK)
    }
}

/// Reasons a world operation may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// A board operation was rejected.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// No board with the identifier exists.
    #[error("board {board_id} does not exist")]
    UnknownBoard {
        /// Identifier that was looked up.
        board_id: BoardId,
    },
    /// Two boards share an identifier.
    #[error("board {board_id} is declared more than once")]
    DuplicateBoard {
        /// Shared identifier.
        board_id: BoardId,
    },
    /// No board holds the actor instance.
    #[error("actor instance {actor_instance_id} is not placed on any board")]
    UnknownActorInstance {
        /// Identifier that was looked up.
        actor_instance_id: ActorInstanceId,
    },
    /// Two boards hold actor instances with the same identifier.
    #[error("actor instance {actor_instance_id} is placed more than once")]
    DuplicateActorInstance {
        /// Shared identifier.
        actor_instance_id: ActorInstanceId,
    },
    /// An exit leads to a missing board or outside its destination.
    #[error("exit at {coordinate} on board {board_id} leads outside board {destination_board_id}")]
    InvalidExit {
        /// Board declaring the exit.
        board_id: BoardId,
        /// Coordinate the exit is taken from.
        coordinate: Coordinate,
        /// Board the exit leads to.
        destination_board_id: BoardId,
        /// Arrival coordinate.
        destination_coordinate: Coordinate,
    },
    /// The player stands outside its board or on a blocked coordinate.
    #[error("player cannot stand at {coordinate} on board {board_id}")]
    InvalidPlayerPlacement {
        /// Board the player claims to stand on.
        board_id: BoardId,
        /// Coordinate the player claims to occupy.
        coordinate: Coordinate,
    },
}

/// Represents the authoritative tile adventure world state.
#[derive(Debug)]
pub struct World {
    boards: BTreeMap<BoardId, Board>,
    player: Player,
    roster: Roster,
    config: Config,
}

impl World {
    /// Assembles a world, validating boards, exits and the player placement.
    pub fn new(boards: Vec<Board>, player: Player) -> Result<Self, WorldError> {
        let mut indexed = BTreeMap::new();
        let mut roster = Roster::default();
        for board in boards {
            let board_id = board.id();
            for actor_instance in board.actor_instance_layer().iter() {
                if !roster.claim(actor_instance.id(), board_id) {
                    return Err(WorldError::DuplicateActorInstance {
                        actor_instance_id: actor_instance.id(),
                    });
                }
            }
            if indexed.insert(board_id, board).is_some() {
                return Err(WorldError::DuplicateBoard { board_id });
            }
        }

        for board in indexed.values() {
            for exit in board.exits() {
                let leads_inside = indexed
                    .get(&exit.destination_board_id())
                    .is_some_and(|destination| {
                        destination.size().contains(exit.destination_coordinate())
                    });
                if !leads_inside {
                    return Err(WorldError::InvalidExit {
                        board_id: board.id(),
                        coordinate: exit.coordinate(),
                        destination_board_id: exit.destination_board_id(),
                        destination_coordinate: exit.destination_coordinate(),
                    });
                }
            }
        }

        let board_id = player.board_id();
        let coordinate = player.coordinate();
        let board = indexed
            .get(&board_id)
            .ok_or(WorldError::UnknownBoard { board_id })?;
        if !board.size().contains(coordinate) || arrival_obstruction(board, coordinate)?.is_some() {
            return Err(WorldError::InvalidPlayerPlacement {
                board_id,
                coordinate,
            });
        }

        Ok(Self {
            boards: indexed,
            player,
            roster,
            config: Config::default(),
        })
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Mutable access to a board's layers, timers and handlers.
    pub fn board_mut(&mut self, board_id: BoardId) -> Option<&mut Board> {
        self.boards.get_mut(&board_id)
    }

    /// Mutable access to the player's appearance and handlers.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Opens an [`EventContext`] over a board and the player, letting a host
    /// drive board operations the way handlers do.
    pub fn context(&mut self, board_id: BoardId) -> Result<EventContext<'_>, WorldError> {
        let board = self
            .boards
            .get_mut(&board_id)
            .ok_or(WorldError::UnknownBoard { board_id })?;
        Ok(EventContext::new(board, &mut self.player, &mut self.roster))
    }

    /// Moves the player one step, following an exit when stepping off the
    /// edge of the current board.
    pub fn try_move_player(&mut self, direction: Direction) -> Result<MoveOutcome, WorldError> {
        let board_id = self.player.board_id();
        let from = self.player.coordinate();
        let destination = from.step(direction);
        let board = self
            .boards
            .get_mut(&board_id)
            .ok_or(WorldError::UnknownBoard { board_id })?;

        if board.size().contains(destination) {
            return Ok(board.try_move_player(&mut self.player, &mut self.roster, destination)?);
        }
        match board.exit_at(from, direction).copied() {
            Some(exit) => self.transfer_player(exit),
            None => Ok(MoveOutcome::Blocked {
                obstruction: Obstruction::Edge,
                result: EventResult::Unhandled,
            }),
        }
    }

    /// Moves the player to a coordinate of its current board.
    pub fn try_move_player_to(
        &mut self,
        destination: Coordinate,
    ) -> Result<MoveOutcome, WorldError> {
        let board_id = self.player.board_id();
        let board = self
            .boards
            .get_mut(&board_id)
            .ok_or(WorldError::UnknownBoard { board_id })?;
        Ok(board.try_move_player(&mut self.player, &mut self.roster, destination)?)
    }

    /// Writes or clears a foreground sprite on a board.
    ///
    /// A sprite may not be placed beneath an actor instance or the player.
    pub fn set_foreground_sprite(
        &mut self,
        board_id: BoardId,
        coordinate: Coordinate,
        sprite: Option<Sprite>,
    ) -> Result<Option<Sprite>, WorldError> {
        let board = board_entry(&mut self.boards, board_id)?;
        Ok(board.set_foreground_sprite(&self.player, coordinate, sprite)?)
    }

    /// Places an actor instance on the board it names as owner.
    pub fn add_actor_instance(
        &mut self,
        actor_instance: ActorInstance,
    ) -> Result<EventResult, WorldError> {
        let actor_instance_id = actor_instance.id();
        if self.roster.owner(actor_instance_id).is_some() {
            return Err(WorldError::DuplicateActorInstance { actor_instance_id });
        }
        let board_id = actor_instance.board_id();
        let board = self
            .boards
            .get_mut(&board_id)
            .ok_or(WorldError::UnknownBoard { board_id })?;
        Ok(board.add_actor_instance(&mut self.player, &mut self.roster, actor_instance)?)
    }

    /// Removes an actor instance from whichever board holds it.
    pub fn remove_actor_instance(
        &mut self,
        actor_instance_id: ActorInstanceId,
    ) -> Result<(ActorInstance, EventResult), WorldError> {
        let board_id = self.owner_of(actor_instance_id)?;
        let board = board_entry(&mut self.boards, board_id)?;
        Ok(board.remove_actor_instance(&mut self.player, &mut self.roster, actor_instance_id)?)
    }

    /// Moves an actor instance within the board that holds it.
    pub fn try_move_actor_instance(
        &mut self,
        actor_instance_id: ActorInstanceId,
        destination: Coordinate,
    ) -> Result<MoveOutcome, WorldError> {
        let board_id = self.owner_of(actor_instance_id)?;
        let board = board_entry(&mut self.boards, board_id)?;
        Ok(board.try_move_actor_instance(
            &mut self.player,
            &mut self.roster,
            actor_instance_id,
            destination,
        )?)
    }

    /// Advances every board's timers by `dt`. Returns the number of firings.
    pub fn tick(&mut self, dt: Duration) -> u32 {
        let limit = self.config.max_timer_firings_per_tick.get();
        let mut total = 0_u32;
        for board in self.boards.values_mut() {
            let firings = board.tick(&mut self.player, &mut self.roster, dt, limit);
            total = total.saturating_add(firings);
        }
        total
    }

    fn owner_of(&self, actor_instance_id: ActorInstanceId) -> Result<BoardId, WorldError> {
        self.roster
            .owner(actor_instance_id)
            .ok_or(WorldError::UnknownActorInstance { actor_instance_id })
    }

    /// Carries the player through an exit.
    ///
    /// The source board may veto the departure. The arrival coordinate is
    /// checked before and after the departure handlers run, because they may
    /// rearrange the destination.
    fn transfer_player(&mut self, exit: BoardExit) -> Result<MoveOutcome, WorldError> {
        let source_id = self.player.board_id();
        let destination_id = exit.destination_board_id();
        let arrival = exit.destination_coordinate();

        let destination = board_entry(&mut self.boards, destination_id)?;
        match arrival_obstruction(destination, arrival)? {
            Some(Obstruction::ActorInstance(target)) => {
                let result = destination.player_touch(&mut self.player, &mut self.roster, target);
                return Ok(MoveOutcome::Blocked {
                    obstruction: Obstruction::ActorInstance(target),
                    result,
                });
            }
            Some(obstruction) => {
                return Ok(MoveOutcome::Blocked {
                    obstruction,
                    result: EventResult::Unhandled,
                });
            }
            None => {}
        }

        let exited = PlayerExitedBoardEvent {
            board_id: source_id,
            destination_board_id: destination_id,
            player_id: self.player.id(),
            coordinate: exit.coordinate(),
        };
        let departure = board_entry(&mut self.boards, source_id)?
            .dispatch_board_event(&mut self.player, &mut self.roster, &exited);
        if departure.is_canceled() {
            debug!(board = %source_id, "board exit vetoed");
            return Ok(MoveOutcome::Blocked {
                obstruction: Obstruction::Vetoed,
                result: departure,
            });
        }
        let destination = board_entry(&mut self.boards, destination_id)?;
        if let Some(obstruction) = arrival_obstruction(destination, arrival)? {
            return Ok(MoveOutcome::Blocked {
                obstruction,
                result: departure,
            });
        }

        self.player.relocate(destination_id, arrival);
        debug!(
            from = %source_id,
            to = %destination_id,
            coordinate = %arrival,
            "player changed board"
        );

        let entered = PlayerEnteredBoardEvent {
            board_id: destination_id,
            previous_board_id: source_id,
            player_id: self.player.id(),
            coordinate: arrival,
        };
        let result = board_entry(&mut self.boards, destination_id)?
            .dispatch_board_event(&mut self.player, &mut self.roster, &entered);
        Ok(MoveOutcome::Transferred {
            board_id: destination_id,
            coordinate: arrival,
            result,
        })
    }
}

fn board_entry(
    boards: &mut BTreeMap<BoardId, Board>,
    board_id: BoardId,
) -> Result<&mut Board, WorldError> {
    boards
        .get_mut(&board_id)
        .ok_or(WorldError::UnknownBoard { board_id })
}

/// Reports what, if anything, keeps the player from standing at `coordinate`.
fn arrival_obstruction(
    board: &Board,
    coordinate: Coordinate,
) -> Result<Option<Obstruction>, BoardError> {
    if board.foreground_layer().is_occupied(coordinate)? {
        return Ok(Some(Obstruction::Foreground));
    }
    Ok(board
        .actor_instance_at(coordinate)?
        .map(|actor_instance| Obstruction::ActorInstance(actor_instance.id())))
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tile_adventure_core::{ActorInstanceId, BoardId};

    use super::{ActorInstance, Board, Config, Player, World};

    /// Looks up a board by identifier.
    #[must_use]
    pub fn board(world: &World, board_id: BoardId) -> Option<&Board> {
        world.boards.get(&board_id)
    }

    /// Iterates every board in identifier order.
    pub fn boards(world: &World) -> impl Iterator<Item = &Board> {
        world.boards.values()
    }

    /// Board the player currently stands on.
    #[must_use]
    pub fn current_board(world: &World) -> Option<&Board> {
        world.boards.get(&world.player.board_id())
    }

    /// Provides read-only access to the player.
    #[must_use]
    pub fn player(world: &World) -> &Player {
        &world.player
    }

    /// Looks up an actor instance on any board.
    #[must_use]
    pub fn actor_instance(
        world: &World,
        actor_instance_id: ActorInstanceId,
    ) -> Option<&ActorInstance> {
        let board_id = world.roster.owner(actor_instance_id)?;
        world.boards.get(&board_id)?.actor_instance(actor_instance_id)
    }

    /// Configuration the world runs with.
    #[must_use]
    pub fn config(world: &World) -> Config {
        world.config
    }
}
