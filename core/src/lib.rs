#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tile adventure engine.
//!
//! This crate defines the value types every other layer speaks: grid
//! [`Coordinate`] and [`Size`] values, entity identifiers, the [`Color`] and
//! [`Character`] appearance types, and the event vocabulary that the world
//! dispatches to game-content handlers. It holds no mutable state of its own.

mod color;
mod event;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use color::Color;
pub use event::{
    ActorInstanceCreatedEvent, ActorInstanceDestroyedEvent, ActorInstanceMovedEvent,
    ActorInstanceTouchedActorInstanceEvent, EventKind, EventResult, PlayerEnteredBoardEvent,
    PlayerExitedBoardEvent, PlayerMovedEvent, PlayerTouchedActorInstanceEvent, TimerElapsedEvent,
    WorldEvent,
};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Wraps an existing UUID.
            #[must_use]
            pub const fn new(value: Uuid) -> Self {
                Self(value)
            }

            /// Builds an identifier from a raw 128-bit value.
            #[must_use]
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// Allocates a fresh random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Retrieves the underlying UUID.
            #[must_use]
            pub const fn get(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

identifier! {
    /// Unique identifier assigned to a board.
    BoardId
}

identifier! {
    /// Identifier of the actor template an actor instance was spawned from.
    ActorId
}

identifier! {
    /// Unique identifier assigned to a placed actor instance.
    ActorInstanceId
}

identifier! {
    /// Unique identifier assigned to the player.
    PlayerId
}

identifier! {
    /// Unique identifier assigned to a board timer.
    TimerId
}

/// Location of a single board tile expressed as column and row.
///
/// Components are signed so that stepping off the edge of a board yields a
/// representable coordinate that simply fails the bounds check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    x: i32,
    y: i32,
}

impl Coordinate {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row of the coordinate.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the neighbouring coordinate in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Computes the Manhattan distance between two coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: Coordinate) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Extent of a board measured in whole tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    width: u32,
    height: u32,
}

impl Size {
    /// Creates a size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of tiles covered by the size.
    #[must_use]
    pub fn area(&self) -> usize {
        let area = u64::from(self.width) * u64::from(self.height);
        usize::try_from(area).unwrap_or(usize::MAX)
    }

    /// Reports whether the coordinate lies within the bounds described by the size.
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        match (u32::try_from(coordinate.x()), u32::try_from(coordinate.y())) {
            (Ok(x), Ok(y)) => x < self.width && y < self.height,
            _ => false,
        }
    }

    /// Iterates every coordinate within the bounds in row-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> {
        let width = i32::try_from(self.width).unwrap_or(i32::MAX);
        let height = i32::try_from(self.height).unwrap_or(i32::MAX);
        (0..height).flat_map(move |y| (0..width).map(move |x| Coordinate::new(x, y)))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Cardinal movement directions available to the player and actor instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Column and row delta of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Glyph plus colors describing how a tile is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    symbol: char,
    foreground: Color,
    background: Color,
}

impl Character {
    /// Creates a new character appearance.
    #[must_use]
    pub const fn new(symbol: char, foreground: Color, background: Color) -> Self {
        Self {
            symbol,
            foreground,
            background,
        }
    }

    /// Glyph drawn for the tile.
    #[must_use]
    pub const fn symbol(&self) -> char {
        self.symbol
    }

    /// Color of the glyph.
    #[must_use]
    pub const fn foreground(&self) -> Color {
        self.foreground
    }

    /// Color filling the tile behind the glyph.
    #[must_use]
    pub const fn background(&self) -> Color {
        self.background
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardId, Character, Color, Coordinate, Direction, EventKind, Size};
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = Coordinate::new(1, 1);
        let destination = Coordinate::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn size_contains_only_in_bounds_coordinates() {
        let size = Size::new(3, 2);
        assert!(size.contains(Coordinate::new(0, 0)));
        assert!(size.contains(Coordinate::new(2, 1)));
        assert!(!size.contains(Coordinate::new(3, 1)));
        assert!(!size.contains(Coordinate::new(2, 2)));
        assert!(!size.contains(Coordinate::new(-1, 0)));
        assert!(!Size::new(0, 0).contains(Coordinate::new(0, 0)));
    }

    #[test]
    fn size_coordinates_are_row_major() {
        let coordinates: Vec<_> = Size::new(2, 2).coordinates().collect();
        assert_eq!(
            coordinates,
            vec![
                Coordinate::new(0, 0),
                Coordinate::new(1, 0),
                Coordinate::new(0, 1),
                Coordinate::new(1, 1),
            ]
        );
        assert_eq!(Size::new(4, 3).area(), 12);
    }

    #[test]
    fn stepping_and_reversing_returns_to_origin() {
        let origin = Coordinate::new(5, 5);
        for direction in Direction::ALL {
            let neighbour = origin.step(direction);
            assert_eq!(origin.manhattan_distance(neighbour), 1);
            assert_eq!(neighbour.step(direction.opposite()), origin);
        }
        assert_eq!(Coordinate::new(0, 0).step(Direction::North), Coordinate::new(0, -1));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn board_id_round_trips_through_bincode() {
        assert_round_trip(&BoardId::from_u128(42));
    }

    #[test]
    fn character_round_trips_through_bincode() {
        let character = Character::new('@', Color::from_bytes(200, 10, 0, 255), Color::BLACK);
        assert_round_trip(&character);
    }

    #[test]
    fn event_kind_round_trips_through_bincode() {
        assert_round_trip(&EventKind::PlayerTouchedActorInstance);
    }

    #[test]
    fn random_identifiers_are_distinct() {
        assert_ne!(BoardId::random(), BoardId::random());
        assert_eq!(BoardId::from_u128(7).get().as_u128(), 7);
    }
}
