//! Dense tile layers that compose a board.

use thiserror::Error;
use tile_adventure_core::{Character, Coordinate, Size};

/// Anything that can occupy a single slot of a [`TileLayer`].
///
/// The layer keeps the tile's own coordinate equal to the slot it occupies.
pub trait Tile {
    /// Coordinate the tile believes it occupies.
    fn coordinate(&self) -> Coordinate;

    /// Overwrites the coordinate the tile believes it occupies.
    ///
    /// Only tile layers can supply the [`Placement`].
    fn set_coordinate(&mut self, coordinate: Coordinate, placement: Placement);
}

/// Permission to rewrite a tile's coordinate, issued by tile layers.
///
/// ```compile_fail
/// use tile_adventure_world::Placement;
///
/// let _forged = Placement(());
/// ```
#[derive(Debug)]
pub struct Placement(());

impl Placement {
    pub(crate) const fn issue() -> Self {
        Self(())
    }
}

/// Positioned visual unit placed into background and foreground layers.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    coordinate: Coordinate,
    character: Character,
}

impl Sprite {
    /// Creates a sprite at the provided coordinate.
    #[must_use]
    pub const fn new(coordinate: Coordinate, character: Character) -> Self {
        Self {
            coordinate,
            character,
        }
    }

    /// Appearance of the sprite.
    #[must_use]
    pub const fn character(&self) -> Character {
        self.character
    }

    /// Replaces the appearance of the sprite.
    pub fn set_character(&mut self, character: Character) {
        self.character = character;
    }
}

impl Tile for Sprite {
    fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    fn set_coordinate(&mut self, coordinate: Coordinate, _: Placement) {
        self.coordinate = coordinate;
    }
}

/// Reasons a tile layer operation may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayerError {
    /// The coordinate lies outside the layer.
    #[error("coordinate {coordinate} lies outside layer bounds {size}")]
    OutOfBounds {
        /// Coordinate that was addressed.
        coordinate: Coordinate,
        /// Bounds of the layer.
        size: Size,
    },
    /// A move was requested from an empty slot.
    #[error("no tile occupies source coordinate {coordinate}")]
    EmptySource {
        /// Source coordinate of the move.
        coordinate: Coordinate,
    },
    /// The destination slot already holds a different tile.
    #[error("coordinate {coordinate} is already occupied")]
    Occupied {
        /// Destination coordinate of the move.
        coordinate: Coordinate,
    },
}

/// Fixed-size grid holding at most one tile per coordinate.
#[derive(Clone, Debug)]
pub struct TileLayer<T> {
    size: Size,
    tiles: Vec<Option<T>>,
}

/// Layer of decorative or blocking sprites.
pub type SpriteLayer = TileLayer<Sprite>;

impl<T: Tile> TileLayer<T> {
    /// Creates an empty layer covering the provided size.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            tiles: (0..size.area()).map(|_| None).collect(),
        }
    }

    /// Bounds of the layer.
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Returns the tile occupying the coordinate, if any.
    pub fn get(&self, coordinate: Coordinate) -> Result<Option<&T>, LayerError> {
        let index = self.index(coordinate)?;
        Ok(self.tiles[index].as_ref())
    }

    /// Returns mutable access to the tile occupying the coordinate, if any.
    pub fn get_mut(&mut self, coordinate: Coordinate) -> Result<Option<&mut T>, LayerError> {
        let index = self.index(coordinate)?;
        Ok(self.tiles[index].as_mut())
    }

    /// Reports whether a tile occupies the coordinate.
    pub fn is_occupied(&self, coordinate: Coordinate) -> Result<bool, LayerError> {
        self.get(coordinate).map(|tile| tile.is_some())
    }

    /// Writes a tile (or nothing) into the slot, returning the displaced tile.
    ///
    /// A written tile has its coordinate rewritten to match the slot.
    pub fn set(
        &mut self,
        coordinate: Coordinate,
        tile: Option<T>,
    ) -> Result<Option<T>, LayerError> {
        let index = self.index(coordinate)?;
        let mut tile = tile;
        if let Some(tile) = tile.as_mut() {
            tile.set_coordinate(coordinate, Placement::issue());
        }
        Ok(std::mem::replace(&mut self.tiles[index], tile))
    }

    /// Removes and returns the tile occupying the coordinate.
    pub fn take(&mut self, coordinate: Coordinate) -> Result<Option<T>, LayerError> {
        self.set(coordinate, None)
    }

    /// Moves the tile at `from` to `to` and updates the tile's coordinate.
    ///
    /// Moving a tile onto its own slot succeeds without changes. Nothing is
    /// mutated when the operation fails.
    pub fn move_tile(&mut self, from: Coordinate, to: Coordinate) -> Result<(), LayerError> {
        let from_index = self.index(from)?;
        let to_index = self.index(to)?;

        if self.tiles[from_index].is_none() {
            return Err(LayerError::EmptySource { coordinate: from });
        }
        if from_index == to_index {
            return Ok(());
        }
        if self.tiles[to_index].is_some() {
            return Err(LayerError::Occupied { coordinate: to });
        }

        let mut tile = self.tiles[from_index].take();
        if let Some(tile) = tile.as_mut() {
            tile.set_coordinate(to, Placement::issue());
        }
        self.tiles[to_index] = tile;
        Ok(())
    }

    /// Iterates the occupying tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tiles.iter().flatten()
    }

    /// Iterates the occupied coordinates in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.iter().map(Tile::coordinate)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_some()).count()
    }

    /// Reports whether no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(Option::is_none)
    }

    fn index(&self, coordinate: Coordinate) -> Result<usize, LayerError> {
        let out_of_bounds = LayerError::OutOfBounds {
            coordinate,
            size: self.size,
        };
        if !self.size.contains(coordinate) {
            return Err(out_of_bounds);
        }

        let row = usize::try_from(coordinate.y()).map_err(|_| out_of_bounds)?;
        let column = usize::try_from(coordinate.x()).map_err(|_| out_of_bounds)?;
        let width = usize::try_from(self.size.width()).map_err(|_| out_of_bounds)?;
        Ok(row * width + column)
    }
}
