//! Character positions.
//!
//! Positions are owned by another system; the world only reads them to
//! validate a move and hands accepted moves back through
//! [`CharacterDirectory::commit_move`].

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use veldt_shared::{CharacterId, Timestamp, WorldId};

use crate::error::{WorldError, WorldResult};

/// Where a character stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CharacterPosition {
    /// Character.
    pub character: CharacterId,
    /// World the character is in.
    pub world: WorldId,
    /// Tile X.
    pub x: i64,
    /// Tile Y.
    pub y: i64,
    /// Time of the last accepted move, if any.
    pub last_move_at: Option<Timestamp>,
}

/// Access to character positions.
pub trait CharacterDirectory: Send + Sync {
    /// Loads a character's position.
    ///
    /// # Errors
    ///
    /// `WorldError::CharacterNotFound` if the character has no position.
    fn load(&self, character: CharacterId) -> WorldResult<CharacterPosition>;

    /// Stores an accepted move, provided the character's last move is
    /// still `expected_last_move_at`. Returns the new position, or `None`
    /// if another move was committed since the position was read.
    ///
    /// # Errors
    ///
    /// `WorldError::CharacterNotFound` if the character has no position.
    fn commit_move(
        &self,
        character: CharacterId,
        expected_last_move_at: Option<Timestamp>,
        x: i64,
        y: i64,
        at: Timestamp,
    ) -> WorldResult<Option<CharacterPosition>>;
}

/// In-memory character positions.
#[derive(Debug, Default)]
pub struct MemoryCharacterDirectory {
    positions: RwLock<HashMap<CharacterId, CharacterPosition>>,
}

impl MemoryCharacterDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a character, replacing any previous position. The character
    /// has not moved yet.
    pub fn spawn(&self, character: CharacterId, world: WorldId, x: i64, y: i64) -> CharacterPosition {
        let position = CharacterPosition {
            character,
            world,
            x,
            y,
            last_move_at: None,
        };
        self.positions.write().insert(character, position);
        position
    }
}

impl CharacterDirectory for MemoryCharacterDirectory {
    fn load(&self, character: CharacterId) -> WorldResult<CharacterPosition> {
        self.positions
            .read()
            .get(&character)
            .copied()
            .ok_or(WorldError::CharacterNotFound(character))
    }

    fn commit_move(
        &self,
        character: CharacterId,
        expected_last_move_at: Option<Timestamp>,
        x: i64,
        y: i64,
        at: Timestamp,
    ) -> WorldResult<Option<CharacterPosition>> {
        let mut positions = self.positions.write();
        let position = positions
            .get_mut(&character)
            .ok_or(WorldError::CharacterNotFound(character))?;
        if position.last_move_at != expected_last_move_at {
            return Ok(None);
        }
        position.x = x;
        position.y = y;
        position.last_move_at = Some(at);
        Ok(Some(*position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_move() {
        let dir = MemoryCharacterDirectory::new();
        let world = WorldId::new(1).unwrap();
        dir.spawn(CharacterId(3), world, 5, 5);

        let moved = dir
            .commit_move(CharacterId(3), None, 6, 5, Timestamp(100))
            .unwrap()
            .unwrap();
        assert_eq!((moved.x, moved.y), (6, 5));
        assert_eq!(moved.last_move_at, Some(Timestamp(100)));
        assert_eq!(dir.load(CharacterId(3)).unwrap(), moved);
        assert_eq!(
            dir.commit_move(CharacterId(4), None, 0, 0, Timestamp(1)),
            Err(WorldError::CharacterNotFound(CharacterId(4)))
        );
    }

    #[test]
    fn test_commit_move_needs_current_last_move() {
        let dir = MemoryCharacterDirectory::new();
        let world = WorldId::new(1).unwrap();
        dir.spawn(CharacterId(3), world, 0, 0);

        assert!(dir.commit_move(CharacterId(3), None, 1, 0, Timestamp(10)).unwrap().is_some());
        // Read before the first commit.
        assert_eq!(dir.commit_move(CharacterId(3), None, 0, 1, Timestamp(10)).unwrap(), None);
        assert_eq!(dir.load(CharacterId(3)).unwrap().x, 1);
        assert!(dir
            .commit_move(CharacterId(3), Some(Timestamp(10)), 2, 0, Timestamp(500))
            .unwrap()
            .is_some());
    }
}
