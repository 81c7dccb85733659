//! # Position registry
//!
//! Insertion ordered arena of positions. Positions are never removed individually, the whole
//! arena is cleared at once (on network reload or close), which bumps its generation so that
//! handles taken before the clear are rejected.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use crate::{position::Position, PosError};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Typed reference to a position in a [`PositionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PositionRegistry {
    positions: Vec<Position>,
    generation: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Handle {
    /// Zero based index of the position, the integer handle of the manager surface.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Add a new, unplaced position and return its handle.
    pub fn create(&mut self) -> Handle {
        self.positions.push(Position::new());

        Handle {
            index: self.positions.len() - 1,
            generation: self.generation,
        }
    }

    /// Handle for an integer index, checked against the current contents.
    pub fn handle_at(&self, index: usize) -> Result<Handle, PosError> {
        if index < self.positions.len() {
            Ok(Handle {
                index,
                generation: self.generation,
            })
        } else {
            Err(PosError::InvalidHandle(index as i64))
        }
    }

    pub fn get(&self, handle: Handle) -> Result<&Position, PosError> {
        self.check(handle)?;
        Ok(&self.positions[handle.index])
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Position, PosError> {
        self.check(handle)?;
        Ok(&mut self.positions[handle.index])
    }

    /// Remove every position, invalidating all handles.
    pub fn clear(&mut self) {
        debug!(
            "Clearing {} positions from registry generation {}",
            self.positions.len(),
            self.generation
        );

        self.positions.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    fn check(&self, handle: Handle) -> Result<(), PosError> {
        if handle.generation != self.generation {
            Err(PosError::StaleHandle)
        } else if handle.index >= self.positions.len() {
            Err(PosError::InvalidHandle(handle.index as i64))
        } else {
            Ok(())
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_handles_are_indices() {
        let mut reg = PositionRegistry::new();

        let a = reg.create();
        let b = reg.create();

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.handle_at(1).unwrap(), b);
        assert!(matches!(reg.handle_at(2), Err(PosError::InvalidHandle(2))));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut reg = PositionRegistry::new();
        let a = reg.create();

        reg.clear();
        assert!(reg.is_empty());
        assert!(matches!(reg.get(a), Err(PosError::StaleHandle)));

        // A new position at the same index gets a fresh handle
        let b = reg.create();
        assert_eq!(b.index(), a.index());
        assert_ne!(a, b);
        assert!(reg.get_mut(b).is_ok());
    }
}
