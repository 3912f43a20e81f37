//! A minesweeper player that reasons over a knowledge base of sentences.
//!
//! Each revealed clue becomes a [`Sentence`] (`{cells} = count`, meaning
//! exactly `count` of `cells` are mines). The [`KnowledgeEngine`] keeps those
//! sentences, extracts certain mines and safe cells from them, and resolves
//! pairs of sentences whose cell sets are nested until nothing more can be
//! learned.
use std::fmt;

use thiserror::Error;

mod engine;
mod internal_util;
mod sentence;
pub mod util;

pub use engine::KnowledgeEngine;
pub use sentence::Sentence;

/// A cell on the board, addressed by row and column
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}
impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
        }
    }
}
impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Geometry of the board the engine reasons about
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    pub height: usize,
    pub width: usize,
}
impl Dimensions {
    pub const fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
        }
    }

    pub const fn total_cells(&self) -> usize {
        self.height * self.width
    }

    /// Does `cell` lie on the board?
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    /// Every cell on the board, row by row
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        internal_util::board_cells(*self)
    }
}
impl Default for Dimensions {
    fn default() -> Self {
        Self::new(8, 8)
    }
}
impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// The knowledge base would become logically contradictory.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Error)]
#[error("inconsistent knowledge: {0}")]
pub struct InconsistencyError(pub &'static str);

/// Errors returned when feeding clues to a [`KnowledgeEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KnowledgeError {
    #[error("cell {0} lies outside the board")]
    OutOfBounds(Cell),
    #[error(transparent)]
    Inconsistent(#[from] InconsistencyError),
}
