use std::fmt;

use either::Either;
use frozenset::FrozenSet;
use itertools::Itertools;
use tracing::trace;

use crate::{Cell, InconsistencyError};

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// Two sentences are equal when they cover the same cells with the same
/// count; the cell set is hashed independently of insertion order.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sentence {
    cells: FrozenSet<Cell>,
    count: usize,
}
impl Sentence {
    /// # Errors
    ///
    /// A sentence claiming more mines than it has cells can never hold.
    pub fn new(
        cells: impl IntoIterator<Item = Cell>,
        count: usize,
    ) -> Result<Self, InconsistencyError> {
        let cells = cells.into_iter().collect::<FrozenSet<_>>();
        if count > cells.len() {
            return Err(InconsistencyError("Sentence with more mines than cells"));
        }
        Ok(Self {
            cells,
            count,
        })
    }

    pub fn cells(&self) -> &FrozenSet<Cell> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Every cell, if all of them must be mines.
    ///
    /// An empty sentence trivially qualifies; callers get an empty set back
    /// and learn nothing from it.
    pub fn known_mines(&self) -> Option<&FrozenSet<Cell>> {
        (self.cells.len() == self.count).then_some(&self.cells)
    }

    /// Every cell, if none of them can be a mine
    pub fn known_safes(&self) -> Option<&FrozenSet<Cell>> {
        (self.count == 0).then_some(&self.cells)
    }

    /// `Left` if every cell is a mine, `Right` if every cell is safe, `None`
    /// while the sentence is still undecided. Mines win for the empty
    /// sentence.
    pub fn certainty(&self) -> Option<Either<&FrozenSet<Cell>, &FrozenSet<Cell>>> {
        self.known_mines()
            .map(Either::Left)
            .or_else(|| self.known_safes().map(Either::Right))
    }

    /// Remove `cell` as a known mine, lowering the count.
    ///
    /// Returns whether the cell was part of this sentence; an absent cell is
    /// not an error, the same fact routinely reaches a sentence twice.
    ///
    /// # Errors
    ///
    /// The sentence says none of its cells are mines but `cell` is one.
    pub fn mark_mine(&mut self, cell: Cell) -> Result<bool, InconsistencyError> {
        if !self.contains(cell) {
            trace!(%cell, sentence = %self, "mine not in sentence");
            return Ok(false);
        }
        if self.count == 0 {
            return Err(InconsistencyError(
                "Mine found among cells already known to hold no mines",
            ));
        }
        self.cells = self.without(cell);
        self.count -= 1;
        Ok(true)
    }

    /// Remove `cell` as known safe; the count is unchanged.
    ///
    /// # Errors
    ///
    /// The sentence says all of its cells are mines but `cell` is safe.
    pub fn mark_safe(&mut self, cell: Cell) -> Result<bool, InconsistencyError> {
        if !self.contains(cell) {
            trace!(%cell, sentence = %self, "safe cell not in sentence");
            return Ok(false);
        }
        if self.count == self.cells.len() {
            return Err(InconsistencyError(
                "Safe cell found among cells already known to all be mines",
            ));
        }
        self.cells = self.without(cell);
        Ok(true)
    }

    fn without(&self, cell: Cell) -> FrozenSet<Cell> {
        self.cells.iter().copied().filter(|&c| c != cell).collect()
    }

    /// Is this sentence's cell set a proper, non-empty subset of `other`'s?
    pub fn is_strict_subset_of(&self, other: &Self) -> bool {
        !self.is_empty()
            && self.cells.len() < other.cells.len()
            && self.cells.is_subset(&other.cells)
    }

    /// Given a sentence whose cells lie wholly within this one, the cells only
    /// this sentence covers hold exactly the difference in mine counts.
    ///
    /// # Errors
    ///
    /// `other` is not contained in this sentence, or it claims more mines than
    /// this sentence allows for.
    pub fn subtract(&self, other: &Self) -> Result<Self, InconsistencyError> {
        if !other.cells.is_subset(&self.cells) {
            return Err(InconsistencyError("Subtraction of non-subset sentence"));
        }
        let count = self.count.checked_sub(other.count).ok_or(InconsistencyError(
            "Subset sentence holds more mines than its superset",
        ))?;
        Self::new(self.cells.difference(&other.cells).copied(), count)
    }
}
impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}} = {}",
            self.cells.iter().sorted().join(", "),
            self.count
        )
    }
}
