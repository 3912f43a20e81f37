use std::collections::HashSet;
use std::mem;

use either::Either;
use itertools::Itertools;
use rand::Rng;
use tracing::debug;

use crate::internal_util::neighbours;
use crate::{Cell, Dimensions, InconsistencyError, KnowledgeError, Sentence};

/// Deductive minesweeper player for a single game.
///
/// Holds the moves made so far, the cells proven to be mines or safe, and
/// the sentences that are not yet fully resolved. Invariants kept between
/// calls:
///
/// - `mines` and `safes` are disjoint
/// - no sentence mentions a cell in `mines` or `safes`
/// - no two sentences are equal
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KnowledgeEngine {
    dims: Dimensions,
    moves_made: HashSet<Cell>,
    mines: HashSet<Cell>,
    safes: HashSet<Cell>,
    knowledge: Vec<Sentence>,
}
impl KnowledgeEngine {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            moves_made: HashSet::new(),
            mines: HashSet::new(),
            safes: HashSet::new(),
            knowledge: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn moves_made(&self) -> &HashSet<Cell> {
        &self.moves_made
    }

    pub fn mines(&self) -> &HashSet<Cell> {
        &self.mines
    }

    pub fn safes(&self) -> &HashSet<Cell> {
        &self.safes
    }

    /// Sentences still waiting to be resolved
    pub fn knowledge(&self) -> &[Sentence] {
        &self.knowledge
    }

    /// Record `cell` as a mine and strip it from every sentence. Nothing
    /// changes if the mine is rejected.
    ///
    /// # Errors
    ///
    /// `cell` is already known to be safe, or a sentence rules out a mine
    /// there.
    pub fn mark_mine(&mut self, cell: Cell) -> Result<(), InconsistencyError> {
        if self.safes.contains(&cell) {
            return Err(InconsistencyError("Cell proven both mine and safe"));
        }
        if self.knowledge.iter().any(|s| s.contains(cell) && s.count() == 0) {
            return Err(InconsistencyError(
                "Mine found among cells already known to hold no mines",
            ));
        }
        if self.mines.insert(cell) {
            debug!(%cell, "proved mine");
        }
        for sentence in &mut self.knowledge {
            sentence.mark_mine(cell)?;
        }
        Ok(())
    }

    /// Record `cell` as safe and strip it from every sentence. Nothing changes
    /// if the cell is rejected.
    ///
    /// # Errors
    ///
    /// `cell` is already known to be a mine, or a sentence requires a mine
    /// there.
    pub fn mark_safe(&mut self, cell: Cell) -> Result<(), InconsistencyError> {
        if self.mines.contains(&cell) {
            return Err(InconsistencyError("Cell proven both mine and safe"));
        }
        if self.knowledge.iter().any(|s| s.contains(cell) && s.count() == s.len()) {
            return Err(InconsistencyError(
                "Safe cell found among cells already known to all be mines",
            ));
        }
        if self.safes.insert(cell) {
            debug!(%cell, "proved safe");
        }
        for sentence in &mut self.knowledge {
            sentence.mark_safe(cell)?;
        }
        Ok(())
    }

    /// Build the sentence a clue of `count` at `cell` amounts to, leaving out
    /// neighbours whose status is already known.
    ///
    /// # Errors
    ///
    /// `cell` is off the board, or the clue is smaller than the number of
    /// known adjacent mines or larger than the number of neighbours that could
    /// still hold one.
    pub fn build_sentence(&self, cell: Cell, count: usize) -> Result<Sentence, KnowledgeError> {
        if !self.dims.contains(cell) {
            return Err(KnowledgeError::OutOfBounds(cell));
        }
        Ok(self.sentence_for(cell, count)?)
    }

    fn sentence_for(&self, cell: Cell, count: usize) -> Result<Sentence, InconsistencyError> {
        let mut count = count;
        let mut unknown = Vec::with_capacity(8);
        for neighbour in neighbours(cell, self.dims) {
            if self.mines.contains(&neighbour) {
                count = count.checked_sub(1).ok_or(InconsistencyError(
                    "Clue is smaller than the number of known adjacent mines",
                ))?;
            } else if !self.safes.contains(&neighbour) {
                unknown.push(neighbour);
            }
        }
        Sentence::new(unknown, count)
    }

    /// Ingest the clue for a freshly revealed safe cell: `count` of its
    /// neighbours are mines. Everything that follows from it is deduced
    /// before returning.
    ///
    /// On error the engine is left exactly as it was before the call.
    ///
    /// # Errors
    ///
    /// `cell` is off the board, or the clue contradicts what is already known.
    pub fn record_clue(&mut self, cell: Cell, count: usize) -> Result<(), KnowledgeError> {
        if !self.dims.contains(cell) {
            return Err(KnowledgeError::OutOfBounds(cell));
        }
        let snapshot = self.clone();
        self.try_record_clue(cell, count).map_err(|err| {
            debug!(%cell, count, %err, "rejected clue");
            *self = snapshot;
            KnowledgeError::from(err)
        })
    }

    fn try_record_clue(&mut self, cell: Cell, count: usize) -> Result<(), InconsistencyError> {
        self.moves_made.insert(cell);
        self.mark_safe(cell)?;
        self.settle()?;

        let sentence = self.sentence_for(cell, count)?;
        if self.knowledge.contains(&sentence) {
            debug!(%sentence, "already known");
            return Ok(());
        }
        debug!(%sentence, "adding sentence");
        self.knowledge.push(sentence);
        self.settle()
    }

    /// Deduce until a full pass of certainty extraction and subset resolution
    /// changes nothing.
    ///
    /// Every effective resolution strictly shrinks the total number of cells
    /// across all sentences, so the loop terminates.
    fn settle(&mut self) -> Result<(), InconsistencyError> {
        loop {
            self.forget_mines_or_safes()?;
            let resolved = self.resolve_subsets()?;
            self.dedup()?;
            if !resolved {
                return Ok(());
            }
        }
    }

    /// Drop every sentence that is all mines or all safe, recording its cells
    /// as such, until no sentence is certain.
    fn forget_mines_or_safes(&mut self) -> Result<(), InconsistencyError> {
        loop {
            let mut mines = Vec::new();
            let mut safes = Vec::new();
            let before = self.knowledge.len();
            self.knowledge.retain(|sentence| {
                match sentence.certainty() {
                    Some(Either::Left(cells)) => mines.extend(cells.iter().copied()),
                    Some(Either::Right(cells)) => safes.extend(cells.iter().copied()),
                    None => return true,
                }
                false
            });
            if self.knowledge.len() == before {
                return Ok(());
            }
            for cell in mines {
                self.mark_mine(cell)?;
            }
            for cell in safes {
                self.mark_safe(cell)?;
            }
        }
    }

    /// Replace every sentence that strictly contains another with the
    /// difference of the two. Returns whether anything was replaced.
    fn resolve_subsets(&mut self) -> Result<bool, InconsistencyError> {
        let mut changed = false;
        for (i, j) in (0..self.knowledge.len()).tuple_combinations() {
            for (sub, sup) in [(i, j), (j, i)] {
                if self.knowledge[sub].is_strict_subset_of(&self.knowledge[sup]) {
                    let derived = self.knowledge[sup].subtract(&self.knowledge[sub])?;
                    debug!(
                        superset = %self.knowledge[sup],
                        subset = %self.knowledge[sub],
                        %derived,
                        "resolved"
                    );
                    self.knowledge[sup] = derived;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Remove duplicate sentences.
    ///
    /// # Errors
    ///
    /// Two sentences cover the same cells but disagree on the count.
    fn dedup(&mut self) -> Result<(), InconsistencyError> {
        self.knowledge = mem::take(&mut self.knowledge).into_iter().unique().collect();
        if self
            .knowledge
            .iter()
            .tuple_combinations()
            .any(|(a, b)| a.cells() == b.cells())
        {
            return Err(InconsistencyError(
                "Sentences over the same cells disagree on the mine count",
            ));
        }
        Ok(())
    }

    /// Is there a cell known to be safe that has not been played yet?
    pub fn is_safe_move_available(&self) -> bool {
        self.pick_safe_move().is_some()
    }

    /// A known-safe cell that has not been played yet, lowest first
    pub fn pick_safe_move(&self) -> Option<Cell> {
        self.safes.difference(&self.moves_made).min().copied()
    }

    /// A uniformly random cell that has neither been played nor proven to be
    /// a mine, using the thread-local RNG
    pub fn pick_random_move(&self) -> Option<Cell> {
        self.pick_random_move_with(&mut rand::rng())
    }

    /// See [`Self::pick_random_move`]. Samples the whole board and retries on
    /// a miss; `None` once every cell has been played or proven a mine.
    pub fn pick_random_move_with(&self, rng: &mut impl Rng) -> Option<Cell> {
        if self.moves_made.len() + self.mines.len() >= self.dims.total_cells() {
            return None;
        }
        loop {
            let cell = Cell::new(
                rng.random_range(0..self.dims.height),
                rng.random_range(0..self.dims.width),
            );
            if !self.moves_made.contains(&cell) && !self.mines.contains(&cell) {
                return Some(cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    fn cell_set(coords: &[(usize, usize)]) -> HashSet<Cell> {
        coords.iter().copied().map(Cell::from).collect()
    }

    fn sentence(coords: &[(usize, usize)], count: usize) -> Sentence {
        Sentence::new(coords.iter().copied().map(Cell::from), count).unwrap()
    }

    fn assert_disjoint(engine: &KnowledgeEngine) {
        assert!(engine.mines.is_disjoint(&engine.safes));
        for s in &engine.knowledge {
            assert!(s.cells().iter().all(|c| !engine.mines.contains(c)));
            assert!(s.cells().iter().all(|c| !engine.safes.contains(c)));
        }
    }

    #[test]
    fn zero_in_the_corner_clears_its_neighbours() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(0, 0), 0).unwrap();
        assert_eq!(engine.safes, cell_set(&[(0, 0), (0, 1), (1, 0), (1, 1)]));
        assert_eq!(engine.mines, HashSet::new());
        assert_eq!(engine.moves_made, cell_set(&[(0, 0)]));
        assert!(engine.knowledge.is_empty());
    }

    #[test]
    fn full_count_marks_every_neighbour_a_mine() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(0, 0), 3).unwrap();
        assert_eq!(engine.mines, cell_set(&[(0, 1), (1, 0), (1, 1)]));
        assert!(engine.knowledge.is_empty());
    }

    #[test]
    fn undecided_clue_is_kept_as_a_sentence() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(3, 3), 2).unwrap();
        assert_eq!(engine.knowledge.len(), 1);
        assert_eq!(engine.knowledge[0].len(), 8);
        assert_eq!(engine.knowledge[0].count(), 2);
    }

    #[test]
    fn subset_resolution_isolates_a_mine() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        let a = sentence(&[(0, 1), (0, 2), (0, 3)], 1);
        engine.knowledge.push(a.clone());
        engine
            .knowledge
            .push(sentence(&[(0, 1), (0, 2), (0, 3), (0, 4)], 2));
        engine.settle().unwrap();
        assert_eq!(engine.mines, cell_set(&[(0, 4)]));
        assert_eq!(engine.knowledge, vec![a]);
        assert_disjoint(&engine);
    }

    #[test]
    fn resolution_chains_into_safe_cells() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.knowledge.push(sentence(&[(2, 0), (2, 1)], 1));
        engine.knowledge.push(sentence(&[(2, 0), (2, 1), (2, 2)], 1));
        engine.settle().unwrap();
        assert_eq!(engine.safes, cell_set(&[(2, 2)]));
        assert_eq!(engine.knowledge, vec![sentence(&[(2, 0), (2, 1)], 1)]);
    }

    #[test]
    fn clue_against_partial_knowledge_resolves() {
        // 1x4 strip with a single mine at (0, 1)
        let mut engine = KnowledgeEngine::new(Dimensions::new(1, 4));
        engine.record_clue(Cell::new(0, 0), 1).unwrap();
        assert_eq!(engine.mines, cell_set(&[(0, 1)]));
        engine.record_clue(Cell::new(0, 2), 1).unwrap();
        assert_eq!(engine.safes, cell_set(&[(0, 0), (0, 2), (0, 3)]));
        assert_eq!(engine.pick_safe_move(), Some(Cell::new(0, 3)));
        assert_disjoint(&engine);
    }

    #[test]
    fn build_sentence_skips_known_cells() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.mark_mine(Cell::new(0, 1)).unwrap();
        engine.mark_safe(Cell::new(1, 0)).unwrap();
        assert_eq!(
            engine.build_sentence(Cell::new(0, 0), 2),
            Ok(sentence(&[(1, 1)], 1))
        );
        assert!(matches!(
            engine.build_sentence(Cell::new(0, 0), 0),
            Err(KnowledgeError::Inconsistent(_))
        ));
    }

    #[test]
    fn duplicate_clue_does_not_grow_knowledge() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(3, 3), 2).unwrap();
        let before = engine.knowledge.clone();
        engine.record_clue(Cell::new(3, 3), 2).unwrap();
        assert_eq!(engine.knowledge, before);
    }

    #[test]
    fn duplicates_are_removed_after_resolution() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.knowledge.push(sentence(&[(5, 5), (5, 6)], 1));
        engine.knowledge.push(sentence(&[(5, 5), (5, 6), (5, 7), (6, 7)], 2));
        engine.knowledge.push(sentence(&[(5, 7), (6, 7)], 1));
        engine.settle().unwrap();
        assert_eq!(engine.knowledge.len(), 2);
    }

    #[test]
    fn contradictory_clue_is_rejected_and_rolled_back() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(0, 0), 1).unwrap();
        let before = engine.clone();
        assert!(matches!(
            engine.record_clue(Cell::new(0, 1), 0),
            Err(KnowledgeError::Inconsistent(_))
        ));
        assert_eq!(engine, before);
        assert!(matches!(
            engine.record_clue(Cell::new(7, 7), 4),
            Err(KnowledgeError::Inconsistent(_))
        ));
        assert_eq!(engine, before);
    }

    #[test]
    fn clue_off_the_board_is_rejected() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        assert_eq!(
            engine.record_clue(Cell::new(8, 0), 0),
            Err(KnowledgeError::OutOfBounds(Cell::new(8, 0)))
        );
        assert!(engine.moves_made.is_empty());
    }

    #[test]
    fn mine_and_safe_never_overlap() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.mark_mine(Cell::new(2, 2)).unwrap();
        assert!(engine.mark_safe(Cell::new(2, 2)).is_err());
        engine.mark_safe(Cell::new(4, 4)).unwrap();
        assert!(engine.mark_mine(Cell::new(4, 4)).is_err());
    }

    #[test]
    fn safe_moves_run_out_once_played() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(1, 2));
        engine.record_clue(Cell::new(0, 0), 1).unwrap();
        assert!(!engine.is_safe_move_available());
        assert_eq!(engine.pick_safe_move(), None);
        assert_eq!(engine.pick_random_move(), None);
    }

    #[test]
    fn safe_move_queries_do_not_mutate() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.record_clue(Cell::new(0, 0), 0).unwrap();
        let before = engine.clone();
        assert_eq!(engine.pick_safe_move(), Some(Cell::new(0, 1)));
        assert!(engine.is_safe_move_available());
        let mut rng = SmallRng::seed_from_u64(7);
        engine.pick_random_move_with(&mut rng);
        assert_eq!(engine, before);
    }

    #[test]
    fn random_move_avoids_played_cells_and_mines() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(1, 3));
        engine.record_clue(Cell::new(0, 0), 1).unwrap();
        assert_eq!(engine.mines, cell_set(&[(0, 1)]));
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(engine.pick_random_move_with(&mut rng), Some(Cell::new(0, 2)));
        }
    }

    #[test]
    fn random_move_is_none_when_board_accounted_for() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(2, 2));
        engine.record_clue(Cell::new(0, 0), 3).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(engine.pick_random_move_with(&mut rng), None);
    }

    #[test]
    fn rejected_mine_leaves_engine_untouched() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.knowledge.push(sentence(&[(5, 5), (5, 6)], 1));
        engine.knowledge.push(sentence(&[(5, 5), (6, 6)], 0));
        let before = engine.clone();
        assert_eq!(
            engine.mark_mine(Cell::new(5, 5)),
            Err(InconsistencyError(
                "Mine found among cells already known to hold no mines"
            ))
        );
        assert_eq!(engine, before);
    }

    #[test]
    fn rejected_safe_cell_leaves_engine_untouched() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        engine.knowledge.push(sentence(&[(2, 2), (2, 3), (2, 4)], 1));
        engine.knowledge.push(sentence(&[(2, 2), (3, 3)], 2));
        let before = engine.clone();
        assert!(engine.mark_safe(Cell::new(2, 2)).is_err());
        assert_eq!(engine, before);
    }

    #[test]
    fn sentence_for_a_cell_off_the_board_is_rejected() {
        let engine = KnowledgeEngine::new(Dimensions::new(8, 8));
        let far = Cell::new(usize::MAX, usize::MAX);
        assert_eq!(
            engine.build_sentence(far, 1),
            Err(KnowledgeError::OutOfBounds(far))
        );
    }

    #[test]
    fn facts_only_grow() {
        let mut engine = KnowledgeEngine::new(Dimensions::new(4, 4));
        // Mines at (0, 3) and (3, 0)
        let clues = [((0, 0), 0), ((1, 1), 0), ((2, 2), 0), ((1, 2), 1), ((3, 3), 0)];
        let mut previous = engine.clone();
        for ((row, col), count) in clues {
            engine.record_clue(Cell::new(row, col), count).unwrap();
            assert!(engine.mines.is_superset(&previous.mines));
            assert!(engine.safes.is_superset(&previous.safes));
            assert!(engine.moves_made.is_superset(&previous.moves_made));
            assert_disjoint(&engine);
            previous = engine.clone();
        }
        assert_eq!(engine.mines, cell_set(&[(0, 3)]));
    }
}
