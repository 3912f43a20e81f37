use std::collections::HashSet;

use rand::seq::index;
use rand::Rng;
use tracing::{debug, info};

use crate::internal_util::neighbours;
use crate::{Cell, Dimensions, KnowledgeEngine, KnowledgeError};

/// Simple representation of a game board: where the mines are, and nothing
/// else (no rendering, no game state)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Cells holding a mine
    mines: HashSet<Cell>,
    /// The geometry of the board
    dims: Dimensions,
}
impl Board {
    /// Create a game board from an ASCII-encoded description, where:
    /// - `*` is a mine
    /// - `.` is a clear cell
    /// - Trailing or leading whitespace is ignored
    ///
    /// # Errors
    ///
    /// If the board is not rectangular, has a width or height of 0, or
    /// contains any other character, an error is returned.
    pub fn new(encoded: &str) -> Result<Self, String> {
        let lines = encoded.trim().lines().map(str::trim).collect::<Vec<_>>();
        let height = lines.len();
        let width = lines.first().map_or(0, |l| l.len());
        if height == 0 || width == 0 {
            return Err("Board must have at least one row and column".to_string());
        }
        if let Some(line) = lines.iter().find(|l| l.len() != width) {
            return Err(format!(
                concat!(
                    "Board must be rectangular (found line with length {},",
                    " expected length {})",
                ),
                line.len(),
                width,
            ));
        }
        let mut mines = HashSet::new();
        for (row, line) in lines.into_iter().enumerate() {
            for (col, c) in line.chars().enumerate() {
                match c {
                    '*' => {
                        mines.insert(Cell::new(row, col));
                    },
                    '.' => (),
                    _ => {
                        return Err(format!(
                            "Invalid character '{}' at ({}, {})",
                            c, row, col
                        ));
                    },
                }
            }
        }
        Ok(Self {
            mines,
            dims: Dimensions::new(height, width),
        })
    }

    /// Scatter `num_mines` mines over distinct cells of a board with the given
    /// dimensions.
    ///
    /// # Errors
    ///
    /// More mines are requested than the board has cells.
    pub fn random(
        dims: Dimensions,
        num_mines: usize,
        rng: &mut impl Rng,
    ) -> Result<Self, String> {
        let total = dims.total_cells();
        if num_mines > total {
            return Err(format!(
                "Cannot place {} mines on a {} board of {} cells",
                num_mines, dims, total
            ));
        }
        let mines = index::sample(rng, total, num_mines)
            .into_iter()
            .map(|i| Cell::new(i / dims.width, i % dims.width))
            .collect();
        Ok(Self {
            mines,
            dims,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines.contains(&cell)
    }

    /// Number of mines among the cells touching `cell`, not counting `cell`
    pub fn nearby_mines(&self, cell: Cell) -> usize {
        neighbours(cell, self.dims).filter(|n| self.is_mine(*n)).count()
    }

    /// Have exactly the mines been flagged?
    pub fn won(&self, flagged: &HashSet<Cell>) -> bool {
        *flagged == self.mines
    }
}

/// How an [`autoplay`] game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every mine was proven
    Won,
    /// A random guess hit this mine
    Lost(Cell),
    /// Every cell has been played or proven a mine, yet not every mine was
    /// found; only reachable on an inconsistent board
    Stuck,
}

/// Play `board` to the end: dig a known-safe cell whenever there is one, guess
/// otherwise.
///
/// # Errors
///
/// The engine rejected a clue from the board.
pub fn autoplay(
    board: &Board,
    engine: &mut KnowledgeEngine,
    rng: &mut impl Rng,
) -> Result<Outcome, KnowledgeError> {
    loop {
        if board.won(engine.mines()) {
            info!(moves = engine.moves_made().len(), "all mines found");
            return Ok(Outcome::Won);
        }
        let cell = match engine.pick_safe_move() {
            Some(cell) => cell,
            None => {
                match engine.pick_random_move_with(rng) {
                    Some(cell) => {
                        debug!(%cell, "no safe move, guessing");
                        cell
                    },
                    None => return Ok(Outcome::Stuck),
                }
            },
        };
        if board.is_mine(cell) {
            info!(%cell, moves = engine.moves_made().len(), "hit a mine");
            return Ok(Outcome::Lost(cell));
        }
        engine.record_clue(cell, board.nearby_mines(cell))?;
    }
}
