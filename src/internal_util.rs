use std::cmp::min;

use itertools::Itertools;

use crate::{Cell, Dimensions};

/// The up-to-eight cells touching `cell`, clamped to the board and excluding
/// `cell` itself
pub(crate) fn neighbours(
    Cell {
        row,
        col,
    }: Cell,
    dims: Dimensions,
) -> impl Iterator<Item = Cell> {
    let rows =
        row.saturating_sub(1)..=min(row.saturating_add(1), dims.height.saturating_sub(1));
    let cols =
        col.saturating_sub(1)..=min(col.saturating_add(1), dims.width.saturating_sub(1));
    rows.cartesian_product(cols)
        .map(Cell::from)
        .filter(move |&c| c != Cell::new(row, col))
}

/// Every cell of the board, row-major
pub(crate) fn board_cells(dims: Dimensions) -> impl Iterator<Item = Cell> {
    (0..dims.height)
        .cartesian_product(0..dims.width)
        .map(Cell::from)
}
