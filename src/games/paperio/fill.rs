//! Territory closing.
//!
//! When a trail returns home, everything inside the excursion rectangle that
//! cannot reach the rectangle's border without crossing the player's own
//! territory or trail is sealed in. The search runs over the rectangle only,
//! so the cost is bounded by the size of the excursion, not the grid.

use std::collections::VecDeque;

use super::state::{BoundingBox, Grid, GridPos};
use crate::game::traits::PlayerId;

/// Marks every rectangle cell reachable from the rectangle border through
/// cells that are neither owned nor traced by `player_id`.
///
/// The mask is row-major over `bounds`; `true` means "still outside".
pub fn outside_mask(grid: &Grid, player_id: PlayerId, bounds: &BoundingBox) -> Vec<bool> {
    let rows = bounds.rows();
    let cols = bounds.cols();
    let mut reached = vec![false; rows * cols];
    let mut queue = VecDeque::new();

    let is_open = |r: usize, c: usize| {
        let pos = GridPos::new(bounds.min_col + c as i32, bounds.min_row + r as i32);
        match grid.cell(&pos) {
            Some(cell) => cell.owner != Some(player_id) && cell.trace != Some(player_id),
            None => false,
        }
    };

    let consider = |r: usize, c: usize, reached: &mut Vec<bool>, queue: &mut VecDeque<(usize, usize)>| {
        let idx = r * cols + c;
        if !reached[idx] && is_open(r, c) {
            reached[idx] = true;
            queue.push_back((r, c));
        }
    };

    for r in 0..rows {
        consider(r, 0, &mut reached, &mut queue);
        consider(r, cols - 1, &mut reached, &mut queue);
    }
    for c in 0..cols {
        consider(0, c, &mut reached, &mut queue);
        consider(rows - 1, c, &mut reached, &mut queue);
    }

    while let Some((r, c)) = queue.pop_front() {
        if r > 0 {
            consider(r - 1, c, &mut reached, &mut queue);
        }
        if c > 0 {
            consider(r, c - 1, &mut reached, &mut queue);
        }
        if r + 1 < rows {
            consider(r + 1, c, &mut reached, &mut queue);
        }
        if c + 1 < cols {
            consider(r, c + 1, &mut reached, &mut queue);
        }
    }

    reached
}

/// Cells inside `bounds` that become `player_id`'s territory when the
/// current trail closes: those sealed off from the rectangle border and not
/// already owned by the player. Includes the player's own trail cells.
pub fn enclosed_cells(grid: &Grid, player_id: PlayerId, bounds: &BoundingBox) -> Vec<GridPos> {
    let reached = outside_mask(grid, player_id, bounds);

    bounds
        .cells()
        .zip(reached)
        .filter(|(pos, outside)| !outside && grid.in_bounds(pos) && !grid.is_owned_by(pos, player_id))
        .map(|(pos, _)| pos)
        .collect()
}
