use crate::game::traits::{ParticipantId, PlayerId};
use std::collections::{BTreeMap, HashMap};

/// A cell coordinate on the game grid
///
/// (0,0) is the top-left corner,
/// x is the column and increases to the right, y is the row and increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Continuous player position, in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin of the given cell.
    pub fn at_cell(pos: GridPos) -> Self {
        Self::new(pos.x as f64, pos.y as f64)
    }

    /// The cell this position falls in.
    pub fn cell(&self) -> GridPos {
        GridPos::new(self.x as i32, self.y as i32)
    }
}

/// Facing direction, listed in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    #[default]
    Right,
    Down,
    Left,
}

impl Direction {
    /// Unit step along this direction as (dx, dy); y grows downward.
    pub fn delta(&self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    /// Rotated 90° counter-clockwise.
    pub fn turned_left(&self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Rotated 90° clockwise.
    pub fn turned_right(&self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Permanent owner, if any
    pub owner: Option<PlayerId>,
    /// Player whose open trail runs through this cell, if any
    pub trace: Option<PlayerId>,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.trace.is_none()
    }
}

/// Inclusive row/column range covering a player's excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}

impl BoundingBox {
    pub fn around(pos: GridPos) -> Self {
        Self {
            min_row: pos.y,
            max_row: pos.y,
            min_col: pos.x,
            max_col: pos.x,
        }
    }

    /// Square of side `size` centred on `center`, clipped to a `width` x `height` grid.
    pub fn square(center: GridPos, size: u32, width: u32, height: u32) -> Self {
        // Even sides put the extra cell below and to the right of `center`.
        let side = size.max(1) as i32;
        let min_row = center.y - (side - 1) / 2;
        let min_col = center.x - (side - 1) / 2;
        Self {
            min_row: min_row.max(0),
            max_row: (min_row + side - 1).min(height as i32 - 1),
            min_col: min_col.max(0),
            max_col: (min_col + side - 1).min(width as i32 - 1),
        }
    }

    pub fn include(&mut self, pos: GridPos) {
        self.min_row = self.min_row.min(pos.y);
        self.max_row = self.max_row.max(pos.y);
        self.min_col = self.min_col.min(pos.x);
        self.max_col = self.max_col.max(pos.x);
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        (self.min_row..=self.max_row).contains(&pos.y)
            && (self.min_col..=self.max_col).contains(&pos.x)
    }

    pub fn rows(&self) -> usize {
        (self.max_row - self.min_row + 1) as usize
    }

    pub fn cols(&self) -> usize {
        (self.max_col - self.min_col + 1) as usize
    }

    pub fn area(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (self.min_row..=self.max_row)
            .flat_map(move |y| (self.min_col..=self.max_col).map(move |x| GridPos::new(x, y)))
    }
}

pub struct Grid {
    /// Width of the grid
    width: u32,
    /// Height of the grid
    height: u32,
    /// Row-major cell data
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn in_bounds(&self, pos: &GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 &&
            (pos.x as u32) < self.width &&
            (pos.y as u32) < self.height
    }

    fn pos_to_index(&self, pos: &GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn cell(&self, pos: &GridPos) -> Option<&Cell> {
        self.pos_to_index(pos).map(|idx| &self.cells[idx])
    }

    pub fn cell_mut(&mut self, pos: &GridPos) -> Option<&mut Cell> {
        self.pos_to_index(pos).map(|idx| &mut self.cells[idx])
    }

    pub fn get_cell_owner(&self, pos: &GridPos) -> Option<PlayerId> {
        self.cell(pos).and_then(|c| c.owner)
    }

    pub fn set_cell_owner(&mut self, pos: &GridPos, owner: Option<PlayerId>) {
        if let Some(cell) = self.cell_mut(pos) {
            cell.owner = owner;
        }
    }

    pub fn get_cell_trace(&self, pos: &GridPos) -> Option<PlayerId> {
        self.cell(pos).and_then(|c| c.trace)
    }

    pub fn set_cell_trace(&mut self, pos: &GridPos, trace: Option<PlayerId>) {
        if let Some(cell) = self.cell_mut(pos) {
            cell.trace = trace;
        }
    }

    pub fn is_owned_by(&self, pos: &GridPos, player_id: PlayerId) -> bool {
        self.get_cell_owner(pos) == Some(player_id)
    }

    pub fn is_traced_by(&self, pos: &GridPos, player_id: PlayerId) -> bool {
        self.get_cell_trace(pos) == Some(player_id)
    }

    pub fn count_owned_by(&self, player_id: PlayerId) -> usize {
        self.cells.iter().filter(|c| c.owner == Some(player_id)).count()
    }

    pub fn count_traced_by(&self, player_id: PlayerId) -> usize {
        self.cells.iter().filter(|c| c.trace == Some(player_id)).count()
    }

    pub fn owned_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.owner.is_some()).count()
    }

    /// Removes every owner and trace mark belonging to `player_id`.
    /// Returns the number of owned and traced cells cleared.
    pub fn clear_player(&mut self, player_id: PlayerId) -> (usize, usize) {
        let mut owned = 0;
        let mut traced = 0;
        for cell in self.cells.iter_mut() {
            if cell.owner == Some(player_id) {
                cell.owner = None;
                owned += 1;
            }
            if cell.trace == Some(player_id) {
                cell.trace = None;
                traced += 1;
            }
        }
        (owned, traced)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("claimed_cells", &self.owned_cell_count())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Small recycled identifier, unique among active players
    pub id: PlayerId,
    /// Continuous position on the grid
    pub position: Position,
    /// Current movement direction
    pub direction: Direction,
    /// Whether an open trail is in progress
    pub tracing: bool,
    /// Cells visited since the current trail started
    pub bounds: BoundingBox,
    /// Number of cells owned
    pub score: u32,
    /// Player's color (RGBA packed as u32)
    pub color: u32,
}

impl Player {
    pub fn new(id: PlayerId, position: Position, color: u32) -> Self {
        Self {
            id,
            position,
            direction: Direction::default(),
            tracing: false,
            bounds: BoundingBox::around(position.cell()),
            score: 0,
            color,
        }
    }

    pub fn cell(&self) -> GridPos {
        self.position.cell()
    }
}

#[derive(Debug)]
pub struct GameState {
    /// Active players, iterated in ascending id order
    pub players: BTreeMap<PlayerId, Player>,
    /// External identity to player id
    pub identities: HashMap<ParticipantId, PlayerId>,
    /// Territory and trace grid
    pub grid: Grid,
}

impl GameState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            players: BTreeMap::new(),
            identities: HashMap::new(),
            grid: Grid::new(width, height),
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn player_id_of(&self, participant: &ParticipantId) -> Option<PlayerId> {
        self.identities
            .get(participant)
            .copied()
            .filter(|id| self.players.contains_key(id))
    }

    pub fn get_player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn total_score(&self) -> u64 {
        self.players.values().map(|p| p.score as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_discretizes_by_truncation() {
        assert_eq!(Position::new(3.99, 0.0).cell(), GridPos::new(3, 0));
        assert_eq!(Position::new(0.5, 7.000001).cell(), GridPos::new(0, 7));
    }

    #[test]
    fn test_direction_rotation() {
        assert_eq!(Direction::Up.turned_right(), Direction::Right);
        assert_eq!(Direction::Right.turned_right(), Direction::Down);
        assert_eq!(Direction::Down.turned_right(), Direction::Left);
        assert_eq!(Direction::Left.turned_right(), Direction::Up);

        for dir in [Direction::Up, Direction::Right, Direction::Down, Direction::Left] {
            assert_eq!(dir.turned_left().turned_right(), dir);
            assert_eq!(dir.turned_left().turned_left(), dir.turned_right().turned_right());
        }
    }

    #[test]
    fn test_bounding_box_include() {
        let mut bounds = BoundingBox::around(GridPos::new(5, 5));
        assert_eq!(bounds.area(), 1);

        bounds.include(GridPos::new(8, 4));
        bounds.include(GridPos::new(6, 7));

        assert_eq!(bounds.min_row, 4);
        assert_eq!(bounds.max_row, 7);
        assert_eq!(bounds.min_col, 5);
        assert_eq!(bounds.max_col, 8);
        assert_eq!(bounds.area(), 16);
        assert!(bounds.contains(GridPos::new(7, 6)));
        assert!(!bounds.contains(GridPos::new(9, 6)));
        assert_eq!(bounds.cells().count(), 16);
    }

    #[test]
    fn test_square_is_clipped() {
        let bounds = BoundingBox::square(GridPos::new(0, 9), 3, 10, 10);
        assert_eq!(bounds, BoundingBox { min_row: 8, max_row: 9, min_col: 0, max_col: 1 });

        let single = BoundingBox::square(GridPos::new(4, 4), 1, 10, 10);
        assert_eq!(single, BoundingBox::around(GridPos::new(4, 4)));
    }

    #[test]
    fn test_even_square_has_exact_side() {
        let two = BoundingBox::square(GridPos::new(4, 4), 2, 10, 10);
        assert_eq!(two, BoundingBox { min_row: 4, max_row: 5, min_col: 4, max_col: 5 });
        assert_eq!(two.area(), 4);

        let four = BoundingBox::square(GridPos::new(4, 4), 4, 10, 10);
        assert_eq!(four, BoundingBox { min_row: 3, max_row: 6, min_col: 3, max_col: 6 });

        let corner = BoundingBox::square(GridPos::new(9, 9), 2, 10, 10);
        assert_eq!(corner, BoundingBox::around(GridPos::new(9, 9)));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::Up.delta(), (0.0, -1.0));
        assert_eq!(Direction::Right.delta(), (1.0, 0.0));
        assert_eq!(Direction::Down.delta(), (0.0, 1.0));
        assert_eq!(Direction::Left.delta(), (-1.0, 0.0));
    }

    #[test]
    fn test_grid_cells() {
        let mut grid = Grid::new(10, 10);
        let pos = GridPos::new(5, 5);

        assert!(grid.in_bounds(&pos));
        assert!(!grid.in_bounds(&GridPos::new(-1, 0)));
        assert!(!grid.in_bounds(&GridPos::new(10, 5)));

        assert_eq!(grid.get_cell_owner(&pos), None);
        grid.set_cell_owner(&pos, Some(1));
        grid.set_cell_trace(&pos, Some(2));
        assert!(grid.is_owned_by(&pos, 1));
        assert!(grid.is_traced_by(&pos, 2));
        assert_eq!(grid.cell(&GridPos::new(10, 10)), None);
    }

    #[test]
    fn test_clear_player() {
        let mut grid = Grid::new(10, 10);
        for x in 0..4 {
            grid.set_cell_owner(&GridPos::new(x, 0), Some(1));
        }
        grid.set_cell_trace(&GridPos::new(0, 1), Some(1));
        grid.set_cell_owner(&GridPos::new(0, 2), Some(2));

        assert_eq!(grid.clear_player(1), (4, 1));
        assert_eq!(grid.count_owned_by(1), 0);
        assert_eq!(grid.count_traced_by(1), 0);
        assert_eq!(grid.count_owned_by(2), 1);
    }

    #[test]
    fn test_player_state() {
        let player = Player::new(1, Position::new(2.0, 3.0), 0xFF0000FF);
        assert!(!player.tracing);
        assert_eq!(player.direction, Direction::Right);
        assert_eq!(player.bounds, BoundingBox::around(GridPos::new(2, 3)));
    }

    #[test]
    fn test_game_state() {
        let state = GameState::new(100, 100);
        assert_eq!(state.players.len(), 0);
        assert_eq!(state.grid.dimensions(), (100, 100));
        assert_eq!(state.total_score(), 0);
    }
}
