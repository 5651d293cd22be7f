use super::state::{Cell, Direction, GameState, GridPos, Position};
use super::systems;
use crate::game::traits::PlayerId;
use crate::protocol::server::{Frame, PlayerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    pub player_id: PlayerId,
    pub score: u32,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub position: Position,
    pub direction: Direction,
    pub tracing: bool,
    pub score: u32,
    pub color: u32,
}

/// Deep copy of the game at the end of a tick, handed to renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub tick: u64,
    pub width: u32,
    pub height: u32,
    pub running: bool,
    /// Row-major cells
    pub cells: Vec<Cell>,
    /// Active players in ascending id order
    pub players: Vec<PlayerView>,
    pub scoreboard: Vec<ScoreEntry>,
}

impl GameSnapshot {
    pub fn capture(state: &GameState, tick: u64, running: bool) -> Self {
        let (width, height) = state.grid.dimensions();
        Self {
            tick,
            width,
            height,
            running,
            cells: state.grid.cells().to_vec(),
            players: state
                .players
                .values()
                .map(|p| PlayerView {
                    id: p.id,
                    position: p.position,
                    direction: p.direction,
                    tracing: p.tracing,
                    score: p.score,
                    color: p.color,
                })
                .collect(),
            scoreboard: systems::scoreboard(state),
        }
    }

    pub fn cell(&self, pos: GridPos) -> Option<&Cell> {
        if pos.x < 0 || pos.y < 0 || pos.x as u32 >= self.width || pos.y as u32 >= self.height {
            return None;
        }
        self.cells.get((pos.y as u32 * self.width + pos.x as u32) as usize)
    }

    /// Cells that differ from `previous`. Every cell is reported when the
    /// dimensions differ.
    pub fn changed_cells(&self, previous: &GameSnapshot) -> Vec<(GridPos, Cell)> {
        let same_shape = self.width == previous.width && self.height == previous.height;
        let width = self.width.max(1) as usize;

        self.cells
            .iter()
            .enumerate()
            .filter(|(idx, cell)| !same_shape || previous.cells.get(*idx) != Some(*cell))
            .map(|(idx, cell)| (GridPos::new((idx % width) as i32, (idx / width) as i32), *cell))
            .collect()
    }

    pub fn to_frame(&self) -> Frame {
        Frame {
            tick: self.tick,
            width: self.width,
            height: self.height,
            owners: self.cells.iter().map(|c| c.owner.unwrap_or(0)).collect(),
            traces: self.cells.iter().map(|c| c.trace.unwrap_or(0)).collect(),
            players: self
                .players
                .iter()
                .map(|p| PlayerState {
                    player_id: p.id,
                    x: p.position.x as f32,
                    y: p.position.y as f32,
                    direction: systems::direction_to_proto(p.direction) as i32,
                    tracing: p.tracing,
                    score: p.score,
                    color: p.color,
                })
                .collect(),
            running: self.running,
        }
    }
}
