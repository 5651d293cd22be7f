use std::time::Duration;

use uuid::Uuid;

use crate::games::paperio::snapshot::GameSnapshot;

pub type PlayerId = u32;

/// Stable external identity of a remote participant.
pub type ParticipantId = Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Player not found in game state
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),
    /// Invalid input received
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Game is not in a valid state for the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

#[derive(Debug, Default)]
pub struct TickResult {
    /// Whether the simulation advanced (false while paused)
    pub simulated: bool,
    /// Players removed this tick because their trace was crossed
    pub eliminated: Vec<PlayerId>,
    /// Trace closures this tick as (player, newly owned cells)
    pub claims: Vec<(PlayerId, usize)>,
}

/// Operations input collaborators are allowed to call.
///
/// None of these report failure: unknown participants and duplicate joins
/// are silently ignored.
pub trait PlayerService {
    fn join(&mut self, participant: ParticipantId);
    fn turn_left(&mut self, participant: ParticipantId);
    fn turn_right(&mut self, participant: ParticipantId);
    fn toggle_running(&mut self);
    fn close(&mut self);
}

/// Rendering collaborator driven by the tick scheduler.
pub trait Renderer: Send {
    /// Grid size to allocate, queried once at startup.
    fn viewport_size(&self) -> (u32, u32);

    /// Called once per tick with a snapshot that is never mutated afterwards.
    fn refresh(&mut self, snapshot: &GameSnapshot);
}

/// A fixed-rate simulation the scheduler can drive.
pub trait Game: PlayerService + Send {
    fn tick(&mut self) -> TickResult;
    fn snapshot(&self) -> GameSnapshot;
    fn tick_rate(&self) -> Duration;
    fn is_running(&self) -> bool;
    fn is_closing(&self) -> bool;
}
