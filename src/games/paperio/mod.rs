pub mod config;
pub mod fill;
pub mod snapshot;
pub mod state;
pub mod systems;

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::game::traits::{Game, ParticipantId, PlayerId, PlayerService, TickResult};

pub use config::{PaperioConfig, get_player_color};
pub use snapshot::{GameSnapshot, PlayerView, ScoreEntry};
pub use state::{BoundingBox, Cell, Direction, GameState, Grid, GridPos, Player, Position};
pub use systems::Turn;

pub struct PaperioGame {
    /// Current game state
    state: GameState,
    /// Game configuration
    config: PaperioConfig,
    /// Current tick number
    tick: u64,
    /// Simulation advances only while running
    running: bool,
    /// Set once; the scheduler stops at the next tick
    closing: bool,
    /// Spawn placement
    rng: ChaCha8Rng,
}

impl PaperioGame {
    pub fn new() -> Self {
        Self::with_config(PaperioConfig::default())
    }

    pub fn with_config(config: PaperioConfig) -> Self {
        Self {
            state: GameState::new(config.grid_width, config.grid_height),
            running: !config.start_paused,
            closing: false,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            tick: 0,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn config(&self) -> &PaperioConfig {
        &self.config
    }

    pub fn player_id(&self, participant: &ParticipantId) -> Option<PlayerId> {
        self.state.player_id_of(participant)
    }

    pub fn scoreboard(&self) -> Vec<ScoreEntry> {
        systems::scoreboard(&self.state)
    }

    /// Adds a participant at a chosen cell. No-op if already playing.
    pub fn join_at(&mut self, participant: ParticipantId, spawn_pos: GridPos) -> PlayerId {
        if let Some(player_id) = self.state.player_id_of(&participant) {
            return player_id;
        }

        let player_id = systems::allocate_player_id(&self.state);
        let (width, height) = self.state.grid.dimensions();
        let footprint = BoundingBox::square(spawn_pos, self.config.starting_territory_size, width, height);

        let mut player = Player::new(player_id, Position::at_cell(spawn_pos), get_player_color(player_id));
        player.bounds = footprint;
        self.state.players.insert(player_id, player);
        self.state.identities.insert(participant, player_id);

        let granted = systems::grant_starting_territory(&mut self.state, player_id, &footprint);

        tracing::info!(
            "Player {} ({}) joined at {:?} with {} cells",
            player_id, participant, spawn_pos, granted
        );

        player_id
    }

    fn turn(&mut self, participant: ParticipantId, turn: Turn) {
        let Some(player_id) = self.state.player_id_of(&participant) else {
            return;
        };
        if let Ok(direction) = systems::turn_player(&mut self.state, player_id, turn) {
            tracing::trace!("Player {} now facing {:?}", player_id, direction);
        }
    }
}

impl Default for PaperioGame {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerService for PaperioGame {
    fn join(&mut self, participant: ParticipantId) {
        if self.state.player_id_of(&participant).is_some() {
            return;
        }
        let spawn_pos = systems::find_spawn_position(&self.state, &self.config, &mut self.rng);
        self.join_at(participant, spawn_pos);
    }

    fn turn_left(&mut self, participant: ParticipantId) {
        self.turn(participant, Turn::Left);
    }

    fn turn_right(&mut self, participant: ParticipantId) {
        self.turn(participant, Turn::Right);
    }

    fn toggle_running(&mut self) {
        self.running = !self.running;
        tracing::info!("Simulation {}", if self.running { "resumed" } else { "paused" });
    }

    fn close(&mut self) {
        if !self.closing {
            tracing::info!("Game closing after {} ticks", self.tick);
        }
        self.closing = true;
    }
}

impl Game for PaperioGame {
    fn tick(&mut self) -> TickResult {
        let mut result = TickResult::default();
        if !self.running {
            return result;
        }

        self.tick += 1;
        result.simulated = true;

        systems::update_movement(&mut self.state, &self.config);
        let update = systems::update_cells(&mut self.state);

        for &(player_id, cells) in &update.claims {
            tracing::info!("Player {} claimed {} cells", player_id, cells);
        }

        result.eliminated = update.eliminated;
        result.claims = update.claims;
        result
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::capture(&self.state, self.tick, self.running)
    }

    fn tick_rate(&self) -> Duration {
        self.config.tick_duration()
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_closing(&self) -> bool {
        self.closing
    }
}
