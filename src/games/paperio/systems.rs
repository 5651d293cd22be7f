use rand::Rng;

use super::config::{EDGE_EPSILON, PaperioConfig};
use super::fill;
use super::snapshot::ScoreEntry;
use super::state::{BoundingBox, Direction, GameState, GridPos, Player};
use crate::game::traits::{GameError, PlayerId};
use crate::protocol::common;

/// A steering command relative to the current facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// What the trace/claim pass did this tick.
#[derive(Debug, Default)]
pub struct CellUpdate {
    /// Players whose trace was crossed
    pub eliminated: Vec<PlayerId>,
    /// Closed trails as (player, newly owned cells)
    pub claims: Vec<(PlayerId, usize)>,
}

pub fn update_movement(state: &mut GameState, config: &PaperioConfig) {
    let (width, height) = state.grid.dimensions();
    let delta = config.frame_delta();

    for player in state.players.values_mut() {
        move_player(player, delta, width, height);
    }
}

/// Advances one player along its facing direction, clamped to `[0, dim)`.
pub fn move_player(player: &mut Player, delta: f64, width: u32, height: u32) {
    let max_x = width as f64 - EDGE_EPSILON;
    let max_y = height as f64 - EDGE_EPSILON;
    let (dx, dy) = player.direction.delta();
    let pos = &mut player.position;

    pos.x = (pos.x + dx * delta).clamp(0.0, max_x);
    pos.y = (pos.y + dy * delta).clamp(0.0, max_y);
}

pub fn turn_player(state: &mut GameState, player_id: PlayerId, turn: Turn) -> Result<Direction, GameError> {
    let player = state.players.get_mut(&player_id)
        .ok_or(GameError::PlayerNotFound(player_id))?;

    player.direction = match turn {
        Turn::Left => player.direction.turned_left(),
        Turn::Right => player.direction.turned_right(),
    };
    Ok(player.direction)
}

/// Runs the trace/claim state machine for every player in ascending id order.
///
/// Two players contesting cells in the same tick resolve in that order: the
/// lower id moves first and may eliminate the higher id before it is evaluated.
pub fn update_cells(state: &mut GameState) -> CellUpdate {
    let mut update = CellUpdate::default();

    for player_id in state.get_player_ids() {
        update_player_cell(state, player_id, &mut update);
    }

    update
}

fn update_player_cell(state: &mut GameState, player_id: PlayerId, update: &mut CellUpdate) {
    // Already eliminated earlier in this tick.
    let Some(player) = state.players.get_mut(&player_id) else {
        return;
    };

    let pos = player.cell();
    player.bounds.include(pos);
    let was_tracing = player.tracing;

    let Some(cell) = state.grid.cell(&pos).copied() else {
        tracing::error!("Player {} at {:?} is outside the grid", player_id, pos);
        return;
    };

    if let Some(victim) = cell.trace.filter(|&id| id != player_id) {
        if eliminate_player(state, victim) {
            tracing::info!("Player {} crossed the trail of player {}", player_id, victim);
            update.eliminated.push(victim);
        }
    }

    if state.grid.is_owned_by(&pos, player_id) {
        if was_tracing {
            let claimed = close_trace(state, player_id);
            update.claims.push((player_id, claimed));
        }
        // At home the excursion box collapses to the current cell, so the next
        // trail's box starts from the cell it leaves from.
        if let Some(player) = state.players.get_mut(&player_id) {
            player.bounds = BoundingBox::around(pos);
        }
    } else {
        state.grid.set_cell_trace(&pos, Some(player_id));
        if let Some(player) = state.players.get_mut(&player_id) {
            player.tracing = true;
        }
    }
}

/// Seals the player's current excursion: enclosed cells change hands and the
/// player's trail marks inside the box are cleared. Returns the number of
/// cells newly owned.
pub fn close_trace(state: &mut GameState, player_id: PlayerId) -> usize {
    let Some(bounds) = state.get_player(player_id).map(|p| p.bounds) else {
        return 0;
    };

    let enclosed = fill::enclosed_cells(&state.grid, player_id, &bounds);
    let GameState { grid, players, .. } = state;

    for pos in &enclosed {
        if let Some(previous) = grid.get_cell_owner(pos) {
            match players.get_mut(&previous) {
                Some(victim) => victim.score = victim.score.saturating_sub(1),
                None => tracing::error!("Cell {:?} owned by unknown player {}", pos, previous),
            }
        }
        grid.set_cell_owner(pos, Some(player_id));
    }

    for pos in bounds.cells() {
        if grid.is_traced_by(&pos, player_id) {
            grid.set_cell_trace(&pos, None);
        }
    }

    if let Some(player) = players.get_mut(&player_id) {
        player.score += enclosed.len() as u32;
        player.tracing = false;
        tracing::debug!(
            "Player {} closed a {}x{} excursion, +{} cells (score {})",
            player_id,
            bounds.cols(),
            bounds.rows(),
            enclosed.len(),
            player.score
        );
    }

    enclosed.len()
}

/// Removes a player, its identity mapping, and every trace and owned cell it
/// holds. Returns false if no such player is active.
pub fn eliminate_player(state: &mut GameState, player_id: PlayerId) -> bool {
    let Some(player) = state.players.remove(&player_id) else {
        tracing::error!("Attempted to eliminate unknown player {}", player_id);
        return false;
    };

    state.identities.retain(|_, id| *id != player_id);
    let (owned, traced) = state.grid.clear_player(player_id);

    tracing::info!(
        "Player {} eliminated with score {} ({} owned, {} traced cells cleared)",
        player_id,
        player.score,
        owned,
        traced
    );
    true
}

/// Smallest positive id not held by an active player.
pub fn allocate_player_id(state: &GameState) -> PlayerId {
    let count = state.players.len() as PlayerId;
    (1..=count)
        .find(|id| !state.players.contains_key(id))
        .unwrap_or(count + 1)
}

/// Picks a random spawn cell whose starting footprint is entirely free.
/// Falls back to the last candidate if none is found.
pub fn find_spawn_position<R: Rng>(state: &GameState, config: &PaperioConfig, rng: &mut R) -> GridPos {
    let (width, height) = state.grid.dimensions();
    let mut candidate = GridPos::new(width as i32 / 2, height as i32 / 2);

    for _ in 0..config.spawn_attempts.max(1) {
        candidate = GridPos::new(rng.gen_range(0..width as i32), rng.gen_range(0..height as i32));
        let footprint = BoundingBox::square(candidate, config.starting_territory_size, width, height);
        let free = footprint
            .cells()
            .all(|pos| state.grid.cell(&pos).is_some_and(|cell| cell.is_empty()));
        if free {
            return candidate;
        }
    }

    tracing::warn!(
        "No free spawn area after {} attempts, spawning at {:?}",
        config.spawn_attempts,
        candidate
    );
    candidate
}

/// Gives every footprint cell to `player_id`, taking it from any prior owner.
/// Returns the number of cells granted.
pub fn grant_starting_territory(
    state: &mut GameState,
    player_id: PlayerId,
    footprint: &BoundingBox,
) -> u32 {
    let GameState { grid, players, .. } = state;
    let mut granted = 0;

    for pos in footprint.cells() {
        if !grid.in_bounds(&pos) {
            continue;
        }
        match grid.get_cell_owner(&pos) {
            Some(owner) if owner == player_id => continue,
            Some(owner) => {
                if let Some(previous) = players.get_mut(&owner) {
                    previous.score = previous.score.saturating_sub(1);
                }
            }
            None => {}
        }
        grid.set_cell_owner(&pos, Some(player_id));
        granted += 1;
    }

    if let Some(player) = players.get_mut(&player_id) {
        player.score += granted;
    }
    granted
}

/// Active players by descending score, ties broken by ascending id.
pub fn scoreboard(state: &GameState) -> Vec<ScoreEntry> {
    let mut entries: Vec<ScoreEntry> = state
        .players
        .values()
        .map(|p| ScoreEntry {
            player_id: p.id,
            score: p.score,
            color: p.color,
        })
        .collect();

    entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.player_id.cmp(&b.player_id)));
    entries
}

pub fn turn_from_proto(value: i32) -> Result<Turn, GameError> {
    match common::Turn::try_from(value) {
        Ok(common::Turn::Left) => Ok(Turn::Left),
        Ok(common::Turn::Right) => Ok(Turn::Right),
        _ => Err(GameError::InvalidInput(format!("Unknown turn {}", value))),
    }
}

pub fn direction_to_proto(direction: Direction) -> common::Direction {
    match direction {
        Direction::Up => common::Direction::Up,
        Direction::Right => common::Direction::Right,
        Direction::Down => common::Direction::Down,
        Direction::Left => common::Direction::Left,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::paperio::state::Position;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// One cell per tick keeps scenarios readable.
    fn step_config() -> PaperioConfig {
        PaperioConfig {
            grid_width: 10,
            grid_height: 10,
            tick_rate_hz: 10,
            speed_cells_per_second: 10.0,
            ..Default::default()
        }
    }

    fn add_player(state: &mut GameState, player_id: PlayerId, cell: GridPos) {
        let player = Player::new(player_id, Position::at_cell(cell), 0xFFFFFFFF);
        state.players.insert(player_id, player);
        grant_starting_territory(state, player_id, &BoundingBox::around(cell));
    }

    fn step(state: &mut GameState, config: &PaperioConfig) -> CellUpdate {
        update_movement(state, config);
        update_cells(state)
    }

    fn steer(state: &mut GameState, player_id: PlayerId, turn: Turn, ticks: usize, config: &PaperioConfig) {
        turn_player(state, player_id, turn).unwrap();
        for _ in 0..ticks {
            step(state, config);
        }
    }

    fn assert_score_conserved(state: &GameState) {
        assert_eq!(state.total_score(), state.grid.owned_cell_count() as u64);
    }

    #[test]
    fn test_move_player_directions() {
        let mut player = Player::new(1, Position::new(5.0, 5.0), 0);

        move_player(&mut player, 0.5, 10, 10);
        assert_eq!(player.position, Position::new(5.5, 5.0));

        player.direction = Direction::Up;
        move_player(&mut player, 0.5, 10, 10);
        assert_eq!(player.position, Position::new(5.5, 4.5));

        player.direction = Direction::Left;
        move_player(&mut player, 1.5, 10, 10);
        assert_eq!(player.position, Position::new(4.0, 4.5));

        player.direction = Direction::Down;
        move_player(&mut player, 0.5, 10, 10);
        assert_eq!(player.position, Position::new(4.0, 5.0));
    }

    #[test]
    fn test_movement_is_clamped() {
        let mut player = Player::new(1, Position::new(9.5, 0.2), 0);

        for _ in 0..10 {
            move_player(&mut player, 0.3, 10, 10);
        }
        assert!(player.position.x < 10.0);
        assert_eq!(player.cell().x, 9);

        player.direction = Direction::Up;
        for _ in 0..10 {
            move_player(&mut player, 0.3, 10, 10);
        }
        assert_eq!(player.position.y, 0.0);

        player.direction = Direction::Down;
        for _ in 0..100 {
            move_player(&mut player, 0.3, 10, 10);
            assert!(player.position.y < 10.0);
        }
        assert_eq!(player.cell().y, 9);
    }

    #[test]
    fn test_turn_applies_on_next_step() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(5, 5));

        assert_eq!(turn_player(&mut state, 1, Turn::Left).unwrap(), Direction::Up);
        // Turning alone does not move the player.
        assert_eq!(state.get_player(1).unwrap().cell(), GridPos::new(5, 5));

        update_movement(&mut state, &config);
        assert_eq!(state.get_player(1).unwrap().cell(), GridPos::new(5, 4));

        assert_eq!(turn_player(&mut state, 1, Turn::Right).unwrap(), Direction::Right);
        assert_eq!(turn_player(&mut state, 7, Turn::Right), Err(GameError::PlayerNotFound(7)));
    }

    #[test]
    fn test_leaving_territory_starts_trace() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(5, 5));

        step(&mut state, &config);

        let player = state.get_player(1).unwrap();
        assert!(player.tracing);
        assert!(state.grid.is_traced_by(&GridPos::new(6, 5), 1));
        assert_eq!(player.bounds, BoundingBox { min_row: 5, max_row: 5, min_col: 5, max_col: 6 });
    }

    #[test]
    fn test_loop_closes_and_claims_interior() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(5, 5));
        assert_eq!(state.get_player(1).unwrap().score, 1);

        // Right 4, down 2, left 4, up 2 back into the spawn cell.
        for _ in 0..4 {
            step(&mut state, &config);
        }
        steer(&mut state, 1, Turn::Right, 2, &config);
        steer(&mut state, 1, Turn::Right, 4, &config);
        assert!(state.get_player(1).unwrap().tracing);
        turn_player(&mut state, 1, Turn::Right).unwrap();
        step(&mut state, &config);
        let update = step(&mut state, &config);

        let player = state.get_player(1).unwrap();
        assert_eq!(player.cell(), GridPos::new(5, 5));
        assert!(!player.tracing);
        assert_eq!(update.claims, vec![(1, 14)]);
        assert_eq!(player.score, 15);

        for y in 5..=7 {
            for x in 5..=9 {
                assert!(state.grid.is_owned_by(&GridPos::new(x, y), 1), "({}, {})", x, y);
            }
        }
        assert_eq!(state.grid.count_traced_by(1), 0);
        assert_eq!(state.grid.count_owned_by(1), 15);
        assert_score_conserved(&state);
    }

    #[test]
    fn test_open_excursion_claims_only_trail() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(2, 2));
        grant_starting_territory(&mut state, 1, &BoundingBox { min_row: 2, max_row: 2, min_col: 2, max_col: 6 });

        // Up 2, right 4, down 2: a U whose opening is sealed by owned cells.
        turn_player(&mut state, 1, Turn::Left).unwrap();
        for _ in 0..2 {
            step(&mut state, &config);
        }
        steer(&mut state, 1, Turn::Right, 4, &config);
        steer(&mut state, 1, Turn::Right, 2, &config);

        let player = state.get_player(1).unwrap();
        assert!(!player.tracing);
        // 3x5 box, all of it enclosed by trail plus the owned bottom row.
        assert_eq!(player.score, 15);
        assert!(state.grid.is_owned_by(&GridPos::new(4, 1), 1));
        assert_score_conserved(&state);
    }

    #[test]
    fn test_crossing_foreign_trace_eliminates_owner() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(1, 1));
        add_player(&mut state, 2, GridPos::new(5, 0));
        let participant = uuid::Uuid::new_v4();
        state.identities.insert(participant, 1);
        state.get_player_mut(2).unwrap().direction = Direction::Left;

        // Player 1 lays a trail along row 1 while player 2 heads left along row 0.
        step(&mut state, &config);
        step(&mut state, &config);
        assert!(state.grid.is_traced_by(&GridPos::new(3, 1), 1));
        assert_eq!(state.get_player(2).unwrap().cell(), GridPos::new(3, 0));

        // Player 2 turns down into player 1's trail at (3, 1).
        state.get_player_mut(1).unwrap().direction = Direction::Down;
        turn_player(&mut state, 2, Turn::Left).unwrap();
        let update = step(&mut state, &config);

        assert_eq!(update.eliminated, vec![1]);
        assert!(state.get_player(1).is_none());
        assert!(state.player_id_of(&participant).is_none());
        assert_eq!(state.grid.count_traced_by(1), 0);
        assert_eq!(state.grid.count_owned_by(1), 0);
        // The mover keeps going and its trail now runs through the cell.
        assert!(state.grid.is_traced_by(&GridPos::new(3, 1), 2));
        assert!(state.get_player(2).unwrap().tracing);
        assert_score_conserved(&state);
    }

    #[test]
    fn test_lower_id_resolves_first() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(0, 0));
        add_player(&mut state, 2, GridPos::new(0, 2));

        // Both leave home, then land on the same contested cell.
        step(&mut state, &config);
        state.get_player_mut(1).unwrap().position = Position::new(1.0, 1.0);
        state.get_player_mut(2).unwrap().position = Position::new(1.0, 1.0);
        state.grid.set_cell_trace(&GridPos::new(1, 1), Some(2));

        let update = update_cells(&mut state);

        assert_eq!(update.eliminated, vec![2]);
        assert!(state.get_player(1).is_some());
        assert!(state.get_player(2).is_none());
    }

    #[test]
    fn test_walking_on_foreign_territory_does_not_eliminate() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(0, 0));
        add_player(&mut state, 2, GridPos::new(1, 0));

        let update = step(&mut state, &config);

        assert!(update.eliminated.is_empty());
        let cell = state.grid.cell(&GridPos::new(1, 0)).copied().unwrap();
        assert_eq!(cell.owner, Some(2));
        assert_eq!(cell.trace, Some(1));
        assert_eq!(state.get_player(2).unwrap().score, 1);
    }

    #[test]
    fn test_closure_steals_enclosed_foreign_cells() {
        let config = step_config();
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(2, 2));
        add_player(&mut state, 2, GridPos::new(8, 8));
        // An island of player 2's territory inside player 1's future loop.
        grant_starting_territory(&mut state, 2, &BoundingBox::around(GridPos::new(4, 3)));
        assert_eq!(state.get_player(2).unwrap().score, 2);

        // Right 4, down 2, left 4, up 2 back home.
        for _ in 0..4 {
            step(&mut state, &config);
        }
        steer(&mut state, 1, Turn::Right, 2, &config);
        steer(&mut state, 1, Turn::Right, 4, &config);
        steer(&mut state, 1, Turn::Right, 2, &config);

        assert!(state.grid.is_owned_by(&GridPos::new(4, 3), 1));
        assert_eq!(state.get_player(2).unwrap().score, 1);
        assert_eq!(state.get_player(1).unwrap().score, 15);
        assert_score_conserved(&state);
    }

    #[test]
    fn test_eliminate_unknown_player() {
        let mut state = GameState::new(10, 10);
        assert!(!eliminate_player(&mut state, 3));
    }

    #[test]
    fn test_allocate_player_id_reuses_gaps() {
        let mut state = GameState::new(10, 10);
        assert_eq!(allocate_player_id(&state), 1);

        add_player(&mut state, 1, GridPos::new(0, 0));
        add_player(&mut state, 2, GridPos::new(1, 0));
        add_player(&mut state, 3, GridPos::new(2, 0));
        assert_eq!(allocate_player_id(&state), 4);

        eliminate_player(&mut state, 2);
        assert_eq!(allocate_player_id(&state), 2);
    }

    #[test]
    fn test_grant_starting_territory_takes_from_prior_owner() {
        let mut state = GameState::new(10, 10);
        add_player(&mut state, 1, GridPos::new(4, 4));
        state.players.insert(2, Player::new(2, Position::new(5.0, 5.0), 0));

        let footprint = BoundingBox::square(GridPos::new(5, 5), 3, 10, 10);
        let granted = grant_starting_territory(&mut state, 2, &footprint);

        assert_eq!(granted, 9);
        assert_eq!(state.get_player(1).unwrap().score, 0);
        assert_eq!(state.get_player(2).unwrap().score, 9);
        assert!(state.grid.is_owned_by(&GridPos::new(4, 4), 2));
        assert_score_conserved(&state);
    }

    #[test]
    fn test_spawn_avoids_claimed_cells() {
        let config = PaperioConfig {
            starting_territory_size: 1,
            spawn_attempts: 5000,
            ..step_config()
        };
        let mut state = GameState::new(10, 10);
        // Claim everything except a single cell.
        for y in 0..10 {
            for x in 0..10 {
                if (x, y) != (7, 3) {
                    state.grid.set_cell_owner(&GridPos::new(x, y), Some(9));
                }
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(find_spawn_position(&state, &config, &mut rng), GridPos::new(7, 3));
    }

    #[test]
    fn test_scoreboard_ordering() {
        let mut state = GameState::new(10, 10);
        for (id, score) in [(1, 3), (2, 7), (3, 3), (4, 0)] {
            let mut player = Player::new(id, Position::default(), 0);
            player.score = score;
            state.players.insert(id, player);
        }

        let order: Vec<PlayerId> = scoreboard(&state).iter().map(|e| e.player_id).collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_turn_from_proto() {
        assert_eq!(turn_from_proto(1), Ok(Turn::Left));
        assert_eq!(turn_from_proto(2), Ok(Turn::Right));
        assert!(turn_from_proto(0).is_err());
        assert!(turn_from_proto(99).is_err());
    }

    #[test]
    fn test_direction_to_proto() {
        assert_eq!(direction_to_proto(Direction::Up), common::Direction::Up);
        assert_eq!(direction_to_proto(Direction::Right), common::Direction::Right);
        assert_eq!(direction_to_proto(Direction::Down), common::Direction::Down);
        assert_eq!(direction_to_proto(Direction::Left), common::Direction::Left);
    }
}
