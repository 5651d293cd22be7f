use std::time::Duration;

use crate::game::traits::PlayerId;

/// Keeps the upper clamp strictly below the far edge so truncation never
/// produces an out-of-range index.
pub const EDGE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct PaperioConfig {
    /// Grid width in cells
    pub grid_width: u32,
    /// Grid height in cells
    pub grid_height: u32,
    /// Simulation tick rate in Hz (ticks per second)
    pub tick_rate_hz: u32,
    /// Player speed in cells per second
    pub speed_cells_per_second: f64,
    /// Side of the square claimed on spawn (1 = single cell)
    pub starting_territory_size: u32,
    /// Random spawn candidates tried before accepting an occupied footprint
    pub spawn_attempts: u32,
    /// Seed for spawn placement
    pub rng_seed: u64,
    /// Whether the simulation starts paused
    pub start_paused: bool,
}

impl PaperioConfig {
    pub fn with_grid_size(width: u32, height: u32) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate_hz.max(1) as u64)
    }

    /// Distance travelled along the facing direction each tick.
    pub fn frame_delta(&self) -> f64 {
        self.speed_cells_per_second / self.tick_rate_hz.max(1) as f64
    }
}

impl Default for PaperioConfig {
    fn default() -> Self {
        Self {
            grid_width: 100,
            grid_height: 100,
            tick_rate_hz: 100,
            speed_cells_per_second: 10.0,
            starting_territory_size: 1,
            spawn_attempts: 32,
            rng_seed: 0x5eed,
            start_paused: false,
        }
    }
}

/// RGBA fill colors, handed out by player id.
pub const PLAYER_COLORS: [u32; 12] = [
    0xE6194BFF, // Red
    0x3CB44BFF, // Green
    0x4363D8FF, // Blue
    0xF58231FF, // Orange
    0x911EB4FF, // Purple
    0x42D4F4FF, // Cyan
    0xF032E6FF, // Magenta
    0xBFEF45FF, // Lime
    0x469990FF, // Teal
    0x9A6324FF, // Brown
    0x800000FF, // Maroon
    0x000075FF, // Navy
];

/// Ids are recycled, so a returning id gets the same color as its previous holder.
/// Id 1 takes the first entry.
pub fn get_player_color(player_id: PlayerId) -> u32 {
    PLAYER_COLORS[(player_id.wrapping_sub(1) as usize) % PLAYER_COLORS.len()]
}
