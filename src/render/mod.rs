//! Rendering collaborators fed by the tick loop.

use std::sync::Arc;

use tokio::sync::watch;

use crate::game::traits::Renderer;
use crate::games::paperio::GameSnapshot;

/// Logs the scoreboard periodically and changed-cell counts per tick.
pub struct TracingRenderer {
    width: u32,
    height: u32,
    log_every: u64,
    previous: Option<GameSnapshot>,
}

impl TracingRenderer {
    pub fn new(width: u32, height: u32, log_every: u64) -> Self {
        Self {
            width,
            height,
            log_every: log_every.max(1),
            previous: None,
        }
    }
}

impl Renderer for TracingRenderer {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn refresh(&mut self, snapshot: &GameSnapshot) {
        if let Some(previous) = &self.previous {
            let changed = snapshot.changed_cells(previous).len();
            if changed > 0 {
                tracing::trace!("Tick {}: {} cells changed", snapshot.tick, changed);
            }
        }

        if snapshot.running && snapshot.tick % self.log_every == 0 && !snapshot.scoreboard.is_empty() {
            let board: Vec<String> = snapshot
                .scoreboard
                .iter()
                .map(|e| format!("#{}={}", e.player_id, e.score))
                .collect();
            tracing::info!("Tick {} scoreboard: {}", snapshot.tick, board.join(" "));
        }

        self.previous = Some(snapshot.clone());
    }
}

/// Publishes each snapshot on a watch channel. Slow readers only ever see
/// the latest one.
pub struct WatchRenderer {
    width: u32,
    height: u32,
    tx: watch::Sender<Arc<GameSnapshot>>,
}

impl WatchRenderer {
    pub fn new(width: u32, height: u32) -> (Self, watch::Receiver<Arc<GameSnapshot>>) {
        let empty = GameSnapshot {
            tick: 0,
            width,
            height,
            running: false,
            cells: Vec::new(),
            players: Vec::new(),
            scoreboard: Vec::new(),
        };
        let (tx, rx) = watch::channel(Arc::new(empty));
        (Self { width, height, tx }, rx)
    }
}

impl Renderer for WatchRenderer {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn refresh(&mut self, snapshot: &GameSnapshot) {
        self.tx.send_replace(Arc::new(snapshot.clone()));
    }
}

/// Feeds two renderers; the first one decides the viewport.
impl<A: Renderer, B: Renderer> Renderer for (A, B) {
    fn viewport_size(&self) -> (u32, u32) {
        self.0.viewport_size()
    }

    fn refresh(&mut self, snapshot: &GameSnapshot) {
        self.0.refresh(snapshot);
        self.1.refresh(snapshot);
    }
}
