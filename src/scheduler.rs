//! Fixed-rate tick loop and the lock-guarded handle input contexts use.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{MissedTickBehavior, interval};

use crate::game::traits::{Game, ParticipantId, Renderer};

/// Shared access to a game for input contexts.
///
/// Every operation holds the lock only for the mutation itself.
pub struct GameHandle<G> {
    inner: Arc<Mutex<G>>,
}

impl<G> Clone for GameHandle<G> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<G: Game> GameHandle<G> {
    pub fn new(game: G) -> Self {
        Self {
            inner: Arc::new(Mutex::new(game)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, G> {
        self.inner.lock().await
    }

    pub async fn join(&self, participant: ParticipantId) {
        self.inner.lock().await.join(participant);
    }

    pub async fn turn_left(&self, participant: ParticipantId) {
        self.inner.lock().await.turn_left(participant);
    }

    pub async fn turn_right(&self, participant: ParticipantId) {
        self.inner.lock().await.turn_right(participant);
    }

    pub async fn toggle_running(&self) {
        self.inner.lock().await.toggle_running();
    }

    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}

/// Drives the game until it is closed. Returns the number of ticks executed.
///
/// Each tick simulates (when running), captures a snapshot, releases the lock,
/// and renders before the next tick starts.
pub async fn run<G: Game, R: Renderer>(handle: GameHandle<G>, mut renderer: R) -> u64 {
    let tick_duration = handle.lock().await.tick_rate();
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("Tick loop started ({:?} per tick)", tick_duration);
    let mut ticks = 0u64;

    loop {
        ticker.tick().await;

        let snapshot = {
            let mut game = handle.lock().await;
            if game.is_closing() {
                break;
            }

            let result = game.tick();
            if !result.eliminated.is_empty() {
                tracing::debug!("Tick eliminated players {:?}", result.eliminated);
            }
            game.snapshot()
        };

        renderer.refresh(&snapshot);
        ticks += 1;
    }

    tracing::info!("Tick loop stopped after {} ticks", ticks);
    ticks
}
