use crate::game::traits::ParticipantId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Session {
    pub participant: ParticipantId,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    pub last_ping: Option<Instant>,
    pub ping_count: u32,
}

/// Tracks which datagram address speaks for which participant.
pub struct SessionManager {
    /// Map from socket address to session
    sessions_by_addr: HashMap<SocketAddr, Session>,
    /// Map from participant to socket address (for reverse lookup)
    addr_by_participant: HashMap<ParticipantId, SocketAddr>,
    /// How long before a session is considered timed out
    timeout_duration: Duration,
}

impl SessionManager {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            sessions_by_addr: HashMap::new(),
            addr_by_participant: HashMap::new(),
            timeout_duration: Duration::from_secs(timeout_seconds),
        }
    }

    /// Binds `participant` to `addr`. A participant seen at a new address
    /// (client restart, NAT rebinding) moves there; whatever was bound to
    /// `addr` before is replaced.
    pub fn register(&mut self, addr: SocketAddr, participant: ParticipantId) -> &Session {
        if let Some(old_addr) = self.addr_by_participant.get(&participant).copied() {
            if old_addr != addr {
                self.sessions_by_addr.remove(&old_addr);
                tracing::info!("Participant {} moved from {} to {}", participant, old_addr, addr);
            }
        }

        if let Some(previous) = self.sessions_by_addr.get(&addr) {
            if previous.participant != participant {
                let replaced = previous.participant;
                self.addr_by_participant.remove(&replaced);
                tracing::info!("Address {} now speaks for {} instead of {}", addr, participant, replaced);
            }
        }

        let session = self.sessions_by_addr.entry(addr).or_insert_with(|| {
            tracing::info!("New session: participant={}, addr={}", participant, addr);
            Session {
                participant,
                addr,
                last_seen: Instant::now(),
                last_ping: None,
                ping_count: 0,
            }
        });
        session.participant = participant;
        session.last_seen = Instant::now();
        self.addr_by_participant.insert(participant, addr);

        session
    }

    pub fn ping(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.sessions_by_addr.get_mut(addr) {
            session.last_ping = Some(Instant::now());
            session.last_seen = Instant::now();
            session.ping_count += 1;
        }
    }

    pub fn update_last_seen(&mut self, addr: &SocketAddr) {
        if let Some(session) = self.sessions_by_addr.get_mut(addr) {
            session.last_seen = Instant::now();
        }
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions_by_addr.get(addr)
    }

    pub fn get_by_participant(&self, participant: &ParticipantId) -> Option<&Session> {
        self.addr_by_participant
            .get(participant)
            .and_then(|addr| self.sessions_by_addr.get(addr))
    }

    /// Every address currently bound to a participant.
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions_by_addr.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions_by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions_by_addr.is_empty()
    }

    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Session> {
        let session = self.sessions_by_addr.remove(addr)?;
        self.addr_by_participant.remove(&session.participant);
        tracing::info!("Session closed: participant={}, addr={}", session.participant, addr);
        Some(session)
    }

    /// Drops sessions not heard from within the timeout. The participant's
    /// player stays in the game; it only stops receiving frames.
    pub fn cleanup_timed_out(&mut self) -> Vec<Session> {
        self.cleanup_idle_since(Instant::now())
    }

    fn cleanup_idle_since(&mut self, now: Instant) -> Vec<Session> {
        let timeout = self.timeout_duration;

        let timed_out_addrs: Vec<SocketAddr> = self
            .sessions_by_addr
            .iter()
            .filter(|(_, session)| now.saturating_duration_since(session.last_seen) > timeout)
            .map(|(addr, _)| *addr)
            .collect();

        let mut removed = Vec::new();
        for addr in timed_out_addrs {
            if let Some(session) = self.remove(&addr) {
                tracing::info!("Session timed out: participant={}", session.participant);
                removed.push(session);
            }
        }

        removed
    }
}
