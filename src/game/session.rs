//! Session state and authoritative tick loop

use dashmap::DashMap;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::{
    tick_delta, tick_duration, ticks_for, unix_millis, SIMULATION_TPS, SNAPSHOT_TPS,
};
use crate::ws::protocol::{ClientMsg, Outgoing, ServerMsg};

use super::physics::FLOOR_HEIGHT;
use super::pickup::RESPAWN_DELAY;
use super::replication::{NetRole, Outbound, ServerRequest};
use super::snapshot::SnapshotBuilder;
use super::weapon::{PickupStats, WeaponType};
use super::world::World;
use super::PlayerInput;

/// Players spawn within this distance of the arena centre
const ARENA_RADIUS: f32 = 2000.0;
const MAX_NAME_LEN: usize = 24;
/// A session nobody joins within this window ends itself
const JOIN_GRACE: Duration = Duration::from_secs(30);

/// Where weapon pickups lie in the lobby level
const PICKUP_SPOTS: [Vec3; 6] = [
    Vec3::new(600.0, 0.0, FLOOR_HEIGHT),
    Vec3::new(-600.0, 0.0, FLOOR_HEIGHT),
    Vec3::new(0.0, 600.0, FLOOR_HEIGHT),
    Vec3::new(0.0, -600.0, FLOOR_HEIGHT),
    Vec3::new(1200.0, 1200.0, FLOOR_HEIGHT),
    Vec3::new(-1200.0, -1200.0, FLOOR_HEIGHT),
];

const FIREARMS: [WeaponType; 3] = [WeaponType::Revolver, WeaponType::Shotgun, WeaponType::Rifle];

/// Weapon placed at each pickup spot for a given seed
pub fn level_layout(seed: u64) -> Vec<(Vec3, WeaponType)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    PICKUP_SPOTS
        .iter()
        .map(|&spot| (spot, FIREARMS[rng.gen_range(0..FIREARMS.len())]))
        .collect()
}

/// Per-session tunables
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_players: usize,
    pub respawn_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_players: 16,
            respawn_delay: RESPAWN_DELAY,
        }
    }
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub events_tx: broadcast::Sender<Outgoing>,
    pub player_count: Arc<AtomicUsize>,
    /// Seats claimed by the lobby, including players still connecting
    seats: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn seats(&self) -> usize {
        self.seats.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outgoing> {
        self.events_tx.subscribe()
    }

    /// Reserve a seat if fewer than `max` are taken
    pub fn try_claim_seat(&self, max: usize) -> bool {
        self.seats
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < max).then_some(taken + 1)
            })
            .is_ok()
    }

    pub fn release_seat(&self) {
        let _ = self
            .seats
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| taken.checked_sub(1));
    }
}

/// Summary of a session for the HTTP API
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub players: usize,
    pub seats: usize,
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn total_players(&self) -> usize {
        self.sessions
            .iter()
            .map(|s| s.value().player_count())
            .sum()
    }

    /// Claim a seat in any session with room left
    pub fn claim_seat(&self, max_players: usize) -> Option<SessionHandle> {
        self.sessions
            .iter()
            .find(|entry| entry.value().try_claim_seat(max_players))
            .map(|entry| entry.value().clone())
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|entry| summarize(entry.value()))
            .collect()
    }
}

pub fn summarize(handle: &SessionHandle) -> SessionSummary {
    SessionSummary {
        id: handle.id,
        players: handle.player_count(),
        seats: handle.seats(),
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game session
pub struct GameSession {
    id: Uuid,
    world: World,
    rng: ChaCha8Rng,
    settings: SessionSettings,
    input_rx: mpsc::Receiver<PlayerInput>,
    events_tx: broadcast::Sender<Outgoing>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
    had_players: bool,
}

impl GameSession {
    /// Create a new session with its level laid out
    pub fn new(id: Uuid, seed: u64, settings: SessionSettings) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            id,
            input_tx,
            events_tx: events_tx.clone(),
            player_count: player_count.clone(),
            seats: Arc::new(AtomicUsize::new(0)),
        };

        let mut world = World::new(NetRole::Authority).with_respawn_delay(settings.respawn_delay);
        for (position, weapon) in level_layout(seed) {
            world.spawn_pickup(position, PickupStats::default_for(weapon));
        }

        let session = Self {
            id,
            world,
            rng: ChaCha8Rng::seed_from_u64(seed),
            settings,
            input_rx,
            events_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            player_count,
            had_players: false,
        };

        (session, handle)
    }

    /// Run the authoritative tick loop until everyone has left
    pub async fn run(mut self) {
        info!(session_id = %self.id, "Session started");

        let join_deadline = ticks_for(JOIN_GRACE);

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Drain input queue
            self.process_inputs();

            let events = self.world.tick(tick_delta());
            if !events.is_empty() {
                self.snapshot_builder.force_next();
            }
            self.snapshot_builder.record(events);

            self.flush_replication();

            if self.snapshot_builder.should_send() {
                let snapshot = self.snapshot_builder.build(&self.world);
                self.send(Outgoing::all(snapshot));
            }

            if self.had_players && self.world.character_count() == 0 {
                info!(session_id = %self.id, "All players left, ending session");
                break;
            }

            if !self.had_players && self.world.current_tick() >= join_deadline {
                info!(session_id = %self.id, "Nobody joined, ending session");
                break;
            }
        }
    }

    /// Process all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::JoinSession { display_name } => {
                    self.handle_join(input.user_id, display_name);
                }
                ClientMsg::Request { request } => {
                    debug!(
                        user_id = %input.user_id,
                        request = request.name(),
                        queued_ms = unix_millis().saturating_sub(input.received_at),
                        "Request"
                    );
                    self.handle_request(input.user_id, request);
                }
                ClientMsg::Ping { t } => {
                    self.send(Outgoing::to(input.user_id, ServerMsg::Pong { t }));
                }
                ClientMsg::LeaveSession => {
                    self.handle_leave(input.user_id);
                }
            }
        }
    }

    /// Handle player join request
    fn handle_join(&mut self, user_id: Uuid, display_name: String) {
        if self.world.character(user_id).is_some() {
            warn!(user_id = %user_id, "Player already in session");
            return;
        }

        if self.world.character_count() >= self.settings.max_players {
            self.send(Outgoing::to(
                user_id,
                ServerMsg::Error {
                    code: "session_full".to_string(),
                    message: "Session is full".to_string(),
                },
            ));
            return;
        }

        let display_name = sanitize_name(&display_name, user_id);
        let (spawn, yaw) = self.generate_spawn();
        self.world.spawn_character(user_id, display_name, spawn, yaw);
        self.had_players = true;
        self.player_count
            .store(self.world.character_count(), Ordering::Relaxed);

        if let Some(character) = self.world.character(user_id) {
            let character = character.replicated();
            self.send(Outgoing::all(ServerMsg::PlayerJoined { character }));
        }

        self.send(Outgoing::to(
            user_id,
            ServerMsg::SessionJoined {
                user_id,
                session_id: self.id,
                tick: self.world.current_tick(),
                characters: self.world.replicated_characters(),
                pickups: self.world.pickup_snapshots(),
            },
        ));

        info!(
            session_id = %self.id,
            user_id = %user_id,
            player_count = self.world.character_count(),
            "Player joined session"
        );
    }

    fn handle_request(&mut self, user_id: Uuid, request: ServerRequest) {
        if let Err(e) = self.world.apply_request(user_id, request) {
            warn!(session_id = %self.id, user_id = %user_id, error = %e, "Request rejected");
            self.send(Outgoing::to(
                user_id,
                ServerMsg::Error {
                    code: "request_rejected".to_string(),
                    message: e.to_string(),
                },
            ));
        }
    }

    /// Handle player leave
    fn handle_leave(&mut self, user_id: Uuid) {
        if self.world.remove_character(user_id).is_some() {
            self.player_count
                .store(self.world.character_count(), Ordering::Relaxed);

            self.send(Outgoing::all(ServerMsg::PlayerLeft {
                user_id,
                reason: "disconnected".to_string(),
            }));

            info!(session_id = %self.id, user_id = %user_id, "Player left session");
        }
    }

    /// Forward authority multicasts and owner inventory views
    fn flush_replication(&mut self) {
        for outbound in self.world.drain_outbox() {
            match outbound {
                Outbound::Multicast(message) => {
                    self.send(Outgoing::all(ServerMsg::Multicast { message }));
                }
                Outbound::ToAuthority { request, .. } => {
                    warn!(session_id = %self.id, request = request.name(), "Authority queued a request for itself");
                }
            }
        }

        for (user_id, view) in self.world.take_inventory_updates() {
            self.send(Outgoing::to(user_id, ServerMsg::Inventory { user_id, view }));
        }
    }

    /// Generate a spawn position and yaw for a new player
    fn generate_spawn(&mut self) -> (Vec3, f32) {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.rng.gen_range(200.0..ARENA_RADIUS * 0.8);
        let position = Vec3::new(angle.cos() * distance, angle.sin() * distance, FLOOR_HEIGHT);
        let yaw = self.rng.gen_range(-180.0..180.0);
        (position, yaw)
    }

    fn send(&self, out: Outgoing) {
        // No receivers is fine, nobody may be subscribed yet
        let _ = self.events_tx.send(out);
    }
}

fn sanitize_name(name: &str, user_id: Uuid) -> String {
    let trimmed: String = name.trim().chars().take(MAX_NAME_LEN).collect();
    if trimmed.is_empty() {
        format!("Player_{}", &user_id.simple().to_string()[..8])
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(user_id: Uuid) -> PlayerInput {
        PlayerInput {
            user_id,
            msg: ClientMsg::JoinSession {
                display_name: "  ranger  ".to_string(),
            },
            received_at: unix_millis(),
        }
    }

    fn leave(user_id: Uuid) -> PlayerInput {
        PlayerInput {
            user_id,
            msg: ClientMsg::LeaveSession,
            received_at: unix_millis(),
        }
    }

    #[test]
    fn layout_is_deterministic_per_seed() {
        let a = level_layout(7);
        assert_eq!(a, level_layout(7));
        assert_eq!(a.len(), PICKUP_SPOTS.len());
        assert!(a.iter().all(|(_, weapon)| !weapon.is_melee()));
    }

    #[test]
    fn names_are_trimmed_or_generated() {
        let id = Uuid::new_v4();
        assert_eq!(sanitize_name("  ranger ", id), "ranger");
        assert!(sanitize_name("   ", id).starts_with("Player_"));
        assert_eq!(sanitize_name(&"x".repeat(40), id).len(), MAX_NAME_LEN);
    }

    #[test]
    fn seats_are_capped() {
        let (_, handle) = GameSession::new(Uuid::new_v4(), 1, SessionSettings::default());
        assert!(handle.try_claim_seat(2));
        assert!(handle.try_claim_seat(2));
        assert!(!handle.try_claim_seat(2));

        handle.release_seat();
        assert_eq!(handle.seats(), 1);
        handle.release_seat();
        handle.release_seat();
        assert_eq!(handle.seats(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn joining_player_gets_welcome_state_and_inventory() {
        let (session, handle) = GameSession::new(Uuid::new_v4(), 42, SessionSettings::default());
        let mut rx = handle.subscribe();
        let task = tokio::spawn(session.run());

        let user_id = Uuid::new_v4();
        handle.input_tx.send(join(user_id)).await.unwrap();

        let mut joined = false;
        let mut inventory = false;
        while !(joined && inventory) {
            let out = rx.recv().await.unwrap();
            assert!(out.is_for(user_id));
            match out.msg {
                ServerMsg::SessionJoined { characters, pickups, .. } => {
                    assert_eq!(characters.len(), 1);
                    assert_eq!(characters[0].display_name, "ranger");
                    assert_eq!(pickups.len(), PICKUP_SPOTS.len());
                    joined = true;
                }
                ServerMsg::Inventory { view, .. } => {
                    assert_eq!(view.equipped, WeaponType::Melee);
                    inventory = true;
                }
                _ => {}
            }
        }
        assert_eq!(handle.player_count(), 1);

        handle.input_tx.send(leave(user_id)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_turns_players_away() {
        let settings = SessionSettings {
            max_players: 1,
            ..SessionSettings::default()
        };
        let (session, handle) = GameSession::new(Uuid::new_v4(), 3, settings);
        let mut rx = handle.subscribe();
        tokio::spawn(session.run());

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        handle.input_tx.send(join(first)).await.unwrap();
        handle.input_tx.send(join(second)).await.unwrap();

        loop {
            let out = rx.recv().await.unwrap();
            if let ServerMsg::Error { code, .. } = &out.msg {
                assert_eq!(code, "session_full");
                assert_eq!(out.to, Some(second));
                break;
            }
        }
        assert_eq!(handle.player_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn session_nobody_joins_ends_after_grace() {
        let (session, _handle) = GameSession::new(Uuid::new_v4(), 5, SessionSettings::default());
        let task = tokio::spawn(session.run());

        tokio::time::timeout(JOIN_GRACE + Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn joined_session_outlives_grace() {
        let (session, handle) = GameSession::new(Uuid::new_v4(), 6, SessionSettings::default());
        let task = tokio::spawn(session.run());

        let user_id = Uuid::new_v4();
        handle.input_tx.send(join(user_id)).await.unwrap();
        tokio::time::sleep(JOIN_GRACE * 2).await;

        assert!(!task.is_finished());
        assert_eq!(handle.player_count(), 1);
    }
}
