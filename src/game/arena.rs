//! Arena task: owns the world and serialises every mutation through one loop

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ArenaSettings;
use crate::util::time::{tick_duration, unix_millis, Timer};
use crate::ws::protocol::{ClientMsg, HazardTier, InputKeys, ServerMsg};

use super::hazard::TierStats;
use super::snapshot::SnapshotBuilder;
use super::world::{TickReport, World};

/// Inbound session events queued for the arena
pub const EVENT_QUEUE_SIZE: usize = 1024;
/// Snapshots a session may fall behind before it starts skipping
pub const BROADCAST_CAPACITY: usize = 128;
/// Per-session queue for unicast messages
pub const SESSION_QUEUE_SIZE: usize = 32;

/// Outbound half of a session, fed by the arena
pub type SessionSender = mpsc::Sender<Arc<ServerMsg>>;

/// Something a connection did, stamped with its arrival time
#[derive(Debug)]
pub struct SessionEvent {
    pub connection_id: Uuid,
    pub kind: SessionEventKind,
    pub received_at: u64,
}

#[derive(Debug)]
pub enum SessionEventKind {
    /// A socket was accepted; unicast replies go to `outbound`
    Connect { outbound: SessionSender },
    Client(ClientMsg),
    Disconnect,
}

impl SessionEvent {
    pub fn new(connection_id: Uuid, kind: SessionEventKind) -> Self {
        Self {
            connection_id,
            kind,
            received_at: unix_millis(),
        }
    }
}

/// Counters published after every tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArenaStats {
    pub tick: u64,
    pub players: usize,
    pub projectiles: usize,
    pub hazards: usize,
    pub sessions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Arena task is no longer running")]
    Closed,
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    event_tx: mpsc::Sender<SessionEvent>,
    snapshot_tx: broadcast::Sender<Arc<ServerMsg>>,
    stats: Arc<RwLock<ArenaStats>>,
}

impl ArenaHandle {
    pub async fn send(&self, event: SessionEvent) -> Result<(), ArenaError> {
        self.event_tx.send(event).await.map_err(|_| ArenaError::Closed)
    }

    /// Receive every broadcast frame from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerMsg>> {
        self.snapshot_tx.subscribe()
    }

    pub fn stats(&self) -> ArenaStats {
        self.stats.read().clone()
    }
}

/// The authoritative arena
pub struct GameArena {
    world: World,
    event_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: broadcast::Sender<Arc<ServerMsg>>,
    snapshot_builder: SnapshotBuilder,
    stats: Arc<RwLock<ArenaStats>>,
    sessions: HashMap<Uuid, SessionSender>,
    tick_duration: Duration,
}

impl GameArena {
    /// Create a new arena
    pub fn new(settings: ArenaSettings) -> (Self, ArenaHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (snapshot_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let stats = Arc::new(RwLock::new(ArenaStats::default()));

        let handle = ArenaHandle {
            event_tx,
            snapshot_tx: snapshot_tx.clone(),
            stats: stats.clone(),
        };

        let arena = Self {
            tick_duration: tick_duration(settings.tick_rate),
            snapshot_builder: SnapshotBuilder::new(settings.snapshot_every),
            world: World::new(settings),
            event_rx,
            snapshot_tx,
            stats,
            sessions: HashMap::new(),
        };

        (arena, handle)
    }

    /// Start the arena on the runtime and return its handle
    pub fn spawn(settings: ArenaSettings) -> ArenaHandle {
        let (arena, handle) = Self::new(settings);
        tokio::spawn(arena.run());
        handle
    }

    /// Run until every handle is dropped
    pub async fn run(mut self) {
        info!(
            tick_ms = self.tick_duration.as_secs_f64() * 1000.0,
            "Arena started"
        );

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let [mut small, mut medium, mut large] = HazardTier::ALL.map(spawn_interval);

        loop {
            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        info!("Arena handles dropped, stopping");
                        break;
                    }
                },
                _ = tick_interval.tick() => self.run_tick(unix_millis()),
                _ = small.tick() => self.spawn_hazard(HazardTier::Small),
                _ = medium.tick() => self.spawn_hazard(HazardTier::Medium),
                _ = large.tick() => self.spawn_hazard(HazardTier::Large),
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let SessionEvent {
            connection_id,
            kind,
            received_at,
        } = event;

        match kind {
            SessionEventKind::Connect { outbound } => {
                debug!(connection_id = %connection_id, "Session attached");
                self.sessions.insert(connection_id, outbound);
            }
            SessionEventKind::Client(msg) => self.handle_client(connection_id, msg, received_at),
            SessionEventKind::Disconnect => {
                self.world.disconnect(connection_id);
                self.sessions.remove(&connection_id);
            }
        }
    }

    fn handle_client(&mut self, connection_id: Uuid, msg: ClientMsg, now: u64) {
        match msg {
            ClientMsg::Identify { name } => {
                let player_id = self.world.identify(connection_id, name.as_deref(), now);
                let init = self.snapshot_builder.build_init(&self.world, player_id);
                self.unicast(connection_id, init);
            }
            ClientMsg::Input {
                up,
                down,
                left,
                right,
            } => {
                self.world.set_input(
                    connection_id,
                    InputKeys {
                        up,
                        down,
                        left,
                        right,
                    },
                );
            }
            ClientMsg::Aim { angle } => self.world.set_aim(connection_id, angle),
            ClientMsg::Shoot => {
                let fired = self
                    .world
                    .shoot(connection_id, now)
                    .and_then(|id| self.world.projectiles().get(id));
                if let Some(projectile) = fired {
                    let msg = ServerMsg::NewProjectile {
                        projectile: projectile.into(),
                    };
                    self.publish(msg);
                }
            }
            ClientMsg::Chat { text } => {
                if !self.world.chat(connection_id, &text, now) {
                    debug!(connection_id = %connection_id, "Chat line dropped");
                }
            }
        }
    }

    /// Run a single simulation tick and broadcast its result
    fn run_tick(&mut self, now: u64) {
        let timer = Timer::new();
        let report = self.world.tick(now);
        self.notify_eliminated(&report);

        if self.snapshot_builder.should_send() {
            for frame in self.snapshot_builder.build(&self.world) {
                self.publish(frame);
            }
        }
        self.refresh_stats();

        let elapsed = timer.elapsed();
        if elapsed > self.tick_duration {
            warn!(
                tick = report.tick,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "Tick overran its budget"
            );
        }
    }

    fn notify_eliminated(&self, report: &TickReport) {
        for elimination in &report.eliminated {
            info!(
                connection_id = %elimination.connection_id,
                player_id = elimination.player_id,
                killer_id = ?elimination.killer_id,
                "Notifying eliminated player"
            );
            self.unicast(
                elimination.connection_id,
                ServerMsg::Eliminated {
                    killer_id: elimination.killer_id,
                    killer_name: elimination.killer_name.clone(),
                    final_score: elimination.final_score,
                },
            );
        }
    }

    fn spawn_hazard(&mut self, tier: HazardTier) {
        if self.world.spawn_hazard(tier).is_none() {
            debug!(%tier, "Spawner skipped");
        }
    }

    fn refresh_stats(&self) {
        *self.stats.write() = ArenaStats {
            tick: self.world.tick_count(),
            players: self.world.players().len(),
            projectiles: self.world.projectiles().len(),
            hazards: self.world.hazards().len(),
            sessions: self.sessions.len(),
        };
    }

    /// Queue a message for one session; dropped when its queue is full
    fn unicast(&self, connection_id: Uuid, msg: ServerMsg) {
        let Some(outbound) = self.sessions.get(&connection_id) else {
            return;
        };
        match outbound.try_send(Arc::new(msg)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %connection_id, "Session queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %connection_id, "Session queue closed");
            }
        }
    }

    /// Broadcast to every connected session
    fn publish(&self, msg: ServerMsg) {
        // No receivers is fine
        let _ = self.snapshot_tx.send(Arc::new(msg));
    }
}

/// Spawner timer for a tier; the first spawn happens one period after start
fn spawn_interval(tier: HazardTier) -> Interval {
    let period = Duration::from_millis(TierStats::for_tier(tier).spawn_period_ms);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

#[cfg(test)]
mod tests {
    use glam::DVec2;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    use super::*;
    use crate::config::NeutralZoneMode;

    fn settings() -> ArenaSettings {
        ArenaSettings {
            neutral_zone: NeutralZoneMode::None,
            seed: Some(3),
            ..ArenaSettings::default()
        }
    }

    async fn connect(handle: &ArenaHandle) -> (Uuid, mpsc::Receiver<Arc<ServerMsg>>) {
        let connection_id = Uuid::new_v4();
        let (outbound, rx) = mpsc::channel(SESSION_QUEUE_SIZE);
        assert_ok!(
            handle
                .send(SessionEvent::new(
                    connection_id,
                    SessionEventKind::Connect { outbound }
                ))
                .await
        );
        (connection_id, rx)
    }

    async fn client(handle: &ArenaHandle, connection_id: Uuid, msg: ClientMsg) {
        assert_ok!(
            handle
                .send(SessionEvent::new(connection_id, SessionEventKind::Client(msg)))
                .await
        );
    }

    #[tokio::test]
    async fn identify_is_answered_with_init() {
        let handle = GameArena::spawn(settings());
        let (connection_id, mut rx) = connect(&handle).await;
        client(
            &handle,
            connection_id,
            ClientMsg::Identify {
                name: Some("ace".into()),
            },
        )
        .await;

        let msg = assert_ok!(timeout(Duration::from_secs(2), rx.recv()).await);
        let msg = msg.expect("session queue closed");
        match msg.as_ref() {
            ServerMsg::Init {
                self_id, players, ..
            } => {
                assert_eq!(players[&self_id.to_string()].name, "ace");
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ticks_are_broadcast_and_shots_announced() {
        let handle = GameArena::spawn(settings());
        let mut frames = handle.subscribe();
        let (connection_id, _rx) = connect(&handle).await;
        client(&handle, connection_id, ClientMsg::Identify { name: None }).await;
        client(&handle, connection_id, ClientMsg::Shoot).await;

        let mut saw_players = false;
        let mut saw_shot = false;
        for _ in 0..50 {
            let frame = assert_ok!(timeout(Duration::from_secs(2), frames.recv()).await);
            match assert_ok!(frame).as_ref() {
                ServerMsg::Players { players, .. } if !players.is_empty() => saw_players = true,
                ServerMsg::NewProjectile { .. } => saw_shot = true,
                _ => {}
            }
            if saw_players && saw_shot {
                break;
            }
        }
        assert!(saw_players && saw_shot);
    }

    #[tokio::test]
    async fn disconnect_removes_the_player() {
        let handle = GameArena::spawn(settings());
        let (connection_id, _rx) = connect(&handle).await;
        client(&handle, connection_id, ClientMsg::Identify { name: None }).await;
        assert_ok!(
            handle
                .send(SessionEvent::new(connection_id, SessionEventKind::Disconnect))
                .await
        );

        // A tick may still land before the disconnect is applied
        let mut frames = handle.subscribe();
        let mut emptied = false;
        for _ in 0..50 {
            let frame = assert_ok!(timeout(Duration::from_secs(2), frames.recv()).await);
            if let ServerMsg::Players { players, .. } = assert_ok!(frame).as_ref() {
                if players.is_empty() {
                    emptied = true;
                    break;
                }
            }
        }
        assert!(emptied);
        assert_eq!(handle.stats().players, 0);
        assert_eq!(handle.stats().sessions, 0);
    }

    #[test]
    fn eliminated_player_is_told_who_finished_it() {
        let (mut arena, _handle) = GameArena::new(settings());
        let victim_conn = Uuid::new_v4();
        let (outbound, mut rx) = mpsc::channel(SESSION_QUEUE_SIZE);
        arena.handle_event(SessionEvent::new(
            victim_conn,
            SessionEventKind::Connect { outbound },
        ));

        let now = unix_millis();
        let victim = arena.world.identify(victim_conn, Some("victim"), now);
        let killer_conn = Uuid::new_v4();
        let killer = arena.world.identify(killer_conn, Some("ace"), now);
        {
            let killer = arena.world.players.get_mut(killer).unwrap();
            killer.body.position = DVec2::new(1_000.0, 1_000.0);
            killer.aim_angle = 0.0;
        }
        {
            let victim = arena.world.players.get_mut(victim).unwrap();
            victim.body.position = DVec2::new(1_065.0, 1_000.0);
            victim.award(30.0);
            victim.set_health(1.0);
        }
        assert!(arena.world.shoot(killer_conn, now).is_some());

        arena.run_tick(now + 16);

        let msg = rx.try_recv().expect("no message for the victim");
        match msg.as_ref() {
            ServerMsg::Eliminated {
                killer_id,
                killer_name,
                final_score,
            } => {
                assert_eq!(*killer_id, Some(killer));
                assert_eq!(killer_name.as_deref(), Some("ace"));
                assert_eq!(*final_score, 30.0);
            }
            other => panic!("expected eliminated, got {other:?}"),
        }
        assert!(!arena.world.players().contains(victim));
    }
}
