//! The single-writer engine task.
//!
//! Every world mutation in the process flows through one instance of
//! [`Engine`] draining an [`Intent`] channel. The engine owns the world
//! store, the session table, the fan-out table, and the city generator's
//! RNG outright; there is no lock anywhere because there is no second
//! writer. Connection attach/detach travels through the same channel as
//! client frames, so ordering between a connection's lifecycle and its
//! intents is the channel order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use plaza_citygen::{CityParams, city_rng, generate};
use plaza_world::{PlayerId, WorldCounters, WorldState};
use rand_chacha::ChaCha8Rng;

use crate::broadcast::Fanout;
use crate::gateway::ConnectionId;
use crate::messages::{
    ClientMessage, ObjectRemoved, PlaceObject, PlayerDisconnected, PlayerMove, PlayerMoved,
    Register, RegisterAck, RemoveObject, ServerMessage,
};
use crate::session::{RegisterOutcome, SessionTable};

/// Interval between periodic status log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Work item for the engine. Produced by the gateway's connection tasks.
#[derive(Debug)]
pub enum Intent {
    /// A connection was accepted; `outbound` is its event channel.
    Connected {
        /// The new connection.
        id: ConnectionId,
        /// Bounded channel drained by the connection's writer task.
        outbound: mpsc::Sender<ServerMessage>,
    },
    /// A decoded client frame.
    Frame {
        /// The originating connection.
        id: ConnectionId,
        /// The decoded message.
        message: ClientMessage,
    },
    /// The connection's transport went away.
    Disconnected {
        /// The departed connection.
        id: ConnectionId,
    },
}

/// Create the intent channel shared by all connection tasks.
pub fn intent_channel(buffer: usize) -> (mpsc::Sender<Intent>, mpsc::Receiver<Intent>) {
    mpsc::channel(buffer)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owner of all mutable world state. Runs as a single task.
pub struct Engine {
    world: WorldState,
    sessions: SessionTable,
    fanout: Fanout,
    city: CityParams,
    rng: ChaCha8Rng,
    counters: Arc<WorldCounters>,
}

impl Engine {
    /// Build an engine with an empty world and a seeded generator RNG.
    pub fn new(city: CityParams, seed: u64, counters: Arc<WorldCounters>) -> Self {
        Self {
            world: WorldState::new(),
            sessions: SessionTable::new(),
            fanout: Fanout::new(),
            city,
            rng: city_rng(seed),
            counters,
        }
    }

    /// Drain intents until every sender is dropped, logging a status line
    /// at a fixed interval.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        let mut status = tokio::time::interval(STATUS_INTERVAL);
        status.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // Skip the immediate first tick.
        status.tick().await;

        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle(intent),
                    None => break,
                },
                _ = status.tick() => {
                    info!(
                        players = self.world.player_count(),
                        objects = self.world.object_count(),
                        connections = self.sessions.len(),
                        "world status"
                    );
                }
            }
        }
        info!("engine stopped, all intent senders dropped");
    }

    /// Apply one intent. Synchronous: nothing here awaits, so each intent
    /// is complete before the next is observed.
    fn handle(&mut self, intent: Intent) {
        match intent {
            Intent::Connected { id, outbound } => {
                self.sessions.on_connect(id);
                self.fanout.insert(id, outbound);
                debug!(connection = id.0, "connection attached");
            }
            Intent::Frame { id, message } => self.handle_frame(id, message),
            Intent::Disconnected { id } => self.handle_disconnect(id),
        }
    }

    fn handle_frame(&mut self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Register(msg) => self.handle_register(id, msg),
            ClientMessage::PlayerMove(msg) => self.handle_move(id, msg),
            ClientMessage::PlaceObject(msg) => self.handle_place(msg),
            ClientMessage::RemoveObject(msg) => self.handle_remove(msg),
            ClientMessage::GenerateCity => self.handle_generate(),
        }
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    fn handle_register(&mut self, id: ConnectionId, msg: Register) {
        match self.sessions.register(id) {
            RegisterOutcome::Registered => {
                // Snapshot before inserting so the joiner's init state
                // shows everyone else but not the joiner itself.
                let snapshot = self.world.snapshot();
                let player = self
                    .world
                    .register_player(PlayerId(id.0), msg.name.as_deref());
                info!(connection = id.0, name = %player.name, "player registered");

                self.fanout
                    .send_to(id, ServerMessage::InitState(snapshot));
                self.fanout.send_to(
                    id,
                    ServerMessage::RegisterAck(RegisterAck {
                        ok: true,
                        name: player.name.clone(),
                        player_count: self.world.player_count() as u32,
                    }),
                );
                self.fanout
                    .broadcast_except(id, &ServerMessage::PlayerJoined(player));
                self.publish_counts();
            }
            RegisterOutcome::AlreadyRegistered => {
                // Re-ack with the stored record; no world change, no
                // broadcast.
                if let Some(player) = self.world.player(PlayerId(id.0)) {
                    self.fanout.send_to(
                        id,
                        ServerMessage::RegisterAck(RegisterAck {
                            ok: true,
                            name: player.name.clone(),
                            player_count: self.world.player_count() as u32,
                        }),
                    );
                }
            }
            RegisterOutcome::NotConnected => {
                debug!(connection = id.0, "register from dead connection dropped");
            }
        }
    }

    fn handle_move(&mut self, id: ConnectionId, msg: PlayerMove) {
        if !self.sessions.is_registered(id) {
            debug!(connection = id.0, "move before register dropped");
            return;
        }
        if let Some(player) = self.world.move_player(PlayerId(id.0), msg.position, msg.yaw) {
            self.fanout.broadcast_except(
                id,
                &ServerMessage::PlayerMoved(PlayerMoved {
                    id: player.id,
                    position: player.position,
                    yaw: player.yaw,
                }),
            );
        }
    }

    fn handle_disconnect(&mut self, id: ConnectionId) {
        self.fanout.remove(id);
        let was_registered =
            self.sessions.on_disconnect(id) == Some(crate::session::SessionState::Registered);
        if was_registered {
            if let Some(player) = self.world.unregister_player(PlayerId(id.0)) {
                info!(connection = id.0, name = %player.name, "player disconnected");
                self.fanout.broadcast_all(&ServerMessage::PlayerDisconnected(
                    PlayerDisconnected { id: player.id },
                ));
            }
        }
        self.publish_counts();
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    fn handle_place(&mut self, msg: PlaceObject) {
        let object = self.world.place_object(msg.into());
        self.fanout
            .broadcast_all(&ServerMessage::ObjectPlaced(object));
        self.publish_counts();
    }

    fn handle_remove(&mut self, msg: RemoveObject) {
        if self.world.remove_object(msg.id) {
            self.fanout
                .broadcast_all(&ServerMessage::ObjectRemoved(ObjectRemoved { id: msg.id }));
            self.publish_counts();
        }
    }

    fn handle_generate(&mut self) {
        let specs = generate(&self.city, &mut self.rng);
        let added = self.world.merge_generated(specs);
        info!(objects = added.len(), "city batch merged");
        for object in added {
            self.fanout
                .broadcast_all(&ServerMessage::ObjectPlaced(object));
        }
        self.publish_counts();
    }

    fn publish_counts(&self) {
        self.counters
            .publish(self.world.player_count(), self.world.object_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use plaza_world::ObjectId;

    fn test_engine() -> Engine {
        Engine::new(CityParams::default(), 42, Arc::new(WorldCounters::new()))
    }

    /// Attach a connection and return its outbound receiver.
    fn connect(engine: &mut Engine, id: u64) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(64);
        engine.handle(Intent::Connected {
            id: ConnectionId(id),
            outbound: tx,
        });
        rx
    }

    fn register(engine: &mut Engine, id: u64, name: &str) {
        engine.handle(Intent::Frame {
            id: ConnectionId(id),
            message: ClientMessage::Register(Register {
                name: Some(name.to_string()),
            }),
        });
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_first_register_gets_empty_init_state_then_ack() {
        let mut engine = test_engine();
        let mut rx = connect(&mut engine, 1);
        register(&mut engine, 1, "Ann");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        match &events[0] {
            ServerMessage::InitState(snapshot) => {
                assert!(snapshot.players.is_empty(), "joiner must not see itself");
                assert!(snapshot.objects.is_empty());
            }
            other => panic!("expected InitState first, got {other:?}"),
        }
        match &events[1] {
            ServerMessage::RegisterAck(ack) => {
                assert!(ack.ok);
                assert_eq!(ack.name, "Ann");
                assert_eq!(ack.player_count, 1);
            }
            other => panic!("expected RegisterAck second, got {other:?}"),
        }
    }

    #[test]
    fn test_join_is_broadcast_to_others_only() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        register(&mut engine, 1, "Ann");
        drain(&mut rx_a);

        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 2, "Bob");

        let to_a = drain(&mut rx_a);
        assert_eq!(to_a.len(), 1);
        match &to_a[0] {
            ServerMessage::PlayerJoined(player) => {
                assert_eq!(player.name, "Bob");
                assert_eq!(player.id, PlayerId(2));
            }
            other => panic!("expected PlayerJoined, got {other:?}"),
        }

        // Bob's init state contains Ann but not Bob.
        let to_b = drain(&mut rx_b);
        match &to_b[0] {
            ServerMessage::InitState(snapshot) => {
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.players[0].name, "Ann");
            }
            other => panic!("expected InitState, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_register_reacks_without_broadcast() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 1, "Ann");
        register(&mut engine, 2, "Bob");
        drain(&mut rx_a);
        drain(&mut rx_b);

        register(&mut engine, 1, "Renamed");
        let to_a = drain(&mut rx_a);
        assert_eq!(to_a.len(), 1);
        match &to_a[0] {
            ServerMessage::RegisterAck(ack) => {
                assert_eq!(ack.name, "Ann", "re-register must not rename");
                assert_eq!(ack.player_count, 2);
            }
            other => panic!("expected RegisterAck, got {other:?}"),
        }
        assert!(drain(&mut rx_b).is_empty(), "others must not see a re-join");
    }

    #[test]
    fn test_move_broadcasts_clamped_state_to_others() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 1, "Ann");
        register(&mut engine, 2, "Bob");
        drain(&mut rx_a);
        drain(&mut rx_b);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::PlayerMove(PlayerMove {
                position: Some(Vec3::new(3.0, -5.0, 4.0)),
                yaw: Some(1.2),
            }),
        });

        assert!(drain(&mut rx_a).is_empty(), "no echo to the mover");
        let to_b = drain(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        match &to_b[0] {
            ServerMessage::PlayerMoved(moved) => {
                assert_eq!(moved.id, PlayerId(1));
                assert_eq!(moved.position, Vec3::new(3.0, 0.5, 4.0));
                assert_eq!(moved.yaw, 1.2);
            }
            other => panic!("expected PlayerMoved, got {other:?}"),
        }
    }

    #[test]
    fn test_move_before_register_is_dropped() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 2, "Bob");
        drain(&mut rx_b);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::PlayerMove(PlayerMove {
                position: Some(Vec3::ONE),
                yaw: None,
            }),
        });

        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_place_echoes_snapped_object_to_actor_too() {
        let mut engine = test_engine();
        let mut rx = connect(&mut engine, 1);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::PlaceObject(PlaceObject {
                shape: None,
                size: None,
                color: None,
                alpha: None,
                position: Vec3::new(1.3, 0.2, -0.8),
                rotation: None,
            }),
        });

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerMessage::ObjectPlaced(object) => {
                assert_eq!(object.position, Vec3::new(1.5, 0.5, -1.0));
                assert_eq!(object.id, ObjectId(1));
            }
            other => panic!("expected ObjectPlaced, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_unknown_object_is_silent() {
        let mut engine = test_engine();
        let mut rx = connect(&mut engine, 1);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::RemoveObject(RemoveObject { id: ObjectId(99) }),
        });
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_remove_broadcasts_to_everyone() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::PlaceObject(PlaceObject {
                shape: None,
                size: None,
                color: None,
                alpha: None,
                position: Vec3::ZERO,
                rotation: None,
            }),
        });
        drain(&mut rx_a);
        drain(&mut rx_b);

        engine.handle(Intent::Frame {
            id: ConnectionId(2),
            message: ClientMessage::RemoveObject(RemoveObject { id: ObjectId(1) }),
        });

        let expected = ServerMessage::ObjectRemoved(ObjectRemoved { id: ObjectId(1) });
        assert_eq!(drain(&mut rx_a), vec![expected.clone()]);
        assert_eq!(drain(&mut rx_b), vec![expected]);
    }

    #[test]
    fn test_disconnect_of_registered_player_is_broadcast() {
        let mut engine = test_engine();
        let mut rx_a = connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 1, "Ann");
        register(&mut engine, 2, "Bob");
        drain(&mut rx_a);
        drain(&mut rx_b);

        engine.handle(Intent::Disconnected { id: ConnectionId(1) });

        let to_b = drain(&mut rx_b);
        assert_eq!(
            to_b,
            vec![ServerMessage::PlayerDisconnected(PlayerDisconnected {
                id: PlayerId(1)
            })]
        );

        // A later registrant's init state no longer lists the departed
        // player.
        let mut rx_c = connect(&mut engine, 3);
        register(&mut engine, 3, "Cid");
        let to_c = drain(&mut rx_c);
        match &to_c[0] {
            ServerMessage::InitState(snapshot) => {
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.players[0].id, PlayerId(2));
                assert!(
                    snapshot.players.iter().all(|p| p.id != PlayerId(1)),
                    "departed player must not appear in later snapshots"
                );
            }
            other => panic!("expected InitState, got {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_before_register_is_silent() {
        let mut engine = test_engine();
        connect(&mut engine, 1);
        let mut rx_b = connect(&mut engine, 2);
        register(&mut engine, 2, "Bob");
        drain(&mut rx_b);

        engine.handle(Intent::Disconnected { id: ConnectionId(1) });
        assert!(drain(&mut rx_b).is_empty());
    }

    #[test]
    fn test_generate_city_broadcasts_each_survivor() {
        let mut engine = test_engine();
        let mut rx = connect(&mut engine, 1);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::GenerateCity,
        });

        let events = drain(&mut rx);
        assert!(!events.is_empty(), "a default city is never empty");
        let mut last_id = 0;
        for event in &events {
            match event {
                ServerMessage::ObjectPlaced(object) => {
                    assert!(object.id.0 > last_id, "batch must arrive in id order");
                    last_id = object.id.0;
                }
                other => panic!("expected ObjectPlaced, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_second_generation_only_adds_new_cells() {
        let mut engine = test_engine();
        let mut rx = connect(&mut engine, 1);

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::GenerateCity,
        });
        let first = drain(&mut rx).len();

        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::GenerateCity,
        });
        let second = drain(&mut rx).len();

        assert!(
            second < first,
            "a rerolled batch must lose its already-occupied cells"
        );
    }

    #[test]
    fn test_slow_consumer_does_not_block_the_engine() {
        let mut engine = test_engine();
        let (tx, mut rx_slow) = mpsc::channel(1);
        engine.handle(Intent::Connected {
            id: ConnectionId(1),
            outbound: tx,
        });
        let mut rx_b = connect(&mut engine, 2);

        for i in 0..5 {
            engine.handle(Intent::Frame {
                id: ConnectionId(2),
                message: ClientMessage::PlaceObject(PlaceObject {
                    shape: None,
                    size: None,
                    color: None,
                    alpha: None,
                    position: Vec3::new(i as f32, 0.5, 0.0),
                    rotation: None,
                }),
            });
        }

        assert_eq!(drain(&mut rx_slow).len(), 1, "slow consumer keeps one event");
        assert_eq!(drain(&mut rx_b).len(), 5, "fast consumer keeps them all");
    }

    #[test]
    fn test_counters_track_world_population() {
        let counters = Arc::new(WorldCounters::new());
        let mut engine = Engine::new(CityParams::default(), 42, Arc::clone(&counters));
        let _rx = connect(&mut engine, 1);
        register(&mut engine, 1, "Ann");
        engine.handle(Intent::Frame {
            id: ConnectionId(1),
            message: ClientMessage::PlaceObject(PlaceObject {
                shape: None,
                size: None,
                color: None,
                alpha: None,
                position: Vec3::ZERO,
                rotation: None,
            }),
        });

        assert_eq!(counters.players(), 1);
        assert_eq!(counters.objects(), 1);

        engine.handle(Intent::Disconnected { id: ConnectionId(1) });
        assert_eq!(counters.players(), 0);
        assert_eq!(counters.objects(), 1);
    }
}
