//! One game session: lobby roster, phase machine and tick resolution
//!
//! A session moves Forming -> Active -> Ended, and may go from Ended back to
//! Active if everyone readies up again before the teardown timer fires. All
//! mutation goes through `&mut Session`; the caller provides the locking.

use rand::Rng;
use serde::Serialize;

use crate::error::JoinError;
use crate::protocol::{ConnectionId, InputFrame, LobbyPlayer, ServerMessage, Transport};
use crate::settings::Settings;
use crate::sim::entity::{Player, PlayerId};
use crate::sim::event::GameEvent;
use crate::sim::snapshot::{PickupView, build_snapshot, dungeon_view};
use crate::sim::state::World;
use crate::sim::{loot, step};

/// Seeds are kept small so players can read them off the lobby screen
const SEED_RANGE: u64 = 1_000_000;

/// Session phase, serialized with the names the client expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    /// Waiting in the lobby
    #[serde(rename = "lobby")]
    Forming,
    #[serde(rename = "playing")]
    Active,
    /// Everyone died; the lobby lingers until teardown
    #[serde(rename = "gameover")]
    Ended,
}

/// Actions scheduled on the session's own tick counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    AdvanceFloor,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledTask {
    due_tick: u64,
    action: Deferred,
}

/// What the driver should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The session has expired and should be discarded
    Teardown,
}

pub fn fresh_seed() -> u64 {
    rand::rng().random_range(0..SEED_RANGE)
}

pub struct Session {
    code: String,
    seed: u64,
    phase: SessionPhase,
    world: World,
    next_player_id: PlayerId,
    tick: u64,
    scheduled: Vec<ScheduledTask>,
    settings: Settings,
    /// Set once the session is due to be discarded; nobody may join after
    closed: bool,
}

impl Session {
    pub fn new(code: String, seed: u64, settings: &Settings) -> Self {
        Self {
            code,
            seed,
            phase: SessionPhase::Forming,
            world: World::new(seed),
            next_player_id: 1,
            tick: 0,
            scheduled: Vec::new(),
            settings: settings.clone(),
            closed: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn player_count(&self) -> usize {
        self.world.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.players.is_empty()
    }

    pub fn pending(&self) -> Vec<Deferred> {
        self.scheduled.iter().map(|t| t.action).collect()
    }

    fn connections(&self) -> Vec<ConnectionId> {
        self.world.players.values().map(|p| p.connection).collect()
    }

    fn broadcast(&self, transport: &dyn Transport, msg: ServerMessage) {
        transport.broadcast(&self.connections(), &msg);
    }

    // === Lobby ===

    /// Add a player for `conn`; the first player in becomes host
    pub fn admit(
        &mut self,
        conn: ConnectionId,
        transport: &dyn Transport,
    ) -> Result<PlayerId, JoinError> {
        if self.closed {
            return Err(JoinError::NotFound);
        }
        if self.phase != SessionPhase::Forming {
            return Err(JoinError::AlreadyStarted);
        }
        if self.world.players.len() >= self.settings.max_players {
            return Err(JoinError::Full {
                max: self.settings.max_players,
            });
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        let is_host = self.world.players.is_empty();
        self.world.players.insert(id, Player::new(id, conn, is_host));
        log::info!("Player {} joined session {}", id, self.code);

        transport.send(
            conn,
            &ServerMessage::Joined {
                code: self.code.clone(),
                player_id: id,
                is_host,
                seed: self.seed,
            },
        );
        self.broadcast_lobby(transport);
        Ok(id)
    }

    /// Remove a player who left or disconnected
    ///
    /// Hands the host role to the longest-standing remaining player if the
    /// host left. Returns the removed player, if it was present.
    pub fn remove_player(&mut self, id: PlayerId, transport: &dyn Transport) -> Option<Player> {
        let removed = self.world.players.shift_remove(&id)?;
        log::info!("Player {} left session {}", id, self.code);
        if self.world.players.is_empty() {
            self.closed = true;
            return Some(removed);
        }

        if !self.world.players.values().any(|p| p.is_host) {
            if let Some(next) = self.world.players.values_mut().next() {
                next.is_host = true;
                log::info!("Host of session {} passed to player {}", self.code, next.id);
                transport.send(next.connection, &ServerMessage::HostTransferred);
            }
        }
        self.broadcast_lobby(transport);
        self.check_game_over(transport);
        Some(removed)
    }

    /// Flip a player's ready flag and apply any cosmetic choices
    ///
    /// Starts (or restarts) the game once every player is ready.
    pub fn toggle_ready(
        &mut self,
        id: PlayerId,
        body_color: Option<String>,
        cape_color: Option<String>,
        transport: &dyn Transport,
    ) {
        if self.phase == SessionPhase::Active {
            return;
        }
        let Some(player) = self.world.players.get_mut(&id) else {
            return;
        };
        player.ready = !player.ready;
        if let Some(color) = body_color.filter(|c| !c.is_empty()) {
            player.body_color = color;
        }
        if let Some(color) = cape_color.filter(|c| !c.is_empty()) {
            player.cape_color = color;
        }
        self.broadcast_lobby(transport);

        if !self.world.players.is_empty() && self.world.players.values().all(|p| p.ready) {
            self.start_game(transport);
        }
    }

    /// Host-only start from the lobby
    pub fn request_start(&mut self, id: PlayerId, transport: &dyn Transport) {
        let is_host = self.world.players.get(&id).is_some_and(|p| p.is_host);
        if is_host && self.phase == SessionPhase::Forming {
            self.start_game(transport);
        }
    }

    /// Buffer a client's input frame until the next tick
    pub fn buffer_input(&mut self, id: PlayerId, frame: &InputFrame) {
        if self.phase != SessionPhase::Active {
            return;
        }
        if let Some(player) = self.world.players.get_mut(&id) {
            frame.apply(&mut player.input);
        }
    }

    fn lobby_roster(&self) -> Vec<LobbyPlayer> {
        self.world
            .players
            .values()
            .map(|p| LobbyPlayer {
                id: p.id,
                name: p.name.clone(),
                is_host: p.is_host,
                ready: p.ready,
                body_color: p.body_color.clone(),
                cape_color: p.cape_color.clone(),
            })
            .collect()
    }

    fn broadcast_lobby(&self, transport: &dyn Transport) {
        self.broadcast(
            transport,
            ServerMessage::LobbyState {
                players: self.lobby_roster(),
                state: self.phase,
            },
        );
    }

    fn start_game(&mut self, transport: &dyn Transport) {
        if self.phase == SessionPhase::Ended {
            self.seed = fresh_seed();
        }
        self.phase = SessionPhase::Active;
        self.scheduled.clear();
        for player in self.world.players.values_mut() {
            player.ready = false;
        }
        self.world.start_run(self.seed);

        log::info!(
            "Session {} started with {} players (seed {})",
            self.code,
            self.world.players.len(),
            self.seed
        );
        self.broadcast(
            transport,
            ServerMessage::GameStart {
                seed: self.seed,
                dungeon: dungeon_view(&self.world.dungeon),
                floor: self.world.floor,
            },
        );
    }

    // === Tick ===

    /// Advance one tick: deferred actions, then simulation, resolution and
    /// the state broadcast
    pub fn tick(&mut self, transport: &dyn Transport) -> TickOutcome {
        self.tick += 1;

        for action in self.take_due() {
            match action {
                Deferred::AdvanceFloor => self.advance_floor(transport),
                Deferred::Teardown => {
                    log::info!("Session {} expired", self.code);
                    self.closed = true;
                    return TickOutcome::Teardown;
                }
            }
        }

        if self.phase != SessionPhase::Active {
            return TickOutcome::Continue;
        }

        let events = step(&mut self.world);
        self.resolve(events, transport);
        self.broadcast(transport, ServerMessage::State(build_snapshot(&self.world)));
        TickOutcome::Continue
    }

    fn schedule(&mut self, delay: u64, action: Deferred) {
        self.scheduled.push(ScheduledTask {
            due_tick: self.tick + delay,
            action,
        });
    }

    fn cancel(&mut self, action: Deferred) {
        self.scheduled.retain(|t| t.action != action);
    }

    fn take_due(&mut self) -> Vec<Deferred> {
        let now = self.tick;
        let (due, later): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|t| t.due_tick <= now);
        self.scheduled = later;
        due.into_iter().map(|t| t.action).collect()
    }

    /// Apply every event from a tick, in order
    pub(crate) fn resolve(&mut self, events: Vec<GameEvent>, transport: &dyn Transport) {
        for event in events {
            self.dispatch(event, transport);
        }
    }

    fn dispatch(&mut self, event: GameEvent, transport: &dyn Transport) {
        match event {
            GameEvent::EnemyKilled {
                enemy_id,
                kind,
                pos,
                room,
            } => {
                self.world.kills += 1;
                loot::roll_enemy_drop(&mut self.world, room, pos);
                self.broadcast(
                    transport,
                    ServerMessage::EnemyKilled {
                        enemy_id,
                        room,
                        xp: kind.spec().xp,
                    },
                );
            }
            GameEvent::PlayerHit { player_id, damage } => {
                let Some(player) = self.world.players.get_mut(&player_id) else {
                    return;
                };
                if !player.alive {
                    return;
                }
                let fatal = player.take_damage(damage);
                let hp = player.hp;
                self.broadcast(
                    transport,
                    ServerMessage::PlayerHit {
                        player_id,
                        damage,
                        hp,
                    },
                );
                if fatal {
                    log::debug!("Player {} died in session {}", player_id, self.code);
                    self.broadcast(transport, ServerMessage::PlayerDead { player_id });
                    self.check_game_over(transport);
                }
            }
            GameEvent::SpawnText { pos, text, color } => {
                self.broadcast(
                    transport,
                    ServerMessage::SpawnText {
                        x: pos.x,
                        y: pos.y,
                        text,
                        color,
                    },
                );
            }
            GameEvent::PickupTaken {
                pickup_id,
                player_id,
                room,
            } => {
                self.broadcast(
                    transport,
                    ServerMessage::PickupTaken {
                        pickup_id,
                        player_id,
                        room,
                    },
                );
            }
            GameEvent::WeaponDropped { pickup, room } => {
                self.broadcast(
                    transport,
                    ServerMessage::WeaponDropped {
                        pickup: PickupView::from(&pickup),
                        room,
                    },
                );
            }
            GameEvent::RoomCleared { room, chest, boss } => {
                self.broadcast(transport, ServerMessage::RoomCleared { room });
                if chest {
                    loot::open_chest(&mut self.world, room);
                    self.broadcast(transport, ServerMessage::ChestOpened { room });
                }
                if boss && self.phase == SessionPhase::Active {
                    log::info!("Boss down in session {} on floor {}", self.code, self.world.floor);
                    self.schedule(self.settings.floor_advance_delay_ticks, Deferred::AdvanceFloor);
                }
            }
            GameEvent::Explosion { pos, room } => {
                self.broadcast(
                    transport,
                    ServerMessage::Explosion {
                        x: pos.x,
                        y: pos.y,
                        room,
                    },
                );
            }
            GameEvent::PlayerEnteredRoom {
                player_id,
                room,
                from,
                pos,
            } => {
                self.broadcast(
                    transport,
                    ServerMessage::PlayerEnterRoom {
                        player_id,
                        room,
                        from_dir: from,
                        px: pos.x,
                        py: pos.y,
                    },
                );
            }
        }
    }

    fn advance_floor(&mut self, transport: &dyn Transport) {
        if self.phase != SessionPhase::Active {
            return;
        }
        self.seed = fresh_seed();
        loot::advance_floor(&mut self.world, self.seed);
        self.broadcast(
            transport,
            ServerMessage::NextFloor {
                floor: self.world.floor,
                seed: self.seed,
                dungeon: dungeon_view(&self.world.dungeon),
            },
        );
    }

    /// End the run if nobody is left alive
    fn check_game_over(&mut self, transport: &dyn Transport) {
        if self.phase != SessionPhase::Active || self.world.any_alive() {
            return;
        }
        self.phase = SessionPhase::Ended;
        self.cancel(Deferred::AdvanceFloor);
        self.schedule(self.settings.teardown_delay_ticks, Deferred::Teardown);
        log::info!(
            "Session {} ended on floor {} with {} kills",
            self.code,
            self.world.floor,
            self.world.kills
        );
        self.broadcast(
            transport,
            ServerMessage::GameOver {
                floor: self.world.floor,
                kills: self.world.kills,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EnemyKind;
    use crate::protocol::testing::RecordingTransport;
    use crate::sim::dungeon::RoomCoord;
    use crate::room_center;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);

    fn settings() -> Settings {
        Settings {
            floor_advance_delay_ticks: 2,
            teardown_delay_ticks: 3,
            ..Settings::manual()
        }
    }

    fn lobby(n: u64, t: &RecordingTransport) -> Session {
        let mut s = Session::new("TEST".to_string(), 1234, &settings());
        for c in 1..=n {
            s.admit(ConnectionId(c), t).unwrap();
        }
        t.take();
        s
    }

    fn started(n: u64, t: &RecordingTransport) -> Session {
        let mut s = lobby(n, t);
        for id in 1..=n as u32 {
            s.toggle_ready(id, None, None, t);
        }
        t.take();
        s
    }

    #[test]
    fn test_first_player_is_host_and_told_so() {
        let t = RecordingTransport::default();
        let mut s = Session::new("ABCD".to_string(), 77, &settings());
        let id = s.admit(A, &t).unwrap();
        assert_eq!(id, 1);
        let sent = t.take_for(A);
        assert_eq!(
            sent[0],
            ServerMessage::Joined {
                code: "ABCD".to_string(),
                player_id: 1,
                is_host: true,
                seed: 77
            }
        );
        assert_eq!(s.seed(), 77);
        assert_eq!(sent[1].kind(), "lobby_state");

        s.admit(B, &t).unwrap();
        assert!(!s.world().players[1].is_host);
    }

    #[test]
    fn test_join_refused_when_full_or_started() {
        let t = RecordingTransport::default();
        let mut s = lobby(4, &t);
        assert_eq!(s.admit(ConnectionId(9), &t), Err(JoinError::Full { max: 4 }));
        assert_eq!(s.player_count(), 4);

        let mut s = started(1, &t);
        assert_eq!(s.admit(ConnectionId(9), &t), Err(JoinError::AlreadyStarted));
        assert_eq!(s.player_count(), 1);
    }

    #[test]
    fn test_single_ready_player_starts_game() {
        let t = RecordingTransport::default();
        let mut s = lobby(1, &t);
        s.toggle_ready(1, Some("#123456".to_string()), None, &t);

        assert_eq!(s.phase(), SessionPhase::Active);
        let kinds = t.kinds_for(A);
        assert_eq!(kinds, vec!["lobby_state", "game_start"]);
        let world = s.world();
        assert_eq!(world.players[0].body_color, "#123456");
        assert!(!world.players[0].ready);
        assert!(!world.dungeon.room(RoomCoord::ORIGIN).enemies.is_empty());
        assert!(world.dungeon.room(RoomCoord::BOSS).enemies.is_empty());
    }

    #[test]
    fn test_only_host_can_force_start() {
        let t = RecordingTransport::default();
        let mut s = lobby(2, &t);
        s.request_start(2, &t);
        assert_eq!(s.phase(), SessionPhase::Forming);
        s.request_start(1, &t);
        assert_eq!(s.phase(), SessionPhase::Active);
    }

    #[test]
    fn test_fatal_hit_clamps_and_ends_game() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.world_mut().players[0].hp = 10;
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 15,
            }],
            &t,
        );

        let p = &s.world().players[0];
        assert_eq!(p.hp, 0);
        assert!(!p.alive);
        assert_eq!(s.phase(), SessionPhase::Ended);
        assert_eq!(t.kinds_for(A), vec!["player_hit", "player_dead", "game_over"]);
        assert_eq!(s.pending(), vec![Deferred::Teardown]);
    }

    #[test]
    fn test_game_continues_while_anyone_lives() {
        let t = RecordingTransport::default();
        let mut s = started(2, &t);
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 500,
            }],
            &t,
        );
        assert_eq!(s.phase(), SessionPhase::Active);
        t.take();

        // Hits on the dead are dropped
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 5,
            }],
            &t,
        );
        assert!(t.take().is_empty());
        assert_eq!(s.world().players[0].hp, 0);
    }

    #[test]
    fn test_teardown_fires_after_delay() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 500,
            }],
            &t,
        );
        assert_eq!(s.tick(&t), TickOutcome::Continue);
        assert_eq!(s.tick(&t), TickOutcome::Continue);
        assert_eq!(s.tick(&t), TickOutcome::Teardown);
    }

    #[test]
    fn test_restart_from_ended_cancels_teardown() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 500,
            }],
            &t,
        );
        s.tick(&t);
        s.toggle_ready(1, None, None, &t);

        assert_eq!(s.phase(), SessionPhase::Active);
        assert!(s.pending().is_empty());
        let p = &s.world().players[0];
        assert!(p.alive);
        assert_eq!(p.hp, p.max_hp);
        for _ in 0..5 {
            assert_eq!(s.tick(&t), TickOutcome::Continue);
        }
    }

    #[test]
    fn test_ready_ignored_mid_game() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.toggle_ready(1, Some("#000".to_string()), None, &t);
        assert!(!s.world().players[0].ready);
        assert_ne!(s.world().players[0].body_color, "#000");
        assert!(t.take().is_empty());
    }

    #[test]
    fn test_boss_clear_advances_floor_after_delay() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.world_mut().dungeon.room_mut(RoomCoord::ORIGIN).enemies.clear();
        s.resolve(
            vec![GameEvent::RoomCleared {
                room: RoomCoord::BOSS,
                chest: false,
                boss: true,
            }],
            &t,
        );
        assert_eq!(s.pending(), vec![Deferred::AdvanceFloor]);

        s.tick(&t);
        assert_eq!(s.world().floor, 1);
        t.take();
        s.tick(&t);
        assert_eq!(s.world().floor, 2);
        let kinds = t.kinds_for(A);
        assert_eq!(kinds.first(), Some(&"next_floor"));
        assert_eq!(s.world().players[0].max_hp, 120);
        assert_eq!(s.world().players[0].pos, room_center());
    }

    #[test]
    fn test_game_over_cancels_floor_advance() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.resolve(
            vec![
                GameEvent::RoomCleared {
                    room: RoomCoord::BOSS,
                    chest: false,
                    boss: true,
                },
                GameEvent::PlayerHit {
                    player_id: 1,
                    damage: 500,
                },
            ],
            &t,
        );
        assert_eq!(s.pending(), vec![Deferred::Teardown]);
        s.tick(&t);
        s.tick(&t);
        assert_eq!(s.world().floor, 1);
    }

    #[test]
    fn test_chest_room_clear_drops_loot() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        let room = RoomCoord::new(1, 1);
        s.resolve(
            vec![GameEvent::RoomCleared {
                room,
                chest: true,
                boss: false,
            }],
            &t,
        );
        assert_eq!(s.world().dungeon.room(room).pickups.len(), 2);
        assert_eq!(t.kinds_for(A), vec!["room_cleared", "chest_opened"]);
    }

    #[test]
    fn test_kill_counts_and_reports_xp() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.resolve(
            vec![GameEvent::EnemyKilled {
                enemy_id: 42,
                kind: EnemyKind::Wizard,
                pos: room_center(),
                room: RoomCoord::ORIGIN,
            }],
            &t,
        );
        assert_eq!(s.world().kills, 1);
        assert_eq!(
            t.take_for(A),
            vec![ServerMessage::EnemyKilled {
                enemy_id: 42,
                room: RoomCoord::ORIGIN,
                xp: 30
            }]
        );
    }

    #[test]
    fn test_emptied_session_refuses_late_joins() {
        let t = RecordingTransport::default();
        let mut s = lobby(1, &t);
        s.remove_player(1, &t);
        assert!(s.is_empty());
        assert_eq!(s.admit(B, &t), Err(JoinError::NotFound));
        assert!(s.is_empty());
        assert!(t.take().is_empty());
    }

    #[test]
    fn test_expired_session_refuses_joins() {
        let t = RecordingTransport::default();
        let mut s = started(1, &t);
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 1,
                damage: 500,
            }],
            &t,
        );
        while s.tick(&t) == TickOutcome::Continue {}
        assert_eq!(s.admit(B, &t), Err(JoinError::NotFound));
        assert_eq!(s.code(), "TEST");
    }

    #[test]
    fn test_host_leaving_transfers_role() {
        let t = RecordingTransport::default();
        let mut s = lobby(3, &t);
        s.remove_player(1, &t);
        assert!(s.world().players[0].is_host);
        assert_eq!(s.world().players[0].id, 2);
        assert_eq!(t.kinds_for(B), vec!["host_transferred", "lobby_state"]);
    }

    #[test]
    fn test_last_living_player_leaving_ends_game() {
        let t = RecordingTransport::default();
        let mut s = started(2, &t);
        s.resolve(
            vec![GameEvent::PlayerHit {
                player_id: 2,
                damage: 500,
            }],
            &t,
        );
        s.remove_player(1, &t);
        assert_eq!(s.phase(), SessionPhase::Ended);
    }

    #[test]
    fn test_input_only_buffered_while_active() {
        let t = RecordingTransport::default();
        let mut s = lobby(1, &t);
        let frame = InputFrame {
            dx: Some(1.0),
            shooting: true,
            ..Default::default()
        };
        s.buffer_input(1, &frame);
        assert!(!s.world().players[0].input.shooting);

        s.toggle_ready(1, None, None, &t);
        s.buffer_input(1, &frame);
        assert!(s.world().players[0].input.shooting);
    }

    #[test]
    fn test_tick_broadcasts_state_each_tick() {
        let t = RecordingTransport::default();
        let mut s = started(2, &t);
        s.tick(&t);
        let kinds = t.kinds_for(B);
        assert_eq!(kinds.last(), Some(&"state"));
        assert_eq!(s.tick_count(), 1);
    }
}
