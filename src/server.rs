//! Session registry and message dispatch
//!
//! The server maps join codes to sessions and connections to players. Lock
//! order is registry maps before a session, and no registry lock is held
//! while a session is locked, so tick threads never contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::Rng;

use crate::driver::TickDriver;
use crate::error::{JoinError, ProtocolError};
use crate::protocol::{ClientMessage, ConnectionId, ServerMessage, Transport};
use crate::session::{Session, SessionPhase, TickOutcome, fresh_seed};
use crate::settings::Settings;
use crate::sim::entity::PlayerId;

/// Join codes avoid 0/O and 1/I
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 4;

type SharedSession = Arc<Mutex<Session>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn random_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Where a connection currently sits
#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    code: String,
    player_id: PlayerId,
}

struct Registry {
    settings: Settings,
    transport: Arc<dyn Transport>,
    sessions: Mutex<HashMap<String, SharedSession>>,
    bindings: Mutex<HashMap<ConnectionId, Binding>>,
    drivers: Mutex<HashMap<String, TickDriver>>,
}

impl Registry {
    fn session(&self, code: &str) -> Option<SharedSession> {
        lock(&self.sessions).get(code).cloned()
    }

    fn binding(&self, conn: ConnectionId) -> Option<Binding> {
        lock(&self.bindings).get(&conn).cloned()
    }

    /// Forget a session, its connections and its driver
    ///
    /// Safe to call from the session's own tick thread: the driver is only
    /// flagged, never joined.
    fn discard(&self, code: &str) {
        let removed = lock(&self.sessions).remove(code).is_some();
        lock(&self.bindings).retain(|_, b| b.code != code);
        if let Some(driver) = lock(&self.drivers).remove(code) {
            driver.stop();
        }
        if removed {
            log::info!("Session {} discarded", code);
        }
    }
}

/// Entry point for an embedder: feed it client payloads and disconnects
pub struct Server {
    inner: Arc<Registry>,
}

impl Server {
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Registry {
                settings,
                transport,
                sessions: Mutex::new(HashMap::new()),
                bindings: Mutex::new(HashMap::new()),
                drivers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Handle one raw client payload
    ///
    /// Anything that cannot be acted on is logged and dropped; the client is
    /// only answered for refused joins.
    pub fn on_message(&self, conn: ConnectionId, payload: &str) {
        let result = ClientMessage::parse(payload).and_then(|msg| self.handle(conn, msg));
        if let Err(e) = result {
            log::debug!("Dropped message from {:?}: {}", conn, e);
        }
    }

    /// Handle a parsed client message
    pub fn handle(&self, conn: ConnectionId, msg: ClientMessage) -> Result<(), ProtocolError> {
        match msg {
            ClientMessage::Create => {
                self.create(conn);
                Ok(())
            }
            ClientMessage::Join { code } => {
                self.join(conn, &code);
                Ok(())
            }
            ClientMessage::Exit => {
                self.inner
                    .binding(conn)
                    .ok_or(ProtocolError::NotInSession(conn))?;
                self.leave(conn);
                Ok(())
            }
            ClientMessage::Ready {
                body_color,
                cape_color,
            } => self.with_bound(conn, |session, id, transport| {
                session.toggle_ready(id, body_color, cape_color, transport);
            }),
            ClientMessage::Start => self.with_bound(conn, |session, id, transport| {
                session.request_start(id, transport);
            }),
            ClientMessage::Input(frame) => self.with_bound(conn, |session, id, _| {
                session.buffer_input(id, &frame);
            }),
        }
    }

    /// A connection closed; same as an explicit exit
    pub fn on_disconnect(&self, conn: ConnectionId) {
        self.leave(conn);
    }

    /// Run one tick of a session from the caller's thread
    ///
    /// For embedders that drive ticks themselves. Returns `None` for an
    /// unknown code.
    pub fn tick_session(&self, code: &str) -> Option<TickOutcome> {
        let session = self.inner.session(code)?;
        let outcome = lock(&session).tick(self.inner.transport.as_ref());
        if outcome == TickOutcome::Teardown {
            self.inner.discard(code);
        }
        Some(outcome)
    }

    pub fn session_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = lock(&self.inner.sessions).keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn session_count(&self) -> usize {
        lock(&self.inner.sessions).len()
    }

    /// Inspect a session under its lock
    pub fn with_session<R>(&self, code: &str, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let session = self.inner.session(code)?;
        let guard = lock(&session);
        Some(f(&guard))
    }

    /// The session code and player id a connection is bound to
    pub fn binding_of(&self, conn: ConnectionId) -> Option<(String, PlayerId)> {
        self.inner.binding(conn).map(|b| (b.code, b.player_id))
    }

    pub fn has_driver(&self, code: &str) -> bool {
        lock(&self.inner.drivers).contains_key(code)
    }

    /// Stop every tick thread and wait for them to exit
    pub fn shutdown(&self) {
        let drivers: Vec<TickDriver> = lock(&self.inner.drivers).drain().map(|(_, d)| d).collect();
        log::info!("Stopping {} tick drivers", drivers.len());
        for driver in drivers {
            driver.join();
        }
    }

    // === Handlers ===

    fn create(&self, conn: ConnectionId) {
        let code = {
            let mut sessions = lock(&self.inner.sessions);
            let mut rng = rand::rng();
            let mut code = random_code(&mut rng);
            while sessions.contains_key(&code) {
                code = random_code(&mut rng);
            }
            let session = Session::new(code.clone(), fresh_seed(), &self.inner.settings);
            sessions.insert(code.clone(), Arc::new(Mutex::new(session)));
            code
        };
        log::info!("Session {} created by {:?}", code, conn);
        self.join(conn, &code);
    }

    /// Admit `conn` into the session `code`
    ///
    /// The connection only leaves its current session once the new one has
    /// accepted it, so a refused join changes nothing.
    fn join(&self, conn: ConnectionId, code: &str) {
        let code = code.trim().to_uppercase();
        let transport = self.inner.transport.as_ref();

        if self.inner.binding(conn).is_some_and(|b| b.code == code) {
            log::debug!("{:?} is already in session {}", conn, code);
            return;
        }

        let admitted = match self.inner.session(&code) {
            Some(session) => {
                let mut guard = lock(&session);
                guard.admit(conn, transport)
            }
            None => Err(JoinError::NotFound),
        };

        match admitted {
            Ok(player_id) => {
                let previous = lock(&self.inner.bindings).insert(conn, Binding { code, player_id });
                if let Some(previous) = previous {
                    self.leave_session(previous);
                }
            }
            Err(e) => {
                log::warn!("Join {} refused for {:?}: {}", code, conn, e);
                transport.send(conn, &ServerMessage::Error { msg: e.to_string() });
            }
        }
    }

    /// Unbind a connection and remove its player; discards the session once
    /// nobody is left
    fn leave(&self, conn: ConnectionId) {
        let Some(binding) = lock(&self.inner.bindings).remove(&conn) else {
            return;
        };
        self.leave_session(binding);
    }

    fn leave_session(&self, binding: Binding) {
        let Some(session) = self.inner.session(&binding.code) else {
            return;
        };
        let empty = {
            let mut guard = lock(&session);
            guard.remove_player(binding.player_id, self.inner.transport.as_ref());
            guard.is_empty()
        };
        if empty {
            self.inner.discard(&binding.code);
        }
    }

    /// Run `f` on the sender's session, then make sure a running game has a
    /// tick driver
    fn with_bound(
        &self,
        conn: ConnectionId,
        f: impl FnOnce(&mut Session, PlayerId, &dyn Transport),
    ) -> Result<(), ProtocolError> {
        let binding = self
            .inner
            .binding(conn)
            .ok_or(ProtocolError::NotInSession(conn))?;
        let session = self
            .inner
            .session(&binding.code)
            .ok_or_else(|| ProtocolError::UnknownSession(binding.code.clone()))?;

        let active = {
            let mut guard = lock(&session);
            f(&mut guard, binding.player_id, self.inner.transport.as_ref());
            guard.phase() == SessionPhase::Active
        };
        if active {
            self.ensure_driver(&binding.code, session);
        }
        Ok(())
    }

    fn ensure_driver(&self, code: &str, session: SharedSession) {
        if !self.inner.settings.spawn_tick_drivers {
            return;
        }
        let mut drivers = lock(&self.inner.drivers);
        if drivers.contains_key(code) {
            return;
        }

        let registry: Weak<Registry> = Arc::downgrade(&self.inner);
        let owned_code = code.to_string();
        let on_tick = move || {
            let Some(registry) = registry.upgrade() else {
                return TickOutcome::Teardown;
            };
            let outcome = lock(&session).tick(registry.transport.as_ref());
            if outcome == TickOutcome::Teardown {
                registry.discard(&owned_code);
            }
            outcome
        };

        match TickDriver::spawn(
            format!("tick-{code}"),
            self.inner.settings.tick_interval(),
            on_tick,
        ) {
            Ok(driver) => {
                log::debug!("Tick driver started for session {}", code);
                drivers.insert(code.to_string(), driver);
            }
            Err(e) => log::error!("Could not start tick driver for {}: {}", code, e),
        }
    }
}
