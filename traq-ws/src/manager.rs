//! Connection manager for the traQ bot gateway.
//!
//! Owns the single logical connection: opens a transport, feeds inbound
//! frames through the decoder, probes liveness on a fixed period, and when
//! the transport closes for any reason opens a fresh one with the same
//! handler registry. There is no retry limit and no delay between attempts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use traq_core::{ClientConfig, ResolvedConfig, TraqError, TraqResult};

use crate::decoder;
use crate::events::{ConnectionState, Event, EventKind};
use crate::registry::HandlerRegistry;
use crate::transport::{Connector, Frame, Transport, WsConnector};

/// Callback fired every time a connection opens, reconnects included.
pub type OpenCallback = Box<dyn FnMut() + Send>;

/// Clears the listening flag when `listen()` returns or its future is dropped.
struct ListenGuard<'a>(&'a AtomicBool);

impl Drop for ListenGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Why a session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The transport reported close.
    Closed,
    /// The heartbeat probe failed and the transport was closed.
    Liveness(TraqError),
    /// The transport failed while reading.
    Transport(TraqError),
}

/// traQ bot gateway client.
///
/// Register handlers with [`Client::on`], then call [`Client::listen`].
/// `on` takes `&self`, so a client shared through an `Arc` can keep
/// registering handlers while it listens. Only one `listen()` may run at a
/// time; a second concurrent call is refused.
pub struct Client {
    /// Resolved configuration (token, endpoint, heartbeat period, diagnostics).
    config: ResolvedConfig,
    /// Handlers, shared by every session.
    registry: HandlerRegistry,
    /// Opens a transport per session.
    connector: Arc<dyn Connector>,
    /// Watch channel for state change notifications.
    state_tx: watch::Sender<ConnectionState>,
    /// Number of sessions opened so far.
    sessions: AtomicU64,
    /// Set while a `listen()` call is running.
    listening: AtomicBool,
}

impl Client {
    /// Create a client, resolving the token from `config` or the environment.
    pub fn new(config: ClientConfig) -> TraqResult<Self> {
        Ok(Self::from_resolved(config.resolve()?))
    }

    /// Create a client from an already resolved configuration.
    pub fn from_resolved(config: ResolvedConfig) -> Self {
        Self::with_connector(config, WsConnector::new())
    }

    /// Create a client that opens transports through `connector`.
    pub fn with_connector<C>(config: ResolvedConfig, connector: C) -> Self
    where
        C: Connector + 'static,
    {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);

        Self {
            config,
            registry: HandlerRegistry::new(),
            connector: Arc::new(connector),
            state_tx,
            sessions: AtomicU64::new(0),
            listening: AtomicBool::new(false),
        }
    }

    /// Register the handler for `kind`.
    ///
    /// Fails if `kind` already has a handler. `ERROR` always does.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> TraqResult<()>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.registry.register(kind, handler)
    }

    /// Register a handler that receives the body as a typed payload.
    pub fn on_payload<T, F>(&self, kind: EventKind, handler: F) -> TraqResult<()>
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.registry.register_payload(kind, handler)
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The configuration this client runs with.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Number of connections opened so far.
    pub fn session_count(&self) -> u64 {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Whether a `listen()` call is currently running.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Update the connection state and notify watchers.
    fn set_state(&self, new_state: ConnectionState) {
        self.state_tx.send_if_modified(|state| {
            if *state == new_state {
                return false;
            }
            debug!("connection state: {} -> {}", *state, new_state);
            *state = new_state;
            true
        });
    }

    /// Connect and keep the connection alive.
    ///
    /// `on_open` runs after every successful connect. Failures to connect,
    /// malformed frames, failed probes and closed transports are logged and
    /// followed by a fresh connection; none of them end this call. The
    /// returned future does not complete: drop or abort it to stop.
    ///
    /// Fails with [`TraqError::AlreadyListening`] if another `listen()` on
    /// this client is still running, so at most one transport is ever open.
    pub async fn listen(&self, mut on_open: Option<OpenCallback>) -> TraqResult<()> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(TraqError::AlreadyListening);
        }
        let _listening = ListenGuard(&self.listening);

        loop {
            self.set_state(ConnectionState::Connecting);

            match self
                .connector
                .connect(self.config.url(), self.config.token())
                .await
            {
                Ok(transport) => {
                    let session = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
                    self.set_state(ConnectionState::Open);
                    debug!(session, url = self.config.url(), "connected");
                    if let Some(callback) = on_open.as_mut() {
                        callback();
                    }

                    let end = self.run_session(session, transport).await;
                    self.set_state(ConnectionState::Closing);
                    match end {
                        SessionEnd::Closed => debug!(session, "connection closed, reconnecting"),
                        SessionEnd::Liveness(e) => {
                            debug!(session, error = %e, "liveness probe failed")
                        }
                        SessionEnd::Transport(e) => {
                            debug!(session, error = %e, "connection lost, reconnecting")
                        }
                    }
                }
                Err(e) => debug!(error = %e, "failed to connect, retrying"),
            }

            self.set_state(ConnectionState::Idle);
            tokio::task::yield_now().await;
        }
    }

    /// Drive one open transport until it closes.
    ///
    /// The transport is dropped when this returns, so the next session
    /// never overlaps with this one.
    async fn run_session(&self, session: u64, mut transport: Box<dyn Transport>) -> SessionEnd {
        let mut heartbeat = interval(self.config.heartbeat_interval());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                frame = transport.next_frame() => match frame {
                    Some(Ok(frame)) => {
                        self.handle_frame(session, frame);
                    }
                    Some(Err(e)) => return SessionEnd::Transport(e),
                    None => return SessionEnd::Closed,
                },
                _ = heartbeat.tick() => {
                    trace!(session, "sending liveness probe");
                    if let Err(e) = transport.ping().await {
                        if self.config.debug() {
                            warn!(session, error = %e, "heartbeat failed, reconnecting");
                        }
                        if let Err(close_err) = transport.close().await {
                            debug!(session, error = %close_err, "close after failed probe");
                        }
                        drop(heartbeat);
                        return SessionEnd::Liveness(e);
                    }
                }
            }
        }
    }

    /// Decode and dispatch one inbound frame.
    ///
    /// Errors are confined to the frame: they are logged and the frame is
    /// dropped. Returns the decoded event when there is one.
    fn handle_frame(&self, session: u64, frame: Frame) -> Option<Event> {
        let result = frame
            .into_text()
            .and_then(|text| decoder::decode_frame(&text))
            .and_then(|raw| decoder::decode_and_dispatch(raw, &self.registry));

        match result {
            Ok(event) => {
                if self.config.debug() {
                    info!(session, kind = %event.kind, "event received");
                }
                Some(event)
            }
            Err(e) => {
                if self.config.debug() {
                    warn!(session, error = %e, "dropping malformed frame");
                } else {
                    trace!(session, error = %e, "dropping malformed frame");
                }
                None
            }
        }
    }
}
