//! Scripted transports and log capture shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use traq_ws::{Client, ClientConfig, Connector, EventKind, Frame, Transport, TraqError, TraqResult};

/// One scripted connection. Frames are fed by the test through `SessionHandle`.
struct ScriptedTransport {
    frames: mpsc::UnboundedReceiver<TraqResult<Frame>>,
    fail_ping: bool,
    pings: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn next_frame(&mut self) -> Option<TraqResult<Frame>> {
        self.frames.recv().await
    }

    async fn ping(&mut self) -> TraqResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.fail_ping {
            Err(TraqError::Liveness("ping failed".into()))
        } else {
            Ok(())
        }
    }

    async fn close(&mut self) -> TraqResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Test-side end of a scripted connection.
pub struct SessionHandle {
    pub tx: mpsc::UnboundedSender<TraqResult<Frame>>,
    pub pings: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn send_text(&self, text: &str) {
        self.tx.send(Ok(Frame::Text(text.to_string()))).unwrap();
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Hands out scripted transports in order; connects hang once they run out.
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<ScriptedTransport>>,
    refusals: AtomicUsize,
    pub tokens: Arc<Mutex<Vec<String>>>,
    pub live: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    /// Refuse the first `n` connects before handing out sessions.
    pub fn refuse_first(self, n: usize) -> Self {
        self.refusals.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str, token: &str) -> TraqResult<Box<dyn Transport>> {
        self.tokens.lock().unwrap().push(token.to_string());
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TraqError::Transport("connection refused".into()));
        }

        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(transport) => {
                self.live.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(transport) as Box<dyn Transport>)
            }
            None => std::future::pending().await,
        }
    }
}

/// A connector with one scripted session per entry; `true` makes that
/// session's heartbeat ping fail.
pub fn script(fail_pings: &[bool]) -> (ScriptedConnector, Vec<SessionHandle>) {
    let mut transports = VecDeque::new();
    let mut handles = Vec::new();
    for &fail_ping in fail_pings {
        let (tx, frames) = mpsc::unbounded_channel();
        let pings = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));
        transports.push_back(ScriptedTransport {
            frames,
            fail_ping,
            pings: pings.clone(),
            closed: closed.clone(),
        });
        handles.push(SessionHandle { tx, pings, closed });
    }
    let connector = ScriptedConnector {
        sessions: Mutex::new(transports),
        refusals: AtomicUsize::new(0),
        tokens: Arc::new(Mutex::new(Vec::new())),
        live: Arc::new(AtomicUsize::new(0)),
    };
    (connector, handles)
}

/// A client with a 20 ms heartbeat over `connector`.
pub fn client_with(connector: ScriptedConnector, debug: bool) -> Arc<Client> {
    let config = ClientConfig {
        heartbeat_interval_ms: 20,
        ..ClientConfig::with_token("bot-token").debug(debug)
    }
    .resolve_with(|_| None)
    .unwrap();
    Arc::new(Client::with_connector(config, connector))
}

/// Register a handler that forwards bodies of `kind` into a channel.
pub fn forward(client: &Client, kind: EventKind) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    client
        .on(kind, move |body| {
            let _ = tx.send(body);
        })
        .unwrap();
    rx
}

/// Start listening; every open is reported on the returned channel.
pub fn start(
    client: &Arc<Client>,
) -> (tokio::task::JoinHandle<TraqResult<()>>, mpsc::UnboundedReceiver<()>) {
    let (open_tx, open_rx) = mpsc::unbounded_channel();
    let listener = client.clone();
    let task = tokio::spawn(async move {
        listener
            .listen(Some(Box::new(move || {
                let _ = open_tx.send(());
            })))
            .await
    });
    (task, open_rx)
}

/// A captured tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Events recorded by the capture layer.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Whether an event at `level` contains `message`.
    pub fn has_event(&self, level: Level, message: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.level == level && e.message.contains(message))
    }

    /// Whether any event, at any level, contains `message`.
    pub fn has_message(&self, message: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.message.contains(message))
    }

    /// Events from this crate at `INFO` or more severe.
    pub fn loud_events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.target.starts_with("traq_ws") && e.level <= Level::INFO)
            .cloned()
            .collect()
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.logs.events.lock().unwrap().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
        });
    }
}

/// Capture every event on the current thread until the guard is dropped.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let guard = tracing_subscriber::registry()
        .with(CaptureLayer { logs: logs.clone() })
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}
