mod assets;

use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::broadcast, time::Instant};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{engine::Engine, pacing::TickPacer, snapshot::WorldSnapshot};

#[derive(Clone, Serialize)]
pub struct UiFrame {
    pub snapshot: WorldSnapshot,
    pub completed: bool,
}

#[derive(Clone, Serialize)]
pub struct StateEnvelope {
    pub scenario: String,
    pub total_days: u64,
    pub frame: Option<UiFrame>,
    pub completed: bool,
}

/// Latest frame, day-by-day history and the live broadcast channel.
struct FrameHub {
    broadcaster: broadcast::Sender<String>,
    latest: Mutex<Option<UiFrame>>,
    history: Mutex<Vec<UiFrame>>,
    done: AtomicBool,
}

impl FrameHub {
    fn new() -> Self {
        let (broadcaster, _) = broadcast::channel::<String>(512);
        Self {
            broadcaster,
            latest: Mutex::new(None),
            history: Mutex::new(Vec::new()),
            done: AtomicBool::new(false),
        }
    }

    fn publish(&self, frame: UiFrame) {
        if let Ok(payload) = serde_json::to_string(&frame) {
            // no subscribers is fine
            let _ = self.broadcaster.send(payload);
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    fn latest(&self) -> Option<UiFrame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn history(&self) -> Vec<UiFrame> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct AppState {
    hub: Arc<FrameHub>,
    scenario_name: String,
    total_days: u64,
}

pub struct WebServerConfig {
    /// Engine with its outbreak already started.
    pub engine: Engine,
    pub scenario_name: String,
    pub days: u64,
    pub ticks_per_second: u32,
    pub host: String,
    pub port: u16,
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        mut engine,
        scenario_name,
        days,
        ticks_per_second,
        host,
        port,
    } = config;

    let hub = Arc::new(FrameHub::new());
    hub.publish(UiFrame {
        snapshot: engine.snapshot(),
        completed: false,
    });

    let hub_for_sim = hub.clone();
    let sim_handle = tokio::spawn(async move {
        let mut pacer = TickPacer::new(ticks_per_second);
        pacer.start();
        let mut clock = tokio::time::interval(pacer.interval());
        let mut last = Instant::now();
        let target = engine.day() + days;

        while engine.day() < target {
            clock.tick().await;
            let now = Instant::now();
            let due = pacer.advance(now - last);
            last = now;
            for _ in 0..due {
                if engine.step()?.day_boundary {
                    hub_for_sim.publish(UiFrame {
                        snapshot: engine.snapshot(),
                        completed: false,
                    });
                }
                if engine.day() >= target {
                    break;
                }
            }
        }

        hub_for_sim.done.store(true, Ordering::SeqCst);
        hub_for_sim.publish(UiFrame {
            snapshot: engine.snapshot(),
            completed: true,
        });
        Ok::<_, anyhow::Error>(engine.day())
    });

    let label = scenario_name.clone();
    tokio::spawn(async move {
        match sim_handle.await {
            Ok(Ok(day)) => tracing::info!(scenario = %label, day, "simulation completed"),
            Ok(Err(err)) => tracing::error!(scenario = %label, "simulation error: {err:?}"),
            Err(err) => tracing::error!(scenario = %label, "simulation task failed: {err:?}"),
        }
    });

    let state = Arc::new(AppState {
        hub,
        scenario_name,
        total_days: days,
    });

    let router = Router::new()
        .route("/", get(index))
        .route("/styles.css", get(styles))
        .route("/app.js", get(script))
        .route("/api/state", get(latest_state))
        .route("/api/frames", get(all_frames))
        .route("/api/events", get(stream_events))
        .with_state(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("map view live at http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down map view");
}

async fn index() -> Html<&'static str> {
    Html(assets::INDEX_HTML)
}

async fn styles() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        assets::STYLES_CSS,
    )
}

async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        assets::APP_JS,
    )
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateEnvelope> {
    Json(StateEnvelope {
        scenario: state.scenario_name.clone(),
        total_days: state.total_days,
        frame: state.hub.latest(),
        completed: state.hub.done.load(Ordering::SeqCst),
    })
}

#[derive(Serialize)]
struct FramesResponse {
    scenario: String,
    total_days: u64,
    completed: bool,
    frames: Vec<UiFrame>,
}

async fn all_frames(State(state): State<Arc<AppState>>) -> Json<FramesResponse> {
    Json(FramesResponse {
        scenario: state.scenario_name.clone(),
        total_days: state.total_days,
        completed: state.hub.done.load(Ordering::SeqCst),
        frames: state.hub.history(),
    })
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
