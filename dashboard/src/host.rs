use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{info, warn};

use waterbot_common::{
    AuthoritativeSettings, DashboardConfig, FieldName, FormState, History, HistorySnapshot,
    Measurement, PumpControl, RuntimeConfig, SubmissionController, SubmissionOutcome,
    SubmissionState, TransportError, WateringEvent, TOPIC_HISTORY_EVENT,
    TOPIC_HISTORY_MEASUREMENT, TOPIC_HISTORY_STATE, TOPIC_PUMP_STATE, TOPIC_SETTINGS_FLAGS,
    TOPIC_SETTINGS_RESULT, TOPIC_SETTINGS_STATE,
};

use crate::mqtt::MqttTransport;

/// The settings form and the controller that gates its submission. Held
/// under one lock so a reset can never interleave with a submit.
struct SettingsScreen {
    form: FormState,
    submission: SubmissionController,
}

#[derive(Clone)]
struct AppState {
    screen: Arc<Mutex<SettingsScreen>>,
    pump: Arc<Mutex<PumpControl>>,
    history: Arc<Mutex<History>>,
    transport: MqttTransport,
    config: Arc<DashboardConfig>,
    max_payload_bytes: usize,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime);
    runtime.sanitize();

    let network = &runtime.network;
    let mut mqtt_options =
        MqttOptions::new(network.mqtt_client_id.clone(), network.mqtt_host.clone(), network.mqtt_port);
    if !network.mqtt_user.is_empty() {
        mqtt_options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState::new(&runtime, MqttTransport::new(mqtt));

    subscribe_topics(app_state.transport.client()).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    request_initial_data(&app_state).await;

    let app = Router::new()
        .route("/api/settings", get(handle_get_settings))
        .route("/api/settings/fetch", post(handle_fetch_settings))
        .route("/api/settings/field", post(handle_edit_field))
        .route("/api/settings/submit", post(handle_submit_settings))
        .route("/api/dashboard", get(handle_get_dashboard))
        .route("/api/pump/trigger", post(handle_trigger_pump))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard server at {addr}"))?;

    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

impl AppState {
    fn new(runtime: &RuntimeConfig, transport: MqttTransport) -> Self {
        let dashboard = runtime.dashboard.clone();
        Self {
            screen: Arc::new(Mutex::new(SettingsScreen {
                form: FormState::new(dashboard.revalidation),
                submission: SubmissionController::new(),
            })),
            pump: Arc::new(Mutex::new(PumpControl::new(
                dashboard.fallback_device_name.clone(),
            ))),
            history: Arc::new(Mutex::new(History::new(dashboard.max_history_events))),
            transport,
            config: Arc::new(dashboard),
            max_payload_bytes: runtime.max_mqtt_payload_bytes,
        }
    }
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        runtime.network.mqtt_host = host;
    }
    if let Some(port) = env_parse::<u16>("MQTT_PORT") {
        runtime.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        runtime.network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        runtime.network.mqtt_pass = pass;
    }
    if let Some(port) = env_parse::<u16>("DASHBOARD_HTTP_PORT") {
        runtime.http_port = port;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [
        TOPIC_SETTINGS_STATE,
        TOPIC_SETTINGS_RESULT,
        TOPIC_SETTINGS_FLAGS,
        TOPIC_PUMP_STATE,
        TOPIC_HISTORY_STATE,
        TOPIC_HISTORY_MEASUREMENT,
        TOPIC_HISTORY_EVENT,
    ];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("failed to subscribe to {topic}"))?;
    }
    Ok(())
}

async fn request_initial_data(app_state: &AppState) {
    if let Err(err) = fetch_settings(app_state).await {
        warn!("settings fetch request failed: {err}");
    }

    let mut transport = app_state.transport.clone();
    match transport.request_history() {
        Ok(()) => app_state.history.lock().await.begin_fetch(),
        Err(err) => warn!("history fetch request failed: {err}"),
    }
}

// Mirrors the settings screen mounting: clears a stale error and asks the
// source to push its settings again.
async fn fetch_settings(app_state: &AppState) -> Result<(), TransportError> {
    let mut transport = app_state.transport.clone();
    let mut screen = app_state.screen.lock().await;
    screen.submission.fetch(&mut transport)
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, &message.topic, &message.payload).await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    if payload.len() > app_state.max_payload_bytes {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    match topic {
        TOPIC_SETTINGS_STATE => {
            let settings: AuthoritativeSettings =
                serde_json::from_slice(payload).context("invalid settings payload")?;
            let mut screen = app_state.screen.lock().await;
            let SettingsScreen { form, submission } = &mut *screen;
            if submission.receive_settings(settings, form) {
                info!("settings form reset from authoritative settings");
            }
        }
        TOPIC_SETTINGS_RESULT => {
            let outcome: SubmissionOutcome =
                serde_json::from_slice(payload).context("invalid submission result payload")?;
            let mut screen = app_state.screen.lock().await;
            let SettingsScreen { form, submission } = &mut *screen;
            submission.complete(outcome, form);
        }
        TOPIC_SETTINGS_FLAGS => {
            let flags: SubmissionState =
                serde_json::from_slice(payload).context("invalid settings flags payload")?;
            app_state.screen.lock().await.submission.apply_state(flags);
        }
        TOPIC_PUMP_STATE => {
            let message = std::str::from_utf8(payload).context("non utf8 pump state payload")?;
            let mut pump = app_state.pump.lock().await;
            pump.apply_status_message(message)
                .context("invalid pump state payload")?;
        }
        TOPIC_HISTORY_STATE => {
            let snapshot: HistorySnapshot =
                serde_json::from_slice(payload).context("invalid history payload")?;
            let mut history = app_state.history.lock().await;
            history.apply_snapshot(snapshot);
            info!(events = history.len(), "history loaded");
        }
        TOPIC_HISTORY_MEASUREMENT => {
            let measurement: Measurement =
                serde_json::from_slice(payload).context("invalid measurement payload")?;
            app_state.history.lock().await.record_measurement(measurement);
        }
        TOPIC_HISTORY_EVENT => {
            let event: WateringEvent =
                serde_json::from_slice(payload).context("invalid watering event payload")?;
            app_state.history.lock().await.record_event(event);
        }
        _ => {}
    }

    Ok(())
}

async fn handle_get_settings(State(state): State<AppState>) -> impl IntoResponse {
    let view = {
        let screen = state.screen.lock().await;
        screen.form.view(screen.submission.state())
    };
    Json(view)
}

async fn handle_fetch_settings(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(err) = fetch_settings(&state).await {
        return error_response(
            StatusCode::BAD_GATEWAY,
            &format!("Failed to request settings: {err}"),
        );
    }

    handle_get_settings(State(state)).await.into_response()
}

async fn handle_edit_field(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let Some(field) = params.get("field") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'field' parameter");
    };
    let field = match field.parse::<FieldName>() {
        Ok(field) => field,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };
    let value = params.get("value").map(String::as_str).unwrap_or_default();

    {
        let mut screen = state.screen.lock().await;
        screen.form.edit(field, value);
    }

    handle_get_settings(State(state)).await.into_response()
}

async fn handle_submit_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing bearer token");
    };

    let result = {
        let mut transport = state.transport.clone();
        let mut screen = state.screen.lock().await;
        let SettingsScreen { form, submission } = &mut *screen;
        submission.submit(form, token, &mut transport)
    };

    if let Err(err) = result {
        return error_response(
            StatusCode::BAD_GATEWAY,
            &format!("Failed to dispatch settings: {err}"),
        );
    }

    handle_get_settings(State(state)).await.into_response()
}

async fn handle_get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let (device_name, settings_fetching) = {
        let screen = state.screen.lock().await;
        (
            screen.submission.device_name().map(str::to_string),
            screen.submission.state().is_fetching,
        )
    };
    let view = {
        let pump = state.pump.lock().await;
        let history = state.history.lock().await;
        history.stats_view(
            &pump,
            device_name.as_deref(),
            bearer_token(&headers),
            settings_fetching,
            &state.config,
            Utc::now(),
        )
    };
    Json(view)
}

async fn handle_trigger_pump(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let result = {
        let mut transport = state.transport.clone();
        let mut pump = state.pump.lock().await;
        pump.trigger(bearer_token(&headers), &mut transport)
    };

    if let Err(err) = result {
        return error_response(
            StatusCode::BAD_GATEWAY,
            &format!("Failed to trigger pump: {err}"),
        );
    }

    handle_get_dashboard(State(state), headers)
        .await
        .into_response()
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("WATERBOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.waterbot"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
