//! HTTP API server: axum router and request handlers.
//!
//! The server runs on the tokio async runtime while the render thread
//! runs on a plain `std::thread`. Handlers never wait for the keyboard:
//! they validate the request, hand a `RenderCommand` to the `Controller`
//! and return. The result of color commands shows up in `/status`.
//!
//! ## Rust concepts
//! - `async fn` and `.await` for non-blocking I/O
//! - axum extractors: `State`, `Json`
//! - `Arc` for sharing state across async tasks
//! - Serde `Deserialize` for parsing JSON request bodies
//! - `tower-http` middleware for CORS and request tracing

use crate::ambient::AmbientSettings;
use crate::frame::Effect;
use crate::keyboard::Outcome;
use crate::profile::Profile;
use crate::render::{self, Animation, Controller, DriverState, LightingStatus, RenderCommand};
use crate::swipe::{Direction, SwipeMode, SwipeOptions};
use crate::{Color, ZONE_COUNT, ZoneColors};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// ── App State ────────────────────────────────────────────────────────

/// Shared application state, passed to every handler via axum's `State` extractor.
///
/// Everything inside is cheap to clone: axum clones the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Sends commands to the render thread
    pub controller: Controller,
    /// Lighting status (render thread writes, handlers read)
    pub status: Arc<Mutex<LightingStatus>>,
    /// Profile the effect endpoints start from
    pub profile: Arc<Profile>,
}

// ── OpenAPI Documentation ────────────────────────────────────────────

#[derive(OpenApi)]
#[openapi(
    paths(
        get_status,
        get_profile,
        post_effect,
        post_speed,
        post_brightness,
        post_colors,
        post_solid_color,
        post_zone_color,
        post_transition,
        post_play_swipe,
        post_play_ripple,
        post_play_ambient,
        post_play_fade,
        post_stop,
    ),
    components(schemas(
        LightingStatus,
        DriverState,
        Outcome,
        Effect,
        Direction,
        SwipeMode,
        AmbientSettings,
        EffectRequest,
        LevelRequest,
        ColorsRequest,
        SolidColorRequest,
        ZoneColorRequest,
        TransitionRequest,
        SwipeRequest,
        AmbientRequest,
    )),
    tags(
        (name = "lighting", description = "Keyboard lighting control"),
        (name = "effects", description = "Software effect drivers"),
        (name = "system", description = "System status endpoints"),
    ),
    info(
        title = "Keyboard RGB API",
        version = env!("CARGO_PKG_VERSION"),
        description = "HTTP API for controlling a 4-zone RGB keyboard"
    )
)]
pub struct ApiDoc;

// ── Request types ────────────────────────────────────────────────────

#[derive(Deserialize, utoipa::ToSchema)]
pub struct EffectRequest {
    /// Firmware effect
    effect: Effect,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LevelRequest {
    /// Speed 1-4 or brightness 1-2; out-of-range values are clamped
    #[schema(example = 2)]
    value: u8,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ColorsRequest {
    /// Four `[r, g, b]` arrays, zone 0 first
    #[schema(value_type = Vec<Vec<u8>>, example = json!([[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 0, 255]]))]
    zones: ZoneColors,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SolidColorRequest {
    /// RGB color array `[red, green, blue]`
    #[schema(value_type = Vec<u8>, example = json!([255, 255, 255]))]
    color: Color,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ZoneColorRequest {
    /// Zone index, 0-3
    #[schema(example = 0, minimum = 0, maximum = 3)]
    zone: usize,
    #[schema(value_type = Vec<u8>, example = json!([255, 0, 0]))]
    color: Color,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TransitionRequest {
    #[schema(value_type = Vec<Vec<u8>>)]
    zones: ZoneColors,
    /// Number of intermediate frames
    #[serde(default = "default_steps")]
    #[schema(example = 150, default = 150)]
    steps: u32,
    /// Delay between frames, in milliseconds (at most 1000)
    #[serde(default = "default_delay_ms")]
    #[schema(example = 10, default = 10, maximum = 1000)]
    delay_ms: u64,
}

fn default_steps() -> u32 {
    150
}

fn default_delay_ms() -> u64 {
    10
}

/// A running transition only sees `/stop` between steps, so one step may
/// not sleep longer than this.
const MAX_STEP_DELAY_MS: u64 = 1000;

/// Swipe settings; omitted fields come from the profile.
#[derive(Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct SwipeRequest {
    mode: Option<SwipeMode>,
    direction: Option<Direction>,
    clean_with_black: Option<bool>,
    /// Number of cycles; omit to loop until stopped
    #[schema(example = 5)]
    cycles: Option<u32>,
}

/// Ambient settings; omitted fields come from the profile.
#[derive(Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct AmbientRequest {
    #[schema(example = 30)]
    fps: Option<u32>,
    #[schema(example = 1.5)]
    saturation_boost: Option<f32>,
}

// ── Router ───────────────────────────────────────────────────────────

/// Build the axum router with all API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(
            SwaggerUi::new("/docs")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
                .config(utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"]).validator_url("none")),
        )
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/profile", get(get_profile))
        .route("/api/v1/effect", post(post_effect))
        .route("/api/v1/speed", post(post_speed))
        .route("/api/v1/brightness", post(post_brightness))
        .route("/api/v1/colors", post(post_colors))
        .route("/api/v1/colors/solid", post(post_solid_color))
        .route("/api/v1/colors/zone", post(post_zone_color))
        .route("/api/v1/transition", post(post_transition))
        .route("/api/v1/play/swipe", post(post_play_swipe))
        .route("/api/v1/play/ripple", post(post_play_ripple))
        .route("/api/v1/play/ambient", post(post_play_ambient))
        .route("/api/v1/play/fade", post(post_play_fade))
        .route("/api/v1/stop", post(post_stop))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Helpers ──────────────────────────────────────────────────────────

type ApiResult = Result<StatusCode, (StatusCode, String)>;

fn render_gone<E>(_: E) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Render thread gone".to_string(),
    )
}

fn send(state: &AppState, command: RenderCommand) -> ApiResult {
    state.controller.send(command).map_err(render_gone)?;
    Ok(StatusCode::OK)
}

fn play(state: &AppState, animation: Animation) -> ApiResult {
    state.controller.play(animation).map_err(render_gone)?;
    Ok(StatusCode::OK)
}

// ── Handlers ─────────────────────────────────────────────────────────

/// GET /api/v1/status: current lighting state
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "Current lighting status", body = LightingStatus)
    )
)]
async fn get_status(State(state): State<AppState>) -> Json<LightingStatus> {
    Json(render::lock(&state.status).clone())
}

/// GET /api/v1/profile: the loaded profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "system",
    responses(
        (status = 200, description = "Profile used by the effect endpoints")
    )
)]
async fn get_profile(State(state): State<AppState>) -> Json<Profile> {
    Json(state.profile.as_ref().clone())
}

/// POST /api/v1/effect: switch the firmware effect
#[utoipa::path(
    post,
    path = "/api/v1/effect",
    tag = "lighting",
    request_body = EffectRequest,
    responses(
        (status = 200, description = "Effect updated"),
    )
)]
async fn post_effect(State(state): State<AppState>, Json(req): Json<EffectRequest>) -> ApiResult {
    send(&state, RenderCommand::SetEffect(req.effect))
}

/// POST /api/v1/speed: set firmware effect speed (1-4)
#[utoipa::path(
    post,
    path = "/api/v1/speed",
    tag = "lighting",
    request_body = LevelRequest,
    responses(
        (status = 200, description = "Speed updated"),
    )
)]
async fn post_speed(State(state): State<AppState>, Json(req): Json<LevelRequest>) -> ApiResult {
    send(&state, RenderCommand::SetSpeed(req.value))
}

/// POST /api/v1/brightness: set keyboard brightness (1-2)
#[utoipa::path(
    post,
    path = "/api/v1/brightness",
    tag = "lighting",
    request_body = LevelRequest,
    responses(
        (status = 200, description = "Brightness updated"),
    )
)]
async fn post_brightness(
    State(state): State<AppState>,
    Json(req): Json<LevelRequest>,
) -> ApiResult {
    send(&state, RenderCommand::SetBrightness(req.value))
}

/// POST /api/v1/colors: set all four zone colors
///
/// Ignored by the keyboard unless the effect is static or breath; check
/// `last_outcome` in the status.
#[utoipa::path(
    post,
    path = "/api/v1/colors",
    tag = "lighting",
    request_body = ColorsRequest,
    responses(
        (status = 200, description = "Colors queued"),
    )
)]
async fn post_colors(State(state): State<AppState>, Json(req): Json<ColorsRequest>) -> ApiResult {
    send(&state, RenderCommand::SetColors(req.zones))
}

/// POST /api/v1/colors/solid: one color on every zone
#[utoipa::path(
    post,
    path = "/api/v1/colors/solid",
    tag = "lighting",
    request_body = SolidColorRequest,
    responses(
        (status = 200, description = "Color queued"),
    )
)]
async fn post_solid_color(
    State(state): State<AppState>,
    Json(req): Json<SolidColorRequest>,
) -> ApiResult {
    send(&state, RenderCommand::SetSolidColor(req.color))
}

/// POST /api/v1/colors/zone: set one zone's color
#[utoipa::path(
    post,
    path = "/api/v1/colors/zone",
    tag = "lighting",
    request_body = ZoneColorRequest,
    responses(
        (status = 200, description = "Color queued"),
        (status = 400, description = "Zone index out of range")
    )
)]
async fn post_zone_color(
    State(state): State<AppState>,
    Json(req): Json<ZoneColorRequest>,
) -> ApiResult {
    if req.zone >= ZONE_COUNT {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Zone must be 0-{}, got {}", ZONE_COUNT - 1, req.zone),
        ));
    }

    send(
        &state,
        RenderCommand::SetZoneColor {
            zone: req.zone,
            color: req.color,
        },
    )
}

/// POST /api/v1/transition: fade from the current colors to new ones
#[utoipa::path(
    post,
    path = "/api/v1/transition",
    tag = "effects",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition started"),
        (status = 400, description = "Step delay too long")
    )
)]
async fn post_transition(
    State(state): State<AppState>,
    Json(req): Json<TransitionRequest>,
) -> ApiResult {
    if req.delay_ms > MAX_STEP_DELAY_MS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "delay_ms must be at most {}, got {}",
                MAX_STEP_DELAY_MS, req.delay_ms
            ),
        ));
    }

    play(
        &state,
        Animation::Transition {
            target: req.zones,
            steps: req.steps,
            delay: Duration::from_millis(req.delay_ms),
        },
    )
}

/// POST /api/v1/play/swipe: rotate or fill the profile colors across zones
#[utoipa::path(
    post,
    path = "/api/v1/play/swipe",
    tag = "effects",
    request_body = SwipeRequest,
    responses(
        (status = 200, description = "Swipe started"),
    )
)]
async fn post_play_swipe(
    State(state): State<AppState>,
    Json(req): Json<SwipeRequest>,
) -> ApiResult {
    let mut profile = state.profile.as_ref().clone();
    if let Some(direction) = req.direction {
        profile.direction = direction;
    }

    let defaults = SwipeOptions::from_profile(&profile);
    let options = SwipeOptions {
        mode: req.mode.unwrap_or(defaults.mode),
        clean_with_black: req.clean_with_black.unwrap_or(defaults.clean_with_black),
        cycles: req.cycles,
    };

    play(&state, Animation::Swipe { profile, options })
}

/// POST /api/v1/play/ripple: light ripples out from pressed keys
#[utoipa::path(
    post,
    path = "/api/v1/play/ripple",
    tag = "effects",
    responses(
        (status = 200, description = "Ripple started"),
    )
)]
async fn post_play_ripple(State(state): State<AppState>) -> ApiResult {
    play(&state, Animation::Ripple(state.profile.as_ref().clone()))
}

/// POST /api/v1/play/ambient: mirror the screen colors
#[utoipa::path(
    post,
    path = "/api/v1/play/ambient",
    tag = "effects",
    request_body = AmbientRequest,
    responses(
        (status = 200, description = "Ambient started"),
    )
)]
async fn post_play_ambient(
    State(state): State<AppState>,
    Json(req): Json<AmbientRequest>,
) -> ApiResult {
    let defaults = state.profile.ambient;
    let settings = AmbientSettings {
        fps: req.fps.unwrap_or(defaults.fps),
        saturation_boost: req.saturation_boost.unwrap_or(defaults.saturation_boost),
    };

    play(&state, Animation::Ambient(settings))
}

/// POST /api/v1/play/fade: show colors while typing, fade out when idle
#[utoipa::path(
    post,
    path = "/api/v1/play/fade",
    tag = "effects",
    responses(
        (status = 200, description = "Idle fade started"),
    )
)]
async fn post_play_fade(State(state): State<AppState>) -> ApiResult {
    play(&state, Animation::Fade(state.profile.as_ref().clone()))
}

/// POST /api/v1/stop: stop the running effect, keep the current colors
#[utoipa::path(
    post,
    path = "/api/v1/stop",
    tag = "effects",
    responses(
        (status = 200, description = "Effect stopped"),
    )
)]
async fn post_stop(State(state): State<AppState>) -> ApiResult {
    send(&state, RenderCommand::Stop)
}
