//! Render thread: owns the keyboard and runs one command at a time.
//!
//! The HTTP server never touches the device. It sends `RenderCommand`
//! values through an `mpsc` channel to this thread, which is the only
//! writer of lighting state. Effect drivers run on this thread until their
//! cancellation token fires; `Controller` cancels the running driver before
//! queueing anything new, so at most one effect is ever active.
//!
//! ## Rust concepts
//! - `std::sync::mpsc` channels for thread communication
//! - `enum` with data variants (tagged unions)
//! - `Arc<Mutex<T>>` for shared mutable state
//! - Generic functions over the transport/input/capture traits

use crate::ambient::{self, AmbientSettings};
use crate::capture::ScreenSampler;
use crate::frame::Effect;
use crate::input::KeyInput;
use crate::keyboard::{Keyboard, Outcome};
use crate::profile::Profile;
use crate::swipe::{self, SwipeOptions};
use crate::transport::Transport;
use crate::{CancelToken, Color, ZoneColors, fade, ripple};
use serde::Serialize;
use std::sync::mpsc::{Receiver, SendError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ── Commands ─────────────────────────────────────────────────────────

/// Long-running lighting work, run until finished or cancelled.
#[derive(Clone, Debug)]
pub enum Animation {
    /// One software fade to `target`.
    Transition {
        target: ZoneColors,
        steps: u32,
        delay: Duration,
    },
    Swipe {
        profile: Profile,
        options: SwipeOptions,
    },
    Ripple(Profile),
    Ambient(AmbientSettings),
    Fade(Profile),
}

impl Animation {
    fn state(&self) -> DriverState {
        match self {
            Animation::Transition { .. } => DriverState::Transition,
            Animation::Swipe { .. } => DriverState::Swipe,
            Animation::Ripple(_) => DriverState::Ripple,
            Animation::Ambient(_) => DriverState::Ambient,
            Animation::Fade(_) => DriverState::Fade,
        }
    }
}

/// Commands sent to the render thread.
#[derive(Debug)]
pub enum RenderCommand {
    SetEffect(Effect),
    SetSpeed(u8),
    SetBrightness(u8),
    SetColors(ZoneColors),
    SetSolidColor(Color),
    SetZoneColor { zone: usize, color: Color },
    Play {
        animation: Animation,
        cancel: CancelToken,
    },
    /// Stop the running animation, keep the current colors.
    Stop,
}

// ── Status ───────────────────────────────────────────────────────────

/// Which driver the render thread is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Transition,
    Swipe,
    Ripple,
    Ambient,
    Fade,
}

/// Snapshot of the lighting state, written by the render thread and read
/// by the HTTP server.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct LightingStatus {
    pub state: DriverState,
    pub effect: Effect,
    pub speed: u8,
    pub brightness: u8,
    /// Zone colors as `[r, g, b]` arrays, zone 0 first
    #[schema(value_type = Vec<Vec<u8>>)]
    pub zones: ZoneColors,
    /// Result of the last color command (`None` before the first one)
    pub last_outcome: Option<Outcome>,
    /// Device writes that failed since startup
    pub failed_writes: u64,
    pub version: String,
}

impl LightingStatus {
    pub fn new() -> Self {
        Self {
            state: DriverState::Idle,
            effect: Effect::Static,
            speed: 1,
            brightness: 1,
            zones: ZoneColors::default(),
            last_outcome: None,
            failed_writes: 0,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn update_from<T: Transport>(&mut self, keyboard: &Keyboard<T>) {
        let frame = keyboard.frame();
        self.effect = frame.effect();
        self.speed = frame.speed();
        self.brightness = frame.brightness();
        self.zones = *frame.zones();
        self.failed_writes = keyboard.failed_writes();
    }
}

impl Default for LightingStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock a shared value, recovering it if a panicking thread poisoned the lock.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Controller ───────────────────────────────────────────────────────

/// Sending half of the render channel.
///
/// Every send first cancels whatever animation is running, which makes the
/// render thread pick up the new command at its next step boundary.
#[derive(Clone)]
pub struct Controller {
    command_tx: Sender<RenderCommand>,
    active: Arc<Mutex<CancelToken>>,
}

impl Controller {
    pub fn new(command_tx: Sender<RenderCommand>) -> Self {
        Self {
            command_tx,
            active: Arc::new(Mutex::new(CancelToken::new())),
        }
    }

    pub fn send(&self, command: RenderCommand) -> Result<(), SendError<RenderCommand>> {
        let mut active = lock(&self.active);
        active.cancel();
        if let RenderCommand::Play { cancel, .. } = &command {
            *active = cancel.clone();
        }
        self.command_tx.send(command)
    }

    /// Start an animation, replacing the running one.
    pub fn play(&self, animation: Animation) -> Result<(), SendError<RenderCommand>> {
        self.send(RenderCommand::Play {
            animation,
            cancel: CancelToken::new(),
        })
    }
}

// ── Render loop ──────────────────────────────────────────────────────

/// Main render loop: runs on a dedicated thread, owns the keyboard.
///
/// Returns when every `Controller` (sender) has been dropped.
pub fn render_loop<T, K, S>(
    rx: Receiver<RenderCommand>,
    status: Arc<Mutex<LightingStatus>>,
    mut keyboard: Keyboard<T>,
    mut keys: K,
    mut screen: S,
) where
    T: Transport,
    K: KeyInput,
    S: ScreenSampler,
{
    lock(&status).update_from(&keyboard);
    tracing::info!("Render thread started, waiting for commands...");

    for command in rx {
        let outcome = match command {
            RenderCommand::SetEffect(effect) => {
                keyboard.set_effect(effect);
                None
            }
            RenderCommand::SetSpeed(speed) => {
                keyboard.set_speed(speed);
                None
            }
            RenderCommand::SetBrightness(brightness) => {
                keyboard.set_brightness(brightness);
                None
            }
            RenderCommand::SetColors(zones) => Some(keyboard.set_all_colors(zones)),
            RenderCommand::SetSolidColor(color) => Some(keyboard.set_solid_color(color)),
            RenderCommand::SetZoneColor { zone, color } => {
                Some(keyboard.set_zone_color(zone, color))
            }
            RenderCommand::Stop => None,
            RenderCommand::Play { animation, cancel } => {
                lock(&status).state = animation.state();
                tracing::info!("Starting {:?}", animation.state());
                let outcome =
                    run_animation(&mut keyboard, &mut keys, &mut screen, animation, &cancel);
                tracing::info!("Animation finished");
                outcome
            }
        };

        let mut s = lock(&status);
        s.state = DriverState::Idle;
        s.update_from(&keyboard);
        if outcome.is_some() {
            s.last_outcome = outcome;
        }
    }

    tracing::info!("Render thread: channel closed, shutting down.");
}

fn run_animation<T, K, S>(
    keyboard: &mut Keyboard<T>,
    keys: &mut K,
    screen: &mut S,
    animation: Animation,
    cancel: &CancelToken,
) -> Option<Outcome>
where
    T: Transport,
    K: KeyInput,
    S: ScreenSampler,
{
    match animation {
        Animation::Transition {
            target,
            steps,
            delay,
        } => Some(keyboard.transition_to(target, steps, delay, cancel)),
        Animation::Swipe { profile, options } => {
            swipe::play(keyboard, &profile, options, cancel);
            None
        }
        Animation::Ripple(profile) => {
            ripple::play(keyboard, &profile, keys, None, cancel);
            None
        }
        Animation::Ambient(settings) => {
            ambient::play(keyboard, settings, screen, None, cancel);
            None
        }
        Animation::Fade(profile) => {
            fade::play(keyboard, &profile, keys, cancel);
            None
        }
    }
}
