//! Swipe effects: directional rotation and fill of the zone colors.
//!
//! Both modes are built on `Keyboard::transition_to`, so every move is a
//! smooth software fade rather than a jump.

use crate::frame::clamp_speed;
use crate::keyboard::{Keyboard, Outcome};
use crate::profile::Profile;
use crate::transport::Transport;
use crate::{CancelToken, Color, ZONE_COUNT, ZoneColors};
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

/// Fade steps per move at speed 1; divided by the profile speed.
const BASE_STEPS: u32 = 150;
const CHANGE_STEP_DELAY: Duration = Duration::from_millis(10);
const FILL_STEP_DELAY: Duration = Duration::from_millis(1);
const CYCLE_DELAY: Duration = Duration::from_millis(20);

/// Sweep direction across the keyboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SwipeMode {
    /// Rotate the whole color vector one zone per cycle.
    #[default]
    Change,
    /// Paint every zone with each profile color in turn.
    Fill,
}

/// Rotate the zone colors one zone position.
///
/// `Left` moves every color one zone up (zone 0's color lands in zone 1,
/// zone 3's wraps to zone 0); `Right` is the inverse.
pub fn rotate(zones: ZoneColors, direction: Direction) -> ZoneColors {
    let mut rotated = zones;
    match direction {
        Direction::Left => rotated.0.rotate_right(1),
        Direction::Right => rotated.0.rotate_left(1),
    }
    rotated
}

/// Zone visiting order for a fill sweep.
fn fill_order(direction: Direction) -> [usize; ZONE_COUNT] {
    match direction {
        Direction::Left => [0, 1, 2, 3],
        Direction::Right => [3, 2, 1, 0],
    }
}

/// Settings for one swipe run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwipeOptions {
    pub mode: SwipeMode,
    /// Fill mode only: blank each zone again after it was painted.
    pub clean_with_black: bool,
    /// Number of cycles to play; `None` loops until cancelled.
    pub cycles: Option<u32>,
}

impl SwipeOptions {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            mode: profile.swipe_mode,
            clean_with_black: profile.clean_with_black,
            cycles: None,
        }
    }
}

/// Play a swipe effect. Returns when the cycle count is reached or the
/// token is cancelled.
pub fn play<T: Transport>(
    keyboard: &mut Keyboard<T>,
    profile: &Profile,
    options: SwipeOptions,
    cancel: &CancelToken,
) {
    let steps = BASE_STEPS / u32::from(clamp_speed(profile.speed));
    let mut rotating = profile.zones;
    let mut painted = ZoneColors::default();
    let mut cycle = 0u32;

    tracing::info!(
        "Swipe: {:?} {:?}, {} steps per move",
        options.mode,
        profile.direction,
        steps
    );

    while options.cycles.is_none_or(|n| cycle < n) {
        if cancel.is_cancelled() {
            return;
        }

        let outcome = match options.mode {
            SwipeMode::Change => {
                rotating = rotate(rotating, profile.direction);
                keyboard.transition_to(rotating, steps, CHANGE_STEP_DELAY, cancel)
            }
            SwipeMode::Fill => fill_cycle(keyboard, profile, options, &mut painted, steps, cancel),
        };

        match outcome {
            Outcome::Cancelled => return,
            Outcome::Ignored => {
                tracing::warn!(
                    "Swipe needs static or breath effect, current is {:?}",
                    keyboard.frame().effect()
                );
                return;
            }
            Outcome::Applied => {}
        }

        cycle += 1;
        thread::sleep(CYCLE_DELAY);
    }
}

/// One fill sweep: each source zone's color is painted over every zone in
/// direction order, optionally followed by a black-out pass.
fn fill_cycle<T: Transport>(
    keyboard: &mut Keyboard<T>,
    profile: &Profile,
    options: SwipeOptions,
    painted: &mut ZoneColors,
    steps: u32,
    cancel: &CancelToken,
) -> Outcome {
    let order = fill_order(profile.direction);

    for &source in &order {
        let passes = [
            Some(profile.zones[source]),
            options.clean_with_black.then_some(Color::BLACK),
        ];
        for color in passes.into_iter().flatten() {
            for &zone in &order {
                painted[zone] = color;
                let outcome = keyboard.transition_to(*painted, steps, FILL_STEP_DELAY, cancel);
                if outcome != Outcome::Applied {
                    return outcome;
                }
            }
        }
    }

    Outcome::Applied
}
