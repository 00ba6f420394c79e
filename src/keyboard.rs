//! `Keyboard`: owns the lighting frame and pushes it to the device after
//! every change.
//!
//! Every mutator ends with a push. Pushes are fire-and-forget: a failed
//! write is counted and logged, the frame state is kept, and the next push
//! sends it again.

use crate::frame::{Effect, LightingFrame};
use crate::transport::Transport;
use crate::{Color, ZONE_COUNT, ZoneColors};
use serde::Serialize;

/// Only the first few failed writes are logged at warn level.
const LOGGED_WRITE_FAILURES: u64 = 5;

/// What happened to a color change request.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The change was committed and pushed.
    Applied,
    /// The current effect mode does not use zone colors (or the zone does
    /// not exist), so nothing changed.
    Ignored,
    /// A transition was stopped part-way; the partial colors stay in place.
    Cancelled,
}

pub struct Keyboard<T> {
    transport: T,
    frame: LightingFrame,
    failed_writes: u64,
}

impl<T: Transport> Keyboard<T> {
    /// Take ownership of a transport and push the default frame
    /// (static, black, speed 1, brightness 1).
    pub fn new(transport: T) -> Self {
        let mut keyboard = Self {
            transport,
            frame: LightingFrame::default(),
            failed_writes: 0,
        };
        keyboard.refresh();
        keyboard
    }

    pub fn frame(&self) -> &LightingFrame {
        &self.frame
    }

    pub fn zones(&self) -> &ZoneColors {
        self.frame.zones()
    }

    /// Number of frame writes the device rejected so far.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Push the current frame to the device. Never fails.
    pub fn refresh(&mut self) {
        let payload = self.frame.encode();
        if let Err(e) = self.transport.send_feature_report(&payload) {
            self.failed_writes += 1;
            if self.failed_writes <= LOGGED_WRITE_FAILURES {
                tracing::warn!("Lighting frame write failed: {}", e);
            } else {
                tracing::debug!(
                    "Lighting frame write failed ({} total): {}",
                    self.failed_writes,
                    e
                );
            }
        }
    }

    pub fn set_effect(&mut self, effect: Effect) {
        self.frame.set_effect(effect);
        self.refresh();
    }

    /// Set animation speed, clamped to 1-4.
    pub fn set_speed(&mut self, speed: u8) {
        self.frame.set_speed(speed);
        self.refresh();
    }

    /// Set brightness, clamped to 1-2.
    pub fn set_brightness(&mut self, brightness: u8) {
        self.frame.set_brightness(brightness);
        self.refresh();
    }

    /// Overwrite one zone's color.
    ///
    /// Zone storage is written in any effect mode (only Static/Breath show
    /// it). An out-of-range zone is ignored.
    pub fn set_zone_color(&mut self, zone: usize, color: Color) -> Outcome {
        if zone >= ZONE_COUNT {
            return Outcome::Ignored;
        }
        self.frame.zones_mut()[zone] = color;
        self.refresh();
        Outcome::Applied
    }

    /// Overwrite all zones at once. Ignored unless the effect is Static or Breath.
    pub fn set_all_colors(&mut self, zones: ZoneColors) -> Outcome {
        if !self.frame.effect().uses_zone_colors() {
            return Outcome::Ignored;
        }
        *self.frame.zones_mut() = zones;
        self.refresh();
        Outcome::Applied
    }

    /// Broadcast one color to every zone. Same gate as `set_all_colors`.
    pub fn set_solid_color(&mut self, color: Color) -> Outcome {
        self.set_all_colors(ZoneColors::solid(color))
    }

    /// Commit zone colors without the effect gate. Callers check the gate.
    pub(crate) fn write_zones(&mut self, zones: ZoneColors) {
        *self.frame.zones_mut() = zones;
        self.refresh();
    }
}
