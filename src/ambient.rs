//! Ambient effect: zones mirror the colors on screen.
//!
//! Every frame the screen is sampled down to one pixel per zone. Each pixel
//! goes through HSV so its saturation can be boosted (washed-out screen
//! colors look grey on keyboard LEDs), then back to RGB.

use crate::capture::ScreenSampler;
use crate::keyboard::{Keyboard, Outcome};
use crate::pacing::FramePacer;
use crate::transport::Transport;
use crate::{CancelToken, Color, ZONE_COUNT, ZoneColors};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Hue, saturation and value, all in `0.0..=1.0` (hue wraps below 1.0).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub fn from_rgb(color: Color) -> Self {
        let r = f32::from(color.r) / 255.0;
        let g = f32::from(color.g) / 255.0;
        let b = f32::from(color.b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max == 0.0 { 0.0 } else { delta / max };

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            ((g - b) / delta).rem_euclid(6.0) / 6.0
        } else if max == g {
            ((b - r) / delta + 2.0) / 6.0
        } else {
            ((r - g) / delta + 4.0) / 6.0
        };

        Self { h, s, v: max }
    }

    pub fn to_rgb(self) -> Color {
        let Self { h, s, v } = self;
        if s <= 0.0 {
            let grey = channel(v);
            return Color::new(grey, grey, grey);
        }

        let scaled = h.rem_euclid(1.0) * 6.0;
        let sector = scaled.floor();
        let f = scaled - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - f * s);
        let t = v * (1.0 - (1.0 - f) * s);

        // rem_euclid can round up to exactly 1.0 for tiny negative hues
        let (r, g, b) = match (sector as u8) % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Color::new(channel(r), channel(g), channel(b))
    }
}

fn channel(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Ambient tuning, part of the profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct AmbientSettings {
    /// Target frames per second.
    pub fps: u32,
    /// Saturation multiplier; the result is capped at 1.0.
    pub saturation_boost: f32,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            saturation_boost: 1.5,
        }
    }
}

pub struct AmbientMapper {
    saturation_boost: f32,
}

impl AmbientMapper {
    pub fn new(saturation_boost: f32) -> Self {
        Self {
            saturation_boost: saturation_boost.max(0.0),
        }
    }

    /// Boost one pixel's saturation.
    pub fn map_pixel(&self, color: Color) -> Color {
        let mut hsv = Hsv::from_rgb(color);
        hsv.s = (hsv.s * self.saturation_boost).min(1.0);
        hsv.to_rgb()
    }

    /// Zone colors for a sampled strip. Missing pixels stay black; extra
    /// pixels are ignored.
    pub fn map_strip(&self, pixels: &[Color]) -> ZoneColors {
        let mut zones = ZoneColors::default();
        for (zone, pixel) in zones.0.iter_mut().zip(pixels) {
            *zone = self.map_pixel(*pixel);
        }
        zones
    }
}

/// Play the ambient effect at `settings.fps`.
///
/// A failed capture drops that frame and the loop carries on. Runs until
/// cancelled, or for `frames` frames when given.
pub fn play<T, S>(
    keyboard: &mut Keyboard<T>,
    settings: AmbientSettings,
    sampler: &mut S,
    frames: Option<u32>,
    cancel: &CancelToken,
) where
    T: Transport,
    S: ScreenSampler + ?Sized,
{
    let mapper = AmbientMapper::new(settings.saturation_boost);
    let mut pacer = FramePacer::from_fps("Ambient", settings.fps);
    let mut frame = 0u32;
    let mut dropped = 0u64;

    tracing::info!(
        "Ambient: {} fps, saturation x{}",
        settings.fps,
        settings.saturation_boost
    );

    while frames.is_none_or(|n| frame < n) {
        if cancel.is_cancelled() {
            break;
        }
        let frame_start = Instant::now();

        match sampler.sample(ZONE_COUNT) {
            Ok(pixels) => {
                if keyboard.set_all_colors(mapper.map_strip(&pixels)) == Outcome::Ignored {
                    tracing::warn!(
                        "Ambient needs static or breath effect, current is {:?}",
                        keyboard.frame().effect()
                    );
                    return;
                }
            }
            Err(e) => {
                dropped += 1;
                if dropped == 1 {
                    tracing::warn!("Screen capture failed: {}", e);
                } else {
                    tracing::debug!("Screen capture failed ({} total): {}", dropped, e);
                }
            }
        }

        frame += 1;
        pacer.finish_frame(frame_start);
    }

    if dropped > 0 {
        tracing::info!("Ambient stopped, {} frames dropped", dropped);
    }
}
