//! Color transitions: a software linear fade of all zone colors.
//!
//! The fade runs on the calling thread. Each step is indivisible: the
//! colors are committed, the frame is pushed, then the thread sleeps. The
//! cancellation token is checked before every step.

use crate::keyboard::{Keyboard, Outcome};
use crate::transport::Transport;
use crate::{CancelToken, ZoneColors};
use std::thread;
use std::time::Duration;

/// Advance every channel by one step and return the bytes the device sees.
///
/// The per-channel delta is accumulated in floating point and truncated to
/// a byte at every step, so intermediate values round toward zero.
fn accumulate(
    current: &mut [f32; ZoneColors::BYTE_LEN],
    deltas: &[f32; ZoneColors::BYTE_LEN],
) -> [u8; ZoneColors::BYTE_LEN] {
    let mut bytes = [0u8; ZoneColors::BYTE_LEN];
    for ((value, delta), byte) in current.iter_mut().zip(deltas).zip(bytes.iter_mut()) {
        *value += delta;
        *byte = *value as u8;
    }
    bytes
}

impl<T: Transport> Keyboard<T> {
    /// Fade from the current zone colors to `target` over `steps` pushes,
    /// sleeping `delay` after each.
    ///
    /// Only runs in Static/Breath mode (returns `Ignored` otherwise). When it
    /// completes, the exact target is committed. When `cancel` fires, the
    /// fade stops before the next step and the partial colors stay.
    /// `steps` of 0 is treated as 1.
    pub fn transition_to(
        &mut self,
        target: ZoneColors,
        steps: u32,
        delay: Duration,
        cancel: &CancelToken,
    ) -> Outcome {
        if !self.frame().effect().uses_zone_colors() {
            return Outcome::Ignored;
        }

        let steps = steps.max(1);
        let start = self.zones().to_bytes();
        let target_bytes = target.to_bytes();

        let mut current = [0f32; ZoneColors::BYTE_LEN];
        let mut deltas = [0f32; ZoneColors::BYTE_LEN];
        for i in 0..ZoneColors::BYTE_LEN {
            current[i] = f32::from(start[i]);
            deltas[i] = (f32::from(target_bytes[i]) - f32::from(start[i])) / steps as f32;
        }

        for _ in 0..steps {
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }

            let bytes = accumulate(&mut current, &deltas);
            self.write_zones(ZoneColors::from_bytes(&bytes));

            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        self.write_zones(target);
        Outcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use crate::frame::Effect;
    use crate::transport::testing::RecordingTransport;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const RED: Color = Color::new(255, 0, 0);

    fn keyboard() -> (Keyboard<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::new();
        (Keyboard::new(transport.clone()), transport)
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    #[case(10)]
    #[case(150)]
    #[case(255)]
    fn test_transition_ends_exactly_on_target(#[case] steps: u32) {
        let (mut keyboard, _) = keyboard();
        let _ = keyboard.set_all_colors(ZoneColors::from_bytes(&[
            3, 250, 17, 0, 128, 255, 99, 1, 200, 64, 64, 64,
        ]));
        let target = ZoneColors::from_bytes(&[
            254, 0, 18, 255, 127, 0, 33, 200, 1, 64, 65, 63,
        ]);

        let outcome = keyboard.transition_to(target, steps, Duration::ZERO, &CancelToken::new());

        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(*keyboard.zones(), target);
    }

    #[test]
    fn red_fade_truncates_intermediate_steps() {
        let (mut keyboard, transport) = keyboard();
        let target = ZoneColors::new([RED, Color::BLACK, Color::BLACK, Color::BLACK]);

        let _ = keyboard.transition_to(target, 10, Duration::ZERO, &CancelToken::new());

        // initial frame + 10 steps + final commit
        let history = transport.color_history();
        assert_eq!(history.len(), 12);
        let reds: Vec<u8> = history[1..=10].iter().map(|c| c[0]).collect();
        assert_eq!(reds, vec![25, 51, 76, 102, 127, 153, 178, 204, 229, 255]);
        assert!(history[5][1..].iter().all(|&b| b == 0));
        assert_eq!(history[11], target.to_bytes());
    }

    #[test]
    fn fade_down_truncates_toward_zero() {
        let (mut keyboard, transport) = keyboard();
        let _ = keyboard.set_solid_color(Color::new(10, 10, 10));

        let _ = keyboard.transition_to(ZoneColors::default(), 4, Duration::ZERO, &CancelToken::new());

        let history = transport.color_history();
        // 10 - 2.5k: 7.5, 5.0, 2.5, 0.0
        let firsts: Vec<u8> = history[2..=5].iter().map(|c| c[0]).collect();
        assert_eq!(firsts, vec![7, 5, 2, 0]);
    }

    #[rstest]
    #[case(Effect::Smooth)]
    #[case(Effect::LeftWave)]
    #[case(Effect::RightWave)]
    fn test_transition_ignored_in_firmware_effects(#[case] effect: Effect) {
        let (mut keyboard, transport) = keyboard();
        keyboard.set_effect(effect);
        let pushed = transport.frames().len();

        let outcome =
            keyboard.transition_to(ZoneColors::solid(RED), 5, Duration::ZERO, &CancelToken::new());

        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(transport.frames().len(), pushed);
        assert_eq!(*keyboard.zones(), ZoneColors::default());
    }

    #[test]
    fn cancelled_before_start_changes_nothing() {
        let (mut keyboard, transport) = keyboard();
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = keyboard.transition_to(ZoneColors::solid(RED), 5, Duration::ZERO, &cancel);

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(transport.frames().len(), 1);
        assert_eq!(*keyboard.zones(), ZoneColors::default());
    }

    #[test]
    fn cancel_mid_fade_leaves_partial_colors() {
        let (mut keyboard, transport) = keyboard();
        let cancel = CancelToken::new();

        let canceller = {
            let cancel = cancel.clone();
            let transport = transport.clone();
            thread::spawn(move || {
                while transport.frames().len() < 4 {
                    thread::yield_now();
                }
                cancel.cancel();
            })
        };

        let outcome = keyboard.transition_to(
            ZoneColors::solid(RED),
            200,
            Duration::from_millis(5),
            &cancel,
        );
        canceller.join().unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        let red = keyboard.zones()[0].r;
        assert!(red > 0 && red < 255, "partial red was {red}");
        let last = transport.last().unwrap();
        assert_ne!(&last[5..17], &ZoneColors::solid(RED).to_bytes()[..]);
    }

    #[test]
    fn zero_steps_behaves_like_one() {
        let (mut keyboard, transport) = keyboard();
        let _ = keyboard.transition_to(ZoneColors::solid(RED), 0, Duration::ZERO, &CancelToken::new());
        assert_eq!(*keyboard.zones(), ZoneColors::solid(RED));
        assert_eq!(transport.frames().len(), 3);
    }
}
