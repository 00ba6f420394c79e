//! Idle fade: the keyboard shows the profile colors while you type and
//! fades to black after a period without key presses.

use crate::frame::clamp_speed;
use crate::input::KeyInput;
use crate::keyboard::{Keyboard, Outcome};
use crate::profile::Profile;
use crate::transport::Transport;
use crate::{CancelToken, ZoneColors};
use std::thread;
use std::time::{Duration, Instant};

/// Idle time before fading, at speed 1 (divided by the profile speed).
const BASE_IDLE_TIMEOUT: Duration = Duration::from_secs(20);
const FADE_STEPS: u32 = 230;
const FADE_STEP_DELAY: Duration = Duration::from_millis(3);
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub fn idle_timeout(speed: u8) -> Duration {
    BASE_IDLE_TIMEOUT / u32::from(clamp_speed(speed))
}

/// Idle tracking, separate from the polling loop so it can be tested
/// without waiting 20 seconds.
#[derive(Debug)]
pub struct IdleFade {
    timeout: Duration,
    last_press: Instant,
    faded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FadeAction {
    /// A key is down: show the profile colors.
    Show,
    /// Idle long enough: start the fade to black.
    Fade,
    /// Nothing to do this poll.
    Wait,
}

impl IdleFade {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_press: now,
            faded: false,
        }
    }

    pub fn poll(&mut self, key_down: bool, now: Instant) -> FadeAction {
        if key_down {
            self.last_press = now;
            self.faded = false;
            FadeAction::Show
        } else if !self.faded && now.duration_since(self.last_press) > self.timeout {
            self.faded = true;
            FadeAction::Fade
        } else {
            FadeAction::Wait
        }
    }
}

/// Play the idle fade until cancelled.
pub fn play<T, K>(
    keyboard: &mut Keyboard<T>,
    profile: &Profile,
    input: &mut K,
    cancel: &CancelToken,
) where
    T: Transport,
    K: KeyInput + ?Sized,
{
    let timeout = idle_timeout(profile.speed);
    let mut idle = IdleFade::new(timeout, Instant::now());

    tracing::info!("Fade: fading after {}s idle", timeout.as_secs_f32());

    while !cancel.is_cancelled() {
        let action = idle.poll(input.any_pressed(), Instant::now());
        let outcome = match action {
            FadeAction::Show => keyboard.set_all_colors(profile.zones),
            FadeAction::Fade => {
                keyboard.transition_to(ZoneColors::default(), FADE_STEPS, FADE_STEP_DELAY, cancel)
            }
            FadeAction::Wait => {
                thread::sleep(IDLE_POLL_INTERVAL);
                Outcome::Applied
            }
        };

        if outcome == Outcome::Ignored {
            tracing::warn!(
                "Fade needs static or breath effect, current is {:?}",
                keyboard.frame().effect()
            );
            return;
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Effect;
    use crate::input::testing::ScriptedKeys;
    use crate::transport::testing::RecordingTransport;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[rstest]
    #[case(1, 20_000)]
    #[case(2, 10_000)]
    #[case(3, 6_666)]
    #[case(4, 5_000)]
    #[case(0, 20_000)]
    #[case(9, 5_000)]
    fn test_idle_timeout(#[case] speed: u8, #[case] millis: u128) {
        assert_eq!(idle_timeout(speed).as_millis(), millis);
    }

    #[test]
    fn key_press_shows_colors() {
        let start = Instant::now();
        let mut idle = IdleFade::new(TIMEOUT, start);
        assert_eq!(idle.poll(true, start), FadeAction::Show);
    }

    #[test]
    fn fades_once_after_timeout() {
        let start = Instant::now();
        let mut idle = IdleFade::new(TIMEOUT, start);

        assert_eq!(idle.poll(false, start + Duration::from_secs(5)), FadeAction::Wait);
        assert_eq!(idle.poll(false, start + Duration::from_secs(11)), FadeAction::Fade);
        assert_eq!(idle.poll(false, start + Duration::from_secs(30)), FadeAction::Wait);
    }

    #[test]
    fn key_press_resets_idle_timer() {
        let start = Instant::now();
        let mut idle = IdleFade::new(TIMEOUT, start);

        idle.poll(false, start + Duration::from_secs(11));
        assert_eq!(idle.poll(true, start + Duration::from_secs(12)), FadeAction::Show);
        assert_eq!(idle.poll(false, start + Duration::from_secs(20)), FadeAction::Wait);
        assert_eq!(idle.poll(false, start + Duration::from_secs(23)), FadeAction::Fade);
    }

    #[test]
    fn driver_shows_profile_on_key_press() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport.clone());
        let profile = Profile::default();
        let mut keys = ScriptedKeys::new(vec![vec![30]]);
        let cancel = CancelToken::new();

        let stopper = {
            let cancel = cancel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(60));
                cancel.cancel();
            })
        };
        play(&mut keyboard, &profile, &mut keys, &cancel);
        stopper.join().unwrap();

        assert_eq!(*keyboard.zones(), profile.zones);
        assert_eq!(transport.frames().len(), 2);
    }

    #[test]
    fn driver_stops_in_firmware_effect() {
        let transport = RecordingTransport::new();
        let mut keyboard = Keyboard::new(transport);
        keyboard.set_effect(Effect::RightWave);
        let mut keys = ScriptedKeys::new(vec![vec![30]]);

        // Would loop forever if the gate were not honored.
        play(&mut keyboard, &Profile::default(), &mut keys, &CancelToken::new());

        assert_eq!(*keyboard.zones(), ZoneColors::default());
    }
}
