//! Key-state input: snapshots of which keys are held down right now.
//!
//! Ripple and fade poll this once per tick instead of subscribing to key
//! events. The evdev implementation is behind the `hardware` feature.

use crate::BoxError;
use std::collections::HashSet;

pub trait KeyInput {
    /// Codes of every key currently held down.
    fn pressed_keys(&mut self) -> Result<HashSet<u16>, BoxError>;

    /// Whether any key is held down. A failed read counts as "no".
    fn any_pressed(&mut self) -> bool {
        self.pressed_keys().is_ok_and(|keys| !keys.is_empty())
    }
}

impl<T: KeyInput + ?Sized> KeyInput for Box<T> {
    fn pressed_keys(&mut self) -> Result<HashSet<u16>, BoxError> {
        (**self).pressed_keys()
    }
}

/// Stand-in when no keyboard input device could be opened. Every read
/// fails, so key-driven effects see no presses.
pub struct UnavailableKeyInput;

impl KeyInput for UnavailableKeyInput {
    fn pressed_keys(&mut self) -> Result<HashSet<u16>, BoxError> {
        Err("no key input device available".into())
    }
}

#[cfg(feature = "hardware")]
pub use evdev_input::EvdevKeyInput;

#[cfg(feature = "hardware")]
mod evdev_input {
    use super::KeyInput;
    use crate::BoxError;
    use std::collections::HashSet;

    /// Reads key state from every keyboard-like device under `/dev/input`.
    pub struct EvdevKeyInput {
        devices: Vec<evdev::Device>,
    }

    impl EvdevKeyInput {
        /// Open every input device that has letter keys and a space bar.
        pub fn discover() -> Result<Self, BoxError> {
            let mut devices = Vec::new();

            for entry in std::fs::read_dir("/dev/input")?.flatten() {
                let path = entry.path();
                let is_event_node = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("event"));
                if !is_event_node {
                    continue;
                }

                let Ok(device) = evdev::Device::open(&path) else {
                    continue;
                };
                let is_keyboard = device.supported_keys().is_some_and(|keys| {
                    keys.contains(evdev::Key::KEY_A) && keys.contains(evdev::Key::KEY_SPACE)
                });
                if is_keyboard {
                    tracing::info!(
                        "Key input: {} ({})",
                        device.name().unwrap_or("unnamed"),
                        path.display()
                    );
                    devices.push(device);
                }
            }

            if devices.is_empty() {
                return Err(
                    "No keyboard found under /dev/input (is the user in the input group?)".into(),
                );
            }

            Ok(Self { devices })
        }
    }

    impl KeyInput for EvdevKeyInput {
        fn pressed_keys(&mut self) -> Result<HashSet<u16>, BoxError> {
            let mut pressed = HashSet::new();
            for device in &self.devices {
                pressed.extend(device.get_key_state()?.iter().map(|key| key.code()));
            }
            Ok(pressed)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::KeyInput;
    use crate::BoxError;
    use std::collections::{HashSet, VecDeque};

    /// Replays a fixed sequence of key snapshots, then reports no keys.
    pub(crate) struct ScriptedKeys {
        snapshots: VecDeque<Vec<u16>>,
    }

    impl ScriptedKeys {
        pub(crate) fn new(snapshots: Vec<Vec<u16>>) -> Self {
            Self {
                snapshots: snapshots.into(),
            }
        }
    }

    impl KeyInput for ScriptedKeys {
        fn pressed_keys(&mut self) -> Result<HashSet<u16>, BoxError> {
            Ok(self
                .snapshots
                .pop_front()
                .unwrap_or_default()
                .into_iter()
                .collect())
        }
    }
}
