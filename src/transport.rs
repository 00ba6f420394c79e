//! Device transport: delivers encoded lighting frames to the keyboard.
//!
//! The lighting core only needs "send this feature report". Writes are
//! best-effort; `Keyboard` decides what to do with a failure (it drops it).
//!
//! The hidapi implementation is behind the `hardware` feature so the rest of
//! the crate builds and tests without libudev/hidraw.

use crate::BoxError;

pub trait Transport {
    fn send_feature_report(&mut self, payload: &[u8]) -> Result<(), BoxError>;
}

/// Lets the render thread own a `Box<dyn Transport + Send>`.
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_feature_report(&mut self, payload: &[u8]) -> Result<(), BoxError> {
        (**self).send_feature_report(payload)
    }
}

#[cfg(feature = "hardware")]
pub use hid::HidTransport;

#[cfg(feature = "hardware")]
mod hid {
    use super::Transport;
    use crate::{BoxError, DeviceConfig};
    use hidapi::{HidApi, HidDevice};

    /// A keyboard lighting controller opened through hidapi.
    ///
    /// The handle stays open for the life of the value and is closed on drop.
    pub struct HidTransport {
        device: HidDevice,
    }

    impl HidTransport {
        pub fn open(config: DeviceConfig) -> Result<Self, BoxError> {
            let api = HidApi::new()?;

            let info = api
                .device_list()
                .find(|d| {
                    config.matches(d.vendor_id(), d.product_id(), d.usage_page(), d.usage())
                })
                .ok_or_else(|| {
                    format!(
                        "Device {:04x}:{:04x} not found",
                        config.vendor_id, config.product_id
                    )
                })?;

            tracing::info!(
                "Opening {} ({:04x}:{:04x}, usage page {:#06x}, usage {:#06x})",
                info.product_string().unwrap_or("unknown device"),
                info.vendor_id(),
                info.product_id(),
                info.usage_page(),
                info.usage()
            );

            let device = info.open_device(&api)?;
            Ok(Self { device })
        }
    }

    impl Transport for HidTransport {
        fn send_feature_report(&mut self, payload: &[u8]) -> Result<(), BoxError> {
            self.device.send_feature_report(payload)?;
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Transport;
    use crate::BoxError;
    use crate::frame::PAYLOAD_LEN;
    use std::sync::{Arc, Mutex};

    /// In-memory transport that records every frame it is given.
    ///
    /// Clones share the same log, so a test can keep one clone while the
    /// keyboard (or render thread) owns the other.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingTransport {
        frames: Arc<Mutex<Vec<[u8; PAYLOAD_LEN]>>>,
        fail: bool,
    }

    impl RecordingTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// A transport whose writes all fail (after being recorded).
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn frames(&self) -> Vec<[u8; PAYLOAD_LEN]> {
            self.frames.lock().unwrap().clone()
        }

        pub(crate) fn last(&self) -> Option<[u8; PAYLOAD_LEN]> {
            self.frames.lock().unwrap().last().copied()
        }

        /// Zone color bytes of every recorded frame.
        pub(crate) fn color_history(&self) -> Vec<[u8; 12]> {
            self.frames()
                .iter()
                .map(|f| {
                    let mut colors = [0u8; 12];
                    colors.copy_from_slice(&f[5..17]);
                    colors
                })
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn send_feature_report(&mut self, payload: &[u8]) -> Result<(), BoxError> {
            let mut frame = [0u8; PAYLOAD_LEN];
            frame.copy_from_slice(payload);
            self.frames.lock().unwrap().push(frame);
            if self.fail {
                return Err("device unplugged".into());
            }
            Ok(())
        }
    }
}
