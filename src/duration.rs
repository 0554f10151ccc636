//! Reconciles the track duration known to the queue with the one reported
//! by the playback device.
//!
//! Catalogs report milliseconds, while devices may report either
//! milliseconds or seconds. Any value above [`MILLIS_THRESHOLD`] is taken as
//! milliseconds. A zero reading never replaces a known duration: devices
//! tend to report zero for a moment around track changes, and a zero
//! duration would make the scheduler think the track is over.

/// Values above this are milliseconds, values up to it are seconds.
pub const MILLIS_THRESHOLD: u64 = 1000;

/// Converts a millisecond-or-second value into whole seconds.
#[must_use]
pub fn normalize(value: u64) -> u64 {
    if value > MILLIS_THRESHOLD {
        value / 1000
    } else {
        value
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciler {
    seconds: u64,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges both sources and returns the authoritative duration in
    /// seconds: the queue's if known, else the device's, else whatever was
    /// held before.
    pub fn reconcile(&mut self, queue: u64, device: u64) -> u64 {
        let queue = normalize(queue);
        let device = normalize(device);

        if queue > 0 {
            self.seconds = queue;
        } else if device > 0 {
            self.seconds = device;
        } else {
            trace!("no duration reported; keeping {}s", self.seconds);
        }

        self.seconds
    }

    /// The duration held, in seconds.
    #[must_use]
    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}
