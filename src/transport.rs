//! The playback device the player drives.
//!
//! A [`Transport`] only has to play URLs and obey the usual transport
//! commands. It does not have to report positions or durations accurately:
//! the player keeps its own clock and only uses the reported duration when
//! the queue does not know it.

use std::{
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    duration,
    error::{Error, Result},
};

/// Transport state as reported by the device.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Playing,
    Paused,
    #[default]
    Idle,
    Off,
}

impl TransportState {
    /// Whether the device stopped on its own accord.
    #[must_use]
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Idle | Self::Off)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Idle => write!(f, "idle"),
            Self::Off => write!(f, "off"),
        }
    }
}

impl FromStr for TransportState {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let variant = match s {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "idle" => Self::Idle,
            "off" => Self::Off,
            _ => return Err(Error::invalid_argument(format!("transport state: {s}"))),
        };

        Ok(variant)
    }
}

/// Snapshot of what the device reports about itself.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub state: TransportState,

    /// Reported duration; milliseconds or seconds depending on the device,
    /// zero when unknown.
    pub duration: u64,

    /// Reported position in milliseconds. Informational only.
    pub position: u64,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn play(&self, url: &str) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;

    /// Seeks to `position` seconds into the current track.
    async fn seek(&self, position: u64) -> Result<()>;

    /// Sets the volume to `level` between 0.0 and 1.0.
    async fn set_volume(&self, level: f32) -> Result<()>;
    async fn mute(&self, muted: bool) -> Result<()>;

    async fn status(&self) -> Result<Status>;
}

/// A command as received by a [`Loopback`] device.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Play(String),
    Pause,
    Resume,
    Stop,
    Seek(u64),
    SetVolume(f32),
    Mute(bool),
}

#[derive(Debug, Default)]
struct Inner {
    state: TransportState,
    url: Option<String>,
    duration: u64,
    started: Option<Instant>,
    elapsed: Duration,
    history: Vec<Command>,
}

impl Inner {
    fn position(&self) -> Duration {
        self.elapsed + self.started.map_or(Duration::ZERO, |started| started.elapsed())
    }

    fn record(&mut self, command: Command) {
        debug!("loopback: {command:?}");
        self.history.push(command);
    }
}

/// A virtual device that plays nothing and keeps time.
///
/// It logs and records every command, reports its position from elapsed
/// time, and reports a duration only after one is set with
/// [`set_duration`](Self::set_duration), going idle once it has played
/// that long. Clones share the same device.
#[derive(Clone, Debug, Default)]
pub struct Loopback {
    inner: Arc<Mutex<Inner>>,
}

impl Loopback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command received so far.
    #[must_use]
    pub fn history(&self) -> Vec<Command> {
        self.lock().history.clone()
    }

    /// URLs played so far, in order.
    #[must_use]
    pub fn played(&self) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .filter_map(|command| match command {
                Command::Play(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// The URL loaded last.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.lock().url.clone()
    }

    /// Sets the duration reported for the current track.
    pub fn set_duration(&self, duration: u64) {
        self.lock().duration = duration;
    }

    /// Overrides the reported state, like a device going off on its own.
    pub fn set_state(&self, state: TransportState) {
        let mut inner = self.lock();
        if state != TransportState::Playing {
            inner.elapsed = inner.position();
            inner.started = None;
        }
        inner.state = state;
    }
}

#[async_trait]
impl Transport for Loopback {
    async fn play(&self, url: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.record(Command::Play(url.to_owned()));
        inner.url = Some(url.to_owned());
        inner.state = TransportState::Playing;
        inner.duration = 0;
        inner.elapsed = Duration::ZERO;
        inner.started = Some(Instant::now());
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.record(Command::Pause);
        if inner.state == TransportState::Playing {
            inner.elapsed = inner.position();
            inner.started = None;
            inner.state = TransportState::Paused;
        }
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.record(Command::Resume);
        if inner.state == TransportState::Paused {
            inner.started = Some(Instant::now());
            inner.state = TransportState::Playing;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.record(Command::Stop);
        inner.state = TransportState::Idle;
        inner.started = None;
        inner.elapsed = Duration::ZERO;
        Ok(())
    }

    async fn seek(&self, position: u64) -> Result<()> {
        let mut inner = self.lock();
        if inner.url.is_none() {
            return Err(Error::failed_precondition("cannot seek without a track"));
        }
        inner.record(Command::Seek(position));
        inner.elapsed = Duration::from_secs(position);
        if inner.started.is_some() {
            inner.started = Some(Instant::now());
        }
        Ok(())
    }

    async fn set_volume(&self, level: f32) -> Result<()> {
        self.lock().record(Command::SetVolume(level));
        Ok(())
    }

    async fn mute(&self, muted: bool) -> Result<()> {
        self.lock().record(Command::Mute(muted));
        Ok(())
    }

    async fn status(&self) -> Result<Status> {
        let inner = self.lock();
        let elapsed = inner.position();

        // Past the end of a known duration, the device has run out of track.
        let end = Duration::from_secs(duration::normalize(inner.duration));
        let state = if inner.state == TransportState::Playing && !end.is_zero() && elapsed >= end {
            TransportState::Idle
        } else {
            inner.state
        };

        Ok(Status {
            state,
            duration: inner.duration,
            position: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }
}
