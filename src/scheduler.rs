//! Decides when the current track is over and the next one should start.
//!
//! Each tick the scheduler compares the remaining time of the armed track
//! against a trigger window derived from the configured timing offset:
//!
//! * offset `0` or positive (advance late): the window is 1 second, and
//!   the advance fires `1 + offset` seconds after the decision;
//! * offset `-k` (advance early by `k` seconds): the window is `k + 1`
//!   seconds, and the advance fires 1 second after the decision, `k`
//!   seconds before the natural end.
//!
//! An advance is decided at most once per armed track: deciding moves the
//! scheduler to [`State::Scheduled`], which only a new [`arm`](Scheduler::arm)
//! leaves.

use std::time::Duration;

use crate::transport::TransportState;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    /// No track armed.
    #[default]
    Idle,
    /// A track is playing and no advance has been decided yet.
    Armed,
    /// The advance for the armed track has been decided.
    Scheduled,
}

/// What the scheduler saw on the previous tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Position in seconds.
    pub position: u64,
    /// Reconciled duration in seconds.
    pub duration: u64,
    pub device: TransportState,
}

/// An advance to the next track that the caller must dispatch, outside of
/// the tick that decided it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Advance as soon as the current tick is done.
    Now,
    /// Advance after the given delay.
    After(Duration),
}

/// Outcome of evaluating one tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Nothing armed or already scheduled; nothing to do.
    Inactive,
    /// Still playing; the sample was recorded.
    Continue,
    /// The track is closing out.
    Advance(Advance),
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    state: State,
    previous: Option<Sample>,
    offset: i64,
}

impl Scheduler {
    /// Creates a scheduler with a timing `offset` in seconds: positive to
    /// advance late, negative to advance early.
    #[must_use]
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Changes the timing offset, taking effect from the next tick.
    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    /// Remaining seconds at or below which the advance is decided.
    #[must_use]
    pub fn trigger_threshold(&self) -> i64 {
        (1 - self.offset).max(1)
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn previous(&self) -> Option<Sample> {
        self.previous
    }

    /// Arms a newly started track.
    pub fn arm(&mut self) {
        self.state = State::Armed;
        self.previous = None;
    }

    /// Disarms, for when nothing is playing anymore.
    pub fn disarm(&mut self) {
        self.state = State::Idle;
        self.previous = None;
    }

    /// Evaluates one tick with the clock `position` and reconciled
    /// `duration`, both in seconds, and the state the device reports.
    ///
    /// Only to be called while the player itself is playing.
    pub fn evaluate(&mut self, position: u64, duration: u64, device: TransportState) -> Decision {
        if self.state != State::Armed {
            return Decision::Inactive;
        }

        if let Some(previous) = self.previous {
            if previous.duration > 0 {
                let remaining = i64::try_from(duration)
                    .unwrap_or(i64::MAX)
                    .saturating_sub(i64::try_from(position).unwrap_or(i64::MAX));

                if remaining <= self.trigger_threshold() && duration > 1 {
                    self.state = State::Scheduled;
                    let wait = remaining + self.offset;
                    debug!(
                        "track closing out at {position}s of {duration}s; advancing in {}s",
                        wait.max(0)
                    );
                    return Decision::Advance(match u64::try_from(wait) {
                        Ok(wait) if wait > 0 => Advance::After(Duration::from_secs(wait)),
                        _ => Advance::Now,
                    });
                }
            }

            if device.is_stopped() {
                info!("device went {device} at {position}s of {duration}s; advancing");
                self.state = State::Scheduled;
                self.previous = None;
                return Decision::Advance(Advance::Now);
            }
        }

        self.previous = Some(Sample {
            position,
            duration,
            device,
        });
        Decision::Continue
    }
}
