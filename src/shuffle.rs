//! Shuffling that avoids repeats across pass boundaries.
//!
//! A plain shuffle of a short queue often plays the songs that ended the
//! previous pass again right at the start of the next one. For queues of
//! more than [`SMALL_QUEUE`] entries, the first [`avoid_count`] entries of a
//! new ordering are kept clear of the last [`avoid_count`] entries of the
//! previous ordering, retrying at most [`MAX_RESHUFFLES`] times.
//!
//! Overlap is decided by entry identity, so a song queued twice is tracked
//! per occurrence.

use fastrand::Rng;

use crate::track::{Entry, Track};

/// Queues up to this length are shuffled without any constraint.
pub const SMALL_QUEUE: usize = 3;

/// Upper bound on how many entries at either boundary are kept apart.
pub const MAX_AVOID: usize = 5;

/// Re-shuffles attempted before a candidate is accepted as it is.
pub const MAX_RESHUFFLES: usize = 10;

/// What happened while producing a shuffled ordering.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Number of re-shuffles after the first candidate.
    pub reshuffles: usize,

    /// Whether the boundary overlap was avoided. Always `true` when there
    /// was nothing to avoid.
    pub avoided: bool,
}

/// Number of boundary entries to keep apart for a queue of `len` entries:
/// 40% of the queue, at least one and at most [`MAX_AVOID`].
#[must_use]
pub fn avoid_count(len: usize) -> usize {
    (len * 2 / 5).clamp(1, MAX_AVOID)
}

/// Produces a shuffled copy of `origin`, keeping its head clear of the tail
/// of `previous` where possible.
///
/// `previous` is the ordering that was active before, and may be empty.
pub fn anti_repeat(origin: &[Entry], previous: &[Entry], rng: &mut Rng) -> (Vec<Entry>, Outcome) {
    let mut candidate = origin.to_vec();
    rng.shuffle(&mut candidate);

    let len = origin.len();
    if len <= SMALL_QUEUE {
        trace!("shuffled small queue of {len} entries without constraints");
        return (
            candidate,
            Outcome {
                reshuffles: 0,
                avoided: true,
            },
        );
    }

    let avoid = avoid_count(len);
    let last = &previous[previous.len().saturating_sub(avoid)..];
    if last.is_empty() {
        debug!("first shuffle of {len} entries");
        return (
            candidate,
            Outcome {
                reshuffles: 0,
                avoided: true,
            },
        );
    }

    let mut reshuffles = 0;
    while overlaps(&candidate[..avoid], last) {
        if reshuffles == MAX_RESHUFFLES {
            debug!(
                "could not keep the last {avoid} entries out of the first {avoid} \
                 after {MAX_RESHUFFLES} re-shuffles; accepting as is"
            );
            return (
                candidate,
                Outcome {
                    reshuffles,
                    avoided: false,
                },
            );
        }

        rng.shuffle(&mut candidate);
        reshuffles += 1;
    }

    debug!("kept the last {avoid} entries out of the first {avoid} after {reshuffles} re-shuffles");
    (
        candidate,
        Outcome {
            reshuffles,
            avoided: true,
        },
    )
}

fn overlaps(head: &[Entry], tail: &[Entry]) -> bool {
    head.iter()
        .any(|entry| tail.iter().any(|other| Track::same_entry(entry, other)))
}
