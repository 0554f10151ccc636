//! The play queue: a canonical ordering and the ordering actually played.
//!
//! The *origin* ordering is the one received from the catalog. The *active*
//! ordering equals the origin, or a permutation of it while shuffle is on.
//! The index always points into the active ordering and wraps around at
//! both ends: repeat mode is always "all".

use fastrand::Rng;
use thiserror::Error;

use crate::{
    shuffle,
    track::{Entry, Track},
};

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("queue is empty")]
    Empty,

    #[error("index {index} out of range for queue of {len} entries")]
    OutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug)]
pub struct Queue {
    origin: Vec<Entry>,
    active: Vec<Entry>,
    index: usize,
    shuffle: bool,
    rng: Rng,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(Rng::new())
    }

    /// Creates a queue that shuffles deterministically from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(Rng::with_seed(seed))
    }

    fn with_rng(rng: Rng) -> Self {
        Self {
            origin: Vec::new(),
            active: Vec::new(),
            index: 0,
            shuffle: false,
            rng,
        }
    }

    /// Replaces the queue with `tracks` and selects the entry at `start`
    /// of the canonical ordering to play first.
    ///
    /// With shuffle on, a fresh shuffled ordering is made and the selected
    /// entry is moved to its front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when `tracks` is not empty and `start`
    /// does not index into it. The queue is left untouched in that case.
    pub fn set_origin(&mut self, tracks: Vec<Track>, start: usize) -> Result<()> {
        let len = tracks.len();
        if len > 0 && start >= len {
            return Err(Error::OutOfRange { index: start, len });
        }

        let previous = std::mem::take(&mut self.active);
        self.origin = tracks.into_iter().map(Entry::new).collect();
        self.active.clone_from(&self.origin);
        self.index = 0;

        if let Some(first) = self.origin.get(start).cloned() {
            if self.shuffle {
                self.shuffle_from(&previous);
                self.move_to_front(&first);
            } else {
                self.index = start;
            }
        }

        debug!("queue set to {len} entries starting at {start}");
        Ok(())
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.origin.clear();
        self.active.clear();
        self.index = 0;
    }

    /// The entry currently playing or about to be played.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] when there is nothing queued.
    pub fn current(&self) -> Result<&Entry> {
        self.active.get(self.index).ok_or(Error::Empty)
    }

    /// Moves one entry forward or back, wrapping around at either end.
    ///
    /// Wrapping forward with shuffle on starts a new pass with a fresh
    /// shuffled ordering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] when there is nothing queued.
    pub fn advance(&mut self, direction: Direction) -> Result<&Entry> {
        let len = self.active.len();
        if len == 0 {
            return Err(Error::Empty);
        }

        self.index = match direction {
            Direction::Next => {
                if self.index + 1 < len {
                    self.index + 1
                } else {
                    if self.shuffle {
                        let previous = self.active.clone();
                        self.shuffle_from(&previous);
                        debug!("new shuffled pass over {len} entries");
                    }
                    0
                }
            }
            Direction::Previous => self.index.checked_sub(1).unwrap_or(len - 1),
        };

        self.current()
    }

    /// Jumps to `index` of the active ordering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] when there is nothing queued, or
    /// [`Error::OutOfRange`] when `index` does not point into the queue.
    pub fn seek_to(&mut self, index: usize) -> Result<&Entry> {
        let len = self.active.len();
        if len == 0 {
            return Err(Error::Empty);
        }
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }

        self.index = index;
        self.current()
    }

    /// Turns shuffle on or off without interrupting the current entry.
    ///
    /// Turning it on shuffles and moves the current entry to the front, so
    /// nothing is skipped or repeated. Turning it off restores the canonical
    /// ordering and points at the current entry within it.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle == enabled {
            return;
        }
        self.shuffle = enabled;

        let Ok(current) = self.current().cloned() else {
            return;
        };

        if enabled {
            let previous = self.active.clone();
            self.shuffle_from(&previous);
            self.move_to_front(&current);
        } else {
            self.active.clone_from(&self.origin);
            self.index = self
                .origin
                .iter()
                .position(|entry| Track::same_entry(entry, &current))
                .unwrap_or_else(|| {
                    warn!("current entry {current} not found in queue; starting from the top");
                    0
                });
        }
    }

    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Entries in canonical order.
    #[must_use]
    pub fn origin(&self) -> &[Entry] {
        &self.origin
    }

    /// Entries in play order.
    #[must_use]
    pub fn active(&self) -> &[Entry] {
        &self.active
    }

    fn shuffle_from(&mut self, previous: &[Entry]) {
        let (active, _) = shuffle::anti_repeat(&self.origin, previous, &mut self.rng);
        self.active = active;
        self.index = 0;
    }

    fn move_to_front(&mut self, entry: &Entry) {
        match self
            .active
            .iter()
            .position(|other| Track::same_entry(other, entry))
        {
            Some(position) => self.active.swap(0, position),
            None => warn!("entry {entry} not found after shuffling; starting from the top"),
        }
        self.index = 0;
    }
}
