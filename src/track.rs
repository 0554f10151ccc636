//! Track descriptors as returned by a catalog.
//!
//! A [`Track`] is immutable once created. Queues hold tracks as [`Entry`]
//! values: the same song picked twice yields two entries that compare equal
//! by value but are told apart by identity, which is what shuffle
//! bookkeeping needs.

use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

/// A queued track, shared between the origin and active orderings.
pub type Entry = Arc<Track>;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,

    /// Duration in milliseconds; zero when the catalog does not know.
    #[serde(default, rename = "duration")]
    pub duration_ms: u64,

    /// Opaque locator the playback device can play.
    pub url: String,

    #[serde(default)]
    pub thumbnail: String,
}

impl Track {
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Makes a bare track out of a URL that did not come from a catalog.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            id: url.to_owned(),
            title: url.to_owned(),
            url: url.to_owned(),
            ..Self::default()
        }
    }

    /// The label search results are listed under.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Whether `a` and `b` are the very same queue entry, not merely the
    /// same song.
    #[must_use]
    pub fn same_entry(a: &Entry, b: &Entry) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// Tracks are equal when they point to the same song at the same location.
impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.url == other.url
    }
}

impl Eq for Track {}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} ({})", self.title, self.artist, self.id)
    }
}
