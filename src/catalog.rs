//! Where tracks come from.
//!
//! A [`Catalog`] turns keywords and URIs into ordered lists of tracks. It is
//! also responsible for its own retry policy: the player surfaces catalog
//! errors to whoever made the play request and does not retry.
//!
//! Play requests arrive as strings and parse into a [`Request`]:
//!
//! * `cloudmusic://163/my/daily` plays the daily recommendations
//! * `cloudmusic://163/my/ilike` plays the favorites
//! * any other `cloudmusic://` URI is resolved by the catalog
//! * `http://` and `https://` URLs play as they are
//! * `index:N` plays entry `N` of the current queue
//! * anything else is a search keyword

use std::{fs, path::Path, str::FromStr};

use async_trait::async_trait;
use fastrand::Rng;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    track::Track,
};

/// Scheme of URIs resolved by a catalog.
pub const SCHEME: &str = "cloudmusic";

/// Shortcut to the daily recommendations.
pub const URI_DAILY_RECOMMEND: &str = "cloudmusic://163/my/daily";

/// Shortcut to the tracks marked as favorite.
pub const URI_MY_FAVORITES: &str = "cloudmusic://163/my/ilike";

/// Prefix of requests to play a specific queue entry.
const INDEX_PREFIX: &str = "index:";

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Searches for `keyword`, returning no tracks when nothing matches.
    async fn search(&self, keyword: &str) -> Result<Vec<Track>>;

    /// Resolves a catalog `uri` like a playlist or shortcut.
    async fn resolve(&self, uri: &Url) -> Result<Vec<Track>>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Search the catalog and play the results.
    Search(String),

    /// Resolve a catalog URI and play the results.
    Uri(Url),

    /// Play a URL directly.
    Url(Url),

    /// Play the entry at this index of the current queue.
    Index(usize),

    /// Play these tracks, starting at `start`.
    Tracks { tracks: Vec<Track>, start: usize },
}

impl FromStr for Request {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_argument("empty play request"));
        }

        if let Some(index) = s.strip_prefix(INDEX_PREFIX) {
            return Ok(Self::Index(index.trim().parse()?));
        }

        // Keywords may well contain a colon, so only take known schemes as
        // URLs.
        let request = match Url::parse(s) {
            Ok(url) if url.scheme() == SCHEME => Self::Uri(url),
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            _ => Self::Search(s.to_owned()),
        };

        Ok(request)
    }
}

/// A track in a [`Library`] file.
#[derive(Clone, Debug, Deserialize)]
pub struct LibraryTrack {
    #[serde(flatten)]
    pub track: Track,

    #[serde(default)]
    pub favorite: bool,
}

#[derive(Debug, Default, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    tracks: Vec<LibraryTrack>,
}

/// An in-memory catalog, typically loaded from a TOML file of
/// `[[tracks]]` tables.
#[derive(Clone, Debug, Default)]
pub struct Library {
    tracks: Vec<LibraryTrack>,
}

impl Library {
    /// Upper bound on the number of daily recommendations.
    pub const DAILY_SIZE: usize = 30;

    /// Library files larger than this are refused.
    const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

    #[must_use]
    pub fn new(tracks: Vec<LibraryTrack>) -> Self {
        Self { tracks }
    }

    /// Loads a library from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large or is not
    /// a valid library.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is too large ({size} bytes)",
                path.display()
            )));
        }

        let library: Self = fs::read_to_string(path)?.parse()?;
        info!("loaded {} tracks from {}", library.len(), path.display());
        Ok(library)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn favorites(&self) -> Vec<Track> {
        self.tracks
            .iter()
            .filter(|entry| entry.favorite)
            .map(|entry| entry.track.clone())
            .collect()
    }

    /// A selection that stays the same all day and changes the next.
    fn daily(&self) -> Vec<Track> {
        let today = time::OffsetDateTime::now_utc().date().to_julian_day();
        let mut rng = Rng::with_seed(u64::from(today.unsigned_abs()));

        let mut tracks: Vec<Track> = self.tracks.iter().map(|entry| entry.track.clone()).collect();
        rng.shuffle(&mut tracks);
        tracks.truncate(Self::DAILY_SIZE);
        tracks
    }
}

impl FromStr for Library {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let file: LibraryFile = toml::from_str(s)?;
        Ok(Self::new(file.tracks))
    }
}

#[async_trait]
impl Catalog for Library {
    /// Matches tracks whose title, artist or album contain every word of
    /// `keyword`, ignoring case.
    async fn search(&self, keyword: &str) -> Result<Vec<Track>> {
        let terms: Vec<String> = keyword.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<Track> = self
            .tracks
            .iter()
            .map(|entry| &entry.track)
            .filter(|track| {
                let haystack = format!("{} {} {}", track.title, track.artist, track.album)
                    .to_lowercase();
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .cloned()
            .collect();

        debug!("search for \"{keyword}\" found {} tracks", found.len());
        Ok(found)
    }

    async fn resolve(&self, uri: &Url) -> Result<Vec<Track>> {
        match uri.as_str() {
            URI_DAILY_RECOMMEND => Ok(self.daily()),
            URI_MY_FAVORITES => Ok(self.favorites()),
            _ => {
                // `cloudmusic://163/song/<id>` plays a single track.
                let mut segments = uri.path_segments().into_iter().flatten();
                match (segments.next(), segments.next()) {
                    (Some("song"), Some(id)) => Ok(self
                        .tracks
                        .iter()
                        .filter(|entry| entry.track.id == id)
                        .map(|entry| entry.track.clone())
                        .collect()),
                    _ => Err(Error::unimplemented(format!("cannot resolve {uri}"))),
                }
            }
        }
    }
}
