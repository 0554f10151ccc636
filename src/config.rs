//! Configuration file model.
//!
//! Every key is optional:
//!
//! ```toml
//! # Seconds to advance after (positive) or before (negative) the natural
//! # end of a track.
//! next_track_timing = -2
//!
//! # Seconds between position updates.
//! tick_interval = 1
//!
//! # Track library for the built-in catalog.
//! library = "library.toml"
//!
//! [[players]]
//! name = "living room"
//! volume = 0.6
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};

use crate::error::{Error, Result};

#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Timing offset in seconds for advancing to the next track: positive
    /// advances late, negative advances early.
    pub next_track_timing: i64,

    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_interval: Duration,

    pub library: Option<PathBuf>,

    pub players: Vec<PlayerConfig>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    pub name: String,

    #[serde(default = "PlayerConfig::default_volume")]
    pub volume: f32,
}

impl PlayerConfig {
    fn default_volume() -> f32 {
        1.0
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            volume: Self::default_volume(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            next_track_timing: Self::DEFAULT_NEXT_TRACK_TIMING,
            tick_interval: Self::DEFAULT_TICK_INTERVAL,
            library: None,
            players: Vec::new(),
        }
    }
}

impl Config {
    pub const DEFAULT_NEXT_TRACK_TIMING: i64 = 0;
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

    /// Configuration files larger than this are refused.
    const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Loads the configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large, or holds
    /// invalid values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory conditions: the file should be small.
        let size = fs::metadata(path)?.len();
        if size > Self::MAX_FILE_SIZE {
            return Err(Error::out_of_range(format!(
                "{} is too large ({size} bytes)",
                path.display()
            )));
        }

        fs::read_to_string(path)?.parse()
    }

    fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::invalid_argument("tick interval must not be zero"));
        }

        for player in &self.players {
            if player.name.trim().is_empty() {
                return Err(Error::invalid_argument("player name must not be empty"));
            }
            if !(0.0..=1.0).contains(&player.volume) {
                return Err(Error::out_of_range(format!(
                    "volume {} of player \"{}\" not in 0.0..=1.0",
                    player.volume, player.name
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.next_track_timing, 0);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn parses_all_keys() {
        let config: Config = r#"
            next_track_timing = -5
            tick_interval = 2
            library = "library.toml"

            [[players]]
            name = "kitchen"

            [[players]]
            name = "living room"
            volume = 0.4
        "#
        .parse()
        .unwrap();

        assert_eq!(config.next_track_timing, -5);
        assert_eq!(config.tick_interval, Duration::from_secs(2));
        assert_eq!(config.library, Some(PathBuf::from("library.toml")));
        assert_eq!(config.players[0], PlayerConfig::named("kitchen"));
        assert!((config.players[1].volume - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = "tick_interval = 0".parse::<Config>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        let err = "[[players]]\nname = \"x\"\nvolume = 1.5"
            .parse::<Config>()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);

        let err = "next_track_timing = \"late\"".parse::<Config>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);

        assert!("unknown = 1".parse::<Config>().is_err());
    }
}
