//! Events emitted by a player.
//!
//! Observers receive these over the channel given to
//! [`Player::with_events`](crate::player::Player::with_events), and can
//! read the details from the player's [`NowPlaying`](crate::player::NowPlaying)
//! presentation.
//!
//! # Example
//!
//! ```rust
//! use cloudtune::events::Event;
//!
//! fn handle_event(event: Event) {
//!     match event {
//!         Event::Play => println!("Playback started"),
//!         Event::TrackChanged => println!("New track playing"),
//!         _ => {}
//!     }
//! }
//! ```

/// Significant state changes of a player.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Playback started or resumed.
    Play,

    /// Playback paused; it can resume from the current position.
    Pause,

    /// Playback stopped.
    Stop,

    /// A different track was armed, whether by request, by skipping or by
    /// reaching the end of the previous one.
    TrackChanged,

    /// The queue was replaced or cleared.
    QueueChanged,

    /// Shuffle was turned on or off.
    ShuffleChanged,
}
