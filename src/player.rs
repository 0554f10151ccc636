//! The virtual media player.
//!
//! A [`Player`] sits in front of a playback device. It owns the queue, keeps
//! its own playback clock and decides when a track is over, so that the
//! device only ever has to play one URL at a time.
//!
//! The player is driven from outside: a host calls [`Player::tick`] at a
//! fixed cadence and dispatches any advance it returns *after* the tick is
//! done, then calls [`Player::advance`]. The [`session`](crate::session)
//! module does exactly that.

use std::{fmt, sync::Arc};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{sync::mpsc, time::Instant};

use crate::{
    catalog::{Catalog, Request},
    clock::Clock,
    duration::Reconciler,
    error::{Error, Result},
    events::Event,
    queue::{Direction, Queue},
    scheduler::{Advance, Decision, Scheduler},
    track::{Entry, Track},
    transport::Transport,
};

/// What the player itself is doing, as opposed to what the device reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Repeat mode. The queue always wraps around.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    All,
}

/// An advance decided during a tick, tagged with the arming it belongs to.
///
/// Pass the generation back to [`Player::advance`]; if another track was
/// armed in the meantime, the advance is dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingAdvance {
    pub generation: u64,
    pub advance: Advance,
}

/// Everything a user interface shows about a player.
#[derive(Clone, Debug, Serialize)]
pub struct NowPlaying {
    pub name: String,
    pub state: PlaybackState,
    pub track_id: Option<String>,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: String,

    /// Reconciled duration in seconds.
    pub duration: u64,

    /// Position in seconds.
    pub position: u64,

    #[serde(with = "time::serde::rfc3339")]
    pub position_updated_at: OffsetDateTime,

    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub volume: f32,
    pub muted: bool,
    pub queue_len: usize,
    pub queue_index: usize,
}

pub struct Player {
    name: String,
    transport: Arc<dyn Transport>,
    catalog: Arc<dyn Catalog>,

    queue: Queue,
    clock: Clock,
    durations: Reconciler,
    scheduler: Scheduler,

    state: PlaybackState,
    generation: u64,

    /// Track whose metadata is on display.
    showing: Option<Entry>,

    volume: f32,
    muted: bool,

    event_tx: Option<mpsc::UnboundedSender<Event>>,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("queue", &self.queue.len())
            .field("position", &self.clock.position())
            .field("scheduler", &self.scheduler.state())
            .finish_non_exhaustive()
    }
}

impl Player {
    /// Volume change of [`volume_up`](Self::volume_up) and
    /// [`volume_down`](Self::volume_down).
    pub const VOLUME_STEP: f32 = 0.1;

    /// Creates a player for the device behind `transport`, taking tracks
    /// from `catalog`. `offset` is the next-track timing offset in seconds.
    #[must_use]
    pub fn new(
        name: &str,
        transport: Arc<dyn Transport>,
        catalog: Arc<dyn Catalog>,
        offset: i64,
    ) -> Self {
        Self {
            name: name.to_owned(),
            transport,
            catalog,
            queue: Queue::new(),
            clock: Clock::new(),
            durations: Reconciler::new(),
            scheduler: Scheduler::new(offset),
            state: PlaybackState::default(),
            generation: 0,
            showing: None,
            volume: 1.0,
            muted: false,
            event_tx: None,
        }
    }

    /// Sends events to `event_tx`.
    #[must_use]
    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Shuffles deterministically from `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.queue = Queue::with_seed(seed);
        self
    }

    /// Sets the initial logical volume without telling the device.
    #[must_use]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.clock.position()
    }

    /// Reconciled duration of the current track, in seconds.
    #[must_use]
    pub fn duration(&self) -> u64 {
        self.durations.seconds()
    }

    /// The arming generation; bumps every time a track is armed, the
    /// player stops or the queue is cleared.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn emit(&self, event: Event) {
        if let Some(event_tx) = &self.event_tx {
            if let Err(e) = event_tx.send(event) {
                error!("failed to send event: {e}");
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            debug!("{}: {} -> {state}", self.name, self.state);
            self.state = state;
        }
    }

    /// Replaces the queue with whatever `request` resolves to and starts
    /// playing, or jumps within the current queue for [`Request::Index`].
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog fails, when nothing was found (the
    /// queue is left as it was), when an index is out of range, or when the
    /// device cannot play.
    pub async fn play_request(&mut self, request: Request) -> Result<Entry> {
        let (tracks, start) = match request {
            Request::Index(index) => {
                self.queue.seek_to(index)?;
                return self.start().await;
            }
            Request::Search(keyword) => {
                let tracks = self.catalog.search(&keyword).await?;
                if tracks.is_empty() {
                    return Err(Error::not_found(format!("no tracks found for \"{keyword}\"")));
                }
                (tracks, 0)
            }
            Request::Uri(uri) => {
                let tracks = self.catalog.resolve(&uri).await?;
                if tracks.is_empty() {
                    return Err(Error::not_found(format!("no tracks found at {uri}")));
                }
                (tracks, 0)
            }
            Request::Url(url) => (vec![Track::from_url(url.as_str())], 0),
            Request::Tracks { tracks, start } => (tracks, start),
        };

        self.queue.set_origin(tracks, start)?;
        info!("{}: queued {} tracks", self.name, self.queue.len());
        self.emit(Event::QueueChanged);

        self.start().await
    }

    /// Arms the current queue entry and tells the device to play it.
    async fn start(&mut self) -> Result<Entry> {
        let track = self.queue.current()?.clone();
        if track.url.is_empty() {
            return Err(Error::failed_precondition(format!(
                "{track} has no playable url"
            )));
        }

        self.arm(&track);
        if let Err(e) = self.transport.play(&track.url).await {
            // Leave nothing armed that could advance on its own; the next
            // explicit request arms again.
            self.scheduler.disarm();
            self.set_state(PlaybackState::Stopped);
            return Err(e);
        }

        info!("{}: playing {track}", self.name);
        self.set_state(PlaybackState::Playing);
        self.emit(Event::TrackChanged);
        Ok(track)
    }

    /// Disarms, and makes any advance still in flight stale.
    fn drop_pending(&mut self) {
        self.generation += 1;
        self.scheduler.disarm();
    }

    fn arm(&mut self, track: &Entry) {
        self.generation += 1;
        self.clock.reset_on_track_start();
        self.scheduler.arm();
        self.durations.reconcile(track.duration_ms, 0);
        self.showing = Some(Arc::clone(track));
    }

    /// Resumes playback, or starts the current entry when stopped.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue is empty or the device fails.
    pub async fn resume(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Stopped => self.start().await.map(|_| ()),
            PlaybackState::Paused => {
                self.transport.resume().await?;
                self.set_state(PlaybackState::Playing);
                self.emit(Event::Play);
                Ok(())
            }
        }
    }

    /// Pauses playback. Ticks leave all state alone until resumed.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails.
    pub async fn pause(&mut self) -> Result<()> {
        self.transport.pause().await?;
        if self.state == PlaybackState::Playing {
            self.set_state(PlaybackState::Paused);
            self.emit(Event::Pause);
        }
        Ok(())
    }

    /// Stops playback; nothing advances until something is played again.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails.
    pub async fn stop(&mut self) -> Result<()> {
        self.transport.stop().await?;
        self.drop_pending();
        self.set_state(PlaybackState::Stopped);
        self.emit(Event::Stop);
        Ok(())
    }

    /// Seeks to `position` seconds into the current track.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails; the clock is left alone then.
    pub async fn seek(&mut self, position: u64) -> Result<()> {
        self.transport.seek(position).await?;
        self.clock.reset_on_seek(position);
        debug!("{}: seeked to {position}s", self.name);
        Ok(())
    }

    /// Skips to the next entry and plays it.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue is empty or the device fails.
    pub async fn next(&mut self) -> Result<Entry> {
        self.skip(Direction::Next).await
    }

    /// Goes back to the previous entry and plays it.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue is empty or the device fails.
    pub async fn previous(&mut self) -> Result<Entry> {
        self.skip(Direction::Previous).await
    }

    async fn skip(&mut self, direction: Direction) -> Result<Entry> {
        self.queue.advance(direction)?;
        self.start().await
    }

    /// Advances to the next track for an advance decided by
    /// [`tick`](Self::tick). Returns `None` if the advance is stale because
    /// another track was armed since.
    ///
    /// # Errors
    ///
    /// Returns an error when the queue is empty or the device fails.
    pub async fn advance(&mut self, generation: u64) -> Result<Option<Entry>> {
        if generation != self.generation {
            debug!(
                "{}: dropping advance for generation {generation}, now at {}",
                self.name, self.generation
            );
            return Ok(None);
        }

        self.next().await.map(Some)
    }

    /// Turns shuffle on or off. The current track keeps playing.
    pub fn set_shuffle(&mut self, shuffle: bool) {
        if self.queue.shuffle() != shuffle {
            self.queue.set_shuffle(shuffle);
            debug!("{}: shuffle {}", self.name, if shuffle { "on" } else { "off" });
            self.emit(Event::ShuffleChanged);
        }
    }

    /// Empties the queue. The device is left alone, but nothing advances.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.drop_pending();
        self.showing = None;
        self.emit(Event::QueueChanged);
    }

    /// Changes the next-track timing offset in seconds.
    pub fn set_timing_offset(&mut self, offset: i64) {
        if self.scheduler.offset() != offset {
            info!("{}: next track timing offset set to {offset}s", self.name);
            self.scheduler.set_offset(offset);
        }
    }

    /// Sets the volume to `level` between 0.0 and 1.0.
    ///
    /// # Errors
    ///
    /// Returns an error when `level` is out of range or the device fails.
    pub async fn set_volume(&mut self, level: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(Error::out_of_range(format!(
                "volume {level} not in 0.0..=1.0"
            )));
        }

        self.transport.set_volume(level).await?;
        self.volume = level;
        Ok(())
    }

    /// Raises the volume by one step, up to the maximum.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails.
    pub async fn volume_up(&mut self) -> Result<()> {
        self.set_volume((self.volume + Self::VOLUME_STEP).min(1.0))
            .await
    }

    /// Lowers the volume by one step, down to silence.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails.
    pub async fn volume_down(&mut self) -> Result<()> {
        self.set_volume((self.volume - Self::VOLUME_STEP).max(0.0))
            .await
    }

    /// Mutes or unmutes the device.
    ///
    /// # Errors
    ///
    /// Returns an error when the device fails.
    pub async fn mute(&mut self, muted: bool) -> Result<()> {
        self.transport.mute(muted).await?;
        self.muted = muted;
        Ok(())
    }

    /// Updates the clock, duration and scheduler for one tick at `now`.
    ///
    /// Does nothing at all unless playing. Returns the advance to dispatch
    /// when the current track is closing out; the caller must not call back
    /// into the player for it before this tick has returned.
    pub async fn tick(&mut self, now: Instant) -> Option<PendingAdvance> {
        if self.state != PlaybackState::Playing {
            return None;
        }

        self.clock.tick(now);

        let status = match self.transport.status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("{}: device status unavailable: {e}", self.name);
                return None;
            }
        };

        let queue_duration = self.queue.current().map_or(0, |track| track.duration_ms);
        let duration = self.durations.reconcile(queue_duration, status.duration);

        match self
            .scheduler
            .evaluate(self.clock.position(), duration, status.state)
        {
            Decision::Advance(advance) => Some(PendingAdvance {
                generation: self.generation,
                advance,
            }),
            Decision::Continue => {
                self.showing = self.queue.current().ok().cloned();
                None
            }
            Decision::Inactive => None,
        }
    }

    /// What to show in a user interface.
    #[must_use]
    pub fn now_playing(&self) -> NowPlaying {
        let track = self.showing.as_deref();
        let text = |field: fn(&Track) -> &String| track.map(field).cloned().unwrap_or_default();

        NowPlaying {
            name: self.name.clone(),
            state: self.state,
            track_id: track.map(|track| track.id.clone()),
            title: text(|track| &track.title),
            artist: text(|track| &track.artist),
            album: text(|track| &track.album),
            artwork: text(|track| &track.thumbnail),
            duration: self.durations.seconds(),
            position: self.clock.position(),
            position_updated_at: OffsetDateTime::from(self.clock.updated_at()),
            shuffle: self.queue.shuffle(),
            repeat: RepeatMode::All,
            volume: self.volume,
            muted: self.muted,
            queue_len: self.queue.len(),
            queue_index: self.queue.index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        catalog::Library,
        error::ErrorKind,
        scheduler,
        transport::{Command, Loopback, Status, TransportState},
    };

    const LIBRARY: &str = r#"
        [[tracks]]
        id = "1"
        title = "First"
        artist = "Band"
        album = "Album"
        duration = 180000
        url = "http://music/1.mp3"
        thumbnail = "http://art/1.jpg"

        [[tracks]]
        id = "2"
        title = "Second"
        artist = "Band"
        duration = 120000
        url = "http://music/2.mp3"

        [[tracks]]
        id = "3"
        title = "Third"
        artist = "Other"
        url = "http://music/3.mp3"
    "#;

    fn player(offset: i64) -> (Player, Loopback) {
        let device = Loopback::new();
        let library: Library = LIBRARY.parse().unwrap();
        let player = Player::new("test", Arc::new(device.clone()), Arc::new(library), offset)
            .with_seed(1);
        (player, device)
    }

    /// Ticks until the player decides to advance, at most `limit` times.
    async fn tick_until_advance(player: &mut Player, limit: usize) -> Option<PendingAdvance> {
        for _ in 0..limit {
            if let Some(pending) = player.tick(Instant::now()).await {
                return Some(pending);
            }
        }
        None
    }

    #[tokio::test]
    async fn plays_search_results() {
        let (mut player, device) = player(0);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        player = player.with_events(event_tx);

        let track = player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();

        assert_eq!(track.id, "1");
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(player.queue().len(), 2);
        assert_eq!(device.played(), vec!["http://music/1.mp3".to_string()]);
        assert_eq!(event_rx.recv().await, Some(Event::QueueChanged));
        assert_eq!(event_rx.recv().await, Some(Event::TrackChanged));

        let now_playing = player.now_playing();
        assert_eq!(now_playing.title, "First");
        assert_eq!(now_playing.artwork, "http://art/1.jpg");
        assert_eq!(now_playing.duration, 180);
        assert_eq!(now_playing.repeat, RepeatMode::All);
        assert_eq!(now_playing.track_id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn empty_search_keeps_queue() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("other".to_string()))
            .await
            .unwrap();

        let err = player
            .play_request(Request::Search("polka".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(player.queue().len(), 1);
        assert_eq!(device.played().len(), 1);
    }

    #[tokio::test]
    async fn next_on_empty_queue_fails_without_playing() {
        let (mut player, device) = player(0);
        let err = player.next().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FailedPrecondition);
        assert!(device.history().is_empty());
    }

    #[tokio::test]
    async fn schedules_one_advance_at_end_of_track() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();

        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        assert_eq!(player.position(), 179);
        assert_eq!(pending.advance, Advance::After(Duration::from_secs(1)));
        assert_eq!(player.scheduler().state(), scheduler::State::Scheduled);

        // Further ticks while closing out do not schedule again.
        assert_eq!(tick_until_advance(&mut player, 10).await, None);

        let next = player.advance(pending.generation).await.unwrap().unwrap();
        assert_eq!(next.id, "2");
        assert_eq!(player.position(), 0);
        assert_eq!(player.scheduler().state(), scheduler::State::Armed);
        assert_eq!(device.url().as_deref(), Some("http://music/2.mp3"));

        // The same advance again is stale.
        assert_eq!(player.advance(pending.generation).await.unwrap(), None);
        assert_eq!(device.played().len(), 2);
    }

    #[tokio::test]
    async fn lost_advance_recovers_on_next() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();

        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        assert_eq!(player.advance(pending.generation + 1).await.unwrap(), None);
        assert_eq!(player.scheduler().state(), scheduler::State::Scheduled);
        assert_eq!(tick_until_advance(&mut player, 10).await, None);

        let next = player.next().await.unwrap();
        assert_eq!(next.id, "2");
        assert_eq!(player.scheduler().state(), scheduler::State::Armed);

        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        assert_eq!(pending.generation, player.generation());
        assert_eq!(player.position(), 119);
        assert_eq!(device.played().len(), 2);
    }

    #[tokio::test]
    async fn stop_and_clear_make_pending_advance_stale() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();

        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        player.stop().await.unwrap();
        assert_eq!(player.advance(pending.generation).await.unwrap(), None);
        assert_eq!(player.state(), PlaybackState::Stopped);

        player.resume().await.unwrap();
        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        player.clear();
        assert_eq!(player.advance(pending.generation).await.unwrap(), None);
        assert_eq!(device.played().len(), 2);
    }

    #[tokio::test]
    async fn advances_early_with_negative_offset() {
        let (mut player, _) = player(-5);
        player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap();

        let pending = tick_until_advance(&mut player, 500).await.unwrap();
        assert_eq!(player.position(), 174);
        assert_eq!(pending.advance, Advance::After(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn paused_ticks_change_nothing() {
        let (mut player, _) = player(0);
        player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap();
        for _ in 0..10 {
            player.tick(Instant::now()).await;
        }

        player.pause().await.unwrap();
        let position = player.position();
        let duration = player.duration();
        let previous = player.scheduler().previous();
        for _ in 0..300 {
            assert_eq!(player.tick(Instant::now()).await, None);
        }
        assert_eq!(player.position(), position);
        assert_eq!(player.duration(), duration);
        assert_eq!(player.scheduler().previous(), previous);

        player.resume().await.unwrap();
        player.tick(Instant::now()).await;
        assert_eq!(player.position(), position + 1);
    }

    #[tokio::test]
    async fn device_going_off_advances_now() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("third".to_string()))
            .await
            .unwrap();
        player.tick(Instant::now()).await;

        device.set_state(TransportState::Off);
        let pending = player.tick(Instant::now()).await.unwrap();
        assert_eq!(pending.advance, Advance::Now);
    }

    #[tokio::test]
    async fn device_duration_fills_in() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("third".to_string()))
            .await
            .unwrap();
        device.set_duration(95_000);
        player.tick(Instant::now()).await;
        assert_eq!(player.duration(), 95);
    }

    #[tokio::test]
    async fn seek_resets_clock() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap();
        player.seek(100).await.unwrap();
        player.tick(Instant::now()).await;
        player.tick(Instant::now()).await;

        assert_eq!(player.position(), 101);
        assert!(device.history().contains(&Command::Seek(100)));
    }

    #[tokio::test]
    async fn shuffle_keeps_current_track_playing() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Uri(
                url::Url::parse("cloudmusic://163/my/daily").unwrap(),
            ))
            .await
            .unwrap();
        let current = player.now_playing().track_id;

        player.set_shuffle(true);
        assert!(player.now_playing().shuffle);
        assert_eq!(player.queue().current().unwrap().id, current.unwrap());
        assert_eq!(device.played().len(), 1);
    }

    #[tokio::test]
    async fn plays_index_and_direct_urls() {
        let (mut player, device) = player(0);
        player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();

        let track = player.play_request(Request::Index(1)).await.unwrap();
        assert_eq!(track.id, "2");
        let err = player.play_request(Request::Index(5)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);

        let url = url::Url::parse("https://cdn.example/live.mp3").unwrap();
        let track = player.play_request(Request::Url(url)).await.unwrap();
        assert_eq!(track.url, "https://cdn.example/live.mp3");
        assert_eq!(player.queue().len(), 1);
        assert_eq!(device.played().len(), 3);
    }

    #[tokio::test]
    async fn previous_wraps_to_last_entry() {
        let (mut player, _) = player(0);
        player
            .play_request(Request::Search("band".to_string()))
            .await
            .unwrap();
        assert_eq!(player.previous().await.unwrap().id, "2");
        assert_eq!(player.next().await.unwrap().id, "1");
    }

    #[tokio::test]
    async fn volume_is_bounded() {
        let (mut player, device) = player(0);
        let err = player.set_volume(1.5).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);

        player.volume_up().await.unwrap();
        assert!((player.now_playing().volume - 1.0).abs() < f32::EPSILON);
        player.set_volume(0.05).await.unwrap();
        player.volume_down().await.unwrap();
        assert!(player.now_playing().volume.abs() < f32::EPSILON);

        player.mute(true).await.unwrap();
        assert!(player.now_playing().muted);
        assert!(device.history().contains(&Command::Mute(true)));
    }

    #[tokio::test]
    async fn clear_disarms() {
        let (mut player, _) = player(0);
        player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap();
        player.clear();

        assert!(player.queue().is_empty());
        assert_eq!(player.now_playing().track_id, None);
        assert_eq!(tick_until_advance(&mut player, 500).await, None);
    }

    #[tokio::test]
    async fn now_playing_serializes_for_display() {
        let (mut player, _) = player(0);
        player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap();
        player.pause().await.unwrap();

        let json = serde_json::to_value(player.now_playing()).unwrap();
        assert_eq!(json["state"], "paused");
        assert_eq!(json["repeat"], "all");
        assert_eq!(json["album"], "Album");
        assert_eq!(json["queue_len"], 1);
        assert!(json["position_updated_at"].as_str().unwrap().contains('T'));
    }

    struct Unplugged;

    #[async_trait]
    impl Transport for Unplugged {
        async fn play(&self, _url: &str) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn pause(&self) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn resume(&self) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn stop(&self) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn seek(&self, _position: u64) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn set_volume(&self, _level: f32) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn mute(&self, _muted: bool) -> Result<()> {
            Err(Error::unavailable("device unplugged"))
        }
        async fn status(&self) -> Result<Status> {
            Err(Error::unavailable("device unplugged"))
        }
    }

    #[tokio::test]
    async fn failed_play_leaves_nothing_armed() {
        let library: Library = LIBRARY.parse().unwrap();
        let mut player = Player::new("unplugged", Arc::new(Unplugged), Arc::new(library), 0);

        let err = player
            .play_request(Request::Search("first".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.scheduler().state(), scheduler::State::Idle);
    }
}
