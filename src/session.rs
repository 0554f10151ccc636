//! Runs a [`Player`] on its own task.
//!
//! A session owns its player exclusively and handles one [`Command`] at a
//! time, so ticks, advances and requests for one player never interleave.
//! Advances decided during a tick are posted back to the session's own
//! command queue, immediately or from a timer, and only run once the tick
//! that decided them has returned.
//!
//! Sessions of different players share nothing and run concurrently.

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::Instant,
};

use crate::{
    catalog::Request,
    error::{Error, Result},
    player::{NowPlaying, PendingAdvance, Player},
    scheduler::Advance,
    track::Entry,
};

type Reply<T> = oneshot::Sender<Result<T>>;

#[derive(Debug)]
enum Command {
    Tick(Instant),
    Advance(u64),
    Play(Request, Reply<Entry>),
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<()>),
    Seek(u64, Reply<()>),
    Next(Reply<Entry>),
    Previous(Reply<Entry>),
    SetShuffle(bool, Reply<()>),
    Clear(Reply<()>),
    SetTimingOffset(i64, Reply<()>),
    SetVolume(f32, Reply<()>),
    VolumeUp(Reply<()>),
    VolumeDown(Reply<()>),
    Mute(bool, Reply<()>),
    NowPlaying(Reply<NowPlaying>),
}

/// Cloneable handle to talk to a session.
///
/// The session ends once every handle is dropped.
#[derive(Clone, Debug)]
pub struct Handle {
    name: String,
    command_tx: mpsc::UnboundedSender<Command>,
}

pub struct Session {
    player: Player,
    command_rx: mpsc::UnboundedReceiver<Command>,

    /// Posts advances back to this session without keeping it alive.
    command_tx: mpsc::WeakUnboundedSender<Command>,
}

impl Session {
    #[must_use]
    pub fn new(player: Player) -> (Self, Handle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = Handle {
            name: player.name().to_owned(),
            command_tx: command_tx.clone(),
        };

        let session = Self {
            player,
            command_rx,
            command_tx: command_tx.downgrade(),
        };
        (session, handle)
    }

    /// Spawns a session for `player` on the current runtime.
    #[must_use]
    pub fn spawn(player: Player) -> (Handle, JoinHandle<Player>) {
        let (session, handle) = Self::new(player);
        (handle, tokio::spawn(session.run()))
    }

    /// Handles commands until every handle is dropped, then hands back the
    /// player.
    pub async fn run(mut self) -> Player {
        debug!("{}: session started", self.player.name());
        while let Some(command) = self.command_rx.recv().await {
            self.handle(command).await;
        }

        debug!("{}: session ended", self.player.name());
        self.player
    }

    async fn handle(&mut self, command: Command) {
        let player = &mut self.player;
        match command {
            Command::Tick(now) => {
                if let Some(pending) = player.tick(now).await {
                    self.dispatch(pending);
                }
            }
            Command::Advance(generation) => match player.advance(generation).await {
                Ok(Some(track)) => debug!("{}: advanced to {track}", player.name()),
                Ok(None) => {}
                Err(e) => error!("{}: failed to advance: {e}", player.name()),
            },
            Command::Play(request, reply) => respond(reply, player.play_request(request).await),
            Command::Pause(reply) => respond(reply, player.pause().await),
            Command::Resume(reply) => respond(reply, player.resume().await),
            Command::Stop(reply) => respond(reply, player.stop().await),
            Command::Seek(position, reply) => respond(reply, player.seek(position).await),
            Command::Next(reply) => respond(reply, player.next().await),
            Command::Previous(reply) => respond(reply, player.previous().await),
            Command::SetShuffle(shuffle, reply) => {
                player.set_shuffle(shuffle);
                respond(reply, Ok(()));
            }
            Command::Clear(reply) => {
                player.clear();
                respond(reply, Ok(()));
            }
            Command::SetTimingOffset(offset, reply) => {
                player.set_timing_offset(offset);
                respond(reply, Ok(()));
            }
            Command::SetVolume(level, reply) => respond(reply, player.set_volume(level).await),
            Command::VolumeUp(reply) => respond(reply, player.volume_up().await),
            Command::VolumeDown(reply) => respond(reply, player.volume_down().await),
            Command::Mute(muted, reply) => respond(reply, player.mute(muted).await),
            Command::NowPlaying(reply) => respond(reply, Ok(player.now_playing())),
        }
    }

    /// Posts an advance to run after the current command.
    ///
    /// A failure to post only loses this advance: the scheduler stays put
    /// until the next explicit request arms a track again.
    fn dispatch(&self, pending: PendingAdvance) {
        let name = self.player.name().to_owned();
        let PendingAdvance {
            generation,
            advance,
        } = pending;

        match advance {
            Advance::Now => {
                if let Err(e) = post(&self.command_tx, Command::Advance(generation)) {
                    warn!("{name}: {e}");
                }
            }
            Advance::After(delay) => {
                debug!("{name}: advancing in {}s", delay.as_secs());
                let command_tx = self.command_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = post(&command_tx, Command::Advance(generation)) {
                        warn!("{name}: {e}");
                    }
                });
            }
        }
    }
}

fn post(command_tx: &mpsc::WeakUnboundedSender<Command>, command: Command) -> Result<()> {
    command_tx
        .upgrade()
        .ok_or_else(|| Error::cancelled("session has ended"))?
        .send(command)
        .map_err(|_| Error::cancelled("session has ended"))
}

fn respond<T>(reply: Reply<T>, result: Result<T>) {
    if reply.send(result).is_err() {
        trace!("caller went away before the reply");
    }
}

impl Handle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues a tick for `now` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has ended.
    pub fn tick(&self, now: Instant) -> Result<()> {
        self.command_tx
            .send(Command::Tick(now))
            .map_err(|_| Error::cancelled(format!("session {} has ended", self.name)))
    }

    async fn call<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .map_err(|_| Error::cancelled(format!("session {} has ended", self.name)))?;
        reply_rx
            .await
            .map_err(|_| Error::cancelled(format!("session {} has ended", self.name)))?
    }

    /// See [`Player::play_request`].
    ///
    /// # Errors
    ///
    /// Returns the player's error, or an error if the session has ended.
    pub async fn play(&self, request: Request) -> Result<Entry> {
        self.call(|reply| Command::Play(request, reply)).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.call(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.call(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.call(Command::Stop).await
    }

    pub async fn seek(&self, position: u64) -> Result<()> {
        self.call(|reply| Command::Seek(position, reply)).await
    }

    pub async fn next(&self) -> Result<Entry> {
        self.call(Command::Next).await
    }

    pub async fn previous(&self) -> Result<Entry> {
        self.call(Command::Previous).await
    }

    pub async fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.call(|reply| Command::SetShuffle(shuffle, reply)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.call(Command::Clear).await
    }

    pub async fn set_timing_offset(&self, offset: i64) -> Result<()> {
        self.call(|reply| Command::SetTimingOffset(offset, reply))
            .await
    }

    pub async fn set_volume(&self, level: f32) -> Result<()> {
        self.call(|reply| Command::SetVolume(level, reply)).await
    }

    pub async fn volume_up(&self) -> Result<()> {
        self.call(Command::VolumeUp).await
    }

    pub async fn volume_down(&self) -> Result<()> {
        self.call(Command::VolumeDown).await
    }

    pub async fn mute(&self, muted: bool) -> Result<()> {
        self.call(|reply| Command::Mute(muted, reply)).await
    }

    pub async fn now_playing(&self) -> Result<NowPlaying> {
        self.call(Command::NowPlaying).await
    }
}
