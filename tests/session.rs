//! Players driven end to end by a ticker on paused time.

use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time};

use cloudtune::{
    catalog::{Library, Request},
    events::Event,
    player::{PlaybackState, Player},
    session::{Handle, Session},
    ticker::Ticker,
    transport::{Loopback, TransportState},
};

const LIBRARY: &str = r#"
    [[tracks]]
    id = "1"
    title = "One"
    artist = "Band"
    duration = 5000
    url = "http://music/1.mp3"

    [[tracks]]
    id = "2"
    title = "Two"
    artist = "Band"
    duration = 5000
    url = "http://music/2.mp3"

    [[tracks]]
    id = "3"
    title = "Three"
    artist = "Band"
    duration = 5000
    url = "http://music/3.mp3"
"#;

fn spawn(offset: i64) -> (Handle, Loopback, mpsc::UnboundedReceiver<Event>) {
    let library: Library = LIBRARY.parse().unwrap();
    let device = Loopback::new();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let player = Player::new(
        "test",
        Arc::new(device.clone()),
        Arc::new(library),
        offset,
    )
    .with_events(event_tx);

    let (handle, _) = Session::spawn(player);
    (handle, device, event_rx)
}

fn urls(ids: &[u32]) -> Vec<String> {
    ids.iter().map(|id| format!("http://music/{id}.mp3")).collect()
}

async fn play_all(handle: &Handle) {
    let track = handle
        .play(Request::Search("band".to_owned()))
        .await
        .unwrap();
    assert_eq!(track.id, "1");
}

#[tokio::test(start_paused = true)]
async fn advances_once_at_end_of_track() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    time::sleep(Duration::from_millis(6500)).await;
    assert_eq!(device.played(), urls(&[1, 2]));

    let now = handle.now_playing().await.unwrap();
    assert_eq!(now.track_id.as_deref(), Some("2"));
    assert_eq!(now.state, PlaybackState::Playing);
    assert_eq!(now.duration, 5);
    assert_eq!(now.queue_index, 1);
}

#[tokio::test(start_paused = true)]
async fn early_offset_advances_before_the_end() {
    let (handle, device, _events) = spawn(-2);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    // Decided at 2s of 5s, due at 3s.
    time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(device.played(), urls(&[1, 2]));
}

#[tokio::test(start_paused = true)]
async fn manual_skip_drops_pending_advance() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    // The advance decided at 4s is due at 5s.
    time::sleep(Duration::from_millis(4500)).await;
    let track = handle.next().await.unwrap();
    assert_eq!(track.id, "2");

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device.played(), urls(&[1, 2]));
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_advance() {
    let (handle, device, _events) = spawn(3);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    // The advance decided at 4s is due at 8s.
    time::sleep(Duration::from_millis(4500)).await;
    handle.stop().await.unwrap();

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(device.played(), urls(&[1]));
    assert_eq!(
        handle.now_playing().await.unwrap().state,
        PlaybackState::Stopped
    );
}

#[tokio::test(start_paused = true)]
async fn pending_advance_fires_while_paused() {
    let (handle, device, _events) = spawn(3);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    time::sleep(Duration::from_millis(4500)).await;
    handle.pause().await.unwrap();

    time::sleep(Duration::from_secs(4)).await;
    assert_eq!(device.played(), urls(&[1, 2]));
    assert_eq!(
        handle.now_playing().await.unwrap().state,
        PlaybackState::Playing
    );
}

#[tokio::test(start_paused = true)]
async fn clear_drops_pending_advance() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    time::sleep(Duration::from_millis(4500)).await;
    handle.clear().await.unwrap();

    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device.played(), urls(&[1]));
    assert_eq!(handle.now_playing().await.unwrap().queue_len, 0);
}

#[tokio::test(start_paused = true)]
async fn stopped_device_advances_on_next_tick() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    time::sleep(Duration::from_millis(2500)).await;
    device.set_state(TransportState::Idle);

    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(device.played(), urls(&[1, 2]));
}

#[tokio::test(start_paused = true)]
async fn paused_player_keeps_position() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;
    let _ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);

    time::sleep(Duration::from_millis(2500)).await;
    handle.pause().await.unwrap();
    time::sleep(Duration::from_secs(20)).await;

    let now = handle.now_playing().await.unwrap();
    assert_eq!(now.state, PlaybackState::Paused);
    assert_eq!(now.position, 2);
    assert_eq!(device.played(), urls(&[1]));
}

#[tokio::test(start_paused = true)]
async fn reconfigure_replaces_driver() {
    let (handle, device, _events) = spawn(0);
    play_all(&handle).await;

    let mut ticker = Ticker::install(Duration::from_secs(1), vec![handle.clone()]);
    ticker.reconfigure(Duration::from_secs(10), vec![handle.clone()]);
    assert_eq!(ticker.interval(), Duration::from_secs(10));
    assert!(ticker.is_running());

    time::sleep(Duration::from_millis(6500)).await;
    assert_eq!(handle.now_playing().await.unwrap().position, 0);
    assert_eq!(device.played(), urls(&[1]));

    ticker.shutdown().await;
    time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.now_playing().await.unwrap().position, 0);
}

#[tokio::test(start_paused = true)]
async fn events_follow_playback() {
    let (handle, _device, mut events) = spawn(0);
    play_all(&handle).await;
    handle.pause().await.unwrap();
    handle.resume().await.unwrap();
    handle.set_shuffle(true).await.unwrap();
    handle.stop().await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        [
            Event::QueueChanged,
            Event::TrackChanged,
            Event::Pause,
            Event::Play,
            Event::ShuffleChanged,
            Event::Stop,
        ]
    );
}

#[tokio::test]
async fn session_ends_with_last_handle() {
    let library: Library = LIBRARY.parse().unwrap();
    let player = Player::new("test", Arc::new(Loopback::new()), Arc::new(library), 0);
    let (handle, session) = Session::spawn(player);

    handle.play(Request::Index(0)).await.unwrap_err();
    let other = handle.clone();
    drop(handle);
    assert!(other.now_playing().await.is_ok());
    drop(other);

    let player = session.await.unwrap();
    assert_eq!(player.state(), PlaybackState::Stopped);
}
