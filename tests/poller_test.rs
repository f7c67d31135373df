use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use queuecard::{
    error::{Error, Result},
    poller::{PlaybackPoller, PollIntervals, TickOutcome, queue_snapshot},
    spotify::player::PlayerApi,
    store::{self, FileStore, MemoryStore, SessionStore},
    types::{PlayableItem, PollerPhase},
};
use serde_json::json;
use tempfile::tempdir;
use tokio::{sync::Notify, time::timeout};

#[derive(Clone)]
enum Playing {
    Item(PlayableItem),
    Nothing,
    Fail(u16),
}

/// Scripted player with call counters.
struct FakePlayer {
    playing: Mutex<Playing>,
    queue: Mutex<std::result::Result<Vec<PlayableItem>, u16>>,
    gate: Mutex<Option<Arc<Notify>>>,
    queue_entered: Notify,
    current_calls: AtomicUsize,
    queue_calls: AtomicUsize,
}

impl FakePlayer {
    fn new() -> Self {
        Self {
            playing: Mutex::new(Playing::Nothing),
            queue: Mutex::new(Ok(Vec::new())),
            gate: Mutex::new(None),
            queue_entered: Notify::new(),
            current_calls: AtomicUsize::new(0),
            queue_calls: AtomicUsize::new(0),
        }
    }

    fn play(&self, item: PlayableItem) {
        *self.playing.lock().unwrap() = Playing::Item(item);
    }

    fn set_playing(&self, playing: Playing) {
        *self.playing.lock().unwrap() = playing;
    }

    fn set_queue(&self, queue: std::result::Result<Vec<PlayableItem>, u16>) {
        *self.queue.lock().unwrap() = queue;
    }

    fn queue_calls(&self) -> usize {
        self.queue_calls.load(Ordering::SeqCst)
    }
}

fn api_error(status: u16) -> Error {
    Error::NetworkOrApi {
        status: Some(status),
        message: format!("answered {}", status),
    }
}

#[async_trait]
impl PlayerApi for FakePlayer {
    async fn currently_playing(&self, _access_token: &str) -> Result<Option<PlayableItem>> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        match self.playing.lock().unwrap().clone() {
            Playing::Item(item) => Ok(Some(item)),
            Playing::Nothing => Ok(None),
            Playing::Fail(status) => Err(api_error(status)),
        }
    }

    async fn queue(&self, _access_token: &str) -> Result<Vec<PlayableItem>> {
        self.queue_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        self.queue_entered.notify_one();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.queue.lock().unwrap().clone().map_err(api_error)
    }
}

fn item(id: &str, cover: Option<&str>) -> PlayableItem {
    let album = cover.map(|url| json!({ "images": [{ "url": url }] }));
    serde_json::from_value(json!({
        "id": id,
        "name": format!("Title {}", id),
        "artists": [{ "name": format!("Artist {}", id) }],
        "album": album,
    }))
    .unwrap()
}

fn logged_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(store::ACCESS_TOKEN_KEY, "token-1").unwrap();
    store
}

fn poller(api: &Arc<FakePlayer>, store: &Arc<MemoryStore>) -> Arc<PlaybackPoller> {
    Arc::new(PlaybackPoller::new(
        api.clone(),
        store.clone(),
        PollIntervals::default(),
    ))
}

fn slots(urls: &[Option<&str>]) -> Vec<Option<String>> {
    urls.iter().map(|url| url.map(String::from)).collect()
}

fn queue_of(ids: &[(&str, &str)]) -> Vec<PlayableItem> {
    ids.iter().map(|&(id, cover)| item(id, Some(cover))).collect()
}

#[tokio::test]
async fn test_idle_without_token() {
    let api = Arc::new(FakePlayer::new());
    let store = Arc::new(MemoryStore::new());
    let poller = poller(&api, &store);

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Idle);
    assert_eq!(poller.poll_track_once().await, TickOutcome::Idle);

    let state = poller.snapshot();
    assert_eq!(state.phase, PollerPhase::Idle);
    assert!(state.covers.is_empty());
    assert_eq!(api.current_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_covers_are_current_plus_next_two() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1"), ("t2", "u2"), ("t3", "u3")])));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);

    let state = poller.snapshot();
    assert_eq!(state.phase, PollerPhase::Polling);
    assert_eq!(state.track_id.as_deref(), Some("t0"));
    assert_eq!(state.covers, slots(&[Some("u0"), Some("u1"), Some("u2")]));
    assert!(state.last_error().is_none());
    assert!(state.updated_at.is_some());
}

#[tokio::test]
async fn test_same_item_fetches_queue_once() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1"), ("t2", "u2")])));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    let first = poller.snapshot();

    for _ in 0..5 {
        assert_eq!(poller.poll_covers_once().await, TickOutcome::Unchanged);
    }

    assert_eq!(api.queue_calls(), 1);
    assert_eq!(api.current_calls.load(Ordering::SeqCst), 6);
    assert_eq!(poller.snapshot(), first);
}

#[tokio::test]
async fn test_queue_fetched_once_per_change() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);
    api.set_queue(Ok(queue_of(&[("q1", "c1"), ("q2", "c2")])));

    for id in ["t0", "t0", "t1", "t1", "t1", "t2", "t0"] {
        api.play(item(id, Some(format!("cover-{}", id).as_str())));
        poller.poll_covers_once().await;
    }

    assert_eq!(api.queue_calls(), 4);
    let state = poller.snapshot();
    assert_eq!(state.track_id.as_deref(), Some("t0"));
    assert_eq!(state.covers, slots(&[Some("cover-t0"), Some("c1"), Some("c2")]));
}

#[tokio::test]
async fn test_missing_cover_keeps_its_slot() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", None));
    api.set_queue(Ok(vec![item("t1", Some("u1")), item("t2", Some("u2"))]));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    // The next track's cover must not move into the now-playing slot
    assert_eq!(
        poller.snapshot().covers,
        slots(&[None, Some("u1"), Some("u2")])
    );
}

#[tokio::test]
async fn test_nothing_playing_keeps_state() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    poller.poll_covers_once().await;
    let before = poller.snapshot();

    api.set_playing(Playing::Nothing);
    assert_eq!(poller.poll_covers_once().await, TickOutcome::NothingPlaying);
    assert_eq!(poller.snapshot(), before);
}

#[tokio::test]
async fn test_error_keeps_last_good_state() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1"), ("t2", "u2")])));
    poller.poll_covers_once().await;

    api.set_playing(Playing::Fail(503));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Failed);

    let state = poller.snapshot();
    assert_eq!(state.track_id.as_deref(), Some("t0"));
    assert_eq!(state.covers, slots(&[Some("u0"), Some("u1"), Some("u2")]));
    assert!(state.cover_error.is_some());
    assert_eq!(state.last_error(), state.cover_error.as_deref());

    // The next tick recovers without any backoff
    api.play(item("t1", Some("u1")));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    let state = poller.snapshot();
    assert_eq!(state.track_id.as_deref(), Some("t1"));
    assert!(state.cover_error.is_none());
    assert!(state.last_error().is_none());
}

#[tokio::test]
async fn test_failed_queue_fetch_is_retried() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    api.set_queue(Err(500));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Failed);
    assert!(poller.snapshot().track_id.is_none());
    assert!(poller.snapshot().covers.is_empty());

    api.set_queue(Ok(queue_of(&[("t1", "u1")])));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    assert_eq!(api.queue_calls(), 2);
    assert_eq!(poller.snapshot().covers, slots(&[Some("u0"), Some("u1")]));
}

#[tokio::test]
async fn test_track_tick_updates_title_and_artist() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    assert_eq!(poller.poll_track_once().await, TickOutcome::Updated);
    let state = poller.snapshot();
    assert_eq!(state.title.as_deref(), Some("Title t0"));
    assert_eq!(state.artist.as_deref(), Some("Artist t0"));
    // Covers belong to the other loop
    assert!(state.covers.is_empty());
    assert_eq!(api.queue_calls(), 0);

    assert_eq!(poller.poll_track_once().await, TickOutcome::Unchanged);
}

#[tokio::test]
async fn test_revision_only_moves_on_change() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    poller.poll_covers_once().await;
    let revision = poller.snapshot().revision;

    poller.poll_covers_once().await;
    poller.poll_covers_once().await;
    assert_eq!(poller.snapshot().revision, revision);

    api.play(item("t1", Some("u1")));
    poller.poll_covers_once().await;
    assert!(poller.snapshot().revision > revision);
}

#[tokio::test]
async fn test_no_updates_after_stop() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = Arc::new(PlaybackPoller::new(
        api.clone(),
        store.clone(),
        PollIntervals {
            covers: Duration::from_millis(10),
            track: Duration::from_millis(10),
        },
    ));

    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1")])));

    let mut rx = poller.subscribe();
    let handle = poller.start();
    timeout(
        Duration::from_secs(5),
        rx.wait_for(|state| state.track_id.is_some() && state.title.is_some()),
    )
    .await
    .unwrap()
    .unwrap();

    handle.stop().await;
    assert!(poller.is_stopped());
    let stopped = poller.snapshot();

    api.play(item("t9", Some("u9")));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(poller.snapshot(), stopped);

    // Manual ticks after stop are discarded too
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Cancelled);
    assert_eq!(poller.poll_track_once().await, TickOutcome::Cancelled);
    assert_eq!(poller.snapshot(), stopped);
}

#[tokio::test]
async fn test_in_flight_request_is_discarded_on_stop() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = Arc::new(PlaybackPoller::new(
        api.clone(),
        store.clone(),
        PollIntervals {
            covers: Duration::from_millis(10),
            track: Duration::from_secs(3600),
        },
    ));

    let gate = Arc::new(Notify::new());
    *api.gate.lock().unwrap() = Some(gate.clone());
    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1")])));

    let handle = poller.start();
    timeout(Duration::from_secs(5), api.queue_entered.notified())
        .await
        .unwrap();

    handle.stop().await;
    let stopped = poller.snapshot();

    // Let the blocked queue request finish; nobody is left to commit it
    gate.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = poller.snapshot();
    assert_eq!(state, stopped);
    assert!(state.track_id.is_none());
    assert!(state.covers.is_empty());
}

#[test]
fn test_queue_snapshot_short_queue() {
    let current = item("t0", Some("u0"));
    assert_eq!(queue_snapshot(&current, &[]), slots(&[Some("u0")]));

    let queue = queue_of(&[("t1", "u1")]);
    assert_eq!(queue_snapshot(&current, &queue), slots(&[Some("u0"), Some("u1")]));

    let queue = vec![item("t1", None), item("t2", Some("u2")), item("t3", Some("u3"))];
    assert_eq!(
        queue_snapshot(&current, &queue),
        slots(&[Some("u0"), None, Some("u2")])
    );

    let bare = item("t0", None);
    assert_eq!(
        queue_snapshot(&bare, &queue_of(&[("t1", "u1"), ("t2", "u2")])),
        slots(&[None, Some("u1"), Some("u2")])
    );
}

#[tokio::test]
async fn test_token_appearing_moves_idle_to_polling() {
    let api = Arc::new(FakePlayer::new());
    let store = Arc::new(MemoryStore::new());
    let poller = poller(&api, &store);
    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1")])));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Idle);
    assert_eq!(poller.snapshot().phase, PollerPhase::Idle);

    store.set(store::ACCESS_TOKEN_KEY, "token-1").unwrap();

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    let state = poller.snapshot();
    assert_eq!(state.phase, PollerPhase::Polling);
    assert_eq!(state.covers, slots(&[Some("u0"), Some("u1")]));
    assert_eq!(api.queue_calls(), 1);

    // Logging out again goes back to idle without touching the display
    store.remove(store::ACCESS_TOKEN_KEY).unwrap();
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Idle);
    assert_eq!(poller.snapshot().phase, PollerPhase::Idle);
    assert_eq!(poller.snapshot().covers, state.covers);
}

#[tokio::test]
async fn test_token_stored_by_another_process_is_picked_up() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");

    // The watching process opens the store before any login happened
    let watch_store = Arc::new(FileStore::open(path.clone()).await.unwrap());
    let api = Arc::new(FakePlayer::new());
    let poller = Arc::new(PlaybackPoller::new(
        api.clone(),
        watch_store.clone(),
        PollIntervals::default(),
    ));
    api.play(item("t0", Some("u0")));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Idle);

    // `queuecard login` runs elsewhere with its own handle on the file
    let login_store = FileStore::open(path).await.unwrap();
    login_store
        .set(store::ACCESS_TOKEN_KEY, "token-1")
        .unwrap();

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    assert_eq!(poller.snapshot().phase, PollerPhase::Polling);
    assert_eq!(poller.snapshot().track_id.as_deref(), Some("t0"));
}

#[tokio::test]
async fn test_loops_keep_their_own_errors() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    api.set_queue(Err(502));

    assert_eq!(poller.poll_covers_once().await, TickOutcome::Failed);
    // A good track tick must not hide the failing queue fetch
    assert_eq!(poller.poll_track_once().await, TickOutcome::Updated);

    let state = poller.snapshot();
    assert!(state.cover_error.is_some());
    assert!(state.track_error.is_none());
    assert_eq!(state.last_error(), state.cover_error.as_deref());

    // Track failures land in their own slot and are cleared by the track loop
    api.set_playing(Playing::Fail(500));
    assert_eq!(poller.poll_track_once().await, TickOutcome::Failed);
    assert!(poller.snapshot().track_error.is_some());

    api.play(item("t0", Some("u0")));
    api.set_queue(Ok(queue_of(&[("t1", "u1")])));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Updated);
    let state = poller.snapshot();
    assert!(state.cover_error.is_none());
    assert!(state.track_error.is_some());

    assert_eq!(poller.poll_track_once().await, TickOutcome::Updated);
    assert!(poller.snapshot().last_error().is_none());
}

#[tokio::test]
async fn test_unchanged_tick_clears_cover_error() {
    let api = Arc::new(FakePlayer::new());
    let store = logged_in_store();
    let poller = poller(&api, &store);

    api.play(item("t0", Some("u0")));
    poller.poll_covers_once().await;

    api.set_playing(Playing::Fail(503));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Failed);

    api.play(item("t0", Some("u0")));
    assert_eq!(poller.poll_covers_once().await, TickOutcome::Unchanged);
    assert!(poller.snapshot().cover_error.is_none());
    assert_eq!(api.queue_calls(), 1);
}
