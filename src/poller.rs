//! Playback polling.
//!
//! Two loops keep the [`DisplayState`] in sync with Spotify:
//!
//! - the cover loop (2s by default) fetches the currently playing item and,
//!   only when its id differs from the last committed one, fetches the queue
//!   and publishes the new covers;
//! - the track loop (5s by default) refreshes title and artist.
//!
//! The loops are not coordinated. They write disjoint fields through one
//! `watch` sender, so every change is a single atomic transition. Errors
//! degrade to stale data: the display keeps its last good values, the error
//! lands in `cover_error` or `track_error` depending on the loop, and the
//! next tick tries again without backoff. Each loop only clears its own
//! error.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config, debug,
    error::{Error, Result},
    spotify::player::PlayerApi,
    store::{self, SessionStore},
    types::{DisplayState, PlayableItem, PollerPhase},
};

/// Number of upcoming covers shown next to the playing one.
pub const UPCOMING_COVERS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub covers: Duration,
    pub track: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            covers: Duration::from_millis(config::DEFAULT_COVER_INTERVAL_MS),
            track: Duration::from_millis(config::DEFAULT_TRACK_INTERVAL_MS),
        }
    }
}

impl PollIntervals {
    pub fn from_env() -> Self {
        Self {
            covers: config::cover_interval(),
            track: config::track_interval(),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No access token in the store.
    Idle,
    NothingPlaying,
    /// Same item as before, nothing fetched beyond currently-playing.
    Unchanged,
    Updated,
    Failed,
    /// The poller was stopped, the result was discarded.
    Cancelled,
}

enum CoverTick {
    NothingPlaying,
    Unchanged,
    Changed {
        track_id: String,
        covers: Vec<Option<String>>,
    },
}

#[derive(Debug, Clone, Copy)]
enum PollLoop {
    Covers,
    Track,
}

pub struct PlaybackPoller {
    api: Arc<dyn PlayerApi>,
    store: Arc<dyn SessionStore>,
    intervals: PollIntervals,
    state: watch::Sender<DisplayState>,
    cancel: CancellationToken,
}

impl PlaybackPoller {
    pub fn new(
        api: Arc<dyn PlayerApi>,
        store: Arc<dyn SessionStore>,
        intervals: PollIntervals,
    ) -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        Self {
            api,
            store,
            intervals,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Spawns both loops. The first tick of each runs immediately.
    ///
    /// A poller is single use: once the returned handle is stopped, ticks
    /// become no-ops and `start` must not be called again.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let covers = tokio::spawn(Arc::clone(self).run_covers());
        let track = tokio::spawn(Arc::clone(self).run_track());
        PollerHandle {
            cancel: self.cancel.clone(),
            tasks: vec![covers, track],
        }
    }

    async fn run_covers(self: Arc<Self>) {
        let mut ticker = interval(self.intervals.covers);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = self.poll_covers_once() => {
                    debug!("cover tick: {:?}", outcome);
                }
            }
        }
        debug!("cover loop stopped");
    }

    async fn run_track(self: Arc<Self>) {
        let mut ticker = interval(self.intervals.track);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                outcome = self.poll_track_once() => {
                    debug!("track tick: {:?}", outcome);
                }
            }
        }
        debug!("track loop stopped");
    }

    /// Runs one tick of the cover loop.
    pub async fn poll_covers_once(&self) -> TickOutcome {
        let token = match self.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => return self.enter_idle(),
            Err(e) => return self.record_error(PollLoop::Covers, e),
        };
        self.enter_polling();

        match self.fetch_covers(&token).await {
            Ok(CoverTick::NothingPlaying) => {
                self.settle(PollLoop::Covers, TickOutcome::NothingPlaying)
            }
            Ok(CoverTick::Unchanged) => self.settle(PollLoop::Covers, TickOutcome::Unchanged),
            Ok(CoverTick::Changed { track_id, covers }) => self.commit_covers(track_id, covers),
            Err(e) => self.record_error(PollLoop::Covers, e),
        }
    }

    /// Runs one tick of the track loop.
    pub async fn poll_track_once(&self) -> TickOutcome {
        let token = match self.access_token() {
            Ok(Some(token)) => token,
            Ok(None) => return self.enter_idle(),
            Err(e) => return self.record_error(PollLoop::Track, e),
        };
        self.enter_polling();

        match self.api.currently_playing(&token).await {
            Ok(Some(item)) => {
                let title = Some(item.name.clone()).filter(|t| !t.is_empty());
                let artist = item.first_artist().map(String::from);
                self.commit_track(title, artist)
            }
            Ok(None) => self.settle(PollLoop::Track, TickOutcome::NothingPlaying),
            Err(e) => self.record_error(PollLoop::Track, e),
        }
    }

    fn access_token(&self) -> Result<Option<String>> {
        store::load_access_token(self.store.as_ref())
    }

    async fn fetch_covers(&self, token: &str) -> Result<CoverTick> {
        let Some(item) = self.api.currently_playing(token).await? else {
            return Ok(CoverTick::NothingPlaying);
        };
        // Local files have no Spotify id.
        let Some(track_id) = item.id.clone() else {
            return Ok(CoverTick::NothingPlaying);
        };

        let last_seen = self.state.borrow().track_id.clone();
        if last_seen.as_deref() == Some(track_id.as_str()) {
            return Ok(CoverTick::Unchanged);
        }

        let queue = self.api.queue(token).await?;
        for (idx, next) in queue.iter().enumerate() {
            debug!("queue position {}: {} ({:?})", idx + 1, next.name, next.id);
        }

        Ok(CoverTick::Changed {
            track_id,
            covers: queue_snapshot(&item, &queue),
        })
    }

    fn commit_covers(&self, track_id: String, covers: Vec<Option<String>>) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Cancelled;
        }
        let changed = self.state.send_if_modified(|state| {
            // A stale result for an identity that is already committed.
            if state.track_id.as_deref() == Some(track_id.as_str()) {
                return false;
            }
            state.phase = PollerPhase::Polling;
            state.track_id = Some(track_id);
            state.covers = covers;
            state.cover_error = None;
            touch(state);
            true
        });

        if changed {
            TickOutcome::Updated
        } else {
            self.settle(PollLoop::Covers, TickOutcome::Unchanged)
        }
    }

    fn commit_track(&self, title: Option<String>, artist: Option<String>) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Cancelled;
        }
        let changed = self.state.send_if_modified(|state| {
            let mut changed = false;
            if title.is_some() && state.title != title {
                state.title = title;
                changed = true;
            }
            if artist.is_some() && state.artist != artist {
                state.artist = artist;
                changed = true;
            }
            if state.track_error.take().is_some() {
                changed = true;
            }
            if changed {
                touch(state);
            }
            changed
        });

        if changed {
            TickOutcome::Updated
        } else {
            TickOutcome::Unchanged
        }
    }

    /// A good tick that changed nothing visible still clears that loop's
    /// error. The other loop's error is left alone.
    fn settle(&self, source: PollLoop, outcome: TickOutcome) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Cancelled;
        }
        self.state.send_if_modified(|state| {
            if error_slot(state, source).take().is_none() {
                return false;
            }
            touch(state);
            true
        });
        outcome
    }

    fn enter_idle(&self) -> TickOutcome {
        self.set_phase(PollerPhase::Idle);
        TickOutcome::Idle
    }

    fn enter_polling(&self) {
        self.set_phase(PollerPhase::Polling);
    }

    fn set_phase(&self, phase: PollerPhase) {
        if self.is_stopped() {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.phase == phase {
                return false;
            }
            state.phase = phase;
            touch(state);
            true
        });
    }

    fn record_error(&self, source: PollLoop, err: Error) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Cancelled;
        }
        debug!("{:?} poll failed, keeping last state: {}", source, err);
        let message = err.to_string();
        self.state.send_if_modified(|state| {
            let slot = error_slot(state, source);
            if slot.as_deref() == Some(message.as_str()) {
                return false;
            }
            *slot = Some(message);
            touch(state);
            true
        });
        TickOutcome::Failed
    }
}

fn error_slot(state: &mut DisplayState, source: PollLoop) -> &mut Option<String> {
    match source {
        PollLoop::Covers => &mut state.cover_error,
        PollLoop::Track => &mut state.track_error,
    }
}

fn touch(state: &mut DisplayState) {
    state.revision += 1;
    state.updated_at = Some(Utc::now());
}

/// Cover slots for `current` and the next [`UPCOMING_COVERS`] queue
/// entries, in that order. An entry without artwork keeps its slot as
/// `None`, so the first slot always belongs to the playing item.
pub fn queue_snapshot(current: &PlayableItem, queue: &[PlayableItem]) -> Vec<Option<String>> {
    std::iter::once(current)
        .chain(queue.iter().take(UPCOMING_COVERS))
        .map(|item| item.cover_url().map(String::from))
        .collect()
}

/// Owns the running loops.
///
/// Dropping the handle cancels the loops as well, but only [`stop`]
/// guarantees they have finished.
///
/// [`stop`]: PollerHandle::stop
pub struct PollerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancels both loops and waits for them. In-flight requests are
    /// dropped, so no state changes happen once this returns.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
