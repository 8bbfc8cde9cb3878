//! Optimistic, fire-and-forget autosave for per-segment vocabulary notes.
//!
//! Every keystroke lands in local state immediately. A save task is then spawned that reads
//! the *current* local text when it sends, so a slow task never persists a stale snapshot.
//! Responses never write back into local text.
//!
//! If an older save settles after a newer one has already been acknowledged, the older
//! write may have clobbered the newer text remotely; the task re-sends the current text
//! once more so the store converges.
//!
//! The "saving" flag goes up when a save starts and comes down `min_saving_display` after
//! the last save of the current display epoch settles. [`NoteAutosave::detach`] (or
//! dropping the queue) starts a new epoch: the flag clears at once and timers from the old
//! epoch stop touching it. In-flight network calls are left to finish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::Result;
use crate::opts::Opts;
use crate::segments::SegmentId;
use crate::store::NoteStore;

/// What the host shows next to the notes field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStatus {
    pub saving: bool,
    /// Last persistence failure, until dismissed.
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct NoteEntry {
    text: String,
    /// Bumped on every local edit. Zero for text that came from the store.
    revision: u64,
    /// Highest revision the store has acknowledged.
    acked: u64,
}

struct Inner {
    notes: HashMap<SegmentId, NoteEntry>,
    epoch: u64,
    in_flight: usize,
    display: CancellationToken,
}

struct Shared {
    inner: Mutex<Inner>,
    status: watch::Sender<SaveStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock; recover rather than propagate poison.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct NoteAutosave {
    store: Arc<dyn NoteStore>,
    shared: Arc<Shared>,
    min_display: Duration,
}

impl NoteAutosave {
    pub fn new(store: Arc<dyn NoteStore>, opts: &Opts) -> Self {
        let (status, _) = watch::channel(SaveStatus::default());
        Self {
            store,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    notes: HashMap::new(),
                    epoch: 0,
                    in_flight: 0,
                    display: CancellationToken::new(),
                }),
                status,
            }),
            min_display: opts.min_saving_display,
        }
    }

    /// Local text for `segment`, if any has been typed or loaded.
    pub fn text(&self, segment: SegmentId) -> Option<String> {
        self.shared.lock().notes.get(&segment).map(|e| e.text.clone())
    }

    pub fn status(&self) -> SaveStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    /// Saves started in the current display epoch that haven't finished their display window.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    pub fn dismiss_error(&self) {
        self.shared.status.send_modify(|s| s.error = None);
    }

    /// Record a keystroke and schedule a save. Must be called within a tokio runtime.
    pub fn edit(&self, segment: SegmentId, text: impl Into<String>) {
        let (epoch, token) = {
            let mut inner = self.shared.lock();
            let entry = inner.notes.entry(segment).or_default();
            entry.text = text.into();
            entry.revision += 1;
            inner.in_flight += 1;
            self.shared.status.send_modify(|s| s.saving = true);
            (inner.epoch, inner.display.clone())
        };

        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.shared);
        let min_display = self.min_display;
        tokio::spawn(async move {
            persist_latest(store.as_ref(), &shared, segment).await;

            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(min_display) => {}
            }

            let mut inner = shared.lock();
            if inner.epoch != epoch {
                return;
            }
            inner.in_flight = inner.in_flight.saturating_sub(1);
            if inner.in_flight == 0 {
                shared.status.send_modify(|s| s.saving = false);
            }
        });
    }

    /// Fetch stored notes and merge them in. Locally typed text always wins.
    pub async fn load(&self, segments: &[SegmentId]) -> Result<()> {
        let loaded = match self.store.load_notes(segments).await {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(error = %err, "loading notes failed");
                self.shared
                    .status
                    .send_modify(|s| s.error = Some(err.to_string()));
                return Err(err);
            }
        };

        let mut inner = self.shared.lock();
        for (segment, text) in loaded {
            let entry = inner.notes.entry(segment).or_default();
            if entry.revision == 0 {
                entry.text = text;
            }
        }
        Ok(())
    }

    /// The host is leaving the editor: clear the saving flag and stop pending display timers.
    pub fn detach(&self) {
        let mut inner = self.shared.lock();
        inner.display.cancel();
        inner.display = CancellationToken::new();
        inner.epoch += 1;
        inner.in_flight = 0;
        // Lowered under the lock so a concurrent `edit` can't raise it in between.
        self.shared.status.send_modify(|s| s.saving = false);
    }
}

impl Drop for NoteAutosave {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Send the current local text, re-sending if a newer save was acknowledged first.
async fn persist_latest(store: &dyn NoteStore, shared: &Shared, segment: SegmentId) {
    loop {
        let Some((text, revision)) = shared
            .lock()
            .notes
            .get(&segment)
            .map(|e| (e.text.clone(), e.revision))
        else {
            return;
        };

        let res = store.save_note(segment, &text).await;

        let mut inner = shared.lock();
        let Some(entry) = inner.notes.get_mut(&segment) else {
            return;
        };

        match res {
            Ok(()) => {
                let overtaken = entry.acked > revision;
                entry.acked = entry.acked.max(revision);
                if !overtaken {
                    return;
                }
                debug!(%segment, revision, "older note save settled last; re-sending");
            }
            Err(err) => {
                if entry.acked >= revision {
                    debug!(%segment, revision, error = %err, "stale note save failed; ignoring");
                    return;
                }
                warn!(%segment, revision, error = %err, "note save failed");
                drop(inner);
                shared
                    .status
                    .send_modify(|s| s.error = Some(err.to_string()));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;

    /// A note store with scripted per-call latency and an optional failure switch.
    #[derive(Default)]
    struct ScriptedStore {
        delays: Mutex<VecDeque<Duration>>,
        fail: Mutex<bool>,
        saved: Mutex<HashMap<SegmentId, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn with_delays(delays_ms: &[u64]) -> Self {
            let store = Self::default();
            *store.delays.lock().unwrap() =
                delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect();
            store
        }

        fn saved(&self, segment: SegmentId) -> Option<String> {
            self.saved.lock().unwrap().get(&segment).cloned()
        }
    }

    #[async_trait]
    impl NoteStore for ScriptedStore {
        async fn save_note(&self, segment: SegmentId, text: &str) -> Result<()> {
            self.calls.lock().unwrap().push(text.to_owned());
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
            if *self.fail.lock().unwrap() {
                return Err(Error::persistence("offline"));
            }
            self.saved.lock().unwrap().insert(segment, text.to_owned());
            Ok(())
        }

        async fn load_notes(&self, segments: &[SegmentId]) -> Result<HashMap<SegmentId, String>> {
            let saved = self.saved.lock().unwrap();
            Ok(segments
                .iter()
                .filter_map(|id| saved.get(id).map(|t| (*id, t.clone())))
                .collect())
        }
    }

    fn opts() -> Opts {
        Opts {
            min_saving_display: Duration::from_millis(500),
            ..Opts::default()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_is_local_immediately_and_flag_outlives_the_save() {
        let store = Arc::new(ScriptedStore::with_delays(&[100]));
        let notes = NoteAutosave::new(store.clone(), &opts());
        let seg = SegmentId::new_v4();

        notes.edit(seg, "la casa");
        assert_eq!(notes.text(seg).as_deref(), Some("la casa"));
        assert!(notes.status().saving);

        // Save settles at 100ms; the flag holds until 600ms.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.saved(seg).as_deref(), Some("la casa"));
        assert!(notes.status().saving);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!notes.status().saving);
        assert_eq!(notes.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_for_older_text_does_not_win() {
        let store = Arc::new(ScriptedStore::with_delays(&[200, 10]));
        let notes = NoteAutosave::new(store.clone(), &opts());
        let seg = SegmentId::new_v4();

        notes.edit(seg, "g");
        tokio::time::sleep(Duration::from_millis(1)).await;
        notes.edit(seg, "gato");
        settle().await;

        assert_eq!(notes.text(seg).as_deref(), Some("gato"));
        assert_eq!(store.saved(seg).as_deref(), Some("gato"));
        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["g", "gato", "gato"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_local_text_and_raises_error() {
        let store = Arc::new(ScriptedStore::default());
        *store.fail.lock().unwrap() = true;
        let notes = NoteAutosave::new(store.clone(), &opts());
        let seg = SegmentId::new_v4();

        notes.edit(seg, "el perro");
        settle().await;

        assert_eq!(notes.text(seg).as_deref(), Some("el perro"));
        let status = notes.status();
        assert!(!status.saving);
        assert_eq!(status.error.as_deref(), Some("persistence failed: offline"));

        notes.dismiss_error();
        assert_eq!(notes.status(), SaveStatus::default());
    }

    #[tokio::test(start_paused = true)]
    async fn detach_clears_flag_without_aborting_the_save() {
        let store = Arc::new(ScriptedStore::with_delays(&[100]));
        let notes = NoteAutosave::new(store.clone(), &opts());
        let mut status_rx = notes.subscribe();
        let seg = SegmentId::new_v4();

        notes.edit(seg, "adios");
        assert!(status_rx.borrow_and_update().saving);

        notes.detach();
        assert!(!notes.status().saving);
        assert_eq!(notes.in_flight(), 0);

        settle().await;
        assert_eq!(store.saved(seg).as_deref(), Some("adios"));
        assert!(!notes.status().saving);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_queue_mid_save_clears_the_flag() {
        let store = Arc::new(ScriptedStore::with_delays(&[100]));
        let notes = NoteAutosave::new(store.clone(), &opts());
        let status_rx = notes.subscribe();
        let seg = SegmentId::new_v4();

        notes.edit(seg, "hasta luego");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(status_rx.borrow().saving);

        drop(notes);
        assert!(!status_rx.borrow().saving);

        settle().await;
        assert_eq!(store.saved(seg).as_deref(), Some("hasta luego"));
        assert!(!status_rx.borrow().saving);
    }

    #[tokio::test(start_paused = true)]
    async fn load_does_not_clobber_locally_typed_notes() -> anyhow::Result<()> {
        let store = Arc::new(ScriptedStore::default());
        let typed = SegmentId::new_v4();
        let untouched = SegmentId::new_v4();
        store.saved.lock().unwrap().insert(typed, "old".to_owned());
        store.saved.lock().unwrap().insert(untouched, "stored".to_owned());

        let notes = NoteAutosave::new(store.clone(), &opts());
        *store.delays.lock().unwrap() = VecDeque::from([Duration::from_millis(50)]);
        notes.edit(typed, "new");
        notes.load(&[typed, untouched]).await?;

        assert_eq!(notes.text(typed).as_deref(), Some("new"));
        assert_eq!(notes.text(untouched).as_deref(), Some("stored"));
        Ok(())
    }
}
