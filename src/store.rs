//! Persistence collaborators.
//!
//! The engine never talks to storage directly. Hosts inject implementations of these
//! traits; [`MemoryStore`] is a complete in-process implementation used by tests and the CLI.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;
use crate::error::Error;
use crate::segments::{AudioPayload, AudioRef, Segment, SegmentId, TrainingItem};

/// The single user every note belongs to.
pub const DEFAULT_USER_ID: &str = "default";

/// Per-segment vocabulary notes.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Upsert the note for `segment`.
    async fn save_note(&self, segment: SegmentId, text: &str) -> Result<()>;

    /// Fetch the notes that exist for `segments`. Segments without a note are absent.
    async fn load_notes(&self, segments: &[SegmentId]) -> Result<HashMap<SegmentId, String>>;
}

/// Everything needed to create or re-author a training item.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    /// `Some` replaces the segments of an existing item; `None` creates a new one.
    pub item_id: Option<Uuid>,
    pub title: String,
    /// Ordered, with `order` already assigned from position.
    pub segments: Vec<Segment>,
    /// New audio, if the user uploaded one with this submit.
    pub audio: Option<AudioPayload>,
}

#[async_trait]
pub trait TrainingStore: Send + Sync {
    /// Persist the request. Segments are replaced wholesale, never patched.
    async fn commit(&self, request: CommitRequest) -> Result<TrainingItem>;

    async fn load(&self, item_id: Uuid) -> Result<Option<TrainingItem>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<Uuid, TrainingItem>,
    notes: HashMap<(SegmentId, String), String>,
}

/// In-process implementation of both collaborators.
#[derive(Debug)]
pub struct MemoryStore {
    user_id: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::for_user(DEFAULT_USER_ID)
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::persistence("memory store lock poisoned"))
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn save_note(&self, segment: SegmentId, text: &str) -> Result<()> {
        let mut state = self.lock()?;
        state
            .notes
            .insert((segment, self.user_id.clone()), text.to_owned());
        Ok(())
    }

    async fn load_notes(&self, segments: &[SegmentId]) -> Result<HashMap<SegmentId, String>> {
        let state = self.lock()?;
        Ok(segments
            .iter()
            .filter_map(|id| {
                state
                    .notes
                    .get(&(*id, self.user_id.clone()))
                    .map(|text| (*id, text.clone()))
            })
            .collect())
    }
}

#[async_trait]
impl TrainingStore for MemoryStore {
    async fn commit(&self, request: CommitRequest) -> Result<TrainingItem> {
        let mut state = self.lock()?;

        let (id, previous_audio) = match request.item_id {
            Some(id) => {
                let existing = state
                    .items
                    .get(&id)
                    .ok_or_else(|| Error::persistence(format!("training item {id} not found")))?;
                (id, existing.audio.clone())
            }
            None => (Uuid::new_v4(), None),
        };

        let audio = match request.audio {
            Some(payload) => Some(AudioRef {
                url: format!("memory://{id}/{}", payload.file_name),
            }),
            None => previous_audio,
        };

        let segments = request
            .segments
            .into_iter()
            .enumerate()
            .map(|(order, seg)| Segment {
                id: Some(SegmentId::new_v4()),
                order,
                ..seg
            })
            .collect();

        let item = TrainingItem {
            id,
            title: request.title,
            audio,
            segments,
        };
        state.items.insert(id, item.clone());
        Ok(item)
    }

    async fn load(&self, item_id: Uuid) -> Result<Option<TrainingItem>> {
        Ok(self.lock()?.items.get(&item_id).cloned())
    }
}
