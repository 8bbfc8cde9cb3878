//! Authoring-time segment list with a single composer slot.
//!
//! Every element carries a stable [`DraftId`]. The element under edit is tracked by id and
//! its index is derived on demand, so removing or inserting elsewhere can never point an
//! in-progress edit at the wrong sentence.
//!
//! All mutating operations either succeed completely or leave the store untouched.

use std::fmt;

use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::segments::{DraftSegment, Segment};

/// Stable identity of an element in a [`DraftStore`]. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DraftId(Uuid);

impl DraftId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the composer slot currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposerMode {
    /// A fresh draft with chained default times; nothing typed yet.
    #[default]
    Idle,
    /// A new segment being typed, to be appended.
    Composing,
    /// A copy of an existing element, to be written back in place.
    Editing(DraftId),
}

#[derive(Debug, Clone)]
struct Entry {
    id: DraftId,
    draft: DraftSegment,
}

/// One row of the authoring list as a host displays it.
#[derive(Debug, Clone, Copy)]
pub struct DraftRow<'a> {
    pub index: usize,
    pub id: DraftId,
    pub draft: &'a DraftSegment,
    /// This element is loaded into the composer; hosts show it as "being edited".
    pub editing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    entries: Vec<Entry>,
    composer: DraftSegment,
    mode: ComposerMode,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a committed list for re-authoring.
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut store = Self {
            entries: segments
                .iter()
                .map(|seg| Entry {
                    id: DraftId::new(),
                    draft: DraftSegment::from(seg),
                })
                .collect(),
            ..Self::default()
        };
        store.composer = store.chained_default();
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DraftSegment> {
        self.entries.get(index).map(|e| &e.draft)
    }

    pub fn id_at(&self, index: usize) -> Option<DraftId> {
        self.entries.get(index).map(|e| e.id)
    }

    pub fn index_of(&self, id: DraftId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn composer(&self) -> &DraftSegment {
        &self.composer
    }

    pub fn mode(&self) -> ComposerMode {
        self.mode
    }

    /// Current position of the element under edit.
    pub fn editing_index(&self) -> Option<usize> {
        match self.mode {
            ComposerMode::Editing(id) => self.index_of(id),
            _ => None,
        }
    }

    pub fn rows(&self) -> Vec<DraftRow<'_>> {
        let editing = match self.mode {
            ComposerMode::Editing(id) => Some(id),
            _ => None,
        };
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| DraftRow {
                index,
                id: e.id,
                draft: &e.draft,
                editing: editing == Some(e.id),
            })
            .collect()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.composer.text = text.into();
        self.touch();
    }

    /// Blank input clears the translation.
    pub fn set_translation(&mut self, translation: impl Into<String>) {
        let translation = translation.into();
        self.composer.translation = (!translation.is_empty()).then_some(translation);
        self.touch();
    }

    pub fn set_start(&mut self, start_time: f64) {
        self.composer.start_time = start_time;
        self.touch();
    }

    pub fn set_end(&mut self, end_time: f64) {
        self.composer.end_time = end_time;
        self.touch();
    }

    /// Validate `candidate` and either append it or write it over the element under edit.
    ///
    /// On success the composer resets to a fresh draft chained onto the last element, and
    /// the id of the written element is returned. On failure nothing changes.
    pub fn add_or_update_composer(
        &mut self,
        candidate: DraftSegment,
    ) -> Result<DraftId, ValidationError> {
        candidate.validate()?;

        let editing = match self.mode {
            ComposerMode::Editing(id) => self.index_of(id).map(|idx| (idx, id)),
            _ => None,
        };

        let id = match editing {
            Some((idx, id)) => {
                debug!(index = idx, "draft segment updated in place");
                self.entries[idx].draft = candidate;
                id
            }
            None => {
                let id = DraftId::new();
                debug!(index = self.entries.len(), "draft segment appended");
                self.entries.push(Entry {
                    id,
                    draft: candidate,
                });
                id
            }
        };

        self.reset_composer();
        Ok(id)
    }

    /// Fold whatever is currently in the composer into the list.
    pub fn commit_composer(&mut self) -> Result<DraftId, ValidationError> {
        self.add_or_update_composer(self.composer.clone())
    }

    /// Load element `index` into the composer for editing.
    ///
    /// Re-selecting the element already under edit is a no-op, so keystrokes survive.
    /// Selecting another element cancels the current edit first. An out-of-range index
    /// cancels any edit and returns `None`.
    pub fn begin_edit(&mut self, index: usize) -> Option<DraftId> {
        let Some(entry) = self.entries.get(index) else {
            debug!(index, len = self.entries.len(), "edit target out of range");
            self.cancel_edit();
            return None;
        };
        let id = entry.id;

        if self.mode == ComposerMode::Editing(id) {
            return Some(id);
        }

        self.cancel_edit();
        debug!(index, "editing draft segment");
        self.composer = self.entries[index].draft.clone();
        self.mode = ComposerMode::Editing(id);
        Some(id)
    }

    /// Abandon the edit in progress. Returns `false` when nothing was being edited.
    pub fn cancel_edit(&mut self) -> bool {
        if !matches!(self.mode, ComposerMode::Editing(_)) {
            return false;
        }
        debug!("edit cancelled");
        self.reset_composer();
        true
    }

    /// Discard the composer, whatever mode it is in.
    pub fn reset_composer(&mut self) {
        self.composer = self.chained_default();
        self.mode = ComposerMode::Idle;
    }

    /// Delete element `index`, cancelling the edit if it was the one being edited.
    pub fn remove(&mut self, index: usize) -> Option<DraftSegment> {
        if index >= self.entries.len() {
            debug!(index, len = self.entries.len(), "remove target out of range");
            return None;
        }

        if self.mode == ComposerMode::Editing(self.entries[index].id) {
            self.cancel_edit();
        }

        let removed = self.entries.remove(index);
        if self.mode == ComposerMode::Idle {
            // The last element may have changed; keep the untouched composer chained to it.
            self.composer = self.chained_default();
        }
        Some(removed.draft)
    }

    /// The composer holds a valid segment that is not yet in the list (or not yet written back).
    pub fn has_unsaved_composer(&self) -> bool {
        self.composer.is_valid()
    }

    /// Flatten to the committed shape, assigning `order` from final position.
    pub fn to_committed_list(&self) -> Vec<Segment> {
        self.entries
            .iter()
            .enumerate()
            .map(|(order, e)| e.draft.to_segment(order))
            .collect()
    }

    fn chained_default(&self) -> DraftSegment {
        let at = self.entries.last().map_or(0.0, |e| e.draft.end_time);
        DraftSegment::chained_at(at)
    }

    fn touch(&mut self) {
        if self.mode == ComposerMode::Idle {
            self.mode = ComposerMode::Composing;
        }
    }
}
