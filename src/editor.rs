//! Authoring session: a titled draft that submits as one batch.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::Result;
use crate::draft::DraftStore;
use crate::error::ValidationError;
use crate::segments::{AudioPayload, TrainingItem};
use crate::store::{CommitRequest, TrainingStore};

/// What to do with a valid composer that hasn't been added yet when the user submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPolicy {
    /// Add (or write back) the composer before flattening.
    FoldComposer,
    /// Submit the list as is.
    DiscardComposer,
    /// Refuse to submit; the host should warn the user first.
    RejectUnsaved,
}

/// Outcome of [`EditorSession::submit`] when nothing went wrong with I/O.
#[derive(Debug)]
pub enum SubmitOutcome {
    Committed(TrainingItem),
    /// `RejectUnsaved` was requested and the composer holds an unsaved segment.
    UnsavedComposer,
}

#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    item_id: Option<Uuid>,
    pub title: String,
    pub audio: Option<AudioPayload>,
    pub draft: DraftStore,
}

impl EditorSession {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Re-author an existing item. Its segments are loaded into the draft store.
    pub fn from_item(item: &TrainingItem) -> Self {
        Self {
            item_id: Some(item.id),
            title: item.title.clone(),
            audio: None,
            draft: DraftStore::from_segments(&item.segments),
        }
    }

    pub fn item_id(&self) -> Option<Uuid> {
        self.item_id
    }

    /// Build the commit request without touching any state.
    fn request(&self, policy: SubmitPolicy) -> Result<CommitRequest> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let segments = if policy == SubmitPolicy::FoldComposer && self.draft.has_unsaved_composer() {
            let mut folded = self.draft.clone();
            folded.commit_composer()?;
            folded.to_committed_list()
        } else {
            self.draft.to_committed_list()
        };

        if segments.is_empty() {
            return Err(ValidationError::NoSegments.into());
        }

        Ok(CommitRequest {
            item_id: self.item_id,
            title: title.to_owned(),
            segments,
            audio: self.audio.clone(),
        })
    }

    /// Validate, flatten and hand the draft to `store`.
    ///
    /// On success the session is rebased on the persisted item (fresh draft ids, composer
    /// reset, audio payload consumed). On any failure the session is left exactly as it was.
    pub async fn submit(
        &mut self,
        store: &dyn TrainingStore,
        policy: SubmitPolicy,
    ) -> Result<SubmitOutcome> {
        if policy == SubmitPolicy::RejectUnsaved && self.draft.has_unsaved_composer() {
            return Ok(SubmitOutcome::UnsavedComposer);
        }

        let request = self.request(policy)?;
        debug!(
            item_id = ?request.item_id,
            segments = request.segments.len(),
            with_audio = request.audio.is_some(),
            "submitting training item"
        );

        let item = match store.commit(request).await {
            Ok(item) => item,
            Err(err) => {
                warn!(error = %err, "training item commit failed");
                return Err(err);
            }
        };

        *self = Self::from_item(&item);
        Ok(SubmitOutcome::Committed(item))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::Error;
    use crate::segments::DraftSegment;
    use crate::store::MemoryStore;

    struct FailingStore;

    #[async_trait]
    impl TrainingStore for FailingStore {
        async fn commit(&self, _request: CommitRequest) -> Result<TrainingItem> {
            Err(Error::persistence("503"))
        }

        async fn load(&self, _item_id: Uuid) -> Result<Option<TrainingItem>> {
            Ok(None)
        }
    }

    fn session() -> EditorSession {
        let mut session = EditorSession::new("Café");
        session
            .draft
            .add_or_update_composer(DraftSegment::new("Un café, por favor.", 0.0, 2.0))
            .expect("valid");
        session
    }

    #[tokio::test]
    async fn fold_policy_includes_the_composer() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let mut session = session();
        session.draft.set_text("Gracias.");
        session.draft.set_end(3.0);

        let SubmitOutcome::Committed(item) =
            session.submit(&store, SubmitPolicy::FoldComposer).await?
        else {
            panic!("expected commit");
        };
        assert_eq!(item.segments.len(), 2);
        assert_eq!(item.segments[1].order, 1);
        assert_eq!(session.item_id(), Some(item.id));
        assert!(!session.draft.has_unsaved_composer());
        Ok(())
    }

    #[tokio::test]
    async fn discard_policy_ignores_the_composer() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let mut session = session();
        session.draft.set_text("Gracias.");
        session.draft.set_end(3.0);

        let SubmitOutcome::Committed(item) =
            session.submit(&store, SubmitPolicy::DiscardComposer).await?
        else {
            panic!("expected commit");
        };
        assert_eq!(item.segments.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn reject_policy_reports_unsaved_composer() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let mut session = session();
        session.draft.set_text("Gracias.");
        session.draft.set_end(3.0);

        let outcome = session.submit(&store, SubmitPolicy::RejectUnsaved).await?;
        assert!(matches!(outcome, SubmitOutcome::UnsavedComposer));
        assert_eq!(session.draft.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn empty_title_or_list_fails_validation_before_io() {
        let store = MemoryStore::new();
        let mut untitled = session();
        untitled.title = "  ".to_owned();
        let err = untitled.submit(&store, SubmitPolicy::DiscardComposer).await.unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyTitle));

        let mut empty = EditorSession::new("Nada");
        let err = empty.submit(&store, SubmitPolicy::FoldComposer).await.unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::NoSegments));
    }

    #[tokio::test]
    async fn persistence_failure_leaves_the_draft_untouched() {
        let mut session = session();
        session.draft.begin_edit(0);
        session.draft.set_text("Dos cafés.");

        let err = session
            .submit(&FailingStore, SubmitPolicy::FoldComposer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(session.draft.editing_index(), Some(0));
        assert_eq!(session.draft.composer().text, "Dos cafés.");
        assert_eq!(session.draft.get(0).map(|d| d.text.as_str()), Some("Un café, por favor."));
    }

    #[tokio::test]
    async fn resubmitting_re_authors_the_same_item() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let mut session = session();
        let SubmitOutcome::Committed(first) =
            session.submit(&store, SubmitPolicy::FoldComposer).await?
        else {
            panic!("expected commit");
        };

        let SubmitOutcome::Committed(second) =
            session.submit(&store, SubmitPolicy::FoldComposer).await?
        else {
            panic!("expected commit");
        };

        assert_eq!(first.id, second.id);
        let strip = |item: &TrainingItem| {
            item.segments
                .iter()
                .map(|s| (s.text.clone(), s.start_time, s.end_time, s.order))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first), strip(&second));
        assert_ne!(first.segments[0].id, second.segments[0].id);
        Ok(())
    }
}
