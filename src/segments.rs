//! Segment data structures shared by the draft store, the synchronizer and the encoders.
//!
//! Times are media-time seconds as `f64`, which is what audio elements report for
//! their playback position.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identity of a persisted segment, issued by the commit collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A committed, time-ranged sentence.
///
/// `order` is assigned from the position in the committed list; it is never user supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Present once the segment has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SegmentId>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub order: usize,
}

impl Segment {
    /// Whether `t` falls inside `[start_time, end_time)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_time && t < self.end_time
    }
}

/// A mutable segment being authored. Same shape as [`Segment`] minus `order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSegment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
}

impl DraftSegment {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            translation: None,
            start_time,
            end_time,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    /// An empty draft whose range starts and ends at `at`.
    pub(crate) fn chained_at(at: f64) -> Self {
        Self::new(String::new(), at, at)
    }

    /// Check the text and time range predicates.
    ///
    /// Text is checked first, so a blank draft with a zero range reports `EmptyText`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        validate_range(self.start_time, self.end_time)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Flatten into a committed segment at position `order`.
    ///
    /// Blank translations are dropped so they don't round-trip as `Some("")`.
    pub(crate) fn to_segment(&self, order: usize) -> Segment {
        let translation = self
            .translation
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        Segment {
            id: None,
            text: self.text.trim().to_owned(),
            translation,
            start_time: self.start_time,
            end_time: self.end_time,
            order,
        }
    }
}

impl From<&Segment> for DraftSegment {
    fn from(seg: &Segment) -> Self {
        Self {
            text: seg.text.clone(),
            translation: seg.translation.clone(),
            start_time: seg.start_time,
            end_time: seg.end_time,
        }
    }
}

/// `end > start >= 0`, with NaN rejected.
pub fn validate_range(start: f64, end: f64) -> Result<(), ValidationError> {
    // Written so that NaN on either side fails every comparison and lands here.
    if !(start >= 0.0 && end > start && end.is_finite()) {
        return Err(ValidationError::InvalidRange { start, end });
    }
    Ok(())
}

/// A reference to the audio a training item plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRef {
    pub url: String,
}

/// New audio uploaded alongside an edit-submit.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPayload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A titled audio clip that exclusively owns its ordered segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingItem {
    pub id: Uuid,
    pub title: String,
    pub audio: Option<AudioRef>,
    pub segments: Vec<Segment>,
}
