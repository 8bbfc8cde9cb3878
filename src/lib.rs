//! `echoline` — the playback and authoring engine behind a sentence-by-sentence
//! language-learning player.
//!
//! This crate provides:
//! - Locating the active sentence for a moving audio clock
//! - Single-sentence repeat looping and playback speed steps
//! - A draft store for authoring time-ranged sentences before a batch commit
//! - Optimistic autosave for per-sentence vocabulary notes
//! - Transcript export (JSON, WebVTT)
//!
//! Storage, audio playback and rendering are collaborators supplied by the host through
//! the traits in [`store`] and [`playback::Clock`].

mod error;

pub use error::{Error, Result, ValidationError};

// Configuration.
pub mod opts;

// Segment data structures.
pub mod segments;

// Playback: active-segment lookup, repeat looping, host glue.
pub mod locate;
pub mod playback;
pub mod repeat;

// Authoring.
pub mod draft;
pub mod editor;

// Notes autosave and persistence collaborators.
pub mod notes;
pub mod store;

// Output selection and encoder interfaces.
pub mod output_type;
pub mod segment_encoder;
pub mod transcript;

// Output encoders that serialize segments into various formats.
pub mod json_array_encoder;
pub mod vtt_encoder;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use draft::{ComposerMode, DraftId, DraftStore};
pub use editor::{EditorSession, SubmitOutcome, SubmitPolicy};
pub use locate::locate_active;
pub use notes::{NoteAutosave, SaveStatus};
pub use opts::Opts;
pub use output_type::OutputType;
pub use playback::{Clock, PlaybackSession, TickOutcome};
pub use repeat::{LoopState, RepeatLoop, Seek};
pub use segments::{DraftSegment, Segment, SegmentId, TrainingItem};
pub use store::{MemoryStore, NoteStore, TrainingStore};

#[cfg(feature = "logging")]
pub use logging::init as init_logging;
