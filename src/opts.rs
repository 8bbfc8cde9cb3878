use std::time::Duration;

use crate::output_type::OutputType;

/// Minimum time the "saving" indicator stays up after a note save settles.
pub const DEFAULT_MIN_SAVING_DISPLAY: Duration = Duration::from_millis(600);

/// Speed steps offered to the learner.
pub const DEFAULT_PLAYBACK_RATES: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Options that control playback, autosave and export behavior.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The CLI is responsible for mapping user input into this type so that:
/// - the library remains reusable outside of a CLI context
/// - other frontends (web hosts, tests, batch jobs) can construct options programmatically
#[derive(Debug, Clone)]
pub struct Opts {
    /// How long the note "saving" flag stays visible once a save has settled.
    ///
    /// Keeps fast typers from seeing the indicator flicker on every keystroke.
    pub min_saving_display: Duration,

    /// Selectable playback rates, ascending. `1.0` should be among them.
    ///
    /// An empty list is treated as `[1.0]`.
    pub playback_rates: Vec<f32>,

    /// The desired export format for committed segments.
    pub output_type: OutputType,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            min_saving_display: DEFAULT_MIN_SAVING_DISPLAY,
            playback_rates: DEFAULT_PLAYBACK_RATES.to_vec(),
            output_type: OutputType::default(),
        }
    }
}
