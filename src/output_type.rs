/// The supported export formats for a committed transcript.
///
/// Integration notes:
/// - With the `cli` feature, `ValueEnum` lets this enum be used directly as a CLI flag.
/// - Each variant maps to a concrete `SegmentEncoder` implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputType {
    /// Output segments as a JSON array.
    #[default]
    Json,

    /// Output segments as a WebVTT track (translation on a second cue line).
    Vtt,
}
