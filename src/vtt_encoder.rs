use std::io::Write;

use crate::Result;
use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;

/// A `SegmentEncoder` that writes a WebVTT track.
///
/// Each segment becomes one cue identified by its `order`. A translation, when present,
/// goes on a second cue line so players can show both languages.
pub struct VttEncoder<W: Write> {
    w: W,
    started: bool,
    closed: bool,
}

impl<W: Write> VttEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            closed: false,
        }
    }

    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            // WebVTT files begin with a mandatory header line followed by a blank line.
            self.w.write_all(b"WEBVTT\n\n")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SegmentEncoder for VttEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write segment: encoder is already closed",
            ));
        }

        self.start_if_needed()?;

        let start = format_timestamp_vtt(seg.start_time);
        let end = format_timestamp_vtt(seg.end_time);

        writeln!(&mut self.w, "{}", seg.order + 1)?;
        writeln!(&mut self.w, "{start} --> {end}")?;
        writeln!(&mut self.w, "{}", cue_text(&seg.text))?;
        if let Some(translation) = &seg.translation {
            writeln!(&mut self.w, "{}", cue_text(translation))?;
        }
        writeln!(&mut self.w)?;

        Ok(())
    }

    /// Write the header if nothing was written yet, then flush. Idempotent.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        // An empty transcript is still a valid (cue-less) track.
        self.start_if_needed()?;
        self.w.flush()?;
        self.closed = true;

        Ok(())
    }
}

/// Format seconds into a WebVTT timestamp (`HH:MM:SS.mmm`), rounding to the nearest millisecond.
fn format_timestamp_vtt(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Cue payloads may not contain blank lines or a bare `-->`; escape what VTT treats as markup.
fn cue_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
