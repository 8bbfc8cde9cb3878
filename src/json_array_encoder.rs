use std::io::Write;

use crate::Result;
use crate::segment_encoder::SegmentEncoder;
use crate::segments::Segment;

/// A `SegmentEncoder` that writes segments as a single JSON array.
///
/// Output uses the same camelCase shape the commit collaborator accepts:
/// ```json
/// [
///   { "text": "Hola.", "translation": "Hello.", "startTime": 0.0, "endTime": 1.2, "order": 0 },
///   { "text": "¿Qué tal?", "startTime": 1.2, "endTime": 2.5, "order": 1 }
/// ]
/// ```
pub struct JsonArrayEncoder<W: Write> {
    w: W,

    /// Whether we have written the opening `[`.
    started: bool,

    /// Whether the next element is the first one, so we know where commas go.
    first: bool,

    closed: bool,
}

impl<W: Write> JsonArrayEncoder<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            started: false,
            first: true,
            closed: false,
        }
    }

    /// Open the array lazily so an empty transcript still closes as `[]`.
    fn start_if_needed(&mut self) -> Result<()> {
        if !self.started {
            self.w.write_all(b"[")?;
            self.started = true;
        }
        Ok(())
    }
}

impl<W: Write> SegmentEncoder for JsonArrayEncoder<W> {
    fn write_segment(&mut self, seg: &Segment) -> Result<()> {
        if self.closed {
            return Err(crate::Error::msg(
                "cannot write segment: encoder is already closed",
            ));
        }

        self.start_if_needed()?;

        if !self.first {
            self.w.write_all(b",")?;
        }
        self.first = false;

        serde_json::to_writer(&mut self.w, seg)?;
        Ok(())
    }

    /// Finalize the array. Idempotent; no writes are accepted afterwards.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.start_if_needed()?;
        self.w.write_all(b"]")?;
        self.w.flush()?;

        self.closed = true;
        Ok(())
    }
}
