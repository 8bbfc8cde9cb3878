use crate::Result;
use crate::segments::Segment;

/// Streams committed segments into some output format.
pub trait SegmentEncoder {
    fn write_segment(&mut self, seg: &Segment) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
