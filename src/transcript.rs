//! Importing draft transcripts and exporting committed ones.
//!
//! Export picks the encoder for `opts.output_type`, streams every segment through it and
//! always closes it, surfacing the write error first if both steps fail.

use std::io::{BufReader, BufWriter, Read, Write};

use crate::Result;
use crate::json_array_encoder::JsonArrayEncoder;
use crate::opts::Opts;
use crate::output_type::OutputType;
use crate::segment_encoder::SegmentEncoder;
use crate::segments::{DraftSegment, Segment};
use crate::vtt_encoder::VttEncoder;

/// Read a JSON array of draft segments (`text`, `translation`, `startTime`, `endTime`).
///
/// Only the shape is checked here; validation happens when drafts enter a `DraftStore`.
pub fn read_drafts<R: Read>(r: R) -> Result<Vec<DraftSegment>> {
    Ok(serde_json::from_reader(BufReader::new(r))?)
}

pub fn write_transcript<W: Write>(segments: &[Segment], w: W, opts: &Opts) -> Result<()> {
    let writer = BufWriter::new(w);

    // Explicit per-format arms (no trait objects) to keep encoder lifetimes simple.
    match opts.output_type {
        OutputType::Json => {
            let mut encoder = JsonArrayEncoder::new(writer);
            let run_res = write_all(segments, &mut encoder);
            merge_run_and_close(run_res, encoder.close())
        }
        OutputType::Vtt => {
            let mut encoder = VttEncoder::new(writer);
            let run_res = write_all(segments, &mut encoder);
            merge_run_and_close(run_res, encoder.close())
        }
    }
}

fn write_all<E: SegmentEncoder>(segments: &[Segment], encoder: &mut E) -> Result<()> {
    for seg in segments {
        encoder.write_segment(seg)?;
    }
    Ok(())
}

fn merge_run_and_close(run_res: Result<()>, close_res: Result<()>) -> Result<()> {
    match (run_res, close_res) {
        (Ok(()), Ok(())) => Ok(()),
        (Ok(()), Err(close_err)) => Err(close_err),
        (Err(err), _) => Err(err),
    }
}
