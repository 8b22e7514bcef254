//! Sources of landmark frames.
//!
//! The live detector sits behind [`LandmarkSource`]; [`ReplaySource`] plays
//! back a recording with one JSON value per line, either `null` for a frame
//! without a face or an array of `[x, y]` / `[x, y, z]` points.

use crate::{landmarks::LandmarkFrame, Error, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Result of asking a source for its next frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameRead {
    /// A face was found
    Face(LandmarkFrame),
    /// The frame contained no face
    NoFace,
    /// The source is exhausted
    EndOfStream,
}

/// Something that produces one landmark frame per call
pub trait LandmarkSource {
    /// Read the next frame
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source fails or yields malformed data.
    fn next_frame(&mut self) -> Result<FrameRead>;
}

/// Plays back a JSON-lines landmark recording
pub struct ReplaySource<R> {
    reader: R,
    line_number: usize,
    line: String,
}

impl ReplaySource<BufReader<File>> {
    /// Open a recording file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Replaying landmarks from {}", path.display());
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    /// Read a recording from any buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            line: String::new(),
        }
    }

    /// Lines consumed so far
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<FrameRead> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                debug!("Recording ended after {} lines", self.line_number);
                return Ok(FrameRead::EndOfStream);
            }
            self.line_number += 1;

            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }

            let frame: Option<LandmarkFrame> = serde_json::from_str(text)
                .map_err(|e| Error::Replay(format!("line {}: {e}", self.line_number)))?;
            return Ok(frame.map_or(FrameRead::NoFace, FrameRead::Face));
        }
    }
}

/// Append one frame to a recording in the format [`ReplaySource`] reads
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_recording_line<W: Write>(writer: &mut W, frame: Option<&LandmarkFrame>) -> Result<()> {
    serde_json::to_writer(&mut *writer, &frame)?;
    writer.write_all(b"\n")?;
    Ok(())
}
