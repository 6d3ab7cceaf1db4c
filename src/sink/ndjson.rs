//! Newline-delimited JSON output.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use super::AddressSink;
use crate::models::AddressDoc;

/// Writes one JSON document per line.
pub struct NdjsonSink<W: Write> {
    writer: BufWriter<W>,
    written: usize,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Documents written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to flush output")
    }
}

impl NdjsonSink<Box<dyn Write + Send>> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Sink writing to a new file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self::new(Box::new(file)))
    }
}

impl<W: Write> AddressSink for NdjsonSink<W> {
    fn write(&mut self, doc: &AddressDoc) -> Result<()> {
        serde_json::to_writer(&mut self.writer, doc)
            .with_context(|| format!("Failed to write document {}", doc.id))?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        self.writer.flush().context("Failed to flush output")?;
        debug!("Wrote {} documents", self.written);
        Ok(self.written)
    }
}
