//! Destinations for address documents.

mod ndjson;

use anyhow::Result;

pub use ndjson::NdjsonSink;

use crate::models::AddressDoc;

/// Receives address documents in production order.
pub trait AddressSink {
    /// Accept one document
    fn write(&mut self, doc: &AddressDoc) -> Result<()>;

    /// Flush pending output and return the number of documents written
    fn finish(self) -> Result<usize>;
}

/// Collects documents in memory
impl AddressSink for Vec<AddressDoc> {
    fn write(&mut self, doc: &AddressDoc) -> Result<()> {
        self.push(doc.clone());
        Ok(())
    }

    fn finish(self) -> Result<usize> {
        Ok(self.len())
    }
}
