use crate::error::Result;
use crate::types::ReconciledRecord;
use async_trait::async_trait;

// Fetch-side port: given a URL, return the page text
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

// Output-side port: append reconciled records somewhere durable
pub trait RecordSink: Send + Sync {
    fn name(&self) -> &str;

    /// Append `records`, returning how many were written.
    fn write(&self, records: &[ReconciledRecord]) -> Result<usize>;
}
