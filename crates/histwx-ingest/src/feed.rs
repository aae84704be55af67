//! Feed reader and ingestion driver

use crate::IngestResult;
use histwx_core::{parse_line, Observation, ObservationGateway};
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, warn};

/// Outcome of one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Data lines seen, header and blank lines excluded
    pub lines_read: u64,
    pub parsed: u64,
    pub skipped: u64,
    pub inserted: u64,
}

/// Observations parsed from a feed, before storage
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub observations: Vec<Observation>,
    pub lines_read: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone)]
pub struct FeedLoader {
    skip_header: bool,
}

impl Default for FeedLoader {
    fn default() -> Self {
        Self { skip_header: true }
    }
}

impl FeedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the first line is a header (default: true)
    pub fn with_header(mut self, skip_header: bool) -> Self {
        self.skip_header = skip_header;
        self
    }

    /// Parse every data line from a buffered reader.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than failing the
    /// batch; the line then goes through the parser like any other.
    pub async fn read<R>(&self, mut reader: R) -> IngestResult<ParsedFeed>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut feed = ParsedFeed::default();
        let mut buf = Vec::new();
        let mut line_no = 0u64;

        if self.skip_header {
            if let Some(header) = next_line(&mut reader, &mut buf).await? {
                line_no += 1;
                debug!(header = %header, "skipping header line");
            }
        }

        while let Some(line) = next_line(&mut reader, &mut buf).await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            feed.lines_read += 1;
            match parse_line(&line) {
                Ok(obs) => feed.observations.push(obs),
                Err(e) => {
                    feed.skipped += 1;
                    warn!(line = line_no, error = %e, "skipping malformed line");
                }
            }
        }

        Ok(feed)
    }

    pub async fn read_file<P: AsRef<Path>>(&self, path: P) -> IngestResult<ParsedFeed> {
        let file = File::open(path.as_ref()).await?;
        self.read(BufReader::new(file)).await
    }

    /// Parse the feed and bulk-insert it through the gateway
    #[instrument(skip(self, reader, gateway))]
    pub async fn ingest<R>(
        &self,
        reader: R,
        gateway: &dyn ObservationGateway,
    ) -> IngestResult<IngestReport>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let feed = self.read(reader).await?;
        let parsed = feed.observations.len() as u64;
        let inserted = gateway.bulk_insert(feed.observations).await?;

        let report = IngestReport {
            lines_read: feed.lines_read,
            parsed,
            skipped: feed.skipped,
            inserted,
        };
        info!(
            lines = report.lines_read,
            parsed = report.parsed,
            skipped = report.skipped,
            inserted = report.inserted,
            "ingestion complete"
        );
        Ok(report)
    }

    pub async fn ingest_file<P: AsRef<Path>>(
        &self,
        path: P,
        gateway: &dyn ObservationGateway,
    ) -> IngestResult<IngestReport> {
        let path = path.as_ref();
        info!(path = %path.display(), "reading observation feed");
        let file = File::open(path).await?;
        self.ingest(BufReader::new(file), gateway).await
    }
}

/// Next line without its terminator, decoded lossily; `None` at EOF
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    let line = String::from_utf8_lossy(&buf[..]);
    if let Cow::Owned(_) = line {
        warn!("replaced invalid UTF-8 in feed line");
    }
    Ok(Some(line.into_owned()))
}
