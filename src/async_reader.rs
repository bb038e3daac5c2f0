#![cfg(feature = "async")]

use crate::cancel::CancellationToken;
use crate::config::QcConfig;
use crate::engine::{Outcome, QcEngine};
use crate::envelope::{Envelope, SNIFF_LEN};
use crate::error::{IoContext, QcError};
use crate::framing::{self, LineRead};
use crate::policy::ReaderOptions;
use crate::record::Read;

use async_compression::tokio::bufread::GzipDecoder;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

const BUF_CAPACITY: usize = 256 * 1024;

#[derive(Debug)]
pub enum AsyncSource {
    Path(PathBuf),
    Reader,
}

/// Async FASTQ reader (plain/.gz), streaming.
///
/// The size limit is enforced up front only, from file metadata or the
/// caller's declared size.
pub struct AsyncFastqReader {
    src: AsyncSource,
    rdr: Box<dyn AsyncBufRead + Unpin + Send>,
    opts: ReaderOptions,
    envelope: Envelope,
    line_num: u64,
    byte_pos: u64,
    record: u64,
    done: bool,
}

impl AsyncFastqReader {
    /// Open async from path; compression is detected from magic bytes.
    pub async fn from_path<P: AsRef<Path>>(
        path: P,
        opts: ReaderOptions,
    ) -> Result<Self, QcError> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path)
            .await
            .map_err(|e| QcError::io_err(e, IoContext::default()))?;
        let size = f
            .metadata()
            .await
            .map_err(|e| QcError::io_err(e, IoContext::default()))?
            .len();
        let mut reader = Self::from_async_bufread(
            BufReader::with_capacity(BUF_CAPACITY, f),
            Some(size),
            opts,
        )
        .await?;
        reader.src = AsyncSource::Path(path);
        Ok(reader)
    }

    /// Wrap any async `AsyncBufRead`.
    pub async fn from_async_bufread<R>(
        mut reader: R,
        declared_size: Option<u64>,
        opts: ReaderOptions,
    ) -> Result<Self, QcError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        if let (Some(size), Some(limit)) = (declared_size, opts.max_input_bytes) {
            if size > limit {
                return Err(QcError::InputTooLarge { size, limit });
            }
        }

        let envelope = {
            let buf = reader
                .fill_buf()
                .await
                .map_err(|e| QcError::io_err(e, IoContext::default()))?;
            Envelope::sniff(&buf[..buf.len().min(SNIFF_LEN)])
        };
        log::debug!(
            "opened async FASTQ source: envelope={}, declared_size={:?}",
            envelope.name(),
            declared_size
        );

        let rdr: Box<dyn AsyncBufRead + Unpin + Send> = match envelope {
            Envelope::Plain => Box::new(reader),
            Envelope::Gzip => {
                let mut gz = GzipDecoder::new(reader);
                gz.multiple_members(true);
                Box::new(BufReader::with_capacity(BUF_CAPACITY, gz))
            }
            other => {
                return Err(QcError::UnsupportedEncoding {
                    format: other.name(),
                });
            }
        };

        Ok(Self {
            src: AsyncSource::Reader,
            rdr,
            opts,
            envelope,
            line_num: 0,
            byte_pos: 0,
            record: 0,
            done: false,
        })
    }

    pub fn source(&self) -> &AsyncSource {
        &self.src
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Fetch next record (async). Fused after the first error.
    pub async fn next_record(&mut self) -> Option<Result<Read, QcError>> {
        if self.done {
            return None;
        }
        match self.read_one().await {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    /// Bounded `read_until(b'\n')` over the async source.
    async fn fill_line(&mut self, buf: &mut Vec<u8>) -> Result<LineRead, QcError> {
        let max = self.opts.max_line_bytes;
        buf.clear();
        let mut consumed = 0usize;
        loop {
            let ctx = self.ctx();
            let avail = self
                .rdr
                .fill_buf()
                .await
                .map_err(|e: io::Error| QcError::io_err(e, ctx))?;
            if avail.is_empty() {
                return Ok(if consumed == 0 {
                    LineRead::Eof
                } else {
                    LineRead::Line(consumed)
                });
            }
            let (take, done) = framing::line_chunk(avail);
            buf.extend_from_slice(&avail[..take]);
            self.rdr.consume(take);
            consumed += take;
            if !framing::within_limit(buf, max) {
                return Ok(LineRead::TooLong);
            }
            if done {
                return Ok(LineRead::Line(consumed));
            }
        }
    }

    /// Next line into `buf`, chomped. `Ok(false)` at end of input.
    async fn read_line(&mut self, buf: &mut Vec<u8>, record: u64) -> Result<bool, QcError> {
        match self.fill_line(buf).await? {
            LineRead::Eof => Ok(false),
            LineRead::TooLong => Err(framing::line_too_long(
                record,
                self.opts.max_line_bytes,
                self.ctx(),
            )),
            LineRead::Line(n) => {
                self.line_num += 1;
                self.byte_pos += n as u64;
                framing::chomp(buf);
                Ok(true)
            }
        }
    }

    async fn read_one(&mut self) -> Result<Option<Read>, QcError> {
        let mut header = Vec::with_capacity(128);
        let next = self.record + 1;
        loop {
            if !self.read_line(&mut header, next).await? {
                return Ok(None);
            }
            if !header.is_empty() {
                break;
            }
        }
        self.record = next;
        let record = next;

        let (id, desc) =
            framing::parse_header(&header, record, self.opts.fastq_only, self.ctx())?;

        let mut line = Vec::with_capacity(256);

        // seq
        if !self.read_line(&mut line, record).await? {
            return Err(framing::unexpected_eof(record, self.ctx()));
        }
        let seq = framing::parse_sequence(&line, record, self.ctx())?;

        // plus
        if !self.read_line(&mut line, record).await? {
            return Err(framing::unexpected_eof(record, self.ctx()));
        }
        framing::check_separator(&line, &id, record, self.ctx())?;

        // qual
        if !self.read_line(&mut line, record).await? {
            return Err(framing::unexpected_eof(record, self.ctx()));
        }
        framing::finish_record(id, desc, seq, &line, record, self.ctx()).map(Some)
    }

    #[inline]
    fn ctx(&self) -> IoContext {
        IoContext {
            byte_pos: self.byte_pos,
            line_num: self.line_num,
        }
    }
}

/// Drive an async reader through a fresh engine.
pub async fn analyze_async(
    mut reader: AsyncFastqReader,
    file_name: &str,
    config: &QcConfig,
    cancel: &CancellationToken,
) -> Result<Outcome, QcError> {
    let mut engine = QcEngine::new(file_name, config)?.with_cancellation(cancel.clone());
    while let Some(rec) = reader.next_record().await {
        match engine.fold(&rec?) {
            Ok(()) => {}
            Err(QcError::Cancelled) => return Ok(Outcome::Cancelled),
            Err(e) => return Err(e),
        }
    }
    if cancel.is_cancelled() {
        return Ok(Outcome::Cancelled);
    }
    engine.finalize().map(Outcome::Completed)
}
