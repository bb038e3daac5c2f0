use crate::envelope::{Envelope, sniff_bufread};
use crate::error::{IoContext, QcError};
use crate::framing::{self, LineRead};
use crate::policy::ReaderOptions;
use crate::record::Read;

#[cfg(feature = "gzip")]
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const BUF_CAPACITY: usize = 256 * 1024;

#[derive(Debug)]
pub enum Source {
    Path(PathBuf),
    Reader,
}

/// Raised inside the byte counter once the raw input crosses the limit.
#[derive(Debug)]
struct LimitExceeded {
    size: u64,
    limit: u64,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input exceeded {} bytes (read {})", self.limit, self.size)
    }
}

impl std::error::Error for LimitExceeded {}

/// Counts raw bytes pulled from the underlying source.
struct CountingReader<R> {
    inner: R,
    consumed: Arc<AtomicU64>,
    limit: Option<u64>,
}

impl<R: io::Read> io::Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let total = self.consumed.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        if let Some(limit) = self.limit {
            if total > limit {
                return Err(io::Error::other(LimitExceeded { size: total, limit }));
            }
        }
        Ok(n)
    }
}

/// Sync FASTQ reader (plain/.gz), streaming.
pub struct FastqReader {
    src: Source,
    rdr: Box<dyn BufRead + Send>,
    opts: ReaderOptions,
    envelope: Envelope,
    consumed: Arc<AtomicU64>,
    declared_size: Option<u64>,
    line_num: u64,
    byte_pos: u64,
    record: u64,
    done: bool,
}

impl FastqReader {
    /// Open from a file path. The size limit is checked against file metadata
    /// before anything is read; compression is detected from magic bytes.
    pub fn from_path<P: AsRef<Path>>(path: P, opts: ReaderOptions) -> Result<Self, QcError> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| QcError::io_err(e, IoContext::default()))?;
        let size = f
            .metadata()
            .map_err(|e| QcError::io_err(e, IoContext::default()))?
            .len();
        let mut reader = Self::from_reader(f, Some(size), opts)?;
        reader.src = Source::Path(path.to_path_buf());
        Ok(reader)
    }

    /// Wrap an arbitrary byte source. `declared_size` is the caller's claim
    /// about the raw length, if known; it is only used for the up-front size check and
    /// for progress.
    pub fn from_reader<R>(
        reader: R,
        declared_size: Option<u64>,
        opts: ReaderOptions,
    ) -> Result<Self, QcError>
    where
        R: io::Read + Send + 'static,
    {
        if let (Some(size), Some(limit)) = (declared_size, opts.max_input_bytes) {
            if size > limit {
                return Err(QcError::InputTooLarge { size, limit });
            }
        }

        let consumed = Arc::new(AtomicU64::new(0));
        let counted = CountingReader {
            inner: reader,
            consumed: Arc::clone(&consumed),
            limit: opts.max_input_bytes,
        };
        let mut raw = BufReader::with_capacity(BUF_CAPACITY, counted);
        let envelope = sniff_bufread(&mut raw).map_err(|e| map_io(e, IoContext::default()))?;
        log::debug!(
            "opened FASTQ source: envelope={}, declared_size={:?}",
            envelope.name(),
            declared_size
        );

        let rdr: Box<dyn BufRead + Send> = match envelope {
            Envelope::Plain => Box::new(raw),
            #[cfg(feature = "gzip")]
            Envelope::Gzip => {
                let dec = MultiGzDecoder::new(raw);
                Box::new(BufReader::with_capacity(BUF_CAPACITY, dec))
            }
            other => {
                return Err(QcError::UnsupportedEncoding {
                    format: other.name(),
                });
            }
        };

        Ok(Self {
            src: Source::Reader,
            rdr,
            opts,
            envelope,
            consumed,
            declared_size,
            line_num: 0,
            byte_pos: 0,
            record: 0,
            done: false,
        })
    }

    pub fn source(&self) -> &Source {
        &self.src
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    /// Raw (pre-decompression) bytes pulled from the source so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    /// Records started so far (the index of the last record seen).
    pub fn records_read(&self) -> u64 {
        self.record
    }

    /// Iterator-style `next` record. Fused after the first error.
    pub fn next(&mut self) -> Option<Result<Read, QcError>> {
        if self.done {
            return None;
        }
        match self.read_one() {
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

    /// Next line into `buf`, chomped. `Ok(false)` at end of input.
    fn read_line(&mut self, buf: &mut Vec<u8>, record: u64) -> Result<bool, QcError> {
        let max = self.opts.max_line_bytes;
        let read = framing::read_line_bounded(&mut self.rdr, buf, max)
            .map_err(|e| map_io(e, self.ctx()))?;
        match read {
            LineRead::Eof => Ok(false),
            LineRead::TooLong => Err(framing::line_too_long(record, max, self.ctx())),
            LineRead::Line(n) => {
                self.line_num += 1;
                self.byte_pos += n as u64;
                framing::chomp(buf);
                Ok(true)
            }
        }
    }

    fn read_one(&mut self) -> Result<Option<Read>, QcError> {
        // seek first non-empty line
        let mut header = Vec::with_capacity(128);
        let next = self.record + 1;
        loop {
            if !self.read_line(&mut header, next)? {
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

        // sequence: exactly one line
        if !self.read_line(&mut line, record)? {
            return Err(framing::unexpected_eof(record, self.ctx()));
        }
        let seq = framing::parse_sequence(&line, record, self.ctx())?;

        // plus line
        if !self.read_line(&mut line, record)? {
            return Err(framing::unexpected_eof(record, self.ctx()));
        }
        framing::check_separator(&line, &id, record, self.ctx())?;

        // qual: exactly one line
        if !self.read_line(&mut line, record)? {
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

impl Iterator for FastqReader {
    type Item = Result<Read, QcError>;
    fn next(&mut self) -> Option<Self::Item> {
        FastqReader::next(self)
    }
}

/// Lift the byte counter's limit error out of the I/O error it travels in.
fn map_io(e: io::Error, ctx: IoContext) -> QcError {
    if let Some(le) = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<LimitExceeded>())
    {
        return QcError::InputTooLarge {
            size: le.size,
            limit: le.limit,
        };
    }
    QcError::io_err(e, ctx)
}
