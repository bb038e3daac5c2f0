//! Line-level checks shared by the sync and async readers.
//!
//! Both readers pull raw byte lines themselves (blocking or `.await`),
//! never longer than `max_line_bytes`, and hand each one to these helpers,
//! so framing rules live in one place.

use crate::error::{FormatError, IoContext, QcError};
use crate::record::Read;
use std::io::{self, BufRead};

/// Result of pulling one line off a buffered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineRead {
    Eof,
    /// Raw bytes consumed, terminator included.
    Line(usize),
    /// Content grew past the limit; the source is left mid-line.
    TooLong,
}

/// Take as much of `avail` as belongs to the current line. Returns the
/// byte count to consume and whether the terminator was seen.
#[inline]
pub(crate) fn line_chunk(avail: &[u8]) -> (usize, bool) {
    match avail.iter().position(|&b| b == b'\n') {
        Some(i) => (i + 1, true),
        None => (avail.len(), false),
    }
}

/// Whether `buf`, minus a trailing `\n` and `\r`, fits in `max` bytes.
#[inline]
pub(crate) fn within_limit(buf: &[u8], max: usize) -> bool {
    let mut len = buf.len();
    if len > 0 && buf[len - 1] == b'\n' {
        len -= 1;
    }
    if len > 0 && buf[len - 1] == b'\r' {
        len -= 1;
    }
    len <= max
}

/// `read_until(b'\n')` that stops once the line exceeds `max` content bytes.
pub(crate) fn read_line_bounded<R: BufRead + ?Sized>(
    r: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<LineRead> {
    buf.clear();
    let mut consumed = 0usize;
    loop {
        let avail = match r.fill_buf() {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if avail.is_empty() {
            return Ok(if consumed == 0 {
                LineRead::Eof
            } else {
                LineRead::Line(consumed)
            });
        }
        let (take, done) = line_chunk(avail);
        buf.extend_from_slice(&avail[..take]);
        r.consume(take);
        consumed += take;
        if !within_limit(buf, max) {
            return Ok(LineRead::TooLong);
        }
        if done {
            return Ok(LineRead::Line(consumed));
        }
    }
}

/// Strip a trailing `\n` and `\r`.
#[inline]
pub(crate) fn chomp(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

pub(crate) fn line_too_long(record: u64, limit: usize, ctx: IoContext) -> QcError {
    QcError::fmt_err(record, FormatError::LineTooLong { limit }, ctx)
}

/// Split an `@id desc` line into id and optional description. Bytes that
/// are not UTF-8 are replaced, not rejected.
pub(crate) fn parse_header(
    line: &[u8],
    record: u64,
    fastq_only: bool,
    ctx: IoContext,
) -> Result<(String, Option<String>), QcError> {
    let Some(body) = line.strip_prefix(b"@") else {
        if fastq_only && line.starts_with(b">") {
            return Err(QcError::fmt_err(
                record,
                FormatError::FastaHeaderDetected,
                ctx,
            ));
        }
        return Err(QcError::fmt_err(record, FormatError::MissingHeader, ctx));
    };
    let body = String::from_utf8_lossy(body);
    let mut parts = body.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok((id, desc))
}

/// Upper-case the sequence line and reject anything outside `ACGTN`.
pub(crate) fn parse_sequence(line: &[u8], record: u64, ctx: IoContext) -> Result<Vec<u8>, QcError> {
    let mut seq = line.to_vec();
    for (offset, b) in seq.iter_mut().enumerate() {
        let upper = b.to_ascii_uppercase();
        match upper {
            b'A' | b'C' | b'G' | b'T' | b'N' => *b = upper,
            byte => {
                return Err(QcError::fmt_err(
                    record,
                    FormatError::InvalidBase { byte, offset },
                    ctx,
                ));
            }
        }
    }
    Ok(seq)
}

/// `+` alone, or `+id` repeating the header id.
pub(crate) fn check_separator(
    line: &[u8],
    id: &str,
    record: u64,
    ctx: IoContext,
) -> Result<(), QcError> {
    let Some(rest) = line.strip_prefix(b"+") else {
        return Err(QcError::fmt_err(record, FormatError::MissingPlus, ctx));
    };
    let rest = String::from_utf8_lossy(rest);
    let plus_id = rest.split_whitespace().next().unwrap_or("");
    if !plus_id.is_empty() && plus_id != id {
        return Err(QcError::fmt_err(
            record,
            FormatError::SeparatorMismatch {
                header: id.to_string(),
                plus: plus_id.to_string(),
            },
            ctx,
        ));
    }
    Ok(())
}

pub(crate) fn finish_record(
    id: String,
    desc: Option<String>,
    seq: Vec<u8>,
    qual_line: &[u8],
    record: u64,
    ctx: IoContext,
) -> Result<Read, QcError> {
    // range-checked against the phred offset by the engine
    let qual = qual_line.to_vec();
    if qual.len() != seq.len() {
        return Err(QcError::fmt_err(
            record,
            FormatError::LengthMismatch {
                seq: seq.len(),
                qual: qual.len(),
            },
            ctx,
        ));
    }
    Ok(Read {
        id,
        desc,
        seq,
        qual,
        index: record,
    })
}

pub(crate) fn unexpected_eof(record: u64, ctx: IoContext) -> QcError {
    QcError::fmt_err(record, FormatError::UnexpectedEof, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn lines(data: &[u8], max: usize, cap: usize) -> Vec<LineRead> {
        let mut r = BufReader::with_capacity(cap, data);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let l = read_line_bounded(&mut r, &mut buf, max).unwrap();
            out.push(l);
            if matches!(l, LineRead::Eof | LineRead::TooLong) {
                return out;
            }
        }
    }

    #[test]
    fn bounded_lines_across_small_buffers() {
        assert_eq!(
            lines(b"ACGT\nAC\r\nA", 4, 2),
            vec![
                LineRead::Line(5),
                LineRead::Line(4),
                LineRead::Line(1),
                LineRead::Eof
            ]
        );
    }

    #[test]
    fn crlf_terminator_does_not_count() {
        assert_eq!(lines(b"ACGT\r\n", 4, 3), vec![LineRead::Line(6), LineRead::Eof]);
        assert_eq!(lines(b"ACGTA\r\n", 4, 3), vec![LineRead::TooLong]);
    }

    #[test]
    fn unterminated_long_line_stops_early() {
        let data = vec![b'A'; 10_000];
        let mut r = BufReader::with_capacity(16, &data[..]);
        let mut buf = Vec::new();
        assert_eq!(
            read_line_bounded(&mut r, &mut buf, 32).unwrap(),
            LineRead::TooLong
        );
        assert!(buf.len() <= 48);
    }

    #[test]
    fn header_keeps_non_utf8_description() {
        let (id, desc) =
            parse_header(b"@r1 s\xE9q", 1, true, IoContext::default()).unwrap();
        assert_eq!(id, "r1");
        assert_eq!(desc.as_deref(), Some("s\u{FFFD}q"));
    }
}
