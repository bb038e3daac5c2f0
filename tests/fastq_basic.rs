use kira_fastq_qc::{Envelope, FastqReader, FormatError, QcError, ReaderOptions};
use std::io::Cursor;

const SAMPLE: &str = "\
@read1 desc
ACGTN
+
!!!!!
@read2
acgt
+read2
####";

fn reader(data: &'static str) -> FastqReader {
    FastqReader::from_reader(Cursor::new(data.as_bytes()), None, ReaderOptions::default())
        .expect("open reader")
}

fn malformed(res: Option<Result<kira_fastq_qc::Read, QcError>>) -> (u64, FormatError) {
    match res {
        Some(Err(QcError::MalformedRecord { record, source, .. })) => (record, source),
        other => panic!("expected malformed record, got {other:?}"),
    }
}

#[test]
fn parse_two_records() {
    let mut fq = reader(SAMPLE);
    assert_eq!(fq.envelope(), Envelope::Plain);

    let r1 = fq.next().unwrap().unwrap();
    assert_eq!(r1.id, "read1");
    assert_eq!(r1.desc.as_deref(), Some("desc"));
    assert_eq!(r1.seq, b"ACGTN");
    assert_eq!(r1.qual, b"!!!!!");
    assert_eq!(r1.index, 1);

    let r2 = fq.next().unwrap().unwrap();
    assert_eq!(r2.id, "read2");
    assert_eq!(r2.desc, None);
    assert_eq!(r2.seq, b"ACGT", "lowercase bases are upper-cased");
    assert_eq!(r2.qual, b"####");
    assert_eq!(r2.index, 2);

    assert!(fq.next().is_none());
}

#[test]
fn crlf_and_blank_lines_between_records() {
    let mut fq = reader("@a\r\nAC\r\n+\r\nII\r\n\r\n\n@b\r\nG\r\n+\r\nI\r\n");
    let a = fq.next().unwrap().unwrap();
    assert_eq!(a.seq, b"AC");
    assert_eq!(a.qual, b"II");
    let b = fq.next().unwrap().unwrap();
    assert_eq!(b.id, "b");
    assert_eq!(b.index, 2);
    assert!(fq.next().is_none());
}

#[test]
fn three_line_group_at_eof_is_malformed_record_one() {
    let mut fq = reader("@r1\nACGT\n+\n");
    let (record, source) = malformed(fq.next());
    assert_eq!(record, 1);
    assert_eq!(source, FormatError::UnexpectedEof);
    assert!(fq.next().is_none(), "reader is fused after an error");
}

#[test]
fn missing_separator_is_reported() {
    let mut fq = reader("@r1\nACGT\n@r2\nACGT\n+\nIIII\n");
    let (record, source) = malformed(fq.next());
    assert_eq!(record, 1);
    assert_eq!(source, FormatError::MissingPlus);
}

#[test]
fn length_mismatch_cites_record_index() {
    let mut fq = reader("@r1\nA\n+\nI\n@r2\nACGT\n+\nIII\n");
    assert!(fq.next().unwrap().is_ok());
    let (record, source) = malformed(fq.next());
    assert_eq!(record, 2);
    assert_eq!(source, FormatError::LengthMismatch { seq: 4, qual: 3 });
}

#[test]
fn fasta_header_detected() {
    let mut fq = reader(">r1\nACGT\n");
    let (_, source) = malformed(fq.next());
    assert_eq!(source, FormatError::FastaHeaderDetected);
}

#[test]
fn separator_id_must_match_header() {
    let mut fq = reader("@r1\nACGT\n+r9\nIIII\n");
    let (_, source) = malformed(fq.next());
    assert!(matches!(source, FormatError::SeparatorMismatch { .. }));
}

#[test]
fn invalid_base_is_rejected() {
    let mut fq = reader("@r1\nACXT\n+\nIIII\n");
    let (_, source) = malformed(fq.next());
    assert_eq!(
        source,
        FormatError::InvalidBase {
            byte: b'X',
            offset: 2
        }
    );
}

#[test]
fn empty_sequence_is_a_valid_record() {
    let mut fq = reader("@empty\n\n+\n\n");
    let r = fq.next().unwrap().unwrap();
    assert!(r.is_empty());
    assert!(r.qual.is_empty());
    assert!(fq.next().is_none());
}

#[test]
fn empty_input_yields_nothing() {
    let mut fq = reader("");
    assert!(fq.next().is_none());
}

#[test]
fn unrecognized_compression_is_unsupported() {
    let data: &[u8] = b"BZh91AY&SY\x00\x00";
    let Err(err) = FastqReader::from_reader(Cursor::new(data), None, ReaderOptions::default())
    else {
        panic!("bzip2 input must be rejected");
    };
    assert!(matches!(
        err,
        QcError::UnsupportedEncoding { format: "bzip2" }
    ));
    assert!(!Envelope::Bzip2.is_supported());
    assert!(Envelope::Plain.is_supported());
}

#[test]
fn declared_size_over_limit_is_rejected_before_reading() {
    let opts = ReaderOptions {
        max_input_bytes: Some(10),
        ..ReaderOptions::default()
    };
    let Err(err) = FastqReader::from_reader(Cursor::new(SAMPLE.as_bytes()), Some(11), opts)
    else {
        panic!("oversized input must be rejected");
    };
    assert!(matches!(
        err,
        QcError::InputTooLarge {
            size: 11,
            limit: 10
        }
    ));
}

#[test]
fn undeclared_size_over_limit_is_caught_while_reading() {
    let opts = ReaderOptions {
        max_input_bytes: Some(10),
        ..ReaderOptions::default()
    };
    let res = FastqReader::from_reader(Cursor::new(SAMPLE.as_bytes()), None, opts)
        .and_then(|fq| fq.collect::<Result<Vec<_>, _>>());
    assert!(matches!(
        res,
        Err(QcError::InputTooLarge { limit: 10, .. })
    ));
}

#[test]
fn bytes_consumed_tracks_raw_input() {
    let mut fq = reader(SAMPLE);
    while let Some(r) = fq.next() {
        r.unwrap();
    }
    assert_eq!(fq.bytes_consumed(), SAMPLE.len() as u64);
    assert_eq!(fq.records_read(), 2);
}

#[test]
fn non_utf8_bytes_stay_in_the_record() {
    let data: &'static [u8] = b"@r\xE91 s\xE9q\nACGT\n+\nII\xFFI\n";
    let mut fq =
        FastqReader::from_reader(Cursor::new(data), None, ReaderOptions::default()).unwrap();
    let rec = fq.next().unwrap().unwrap();
    assert_eq!(rec.id, "r\u{FFFD}1");
    assert_eq!(rec.desc.as_deref(), Some("s\u{FFFD}q"));
    assert_eq!(rec.qual, b"II\xFFI");
    assert!(fq.next().is_none());
}

#[test]
fn non_utf8_sequence_byte_is_an_invalid_base() {
    let data: &'static [u8] = b"@r1\nAC\x80T\n+\nIIII\n";
    let mut fq =
        FastqReader::from_reader(Cursor::new(data), None, ReaderOptions::default()).unwrap();
    assert_eq!(
        malformed(fq.next()),
        (1, FormatError::InvalidBase { byte: 0x80, offset: 2 })
    );
}

#[test]
fn overlong_line_is_a_malformed_record() {
    let opts = ReaderOptions {
        max_line_bytes: 8,
        ..ReaderOptions::default()
    };
    let data = "@a\nACGTACGT\n+\nIIIIIIII\n@b\nACGTACGTA\n+\nIIIIIIIII\n";
    let mut fq = FastqReader::from_reader(Cursor::new(data.as_bytes()), None, opts).unwrap();
    assert_eq!(fq.next().unwrap().unwrap().len(), 8);
    assert_eq!(malformed(fq.next()), (2, FormatError::LineTooLong { limit: 8 }));
    assert!(fq.next().is_none());
}

#[test]
fn unterminated_line_is_cut_off_at_the_limit() {
    let opts = ReaderOptions {
        max_line_bytes: 1024,
        max_input_bytes: None,
        ..ReaderOptions::default()
    };
    let data = format!("@a\n{}", "A".repeat(4 * 1024 * 1024));
    let mut fq = FastqReader::from_reader(Cursor::new(data.into_bytes()), None, opts).unwrap();
    assert_eq!(malformed(fq.next()), (1, FormatError::LineTooLong { limit: 1024 }));
    // the rest of the line was never pulled in
    assert!(fq.bytes_consumed() < 1024 * 1024);
}
