#![cfg(feature = "gzip")]

use flate2::Compression;
use flate2::write::GzEncoder;
use kira_fastq_qc::{Envelope, FastqReader, QcConfig, ReaderOptions, analyze_path};
use std::fs::File;
use std::io::{Cursor, Write};
use tempfile::tempdir;

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

#[test]
fn parse_gz_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.fastq.gz");
    {
        let f = File::create(&path).unwrap();
        let mut enc = GzEncoder::new(f, Compression::fast());
        writeln!(enc, "@x").unwrap();
        writeln!(enc, "ACGT").unwrap();
        writeln!(enc, "+").unwrap();
        writeln!(enc, "IIII").unwrap();
        enc.finish().unwrap();
    }

    let mut fq = FastqReader::from_path(&path, ReaderOptions::default()).expect("open gz");
    assert_eq!(fq.envelope(), Envelope::Gzip);
    let rec = fq.next().unwrap().unwrap();
    assert_eq!(rec.id, "x");
    assert_eq!(rec.seq, b"ACGT");
    assert_eq!(rec.qual, b"IIII");
    assert!(fq.next().is_none());
}

#[test]
fn gzip_detected_by_magic_not_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no_extension");
    std::fs::write(&path, gzip(b"@x\nAC\n+\nII\n")).unwrap();

    let outcome = analyze_path(&path, &QcConfig::default()).unwrap();
    let report = outcome.report().expect("completed");
    assert_eq!(report.file_name, "no_extension");
    assert_eq!(report.basic.total_reads, 1);
}

#[test]
fn multi_member_gzip_is_read_to_the_end() {
    let mut data = gzip(b"@a\nAC\n+\nII\n");
    data.extend(gzip(b"@b\nGT\n+\nII\n"));

    let fq = FastqReader::from_reader(Cursor::new(data), None, ReaderOptions::default()).unwrap();
    let ids: Vec<String> = fq.map(|r| r.unwrap().id).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn size_limit_applies_to_compressed_bytes() {
    let plain = "@r\nACGTACGTACGTACGTACGT\n+\nIIIIIIIIIIIIIIIIIIII\n".repeat(200);
    let data = gzip(plain.as_bytes());
    assert!((data.len() as u64) < plain.len() as u64);

    let opts = ReaderOptions {
        max_input_bytes: Some(data.len() as u64),
        ..ReaderOptions::default()
    };
    let size = data.len() as u64;
    let fq = FastqReader::from_reader(Cursor::new(data), Some(size), opts).unwrap();
    assert_eq!(fq.count(), 200);
}
