#[cfg(feature = "async")]
mod t {
    use kira_fastq_qc::{
        AsyncFastqReader, CancellationToken, Envelope, FormatError, Module, QcConfig, QcError,
        ReaderOptions, Verdict, analyze_async,
    };
    use std::io::Write;
    use tempfile::tempdir;
    use tokio::fs::File;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn async_parse_plain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.fastq");
        {
            let mut f = File::create(&path).await.unwrap();
            f.write_all(b"@id\nACGT\n+\nIIII\n").await.unwrap();
        }
        let mut fq = AsyncFastqReader::from_path(&path, ReaderOptions::default())
            .await
            .unwrap();

        if let Some(Ok(rec)) = fq.next_record().await {
            assert_eq!(rec.id, "id");
            assert_eq!(rec.seq, b"ACGT");
            assert_eq!(rec.qual, b"IIII");
        } else {
            panic!("no record");
        }
        assert!(fq.next_record().await.is_none());
    }

    #[tokio::test]
    async fn async_gzip_through_engine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.fq.gz");
        {
            let f = std::fs::File::create(&path).unwrap();
            let mut enc = flate2::write::GzEncoder::new(f, flate2::Compression::fast());
            enc.write_all(b"@r1\nACGTACGTAC\n+\nIIIIIIIIII\n").unwrap();
            enc.finish().unwrap();
        }
        let fq = AsyncFastqReader::from_path(&path, ReaderOptions::default())
            .await
            .unwrap();
        assert_eq!(fq.envelope(), Envelope::Gzip);

        let outcome = analyze_async(fq, "a.fq.gz", &QcConfig::default(), &CancellationToken::new())
            .await
            .unwrap();
        let report = outcome.report().expect("completed");
        assert_eq!(report.basic.total_reads, 1);
        assert_eq!(report.verdict(Module::PerBaseQuality), Verdict::Pass);
    }

    #[tokio::test]
    async fn async_malformed_record() {
        let src = BufReader::new(&b"@r1\nACGT\n+\n"[..]);
        let mut fq = AsyncFastqReader::from_async_bufread(src, None, ReaderOptions::default())
            .await
            .unwrap();
        match fq.next_record().await {
            Some(Err(QcError::MalformedRecord { record: 1, .. })) => {}
            other => panic!("expected malformed record 1, got {other:?}"),
        }
        assert!(fq.next_record().await.is_none());
    }

    #[tokio::test]
    async fn async_long_line_and_raw_quality() {
        let src = BufReader::new(&b"@r1 s\xE9\nACGT\n+\nII\xFFI\n@r2\nACGTACGTA\n+\n"[..]);
        let opts = ReaderOptions {
            max_line_bytes: 8,
            ..ReaderOptions::default()
        };
        let mut fq = AsyncFastqReader::from_async_bufread(src, None, opts)
            .await
            .unwrap();

        let rec = fq.next_record().await.unwrap().unwrap();
        assert_eq!(rec.qual, b"II\xFFI");
        match fq.next_record().await {
            Some(Err(QcError::MalformedRecord {
                record: 2,
                source: FormatError::LineTooLong { limit: 8 },
                ..
            })) => {}
            other => panic!("expected long line in record 2, got {other:?}"),
        }
    }
}
