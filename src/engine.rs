//! Single-file streaming fold.
//!
//! [`QcEngine`] owns one accumulator set for one file. Reads go in through
//! [`QcEngine::fold`]; [`QcEngine::finalize`] turns the accumulators into a
//! [`QcReport`] exactly once. [`Analyzer`] drives a [`FastqReader`] through
//! an engine with cancellation and progress.

use crate::adapter::{AdapterContent, AdapterScanner};
use crate::cancel::CancellationToken;
use crate::config::{QcConfig, Thresholds};
use crate::error::QcError;
use crate::per_base::PerBaseAccumulator;
use crate::per_sequence::{PerSequenceAccumulator, SequenceSummary};
use crate::reader::FastqReader;
use crate::record::Read;
use crate::report::{BasicStats, QcReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Open,
    Finalized,
    Cancelled,
    Failed,
}

/// Result of a run that did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Completed(QcReport),
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    pub fn report(&self) -> Option<&QcReport> {
        match self {
            Outcome::Completed(r) => Some(r),
            Outcome::Cancelled => None,
        }
    }

    pub fn into_report(self) -> Option<QcReport> {
        match self {
            Outcome::Completed(r) => Some(r),
            Outcome::Cancelled => None,
        }
    }
}

pub struct QcEngine {
    file_name: String,
    phred_offset: u8,
    max_quality: u8,
    thresholds: Thresholds,
    scanner: AdapterScanner,
    per_base: PerBaseAccumulator,
    per_seq: PerSequenceAccumulator,
    adapters: AdapterContent,
    scores: Vec<u8>,
    cancel: Option<CancellationToken>,
    state: State,
}

impl QcEngine {
    pub fn new(file_name: impl Into<String>, config: &QcConfig) -> Result<Self, QcError> {
        config.validate()?;
        let scanner = AdapterScanner::new(&config.adapters, config.adapter_tolerance);
        let adapters = AdapterContent::new(&scanner);
        Ok(Self {
            file_name: file_name.into(),
            phred_offset: config.phred_offset,
            max_quality: config.max_quality,
            thresholds: config.thresholds.clone(),
            scanner,
            per_base: PerBaseAccumulator::new(),
            per_seq: PerSequenceAccumulator::new(),
            adapters,
            scores: Vec::with_capacity(256),
            cancel: None,
            state: State::Open,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn reads_folded(&self) -> u64 {
        self.per_seq.total_reads
    }

    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// Fold one read into every accumulator.
    ///
    /// Quality bytes are validated before anything is touched. A bad score
    /// closes the engine; so does an observed cancellation, which is
    /// reported once as [`QcError::Cancelled`].
    pub fn fold(&mut self, read: &Read) -> Result<(), QcError> {
        if self.state != State::Open {
            return Err(QcError::EngineClosed);
        }
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            self.state = State::Cancelled;
            return Err(QcError::Cancelled);
        }
        if let Err(e) = self.decode_scores(read) {
            self.state = State::Failed;
            return Err(e);
        }

        self.per_base.fold(&read.seq, &self.scores);
        let summary = SequenceSummary::compute(&read.seq, &self.scores);
        self.per_seq.fold(&summary);
        let hits = self.scanner.scan(&read.seq);
        self.adapters.fold(read.len(), &hits);
        Ok(())
    }

    fn decode_scores(&mut self, read: &Read) -> Result<(), QcError> {
        let offset = self.phred_offset;
        let max = self.max_quality;
        self.scores.clear();
        for (i, &b) in read.qual.iter().enumerate() {
            match b.checked_sub(offset) {
                Some(q) if q <= max => self.scores.push(q),
                _ => {
                    return Err(QcError::InvalidQualityScore {
                        record: read.index,
                        position: i + 1,
                        byte: b,
                        min: offset,
                        max: offset.saturating_add(max),
                    });
                }
            }
        }
        Ok(())
    }

    /// Build the report. Only the first call on an open engine succeeds.
    pub fn finalize(&mut self) -> Result<QcReport, QcError> {
        match self.state {
            State::Open => {}
            State::Finalized => return Err(QcError::AlreadyFinalized),
            State::Cancelled => return Err(QcError::Cancelled),
            State::Failed => return Err(QcError::EngineClosed),
        }
        self.state = State::Finalized;

        let bins = self.per_base.bins();
        let quality_sum: u64 = bins.iter().map(|b| b.sum).sum();
        let reaching: Vec<u64> = bins.iter().map(|b| b.count).collect();
        let ps = &self.per_seq;
        let mean_quality = if ps.total_bases == 0 {
            0.0
        } else {
            quality_sum as f64 / ps.total_bases as f64
        };

        let mut report = QcReport {
            file_name: self.file_name.clone(),
            encoding: encoding_name(self.phred_offset),
            phred_offset: self.phred_offset,
            basic: BasicStats {
                total_reads: ps.total_reads,
                total_bases: ps.total_bases,
                min_len: ps.min_len(),
                max_len: ps.max_len(),
                gc_percent: ps.gc_percent(),
                mean_quality,
                undefined_gc_reads: ps.undefined_gc_reads,
            },
            per_base_quality: self.per_base.quality_rows(),
            per_base_content: self.per_base.content_rows(),
            per_base_n: self.per_base.n_rows(),
            per_sequence_quality: ps.quality_rows(),
            gc_content: ps.gc_rows(),
            per_sequence_n: ps.n_rows(),
            length_distribution: ps.length_rows(),
            adapter_content: self.adapters.series(&reaching),
            verdicts: BTreeMap::new(),
        };
        report.evaluate(ps.mean_q_hist(), &self.thresholds);

        log::info!(
            "{}: {} reads, {} bases, overall {}",
            report.file_name,
            report.basic.total_reads,
            report.basic.total_bases,
            report.overall()
        );
        Ok(report)
    }
}

fn encoding_name(offset: u8) -> String {
    match offset {
        33 => "Sanger / Illumina 1.9".to_string(),
        64 => "Illumina 1.5".to_string(),
        other => format!("Phred+{other}"),
    }
}

/// Genuine progress: raw bytes against the known size, or reads alone when
/// the size is unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub reads: u64,
    pub bytes_consumed: u64,
    pub total_bytes: Option<u64>,
}

impl Progress {
    /// `None` while the total size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_consumed as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Runs one file from reader to report.
pub struct Analyzer<'a> {
    config: &'a QcConfig,
    cancel: CancellationToken,
    progress: Option<Box<dyn FnMut(Progress) + Send + 'a>>,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a QcConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: FnMut(Progress) + Send + 'a,
    {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn run_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Outcome, QcError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let reader = FastqReader::from_path(path, self.config.reader.clone())?;
        self.run(reader, &file_name)
    }

    pub fn run_reader<R>(
        &mut self,
        reader: R,
        file_name: &str,
        declared_size: Option<u64>,
    ) -> Result<Outcome, QcError>
    where
        R: io::Read + Send + 'static,
    {
        let reader = FastqReader::from_reader(reader, declared_size, self.config.reader.clone())?;
        self.run(reader, file_name)
    }

    pub fn run(&mut self, mut reader: FastqReader, file_name: &str) -> Result<Outcome, QcError> {
        let mut engine =
            QcEngine::new(file_name, self.config)?.with_cancellation(self.cancel.clone());
        let interval = self.config.progress_interval;
        let mut last = None;

        while let Some(rec) = reader.next() {
            let rec = rec?;
            match engine.fold(&rec) {
                Ok(()) => {}
                Err(QcError::Cancelled) => {
                    log::warn!("{file_name}: cancelled after {} reads", engine.reads_folded());
                    return Ok(Outcome::Cancelled);
                }
                Err(e) => return Err(e),
            }
            if engine.reads_folded() % interval == 0 {
                self.tick(&engine, &reader, &mut last);
            }
        }
        if self.cancel.is_cancelled() {
            log::warn!("{file_name}: cancelled at end of input");
            return Ok(Outcome::Cancelled);
        }
        self.tick(&engine, &reader, &mut last);
        engine.finalize().map(Outcome::Completed)
    }

    /// Report progress unless nothing moved since the previous report.
    fn tick(&mut self, engine: &QcEngine, reader: &FastqReader, last: &mut Option<Progress>) {
        let p = Progress {
            reads: engine.reads_folded(),
            bytes_consumed: reader.bytes_consumed(),
            total_bytes: reader.declared_size(),
        };
        if *last == Some(p) {
            return;
        }
        *last = Some(p);
        log::trace!(
            "{}: {} reads, {} bytes, fraction {:?}",
            engine.file_name(),
            p.reads,
            p.bytes_consumed,
            p.fraction()
        );
        if let Some(f) = self.progress.as_mut() {
            f(p);
        }
    }
}

/// Analyze one file with default cancellation and no progress callback.
pub fn analyze_path<P: AsRef<Path>>(path: P, config: &QcConfig) -> Result<Outcome, QcError> {
    Analyzer::new(config).run_path(path)
}
