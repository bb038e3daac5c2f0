//! Several files analyzed in parallel.
//!
//! Every file is an independent job: a worker pulls it off a channel, builds
//! its own engine and sends back one result. Nothing mutable is shared
//! between workers apart from the cancellation flag, and one file's failure
//! leaves the others running.

use crate::cancel::CancellationToken;
use crate::config::QcConfig;
use crate::engine::{Analyzer, Outcome};
use crate::error::QcError;
use crossbeam_channel as channel;
use std::io;
use std::path::PathBuf;
use std::thread;

pub enum BatchSource {
    Path(PathBuf),
    Reader {
        reader: Box<dyn io::Read + Send>,
        declared_size: Option<u64>,
    },
}

pub struct BatchInput {
    pub name: String,
    pub source: BatchSource,
}

impl BatchInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: BatchSource::Path(path),
        }
    }

    pub fn reader<R>(name: impl Into<String>, reader: R, declared_size: Option<u64>) -> Self
    where
        R: io::Read + Send + 'static,
    {
        Self {
            name: name.into(),
            source: BatchSource::Reader {
                reader: Box::new(reader),
                declared_size,
            },
        }
    }
}

#[derive(Debug)]
pub struct BatchResult {
    /// Position of the input in the submitted batch.
    pub index: usize,
    pub name: String,
    pub result: Result<Outcome, QcError>,
}

/// Worker count used when the caller passes zero.
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// Analyze all inputs on up to `threads` workers. Results come back in input
/// order, one per input.
pub fn analyze_batch(
    inputs: Vec<BatchInput>,
    config: &QcConfig,
    threads: usize,
    cancel: &CancellationToken,
) -> Vec<BatchResult> {
    let total = inputs.len();
    if total == 0 {
        return Vec::new();
    }
    let threads = if threads == 0 { default_threads() } else { threads };
    let workers = threads.min(total);
    log::debug!("batch of {total} files on {workers} workers");

    let (job_tx, job_rx) = channel::unbounded::<(usize, BatchInput)>();
    let (result_tx, result_rx) = channel::unbounded::<BatchResult>();
    for job in inputs.into_iter().enumerate() {
        // receiver is alive until the scope below ends
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|s| {
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            let cancel = cancel.clone();
            s.spawn(move || {
                for (index, input) in rx.iter() {
                    let name = input.name.clone();
                    let result = run_one(input, config, &cancel);
                    if let Err(e) = &result {
                        log::warn!("{name}: analysis failed: {e}");
                    }
                    let msg = BatchResult {
                        index,
                        name,
                        result,
                    };
                    if tx.send(msg).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut parts: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
    for r in result_rx.iter() {
        let i = r.index;
        parts[i] = Some(r);
    }
    parts.into_iter().flatten().collect()
}

fn run_one(
    input: BatchInput,
    config: &QcConfig,
    cancel: &CancellationToken,
) -> Result<Outcome, QcError> {
    let mut analyzer = Analyzer::new(config).cancellation(cancel.clone());
    match input.source {
        BatchSource::Path(path) => analyzer.run_path(&path),
        BatchSource::Reader {
            reader,
            declared_size,
        } => analyzer.run_reader(reader, &input.name, declared_size),
    }
}
