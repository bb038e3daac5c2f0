//! Streaming FASTQ quality-control engine.
//!
//! - Plain and `.gz` input (magic-byte detection); other compressed
//!   envelopes are rejected up front.
//! - One streaming pass: per-base quality and composition, per-sequence
//!   quality/GC/length/N, adapter contamination.
//! - Immutable [`QcReport`] with a pass/warn/fail verdict per module and a
//!   serde/JSON form for a presentation layer.
//! - Cooperative cancellation, genuine progress, parallel batches.
//! - Optional async reader behind the `async` feature.
//!
//! ```no_run
//! use kira_fastq_qc::{QcConfig, analyze_path};
//!
//! let config = QcConfig::default();
//! let outcome = analyze_path("sample.fastq.gz", &config)?;
//! if let Some(report) = outcome.report() {
//!     println!("{}", report.to_json_pretty()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod adapter;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
mod framing;
pub mod per_base;
pub mod per_sequence;
pub mod policy;
pub mod reader;
pub mod record;
pub mod report;

#[cfg(feature = "async")]
pub mod async_reader;

pub use crate::adapter::{AdapterHit, AdapterScanner, AdapterSpec};
pub use crate::batch::{BatchInput, BatchResult, analyze_batch};
pub use crate::cancel::CancellationToken;
pub use crate::config::{AdapterTolerance, Limits, QcConfig, Thresholds};
pub use crate::engine::{Analyzer, Outcome, Progress, QcEngine, analyze_path};
pub use crate::envelope::Envelope;
pub use crate::error::{FormatError, IoContext, QcError};
pub use crate::policy::ReaderOptions;
pub use crate::reader::{FastqReader, Source};
pub use crate::record::Read;
pub use crate::report::{Module, QcReport, Verdict};

#[cfg(feature = "async")]
pub use crate::async_reader::{AsyncFastqReader, analyze_async};
