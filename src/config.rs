//! Engine configuration.
//!
//! Every knob has a default, and a partial JSON document overrides only the
//! fields it names:
//!
//! ```json
//! { "phred_offset": 64, "thresholds": { "adapter_content": { "warn": 2.0, "fail": 5.0 } } }
//! ```

use crate::adapter::{AdapterSpec, default_catalog};
use crate::error::QcError;
use crate::per_base::MAX_Q;
use crate::policy::ReaderOptions;
use crate::report::Verdict;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A warn/fail pair on one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub warn: f64,
    pub fail: f64,
}

impl Limits {
    pub const fn new(warn: f64, fail: f64) -> Self {
        Self { warn, fail }
    }

    /// Lower values are worse: `fail` if `value < fail`, `warn` if `value < warn`.
    pub fn below(&self, value: f64) -> Verdict {
        if value < self.fail {
            Verdict::Fail
        } else if value < self.warn {
            Verdict::Warn
        } else {
            Verdict::Pass
        }
    }

    /// Higher values are worse: `fail` if `value > fail`, `warn` if `value > warn`.
    pub fn above(&self, value: f64) -> Verdict {
        if value > self.fail {
            Verdict::Fail
        } else if value > self.warn {
            Verdict::Warn
        } else {
            Verdict::Pass
        }
    }
}

/// Per-module verdict thresholds.
///
/// | module                | metric                                            | default warn / fail |
/// |-----------------------|---------------------------------------------------|---------------------|
/// | per-base quality      | lowest per-position mean quality (lower is worse) | 25 / 20             |
/// | per-sequence quality  | most common read mean quality (lower is worse)    | 27 / 20             |
/// | per-base composition  | max `abs(A-T)` or `abs(G-C)` percent at a position | 10 / 20            |
/// | GC content            | percent of reads off a normal fit of the GC curve | 15 / 30             |
/// | N content             | max per-position N percent                        | 5 / 20              |
/// | adapter content       | max cumulative adapter percent at a position      | 5 / 10              |
///
/// Basic statistics fails only on an empty file. Length distribution warns
/// when reads differ in length and fails when any read is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub per_base_quality: Limits,
    pub per_sequence_quality: Limits,
    pub per_base_content: Limits,
    pub gc_content: Limits,
    pub n_content: Limits,
    pub adapter_content: Limits,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            per_base_quality: Limits::new(25.0, 20.0),
            per_sequence_quality: Limits::new(27.0, 20.0),
            per_base_content: Limits::new(10.0, 20.0),
            gc_content: Limits::new(15.0, 30.0),
            n_content: Limits::new(5.0, 20.0),
            adapter_content: Limits::new(5.0, 10.0),
        }
    }
}

/// How far an adapter window may diverge and still count as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterTolerance {
    /// Mismatches allowed per base of overlap, rounded down.
    pub max_mismatch_rate: f64,
    /// Shortest overlap considered; capped at each adapter's own length.
    pub min_overlap: usize,
}

impl Default for AdapterTolerance {
    fn default() -> Self {
        Self {
            max_mismatch_rate: 0.10,
            min_overlap: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    pub phred_offset: u8,
    /// Highest accepted decoded score.
    pub max_quality: u8,
    pub adapters: Vec<AdapterSpec>,
    pub adapter_tolerance: AdapterTolerance,
    pub thresholds: Thresholds,
    pub reader: ReaderOptions,
    /// Reads between progress callbacks.
    pub progress_interval: u64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            phred_offset: 33,
            max_quality: 41,
            adapters: default_catalog(),
            adapter_tolerance: AdapterTolerance::default(),
            thresholds: Thresholds::default(),
            reader: ReaderOptions::default(),
            progress_interval: 100_000,
        }
    }
}

impl QcConfig {
    pub fn from_json_str(s: &str) -> Result<Self, QcError> {
        let cfg: QcConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, QcError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            QcError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), QcError> {
        if self.phred_offset == 0 {
            return Err(QcError::InvalidConfig("phred_offset must be > 0".into()));
        }
        if self.max_quality as usize > MAX_Q {
            return Err(QcError::InvalidConfig(format!(
                "max_quality {} exceeds {MAX_Q}",
                self.max_quality
            )));
        }
        if self.phred_offset as u16 + self.max_quality as u16 > 126 {
            return Err(QcError::InvalidConfig(format!(
                "phred_offset {} + max_quality {} leaves printable ASCII",
                self.phred_offset, self.max_quality
            )));
        }
        let tol = &self.adapter_tolerance;
        if !(0.0..=1.0).contains(&tol.max_mismatch_rate) {
            return Err(QcError::InvalidConfig(format!(
                "adapter max_mismatch_rate {} outside 0..=1",
                tol.max_mismatch_rate
            )));
        }
        if tol.min_overlap == 0 {
            return Err(QcError::InvalidConfig(
                "adapter min_overlap must be > 0".into(),
            ));
        }
        for a in &self.adapters {
            if a.sequence.is_empty() {
                return Err(QcError::InvalidConfig(format!(
                    "adapter '{}' has an empty sequence",
                    a.name
                )));
            }
        }
        if self.reader.max_line_bytes == 0 {
            return Err(QcError::InvalidConfig(
                "reader max_line_bytes must be > 0".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(QcError::InvalidConfig(
                "progress_interval must be > 0".into(),
            ));
        }

        let t = &self.thresholds;
        for (name, l) in [
            ("per_base_quality", t.per_base_quality),
            ("per_sequence_quality", t.per_sequence_quality),
        ] {
            if l.fail > l.warn {
                return Err(QcError::InvalidConfig(format!(
                    "{name}: fail ({}) must not exceed warn ({})",
                    l.fail, l.warn
                )));
            }
        }
        for (name, l) in [
            ("per_base_content", t.per_base_content),
            ("gc_content", t.gc_content),
            ("n_content", t.n_content),
            ("adapter_content", t.adapter_content),
        ] {
            if l.warn > l.fail {
                return Err(QcError::InvalidConfig(format!(
                    "{name}: warn ({}) must not exceed fail ({})",
                    l.warn, l.fail
                )));
            }
        }
        Ok(())
    }
}
