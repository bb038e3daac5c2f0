use crate::per_base::MAX_Q;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-read summary, computed per read and folded away immediately.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequenceSummary {
    pub length: usize,
    /// `None` for an empty read.
    pub mean_quality: Option<f64>,
    /// 0.0 when `gc_defined` is false.
    pub gc_fraction: f64,
    pub gc_defined: bool,
    pub gc_count: usize,
    pub n_count: usize,
}

impl SequenceSummary {
    /// `scores` are decoded Phred values aligned with `seq`.
    pub fn compute(seq: &[u8], scores: &[u8]) -> Self {
        let length = seq.len();
        let mut gc_count = 0usize;
        let mut n_count = 0usize;
        for &b in seq {
            match b {
                b'G' | b'C' => gc_count += 1,
                b'N' => n_count += 1,
                _ => {}
            }
        }
        if length == 0 {
            return Self {
                length,
                mean_quality: None,
                gc_fraction: 0.0,
                gc_defined: false,
                gc_count,
                n_count,
            };
        }
        let sum: u64 = scores.iter().map(|&q| q as u64).sum();
        Self {
            length,
            mean_quality: Some(sum as f64 / length as f64),
            gc_fraction: gc_count as f64 / length as f64,
            gc_defined: true,
            gc_count,
            n_count,
        }
    }

    pub fn n_fraction(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            self.n_count as f64 / self.length as f64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerSeqQualRow {
    pub mean_quality: u8,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerSeqGcRow {
    pub gc_percent: u8,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LengthDistRow {
    pub length: usize,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerSeqNRow {
    pub n_percent: u8,
    pub count: u64,
}

#[derive(Clone, Debug)]
pub struct PerSequenceAccumulator {
    pub total_reads: u64,
    pub total_bases: u64,
    pub gc_bases: u64,
    pub n_bases: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub undefined_gc_reads: u64,
    length_hist: BTreeMap<usize, u64>,
    gc_hist: [u64; 101],
    mean_q_hist: [u64; MAX_Q + 1],
    n_hist: [u64; 101],
}

impl Default for PerSequenceAccumulator {
    fn default() -> Self {
        Self {
            total_reads: 0,
            total_bases: 0,
            gc_bases: 0,
            n_bases: 0,
            min_len: usize::MAX,
            max_len: 0,
            undefined_gc_reads: 0,
            length_hist: BTreeMap::new(),
            gc_hist: [0u64; 101],
            mean_q_hist: [0u64; MAX_Q + 1],
            n_hist: [0u64; 101],
        }
    }
}

/// Round a fraction in `0..=1` to an integer percent bucket.
#[inline]
fn percent_bucket(fraction: f64) -> usize {
    ((fraction * 100.0).round() as usize).min(100)
}

impl PerSequenceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, s: &SequenceSummary) {
        self.total_reads += 1;
        self.total_bases += s.length as u64;
        self.gc_bases += s.gc_count as u64;
        self.n_bases += s.n_count as u64;
        self.min_len = self.min_len.min(s.length);
        self.max_len = self.max_len.max(s.length);
        *self.length_hist.entry(s.length).or_insert(0) += 1;

        if !s.gc_defined {
            self.undefined_gc_reads += 1;
            return;
        }
        self.gc_hist[percent_bucket(s.gc_fraction)] += 1;
        self.n_hist[percent_bucket(s.n_fraction())] += 1;
        if let Some(mean) = s.mean_quality {
            let bin = (mean.round() as usize).min(MAX_Q);
            self.mean_q_hist[bin] += 1;
        }
    }

    pub fn min_len(&self) -> usize {
        if self.total_reads == 0 { 0 } else { self.min_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Overall GC percent across all bases.
    pub fn gc_percent(&self) -> f64 {
        if self.total_bases == 0 {
            0.0
        } else {
            self.gc_bases as f64 * 100.0 / self.total_bases as f64
        }
    }

    pub fn gc_hist(&self) -> &[u64; 101] {
        &self.gc_hist
    }

    pub fn mean_q_hist(&self) -> &[u64; MAX_Q + 1] {
        &self.mean_q_hist
    }

    pub fn length_hist(&self) -> &BTreeMap<usize, u64> {
        &self.length_hist
    }

    pub fn quality_rows(&self) -> Vec<PerSeqQualRow> {
        self.mean_q_hist
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(q, &count)| PerSeqQualRow {
                mean_quality: q as u8,
                count,
            })
            .collect()
    }

    pub fn gc_rows(&self) -> Vec<PerSeqGcRow> {
        self.gc_hist
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(gc, &count)| PerSeqGcRow {
                gc_percent: gc as u8,
                count,
            })
            .collect()
    }

    pub fn length_rows(&self) -> Vec<LengthDistRow> {
        self.length_hist
            .iter()
            .map(|(&length, &count)| LengthDistRow { length, count })
            .collect()
    }

    pub fn n_rows(&self) -> Vec<PerSeqNRow> {
        self.n_hist
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(n, &count)| PerSeqNRow {
                n_percent: n as u8,
                count,
            })
            .collect()
    }
}
