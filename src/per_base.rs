//! Per-position quality and base-composition statistics.
//!
//! Every position keeps its full quality histogram. Scores are bounded by
//! [`MAX_Q`], so percentiles come out exact and memory stays proportional to
//! the longest read, not to the number of reads.

use serde::Serialize;

/// Highest Phred score representable in printable ASCII with offset 33.
pub const MAX_Q: usize = 93;

pub type QualHist = [u64; MAX_Q + 1];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BaseCounts {
    pub a: u64,
    pub c: u64,
    pub g: u64,
    pub t: u64,
    pub n: u64,
}

impl BaseCounts {
    #[inline]
    fn add(&mut self, base: u8) {
        match base {
            b'A' => self.a += 1,
            b'C' => self.c += 1,
            b'G' => self.g += 1,
            b'T' => self.t += 1,
            _ => self.n += 1,
        }
    }

    pub fn called(&self) -> u64 {
        self.a + self.c + self.g + self.t
    }

    pub fn total(&self) -> u64 {
        self.called() + self.n
    }
}

/// Running aggregate for one base offset.
#[derive(Clone, Debug)]
pub struct PositionBin {
    pub count: u64,
    pub sum: u64,
    pub sum_sq: u64,
    pub hist: QualHist,
    pub bases: BaseCounts,
}

impl Default for PositionBin {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0,
            sum_sq: 0,
            hist: [0u64; MAX_Q + 1],
            bases: BaseCounts::default(),
        }
    }
}

impl PositionBin {
    #[inline]
    fn add(&mut self, base: u8, q: u8) {
        let q64 = q as u64;
        self.count += 1;
        self.sum += q64;
        self.sum_sq += q64 * q64;
        self.hist[q as usize] += 1;
        self.bases.add(base);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }

    /// Population standard deviation from the running sums.
    pub fn stddev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum as f64 / n;
        (self.sum_sq as f64 / n - mean * mean).max(0.0).sqrt()
    }
}

/// Smallest score whose cumulative count reaches `ceil(q * total)`.
pub fn quantile_from_hist(hist: &[u64], q: f64) -> u8 {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0;
    }
    let rank = ((q * total as f64).ceil() as u64).max(1);
    let mut cum: u64 = 0;
    for (i, &v) in hist.iter().enumerate() {
        cum += v;
        if cum >= rank {
            return i as u8;
        }
    }
    (hist.len() - 1) as u8
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerBaseQualRow {
    /// 1-based position.
    pub position: usize,
    pub count: u64,
    pub mean: f64,
    pub stddev: f64,
    pub p10: u8,
    pub lower_quartile: u8,
    pub median: u8,
    pub upper_quartile: u8,
    pub p90: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerBaseContentRow {
    pub position: usize,
    pub a: f64,
    pub c: f64,
    pub g: f64,
    pub t: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerBaseNRow {
    pub position: usize,
    pub n_percent: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PerBaseAccumulator {
    bins: Vec<PositionBin>,
}

impl PerBaseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `scores` are decoded Phred values, one per base, each `<= MAX_Q`.
    pub fn fold(&mut self, seq: &[u8], scores: &[u8]) {
        debug_assert_eq!(seq.len(), scores.len());
        if self.bins.len() < seq.len() {
            self.bins.resize_with(seq.len(), PositionBin::default);
        }
        for ((bin, &base), &q) in self.bins.iter_mut().zip(seq).zip(scores) {
            bin.add(base, q);
        }
    }

    pub fn bins(&self) -> &[PositionBin] {
        &self.bins
    }

    /// Reads that reach the given 1-based position.
    pub fn reads_reaching(&self, position: usize) -> u64 {
        position
            .checked_sub(1)
            .and_then(|i| self.bins.get(i))
            .map_or(0, |b| b.count)
    }

    pub fn quality_rows(&self) -> Vec<PerBaseQualRow> {
        self.bins
            .iter()
            .enumerate()
            .map(|(i, bin)| PerBaseQualRow {
                position: i + 1,
                count: bin.count,
                mean: bin.mean(),
                stddev: bin.stddev(),
                p10: quantile_from_hist(&bin.hist, 0.10),
                lower_quartile: quantile_from_hist(&bin.hist, 0.25),
                median: quantile_from_hist(&bin.hist, 0.50),
                upper_quartile: quantile_from_hist(&bin.hist, 0.75),
                p90: quantile_from_hist(&bin.hist, 0.90),
            })
            .collect()
    }

    /// Percentages over called (non-N) bases.
    pub fn content_rows(&self) -> Vec<PerBaseContentRow> {
        self.bins
            .iter()
            .enumerate()
            .map(|(i, bin)| {
                let bc = &bin.bases;
                let denom = bc.called();
                let pct = |v: u64| {
                    if denom == 0 {
                        0.0
                    } else {
                        v as f64 * 100.0 / denom as f64
                    }
                };
                PerBaseContentRow {
                    position: i + 1,
                    a: pct(bc.a),
                    c: pct(bc.c),
                    g: pct(bc.g),
                    t: pct(bc.t),
                }
            })
            .collect()
    }

    pub fn n_rows(&self) -> Vec<PerBaseNRow> {
        self.bins
            .iter()
            .enumerate()
            .map(|(i, bin)| {
                let total = bin.bases.total();
                let n_percent = if total == 0 {
                    0.0
                } else {
                    bin.bases.n as f64 * 100.0 / total as f64
                };
                PerBaseNRow {
                    position: i + 1,
                    n_percent,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_use_ceiling_rank() {
        let mut hist = [0u64; MAX_Q + 1];
        hist[10] = 1;
        hist[20] = 2;
        hist[30] = 1;
        assert_eq!(quantile_from_hist(&hist, 0.25), 10);
        assert_eq!(quantile_from_hist(&hist, 0.50), 20);
        assert_eq!(quantile_from_hist(&hist, 0.75), 20);
        assert_eq!(quantile_from_hist(&hist, 0.90), 30);
    }

    #[test]
    fn empty_hist_is_zero() {
        let hist = [0u64; MAX_Q + 1];
        assert_eq!(quantile_from_hist(&hist, 0.5), 0);
    }

    #[test]
    fn shorter_reads_leave_later_bins_alone() {
        let mut acc = PerBaseAccumulator::new();
        acc.fold(b"ACGT", &[30, 30, 30, 30]);
        acc.fold(b"AC", &[10, 20]);
        assert_eq!(acc.reads_reaching(1), 2);
        assert_eq!(acc.reads_reaching(3), 1);
        assert_eq!(acc.reads_reaching(5), 0);
        let rows = acc.quality_rows();
        assert_eq!(rows[0].mean, 20.0);
        assert_eq!(rows[0].stddev, 10.0);
        assert_eq!(rows[3].mean, 30.0);
    }
}
