//! Adapter contamination.
//!
//! Adapters usually show up as a partial overlap at the 3' end of a read:
//! the read runs off the insert into the adapter's leading bases. For every
//! read offset the scanner lines the adapter's start up with that offset and
//! compares as many bases as both have left, so a hit near the end of the
//! read can be a short prefix of the adapter. Comparison is Hamming distance
//! with a per-overlap mismatch budget; `N` never matches.

use crate::config::AdapterTolerance;
use serde::{Deserialize, Serialize};

/// Named adapter sequence as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSpec {
    pub name: String,
    pub sequence: String,
}

impl AdapterSpec {
    pub fn new(name: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }
}

pub const ILLUMINA_UNIVERSAL: &str = "AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";
pub const ILLUMINA_SMALL_RNA_3P: &str = "TGGAATTCTCGGGTGCCAAGG";
pub const ILLUMINA_SMALL_RNA_5P: &str = "GTTCAGAGTTCTACAGTCCGACGATC";
pub const NEXTERA_TRANSPOSASE: &str = "CTGTCTCTTATACACATCT";
pub const SOLID_SMALL_RNA: &str = "CGCCTTGGCCGTACAGCAG";
pub const POLY_A: &str = "AAAAAAAAAAAAAAAAAAAA";

pub fn default_catalog() -> Vec<AdapterSpec> {
    vec![
        AdapterSpec::new("Illumina Universal Adapter", ILLUMINA_UNIVERSAL),
        AdapterSpec::new("Illumina Small RNA 3' Adapter", ILLUMINA_SMALL_RNA_3P),
        AdapterSpec::new("Illumina Small RNA 5' Adapter", ILLUMINA_SMALL_RNA_5P),
        AdapterSpec::new("Nextera Transposase Sequence", NEXTERA_TRANSPOSASE),
        AdapterSpec::new("SOLiD Small RNA Adapter", SOLID_SMALL_RNA),
        AdapterSpec::new("PolyA", POLY_A),
    ]
}

/// Best alignment of one adapter within one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterHit {
    /// Index into the scanner's catalog.
    pub adapter: usize,
    pub name: String,
    /// 0-based start offset in the read.
    pub offset: usize,
    pub overlap: usize,
    pub mismatches: usize,
    /// `overlap - mismatches`.
    pub score: usize,
}

#[derive(Debug, Clone)]
struct Adapter {
    name: String,
    seq: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AdapterScanner {
    adapters: Vec<Adapter>,
    tolerance: AdapterTolerance,
}

impl AdapterScanner {
    pub fn new(catalog: &[AdapterSpec], tolerance: AdapterTolerance) -> Self {
        let adapters = catalog
            .iter()
            .map(|a| Adapter {
                name: a.name.clone(),
                seq: a.sequence.to_ascii_uppercase().into_bytes(),
            })
            .collect();
        Self {
            adapters,
            tolerance,
        }
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.name.as_str())
    }

    pub fn tolerance(&self) -> AdapterTolerance {
        self.tolerance
    }

    /// At most one hit per catalog entry, in catalog order.
    pub fn scan(&self, seq: &[u8]) -> Vec<AdapterHit> {
        (0..self.adapters.len())
            .filter_map(|i| self.best_hit(i, seq))
            .collect()
    }

    fn allowed_mismatches(&self, overlap: usize) -> usize {
        (overlap as f64 * self.tolerance.max_mismatch_rate + 1e-9).floor() as usize
    }

    fn best_hit(&self, idx: usize, seq: &[u8]) -> Option<AdapterHit> {
        let adapter = &self.adapters[idx].seq;
        let min_overlap = self.tolerance.min_overlap.min(adapter.len());
        if min_overlap == 0 || seq.len() < min_overlap {
            return None;
        }

        // (offset, overlap, mismatches)
        let mut best: Option<(usize, usize, usize)> = None;
        for offset in 0..=seq.len() - min_overlap {
            let overlap = adapter.len().min(seq.len() - offset);
            let allowed = self.allowed_mismatches(overlap);
            let Some(mismatches) =
                bounded_hamming(&seq[offset..offset + overlap], &adapter[..overlap], allowed)
            else {
                continue;
            };
            let score = overlap - mismatches;
            if best.is_none_or(|(_, o, m)| score > o - m) {
                best = Some((offset, overlap, mismatches));
            }
        }

        best.map(|(offset, overlap, mismatches)| AdapterHit {
            adapter: idx,
            name: self.adapters[idx].name.clone(),
            offset,
            overlap,
            mismatches,
            score: overlap - mismatches,
        })
    }
}

/// Mismatch count, or `None` as soon as it exceeds `allowed`.
#[inline]
fn bounded_hamming(read: &[u8], adapter: &[u8], allowed: usize) -> Option<usize> {
    let mut mismatches = 0usize;
    for (&r, &a) in read.iter().zip(adapter) {
        if r != a || r == b'N' {
            mismatches += 1;
            if mismatches > allowed {
                return None;
            }
        }
    }
    Some(mismatches)
}

/// One position of one adapter's contamination curve.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdapterPoint {
    /// 1-based position.
    pub position: usize,
    /// Reads long enough to reach this position.
    pub reads: u64,
    /// Hits starting here.
    pub hits: u64,
    pub hit_percent: f64,
    /// Reads reaching here whose hit starts here or earlier.
    pub cumulative_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdapterSeries {
    pub name: String,
    pub reads_with_hit: u64,
    pub points: Vec<AdapterPoint>,
}

impl AdapterSeries {
    pub fn max_cumulative_percent(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.cumulative_percent)
            .fold(0.0, f64::max)
    }
}

/// Per adapter, per position hit counts.
#[derive(Clone, Debug)]
pub struct AdapterContent {
    names: Vec<String>,
    starts: Vec<Vec<u64>>,
    // +1 at the hit offset, -1 at the read end; prefix sums give coverage
    cover_delta: Vec<Vec<i64>>,
    reads_with_hit: Vec<u64>,
}

impl AdapterContent {
    pub fn new(scanner: &AdapterScanner) -> Self {
        let n = scanner.len();
        Self {
            names: scanner.names().map(str::to_string).collect(),
            starts: vec![Vec::new(); n],
            cover_delta: vec![Vec::new(); n],
            reads_with_hit: vec![0; n],
        }
    }

    pub fn fold(&mut self, read_len: usize, hits: &[AdapterHit]) {
        for hit in hits {
            let i = hit.adapter;
            let starts = &mut self.starts[i];
            if starts.len() < read_len {
                starts.resize(read_len, 0);
            }
            starts[hit.offset] += 1;

            let delta = &mut self.cover_delta[i];
            if delta.len() < read_len + 1 {
                delta.resize(read_len + 1, 0);
            }
            delta[hit.offset] += 1;
            delta[read_len] -= 1;

            self.reads_with_hit[i] += 1;
        }
    }

    /// `reaching[i]` is the number of reads covering 0-based offset `i`.
    pub fn series(&self, reaching: &[u64]) -> Vec<AdapterSeries> {
        let pct = |v: u64, d: u64| {
            if d == 0 {
                0.0
            } else {
                v as f64 * 100.0 / d as f64
            }
        };
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut covered: i64 = 0;
                let points = reaching
                    .iter()
                    .enumerate()
                    .map(|(pos, &reads)| {
                        covered += self.cover_delta[i].get(pos).copied().unwrap_or(0);
                        let hits = self.starts[i].get(pos).copied().unwrap_or(0);
                        AdapterPoint {
                            position: pos + 1,
                            reads,
                            hits,
                            hit_percent: pct(hits, reads),
                            cumulative_percent: pct(covered.max(0) as u64, reads),
                        }
                    })
                    .collect();
                AdapterSeries {
                    name: name.clone(),
                    reads_with_hit: self.reads_with_hit[i],
                    points,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(seq: &str) -> AdapterScanner {
        AdapterScanner::new(
            &[AdapterSpec::new("test", seq)],
            AdapterTolerance::default(),
        )
    }

    #[test]
    fn budget_rounds_down() {
        let s = scanner("ACGT");
        assert_eq!(s.allowed_mismatches(9), 0);
        assert_eq!(s.allowed_mismatches(10), 1);
        assert_eq!(s.allowed_mismatches(30), 3);
    }

    #[test]
    fn n_is_a_mismatch() {
        assert_eq!(bounded_hamming(b"NNAC", b"NNAC", 4), Some(2));
        assert_eq!(bounded_hamming(b"NNAC", b"NNAC", 1), None);
    }

    #[test]
    fn coverage_ends_at_read_end() {
        let s = scanner("AGATCGGAAGAGC");
        let mut content = AdapterContent::new(&s);
        let hit = AdapterHit {
            adapter: 0,
            name: "test".into(),
            offset: 2,
            overlap: 4,
            mismatches: 0,
            score: 4,
        };
        content.fold(6, std::slice::from_ref(&hit));
        let series = content.series(&[2, 2, 2, 2, 2, 2, 1, 1]);
        let cum: Vec<f64> = series[0]
            .points
            .iter()
            .map(|p| p.cumulative_percent)
            .collect();
        assert_eq!(cum, vec![0.0, 0.0, 50.0, 50.0, 50.0, 50.0, 0.0, 0.0]);
        assert_eq!(series[0].points[2].hits, 1);
    }
}
