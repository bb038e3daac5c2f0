use crate::adapter::AdapterSeries;
use crate::config::Thresholds;
use crate::per_base::{PerBaseContentRow, PerBaseNRow, PerBaseQualRow};
use crate::per_sequence::{LengthDistRow, PerSeqGcRow, PerSeqNRow, PerSeqQualRow};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl Verdict {
    pub fn as_str_lower(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Warn => "warn",
            Verdict::Fail => "fail",
        }
    }

    pub fn as_str_upper(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Warn => "WARN",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str_lower())
    }
}

/// Analysis modules, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    BasicStatistics,
    PerBaseQuality,
    PerSequenceQuality,
    PerBaseContent,
    GcContent,
    NContent,
    LengthDistribution,
    AdapterContent,
}

impl Module {
    pub const ALL: [Module; 8] = [
        Module::BasicStatistics,
        Module::PerBaseQuality,
        Module::PerSequenceQuality,
        Module::PerBaseContent,
        Module::GcContent,
        Module::NContent,
        Module::LengthDistribution,
        Module::AdapterContent,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Module::BasicStatistics => "Basic Statistics",
            Module::PerBaseQuality => "Per base sequence quality",
            Module::PerSequenceQuality => "Per sequence quality scores",
            Module::PerBaseContent => "Per base sequence content",
            Module::GcContent => "Per sequence GC content",
            Module::NContent => "Per base N content",
            Module::LengthDistribution => "Sequence Length Distribution",
            Module::AdapterContent => "Adapter Content",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BasicStats {
    pub total_reads: u64,
    pub total_bases: u64,
    pub min_len: usize,
    pub max_len: usize,
    pub gc_percent: f64,
    pub mean_quality: f64,
    /// Empty reads, for which GC is undefined and reported as zero.
    pub undefined_gc_reads: u64,
}

/// Final, immutable result of one file's analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QcReport {
    pub file_name: String,
    pub encoding: String,
    pub phred_offset: u8,
    pub basic: BasicStats,
    pub per_base_quality: Vec<PerBaseQualRow>,
    pub per_base_content: Vec<PerBaseContentRow>,
    pub per_base_n: Vec<PerBaseNRow>,
    pub per_sequence_quality: Vec<PerSeqQualRow>,
    pub gc_content: Vec<PerSeqGcRow>,
    pub per_sequence_n: Vec<PerSeqNRow>,
    pub length_distribution: Vec<LengthDistRow>,
    pub adapter_content: Vec<AdapterSeries>,
    pub verdicts: BTreeMap<Module, Verdict>,
}

impl QcReport {
    pub fn verdict(&self, module: Module) -> Verdict {
        self.verdicts.get(&module).copied().unwrap_or(Verdict::Pass)
    }

    /// Worst verdict across modules.
    pub fn overall(&self) -> Verdict {
        self.verdicts
            .values()
            .copied()
            .max()
            .unwrap_or(Verdict::Pass)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain nested-mapping form for transport.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// `VERDICT\tModule title\tfile name`, one line per module.
    pub fn summary_lines(&self) -> Vec<String> {
        self.verdicts
            .iter()
            .map(|(m, v)| format!("{}\t{}\t{}", v.as_str_upper(), m.title(), self.file_name))
            .collect()
    }

    pub(crate) fn evaluate(&mut self, mean_q_hist: &[u64], t: &Thresholds) {
        let mut v = BTreeMap::new();

        v.insert(
            Module::BasicStatistics,
            if self.basic.total_reads == 0 {
                Verdict::Fail
            } else {
                Verdict::Pass
            },
        );

        let lowest_mean = self
            .per_base_quality
            .iter()
            .map(|r| r.mean)
            .reduce(f64::min);
        v.insert(
            Module::PerBaseQuality,
            lowest_mean.map_or(Verdict::Pass, |m| t.per_base_quality.below(m)),
        );

        v.insert(
            Module::PerSequenceQuality,
            mode(mean_q_hist).map_or(Verdict::Pass, |q| t.per_sequence_quality.below(q as f64)),
        );

        let max_imbalance = self
            .per_base_content
            .iter()
            .filter(|r| r.a + r.c + r.g + r.t > 0.0)
            .map(|r| (r.a - r.t).abs().max((r.g - r.c).abs()))
            .fold(0.0, f64::max);
        v.insert(Module::PerBaseContent, t.per_base_content.above(max_imbalance));

        v.insert(
            Module::GcContent,
            t.gc_content.above(gc_deviation_percent(&self.gc_content)),
        );

        let max_n = self
            .per_base_n
            .iter()
            .map(|r| r.n_percent)
            .fold(0.0, f64::max);
        v.insert(Module::NContent, t.n_content.above(max_n));

        let length_verdict = if self.basic.total_reads > 0 && self.basic.min_len == 0 {
            Verdict::Fail
        } else if self.length_distribution.len() > 1 {
            Verdict::Warn
        } else {
            Verdict::Pass
        };
        v.insert(Module::LengthDistribution, length_verdict);

        let max_adapter = self
            .adapter_content
            .iter()
            .map(AdapterSeries::max_cumulative_percent)
            .fold(0.0, f64::max);
        v.insert(Module::AdapterContent, t.adapter_content.above(max_adapter));

        self.verdicts = v;
    }
}

/// Most populated bucket; lowest index on ties.
fn mode(hist: &[u64]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, &c) in hist.iter().enumerate() {
        if c > 0 && best.is_none_or(|(_, bc)| c > bc) {
            best = Some((i, c));
        }
    }
    best.map(|(i, _)| i)
}

/// Percent of reads that fall outside a normal curve fitted to the GC
/// histogram (mean and deviation taken from the data itself).
pub fn gc_deviation_percent(rows: &[PerSeqGcRow]) -> f64 {
    let total: u64 = rows.iter().map(|r| r.count).sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let mean = rows
        .iter()
        .map(|r| r.gc_percent as f64 * r.count as f64)
        .sum::<f64>()
        / n;
    let var = rows
        .iter()
        .map(|r| {
            let d = r.gc_percent as f64 - mean;
            d * d * r.count as f64
        })
        .sum::<f64>()
        / n;
    let sd = var.sqrt();

    let mut observed = [0f64; 101];
    for r in rows {
        observed[r.gc_percent as usize] = r.count as f64;
    }

    let mut expected = [0f64; 101];
    if sd == 0.0 {
        expected[mean.round() as usize] = n;
    } else {
        let mut norm = 0.0;
        for (i, e) in expected.iter_mut().enumerate() {
            let z = (i as f64 - mean) / sd;
            *e = (-0.5 * z * z).exp();
            norm += *e;
        }
        for e in expected.iter_mut() {
            *e *= n / norm;
        }
    }

    let diff: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e).abs())
        .sum();
    diff * 100.0 / n
}
