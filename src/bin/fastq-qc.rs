use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use kira_fastq_qc::batch::{BatchInput, analyze_batch, default_threads};
use kira_fastq_qc::envelope::has_fastq_suffix;
use kira_fastq_qc::{CancellationToken, Outcome, QcConfig, QcReport};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fastq-qc", version, about = "Streaming QC for plain and gzipped FASTQ")]
struct Cli {
    /// FASTQ files (.fastq, .fq, optionally .gz)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON configuration; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = default_threads())]
    threads: usize,

    #[arg(long, value_enum)]
    phred_offset: Option<PhredOffsetArg>,

    /// Reject inputs larger than this many bytes
    #[arg(long, conflicts_with = "no_size_limit")]
    max_size: Option<u64>,

    #[arg(long, default_value_t = false)]
    no_size_limit: bool,

    /// Write `<file>.qc.json` into this directory instead of printing
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Print only `VERDICT<TAB>module<TAB>file` lines
    #[arg(long, default_value_t = false)]
    summary: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PhredOffsetArg {
    #[value(name = "33")]
    P33,
    #[value(name = "64")]
    P64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.threads == 0 {
        bail!("--threads must be >= 1");
    }

    let mut config = match &cli.config {
        Some(path) => QcConfig::from_json_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => QcConfig::default(),
    };
    if let Some(p) = cli.phred_offset {
        config.phred_offset = match p {
            PhredOffsetArg::P33 => 33,
            PhredOffsetArg::P64 => 64,
        };
    }
    if cli.no_size_limit {
        config.reader.max_input_bytes = None;
    } else if let Some(limit) = cli.max_size {
        config.reader.max_input_bytes = Some(limit);
    }
    config.validate()?;

    if let Some(out) = &cli.out {
        fs::create_dir_all(out)
            .with_context(|| format!("failed to create output dir {}", out.display()))?;
    }

    let mut inputs = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        if !path.is_file() {
            bail!("input file not found: {}", path.display());
        }
        let name = path.file_name().map(|s| s.to_string_lossy().into_owned());
        if !name.as_deref().is_some_and(has_fastq_suffix) {
            log::warn!(
                "{}: unexpected file extension, sniffing content anyway",
                path.display()
            );
        }
        if let Ok(meta) = fs::metadata(path) {
            log::info!("{}: {}", path.display(), format_size(meta.len()));
        }
        inputs.push(BatchInput::path(path));
    }

    let cancel = CancellationToken::new();
    let results = analyze_batch(inputs, &config, cli.threads, &cancel);

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    let out_names = report_file_names(&names);

    let mut failed = 0usize;
    for (r, out_name) in results.iter().zip(&out_names) {
        match &r.result {
            Ok(Outcome::Completed(report)) => {
                if let Err(e) = emit(&cli, report, out_name) {
                    failed += 1;
                    eprintln!("{}: {e:#}", r.name);
                }
            }
            Ok(Outcome::Cancelled) => eprintln!("{}: cancelled", r.name),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", r.name);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} file(s) failed");
    }
    Ok(())
}

fn emit(cli: &Cli, report: &QcReport, out_name: &str) -> Result<()> {
    if cli.summary {
        for line in report.summary_lines() {
            println!("{line}");
        }
        return Ok(());
    }
    let json = if cli.pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    match &cli.out {
        Some(dir) => {
            let path = dir.join(out_name);
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

/// `<file>.qc.json` per input; names shared by several inputs also carry
/// the 1-based input position.
fn report_file_names(names: &[&str]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for n in names {
        *seen.entry(*n).or_default() += 1;
    }
    names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            if seen[n] > 1 {
                format!("{n}.{}.qc.json", i + 1)
            } else {
                format!("{n}.qc.json")
            }
        })
        .collect()
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let i = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let i = i.min(UNITS.len() - 1);
    let v = bytes as f64 / 1024f64.powi(i as i32);
    format!("{:.2} {}", v, UNITS[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_names_get_distinct_reports() {
        let names = ["a.fq", "b.fq", "a.fq"];
        assert_eq!(
            report_file_names(&names),
            ["a.fq.1.qc.json", "b.fq.qc.json", "a.fq.3.qc.json"]
        );
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512.00 Bytes");
        assert_eq!(format_size(100 * 1024 * 1024), "100.00 MB");
    }
}
