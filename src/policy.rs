use serde::{Deserialize, Serialize};

/// Upload limit of the front end this engine sits behind.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 100 * 1024 * 1024;

/// Longest accepted line, terminator excluded. Leaves room for long-read
/// sequence and quality lines.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Report '>' headers as FASTA rather than as a generic missing '@'.
    pub fastq_only: bool,
    /// Raw (possibly compressed) byte limit; `None` disables the check.
    pub max_input_bytes: Option<u64>,
    /// Bound on a single line after decompression.
    pub max_line_bytes: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            fastq_only: true,
            max_input_bytes: Some(DEFAULT_MAX_INPUT_BYTES),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}
