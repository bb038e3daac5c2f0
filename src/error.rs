use std::io;
use thiserror::Error;

/// Where in the input stream a condition was detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoContext {
    pub byte_pos: u64,
    pub line_num: u64,
}

/// Framing problems inside a single FASTQ record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("expected header '@' at start of record")]
    MissingHeader,
    #[error("found FASTA header '>' where FASTQ '@' expected")]
    FastaHeaderDetected,
    #[error("missing '+' separator line")]
    MissingPlus,
    #[error("separator id '{plus}' does not match header id '{header}'")]
    SeparatorMismatch { header: String, plus: String },
    #[error("unexpected EOF inside record")]
    UnexpectedEof,
    #[error("quality length ({qual}) does not match sequence length ({seq})")]
    LengthMismatch { seq: usize, qual: usize },
    #[error("invalid base {byte:#04x} at sequence offset {offset}")]
    InvalidBase { byte: u8, offset: usize },
    #[error("line longer than {limit} bytes")]
    LineTooLong { limit: usize },
}

#[derive(Debug, Error)]
pub enum QcError {
    #[error("malformed record {record} at {ctx:?}: {source}")]
    MalformedRecord {
        /// 1-based record index.
        record: u64,
        #[source]
        source: FormatError,
        ctx: IoContext,
    },
    #[error("unsupported compression envelope: {format}")]
    UnsupportedEncoding { format: &'static str },
    #[error(
        "invalid quality score in record {record}: byte {byte:#04x} at base {position} \
         is outside {min}..={max}"
    )]
    InvalidQualityScore {
        /// 1-based record index.
        record: u64,
        /// 1-based base position.
        position: usize,
        byte: u8,
        min: u8,
        max: u8,
    },
    #[error("input too large: {size} bytes exceeds limit of {limit} bytes")]
    InputTooLarge { size: u64, limit: u64 },
    #[error("engine already finalized")]
    AlreadyFinalized,
    #[error("engine is closed")]
    EngineClosed,
    #[error("analysis cancelled")]
    Cancelled,
    #[error("I/O error at {ctx:?}: {source}")]
    Io {
        #[source]
        source: io::Error,
        ctx: IoContext,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl QcError {
    pub(crate) fn io_err(source: io::Error, ctx: IoContext) -> Self {
        Self::Io { source, ctx }
    }

    pub(crate) fn fmt_err(record: u64, source: FormatError, ctx: IoContext) -> Self {
        Self::MalformedRecord {
            record,
            source,
            ctx,
        }
    }

    /// Local contract violations by the caller, as opposed to bad input.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::AlreadyFinalized | Self::EngineClosed)
    }

    /// Input problems that abort one file's analysis.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. }
                | Self::UnsupportedEncoding { .. }
                | Self::InvalidQualityScore { .. }
                | Self::InputTooLarge { .. }
        )
    }
}
