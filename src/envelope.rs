use std::io::{self, BufRead};

/// Compression envelope recognized from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Plain,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    Zip,
}

/// Longest magic prefix we look at.
pub const SNIFF_LEN: usize = 6;

impl Envelope {
    pub fn name(self) -> &'static str {
        match self {
            Envelope::Plain => "plain",
            Envelope::Gzip => "gzip",
            Envelope::Bzip2 => "bzip2",
            Envelope::Xz => "xz",
            Envelope::Zstd => "zstd",
            Envelope::Zip => "zip",
        }
    }

    /// Whether the reader can decode this envelope.
    pub fn is_supported(self) -> bool {
        match self {
            Envelope::Plain => true,
            Envelope::Gzip => cfg!(feature = "gzip"),
            _ => false,
        }
    }

    pub fn sniff(magic: &[u8]) -> Envelope {
        if magic.starts_with(&[0x1F, 0x8B]) {
            Envelope::Gzip
        } else if magic.starts_with(b"BZh") {
            Envelope::Bzip2
        } else if magic.starts_with(&[0xFD, b'7', b'z', b'X', b'Z', 0x00]) {
            Envelope::Xz
        } else if magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            Envelope::Zstd
        } else if magic.starts_with(&[b'P', b'K', 0x03, 0x04]) {
            Envelope::Zip
        } else {
            Envelope::Plain
        }
    }
}

/// Peek at the buffered prefix without consuming it.
pub fn sniff_bufread<R: BufRead + ?Sized>(r: &mut R) -> io::Result<Envelope> {
    let buf = r.fill_buf()?;
    let n = buf.len().min(SNIFF_LEN);
    Ok(Envelope::sniff(&buf[..n]))
}

/// `.fastq`, `.fq`, `.fastq.gz` or `.fq.gz`, case-insensitive.
pub fn has_fastq_suffix(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let stem = lower.strip_suffix(".gz").unwrap_or(&lower);
    stem.ends_with(".fastq") || stem.ends_with(".fq")
}
