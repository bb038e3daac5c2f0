/// One parsed FASTQ record. `seq` and `qual` always have equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub id: String,
    pub desc: Option<String>,
    /// Upper-cased bases over `A`, `C`, `G`, `T`, `N`.
    pub seq: Vec<u8>,
    /// Raw encoded quality bytes, not yet offset-corrected.
    pub qual: Vec<u8>,
    /// 1-based index of the record in its file.
    pub index: u64,
}

impl Read {
    #[inline]
    pub fn len(&self) -> usize {
        self.seq.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}
