/// An error occurring during the codec process.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An error occurring at the decoding stage.
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    /// An error occurring at the encoding stage.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// An error occurring during the decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodingError {
    #[error("end of file at offset {0}")]
    Eof(usize),
    #[error("invalid rlp header at offset {offset}: {source}")]
    InvalidRlp { offset: usize, source: alloy_rlp::Error },
    #[error("expected rlp list at offset {0}")]
    ExpectedRlpList(usize),
    #[error("batch v2 must start with a change L2 block marker")]
    MissingChangeL2Block,
    #[error("unknown entry type {entry_type:#04x} at offset {offset}")]
    UnknownEntryType { offset: usize, entry_type: u8 },
}

/// An error occurring during the encoding.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("a v2 batch requires at least one L2 block")]
    EmptyBatchV2,
}
