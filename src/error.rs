use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes)")]
    UnexpectedEof { offset: usize, need: usize },

    #[error("not an abc file.  magic={magic:x}")]
    NotAbc { magic: u32 },

    #[error("invalid swf signature {found:?}")]
    InvalidSignature { found: [u8; 3] },

    #[error("unsupported swf compression {signature:?}")]
    UnsupportedCompression { signature: [u8; 3] },

    #[error("invalid namespace kind {kind:#x} at offset {offset:#x}")]
    InvalidNamespaceKind { kind: u8, offset: usize },

    #[error("invalid multiname kind {kind:#x} at offset {offset:#x}")]
    InvalidMultinameKind { kind: u8, offset: usize },

    #[error("error trait kind {kind} at offset {offset:#x}")]
    InvalidTraitKind { kind: u8, offset: usize },

    #[error("type name at pool index {index} cannot be resolved")]
    UnresolvedTypeName { index: u32 },

    #[error("{table} index {index} out of range")]
    BadIndex { table: &'static str, index: u32 },

    #[error("varint at offset {offset:#x} needs more than five groups")]
    VarintOverflow { offset: usize },

    #[error("method {method} declares {optional} optional parameters but only {params} parameters")]
    InvalidOptionalCount {
        method: usize,
        optional: u32,
        params: usize,
    },

    #[error("decompression failed: {0}")]
    Decompress(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
