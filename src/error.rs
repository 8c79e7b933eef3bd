//! Error taxonomy for packet processing.

/// Errors raised while processing a packet against the mission database.
///
/// Only [`ExtractionError::Configuration`] ever escapes
/// [`TmExtractor::process_packet`](crate::extractor::TmExtractor::process_packet):
/// structural errors (`BufferUnderrun`, `MalformedSize`, `Unaligned`) abandon
/// the current container's remaining entries and the already-extracted values
/// are kept. Value-level parse failures are not errors at all; they mark the
/// affected value with `AcquisitionStatus::Invalid`.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("buffer underrun: need {need} bits at bit position {position}, {available} remaining")]
    BufferUnderrun {
        position: usize,
        need: usize,
        available: usize,
    },
    #[error("malformed size: {0}")]
    MalformedSize(String),
    #[error("data at bit position {position} does not start at a byte boundary")]
    Unaligned { position: usize },
    #[error("configuration: {0}")]
    Configuration(String),
}

impl ExtractionError {
    /// True for the structural errors that curtail the current container but
    /// must not escape the packet boundary.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ExtractionError::Configuration(_))
    }
}
