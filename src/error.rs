//! Error types for refcons

use thiserror::Error;

/// Result type alias for refcons operations
pub type Result<T> = std::result::Result<T, RefconsError>;

/// Errors that abort a consensus run.
///
/// Reads failing the length or quality filters are not errors; they are
/// counted in [`crate::types::FilterSummary`].
#[derive(Debug, Error)]
pub enum RefconsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// BAM decoding error
    #[error("Alignment file error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    /// Reference FASTA missing, empty or unreadable
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The aligner could not produce an alignment
    #[error("Aligner error: {0}")]
    Aligner(String),

    /// The reconciling alignment does not span both sequences end to end
    #[error(
        "Reconciling alignment does not cover both sequences: reference {reference_begin}..{reference_end} of {reference_len}, consensus {query_begin}..{query_end} of {query_len}"
    )]
    CoverageViolation {
        reference_begin: usize,
        reference_end: usize,
        reference_len: usize,
        query_begin: usize,
        query_end: usize,
        query_len: usize,
    },

    /// The reconciling alignment starts past the first base of either sequence
    #[error("Alignment begins at nonzero offset (reference {reference_begin}, consensus {query_begin})")]
    LeadingOffsetMismatch {
        reference_begin: usize,
        query_begin: usize,
    },

    /// Coordinate map (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The run was cancelled before all reads were tallied
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Consensus calls and profile have different lengths
    #[error("Consensus has {sequence_len} columns but its profile has {profile_len}")]
    ProfileLengthMismatch {
        sequence_len: usize,
        profile_len: usize,
    },

    /// A coordinate map points outside the sequences it is applied to
    #[error("Invalid coordinate map: {0}")]
    InvalidCoordinateMap(String),

    /// A pipeline thread went away before all reads were accounted for
    #[error("Pipeline disconnected: {0}")]
    PipelineDisconnected(String),
}
