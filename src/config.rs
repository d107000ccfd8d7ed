use crate::constants::*;
use crate::error::{RefconsError, Result};

/// Cutoffs and pool sizes for one consensus run. Passed into the pipeline at
/// construction; nothing is read from the environment after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusConfig {
    pub length_cutoff: usize,
    pub overall_quality_cutoff: u32,
    pub site_quality_cutoff: u32,
    pub worker_count: usize,
    pub chunk_size: usize,
    pub producer_batch_size: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            length_cutoff: DEFAULT_LENGTH_CUTOFF,
            overall_quality_cutoff: DEFAULT_OVERALL_QUALITY_CUTOFF,
            site_quality_cutoff: DEFAULT_SITE_QUALITY_CUTOFF,
            worker_count: DEFAULT_WORKER_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            producer_batch_size: DEFAULT_PRODUCER_BATCH_SIZE,
        }
    }
}

impl ConsensusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(RefconsError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(RefconsError::InvalidConfig(
                "chunk size must be at least 1".to_string(),
            ));
        }
        if self.producer_batch_size == 0 {
            return Err(RefconsError::InvalidConfig(
                "producer batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
