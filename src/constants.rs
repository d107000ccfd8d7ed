// Defaults for the read and site filters; phred scale.
pub const DEFAULT_OVERALL_QUALITY_CUTOFF: u32 = 35;
pub const DEFAULT_SITE_QUALITY_CUTOFF: u32 = 35;
pub const DEFAULT_LENGTH_CUTOFF: usize = 50;

pub const DEFAULT_WORKER_COUNT: usize = 2;
pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_PRODUCER_BATCH_SIZE: usize = 50_000;

pub const DELETION_SYMBOL: u8 = b'-';
pub const PROFILE_MATCH: u8 = b'.';
pub const PROFILE_INSERTION: u8 = b'+';
pub const PROFILE_DELETION: u8 = b'-';

pub const TS_DASHES_BLANK_COLONS_DOT_BLANK: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub const SUB_MATRIX: block_aligner::scores::NucMatrix = block_aligner::scores::NucMatrix::new_simple(1, -2);
pub const GAPS: block_aligner::scores::Gaps = block_aligner::scores::Gaps { open: -3, extend: -2 };
pub const MIN_BLOCK_SIZE: usize = 32;
pub const MAX_BLOCK_SIZE: usize = 256;

pub const PROGRESS_LOG_INTERVAL: usize = 100_000;

pub const CONSENSUS_FASTA_NAME: &str = "consensus.fa";
pub const CONSENSUS_PROFILE_NAME: &str = "profile.txt";
pub const RECONCILED_FASTA_NAME: &str = "reconciled.fa";
pub const RECONCILED_PROFILE_NAME: &str = "reconciled_profile.txt";
pub const COORDINATE_MAP_NAME: &str = "coordinate_map.bin";
pub const SUMMARY_NAME: &str = "summary.tsv";

pub const CLI_HEADINGS: [&str; 3] = [
    "Filtering Parameters",
    "Parallelism Parameters",
    "Reconciliation Options",
];
