use clap::{Args, Parser, Subcommand, ValueEnum};
use crate::config::ConsensusConfig;
use crate::constants::*;

#[derive(Parser, Debug)]
#[command(
    name = "refcons",
    about = "refcons - majority-vote consensus from aligned reads, reconciled to the original reference numbering",
    version,
    author,
    disable_help_subcommand = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level
    #[arg(short, long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Print help in markdown format
    #[arg(long, hide = true, global = true)]
    pub markdown_help: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a consensus from reads aligned to a reference (optionally reconciled to an original reference)
    #[command(name = "consensus")]
    Consensus(ConsensusArgs),

    /// Reconcile an existing consensus and profile against the original reference
    #[command(name = "reconcile")]
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConsensusArgs {
    /// Reference the reads were aligned to (FASTA, first record used)
    #[arg(short, long, required = true, value_name = "FASTA")]
    pub reference: String,

    /// Aligned reads (BAM/SAM); unmapped records are skipped
    #[arg(short, long, required = true, value_name = "BAM")]
    pub bam: String,

    /// Output directory for results (created if it does not exist)
    #[arg(short, long, default_value = "refcons-out")]
    pub output_dir: String,

    /// Minimum read length to tally
    #[arg(long, env = "LENGTH_CUTOFF", default_value_t = DEFAULT_LENGTH_CUTOFF, help_heading = CLI_HEADINGS[0])]
    pub length_cutoff: usize,

    /// Minimum mean read quality (phred)
    #[arg(long, env = "OVERALL_QUALITY_CUTOFF", default_value_t = DEFAULT_OVERALL_QUALITY_CUTOFF, help_heading = CLI_HEADINGS[0])]
    pub overall_quality_cutoff: u32,

    /// Minimum mean quality of the bases called at one reference position (phred)
    #[arg(long, env = "SITE_QUALITY_CUTOFF", default_value_t = DEFAULT_SITE_QUALITY_CUTOFF, help_heading = CLI_HEADINGS[0])]
    pub site_quality_cutoff: u32,

    /// Number of read filter workers
    #[arg(short, long, env = "NTHREADS", default_value_t = DEFAULT_WORKER_COUNT, help_heading = CLI_HEADINGS[1])]
    pub threads: usize,

    /// Reads handed to a worker per message
    #[arg(long, env = "CHUNKSIZE", default_value_t = DEFAULT_CHUNK_SIZE, help_heading = CLI_HEADINGS[1])]
    pub chunk_size: usize,

    /// Reads fetched from the alignment file per producer batch
    #[arg(long, env = "PRODUCER_CAPACITY", default_value_t = DEFAULT_PRODUCER_BATCH_SIZE, help_heading = CLI_HEADINGS[1])]
    pub producer_batch_size: usize,

    /// Original (first-round) reference; when given, the consensus is reconciled to its numbering
    #[arg(long, value_name = "FASTA", help_heading = CLI_HEADINGS[2])]
    pub original_reference: Option<String>,

    /// Coordinate map written by the previous round; its deletions are carried into this round
    #[arg(long, value_name = "BIN", requires = "original_reference", help_heading = CLI_HEADINGS[2])]
    pub previous_map: Option<String>,
}

impl ConsensusArgs {
    pub fn to_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            length_cutoff: self.length_cutoff,
            overall_quality_cutoff: self.overall_quality_cutoff,
            site_quality_cutoff: self.site_quality_cutoff,
            worker_count: self.threads,
            chunk_size: self.chunk_size,
            producer_batch_size: self.producer_batch_size,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Original (first-round) reference
    #[arg(short = 'g', long, required = true, value_name = "FASTA")]
    pub original: String,

    /// Consensus FASTA to reconcile
    #[arg(short, long, required = true, value_name = "FASTA")]
    pub consensus: String,

    /// Profile written alongside the consensus
    #[arg(short, long, required = true, value_name = "TXT")]
    pub profile: String,

    /// Coordinate map written by the previous round
    #[arg(long, value_name = "BIN")]
    pub previous_map: Option<String>,

    /// Output directory for results (created if it does not exist)
    #[arg(short, long, default_value = "refcons-out")]
    pub output_dir: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Cli {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.log_level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    pub fn output_dir(&self) -> &str {
        match &self.command {
            Commands::Consensus(args) => &args.output_dir,
            Commands::Reconcile(args) => &args.output_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_consensus_defaults() {
        let cli = Cli::try_parse_from(["refcons", "consensus", "-r", "ref.fa", "-b", "reads.bam"]).unwrap();
        let Commands::Consensus(args) = cli.command else {
            panic!("expected consensus subcommand");
        };
        let config = args.to_config();
        assert_eq!(config.worker_count, args.threads);
        assert_eq!(config.chunk_size, args.chunk_size);
        assert!(args.original_reference.is_none());
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_environment_overrides() {
        let vars = [
            ("LENGTH_CUTOFF", "120"),
            ("OVERALL_QUALITY_CUTOFF", "25"),
            ("SITE_QUALITY_CUTOFF", "15"),
            ("NTHREADS", "7"),
            ("CHUNKSIZE", "64"),
            ("PRODUCER_CAPACITY", "1000"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let parsed = Cli::try_parse_from(["refcons", "consensus", "-r", "ref.fa", "-b", "reads.bam"]);
        let flag_wins =
            Cli::try_parse_from(["refcons", "consensus", "-r", "ref.fa", "-b", "reads.bam", "-t", "3"]);
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let Commands::Consensus(args) = parsed.unwrap().command else {
            panic!("expected consensus subcommand");
        };
        let config = args.to_config();
        assert_eq!(config.length_cutoff, 120);
        assert_eq!(config.overall_quality_cutoff, 25);
        assert_eq!(config.site_quality_cutoff, 15);
        assert_eq!(config.worker_count, 7);
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.producer_batch_size, 1000);

        let Commands::Consensus(args) = flag_wins.unwrap().command else {
            panic!("expected consensus subcommand");
        };
        assert_eq!(args.threads, 3);
    }

    #[test]
    fn test_previous_map_requires_original() {
        let res = Cli::try_parse_from([
            "refcons", "consensus", "-r", "ref.fa", "-b", "reads.bam", "--previous-map", "map.bin",
        ]);
        assert!(res.is_err());
    }
}
