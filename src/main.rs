use clap::Parser;
use flexi_logger::style;
use flexi_logger::{DeferredNow, Duplicate, FileSpec, LoggerHandle, Record};
use refcons::alignment::BlockAligner;
use refcons::cli;
use refcons::cli::{Commands, ConsensusArgs, ReconcileArgs};
use refcons::constants::*;
use refcons::pipeline::Pipeline;
use refcons::reconcile::Reconciler;
use refcons::record_source::BamRecordSource;
use refcons::seq_parse;
use refcons::types::ConsensusSequence;
use refcons::utils::*;
use refcons::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sysinfo::System;

fn main() {
    let total_start_time = Instant::now();
    let args = cli::Cli::parse();

    let (output_dir, _logger) = initialize_setup(&args);

    let result = match &args.command {
        Commands::Consensus(consensus_args) => run_consensus(consensus_args, &output_dir),
        Commands::Reconcile(reconcile_args) => run_reconcile(reconcile_args, &output_dir),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
    log::info!("Finished in {:?}.", total_start_time.elapsed());
}

fn my_own_format_colored(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> std::result::Result<(), std::io::Error> {
    let mut paintlevel = record.level();
    if paintlevel == log::Level::Info {
        paintlevel = log::Level::Debug;
    }
    write!(
        w,
        "({}) {} [{}] {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        style(paintlevel).paint(record.level().to_string()),
        record.module_path().unwrap_or(""),
        &record.args()
    )
}

fn my_own_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> std::result::Result<(), std::io::Error> {
    write!(
        w,
        "({}) {} [{}] {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        record.level(),
        record.module_path().unwrap_or(""),
        &record.args()
    )
}

fn initialize_setup(args: &cli::Cli) -> (PathBuf, LoggerHandle) {
    if args.markdown_help {
        clap_markdown::print_help_markdown::<cli::Cli>();
        std::process::exit(0);
    }

    let inputs: Vec<&str> = match &args.command {
        Commands::Consensus(a) => {
            let mut v = vec![a.reference.as_str(), a.bam.as_str()];
            v.extend(a.original_reference.as_deref());
            v.extend(a.previous_map.as_deref());
            v
        }
        Commands::Reconcile(a) => {
            let mut v = vec![a.original.as_str(), a.consensus.as_str(), a.profile.as_str()];
            v.extend(a.previous_map.as_deref());
            v
        }
    };
    for file in inputs {
        if !Path::new(file).exists() {
            eprintln!("ERROR [refcons] Input file {} does not exist. Exiting.", file);
            std::process::exit(1);
        }
    }

    let output_dir = Path::new(args.output_dir());
    if !output_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            eprintln!("ERROR [refcons] Could not create output directory: {}", e);
            std::process::exit(1);
        }
    } else if !output_dir.is_dir() {
        eprintln!("ERROR [refcons] Output directory specified by `-o` exists and is not a directory.");
        std::process::exit(1);
    }

    let log_spec = format!("{}", args.log_level_filter());
    let filespec = FileSpec::default().directory(output_dir).basename("refcons");
    let logger = flexi_logger::Logger::try_with_str(log_spec).and_then(|logger| {
        logger
            .log_to_file(filespec)
            .duplicate_to_stderr(Duplicate::Info)
            .format(my_own_format_colored)
            .format_for_files(my_own_format)
            .start()
    });
    let logger = match logger {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("ERROR [refcons] Could not start logging: {}", e);
            std::process::exit(1);
        }
    };

    let cli_args: Vec<String> = std::env::args().collect();
    log::info!("COMMAND: {}", cli_args.join(" "));
    log::info!("VERSION: {}", env!("CARGO_PKG_VERSION"));
    log::info!("SYSTEM NAME: {}", System::name().unwrap_or(format!("Unknown")));
    log::info!("SYSTEM HOST NAME: {}", System::host_name().unwrap_or(format!("Unknown")));

    (output_dir.to_path_buf(), logger)
}

fn run_consensus(args: &ConsensusArgs, output_dir: &Path) -> Result<()> {
    let (ref_name, reference) = seq_parse::read_reference(&args.reference)?;
    log::info!("Reference {} ({} bp) loaded.", ref_name, reference.len());

    let pipeline = Pipeline::new(args.to_config())?;
    let source = BamRecordSource::new(&args.bam);
    let run = pipeline.build_consensus(&source, &reference)?;
    log_memory_usage(true, "STAGE 1: Tallied reads and selected consensus");

    // Deletion columns stay in the FASTA so it lines up with the profile.
    seq_parse::write_fasta(
        output_dir.join(CONSENSUS_FASTA_NAME),
        &format!("{}_consensus", ref_name),
        &run.consensus.sequence,
    )?;
    seq_parse::write_profile(output_dir.join(CONSENSUS_PROFILE_NAME), &run.consensus.profile)?;
    seq_parse::write_summary(output_dir.join(SUMMARY_NAME), &run.summary)?;
    let (matches, insertions, deletions) = profile_counts(&run.consensus.profile);
    log::info!(
        "Consensus written: {} columns ({} matched, {} inserted, {} deleted).",
        run.consensus.len(),
        matches,
        insertions,
        deletions
    );

    if let Some(original_path) = &args.original_reference {
        let (original_name, original) = seq_parse::read_reference(original_path)?;
        reconcile_and_write(
            &original_name,
            &original,
            &run.consensus,
            args.previous_map.as_deref(),
            output_dir,
        )?;
    }
    Ok(())
}

fn run_reconcile(args: &ReconcileArgs, output_dir: &Path) -> Result<()> {
    let (original_name, original) = seq_parse::read_reference(&args.original)?;
    let consensus = seq_parse::read_consensus(&args.consensus, &args.profile)?;
    reconcile_and_write(
        &original_name,
        &original,
        &consensus,
        args.previous_map.as_deref(),
        output_dir,
    )
}

fn reconcile_and_write(
    original_name: &str,
    original: &[u8],
    consensus: &ConsensusSequence,
    previous_map: Option<&str>,
    output_dir: &Path,
) -> Result<()> {
    let start = Instant::now();
    let previous_deletions = match previous_map {
        Some(path) => seq_parse::load_coordinate_map(path)?.deletions(),
        None => BTreeSet::new(),
    };
    let reconciler = Reconciler::new(BlockAligner::default());
    let reconciled = reconciler.reconcile(original, consensus)?;
    let map = reconciler.coordinate_map(original, consensus, &previous_deletions)?;

    seq_parse::write_fasta(
        output_dir.join(RECONCILED_FASTA_NAME),
        &format!("{}_reconciled", original_name),
        &reconciled.sequence,
    )?;
    seq_parse::write_profile(output_dir.join(RECONCILED_PROFILE_NAME), &reconciled.profile)?;
    seq_parse::save_coordinate_map(output_dir.join(COORDINATE_MAP_NAME), &map)?;

    let (matches, insertions, deletions) = profile_counts(&reconciled.profile);
    log::info!(
        "Reconciled against {} in {:?}: {} matched, {} inserted, {} deleted; {} deletions carried from the previous round.",
        original_name,
        start.elapsed(),
        matches,
        insertions,
        deletions,
        previous_deletions.len()
    );
    Ok(())
}
