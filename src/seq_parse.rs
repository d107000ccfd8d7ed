use crate::error::{RefconsError, Result};
use crate::types::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// First record of a FASTA/FASTQ file (gzip allowed), upper-cased.
pub fn read_reference<P: AsRef<Path>>(path: P) -> Result<(String, Vec<u8>)> {
    let path = path.as_ref();
    let mut reader = needletail::parse_fastx_file(path).map_err(|e| {
        RefconsError::InvalidReference(format!("{}: {}", path.display(), e))
    })?;
    let Some(record) = reader.next() else {
        return Err(RefconsError::InvalidReference(format!(
            "{}: no sequence records",
            path.display()
        )));
    };
    let record = record
        .map_err(|e| RefconsError::InvalidReference(format!("{}: {}", path.display(), e)))?;
    let name = first_word(&String::from_utf8_lossy(record.id()));
    let seq = record.seq().to_ascii_uppercase();
    if seq.is_empty() {
        return Err(RefconsError::InvalidReference(format!(
            "{}: record {} is empty",
            path.display(),
            name
        )));
    }
    if reader.next().is_some() {
        log::warn!(
            "{} has more than one record; only {} is used",
            path.display(),
            name
        );
    }
    Ok((name, seq))
}

pub fn write_fasta<P: AsRef<Path>>(path: P, name: &str, seq: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, ">{}", name)?;
    for line in seq.chunks(80) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_profile<P: AsRef<Path>>(path: P, profile: &[u8]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(profile)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads a profile written by [`write_profile`]; whitespace is ignored.
pub fn read_profile<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let reader = BufReader::new(File::open(path)?);
    let mut profile = vec![];
    for line in reader.lines() {
        profile.extend(line?.bytes().filter(|b| !b.is_ascii_whitespace()));
    }
    Ok(profile)
}

/// Reads a consensus FASTA and its profile back into a [`ConsensusSequence`].
/// `-` symbols in the FASTA are kept as deletion calls.
pub fn read_consensus<P: AsRef<Path>, Q: AsRef<Path>>(
    fasta: P,
    profile: Q,
) -> Result<ConsensusSequence> {
    let (_, sequence) = read_reference(fasta)?;
    let profile = read_profile(profile)?;
    let consensus = ConsensusSequence::new(sequence, profile);
    consensus.check_lengths()?;
    Ok(consensus)
}

pub fn write_summary<P: AsRef<Path>>(path: P, summary: &FilterSummary) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "metric\tvalue")?;
    writeln!(writer, "total_reads\t{}", summary.total_reads)?;
    writeln!(writer, "tallied_reads\t{}", summary.tallied_reads)?;
    writeln!(writer, "excluded_reads\t{}", summary.excluded_reads)?;
    writeln!(writer, "too_short\t{}", summary.too_short)?;
    writeln!(writer, "low_overall_quality\t{}", summary.low_overall_quality)?;
    writeln!(writer, "low_site_quality_sites\t{}", summary.low_site_quality_sites)?;
    writer.flush()?;
    Ok(())
}

pub fn save_coordinate_map<P: AsRef<Path>>(path: P, map: &CoordinateMap) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, map)?;
    writer.flush()?;
    Ok(())
}

pub fn load_coordinate_map<P: AsRef<Path>>(path: P) -> Result<CoordinateMap> {
    let map = bincode::deserialize_from(BufReader::new(File::open(path)?))?;
    Ok(map)
}

pub fn first_word(s: &str) -> String {
    s.split_whitespace().next().unwrap_or(s).to_string()
}
