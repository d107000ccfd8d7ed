use crate::error::Result;
use crate::types::ReadRecord;
use rust_htslib::bam::{self, ext::BamRecordExtensions, Read};
use std::path::{Path, PathBuf};

/// Supplies decoded alignment records by index range. Implementations must
/// not need the whole file in memory and must be shareable between the
/// producer and the coordinator.
pub trait AlignmentRecordSource: Send + Sync {
    /// Number of records the pipeline will process.
    fn count(&self) -> Result<usize>;

    /// Records `offset..offset + limit`, clamped to the end of the source.
    fn fetch(&self, offset: usize, limit: usize) -> Result<Vec<ReadRecord>>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecRecordSource {
    records: Vec<ReadRecord>,
}

impl VecRecordSource {
    pub fn new(records: Vec<ReadRecord>) -> Self {
        Self { records }
    }
}

impl AlignmentRecordSource for VecRecordSource {
    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn fetch(&self, offset: usize, limit: usize) -> Result<Vec<ReadRecord>> {
        let start = offset.min(self.records.len());
        let end = offset.saturating_add(limit).min(self.records.len());
        Ok(self.records[start..end].to_vec())
    }
}

/// Mapped records of a BAM/SAM file. Every call opens its own reader so
/// concurrent fetches never share htslib state.
#[derive(Debug, Clone)]
pub struct BamRecordSource {
    path: PathBuf,
}

impl BamRecordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AlignmentRecordSource for BamRecordSource {
    fn count(&self) -> Result<usize> {
        let mut reader = bam::Reader::from_path(&self.path)?;
        let mut record = bam::Record::new();
        let mut count = 0;
        while let Some(result) = reader.read(&mut record) {
            result?;
            if !record.is_unmapped() {
                count += 1;
            }
        }
        log::debug!("{} mapped records in {}", count, self.path.display());
        Ok(count)
    }

    fn fetch(&self, offset: usize, limit: usize) -> Result<Vec<ReadRecord>> {
        let mut reader = bam::Reader::from_path(&self.path)?;
        let mut record = bam::Record::new();
        let end = offset.saturating_add(limit);
        let mut index = 0;
        let mut records = Vec::with_capacity(limit.min(1 << 16));
        while let Some(result) = reader.read(&mut record) {
            result?;
            if record.is_unmapped() {
                continue;
            }
            if index >= end {
                break;
            }
            if index >= offset {
                records.push(read_record_from_bam(&record));
            }
            index += 1;
        }
        Ok(records)
    }
}

/// Decodes sequence, qualities and the full aligned-pair list (soft clips,
/// insertions and deletions included) of one BAM record.
pub fn read_record_from_bam(record: &bam::Record) -> ReadRecord {
    let aligned_pairs = record
        .aligned_pairs_full()
        .map(|[read_pos, ref_pos]| {
            (
                read_pos.and_then(|p| usize::try_from(p).ok()),
                ref_pos.and_then(|p| usize::try_from(p).ok()),
            )
        })
        .collect();
    ReadRecord::new(record.seq().as_bytes(), record.qual().to_vec(), aligned_pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seq: &[u8]) -> ReadRecord {
        ReadRecord::new(seq.to_vec(), vec![40; seq.len()], vec![])
    }

    #[test]
    fn test_vec_source_fetch_clamps() {
        let source = VecRecordSource::new(vec![record(b"A"), record(b"C"), record(b"G")]);
        assert_eq!(source.count().unwrap(), 3);
        assert_eq!(source.fetch(1, 10).unwrap().len(), 2);
        assert_eq!(source.fetch(0, 2).unwrap()[1].sequence, b"C".to_vec());
        assert!(source.fetch(5, 2).unwrap().is_empty());
    }

    // One unmapped record first, then a soft clip, an insertion and a deletion.
    const SAM: &str = "@HD\tVN:1.6\tSO:unsorted\n\
@SQ\tSN:chr1\tLN:20\n\
unmapped\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII\n\
clipped\t0\tchr1\t1\t60\t2S4M\t*\t0\t0\tGGACGT\tIIIIII\n\
inserted\t0\tchr1\t1\t60\t2M1I2M\t*\t0\t0\tACTGT\t#+5?I\n\
deleted\t0\tchr1\t1\t60\t2M1D2M\t*\t0\t0\tACTA\tIIII\n";

    fn sam_source(dir: &tempfile::TempDir) -> BamRecordSource {
        let path = dir.path().join("reads.sam");
        std::fs::write(&path, SAM).unwrap();
        BamRecordSource::new(&path)
    }

    #[test]
    fn test_bam_source_skips_unmapped() {
        let dir = tempfile::tempdir().unwrap();
        let source = sam_source(&dir);
        assert_eq!(source.count().unwrap(), 3);

        let all = source.fetch(0, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].sequence, b"GGACGT".to_vec());
        assert_eq!(
            all[0].aligned_pairs,
            vec![
                (Some(0), None),
                (Some(1), None),
                (Some(2), Some(0)),
                (Some(3), Some(1)),
                (Some(4), Some(2)),
                (Some(5), Some(3)),
            ]
        );
        assert!(source.fetch(3, 10).unwrap().is_empty());
    }

    #[test]
    fn test_bam_source_window_and_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let source = sam_source(&dir);
        let window = source.fetch(1, 2).unwrap();
        assert_eq!(window.len(), 2);

        let inserted = &window[0];
        assert_eq!(inserted.sequence, b"ACTGT".to_vec());
        assert_eq!(inserted.quality, vec![2, 10, 20, 30, 40]);
        assert_eq!(
            inserted.aligned_pairs,
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (Some(2), None),
                (Some(3), Some(2)),
                (Some(4), Some(3)),
            ]
        );

        let deleted = &window[1];
        assert_eq!(deleted.sequence, b"ACTA".to_vec());
        assert_eq!(deleted.quality, vec![40; 4]);
        assert_eq!(
            deleted.aligned_pairs,
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (None, Some(2)),
                (Some(2), Some(3)),
                (Some(3), Some(4)),
            ]
        );
    }

    #[test]
    fn test_bam_source_missing_file() {
        let source = BamRecordSource::new("/nonexistent/reads.bam");
        assert!(source.count().is_err());
    }
}
