use crate::config::ConsensusConfig;
use crate::constants::DELETION_SYMBOL;
use crate::types::*;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct SiteGroup {
    bases: CalledBases,
    quality_sum: u64,
}

impl SiteGroup {
    #[inline]
    fn push(&mut self, base: u8, quality: u8) {
        self.bases.push(base);
        self.quality_sum += quality as u64;
    }

    fn mean_quality(&self) -> f64 {
        self.quality_sum as f64 / self.bases.len() as f64
    }
}

/// Checks the read-level cutoffs. Both checks always run so a read can fail
/// for more than one reason.
pub fn prefilter(read: &ReadRecord, config: &ConsensusConfig) -> FilterFlags {
    let mut flags = FilterFlags::default();
    if read.sequence.len() < config.length_cutoff {
        flags.insert(FilterFailure::TooShort);
    }
    if read.mean_quality() < config.overall_quality_cutoff as f64 {
        flags.insert(FilterFailure::LowOverallQuality);
    }
    flags
}

/// Turns one aligned read into per-position calls.
///
/// Inserted bases are attributed to the last aligned reference position.
/// Deletions are called as `-` and take the quality of the last read base,
/// since a gap has no quality of its own. Bases before the first aligned
/// position (reference position 0) are dropped.
pub fn filter_read(read: &ReadRecord, config: &ConsensusConfig) -> FilterOutcome {
    let flags = prefilter(read, config);
    if !flags.is_ok() {
        return Err(flags);
    }

    let mut groups: BTreeMap<usize, SiteGroup> = BTreeMap::new();
    let mut prev_ref_pos = 0;
    let mut prev_read_index = 0;
    for &(read_index, ref_index) in read.aligned_pairs.iter() {
        let ref_pos = match ref_index {
            Some(ref_index) => {
                prev_ref_pos = ref_index + 1;
                prev_ref_pos
            }
            None => prev_ref_pos,
        };

        let (base, quality) = match read_index {
            Some(read_index) => {
                let (Some(&base), Some(&quality)) =
                    (read.sequence.get(read_index), read.quality.get(read_index))
                else {
                    log::trace!(
                        "Aligned pair points past the read end ({} >= {}), skipping",
                        read_index,
                        read.sequence.len()
                    );
                    continue;
                };
                prev_read_index = read_index;
                (base, quality)
            }
            None => (
                DELETION_SYMBOL,
                read.quality.get(prev_read_index).copied().unwrap_or(0),
            ),
        };

        if ref_pos == 0 {
            continue;
        }

        groups.entry(ref_pos).or_default().push(base, quality);
    }

    let mut call = FilteredCall::default();
    for (pos, group) in groups.into_iter() {
        if group.mean_quality() < config.site_quality_cutoff as f64 {
            call.low_quality_sites += 1;
            continue;
        }
        call.calls.push((pos, group.bases));
    }

    // An insertion at the very end of a read has nothing after it to anchor it.
    if let Some((_, last)) = call.calls.last_mut() {
        last.truncate(1);
    }

    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConsensusConfig {
        ConsensusConfig {
            length_cutoff: 4,
            ..Default::default()
        }
    }

    fn matched_pairs(len: usize, ref_start: usize) -> Vec<(Option<usize>, Option<usize>)> {
        (0..len).map(|i| (Some(i), Some(ref_start + i))).collect()
    }

    fn bases(call: &FilteredCall) -> Vec<(usize, String)> {
        call.calls
            .iter()
            .map(|(p, b)| (*p, String::from_utf8(b.to_vec()).unwrap()))
            .collect()
    }

    #[test]
    fn test_simple_match() {
        let read = ReadRecord::new(b"ACGT".to_vec(), vec![40; 4], matched_pairs(4, 0));
        let call = filter_read(&read, &config()).unwrap();
        assert_eq!(
            bases(&call),
            vec![
                (1, "A".to_string()),
                (2, "C".to_string()),
                (3, "G".to_string()),
                (4, "T".to_string())
            ]
        );
    }

    #[test]
    fn test_too_short_and_low_quality_together() {
        let read = ReadRecord::new(b"ACG".to_vec(), vec![10; 3], matched_pairs(3, 0));
        let flags = filter_read(&read, &config()).unwrap_err();
        assert!(flags.contains(FilterFailure::TooShort));
        assert!(flags.contains(FilterFailure::LowOverallQuality));
    }

    #[test]
    fn test_low_quality_independent_of_length() {
        let read = ReadRecord::new(vec![b'A'; 100], vec![20; 100], matched_pairs(100, 0));
        let flags = filter_read(&read, &config()).unwrap_err();
        assert!(!flags.contains(FilterFailure::TooShort));
        assert!(flags.contains(FilterFailure::LowOverallQuality));
    }

    #[test]
    fn test_insertion_collapsed_onto_previous_position() {
        // ref:  A C - G T
        // read: A C T G T
        let read = ReadRecord::new(
            b"ACTGT".to_vec(),
            vec![40; 5],
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (Some(2), None),
                (Some(3), Some(2)),
                (Some(4), Some(3)),
            ],
        );
        let call = filter_read(&read, &config()).unwrap();
        assert_eq!(bases(&call)[1], (2, "CT".to_string()));
        assert_eq!(call.len(), 4);
    }

    #[test]
    fn test_deletion_carries_previous_quality() {
        // The deleted column takes quality 10 from read index 1 and is dropped with it.
        let read = ReadRecord::new(
            b"ACTT".to_vec(),
            vec![40, 10, 60, 60],
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (None, Some(2)),
                (Some(2), Some(3)),
                (Some(3), Some(4)),
            ],
        );
        let cfg = ConsensusConfig {
            overall_quality_cutoff: 30,
            ..config()
        };
        let call = filter_read(&read, &cfg).unwrap();
        let positions: Vec<usize> = call.calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 4, 5]);
        assert_eq!(call.low_quality_sites, 2);
    }

    #[test]
    fn test_deletion_symbol_emitted() {
        let read = ReadRecord::new(
            b"ACGT".to_vec(),
            vec![40; 4],
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (None, Some(2)),
                (Some(2), Some(3)),
                (Some(3), Some(4)),
            ],
        );
        let call = filter_read(&read, &config()).unwrap();
        assert_eq!(bases(&call)[2], (3, "-".to_string()));
    }

    #[test]
    fn test_soft_clip_before_alignment_discarded() {
        let read = ReadRecord::new(
            b"TTACGT".to_vec(),
            vec![40; 6],
            vec![
                (Some(0), None),
                (Some(1), None),
                (Some(2), Some(0)),
                (Some(3), Some(1)),
                (Some(4), Some(2)),
                (Some(5), Some(3)),
            ],
        );
        let call = filter_read(&read, &config()).unwrap();
        assert_eq!(bases(&call)[0], (1, "A".to_string()));
        assert_eq!(call.len(), 4);
    }

    #[test]
    fn test_trailing_insertion_trimmed() {
        let read = ReadRecord::new(
            b"ACGTAA".to_vec(),
            vec![40; 6],
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (Some(2), Some(2)),
                (Some(3), Some(3)),
                (Some(4), None),
                (Some(5), None),
            ],
        );
        let call = filter_read(&read, &config()).unwrap();
        assert_eq!(bases(&call).last().unwrap(), &(4, "T".to_string()));
    }

    #[test]
    fn test_site_filter_uses_group_mean() {
        // Group at position 2 has qualities 50 and 10: mean 30 < 35.
        let read = ReadRecord::new(
            b"ACTGT".to_vec(),
            vec![40, 50, 10, 40, 40],
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (Some(2), None),
                (Some(3), Some(2)),
                (Some(4), Some(3)),
            ],
        );
        let call = filter_read(&read, &config()).unwrap();
        let positions: Vec<usize> = call.calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 3, 4]);
        assert_eq!(call.low_quality_sites, 1);
    }
}
