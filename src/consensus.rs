use crate::constants::*;
use crate::tally::FrequencyTable;
use crate::types::*;

/// Walks the reference and picks the majority call at every position.
///
/// Positions without any tallied read keep the reference base. Insertion
/// columns after a position are accepted while the leading symbol holds at
/// least half of that column's calls; the first column that fails ends the
/// run, whatever comes after it.
pub fn select_consensus(table: &FrequencyTable, reference: &[u8]) -> ConsensusSequence {
    let mut consensus = ConsensusSequence::with_capacity(reference.len());
    let mut substitutions = 0;
    let mut deletions = 0;
    let mut insertions = 0;

    for (pos0, &ref_base) in reference.iter().enumerate() {
        let pos = pos0 + 1;
        match table
            .counts(&PositionKey::aligned(pos))
            .and_then(|c| c.majority(Some(ref_base)))
        {
            None => consensus.push(ref_base, PROFILE_MATCH),
            Some((symbol, _)) => {
                if symbol == DELETION_SYMBOL {
                    deletions += 1;
                    consensus.push(DELETION_SYMBOL, PROFILE_DELETION);
                } else {
                    if symbol != ref_base {
                        substitutions += 1;
                    }
                    consensus.push(symbol, PROFILE_MATCH);
                }
            }
        }

        let mut insertion_index = 1;
        while let Some(counts) = table.counts(&PositionKey::new(pos, insertion_index)) {
            let Some((symbol, count)) = counts.majority(None) else {
                break;
            };
            if (count as u64) * 2 < counts.total() as u64 {
                log::trace!(
                    "Insertion run after position {} stops at index {} ({}/{})",
                    pos,
                    insertion_index,
                    count,
                    counts.total()
                );
                break;
            }
            insertions += 1;
            consensus.push(symbol, PROFILE_INSERTION);
            insertion_index += 1;
        }
    }

    log::debug!(
        "Consensus of length {} over reference of length {}: {} substitutions, {} deletions, {} inserted bases",
        consensus.len(),
        reference.len(),
        substitutions,
        deletions,
        insertions
    );

    consensus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_from(calls: &[&[(usize, &str)]]) -> FrequencyTable {
        let mut table = FrequencyTable::new();
        for call in calls {
            table.add_call(&FilteredCall {
                calls: call
                    .iter()
                    .map(|(p, b)| (*p, CalledBases::from_slice(b.as_bytes())))
                    .collect(),
                low_quality_sites: 0,
            });
        }
        table
    }

    #[test]
    fn test_empty_table_yields_reference() {
        let cons = select_consensus(&FrequencyTable::new(), b"ACGT");
        assert_eq!(cons.sequence, b"ACGT".to_vec());
        assert_eq!(cons.profile, b"....".to_vec());
    }

    #[test]
    fn test_substitution_and_deletion() {
        let table = table_from(&[
            &[(1, "A"), (2, "G"), (3, "-"), (4, "T")],
            &[(1, "A"), (2, "G"), (3, "-"), (4, "T")],
            &[(1, "A"), (2, "C"), (3, "G"), (4, "T")],
        ]);
        let cons = select_consensus(&table, b"ACGT");
        assert_eq!(cons.sequence_str(), "AG-T");
        assert_eq!(cons.profile_str(), "..-.");
    }

    #[test]
    fn test_tie_prefers_reference_base() {
        let table = table_from(&[&[(1, "A"), (2, "T")], &[(1, "A"), (2, "C")]]);
        let cons = select_consensus(&table, b"ACGT");
        assert_eq!(cons.sequence_str(), "ACGT");
    }

    #[test]
    fn test_tie_without_reference_base_takes_smallest() {
        let table = table_from(&[&[(1, "A"), (2, "T")], &[(1, "A"), (2, "G")]]);
        let cons = select_consensus(&table, b"ACGT");
        assert_eq!(cons.sequence_str(), "AGGT");
    }

    #[test]
    fn test_insertion_accepted_at_half() {
        let table = table_from(&[
            &[(2, "CTA")],
            &[(2, "CT")],
            &[(2, "C")],
        ]);
        // index 1: T x2 of 2 -> accepted; index 2: A x1 of 1 -> accepted
        let cons = select_consensus(&table, b"ACGT");
        assert_eq!(cons.sequence_str(), "ACTAGT");
        assert_eq!(cons.profile_str(), "..++..");
    }

    #[test]
    fn test_insertion_prefix_rule() {
        // Index 1 splits three ways and its leader holds 1 of 3, so index 2
        // is never considered even though it is unanimous.
        let table = table_from(&[&[(2, "CTC")], &[(2, "CAC")], &[(2, "CGC")]]);
        let cons = select_consensus(&table, b"ACGT");
        assert_eq!(cons.sequence_str(), "ACGT");
        assert_eq!(cons.profile_str(), "....");
    }
}
