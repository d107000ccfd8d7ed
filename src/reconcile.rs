use crate::alignment::{AlignmentResult, Aligner, GAP};
use crate::constants::*;
use crate::error::{RefconsError, Result};
use crate::types::*;
use std::collections::BTreeSet;

/// Restores original-reference coordinates for a consensus that was built
/// against a later (re-derived) reference.
pub struct Reconciler<A: Aligner> {
    aligner: A,
}

impl<A: Aligner> Reconciler<A> {
    pub fn new(aligner: A) -> Self {
        Self { aligner }
    }

    /// Drops deletion columns (by symbol or by profile) and aligns what is
    /// left against the original reference.
    fn align_normalized(
        &self,
        original: &[u8],
        consensus: &ConsensusSequence,
    ) -> Result<(Vec<u8>, AlignmentResult)> {
        consensus.check_lengths()?;
        let normalized = consensus.ungapped();
        log::debug!(
            "Aligning normalized consensus ({} of {} columns kept) to original reference of length {}",
            normalized.len(),
            consensus.len(),
            original.len()
        );
        let alignment = self.aligner.align(original, &normalized)?;
        Ok((normalized, alignment))
    }

    /// Flat-profile reconciliation. The result has one `.` or `-` column per
    /// original reference base plus a `+` column per inserted consensus base.
    pub fn reconcile(
        &self,
        original: &[u8],
        consensus: &ConsensusSequence,
    ) -> Result<ReconciliationResult> {
        let (normalized, alignment) = self.align_normalized(original, consensus)?;
        check_coverage(&alignment, original.len(), normalized.len())?;

        let mut result = ReconciliationResult::with_capacity(alignment.gapped_reference.len());
        for (ref_char, cons_char) in alignment.columns() {
            if ref_char == GAP {
                result.push(cons_char, PROFILE_INSERTION);
            } else if cons_char == GAP {
                result.push(ref_char, PROFILE_DELETION);
            } else {
                result.push(cons_char, PROFILE_MATCH);
            }
        }
        Ok(result)
    }

    /// Coordinate-map reconciliation for callers that need old-to-new position
    /// lookups. `previous_deletions` are the 1-based original positions the
    /// previous round recorded as deleted.
    pub fn coordinate_map(
        &self,
        original: &[u8],
        consensus: &ConsensusSequence,
        previous_deletions: &BTreeSet<usize>,
    ) -> Result<CoordinateMap> {
        let (normalized, alignment) = self.align_normalized(original, consensus)?;
        if alignment.reference_begin != 0 || alignment.query_begin != 0 {
            return Err(RefconsError::LeadingOffsetMismatch {
                reference_begin: alignment.reference_begin,
                query_begin: alignment.query_begin,
            });
        }
        check_coverage(&alignment, original.len(), normalized.len())?;

        let mut map = CoordinateMap {
            columns: Vec::with_capacity(original.len()),
            leading_insertions: vec![],
            consensus: normalized,
        };
        let mut ref_pos = 0;
        let mut cons_pos = 0;
        let mut new_deletions = 0;
        let mut merged_deletions = 0;

        for (ref_char, cons_char) in alignment.columns() {
            if ref_char == GAP {
                cons_pos += 1;
                push_insertion(&mut map, ref_pos, cons_pos);
                continue;
            }

            ref_pos += 1;
            let current_deletion = cons_char == GAP;
            let previous_deletion = previous_deletions.contains(&ref_pos);
            if !current_deletion {
                cons_pos += 1;
            }

            let mut column = MappedColumn {
                reference_position: ref_pos,
                ..Default::default()
            };
            match (current_deletion, previous_deletion) {
                (true, true) => {
                    column.deleted = true;
                }
                (true, false) => {
                    log::trace!("New deletion at original position {}", ref_pos);
                    new_deletions += 1;
                    column.deleted = true;
                }
                (false, true) => {
                    // The base now sitting on a previously deleted column is
                    // an insertion after the prior position.
                    log::trace!(
                        "Deletion at original position {} merged into insertion after {}",
                        ref_pos,
                        ref_pos - 1
                    );
                    merged_deletions += 1;
                    push_insertion(&mut map, ref_pos - 1, cons_pos);
                }
                (false, false) => {
                    column.consensus_position = Some(cons_pos);
                }
            }
            map.columns.push(column);
        }

        log::debug!(
            "Coordinate map over {} positions: {} new deletions, {} previous deletions merged",
            map.columns.len(),
            new_deletions,
            merged_deletions
        );
        Ok(map)
    }
}

fn push_insertion(map: &mut CoordinateMap, ref_pos: usize, cons_pos: usize) {
    if ref_pos == 0 {
        map.leading_insertions.push(cons_pos);
    } else {
        map.columns[ref_pos - 1].insertions.push(cons_pos);
    }
}

/// The consensus derives from the reference, so anything short of a full
/// end-to-end alignment means the consensus is broken.
fn check_coverage(alignment: &AlignmentResult, reference_len: usize, query_len: usize) -> Result<()> {
    if alignment.covers(reference_len, query_len) {
        return Ok(());
    }
    Err(RefconsError::CoverageViolation {
        reference_begin: alignment.reference_begin,
        reference_end: alignment.reference_end,
        reference_len,
        query_begin: alignment.query_begin,
        query_end: alignment.query_end,
        query_len,
    })
}
