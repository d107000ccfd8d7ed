use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

use crate::constants::*;
use crate::error::{RefconsError, Result};

/// Bases called at one reference position by one read. Longer than one base
/// when an insertion run follows the aligned base.
pub type CalledBases = SmallVec<[u8; 4]>;

/// One decoded alignment record.
///
/// `aligned_pairs` holds `(read index, reference index)`, both 0-based. A missing
/// reference index is an inserted (or soft-clipped) read base, a missing read
/// index is a deleted reference base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub aligned_pairs: Vec<(Option<usize>, Option<usize>)>,
}

impl ReadRecord {
    pub fn new(
        sequence: Vec<u8>,
        quality: Vec<u8>,
        aligned_pairs: Vec<(Option<usize>, Option<usize>)>,
    ) -> Self {
        Self {
            sequence,
            quality,
            aligned_pairs,
        }
    }

    pub fn mean_quality(&self) -> f64 {
        if self.quality.is_empty() {
            return 0.;
        }
        self.quality.iter().map(|q| *q as f64).sum::<f64>() / self.quality.len() as f64
    }
}

/// Per-position calls of a read that passed the pre-filters. Positions are
/// 1-based and non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredCall {
    pub calls: Vec<(usize, CalledBases)>,
    /// Groups dropped by the site-quality filter.
    pub low_quality_sites: usize,
}

impl FilteredCall {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub position: usize,
    pub insertion_index: usize,
}

impl PositionKey {
    pub fn new(position: usize, insertion_index: usize) -> Self {
        Self {
            position,
            insertion_index,
        }
    }

    pub fn aligned(position: usize) -> Self {
        Self::new(position, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterFailure {
    TooShort,
    LowOverallQuality,
}

impl fmt::Display for FilterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterFailure::TooShort => write!(f, "too_short"),
            FilterFailure::LowOverallQuality => write!(f, "low_overall_quality"),
        }
    }
}

/// Set of reasons a read was excluded. Reasons combine freely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterFlags {
    failures: BTreeSet<FilterFailure>,
}

impl FilterFlags {
    pub fn insert(&mut self, failure: FilterFailure) {
        self.failures.insert(failure);
    }

    pub fn contains(&self, failure: FilterFailure) -> bool {
        self.failures.contains(&failure)
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterFailure> {
        self.failures.iter()
    }
}

pub type FilterOutcome = std::result::Result<FilteredCall, FilterFlags>;

/// Run-level counters. Excluded reads are counted once per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub total_reads: usize,
    pub tallied_reads: usize,
    pub too_short: usize,
    pub low_overall_quality: usize,
    pub excluded_reads: usize,
    pub low_site_quality_sites: usize,
}

impl FilterSummary {
    pub fn record(&mut self, outcome: &FilterOutcome) {
        self.total_reads += 1;
        match outcome {
            Ok(call) => {
                self.tallied_reads += 1;
                self.low_site_quality_sites += call.low_quality_sites;
            }
            Err(flags) => {
                self.excluded_reads += 1;
                if flags.contains(FilterFailure::TooShort) {
                    self.too_short += 1;
                }
                if flags.contains(FilterFailure::LowOverallQuality) {
                    self.low_overall_quality += 1;
                }
            }
        }
    }
}

/// Consensus calls plus an equal-length profile over `+`, `-` and `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusSequence {
    pub sequence: Vec<u8>,
    pub profile: Vec<u8>,
}

impl ConsensusSequence {
    pub fn new(sequence: Vec<u8>, profile: Vec<u8>) -> Self {
        Self { sequence, profile }
    }

    /// Fails if the calls and the profile do not line up.
    pub fn check_lengths(&self) -> Result<()> {
        if self.sequence.len() != self.profile.len() {
            return Err(RefconsError::ProfileLengthMismatch {
                sequence_len: self.sequence.len(),
                profile_len: self.profile.len(),
            });
        }
        Ok(())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sequence: Vec::with_capacity(capacity),
            profile: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, symbol: u8, profile: u8) {
        self.sequence.push(symbol);
        self.profile.push(profile);
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Position `i` is a deletion if either the call or the profile says so.
    #[inline]
    pub fn is_deletion(&self, i: usize) -> bool {
        self.sequence.get(i) == Some(&DELETION_SYMBOL)
            || self.profile.get(i) == Some(&PROFILE_DELETION)
    }

    /// Sequence with every deletion column removed. Calls past the end of the
    /// profile are judged by their symbol alone.
    pub fn ungapped(&self) -> Vec<u8> {
        self.sequence
            .iter()
            .enumerate()
            .filter(|&(i, _)| !self.is_deletion(i))
            .map(|(_, &base)| base)
            .collect()
    }

    pub fn sequence_str(&self) -> String {
        String::from_utf8_lossy(&self.sequence).into_owned()
    }

    pub fn profile_str(&self) -> String {
        String::from_utf8_lossy(&self.profile).into_owned()
    }
}

/// Consensus realigned 1:1 against the original reference.
pub type ReconciliationResult = ConsensusSequence;

/// One original reference position in a [`CoordinateMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedColumn {
    /// 1-based position in the original reference.
    pub reference_position: usize,
    /// 1-based position in the normalized consensus aligned to this column.
    pub consensus_position: Option<usize>,
    pub deleted: bool,
    /// Consensus positions inserted after this reference position.
    pub insertions: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateMap {
    pub columns: Vec<MappedColumn>,
    /// Consensus positions inserted before the first reference base.
    pub leading_insertions: Vec<usize>,
    pub consensus: Vec<u8>,
}

impl CoordinateMap {
    /// Original reference positions recorded as deleted.
    pub fn deletions(&self) -> BTreeSet<usize> {
        self.columns
            .iter()
            .filter(|c| c.deleted)
            .map(|c| c.reference_position)
            .collect()
    }

    /// Consensus position aligned to a 1-based original reference position.
    pub fn lookup(&self, reference_position: usize) -> Option<usize> {
        if reference_position == 0 {
            return None;
        }
        self.columns
            .get(reference_position - 1)
            .and_then(|c| c.consensus_position)
    }

    /// Flattened sequence and profile in the same shape the flat reconciler
    /// produces. Deleted columns carry the original reference base.
    /// Fails if `original` is not the reference the map was built against.
    pub fn profile(&self, original: &[u8]) -> Result<ConsensusSequence> {
        if original.len() != self.columns.len() {
            return Err(RefconsError::InvalidCoordinateMap(format!(
                "map has {} columns but the original reference has {} bases",
                self.columns.len(),
                original.len()
            )));
        }
        let mut out = ConsensusSequence::with_capacity(original.len());
        for &pos in self.leading_insertions.iter() {
            out.push(self.consensus_base(pos)?, PROFILE_INSERTION);
        }
        for column in self.columns.iter() {
            if column.deleted {
                let base = column
                    .reference_position
                    .checked_sub(1)
                    .and_then(|i| original.get(i))
                    .ok_or_else(|| {
                        RefconsError::InvalidCoordinateMap(format!(
                            "reference position {} is outside the original reference",
                            column.reference_position
                        ))
                    })?;
                out.push(*base, PROFILE_DELETION);
            } else if let Some(pos) = column.consensus_position {
                out.push(self.consensus_base(pos)?, PROFILE_MATCH);
            }
            for &pos in column.insertions.iter() {
                out.push(self.consensus_base(pos)?, PROFILE_INSERTION);
            }
        }
        Ok(out)
    }

    fn consensus_base(&self, position: usize) -> Result<u8> {
        position
            .checked_sub(1)
            .and_then(|i| self.consensus.get(i))
            .copied()
            .ok_or_else(|| {
                RefconsError::InvalidCoordinateMap(format!(
                    "consensus position {} is outside a consensus of length {}",
                    position,
                    self.consensus.len()
                ))
            })
    }
}
