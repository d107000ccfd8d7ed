use crate::constants::*;
use crate::error::{RefconsError, Result};
use block_aligner::{cigar::*, scan_block::*, scores::*};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const GAP: u8 = b'-';

/// Pairwise alignment as consumed by the reconciler. Offsets are 0-based and
/// end-exclusive; the gapped strings have equal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    pub reference_begin: usize,
    pub reference_end: usize,
    pub query_begin: usize,
    pub query_end: usize,
    pub gapped_reference: Vec<u8>,
    pub gapped_query: Vec<u8>,
}

impl AlignmentResult {
    /// Builds a result that starts at 0 on both sequences from two gapped
    /// strings; ends are the ungapped lengths.
    pub fn from_gapped(gapped_reference: &[u8], gapped_query: &[u8]) -> Self {
        Self {
            reference_begin: 0,
            reference_end: gapped_reference.iter().filter(|&&b| b != GAP).count(),
            query_begin: 0,
            query_end: gapped_query.iter().filter(|&&b| b != GAP).count(),
            gapped_reference: gapped_reference.to_vec(),
            gapped_query: gapped_query.to_vec(),
        }
    }

    /// True if the alignment spans both sequences from first to last base.
    pub fn covers(&self, reference_len: usize, query_len: usize) -> bool {
        self.reference_begin == 0
            && self.query_begin == 0
            && self.reference_end == reference_len
            && self.query_end == query_len
    }

    pub fn columns(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.gapped_reference
            .iter()
            .copied()
            .zip(self.gapped_query.iter().copied())
    }
}

/// Full (end-to-end) pairwise aligner.
pub trait Aligner {
    fn align(&self, reference: &[u8], query: &[u8]) -> Result<AlignmentResult>;
}

/// Global alignment with `block_aligner`.
#[derive(Clone)]
pub struct BlockAligner {
    pub gaps: Gaps,
    pub min_block_size: usize,
    pub max_block_size: usize,
}

impl Default for BlockAligner {
    fn default() -> Self {
        Self {
            gaps: GAPS,
            min_block_size: MIN_BLOCK_SIZE,
            max_block_size: MAX_BLOCK_SIZE,
        }
    }
}

impl Aligner for BlockAligner {
    fn align(&self, reference: &[u8], query: &[u8]) -> Result<AlignmentResult> {
        if reference.is_empty() || query.is_empty() {
            let cigar = [
                OpLen { op: Operation::D, len: reference.len() },
                OpLen { op: Operation::I, len: query.len() },
            ];
            let (gapped_reference, gapped_query) = gapped_from_cigar(&cigar, reference, query);
            return Ok(AlignmentResult {
                reference_begin: 0,
                reference_end: reference.len(),
                query_begin: 0,
                query_end: query.len(),
                gapped_reference,
                gapped_query,
            });
        }

        let cigar = align_global(reference, query, &self.gaps, self.min_block_size, self.max_block_size);
        let (ref_len, query_len) = get_length_from_cigar(&cigar);
        let (gapped_reference, gapped_query) = gapped_from_cigar(&cigar, reference, query);
        log::trace!(
            "Global alignment: {} ops, reference {}/{}, query {}/{}",
            cigar.len(),
            ref_len,
            reference.len(),
            query_len,
            query.len()
        );
        Ok(AlignmentResult {
            reference_begin: 0,
            reference_end: ref_len,
            query_begin: 0,
            query_end: query_len,
            gapped_reference,
            gapped_query,
        })
    }
}

fn align_global(
    reference: &[u8],
    query: &[u8],
    gaps: &Gaps,
    min_block_size: usize,
    max_block_size: usize,
) -> Vec<OpLen> {
    let reference = reference.to_ascii_uppercase();
    let query = query.to_ascii_uppercase();
    let max_bs = block_size_from_seq(query.len().max(reference.len()), min_block_size, max_block_size);
    let mut a = Block::<true, false>::new(query.len(), reference.len(), max_bs);
    let reference_pad = PaddedBytes::from_bytes::<NucMatrix>(&reference, max_bs);
    let query_pad = PaddedBytes::from_bytes::<NucMatrix>(&query, max_bs);
    a.align(
        &query_pad,
        &reference_pad,
        &SUB_MATRIX,
        *gaps,
        min_block_size..=max_bs,
        i32::MAX,
    );
    let res = a.res();
    let mut cigar = Cigar::new(res.query_idx, res.reference_idx);
    a.trace().cigar_eq(
        &query_pad,
        &reference_pad,
        res.query_idx,
        res.reference_idx,
        &mut cigar,
    );
    cigar.to_vec()
}

#[inline]
fn block_size_from_seq(seq_length: usize, min_block_size: usize, max_block_size: usize) -> usize {
    let mut block_size = min_block_size;
    while block_size < max_block_size && block_size * 8 < seq_length {
        block_size *= 2;
    }
    block_size
}

pub fn get_length_from_cigar(cigar: &[OpLen]) -> (usize, usize) {
    let mut add_length_ref = 0;
    let mut add_length_q = 0;
    for op_len in cigar {
        match op_len.op {
            Operation::M | Operation::X | Operation::Eq => {
                add_length_ref += op_len.len;
                add_length_q += op_len.len;
            }
            Operation::I => {
                add_length_q += op_len.len;
            }
            Operation::D => {
                add_length_ref += op_len.len;
            }
            _ => {}
        }
    }
    (add_length_ref, add_length_q)
}

/// Expands a cigar into the two gapped rows of the alignment.
pub fn gapped_from_cigar(cigar: &[OpLen], reference: &[u8], query: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut gapped_reference = Vec::with_capacity(reference.len() + query.len());
    let mut gapped_query = Vec::with_capacity(reference.len() + query.len());
    let mut r = 0;
    let mut q = 0;
    for op_len in cigar {
        match op_len.op {
            Operation::M | Operation::X | Operation::Eq => {
                gapped_reference.extend_from_slice(&reference[r..r + op_len.len]);
                gapped_query.extend_from_slice(&query[q..q + op_len.len]);
                r += op_len.len;
                q += op_len.len;
            }
            Operation::I => {
                gapped_reference.extend(std::iter::repeat(GAP).take(op_len.len));
                gapped_query.extend_from_slice(&query[q..q + op_len.len]);
                q += op_len.len;
            }
            Operation::D => {
                gapped_reference.extend_from_slice(&reference[r..r + op_len.len]);
                gapped_query.extend(std::iter::repeat(GAP).take(op_len.len));
                r += op_len.len;
            }
            _ => {}
        }
    }
    (gapped_reference, gapped_query)
}

/// Returns pre-set alignments in order, ignoring its inputs.
#[derive(Debug, Default)]
pub struct ScriptedAligner {
    script: Mutex<VecDeque<AlignmentResult>>,
}

impl ScriptedAligner {
    pub fn new(script: Vec<AlignmentResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Aligner for ScriptedAligner {
    fn align(&self, _reference: &[u8], _query: &[u8]) -> Result<AlignmentResult> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| RefconsError::Aligner("scripted aligner lock poisoned".to_string()))?;
        script
            .pop_front()
            .ok_or_else(|| RefconsError::Aligner("scripted aligner has no alignment left".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(gapped: &[u8]) -> Vec<u8> {
        gapped.iter().copied().filter(|&b| b != GAP).collect()
    }

    #[test]
    fn test_gapped_from_cigar() {
        let cigar = vec![
            OpLen { op: Operation::M, len: 2 },
            OpLen { op: Operation::I, len: 1 },
            OpLen { op: Operation::M, len: 1 },
            OpLen { op: Operation::D, len: 2 },
        ];
        let (r, q) = gapped_from_cigar(&cigar, b"ACGTA", b"ACTG");
        assert_eq!(r, b"AC-GTA".to_vec());
        assert_eq!(q, b"ACTG--".to_vec());
        assert_eq!(get_length_from_cigar(&cigar), (5, 4));
    }

    #[test]
    fn test_from_gapped_offsets() {
        let res = AlignmentResult::from_gapped(b"AC-GT", b"ACTG-");
        assert_eq!(res.reference_end, 4);
        assert_eq!(res.query_end, 4);
        assert!(res.covers(4, 4));
        assert!(!res.covers(5, 4));
    }

    #[test]
    fn test_scripted_aligner_runs_out() {
        let aligner = ScriptedAligner::new(vec![AlignmentResult::from_gapped(b"A", b"A")]);
        assert!(aligner.align(b"A", b"A").is_ok());
        assert_eq!(aligner.remaining(), 0);
        assert!(matches!(aligner.align(b"A", b"A"), Err(RefconsError::Aligner(_))));
    }

    #[test]
    fn test_block_aligner_identical() {
        let seq = b"ACGTTGCAAGCTTAGCCGATAGGCTAACGTTAGCATCGATCGGATCCATGCAAGTCGATCGA";
        let res = BlockAligner::default().align(seq, seq).unwrap();
        assert!(res.covers(seq.len(), seq.len()));
        assert_eq!(res.gapped_reference, seq.to_vec());
        assert_eq!(res.gapped_query, seq.to_vec());
    }

    #[test]
    fn test_block_aligner_spans_both_with_deletion() {
        let reference = b"ACGTTGCAAGCTTAGCCGATAGGCTAACGTTAGCATCGATCGGATCCATGCAAGTCGATCGA";
        let mut query = reference.to_vec();
        query.remove(30);
        let res = BlockAligner::default().align(reference, &query).unwrap();
        assert!(res.covers(reference.len(), query.len()));
        assert_eq!(strip(&res.gapped_reference), reference.to_vec());
        assert_eq!(strip(&res.gapped_query), query);
        assert_eq!(res.gapped_query.iter().filter(|&&b| b == GAP).count(), 1);
    }

    #[test]
    fn test_empty_query() {
        let res = BlockAligner::default().align(b"ACG", b"").unwrap();
        assert!(res.covers(3, 0));
        assert_eq!(res.gapped_query, b"---".to_vec());
    }
}
