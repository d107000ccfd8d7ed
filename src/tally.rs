use crate::types::*;
use fxhash::FxHashMap;
use std::collections::BTreeMap;

/// Observed symbols at one [`PositionKey`]; `-` counts deletions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolCounts {
    counts: BTreeMap<u8, u32>,
}

impl SymbolCounts {
    #[inline]
    pub fn increment(&mut self, symbol: u8) {
        self.add(symbol, 1);
    }

    #[inline]
    pub fn add(&mut self, symbol: u8, count: u32) {
        let c = self.counts.entry(symbol).or_insert(0);
        *c = c.saturating_add(count);
    }

    pub fn get(&self, symbol: u8) -> u32 {
        self.counts.get(&symbol).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts.iter().map(|(s, c)| (*s, *c))
    }

    /// Most frequent symbol and its count. Ties go to `preferred` when it is
    /// among the leaders, otherwise to the smallest byte.
    pub fn majority(&self, preferred: Option<u8>) -> Option<(u8, u32)> {
        let max_count = *self.counts.values().max()?;
        if let Some(preferred) = preferred {
            if self.get(preferred) == max_count {
                return Some((preferred, max_count));
            }
        }
        // BTreeMap iterates in byte order, so the first leader is the smallest.
        self.counts
            .iter()
            .find(|(_, c)| **c == max_count)
            .map(|(s, c)| (*s, *c))
    }

    pub fn merge(&mut self, other: &SymbolCounts) {
        for (symbol, count) in other.iter() {
            self.add(symbol, count);
        }
    }
}

/// Symbol counts for every (reference position, insertion index) seen in the
/// tallied reads. Adding calls and merging tables commute, so the result does
/// not depend on the order reads arrive in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    table: FxHashMap<PositionKey, SymbolCounts>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands each called run into insertion indices 0, 1, 2, ...
    pub fn add_call(&mut self, call: &FilteredCall) {
        for (position, bases) in call.calls.iter() {
            for (insertion_index, base) in bases.iter().enumerate() {
                self.table
                    .entry(PositionKey::new(*position, insertion_index))
                    .or_default()
                    .increment(*base);
            }
        }
    }

    pub fn merge(&mut self, other: FrequencyTable) {
        if self.table.is_empty() {
            self.table = other.table;
            return;
        }
        for (key, counts) in other.table.into_iter() {
            self.table.entry(key).or_default().merge(&counts);
        }
    }

    pub fn counts(&self, key: &PositionKey) -> Option<&SymbolCounts> {
        self.table.get(key)
    }

    pub fn contains(&self, key: &PositionKey) -> bool {
        self.table.contains_key(key)
    }

    pub fn total(&self, key: &PositionKey) -> u32 {
        self.table.get(key).map(|c| c.total()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
