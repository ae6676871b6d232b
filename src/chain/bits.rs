// src/chain/bits.rs

//! Fixed-width bitsets over a merger's dense id space.

use bitvec::prelude::*;

use crate::errors::{Result, TaskChainError};

/// Set of dense task ids in `[0, len)`, stored as `u64` words.
///
/// Subset tests compare whole words, so their cost depends on the width of
/// the id space and not on how many bits are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorBits(BitVec<u64, Lsb0>);

impl AncestorBits {
    /// An empty set able to hold ids `0..len`.
    pub fn with_len(len: usize) -> Self {
        Self(bitvec![u64, Lsb0; 0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.not_any()
    }

    pub fn insert(&mut self, id: usize) -> Result<()> {
        if id >= self.0.len() {
            return Err(TaskChainError::invariant(format!(
                "dense id {} outside of bitset width {}",
                id,
                self.0.len()
            )));
        }
        self.0.set(id, true);
        Ok(())
    }

    pub fn contains(&self, id: usize) -> bool {
        self.0.get(id).is_some_and(|bit| *bit)
    }

    pub fn count_ones(&self) -> usize {
        self.0.count_ones()
    }

    /// `self ⊆ other`, i.e. `other | self == other` word by word.
    ///
    /// Sets of different widths come from different merge jobs and are never
    /// comparable.
    pub fn is_subset_of(&self, other: &AncestorBits) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .as_raw_slice()
                .iter()
                .zip(other.0.as_raw_slice())
                .all(|(&mine, &theirs)| theirs | mine == theirs)
    }
}
