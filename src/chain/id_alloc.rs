// src/chain/id_alloc.rs

//! Chain id allocation.

use std::collections::HashMap;

use crate::types::{ChainId, StreamId};

/// Hands out chain ids scoped by stream.
///
/// Every call must return an id strictly greater than any id previously
/// returned for the same stream.
pub trait ChainIdAllocator {
    fn allocate_chain_id(&mut self, stream: StreamId) -> ChainId;
}

/// In-process allocator: one counter per stream, starting at zero.
#[derive(Debug, Default)]
pub struct StreamChainIdAllocator {
    next: HashMap<StreamId, u64>,
}

impl StreamChainIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids issued so far for `stream`.
    pub fn issued(&self, stream: StreamId) -> u64 {
        self.next.get(&stream).copied().unwrap_or(0)
    }
}

impl ChainIdAllocator for StreamChainIdAllocator {
    fn allocate_chain_id(&mut self, stream: StreamId) -> ChainId {
        let counter = self.next.entry(stream).or_insert(0);
        let id = ChainId {
            stream,
            index: *counter,
        };
        *counter += 1;
        id
    }
}
