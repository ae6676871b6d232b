use std::sync::{Arc, Mutex};

use taskchain::chain::{ChainIdAllocator, StreamChainIdAllocator};
use taskchain::types::{ChainId, StreamId};

/// A chain id allocator that:
/// - delegates to the in-process per-stream allocator
/// - records every request as `(stream, issued id)` in call order.
pub struct RecordingAllocator {
    inner: StreamChainIdAllocator,
    requests: Arc<Mutex<Vec<(StreamId, ChainId)>>>,
}

impl RecordingAllocator {
    pub fn new(requests: Arc<Mutex<Vec<(StreamId, ChainId)>>>) -> Self {
        Self {
            inner: StreamChainIdAllocator::new(),
            requests,
        }
    }
}

impl ChainIdAllocator for RecordingAllocator {
    fn allocate_chain_id(&mut self, stream: StreamId) -> ChainId {
        let id = self.inner.allocate_chain_id(stream);
        self.requests.lock().unwrap().push((stream, id));
        id
    }
}
