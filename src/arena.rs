//! Bump allocator for variable-length cell data.
//!
//! The arena hands out regions carved from large `BytesMut` chunks. Each
//! region is split off the chunk, so it shares the chunk's allocation and
//! stays valid for as long as someone holds it, but the arena itself only
//! tracks the chunk it is currently carving from.
//!
//! Two kinds of arena exist in the system:
//!
//! - **Store arena**: owned by a `DeltaMemStore`, lives as long as the store,
//!   receives a deep copy of every inserted change list.
//! - **Scratch arena**: owned by a reader, bound to the column blocks of one
//!   batch, and reset between batches.
//!
//! `reset` takes `&mut self`, so no `ColumnBlock` can still be borrowing the
//! arena when its accounting is rewound.

use crate::config::ArenaConfig;
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct Arena {
    config: ArenaConfig,
    inner: Mutex<ArenaInner>,
}

#[derive(Debug)]
struct ArenaInner {
    /// Chunk currently being carved; always empty, regions are split off.
    current: BytesMut,
    next_chunk_size: usize,
    /// Total capacity of every chunk handed out since the last reset.
    reserved: usize,
    /// Bytes actually handed out since the last reset.
    used: usize,
}

impl ArenaInner {
    fn new(config: &ArenaConfig) -> Self {
        Self {
            current: BytesMut::new(),
            next_chunk_size: config.initial_chunk_size.max(1),
            reserved: 0,
            used: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.current.capacity() - self.current.len()
    }
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Self {
        let inner = Mutex::new(ArenaInner::new(&config));
        Self { config, inner }
    }

    /// Allocates a zeroed region of `size` bytes.
    pub fn allocate(&self, size: usize) -> Result<BytesMut> {
        let mut inner = self.inner.lock();
        if inner.remaining() < size {
            self.add_chunk(&mut inner, size)?;
        }
        inner.current.resize(size, 0);
        inner.used += size;
        Ok(inner.current.split())
    }

    /// Copies `src` into the arena and returns the frozen copy.
    pub fn copy_bytes(&self, src: &[u8]) -> Result<Bytes> {
        let mut region = self.allocate(src.len())?;
        region.copy_from_slice(src);
        Ok(region.freeze())
    }

    /// Forgets every chunk. Regions handed out earlier keep their own
    /// reference to the backing memory, but no longer count against the
    /// arena's footprint or limit.
    pub fn reset(&mut self) {
        *self.inner.get_mut() = ArenaInner::new(&self.config);
    }

    /// Bytes reserved in chunks since the last reset.
    pub fn memory_footprint(&self) -> usize {
        self.inner.lock().reserved
    }

    /// Bytes handed out since the last reset.
    pub fn used(&self) -> usize {
        self.inner.lock().used
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    fn add_chunk(&self, inner: &mut ArenaInner, min_size: usize) -> Result<()> {
        let mut chunk_size = inner.next_chunk_size.max(min_size);

        if let Some(limit) = self.config.memory_limit {
            let budget = limit.saturating_sub(inner.reserved);
            if budget < min_size {
                return Err(Error::ArenaExhausted {
                    requested: min_size,
                    limit,
                });
            }
            chunk_size = chunk_size.min(budget);
        }

        tracing::trace!(chunk_size, reserved = inner.reserved, "Arena adding chunk");
        inner.current = BytesMut::with_capacity(chunk_size);
        inner.reserved += chunk_size;
        inner.next_chunk_size = inner
            .next_chunk_size
            .saturating_mul(2)
            .min(self.config.max_chunk_size.max(1));
        Ok(())
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}
