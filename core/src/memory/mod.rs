//! Pooled scratch memory for list values produced during evaluation.

mod pool;

pub use pool::{Memory, MemoryPool, PoolSlice};
