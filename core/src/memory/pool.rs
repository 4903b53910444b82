use std::sync::Arc;

use lazy_static::lazy_static;

use crate::api::EvalError;
use crate::values::Numeric;

/// Handle to a rented range of a [`MemoryPool`].
///
/// Only valid until the next [`MemoryPool::free_all`] on the pool that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSlice {
    start: usize,
    len: usize,
}

impl PoolSlice {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump-style scratch storage for per-respondent list results.
///
/// The backing buffer grows on demand up to `capacity` values and is kept
/// across [`free_all`](Self::free_all), so steady-state evaluation does not
/// allocate.
#[derive(Debug)]
pub struct MemoryPool {
    values: Vec<Numeric>,
    used: usize,
    capacity: usize,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            used: 0,
            capacity,
        }
    }

    pub fn rent(&mut self, len: usize) -> Result<PoolSlice, EvalError> {
        let end = self
            .used
            .checked_add(len)
            .filter(|end| *end <= self.capacity)
            .ok_or(EvalError::ResourceExceeded {
                limit: self.capacity,
            })?;
        if self.values.len() < end {
            self.values.resize(end, Numeric::NULL);
        }
        let slice = PoolSlice {
            start: self.used,
            len,
        };
        self.used = end;
        Ok(slice)
    }

    /// Keeps only the first `len` values of `slice`. Space is returned to the
    /// pool when `slice` is the most recent rental.
    pub fn shrink(&mut self, slice: PoolSlice, len: usize) -> PoolSlice {
        let len = len.min(slice.len);
        if slice.start + slice.len == self.used {
            self.used = slice.start + len;
        }
        PoolSlice {
            start: slice.start,
            len,
        }
    }

    /// Invalidates every outstanding rental.
    pub fn free_all(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slice(&self, slice: PoolSlice) -> &[Numeric] {
        &self.values[slice.start..slice.start + slice.len]
    }

    pub fn slice_mut(&mut self, slice: PoolSlice) -> &mut [Numeric] {
        &mut self.values[slice.start..slice.start + slice.len]
    }
}

lazy_static! {
    static ref EMPTY: Arc<[Numeric]> = Arc::from(Vec::new());
}

/// A list value: either immutable shared storage (constants) or a rental in
/// the evaluating pool.
#[derive(Debug, Clone)]
pub enum Memory {
    Shared(Arc<[Numeric]>),
    Pooled(PoolSlice),
}

impl Memory {
    pub fn empty() -> Self {
        Memory::Shared(EMPTY.clone())
    }

    pub fn from_values(values: impl IntoIterator<Item = Numeric>) -> Self {
        Memory::Shared(values.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Memory::Shared(values) => values.len(),
            Memory::Pooled(slice) => slice.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice<'p>(&'p self, pool: &'p MemoryPool) -> &'p [Numeric] {
        match self {
            Memory::Shared(values) => &values[..],
            Memory::Pooled(slice) => pool.slice(*slice),
        }
    }

    pub fn get(&self, index: usize, pool: &MemoryPool) -> Numeric {
        self.as_slice(pool)[index]
    }

    /// Copies pooled contents out so the value survives `free_all`.
    pub fn into_shared(self, pool: &MemoryPool) -> Memory {
        match self {
            Memory::Pooled(slice) => Memory::Shared(pool.slice(slice).into()),
            shared => shared,
        }
    }
}
