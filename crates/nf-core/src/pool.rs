//! Scoped scratch pool.
//!
//! Hands out reusable scratch values through an RAII guard. A value checked
//! out with [`Pool::get`] is reset and returned to the free list when its
//! guard drops, and the borrow checker keeps it from outliving the guard.
//! Guards nest freely; inner guards drop before outer ones.

use std::cell::{Cell, RefCell};
use std::ops::{Deref, DerefMut};

pub struct Pool<T> {
    free: RefCell<Vec<T>>,
    builder: fn() -> T,
    reset: fn(&mut T),
    checked_out: Cell<usize>,
}

impl<T> Pool<T> {
    pub fn new(builder: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            free: RefCell::new(Vec::new()),
            builder,
            reset,
            checked_out: Cell::new(0),
        }
    }

    /// Check out a scratch value. Recycles a previously returned value when
    /// one is available.
    pub fn get(&self) -> Pooled<'_, T> {
        let value = self
            .free
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| (self.builder)());
        self.checked_out.set(self.checked_out.get() + 1);
        Pooled {
            pool: self,
            value: Some(value),
        }
    }

    /// Run `f` with a scratch value checked out for its duration.
    pub fn run<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut scratch = self.get();
        f(&mut scratch)
    }

    /// Values currently checked out.
    pub fn in_use(&self) -> usize {
        self.checked_out.get()
    }

    /// Values waiting on the free list.
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }

    fn give_back(&self, mut value: T) {
        (self.reset)(&mut value);
        self.checked_out.set(self.checked_out.get().saturating_sub(1));
        self.free.borrow_mut().push(value);
    }
}

impl<T> Pool<Vec<T>> {
    /// Pool of vectors, cleared on return so capacity is kept.
    pub fn vecs() -> Self {
        Self::new(Vec::new, Vec::clear)
    }
}

/// Guard for a checked-out scratch value.
pub struct Pooled<'p, T> {
    pool: &'p Pool<T>,
    value: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // Only `Drop` takes the value.
        match &self.value {
            Some(v) => v,
            None => unreachable!("pooled value taken before drop"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(v) => v,
            None => unreachable!("pooled value taken before drop"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.give_back(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector2;

    fn vector_pool() -> Pool<Vector2> {
        Pool::new(Vector2::default, |v| *v = Vector2::ZERO)
    }

    #[test]
    fn values_are_reset_and_recycled() {
        let pool = vector_pool();
        {
            let mut a = pool.get();
            a.x = 4.0;
            assert_eq!(pool.in_use(), 1);
        }
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.available(), 1);

        let b = pool.get();
        assert_eq!(*b, Vector2::ZERO);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn nested_scopes_restore_outer_count() {
        let pool = vector_pool();
        let outer = pool.get();
        {
            let _inner_a = pool.get();
            let _inner_b = pool.get();
            assert_eq!(pool.in_use(), 3);
        }
        assert_eq!(pool.in_use(), 1);
        drop(outer);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn vec_pool_keeps_capacity() {
        let pool: Pool<Vec<u32>> = Pool::vecs();
        pool.run(|v| v.extend(0..64));
        let v = pool.get();
        assert!(v.is_empty());
        assert!(v.capacity() >= 64);
    }
}
