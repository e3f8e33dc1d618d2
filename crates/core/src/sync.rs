// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency primitives used by the fork/join machinery.

use crate::error::WorkError;
use parking_lot::{Condvar, Mutex};

/// Count-down latch: `wait` blocks until `count_down` has been called the
/// initial number of times.
pub struct CountDownLatch {
    count: Mutex<usize>,
    cond: Condvar,
}

impl CountDownLatch {
    pub fn new(count: usize) -> Result<Self, WorkError> {
        if count == 0 {
            return Err(WorkError::invalid_argument(
                "latch count must be positive",
            ));
        }
        Ok(CountDownLatch {
            count: Mutex::new(count),
            cond: Condvar::new(),
        })
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock();
        if *count > 0 {
            *count -= 1;
        }
        if *count == 0 {
            self.cond.notify_all();
        }
    }

    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.cond.wait(&mut count);
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }
}

struct BarrierState {
    remaining: usize,
    generation: u64,
}

/// Cyclic barrier: the last of `parties` waiters releases the rest and
/// resets the barrier for reuse.
pub struct CyclicBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cond: Condvar,
}

impl CyclicBarrier {
    pub fn new(parties: usize) -> Result<Self, WorkError> {
        if parties == 0 {
            return Err(WorkError::invalid_argument(
                "barrier party count must be positive",
            ));
        }
        Ok(CyclicBarrier {
            parties,
            state: Mutex::new(BarrierState {
                remaining: parties,
                generation: 0,
            }),
            cond: Condvar::new(),
        })
    }

    pub fn wait(&self) {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.remaining -= 1;
        if state.remaining == 0 {
            state.remaining = self.parties;
            state.generation += 1;
            self.cond.notify_all();
        } else {
            while state.generation == generation {
                self.cond.wait(&mut state);
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
