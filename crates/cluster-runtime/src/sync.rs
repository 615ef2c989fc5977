use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Panic payload raised on cores blocked in a barrier or on a wake flag when another core of
/// the same launch faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchAborted;

/// A reusable barrier for a fixed number of cores.
///
/// Unlike [std::sync::Barrier], a barrier can be aborted: every core waiting on it, and every
/// core arriving later, unwinds with a [LaunchAborted] payload. This keeps a fault on one core
/// from leaving the others blocked forever.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<BarrierState>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: usize,
    aborted: bool,
}

impl Barrier {
    /// Barrier releasing its waiters once `parties` cores have arrived.
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(BarrierState::default()),
            cond: Condvar::new(),
        }
    }

    /// Number of cores the barrier waits for.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Blocks until every party has called `wait` for the current generation.
    pub fn wait(&self) {
        let mut state = self.lock();
        if state.aborted {
            std::panic::panic_any(LaunchAborted);
        }

        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation += 1;
            self.cond.notify_all();
            return;
        }

        let generation = state.generation;
        while state.generation == generation && !state.aborted {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.generation == generation {
            drop(state);
            std::panic::panic_any(LaunchAborted);
        }
    }

    pub(crate) fn abort(&self) {
        self.lock().aborted = true;
        self.cond.notify_all();
    }

    pub(crate) fn reset(&self) {
        *self.lock() = BarrierState::default();
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-core bitmask of pending wake-ups.
///
/// Models a core sleeping in a low-power wait state until another core writes to its wake
/// register: [WakeFlag::wait] blocks without polling until all requested bits are set, then
/// clears them.
#[derive(Debug, Default)]
pub struct WakeFlag {
    state: Mutex<WakeState>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct WakeState {
    pending: u32,
    aborted: bool,
}

impl WakeFlag {
    /// Sets `bits` and wakes the owner if it is waiting.
    pub fn signal(&self, bits: u32) {
        self.lock().pending |= bits;
        self.cond.notify_all();
    }

    /// Blocks until every bit of `mask` is set, then clears those bits.
    pub fn wait(&self, mask: u32) {
        let mut state = self.lock();
        while state.pending & mask != mask && !state.aborted {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.pending & mask != mask {
            drop(state);
            std::panic::panic_any(LaunchAborted);
        }
        state.pending &= !mask;
    }

    /// Bits currently set.
    pub fn pending(&self) -> u32 {
        self.lock().pending
    }

    pub(crate) fn abort(&self) {
        self.lock().aborted = true;
        self.cond.notify_all();
    }

    pub(crate) fn reset(&self) {
        *self.lock() = WakeState::default();
    }

    fn lock(&self) -> MutexGuard<'_, WakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn barrier_is_reusable() {
        let barrier = Barrier::new(4);
        let counter = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for round in 1..=3 {
                        counter.fetch_add(1, Ordering::SeqCst);
                        barrier.wait();
                        assert!(counter.load(Ordering::SeqCst) >= 4 * round);
                        barrier.wait();
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn aborted_barrier_releases_waiters() {
        let barrier = Barrier::new(2);

        thread::scope(|scope| {
            let waiter = scope.spawn(|| barrier.wait());
            while barrier.lock().arrived == 0 {
                thread::yield_now();
            }
            barrier.abort();

            let payload = waiter.join().unwrap_err();
            assert!(payload.downcast_ref::<LaunchAborted>().is_some());
        });
    }

    #[test]
    fn wake_flag_waits_for_every_bit() {
        let flag = WakeFlag::default();

        thread::scope(|scope| {
            let waiter = scope.spawn(|| flag.wait(0b110));
            flag.signal(0b010);
            flag.signal(0b100);
            waiter.join().unwrap();
        });

        assert_eq!(flag.pending(), 0);
    }

    #[test]
    fn signal_before_wait_is_not_lost() {
        let flag = WakeFlag::default();
        flag.signal(0b1);
        flag.signal(0b1000);

        flag.wait(0b1);

        assert_eq!(flag.pending(), 0b1000);
    }
}
