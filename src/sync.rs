//! Ticket spinlock shared between PEs.
//!
//! Used for the console (so log lines from different PEs don't interleave)
//! and for the secondary PE job mailboxes. Holds no thread identity, so it
//! works before any per-PE state exists.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

pub struct SpinLock<T> {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    ticket: u32,
}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != ticket {
            core::hint::spin_loop();
        }
        SpinLockGuard { lock: self, ticket }
    }

    /// Takes the lock only if nobody holds or waits for it.
    ///
    /// The exception path uses this: a fault taken while the console lock
    /// is held must still be able to print.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let serving = self.now_serving.load(Ordering::Acquire);
        self.next_ticket
            .compare_exchange(serving, serving.wrapping_add(1), Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|ticket| SpinLockGuard { lock: self, ticket })
    }

    /// Releases the lock on behalf of a holder whose guard will never drop.
    ///
    /// # Safety
    /// The current holder must be gone for good, e.g. its frames were
    /// abandoned by the fault trampoline. Releasing a live holder breaks
    /// mutual exclusion.
    pub unsafe fn force_unlock(&self) {
        if self.is_locked() {
            self.now_serving.fetch_add(1, Ordering::Release);
        }
    }

    pub fn is_locked(&self) -> bool {
        self.next_ticket.load(Ordering::Relaxed) != self.now_serving.load(Ordering::Relaxed)
    }
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock
            .now_serving
            .store(self.ticket.wrapping_add(1), Ordering::Release);
        // Wake secondaries parked in WFE on the same lock.
        #[cfg(all(target_arch = "aarch64", target_os = "none"))]
        unsafe { core::arch::asm!("sev", options(nostack, nomem)) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new(5u32);
        let guard = lock.lock();
        assert!(lock.is_locked());
        assert!(lock.try_lock().is_none());
        drop(guard);
        let mut again = lock.try_lock().expect("lock is free");
        *again += 1;
        drop(again);
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn force_unlock_releases_an_abandoned_guard() {
        let lock = SpinLock::new(0u32);
        core::mem::forget(lock.lock());
        assert!(lock.try_lock().is_none());

        unsafe { lock.force_unlock() };
        assert!(!lock.is_locked());
        *lock.lock() += 1;

        // Nothing to release on a free lock
        unsafe { lock.force_unlock() };
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 1);
    }
}
